//! Lookup tables: plan types, activity types and per-type fiscal budgets.
//! These resolve scope against the pack-wide tier and carry no ownership.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::utils::parse_amount;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct PlanType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ActivityType {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct PlanTypeBudget {
    pub id: Uuid,
    pub plan_type_id: Uuid,
    pub fiscal_year: i32,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbPlanTypeBudget {
    pub id: Uuid,
    pub plan_type_id: Uuid,
    pub fiscal_year: i32,
    pub amount: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<DbPlanTypeBudget> for PlanTypeBudget {
    type Error = AppError;

    fn try_from(value: DbPlanTypeBudget) -> Result<Self, Self::Error> {
        Ok(PlanTypeBudget {
            id: value.id,
            plan_type_id: value.plan_type_id,
            fiscal_year: value.fiscal_year,
            amount: parse_amount(&value.amount)?,
            created_at: value.created_at,
            updated_at: value.updated_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LookupCreateRequest {
    #[schema(example = "Digital Advertising")]
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct LookupUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct BudgetUpsertRequest {
    #[schema(example = 2026)]
    pub fiscal_year: i32,
    #[schema(example = 120000.0)]
    pub amount: f64,
}
