use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::utils::parse_amount;

/// A marketing plan. Plans carry no ownership column: `own`-scoped access
/// to them always resolves to nothing.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Plan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub plan_type_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub amount: f64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Linked external project, when project linking is in use.
    pub project_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Plan {
    pub fn with_project(mut self, project_id: Option<Uuid>) -> Self {
        self.project_id = project_id;
        self
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbPlan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub plan_type_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub amount: String,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbPlan> for Plan {
    type Error = AppError;

    fn try_from(value: DbPlan) -> Result<Self, Self::Error> {
        Ok(Plan {
            id: value.id,
            name: value.name,
            description: value.description,
            plan_type_id: value.plan_type_id,
            vendor_id: value.vendor_id,
            amount: parse_amount(&value.amount)?,
            start_date: value.start_date,
            end_date: value.end_date,
            project_id: None,
            created_at: value.created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlanCreateRequest {
    #[schema(example = "Q3 Social Push")]
    pub name: String,
    pub description: Option<String>,
    pub plan_type_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    #[schema(example = 15000.0)]
    pub amount: f64,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Required when the caller's pack requires project linking.
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct PlanUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub plan_type_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub amount: Option<f64>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    /// Absent: link untouched. Null or empty: clear. Value: replace.
    #[serde(default, deserialize_with = "crate::linking::patch_field")]
    #[schema(value_type = Option<String>)]
    pub project_id: Option<Option<String>>,
}
