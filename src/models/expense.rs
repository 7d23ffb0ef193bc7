use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::utils::parse_amount;

/// A recorded marketing expense. `created_by` is the ownership column
/// `own`-scoped access filters on.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Expense {
    pub id: Uuid,
    pub description: String,
    pub amount: f64,
    pub expense_date: Option<DateTime<Utc>>,
    pub plan_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub activity_type_id: Option<Uuid>,
    pub created_by: Uuid,
    pub project_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Expense {
    pub fn with_project(mut self, project_id: Option<Uuid>) -> Self {
        self.project_id = project_id;
        self
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbExpense {
    pub id: Uuid,
    pub description: String,
    pub amount: String,
    pub expense_date: Option<DateTime<Utc>>,
    pub plan_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub activity_type_id: Option<Uuid>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbExpense> for Expense {
    type Error = AppError;

    fn try_from(value: DbExpense) -> Result<Self, Self::Error> {
        Ok(Expense {
            id: value.id,
            description: value.description,
            amount: parse_amount(&value.amount)?,
            expense_date: value.expense_date,
            plan_id: value.plan_id,
            vendor_id: value.vendor_id,
            activity_type_id: value.activity_type_id,
            created_by: value.created_by,
            project_id: None,
            created_at: value.created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExpenseCreateRequest {
    #[schema(example = "Conference booth rental")]
    pub description: String,
    #[schema(example = 2500.0)]
    pub amount: f64,
    pub expense_date: Option<DateTime<Utc>>,
    pub plan_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub activity_type_id: Option<Uuid>,
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ExpenseUpdateRequest {
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub expense_date: Option<DateTime<Utc>>,
    pub plan_id: Option<Uuid>,
    pub vendor_id: Option<Uuid>,
    pub activity_type_id: Option<Uuid>,
    /// Absent: link untouched. Null or empty: clear. Value: replace.
    #[serde(default, deserialize_with = "crate::linking::patch_field")]
    #[schema(value_type = Option<String>)]
    pub project_id: Option<Option<String>>,
}

#[derive(Debug, Deserialize, utoipa::IntoParams)]
pub struct ExpenseListQuery {
    /// Restrict the listing to expenses of one plan.
    pub plan_id: Option<Uuid>,
}
