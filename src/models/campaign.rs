use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::errors::AppError;
use crate::utils::parse_amount;

/// A marketing campaign (newer pack variant). `owner_user_id` is the
/// ownership column for `own`-scoped access. The division/department/
/// location fields are descriptive only; no scope filtering reads them.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Campaign {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub division: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub owner_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow)]
pub struct DbCampaign {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub amount: Option<String>,
    pub division: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub owner_user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<DbCampaign> for Campaign {
    type Error = AppError;

    fn try_from(value: DbCampaign) -> Result<Self, Self::Error> {
        let amount = value.amount.as_deref().map(parse_amount).transpose()?;
        Ok(Campaign {
            id: value.id,
            name: value.name,
            description: value.description,
            amount,
            division: value.division,
            department: value.department,
            location: value.location,
            start_date: value.start_date,
            end_date: value.end_date,
            owner_user_id: value.owner_user_id,
            created_at: value.created_at,
            updated_at: value.updated_at,
            deleted_at: value.deleted_at,
        })
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CampaignCreateRequest {
    #[schema(example = "Fall Brand Awareness")]
    pub name: String,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub division: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CampaignUpdateRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub amount: Option<f64>,
    pub division: Option<String>,
    pub department: Option<String>,
    pub location: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}
