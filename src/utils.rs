use chrono::{DateTime, Utc};

use crate::errors::AppError;

pub fn utc_now() -> DateTime<Utc> {
    Utc::now()
}

/// Parse a stored decimal amount. Amounts live in the database as TEXT to
/// keep them exact; responses surface them as numbers.
pub fn parse_amount(raw: &str) -> Result<f64, AppError> {
    raw.parse::<f64>()
        .map_err(|_| AppError::internal(format!("invalid stored amount: {raw}")))
}

/// Format an inbound amount for storage.
pub fn format_amount(amount: f64) -> String {
    format!("{amount:.2}")
}
