pub mod activity_types;
pub mod campaigns;
pub mod config;
pub mod expenses;
pub mod health;
pub mod plan_types;
pub mod plans;
pub mod vendors;
