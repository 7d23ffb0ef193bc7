pub mod campaign;
pub mod expense;
pub mod lookup;
pub mod plan;
pub mod vendor;
