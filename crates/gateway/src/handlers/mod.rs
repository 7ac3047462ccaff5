//! API handlers module

pub mod audit;
pub mod cases;
pub mod health;
pub mod reports;
