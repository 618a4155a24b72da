//! Business logic, independent of the HTTP layer.

pub mod analytics;
pub mod branch;
pub mod client;
pub mod examination;
pub mod notify;
pub mod registration;
pub mod sales;
pub mod staff;
