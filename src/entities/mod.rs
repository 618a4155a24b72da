//! Entity module - Contains all SeaORM entity definitions for the database.
//! These entities represent the database tables and their relationships.
//! Each entity has a Model struct for data and an Entity struct for operations.

pub mod api_request_log;
pub mod branch;
pub mod client;
pub mod examination;
pub mod sales;
pub mod user_account;

// Re-export specific types to avoid conflicts
pub use api_request_log::{
    Column as ApiRequestLogColumn, Entity as ApiRequestLog, Model as ApiRequestLogModel,
};
pub use branch::{Column as BranchColumn, Entity as Branch, Model as BranchModel};
pub use client::{Column as ClientColumn, Entity as Client, Model as ClientModel};
pub use examination::{
    Column as ExaminationColumn, Entity as Examination, Model as ExaminationModel,
};
pub use sales::{Column as SalesColumn, Entity as Sales, Model as SalesModel};
pub use user_account::{
    Column as UserAccountColumn, Entity as UserAccount, Model as UserAccountModel,
};
