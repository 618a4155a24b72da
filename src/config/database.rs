//! Database configuration module for the clinic backend.
//!
//! This module handles `SQLite` database connection and table creation using `SeaORM`.
//! Tables are generated from the entity definitions with `Schema::create_table_from_entity`,
//! so the schema always matches the Rust structs without hand-written SQL. The only
//! extra statement is the composite unique index on the request counters.

use crate::entities::{
    ApiRequestLog, Branch, Client, Examination, Sales, UserAccount, api_request_log,
};
use crate::errors::Result;
use sea_orm::sea_query::Index;
use sea_orm::{ConnectionTrait, Database, DatabaseConnection, Schema};
use tracing::info;

const DEFAULT_DATABASE_URL: &str = "sqlite://data/iris.sqlite?mode=rwc";

/// Gets the database URL from environment variable or returns default `SQLite` path.
#[must_use]
pub fn get_database_url() -> String {
    std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string())
}

/// Establishes a connection to the database named by `DATABASE_URL`.
///
/// Falls back to a local `SQLite` file when the variable is not set.
pub async fn create_connection() -> Result<DatabaseConnection> {
    let database_url = get_database_url();
    info!("Connecting to database at {database_url}");
    Database::connect(&database_url).await.map_err(Into::into)
}

/// Creates all tables (if missing) from the entity definitions.
///
/// Parents are created before children so the foreign keys on `examinations`
/// and `sales` resolve.
pub async fn create_tables(db: &DatabaseConnection) -> Result<()> {
    let builder = db.get_database_backend();
    let schema = Schema::new(builder);

    let mut statements = vec![
        schema.create_table_from_entity(Branch),
        schema.create_table_from_entity(UserAccount),
        schema.create_table_from_entity(Client),
        schema.create_table_from_entity(Examination),
        schema.create_table_from_entity(Sales),
        schema.create_table_from_entity(ApiRequestLog),
    ];
    for statement in &mut statements {
        statement.if_not_exists();
        db.execute(builder.build(&*statement)).await?;
    }

    let request_log_index = Index::create()
        .name("idx_api_request_logs_method_endpoint")
        .table(ApiRequestLog)
        .col(api_request_log::Column::Method)
        .col(api_request_log::Column::Endpoint)
        .unique()
        .if_not_exists()
        .to_owned();
    db.execute(builder.build(&request_log_index)).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{BranchModel, ClientModel, ExaminationModel, SalesModel};
    use sea_orm::{EntityTrait, QuerySelect};

    #[tokio::test]
    async fn test_create_tables() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;

        // Test that tables exist by querying them
        let _: Vec<BranchModel> = Branch::find().limit(1).all(&db).await?;
        let _: Vec<ClientModel> = Client::find().limit(1).all(&db).await?;
        let _: Vec<ExaminationModel> = Examination::find().limit(1).all(&db).await?;
        let _: Vec<SalesModel> = Sales::find().limit(1).all(&db).await?;
        Ok(())
    }

    #[tokio::test]
    async fn test_create_tables_is_idempotent() -> Result<()> {
        let db = Database::connect("sqlite::memory:").await?;
        create_tables(&db).await?;
        create_tables(&db).await?;
        Ok(())
    }
}
