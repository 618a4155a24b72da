//! Staff business logic - User accounts and their roles.
//!
//! Authentication happens upstream; this module only manages the account records
//! that access checks and captured display names are based on.

use crate::{
    config::clinic::StaffConfig,
    core::client::contains_pattern,
    entities::{UserAccount, user_account, user_account::Role},
    errors::{Error, Result},
};
use sea_orm::{Condition, QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::info;

/// Input for creating a staff account.
#[derive(Debug, Clone, Deserialize)]
pub struct NewStaff {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub is_staff: bool,
    #[serde(default)]
    pub is_superuser: bool,
}

/// Partial update of a staff account. `is_active` is managed here as well.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StaffUpdate {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
    pub is_staff: Option<bool>,
}

/// Lower-cases and trims an email address, rejecting obviously invalid ones.
pub fn normalize_email(email: &str) -> Result<String> {
    let email = email.trim().to_lowercase();
    if email.is_empty() {
        return Err(Error::validation("email", "Users must have an email address"));
    }
    if !email.contains('@') {
        return Err(Error::validation("email", "Enter a valid email address"));
    }
    Ok(email)
}

fn require_text(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(Error::validation(field, "This field may not be blank"));
    }
    Ok(value.to_string())
}

/// Lists staff accounts, optionally filtered by role or first name.
pub async fn list_staff(
    db: &DatabaseConnection,
    query: Option<&str>,
) -> Result<Vec<user_account::Model>> {
    let mut select = UserAccount::find().order_by_asc(user_account::Column::FirstName);
    if let Some(query) = query.map(str::trim).filter(|q| !q.is_empty()) {
        select = select.filter(
            Condition::any()
                .add(user_account::Column::Role.like(contains_pattern(query)))
                .add(user_account::Column::FirstName.like(contains_pattern(query))),
        );
    }
    select.all(db).await.map_err(Into::into)
}

/// Finds a staff account by ID.
pub async fn get_staff_by_id(
    db: &DatabaseConnection,
    staff_id: i64,
) -> Result<Option<user_account::Model>> {
    UserAccount::find_by_id(staff_id)
        .one(db)
        .await
        .map_err(Into::into)
}

/// Finds an active account by login email (case-insensitive).
pub async fn find_active_by_email(
    db: &DatabaseConnection,
    email: &str,
) -> Result<Option<user_account::Model>> {
    let email = email.trim().to_lowercase();
    UserAccount::find()
        .filter(user_account::Column::Email.eq(email))
        .filter(user_account::Column::IsActive.eq(true))
        .one(db)
        .await
        .map_err(Into::into)
}

async fn ensure_email_free(db: &DatabaseConnection, email: &str, except_id: Option<i64>) -> Result<()> {
    let existing = UserAccount::find()
        .filter(user_account::Column::Email.eq(email))
        .one(db)
        .await?;
    match existing {
        Some(account) if Some(account.id) != except_id => Err(Error::Conflict {
            message: format!("An account with email '{email}' already exists"),
        }),
        _ => Ok(()),
    }
}

/// Creates a staff account.
pub async fn create_staff(db: &DatabaseConnection, input: NewStaff) -> Result<user_account::Model> {
    let email = normalize_email(&input.email)?;
    let first_name = require_text("first_name", &input.first_name)?;
    let last_name = require_text("last_name", &input.last_name)?;
    ensure_email_free(db, &email, None).await?;

    let account = user_account::ActiveModel {
        first_name: Set(first_name),
        last_name: Set(last_name),
        email: Set(email),
        role: Set(input.role),
        is_active: Set(true),
        is_staff: Set(input.is_staff || input.is_superuser),
        is_superuser: Set(input.is_superuser),
        created_at: Set(chrono::Utc::now()),
        ..Default::default()
    };
    let result = account.insert(db).await?;
    info!(email = %result.email, role = result.role.as_str(), "Created staff account");
    Ok(result)
}

/// Applies a partial update to a staff account.
pub async fn update_staff(
    db: &DatabaseConnection,
    staff_id: i64,
    update: StaffUpdate,
) -> Result<user_account::Model> {
    let existing = get_staff_by_id(db, staff_id)
        .await?
        .ok_or_else(|| Error::not_found("User", staff_id))?;

    let mut active: user_account::ActiveModel = existing.into();
    if let Some(first_name) = update.first_name {
        active.first_name = Set(require_text("first_name", &first_name)?);
    }
    if let Some(last_name) = update.last_name {
        active.last_name = Set(require_text("last_name", &last_name)?);
    }
    if let Some(email) = update.email {
        let email = normalize_email(&email)?;
        ensure_email_free(db, &email, Some(staff_id)).await?;
        active.email = Set(email);
    }
    if let Some(role) = update.role {
        active.role = Set(role);
    }
    if let Some(is_active) = update.is_active {
        active.is_active = Set(is_active);
    }
    if let Some(is_staff) = update.is_staff {
        active.is_staff = Set(is_staff);
    }
    active.update(db).await.map_err(Into::into)
}

/// Deletes a staff account. Names already captured on records are unaffected.
pub async fn delete_staff(db: &DatabaseConnection, staff_id: i64) -> Result<()> {
    let result = UserAccount::delete_by_id(staff_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("User", staff_id));
    }
    Ok(())
}

/// Inserts configured staff accounts whose email is not registered yet.
pub async fn seed_staff(db: &DatabaseConnection, staff: &[StaffConfig]) -> Result<usize> {
    let mut created = 0;
    for config in staff {
        let email = normalize_email(&config.email)?;
        let exists = UserAccount::find()
            .filter(user_account::Column::Email.eq(email.as_str()))
            .one(db)
            .await?
            .is_some();
        if exists {
            continue;
        }
        create_staff(
            db,
            NewStaff {
                email,
                first_name: config.first_name.clone(),
                last_name: config.last_name.clone(),
                role: config.role,
                is_staff: config.is_staff,
                is_superuser: config.is_superuser,
            },
        )
        .await?;
        created += 1;
    }
    Ok(created)
}
