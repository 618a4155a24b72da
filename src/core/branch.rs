//! Branch business logic - Reference data for registration numbers.
//!
//! Provides lookups, administrator CRUD and startup seeding for branches.

use crate::{
    config::clinic::BranchConfig,
    entities::{Branch, branch},
    errors::{Error, Result},
};
use sea_orm::{QueryOrder, Set, prelude::*};
use serde::Deserialize;
use tracing::info;

const MAX_CODE_LEN: usize = 5;

/// Input for creating a branch.
#[derive(Debug, Clone, Deserialize)]
pub struct NewBranch {
    pub name: String,
    pub code: String,
}

/// Partial update of a branch.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BranchUpdate {
    pub name: Option<String>,
    pub code: Option<String>,
}

fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::validation("name", "Branch name cannot be empty"));
    }
    Ok(())
}

fn validate_code(code: &str) -> Result<()> {
    let code = code.trim();
    if code.is_empty() || code.chars().count() > MAX_CODE_LEN {
        return Err(Error::validation(
            "code",
            format!("Branch code must be between 1 and {MAX_CODE_LEN} characters"),
        ));
    }
    if code.contains('/') {
        return Err(Error::validation("code", "Branch code cannot contain '/'"));
    }
    Ok(())
}

/// Retrieves all branches ordered by name.
pub async fn list_branches(db: &DatabaseConnection) -> Result<Vec<branch::Model>> {
    Branch::find()
        .order_by_asc(branch::Column::Name)
        .all(db)
        .await
        .map_err(Into::into)
}

/// Finds a branch by its ID.
pub async fn get_branch_by_id(
    db: &DatabaseConnection,
    branch_id: i64,
) -> Result<Option<branch::Model>> {
    Branch::find_by_id(branch_id).one(db).await.map_err(Into::into)
}

/// Finds the branch whose name equals `location`, ignoring case and surrounding whitespace.
///
/// Branch lists are short, so the comparison happens in Rust rather than relying on
/// backend-specific collation.
pub async fn find_branch_by_location<C>(db: &C, location: &str) -> Result<Option<branch::Model>>
where
    C: ConnectionTrait,
{
    let wanted = location.trim().to_lowercase();
    if wanted.is_empty() {
        return Ok(None);
    }

    let branches = Branch::find().all(db).await?;
    Ok(branches
        .into_iter()
        .find(|b| b.name.trim().to_lowercase() == wanted))
}

/// Rejects a name or code already used by another branch, ignoring case.
///
/// Location matching ignores case, so two names differing only in case would
/// make one of them unreachable.
async fn ensure_unique<C>(db: &C, name: &str, code: &str, except_id: Option<i64>) -> Result<()>
where
    C: ConnectionTrait,
{
    let wanted_name = name.trim().to_lowercase();
    let wanted_code = code.trim().to_lowercase();

    for other in Branch::find().all(db).await? {
        if Some(other.id) == except_id {
            continue;
        }
        if other.name.trim().to_lowercase() == wanted_name {
            return Err(Error::Conflict {
                message: format!("A branch named '{}' already exists", other.name),
            });
        }
        if other.code.trim().to_lowercase() == wanted_code {
            return Err(Error::Conflict {
                message: format!("Branch code '{}' is already in use", other.code),
            });
        }
    }
    Ok(())
}

/// Creates a new branch after validating the name and code.
pub async fn create_branch(db: &DatabaseConnection, input: NewBranch) -> Result<branch::Model> {
    validate_name(&input.name)?;
    validate_code(&input.code)?;

    let name = input.name.trim().to_string();
    let code = input.code.trim().to_string();
    ensure_unique(db, &name, &code, None).await?;

    let branch = branch::ActiveModel {
        name: Set(name),
        code: Set(code),
        ..Default::default()
    };
    let result = branch.insert(db).await?;
    info!(branch = %result.name, code = %result.code, "Created branch");
    Ok(result)
}

/// Applies a partial update to a branch.
pub async fn update_branch(
    db: &DatabaseConnection,
    branch_id: i64,
    update: BranchUpdate,
) -> Result<branch::Model> {
    let existing = get_branch_by_id(db, branch_id)
        .await?
        .ok_or_else(|| Error::not_found("Branch", branch_id))?;

    let name = match update.name {
        Some(name) => {
            validate_name(&name)?;
            name.trim().to_string()
        }
        None => existing.name.clone(),
    };
    let code = match update.code {
        Some(code) => {
            validate_code(&code)?;
            code.trim().to_string()
        }
        None => existing.code.clone(),
    };
    ensure_unique(db, &name, &code, Some(branch_id)).await?;

    let mut active: branch::ActiveModel = existing.into();
    active.name = Set(name);
    active.code = Set(code);
    active.update(db).await.map_err(Into::into)
}

/// Deletes a branch. Registration numbers already issued keep their code.
pub async fn delete_branch(db: &DatabaseConnection, branch_id: i64) -> Result<()> {
    let result = Branch::delete_by_id(branch_id).exec(db).await?;
    if result.rows_affected == 0 {
        return Err(Error::not_found("Branch", branch_id));
    }
    Ok(())
}

/// Inserts configured branches that are not in the database yet.
///
/// Returns the number of branches created.
pub async fn seed_branches(db: &DatabaseConnection, branches: &[BranchConfig]) -> Result<usize> {
    let mut created = 0;
    for config in branches {
        let exists = find_branch_by_location(db, &config.name).await?.is_some();
        if exists {
            continue;
        }
        create_branch(
            db,
            NewBranch {
                name: config.name.clone(),
                code: config.code.clone(),
            },
        )
        .await?;
        created += 1;
    }
    Ok(created)
}
