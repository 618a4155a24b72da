//! Registration-number generation.
//!
//! A registration number has the form `{branch_code}/{year}/{month:02}/{suffix}`,
//! e.g. `NRB/2025/03/4F2A9C`. The branch code comes from the branch whose name
//! matches the client's location (ignoring case), or [`FALLBACK_BRANCH_CODE`]
//! when none does. The suffix is six uppercase hex characters taken from a fresh
//! v4 UUID.

use crate::{
    entities::{Client, client},
    errors::{Error, Result},
};
use chrono::{DateTime, Datelike, Utc};
use sea_orm::{ConnectionTrait, prelude::*};
use tracing::{debug, warn};
use uuid::Uuid;

/// Branch code used when the client's location matches no branch.
pub const FALLBACK_BRANCH_CODE: &str = "XX";

const SUFFIX_LEN: usize = 6;
const MAX_ATTEMPTS: usize = 5;

/// Six uppercase hex characters from a new random identifier.
#[must_use]
pub fn random_suffix() -> String {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(SUFFIX_LEN)
        .collect::<String>()
        .to_ascii_uppercase()
}

/// Assembles a registration number from its parts.
#[must_use]
pub fn compose_reg_no(branch_code: &str, at: DateTime<Utc>, suffix: &str) -> String {
    format!("{branch_code}/{}/{:02}/{suffix}", at.year(), at.month())
}

/// Resolves the branch code for a client location, falling back to `XX`.
pub async fn branch_code_for_location<C>(db: &C, location: &str) -> Result<String>
where
    C: ConnectionTrait,
{
    Ok(crate::core::branch::find_branch_by_location(db, location)
        .await?
        .map_or_else(|| FALLBACK_BRANCH_CODE.to_string(), |branch| branch.code))
}

/// Generates an unused registration number for a client registered at `at`.
///
/// Collisions are astronomically unlikely, but the candidate is still checked
/// against existing clients and redrawn a few times before giving up.
pub async fn generate_reg_no<C>(db: &C, location: &str, at: DateTime<Utc>) -> Result<String>
where
    C: ConnectionTrait,
{
    let branch_code = branch_code_for_location(db, location).await?;

    for _ in 0..MAX_ATTEMPTS {
        let candidate = compose_reg_no(&branch_code, at, &random_suffix());
        let taken = Client::find()
            .filter(client::Column::RegNo.eq(candidate.as_str()))
            .one(db)
            .await?
            .is_some();
        if !taken {
            debug!(reg_no = %candidate, "Generated registration number");
            return Ok(candidate);
        }
        warn!(reg_no = %candidate, "Registration number collision, redrawing");
    }

    Err(Error::Conflict {
        message: "Could not allocate a unique registration number".to_string(),
    })
}
