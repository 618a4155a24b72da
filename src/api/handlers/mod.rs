pub mod admin;
pub mod analytics;
pub mod clients;
pub mod examinations;
pub mod sales;

use serde::Deserialize;

/// `?q=` search parameter.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Optional `?query=` filter used by the admin listings.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub query: Option<String>,
}
