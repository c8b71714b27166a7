//! Pipe catalog returned by `GET /pipes?includeVersions=true`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Response envelope of the catalog endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogResponse {
    #[serde(default)]
    pub success: bool,
    pub data: Option<PipeCatalog>,
    pub error: Option<String>,
}

/// All published pipes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipeCatalog {
    #[serde(default)]
    pub pipes: Vec<PipeSummary>,
    #[serde(default)]
    pub total_count: u64,
}

/// One pipe and its published versions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipeSummary {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub versions: Vec<PipeVersion>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipeVersion {
    pub version_number: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl PipeSummary {
    /// Version numbers, newest first. Undated versions sort last.
    pub fn versions_newest_first(&self) -> Vec<&str> {
        let mut versions: Vec<&PipeVersion> = self.versions.iter().collect();
        versions.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        versions.iter().map(|v| v.version_number.as_str()).collect()
    }
}
