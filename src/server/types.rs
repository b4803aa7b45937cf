use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Serialize, Deserialize)]
pub struct ConvertRequest {
    /// Missing and empty are treated alike so both fail validation with 400.
    #[serde(default)]
    pub mql_query: String,
}

#[derive(Debug, Deserialize)]
pub struct ConvertParams {
    #[serde(default)]
    pub mql_query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConvertResponse {
    pub promql_query: String,
    #[serde(default)]
    pub debug: BTreeMap<String, String>,
    #[serde(default)]
    pub errors: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ConvertResponse {
    pub fn failure(
        debug: BTreeMap<String, String>,
        errors: Vec<String>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            promql_query: String::new(),
            debug,
            errors,
            warnings,
        }
    }
}
