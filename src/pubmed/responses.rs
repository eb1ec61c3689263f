use serde::{Deserialize, Serialize};

/// JSON ESearch response (`retmode=json`)
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ESearchResult {
    pub esearchresult: ESearchData,
}

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ESearchData {
    #[serde(default, rename = "ERROR")]
    pub error: Option<String>,
    #[serde(default)]
    pub count: Option<String>,
    #[serde(default)]
    pub retmax: Option<String>,
    #[serde(default)]
    pub retstart: Option<String>,
    #[serde(default)]
    pub idlist: Vec<String>,
}

impl ESearchData {
    /// Total match count reported by the service
    pub fn total_count(&self) -> Option<usize> {
        self.count.as_ref().and_then(|c| c.trim().parse().ok())
    }
}
