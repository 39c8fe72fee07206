use std::collections::BTreeMap;

use log::warn;
use serde::Deserialize;

use crate::{client::QueryError, session::Session, transport::Method};

/// One hit from the store's metric search. Depending on the API
/// generation, the store either describes full metrics or only names
/// path components and whether they are leaves.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum SearchEntry {
    Metric {
        metric: String,
        #[serde(default)]
        unit: Option<String>,
        #[serde(default)]
        enum_values: Option<Vec<String>>,
    },
    Node(BTreeMap<String, bool>),
}

impl SearchEntry {
    /// `(name, is_leaf)` for every path this entry describes.
    pub fn paths(&self) -> Vec<(&str, bool)> {
        match self {
            SearchEntry::Metric { metric, .. } => vec![(metric.as_str(), true)],
            SearchEntry::Node(nodes) => nodes
                .iter()
                .map(|(name, leaf)| (name.as_str(), *leaf))
                .collect(),
        }
    }
}

pub(crate) fn search_url(endpoint: &str, tenant: &str, pattern: &str) -> String {
    format!(
        "{}/{}/metrics/search?query={}",
        endpoint,
        tenant,
        urlencoding::encode(pattern)
    )
}

/// Runs a search. A non-success answer from the store means nothing
/// was found.
pub(crate) fn search(session: &Session, url: &str) -> Result<Vec<SearchEntry>, QueryError> {
    let response = session.send(Method::Get, url, None)?;
    if !response.is_success() {
        warn!("search {} returned status {}", url, response.status);
        return Ok(vec![]);
    }
    match serde_json::from_slice(&response.body) {
        Ok(entries) => Ok(entries),
        Err(e) => {
            warn!("search {} returned an unreadable body: {}", url, e);
            Ok(vec![])
        }
    }
}
