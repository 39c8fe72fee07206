use std::{collections::BTreeMap, convert::Infallible, str::FromStr, time::Duration};

use thiserror::Error;

use crate::metric::{DataKey, LeafNode, MetricTarget, AVERAGE_FIELD, ENUM_VALUES_FIELD};

pub const DEFAULT_MAX_METRICS_PER_REQUEST: usize = 100;
pub const DEFAULT_MAX_REQUEST_LENGTH: usize = 1900;
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_MAX_CONCURRENT_REQUESTS: usize = 4;

/// What a submetric alias resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmetricAlias {
    // Read a flat field of each sample, e.g. "average".
    Field(String),
    // Read the preceding path component as a category of `enum_values`.
    Enum,
}

impl FromStr for SubmetricAlias {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "enum" => SubmetricAlias::Enum,
            field => SubmetricAlias::Field(field.to_string()),
        })
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub tenant: String,
    // Store endpoints. Requests go to the first one.
    pub urls: Vec<String>,
    // Treat the last path component as a submetric alias.
    pub enable_submetrics: bool,
    pub submetric_aliases: BTreeMap<String, SubmetricAlias>,
    pub max_metrics_per_request: usize,
    // Upper bound on the serialized size of a request's metric list.
    pub max_request_length: usize,
    // Leave gaps between samples instead of interpolating.
    pub use_statsd_semantics: bool,
    pub request_timeout: Duration,
    // Number of request groups in flight at once for one query.
    pub max_concurrent_requests: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tenant: String::new(),
            urls: vec![],
            enable_submetrics: false,
            submetric_aliases: BTreeMap::new(),
            max_metrics_per_request: DEFAULT_MAX_METRICS_PER_REQUEST,
            max_request_length: DEFAULT_MAX_REQUEST_LENGTH,
            use_statsd_semantics: false,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            max_concurrent_requests: DEFAULT_MAX_CONCURRENT_REQUESTS,
        }
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("at least one store url is required")]
    NoUrls,
    #[error("tenant must not be empty")]
    EmptyTenant,
    #[error("max_metrics_per_request must be greater than zero")]
    MaxMetricsError,
    #[error("max_request_length must be greater than zero")]
    MaxLengthError,
    #[error("max_concurrent_requests must be greater than zero")]
    ConcurrencyError,
    #[error("request_timeout must be greater than zero")]
    TimeoutError,
    #[error("invalid submetric alias {0:?}")]
    InvalidAlias(String),
    #[error("submetrics enabled without any aliases")]
    NoAliases,
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.urls.is_empty() || self.urls.iter().any(|u| u.trim().is_empty()) {
            return Err(ConfigError::NoUrls);
        }
        if self.tenant.is_empty() {
            return Err(ConfigError::EmptyTenant);
        }
        if self.max_metrics_per_request == 0 {
            return Err(ConfigError::MaxMetricsError);
        }
        if self.max_request_length == 0 {
            return Err(ConfigError::MaxLengthError);
        }
        if self.max_concurrent_requests == 0 {
            return Err(ConfigError::ConcurrencyError);
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::TimeoutError);
        }
        for (alias, target) in &self.submetric_aliases {
            let bad_field = matches!(target, SubmetricAlias::Field(f) if f.is_empty());
            if alias.is_empty() || alias.contains('.') || bad_field {
                return Err(ConfigError::InvalidAlias(alias.clone()));
            }
        }
        if self.enable_submetrics && self.submetric_aliases.is_empty() {
            return Err(ConfigError::NoAliases);
        }
        Ok(())
    }

    pub fn endpoint(&self) -> &str {
        self.urls
            .first()
            .map(|u| u.trim_end_matches('/'))
            .unwrap_or_default()
    }

    /// Works out which store identifier a node reads from and how.
    /// Returns `None` when the node names a submetric alias that isn't
    /// configured.
    pub fn resolve(&self, node: &LeafNode) -> Option<MetricTarget> {
        if let Some(category) = &node.category {
            let mut base = node.path.as_str();
            if self.enable_submetrics {
                if let Some((rest, alias)) = base.rsplit_once('.') {
                    if self.submetric_aliases.get(alias) == Some(&SubmetricAlias::Enum) {
                        base = rest;
                    }
                }
            }
            let metric = base
                .strip_suffix(category.as_str())
                .and_then(|b| b.strip_suffix('.'))
                .unwrap_or(base);
            return Some(MetricTarget {
                path: node.path.clone(),
                metric: metric.to_string(),
                data_key: DataKey::Nested(ENUM_VALUES_FIELD.to_string(), category.clone()),
            });
        }

        if !self.enable_submetrics {
            return Some(MetricTarget {
                path: node.path.clone(),
                metric: node.path.clone(),
                data_key: DataKey::Flat(AVERAGE_FIELD.to_string()),
            });
        }

        let (metric, alias) = node.path.rsplit_once('.')?;
        let (metric, data_key) = match self.submetric_aliases.get(alias)? {
            SubmetricAlias::Field(field) => (metric, DataKey::Flat(field.clone())),
            SubmetricAlias::Enum => {
                let (base, category) = metric.rsplit_once('.')?;
                (
                    base,
                    DataKey::Nested(ENUM_VALUES_FIELD.to_string(), category.to_string()),
                )
            }
        };
        Some(MetricTarget {
            path: node.path.clone(),
            metric: metric.to_string(),
            data_key,
        })
    }
}
