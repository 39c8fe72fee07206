use std::{collections::HashMap, sync::Arc};

use log::{debug, warn};
use thiserror::Error;

use crate::{
    auth::{AuthError, CredentialCache},
    batch::{self, BatchError},
    config::{Config, ConfigError},
    fetch::{FetchParams, MultiFetcher},
    grid::{Grid, GridError},
    metric::{DataKey, LeafNode, MetricTarget},
    resample::{resample, Series},
    resolution::select_resolution,
    search::{self, SearchEntry},
    session::Session,
    transport::{http::HttpTransport, Transport, TransportError},
};

#[derive(Error, Debug)]
pub enum QueryError {
    #[error("invalid config")]
    InvalidConfig(#[from] ConfigError),
    #[error("authentication failed")]
    Auth(#[from] AuthError),
    #[error("request to the store failed")]
    Transport(#[from] TransportError),
    #[error("failed to batch metrics")]
    Batch(#[from] BatchError),
    #[error("invalid time range")]
    InvalidRange(#[from] GridError),
    #[error("failed to encode request")]
    Encode(#[from] serde_json::Error),
}

/// The grid a query was answered on, in seconds. `end` is one step past
/// the last slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeInfo {
    pub start: i64,
    pub end: i64,
    pub step: i64,
}

/// Resampled values keyed by node path. Nodes with no data are absent.
pub type SeriesMap = HashMap<String, Series>;

/// Entry point for querying the store. Safe to share between threads;
/// concurrent queries share one credential cache.
pub struct QueryClient {
    config: Config,
    session: Session,
}

impl QueryClient {
    pub fn new(
        config: Config,
        transport: Arc<dyn Transport>,
        credentials: Option<Arc<CredentialCache>>,
    ) -> Result<Self, QueryError> {
        config.validate()?;
        let session = Session::new(transport, credentials, config.request_timeout);
        Ok(Self { config, session })
    }

    /// Builds a client that talks HTTP to the configured endpoint.
    pub fn connect(
        config: Config,
        credentials: Option<Arc<CredentialCache>>,
    ) -> Result<Self, QueryError> {
        let transport = HttpTransport::new()?;
        Self::new(config, Arc::new(transport), credentials)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Fetches every node over `[start, end]` (seconds) and aligns the
    /// results onto one grid whose step follows from the range.
    pub fn fetch_multi(
        &self,
        nodes: &[LeafNode],
        start: i64,
        end: i64,
    ) -> Result<(TimeInfo, SeriesMap), QueryError> {
        let resolution = select_resolution(start, end);
        let grid = Grid::new(start, end, resolution.period_seconds())?;
        let time_info = TimeInfo {
            start: grid.start(),
            end: grid.end(),
            step: grid.step(),
        };

        let targets: Vec<MetricTarget> = nodes
            .iter()
            .filter_map(|node| {
                let target = self.config.resolve(node);
                if target.is_none() {
                    warn!("skipping {}: unknown submetric", node.path);
                }
                target
            })
            .collect();
        if targets.is_empty() {
            return Ok((time_info, SeriesMap::new()));
        }

        let metrics = batch::unique(targets.iter().map(|t| t.metric.as_str()));
        let groups = batch::pack(
            &metrics,
            self.config.max_metrics_per_request,
            self.config.max_request_length,
        )?;
        debug!(
            "fetching {} metrics in {} requests at {}",
            metrics.len(),
            groups.len(),
            resolution.as_str()
        );

        let mut select: Vec<String> = targets
            .iter()
            .map(|t| t.data_key.field().to_string())
            .collect();
        select.sort();
        select.dedup();
        let (from_millis, to_millis) = grid.window_millis();
        let params = FetchParams {
            from_millis,
            to_millis,
            resolution,
            select,
        };

        let url = format!(
            "{}/{}/multi-metric-query",
            self.config.endpoint(),
            self.config.tenant
        );
        let fetcher = MultiFetcher::new(&self.session, url, self.config.max_concurrent_requests);
        let output = fetcher.fetch_all(&groups, &params)?;

        let mut series = SeriesMap::new();
        for target in &targets {
            let record = match output.records.get(&target.metric) {
                Some(record) => record,
                None => continue,
            };
            if let DataKey::Nested(field, key) = &target.data_key {
                if !record.has_category(field, key) {
                    continue;
                }
            }
            series.insert(
                target.path.clone(),
                resample(
                    &record.data,
                    &grid,
                    &target.data_key,
                    self.config.use_statsd_semantics,
                ),
            );
        }
        Ok((time_info, series))
    }

    /// Looks up metrics matching a glob-style `pattern`.
    pub fn search(&self, pattern: &str) -> Result<Vec<SearchEntry>, QueryError> {
        let url = search::search_url(self.config.endpoint(), &self.config.tenant, pattern);
        search::search(&self.session, &url)
    }
}
