use std::{
    collections::HashMap,
    panic,
    sync::{Mutex, PoisonError},
    thread,
};

use dashmap::{mapref::entry::Entry, DashMap};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::{
    client::QueryError, metric::MetricRecord, resolution::Resolution, session::Session,
    transport::Method,
};

/// Query parameters shared by every group of one fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchParams {
    pub from_millis: i64,
    pub to_millis: i64,
    pub resolution: Resolution,
    // Sample fields the store should return.
    pub select: Vec<String>,
}

#[derive(Serialize)]
struct Payload<'a> {
    metrics: &'a [String],
    from: i64,
    to: i64,
    resolution: Resolution,
    select: &'a [String],
}

#[derive(Deserialize)]
struct MultiResponse {
    #[serde(default)]
    metrics: Vec<Value>,
}

/// A group that produced no data. These never fail the query.
#[derive(Error, Debug)]
pub enum PartialFailure {
    #[error("request group {group} returned status {status}")]
    Status { group: usize, status: u16 },
    #[error("request group {group} returned an unreadable body")]
    Malformed {
        group: usize,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Default)]
pub struct FetchOutput {
    // Keyed by metric identifier.
    pub records: HashMap<String, MetricRecord>,
    pub failures: Vec<PartialFailure>,
}

pub struct MultiFetcher<'a> {
    session: &'a Session,
    url: String,
    max_concurrent: usize,
}

impl<'a> MultiFetcher<'a> {
    pub fn new(session: &'a Session, url: String, max_concurrent: usize) -> Self {
        Self {
            session,
            url,
            max_concurrent: max_concurrent.max(1),
        }
    }

    /// Sends one request per group, at most `max_concurrent` at a time.
    /// Auth and transport failures abort the whole fetch; anything else
    /// only costs the group's data.
    pub fn fetch_all(
        &self,
        groups: &[Vec<String>],
        params: &FetchParams,
    ) -> Result<FetchOutput, QueryError> {
        let records: DashMap<String, MetricRecord> = DashMap::new();
        let failures = Mutex::new(vec![]);

        for (batch, chunk) in groups.chunks(self.max_concurrent).enumerate() {
            let results: Vec<Result<(), QueryError>> = thread::scope(|scope| {
                let handles: Vec<_> = chunk
                    .iter()
                    .enumerate()
                    .map(|(i, group)| {
                        let index = batch * self.max_concurrent + i;
                        let records = &records;
                        let failures = &failures;
                        scope.spawn(move || -> Result<(), QueryError> {
                            if let Some(failure) = self.fetch_group(index, group, params, records)? {
                                record_failure(failures, failure);
                            }
                            Ok(())
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| h.join().unwrap_or_else(|e| panic::resume_unwind(e)))
                    .collect()
            });
            for result in results {
                result?;
            }
        }

        Ok(FetchOutput {
            records: records.into_iter().collect(),
            failures: failures
                .into_inner()
                .unwrap_or_else(PoisonError::into_inner),
        })
    }

    fn fetch_group(
        &self,
        index: usize,
        group: &[String],
        params: &FetchParams,
        records: &DashMap<String, MetricRecord>,
    ) -> Result<Option<PartialFailure>, QueryError> {
        let body = serde_json::to_vec(&Payload {
            metrics: group,
            from: params.from_millis,
            to: params.to_millis,
            resolution: params.resolution,
            select: &params.select,
        })?;
        debug!("fetching request group {} ({} metrics)", index, group.len());

        let response = self.session.send(Method::Post, &self.url, Some(body))?;
        if !response.is_success() {
            return Ok(Some(PartialFailure::Status {
                group: index,
                status: response.status,
            }));
        }
        let parsed: MultiResponse = match serde_json::from_slice(&response.body) {
            Ok(parsed) => parsed,
            Err(source) => {
                return Ok(Some(PartialFailure::Malformed {
                    group: index,
                    source,
                }))
            }
        };

        for value in parsed.metrics {
            let record: MetricRecord = match serde_json::from_value(value) {
                Ok(record) => record,
                Err(e) => {
                    warn!("skipping malformed record in request group {}: {}", index, e);
                    continue;
                }
            };
            match records.entry(record.metric.clone()) {
                Entry::Occupied(mut existing) => existing.get_mut().data.extend(record.data),
                Entry::Vacant(slot) => {
                    slot.insert(record);
                }
            }
        }
        Ok(None)
    }
}

// A poisoned lock still holds every failure recorded so far, so keep
// appending to it.
fn record_failure(failures: &Mutex<Vec<PartialFailure>>, failure: PartialFailure) {
    warn!("{}", failure);
    failures
        .lock()
        .unwrap_or_else(PoisonError::into_inner)
        .push(failure);
}
