use std::collections::HashSet;

use thiserror::Error;

// Bytes each request spends on framing its metric list.
pub const REQUEST_OVERHEAD: usize = 5;
// Bytes each identifier costs on top of its own length (its quotes).
pub const ITEM_OVERHEAD: usize = 2;

#[derive(Error, Debug, PartialEq)]
pub enum BatchError {
    #[error("metric {metric:?} needs {len} bytes, more than the {max} allowed per request")]
    TooLarge {
        metric: String,
        len: usize,
        max: usize,
    },
}

/// Serialized length of a request carrying `metrics`.
pub fn serialized_len<S: AsRef<str>>(metrics: &[S]) -> usize {
    REQUEST_OVERHEAD
        + metrics
            .iter()
            .map(|m| m.as_ref().len() + ITEM_OVERHEAD)
            .sum::<usize>()
}

/// Drops repeated identifiers, keeping the first occurrence of each.
pub fn unique<'a, I>(metrics: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut seen = HashSet::new();
    metrics.into_iter().filter(|m| seen.insert(*m)).collect()
}

/// Splits `metrics` into request groups of at most `max_count` identifiers
/// and at most `max_len` serialized bytes, in input order. Each group is
/// filled greedily before the next one is started.
pub fn pack<S: AsRef<str>>(
    metrics: &[S],
    max_count: usize,
    max_len: usize,
) -> Result<Vec<Vec<String>>, BatchError> {
    let mut groups: Vec<Vec<String>> = vec![];
    let mut current: Vec<String> = vec![];
    let mut current_len = REQUEST_OVERHEAD;

    for metric in metrics {
        let metric = metric.as_ref();
        let item_len = metric.len() + ITEM_OVERHEAD;
        if REQUEST_OVERHEAD + item_len > max_len {
            // No grouping can fit this one.
            return Err(BatchError::TooLarge {
                metric: metric.to_string(),
                len: REQUEST_OVERHEAD + item_len,
                max: max_len,
            });
        }
        if !current.is_empty() && (current.len() >= max_count || current_len + item_len > max_len)
        {
            groups.push(std::mem::take(&mut current));
            current_len = REQUEST_OVERHEAD;
        }
        current.push(metric.to_string());
        current_len += item_len;
    }
    if !current.is_empty() {
        groups.push(current);
    }
    Ok(groups)
}
