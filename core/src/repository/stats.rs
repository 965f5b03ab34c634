//! Repository statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::codec::RecordMeta;
use crate::memento::contract::age_at;

/// Aggregate view of a repository. An empty repository yields the default
/// (all zero) value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryStatistics {
    pub total_mementos: usize,
    pub oldest_timestamp: Option<DateTime<Utc>>,
    pub newest_timestamp: Option<DateTime<Utc>>,
    pub total_size_bytes: u64,
    /// Mean age in seconds, evaluated at `computed_at`.
    pub average_age_secs: f64,
    pub compressed_count: usize,
    pub originator_counts: BTreeMap<String, usize>,
    pub computed_at: Option<DateTime<Utc>>,
}

impl RepositoryStatistics {
    pub fn from_records<'a>(
        records: impl IntoIterator<Item = &'a RecordMeta>,
        now: DateTime<Utc>,
    ) -> Self {
        let mut stats = Self::default();
        let mut age_total = 0f64;

        for record in records {
            stats.total_mementos += 1;
            stats.total_size_bytes += record.size_bytes;
            if record.compressed {
                stats.compressed_count += 1;
            }
            *stats
                .originator_counts
                .entry(record.originator_id.clone())
                .or_insert(0) += 1;

            stats.oldest_timestamp = Some(match stats.oldest_timestamp {
                Some(t) => t.min(record.timestamp),
                None => record.timestamp,
            });
            stats.newest_timestamp = Some(match stats.newest_timestamp {
                Some(t) => t.max(record.timestamp),
                None => record.timestamp,
            });
            age_total += age_at(record.timestamp, now).as_secs_f64();
        }

        if stats.total_mementos > 0 {
            stats.average_age_secs = age_total / stats.total_mementos as f64;
            stats.computed_at = Some(now);
        }
        stats
    }
}

/// Record with the greatest timestamp; ties go to the greater id so the
/// choice does not depend on iteration order.
pub fn latest_record<'a>(
    records: impl IntoIterator<Item = &'a RecordMeta>,
) -> Option<&'a RecordMeta> {
    records
        .into_iter()
        .max_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)))
}

/// Records in ascending timestamp order.
pub fn sorted_records<'a>(
    records: impl IntoIterator<Item = &'a RecordMeta>,
) -> Vec<&'a RecordMeta> {
    let mut sorted: Vec<_> = records.into_iter().collect();
    sorted.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    sorted
}
