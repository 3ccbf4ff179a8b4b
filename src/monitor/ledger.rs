use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use crate::{monitor::classifier::classify, storage::entities::UsageRecord};

/// Per-application usage for the current day. The only place usage time is written.
#[derive(Debug, Default, Clone)]
pub struct AppUsageLedger {
    records: HashMap<String, UsageRecord>,
}

impl AppUsageLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: impl IntoIterator<Item = UsageRecord>) -> Self {
        Self {
            records: records
                .into_iter()
                .filter(|record| !record.identity.is_empty())
                .map(|record| (record.identity.clone(), record))
                .collect(),
        }
    }

    /// Marks `identity` as seen at `moment`, creating a zero-time record tagged by the
    /// classifier on first sight.
    pub fn touch(&mut self, identity: &str, moment: DateTime<Utc>) -> &mut UsageRecord {
        let record = self.records.entry(identity.to_string()).or_insert_with(|| {
            let category = classify(identity);
            debug!("New ledger entry {identity} ({category})");
            UsageRecord::new(identity.to_string(), category, moment)
        });
        record.last_active_at = moment;
        record
    }

    /// Adds `delta` of usage to `identity`. Negative deltas are ignored.
    pub fn accrue(&mut self, identity: &str, delta: Duration, moment: DateTime<Utc>) {
        let Ok(delta) = u64::try_from(delta.num_milliseconds()) else {
            return;
        };
        let record = self.touch(identity, moment);
        record.cumulative_time_ms = record.cumulative_time_ms.saturating_add(delta);
    }

    #[cfg(test)]
    pub fn get(&self, identity: &str) -> Option<&UsageRecord> {
        self.records.get(identity)
    }

    #[cfg(test)]
    pub fn total_ms(&self) -> u64 {
        self.records.values().map(|v| v.cumulative_time_ms).sum()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    /// Records ordered by cumulative time, most used first. Ties are ordered by identity so
    /// the output is stable.
    pub fn snapshot(&self) -> Vec<UsageRecord> {
        let mut usages = self.records.values().cloned().collect::<Vec<_>>();
        usages.sort_by(|a, b| {
            b.cumulative_time_ms
                .cmp(&a.cumulative_time_ms)
                .then_with(|| a.identity.cmp(&b.identity))
        });
        usages
    }
}
