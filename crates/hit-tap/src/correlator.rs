//! Pending-hit store keyed by the literal request URL.
//!
//! Two in-flight hits with byte-identical URLs share a key: the later offer replaces the
//! earlier one, which then never produces a row.

use std::collections::HashMap;

use hitaudit_core_types::{CorrelatedHit, PendingEntry, ResponseRecord};

struct Slot {
    seq: u64,
    entry: PendingEntry,
}

#[derive(Default)]
pub struct Correlator {
    entries: HashMap<String, Slot>,
    next_seq: u64,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the pending entry for `url`, returning the displaced entry.
    pub fn offer(&mut self, url: impl Into<String>, entry: PendingEntry) -> Option<PendingEntry> {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.entries
            .insert(url.into(), Slot { seq, entry })
            .map(|slot| slot.entry)
    }

    /// Remove the entry for `url` and merge it with `response`.
    pub fn resolve(&mut self, url: &str, response: ResponseRecord) -> Option<CorrelatedHit> {
        self.entries.remove(url).map(|slot| CorrelatedHit {
            request: slot.entry,
            response,
        })
    }

    /// Remove every unresolved URL, oldest offer first.
    pub fn drain_unmatched(&mut self) -> Vec<String> {
        let mut pending: Vec<(u64, String)> = self
            .entries
            .drain()
            .map(|(url, slot)| (slot.seq, url))
            .collect();
        pending.sort_unstable_by_key(|(seq, _)| *seq);
        pending.into_iter().map(|(_, url)| url).collect()
    }

    pub fn contains(&self, url: &str) -> bool {
        self.entries.contains_key(url)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
