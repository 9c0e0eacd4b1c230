use std::collections::BTreeMap;

use replob_types::StepId;

use crate::record::StepRecord;

/// Tracks consensus steps and advances `current()` through them, but only
/// while they complete **in order**.
///
/// Ported from `Phantom<T>`'s step table: a step that completes out of
/// order (because gossip reordered a vote or commit) just sits in `records`
/// until every earlier step also completes, at which point `complete`
/// walks `current` forward past the whole contiguous run and drops the
/// finished records. A step is never re-opened once dropped this way.
#[derive(Debug, Default)]
pub struct StepTable {
    current: StepId,
    records: BTreeMap<StepId, StepRecord>,
}

impl StepTable {
    pub fn new() -> Self {
        Self {
            current: StepId::ZERO,
            records: BTreeMap::new(),
        }
    }

    pub fn current(&self) -> StepId {
        self.current
    }

    pub fn record(&self, step: StepId) -> Option<&StepRecord> {
        self.records.get(&step)
    }

    pub fn record_mut(&mut self, step: StepId) -> &mut StepRecord {
        self.records.entry(step).or_default()
    }

    /// Marks `step` completed. If `step == current()`, walks `current()`
    /// forward over every already-completed step that follows, dropping
    /// their records as it goes.
    pub fn complete(&mut self, step: StepId) {
        if let Some(record) = self.records.get_mut(&step) {
            record.mark_completed();
        }
        while let Some(record) = self.records.get(&self.current) {
            if !record.is_completed() {
                break;
            }
            self.records.remove(&self.current);
            self.current = self.current.next();
        }
    }

    /// Drops every tracked step and rewinds `current()` to zero — used when
    /// the node falls so far behind a removed-node re-sync that replaying
    /// every intermediate step isn't worth it (mirrors `Phantom::cleanup`).
    pub fn cleanup(&mut self) {
        self.records.clear();
        self.current = StepId::ZERO;
    }
}
