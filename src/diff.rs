use crate::catalog::AncestorIndex;
use crate::ledger::SelectionLedger;
use std::collections::BTreeSet;

pub const DEFAULT_ADD_LIMIT: usize = 100;

/// Net change between the current selection and the last synchronized one.
///
/// Container ids are structural and never synchronized, so both sides are
/// reduced to real page ids before comparing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncDiff {
    pub to_add: BTreeSet<String>,
    pub to_remove: BTreeSet<String>,
    pub real_enabled: BTreeSet<String>,
    pub add_limit: usize,
}

/// The numbers the presentation layer needs to render and gate a sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DiffSummary {
    pub added_count: usize,
    pub removed_count: usize,
    pub final_total: usize,
    pub has_changes: bool,
    pub is_over_limit: bool,
}

impl SyncDiff {
    pub fn compute(
        ledger: &SelectionLedger,
        baseline: &SelectionLedger,
        index: &AncestorIndex,
        add_limit: usize,
    ) -> Self {
        let real_enabled = real_ids(ledger, index);
        let real_baseline = real_ids(baseline, index);

        let to_add = real_enabled.difference(&real_baseline).cloned().collect();
        let to_remove = real_baseline.difference(&real_enabled).cloned().collect();

        Self {
            to_add,
            to_remove,
            real_enabled,
            add_limit,
        }
    }

    pub fn summary(&self) -> DiffSummary {
        let added_count = self.to_add.len();
        let removed_count = self.to_remove.len();
        DiffSummary {
            added_count,
            removed_count,
            final_total: self.real_enabled.len(),
            has_changes: added_count > 0 || removed_count > 0,
            is_over_limit: added_count > self.add_limit,
        }
    }

    pub fn can_submit(&self) -> bool {
        let summary = self.summary();
        summary.has_changes && !summary.is_over_limit
    }

    /// How many additions must be dropped before a submission is allowed.
    pub fn required_reduction(&self) -> usize {
        self.to_add.len().saturating_sub(self.add_limit)
    }

    /// The full desired set of real page ids, as the sink expects it.
    pub fn payload(&self) -> Vec<String> {
        self.real_enabled.iter().cloned().collect()
    }
}

fn real_ids(ledger: &SelectionLedger, index: &AncestorIndex) -> BTreeSet<String> {
    ledger
        .ids()
        .iter()
        .filter(|id| !index.is_container(id))
        .cloned()
        .collect()
}
