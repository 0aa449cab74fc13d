//! Tri-state checkbox aggregation.
//!
//! A node's membership unit is its own id plus every id below it. The state is
//! off when none of those ids are enabled, on when all are, partial otherwise.
//! A group aggregates the union of its top-level pages' units.

use crate::catalog::PreOrder;
use crate::domain::{ContentGroup, ContentNode, ToggleState};
use crate::ledger::SelectionLedger;

pub fn node_state(node: &ContentNode, ledger: &SelectionLedger) -> ToggleState {
    if !node.is_container() {
        return if ledger.contains(&node.id) {
            ToggleState::ON
        } else {
            ToggleState::OFF
        };
    }
    aggregate(PreOrder::from_node(node), ledger)
}

pub fn group_state(group: &ContentGroup, ledger: &SelectionLedger) -> ToggleState {
    aggregate(PreOrder::new(&group.pages), ledger)
}

/// The enable/disable decision for a click on a checkbox in `state`.
///
/// Partial always resolves to enabled.
pub fn click_target(state: ToggleState) -> bool {
    if state.indeterminate {
        true
    } else {
        !state.checked
    }
}

fn aggregate<'a>(
    nodes: impl Iterator<Item = &'a ContentNode>,
    ledger: &SelectionLedger,
) -> ToggleState {
    let (total, enabled) = nodes.fold((0usize, 0usize), |(total, enabled), node| {
        (total + 1, enabled + usize::from(ledger.contains(&node.id)))
    });

    if enabled == 0 {
        ToggleState::OFF
    } else if enabled == total {
        ToggleState::ON
    } else {
        ToggleState::PARTIAL
    }
}
