use crate::catalog::{Catalog, PreOrder};
use crate::domain::ContentNode;
use std::collections::BTreeSet;

/// The set of node ids currently enabled.
///
/// Enabling a container records the container's own id plus every id in its
/// subtree, so the set may hold container ids. Those are bookkeeping for the
/// tri-state checkboxes and are filtered out before anything is synchronized.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionLedger {
    enabled: BTreeSet<String>,
    revision: u64,
}

impl SelectionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the ledger from previously synchronized page ids.
    ///
    /// Containers whose whole subtree is already present are added as well, so
    /// a fully synchronized container reads as on. Ids the catalog does not
    /// know are kept as-is.
    pub fn seeded<I, S>(catalog: &Catalog, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut enabled: BTreeSet<String> = ids.into_iter().map(Into::into).collect();

        let pre_order: Vec<&ContentNode> = catalog.nodes().collect();
        for node in pre_order.into_iter().rev() {
            // later duplicates of an id are not the indexed node
            let indexed = catalog
                .node(&node.id)
                .is_some_and(|first| std::ptr::eq(first, node));
            if indexed
                && node.is_container()
                && !enabled.contains(&node.id)
                && node.children.iter().all(|child| enabled.contains(&child.id))
            {
                enabled.insert(node.id.clone());
            }
        }

        Self {
            enabled,
            revision: 0,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.enabled.contains(id)
    }

    pub fn len(&self) -> usize {
        self.enabled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.enabled.is_empty()
    }

    pub fn ids(&self) -> &BTreeSet<String> {
        &self.enabled
    }

    /// Bumped on every mutation that actually changed membership.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Adds or removes one leaf. A container id is handled as a subtree
    /// toggle so the ledger never holds a container without its subtree.
    pub fn set_leaf_enabled(&mut self, catalog: &Catalog, id: &str, enabled: bool) -> bool {
        let Some(node) = catalog.node(id) else {
            return false;
        };
        if node.is_container() {
            return self.apply(PreOrder::from_node(node), enabled);
        }
        self.apply(std::iter::once(node), enabled)
    }

    /// Adds or removes the container and every node below it.
    pub fn set_container_enabled(&mut self, catalog: &Catalog, id: &str, enabled: bool) -> bool {
        let Some(node) = catalog.node(id) else {
            return false;
        };
        self.apply(PreOrder::from_node(node), enabled)
    }

    /// Applies the container rule to every top-level page of the group.
    pub fn set_group_enabled(&mut self, catalog: &Catalog, group_id: &str, enabled: bool) -> bool {
        let Some(group) = catalog.group(group_id) else {
            return false;
        };
        self.apply(PreOrder::new(&group.pages), enabled)
    }

    /// Replaces the whole membership, e.g. when a baseline is copied.
    pub fn replace_with(&mut self, other: &SelectionLedger) {
        if self.enabled != other.enabled {
            self.enabled = other.enabled.clone();
            self.revision += 1;
        }
    }

    fn apply<'a>(&mut self, nodes: impl Iterator<Item = &'a ContentNode>, enabled: bool) -> bool {
        let mut changed = false;
        for node in nodes {
            changed |= if enabled {
                self.enabled.insert(node.id.clone())
            } else {
                self.enabled.remove(&node.id)
            };
        }
        if changed {
            self.revision += 1;
        }
        changed
    }
}
