//! Title / page-id search, the ancestor reveal it drives, and the group
//! visibility filter used while a search is active.

use crate::catalog::{Catalog, PreOrder};
use crate::domain::{ContentGroup, ContentNode};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    title: String,
    page_id: String,
    title_lower: String,
}

impl SearchQuery {
    pub fn new(title: &str, page_id: &str) -> Self {
        let title = title.trim().to_string();
        let title_lower = title.to_lowercase();
        Self {
            title,
            page_id: page_id.trim().to_string(),
            title_lower,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn page_id(&self) -> &str {
        &self.page_id
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.page_id.is_empty()
    }

    /// Case-insensitive title containment AND case-sensitive id containment;
    /// an empty half always matches.
    pub fn matches(&self, node: &ContentNode) -> bool {
        let title_ok =
            self.title_lower.is_empty() || node.title.to_lowercase().contains(&self.title_lower);
        let id_ok = self.page_id.is_empty() || node.id.contains(&self.page_id);
        title_ok && id_ok
    }

    /// True if the node or anything below it matches.
    pub fn matches_subtree(&self, node: &ContentNode) -> bool {
        PreOrder::from_node(node).any(|n| self.matches(n))
    }

    pub fn matches_group(&self, group: &ContentGroup) -> bool {
        PreOrder::new(&group.pages).any(|n| self.matches(n))
    }
}

/// Groups and nodes that must be expanded to make every match visible.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RevealTargets {
    pub groups: BTreeSet<String>,
    pub nodes: BTreeSet<String>,
}

impl RevealTargets {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.nodes.is_empty()
    }
}

/// Only nodes that match directly contribute; their owning group and their
/// whole ancestor chain are collected. An empty query reveals nothing.
pub fn reveal_targets(catalog: &Catalog, query: &SearchQuery) -> RevealTargets {
    let mut targets = RevealTargets::default();
    if query.is_empty() {
        return targets;
    }

    let index = catalog.index();
    for node in catalog.nodes().filter(|node| query.matches(node)) {
        if let Some(group) = index.page_to_group.get(&node.id) {
            targets.groups.insert(group.clone());
        }
        targets
            .nodes
            .extend(index.ancestors(&node.id).map(str::to_string));
    }
    targets
}

/// Expanded groups and nodes. Search only ever adds to these.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpansionState {
    pub groups: BTreeSet<String>,
    pub nodes: BTreeSet<String>,
}

impl ExpansionState {
    pub fn is_group_expanded(&self, id: &str) -> bool {
        self.groups.contains(id)
    }

    pub fn is_node_expanded(&self, id: &str) -> bool {
        self.nodes.contains(id)
    }

    pub fn toggle_group(&mut self, id: &str) -> bool {
        toggle(&mut self.groups, id)
    }

    pub fn toggle_node(&mut self, id: &str) -> bool {
        toggle(&mut self.nodes, id)
    }

    /// Unions the targets in; never removes anything.
    pub fn reveal(&mut self, targets: RevealTargets) -> bool {
        let before = (self.groups.len(), self.nodes.len());
        self.groups.extend(targets.groups);
        self.nodes.extend(targets.nodes);
        before != (self.groups.len(), self.nodes.len())
    }

    pub fn collapse_all(&mut self) {
        self.groups.clear();
        self.nodes.clear();
    }
}

fn toggle(set: &mut BTreeSet<String>, id: &str) -> bool {
    if !set.remove(id) {
        set.insert(id.to_string());
        return true;
    }
    false
}

/// Groups to display: an optional exact group-id filter, then, when a search is
/// active, only groups with at least one matching node. Purely a view filter.
pub fn visible_groups<'a>(
    catalog: &'a Catalog,
    query: &SearchQuery,
    group_filter: Option<&str>,
) -> Vec<&'a ContentGroup> {
    catalog
        .groups()
        .iter()
        .filter(|group| group_filter.is_none_or(|id| group.id == id))
        .filter(|group| query.is_empty() || query.matches_group(group))
        .collect()
}
