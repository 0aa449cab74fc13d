//! Read-only tree model of the catalog plus the lookup tables derived from it.
//!
//! `Catalog` is built once per load and never patched: when the groups
//! change, a new `Catalog` is constructed and the old one dropped.

use crate::domain::{ContentGroup, ContentNode};
use std::collections::{HashMap, HashSet};

/// Derived lookups over the whole catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AncestorIndex {
    /// Immediate parent of every non-top-level node.
    pub page_to_parent: HashMap<String, String>,
    /// Owning group of every node.
    pub page_to_group: HashMap<String, String>,
    /// Nodes with at least one child.
    pub container_ids: HashSet<String>,
}

impl AncestorIndex {
    /// Ancestors of `id`, nearest first.
    pub fn ancestors<'a>(&'a self, id: &str) -> Ancestors<'a> {
        Ancestors {
            index: self,
            next: self.page_to_parent.get(id).map(String::as_str),
        }
    }

    pub fn is_container(&self, id: &str) -> bool {
        self.container_ids.contains(id)
    }
}

pub struct Ancestors<'a> {
    index: &'a AncestorIndex,
    next: Option<&'a str>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.index.page_to_parent.get(current).map(String::as_str);
        Some(current)
    }
}

/// Pre-order walk over a forest with an explicit work list.
pub struct PreOrder<'a> {
    stack: Vec<&'a ContentNode>,
}

impl<'a> PreOrder<'a> {
    pub fn new(forest: &'a [ContentNode]) -> Self {
        Self {
            stack: forest.iter().rev().collect(),
        }
    }

    pub fn from_node(node: &'a ContentNode) -> Self {
        Self { stack: vec![node] }
    }
}

impl<'a> Iterator for PreOrder<'a> {
    type Item = &'a ContentNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NodeLocation {
    group: usize,
    path: Vec<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    groups: Vec<ContentGroup>,
    index: AncestorIndex,
    locations: HashMap<String, NodeLocation>,
    group_positions: HashMap<String, usize>,
}

impl Catalog {
    /// Builds the index in a single pre-order pass, groups in catalog order.
    ///
    /// Ids are assumed unique. When they are not, the first occurrence wins and
    /// later duplicates are ignored for lookup purposes.
    pub fn new(groups: Vec<ContentGroup>) -> Self {
        let mut index = AncestorIndex::default();
        let mut locations = HashMap::new();
        let mut group_positions = HashMap::new();

        for (group_pos, group) in groups.iter().enumerate() {
            group_positions.entry(group.id.clone()).or_insert(group_pos);

            let mut stack: Vec<(&ContentNode, Option<&str>, Vec<usize>)> = group
                .pages
                .iter()
                .enumerate()
                .rev()
                .map(|(i, page)| (page, None, vec![i]))
                .collect();

            while let Some((node, parent, path)) = stack.pop() {
                for (i, child) in node.children.iter().enumerate().rev() {
                    let mut child_path = path.clone();
                    child_path.push(i);
                    stack.push((child, Some(node.id.as_str()), child_path));
                }

                if locations.contains_key(&node.id) {
                    continue;
                }
                index
                    .page_to_group
                    .insert(node.id.clone(), group.id.clone());
                if let Some(parent) = parent {
                    index
                        .page_to_parent
                        .insert(node.id.clone(), parent.to_string());
                }
                if node.is_container() {
                    index.container_ids.insert(node.id.clone());
                }
                locations.insert(
                    node.id.clone(),
                    NodeLocation {
                        group: group_pos,
                        path,
                    },
                );
            }
        }

        Self {
            groups,
            index,
            locations,
            group_positions,
        }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn groups(&self) -> &[ContentGroup] {
        &self.groups
    }

    pub fn index(&self) -> &AncestorIndex {
        &self.index
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.locations.len()
    }

    pub fn group(&self, id: &str) -> Option<&ContentGroup> {
        self.group_positions
            .get(id)
            .and_then(|pos| self.groups.get(*pos))
    }

    pub fn node(&self, id: &str) -> Option<&ContentNode> {
        let location = self.locations.get(id)?;
        let group = self.groups.get(location.group)?;
        let (first, rest) = location.path.split_first()?;
        let mut node = group.pages.get(*first)?;
        for i in rest {
            node = node.children.get(*i)?;
        }
        Some(node)
    }

    /// Every node of every group, pre-order.
    pub fn nodes(&self) -> impl Iterator<Item = &ContentNode> {
        self.groups.iter().flat_map(|group| PreOrder::new(&group.pages))
    }
}
