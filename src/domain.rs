use std::fmt;

/// A page in the catalog. A page with children is a container, one without is a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentNode {
    pub id: String,
    pub title: String,
    pub parent_id: Option<String>,
    pub children: Vec<ContentNode>,
}

impl ContentNode {
    pub fn leaf(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            parent_id: None,
            children: Vec::new(),
        }
    }

    pub fn container(
        id: impl Into<String>,
        title: impl Into<String>,
        children: Vec<ContentNode>,
    ) -> Self {
        let id = id.into();
        let children = children
            .into_iter()
            .map(|mut child| {
                child.parent_id = Some(id.clone());
                child
            })
            .collect();
        Self {
            id,
            title: title.into(),
            parent_id: None,
            children,
        }
    }

    pub fn is_container(&self) -> bool {
        !self.children.is_empty()
    }
}

/// A top-level grouping of pages (a space).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentGroup {
    pub id: String,
    pub name: String,
    pub key: String,
    pub pages: Vec<ContentNode>,
}

/// Checkbox state derived from the ledger; never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ToggleState {
    pub checked: bool,
    pub indeterminate: bool,
}

impl ToggleState {
    pub const OFF: Self = Self {
        checked: false,
        indeterminate: false,
    };
    pub const ON: Self = Self {
        checked: true,
        indeterminate: false,
    };
    pub const PARTIAL: Self = Self {
        checked: false,
        indeterminate: true,
    };

    pub fn as_marker(self) -> &'static str {
        if self.indeterminate {
            "[~]"
        } else if self.checked {
            "[x]"
        } else {
            "[ ]"
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSummary {
    pub id: String,
    pub name: String,
    pub status: Option<String>,
}

impl fmt::Display for StoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.status {
            Some(status) => write!(f, "{} ({}) [{}]", self.name, self.id, status),
            None => write!(f, "{} ({})", self.name, self.id),
        }
    }
}

/// What the synchronization endpoint reported for one submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub success: bool,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    Ready,
    Failed(String),
}

impl LoadState {
    pub fn label(&self) -> &str {
        match self {
            LoadState::Idle => "no store",
            LoadState::Loading => "loading",
            LoadState::Ready => "ready",
            LoadState::Failed(_) => "load failed",
        }
    }
}
