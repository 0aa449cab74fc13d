use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::diff::{DiffSummary, SyncDiff};
use crate::domain::{ContentGroup, ContentNode, LoadState, StoreSummary, SyncOutcome, ToggleState};
use crate::ledger::SelectionLedger;
use crate::search::{ExpansionState, SearchQuery, reveal_targets, visible_groups};
use crate::session::{CachedCatalog, SessionCache};
use crate::tristate::{click_target, group_state, node_state};
use std::collections::HashMap;
use tracing::{debug, info, warn};

const MAX_LOG_LINES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneFocus {
    Tree,
    Log,
}

impl PaneFocus {
    pub fn next(self) -> Self {
        match self {
            Self::Tree => Self::Log,
            Self::Log => Self::Tree,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchField {
    Title,
    PageId,
}

impl SearchField {
    pub fn label(self) -> &'static str {
        match self {
            SearchField::Title => "title",
            SearchField::PageId => "page id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModalState {
    None,
    Help,
    Search {
        field: SearchField,
        original: String,
    },
    StorePicker {
        selected: usize,
    },
}

#[derive(Debug, Clone)]
pub enum BackendTask {
    ListStores,
    LoadCatalog { store: String },
    Sync { store: String, page_ids: Vec<String> },
}

#[derive(Debug, Clone)]
pub enum BackendEvent {
    StoresListed {
        stores: Vec<StoreSummary>,
    },
    CatalogLoaded {
        store: String,
        groups: Vec<ContentGroup>,
        enabled_ids: Vec<String>,
    },
    CatalogFailed {
        store: String,
        message: String,
    },
    SyncFinished {
        store: String,
        outcome: SyncOutcome,
    },
    RevealDue {
        generation: u64,
    },
    Error {
        context: String,
        message: String,
    },
}

/// What the event loop should do with the reveal timer after an edit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealRequest {
    Arm,
    Cancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowKind {
    Group,
    Node,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub kind: RowKind,
    pub id: String,
    pub title: String,
    pub depth: usize,
    pub has_children: bool,
    pub expanded: bool,
    pub state: ToggleState,
}

pub struct App {
    pub config: AppConfig,
    pub focus: PaneFocus,
    pub store: Option<String>,
    pub load_state: LoadState,
    pub stores: Vec<StoreSummary>,
    pub selected_index: usize,
    list_scroll: usize,
    pub logs: Vec<String>,
    pub log_tail_offset: usize,
    pub modal: ModalState,
    pub should_quit: bool,
    pending_tasks: usize,
    // store -> submitted page ids, until the sink answers
    syncs: HashMap<String, Vec<String>>,
    catalog: Catalog,
    ledger: SelectionLedger,
    baseline: SelectionLedger,
    diff: SyncDiff,
    expansion: ExpansionState,
    title_query: String,
    page_id_query: String,
    group_filter: Option<String>,
    cache: SessionCache,
    reveal_request: Option<RevealRequest>,
    rows: Vec<TreeRow>,
}

impl App {
    pub fn new(config: AppConfig) -> Self {
        let diff = SyncDiff {
            add_limit: config.add_limit,
            ..SyncDiff::default()
        };
        Self {
            config,
            focus: PaneFocus::Tree,
            store: None,
            load_state: LoadState::Idle,
            stores: Vec::new(),
            selected_index: 0,
            list_scroll: 0,
            logs: Vec::new(),
            log_tail_offset: 0,
            modal: ModalState::None,
            should_quit: false,
            pending_tasks: 0,
            syncs: HashMap::new(),
            catalog: Catalog::empty(),
            ledger: SelectionLedger::new(),
            baseline: SelectionLedger::new(),
            diff,
            expansion: ExpansionState::default(),
            title_query: String::new(),
            page_id_query: String::new(),
            group_filter: None,
            cache: SessionCache::new(),
            reveal_request: None,
            rows: Vec::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn ledger(&self) -> &SelectionLedger {
        &self.ledger
    }

    pub fn baseline(&self) -> &SelectionLedger {
        &self.baseline
    }

    pub fn diff(&self) -> &SyncDiff {
        &self.diff
    }

    pub fn diff_summary(&self) -> DiffSummary {
        self.diff.summary()
    }

    pub fn expansion(&self) -> &ExpansionState {
        &self.expansion
    }

    pub fn visible_rows(&self) -> &[TreeRow] {
        &self.rows
    }

    pub fn selected_row(&self) -> Option<&TreeRow> {
        self.rows.get(self.selected_index)
    }

    pub fn query(&self) -> SearchQuery {
        SearchQuery::new(&self.title_query, &self.page_id_query)
    }

    pub fn title_query(&self) -> &str {
        &self.title_query
    }

    pub fn page_id_query(&self) -> &str {
        &self.page_id_query
    }

    pub fn group_filter(&self) -> Option<&str> {
        self.group_filter.as_deref()
    }

    pub fn cache(&self) -> &SessionCache {
        &self.cache
    }

    /// True while any dispatched task has not reported back.
    pub fn is_busy(&self) -> bool {
        self.pending_tasks > 0
    }

    pub fn task_started(&mut self) {
        self.pending_tasks += 1;
    }

    pub fn task_finished(&mut self) {
        self.pending_tasks = self.pending_tasks.saturating_sub(1);
    }

    /// A sync for the active store is waiting on the sink.
    pub fn is_syncing(&self) -> bool {
        self.store
            .as_deref()
            .is_some_and(|store| self.syncs.contains_key(store))
    }

    /// Drops everything tied to the previous store and starts loading `store`.
    pub fn switch_target(&mut self, store: &str) -> Option<BackendTask> {
        let same_store = self.store.as_deref() == Some(store);
        if same_store && self.load_state == LoadState::Ready {
            return None;
        }
        if !same_store {
            info!(store, "switching target store");
            self.store = Some(store.to_string());
            self.group_filter = None;
            self.install(Vec::new(), Vec::new());
            self.load_state = LoadState::Idle;
        }
        self.request_load()
    }

    /// Seeds from the session cache when possible, otherwise claims the fetch
    /// slot for the store. A second request while one is outstanding is dropped.
    pub fn request_load(&mut self) -> Option<BackendTask> {
        let store = self.store.clone()?;

        if let Some(cached) = self.cache.get(&store).cloned() {
            debug!(%store, "catalog served from session cache");
            self.install(cached.groups, cached.enabled_ids);
            return None;
        }

        if !self.cache.begin_fetch(&store) {
            self.load_state = LoadState::Loading;
            self.log(format!("load for {store} already in progress"));
            return None;
        }

        self.load_state = LoadState::Loading;
        Some(BackendTask::LoadCatalog { store })
    }

    pub fn reload(&mut self) -> Option<BackendTask> {
        let store = self.store.clone()?;
        if self.cache.is_in_flight(&store) {
            self.log(format!("load for {store} already in progress"));
            return None;
        }
        self.cache.invalidate(&store);
        self.request_load()
    }

    pub fn apply_catalog_loaded(
        &mut self,
        store: String,
        groups: Vec<ContentGroup>,
        enabled_ids: Vec<String>,
    ) {
        self.cache.finish_fetch(&store);
        self.cache.set(
            &store,
            CachedCatalog {
                groups: groups.clone(),
                enabled_ids: enabled_ids.clone(),
            },
        );

        if self.store.as_deref() != Some(store.as_str()) {
            debug!(%store, "catalog for inactive store cached only");
            return;
        }

        self.install(groups, enabled_ids);
        self.log(format!(
            "loaded {} group(s), {} page(s); {} synchronized",
            self.catalog.groups().len(),
            self.catalog.node_count(),
            self.diff.summary().final_total
        ));
    }

    pub fn apply_catalog_failed(&mut self, store: String, message: String) {
        self.cache.finish_fetch(&store);
        if self.store.as_deref() != Some(store.as_str()) {
            return;
        }
        warn!(%store, %message, "catalog load failed");
        self.install(Vec::new(), Vec::new());
        self.load_state = LoadState::Failed(message.clone());
        self.log(format!("error[load]: {message}"));
    }

    fn install(&mut self, groups: Vec<ContentGroup>, enabled_ids: Vec<String>) {
        self.catalog = Catalog::new(groups);
        self.ledger = SelectionLedger::seeded(&self.catalog, enabled_ids);
        self.baseline = self.ledger.clone();
        self.expansion.collapse_all();
        self.load_state = LoadState::Ready;
        self.selected_index = 0;
        self.list_scroll = 0;
        self.refresh_diff();
        self.rebuild_rows();
    }

    pub fn apply_stores(&mut self, stores: Vec<StoreSummary>) {
        self.stores = stores;
        if let ModalState::StorePicker { selected } = &mut self.modal
            && *selected >= self.stores.len()
        {
            *selected = 0;
        }
    }

    /// Applies the checkbox click rule to the selected row.
    pub fn toggle_selected_enabled(&mut self) -> bool {
        if self.is_syncing() {
            self.log("selection is locked while a sync is running".to_string());
            return false;
        }
        let Some(row) = self.selected_row().cloned() else {
            return false;
        };

        let enable = click_target(row.state);
        let changed = match row.kind {
            RowKind::Group => self.ledger.set_group_enabled(&self.catalog, &row.id, enable),
            RowKind::Node if row.has_children => {
                self.ledger
                    .set_container_enabled(&self.catalog, &row.id, enable)
            }
            RowKind::Node => self.ledger.set_leaf_enabled(&self.catalog, &row.id, enable),
        };

        if changed {
            debug!(
                id = %row.id,
                enable,
                revision = self.ledger.revision(),
                enabled = self.ledger.len(),
                "selection changed"
            );
            self.refresh_diff();
            self.rebuild_rows();
        }
        changed
    }

    fn refresh_diff(&mut self) {
        self.diff = SyncDiff::compute(
            &self.ledger,
            &self.baseline,
            self.catalog.index(),
            self.config.add_limit,
        );
    }

    /// Builds the sync task when the diff allows it; logs why not otherwise.
    pub fn request_sync(&mut self) -> Option<BackendTask> {
        let store = self.store.clone()?;
        if self.load_state != LoadState::Ready {
            self.log("nothing to sync: catalog is not loaded".to_string());
            return None;
        }
        if self.is_syncing() {
            self.log("sync already running".to_string());
            return None;
        }

        let summary = self.diff.summary();
        if !self.diff.can_submit() {
            if summary.is_over_limit {
                self.log(format!(
                    "too many additions: {} exceeds the limit of {}; deselect at least {} page(s)",
                    summary.added_count,
                    self.diff.add_limit,
                    self.diff.required_reduction()
                ));
            } else {
                self.log("no changes to sync".to_string());
            }
            return None;
        }

        info!(
            %store,
            added = summary.added_count,
            removed = summary.removed_count,
            total = summary.final_total,
            "sync requested"
        );
        let page_ids = self.diff.payload();
        self.syncs.insert(store.clone(), page_ids.clone());
        Some(BackendTask::Sync { store, page_ids })
    }

    /// The cache learns a successful sync for any store; only the active
    /// store's ledger and baseline move.
    pub fn apply_sync_finished(&mut self, store: String, outcome: SyncOutcome) {
        let submitted = self.syncs.remove(&store);
        if outcome.success
            && let Some(page_ids) = &submitted
        {
            self.cache.record_synced(&store, page_ids.clone());
        }

        if self.store.as_deref() != Some(store.as_str()) {
            warn!(%store, success = outcome.success, "sync result for inactive store");
            return;
        }

        if outcome.success {
            if let Some(page_ids) = submitted {
                let synced = SelectionLedger::seeded(&self.catalog, page_ids);
                self.ledger.replace_with(&synced);
                self.baseline.replace_with(&synced);
            } else {
                self.baseline.replace_with(&self.ledger);
            }
            self.refresh_diff();
            self.rebuild_rows();
            let total = self.diff.summary().final_total;
            self.log(format!("sync completed: {total} page(s) synchronized"));
        } else {
            let message = outcome
                .message
                .unwrap_or_else(|| "failed to sync pages".to_string());
            self.log(format!("sync failed: {message}"));
        }
    }

    pub fn set_search_text(&mut self, field: SearchField, value: String) {
        match field {
            SearchField::Title => self.title_query = value,
            SearchField::PageId => self.page_id_query = value,
        }
        self.reveal_request = Some(if self.query().is_empty() {
            RevealRequest::Cancel
        } else {
            RevealRequest::Arm
        });
        self.rebuild_rows();
    }

    pub fn search_text(&self, field: SearchField) -> &str {
        match field {
            SearchField::Title => &self.title_query,
            SearchField::PageId => &self.page_id_query,
        }
    }

    pub fn clear_search(&mut self) {
        self.title_query.clear();
        self.page_id_query.clear();
        self.reveal_request = Some(RevealRequest::Cancel);
        self.rebuild_rows();
    }

    pub fn take_reveal_request(&mut self) -> Option<RevealRequest> {
        self.reveal_request.take()
    }

    /// Expands the groups and ancestors of every current match.
    pub fn apply_reveal(&mut self) -> bool {
        let query = self.query();
        if query.is_empty() || self.catalog.is_empty() {
            return false;
        }
        let targets = reveal_targets(&self.catalog, &query);
        if targets.is_empty() {
            return false;
        }
        debug!(
            title = query.title(),
            page_id = query.page_id(),
            groups = targets.groups.len(),
            nodes = targets.nodes.len(),
            "revealing matches"
        );
        let changed = self.expansion.reveal(targets);
        if changed {
            self.rebuild_rows();
        }
        changed
    }

    /// Steps through: all groups, then each group on its own.
    pub fn cycle_group_filter(&mut self) {
        let groups = self.catalog.groups();
        self.group_filter = match &self.group_filter {
            None => groups.first().map(|g| g.id.clone()),
            Some(current) => groups
                .iter()
                .position(|g| &g.id == current)
                .and_then(|pos| groups.get(pos + 1))
                .map(|g| g.id.clone()),
        };
        self.selected_index = 0;
        self.rebuild_rows();
    }

    pub fn expand_selected(&mut self) -> bool {
        let Some(row) = self.selected_row().cloned() else {
            return false;
        };
        if !row.has_children || row.expanded {
            return false;
        }
        self.toggle_row_expansion(&row);
        true
    }

    pub fn toggle_selected_expansion(&mut self) -> bool {
        let Some(row) = self.selected_row().cloned() else {
            return false;
        };
        if !row.has_children {
            return false;
        }
        self.toggle_row_expansion(&row);
        true
    }

    /// Collapses the selected row, or moves to and collapses its parent.
    pub fn collapse_selected_or_parent(&mut self) -> bool {
        let Some(row) = self.selected_row().cloned() else {
            return false;
        };
        if row.has_children && row.expanded {
            self.toggle_row_expansion(&row);
            return true;
        }
        if row.kind == RowKind::Group {
            return false;
        }

        let index = self.catalog.index();
        let parent = match index.page_to_parent.get(&row.id) {
            Some(parent) => (RowKind::Node, parent.clone()),
            None => match index.page_to_group.get(&row.id) {
                Some(group) => (RowKind::Group, group.clone()),
                None => return false,
            },
        };
        match parent.0 {
            RowKind::Group => self.expansion.toggle_group(&parent.1),
            RowKind::Node => self.expansion.toggle_node(&parent.1),
        };
        self.rebuild_rows_with_selection(Some(parent));
        true
    }

    fn toggle_row_expansion(&mut self, row: &TreeRow) {
        match row.kind {
            RowKind::Group => self.expansion.toggle_group(&row.id),
            RowKind::Node => self.expansion.toggle_node(&row.id),
        };
        self.rebuild_rows_with_selection(Some((row.kind, row.id.clone())));
    }

    pub fn rebuild_rows(&mut self) {
        let selected = self.selected_row().map(|row| (row.kind, row.id.clone()));
        self.rebuild_rows_with_selection(selected);
    }

    fn rebuild_rows_with_selection(&mut self, preferred: Option<(RowKind, String)>) {
        let query = self.query();
        let mut rows = Vec::new();

        for group in visible_groups(&self.catalog, &query, self.group_filter.as_deref()) {
            let expanded = self.expansion.is_group_expanded(&group.id);
            rows.push(TreeRow {
                kind: RowKind::Group,
                id: group.id.clone(),
                title: group.name.clone(),
                depth: 0,
                has_children: !group.pages.is_empty(),
                expanded,
                state: group_state(group, &self.ledger),
            });
            if expanded {
                self.push_node_rows(&group.pages, &query, &mut rows);
            }
        }

        self.rows = rows;

        if let Some((kind, id)) = preferred
            && let Some(idx) = self
                .rows
                .iter()
                .position(|row| row.kind == kind && row.id == id)
        {
            self.selected_index = idx;
            return;
        }
        self.sync_selection_bounds();
    }

    fn push_node_rows(&self, pages: &[ContentNode], query: &SearchQuery, out: &mut Vec<TreeRow>) {
        let mut stack: Vec<(&ContentNode, usize)> = pages.iter().rev().map(|p| (p, 1)).collect();

        while let Some((node, depth)) = stack.pop() {
            if !query.is_empty() && !query.matches_subtree(node) {
                continue;
            }
            let expanded = self.expansion.is_node_expanded(&node.id);
            out.push(TreeRow {
                kind: RowKind::Node,
                id: node.id.clone(),
                title: node.title.clone(),
                depth,
                has_children: node.is_container(),
                expanded,
                state: node_state(node, &self.ledger),
            });
            if node.is_container() && expanded {
                stack.extend(node.children.iter().rev().map(|c| (c, depth + 1)));
            }
        }
    }

    pub fn select_next(&mut self) {
        let len = self.rows.len();
        if len == 0 {
            self.selected_index = 0;
            return;
        }
        self.selected_index = (self.selected_index + 1) % len;
    }

    pub fn select_prev(&mut self) {
        let len = self.rows.len();
        if len == 0 {
            self.selected_index = 0;
            return;
        }
        if self.selected_index == 0 {
            self.selected_index = len - 1;
        } else {
            self.selected_index -= 1;
        }
    }

    pub fn list_scroll(&self) -> usize {
        self.list_scroll
    }

    pub fn sync_list_scroll(&mut self, viewport_rows: usize) {
        let len = self.rows.len();
        if len == 0 {
            self.list_scroll = 0;
            return;
        }

        let rows = viewport_rows.max(1);
        if self.selected_index < self.list_scroll {
            self.list_scroll = self.selected_index;
        } else if self.selected_index >= self.list_scroll + rows {
            self.list_scroll = self.selected_index + 1 - rows;
        }

        let max_offset = len.saturating_sub(rows);
        if self.list_scroll > max_offset {
            self.list_scroll = max_offset;
        }
    }

    pub fn sync_selection_bounds(&mut self) {
        let len = self.rows.len();
        if len == 0 {
            self.selected_index = 0;
            self.list_scroll = 0;
        } else if self.selected_index >= len {
            self.selected_index = len - 1;
        }
    }

    pub fn open_help(&mut self) {
        self.modal = ModalState::Help;
    }

    pub fn open_search(&mut self, field: SearchField) {
        self.modal = ModalState::Search {
            field,
            original: self.search_text(field).to_string(),
        };
    }

    pub fn open_store_picker(&mut self) {
        let selected = self
            .store
            .as_ref()
            .and_then(|current| self.stores.iter().position(|s| &s.id == current))
            .unwrap_or(0);
        self.modal = ModalState::StorePicker { selected };
    }

    pub fn close_modal(&mut self) {
        self.modal = ModalState::None;
    }

    pub fn log(&mut self, line: String) {
        self.logs.push(line);
        if self.log_tail_offset > 0 {
            self.log_tail_offset = self.log_tail_offset.saturating_add(1);
        }
        if self.logs.len() > MAX_LOG_LINES {
            let to_trim = self.logs.len() - MAX_LOG_LINES;
            self.logs.drain(0..to_trim);
        }
    }

    pub fn scroll_log_up(&mut self, lines: usize) -> bool {
        let before = self.log_tail_offset;
        self.log_tail_offset = self.log_tail_offset.saturating_add(lines);
        self.log_tail_offset != before
    }

    pub fn scroll_log_down(&mut self, lines: usize) -> bool {
        let before = self.log_tail_offset;
        self.log_tail_offset = self.log_tail_offset.saturating_sub(lines);
        self.log_tail_offset != before
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    pub(crate) fn sample_groups() -> Vec<ContentGroup> {
        vec![
            ContentGroup {
                id: "G".to_string(),
                name: "Group".to_string(),
                key: "GRP".to_string(),
                pages: vec![
                    ContentNode::container(
                        "P1",
                        "Parent page",
                        vec![
                            ContentNode::leaf("L1", "Install guide"),
                            ContentNode::leaf("L2", "Release notes"),
                        ],
                    ),
                    ContentNode::leaf("L3", "Overview"),
                ],
            },
            ContentGroup {
                id: "H".to_string(),
                name: "Handbook".to_string(),
                key: "HB".to_string(),
                pages: vec![ContentNode::leaf("M1", "Onboarding")],
            },
        ]
    }

    pub(crate) fn loaded_app(enabled: &[&str]) -> App {
        let mut app = App::new(AppConfig::default());
        let task = app.switch_target("vs_1");
        assert!(matches!(task, Some(BackendTask::LoadCatalog { .. })));
        app.apply_catalog_loaded(
            "vs_1".to_string(),
            sample_groups(),
            enabled.iter().map(|id| id.to_string()).collect(),
        );
        app
    }

    fn row_ids(app: &App) -> Vec<&str> {
        app.visible_rows().iter().map(|row| row.id.as_str()).collect()
    }

    fn select(app: &mut App, id: &str) {
        app.selected_index = app
            .visible_rows()
            .iter()
            .position(|row| row.id == id)
            .expect("row present");
    }

    #[test]
    fn load_seeds_ledger_and_baseline() {
        let app = loaded_app(&["L1", "L2"]);
        assert_eq!(app.load_state, LoadState::Ready);
        assert!(app.ledger().contains("P1"));
        assert_eq!(app.ledger(), app.baseline());
        assert!(!app.diff_summary().has_changes);
        assert_eq!(app.diff_summary().final_total, 2);
        assert_eq!(row_ids(&app), vec!["G", "H"]);
    }

    #[test]
    fn second_load_for_same_store_is_suppressed_while_in_flight() {
        let mut app = App::new(AppConfig::default());
        assert!(app.switch_target("vs_1").is_some());
        assert!(app.request_load().is_none());
        assert!(app.cache().is_in_flight("vs_1"));

        app.apply_catalog_loaded("vs_1".to_string(), sample_groups(), Vec::new());
        assert!(!app.cache().is_in_flight("vs_1"));
    }

    #[test]
    fn returning_to_a_store_mid_fetch_shows_loading() {
        let mut app = loaded_app(&[]);
        assert!(app.switch_target("vs_2").is_some());
        assert!(app.switch_target("vs_1").is_none());
        assert_eq!(app.load_state, LoadState::Ready);

        assert!(app.switch_target("vs_2").is_none());
        assert!(app.cache().is_in_flight("vs_2"));
        assert_eq!(app.load_state, LoadState::Loading);

        app.apply_catalog_loaded("vs_2".to_string(), sample_groups(), Vec::new());
        assert_eq!(app.load_state, LoadState::Ready);
    }

    #[test]
    fn cached_catalog_is_reused_without_fetch() {
        let mut app = loaded_app(&[]);
        assert!(app.switch_target("vs_2").is_some());
        app.apply_catalog_failed("vs_2".to_string(), "boom".to_string());
        assert!(matches!(app.load_state, LoadState::Failed(_)));
        assert!(app.catalog().is_empty());

        assert!(app.switch_target("vs_1").is_none());
        assert_eq!(app.load_state, LoadState::Ready);
        assert_eq!(app.catalog().node_count(), 5);
    }

    #[test]
    fn reselecting_the_loaded_store_keeps_edits() {
        let mut app = loaded_app(&[]);
        select(&mut app, "H");
        app.toggle_selected_enabled();

        assert!(app.switch_target("vs_1").is_none());
        assert!(app.ledger().contains("M1"));
        assert!(app.diff_summary().has_changes);
    }

    #[test]
    fn reload_invalidates_cache_and_fetches_again() {
        let mut app = loaded_app(&[]);
        assert!(matches!(
            app.reload(),
            Some(BackendTask::LoadCatalog { ref store }) if store == "vs_1"
        ));
    }

    #[test]
    fn result_for_other_store_is_cached_but_not_installed() {
        let mut app = loaded_app(&[]);
        app.apply_catalog_loaded("vs_9".to_string(), Vec::new(), Vec::new());
        assert_eq!(app.catalog().node_count(), 5);
        assert!(app.cache().get("vs_9").is_some());
    }

    #[test]
    fn clicking_partial_group_enables_everything() {
        let mut app = loaded_app(&["L1"]);
        select(&mut app, "G");
        assert_eq!(app.selected_row().map(|r| r.state), Some(ToggleState::PARTIAL));

        assert!(app.toggle_selected_enabled());
        assert_eq!(app.selected_row().map(|r| r.state), Some(ToggleState::ON));
        assert_eq!(app.diff_summary().added_count, 2);

        assert!(app.toggle_selected_enabled());
        assert_eq!(app.selected_row().map(|r| r.state), Some(ToggleState::OFF));
        assert_eq!(app.diff_summary().removed_count, 1);
    }

    #[test]
    fn container_row_toggles_subtree() {
        let mut app = loaded_app(&[]);
        select(&mut app, "G");
        assert!(app.expand_selected());
        assert_eq!(row_ids(&app), vec!["G", "P1", "L3", "H"]);

        select(&mut app, "P1");
        assert!(app.toggle_selected_enabled());
        assert!(app.ledger().contains("P1"));
        assert!(app.ledger().contains("L2"));
        let group = app.visible_rows().iter().find(|r| r.id == "G").expect("group row");
        assert_eq!(group.state, ToggleState::PARTIAL);
    }

    #[test]
    fn sync_is_refused_without_changes_or_over_limit() {
        let mut app = loaded_app(&[]);
        assert!(app.request_sync().is_none());

        app.config.add_limit = 2;
        select(&mut app, "G");
        app.toggle_selected_enabled();
        assert!(app.diff_summary().is_over_limit);
        assert!(app.request_sync().is_none());
        assert!(app.logs.iter().any(|line| line.contains("deselect at least 1")));
        assert!(!app.is_syncing());
    }

    #[test]
    fn successful_sync_collapses_baseline_onto_ledger() {
        let mut app = loaded_app(&["M1"]);
        select(&mut app, "G");
        app.toggle_selected_enabled();

        let Some(BackendTask::Sync { store, page_ids }) = app.request_sync() else {
            panic!("expected sync task");
        };
        assert_eq!(store, "vs_1");
        assert_eq!(page_ids, vec!["L1", "L2", "L3", "M1"]);
        assert!(app.is_syncing());
        assert!(!app.toggle_selected_enabled());

        app.apply_sync_finished(
            store,
            SyncOutcome {
                success: true,
                message: None,
            },
        );
        assert!(!app.is_syncing());
        assert_eq!(app.baseline(), app.ledger());
        assert!(app.baseline().contains("P1"));
        assert!(!app.diff_summary().has_changes);
        assert_eq!(
            app.cache().get("vs_1").map(|c| c.enabled_ids.len()),
            Some(4)
        );
    }

    #[test]
    fn failed_sync_keeps_diff_for_retry() {
        let mut app = loaded_app(&[]);
        select(&mut app, "H");
        app.toggle_selected_enabled();
        let before = app.diff().clone();

        let task = app.request_sync();
        assert!(task.is_some());
        app.apply_sync_finished(
            "vs_1".to_string(),
            SyncOutcome {
                success: false,
                message: Some("Error during ingestion".to_string()),
            },
        );

        assert_eq!(app.diff(), &before);
        assert!(app.baseline().is_empty());
        assert!(app.logs.iter().any(|l| l.contains("Error during ingestion")));
        assert!(app.request_sync().is_some());
    }

    #[test]
    fn sync_finishing_after_switching_away_is_kept_for_the_store() {
        let mut app = loaded_app(&[]);
        select(&mut app, "H");
        assert!(app.toggle_selected_enabled());
        assert!(app.request_sync().is_some());

        assert!(app.switch_target("vs_2").is_some());
        app.apply_sync_finished(
            "vs_1".to_string(),
            SyncOutcome {
                success: true,
                message: None,
            },
        );
        assert!(app.catalog().is_empty());

        assert!(app.switch_target("vs_1").is_none());
        assert!(app.ledger().contains("M1"));
        assert!(app.baseline().contains("M1"));
        assert!(!app.diff_summary().has_changes);
        assert!(app.request_sync().is_none());
    }

    #[test]
    fn failed_sync_for_inactive_store_leaves_cache_alone() {
        let mut app = loaded_app(&[]);
        select(&mut app, "H");
        app.toggle_selected_enabled();
        assert!(app.request_sync().is_some());

        assert!(app.switch_target("vs_2").is_some());
        app.apply_sync_finished(
            "vs_1".to_string(),
            SyncOutcome {
                success: false,
                message: None,
            },
        );

        assert_eq!(
            app.cache().get("vs_1").map(|c| c.enabled_ids.is_empty()),
            Some(true)
        );
    }

    #[test]
    fn sync_lock_applies_only_to_the_submitting_store() {
        let mut app = loaded_app(&[]);
        select(&mut app, "H");
        app.toggle_selected_enabled();
        assert!(app.request_sync().is_some());
        assert!(app.is_syncing());

        assert!(app.switch_target("vs_2").is_some());
        app.apply_catalog_loaded("vs_2".to_string(), sample_groups(), Vec::new());
        assert!(!app.is_syncing());
        select(&mut app, "G");
        assert!(app.toggle_selected_enabled());
        assert!(matches!(
            app.request_sync(),
            Some(BackendTask::Sync { ref store, .. }) if store == "vs_2"
        ));

        assert!(app.switch_target("vs_1").is_none());
        assert!(app.is_syncing());
        select(&mut app, "G");
        assert!(!app.toggle_selected_enabled());
    }

    #[test]
    fn pending_task_count_tracks_each_dispatch() {
        let mut app = App::new(AppConfig::default());
        assert!(!app.is_busy());

        app.task_started();
        app.task_started();
        app.task_finished();
        assert!(app.is_busy());

        app.task_finished();
        app.task_finished();
        assert!(!app.is_busy());
    }

    #[test]
    fn search_filters_rows_and_reveal_expands_ancestors() {
        let mut app = loaded_app(&[]);
        app.set_search_text(SearchField::Title, "release".to_string());
        assert_eq!(app.take_reveal_request(), Some(RevealRequest::Arm));
        assert_eq!(row_ids(&app), vec!["G"]);

        assert!(app.apply_reveal());
        assert_eq!(row_ids(&app), vec!["G", "P1", "L2"]);

        app.clear_search();
        assert_eq!(app.take_reveal_request(), Some(RevealRequest::Cancel));
        // expansion survives the search being cleared
        assert_eq!(row_ids(&app), vec!["G", "P1", "L1", "L2", "L3", "H"]);
    }

    #[test]
    fn reveal_with_empty_query_is_a_no_op() {
        let mut app = loaded_app(&[]);
        select(&mut app, "H");
        app.expand_selected();
        let before = app.expansion().clone();

        app.set_search_text(SearchField::PageId, "   ".to_string());
        assert_eq!(app.take_reveal_request(), Some(RevealRequest::Cancel));
        assert!(!app.apply_reveal());
        assert_eq!(app.expansion(), &before);
    }

    #[test]
    fn group_filter_cycles_through_groups() {
        let mut app = loaded_app(&[]);
        app.cycle_group_filter();
        assert_eq!(app.group_filter(), Some("G"));
        assert_eq!(row_ids(&app), vec!["G"]);
        app.cycle_group_filter();
        assert_eq!(row_ids(&app), vec!["H"]);
        app.cycle_group_filter();
        assert_eq!(app.group_filter(), None);
        assert_eq!(row_ids(&app), vec!["G", "H"]);
    }

    #[test]
    fn collapse_moves_to_parent() {
        let mut app = loaded_app(&[]);
        select(&mut app, "G");
        app.expand_selected();
        select(&mut app, "P1");
        app.expand_selected();
        select(&mut app, "L2");

        assert!(app.collapse_selected_or_parent());
        assert_eq!(app.selected_row().map(|r| r.id.as_str()), Some("P1"));
        assert_eq!(row_ids(&app), vec!["G", "P1", "L3", "H"]);
    }

    #[test]
    fn list_scroll_moves_only_at_view_edges() {
        let mut app = App::new(AppConfig::default());
        app.switch_target("vs_1");
        let groups = (0..20)
            .map(|i| ContentGroup {
                id: format!("g{i}"),
                name: format!("group {i}"),
                key: format!("K{i}"),
                pages: Vec::new(),
            })
            .collect();
        app.apply_catalog_loaded("vs_1".to_string(), groups, Vec::new());

        app.selected_index = 10;
        app.sync_list_scroll(5);
        assert_eq!(app.list_scroll(), 6);

        app.selected_index = 6;
        app.sync_list_scroll(5);
        assert_eq!(app.list_scroll(), 6);

        app.selected_index = 5;
        app.sync_list_scroll(5);
        assert_eq!(app.list_scroll(), 5);
    }

    #[test]
    fn log_preserves_manual_scroll_position_when_new_entries_arrive() {
        let mut app = App::new(AppConfig::default());
        app.scroll_log_up(4);
        app.log("line-1".to_string());
        app.log("line-2".to_string());
        assert_eq!(app.log_tail_offset, 6);
    }
}
