use crate::app::{App, BackendEvent, BackendTask, ModalState, PaneFocus, RevealRequest, SearchField};
use crate::debounce::Debouncer;
use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

pub(crate) fn send_task(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    task: BackendTask,
) -> Result<()> {
    app.task_started();
    task_tx
        .send(task)
        .map_err(|err| anyhow::anyhow!("failed to dispatch task: {err}"))
}

fn send_optional(
    app: &mut App,
    task_tx: &UnboundedSender<BackendTask>,
    task: Option<BackendTask>,
) -> Result<()> {
    match task {
        Some(task) => send_task(app, task_tx, task),
        None => Ok(()),
    }
}

pub(crate) fn handle_backend_event(app: &mut App, debouncer: &mut Debouncer, event: BackendEvent) {
    match event {
        BackendEvent::StoresListed { stores } => {
            app.task_finished();
            app.log(format!("found {} vector store(s)", stores.len()));
            app.apply_stores(stores);
        }
        BackendEvent::CatalogLoaded {
            store,
            groups,
            enabled_ids,
        } => {
            app.task_finished();
            app.apply_catalog_loaded(store, groups, enabled_ids);
            // a query typed during the load should reveal against the new tree
            if !app.query().is_empty() {
                app.apply_reveal();
            }
        }
        BackendEvent::CatalogFailed { store, message } => {
            app.task_finished();
            app.apply_catalog_failed(store, message);
        }
        BackendEvent::SyncFinished { store, outcome } => {
            app.task_finished();
            app.apply_sync_finished(store, outcome);
        }
        BackendEvent::RevealDue { generation } => {
            if debouncer.is_current(generation) {
                debouncer.settle();
                app.apply_reveal();
            } else {
                debug!(generation, "stale reveal dropped");
            }
        }
        BackendEvent::Error { context, message } => {
            app.task_finished();
            app.log(format!("error[{context}]: {message}"));
        }
    }
}

/// Turns the app's pending reveal request into a timer arm or cancel.
pub(crate) fn sync_reveal_timer(
    app: &mut App,
    debouncer: &mut Debouncer,
    event_tx: &UnboundedSender<BackendEvent>,
) {
    match app.take_reveal_request() {
        Some(RevealRequest::Arm) => {
            debouncer.arm(event_tx.clone(), |generation| BackendEvent::RevealDue {
                generation,
            });
        }
        Some(RevealRequest::Cancel) => debouncer.cancel(),
        None => {}
    }
}

pub(crate) fn handle_key_event(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        app.should_quit = true;
        return Ok(());
    }

    match app.modal.clone() {
        ModalState::None => handle_key_without_modal(app, key, task_tx),
        ModalState::Help => {
            handle_help_key(app, key);
            Ok(())
        }
        ModalState::Search { field, original } => {
            handle_search_key(app, key, field, original);
            Ok(())
        }
        ModalState::StorePicker { .. } => handle_store_picker_key(app, key, task_tx),
    }
}

fn handle_key_without_modal(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,
        KeyCode::Char('?') => app.open_help(),
        KeyCode::Tab => app.focus = app.focus.next(),
        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            PaneFocus::Tree => app.select_next(),
            PaneFocus::Log => {
                app.scroll_log_down(1);
            }
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            PaneFocus::Tree => app.select_prev(),
            PaneFocus::Log => {
                app.scroll_log_up(1);
            }
        },
        KeyCode::PageDown => {
            app.scroll_log_down(20);
        }
        KeyCode::PageUp => {
            app.scroll_log_up(20);
        }
        KeyCode::Char('d') if key.modifiers == KeyModifiers::CONTROL => {
            app.scroll_log_down(20);
        }
        KeyCode::Char('u') if key.modifiers == KeyModifiers::CONTROL => {
            app.scroll_log_up(20);
        }
        KeyCode::Char('l') | KeyCode::Right => {
            app.expand_selected();
        }
        KeyCode::Char('h') | KeyCode::Left => {
            app.collapse_selected_or_parent();
        }
        KeyCode::Enter => {
            app.toggle_selected_expansion();
        }
        KeyCode::Char(' ') if app.focus == PaneFocus::Tree => {
            app.toggle_selected_enabled();
        }
        KeyCode::Char('/') => app.open_search(SearchField::Title),
        KeyCode::Char('#') => app.open_search(SearchField::PageId),
        KeyCode::Char('g') => app.cycle_group_filter(),
        KeyCode::Esc if !app.query().is_empty() => app.clear_search(),
        KeyCode::Char('s') => {
            let task = app.request_sync();
            send_optional(app, task_tx, task)?;
        }
        KeyCode::Char('r') => {
            if app.store.is_none() {
                app.log("no vector store selected (press p)".to_string());
            } else {
                let task = app.reload();
                send_optional(app, task_tx, task)?;
            }
        }
        KeyCode::Char('p') => {
            app.open_store_picker();
            send_task(app, task_tx, BackendTask::ListStores)?;
        }
        _ => {}
    }

    Ok(())
}

fn handle_help_key(app: &mut App, key: KeyEvent) {
    if matches!(key.code, KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') | KeyCode::Char('?')) {
        app.close_modal();
    }
}

/// Typing filters live; the reveal timer is armed through the app's reveal request.
fn handle_search_key(app: &mut App, key: KeyEvent, field: SearchField, original: String) {
    match key.code {
        KeyCode::Esc => {
            app.set_search_text(field, original);
            app.close_modal();
        }
        KeyCode::Enter => app.close_modal(),
        KeyCode::Backspace => {
            let mut value = app.search_text(field).to_string();
            value.pop();
            app.set_search_text(field, value);
        }
        KeyCode::Char(c)
            if !key.modifiers.contains(KeyModifiers::CONTROL)
                && !key.modifiers.contains(KeyModifiers::ALT)
                && !key.modifiers.contains(KeyModifiers::SUPER) =>
        {
            let mut value = app.search_text(field).to_string();
            value.push(c);
            app.set_search_text(field, value);
        }
        _ => {}
    }
}

fn handle_store_picker_key(
    app: &mut App,
    key: KeyEvent,
    task_tx: &UnboundedSender<BackendTask>,
) -> Result<()> {
    let ModalState::StorePicker { selected } = app.modal else {
        return Ok(());
    };
    let len = app.stores.len();

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => app.close_modal(),
        KeyCode::Char('j') | KeyCode::Down if len > 0 => {
            app.modal = ModalState::StorePicker {
                selected: (selected + 1) % len,
            };
        }
        KeyCode::Char('k') | KeyCode::Up if len > 0 => {
            app.modal = ModalState::StorePicker {
                selected: if selected == 0 { len - 1 } else { selected - 1 },
            };
        }
        KeyCode::Char('r') => send_task(app, task_tx, BackendTask::ListStores)?,
        KeyCode::Enter => {
            let Some(store) = app.stores.get(selected).map(|s| s.id.clone()) else {
                app.log("no vector store to select".to_string());
                return Ok(());
            };
            app.close_modal();
            app.config.default_store = Some(store.clone());
            let task = app.switch_target(&store);
            send_optional(app, task_tx, task)?;
        }
        _ => {}
    }

    Ok(())
}
