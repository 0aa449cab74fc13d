use crate::app::{BackendEvent, BackendTask};
use crate::domain::SyncOutcome;
use crate::infra::CatalogBackend;
use std::sync::Arc;
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tracing::{debug, warn};

pub(crate) async fn worker_loop(
    backend: Arc<dyn CatalogBackend>,
    mut task_rx: UnboundedReceiver<BackendTask>,
    event_tx: UnboundedSender<BackendEvent>,
) {
    while let Some(task) = task_rx.recv().await {
        debug!(?task, "worker picked up task");
        let event = match task {
            BackendTask::ListStores => {
                let b = backend.clone();
                match tokio::task::spawn_blocking(move || b.list_stores()).await {
                    Ok(Ok(stores)) => BackendEvent::StoresListed { stores },
                    other => BackendEvent::Error {
                        context: "stores".to_string(),
                        message: format!("listing stores failed: {}", flatten_error(other)),
                    },
                }
            }
            BackendTask::LoadCatalog { store } => load_catalog(&backend, store).await,
            BackendTask::Sync { store, page_ids } => {
                let b = backend.clone();
                let store_for_worker = store.clone();
                let result =
                    tokio::task::spawn_blocking(move || b.submit(&store_for_worker, &page_ids))
                        .await;
                let outcome = match result {
                    Ok(Ok(outcome)) => outcome,
                    other => {
                        let message = flatten_error(other);
                        warn!(%store, %message, "sync request failed");
                        SyncOutcome {
                            success: false,
                            message: Some(message),
                        }
                    }
                };
                BackendEvent::SyncFinished { store, outcome }
            }
        };

        if event_tx.send(event).is_err() {
            break;
        }
    }

    // the last handle may own a blocking http client, which cannot drop on a runtime thread
    let _ = tokio::task::spawn_blocking(move || drop(backend)).await;
}

/// Fetches the tree and the synchronized ids; both must succeed.
async fn load_catalog(backend: &Arc<dyn CatalogBackend>, store: String) -> BackendEvent {
    let b1 = backend.clone();
    let key1 = store.clone();
    let catalog = tokio::task::spawn_blocking(move || b1.fetch_catalog(&key1)).await;
    let b2 = backend.clone();
    let key2 = store.clone();
    let selection = tokio::task::spawn_blocking(move || b2.fetch_current_selection(&key2)).await;

    match (catalog, selection) {
        (Ok(Ok(groups)), Ok(Ok(enabled_ids))) => BackendEvent::CatalogLoaded {
            store,
            groups,
            enabled_ids,
        },
        (c, s) => {
            let message = format!(
                "catalog={}, selection={}",
                flatten_error(c),
                flatten_error(s)
            );
            warn!(%store, %message, "catalog load failed");
            BackendEvent::CatalogFailed { store, message }
        }
    }
}

fn flatten_error<T>(res: std::result::Result<anyhow::Result<T>, tokio::task::JoinError>) -> String {
    match res {
        Ok(Ok(_)) => "ok".to_string(),
        Ok(Err(err)) => format!("{err:#}"),
        Err(err) => format!("join error: {err}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContentGroup, ContentNode, StoreSummary};
    use anyhow::{Result, bail};
    use std::sync::Mutex;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct FakeBackend {
        fail_selection: bool,
        fail_submit: bool,
        submitted: Mutex<Vec<(String, Vec<String>)>>,
    }

    impl CatalogBackend for FakeBackend {
        fn list_stores(&self) -> Result<Vec<StoreSummary>> {
            Ok(vec![StoreSummary {
                id: "vs_1".to_string(),
                name: "Docs".to_string(),
                status: None,
            }])
        }

        fn fetch_catalog(&self, _store: &str) -> Result<Vec<ContentGroup>> {
            Ok(vec![ContentGroup {
                id: "G".to_string(),
                name: "Group".to_string(),
                key: "GRP".to_string(),
                pages: vec![ContentNode::leaf("L1", "Leaf")],
            }])
        }

        fn fetch_current_selection(&self, _store: &str) -> Result<Vec<String>> {
            if self.fail_selection {
                bail!("HTTP 502");
            }
            Ok(vec!["L1".to_string()])
        }

        fn submit(&self, store: &str, page_ids: &[String]) -> Result<SyncOutcome> {
            if self.fail_submit {
                bail!("connection reset");
            }
            self.submitted
                .lock()
                .expect("lock")
                .push((store.to_string(), page_ids.to_vec()));
            Ok(SyncOutcome {
                success: true,
                message: Some("Pages synced successfully".to_string()),
            })
        }
    }

    async fn run(backend: Arc<FakeBackend>, tasks: Vec<BackendTask>) -> Vec<BackendEvent> {
        let (task_tx, task_rx) = mpsc::unbounded_channel();
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        for task in tasks {
            task_tx.send(task).expect("send task");
        }
        drop(task_tx);

        worker_loop(backend, task_rx, event_tx).await;

        let mut events = Vec::new();
        while let Ok(event) = event_rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[test]
    fn flatten_error_formats_all_cases() {
        let ok = flatten_error::<()>(Ok(Ok(())));
        assert_eq!(ok, "ok");

        let err = flatten_error::<()>(Ok(Err(anyhow::anyhow!("boom"))));
        assert!(err.contains("boom"));
    }

    #[tokio::test]
    async fn load_catalog_combines_both_fetches() {
        let events = run(
            Arc::new(FakeBackend::default()),
            vec![BackendTask::LoadCatalog {
                store: "vs_1".to_string(),
            }],
        )
        .await;

        match events.as_slice() {
            [
                BackendEvent::CatalogLoaded {
                    store,
                    groups,
                    enabled_ids,
                },
            ] => {
                assert_eq!(store, "vs_1");
                assert_eq!(groups.len(), 1);
                assert_eq!(enabled_ids, &vec!["L1".to_string()]);
            }
            other => panic!("unexpected events: {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_selection_fails_the_whole_load() {
        let backend = FakeBackend {
            fail_selection: true,
            ..FakeBackend::default()
        };
        let events = run(
            Arc::new(backend),
            vec![BackendTask::LoadCatalog {
                store: "vs_1".to_string(),
            }],
        )
        .await;

        assert!(matches!(
            events.as_slice(),
            [BackendEvent::CatalogFailed { message, .. }] if message.contains("HTTP 502")
        ));
    }

    #[tokio::test]
    async fn sync_transport_error_becomes_failed_outcome() {
        let backend = FakeBackend {
            fail_submit: true,
            ..FakeBackend::default()
        };
        let events = run(
            Arc::new(backend),
            vec![BackendTask::Sync {
                store: "vs_1".to_string(),
                page_ids: vec!["L1".to_string()],
            }],
        )
        .await;

        assert!(matches!(
            events.as_slice(),
            [BackendEvent::SyncFinished { outcome, .. }]
                if !outcome.success
                    && outcome.message.as_deref().is_some_and(|m| m.contains("connection reset"))
        ));
    }

    #[tokio::test]
    async fn tasks_are_processed_in_order() {
        let backend = Arc::new(FakeBackend::default());
        let events = run(
            backend.clone(),
            vec![
                BackendTask::ListStores,
                BackendTask::Sync {
                    store: "vs_1".to_string(),
                    page_ids: vec!["L1".to_string(), "L2".to_string()],
                },
            ],
        )
        .await;

        assert!(matches!(events[0], BackendEvent::StoresListed { ref stores } if stores.len() == 1));
        assert!(matches!(events[1], BackendEvent::SyncFinished { ref outcome, .. } if outcome.success));
        assert_eq!(
            backend.submitted.lock().expect("lock").as_slice(),
            &[(
                "vs_1".to_string(),
                vec!["L1".to_string(), "L2".to_string()]
            )]
        );
    }
}
