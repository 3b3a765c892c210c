//! Catalogue actor — serializes every read and write of the series store.
//!
//! The actor loads the persisted catalogue before it reads its queue, so
//! requests sent while loading simply wait. If loading fails, every request
//! is answered with `AggregatorError::Init`.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

use metricgate_core::normalize::normalize_metric_name;
use metricgate_core::{Catalogue, IngestReport, MetricInput, MetricRecord};
use metricgate_state::StateStore;

use crate::engine::{self, DeleteOutcome};
use crate::error::{AggregatorError, AggregatorResult};
use crate::series::SeriesStore;

type Reply<T> = oneshot::Sender<AggregatorResult<T>>;

/// Messages for the catalogue actor.
pub enum Command {
    Get {
        name: String,
        reply: Reply<Option<MetricRecord>>,
    },
    Snapshot {
        reply: Reply<Catalogue>,
    },
    /// Apply a whole batch as one unit of work.
    Ingest {
        batch: Vec<MetricInput>,
        reply: Reply<IngestReport>,
    },
    Delete {
        name: String,
        filter: HashMap<String, String>,
        reply: Reply<DeleteOutcome>,
    },
    DeleteAll {
        reply: Reply<usize>,
    },
    Shutdown {
        reply: oneshot::Sender<()>,
    },
}

impl Command {
    /// Answer the command with `err` without touching any state.
    fn fail(self, err: AggregatorError) {
        match self {
            Command::Get { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(Err(err));
            }
            Command::Ingest { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Command::Delete { reply, .. } => {
                let _ = reply.send(Err(err));
            }
            Command::DeleteAll { reply } => {
                let _ = reply.send(Err(err));
            }
            Command::Shutdown { reply } => {
                let _ = reply.send(());
            }
        }
    }
}

/// Sole owner of the `SeriesStore`.
pub struct CatalogueActor {
    state: StateStore,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl CatalogueActor {
    pub async fn run(mut self) {
        let mut series = match SeriesStore::load(self.state.clone()) {
            Ok(series) => series,
            Err(e) => {
                error!(error = %e, "catalogue load failed");
                let err = AggregatorError::Init(e.to_string());
                while let Some(cmd) = self.rx.recv().await {
                    let stop = matches!(cmd, Command::Shutdown { .. });
                    cmd.fail(err.clone());
                    if stop {
                        break;
                    }
                }
                return;
            }
        };
        info!(records = series.len(), "catalogue loaded");

        while let Some(cmd) = self.rx.recv().await {
            if Self::handle(&mut series, cmd) {
                break;
            }
        }
        info!("catalogue actor stopped");
    }

    /// Handle one command. Returns true on shutdown.
    fn handle(series: &mut SeriesStore, cmd: Command) -> bool {
        match cmd {
            Command::Get { name, reply } => {
                let _ = reply.send(Ok(series.get(&name).cloned()));
            }
            Command::Snapshot { reply } => {
                let _ = reply.send(Ok(series.get_all()));
            }
            Command::Ingest { batch, reply } => {
                let result = engine::ingest(series, batch);
                if let Err(e) = &result {
                    error!(error = %e, "ingest aborted");
                }
                let _ = reply.send(result);
            }
            Command::Delete {
                name,
                filter,
                reply,
            } => {
                let _ = reply.send(engine::delete_metric(series, &name, &filter));
            }
            Command::DeleteAll { reply } => {
                let _ = reply.send(series.delete_all());
            }
            Command::Shutdown { reply } => {
                info!("catalogue actor shutting down");
                let _ = reply.send(());
                return true;
            }
        }
        false
    }
}

/// Cloneable handle for talking to the catalogue actor.
#[derive(Clone)]
pub struct CatalogueHandle {
    tx: mpsc::UnboundedSender<Command>,
}

impl CatalogueHandle {
    /// Spawn the actor on the current runtime. Returns immediately; the
    /// catalogue is loaded inside the task.
    pub fn spawn(state: StateStore) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let actor = CatalogueActor { state, rx };
        let join = tokio::spawn(actor.run());
        (Self { tx }, join)
    }

    async fn request<T>(&self, make: impl FnOnce(Reply<T>) -> Command) -> AggregatorResult<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| AggregatorError::Unavailable)?;
        rx.await.unwrap_or(Err(AggregatorError::Unavailable))
    }

    /// Look up one record by raw (un-normalized) name.
    pub async fn get(&self, name: &str) -> AggregatorResult<Option<MetricRecord>> {
        let name = normalize_metric_name(name)?;
        self.request(|reply| Command::Get { name, reply }).await
    }

    /// Copy of the whole catalogue.
    pub async fn snapshot(&self) -> AggregatorResult<Catalogue> {
        self.request(|reply| Command::Snapshot { reply }).await
    }

    pub async fn ingest(&self, batch: Vec<MetricInput>) -> AggregatorResult<IngestReport> {
        self.request(|reply| Command::Ingest { batch, reply }).await
    }

    /// Add 1 to the counter sample with these labels.
    pub async fn increment(
        &self,
        name: &str,
        labels: HashMap<String, String>,
    ) -> AggregatorResult<IngestReport> {
        self.ingest(vec![MetricInput::increment(name, labels)]).await
    }

    pub async fn delete(
        &self,
        name: &str,
        filter: HashMap<String, String>,
    ) -> AggregatorResult<DeleteOutcome> {
        let name = name.to_string();
        self.request(|reply| Command::Delete {
            name,
            filter,
            reply,
        })
        .await
    }

    pub async fn delete_all(&self) -> AggregatorResult<usize> {
        self.request(|reply| Command::DeleteAll { reply }).await
    }

    /// Stop the actor after the commands queued ahead of this one.
    pub async fn shutdown(&self) {
        let (reply, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown { reply }).is_ok() {
            let _ = rx.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use metricgate_core::{Labels, SampleInput};

    fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[tokio::test]
    async fn ingest_then_get_by_raw_name() {
        let (catalogue, _join) = CatalogueHandle::spawn(StateStore::open_in_memory().unwrap());

        let mut input = MetricInput::new("Http_Requests");
        input.metric_type = Some("COUNTER".to_string());
        input.samples.push(SampleInput::new(3.0, labels(&[("Path", "/a")])));
        catalogue.ingest(vec![input]).await.unwrap();

        let mut again = MetricInput::new("http_requests");
        again.samples.push(SampleInput::new(2.0, labels(&[("path", "/a")])));
        catalogue.ingest(vec![again]).await.unwrap();

        let record = catalogue.get("HTTP_REQUESTS").await.unwrap().unwrap();
        assert_eq!(record.name, "http_requests");
        assert_eq!(record.metric_type, "counter");
        assert_eq!(record.samples.len(), 1);
        assert_eq!(record.samples[0].value, 5.0);
    }

    #[tokio::test]
    async fn get_with_invalid_name_fails() {
        let (catalogue, _join) = CatalogueHandle::spawn(StateStore::open_in_memory().unwrap());
        assert!(matches!(
            catalogue.get("123").await,
            Err(AggregatorError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_increments_are_not_lost() {
        let (catalogue, _join) = CatalogueHandle::spawn(StateStore::open_in_memory().unwrap());

        let mut tasks = Vec::new();
        for _ in 0..100 {
            let catalogue = catalogue.clone();
            tasks.push(tokio::spawn(async move {
                catalogue
                    .increment("logins", labels(&[("route", "/login")]))
                    .await
                    .unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let record = catalogue.get("logins").await.unwrap().unwrap();
        assert_eq!(record.samples.len(), 1);
        assert_eq!(record.samples[0].value, 100.0);
    }

    #[tokio::test]
    async fn requests_queued_during_load_see_persisted_records() {
        let state = StateStore::open_in_memory().unwrap();
        let mut record = MetricRecord::new("up", "gauge");
        record
            .samples
            .push(metricgate_core::Sample::new(Labels::new(), 1.0));
        state.put_record(&record).unwrap();

        let (catalogue, _join) = CatalogueHandle::spawn(state);
        let loaded = catalogue.get("up").await.unwrap();

        assert_eq!(loaded, Some(record));
    }

    #[tokio::test]
    async fn restart_reloads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("metricgate.redb");

        {
            let (catalogue, join) = CatalogueHandle::spawn(StateStore::open(&path).unwrap());
            catalogue.increment("jobs", HashMap::new()).await.unwrap();
            catalogue.increment("jobs", HashMap::new()).await.unwrap();
            catalogue.shutdown().await;
            join.await.unwrap();
        }

        let (catalogue, _join) = CatalogueHandle::spawn(StateStore::open(&path).unwrap());
        let record = catalogue.get("jobs").await.unwrap().unwrap();
        assert_eq!(record.samples[0].value, 2.0);
        assert_eq!(record.metric_type, "counter");
    }

    #[tokio::test]
    async fn delete_variants_through_the_handle() {
        let (catalogue, _join) = CatalogueHandle::spawn(StateStore::open_in_memory().unwrap());
        catalogue.increment("a", labels(&[("k", "1")])).await.unwrap();
        catalogue.increment("a", labels(&[("k", "2")])).await.unwrap();
        catalogue.increment("b", HashMap::new()).await.unwrap();

        let outcome = catalogue.delete("a", labels(&[("k", "1")])).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Samples { removed: 1 });

        let outcome = catalogue.delete("b", HashMap::new()).await.unwrap();
        assert_eq!(outcome, DeleteOutcome::Record { existed: true });

        let snapshot = catalogue.snapshot().await.unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot["a"].samples.len(), 1);

        assert_eq!(catalogue.delete_all().await.unwrap(), 1);
        assert!(catalogue.snapshot().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn handle_reports_unavailable_after_shutdown() {
        let (catalogue, join) = CatalogueHandle::spawn(StateStore::open_in_memory().unwrap());
        catalogue.shutdown().await;
        join.await.unwrap();

        assert!(matches!(
            catalogue.snapshot().await,
            Err(AggregatorError::Unavailable)
        ));
    }
}
