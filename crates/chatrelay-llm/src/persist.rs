//! Fire-and-forget persistence hand-off.
//!
//! When a stream finishes, the relay hands its accumulated text to a
//! [`ConversationStore`] through a [`PersistencePool`]: a fixed set of worker
//! tasks draining a bounded queue. The relay never waits for storage unless
//! the queue is full, in which case the record is saved on the submitting
//! task itself (caller-runs). Records are never dropped and the queue never
//! grows past its capacity.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use chatrelay_types::{CompletionResult, PersistenceConfig};

/// What gets saved after a stream ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRecord {
    pub conversation_id: Option<String>,
    pub result: CompletionResult,
    /// `true` when the downstream left before the upstream finished.
    pub partial: bool,
    pub finished_at: DateTime<Utc>,
}

impl ConversationRecord {
    pub fn new(conversation_id: Option<String>, result: CompletionResult, partial: bool) -> Self {
        Self {
            conversation_id,
            result,
            partial,
            finished_at: Utc::now(),
        }
    }
}

/// External save operation. Storage schema and retries are the
/// implementor's business.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn save(&self, record: ConversationRecord) -> Result<(), String>;
}

/// How a submitted record was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// Queued for a worker.
    Queued,
    /// Saved on the submitting task because the queue was full or closed.
    RanInline,
}

/// Bounded worker pool in front of a [`ConversationStore`].
pub struct PersistencePool {
    store: Arc<dyn ConversationStore>,
    sender: Mutex<Option<mpsc::Sender<ConversationRecord>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    shutdown_timeout: Duration,
}

impl PersistencePool {
    /// Spawn `config.workers` workers over a queue of
    /// `config.queue_capacity`. Must be called inside a tokio runtime.
    pub fn start(store: Arc<dyn ConversationStore>, config: &PersistenceConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..config.workers.max(1))
            .map(|id| {
                let rx = Arc::clone(&rx);
                let store = Arc::clone(&store);
                tokio::spawn(async move {
                    loop {
                        let next = rx.lock().await.recv().await;
                        let Some(record) = next else { break };
                        save_logged(store.as_ref(), record, "worker").await;
                    }
                    debug!(worker = id, "persistence worker exiting");
                })
            })
            .collect();

        Self {
            store,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(workers),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        }
    }

    /// Hand a record off. Only awaits storage when the queue is saturated
    /// or the pool has been shut down.
    pub async fn submit(&self, record: ConversationRecord) -> Submission {
        let sender = self.sender.lock().ok().and_then(|guard| guard.clone());
        let Some(sender) = sender else {
            save_logged(self.store.as_ref(), record, "inline (pool closed)").await;
            return Submission::RanInline;
        };

        match sender.try_send(record) {
            Ok(()) => Submission::Queued,
            Err(TrySendError::Full(record)) => {
                warn!("persistence queue full, saving on submitting task");
                save_logged(self.store.as_ref(), record, "inline (queue full)").await;
                Submission::RanInline
            }
            Err(TrySendError::Closed(record)) => {
                save_logged(self.store.as_ref(), record, "inline (queue closed)").await;
                Submission::RanInline
            }
        }
    }

    /// Stop accepting queued work and wait for workers to drain what is
    /// already queued, up to the configured timeout.
    pub async fn shutdown(&self) {
        let sender = self.sender.lock().ok().and_then(|mut guard| guard.take());
        drop(sender);

        let workers: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .unwrap_or_default();
        if workers.is_empty() {
            return;
        }

        let drain = futures_util::future::join_all(workers);
        match tokio::time::timeout(self.shutdown_timeout, drain).await {
            Ok(_) => info!("persistence pool drained"),
            Err(_) => warn!(
                timeout_secs = self.shutdown_timeout.as_secs(),
                "persistence pool did not drain before timeout"
            ),
        }
    }
}

impl std::fmt::Debug for PersistencePool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistencePool")
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish_non_exhaustive()
    }
}

async fn save_logged(store: &dyn ConversationStore, record: ConversationRecord, path: &str) {
    let conversation = record.conversation_id.clone().unwrap_or_default();
    match store.save(record).await {
        Ok(()) => debug!(conversation = %conversation, path, "conversation saved"),
        Err(e) => warn!(conversation = %conversation, path, error = %e, "conversation save failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::{Notify, Semaphore};

    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Vec<ConversationRecord>>,
    }

    #[async_trait]
    impl ConversationStore for MemoryStore {
        async fn save(&self, record: ConversationRecord) -> Result<(), String> {
            self.saved.lock().unwrap().push(record);
            Ok(())
        }
    }

    /// Blocks every save until a permit is released.
    struct GatedStore {
        gate: Semaphore,
        entered: Notify,
        saved: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ConversationStore for GatedStore {
        async fn save(&self, record: ConversationRecord) -> Result<(), String> {
            self.entered.notify_one();
            let _permit = self.gate.acquire().await.map_err(|e| e.to_string())?;
            self.saved
                .lock()
                .unwrap()
                .push(record.conversation_id.unwrap_or_default());
            Ok(())
        }
    }

    fn record(id: &str) -> ConversationRecord {
        ConversationRecord::new(Some(id.into()), CompletionResult::new("a", "r"), false)
    }

    fn config(workers: usize, queue: usize) -> PersistenceConfig {
        PersistenceConfig {
            workers,
            queue_capacity: queue,
            shutdown_timeout_secs: 5,
            ..PersistenceConfig::default()
        }
    }

    #[tokio::test]
    async fn queued_records_are_saved_by_workers() {
        let store = Arc::new(MemoryStore::default());
        let pool = PersistencePool::start(store.clone(), &config(2, 8));

        for i in 0..5 {
            assert_eq!(pool.submit(record(&format!("c{i}"))).await, Submission::Queued);
        }
        pool.shutdown().await;

        let saved = store.saved.lock().unwrap();
        assert_eq!(saved.len(), 5);
        assert!(saved.iter().all(|r| r.result.answer == "a"));
    }

    #[tokio::test]
    async fn saturated_pool_runs_on_caller() {
        let store = Arc::new(GatedStore {
            gate: Semaphore::new(0),
            entered: Notify::new(),
            saved: Mutex::new(Vec::new()),
        });
        let pool = Arc::new(PersistencePool::start(store.clone(), &config(1, 1)));

        // Occupy the single worker.
        assert_eq!(pool.submit(record("busy")).await, Submission::Queued);
        store.entered.notified().await;
        // Fill the single queue slot.
        assert_eq!(pool.submit(record("queued")).await, Submission::Queued);

        // The next submission must run inline; it blocks on the gate, so
        // drive it from another task and open the gate.
        let inline = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.submit(record("inline")).await })
        };
        store.entered.notified().await;
        store.gate.add_permits(3);
        assert_eq!(inline.await.unwrap(), Submission::RanInline);

        pool.shutdown().await;
        let mut saved = store.saved.lock().unwrap().clone();
        saved.sort();
        assert_eq!(saved, vec!["busy", "inline", "queued"]);
    }

    #[tokio::test]
    async fn submit_after_shutdown_runs_inline() {
        let store = Arc::new(MemoryStore::default());
        let pool = PersistencePool::start(store.clone(), &config(1, 4));
        pool.shutdown().await;

        assert_eq!(pool.submit(record("late")).await, Submission::RanInline);
        assert_eq!(store.saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_save_does_not_kill_worker() {
        struct Flaky {
            calls: Mutex<u32>,
        }
        #[async_trait]
        impl ConversationStore for Flaky {
            async fn save(&self, _record: ConversationRecord) -> Result<(), String> {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                if *calls == 1 { Err("disk full".into()) } else { Ok(()) }
            }
        }

        let store = Arc::new(Flaky { calls: Mutex::new(0) });
        let pool = PersistencePool::start(store.clone(), &config(1, 4));
        pool.submit(record("one")).await;
        pool.submit(record("two")).await;
        pool.shutdown().await;
        assert_eq!(*store.calls.lock().unwrap(), 2);
    }
}
