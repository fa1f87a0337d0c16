use crate::{Result, RowLabeled};
use std::{
    collections::HashMap,
    future::Future,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};
use tokio::{
    sync::{Mutex, watch},
    time::{Instant, timeout},
};

/// Rows shared between every caller of the same query.
pub type SharedRows = Arc<Vec<RowLabeled>>;

enum Slot {
    Pending(watch::Receiver<Option<SharedRows>>),
    Ready { rows: SharedRows, at: Instant },
}

/// De-duplicates identical reads.
///
/// While a query runs, callers asking for the same key wait for its rows instead of running
/// it again. Completed rows stay available for `hold`. Writes call [`ResultCache::invalidate`],
/// after which nothing read before the write is served or stored.
pub struct ResultCache {
    slots: Mutex<HashMap<String, Slot>>,
    generation: AtomicU64,
    wait: Duration,
    hold: Duration,
}

impl ResultCache {
    pub fn new(wait: Duration, hold: Duration) -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            generation: AtomicU64::new(0),
            wait,
            hold,
        }
    }

    pub async fn invalidate(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.slots.lock().await.clear();
    }

    /// Rows for `key`, running `query` only when no identical one is pending or fresh.
    pub async fn run<F, Fut>(&self, key: &str, query: F) -> Result<SharedRows>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<RowLabeled>>>,
    {
        let sender = {
            let mut slots = self.slots.lock().await;
            let hold = self.hold;
            slots.retain(|_, slot| match slot {
                Slot::Ready { at, .. } => at.elapsed() <= hold,
                // A producer dropped before completing leaves a closed channel behind
                Slot::Pending(receiver) => receiver.has_changed().is_ok(),
            });
            let pending = match slots.get(key) {
                Some(Slot::Ready { rows, .. }) => {
                    log::trace!("Result cache hit");
                    return Ok(rows.clone());
                }
                Some(Slot::Pending(receiver)) => Some(receiver.clone()),
                None => None,
            };
            if let Some(receiver) = pending {
                drop(slots);
                return self.wait_for(receiver, query).await;
            }
            let (sender, receiver) = watch::channel(None);
            slots.insert(key.to_owned(), Slot::Pending(receiver));
            sender
        };
        let generation = self.generation.load(Ordering::SeqCst);
        let result = query().await;
        let mut slots = self.slots.lock().await;
        let current = self.generation.load(Ordering::SeqCst) == generation;
        match result {
            Ok(rows) => {
                let rows = Arc::new(rows);
                if current {
                    slots.insert(
                        key.to_owned(),
                        Slot::Ready {
                            rows: rows.clone(),
                            at: Instant::now(),
                        },
                    );
                }
                let _ = sender.send(Some(rows.clone()));
                Ok(rows)
            }
            Err(e) => {
                if current {
                    slots.remove(key);
                }
                Err(e)
            }
        }
    }

    async fn wait_for<F, Fut>(
        &self,
        mut receiver: watch::Receiver<Option<SharedRows>>,
        query: F,
    ) -> Result<SharedRows>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Vec<RowLabeled>>>,
    {
        let outcome = timeout(self.wait, receiver.wait_for(Option::is_some))
            .await
            .map(|v| v.map(|rows| (*rows).clone()));
        match outcome {
            Ok(Ok(Some(rows))) => {
                log::trace!("Result cache hit on a pending query");
                return Ok(rows);
            }
            Ok(..) => log::debug!("The pending query failed, running it again"),
            Err(..) => log::warn!(
                "Waited {:?} for a pending identical query, running it again",
                self.wait
            ),
        }
        query().await.map(Arc::new)
    }
}
