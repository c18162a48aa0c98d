use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Owns the one pooled HTTP client used for every generation call.
///
/// The client is built on first `acquire` and reused until `close`; the next
/// `acquire` after a close builds a fresh one. `reqwest::Client` is a handle
/// to a shared pool, so clones handed to in-flight requests keep working
/// after the manager drops its own copy.
pub struct ConnectionManager {
    timeout: Duration,
    slot: Mutex<Option<reqwest::Client>>,
    created: AtomicU64,
}

impl ConnectionManager {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            slot: Mutex::new(None),
            created: AtomicU64::new(0),
        }
    }

    pub fn acquire(&self) -> reqwest::Client {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(client) = slot.as_ref() {
            return client.clone();
        }
        let client = self.build_client();
        *slot = Some(client.clone());
        self.created.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(timeout = ?self.timeout, "backend http client created");
        client
    }

    /// Drops the pooled client. Safe to call more than once.
    pub fn close(&self) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        if slot.take().is_some() {
            tracing::debug!("backend http client closed");
        }
    }

    pub fn is_open(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// How many clients this manager has built so far.
    pub fn connections_created(&self) -> u64 {
        self.created.load(Ordering::Relaxed)
    }

    fn build_client(&self) -> reqwest::Client {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(%e, "reqwest client build failed; falling back to default client");
                reqwest::Client::new()
            })
    }
}
