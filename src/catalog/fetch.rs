use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{bounded, Receiver, TryRecvError};

use super::{Catalog, CatalogSource};
use crate::error::CatalogError;

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// An in-flight catalog fetch. Dropping the handle cancels the fetch; a
/// cancelled fetch never delivers a catalog.
#[derive(Debug)]
pub struct PendingCatalog {
    cancel: CancelToken,
    rx: Receiver<Catalog>,
}

pub fn spawn_fetch(source: Arc<dyn CatalogSource>) -> PendingCatalog {
    let (tx, rx) = bounded(1);
    let cancel = CancelToken::default();
    let worker_cancel = cancel.clone();
    thread::spawn(move || {
        let catalog = match source.fetch(&worker_cancel) {
            Ok(doc) => Catalog::from_document(doc),
            Err(CatalogError::Cancelled) => {
                tracing::debug!("catalog fetch cancelled");
                return;
            }
            Err(err) => {
                tracing::warn!(?err, "catalog fetch failed, continuing without items");
                Catalog::default()
            }
        };
        if worker_cancel.is_cancelled() {
            tracing::debug!("discarding catalog fetched after teardown");
            return;
        }
        // receiver gone means the session was torn down
        let _ = tx.send(catalog);
    });
    PendingCatalog { cancel, rx }
}

impl PendingCatalog {
    pub fn token(&self) -> &CancelToken {
        &self.cancel
    }

    pub fn try_take(&self) -> Option<Catalog> {
        if self.cancel.is_cancelled() {
            return None;
        }
        match self.rx.try_recv() {
            Ok(catalog) => Some(catalog),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    pub fn wait(self) -> Option<Catalog> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.rx.recv().ok()
    }

    pub fn cancel(self) {
        self.cancel.cancel();
    }
}

impl Drop for PendingCatalog {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
