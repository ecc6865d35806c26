//! Progress persistence with stale-response protection
//!
//! Page navigation can outpace network round-trips. Every request gets a
//! sequence number and only the response to the most recently issued
//! request becomes current state.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::{debug, warn, Span};

use crate::article::{ProgressUpdate, ReadingProgress};
use crate::error::{ReaderError, Result};
use crate::remote::RemoteStore;

/// What happened to a response
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Became the current reading progress
    Accepted(ReadingProgress),
    /// A newer request was issued before this response arrived
    Stale { seq: u64, latest: u64 },
}

#[derive(Debug, Default)]
struct Accepted {
    seq: u64,
    progress: Option<ReadingProgress>,
}

/// Pushes progress updates to a remote store, last request wins
pub struct ProgressSynchronizer<R> {
    remote: R,
    issued: AtomicU64,
    accepted: Mutex<Accepted>,
    span: Span,
}

impl<R: RemoteStore> ProgressSynchronizer<R> {
    pub fn new(remote: R, span: Span) -> Self {
        Self {
            remote,
            issued: AtomicU64::new(0),
            accepted: Mutex::new(Accepted::default()),
            span,
        }
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    /// Sequence number of the most recently issued request
    pub fn latest_issued(&self) -> u64 {
        self.issued.load(Ordering::SeqCst)
    }

    /// Last accepted reading progress
    pub fn current(&self) -> Option<ReadingProgress> {
        self.accepted.lock().progress.clone()
    }

    pub async fn submit(&self, article_id: &str, percent: f64) -> Result<SyncOutcome> {
        self.submit_update(ProgressUpdate::new(article_id, percent))
            .await
    }

    /// Persist an update. Failures are returned as-is and never retried.
    pub async fn submit_update(&self, update: ProgressUpdate) -> Result<SyncOutcome> {
        if !(update.percent > 0.0 && update.percent <= 1.0) {
            return Err(ReaderError::InvalidProgress(update.percent));
        }

        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        debug!(
            parent: &self.span,
            seq,
            article_id = %update.article_id,
            percent = update.percent,
            "Saving reading progress"
        );

        let ack = match self.remote.save_reading_progress(&update).await {
            Ok(ack) => ack,
            Err(err) => {
                warn!(parent: &self.span, seq, error = %err, "Failed to save reading progress");
                return Err(err);
            }
        };

        let mut accepted = self.accepted.lock();
        let latest = self.issued.load(Ordering::SeqCst);
        if seq != latest || seq <= accepted.seq {
            debug!(parent: &self.span, seq, latest, "Discarding stale progress response");
            return Ok(SyncOutcome::Stale { seq, latest });
        }

        let progress = ReadingProgress {
            article_id: update.article_id,
            percent: ack.updated_percent,
            anchor_index: ack.updated_anchor_index,
        };
        accepted.seq = seq;
        accepted.progress = Some(progress.clone());

        debug!(parent: &self.span, seq, percent = progress.percent, "Reading progress accepted");
        Ok(SyncOutcome::Accepted(progress))
    }
}
