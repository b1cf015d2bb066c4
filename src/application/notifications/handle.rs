//! Handle returned by a notification fan-out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::domain::notification::SendStatus;

/// Counters shared by every unit of one fan-out.
#[derive(Debug)]
pub struct DispatchStats {
    target_count: usize,
    reported: AtomicUsize,
    dropped: AtomicUsize,
    finished: watch::Sender<usize>,
}

impl DispatchStats {
    pub(crate) fn new(target_count: usize) -> Self {
        let (finished, _) = watch::channel(0);
        Self {
            target_count,
            reported: AtomicUsize::new(0),
            dropped: AtomicUsize::new(0),
            finished,
        }
    }

    /// Status records accepted by the progress channel.
    pub fn reported(&self) -> usize {
        self.reported.load(Ordering::SeqCst)
    }

    /// Status records discarded because the channel was full or closed.
    pub fn dropped(&self) -> usize {
        self.dropped.load(Ordering::SeqCst)
    }

    /// Units that have run to completion.
    pub fn finished(&self) -> usize {
        *self.finished.borrow()
    }

    pub(crate) fn record_report(&self, accepted: bool) {
        let counter = if accepted { &self.reported } else { &self.dropped };
        counter.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn record_finished(&self) {
        self.finished.send_modify(|n| *n += 1);
    }

    /// Waits until every unit has finished.
    pub async fn settled(&self) {
        let mut rx = self.finished.subscribe();
        let target = self.target_count;
        // The sender lives as long as `self`, so this cannot observe a close.
        let _ = rx.wait_for(|n| *n >= target).await;
    }
}

/// Read side of a fan-out.
///
/// Draining `progress` is optional; a slow or absent reader misses
/// updates rather than slowing delivery down.
#[derive(Debug)]
pub struct DispatchHandle {
    pub progress: mpsc::Receiver<SendStatus>,
    pub target_count: usize,
    pub stats: Arc<DispatchStats>,
}

impl DispatchHandle {
    /// Waits until every unit has finished.
    pub async fn settled(&self) {
        self.stats.settled().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn settled_returns_immediately_without_targets() {
        DispatchStats::new(0).settled().await;
    }

    #[tokio::test]
    async fn settled_waits_for_every_unit() {
        let stats = Arc::new(DispatchStats::new(2));
        stats.record_finished();

        let waiter = {
            let stats = Arc::clone(&stats);
            tokio::spawn(async move { stats.settled().await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        stats.record_finished();
        waiter.await.unwrap();
        assert_eq!(stats.finished(), 2);
    }

    #[test]
    fn report_counters_split_accepted_and_dropped() {
        let stats = DispatchStats::new(3);
        stats.record_report(true);
        stats.record_report(false);
        stats.record_report(false);
        assert_eq!(stats.reported(), 1);
        assert_eq!(stats.dropped(), 2);
    }
}
