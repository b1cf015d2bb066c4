//! Per-discussion serialization of participant creation.
//!
//! Join order is the participant count read inside the creating
//! transaction, so two creations in the same discussion must not overlap.
//! Callers hold a [`JoinGuard`] from before the count until after commit.
//! A discussion's lock lives in the map only while someone holds or awaits
//! it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::domain::foundation::DiscussionId;

type LockMap = Arc<Mutex<HashMap<DiscussionId, Arc<AsyncMutex<()>>>>>;

/// Exclusive right to create participants in one discussion.
pub struct JoinGuard {
    discussion_id: DiscussionId,
    lock: Option<OwnedMutexGuard<()>>,
    locks: LockMap,
}

impl JoinGuard {
    pub fn discussion_id(&self) -> DiscussionId {
        self.discussion_id
    }
}

impl Drop for JoinGuard {
    fn drop(&mut self) {
        drop(self.lock.take());
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the map's own handle left: nobody holds or waits.
        if locks
            .get(&self.discussion_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.discussion_id);
        }
    }
}

impl std::fmt::Debug for JoinGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JoinGuard")
            .field("discussion_id", &self.discussion_id)
            .finish()
    }
}

#[derive(Default)]
pub(crate) struct JoinLocks {
    locks: LockMap,
}

impl JoinLocks {
    pub(crate) async fn acquire(&self, discussion_id: DiscussionId) -> JoinGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(discussion_id).or_default())
        };
        JoinGuard {
            discussion_id,
            lock: Some(lock.lock_owned().await),
            locks: Arc::clone(&self.locks),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn second_acquire_waits_for_release() {
        let locks = Arc::new(JoinLocks::default());
        let discussion = DiscussionId::new();
        let first = locks.acquire(discussion).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move { locks.acquire(discussion).await.discussion_id() })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(first);
        assert_eq!(contender.await.unwrap(), discussion);
    }

    #[tokio::test]
    async fn different_discussions_do_not_contend() {
        let locks = JoinLocks::default();
        let _a = locks.acquire(DiscussionId::new()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(DiscussionId::new())).await;
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn released_lock_leaves_the_map() {
        let locks = JoinLocks::default();
        let guard = locks.acquire(DiscussionId::new()).await;
        assert_eq!(locks.tracked(), 1);

        drop(guard);
        assert_eq!(locks.tracked(), 0);
    }

    #[tokio::test]
    async fn lock_with_a_waiter_stays_until_the_waiter_releases() {
        let locks = Arc::new(JoinLocks::default());
        let discussion = DiscussionId::new();
        let first = locks.acquire(discussion).await;

        let (acquired_tx, acquired_rx) = tokio::sync::oneshot::channel();
        let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let guard = locks.acquire(discussion).await;
                acquired_tx.send(()).unwrap();
                release_rx.await.unwrap();
                drop(guard);
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(first);
        acquired_rx.await.unwrap();
        assert_eq!(locks.tracked(), 1);

        release_tx.send(()).unwrap();
        waiter.await.unwrap();
        assert_eq!(locks.tracked(), 0);
    }
}
