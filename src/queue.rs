//! Task queue: FIFO admission queue of task ids with out-of-band cancellation.
//!
//! Cancellation marks live in a set next to the ordered entries, so cancelling
//! a buried id is O(1) and never removes anything from the middle of the FIFO.
//! `get()` does not filter cancelled ids; the dispatcher checks
//! [`TaskQueue::is_task_cancelled`] right after dequeue.

use std::collections::{HashSet, VecDeque};
use std::sync::{Mutex, MutexGuard};

use tokio::sync::{Semaphore, SemaphorePermit};
use tracing::{debug, info};

use crate::task::TaskId;

#[derive(Debug, Default)]
struct QueueState {
    entries: VecDeque<TaskId>,
    cancelled: HashSet<TaskId>,
}

/// Cancellable FIFO of task ids, safe to share behind an `Arc`.
pub struct TaskQueue {
    state: Mutex<QueueState>,
    /// One permit per queued entry.
    available: Semaphore,
    /// Free capacity when bounded.
    space: Option<Semaphore>,
}

impl TaskQueue {
    /// Unbounded queue.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            available: Semaphore::new(0),
            space: None,
        }
    }

    /// Queue holding at most `capacity` entries; `put` waits for space.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            space: Some(Semaphore::new(capacity)),
            ..Self::new()
        }
    }

    // No await happens while this lock is held.
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append `task_id` to the back, clearing any earlier cancellation mark.
    pub async fn put(&self, task_id: TaskId) {
        self.reserve().await.push(task_id);
    }

    /// Wait for free space and hold it until [`Reservation::push`].
    ///
    /// Dropping the reservation gives the space back, so a caller abandoned
    /// while waiting leaves no trace in the queue.
    pub async fn reserve(&self) -> Reservation<'_> {
        let permit = match &self.space {
            Some(space) => space.acquire().await.ok(),
            None => None,
        };
        Reservation {
            queue: self,
            permit,
        }
    }

    fn push_entry(&self, task_id: TaskId) {
        {
            let mut state = self.lock();
            if state.cancelled.remove(&task_id) {
                debug!(task_id, "Cleared cancellation mark on re-queue");
            }
            state.entries.push_back(task_id);
        }
        self.available.add_permits(1);

        info!(task_id, "Task queued");
    }

    /// Wait for and return the head of the queue.
    pub async fn get(&self) -> TaskId {
        loop {
            if let Ok(permit) = self.available.acquire().await {
                permit.forget();
            }

            let next = self.lock().entries.pop_front();
            if let Some(task_id) = next {
                if let Some(space) = &self.space {
                    space.add_permits(1);
                }
                return task_id;
            }
        }
    }

    /// Mark `task_id` as cancelled. Idempotent; the id need not be queued.
    pub fn cancel(&self, task_id: TaskId) {
        if self.lock().cancelled.insert(task_id) {
            info!(task_id, "Task marked cancelled in queue");
        }
    }

    pub fn is_task_cancelled(&self, task_id: TaskId) -> bool {
        self.lock().cancelled.contains(&task_id)
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }
}

/// Space held in a [`TaskQueue`] for one entry.
pub struct Reservation<'a> {
    queue: &'a TaskQueue,
    permit: Option<SemaphorePermit<'a>>,
}

impl Reservation<'_> {
    /// Enqueue `task_id` into the held space. Never waits.
    pub fn push(self, task_id: TaskId) {
        if let Some(permit) = self.permit {
            // space is handed back by `get`
            permit.forget();
        }
        self.queue.push_entry(task_id);
    }
}

impl Default for TaskQueue {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn fifo_order() {
        let queue = TaskQueue::new();
        assert!(queue.is_empty());

        queue.put(3).await;
        queue.put(1).await;
        queue.put(2).await;
        assert_eq!(queue.len(), 3);

        assert_eq!(queue.get().await, 3);
        assert_eq!(queue.get().await, 1);
        assert_eq!(queue.get().await, 2);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn cancel_does_not_remove_entry() {
        let queue = TaskQueue::new();
        queue.put(5).await;
        queue.cancel(5);
        queue.cancel(5);

        assert!(queue.is_task_cancelled(5));
        assert!(!queue.is_empty());
        // Filtering is the caller's job.
        assert_eq!(queue.get().await, 5);
        assert!(queue.is_task_cancelled(5));
    }

    #[tokio::test]
    async fn cancel_unknown_id() {
        let queue = TaskQueue::new();
        queue.cancel(42);
        assert!(queue.is_task_cancelled(42));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn requeue_clears_cancellation() {
        let queue = TaskQueue::new();
        queue.put(7).await;
        queue.cancel(7);
        queue.put(7).await;

        assert!(!queue.is_task_cancelled(7));
        assert_eq!(queue.get().await, 7);
        assert_eq!(queue.get().await, 7);
    }

    #[tokio::test]
    async fn get_waits_for_put() {
        let queue = Arc::new(TaskQueue::new());
        let q = Arc::clone(&queue);
        let getter = tokio::spawn(async move { q.get().await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!getter.is_finished());

        queue.put(11).await;
        let got = tokio::time::timeout(Duration::from_secs(1), getter)
            .await
            .expect("get did not wake")
            .unwrap();
        assert_eq!(got, 11);
    }

    #[tokio::test]
    async fn bounded_put_waits_for_space() {
        let queue = Arc::new(TaskQueue::bounded(1));
        queue.put(1).await;

        let q = Arc::clone(&queue);
        let putter = tokio::spawn(async move { q.put(2).await });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!putter.is_finished());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.get().await, 1);
        tokio::time::timeout(Duration::from_secs(1), putter)
            .await
            .expect("put did not wake")
            .unwrap();
        assert_eq!(queue.get().await, 2);
    }

    #[tokio::test]
    async fn dropped_get_does_not_lose_entries() {
        let queue = TaskQueue::new();
        let pending = tokio::time::timeout(Duration::from_millis(10), queue.get()).await;
        assert!(pending.is_err());

        queue.put(9).await;
        assert_eq!(queue.get().await, 9);
    }

    #[tokio::test]
    async fn abandoned_reservation_returns_space() {
        let queue = TaskQueue::bounded(1);
        queue.put(1).await;

        let waiting = tokio::time::timeout(Duration::from_millis(20), queue.reserve()).await;
        assert!(waiting.is_err());

        assert_eq!(queue.get().await, 1);
        let reservation = queue.reserve().await;
        drop(reservation);
        assert!(queue.is_empty());

        let reservation = tokio::time::timeout(Duration::from_secs(1), queue.reserve())
            .await
            .expect("space was not returned");
        reservation.push(2);
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.get().await, 2);
    }
}
