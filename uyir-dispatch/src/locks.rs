//! Per-booking mutual exclusion.
//!
//! One async mutex per booking id, created on first use and dropped once no
//! holder or waiter references it. Different bookings never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex};
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

type Registry = Arc<SyncMutex<HashMap<Uuid, Arc<Mutex<()>>>>>;

#[derive(Clone, Default)]
pub struct BookingLocks {
    entries: Registry,
}

impl BookingLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn acquire(&self, booking_id: Uuid) -> BookingLockGuard {
        let lock = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries
                .entry(booking_id)
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };

        let guard = lock.lock_owned().await;
        BookingLockGuard {
            booking_id,
            guard: Some(guard),
            entries: self.entries.clone(),
        }
    }

    #[cfg(test)]
    fn active(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

pub struct BookingLockGuard {
    booking_id: Uuid,
    guard: Option<OwnedMutexGuard<()>>,
    entries: Registry,
}

impl Drop for BookingLockGuard {
    fn drop(&mut self) {
        // Release first so the strong count only reflects the map and waiters.
        drop(self.guard.take());

        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(lock) = entries.get(&self.booking_id) {
            if Arc::strong_count(lock) == 1 {
                entries.remove(&self.booking_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_entry_removed_after_release() {
        let locks = BookingLocks::new();
        let id = Uuid::new_v4();
        {
            let _guard = locks.acquire(id).await;
            assert_eq!(locks.active(), 1);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_same_booking_is_serialized() {
        let locks = BookingLocks::new();
        let id = Uuid::new_v4();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let locks = locks.clone();
            let inside = inside.clone();
            let max_seen = max_seen.clone();
            handles.push(tokio::spawn(async move {
                let _guard = locks.acquire(id).await;
                let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                max_seen.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(2)).await;
                inside.fetch_sub(1, Ordering::SeqCst);
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn test_different_bookings_do_not_block() {
        let locks = BookingLocks::new();
        let _a = locks.acquire(Uuid::new_v4()).await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.acquire(Uuid::new_v4())).await;
        assert!(b.is_ok());
        assert_eq!(locks.active(), 2);
    }
}
