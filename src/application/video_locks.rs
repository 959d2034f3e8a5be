//! 영상별 쓰기 잠금 테이블
//!
//! 같은 영상(대소문자 무시)에 대한 저장 작업은 한 번에 하나씩만 진행되고,
//! 서로 다른 영상은 독립적으로 진행됩니다. 마지막 보유자가 잠금을 놓으면
//! 테이블 항목도 함께 정리됩니다.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::debug;

type LockMap = HashMap<String, Arc<AsyncMutex<()>>>;

/// 영상 ID → 비동기 뮤텍스
#[derive(Clone, Default)]
pub struct VideoLockTable {
    entries: Arc<Mutex<LockMap>>,
}

impl VideoLockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// 영상 잠금을 획득합니다. 취소되면 `None`.
    pub async fn acquire(&self, video_id: &str, cancel: &CancellationToken) -> Option<VideoLockGuard> {
        let key = video_id.to_lowercase();
        let mutex = {
            let mut entries = lock_map(&self.entries);
            Arc::clone(entries.entry(key.clone()).or_default())
        };

        let acquired = tokio::select! {
            guard = Arc::clone(&mutex).lock_owned() => Some(guard),
            () = cancel.cancelled() => None,
        };
        drop(mutex);

        let Some(guard) = acquired else {
            // 대기 중 취소: 우리 몫의 참조는 이미 놓았으니 정리 기회를 줍니다
            reclaim(&self.entries, &key);
            return None;
        };

        Some(VideoLockGuard {
            guard: Some(guard),
            key,
            entries: Arc::clone(&self.entries),
        })
    }

    /// 현재 테이블에 남아 있는 영상 수
    pub fn len(&self) -> usize {
        lock_map(&self.entries).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 드롭 시 잠금을 풀고, 대기자가 없으면 항목을 제거합니다.
pub struct VideoLockGuard {
    guard: Option<OwnedMutexGuard<()>>,
    key: String,
    entries: Arc<Mutex<LockMap>>,
}

impl Drop for VideoLockGuard {
    fn drop(&mut self) {
        // 가드가 잡고 있는 Arc를 먼저 놓아야 strong_count가 정확해집니다
        drop(self.guard.take());
        reclaim(&self.entries, &self.key);
    }
}

/// Poisoning only means another holder panicked; the map itself stays valid.
fn lock_map(entries: &Mutex<LockMap>) -> MutexGuard<'_, LockMap> {
    entries.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// 테이블만 참조하고 있는 항목을 제거합니다.
///
/// 새 참조는 테이블 락 안에서만 만들어지므로, 락을 잡은 상태에서
/// strong_count가 1이면 아무도 이 뮤텍스를 쓰거나 기다리지 않습니다.
fn reclaim(entries: &Mutex<LockMap>, key: &str) {
    let mut map = lock_map(entries);
    if map.get(key).is_some_and(|mutex| Arc::strong_count(mutex) == 1) {
        map.remove(key);
        debug!("🔓 Reclaimed video lock entry: {}", key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn entry_is_reclaimed_after_release() {
        let table = VideoLockTable::new();
        let cancel = CancellationToken::new();

        let guard = table.acquire("Video-1", &cancel).await.unwrap();
        assert_eq!(table.len(), 1);

        drop(guard);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn keys_are_case_insensitive() {
        let table = VideoLockTable::new();
        let cancel = CancellationToken::new();

        let _held = table.acquire("ABC", &cancel).await.unwrap();
        let waiting = tokio::time::timeout(Duration::from_millis(50), table.acquire("abc", &cancel)).await;
        assert!(waiting.is_err(), "same video with different case must wait");

        let other = tokio::time::timeout(Duration::from_millis(50), table.acquire("xyz", &cancel)).await;
        assert!(other.is_ok(), "different videos must not block each other");
    }

    #[tokio::test]
    async fn holders_of_one_video_are_serialized() {
        let table = VideoLockTable::new();
        let inside = Arc::new(AtomicUsize::new(0));
        let max_inside = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let table = table.clone();
                let inside = Arc::clone(&inside);
                let max_inside = Arc::clone(&max_inside);
                tokio::spawn(async move {
                    let _guard = table.acquire("vid", &CancellationToken::new()).await.unwrap();
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    max_inside.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(max_inside.load(Ordering::SeqCst), 1);
        assert!(table.is_empty());
    }

    #[tokio::test]
    async fn cancelled_waiter_gives_up_and_entry_survives_for_holder() {
        let table = VideoLockTable::new();
        let held = table.acquire("vid", &CancellationToken::new()).await.unwrap();

        let cancel = CancellationToken::new();
        let waiter = {
            let table = table.clone();
            let cancel = cancel.clone();
            tokio::spawn(async move { table.acquire("vid", &cancel).await.is_none() })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();

        assert!(waiter.await.unwrap());
        assert_eq!(table.len(), 1);

        drop(held);
        assert!(table.is_empty());
    }
}
