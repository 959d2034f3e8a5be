//! 재시도 정책 - 일시적 저장소 오류(BUSY/LOCKED)에 대한 고정 백오프 재시도
//!
//! 전체 트랜잭션 작업을 하나의 단위로 재시도합니다. 매 시도는 새 트랜잭션을
//! 열기 때문에 실패한 시도의 버퍼 상태가 다음 시도로 넘어가지 않습니다.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::storage_error::StorageError;

/// 고정 백오프 스케줄 (첫 항목은 첫 시도 전 대기 시간)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrySchedule {
    delays: Vec<Duration>,
}

impl Default for RetrySchedule {
    /// immediate, 100ms, 250ms, 500ms → 4 attempts
    fn default() -> Self {
        Self::new(vec![
            Duration::ZERO,
            Duration::from_millis(100),
            Duration::from_millis(250),
            Duration::from_millis(500),
        ])
    }
}

impl RetrySchedule {
    pub fn new(delays: Vec<Duration>) -> Self {
        Self { delays }
    }

    /// Schedule with `attempts` immediate attempts (tests)
    pub fn immediate(attempts: usize) -> Self {
        Self::new(vec![Duration::ZERO; attempts])
    }

    pub fn attempts(&self) -> usize {
        self.delays.len()
    }

    pub fn delays(&self) -> &[Duration] {
        &self.delays
    }
}

/// `operation`을 스케줄에 따라 실행하고, 일시적 오류만 재시도합니다.
///
/// 스케줄을 모두 소진하면 마지막 일시적 오류를 `RetriesExhausted`로 감싸서
/// 반환합니다. 일시적이지 않은 오류는 즉시 반환됩니다.
pub async fn retry_transient<T, F, Fut>(
    schedule: &RetrySchedule,
    cancel: &CancellationToken,
    label: &str,
    mut operation: F,
) -> Result<T, StorageError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, StorageError>>,
{
    let mut last_error: Option<StorageError> = None;

    for (attempt, delay) in schedule.delays().iter().enumerate() {
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }

        if !delay.is_zero() {
            tokio::select! {
                () = tokio::time::sleep(*delay) => {},
                () = cancel.cancelled() => return Err(StorageError::Cancelled),
            }
        }

        match operation().await {
            Ok(value) => {
                if attempt > 0 {
                    debug!("✅ {} succeeded on attempt {}", label, attempt + 1);
                }
                return Ok(value);
            }
            Err(e) if e.is_transient() => {
                warn!(
                    "🔄 Transient storage error during {} (attempt {}/{}): {}",
                    label,
                    attempt + 1,
                    schedule.attempts(),
                    e
                );
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    match last_error {
        Some(last) => Err(StorageError::RetriesExhausted {
            attempts: schedule.attempts(),
            last: Box::new(last),
        }),
        None => Err(StorageError::RetriesExhausted {
            attempts: 0,
            last: Box::new(StorageError::Transient {
                message: format!("{label}: retry schedule is empty"),
                code: None,
            }),
        }),
    }
}
