//! 스키마 준비 상태 관리자 (Schema Guardian)
//!
//! 프로세스 수명 동안 한 번만 마이그레이션 + 테이블 검증을 수행하고,
//! 동시에 들어온 첫 요청들은 초기화 락에서 대기합니다.
//!
//! 상태 전이: `Uninitialized → Initializing → Ready`
//! - 빠른 경로: `Ready` 이면 락 없이 바로 반환
//! - 느린 경로: 락 획득 후 재확인 (double-checked)
//! - 테이블 누락 시 저장소를 한 번만 재생성하고, 그래도 없으면 `SchemaCorrupt`
//! - 초기화 본체는 별도 태스크에서 끝까지 실행됩니다. 호출자가 취소되어도
//!   저장소 재생성이 중간에 멈추지 않고, 다음 호출자는 그 결과를 이어받습니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::storage_error::StorageError;

/// Storage operations needed to bring the schema up
#[async_trait]
pub trait SchemaBackend: Send + Sync {
    async fn apply_migrations(&self) -> Result<(), StorageError>;
    async fn missing_tables(&self) -> Result<Vec<String>, StorageError>;
    async fn recreate_storage(&self) -> Result<(), StorageError>;
}

/// 스키마 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaState {
    Uninitialized,
    Initializing,
    Ready,
}

impl SchemaState {
    const fn as_u8(self) -> u8 {
        match self {
            Self::Uninitialized => 0,
            Self::Initializing => 1,
            Self::Ready => 2,
        }
    }

    const fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Initializing,
            2 => Self::Ready,
            _ => Self::Uninitialized,
        }
    }
}

/// 재생성(repair) 허용 횟수
const MAX_REPAIR_CYCLES: usize = 1;

pub struct SchemaGuardian {
    backend: Arc<dyn SchemaBackend>,
    state: Arc<AtomicU8>,
    init_lock: Arc<Mutex<()>>,
}

impl SchemaGuardian {
    pub fn new(backend: Arc<dyn SchemaBackend>) -> Self {
        Self {
            backend,
            state: Arc::new(AtomicU8::new(SchemaState::Uninitialized.as_u8())),
            init_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn state(&self) -> SchemaState {
        SchemaState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_ready(&self) -> bool {
        self.state() == SchemaState::Ready
    }

    /// 다음 접근 시 스키마를 다시 검증하도록 강제
    pub fn reset(&self) {
        info!("🔄 Schema state reset; next access re-verifies the schema");
        self.set_state(SchemaState::Uninitialized);
    }

    /// 스키마가 준비될 때까지 대기 (필요하면 초기화 수행)
    ///
    /// 취소는 대기만 끝냅니다. 이미 시작된 초기화는 락을 쥔 채 끝까지 진행됩니다.
    pub async fn ensure_ready(&self, cancel: &CancellationToken) -> Result<(), StorageError> {
        if self.is_ready() {
            return Ok(());
        }
        if cancel.is_cancelled() {
            return Err(StorageError::Cancelled);
        }

        let guard = tokio::select! {
            guard = Arc::clone(&self.init_lock).lock_owned() => guard,
            () = cancel.cancelled() => return Err(StorageError::Cancelled),
        };

        if self.is_ready() {
            debug!("Schema became ready while waiting for the init lock");
            return Ok(());
        }

        self.set_state(SchemaState::Initializing);
        let task = tokio::spawn(initialize_holding_lock(
            guard,
            Arc::clone(&self.backend),
            Arc::clone(&self.state),
        ));

        tokio::select! {
            joined = task => joined?,
            () = cancel.cancelled() => {
                warn!("🛑 Caller cancelled while the schema initializes; initialization continues in the background");
                Err(StorageError::Cancelled)
            }
        }
    }

    fn set_state(&self, state: SchemaState) {
        store_state(&self.state, state);
    }
}

fn store_state(state: &AtomicU8, value: SchemaState) {
    state.store(value.as_u8(), Ordering::Release);
}

/// Runs on its own task so that dropping the caller never interrupts a
/// storage rebuild halfway. The init lock is released when this returns.
async fn initialize_holding_lock(
    _guard: OwnedMutexGuard<()>,
    backend: Arc<dyn SchemaBackend>,
    state: Arc<AtomicU8>,
) -> Result<(), StorageError> {
    match initialize(backend.as_ref()).await {
        Ok(()) => {
            store_state(&state, SchemaState::Ready);
            info!("✅ Database schema ready");
            Ok(())
        }
        Err(e) => {
            store_state(&state, SchemaState::Uninitialized);
            error!("❌ Failed to prepare database schema: {}", e);
            Err(e)
        }
    }
}

async fn initialize(backend: &dyn SchemaBackend) -> Result<(), StorageError> {
    backend.apply_migrations().await?;

    let mut repairs = 0;
    loop {
        let missing_tables = backend.missing_tables().await?;
        if missing_tables.is_empty() {
            return Ok(());
        }

        if repairs >= MAX_REPAIR_CYCLES {
            return Err(StorageError::SchemaCorrupt { missing_tables });
        }

        warn!(
            "⚠️ Missing SQLite tables ({}); recreating the database to restore the schema",
            missing_tables.join(", ")
        );
        repairs += 1;
        backend.recreate_storage().await?;
        backend.apply_migrations().await?;
    }
}
