//! 애플리케이션 설정
//!
//! 기본값 → 설정 파일(`config/default.*` 또는 `--config`) → 환경 변수
//! (`COMMENT_VAULT__SECTION__KEY`) 순서로 덮어씁니다.

#![allow(clippy::uninlined_format_args)]

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::domain::constants::youtube;

/// 환경 변수 접두사
pub const ENV_PREFIX: &str = "COMMENT_VAULT";

/// 설정 파일을 따로 주지 않았을 때 찾는 위치 (확장자 제외)
pub const DEFAULT_CONFIG_FILE: &str = "config/default";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load config: {source}")]
    FileLoad {
        #[from]
        source: config::ConfigError,
    },

    #[error("Configuration validation failed: {message}")]
    Validation { message: String },
}

/// 전체 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub youtube: YoutubeApiConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// YouTube Data API 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeApiConfig {
    /// 비어 있으면 요청 시점에 Misconfigured로 거절됩니다
    pub api_key: String,
    pub base_url: String,
    /// `maxResults` (1..=100으로 보정)
    pub max_page_size: u32,
    pub timeout_seconds: u64,
    pub max_requests_per_second: u32,
    pub user_agent: String,
}

impl Default for YoutubeApiConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: youtube::DEFAULT_BASE_URL.to_string(),
            max_page_size: youtube::MAX_RESULTS_LIMIT,
            timeout_seconds: 30,
            max_requests_per_second: 10,
            user_agent: format!("comment-vault/{} (Comment Archiver)", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl YoutubeApiConfig {
    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }

    /// `maxResults` actually sent upstream
    pub fn effective_page_size(&self) -> u32 {
        self.max_page_size.clamp(1, youtube::MAX_RESULTS_LIMIT)
    }
}

/// 데이터베이스 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// sqlx 연결 문자열 (`sqlite:<path>` 또는 `sqlite::memory:`)
    pub url: String,
    /// SQLite `busy_timeout` (ms); 잠금 대기 후 BUSY가 재시도 정책으로 넘어갑니다
    pub busy_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let path = default_data_dir().join("database").join("comments.db");
        Self {
            url: format!("sqlite:{}", path.display()),
            busy_timeout_ms: 5000,
        }
    }
}

/// 로깅 설정
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    pub json_format: bool,
    pub console_output: bool,
    pub file_output: bool,
    pub log_file_name: String,
    /// 비어 있으면 데이터 디렉터리 아래 `logs/`
    pub log_directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            console_output: true,
            file_output: false,
            log_file_name: "comment-vault.log".to_string(),
            log_directory: None,
        }
    }
}

impl LoggingConfig {
    pub fn resolved_log_directory(&self) -> PathBuf {
        self.log_directory
            .clone()
            .unwrap_or_else(|| default_data_dir().join("logs"))
    }
}

/// Per-user data directory (`<data_local_dir>/comment-vault`)
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("comment-vault")
}

impl AppConfig {
    /// 기본값, 설정 파일, 환경 변수를 합쳐서 로드합니다.
    ///
    /// `path`가 주어지면 그 파일은 반드시 있어야 하고, 없으면
    /// `config/default.*`를 선택적으로 읽습니다.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let file_source = match path {
            Some(path) => config::File::from(path.to_path_buf()).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(config::Config::try_from(&Self::default())?)
            .add_source(file_source)
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 설정값 유효성 검증
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = Url::parse(&self.youtube.base_url) {
            return Err(ConfigError::Validation {
                message: format!("youtube.base_url '{}' is not a valid URL: {}", self.youtube.base_url, e),
            });
        }

        if self.youtube.timeout_seconds == 0 {
            return Err(ConfigError::Validation {
                message: "youtube.timeout_seconds must be greater than 0".to_string(),
            });
        }

        if self.youtube.max_requests_per_second == 0 {
            return Err(ConfigError::Validation {
                message: "youtube.max_requests_per_second must be greater than 0".to_string(),
            });
        }

        if self.database.url.trim().is_empty() {
            return Err(ConfigError::Validation {
                message: "database.url must not be empty".to_string(),
            });
        }

        Ok(())
    }
}
