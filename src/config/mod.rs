use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use crate::utils::{PaperLensError, PaperLensResult};

pub const DEFAULT_CONFIG_PATH: &str = "config/settings.toml";
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000";
/// 唯一的后端地址环境变量
pub const BASE_URL_ENV: &str = "PAPERLENS_API_URL";
/// “最近”标签页的天数范围
pub const RECENT_DAYS_RANGE: RangeInclusive<i64> = 1..=3650;

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub session: SessionConfig,
    pub feed: FeedConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
    /// 后端地址，未配置且处于开发模式时使用本地样例数据
    pub base_url: Option<String>,
    pub timeout_secs: u64,
    pub user_agent: String,
    /// 未设置时跟随构建类型（debug 构建视为开发模式）
    pub dev_mode: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SessionConfig {
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FeedConfig {
    pub recent_days: i64,
}

impl AppConfig {
    pub fn load() -> PaperLensResult<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// 默认值 → 配置文件（可缺省）→ PAPERLENS_* 环境变量
    pub fn load_from(path: impl AsRef<Path>) -> PaperLensResult<Self> {
        let path = PathBuf::from(path.as_ref());

        let settings = ::config::Config::builder()
            .add_source(::config::Config::try_from(&AppConfig::default())?)
            .add_source(::config::File::from(path).required(false))
            .add_source(
                ::config::Environment::with_prefix("PAPERLENS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("api.base_url", std::env::var(BASE_URL_ENV).ok())?
            .build()?;

        let mut config: AppConfig = settings.try_deserialize()?;
        if config.api.base_url.as_deref().map(str::trim) == Some("") {
            config.api.base_url = None;
        }
        if !RECENT_DAYS_RANGE.contains(&config.feed.recent_days) {
            return Err(PaperLensError::Config(format!(
                "feed.recent_days 超出范围 {}..={}: {}",
                RECENT_DAYS_RANGE.start(),
                RECENT_DAYS_RANGE.end(),
                config.feed.recent_days
            )));
        }
        Ok(config)
    }

    pub fn save(&self, path: &str) -> PaperLensResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| PaperLensError::Config(e.to_string()))?;
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn dev_mode(&self) -> bool {
        self.api.dev_mode.unwrap_or(cfg!(debug_assertions))
    }

    /// 是否使用样例数据源，启动时决定一次
    pub fn use_fixtures(&self) -> bool {
        self.api.base_url.is_none() && self.dev_mode()
    }

    pub fn base_url(&self) -> &str {
        self.api.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api: ApiConfig {
                base_url: None,
                timeout_secs: 30,
                user_agent: "PaperLens/0.1".to_string(),
                dev_mode: None,
            },
            session: SessionConfig {
                path: "data/session.json".to_string(),
            },
            feed: FeedConfig { recent_days: 7 },
        }
    }
}
