//! 本地会话：bearer token 与用户ID
//!
//! 启动时读取一次，然后以引用传给每个数据源操作。

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::utils::{PaperLensError, PaperLensResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    #[serde(default)]
    pub auth_token: Option<String>,
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Session {
    pub fn new(auth_token: impl Into<String>, user_id: impl Into<String>) -> Self {
        Self {
            auth_token: Some(auth_token.into()),
            user_id: Some(user_id.into()),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.token().is_some()
    }

    fn token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }

    /// `Authorization` 头的值
    pub fn auth_header(&self) -> Option<String> {
        self.token().map(|t| format!("Bearer {}", t))
    }

    /// 需要授权的操作在发请求前调用
    pub fn require_user_id(&self) -> PaperLensResult<&str> {
        self.user_id
            .as_deref()
            .filter(|id| !id.is_empty())
            .ok_or(PaperLensError::Unauthenticated)
    }

    pub fn logout(&mut self) {
        self.auth_token = None;
        self.user_id = None;
    }
}

/// JSON 文件形式的会话存储
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件不存在时返回空会话
    pub fn load(&self) -> PaperLensResult<Session> {
        if !self.path.exists() {
            debug!("会话文件不存在: {}", self.path.display());
            return Ok(Session::default());
        }

        let content = std::fs::read_to_string(&self.path)?;
        let session: Session = serde_json::from_str(&content)?;
        Ok(session)
    }

    pub fn save(&self, session: &Session) -> PaperLensResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let content = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, content)?;
        info!("会话已保存: {}", self.path.display());
        Ok(())
    }

    pub fn clear(&self) -> PaperLensResult<()> {
        if self.path.exists() {
            std::fs::remove_file(&self.path)?;
            info!("会话已清除: {}", self.path.display());
        }
        Ok(())
    }
}
