pub mod logger;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PaperLensError {
    /// 本地会话中没有缓存的用户ID，请求不会发出
    #[error("未登录: 本地会话中没有用户ID")]
    Unauthenticated,

    #[error("后端返回错误 {status}: {message}")]
    Http { status: u16, message: String },

    #[error("网络请求错误: {0}")]
    Network(#[from] reqwest::Error),

    /// 后端尚未提供的接口
    #[error("接口尚未实现: {0}")]
    NotImplemented(&'static str),

    #[error("输入无效: {0}")]
    InvalidInput(String),

    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),

    #[error("序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PaperLensError {
    pub fn is_unauthenticated(&self) -> bool {
        matches!(self, PaperLensError::Unauthenticated)
    }
}

impl From<::config::ConfigError> for PaperLensError {
    fn from(e: ::config::ConfigError) -> Self {
        PaperLensError::Config(e.to_string())
    }
}

pub type PaperLensResult<T> = Result<T, PaperLensError>;
