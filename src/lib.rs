//! PaperLens 客户端：个性化论文推荐后端的命令行仪表盘
//!
//! 推荐、爬取、RAG 问答与认证都由后端完成，这里只负责发请求、
//! 在本地筛选论文流并展示结果。

pub mod chat;
pub mod client;
pub mod config;
pub mod feed;
pub mod models;
pub mod session;
pub mod settings;
pub mod source;
pub mod utils;

pub use chat::{ChatMessage, ChatTranscript, Role};
pub use client::ApiClient;
pub use config::AppConfig;
pub use feed::{DateRange, Feed, FeedFilter, FeedTab};
pub use models::{Interaction, Paper, RagResponse, User};
pub use session::{Session, SessionStore};
pub use source::{connect, DataSource, FixtureSource, LiveSource};
pub use utils::{PaperLensError, PaperLensResult};
