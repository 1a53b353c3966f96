//! 数据访问层
//!
//! 每个界面操作对应一个 [`DataSource`] 方法。真实后端由 [`LiveSource`]
//! 实现，本地开发用的样例数据由 [`FixtureSource`] 实现；具体用哪一个在
//! 启动时通过 [`connect`] 决定一次。
//!
//! 需要授权的操作先检查会话中的用户ID，缺失时直接返回
//! [`PaperLensError::Unauthenticated`]，不会发出任何请求。
//!
//! [`PaperLensError::Unauthenticated`]: crate::utils::PaperLensError::Unauthenticated

pub mod fixture;
pub mod live;

pub use fixture::FixtureSource;
pub use live::LiveSource;

use async_trait::async_trait;
use tracing::info;

use crate::client::ApiClient;
use crate::config::AppConfig;
use crate::models::{
    Ack, AiPreferences, ChatHistoryEntry, CrawlReport, HealthStatus, Interaction, LoginResponse,
    NotificationPreferences, Paper, ProfileUpdate, RagResponse, RegisteredUser, User,
};
use crate::session::Session;
use crate::utils::PaperLensResult;

#[async_trait]
pub trait DataSource: Send + Sync {
    /// 数据源名称，用于日志
    fn name(&self) -> &'static str;

    async fn health(&self) -> PaperLensResult<HealthStatus>;

    /// 当前用户的个性化论文列表，顺序由后端决定
    async fn load_papers(&self, session: &Session) -> PaperLensResult<Vec<Paper>>;

    async fn record_interaction(
        &self,
        session: &Session,
        paper: &Paper,
        interaction: Interaction,
    ) -> PaperLensResult<Ack>;

    /// 触发后端重新爬取
    async fn refresh_papers(&self, session: &Session) -> PaperLensResult<CrawlReport>;

    async fn delete_paper(&self, session: &Session, paper_id: &str) -> PaperLensResult<Ack>;

    async fn ask_question(
        &self,
        session: &Session,
        paper_id: &str,
        question: &str,
        thread_id: &str,
    ) -> PaperLensResult<RagResponse>;

    async fn chat_history(
        &self,
        session: &Session,
        paper_id: Option<&str>,
    ) -> PaperLensResult<Vec<ChatHistoryEntry>>;

    async fn profile(&self, session: &Session) -> PaperLensResult<User>;

    async fn update_profile(&self, session: &Session, update: &ProfileUpdate) -> PaperLensResult<User>;

    async fn update_interests(&self, session: &Session, interests: &[String]) -> PaperLensResult<Ack>;

    async fn update_preferences(
        &self,
        session: &Session,
        preferences: &AiPreferences,
    ) -> PaperLensResult<Ack>;

    async fn update_notifications(
        &self,
        session: &Session,
        preferences: &NotificationPreferences,
    ) -> PaperLensResult<Ack>;

    async fn login(&self, email: &str, password: &str) -> PaperLensResult<LoginResponse>;

    async fn register(
        &self,
        email: &str,
        name: Option<&str>,
        password: &str,
    ) -> PaperLensResult<RegisteredUser>;

    async fn logout(&self, session: &Session) -> PaperLensResult<Ack>;

    async fn current_user(&self, session: &Session) -> PaperLensResult<User>;
}

/// 按配置选择数据源
pub fn connect(config: &AppConfig) -> PaperLensResult<Box<dyn DataSource>> {
    if config.use_fixtures() {
        info!("未配置后端地址，使用本地样例数据");
        return Ok(Box::new(FixtureSource::new()));
    }

    let client = ApiClient::new(config)?;
    info!("连接后端: {}", client.base_url());
    Ok(Box::new(LiveSource::new(client)))
}
