use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};

use super::DataSource;
use crate::client::ApiClient;
use crate::models::{
    Ack, AiPreferences, ChatHistoryEntry, CrawlReport, HealthStatus, Interaction, LoginResponse,
    NotificationPreferences, Paper, ProfileUpdate, RagResponse, RegisteredUser, User,
};
use crate::session::Session;
use crate::utils::{PaperLensError, PaperLensResult};

#[derive(Deserialize)]
struct PapersEnvelope {
    #[serde(default)]
    papers: Vec<Paper>,
}

#[derive(Deserialize)]
struct ChatEnvelope {
    response: RagResponse,
}

#[derive(Deserialize)]
struct HistoryEnvelope {
    #[serde(default)]
    history: Vec<ChatHistoryEntry>,
}

/// 个人资料接口有的版本直接返回用户，有的包在 `user` 里
#[derive(Deserialize)]
#[serde(untagged)]
enum UserPayload {
    Wrapped { user: User },
    Bare(User),
}

impl UserPayload {
    fn into_user(self) -> User {
        match self {
            UserPayload::Wrapped { user } | UserPayload::Bare(user) => user,
        }
    }
}

#[derive(Serialize)]
struct InteractionRequest<'a> {
    user_id: &'a str,
    paper: &'a Paper,
    interaction: Interaction,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    query: &'a str,
    paper_id: &'a str,
    user_id: &'a str,
    thread_id: &'a str,
}

/// 真实后端
pub struct LiveSource {
    client: ApiClient,
}

impl LiveSource {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DataSource for LiveSource {
    fn name(&self) -> &'static str {
        "live"
    }

    async fn health(&self) -> PaperLensResult<HealthStatus> {
        self.client
            .get(&Session::default(), "/api/papers/health", &[])
            .await
    }

    async fn load_papers(&self, session: &Session) -> PaperLensResult<Vec<Paper>> {
        let user_id = session.require_user_id()?;
        let envelope: PapersEnvelope = self
            .client
            .get(session, "/api/papers/load_papers", &[("user_id", user_id)])
            .await?;
        info!("加载 {} 篇论文", envelope.papers.len());
        Ok(envelope.papers)
    }

    async fn record_interaction(
        &self,
        session: &Session,
        paper: &Paper,
        interaction: Interaction,
    ) -> PaperLensResult<Ack> {
        let user_id = session.require_user_id()?;
        let body = InteractionRequest {
            user_id,
            paper,
            interaction,
        };
        self.client
            .post(session, "/api/user/paper-interaction", &body)
            .await
    }

    async fn refresh_papers(&self, session: &Session) -> PaperLensResult<CrawlReport> {
        let user_id = session.require_user_id()?;
        let thread_id = uuid::Uuid::new_v4().to_string();
        let report: CrawlReport = self
            .client
            .post(
                session,
                "/api/papers/crawl-papers",
                &json!({ "user_id": user_id, "thread_id": thread_id }),
            )
            .await?;
        info!("爬取完成: {} 篇论文", report.papers_count);
        Ok(report)
    }

    async fn delete_paper(&self, session: &Session, paper_id: &str) -> PaperLensResult<Ack> {
        session.require_user_id()?;
        warn!("后端暂不支持删除论文: {}", paper_id);
        Err(PaperLensError::NotImplemented("delete paper"))
    }

    async fn ask_question(
        &self,
        session: &Session,
        paper_id: &str,
        question: &str,
        thread_id: &str,
    ) -> PaperLensResult<RagResponse> {
        let user_id = session.require_user_id()?;
        let body = ChatRequest {
            query: question,
            paper_id,
            user_id,
            thread_id,
        };
        let envelope: ChatEnvelope = self
            .client
            .post(session, "/api/bot/paper_chat", &body)
            .await?;
        Ok(envelope.response)
    }

    async fn chat_history(
        &self,
        session: &Session,
        paper_id: Option<&str>,
    ) -> PaperLensResult<Vec<ChatHistoryEntry>> {
        let user_id = session.require_user_id()?;
        let mut query = vec![("user_id", user_id)];
        if let Some(paper_id) = paper_id {
            query.push(("paper_id", paper_id));
        }
        let envelope: HistoryEnvelope = self
            .client
            .get(session, "/api/bot/chat-history", &query)
            .await?;
        Ok(envelope.history)
    }

    async fn profile(&self, session: &Session) -> PaperLensResult<User> {
        session.require_user_id()?;
        let payload: UserPayload = self.client.get(session, "/api/user/profile", &[]).await?;
        Ok(payload.into_user())
    }

    async fn update_profile(&self, session: &Session, update: &ProfileUpdate) -> PaperLensResult<User> {
        session.require_user_id()?;
        let payload: UserPayload = self.client.put(session, "/api/user/profile", update).await?;
        Ok(payload.into_user())
    }

    async fn update_interests(&self, session: &Session, interests: &[String]) -> PaperLensResult<Ack> {
        session.require_user_id()?;
        self.client
            .put(session, "/api/user/interests", &json!({ "interests": interests }))
            .await
    }

    async fn update_preferences(
        &self,
        session: &Session,
        preferences: &AiPreferences,
    ) -> PaperLensResult<Ack> {
        session.require_user_id()?;
        self.client
            .put(session, "/api/user/preferences", preferences)
            .await
    }

    async fn update_notifications(
        &self,
        session: &Session,
        preferences: &NotificationPreferences,
    ) -> PaperLensResult<Ack> {
        session.require_user_id()?;
        self.client
            .put(session, "/api/user/notifications", preferences)
            .await
    }

    async fn login(&self, email: &str, password: &str) -> PaperLensResult<LoginResponse> {
        self.client
            .post(
                &Session::default(),
                "/api/user/login",
                &json!({ "email": email, "password": password }),
            )
            .await
    }

    async fn register(
        &self,
        email: &str,
        name: Option<&str>,
        password: &str,
    ) -> PaperLensResult<RegisteredUser> {
        self.client
            .post(
                &Session::default(),
                "/api/user/register",
                &json!({ "email": email, "name": name, "password": password }),
            )
            .await
    }

    async fn logout(&self, session: &Session) -> PaperLensResult<Ack> {
        if !session.is_authenticated() {
            return Ok(Ack::default());
        }
        self.client
            .post(session, "/api/user/logout", &json!({}))
            .await
    }

    async fn current_user(&self, session: &Session) -> PaperLensResult<User> {
        session.require_user_id()?;
        self.client.get(session, "/api/user/me", &[]).await
    }
}
