use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use super::DataSource;
use crate::models::{
    Ack, AiPreferences, ChatHistoryEntry, CrawlReport, HealthStatus, Interaction, LoginResponse,
    NotificationPreferences, Paper, ProfileUpdate, RagResponse, RagSource, RegisteredUser, User,
};
use crate::session::Session;
use crate::utils::PaperLensResult;

pub const FIXTURE_TOKEN: &str = "mock-jwt-token";

struct FixtureState {
    papers: Vec<Paper>,
    user: User,
    history: Vec<ChatHistoryEntry>,
}

/// 本地开发用的内存样例数据，更新操作直接修改内存中的数据
pub struct FixtureSource {
    state: Mutex<FixtureState>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self::with_papers(default_papers())
    }

    pub fn with_papers(papers: Vec<Paper>) -> Self {
        Self {
            state: Mutex::new(FixtureState {
                papers,
                user: default_user(),
                history: Vec::new(),
            }),
        }
    }
}

impl Default for FixtureSource {
    fn default() -> Self {
        Self::new()
    }
}

fn ack() -> Ack {
    Ack {
        success: true,
        message: None,
    }
}

#[async_trait]
impl DataSource for FixtureSource {
    fn name(&self) -> &'static str {
        "fixture"
    }

    async fn health(&self) -> PaperLensResult<HealthStatus> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            message: "Fixture data source".to_string(),
        })
    }

    async fn load_papers(&self, session: &Session) -> PaperLensResult<Vec<Paper>> {
        session.require_user_id()?;
        Ok(self.state.lock().await.papers.clone())
    }

    async fn record_interaction(
        &self,
        session: &Session,
        paper: &Paper,
        interaction: Interaction,
    ) -> PaperLensResult<Ack> {
        session.require_user_id()?;
        let mut state = self.state.lock().await;
        if let Some(stored) = state.papers.iter_mut().find(|p| p.id == paper.id) {
            stored.liked = interaction.is_like();
            debug!("样例论文 {} liked={}", stored.id, stored.liked);
        }
        Ok(ack())
    }

    async fn refresh_papers(&self, session: &Session) -> PaperLensResult<CrawlReport> {
        session.require_user_id()?;
        let count = self.state.lock().await.papers.len();
        Ok(CrawlReport {
            success: true,
            thread_id: Some(uuid::Uuid::new_v4().to_string()),
            papers_count: count,
            message: format!("Successfully crawled {} papers", count),
        })
    }

    async fn delete_paper(&self, session: &Session, paper_id: &str) -> PaperLensResult<Ack> {
        session.require_user_id()?;
        self.state.lock().await.papers.retain(|p| p.id != paper_id);
        Ok(ack())
    }

    async fn ask_question(
        &self,
        session: &Session,
        paper_id: &str,
        question: &str,
        thread_id: &str,
    ) -> PaperLensResult<RagResponse> {
        let user_id = session.require_user_id()?.to_string();
        let answer = format!(
            "Based on the research papers, I can provide insights about your question: \"{}\". \
             The studies demonstrate significant findings in this area, with methodological \
             approaches that highlight key implications for the field. The evidence suggests \
             strong correlations and potential applications for future research.",
            question
        );
        let sources = [("Section 3.2", 0.95), ("Figure 2", 0.87), ("Table 1", 0.82)]
            .into_iter()
            .map(|(title, score)| RagSource {
                paper_id: paper_id.to_string(),
                title: title.to_string(),
                relevance_score: score,
            })
            .collect();

        let mut state = self.state.lock().await;
        let id = (state.history.len() + 1).to_string();
        state.history.push(ChatHistoryEntry {
            id,
            session_id: Some(thread_id.to_string()),
            content: answer.clone(),
            user_id: Some(user_id),
            paper_id: Some(paper_id.to_string()),
        });

        Ok(RagResponse {
            answer,
            sources,
            confidence: Some(0.89),
            context_used: 3,
            images_used: 0,
        })
    }

    async fn chat_history(
        &self,
        session: &Session,
        paper_id: Option<&str>,
    ) -> PaperLensResult<Vec<ChatHistoryEntry>> {
        let user_id = session.require_user_id()?;
        let state = self.state.lock().await;
        Ok(state
            .history
            .iter()
            .filter(|h| h.user_id.as_deref() == Some(user_id))
            .filter(|h| paper_id.is_none() || h.paper_id.as_deref() == paper_id)
            .cloned()
            .collect())
    }

    async fn profile(&self, session: &Session) -> PaperLensResult<User> {
        session.require_user_id()?;
        Ok(self.state.lock().await.user.clone())
    }

    async fn update_profile(&self, session: &Session, update: &ProfileUpdate) -> PaperLensResult<User> {
        session.require_user_id()?;
        let mut state = self.state.lock().await;
        update.apply_to(&mut state.user);
        Ok(state.user.clone())
    }

    async fn update_interests(&self, session: &Session, interests: &[String]) -> PaperLensResult<Ack> {
        session.require_user_id()?;
        self.state.lock().await.user.research_interests = interests.to_vec();
        Ok(ack())
    }

    async fn update_preferences(
        &self,
        session: &Session,
        preferences: &AiPreferences,
    ) -> PaperLensResult<Ack> {
        session.require_user_id()?;
        self.state.lock().await.user.ai_preferences = preferences.clone();
        Ok(ack())
    }

    async fn update_notifications(
        &self,
        session: &Session,
        preferences: &NotificationPreferences,
    ) -> PaperLensResult<Ack> {
        session.require_user_id()?;
        self.state.lock().await.user.notification_preferences = preferences.clone();
        Ok(ack())
    }

    async fn login(&self, _email: &str, _password: &str) -> PaperLensResult<LoginResponse> {
        let user_id = self.state.lock().await.user.id.clone();
        Ok(LoginResponse {
            token: FIXTURE_TOKEN.to_string(),
            token_type: "bearer".to_string(),
            id: user_id,
        })
    }

    async fn register(
        &self,
        email: &str,
        name: Option<&str>,
        _password: &str,
    ) -> PaperLensResult<RegisteredUser> {
        Ok(RegisteredUser {
            id: "2".to_string(),
            email: email.to_string(),
            name: name.map(str::to_string),
        })
    }

    async fn logout(&self, _session: &Session) -> PaperLensResult<Ack> {
        Ok(ack())
    }

    async fn current_user(&self, session: &Session) -> PaperLensResult<User> {
        self.profile(session).await
    }
}

fn fixture_paper(
    id: &str,
    title: &str,
    authors: &[&str],
    abstract_text: &str,
    published: &str,
    category: &str,
    liked: bool,
) -> Paper {
    Paper {
        id: id.to_string(),
        user_id: Some("1".to_string()),
        title: title.to_string(),
        authors: authors.iter().map(|a| a.to_string()).collect(),
        abstract_text: abstract_text.to_string(),
        categories: vec![category.to_string()],
        url: Some(format!("https://arxiv.org/pdf/2401.1234{}", id)),
        published: Some(published.to_string()),
        liked,
        arxiv_id: Some(format!("arxiv:2401.1234{}", id)),
    }
}

pub fn default_papers() -> Vec<Paper> {
    vec![
        fixture_paper(
            "1",
            "Attention Is All You Need: Revisiting Transformer Architectures for Scientific Text Analysis",
            &["John Smith", "Jane Doe", "Bob Johnson"],
            "We present a comprehensive analysis of transformer architectures applied to scientific \
             text processing. Our findings demonstrate significant improvements in understanding \
             complex academic literature through attention mechanisms...",
            "2024-01-15",
            "Machine Learning",
            false,
        ),
        fixture_paper(
            "2",
            "Quantum Computing Applications in Molecular Dynamics Simulations",
            &["Alice Chen", "David Wilson"],
            "This paper explores the potential of quantum computing algorithms for accelerating \
             molecular dynamics simulations. We propose novel quantum circuits that can efficiently \
             model complex molecular interactions...",
            "2024-01-14",
            "Quantum Physics",
            true,
        ),
        fixture_paper(
            "3",
            "Neural Network Approaches to Climate Change Prediction Models",
            &["Sarah Martinez", "Michael Brown", "Lisa Wang"],
            "We investigate the application of deep learning techniques to improve climate change \
             prediction accuracy. Our model incorporates multiple data sources and demonstrates \
             superior performance...",
            "2024-01-13",
            "Environmental Science",
            false,
        ),
    ]
}

pub fn default_user() -> User {
    User {
        id: "1".to_string(),
        name: "Dr. Jane Smith".to_string(),
        email: "jane.smith@university.edu".to_string(),
        institution: Some("MIT".to_string()),
        bio: Some(
            "Researcher in artificial intelligence and machine learning with focus on scientific applications."
                .to_string(),
        ),
        research_interests: vec![
            "Machine Learning".to_string(),
            "Quantum Computing".to_string(),
            "Climate Science".to_string(),
            "Neuroscience".to_string(),
        ],
        ai_preferences: AiPreferences::default(),
        notification_preferences: NotificationPreferences::default(),
        created_at: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new(FIXTURE_TOKEN, "1")
    }

    #[tokio::test]
    async fn authorized_calls_require_user_id() {
        let source = FixtureSource::new();
        let anonymous = Session::default();

        assert!(source.load_papers(&anonymous).await.unwrap_err().is_unauthenticated());
        assert!(source.profile(&anonymous).await.unwrap_err().is_unauthenticated());
        assert!(source
            .ask_question(&anonymous, "1", "why?", "t")
            .await
            .unwrap_err()
            .is_unauthenticated());
        assert!(source.health().await.is_ok());
    }

    #[tokio::test]
    async fn like_and_delete_mutate_fixture() {
        let source = FixtureSource::new();
        let session = session();
        let papers = source.load_papers(&session).await.unwrap();
        assert_eq!(papers.len(), 3);

        source
            .record_interaction(&session, &papers[0], Interaction::Like)
            .await
            .unwrap();
        source.delete_paper(&session, "3").await.unwrap();

        let papers = source.load_papers(&session).await.unwrap();
        assert_eq!(papers.len(), 2);
        assert!(papers[0].liked);
    }

    #[tokio::test]
    async fn answers_are_recorded_in_history() {
        let source = FixtureSource::new();
        let session = session();

        let response = source
            .ask_question(&session, "2", "What circuits?", "thread-1")
            .await
            .unwrap();
        assert!(response.answer.contains("What circuits?"));
        assert_eq!(response.sources.len(), 3);
        assert_eq!(response.confidence, Some(0.89));

        assert_eq!(source.chat_history(&session, Some("2")).await.unwrap().len(), 1);
        assert!(source.chat_history(&session, Some("1")).await.unwrap().is_empty());
        assert_eq!(source.chat_history(&session, None).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn settings_updates_persist_in_memory() {
        let source = FixtureSource::new();
        let session = session();

        let update = ProfileUpdate {
            institution: Some("ETH Zurich".to_string()),
            ..Default::default()
        };
        let user = source.update_profile(&session, &update).await.unwrap();
        assert_eq!(user.institution.as_deref(), Some("ETH Zurich"));
        assert_eq!(user.name, "Dr. Jane Smith");

        source
            .update_interests(&session, &["Robotics".to_string()])
            .await
            .unwrap();
        let user = source.current_user(&session).await.unwrap();
        assert_eq!(user.research_interests, vec!["Robotics".to_string()]);
    }
}
