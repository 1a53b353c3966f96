use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::AppConfig;
use crate::session::Session;
use crate::utils::{PaperLensError, PaperLensResult};

/// 唯一配置好的 HTTP 客户端，所有请求都从这里发出
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &AppConfig) -> PaperLensResult<Self> {
        Self::with_options(
            config.base_url(),
            Duration::from_secs(config.api.timeout_secs),
            &config.api.user_agent,
        )
    }

    pub fn with_options(base_url: &str, timeout: Duration, user_agent: &str) -> PaperLensResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        query: &[(&str, &str)],
    ) -> PaperLensResult<T> {
        let request = self.client.get(self.url(path)).query(query);
        self.send(session, request, "GET", path).await
    }

    pub async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        body: &B,
    ) -> PaperLensResult<T> {
        let request = self.client.post(self.url(path)).json(body);
        self.send(session, request, "POST", path).await
    }

    pub async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        session: &Session,
        path: &str,
        body: &B,
    ) -> PaperLensResult<T> {
        let request = self.client.put(self.url(path)).json(body);
        self.send(session, request, "PUT", path).await
    }

    /// 附加认证头并发送；失败时记录日志后原样返回错误
    async fn send<T: DeserializeOwned>(
        &self,
        session: &Session,
        mut request: RequestBuilder,
        method: &str,
        path: &str,
    ) -> PaperLensResult<T> {
        if let Some(header) = session.auth_header() {
            request = request.header("Authorization", header);
        }

        debug!("{} {}", method, path);

        let response = match request.send().await {
            Ok(resp) => resp,
            Err(e) => {
                error!("请求失败 {} {}: {}", method, path, e);
                return Err(e.into());
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = error_message(&body);
            error!("后端返回错误 {} {}: {} {}", method, path, status, message);
            return Err(PaperLensError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await.map_err(|e| {
            error!("读取响应失败 {} {}: {}", method, path, e);
            PaperLensError::Network(e)
        })?;
        serde_json::from_str::<T>(&body).map_err(|e| {
            error!("解析响应失败 {} {}: {}", method, path, e);
            PaperLensError::Serialization(e)
        })
    }
}

/// 后端错误体形如 `{"error": "..."}`，否则使用原始响应
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}
