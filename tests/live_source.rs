use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use paperlens::models::{AiPreferences, Interaction, NotificationPreferences, Paper, ProfileUpdate};
use paperlens::{ApiClient, DataSource, Feed, FeedFilter, FeedTab, LiveSource, PaperLensError, Session};

fn live(server: &MockServer) -> LiveSource {
    let client = ApiClient::with_options(&server.uri(), Duration::from_secs(5), "paperlens-test").unwrap();
    LiveSource::new(client)
}

fn session() -> Session {
    Session::new("tok-123", "42")
}

fn two_papers() -> serde_json::Value {
    json!({
        "success": true,
        "count": 2,
        "papers": [
            {
                "id": "1", "user_id": 42, "title": "Deep Nets",
                "abstract": "a", "authors": ["A"], "categories": ["deep learning"],
                "url": "http://x/1", "published": "2024-01-15", "like": false
            },
            {
                "id": "2", "user_id": 42, "title": "Quantum Things",
                "abstract": "b", "authors": ["B"], "categories": ["quantum physics"],
                "url": "http://x/2", "published": "2024-01-14", "like": true
            }
        ]
    })
}

#[tokio::test]
async fn load_papers_sends_user_id_and_bearer_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/papers/load_papers"))
        .and(query_param("user_id", "42"))
        .and(header("authorization", "Bearer tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_papers()))
        .expect(1)
        .mount(&server)
        .await;

    let papers = live(&server).load_papers(&session()).await.unwrap();
    assert_eq!(papers.len(), 2);
    assert!(papers[1].liked);
    assert_eq!(papers[0].url.as_deref(), Some("http://x/1"));
}

#[tokio::test]
async fn null_author_and_category_lists_keep_the_feed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/papers/load_papers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "papers": [
                {
                    "id": 1, "user_id": 42, "title": "Deep Nets",
                    "abstract": "a", "authors": ["A"], "categories": ["deep learning"],
                    "published": "2024-01-15", "like": false
                },
                {
                    "id": 2, "user_id": 42, "title": "Quantum Things",
                    "abstract": null, "authors": null, "categories": null,
                    "published": "2024-01-14", "like": null
                }
            ]
        })))
        .mount(&server)
        .await;

    let papers = live(&server).load_papers(&session()).await.unwrap();
    assert_eq!(papers.len(), 2);
    assert_eq!(papers[1].title, "Quantum Things");
    assert!(papers[1].authors.is_empty());
    assert!(papers[1].categories.is_empty());
}

#[tokio::test]
async fn malformed_body_is_a_decode_error_not_a_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/papers/load_papers"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>gateway</html>"))
        .mount(&server)
        .await;

    let err = live(&server).load_papers(&session()).await.unwrap_err();
    assert!(matches!(err, PaperLensError::Serialization(_)), "unexpected error: {err:?}");
}

#[tokio::test]
async fn unauthenticated_calls_never_reach_the_network() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(0)
        .mount(&server)
        .await;

    let source = live(&server);
    let anonymous = Session::default();

    let paper: Paper = serde_json::from_value(json!({ "id": "1", "title": "Deep Nets" })).unwrap();

    assert!(source.load_papers(&anonymous).await.unwrap_err().is_unauthenticated());
    assert!(source
        .record_interaction(&anonymous, &paper, Interaction::Like)
        .await
        .unwrap_err()
        .is_unauthenticated());
    assert!(source.refresh_papers(&anonymous).await.unwrap_err().is_unauthenticated());
    assert!(source.delete_paper(&anonymous, "1").await.unwrap_err().is_unauthenticated());
    assert!(source
        .ask_question(&anonymous, "1", "why?", "t-1")
        .await
        .unwrap_err()
        .is_unauthenticated());
    assert!(source.chat_history(&anonymous, None).await.unwrap_err().is_unauthenticated());
    assert!(source.profile(&anonymous).await.unwrap_err().is_unauthenticated());
    assert!(source
        .update_profile(&anonymous, &ProfileUpdate::default())
        .await
        .unwrap_err()
        .is_unauthenticated());
    assert!(source
        .update_interests(&anonymous, &["x".to_string()])
        .await
        .unwrap_err()
        .is_unauthenticated());
    assert!(source
        .update_preferences(&anonymous, &AiPreferences::default())
        .await
        .unwrap_err()
        .is_unauthenticated());
    assert!(source
        .update_notifications(&anonymous, &NotificationPreferences::default())
        .await
        .unwrap_err()
        .is_unauthenticated());
    assert!(source.current_user(&anonymous).await.unwrap_err().is_unauthenticated());

    // 没有 token 时退出登录也不发请求
    assert!(!source.logout(&anonymous).await.unwrap().success);

    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn like_records_interaction_with_full_paper() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/paper-interaction"))
        .and(body_partial_json(json!({
            "user_id": "42",
            "interaction": "LIKE",
            "paper": { "id": "1", "liked": false }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "user_id": "42",
            "interaction": "LIKE",
            "message": "Interaction 'LIKE' recorded successfully"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let source = live(&server);
    let paper = serde_json::from_value(json!({ "id": "1", "title": "Deep Nets" })).unwrap();
    let ack = source
        .record_interaction(&session(), &paper, Interaction::Like)
        .await
        .unwrap();
    assert!(ack.success);
}

#[tokio::test]
async fn backend_error_body_is_surfaced() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/papers/crawl-papers"))
        .and(body_partial_json(json!({ "user_id": "42" })))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({ "error": "crawler offline" })))
        .mount(&server)
        .await;

    let err = live(&server).refresh_papers(&session()).await.unwrap_err();
    match err {
        PaperLensError::Http { status, message } => {
            assert_eq!(status, 500);
            assert_eq!(message, "crawler offline");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn refresh_reports_crawl_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/papers/crawl-papers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "thread_id": "th-1",
            "papers_count": 5,
            "papers": [],
            "message": "Successfully crawled 5 papers"
        })))
        .mount(&server)
        .await;

    let report = live(&server).refresh_papers(&session()).await.unwrap();
    assert_eq!(report.papers_count, 5);
    assert_eq!(report.thread_id.as_deref(), Some("th-1"));
}

#[tokio::test]
async fn delete_is_not_implemented_by_backend() {
    let server = MockServer::start().await;
    let err = live(&server).delete_paper(&session(), "1").await.unwrap_err();
    assert!(matches!(err, PaperLensError::NotImplemented(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn ask_question_unwraps_bot_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/bot/paper_chat"))
        .and(body_partial_json(json!({
            "query": "What is attention?",
            "paper_id": "1",
            "user_id": "42",
            "thread_id": "t-9"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "response": {
                "answer": "Attention weighs tokens.",
                "sources": [{ "paper_id": 1, "title": "Section 2", "relevance_score": 0.9 }],
                "context_used": 2,
                "images_used": 0
            }
        })))
        .mount(&server)
        .await;

    let response = live(&server)
        .ask_question(&session(), "1", "What is attention?", "t-9")
        .await
        .unwrap();
    assert_eq!(response.answer, "Attention weighs tokens.");
    assert_eq!(response.sources[0].paper_id, "1");
    assert_eq!(response.context_used, 2);
}

#[tokio::test]
async fn chat_history_filters_by_paper() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/bot/chat-history"))
        .and(query_param("user_id", "42"))
        .and(query_param("paper_id", "7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "count": 1,
            "history": [{ "id": 3, "session_id": "t-1", "content": "An answer", "user_id": 42, "paper_id": "7" }]
        })))
        .mount(&server)
        .await;

    let history = live(&server).chat_history(&session(), Some("7")).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].id, "3");
    assert_eq!(history[0].user_id.as_deref(), Some("42"));
}

#[tokio::test]
async fn login_returns_token_and_numeric_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/login"))
        .and(body_partial_json(json!({ "email": "jane@example.org", "password": "pw" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "token": "jwt", "token_type": "bearer", "id": 42
        })))
        .mount(&server)
        .await;

    let login = live(&server).login("jane@example.org", "pw").await.unwrap();
    assert_eq!(login.token, "jwt");
    assert_eq!(login.id, "42");

    let requests = server.received_requests().await.unwrap();
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn invalid_credentials_map_to_http_401() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/user/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({ "error": "Invalid credentials" })))
        .mount(&server)
        .await;

    let err = live(&server).login("jane@example.org", "bad").await.unwrap_err();
    assert!(matches!(err, PaperLensError::Http { status: 401, .. }));
}

#[tokio::test]
async fn profile_accepts_bare_or_wrapped_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/user/profile"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": { "id": 42, "email": "jane@example.org", "name": "Jane" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/user/me"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 42, "email": "jane@example.org", "name": "Jane", "created_at": "2024-01-01T00:00:00"
        })))
        .mount(&server)
        .await;

    let source = live(&server);
    assert_eq!(source.profile(&session()).await.unwrap().name, "Jane");
    assert_eq!(source.current_user(&session()).await.unwrap().id, "42");
}

#[tokio::test]
async fn settings_updates_hit_their_endpoints() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/user/interests"))
        .and(body_partial_json(json!({ "interests": ["Robotics"] })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("PUT"))
        .and(path("/api/user/preferences"))
        .and(body_partial_json(json!({ "citation_format": "ieee" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .expect(1)
        .mount(&server)
        .await;

    let source = live(&server);
    source
        .update_interests(&session(), &["Robotics".to_string()])
        .await
        .unwrap();
    let preferences = AiPreferences {
        citation_format: "ieee".to_string(),
        ..AiPreferences::default()
    };
    assert!(source.update_preferences(&session(), &preferences).await.unwrap().success);
}

#[tokio::test]
async fn liked_filter_updates_after_like_is_confirmed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/papers/load_papers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(two_papers()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/user/paper-interaction"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "success": true })))
        .mount(&server)
        .await;

    let source = live(&server);
    let session = session();
    let mut feed = Feed::new(source.load_papers(&session).await.unwrap());
    let liked = FeedFilter::tab(FeedTab::Liked);

    let ids: Vec<_> = feed.visible(&liked, Utc::now()).iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec!["2"]);

    let paper = feed.get("1").cloned().unwrap();
    let ticket = feed.begin("1");
    source
        .record_interaction(&session, &paper, Interaction::Like)
        .await
        .unwrap();
    assert!(feed.confirm_like(&ticket, true));

    let ids: Vec<_> = feed.visible(&liked, Utc::now()).iter().map(|p| p.id.clone()).collect();
    assert_eq!(ids, vec!["1", "2"]);
}

#[tokio::test]
async fn health_needs_no_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/papers/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "healthy", "message": "Paper Research API is running"
        })))
        .mount(&server)
        .await;

    let health = live(&server).health().await.unwrap();
    assert_eq!(health.status, "healthy");
}
