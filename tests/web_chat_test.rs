use axum_test::TestServer;
use serde_json::json;
use uuid::Uuid;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use salus::api::ApiClient;
use salus::config::PollPolicy;
use salus::session::{Persona, SessionManager};
use salus::turn::{latest_assistant_text, run_turn};
use salus::web_server::{router, AppState};
use salus::{ChatRole, Transcript};

fn app_state(base_url: &str) -> AppState {
    let api = ApiClient::new(base_url, "test-key");
    let sessions = SessionManager::new(api.clone(), Persona::healthcare("gpt-test"));
    AppState::new(api, sessions, PollPolicy::default()).expect("state should build")
}

#[tokio::test]
async fn test_index_page_renders_chat_shell() {
    // The index never talks to the remote service, so any base URL works.
    let server = TestServer::new(router(app_state("http://127.0.0.1:9"))).unwrap();

    let response = server.get("/").await;
    response.assert_status_ok();

    let body = response.text();
    assert!(body.contains("Healthcare Assistant"));
    assert!(body.contains("Ask me anything about health!"));
    assert!(body.contains("Type your health-related questions here:"));
    assert!(body.contains("/static/app.js"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let server = TestServer::new(router(app_state("http://127.0.0.1:9"))).unwrap();
    let response = server.get("/admin").await;
    response.assert_status_not_found();
}

// Full conversation round trip against a mocked remote service: bootstrap a
// session, run one turn, and check the transcript the UI would render.
#[tokio::test]
async fn test_one_turn_yields_a_two_entry_transcript() {
    let remote = MockServer::start().await;
    let question = "What foods lower blood pressure?";
    let answer = "Leafy greens, berries, and oats are evidence-based choices.";

    Mock::given(method("POST"))
        .and(path("/assistants"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "asst_1",
            "name": "Healthcare Assistant",
            "model": "gpt-test"
        })))
        .expect(1)
        .mount(&remote)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "thread_1"})))
        .expect(1)
        .mount(&remote)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_user_1",
            "role": "user",
            "created_at": 1,
            "content": [{"type": "text", "text": {"value": question, "annotations": []}}]
        })))
        .expect(1)
        .mount(&remote)
        .await;
    Mock::given(method("POST"))
        .and(path("/threads/thread_1/runs"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "thread_id": "thread_1",
            "status": "queued"
        })))
        .expect(1)
        .mount(&remote)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/runs/run_1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "run_1",
            "thread_id": "thread_1",
            "status": "completed"
        })))
        .expect(1)
        .mount(&remote)
        .await;
    Mock::given(method("GET"))
        .and(path("/threads/thread_1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [
                {
                    "id": "msg_assistant_1",
                    "role": "assistant",
                    "created_at": 2,
                    "content": [{"type": "text", "text": {"value": answer, "annotations": []}}]
                },
                {
                    "id": "msg_user_1",
                    "role": "user",
                    "created_at": 1,
                    "content": [{"type": "text", "text": {"value": question, "annotations": []}}]
                }
            ]
        })))
        .expect(1)
        .mount(&remote)
        .await;

    let api = ApiClient::new(remote.uri(), "test-key");
    let sessions = SessionManager::new(api.clone(), Persona::healthcare("gpt-test"));
    let handles = sessions.get_or_create(Uuid::new_v4()).await.unwrap();

    let messages = run_turn(
        &api,
        &PollPolicy::default(),
        &handles.assistant_id,
        &handles.thread_id,
        question,
    )
    .await
    .unwrap();
    let reply = latest_assistant_text(&messages).unwrap();

    let mut transcript = Transcript::new();
    transcript.push_user(question);
    transcript.push_assistant(reply);

    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.entries()[0].role, ChatRole::User);
    assert_eq!(transcript.entries()[0].content, question);
    assert_eq!(transcript.entries()[1].role, ChatRole::Assistant);
    assert_eq!(transcript.entries()[1].content, answer);
}
