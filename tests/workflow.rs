//! Integration tests driving the public API against mock backend and
//! provider servers.

use chrono::Utc;
use pdf2short::{
    resolve_upload, AiModel, ClientConfig, CreationWorkflow, FileStorage, MemoryStorage, PdfUpload,
    RemoteCall, SessionStore, ShortsError, Step, Video, WorkflowProgressCallback,
};
use serde_json::json;
use std::sync::{Arc, Mutex};
use wiremock::matchers::{any, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ── Test helpers ─────────────────────────────────────────────────────────────

fn ok() -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({ "message": "ok" }))
}

fn config_for(server: &MockServer) -> ClientConfig {
    let mut builder = ClientConfig::builder().backend_url(server.uri());
    for model in AiModel::ALL {
        builder = builder.provider_base_url(model, format!("{}/{}", server.uri(), model));
    }
    builder.build().unwrap()
}

fn pdf() -> PdfUpload {
    PdfUpload::from_bytes("deck.pdf", b"%PDF-1.7\n%demo".to_vec()).unwrap()
}

fn old_video(id: &str) -> Video {
    Video {
        id: id.to_string(),
        title: format!("Old {id}"),
        url: format!("{id}.mp4"),
        created_at: Utc::now(),
        duration: 42,
        thumbnail: None,
    }
}

#[derive(Default)]
struct CallLog(Mutex<Vec<RemoteCall>>);

impl WorkflowProgressCallback for CallLog {
    fn on_call_start(&self, call: RemoteCall) {
        self.0.lock().unwrap().push(call);
    }
}

// ── Scenarios ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn end_to_end_prepends_exactly_one_video() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/extract-text/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "T" })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/groq/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [ { "message": { "role": "assistant", "content": "S" } } ]
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(any()).respond_with(ok()).mount(&server).await;

    let calls = Arc::new(CallLog::default());
    let config = ClientConfig::builder()
        .backend_url(server.uri())
        .provider_base_url(AiModel::Groq, format!("{}/groq", server.uri()))
        .progress_callback(calls.clone())
        .build()
        .unwrap();

    let mut session = SessionStore::open(MemoryStorage::new()).unwrap();
    session.login("user@example.com", "pass").unwrap();
    session.set_api_key(AiModel::Groq, Some("k".into()));
    session.add_video(old_video("b"));
    session.add_video(old_video("a"));

    let mut workflow = CreationWorkflow::open(&config, &session).unwrap();
    workflow.set_subtitles(true);
    workflow.upload(&pdf()).await.unwrap();
    assert_eq!(workflow.extracted_text(), Some("T"));
    workflow.generate_script(&session).await.unwrap();
    assert_eq!(workflow.script(), Some("S"));
    workflow.generate_video(&mut session).await.unwrap();

    let videos = session.videos();
    assert_eq!(videos.len(), 3);
    assert_eq!(videos[0].title, "New Video");
    assert_eq!(videos[0].url, "output_with_subtitles.mp4");
    assert_eq!(videos[0].duration, 0);
    assert_eq!(videos[1], old_video_like(&videos[1], "a"));
    assert_eq!(videos[2].id, "b");
    assert_eq!(workflow.step(), Step::Closed);

    assert_eq!(
        *calls.0.lock().unwrap(),
        vec![
            RemoteCall::ExtractText,
            RemoteCall::GenerateScript,
            RemoteCall::TextToSpeech,
            RemoteCall::BackgroundVideo,
            RemoteCall::CreateVideo,
            RemoteCall::GenerateSubtitles,
            RemoteCall::AddHardSubtitles,
        ]
    );
}

/// `old_video` with the stored timestamp, so equality checks the rest.
fn old_video_like(stored: &Video, id: &str) -> Video {
    Video {
        created_at: stored.created_at,
        ..old_video(id)
    }
}

#[tokio::test]
async fn unauthorized_provider_is_normalised_for_all_models() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/extract-text/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "T" })))
        .mount(&server)
        .await;
    Mock::given(any())
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let mut session = SessionStore::in_memory();
    session.login("user@example.com", "pass").unwrap();

    for model in AiModel::ALL {
        session.set_api_key(model, Some("bad".into()));
        let mut workflow = CreationWorkflow::open(&config, &session).unwrap();
        workflow.select_model(model);
        workflow.upload(&pdf()).await.unwrap();

        let err = workflow.generate_script(&session).await.unwrap_err();
        assert!(matches!(err, ShortsError::InvalidApiKey), "{model}: {err:?}");
        assert_eq!(
            workflow.error(),
            Some("Invalid API key. Please check your API key and try again.")
        );
        assert_eq!(workflow.step(), Step::ScriptReview);
    }
}

#[tokio::test]
async fn missing_key_issues_no_provider_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/extract-text/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "T" })))
        .expect(1)
        .mount(&server)
        .await;

    let config = config_for(&server);
    let mut session = SessionStore::in_memory();
    session.login("user@example.com", "pass").unwrap();
    session.set_api_key(AiModel::OpenAi, Some("sk".into()));

    let mut workflow = CreationWorkflow::open(&config, &session).unwrap();
    workflow.select_model(AiModel::Gemini);
    workflow.upload(&pdf()).await.unwrap();

    let err = workflow.generate_script(&session).await.unwrap_err();
    assert!(matches!(err, ShortsError::MissingApiKey { model: AiModel::Gemini }));
    assert_eq!(
        workflow.error(),
        Some("Please add your GEMINI API key in settings.")
    );

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].url.path(), "/extract-text/");
}

#[test]
fn missing_key_message_names_each_model() {
    for model in AiModel::ALL {
        let err = ShortsError::MissingApiKey { model };
        assert_eq!(
            err.to_string(),
            format!(
                "Please add your {} API key in settings.",
                model.as_str().to_uppercase()
            )
        );
    }
}

#[test]
fn session_survives_reopen_and_logout_clears_user() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("auth-storage.json");

    {
        let mut session = SessionStore::open(FileStorage::new(&file)).unwrap();
        session.login("user@example.com", "pass").unwrap();
        session.set_api_key(AiModel::Gemini, Some("g".into()));
        session.add_video(old_video("v1"));
    }

    let mut session = SessionStore::open_file(&file).unwrap();
    assert!(session.is_authenticated());
    assert_eq!(session.api_key_for(AiModel::Gemini), Some("g"));
    assert_eq!(session.videos().len(), 1);

    session.logout();
    let reopened = SessionStore::open_file(&file).unwrap();
    assert!(!reopened.is_authenticated());
    assert!(reopened.user().is_none());
    assert_eq!(reopened.videos().len(), 1);
}

#[tokio::test]
async fn local_upload_feeds_the_workflow() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("brief.pdf");
    std::fs::write(&file, b"%PDF-1.4 brief").unwrap();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/extract-text/"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "text": "brief text" })))
        .mount(&server)
        .await;

    let config = config_for(&server);
    let upload = resolve_upload(file.to_str().unwrap(), config.download_timeout_secs)
        .await
        .unwrap();
    assert_eq!(upload.file_name, "brief.pdf");

    let session = SessionStore::in_memory();
    let mut workflow = CreationWorkflow::open(&config, &session).unwrap();
    workflow.upload(&upload).await.unwrap();
    assert_eq!(workflow.step(), Step::ScriptReview);
    assert_eq!(workflow.extracted_text(), Some("brief text"));
}
