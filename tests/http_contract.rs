//! End-to-end contract test for the document service.
//!
//! httpmock stands in for the hosted agent framework; requests flow through
//! the real router, extraction, and reqwest clients.

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use docagent::api::create_router;
use docagent::assistant::AssistantService;
use docagent::config::{CONFIG, Config};
use httpmock::{Method::POST, MockServer};
use lopdf::{Document, Object, Stream, dictionary};
use serde_json::json;
use std::sync::Arc;
use tower::ServiceExt;

fn set_env(key: &str, value: &str) {
    // SAFETY: Tests run in a single process and establish deterministic configuration upfront.
    unsafe { std::env::set_var(key, value) }
}

/// Render `text` on one page and return the serialized PDF bytes.
fn pdf_bytes(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = format!("BT /F1 12 Tf 72 720 Td ({text}) Tj ET");
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
            "Resources" => resources_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("serialize pdf");
    bytes
}

fn multipart_request(filename: &str, content: &[u8]) -> Request<Body> {
    let boundary = "docagent-contract-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());
    Request::builder()
        .method(Method::POST)
        .uri("/upload")
        .header(
            "content-type",
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .expect("request")
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

#[tokio::test(flavor = "multi_thread")]
async fn upload_summarize_and_ask_against_mocked_framework() {
    let server = MockServer::start_async().await;
    let upload_dir = tempfile::tempdir().expect("upload dir");

    set_env("AGENT_API_URL", &server.base_url());
    set_env("GROQ_API_KEY", "test-key");
    set_env("DATABASE_URL", "postgresql://ai:ai@localhost:5532/ai");
    set_env("UPLOAD_DIR", &upload_dir.path().to_string_lossy());
    let _ = CONFIG.set(Config::from_env().expect("config from env"));

    let load_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/knowledge/pdf/load")
                .json_body_partial(
                    r#"{ "db_url": "postgresql://ai:ai@localhost:5532/ai", "recreate": true }"#,
                );
            then.status(200).json_body(json!({ "documents": 1, "chunks": 3 }));
        })
        .await;

    let run_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/agent/runs")
                .json_body_partial(r#"{ "stream": false }"#);
            then.status(200)
                .json_body(json!({ "content": "OVERVIEW:\n- Findings were positive." }));
        })
        .await;

    let stream_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/agent/runs")
                .json_body_partial(r#"{ "stream": true, "user_id": "analyst-7" }"#);
            then.status(200)
                .header("content-type", "text/event-stream")
                .body(
                    "data: {\"delta\": \"The findings\"}\n\n\
                     data: {\"delta\": \" were positive.\"}\n\n\
                     data: [DONE]\n\n",
                );
        })
        .await;

    let service = AssistantService::new().expect("assistant service");
    let app = create_router(Arc::new(service));

    let response = app
        .clone()
        .oneshot(multipart_request("report.pdf", &pdf_bytes("Findings were positive")))
        .await
        .expect("upload response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["message"], "File uploaded successfully");
    load_mock.assert_async().await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/summarize")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("summarize response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["summary"],
        "OVERVIEW:\n\n- Findings were positive."
    );
    run_mock.assert_async().await;

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/ask")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({ "question": "What were the findings?", "user_id": "analyst-7" })
                        .to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("ask response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await["answer"],
        "The findings were positive."
    );
    stream_mock.assert_async().await;
}
