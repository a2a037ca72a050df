mod common;

use std::collections::HashSet;

use anyhow::Result;
use reqwest::StatusCode;
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use common::{error_message, TestServer};

fn reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

async fn server_with_llm(llm: &MockServer) -> Result<TestServer> {
    let llm_url = llm.uri();
    TestServer::start_with(|config| {
        config.llm.openrouter_api_key = Some("or-key".into());
        config.llm.openrouter_base_url = llm_url;
        config.llm.question_model = "question/model".into();
    })
    .await
}

#[tokio::test]
async fn question_1_categorises_then_asks() -> Result<()> {
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Answer with exactly one of"))
        .respond_with(reply("DEEPENER"))
        .expect(1)
        .mount(&llm)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("in the style of a DEEPENER question"))
        .and(body_string_contains("question/model"))
        .respond_with(reply("What made the walk feel different today?"))
        .expect(1)
        .mount(&llm)
        .await;

    let server = server_with_llm(&llm).await?;
    let res = server
        .post("/api/questions/question-1", json!({ "content": "I walked to work." }))
        .await?
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["question"], "What made the walk feel different today?");
    Ok(())
}

#[tokio::test]
async fn question_2_requires_every_field() -> Result<()> {
    let llm = MockServer::start().await;
    let server = server_with_llm(&llm).await?;

    let cases = [
        (json!({ "randomItem": "SENSES_EMBODIMENT", "journalEntrySession": "s" }), "Content is required"),
        (json!({ "content": "x", "journalEntrySession": "s" }), "Random item is required"),
        (json!({ "content": "x", "randomItem": "SENSES_EMBODIMENT" }), "Journal entry session is required"),
    ];
    for (body, message) in cases {
        let res = server.post("/api/questions/question-2", body).await?.send().await?;
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        assert_eq!(error_message(res).await?, message);
    }
    Ok(())
}

#[tokio::test]
async fn follow_up_questions_use_wildcard_descriptions() -> Result<()> {
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Gratitude & Highlights"))
        .respond_with(reply("Who would you thank for today?"))
        .mount(&llm)
        .await;

    let server = server_with_llm(&llm).await?;

    let res = server
        .post(
            "/api/questions/question-2",
            json!({
                "content": "Long day.",
                "randomItem": "GRATITUDE_HIGHLIGHTS",
                "journalEntrySession": "session-1"
            }),
        )
        .await?
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["question"], "Who would you thank for today?");

    let res = server
        .post(
            "/api/questions/question-3",
            json!({ "content": "Long day.", "randomItem": "GRATITUDE_HIGHLIGHTS" }),
        )
        .await?
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    Ok(())
}

#[tokio::test]
async fn unknown_wildcard_is_a_client_error() -> Result<()> {
    let llm = MockServer::start().await;
    let server = server_with_llm(&llm).await?;

    let res = server
        .post("/api/questions/question-3", json!({ "content": "x", "randomItem": "WEATHER" }))
        .await?
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    assert!(error_message(res).await?.contains("WEATHER"));
    Ok(())
}

#[tokio::test]
async fn bridge_to_image_returns_message() -> Result<()> {
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("turn it into an image"))
        .respond_with(reply("Let's capture this evening in a picture."))
        .mount(&llm)
        .await;

    let server = server_with_llm(&llm).await?;
    let res = server
        .post("/api/questions/bridge-to-image", json!({ "content": "Q: ...\nA: ..." }))
        .await?
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    assert_eq!(body["bridgeMessage"], "Let's capture this evening in a picture.");
    Ok(())
}

#[tokio::test]
async fn provider_failure_uses_operation_message() -> Result<()> {
    let llm = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(502).set_body_string("upstream down"))
        .mount(&llm)
        .await;

    let server = server_with_llm(&llm).await?;
    let res = server
        .post("/api/questions/question-1", json!({ "content": "x" }))
        .await?
        .send()
        .await?;
    assert_eq!(res.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(error_message(res).await?, "Error generating question-1");
    Ok(())
}

#[tokio::test]
async fn wildcards_random_2_returns_two_distinct_categories() -> Result<()> {
    let server = TestServer::start().await?;

    let known: HashSet<&str> = [
        "SENSES_EMBODIMENT",
        "PEOPLE_RELATIONSHIPS",
        "ENVIRONMENT_PLACES",
        "MICROMOMENTS_JOYS",
        "LEARNING_GROWTH",
        "GRATITUDE_HIGHLIGHTS",
        "IMAGINATION_METAPHOR",
    ]
    .into_iter()
    .collect();

    let res = server.get("/api/questions/wildcards-random-2").await?.send().await?;
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await?;
    let items: Vec<&str> = body["items"]
        .as_array()
        .map(|a| a.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    assert_eq!(items.len(), 2);
    assert_ne!(items[0], items[1]);
    assert!(items.iter().all(|i| known.contains(i)));
    Ok(())
}
