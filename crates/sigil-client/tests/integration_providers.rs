// Copyright © 2025 lituus-io <spicyzhug@gmail.com>
// All Rights Reserved.
// Licensed under PolyForm Noncommercial 1.0.0

//! Provider wire-format tests against a local HTTP mock

use httpmock::prelude::*;
use sigil_client::{
    AzureOpenAIProvider, ClientOptions, LMClient, LMConfig, LMRequest, Message, OllamaProvider,
    OpenAIProvider, ResponseFormat, LM,
};

fn chat_completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "model": "gpt-4o-2024-08-06",
        "choices": [{ "message": { "role": "assistant", "content": content }, "finish_reason": "stop" }],
        "usage": { "prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15 }
    })
}

fn fast_config(model: &str) -> LMConfig {
    LMConfig {
        retry_backoff_ms: 1,
        ..LMConfig::for_model(model)
    }
}

#[tokio::test]
async fn test_azure_deployment_url_and_key_header() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/openai/deployments/gpt-4o/chat/completions")
                .query_param("api-version", "2024-06-01")
                .header("api-key", "secret");
            then.status(200).json_body(chat_completion("7"));
        })
        .await;

    let provider = AzureOpenAIProvider::new(server.base_url(), "secret", "2024-06-01");
    let client = LMClient::new(fast_config("gpt-4o"), Box::new(provider));
    let response = client
        .generate(&LMRequest::from_messages(vec![Message::user("rate this")]))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.text, "7");
    assert_eq!(response.usage.unwrap().total_tokens, 15);
}

#[tokio::test]
async fn test_openai_bearer_and_json_mode() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/chat/completions")
                .header("authorization", "Bearer sk-test")
                .json_body_partial(r#"{"model":"gpt-4o-mini","response_format":{"type":"json_object"}}"#);
            then.status(200).json_body(chat_completion("{\"ok\":true}"));
        })
        .await;

    let provider = OpenAIProvider::new("sk-test").with_base_url(server.base_url());
    let client = LMClient::new(fast_config("gpt-4o-mini"), Box::new(provider));
    let request = LMRequest::from_messages(vec![Message::user("json please")])
        .with_response_format(ResponseFormat::JsonObject);
    client.generate(&request).await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn test_ollama_native_chat() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/api/chat")
                .json_body_partial(r#"{"model":"llama3.2:1b","stream":false}"#);
            then.status(200).json_body(serde_json::json!({
                "model": "llama3.2:1b",
                "message": { "role": "assistant", "content": "Product Quality" },
                "done": true,
                "done_reason": "stop",
                "prompt_eval_count": 40,
                "eval_count": 4
            }));
        })
        .await;

    let client = LMClient::from_model_string(
        "ollama_chat/llama3.2:1b",
        ClientOptions::default()
            .with_api_base(server.base_url())
            .with_config(fast_config("unused")),
    )
    .unwrap();
    let response = client
        .generate(&LMRequest::from_messages(vec![Message::user("topic?")]))
        .await
        .unwrap();

    mock.assert_async().await;
    assert_eq!(response.text, "Product Quality");
    assert_eq!(response.usage.unwrap().prompt_tokens, 40);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/api/chat");
            then.status(503).body("overloaded");
        })
        .await;

    let config = fast_config("llama3.2:1b").with_num_retries(2);
    let client = LMClient::new(config, Box::new(OllamaProvider::new(server.base_url())));
    let err = client
        .generate(&LMRequest::from_messages(vec![Message::user("hi")]))
        .await
        .unwrap_err();

    mock.assert_hits_async(3).await;
    assert!(format!("{err:#}").contains("503"));
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let server = MockServer::start_async().await;
    let mock = server
        .mock_async(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(400).body("bad request");
        })
        .await;

    let provider = OpenAIProvider::new("k").with_base_url(server.base_url());
    let client = LMClient::new(fast_config("gpt-4o").with_num_retries(3), Box::new(provider));
    assert!(client
        .generate(&LMRequest::from_messages(vec![Message::user("hi")]))
        .await
        .is_err());

    mock.assert_hits_async(1).await;
}
