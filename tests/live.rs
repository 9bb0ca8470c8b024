//! Live-endpoint smoke tests. All ignored by default; configure the
//! environment (see `build_client_from_env`) and run with `--ignored`.

use std::env;

use dotenvy::dotenv;
use futures_util::StreamExt;

use musubi::{
    AnthropicConfig, ChatCompletionRequest, ChatMessage, Client, OpenAiConfig, ProviderConfigs,
};

fn load_env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn build_client_from_env() -> Option<Client> {
    let mut config = ProviderConfigs::default();

    if let Some(api_key) = load_env_var("OPENAI_API_KEY") {
        config.openai = Some(OpenAiConfig {
            api_key,
            base_url: load_env_var("OPENAI_BASE_URL"),
            organization: load_env_var("OPENAI_ORGANIZATION"),
        });
    }
    if let Some(api_key) = load_env_var("ANTHROPIC_API_KEY") {
        config.anthropic = Some(AnthropicConfig {
            api_key,
            base_url: load_env_var("ANTHROPIC_BASE_URL"),
            version: None,
        });
    }

    if config.openai.is_none() && config.anthropic.is_none() {
        eprintln!("skip live test: no provider credentials in environment");
        return None;
    }
    Some(Client::new(config))
}

fn live_model(client: &Client) -> String {
    if client.is_provider_configured("openai") {
        load_env_var("OPENAI_LIVE_MODEL").unwrap_or_else(|| "openai:gpt-4o-mini".to_string())
    } else {
        load_env_var("ANTHROPIC_LIVE_MODEL")
            .unwrap_or_else(|| "anthropic:claude-3-5-haiku-20241022".to_string())
    }
}

#[tokio::test]
#[ignore = "requires provider credentials in the environment"]
async fn live_basic_completion() {
    dotenv().ok();
    let Some(client) = build_client_from_env() else {
        return;
    };

    let request = ChatCompletionRequest {
        model: live_model(&client),
        messages: vec![
            ChatMessage::system("You are a helpful assistant."),
            ChatMessage::user("Introduce the Rust language in one sentence."),
        ],
        max_tokens: Some(200),
        ..Default::default()
    };

    let response = client
        .create_completion(request, None)
        .await
        .expect("live completion should succeed")
        .into_response()
        .expect("non-streaming result");

    let content = response.choices[0]
        .message
        .content
        .as_deref()
        .unwrap_or_default();
    assert!(!content.is_empty(), "assistant should answer with text");
    assert!(!response.choices[0].finish_reason.is_empty());
}

#[tokio::test]
#[ignore = "requires provider credentials in the environment"]
async fn live_streaming_yields_chunks() {
    dotenv().ok();
    let Some(client) = build_client_from_env() else {
        return;
    };

    let request = ChatCompletionRequest {
        model: live_model(&client),
        messages: vec![ChatMessage::user("Count from one to five.")],
        max_tokens: Some(100),
        stream: Some(true),
        ..Default::default()
    };

    let mut stream = client
        .create_completion(request, None)
        .await
        .expect("live stream should start")
        .into_stream()
        .expect("streaming result");

    let mut saw_content = false;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.expect("stream chunk should be valid");
        if chunk.choices[0]
            .delta
            .content
            .as_deref()
            .is_some_and(|text| !text.is_empty())
        {
            saw_content = true;
        }
    }
    assert!(saw_content, "stream should yield at least one content delta");
}
