//! Chat demo
//!
//! Sends one prompt to a provider, first as a plain completion and then as a
//! stream. Credentials come from `unillm.yaml` when present, otherwise from
//! the environment (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`, `GEMINI_API_KEY`).
//!
//! ```sh
//! RUST_LOG=unillm_core=debug cargo run --example chat_demo -- anthropic claude-3-5-haiku-latest
//! ```

use anyhow::{bail, Context, Result};
use futures::StreamExt;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use unillm_core::config::{self, EnvCredentials, LayeredCredentials, ProviderType};
use unillm_core::http::HttpClient;
use unillm_core::protocol::{ChatRequest, Message, StreamDelta};
use unillm_core::LlmService;

fn parse_provider(name: &str) -> Result<ProviderType> {
    Ok(match name {
        "openai" => ProviderType::OpenAI,
        "anthropic" => ProviderType::Anthropic,
        "gemini" => ProviderType::Gemini,
        other => bail!("unknown provider '{}'", other),
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut args = std::env::args().skip(1);
    let provider = parse_provider(&args.next().unwrap_or_else(|| "openai".into()))?;
    let model = args.next().unwrap_or_else(|| "gpt-4o-mini".into());

    let mut credentials = LayeredCredentials::new();
    let (http, logging) = if Path::new("unillm.yaml").exists() {
        let file = config::load_from_yaml("unillm.yaml").context("loading unillm.yaml")?;
        let settings = (file.http.clone(), file.logging);
        credentials = credentials.with(file);
        settings
    } else {
        Default::default()
    };
    credentials = credentials.with(EnvCredentials);

    let transport = Arc::new(HttpClient::with_settings(&http)?);
    let service =
        LlmService::for_provider_with_logging(provider, &credentials, transport, logging)?;

    let request = ChatRequest::new(
        model,
        vec![
            Message::system("Answer in one sentence."),
            Message::user("Why is the sky blue?"),
        ],
    )
    .with_max_tokens(128);

    let response = service.complete_chat(&request).await?;
    println!("[{}] {}", response.metadata.model, response.text());
    if let Some(usage) = response.usage() {
        println!("tokens: {:?}", usage.total_tokens);
    }

    let mut stream = service.stream_chat(&request).await?;
    while let Some(chunk) = stream.next().await {
        if let Some(StreamDelta::Content { part, .. }) = chunk?.delta {
            print!("{}", part.as_text().unwrap_or_default());
            std::io::stdout().flush()?;
        }
    }
    println!();

    Ok(())
}
