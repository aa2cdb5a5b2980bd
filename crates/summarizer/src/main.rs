mod config;
mod error;
mod producer;
mod rate_limit;
mod server;

use std::sync::Arc;

use rmcp::{ServiceExt, transport::stdio};
use tracing::info;
use tracing_subscriber::EnvFilter;

use llm_common::openai::OpenAiClient;

use config::Config;
use server::SummarizerServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries MCP JSON-RPC
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting summarizer MCP server");

    let config = Config::from_env()?;
    info!(
        base_url = %config.openai.base_url,
        model = %config.openai.model,
        temperature = config.openai.temperature,
        timeout_ms = config.openai.default_timeout.as_millis(),
        max_retries = config.openai.max_retries,
        stream = config.stream_by_default,
        fallback_key = config.fallback_credential.is_some(),
        sentinel = ?config.sentinel,
        "configuration loaded"
    );

    let openai = Arc::new(OpenAiClient::new(config.openai.clone())?);
    let limiter = rate_limit::RateLimiter::from_rps(config.rate_limit_rps);
    if let Some(rps) = config.rate_limit_rps {
        info!(rps, "rate limiting upstream calls");
    }

    let server = SummarizerServer::new(openai, Arc::new(config), limiter);

    info!("MCP server ready, serving on stdio");
    let service = server.serve(stdio()).await.inspect_err(|e| {
        tracing::error!(error = %e, "MCP server error");
    })?;

    service.waiting().await?;
    info!("MCP server shut down");
    Ok(())
}
