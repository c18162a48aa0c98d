//! Command entry points: long-running bot, config check, one-shot generation.

use crate::config::BizBotConfig;
use crate::dialogue::Dialogue;
use crate::gateway::Gateway;
use anyhow::Result;
use bb_channels::{ChannelAdapter, TelegramAdapter};
use bb_llm::{CONTEXT_MAX_TOKENS, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE, Dispatcher, TextGenerator};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const INBOUND_QUEUE_CAPACITY: usize = 1024;

pub async fn serve(config_path: Option<PathBuf>) -> Result<()> {
    let cfg = BizBotConfig::load(config_path).await?;
    let bot_token = cfg.bot_token()?;
    let dispatcher = Arc::new(build_dispatcher(&cfg)?);

    let (inbound_tx, inbound_rx) = tokio::sync::mpsc::channel(INBOUND_QUEUE_CAPACITY);
    let telegram: Arc<dyn ChannelAdapter> = Arc::new(TelegramAdapter::new(&bot_token)?);
    telegram.start(inbound_tx).await?;

    let mut channels: HashMap<String, Arc<dyn ChannelAdapter>> = HashMap::new();
    channels.insert(telegram.channel_id().to_string(), telegram);

    let generator: Arc<dyn TextGenerator> = dispatcher.clone();
    let dialogue = Arc::new(Dialogue::new(generator));
    let gateway = Arc::new(Gateway::new(dialogue, channels.clone(), inbound_rx));

    let shutdown = CancellationToken::new();
    let gateway_handle = gateway.start(shutdown.child_token());
    tracing::info!(
        provider = %dispatcher.provider(),
        model = %dispatcher.model(),
        channels = ?channels.keys().collect::<Vec<_>>(),
        "bizbot serving"
    );

    shutdown_signal().await;
    shutdown.cancel();
    match gateway_handle.await {
        Ok(()) => tracing::info!("gateway shutdown completed"),
        Err(e) => tracing::error!(error = %e, "gateway task join failed during shutdown"),
    }
    dispatcher.close();
    tracing::info!("llm connection closed");
    Ok(())
}

/// Validates configuration without touching the network.
pub async fn check(config_path: Option<PathBuf>) -> Result<()> {
    let cfg = BizBotConfig::load(config_path).await?;
    let dispatcher = build_dispatcher(&cfg)?;
    let config = dispatcher.config();

    println!("provider={}", config.provider);
    println!("model={}", config.model);
    println!("base_url={}", config.base_url);
    println!("timeout_secs={}", config.timeout.as_secs());
    match config.api_key() {
        Some(_) => println!("api_key=set"),
        None => println!(
            "api_key=missing ({} is read at call time)",
            config.provider.api_key_env()
        ),
    }
    match cfg.bot_token() {
        Ok(_) => println!("bot_token=set"),
        Err(e) => println!("bot_token=invalid ({e})"),
    }
    Ok(())
}

pub async fn generate(
    config_path: Option<PathBuf>,
    prompt: &str,
    context: Option<&str>,
) -> Result<()> {
    let cfg = BizBotConfig::load(config_path).await?;
    let dispatcher = build_dispatcher(&cfg)?;

    let result = match context {
        Some(context) => {
            dispatcher
                .generate_with_context(prompt, Some(context), CONTEXT_MAX_TOKENS)
                .await
        }
        None => {
            dispatcher
                .generate_text(prompt, DEFAULT_MAX_TOKENS, DEFAULT_TEMPERATURE)
                .await
        }
    };
    dispatcher.close();

    println!("{}", result?);
    Ok(())
}

fn build_dispatcher(cfg: &BizBotConfig) -> Result<Dispatcher> {
    let mut dispatcher = Dispatcher::new(cfg.provider_config()?)?;
    if let Some(system_message) = cfg.system_message() {
        tracing::info!("using custom system message");
        dispatcher = dispatcher.with_system_message(system_message);
    }
    Ok(dispatcher)
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        let mut terminate = match signal(SignalKind::terminate()) {
            Ok(sig) => sig,
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler; falling back to ctrl_c only");
                if let Err(ctrlc_err) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %ctrlc_err, "failed to await ctrl-c signal");
                }
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::warn!("received ctrl-c; beginning graceful shutdown");
            }
            _ = terminate.recv() => {
                tracing::warn!("received SIGTERM; beginning graceful shutdown");
            }
        }
    }
    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to await ctrl-c signal");
        } else {
            tracing::warn!("received ctrl-c; beginning graceful shutdown");
        }
    }
}
