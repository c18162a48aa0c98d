//! BizBot main binary: a Telegram assistant for small-business owners.

mod config;
mod dialogue;
mod gateway;
mod keyboards;
mod prompts;
mod server;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Debug, Parser)]
#[command(name = "bizbot", version, about = "BizBot small-business content assistant")]
struct Cli {
    /// TOML config file (default: ~/.bizbot/config.toml).
    #[arg(long, global = true, env = "BIZBOT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run the Telegram bot (default).
    Serve,
    /// Validate config and print the resolved provider.
    Check,
    /// One-shot generation printed to stdout.
    Generate {
        prompt: String,
        /// Prepended to the prompt as "Context: ...".
        #[arg(long)]
        context: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `.env` must be applied before anything reads the environment.
    let dotenv_path = dotenvy::dotenv().ok();
    init_tracing()?;
    install_panic_hook();
    if let Some(path) = dotenv_path {
        tracing::debug!(path = %path.display(), ".env loaded");
    }

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Command::Serve);

    match command {
        Command::Serve => server::serve(cli.config).await,
        Command::Check => server::check(cli.config).await,
        Command::Generate { prompt, context } => {
            server::generate(cli.config, &prompt, context.as_deref()).await
        }
    }
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new("info,bizbot=debug,bb_app=debug,bb_channels=debug,bb_llm=debug")
    });
    let log_format = std::env::var("BIZBOT_LOG_FORMAT")
        .unwrap_or_else(|_| "json".to_string())
        .to_ascii_lowercase();

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    match log_format.as_str() {
        "json" => builder
            .json()
            .flatten_event(true)
            .with_current_span(true)
            .with_span_list(true)
            .init(),
        "pretty" => builder.pretty().init(),
        "compact" => builder.compact().init(),
        other => {
            return Err(anyhow::anyhow!(
                "unsupported BIZBOT_LOG_FORMAT={other:?}; expected one of: json, pretty, compact"
            ));
        }
    }

    tracing::info!(
        log_format = %log_format,
        env_filter = ?std::env::var("RUST_LOG").ok(),
        "tracing initialized"
    );
    Ok(())
}

fn install_panic_hook() {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let location = info
            .location()
            .map(|loc| format!("{}:{}", loc.file(), loc.line()))
            .unwrap_or_else(|| "unknown".to_string());
        tracing::error!(
            panic_location = %location,
            panic_payload = %panic_message(info.payload()),
            "panic captured"
        );
        default_hook(info);
    }));
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_is_the_default_command() {
        let cli = Cli::try_parse_from(["bizbot"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn generate_takes_prompt_and_optional_context() {
        let cli = Cli::try_parse_from([
            "bizbot",
            "generate",
            "Напиши слоган",
            "--context",
            "пекарня",
            "--config",
            "/tmp/bizbot.toml",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/bizbot.toml")));
        match cli.command {
            Some(Command::Generate { prompt, context }) => {
                assert_eq!(prompt, "Напиши слоган");
                assert_eq!(context.as_deref(), Some("пекарня"));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn panic_message_reads_both_payload_kinds() {
        assert_eq!(panic_message(&"boom"), "boom");
        assert_eq!(panic_message(&"boom".to_string()), "boom");
        assert_eq!(panic_message(&42_u8), "non-string panic payload");
    }
}
