// Command-line entry point for claim extraction

mod config;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use claimify::ai::{OpenAIJudge, RateLimitedJudge};
use claimify::{Claimify, Judge, PipelineConfig, PipelineRun};
use openai_client::{ChatRequest, Message};
use std::io::Read;
use std::path::PathBuf;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "claimify")]
#[command(about = "Extract atomic, verifiable factual claims from text")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract claims from a file or stdin and print them as JSON
    Extract(ExtractArgs),

    /// Check that the configured model is reachable
    Check,
}

#[derive(Args)]
struct ExtractArgs {
    /// Input file (reads stdin when omitted or "-")
    input: Option<PathBuf>,

    /// Question the text answers, used as extra context
    #[arg(long)]
    question: Option<String>,

    /// Language of the text (e.g. "en", "de"); never causes translation
    #[arg(long)]
    language: Option<String>,

    /// Context sentences before each sentence [default: 5]
    #[arg(long)]
    preceding: Option<usize>,

    /// Context sentences after each sentence [default: 5]
    #[arg(long)]
    following: Option<usize>,

    /// Sentences processed concurrently [default: 4]
    #[arg(long)]
    concurrency: Option<usize>,

    /// Attempts per judge call, including the first [default: 3]
    #[arg(long)]
    max_attempts: Option<u32>,

    /// Timeout for a single judge call, in seconds [default: 60]
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Stop the whole run after this many seconds and print what finished
    #[arg(long)]
    deadline_secs: Option<u64>,

    /// Limit judge calls per second
    #[arg(long)]
    rps: Option<u32>,

    /// Print per-sentence decisions and failures alongside the claims
    #[arg(long)]
    diagnostics: bool,
}

impl ExtractArgs {
    /// Overlay the flags that were given onto the library defaults.
    fn pipeline_config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::default();
        let preceding = self.preceding.unwrap_or(config.preceding);
        let following = self.following.unwrap_or(config.following);
        config = config.with_window(preceding, following);
        if let Some(concurrency) = self.concurrency {
            config = config.with_max_concurrency(concurrency);
        }
        if let Some(attempts) = self.max_attempts {
            let retry = config.retry.with_max_attempts(attempts);
            config = config.with_retry(retry);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_call_timeout(Duration::from_secs(secs));
        }
        if let Some(question) = &self.question {
            config = config.with_question(question.clone());
        }
        config
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging; stdout is reserved for JSON output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,claimify=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Extract(args) => extract(&config, args).await,
        Commands::Check => check(&config).await,
    }
}

async fn extract(config: &Config, args: ExtractArgs) -> Result<()> {
    let text = read_input(args.input.as_deref())?;

    let pipeline_config = args.pipeline_config();

    let judge = OpenAIJudge::new(config.client(), &config.model)
        .context("Failed to create OpenAI judge")?;
    tracing::info!(model = %judge.model(), "Judge ready");

    let run = match args.rps {
        Some(rps) => {
            let judge = RateLimitedJudge::new(judge, rps).context("Invalid --rps")?;
            run_pipeline(judge, pipeline_config, &text, args.language.as_deref(), args.deadline_secs).await?
        }
        None => run_pipeline(judge, pipeline_config, &text, args.language.as_deref(), args.deadline_secs).await?,
    };

    for failure in &run.failures {
        tracing::warn!(
            sentence_index = failure.sentence_index,
            stage = ?failure.stage,
            kind = %failure.kind,
            attempts = failure.attempts,
            "Sentence failed: {}",
            failure.message
        );
    }

    let output = if args.diagnostics {
        serde_json::to_string_pretty(&run.report())?
    } else {
        serde_json::to_string_pretty(&run.claim_texts())?
    };
    println!("{}", output);

    Ok(())
}

async fn run_pipeline<J: Judge>(
    judge: J,
    config: PipelineConfig,
    text: &str,
    language: Option<&str>,
    deadline_secs: Option<u64>,
) -> Result<PipelineRun> {
    let pipeline = Claimify::new(judge).with_config(config);

    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        let deadline = async {
            match deadline_secs {
                Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => tracing::warn!("Interrupted, finishing with partial results"),
            _ = deadline => tracing::warn!("Deadline reached, finishing with partial results"),
        }
        trigger.cancel();
    });

    let run = pipeline
        .extract_with_cancel(text, language, cancel)
        .await
        .context("Claim extraction failed")?;

    Ok(run)
}

async fn check(config: &Config) -> Result<()> {
    let client = config.client();
    let response = client
        .chat_completion(
            ChatRequest::new(&config.model)
                .message(Message::system("You are a helpful assistant."))
                .message(Message::user("Say 'test successful' if you can read this."))
                .temperature(0.0)
                .max_tokens(16),
        )
        .await
        .context("OpenAI request failed")?;

    if !claimify::ai::supports_structured_output(&config.model) {
        bail!(
            "model {} is reachable but does not support structured outputs",
            config.model
        );
    }

    tracing::info!(
        model = %config.model,
        reply = %response.content.trim(),
        total_tokens = response.usage.map(|u| u.total_tokens),
        "Model reachable"
    );
    println!("ok");

    Ok(())
}

fn read_input(path: Option<&std::path::Path>) -> Result<String> {
    match path {
        Some(path) if path.as_os_str() != "-" => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        _ => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read stdin")?;
            Ok(text)
        }
    }
}
