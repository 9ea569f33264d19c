use anyhow::{bail, Context as AnyhowContext, Result};
use clap::{Parser, ValueEnum};
use sense_cache::{CacheConfig, MemoizingCache};
use sense_client::{
    Authorization, HttpTransport, InterruptPolicy, RetryPolicy, RetryingInvoker,
};
use std::env;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[derive(Parser)]
#[command(name = "sense")]
#[command(about = "Word-sense disambiguation against a remote meaning-recognition service", long_about = None)]
#[command(version)]
struct Cli {
    /// Text to disambiguate; reads stdin when omitted
    text: Option<String>,

    /// Service endpoint URL (overrides SENSE_URL)
    #[arg(long)]
    url: Option<String>,

    /// Customer id for query-parameter authorization (overrides SENSE_CUSTOMER_ID)
    #[arg(long)]
    customer_id: Option<String>,

    /// API key for query-parameter authorization (overrides SENSE_API_KEY)
    #[arg(long)]
    api_key: Option<String>,

    /// Name of the request header carrying the key in header authorization
    #[arg(long, default_value = "x-api-key")]
    auth_header: String,

    /// Key for header authorization (overrides SENSE_HEADER_KEY)
    #[arg(long)]
    header_key: Option<String>,

    /// Directory for the durable cache (overrides SENSE_CACHE_DIR); no
    /// directory means a memory-only cache
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Maximum cache entries held in memory
    #[arg(long, default_value_t = 10_000)]
    max_entries: usize,

    /// Retries after the first failed attempt
    #[arg(long, default_value_t = 3)]
    retries: u32,

    /// Delay between attempts in milliseconds
    #[arg(long, default_value_t = 2_000)]
    retry_delay_ms: u64,

    /// What Ctrl-C during a retry delay does
    #[arg(long, value_enum, default_value_t = OnInterrupt::Proceed)]
    on_interrupt: OnInterrupt,

    /// Emit the raw service JSON instead of rendered readings
    #[arg(long)]
    json: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors (stdout is reserved for output)
    #[arg(long)]
    quiet: bool,
}

#[derive(Copy, Clone, ValueEnum)]
enum OnInterrupt {
    /// Skip the rest of the delay and retry immediately
    Proceed,
    /// Abandon the call
    Abort,
}

impl OnInterrupt {
    const fn as_policy(self) -> InterruptPolicy {
        match self {
            OnInterrupt::Proceed => InterruptPolicy::ProceedToNextRetry,
            OnInterrupt::Abort => InterruptPolicy::Abort,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let mut cli = Cli::parse();

    // Keep stdout clean for JSON parsing.
    if cli.json {
        cli.quiet = true;
    }
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let url = cli
        .url
        .clone()
        .or_else(|| env::var("SENSE_URL").ok())
        .context("No service endpoint: pass --url or set SENSE_URL")?;
    let auth = resolve_authorization(&cli)?;
    let cache_dir = cli
        .cache_dir
        .clone()
        .or_else(|| env::var("SENSE_CACHE_DIR").ok().map(PathBuf::from));

    let policy = RetryPolicy {
        max_retries: cli.retries,
        delay: Duration::from_millis(cli.retry_delay_ms),
        on_interrupt: cli.on_interrupt.as_policy(),
        ..RetryPolicy::default()
    };

    let interrupt = Arc::new(Notify::new());
    {
        let interrupt = interrupt.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                interrupt.notify_one();
            }
        });
    }

    let transport =
        Arc::new(HttpTransport::new(&url).with_context(|| format!("Invalid endpoint '{url}'"))?);
    let invoker =
        RetryingInvoker::new(transport, auth, policy).with_interrupt(interrupt);
    let config = CacheConfig {
        max_entries: cli.max_entries,
        store_dir: cache_dir,
        ..CacheConfig::default()
    };
    let cache = MemoizingCache::new(invoker, config).context("Failed to open the cache")?;

    let text = read_text(&cli)?;
    let result = cache
        .get(&text)
        .await
        .with_context(|| format!("Failed to disambiguate {}-char text", text.chars().count()))?;

    if cli.json {
        println!("{}", result.to_json()?);
        return Ok(());
    }
    for (index, variant) in result.variants().iter().enumerate() {
        println!("{:>3}: {variant}", index + 1);
    }
    Ok(())
}

/// Query-parameter credentials take precedence over a header key; both come
/// as a pair or not at all.
fn resolve_authorization(cli: &Cli) -> Result<Authorization> {
    let customer_id = cli
        .customer_id
        .clone()
        .or_else(|| env::var("SENSE_CUSTOMER_ID").ok());
    let api_key = cli.api_key.clone().or_else(|| env::var("SENSE_API_KEY").ok());

    match (customer_id, api_key) {
        (Some(customer_id), Some(api_key)) => {
            return Ok(Authorization::QueryParams {
                customer_id,
                api_key,
            })
        }
        (Some(_), None) => bail!("--customer-id given without --api-key"),
        (None, Some(_)) => bail!("--api-key given without --customer-id"),
        (None, None) => {}
    }

    let header_key = cli
        .header_key
        .clone()
        .or_else(|| env::var("SENSE_HEADER_KEY").ok());
    Ok(match header_key {
        Some(key) => Authorization::HeaderKey {
            header: cli.auth_header.clone(),
            key,
        },
        None => Authorization::Public,
    })
}

fn read_text(cli: &Cli) -> Result<String> {
    if let Some(text) = &cli.text {
        return Ok(text.clone());
    }
    let mut buffer = String::new();
    io::stdin()
        .read_to_string(&mut buffer)
        .context("Failed to read text from stdin")?;
    let text = buffer.trim();
    if text.is_empty() {
        bail!("No text to disambiguate: pass it as an argument or on stdin");
    }
    Ok(text.to_string())
}
