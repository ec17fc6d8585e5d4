use anyhow::{Context as AnyhowContext, Result};
use callscreen_lookup::{
    fallback_message, format_dashed, normalize, price_bucket, summarize, variants, AccessPolicy,
    CallerLookup, LookupError, ScreenUpdate, ScreeningSession,
};
use callscreen_protocol::{event_schemas, serialize_json, ErrorEnvelope, PhoneState};
use callscreen_store::{DocumentStore, FirestoreStore, MemoryStore};
use clap::{Args, Parser, Subcommand};
use config::{CliConfig, SinkKind, StoreBackend};
use report::LookupReport;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::Instant;

mod config;
mod report;
mod sink;

fn print_stdout(text: &str) -> Result<()> {
    use std::io::Write;

    let mut stdout = io::stdout().lock();
    if let Err(err) = stdout
        .write_all(text.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        if err.kind() == io::ErrorKind::BrokenPipe {
            return Ok(());
        }
        return Err(err.into());
    }
    Ok(())
}

#[derive(Parser)]
#[command(name = "callscreen")]
#[command(about = "Incoming-call screening against a real-estate lead store", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./callscreen.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Lead store backend
    #[arg(long, global = true, value_enum)]
    store: Option<StoreBackend>,

    /// JSON fixture for the memory backend
    #[arg(long, global = true)]
    fixture: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the canonical form of a phone number
    Normalize(NormalizeArgs),

    /// Print every lookup form tried for a phone number
    Variants(NumberArgs),

    /// Bucket an asking price into Cr / L / K
    Price(PriceArgs),

    /// Look up a caller and print the summary (or the fallback message)
    Lookup(LookupArgs),

    /// Read phone-state lines from stdin and run a screening session
    Watch(WatchArgs),

    /// Print JSON schemas of the phone-state and companion event formats
    Schema,
}

#[derive(Args)]
struct NormalizeArgs {
    /// Phone number as delivered by the platform
    raw: String,

    /// Print as XXX-XXX-XXXX
    #[arg(long)]
    dashed: bool,
}

#[derive(Args)]
struct NumberArgs {
    /// Phone number as delivered by the platform
    raw: String,
}

#[derive(Args)]
struct PriceArgs {
    /// Asking price as stored on the listing
    raw: String,
}

#[derive(Args)]
struct LookupArgs {
    /// Phone number as delivered by the platform
    raw: String,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct WatchArgs {
    /// Print screen updates as JSON lines
    #[arg(long)]
    json: bool,

    /// Companion sink (overrides companion.sink)
    #[arg(long, value_enum)]
    sink: Option<SinkKind>,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    match cli.command {
        Commands::Normalize(args) => {
            let canonical = normalize(&args.raw);
            if args.dashed {
                print_stdout(&format_dashed(canonical.as_str()))
            } else {
                print_stdout(canonical.as_str())
            }
        }
        Commands::Variants(args) => {
            for variant in variants(&args.raw) {
                print_stdout(&variant)?;
            }
            Ok(())
        }
        Commands::Price(args) => match price_bucket(&args.raw) {
            Some(label) => print_stdout(&label),
            None => anyhow::bail!("Empty price"),
        },
        Commands::Lookup(args) => {
            let config = load_config(cli.config.as_deref(), cli.store, cli.fixture)?;
            run_lookup(&config, args).await
        }
        Commands::Watch(args) => {
            let mut config = load_config(cli.config.as_deref(), cli.store, cli.fixture)?;
            if let Some(sink) = args.sink {
                config.companion.sink = sink;
            }
            run_watch(&config, args.json).await
        }
        Commands::Schema => print_stdout(&serialize_json(&event_schemas())?),
    }
}

fn load_config(
    path: Option<&Path>,
    store: Option<StoreBackend>,
    fixture: Option<PathBuf>,
) -> Result<CliConfig> {
    let mut config = CliConfig::load(path)?;
    if let Some(store) = store {
        config.store.backend = store;
    }
    if fixture.is_some() {
        config.store.fixture = fixture;
    }
    Ok(config)
}

async fn build_lookup(config: &CliConfig) -> Result<CallerLookup> {
    let store: Arc<dyn DocumentStore> = match config.store.backend {
        StoreBackend::Memory => match &config.store.fixture {
            Some(path) => Arc::new(
                MemoryStore::load(path)
                    .await
                    .with_context(|| format!("Failed to load fixture {}", path.display()))?,
            ),
            None => {
                log::warn!("No fixture configured; every caller will be unknown");
                Arc::new(MemoryStore::new())
            }
        },
        StoreBackend::Firestore => {
            let store_config = config.firestore.to_store_config()?;
            Arc::new(FirestoreStore::new(store_config).context("Failed to set up Firestore")?)
        }
    };
    log::debug!("Using {} lead store", store.name());

    let access = match &config.principal {
        Some(principal) => AccessPolicy::Principal(Some(principal.clone())),
        None => AccessPolicy::Open,
    };
    Ok(CallerLookup::new(store).with_access(access))
}

fn error_code(err: &LookupError) -> &'static str {
    match err {
        LookupError::Transient(_) => "store_unavailable",
        LookupError::AccessDenied(_) => "access_denied",
        LookupError::Other(_) => "internal",
    }
}

async fn run_lookup(config: &CliConfig, args: LookupArgs) -> Result<()> {
    let lookup = build_lookup(config).await?;
    let canonical = normalize(&args.raw);
    let number = if canonical.is_empty() {
        args.raw.clone()
    } else {
        canonical.to_string()
    };

    let outcome = lookup.lookup(&args.raw).await;
    if args.json {
        let report = match outcome {
            Ok(result) => {
                let summary = summarize(&result);
                let fallback = summary.is_none().then(|| fallback_message(&number));
                LookupReport {
                    status: "ok",
                    number,
                    result: Some(result),
                    summary,
                    fallback,
                    error: None,
                }
            }
            Err(err) => {
                log::error!("Error fetching caller data for {number}: {err}");
                let envelope = ErrorEnvelope::new(error_code(&err), err.to_string());
                let envelope = match err {
                    LookupError::Transient(_) => {
                        envelope.with_hint("Check the store backend settings and connectivity")
                    }
                    _ => envelope,
                };
                LookupReport {
                    status: "error",
                    fallback: Some(fallback_message(&number)),
                    number,
                    result: None,
                    summary: None,
                    error: Some(envelope),
                }
            }
        };
        return print_stdout(&serialize_json(&report)?);
    }

    let text = match outcome {
        Ok(result) => match summarize(&result) {
            Some(summary) => report::caller_card(&summary),
            None => fallback_message(&number),
        },
        Err(err) => {
            log::error!("Error fetching caller data for {number}: {err}");
            fallback_message(&number)
        }
    };
    print_stdout(&text)
}

/// Screen buttons accepted on `watch` input alongside phone-state lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScreenCommand {
    Dismiss,
    Lead,
    Details,
}

impl ScreenCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "dismiss" | "done" => Some(Self::Dismiss),
            "lead" => Some(Self::Lead),
            "details" | "more" => Some(Self::Details),
            _ => None,
        }
    }
}

async fn run_watch(config: &CliConfig, json: bool) -> Result<()> {
    let lookup = build_lookup(config).await?;
    let companion = sink::build_sink(&config.companion)?;
    let (mut session, mut updates) = ScreeningSession::new(lookup, companion);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut input_open = true;
    // Set between a Loading screen and the update that resolves it.
    let mut awaiting_result = false;
    let mut deadline: Option<Instant> = None;

    loop {
        if !input_open && !awaiting_result && updates.is_empty() {
            break;
        }

        tokio::select! {
            line = lines.next_line(), if input_open => {
                match line.context("Failed to read stdin")? {
                    Some(line) if line.trim().is_empty() => {}
                    Some(line) => match ScreenCommand::parse(&line) {
                        Some(ScreenCommand::Dismiss) => session.dismiss(),
                        Some(ScreenCommand::Lead) => {
                            session.lead_action().await;
                        }
                        Some(ScreenCommand::Details) => {
                            session.show_details().await;
                        }
                        None => match PhoneState::parse_line(&line) {
                            Ok(state) => session.handle(state).await,
                            Err(err) => log::warn!("Skipping input line: {err:#}"),
                        },
                    },
                    None => {
                        log::debug!("Input closed");
                        input_open = false;
                    }
                }
            }
            Some(update) = updates.recv() => {
                awaiting_result = matches!(update, ScreenUpdate::Loading { .. });
                deadline = match &update {
                    ScreenUpdate::Caller { .. } => config.display.caller_dismiss(),
                    ScreenUpdate::Fallback { .. } => config.display.fallback_dismiss(),
                    ScreenUpdate::Loading { .. } | ScreenUpdate::Hidden => None,
                }
                .map(|after| Instant::now() + after);

                let text = if json {
                    serialize_json(&update)?
                } else {
                    report::screen_line(&update)
                };
                print_stdout(&text)?;
            }
            () = wait_until(deadline) => {
                log::debug!("Auto-dismissing screen");
                deadline = None;
                session.dismiss();
            }
        }
    }
    Ok(())
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn screen_commands_are_case_insensitive() {
        assert_eq!(ScreenCommand::parse(" Dismiss "), Some(ScreenCommand::Dismiss));
        assert_eq!(ScreenCommand::parse("LEAD"), Some(ScreenCommand::Lead));
        assert_eq!(ScreenCommand::parse("more"), Some(ScreenCommand::Details));
        assert_eq!(ScreenCommand::parse("RINGING 12345"), None);
    }
}
