//! `review`: command-line reviewer for the document portal.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use client::{
    api_client::PortalApiClient,
    config::ClientConfig,
    live_updates::LiveUpdateSubscription,
    review_driver::{ReviewDriver, SaveOutcome},
};
use common::{
    document_summary::StatusCounts,
    review_session::{ReviewSession, SessionState},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "review")]
#[command(about = "Review extracted document data")]
#[command(version)]
struct Args {
    /// Portal base URL [env: PORTAL_API_BASE_URL, default: http://localhost:8808]
    #[arg(long)]
    base_url: Option<String>,

    /// Per-request timeout in seconds [env: PORTAL_REQUEST_TIMEOUT_SECS, default: 30]
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Delay before reconnecting a dropped event stream, in milliseconds
    /// [env: PORTAL_RECONNECT_DELAY_MS, default: 2000]
    #[arg(long)]
    reconnect_delay_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List documents with per-status totals
    List,
    /// Print a document's header fields and table
    Show { doc_id: String },
    /// Edit fields, then save (and optionally approve)
    Edit {
        doc_id: String,
        /// Edit key and new value, e.g. `invoice_no=INV-9` or `2__amount=50.00`
        #[arg(long = "set", value_name = "KEY=VALUE", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        #[arg(long)]
        approve: bool,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Follow a document and reprint it after every reload
    Watch { doc_id: String },
    /// Print every live event
    WatchAll,
    /// Upload a document for processing
    Upload {
        file: PathBuf,
        #[arg(long = "type")]
        doc_type: Option<String>,
    },
}

fn parse_assignment(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{}`", arg)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut config = ClientConfig::from_env();
    if let Some(base_url) = args.base_url {
        config.base_url = base_url;
    }
    if let Some(secs) = args.timeout_secs {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(ms) = args.reconnect_delay_ms {
        config.reconnect_delay = Duration::from_millis(ms);
    }
    let api = PortalApiClient::new(&config)?;

    match args.command {
        Command::List => list(&api).await,
        Command::Show { doc_id } => show(api, doc_id).await,
        Command::Edit { doc_id, set, approve, yes } => edit(api, doc_id, set, approve, yes).await,
        Command::Watch { doc_id } => watch(&config, api, doc_id).await,
        Command::WatchAll => watch_all(&config).await,
        Command::Upload { file, doc_type } => upload(&api, file, doc_type).await,
    }
}

async fn list(api: &PortalApiClient) -> Result<()> {
    let items = api.list_documents().await?;
    let counts = StatusCounts::from_items(&items);
    println!(
        "queued: {}  processing: {}  ready: {}  error: {}  approved: {}",
        counts.queued, counts.processing, counts.ready, counts.error, counts.approved
    );
    for item in &items {
        println!(
            "{}  {:<10}  {:<10}  {}  {}",
            item.id,
            item.status,
            item.doc_type.as_deref().unwrap_or("-"),
            item.upload_time,
            item.original_name
        );
    }
    Ok(())
}

async fn show(api: PortalApiClient, doc_id: String) -> Result<()> {
    let mut driver = ReviewDriver::new(api, doc_id);
    driver.load().await;
    print_session(driver.session());
    match driver.state() {
        SessionState::Error(e) => bail!("{}", e),
        _ => Ok(()),
    }
}

async fn edit(
    api: PortalApiClient,
    doc_id: String,
    assignments: Vec<(String, String)>,
    approve: bool,
    yes: bool,
) -> Result<()> {
    let mut driver = ReviewDriver::new(api, doc_id.clone());
    match driver.load().await {
        SessionState::Ready => {}
        SessionState::Awaiting => bail!("document {} has no result yet", doc_id),
        SessionState::Error(e) => bail!("{}", e),
        state => bail!("document {} is not ready ({:?})", doc_id, state),
    }
    for (key, value) in assignments {
        driver.set_field(&key, value)?;
    }
    let pending = driver
        .prepare_save(approve)
        .context("no document loaded")?;
    if pending.changes.is_empty() {
        println!("no changes");
    }
    for (key, value) in &pending.changes {
        println!("{} -> {}", key, value);
    }
    if !yes && !confirm(if approve { "save and approve?" } else { "save?" })? {
        println!("cancelled");
        return Ok(());
    }
    match driver.commit_save(pending).await {
        Ok(SaveOutcome::Saved) => println!("saved"),
        Ok(SaveOutcome::SavedAndApproved) => println!("saved and approved"),
        Err(e) if e.edits_persisted() => {
            println!("saved but not approved");
            bail!("{}", e);
        }
        Err(e) => bail!("{}", e),
    }
    Ok(())
}

fn confirm(question: &str) -> Result<bool> {
    print!("{} [y/N] ", question);
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn watch(config: &ClientConfig, api: PortalApiClient, doc_id: String) -> Result<()> {
    let mut subscription = LiveUpdateSubscription::document(config, &doc_id)?;
    subscription.wait_connected().await;
    let mut driver = ReviewDriver::new(api, doc_id);
    driver.load().await;
    print_session(driver.session());

    let mut version = driver.session().document_version();
    while let Some(state) = driver.next_event(&mut subscription).await {
        if let SessionState::Error(e) = state {
            bail!("{}", e);
        }
        if driver.session().document_version() != version {
            version = driver.session().document_version();
            print_session(driver.session());
        }
    }
    Ok(())
}

async fn watch_all(config: &ClientConfig) -> Result<()> {
    let mut subscription = LiveUpdateSubscription::all(config)?;
    while let Some(event) = subscription.next().await {
        println!(
            "{}  {}{}",
            event.event.as_str(),
            event.doc_id.as_deref().unwrap_or("-"),
            event.error_message.map(|message| format!("  {}", message)).unwrap_or_default()
        );
    }
    Ok(())
}

async fn upload(api: &PortalApiClient, file: PathBuf, doc_type: Option<String>) -> Result<()> {
    let content = tokio::fs::read(&file)
        .await
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let filename = file
        .file_name()
        .and_then(|name| name.to_str())
        .context("file has no name")?;
    let detail = api.upload_document(filename, doc_type.as_deref(), content).await?;
    println!("{}  {}", detail.item.id, detail.item.status);
    Ok(())
}

fn print_session(session: &ReviewSession) {
    match session.state() {
        SessionState::Awaiting => {
            println!("{}: waiting for processing result", session.doc_id());
            return;
        }
        SessionState::Error(e) if session.document().is_none() => {
            println!("{}: {}", session.doc_id(), e);
            return;
        }
        _ => {}
    }
    let view = session.view();
    let edits = session.edits();
    println!("document {}", session.doc_id());
    for field in &view.header_fields {
        let key = field.field_name.as_str();
        println!("  {} [{}]: {}", field.label(), key, edits.get(key).unwrap_or_default());
    }
    if view.rows.is_empty() {
        return;
    }
    let labels: Vec<&str> = view.columns.iter().map(|column| view.column_label(column)).collect();
    println!("  row | {}", labels.join(" | "));
    for row in &view.rows {
        let cells: Vec<&str> = view.columns.iter().map(|column| row.cell(column)).collect();
        println!("  {:>3} | {}", row.index, cells.join(" | "));
    }
}
