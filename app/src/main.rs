//! Spyglass Mail - command line entry point

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use spyglass_core::{
    init, open_webmail, ComposeDraft, GraphClient, InboxSync, Session, SpyglassConfig,
    SyncScheduler,
};

mod cli;
mod token;

use cli::{Cli, Command};
use token::EnvTokenProvider;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    // Initialize logging
    let default_level = if args.debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting Spyglass Mail v{}", env!("CARGO_PKG_VERSION"));

    init()?;

    // Load configuration
    let config = match &args.config {
        Some(path) => {
            let mut config = SpyglassConfig::load(path)
                .with_context(|| format!("loading {}", path.display()))?;
            config.apply_env_overrides();
            config
        }
        None => SpyglassConfig::load_or_default()?,
    };
    config.validate()?;

    if config.client_id().is_none() {
        warn!(
            "no client id configured; set app.client_id or the {} environment variable \
             for the external token tool",
            spyglass_core::CLIENT_ID_ENV_VAR
        );
    }

    match args.command {
        Command::Watch => watch(&config).await,
        Command::Send { to, subject, body } => send(&config, &to, &subject, &body).await,
        Command::OpenWeb => {
            open_webmail(&config.app.webmail_url)?;
            Ok(())
        }
    }
}

/// Session with an environment token provider and a Graph client attached
async fn build_session(config: &SpyglassConfig) -> anyhow::Result<Arc<Session>> {
    let tokens = Arc::new(EnvTokenProvider);
    let client = Arc::new(GraphClient::with_base_url(
        config.graph.base_url.clone(),
        tokens.clone(),
    )?);
    let session = Arc::new(Session::new(tokens));
    session.attach_client(client).await;
    Ok(session)
}

async fn watch(config: &SpyglassConfig) -> anyhow::Result<()> {
    let session = build_session(config).await?;
    let engine = Arc::new(InboxSync::with_options(
        session.clone(),
        config.sync.options(),
    ));
    session.observe(engine.autoload_observer()).await;

    session.sign_in().await.context("sign-in failed")?;

    // The autoload observer races this direct call; the engine's phase
    // guard lets exactly one load run at a time. Loop so a load that was
    // skipped (observer in flight) or failed in the observer is retried
    // here, where the error can propagate instead of hanging the command.
    while !engine.has_loaded().await {
        engine
            .initial_load()
            .await
            .context("initial mailbox load failed")?;
        if engine.has_loaded().await {
            break;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }

    let snapshot = engine.snapshot().await;
    println!(
        "{} ({}) - {} unread",
        snapshot.account_name, snapshot.time_zone, snapshot.unread
    );
    if !snapshot.events.is_empty() {
        println!("\nUpcoming events:");
        for event in &snapshot.events {
            println!("  {}  {}", event.start.format("%a %H:%M"), event.subject);
        }
    }
    println!("\nInbox ({} messages):", snapshot.items.len());
    for item in snapshot.items.iter().take(10) {
        let marker = if item.is_read { " " } else { "*" };
        println!(
            "{} {}  {}  {}",
            marker,
            item.received_at.format("%m-%d %H:%M"),
            item.sender_label(),
            item.subject
        );
    }

    let scheduler = SyncScheduler::start(engine.clone(), config.sync.poll_interval());
    println!(
        "\nPolling every {}s; press Ctrl-C to quit.",
        config.sync.poll_interval_secs
    );

    let mut seen = snapshot.items.len();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = tokio::time::sleep(Duration::from_secs(1)) => {
                let snapshot = engine.snapshot().await;
                if snapshot.items.len() > seen {
                    // fresh arrivals sit at the head; print oldest first
                    for item in snapshot.items[..snapshot.items.len() - seen].iter().rev() {
                        println!(
                            "* {}  {}  {}",
                            item.received_at.format("%m-%d %H:%M"),
                            item.sender_label(),
                            item.subject
                        );
                    }
                    seen = snapshot.items.len();
                }
            }
        }
    }

    scheduler.stop();
    info!("watch stopped");
    Ok(())
}

async fn send(config: &SpyglassConfig, to: &str, subject: &str, body: &str) -> anyhow::Result<()> {
    let session = build_session(config).await?;
    session.sign_in().await.context("sign-in failed")?;

    let mut draft = ComposeDraft::new();
    draft.set_recipient_line(to);
    if draft.recipients().is_empty() {
        anyhow::bail!(
            "no valid recipients in {to:?}; expected a semicolon-delimited list of addresses"
        );
    }
    draft.subject = subject.to_string();
    draft.body = body.to_string();

    let api = session
        .client()
        .await
        .context("no mailbox client attached")?;
    draft.send(api.as_ref()).await?;
    println!("Sent to {}.", draft.recipients().join("; "));
    Ok(())
}
