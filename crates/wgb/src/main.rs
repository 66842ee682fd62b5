use std::{sync::Arc, time::Duration};

use wgb_bridge::{BridgeClient, BridgeEvent};
use wgb_core::{
    broadcast::BroadcastScheduler,
    config::Config,
    messaging::port::MessagingPort,
    preview::PreviewFetcher,
    router::Router,
    store::{LinkCatalog, ModerationStore},
    Error,
};
use wgb_preview::HttpPreviewFetcher;

#[tokio::main]
async fn main() -> Result<(), Error> {
    wgb_core::logging::init("wgb")?;

    let cfg = Arc::new(Config::load()?);
    let sidecar_cmd = cfg.sidecar_cmd.clone().ok_or_else(|| {
        Error::Config("WGB_SIDECAR_CMD environment variable is required".to_string())
    })?;

    let catalog = LinkCatalog::new(cfg.broadcast_links.clone())?;
    let store = Arc::new(ModerationStore::new(catalog));
    let fetcher: Arc<dyn PreviewFetcher> = Arc::new(HttpPreviewFetcher::new(&cfg.user_agent)?);

    println!(
        "wgb started: {} catalog links, broadcast every {:?}",
        cfg.broadcast_links.len(),
        cfg.broadcast_interval
    );

    // Reconnect loop: a dropped connection respawns the sidecar and keeps the
    // in-memory state; only an explicit logout stops the process.
    loop {
        let bridge = Arc::new(BridgeClient::spawn(&sidecar_cmd).await?);
        match run_session(&cfg, store.clone(), fetcher.clone(), bridge.clone()).await {
            Ok(reconnect) => {
                let _ = bridge.shutdown().await;
                if !reconnect {
                    println!("[BRIDGE] Logged out, exiting");
                    return Ok(());
                }
                eprintln!("[BRIDGE] Connection closed, reconnecting");
            }
            Err(e) => {
                let _ = bridge.shutdown().await;
                eprintln!("[BRIDGE] Session failed: {e}, reconnecting");
            }
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    }
}

/// Drive one sidecar session to completion. Returns whether to reconnect.
async fn run_session(
    cfg: &Config,
    store: Arc<ModerationStore>,
    fetcher: Arc<dyn PreviewFetcher>,
    bridge: Arc<BridgeClient>,
) -> Result<bool, Error> {
    let messenger: Arc<dyn MessagingPort> = bridge.clone();
    let router = Router::new(store.clone(), messenger.clone());
    let scheduler = BroadcastScheduler::new(
        store,
        messenger,
        fetcher,
        cfg.broadcast_interval,
        cfg.preview_timeout,
    );

    let reconnect = loop {
        match bridge.next_event().await {
            // Sidecar stdout closed: treat as a dropped connection.
            Ok(None) => break true,
            Ok(Some(BridgeEvent::Connected)) => {
                println!("[BRIDGE] Connected");
                scheduler.start().await;
            }
            Ok(Some(BridgeEvent::Disconnected { should_reconnect })) => {
                println!("[BRIDGE] Disconnected (reconnect: {should_reconnect})");
                break should_reconnect;
            }
            Ok(Some(BridgeEvent::Message(msg))) => router.handle_incoming(msg).await,
            Ok(Some(BridgeEvent::Unknown)) => {}
            Err(e) => {
                scheduler.stop().await;
                return Err(e);
            }
        }
    };

    scheduler.stop().await;
    Ok(reconnect)
}
