//! Periodic broadcast loop: every interval, push the next catalog link (with
//! a fetched preview) to every subscribed group.

use std::{sync::Arc, time::Duration};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::{
    messaging::port::MessagingPort,
    preview::{fetch_with_deadline, PreviewFetcher, PreviewOutcome},
    store::ModerationStore,
};

#[derive(Clone)]
pub struct BroadcastScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    store: Arc<ModerationStore>,
    messenger: Arc<dyn MessagingPort>,
    fetcher: Arc<dyn PreviewFetcher>,
    interval: Duration,
    preview_deadline: Duration,
    task: tokio::sync::Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl BroadcastScheduler {
    pub fn new(
        store: Arc<ModerationStore>,
        messenger: Arc<dyn MessagingPort>,
        fetcher: Arc<dyn PreviewFetcher>,
        interval: Duration,
        preview_deadline: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                messenger,
                fetcher,
                interval,
                preview_deadline,
                task: tokio::sync::Mutex::new(None),
            }),
        }
    }

    /// Spawn the interval loop. Idempotent: a second call while the loop is
    /// running does nothing.
    pub async fn start(&self) {
        let mut task = self.inner.task.lock().await;
        if task.is_some() {
            return;
        }

        let cancel = CancellationToken::new();
        let tok = cancel.clone();
        let scheduler = self.clone();
        let handle = tokio::spawn(async move {
            let mut tick = tokio::time::interval(scheduler.inner.interval);
            // A fresh interval fires immediately; skip that so the first
            // broadcast happens one full interval after start.
            tick.tick().await;
            loop {
                tokio::select! {
                  _ = tok.cancelled() => break,
                  _ = tick.tick() => scheduler.tick().await,
                }
            }
        });

        *task = Some((cancel, handle));
        println!("[BROADCAST] Scheduler started ({:?} interval)", self.inner.interval);
    }

    pub async fn stop(&self) {
        if let Some((cancel, handle)) = self.inner.task.lock().await.take() {
            cancel.cancel();
            handle.abort(); // best-effort
            println!("[BROADCAST] Scheduler stopped");
        }
    }

    /// One broadcast pass over the currently subscribed groups.
    ///
    /// Public so tests and operators can trigger a pass without waiting on the
    /// wall clock. Failures are isolated per group: a timed-out or failed
    /// preview skips that group only, and a failed send never aborts the rest
    /// of the pass.
    pub async fn tick(&self) {
        if !self.inner.store.link_sharing_enabled().await {
            return;
        }
        let groups = self.inner.store.subscribed_groups().await;
        if groups.is_empty() {
            return;
        }

        println!("[BROADCAST] Broadcasting to {} groups", groups.len());
        for group in groups {
            // The shared cursor advances once per group, not per tick.
            let (url, _) = self.inner.store.next_link().await;

            let outcome = fetch_with_deadline(
                self.inner.fetcher.as_ref(),
                &url,
                self.inner.preview_deadline,
            )
            .await;

            match outcome {
                PreviewOutcome::Ready(preview) => {
                    let text =
                        format!("{}\n\n{}\n{}", preview.title, preview.description, url);
                    if let Err(e) = self.inner.messenger.send_text(&group, &text).await {
                        eprintln!("[BROADCAST] Send failed for {}: {e}", group.0);
                    }
                }
                PreviewOutcome::TimedOut => {
                    eprintln!(
                        "[BROADCAST] Preview timed out for {url}, skipping {}",
                        group.0
                    );
                }
                PreviewOutcome::Failed(e) => {
                    eprintln!(
                        "[BROADCAST] Preview failed for {url} ({e}), skipping {}",
                        group.0
                    );
                }
            }
        }
    }
}
