//! Link-preview port and the fetch-vs-deadline race.

use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// Fetched link metadata used to format a broadcast message.
///
/// Both fields default to empty strings when the page does not carry the
/// corresponding tag; "no preview at all" is a failure, not an empty preview.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LinkPreview {
    pub title: String,
    pub description: String,
}

/// Port for retrieving a link preview. Implemented over HTTP in `wgb-preview`.
#[async_trait]
pub trait PreviewFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<LinkPreview>;
}

/// Outcome of racing a preview fetch against a deadline.
#[derive(Debug)]
pub enum PreviewOutcome {
    Ready(LinkPreview),
    TimedOut,
    Failed(Error),
}

/// First of {fetch result, deadline}. The losing fetch is dropped; the
/// underlying transport releases its resources on its own.
pub async fn fetch_with_deadline(
    fetcher: &dyn PreviewFetcher,
    url: &str,
    deadline: Duration,
) -> PreviewOutcome {
    match tokio::time::timeout(deadline, fetcher.fetch(url)).await {
        Ok(Ok(preview)) => PreviewOutcome::Ready(preview),
        Ok(Err(e)) => PreviewOutcome::Failed(e),
        Err(_) => PreviewOutcome::TimedOut,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowFetcher {
        delay: Duration,
    }

    #[async_trait]
    impl PreviewFetcher for SlowFetcher {
        async fn fetch(&self, _url: &str) -> Result<LinkPreview> {
            tokio::time::sleep(self.delay).await;
            Ok(LinkPreview {
                title: "T".to_string(),
                description: "D".to_string(),
            })
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl PreviewFetcher for FailingFetcher {
        async fn fetch(&self, url: &str) -> Result<LinkPreview> {
            Err(Error::Preview(format!("boom: {url}")))
        }
    }

    #[tokio::test]
    async fn fast_fetch_wins_the_race() {
        let fetcher = SlowFetcher {
            delay: Duration::from_millis(1),
        };
        let out = fetch_with_deadline(&fetcher, "https://a.example/", Duration::from_secs(5)).await;
        match out {
            PreviewOutcome::Ready(p) => assert_eq!(p.title, "T"),
            other => panic!("expected Ready, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn slow_fetch_times_out() {
        let fetcher = SlowFetcher {
            delay: Duration::from_secs(5),
        };
        let out =
            fetch_with_deadline(&fetcher, "https://a.example/", Duration::from_millis(5)).await;
        assert!(matches!(out, PreviewOutcome::TimedOut));
    }

    #[tokio::test]
    async fn fetch_error_is_a_distinct_outcome() {
        let out =
            fetch_with_deadline(&FailingFetcher, "https://a.example/", Duration::from_secs(5))
                .await;
        assert!(matches!(out, PreviewOutcome::Failed(_)));
    }
}
