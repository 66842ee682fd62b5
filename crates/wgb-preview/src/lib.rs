//! HTTP link-preview adapter (reqwest).
//!
//! Implements the `wgb-core` PreviewFetcher port: fetch the page (following
//! redirects, with a desktop-browser User-Agent) and scan the raw HTML for
//! `<title>` and the description meta tag.

use std::time::Duration;

use async_trait::async_trait;

use wgb_core::{
    errors::Error,
    preview::{LinkPreview, PreviewFetcher},
    Result,
};

const REDIRECT_LIMIT: usize = 10;

pub struct HttpPreviewFetcher {
    client: reqwest::Client,
}

impl HttpPreviewFetcher {
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(REDIRECT_LIMIT))
            .user_agent(user_agent)
            // The scheduler enforces its own deadline; this backstop keeps an
            // abandoned fetch from holding a connection indefinitely.
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Preview(format!("failed to build http client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl PreviewFetcher for HttpPreviewFetcher {
    async fn fetch(&self, url: &str) -> Result<LinkPreview> {
        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::Preview(format!("request failed for {url}: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Preview(format!("{url} returned {status}")));
        }

        let html = resp
            .text()
            .await
            .map_err(|e| Error::Preview(format!("body read failed for {url}: {e}")))?;

        Ok(LinkPreview {
            title: extract_title(&html).unwrap_or_default(),
            description: extract_meta_description(&html).unwrap_or_default(),
        })
    }
}

/// Text between the first `<title>` and `</title>`.
///
/// Deliberately a raw text scan, not an HTML parse: it only understands
/// simple unescaped tags, which is all the broadcast targets need. Pages
/// with attributes on the title tag or escaped markup fall back to `None`.
fn extract_title(html: &str) -> Option<String> {
    let start = html.find("<title>")? + "<title>".len();
    let end = html[start..].find("</title>")? + start;
    Some(html[start..end].to_string())
}

/// `content` attribute of `<meta name="description" content="...">`, matched
/// with the same narrow double-quoted shape the original scraper used.
fn extract_meta_description(html: &str) -> Option<String> {
    const NEEDLE: &str = "<meta name=\"description\" content=\"";
    let start = html.find(NEEDLE)? + NEEDLE.len();
    let end = html[start..].find('"')? + start;
    Some(html[start..end].to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<!doctype html>
<html>
<head>
<title>Example Shop</title>
<meta name="description" content="Great deals every day">
</head>
<body>hello</body>
</html>"#;

    #[test]
    fn extracts_title_and_description() {
        assert_eq!(extract_title(PAGE), Some("Example Shop".to_string()));
        assert_eq!(
            extract_meta_description(PAGE),
            Some("Great deals every day".to_string())
        );
    }

    #[test]
    fn missing_tags_yield_none() {
        let bare = "<html><body>nothing here</body></html>";
        assert_eq!(extract_title(bare), None);
        assert_eq!(extract_meta_description(bare), None);
    }

    #[test]
    fn empty_tags_yield_empty_strings() {
        let page = r#"<title></title><meta name="description" content="">"#;
        assert_eq!(extract_title(page), Some(String::new()));
        assert_eq!(extract_meta_description(page), Some(String::new()));
    }

    #[test]
    fn only_the_first_title_is_used() {
        let page = "<title>first</title><title>second</title>";
        assert_eq!(extract_title(page), Some("first".to_string()));
    }

    #[test]
    fn attributed_title_tag_is_not_matched() {
        // Known limitation of the raw scan.
        let page = r#"<title lang="en">Example</title>"#;
        assert_eq!(extract_title(page), None);
    }
}
