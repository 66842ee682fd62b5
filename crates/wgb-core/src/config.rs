use std::{env, fs, path::Path, time::Duration};

use crate::Result;

/// Defaults mirror the original bot's literals.
const DEFAULT_BROADCAST_LINKS: &[&str] = &[
    "https://whattssapy.shop/",
    "https://whatsapp.chatinvite.shop/",
];

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

/// Typed configuration, fixed at startup.
#[derive(Clone, Debug)]
pub struct Config {
    /// Ordered catalog of URLs the broadcast loop rotates through.
    pub broadcast_links: Vec<String>,
    /// One broadcast pass over all subscribed groups per interval.
    pub broadcast_interval: Duration,
    /// Hard deadline for a single preview fetch.
    pub preview_timeout: Duration,
    /// User-Agent sent with preview requests.
    pub user_agent: String,
    /// Command line for the WhatsApp sidecar process. Required by the binary;
    /// core never spawns anything.
    pub sidecar_cmd: Option<String>,
}

impl Config {
    pub fn load() -> Result<Self> {
        load_dotenv_if_present(Path::new(".env"));

        let broadcast_links = parse_csv(env_str("WGB_BROADCAST_LINKS")).unwrap_or_else(|| {
            DEFAULT_BROADCAST_LINKS
                .iter()
                .map(|s| s.to_string())
                .collect()
        });

        let broadcast_interval =
            Duration::from_secs(env_u64("WGB_BROADCAST_INTERVAL_SECS").unwrap_or(600));
        let preview_timeout =
            Duration::from_millis(env_u64("WGB_PREVIEW_TIMEOUT_MS").unwrap_or(5000));
        let user_agent = env_str("WGB_USER_AGENT")
            .and_then(non_empty)
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let sidecar_cmd = env_str("WGB_SIDECAR_CMD").and_then(non_empty);

        Ok(Self {
            broadcast_links,
            broadcast_interval,
            preview_timeout,
            user_agent,
            sidecar_cmd,
        })
    }
}

fn load_dotenv_if_present(path: &Path) {
    let Ok(contents) = fs::read_to_string(path) else {
        return;
    };

    for raw in contents.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some((k, v)) = line.split_once('=') else {
            continue;
        };

        let key = k.trim();
        if key.is_empty() {
            continue;
        }
        if env::var_os(key).is_some() {
            continue; // do not override existing env
        }

        let mut val = v.trim().to_string();
        // Strip optional surrounding quotes.
        if val.len() >= 2
            && ((val.starts_with('"') && val.ends_with('"'))
                || (val.starts_with('\'') && val.ends_with('\'')))
        {
            val = val[1..val.len() - 1].to_string();
        }

        env::set_var(key, val);
    }
}

fn env_str(key: &str) -> Option<String> {
    env::var(key).ok()
}

fn env_u64(key: &str) -> Option<u64> {
    env_str(key).and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_csv(v: Option<String>) -> Option<Vec<String>> {
    let v = v?;
    let out = v
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect::<Vec<_>>();
    if out.is_empty() {
        None
    } else {
        Some(out)
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}
