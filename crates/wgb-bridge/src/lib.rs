//! WhatsApp sidecar bridge.
//!
//! The protocol client (connection lifecycle, auth, credential persistence,
//! transport) lives in an external sidecar process; this crate drives it over
//! NDJSON stdio: one JSON event per stdout line in, one JSON command per
//! stdin line out.

use std::{collections::VecDeque, process::Stdio, sync::Arc};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines},
    process::{Child, ChildStdin, ChildStdout, Command},
    sync::Mutex,
};

use wgb_core::{
    domain::{ChatId, MessageId, MessageRef, ParticipantId},
    errors::Error,
    messaging::{port::MessagingPort, types::IncomingMessage},
    Result,
};

const STDERR_TAIL_MAX_BYTES: usize = 16 * 1024;
const STDERR_TAIL_MAX_LINES: usize = 200;

/// Inbound event from the sidecar, reduced to what the bot reacts to.
#[derive(Clone, Debug)]
pub enum BridgeEvent {
    Connected,
    Disconnected { should_reconnect: bool },
    Message(IncomingMessage),
    /// Unrecognized event kind; tolerated and skipped.
    Unknown,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum WireEvent {
    Connected,
    Disconnected {
        #[serde(default)]
        logged_out: bool,
    },
    Message(WireMessage),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    chat_id: String,
    sender: String,
    message_id: String,
    #[serde(default)]
    text: Option<String>,
}

impl From<WireEvent> for BridgeEvent {
    fn from(wire: WireEvent) -> Self {
        match wire {
            WireEvent::Connected => BridgeEvent::Connected,
            WireEvent::Disconnected { logged_out } => BridgeEvent::Disconnected {
                // Anything but an explicit logout is worth reconnecting.
                should_reconnect: !logged_out,
            },
            WireEvent::Message(m) => BridgeEvent::Message(IncomingMessage {
                chat_id: ChatId(m.chat_id),
                sender: ParticipantId(m.sender),
                message_id: MessageId(m.message_id),
                text: m.text,
            }),
            WireEvent::Other => BridgeEvent::Unknown,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
enum WireCommand<'a> {
    Send {
        chat_id: &'a str,
        text: &'a str,
    },
    Delete {
        chat_id: &'a str,
        message_id: &'a str,
        participant: &'a str,
        from_me: bool,
    },
}

#[derive(Debug, Default)]
struct StderrTail {
    lines: VecDeque<String>,
    bytes: usize,
}

impl StderrTail {
    fn push_line(&mut self, line: String) {
        // +1 for the '\n' we join with later.
        self.bytes = self.bytes.saturating_add(line.len() + 1);
        self.lines.push_back(line);

        while self.lines.len() > STDERR_TAIL_MAX_LINES || self.bytes > STDERR_TAIL_MAX_BYTES {
            if let Some(front) = self.lines.pop_front() {
                self.bytes = self.bytes.saturating_sub(front.len() + 1);
            } else {
                break;
            }
        }
    }

    fn snapshot(&self) -> String {
        self.lines.iter().cloned().collect::<Vec<_>>().join("\n")
    }
}

/// Handle to a running sidecar process.
///
/// Outbound commands are serialized through a stdin mutex; inbound events are
/// pulled one at a time with `next_event`. Stderr is drained into a bounded
/// tail that gets attached to parse-failure reports.
pub struct BridgeClient {
    child: Mutex<Option<Child>>,
    stdin: Mutex<Option<ChildStdin>>,
    stdout: Mutex<Lines<BufReader<ChildStdout>>>,
    stderr_tail: Arc<Mutex<StderrTail>>,
}

impl BridgeClient {
    /// Spawn the sidecar. `cmd` is a shell-style command line; the first word
    /// is the program, the rest its arguments.
    pub async fn spawn(cmd: &str) -> Result<Self> {
        let mut parts = cmd.split_whitespace();
        let program = parts
            .next()
            .ok_or_else(|| Error::Config("sidecar command is empty".to_string()))?;

        let mut command = Command::new(program);
        command
            .args(parts)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command.spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| Error::Transport("sidecar stdin was not captured".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| Error::Transport("sidecar stdout was not captured".to_string()))?;
        let stderr = child.stderr.take();

        let stderr_tail: Arc<Mutex<StderrTail>> = Arc::new(Mutex::new(StderrTail::default()));

        // Drain stderr in background to avoid blocking on a full pipe.
        if let Some(stderr) = stderr {
            let tail = stderr_tail.clone();
            tokio::spawn(async move {
                let mut r = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = r.next_line().await {
                    tail.lock().await.push_line(line);
                }
            });
        }

        println!("[BRIDGE] Sidecar spawned: {program}");

        Ok(Self {
            child: Mutex::new(Some(child)),
            stdin: Mutex::new(Some(stdin)),
            stdout: Mutex::new(BufReader::new(stdout).lines()),
            stderr_tail,
        })
    }

    /// Next event from the sidecar. `None` means its stdout closed (the
    /// process exited or was shut down).
    pub async fn next_event(&self) -> Result<Option<BridgeEvent>> {
        loop {
            let line = self.stdout.lock().await.next_line().await?;
            let Some(line) = line else {
                return Ok(None);
            };
            if line.trim().is_empty() {
                continue;
            }

            let wire: WireEvent = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    let stderr = self.stderr_tail.lock().await.snapshot();
                    let mut msg = format!(
                        "sidecar event parse failed: {e}\nstdout line: {}",
                        truncate_line(&line, 500)
                    );
                    if !stderr.trim().is_empty() {
                        msg.push_str("\nstderr (tail):\n");
                        msg.push_str(&stderr);
                    }
                    return Err(Error::Transport(msg));
                }
            };

            return Ok(Some(wire.into()));
        }
    }

    async fn write_command(&self, cmd: &WireCommand<'_>) -> Result<()> {
        let mut line = serde_json::to_string(cmd)?;
        line.push('\n');

        let mut guard = self.stdin.lock().await;
        let Some(stdin) = guard.as_mut() else {
            return Err(Error::Transport("sidecar is shut down".to_string()));
        };
        stdin
            .write_all(line.as_bytes())
            .await
            .map_err(|e| Error::Transport(format!("sidecar write failed: {e}")))?;
        stdin
            .flush()
            .await
            .map_err(|e| Error::Transport(format!("sidecar flush failed: {e}")))?;
        Ok(())
    }

    /// Kill and reap the sidecar (best-effort). Closing stdin first lets a
    /// cooperative sidecar exit on its own.
    pub async fn shutdown(&self) -> Result<()> {
        {
            self.stdin.lock().await.take();
        }

        let child = {
            let mut guard = self.child.lock().await;
            guard.take()
        };

        let Some(mut child) = child else {
            return Ok(());
        };

        // If it's already exited, `try_wait` reaps it.
        if child.try_wait()?.is_some() {
            return Ok(());
        }

        // If kill fails and the process is still alive, keep the handle so
        // callers can retry instead of losing track of the child.
        match child.kill().await {
            Ok(()) => {
                let _ = child.wait().await?;
            }
            Err(e) => {
                // If it exited between `try_wait` and `kill`, `wait` reaps it.
                if child.try_wait()?.is_none() {
                    let mut guard = self.child.lock().await;
                    *guard = Some(child);
                    return Err(Error::Io(e));
                }
            }
        }

        Ok(())
    }
}

#[async_trait]
impl MessagingPort for BridgeClient {
    async fn send_text(&self, chat_id: &ChatId, text: &str) -> Result<()> {
        self.write_command(&WireCommand::Send {
            chat_id: &chat_id.0,
            text,
        })
        .await
    }

    async fn delete_message(&self, msg: &MessageRef) -> Result<()> {
        // Moderation deletions always target someone else's message.
        self.write_command(&WireCommand::Delete {
            chat_id: &msg.chat_id.0,
            message_id: &msg.message_id.0,
            participant: &msg.participant.0,
            from_me: false,
        })
        .await
    }
}

fn truncate_line(s: &str, max_len: usize) -> String {
    if s.len() <= max_len {
        return s.to_string();
    }
    let mut out = s.chars().take(max_len).collect::<String>();
    out.push_str("...");
    out
}
