//! The human approval channel: Bot-API long polling in, notifications out.
//!
//! Delivery is at-least-once: the offset is persisted only after a batch is
//! processed, so a crash in between can replay a command on restart.
//! Promotion is idempotent, which makes a duplicate YES harmless.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;

use shunt_core::config::{ChannelConfig, Config};
use shunt_core::io::atomic_write;
use shunt_core::pipeline::Notify;
use shunt_core::table::{Table, PROJECT_COL};
use shunt_core::{lifecycle, paths, Result, ShuntError};

use crate::scheduler::Scheduler;

// ---------------------------------------------------------------------------
// Command grammar
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// "YES" — promote the next row and request a run.
    Approve,
    /// "NO" — acknowledge, change nothing.
    Hold,
}

/// Case-insensitive match on the message's leading token. Anything else is
/// not a command and is ignored by this channel.
pub fn parse_command(text: &str) -> Option<Command> {
    match text.split_whitespace().next()?.to_ascii_uppercase().as_str() {
        "YES" => Some(Command::Approve),
        "NO" => Some(Command::Hold),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub text: Option<String>,
}

// ---------------------------------------------------------------------------
// CommandChannel
// ---------------------------------------------------------------------------

pub struct CommandChannel {
    client: reqwest::Client,
    api_base: String,
    bot_token: String,
    chat_id: i64,
    offset_path: PathBuf,
    poll_wait_seconds: u64,
    poll_idle_seconds: u64,
}

impl CommandChannel {
    pub fn new(config: &ChannelConfig, root: &Path) -> Result<Self> {
        let client = reqwest::Client::builder()
            // Long poll wait plus headroom for the round trip.
            .timeout(std::time::Duration::from_secs(config.poll_wait_seconds + 10))
            .build()
            .map_err(|e| ShuntError::Channel(e.to_string()))?;
        Ok(Self {
            client,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id,
            offset_path: paths::offset_path(root),
            poll_wait_seconds: config.poll_wait_seconds,
            poll_idle_seconds: config.poll_idle_seconds,
        })
    }

    fn api_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_base, self.bot_token, method)
    }

    /// Long-poll for message updates at the given offset.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let response = self
            .client
            .get(self.api_url("getUpdates"))
            .query(&[
                ("offset", offset.to_string()),
                ("timeout", self.poll_wait_seconds.to_string()),
                ("allowed_updates", "[\"message\"]".to_string()),
            ])
            .send()
            .await
            .map_err(|e| ShuntError::Channel(format!("getUpdates failed: {e}")))?;

        let body: ApiResponse<Vec<Update>> = response
            .json()
            .await
            .map_err(|e| ShuntError::Channel(format!("invalid getUpdates response: {e}")))?;
        if !body.ok {
            return Err(ShuntError::Channel(format!(
                "getUpdates rejected: {}",
                body.description.unwrap_or_default()
            )));
        }
        Ok(body.result.unwrap_or_default())
    }

    /// Send a text message to the configured chat.
    pub async fn send_message(&self, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "chat_id": self.chat_id,
            "text": text,
        });
        let response = self
            .client
            .post(self.api_url("sendMessage"))
            .json(&body)
            .send()
            .await
            .map_err(|e| ShuntError::Channel(format!("sendMessage failed: {e}")))?;

        let result: ApiResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| ShuntError::Channel(format!("invalid sendMessage response: {e}")))?;
        if !result.ok {
            return Err(ShuntError::Channel(format!(
                "sendMessage rejected: {}",
                result.description.unwrap_or_default()
            )));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Offset persistence
    // -----------------------------------------------------------------------

    /// Last persisted offset; 0 when the file is missing or unreadable.
    pub fn load_offset(&self) -> i64 {
        std::fs::read_to_string(&self.offset_path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(0)
    }

    pub fn store_offset(&self, offset: i64) -> Result<()> {
        atomic_write(&self.offset_path, format!("{offset}\n").as_bytes())
    }
}

// ---------------------------------------------------------------------------
// ChannelNotify
// ---------------------------------------------------------------------------

/// Fire-and-forget notifier backed by the command channel. Transport
/// failures are logged and swallowed; they never block pipeline progress.
pub struct ChannelNotify(pub Arc<CommandChannel>);

#[async_trait]
impl Notify for ChannelNotify {
    async fn notify(&self, text: &str) {
        if let Err(e) = self.0.send_message(text).await {
            tracing::warn!("notification dropped: {e}");
        }
    }
}

// ---------------------------------------------------------------------------
// Inbound loop
// ---------------------------------------------------------------------------

/// Approve the next row: run promotion and persist the table. A duplicate
/// approval short-circuits on the already-granted row and changes nothing.
pub fn approve(root: &Path, config: &Config) -> Result<Option<String>> {
    let table_path = config.table_path(root);
    let mut table = Table::load(&table_path)?;
    match lifecycle::promote(&mut table)? {
        Some(row) => {
            let project = table.get(row, PROJECT_COL).to_string();
            table.save(&table_path)?;
            tracing::info!(%project, "approval granted, row promoted");
            Ok(Some(project))
        }
        None => {
            tracing::info!("approval received but no row is eligible");
            Ok(None)
        }
    }
}

async fn handle_update(
    update: &Update,
    channel: &CommandChannel,
    scheduler: &Scheduler,
    root: &Path,
    config: &Config,
) -> anyhow::Result<()> {
    let Some(text) = update.message.as_ref().and_then(|m| m.text.as_deref()) else {
        return Ok(());
    };
    match parse_command(text) {
        Some(Command::Approve) => {
            approve(root, config)?;
            scheduler.request_run("approval").await;
        }
        Some(Command::Hold) => {
            if let Err(e) = channel
                .send_message("Holding. Reply YES when ready to continue.")
                .await
            {
                tracing::warn!("acknowledgement dropped: {e}");
            }
        }
        None => tracing::debug!(update_id = update.update_id, "ignoring non-command message"),
    }
    Ok(())
}

/// Poll for commands until shutdown. Transport errors are retried on the
/// normal cadence; only infrastructure failures (table/offset unwritable)
/// propagate and stop the daemon.
pub async fn poll_loop(
    channel: Arc<CommandChannel>,
    scheduler: Arc<Scheduler>,
    root: PathBuf,
    config: Config,
) -> anyhow::Result<()> {
    let idle = std::time::Duration::from_secs(channel.poll_idle_seconds.max(1));
    let mut offset = channel.load_offset();
    tracing::info!(offset, "command channel polling started");
    loop {
        let updates = match channel.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                tracing::warn!("command channel unreachable: {e}");
                tokio::time::sleep(idle).await;
                continue;
            }
        };
        if updates.is_empty() {
            tokio::time::sleep(idle).await;
            continue;
        }
        let max_id = updates.iter().map(|u| u.update_id).max().unwrap_or(offset);
        for update in &updates {
            handle_update(update, &channel, &scheduler, &root, &config).await?;
        }
        // Persisted only after the whole batch is processed.
        offset = max_id + 1;
        channel.store_offset(offset)?;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
