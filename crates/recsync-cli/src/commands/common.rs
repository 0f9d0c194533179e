use std::path::PathBuf;

use chrono::{TimeZone, Utc};
use recsync_core::util::normalize_text_option;
use recsync_core::{
    ChangeBus, ClientConfig, Collection, Magazine, RecordId, RemoteBackend, Session, Snapshot,
    SyncController,
};
use serde::Serialize;

use crate::error::CliError;

pub type Controller<R> = SyncController<R, RemoteBackend>;

/// Environment configuration with command-line overrides applied.
pub fn resolve_config(
    api_url: Option<String>,
    data_dir: Option<PathBuf>,
) -> Result<ClientConfig, CliError> {
    resolve_config_with(ClientConfig::from_env()?, api_url, data_dir)
}

pub fn resolve_config_with(
    mut config: ClientConfig,
    api_url: Option<String>,
    data_dir: Option<PathBuf>,
) -> Result<ClientConfig, CliError> {
    if let Some(url) = api_url {
        config = config.with_api_base_url(url)?;
    }
    if let Some(dir) = data_dir {
        config = config.with_data_dir(dir);
    }
    Ok(config)
}

/// Build and activate a controller for collection `R`.
pub async fn open_collection<R: Collection>(
    config: &ClientConfig,
) -> Result<Controller<R>, CliError> {
    let controller = SyncController::from_config(config, ChangeBus::new())?;
    controller.activate().await;
    Ok(controller)
}

/// Wait for pending saves, then stop background work.
pub async fn finish<R: Collection>(controller: &Controller<R>) {
    controller.settle().await;
    controller.shutdown();
}

pub fn parse_record_id(raw: &str) -> Result<RecordId, CliError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(CliError::EmptyRecordId);
    }
    Ok(RecordId::from(trimmed))
}

pub fn require_text(raw: String, empty: CliError) -> Result<String, CliError> {
    normalize_text_option(Some(raw)).ok_or(empty)
}

/// Flag value for a nullable field: absent leaves it alone, empty clears it.
pub fn nullable_update(value: Option<String>) -> Option<Option<String>> {
    value.map(|raw| normalize_text_option(Some(raw)))
}

/// Flag value for a plain text field: surrounding whitespace is dropped.
pub fn text_update(value: Option<String>) -> Option<String> {
    value.map(|raw| raw.trim().to_string())
}

pub fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn format_version(last_modified: i64) -> String {
    Utc.timestamp_millis_opt(last_modified).single().map_or_else(
        || last_modified.to_string(),
        |time| format!("{last_modified} ({})", time.format("%Y-%m-%d %H:%M:%S UTC")),
    )
}

pub fn format_summary<R>(snapshot: &Snapshot<R>, noun: &str) -> String {
    format!(
        "{} {noun}, version {}",
        snapshot.len(),
        format_version(snapshot.last_modified)
    )
}

pub fn format_magazine_line(magazine: &Magazine) -> String {
    let details: Vec<&str> = [
        magazine.publisher.as_str(),
        magazine.issue.as_str(),
        magazine.published_on.as_deref().unwrap_or_default(),
    ]
    .into_iter()
    .filter(|part| !part.is_empty())
    .collect();

    if details.is_empty() {
        format!("{}  {}", magazine.id, magazine.title)
    } else {
        format!("{}  {} ({})", magazine.id, magazine.title, details.join(", "))
    }
}

pub fn format_session_lines(session: &Session) -> Vec<String> {
    let mut header = format!("{}  {}", session.id, session.title);
    if let Some(room) = &session.room {
        header.push_str(&format!(" @ {room}"));
    }
    if let Some(starts_at) = &session.starts_at {
        header.push_str(&format!(", {starts_at}"));
    }

    let mut lines = vec![header];
    lines.extend(session.speakers.iter().map(|speaker| {
        speaker.company.as_ref().map_or_else(
            || format!("    {}  {}", speaker.id, speaker.name),
            |company| format!("    {}  {} ({company})", speaker.id, speaker.name),
        )
    }));
    lines
}
