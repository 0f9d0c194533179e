use recsync_core::models::{SessionDraft, SessionPatch};
use recsync_core::util::normalize_text_option;
use recsync_core::{ClientConfig, Session, Snapshot};

use crate::cli::{SessionCommands, SessionFields};
use crate::commands::common::{
    finish, format_session_lines, format_summary, nullable_update, open_collection,
    parse_record_id, print_json, require_text, text_update,
};
use crate::error::CliError;

pub async fn run_sessions(
    command: SessionCommands,
    config: &ClientConfig,
) -> Result<(), CliError> {
    match command {
        SessionCommands::List { json } => {
            let snapshot = list_sessions(config).await?;
            if json {
                return print_json(&snapshot);
            }
            if snapshot.is_empty() {
                println!("No sessions.");
                return Ok(());
            }
            for session in &snapshot.items {
                for line in format_session_lines(session) {
                    println!("{line}");
                }
            }
            println!("{}", format_summary(&snapshot, "sessions"));
        }
        SessionCommands::Add {
            title,
            fields,
            json,
        } => {
            let session = add_session(config, session_draft(title, fields)?).await?;
            print_session("Added", &session, json)?;
        }
        SessionCommands::Update {
            id,
            title,
            fields,
            json,
        } => {
            let session = update_session(config, &id, session_patch(title, fields)?).await?;
            print_session("Updated", &session, json)?;
        }
        SessionCommands::Remove { id } => {
            let removed = remove_session(config, &id).await?;
            println!(
                "Removed {} ({} speakers)",
                removed.id,
                removed.speakers.len()
            );
        }
    }
    Ok(())
}

fn print_session(action: &str, session: &Session, json: bool) -> Result<(), CliError> {
    if json {
        return print_json(session);
    }
    let mut lines = format_session_lines(session).into_iter();
    if let Some(header) = lines.next() {
        println!("{action} {header}");
    }
    for line in lines {
        println!("{line}");
    }
    Ok(())
}

pub fn session_draft(title: String, fields: SessionFields) -> Result<SessionDraft, CliError> {
    Ok(SessionDraft {
        title: require_text(title, CliError::EmptyTitle)?,
        description: fields.description.unwrap_or_default().trim().to_string(),
        starts_at: normalize_text_option(fields.starts_at),
        room: normalize_text_option(fields.room),
    })
}

/// Speakers are edited through `recsync speakers`, so a session patch never
/// replaces the speaker list.
pub fn session_patch(
    title: Option<String>,
    fields: SessionFields,
) -> Result<SessionPatch, CliError> {
    let title = title
        .map(|title| require_text(title, CliError::EmptyTitle))
        .transpose()?;
    let patch = SessionPatch {
        title,
        description: text_update(fields.description),
        starts_at: nullable_update(fields.starts_at),
        room: nullable_update(fields.room),
        speakers: None,
    };
    if patch == SessionPatch::default() {
        return Err(CliError::NothingToUpdate);
    }
    Ok(patch)
}

pub async fn list_sessions(config: &ClientConfig) -> Result<Snapshot<Session>, CliError> {
    let controller = open_collection::<Session>(config).await?;
    let snapshot = controller.snapshot();
    controller.shutdown();
    Ok(snapshot)
}

pub async fn add_session(config: &ClientConfig, draft: SessionDraft) -> Result<Session, CliError> {
    let controller = open_collection::<Session>(config).await?;
    let session = controller.add_record(draft);
    finish(&controller).await;
    Ok(session)
}

pub async fn update_session(
    config: &ClientConfig,
    id: &str,
    patch: SessionPatch,
) -> Result<Session, CliError> {
    let id = parse_record_id(id)?;
    let controller = open_collection::<Session>(config).await?;
    let updated = controller.update_record(&id, patch);
    finish(&controller).await;
    updated.ok_or_else(|| CliError::RecordNotFound {
        kind: "session",
        id: id.to_string(),
    })
}

pub async fn remove_session(config: &ClientConfig, id: &str) -> Result<Session, CliError> {
    let id = parse_record_id(id)?;
    let controller = open_collection::<Session>(config).await?;
    let removed = controller.remove_record(&id);
    finish(&controller).await;
    removed.ok_or_else(|| CliError::RecordNotFound {
        kind: "session",
        id: id.to_string(),
    })
}
