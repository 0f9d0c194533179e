use recsync_core::models::{SpeakerDraft, SpeakerPatch};
use recsync_core::util::normalize_text_option;
use recsync_core::{ClientConfig, RecordId, Session, Speaker};

use crate::cli::{SpeakerCommands, SpeakerFields};
use crate::commands::common::{
    finish, nullable_update, open_collection, parse_record_id, print_json, require_text,
    Controller,
};
use crate::error::CliError;

pub async fn run_speakers(
    command: SpeakerCommands,
    config: &ClientConfig,
) -> Result<(), CliError> {
    match command {
        SpeakerCommands::Add {
            session_id,
            name,
            fields,
            json,
        } => {
            let speaker = add_speaker(config, &session_id, speaker_draft(name, fields)?).await?;
            print_speaker("Added", &speaker, json)?;
        }
        SpeakerCommands::Update {
            session_id,
            speaker_id,
            name,
            fields,
            json,
        } => {
            let patch = speaker_patch(name, fields)?;
            let speaker = update_speaker(config, &session_id, &speaker_id, patch).await?;
            print_speaker("Updated", &speaker, json)?;
        }
        SpeakerCommands::Remove {
            session_id,
            speaker_id,
        } => {
            let removed = remove_speaker(config, &session_id, &speaker_id).await?;
            println!("Removed {} ({})", removed.id, removed.name);
        }
    }
    Ok(())
}

fn print_speaker(action: &str, speaker: &Speaker, json: bool) -> Result<(), CliError> {
    if json {
        return print_json(speaker);
    }
    println!("{action} {}  {}", speaker.id, speaker.name);
    Ok(())
}

pub fn speaker_draft(name: String, fields: SpeakerFields) -> Result<SpeakerDraft, CliError> {
    Ok(SpeakerDraft {
        name: require_text(name, CliError::EmptyName)?,
        bio: normalize_text_option(fields.bio),
        company: normalize_text_option(fields.company),
    })
}

pub fn speaker_patch(
    name: Option<String>,
    fields: SpeakerFields,
) -> Result<SpeakerPatch, CliError> {
    let name = name
        .map(|name| require_text(name, CliError::EmptyName))
        .transpose()?;
    let patch = SpeakerPatch {
        name,
        bio: nullable_update(fields.bio),
        company: nullable_update(fields.company),
    };
    if patch == SpeakerPatch::default() {
        return Err(CliError::NothingToUpdate);
    }
    Ok(patch)
}

/// Distinguish a missing session from a missing speaker for error reporting.
fn not_found(
    controller: &Controller<Session>,
    session_id: &RecordId,
    speaker_id: &RecordId,
) -> CliError {
    if controller.get(session_id).is_none() {
        CliError::RecordNotFound {
            kind: "session",
            id: session_id.to_string(),
        }
    } else {
        CliError::RecordNotFound {
            kind: "speaker",
            id: speaker_id.to_string(),
        }
    }
}

pub async fn add_speaker(
    config: &ClientConfig,
    session_id: &str,
    draft: SpeakerDraft,
) -> Result<Speaker, CliError> {
    let session_id = parse_record_id(session_id)?;
    let controller = open_collection::<Session>(config).await?;
    let added = controller.add_child(&session_id, draft);
    finish(&controller).await;
    added.ok_or_else(|| CliError::RecordNotFound {
        kind: "session",
        id: session_id.to_string(),
    })
}

pub async fn update_speaker(
    config: &ClientConfig,
    session_id: &str,
    speaker_id: &str,
    patch: SpeakerPatch,
) -> Result<Speaker, CliError> {
    let session_id = parse_record_id(session_id)?;
    let speaker_id = parse_record_id(speaker_id)?;
    let controller = open_collection::<Session>(config).await?;
    let updated = controller.update_child(&session_id, &speaker_id, patch);
    finish(&controller).await;
    updated.ok_or_else(|| not_found(&controller, &session_id, &speaker_id))
}

pub async fn remove_speaker(
    config: &ClientConfig,
    session_id: &str,
    speaker_id: &str,
) -> Result<Speaker, CliError> {
    let session_id = parse_record_id(session_id)?;
    let speaker_id = parse_record_id(speaker_id)?;
    let controller = open_collection::<Session>(config).await?;
    let removed = controller.remove_child(&session_id, &speaker_id);
    finish(&controller).await;
    removed.ok_or_else(|| not_found(&controller, &session_id, &speaker_id))
}
