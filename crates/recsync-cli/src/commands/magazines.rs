use recsync_core::models::{MagazineDraft, MagazinePatch};
use recsync_core::util::normalize_text_option;
use recsync_core::{ClientConfig, Magazine, Snapshot};

use crate::cli::{MagazineCommands, MagazineFields};
use crate::commands::common::{
    finish, format_magazine_line, format_summary, nullable_update, open_collection,
    parse_record_id, print_json, require_text, text_update,
};
use crate::error::CliError;

pub async fn run_magazines(
    command: MagazineCommands,
    config: &ClientConfig,
) -> Result<(), CliError> {
    match command {
        MagazineCommands::List { json } => {
            let snapshot = list_magazines(config).await?;
            if json {
                return print_json(&snapshot);
            }
            if snapshot.is_empty() {
                println!("No magazines.");
                return Ok(());
            }
            for magazine in &snapshot.items {
                println!("{}", format_magazine_line(magazine));
            }
            println!("{}", format_summary(&snapshot, "magazines"));
        }
        MagazineCommands::Add {
            title,
            fields,
            json,
        } => {
            let magazine = add_magazine(config, magazine_draft(title, fields)?).await?;
            print_magazine("Added", &magazine, json)?;
        }
        MagazineCommands::Update {
            id,
            title,
            fields,
            json,
        } => {
            let magazine = update_magazine(config, &id, magazine_patch(title, fields)?).await?;
            print_magazine("Updated", &magazine, json)?;
        }
        MagazineCommands::Remove { id } => {
            let removed = remove_magazine(config, &id).await?;
            println!("Removed {}", removed.id);
        }
    }
    Ok(())
}

fn print_magazine(action: &str, magazine: &Magazine, json: bool) -> Result<(), CliError> {
    if json {
        return print_json(magazine);
    }
    println!("{action} {}", format_magazine_line(magazine));
    Ok(())
}

pub fn magazine_draft(title: String, fields: MagazineFields) -> Result<MagazineDraft, CliError> {
    Ok(MagazineDraft {
        title: require_text(title, CliError::EmptyTitle)?,
        publisher: fields.publisher.unwrap_or_default().trim().to_string(),
        issue: fields.issue.unwrap_or_default().trim().to_string(),
        published_on: normalize_text_option(fields.published_on),
        description: fields.description.unwrap_or_default().trim().to_string(),
        cover_url: normalize_text_option(fields.cover_url),
    })
}

pub fn magazine_patch(
    title: Option<String>,
    fields: MagazineFields,
) -> Result<MagazinePatch, CliError> {
    let title = title
        .map(|title| require_text(title, CliError::EmptyTitle))
        .transpose()?;
    let patch = MagazinePatch {
        title,
        publisher: text_update(fields.publisher),
        issue: text_update(fields.issue),
        published_on: nullable_update(fields.published_on),
        description: text_update(fields.description),
        cover_url: nullable_update(fields.cover_url),
    };
    if patch == MagazinePatch::default() {
        return Err(CliError::NothingToUpdate);
    }
    Ok(patch)
}

pub async fn list_magazines(config: &ClientConfig) -> Result<Snapshot<Magazine>, CliError> {
    let controller = open_collection::<Magazine>(config).await?;
    let snapshot = controller.snapshot();
    controller.shutdown();
    Ok(snapshot)
}

pub async fn add_magazine(
    config: &ClientConfig,
    draft: MagazineDraft,
) -> Result<Magazine, CliError> {
    let controller = open_collection::<Magazine>(config).await?;
    let magazine = controller.add_record(draft);
    finish(&controller).await;
    Ok(magazine)
}

pub async fn update_magazine(
    config: &ClientConfig,
    id: &str,
    patch: MagazinePatch,
) -> Result<Magazine, CliError> {
    let id = parse_record_id(id)?;
    let controller = open_collection::<Magazine>(config).await?;
    let updated = controller.update_record(&id, patch);
    finish(&controller).await;
    updated.ok_or_else(|| CliError::RecordNotFound {
        kind: "magazine",
        id: id.to_string(),
    })
}

pub async fn remove_magazine(config: &ClientConfig, id: &str) -> Result<Magazine, CliError> {
    let id = parse_record_id(id)?;
    let controller = open_collection::<Magazine>(config).await?;
    let removed = controller.remove_record(&id);
    finish(&controller).await;
    removed.ok_or_else(|| CliError::RecordNotFound {
        kind: "magazine",
        id: id.to_string(),
    })
}
