use recsync_core::{ClientConfig, Collection, Magazine, Session, Snapshot};

use crate::cli::CollectionKind;
use crate::commands::common::{
    format_magazine_line, format_session_lines, format_summary, open_collection,
};
use crate::error::CliError;

pub async fn run_watch(collection: CollectionKind, config: &ClientConfig) -> Result<(), CliError> {
    match collection {
        CollectionKind::Magazines => {
            watch_collection::<Magazine>(config, |magazine| vec![format_magazine_line(magazine)])
                .await
        }
        CollectionKind::Sessions => watch_collection::<Session>(config, format_session_lines).await,
    }
}

async fn watch_collection<R: Collection>(
    config: &ClientConfig,
    render: fn(&R) -> Vec<String>,
) -> Result<(), CliError> {
    let controller = open_collection::<R>(config).await?;
    let mut changes = controller.watch();
    tracing::info!(
        "Watching {} (poll every {}s); press Ctrl-C to stop",
        R::NAME,
        config.poll_interval.as_secs()
    );

    let initial = changes.borrow_and_update().clone();
    print!("{}", render_snapshot(&initial, R::NAME, render));

    loop {
        tokio::select! {
            changed = changes.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = changes.borrow_and_update().clone();
                print!("{}", render_snapshot(&snapshot, R::NAME, render));
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    controller.settle().await;
    controller.shutdown();
    Ok(())
}

pub fn render_snapshot<R>(
    snapshot: &Snapshot<R>,
    noun: &str,
    render: fn(&R) -> Vec<String>,
) -> String {
    let mut output = format!("== {} ==\n", format_summary(snapshot, noun));
    for line in snapshot.items.iter().flat_map(render) {
        output.push_str(&line);
        output.push('\n');
    }
    output
}
