use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

#[derive(Parser)]
#[command(name = "recsync")]
#[command(about = "Inspect and edit synchronized record collections")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Remote API base URL (overrides RECSYNC_API_BASE_URL)
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Directory for local mirror files (overrides RECSYNC_DATA_DIR)
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage the magazine catalogue
    Magazines {
        #[command(subcommand)]
        command: MagazineCommands,
    },
    /// Manage conference sessions
    Sessions {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Manage the speakers of a session
    Speakers {
        #[command(subcommand)]
        command: SpeakerCommands,
    },
    /// Keep a collection synchronized and print every change until Ctrl-C
    Watch {
        #[arg(value_enum)]
        collection: CollectionKind,
    },
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum CollectionKind {
    Magazines,
    Sessions,
}

#[derive(Subcommand)]
pub enum MagazineCommands {
    /// List all magazines
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a magazine
    Add {
        title: String,
        #[command(flatten)]
        fields: MagazineFields,
        /// Output the created record as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update fields of a magazine
    Update {
        /// Magazine ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: MagazineFields,
        #[arg(long)]
        json: bool,
    },
    /// Remove a magazine
    #[command(alias = "rm")]
    Remove {
        /// Magazine ID
        id: String,
    },
}

/// Optional magazine fields; an empty value clears a nullable field.
#[derive(clap::Args, Debug, Default)]
pub struct MagazineFields {
    #[arg(long)]
    pub publisher: Option<String>,
    #[arg(long)]
    pub issue: Option<String>,
    /// Publication date, e.g. 2024-05-01
    #[arg(long, value_name = "DATE")]
    pub published_on: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_name = "URL")]
    pub cover_url: Option<String>,
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// List all sessions with their speakers
    List {
        #[arg(long)]
        json: bool,
    },
    /// Add a session
    Add {
        title: String,
        #[command(flatten)]
        fields: SessionFields,
        #[arg(long)]
        json: bool,
    },
    /// Update fields of a session
    Update {
        /// Session ID
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[command(flatten)]
        fields: SessionFields,
        #[arg(long)]
        json: bool,
    },
    /// Remove a session and its speakers
    #[command(alias = "rm")]
    Remove {
        /// Session ID
        id: String,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct SessionFields {
    #[arg(long)]
    pub description: Option<String>,
    /// Start time, e.g. 2024-05-01T09:30
    #[arg(long, value_name = "TIME")]
    pub starts_at: Option<String>,
    #[arg(long)]
    pub room: Option<String>,
}

#[derive(Subcommand)]
pub enum SpeakerCommands {
    /// Add a speaker to a session
    Add {
        /// Session ID
        session_id: String,
        name: String,
        #[command(flatten)]
        fields: SpeakerFields,
        #[arg(long)]
        json: bool,
    },
    /// Update a speaker of a session
    Update {
        session_id: String,
        speaker_id: String,
        #[arg(long)]
        name: Option<String>,
        #[command(flatten)]
        fields: SpeakerFields,
        #[arg(long)]
        json: bool,
    },
    /// Remove a speaker from a session
    #[command(alias = "rm")]
    Remove {
        session_id: String,
        speaker_id: String,
    },
}

#[derive(clap::Args, Debug, Default)]
pub struct SpeakerFields {
    #[arg(long)]
    pub bio: Option<String>,
    #[arg(long)]
    pub company: Option<String>,
}
