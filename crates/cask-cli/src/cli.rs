use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use cask_types::{HashAlgorithm, IdError};

#[derive(Parser)]
#[command(
    name = "cask",
    about = "Content-addressed file storage with versioned metadata",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Storage root directory.
    #[arg(short = 'd', long, global = true, default_value = ".cask")]
    pub data_dir: PathBuf,

    /// Digest algorithm for object identifiers (md5 or sha256).
    #[arg(long, global = true, default_value = "sha256", value_parser = parse_algorithm)]
    pub algorithm: HashAlgorithm,

    /// Increase log verbosity (-v, -vv, -vvv).
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

fn parse_algorithm(s: &str) -> Result<HashAlgorithm, IdError> {
    s.parse()
}

#[derive(Subcommand)]
pub enum Command {
    /// Store and retrieve content-addressed files
    File {
        #[command(subcommand)]
        command: FileCommand,
    },
    /// Read and write object metadata
    Metadata {
        #[command(subcommand)]
        command: MetadataCommand,
    },
}

#[derive(Subcommand)]
pub enum FileCommand {
    /// Ingest a file (or stdin) and print its object id
    Set(FileSetArgs),
    /// Stream a stored blob to a file (or stdout)
    Get(FileGetArgs),
}

#[derive(Args)]
pub struct FileSetArgs {
    /// Ingest this file and record its name/path as metadata;
    /// without it, raw bytes are read from stdin.
    #[arg(long)]
    pub filepath: Option<PathBuf>,
}

#[derive(Args)]
pub struct FileGetArgs {
    /// Object identifier (hex digest)
    pub object_id: String,

    /// Write the blob to this path instead of stdout
    #[arg(long)]
    pub filepath: Option<PathBuf>,

    /// Verify the digest while streaming; fails after the last byte if the
    /// stored blob is corrupt
    #[arg(long)]
    pub check_integrity: bool,
}

#[derive(Subcommand)]
pub enum MetadataCommand {
    /// Record property values for an object
    Set(MetadataSetArgs),
    /// Print the current value of one property
    Get(MetadataGetArgs),
    /// Print the current value of every property
    GetAll(MetadataGetAllArgs),
}

#[derive(Args)]
pub struct MetadataSetArgs {
    /// Object identifier (hex digest)
    pub object_id: String,

    /// KEY=VALUE pairs; values are parsed as JSON, falling back to strings
    #[arg(required = true)]
    pub properties: Vec<String>,

    /// Attribute the write to this user instead of the process user
    #[arg(long)]
    pub user: Option<String>,
}

#[derive(Args)]
pub struct MetadataGetArgs {
    /// Object identifier (hex digest)
    pub object_id: String,

    /// Property name
    pub identifier: String,
}

#[derive(Args)]
pub struct MetadataGetAllArgs {
    /// Object identifier (hex digest)
    pub object_id: String,

    /// Print the full history (every dataset with user and timestamp)
    /// instead of the latest values
    #[arg(long)]
    pub extended: bool,
}
