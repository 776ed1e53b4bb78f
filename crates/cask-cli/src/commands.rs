use std::collections::BTreeMap;

use anyhow::Context;
use colored::Colorize;
use serde_json::Value;
use tokio::io::AsyncWriteExt;

use cask_hash::{ByteSource, DEFAULT_CHUNK_SIZE};
use cask_storage::{Storage, StorageConfig};
use cask_types::ObjectId;

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = StorageConfig::new(&cli.data_dir).algorithm(cli.algorithm);
    let storage = Storage::open(config).await?;

    let result = match cli.command {
        Command::File { command } => match command {
            FileCommand::Set(args) => cmd_file_set(&storage, args).await,
            FileCommand::Get(args) => cmd_file_get(&storage, args).await,
        },
        Command::Metadata { command } => match command {
            MetadataCommand::Set(args) => cmd_metadata_set(&storage, args).await,
            MetadataCommand::Get(args) => cmd_metadata_get(&storage, args).await,
            MetadataCommand::GetAll(args) => cmd_metadata_get_all(&storage, args).await,
        },
    };

    storage.close().await;
    result
}

fn parse_object_id(s: &str) -> anyhow::Result<ObjectId> {
    s.parse::<ObjectId>()
        .with_context(|| format!("invalid object id {s:?}"))
}

async fn cmd_file_set(storage: &Storage, args: FileSetArgs) -> anyhow::Result<()> {
    let id = match args.filepath {
        Some(path) => storage
            .add_file_by_path(&path)
            .await
            .with_context(|| format!("failed to ingest {}", path.display()))?,
        None => {
            let source = ByteSource::Reader(Box::new(tokio::io::stdin()));
            storage.put_file(source).await.context("failed to ingest stdin")?
        }
    };
    println!("{id}");
    Ok(())
}

async fn cmd_file_get(storage: &Storage, args: FileGetArgs) -> anyhow::Result<()> {
    let id = parse_object_id(&args.object_id)?;
    let mut reader = storage.get_file(&id, args.check_integrity).await?;

    let mut out: Box<dyn tokio::io::AsyncWrite + Unpin> = match &args.filepath {
        Some(path) => Box::new(
            tokio::fs::File::create(path)
                .await
                .with_context(|| format!("failed to create {}", path.display()))?,
        ),
        None => Box::new(tokio::io::stdout()),
    };

    while let Some(chunk) = reader.next_chunk(DEFAULT_CHUNK_SIZE).await? {
        out.write_all(&chunk).await?;
    }
    out.flush().await?;
    Ok(())
}

async fn cmd_metadata_set(storage: &Storage, args: MetadataSetArgs) -> anyhow::Result<()> {
    let id = parse_object_id(&args.object_id)?;

    let mut properties = BTreeMap::new();
    for pair in &args.properties {
        let (key, raw) = pair
            .split_once('=')
            .with_context(|| format!("expected KEY=VALUE, got {pair:?}"))?;
        // JSON when it parses, plain string otherwise.
        let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        properties.insert(key.to_string(), value);
    }

    let dataset_id = storage
        .set_metadata(&id, properties, args.user.as_deref(), None)
        .await?;
    println!("{dataset_id}");
    Ok(())
}

async fn cmd_metadata_get(storage: &Storage, args: MetadataGetArgs) -> anyhow::Result<()> {
    let id = parse_object_id(&args.object_id)?;
    let value = storage.get_metadata(&id, &args.identifier).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

async fn cmd_metadata_get_all(storage: &Storage, args: MetadataGetAllArgs) -> anyhow::Result<()> {
    let id = parse_object_id(&args.object_id)?;

    if args.extended {
        let history = storage.get_all_metadata_extended(&id).await?;
        for record in history {
            println!(
                "{} {} {} {} = {}",
                format!("#{}", record.dataset_id).dimmed(),
                record.timestamp_utc.to_rfc3339().cyan(),
                record.user.yellow(),
                record.identifier.bold(),
                serde_json::to_string(&record.value)?,
            );
        }
    } else {
        let all = storage.get_all_metadata(&id).await?;
        println!("{}", serde_json::to_string_pretty(&all)?);
    }
    Ok(())
}
