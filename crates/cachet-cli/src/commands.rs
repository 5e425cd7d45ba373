use std::path::Path;

use anyhow::Context;
use cachet_sdk::{Cachet, CachetSettings, CollectionPath, DocumentDescriptor, EntryKind, PathKey};
use colored::Colorize;
use serde_json::Value;

use crate::cli::*;

const DEFAULT_SETTINGS_FILE: &str = "cachet.toml";

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut settings = load_settings(cli.config.as_deref())?;
    if let Some(root) = cli.root {
        settings = settings.with_data_root(root);
    }
    if let Some(bucket) = bucket_override(&cli.command) {
        settings = settings.with_storage_bucket(bucket);
    }
    let cachet = Cachet::open_local(settings).await?;

    let result = match cli.command {
        Command::Doc(cmd) => cmd_doc(&cachet, cmd).await,
        Command::Blob(cmd) => cmd_blob(&cachet, cmd).await,
        Command::Dir(cmd) => cmd_dir(&cachet, cmd).await,
    };
    tracing::debug!(
        documents = ?cachet.documents().cache().stats(),
        blobs = ?cachet.blobs().cache().stats(),
        "cache statistics"
    );
    result
}

/// Explicit `--config`, else `./cachet.toml` if present, else defaults.
fn load_settings(path: Option<&Path>) -> anyhow::Result<CachetSettings> {
    match path {
        Some(path) => CachetSettings::load(path)
            .with_context(|| format!("loading settings from {}", path.display())),
        None if Path::new(DEFAULT_SETTINGS_FILE).is_file() => {
            Ok(CachetSettings::load(DEFAULT_SETTINGS_FILE)?)
        }
        None => {
            tracing::debug!("no settings file found; using defaults");
            Ok(CachetSettings::default())
        }
    }
}

fn bucket_override(command: &Command) -> Option<&str> {
    let arg = match command {
        Command::Doc(_) => return None,
        Command::Blob(BlobCommand::Upload(args)) => &args.bucket,
        Command::Blob(BlobCommand::Delete(args) | BlobCommand::Exists(args)) => &args.bucket,
        Command::Blob(BlobCommand::List(args)) => &args.bucket,
        Command::Dir(DirCommand::Create(args) | DirCommand::Exists(args)) => &args.bucket,
        Command::Dir(DirCommand::Ls(args)) => &args.bucket,
    };
    arg.bucket.as_deref()
}

fn parse_json(text: &str) -> anyhow::Result<Value> {
    serde_json::from_str(text).context("document body is not valid JSON")
}

fn document_key(collection: &str, id: &str) -> anyhow::Result<PathKey> {
    let collection = CollectionPath::parse(collection)?;
    Ok(PathKey::document(&collection, id)?)
}

fn descriptor(collection: CollectionPath, id: Option<&str>, body: Value) -> anyhow::Result<DocumentDescriptor<Value>> {
    Ok(match id {
        Some(id) => DocumentDescriptor::keyed(collection, id, body)?,
        None => DocumentDescriptor::auto(collection, body),
    })
}

fn print_exists(what: &str, exists: bool) {
    if exists {
        println!("{} {} exists", "✓".green(), what.bold());
    } else {
        println!("{} {} does not exist", "✗".red(), what.bold());
    }
}

// ---- doc ----

async fn cmd_doc(cachet: &Cachet, cmd: DocCommand) -> anyhow::Result<()> {
    let docs = cachet.documents();
    match cmd {
        DocCommand::Get(args) => {
            let key = document_key(&args.collection, &args.id)?;
            match docs.read_key::<Value>(&key).await? {
                Some(doc) => println!("{}", serde_json::to_string_pretty(&doc)?),
                None => anyhow::bail!("document {key} not found"),
            }
        }
        DocCommand::Put(args) => {
            let collection = CollectionPath::parse(&args.collection)?;
            let doc = descriptor(collection, args.id.as_deref(), parse_json(&args.json)?)?;
            match doc.path_key() {
                Some(key) => {
                    if docs.insert(&doc).await? {
                        println!("{} Created {}", "✓".green().bold(), key.to_string().yellow());
                    } else {
                        println!("{} {} already exists; nothing written", "!".yellow().bold(), key);
                    }
                }
                None => {
                    let key = docs.add(&doc).await?;
                    println!("{} Created {}", "✓".green().bold(), key.to_string().yellow());
                }
            }
        }
        DocCommand::PutSub(args) => {
            let collection = CollectionPath::parse(&args.collection)?;
            let parent = DocumentDescriptor::keyed(collection, &args.parent_id, Value::Null)?;
            let sub_collection = CollectionPath::root(&args.sub_collection)?;
            let sub = descriptor(sub_collection, args.id.as_deref(), parse_json(&args.json)?)?;
            docs.insert_with_subcollection(&parent, &sub).await?;
            println!(
                "{} Created document in {}/{}/{}",
                "✓".green().bold(),
                args.collection,
                args.parent_id,
                args.sub_collection.yellow()
            );
        }
        DocCommand::Update(args) => {
            let collection = CollectionPath::parse(&args.collection)?;
            let doc = DocumentDescriptor::keyed(collection, &args.id, parse_json(&args.json)?)?;
            if docs.update(&doc).await? {
                println!("{} Updated {}", "✓".green().bold(), args.id.yellow());
            } else {
                anyhow::bail!("document {} does not exist", args.id);
            }
        }
        DocCommand::Delete(args) => {
            let key = document_key(&args.collection, &args.id)?;
            if docs.delete(&key).await? {
                println!("{} Deleted {}", "✓".green().bold(), key.to_string().yellow());
            } else {
                println!("{} {} does not exist; nothing deleted", "!".yellow().bold(), key);
            }
        }
        DocCommand::Exists(args) => {
            let key = document_key(&args.collection, &args.id)?;
            print_exists(key.as_str(), docs.exists(&key).await?);
        }
        DocCommand::List(args) => {
            let collection = CollectionPath::parse(&args.collection)?;
            let keys = docs.list(&collection).await?;
            if keys.is_empty() {
                println!("No documents in {}.", collection.as_str().bold());
            }
            for key in keys {
                println!("  {}", key.id());
            }
        }
    }
    Ok(())
}

// ---- blob ----

async fn cmd_blob(cachet: &Cachet, cmd: BlobCommand) -> anyhow::Result<()> {
    let blobs = cachet.blobs();
    let bucket = cachet.bucket()?;
    match cmd {
        BlobCommand::Upload(args) => {
            let key = match args.key {
                Some(key) => key,
                None => args
                    .file
                    .file_name()
                    .and_then(|name| name.to_str())
                    .map(str::to_string)
                    .context("cannot derive an object key from the file name; pass one explicitly")?,
            };
            blobs.upload(bucket, &key, &args.file).await?;
            println!(
                "{} Uploaded {} to {}/{}",
                "✓".green().bold(),
                args.file.display(),
                bucket.bold(),
                key.yellow()
            );
        }
        BlobCommand::Delete(args) => {
            blobs.delete(bucket, &args.key).await?;
            println!("{} Deleted {}/{}", "✓".green().bold(), bucket.bold(), args.key.yellow());
        }
        BlobCommand::Exists(args) => {
            print_exists(&format!("{bucket}/{}", args.key), blobs.exists(bucket, &args.key).await?);
        }
        BlobCommand::List(args) => {
            let keys = blobs.list(bucket, &args.prefix).await?;
            if keys.is_empty() {
                println!("No objects.");
            }
            for key in keys {
                println!("  {key}");
            }
        }
    }
    Ok(())
}

// ---- dir ----

async fn cmd_dir(cachet: &Cachet, cmd: DirCommand) -> anyhow::Result<()> {
    let dirs = cachet.directories()?;
    match cmd {
        DirCommand::Create(args) => {
            dirs.create_directory(&args.path).await?;
            println!("{} Directory {} ready", "✓".green().bold(), args.path.yellow());
        }
        DirCommand::Exists(args) => {
            print_exists(&args.path, dirs.directory_exists(&args.path).await?);
        }
        DirCommand::Ls(args) => {
            let entries = dirs.list_directory(&args.path).await?;
            if entries.is_empty() {
                println!("Empty.");
            }
            for entry in entries {
                match entry.kind {
                    EntryKind::Directory => println!("  {}/", entry.name.blue().bold()),
                    EntryKind::File => println!("  {}", entry.name),
                }
            }
        }
    }
    Ok(())
}
