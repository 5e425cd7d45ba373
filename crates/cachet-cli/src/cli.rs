use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "cachet",
    about = "Existence-cached documents, blobs and directories",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Settings file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Overrides `data_root` from the settings file
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Work with documents
    #[command(subcommand)]
    Doc(DocCommand),
    /// Work with blob objects
    #[command(subcommand)]
    Blob(BlobCommand),
    /// Work with emulated directories
    #[command(subcommand)]
    Dir(DirCommand),
}

#[derive(Subcommand)]
pub enum DocCommand {
    /// Print a document as JSON
    Get(DocKeyArgs),
    /// Create a document unless it exists
    Put(DocPutArgs),
    /// Create a document inside a sub-collection of an existing document
    PutSub(DocPutSubArgs),
    /// Replace an existing document
    Update(DocWriteArgs),
    /// Delete a document
    Delete(DocKeyArgs),
    /// Check whether a document exists
    Exists(DocKeyArgs),
    /// List document ids in a collection
    List(CollectionArgs),
}

#[derive(Args)]
pub struct CollectionArgs {
    /// Collection path, e.g. `users` or `users/alice/orders`
    pub collection: String,
}

#[derive(Args)]
pub struct DocKeyArgs {
    pub collection: String,
    pub id: String,
}

#[derive(Args)]
pub struct DocPutArgs {
    pub collection: String,
    /// Document body as JSON
    pub json: String,
    /// Unique key; the backend assigns one when omitted
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Args)]
pub struct DocPutSubArgs {
    pub collection: String,
    pub parent_id: String,
    /// Name of the sub-collection
    pub sub_collection: String,
    pub json: String,
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Args)]
pub struct DocWriteArgs {
    pub collection: String,
    pub id: String,
    pub json: String,
}

#[derive(Subcommand)]
pub enum BlobCommand {
    /// Upload a local file
    Upload(BlobUploadArgs),
    /// Delete an object
    Delete(BlobKeyArgs),
    /// Check whether an object exists
    Exists(BlobKeyArgs),
    /// List object keys
    List(BlobListArgs),
}

#[derive(Args)]
pub struct BucketArg {
    /// Overrides `storage_bucket` from the settings file
    #[arg(short, long)]
    pub bucket: Option<String>,
}

#[derive(Args)]
pub struct BlobUploadArgs {
    pub file: PathBuf,
    /// Object key; defaults to the file name
    pub key: Option<String>,
    #[command(flatten)]
    pub bucket: BucketArg,
}

#[derive(Args)]
pub struct BlobKeyArgs {
    pub key: String,
    #[command(flatten)]
    pub bucket: BucketArg,
}

#[derive(Args)]
pub struct BlobListArgs {
    #[arg(default_value = "")]
    pub prefix: String,
    #[command(flatten)]
    pub bucket: BucketArg,
}

#[derive(Subcommand)]
pub enum DirCommand {
    /// Create a directory if it does not exist
    Create(DirArgs),
    /// Check whether a directory exists
    Exists(DirArgs),
    /// List the immediate children of a directory
    Ls(DirLsArgs),
}

#[derive(Args)]
pub struct DirArgs {
    pub path: String,
    #[command(flatten)]
    pub bucket: BucketArg,
}

#[derive(Args)]
pub struct DirLsArgs {
    #[arg(default_value = "")]
    pub path: String,
    #[command(flatten)]
    pub bucket: BucketArg,
}
