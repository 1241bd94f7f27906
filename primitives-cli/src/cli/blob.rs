use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use clap::Subcommand;
use serde_json::json;

use primitives_core::blob::metadata::{self, PresignMode};
use primitives_core::blob::{transfer, ObjectStoreDriver, S3ObjectStore};
use primitives_core::config::ClientConfig;
use primitives_core::error::{CResult, Error};
use primitives_core::output::Record;

use crate::progressbar::PBAR;

#[derive(Debug, Subcommand)]
pub enum BlobCommand {
    /// Upload a local file to an object-store URI (`s3://bucket/key`),
    /// using multipart above `--multipart-threshold`.
    Put {
        local_path: PathBuf,
        uri: String,
    },
    /// Download an object, optionally a byte range `start-end`.
    Get {
        uri: String,
        local_path: PathBuf,
        #[clap(long)]
        range: Option<String>,
    },
    Head {
        uri: String,
    },
    Delete {
        uri: String,
    },
    /// List objects under `uri`'s bucket/prefix.
    List {
        uri: String,
    },
    /// Mirror every file under `local_dir` to `uri`'s bucket/prefix,
    /// skipping objects whose remote ETag already matches the local
    /// content.
    Sync {
        local_dir: PathBuf,
        uri: String,
    },
    Tag {
        uri: String,
        /// `key=value` pairs.
        #[clap(required = true)]
        tags: Vec<String>,
    },
    Untag {
        uri: String,
    },
    ListVersions {
        uri: String,
    },
    /// Presign a GET or PUT URL, valid for `--expires-in` seconds.
    Presign {
        uri: String,
        #[clap(long, value_enum, default_value = "get")]
        mode: PresignModeArg,
        #[clap(long, default_value_t = 900)]
        expires_in: u64,
    },
    /// Run an S3 Select SQL expression against a CSV object.
    Select {
        uri: String,
        sql: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum PresignModeArg {
    Get,
    Put,
}

impl From<PresignModeArg> for PresignMode {
    fn from(arg: PresignModeArg) -> Self {
        match arg {
            PresignModeArg::Get => PresignMode::Get,
            PresignModeArg::Put => PresignMode::Put,
        }
    }
}

/// Splits an object-store URI (`<scheme>://<bucket>/<key>`) into its
/// bucket and key/prefix parts. The scheme itself is ignored: this tool
/// only ever talks to S3, so `s3://`, `bucket://`, or a bare
/// `bucket/key` are all accepted.
fn parse_uri(raw: &str) -> CResult<(String, String)> {
    let without_scheme = raw.split_once("://").map(|(_, rest)| rest).unwrap_or(raw);
    let (bucket, key) = without_scheme
        .split_once('/')
        .ok_or_else(|| Error::InvalidArgument(format!("expected <bucket>/<key>: {raw}")))?;
    if bucket.is_empty() {
        return Err(Error::InvalidArgument(format!("missing bucket in uri: {raw}")));
    }
    Ok((bucket.to_string(), key.to_string()))
}

fn parse_range(raw: &str) -> CResult<(u64, u64)> {
    let (start, end) = raw.split_once('-').ok_or_else(|| Error::InvalidArgument(format!("range must be start-end: {raw}")))?;
    let start: u64 = start.parse().map_err(|_| Error::InvalidArgument(format!("invalid range start: {start}")))?;
    let end: u64 = end.parse().map_err(|_| Error::InvalidArgument(format!("invalid range end: {end}")))?;
    Ok((start, end))
}

fn parse_tags(raw: &[String]) -> CResult<HashMap<String, String>> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .ok_or_else(|| Error::InvalidArgument(format!("tag must be key=value: {pair}")))
        })
        .collect()
}

async fn store_for(uri: &str, config: &ClientConfig) -> CResult<(S3ObjectStore, String)> {
    let (bucket, key) = parse_uri(uri)?;
    Ok((S3ObjectStore::from_config(config.region.clone(), config.profile.clone(), bucket.clone()).await, key))
}

pub async fn run(cmd: BlobCommand, config: &ClientConfig) -> CResult<Record> {
    match cmd {
        BlobCommand::Put { local_path, uri } => {
            let (store, key) = store_for(&uri, config).await?;
            let bar = PBAR.bytes_bar(tokio::fs::metadata(&local_path).await?.len());
            let etag = transfer::upload_file(&store, &local_path, &key, config, Some(&|done, _total| bar.set_position(done))).await?;
            bar.finish_and_clear();
            Ok(Record::ok(json!({"key": key, "etag": etag})))
        }
        BlobCommand::Get { uri, local_path, range } => {
            let (store, key) = store_for(&uri, config).await?;
            let range = range.as_deref().map(parse_range).transpose()?;
            let bytes = transfer::download_file(&store, &key, &local_path, range).await?;
            Ok(Record::ok(json!({"key": key, "bytes": bytes})))
        }
        BlobCommand::Head { uri } => {
            let (store, key) = store_for(&uri, config).await?;
            match metadata::head(&store, &key).await? {
                Some(meta) => Ok(Record::ok(json!({
                    "key": meta.key,
                    "size": meta.size,
                    "etag": meta.etag,
                    "last_modified": meta.last_modified,
                    "storage_class": meta.storage_class,
                }))),
                None => Ok(Record::ok(serde_json::Value::Null)),
            }
        }
        BlobCommand::Delete { uri } => {
            let (store, key) = store_for(&uri, config).await?;
            store.delete_object(&key).await?;
            Ok(Record::empty_ok())
        }
        BlobCommand::List { uri } => {
            let (store, prefix) = store_for(&uri, config).await?;
            let (objects, _) = store.list_objects(&prefix, None).await?;
            let value = json!(objects
                .into_iter()
                .map(|o| json!({"key": o.key, "size": o.size, "etag": o.etag, "last_modified": o.last_modified}))
                .collect::<Vec<_>>());
            Ok(Record::ok(value))
        }
        BlobCommand::Sync { local_dir, uri } => {
            let (store, key_prefix) = store_for(&uri, config).await?;
            let actions = transfer::sync_directory(&store, &local_dir, &key_prefix, config).await?;
            let value = json!(actions
                .into_iter()
                .map(|action| match action {
                    transfer::SyncAction::Uploaded(key) => json!({"key": key, "action": "uploaded"}),
                    transfer::SyncAction::Skipped(key) => json!({"key": key, "action": "skipped"}),
                })
                .collect::<Vec<_>>());
            Ok(Record::ok(value))
        }
        BlobCommand::Tag { uri, tags } => {
            let (store, key) = store_for(&uri, config).await?;
            metadata::tag(&store, &key, parse_tags(&tags)?).await?;
            Ok(Record::empty_ok())
        }
        BlobCommand::Untag { uri } => {
            let (store, key) = store_for(&uri, config).await?;
            metadata::untag(&store, &key).await?;
            Ok(Record::empty_ok())
        }
        BlobCommand::ListVersions { uri } => {
            let (store, prefix) = store_for(&uri, config).await?;
            let versions = metadata::list_versions(&store, &prefix).await?;
            let value = json!(versions
                .into_iter()
                .map(|v| json!({
                    "key": v.key,
                    "version_id": v.version_id,
                    "is_latest": v.is_latest,
                    "size": v.size,
                    "last_modified": v.last_modified,
                }))
                .collect::<Vec<_>>());
            Ok(Record::ok(value))
        }
        BlobCommand::Presign { uri, mode, expires_in } => {
            let (store, key) = store_for(&uri, config).await?;
            let url = metadata::presign(&store, &key, mode.into(), Duration::from_secs(expires_in)).await?;
            Ok(Record::ok(json!({"url": url})))
        }
        BlobCommand::Select { uri, sql } => {
            let (store, key) = store_for(&uri, config).await?;
            let records = metadata::select(&store, &key, &sql).await?;
            Ok(Record::ok(json!({"records": String::from_utf8_lossy(&records)})))
        }
    }
}
