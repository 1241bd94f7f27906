//! upload/download orchestration above [`ObjectStoreDriver`]:
//! single-PUT vs multipart classification, a bounded-concurrency part
//! uploader with abort-on-failure, and a directory sync pass that skips
//! objects whose remote ETag already matches the local file.

use std::path::Path;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use md5::{Digest, Md5};

use crate::blob::store::{etag_matches_local, ObjectStoreDriver};
use crate::config::{ClientConfig, MULTIPART_CHUNK_CEIL_BYTES, MULTIPART_CHUNK_FLOOR_BYTES, MULTIPART_MAX_PARTS};
use crate::error::{CResult, Error};

/// Invoked after each chunk completes with `(bytes_done, bytes_total)`.
pub type ProgressFn<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;

/// Clamps the configured chunk size into S3's allowed part-size range and,
/// if that would still exceed `MULTIPART_MAX_PARTS` parts, grows it until
/// it fits.
fn effective_chunk_size(file_size: u64, config: &ClientConfig) -> u64 {
    let mut chunk = config.chunk_size.clamp(MULTIPART_CHUNK_FLOOR_BYTES, MULTIPART_CHUNK_CEIL_BYTES);
    while file_size / chunk.max(1) + 1 > MULTIPART_MAX_PARTS as u64 {
        chunk = (chunk * 2).min(MULTIPART_CHUNK_CEIL_BYTES);
        if chunk == MULTIPART_CHUNK_CEIL_BYTES {
            break;
        }
    }
    chunk
}

/// Uploads `local_path` to `key`, choosing a single `PutObject` below
/// `config.multipart_threshold` and a concurrent multipart upload above it.
pub async fn upload_file(
    store: &dyn ObjectStoreDriver,
    local_path: &Path,
    key: &str,
    config: &ClientConfig,
    progress: Option<&ProgressFn<'_>>,
) -> CResult<String> {
    let metadata = tokio::fs::metadata(local_path).await?;
    let size = metadata.len();
    let content_type = mime_guess::from_path(local_path).first().map(|m| m.to_string());

    if size < config.multipart_threshold {
        let body = tokio::fs::read(local_path).await?;
        let total = body.len() as u64;
        let etag = store.put_object(key, Bytes::from(body), content_type.as_deref()).await?;
        if let Some(progress) = progress {
            progress(total, total);
        }
        return Ok(etag);
    }

    let chunk_size = effective_chunk_size(size, config);
    let upload_id = store.create_multipart_upload(key, content_type.as_deref()).await?;

    let part_count = size.div_ceil(chunk_size);
    let offsets: Vec<(i32, u64, u64)> = (0..part_count)
        .map(|i| {
            let start = i * chunk_size;
            let end = (start + chunk_size).min(size);
            (i as i32 + 1, start, end)
        })
        .collect();

    let done = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
    let local_path = local_path.to_path_buf();
    let results = stream::iter(offsets.into_iter().map(|(part_number, start, end)| {
        let store = &*store;
        let local_path = local_path.clone();
        let done = done.clone();
        async move {
            let chunk = read_range(&local_path, start, end).await?;
            let chunk_len = chunk.len() as u64;
            let etag = store.upload_part(key, &upload_id, part_number, chunk).await?;
            let so_far = done.fetch_add(chunk_len, std::sync::atomic::Ordering::SeqCst) + chunk_len;
            Ok::<_, Error>((part_number, etag, so_far))
        }
    }))
    .buffer_unordered(config.max_concurrency.max(1))
    .collect::<Vec<_>>()
    .await;

    let mut parts = Vec::with_capacity(results.len());
    for result in results {
        match result {
            Ok((part_number, etag, so_far)) => {
                if let Some(progress) = progress {
                    progress(so_far, size);
                }
                parts.push((part_number, etag));
            }
            Err(err) => {
                let _ = store.abort_multipart_upload(key, &upload_id).await;
                return Err(err);
            }
        }
    }
    parts.sort_by_key(|(part_number, _)| *part_number);
    store.complete_multipart_upload(key, &upload_id, parts).await
}

async fn read_range(path: &Path, start: u64, end: u64) -> CResult<Bytes> {
    use tokio::io::{AsyncReadExt, AsyncSeekExt};
    let mut file = tokio::fs::File::open(path).await?;
    file.seek(std::io::SeekFrom::Start(start)).await?;
    let mut buf = vec![0u8; (end - start) as usize];
    file.read_exact(&mut buf).await?;
    Ok(Bytes::from(buf))
}

/// Downloads `key` to `local_path`, optionally restricted to a byte range
/// (resumable downloads build on this).
pub async fn download_file(
    store: &dyn ObjectStoreDriver,
    key: &str,
    local_path: &Path,
    range: Option<(u64, u64)>,
) -> CResult<u64> {
    let body = store.get_object(key, range).await?;
    if let Some(parent) = local_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(local_path, &body).await?;
    Ok(body.len() as u64)
}

fn md5_hex(bytes: &[u8]) -> String {
    let mut hasher = Md5::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Uploaded(String),
    Skipped(String),
}

/// Walks `local_dir` and uploads every file whose path, joined onto
/// `key_prefix`, either doesn't exist remotely or has a different
/// single-part ETag (multipart-uploaded objects always get re-uploaded,
/// since their ETag isn't a plain content MD5, a known sync-skip
/// limitation).
pub async fn sync_directory(
    store: &dyn ObjectStoreDriver,
    local_dir: &Path,
    key_prefix: &str,
    config: &ClientConfig,
) -> CResult<Vec<SyncAction>> {
    let mut actions = Vec::new();
    for entry in walkdir::WalkDir::new(local_dir).into_iter().filter_map(Result::ok) {
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(local_dir).map_err(|e| Error::Internal(e.to_string()))?;
        let key = format!("{}/{}", key_prefix.trim_end_matches('/'), relative.to_string_lossy().replace('\\', "/"));

        let local_bytes = tokio::fs::read(entry.path()).await?;
        let local_hash = md5_hex(&local_bytes);
        let remote = store.head_object(&key).await?;
        let unchanged = remote.as_ref().map(|m| etag_matches_local(&m.etag, &local_hash)).unwrap_or(false);
        if unchanged {
            actions.push(SyncAction::Skipped(key));
            continue;
        }
        upload_file(store, entry.path(), &key, config, None).await?;
        actions.push(SyncAction::Uploaded(key));
    }
    Ok(actions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunk_size_grows_to_respect_part_count_ceiling() {
        let mut config = ClientConfig::default();
        config.chunk_size = 5 * 1024 * 1024;
        let huge = MULTIPART_MAX_PARTS as u64 * 5 * 1024 * 1024 * 3;
        let chunk = effective_chunk_size(huge, &config);
        assert!(huge / chunk + 1 <= MULTIPART_MAX_PARTS as u64);
    }

    #[test]
    fn md5_hex_is_stable() {
        assert_eq!(md5_hex(b"hello"), "5d41402abc4b2a76b9719d911017c592");
    }
}
