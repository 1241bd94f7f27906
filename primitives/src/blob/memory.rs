//! An in-memory [`ObjectStoreDriver`] double, grounded the same way
//! [`crate::store::memory::MemoryItemStore`] is: no network, no
//! credentials, used by the blob primitive's test suite.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;

use crate::blob::store::{ObjectMeta, ObjectStoreDriver, ObjectVersion};
use crate::error::{CResult, Error};
use crate::item::now_seconds;

struct StoredObject {
    body: Bytes,
    etag: String,
    last_modified: i64,
    tags: HashMap<String, String>,
}

struct PendingUpload {
    key: String,
    parts: Vec<(i32, Bytes)>,
}

#[derive(Default)]
pub struct MemoryObjectStore {
    objects: Mutex<HashMap<String, StoredObject>>,
    uploads: Mutex<HashMap<String, PendingUpload>>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn etag_of(body: &[u8]) -> String {
    use md5::{Digest, Md5};
    let mut hasher = Md5::new();
    hasher.update(body);
    format!("\"{:x}\"", hasher.finalize())
}

#[async_trait]
impl ObjectStoreDriver for MemoryObjectStore {
    async fn put_object(&self, key: &str, body: Bytes, _content_type: Option<&str>) -> CResult<String> {
        let etag = etag_of(&body);
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject { body, etag: etag.clone(), last_modified: now_seconds(), tags: HashMap::new() },
        );
        Ok(etag)
    }

    async fn get_object(&self, key: &str, range: Option<(u64, u64)>) -> CResult<Bytes> {
        let objects = self.objects.lock().unwrap();
        let object = objects.get(key).ok_or_else(|| Error::NotFound(key.to_string()))?;
        Ok(match range {
            Some((start, end)) => object.body.slice(start as usize..(end as usize).min(object.body.len())),
            None => object.body.clone(),
        })
    }

    async fn head_object(&self, key: &str) -> CResult<Option<ObjectMeta>> {
        Ok(self.objects.lock().unwrap().get(key).map(|o| ObjectMeta {
            key: key.to_string(),
            size: o.body.len() as u64,
            etag: o.etag.clone(),
            last_modified: o.last_modified,
            storage_class: None,
        }))
    }

    async fn delete_object(&self, key: &str) -> CResult<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }

    async fn list_objects(&self, prefix: &str, _continuation_token: Option<String>) -> CResult<(Vec<ObjectMeta>, Option<String>)> {
        let objects = self.objects.lock().unwrap();
        let mut out: Vec<ObjectMeta> = objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, o)| ObjectMeta { key: k.clone(), size: o.body.len() as u64, etag: o.etag.clone(), last_modified: o.last_modified, storage_class: None })
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok((out, None))
    }

    async fn create_multipart_upload(&self, key: &str, _content_type: Option<&str>) -> CResult<String> {
        let upload_id = uuid::Uuid::new_v4().to_string();
        self.uploads.lock().unwrap().insert(upload_id.clone(), PendingUpload { key: key.to_string(), parts: Vec::new() });
        Ok(upload_id)
    }

    async fn upload_part(&self, _key: &str, upload_id: &str, part_number: i32, body: Bytes) -> CResult<String> {
        let etag = etag_of(&body);
        let mut uploads = self.uploads.lock().unwrap();
        let upload = uploads.get_mut(upload_id).ok_or_else(|| Error::NotFound(format!("upload {upload_id}")))?;
        upload.parts.push((part_number, body));
        Ok(etag)
    }

    async fn complete_multipart_upload(&self, key: &str, upload_id: &str, mut parts: Vec<(i32, String)>) -> CResult<String> {
        let mut uploads = self.uploads.lock().unwrap();
        let mut upload = uploads.remove(upload_id).ok_or_else(|| Error::NotFound(format!("upload {upload_id}")))?;
        upload.parts.sort_by_key(|(n, _)| *n);
        parts.sort_by_key(|(n, _)| *n);
        let mut body = Vec::new();
        for (_, chunk) in upload.parts {
            body.extend_from_slice(&chunk);
        }
        let etag = etag_of(&body);
        self.objects.lock().unwrap().insert(
            key.to_string(),
            StoredObject { body: Bytes::from(body), etag: etag.clone(), last_modified: now_seconds(), tags: HashMap::new() },
        );
        Ok(etag)
    }

    async fn abort_multipart_upload(&self, _key: &str, upload_id: &str) -> CResult<()> {
        self.uploads.lock().unwrap().remove(upload_id);
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> CResult<String> {
        Ok(format!("https://example-bucket.s3.amazonaws.com/{key}?X-Amz-Expires={}", expires_in.as_secs()))
    }

    async fn presign_put(&self, key: &str, expires_in: Duration) -> CResult<String> {
        self.presign_get(key, expires_in).await
    }

    async fn put_tags(&self, key: &str, tags: HashMap<String, String>) -> CResult<()> {
        let mut objects = self.objects.lock().unwrap();
        let object = objects.get_mut(key).ok_or_else(|| Error::NotFound(key.to_string()))?;
        object.tags = tags;
        Ok(())
    }

    async fn delete_tags(&self, key: &str) -> CResult<()> {
        let mut objects = self.objects.lock().unwrap();
        let object = objects.get_mut(key).ok_or_else(|| Error::NotFound(key.to_string()))?;
        object.tags.clear();
        Ok(())
    }

    async fn list_object_versions(&self, prefix: &str) -> CResult<Vec<ObjectVersion>> {
        let objects = self.objects.lock().unwrap();
        Ok(objects
            .iter()
            .filter(|(k, _)| k.starts_with(prefix))
            .map(|(k, o)| ObjectVersion { key: k.clone(), version_id: o.etag.clone(), is_latest: true, size: o.body.len() as u64, last_modified: o.last_modified })
            .collect())
    }

    async fn select(&self, key: &str, _sql_expression: &str) -> CResult<Vec<u8>> {
        let objects = self.objects.lock().unwrap();
        let object = objects.get(key).ok_or_else(|| Error::NotFound(key.to_string()))?;
        Ok(object.body.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_roundtrips() {
        let store = MemoryObjectStore::new();
        store.put_object("a.txt", Bytes::from_static(b"hello"), None).await.unwrap();
        assert_eq!(store.get_object("a.txt", None).await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn multipart_upload_reassembles_parts_in_order() {
        let store = MemoryObjectStore::new();
        let upload_id = store.create_multipart_upload("big.bin", None).await.unwrap();
        let etag_b = store.upload_part("big.bin", &upload_id, 2, Bytes::from_static(b"world")).await.unwrap();
        let etag_a = store.upload_part("big.bin", &upload_id, 1, Bytes::from_static(b"hello")).await.unwrap();
        store
            .complete_multipart_upload("big.bin", &upload_id, vec![(1, etag_a), (2, etag_b)])
            .await
            .unwrap();
        assert_eq!(store.get_object("big.bin", None).await.unwrap(), Bytes::from_static(b"helloworld"));
    }

    #[tokio::test]
    async fn get_range_slices_the_body() {
        let store = MemoryObjectStore::new();
        store.put_object("a.txt", Bytes::from_static(b"0123456789"), None).await.unwrap();
        assert_eq!(store.get_object("a.txt", Some((2, 5))).await.unwrap(), Bytes::from_static(b"234"));
    }
}
