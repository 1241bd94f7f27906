//! S3-backed [`ObjectStoreDriver`], mirroring the shape of
//! [`crate::store::dynamo::DynamoItemStore`]: a thin typed wrapper over
//! the generated SDK client, with error classification centralized in
//! one helper instead of scattered `match`es on raw exception codes.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::ProvideErrorMetadata;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart, Tag, Tagging};
use aws_sdk_s3::Client;
use bytes::Bytes;

use crate::error::{CResult, Error};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectMeta {
    pub key: String,
    pub size: u64,
    pub etag: String,
    pub last_modified: i64,
    pub storage_class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectVersion {
    pub key: String,
    pub version_id: String,
    pub is_latest: bool,
    pub size: u64,
    pub last_modified: i64,
}

/// Surface every primitive/CLI blob operation drives; keeps the S3 SDK out
/// of everything above this module.
#[async_trait]
pub trait ObjectStoreDriver: Send + Sync {
    async fn put_object(&self, key: &str, body: Bytes, content_type: Option<&str>) -> CResult<String>;
    async fn get_object(&self, key: &str, range: Option<(u64, u64)>) -> CResult<Bytes>;
    async fn head_object(&self, key: &str) -> CResult<Option<ObjectMeta>>;
    async fn delete_object(&self, key: &str) -> CResult<()>;
    async fn list_objects(&self, prefix: &str, continuation_token: Option<String>) -> CResult<(Vec<ObjectMeta>, Option<String>)>;

    async fn create_multipart_upload(&self, key: &str, content_type: Option<&str>) -> CResult<String>;
    async fn upload_part(&self, key: &str, upload_id: &str, part_number: i32, body: Bytes) -> CResult<String>;
    async fn complete_multipart_upload(&self, key: &str, upload_id: &str, parts: Vec<(i32, String)>) -> CResult<String>;
    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> CResult<()>;

    async fn presign_get(&self, key: &str, expires_in: Duration) -> CResult<String>;
    async fn presign_put(&self, key: &str, expires_in: Duration) -> CResult<String>;

    async fn put_tags(&self, key: &str, tags: HashMap<String, String>) -> CResult<()>;
    async fn delete_tags(&self, key: &str) -> CResult<()>;
    async fn list_object_versions(&self, prefix: &str) -> CResult<Vec<ObjectVersion>>;

    /// Runs an S3 Select SQL expression against a CSV/JSON object and
    /// returns the concatenated record payload.
    async fn select(&self, key: &str, sql_expression: &str) -> CResult<Vec<u8>>;
}

pub struct S3ObjectStore {
    client: Client,
    bucket: String,
}

impl S3ObjectStore {
    pub async fn from_config(region: Option<String>, profile: Option<String>, bucket: String) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let shared_config = loader.load().await;
        Self { client: Client::new(&shared_config), bucket }
    }
}

fn classify_s3_error<E: ProvideErrorMetadata>(context: &str, err: &E) -> Error {
    match err.code() {
        Some("NoSuchKey") | Some("NoSuchUpload") | Some("NotFound") => Error::NotFound(context.to_string()),
        Some("SlowDown") | Some("ThrottlingException") | Some("RequestLimitExceeded") => {
            Error::ServiceThrottled(format!("{context}: {}", err.message().unwrap_or_default()))
        }
        Some("AccessDenied") => Error::PermissionDenied(context.to_string()),
        _ => Error::ServiceError(format!("{context}: {}", err.message().unwrap_or("unknown S3 error"))),
    }
}

#[async_trait]
impl ObjectStoreDriver for S3ObjectStore {
    async fn put_object(&self, key: &str, body: Bytes, content_type: Option<&str>) -> CResult<String> {
        let mut req = self.client.put_object().bucket(&self.bucket).key(key).body(ByteStream::from(body));
        if let Some(content_type) = content_type {
            req = req.content_type(content_type);
        }
        let output = req.send().await.map_err(|e| match e.as_service_error() {
            Some(svc) => classify_s3_error(key, svc),
            None => Error::ServiceError(format!("put_object {key}: {e}")),
        })?;
        Ok(output.e_tag().unwrap_or_default().to_string())
    }

    async fn get_object(&self, key: &str, range: Option<(u64, u64)>) -> CResult<Bytes> {
        let mut req = self.client.get_object().bucket(&self.bucket).key(key);
        if let Some((start, end)) = range {
            req = req.range(format!("bytes={start}-{end}"));
        }
        let output = req.send().await.map_err(|e| match e.as_service_error() {
            Some(svc) => classify_s3_error(key, svc),
            None => Error::ServiceError(format!("get_object {key}: {e}")),
        })?;
        let data = output.body.collect().await.map_err(|e| Error::ServiceError(format!("get_object {key} body: {e}")))?;
        Ok(data.into_bytes())
    }

    async fn head_object(&self, key: &str) -> CResult<Option<ObjectMeta>> {
        let result = self.client.head_object().bucket(&self.bucket).key(key).send().await;
        match result {
            Ok(output) => Ok(Some(ObjectMeta {
                key: key.to_string(),
                size: output.content_length().unwrap_or(0).max(0) as u64,
                etag: output.e_tag().unwrap_or_default().to_string(),
                last_modified: output.last_modified().map(|t| t.secs()).unwrap_or(0),
                storage_class: output.storage_class().map(|c| c.as_str().to_string()),
            })),
            Err(e) => match e.as_service_error() {
                Some(svc) if svc.is_not_found() => Ok(None),
                Some(svc) => Err(classify_s3_error(key, svc)),
                None => Err(Error::ServiceError(format!("head_object {key}: {e}"))),
            },
        }
    }

    async fn delete_object(&self, key: &str) -> CResult<()> {
        self.client.delete_object().bucket(&self.bucket).key(key).send().await.map_err(|e| match e.as_service_error() {
            Some(svc) => classify_s3_error(key, svc),
            None => Error::ServiceError(format!("delete_object {key}: {e}")),
        })?;
        Ok(())
    }

    async fn list_objects(&self, prefix: &str, continuation_token: Option<String>) -> CResult<(Vec<ObjectMeta>, Option<String>)> {
        let mut req = self.client.list_objects_v2().bucket(&self.bucket).prefix(prefix);
        if let Some(token) = continuation_token {
            req = req.continuation_token(token);
        }
        let output = req.send().await.map_err(|e| match e.as_service_error() {
            Some(svc) => classify_s3_error(prefix, svc),
            None => Error::ServiceError(format!("list_objects {prefix}: {e}")),
        })?;
        let objects = output
            .contents()
            .iter()
            .map(|o| ObjectMeta {
                key: o.key().unwrap_or_default().to_string(),
                size: o.size().unwrap_or(0).max(0) as u64,
                etag: o.e_tag().unwrap_or_default().to_string(),
                last_modified: o.last_modified().map(|t| t.secs()).unwrap_or(0),
                storage_class: o.storage_class().map(|c| c.as_str().to_string()),
            })
            .collect();
        Ok((objects, output.next_continuation_token().map(str::to_string)))
    }

    async fn create_multipart_upload(&self, key: &str, content_type: Option<&str>) -> CResult<String> {
        let mut req = self.client.create_multipart_upload().bucket(&self.bucket).key(key);
        if let Some(content_type) = content_type {
            req = req.content_type(content_type);
        }
        let output = req.send().await.map_err(|e| match e.as_service_error() {
            Some(svc) => classify_s3_error(key, svc),
            None => Error::ServiceError(format!("create_multipart_upload {key}: {e}")),
        })?;
        output.upload_id().map(str::to_string).ok_or_else(|| Error::ServiceError("missing upload id".to_string()))
    }

    async fn upload_part(&self, key: &str, upload_id: &str, part_number: i32, body: Bytes) -> CResult<String> {
        let output = self
            .client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .part_number(part_number)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(svc) => classify_s3_error(key, svc),
                None => Error::ServiceError(format!("upload_part {key} part {part_number}: {e}")),
            })?;
        Ok(output.e_tag().unwrap_or_default().to_string())
    }

    async fn complete_multipart_upload(&self, key: &str, upload_id: &str, parts: Vec<(i32, String)>) -> CResult<String> {
        let completed_parts: Vec<CompletedPart> = parts
            .into_iter()
            .map(|(part_number, etag)| CompletedPart::builder().part_number(part_number).e_tag(etag).build())
            .collect();
        let output = self
            .client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .multipart_upload(CompletedMultipartUpload::builder().set_parts(Some(completed_parts)).build())
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(svc) => classify_s3_error(key, svc),
                None => Error::ServiceError(format!("complete_multipart_upload {key}: {e}")),
            })?;
        Ok(output.e_tag().unwrap_or_default().to_string())
    }

    async fn abort_multipart_upload(&self, key: &str, upload_id: &str) -> CResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(upload_id)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(svc) => classify_s3_error(key, svc),
                None => Error::ServiceError(format!("abort_multipart_upload {key}: {e}")),
            })?;
        Ok(())
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> CResult<String> {
        let config = PresigningConfig::expires_in(expires_in).map_err(|e| Error::InvalidArgument(e.to_string()))?;
        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| Error::ServiceError(format!("presign_get {key}: {e}")))?;
        Ok(presigned.uri().to_string())
    }

    async fn presign_put(&self, key: &str, expires_in: Duration) -> CResult<String> {
        let config = PresigningConfig::expires_in(expires_in).map_err(|e| Error::InvalidArgument(e.to_string()))?;
        let presigned = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(config)
            .await
            .map_err(|e| Error::ServiceError(format!("presign_put {key}: {e}")))?;
        Ok(presigned.uri().to_string())
    }

    async fn put_tags(&self, key: &str, tags: HashMap<String, String>) -> CResult<()> {
        let tag_set: Vec<Tag> = tags.into_iter().map(|(k, v)| Tag::builder().key(k).value(v).build().expect("tag key/value required")).collect();
        self.client
            .put_object_tagging()
            .bucket(&self.bucket)
            .key(key)
            .tagging(Tagging::builder().set_tag_set(Some(tag_set)).build().map_err(|e| Error::InvalidArgument(e.to_string()))?)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(svc) => classify_s3_error(key, svc),
                None => Error::ServiceError(format!("put_tags {key}: {e}")),
            })?;
        Ok(())
    }

    async fn delete_tags(&self, key: &str) -> CResult<()> {
        self.client.delete_object_tagging().bucket(&self.bucket).key(key).send().await.map_err(|e| match e.as_service_error() {
            Some(svc) => classify_s3_error(key, svc),
            None => Error::ServiceError(format!("delete_tags {key}: {e}")),
        })?;
        Ok(())
    }

    async fn select(&self, key: &str, sql_expression: &str) -> CResult<Vec<u8>> {
        use aws_sdk_s3::types::{
            CsvInput, CsvOutput, ExpressionType, InputSerialization, JsonOutput, OutputSerialization,
            SelectObjectContentEventStream,
        };

        let mut output = self
            .client
            .select_object_content()
            .bucket(&self.bucket)
            .key(key)
            .expression_type(ExpressionType::Sql)
            .expression(sql_expression)
            .input_serialization(InputSerialization::builder().csv(CsvInput::builder().file_header_info("USE".into()).build()).build())
            .output_serialization(OutputSerialization::builder().json(JsonOutput::builder().build()).build())
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(svc) => classify_s3_error(key, svc),
                None => Error::ServiceError(format!("select_object_content {key}: {e}")),
            })?;

        let mut records = Vec::new();
        while let Ok(Some(event)) = output.payload.recv().await {
            if let SelectObjectContentEventStream::Records(records_event) = event {
                if let Some(bytes) = records_event.payload {
                    records.extend_from_slice(&bytes.into_inner());
                }
            }
        }
        Ok(records)
    }

    async fn list_object_versions(&self, prefix: &str) -> CResult<Vec<ObjectVersion>> {
        let output = self
            .client
            .list_object_versions()
            .bucket(&self.bucket)
            .prefix(prefix)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(svc) => classify_s3_error(prefix, svc),
                None => Error::ServiceError(format!("list_object_versions {prefix}: {e}")),
            })?;
        Ok(output
            .versions()
            .iter()
            .map(|v| ObjectVersion {
                key: v.key().unwrap_or_default().to_string(),
                version_id: v.version_id().unwrap_or_default().to_string(),
                is_latest: v.is_latest().unwrap_or(false),
                size: v.size().unwrap_or(0).max(0) as u64,
                last_modified: v.last_modified().map(|t| t.secs()).unwrap_or(0),
            })
            .collect())
    }
}

/// Mechanical helper retained for `blob sync`'s "skip unchanged objects"
/// pass: S3 ETags for non-multipart uploads are the MD5 of the
/// body, quoted.
pub fn etag_matches_local(remote_etag: &str, local_md5_hex: &str) -> bool {
    remote_etag.trim_matches('"') == local_md5_hex
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn etag_comparison_strips_quotes() {
        assert!(etag_matches_local("\"d41d8cd98f00b204e9800998ecf8427e\"", "d41d8cd98f00b204e9800998ecf8427e"));
        assert!(!etag_matches_local("\"abc\"", "def"));
    }
}
