//! An SQS-style external queue contract, distinct from
//! [`crate::primitives::queue`]: this wraps an *actual* SQS queue (ARN,
//! managed visibility timeout, long polling), rather than this crate's
//! own priority queue built on the shared item store.

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sqs::error::ProvideErrorMetadata;
use aws_sdk_sqs::Client;

use crate::error::{CResult, Error};

pub struct SqsMessage {
    pub receipt_handle: String,
    pub body: String,
}

#[async_trait]
pub trait QueueServiceContract: Send + Sync {
    async fn send(&self, queue_url: &str, body: &str, delay_seconds: Option<i32>) -> CResult<String>;
    async fn receive(&self, queue_url: &str, max_messages: i32, wait_seconds: i32) -> CResult<Vec<SqsMessage>>;
    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> CResult<()>;
    async fn change_visibility(&self, queue_url: &str, receipt_handle: &str, visibility_seconds: i32) -> CResult<()>;
}

pub struct SqsQueueService {
    client: Client,
}

impl SqsQueueService {
    pub async fn from_config(region: Option<String>, profile: Option<String>) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        Self { client: Client::new(&loader.load().await) }
    }
}

fn classify(context: &str, err: &impl ProvideErrorMetadata) -> Error {
    match err.code() {
        Some("Throttling") | Some("RequestThrottled") => Error::ServiceThrottled(context.to_string()),
        Some("QueueDoesNotExist") => Error::NotFound(context.to_string()),
        Some("AccessDenied") => Error::PermissionDenied(context.to_string()),
        _ => Error::ServiceError(format!("{context}: {}", err.message().unwrap_or("unknown SQS error"))),
    }
}

#[async_trait]
impl QueueServiceContract for SqsQueueService {
    async fn send(&self, queue_url: &str, body: &str, delay_seconds: Option<i32>) -> CResult<String> {
        let mut req = self.client.send_message().queue_url(queue_url).message_body(body);
        if let Some(delay) = delay_seconds {
            req = req.delay_seconds(delay);
        }
        let output = req.send().await.map_err(|e| match e.as_service_error() {
            Some(svc) => classify(queue_url, svc),
            None => Error::ServiceError(format!("send {queue_url}: {e}")),
        })?;
        output.message_id().map(str::to_string).ok_or_else(|| Error::ServiceError("missing message id".to_string()))
    }

    async fn receive(&self, queue_url: &str, max_messages: i32, wait_seconds: i32) -> CResult<Vec<SqsMessage>> {
        let output = self
            .client
            .receive_message()
            .queue_url(queue_url)
            .max_number_of_messages(max_messages)
            .wait_time_seconds(wait_seconds)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(svc) => classify(queue_url, svc),
                None => Error::ServiceError(format!("receive {queue_url}: {e}")),
            })?;
        Ok(output
            .messages()
            .iter()
            .map(|m| SqsMessage {
                receipt_handle: m.receipt_handle().unwrap_or_default().to_string(),
                body: m.body().unwrap_or_default().to_string(),
            })
            .collect())
    }

    async fn delete(&self, queue_url: &str, receipt_handle: &str) -> CResult<()> {
        self.client.delete_message().queue_url(queue_url).receipt_handle(receipt_handle).send().await.map_err(|e| match e.as_service_error() {
            Some(svc) => classify(queue_url, svc),
            None => Error::ServiceError(format!("delete {queue_url}: {e}")),
        })?;
        Ok(())
    }

    async fn change_visibility(&self, queue_url: &str, receipt_handle: &str, visibility_seconds: i32) -> CResult<()> {
        self.client
            .change_message_visibility()
            .queue_url(queue_url)
            .receipt_handle(receipt_handle)
            .visibility_timeout(visibility_seconds)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(svc) => classify(queue_url, svc),
                None => Error::ServiceError(format!("change_visibility {queue_url}: {e}")),
            })?;
        Ok(())
    }
}
