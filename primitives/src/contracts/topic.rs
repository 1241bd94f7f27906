//! An SNS-style topic contract: `publish` and `subscribe` shaped exactly
//! like SNS's own API (topic ARN, message attributes, protocol/endpoint
//! subscriptions), adapted over `aws-sdk-sns` the same way
//! [`crate::store::dynamo`] adapts `aws-sdk-dynamodb`.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_sns::error::ProvideErrorMetadata;
use aws_sdk_sns::types::MessageAttributeValue;
use aws_sdk_sns::Client;

use crate::error::{CResult, Error};

#[async_trait]
pub trait TopicContract: Send + Sync {
    async fn publish(&self, topic_arn: &str, message: &str, attributes: HashMap<String, String>) -> CResult<String>;
    async fn subscribe(&self, topic_arn: &str, protocol: &str, endpoint: &str) -> CResult<String>;
    async fn unsubscribe(&self, subscription_arn: &str) -> CResult<()>;
}

pub struct SnsTopicContract {
    client: Client,
}

impl SnsTopicContract {
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
        Some("Throttling") => Error::ServiceThrottled(context.to_string()),
        Some("NotFoundException") => Error::NotFound(context.to_string()),
        Some("AuthorizationErrorException") => Error::PermissionDenied(context.to_string()),
        _ => Error::ServiceError(format!("{context}: {}", err.message().unwrap_or("unknown SNS error"))),
    }
}

#[async_trait]
impl TopicContract for SnsTopicContract {
    async fn publish(&self, topic_arn: &str, message: &str, attributes: HashMap<String, String>) -> CResult<String> {
        let mut req = self.client.publish().topic_arn(topic_arn).message(message);
        for (key, value) in attributes {
            req = req.message_attributes(key, MessageAttributeValue::builder().data_type("String").string_value(value).build().map_err(|e| Error::InvalidArgument(e.to_string()))?);
        }
        let output = req.send().await.map_err(|e| match e.as_service_error() {
            Some(svc) => classify(topic_arn, svc),
            None => Error::ServiceError(format!("publish {topic_arn}: {e}")),
        })?;
        output.message_id().map(str::to_string).ok_or_else(|| Error::ServiceError("missing message id".to_string()))
    }

    async fn subscribe(&self, topic_arn: &str, protocol: &str, endpoint: &str) -> CResult<String> {
        let output = self
            .client
            .subscribe()
            .topic_arn(topic_arn)
            .protocol(protocol)
            .endpoint(endpoint)
            .send()
            .await
            .map_err(|e| match e.as_service_error() {
                Some(svc) => classify(topic_arn, svc),
                None => Error::ServiceError(format!("subscribe {topic_arn}: {e}")),
            })?;
        output.subscription_arn().map(str::to_string).ok_or_else(|| Error::ServiceError("missing subscription arn".to_string()))
    }

    async fn unsubscribe(&self, subscription_arn: &str) -> CResult<()> {
        self.client.unsubscribe().subscription_arn(subscription_arn).send().await.map_err(|e| match e.as_service_error() {
            Some(svc) => classify(subscription_arn, svc),
            None => Error::ServiceError(format!("unsubscribe {subscription_arn}: {e}")),
        })?;
        Ok(())
    }
}
