//! DynamoDB-backed `ItemStoreDriver`.
//!
//! Grounded on `DynamoDbBackend` in
//! `guyernest-rust-mcp-sdk/crates/pmcp-tasks/src/store/dynamodb.rs`: a thin
//! adapter holding a `Client` and a table name, condition expressions built
//! with placeholder names/values, and SDK errors classified via
//! `is_conditional_check_failed_exception()` / friends rather than string
//! matching.

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use serde_json::Value;

use crate::error::{CResult, Error};
use crate::item::{Condition, Item, ItemType};
use crate::store::{ItemStoreDriver, Mutation, ReturnValues, TransactAction};

const ATTR_PK: &str = "partitionKey";
const ATTR_SK: &str = "sortKey";
const ATTR_VALUE: &str = "value";
const ATTR_TYPE: &str = "type";
const ATTR_TTL: &str = "ttl";
const ATTR_METADATA: &str = "metadata";
const ATTR_CREATED_AT: &str = "createdAt";
const ATTR_UPDATED_AT: &str = "updatedAt";
const ATTR_VERSION: &str = "version";
/// Name of the secondary index on `(type, updatedAt)`.
const TYPE_INDEX: &str = "type-updatedAt-index";

#[derive(Debug, Clone)]
pub struct DynamoItemStore {
    client: Client,
    table_name: String,
}

impl DynamoItemStore {
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self { client, table_name: table_name.into() }
    }

    /// Builds a client from the standard AWS SDK config chain, honoring
    /// `--region`/`--profile` the way `kvcli` resolves its own settings at
    /// command entry (no global client singleton).
    pub async fn from_config(region: Option<String>, profile: Option<String>, table_name: impl Into<String>) -> Self {
        let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        if let Some(profile) = profile {
            loader = loader.profile_name(profile);
        }
        let config = loader.load().await;
        Self::new(Client::new(&config), table_name)
    }
}

fn av_s(s: impl Into<String>) -> AttributeValue {
    AttributeValue::S(s.into())
}

fn av_n(n: i64) -> AttributeValue {
    AttributeValue::N(n.to_string())
}

fn json_to_av(value: &Value) -> AttributeValue {
    match value {
        Value::Null => AttributeValue::Null(true),
        Value::Bool(b) => AttributeValue::Bool(*b),
        Value::Number(n) => AttributeValue::N(n.to_string()),
        Value::String(s) => AttributeValue::S(s.clone()),
        Value::Array(items) => AttributeValue::L(items.iter().map(json_to_av).collect()),
        Value::Object(map) => {
            AttributeValue::M(map.iter().map(|(k, v)| (k.clone(), json_to_av(v))).collect())
        }
    }
}

fn av_to_json(av: &AttributeValue) -> Value {
    match av {
        AttributeValue::S(s) => Value::String(s.clone()),
        AttributeValue::N(n) => serde_json::Number::from_f64(n.parse().unwrap_or(0.0))
            .map(Value::Number)
            .unwrap_or(Value::Null),
        AttributeValue::Bool(b) => Value::Bool(*b),
        AttributeValue::Null(_) => Value::Null,
        AttributeValue::L(items) => Value::Array(items.iter().map(av_to_json).collect()),
        AttributeValue::M(map) => {
            Value::Object(map.iter().map(|(k, v)| (k.clone(), av_to_json(v))).collect())
        }
        _ => Value::Null,
    }
}

fn item_to_attrs(item: &Item) -> HashMap<String, AttributeValue> {
    let mut attrs = HashMap::new();
    attrs.insert(ATTR_PK.to_string(), av_s(&item.partition_key));
    attrs.insert(ATTR_SK.to_string(), av_s(&item.sort_key));
    attrs.insert(ATTR_VALUE.to_string(), json_to_av(&item.value));
    attrs.insert(ATTR_TYPE.to_string(), av_s(item.item_type.to_string()));
    if let Some(ttl) = item.ttl {
        attrs.insert(ATTR_TTL.to_string(), av_n(ttl));
    }
    attrs.insert(
        ATTR_METADATA.to_string(),
        AttributeValue::M(item.metadata.iter().map(|(k, v)| (k.clone(), json_to_av(v))).collect()),
    );
    attrs.insert(ATTR_CREATED_AT.to_string(), av_n(item.created_at));
    attrs.insert(ATTR_UPDATED_AT.to_string(), av_n(item.updated_at));
    if let Some(version) = item.version {
        attrs.insert(ATTR_VERSION.to_string(), av_n(version));
    }
    attrs
}

fn attrs_to_item(attrs: &HashMap<String, AttributeValue>) -> CResult<Item> {
    let get_s = |key: &str| -> CResult<String> {
        attrs
            .get(key)
            .and_then(|v| v.as_s().ok())
            .map(|s| s.to_string())
            .ok_or_else(|| Error::Internal(format!("missing or invalid attribute {key}")))
    };
    let get_n = |key: &str| -> Option<i64> {
        attrs.get(key).and_then(|v| v.as_n().ok()).and_then(|n| n.parse().ok())
    };

    let item_type = match get_s(ATTR_TYPE)?.as_str() {
        "kv" => ItemType::Kv,
        "counter" => ItemType::Counter,
        "lock" => ItemType::Lock,
        "leader" => ItemType::Leader,
        "queue" => ItemType::Queue,
        "set" => ItemType::Set,
        "list" => ItemType::List,
        other => return Err(Error::Internal(format!("unknown item type {other}"))),
    };

    let metadata = match attrs.get(ATTR_METADATA).and_then(|v| v.as_m().ok()) {
        Some(map) => map.iter().map(|(k, v)| (k.clone(), av_to_json(v))).collect(),
        None => HashMap::new(),
    };

    Ok(Item {
        partition_key: get_s(ATTR_PK)?,
        sort_key: get_s(ATTR_SK)?,
        value: attrs.get(ATTR_VALUE).map(av_to_json).unwrap_or(Value::Null),
        item_type,
        ttl: get_n(ATTR_TTL),
        metadata,
        created_at: get_n(ATTR_CREATED_AT).unwrap_or(0),
        updated_at: get_n(ATTR_UPDATED_AT).unwrap_or(0),
        version: get_n(ATTR_VERSION),
    })
}

/// Translates a [`Condition`] into a DynamoDB condition expression plus its
/// placeholder name/value maps. Placeholder suffixes avoid collisions when
/// `Condition::And` combines two conditions that both bind `:now` etc.
fn condition_expression(condition: &Condition, suffix: &str) -> (String, HashMap<String, String>, HashMap<String, AttributeValue>) {
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    let expr = match condition {
        Condition::NotExists => {
            names.insert("#pk".to_string(), ATTR_PK.to_string());
            "attribute_not_exists(#pk)".to_string()
        }
        Condition::Exists => {
            names.insert("#pk".to_string(), ATTR_PK.to_string());
            "attribute_exists(#pk)".to_string()
        }
        Condition::ValueEquals(expected) => {
            names.insert("#v".to_string(), ATTR_VALUE.to_string());
            let placeholder = format!(":val{suffix}");
            values.insert(placeholder.clone(), json_to_av(expected));
            format!("#v = {placeholder}")
        }
        Condition::MetadataEquals { field, expected } => {
            names.insert("#m".to_string(), ATTR_METADATA.to_string());
            names.insert("#f".to_string(), field.clone());
            let placeholder = format!(":meta{suffix}");
            values.insert(placeholder.clone(), json_to_av(expected));
            format!("#m.#f = {placeholder}")
        }
        Condition::VersionEquals(expected) => {
            names.insert("#ver".to_string(), ATTR_VERSION.to_string());
            let placeholder = format!(":ver{suffix}");
            values.insert(placeholder.clone(), av_n(*expected));
            format!("#ver = {placeholder}")
        }
        Condition::NotExistsOrExpired { now } => {
            names.insert("#pk".to_string(), ATTR_PK.to_string());
            names.insert("#ttl".to_string(), ATTR_TTL.to_string());
            let placeholder = format!(":now{suffix}");
            values.insert(placeholder.clone(), av_n(*now));
            format!("(attribute_not_exists(#pk) OR #ttl < {placeholder})")
        }
        Condition::And(a, b) => {
            let (expr_a, names_a, values_a) = condition_expression(a, &format!("{suffix}a"));
            let (expr_b, names_b, values_b) = condition_expression(b, &format!("{suffix}b"));
            names.extend(names_a);
            names.extend(names_b);
            values.extend(values_a);
            values.extend(values_b);
            format!("({expr_a}) AND ({expr_b})")
        }
    };
    (expr, names, values)
}

fn mutation_expression(mutation: &Mutation) -> (String, HashMap<String, String>, HashMap<String, AttributeValue>) {
    let mut names = HashMap::new();
    let mut values = HashMap::new();
    let expr = match mutation {
        Mutation::Add { field, by } => {
            names.insert("#f".to_string(), field.clone());
            values.insert(":delta".to_string(), av_n(*by));
            values.insert(":zero".to_string(), av_n(0));
            "SET #f = if_not_exists(#f, :zero) + :delta".to_string()
        }
        Mutation::Set { field, value } => {
            names.insert("#f".to_string(), field.clone());
            values.insert(":val".to_string(), json_to_av(value));
            "SET #f = :val".to_string()
        }
        Mutation::SetMany(pairs) => {
            let mut clauses = Vec::new();
            for (i, (field, value)) in pairs.iter().enumerate() {
                let name_ph = format!("#f{i}");
                let value_ph = format!(":v{i}");
                names.insert(name_ph.clone(), field.clone());
                values.insert(value_ph.clone(), json_to_av(value));
                clauses.push(format!("{name_ph} = {value_ph}"));
            }
            format!("SET {}", clauses.join(", "))
        }
    };
    names.insert("#updatedAt".to_string(), ATTR_UPDATED_AT.to_string());
    values.insert(":now".to_string(), av_n(crate::item::now_seconds()));
    let expr = format!("{expr}, #updatedAt = :now");
    (expr, names, values)
}

fn classify_sdk_error<E: std::fmt::Display + aws_sdk_dynamodb::error::ProvideErrorMetadata>(context: &str, err: E) -> Error {
    match err.code() {
        Some("ProvisionedThroughputExceededException") | Some("ThrottlingException") | Some("RequestLimitExceeded") => {
            Error::ServiceThrottled(format!("{context}: {err}"))
        }
        Some("AccessDeniedException") => Error::PermissionDenied(format!("{context}: {err}")),
        Some("ResourceNotFoundException") => Error::NotFound(format!("{context}: {err}")),
        _ => Error::ServiceError(format!("{context}: {err}")),
    }
}

#[async_trait]
impl ItemStoreDriver for DynamoItemStore {
    async fn put_item(&self, item: Item, condition: Option<Condition>) -> CResult<()> {
        let mut request = self.client.put_item().table_name(&self.table_name).set_item(Some(item_to_attrs(&item)));
        if let Some(condition) = &condition {
            let (expr, names, values) = condition_expression(condition, "");
            request = request
                .condition_expression(expr)
                .set_expression_attribute_names(Some(names))
                .set_expression_attribute_values(Some(values));
        }
        request.send().await.map_err(|err| {
            match err.as_service_error() {
                Some(svc) if condition.is_some() && svc.is_conditional_check_failed_exception() => {
                    Error::ConditionFailed(format!("put_item condition failed for {}/{}", item.partition_key, item.sort_key))
                }
                Some(svc) => classify_sdk_error("put_item", svc),
                None => Error::ServiceError(format!("put_item: {err}")),
            }
        })?;
        Ok(())
    }

    async fn get_item(&self, partition_key: &str, sort_key: &str) -> CResult<Option<Item>> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(ATTR_PK, av_s(partition_key))
            .key(ATTR_SK, av_s(sort_key))
            .consistent_read(true)
            .send()
            .await
            .map_err(|err| {
                if let Some(svc) = err.as_service_error() {
                    classify_sdk_error("get_item", svc)
                } else {
                    Error::ServiceError(format!("get_item: {err}"))
                }
            })?;

        match output.item() {
            None => Ok(None),
            Some(attrs) => {
                let item = attrs_to_item(attrs)?;
                if item.is_expired(crate::item::now_seconds()) {
                    Ok(None)
                } else {
                    Ok(Some(item))
                }
            }
        }
    }

    async fn update_item(
        &self,
        partition_key: &str,
        sort_key: &str,
        mutation: Mutation,
        condition: Option<Condition>,
        return_values: ReturnValues,
    ) -> CResult<Option<Item>> {
        let (update_expr, mut names, mut values) = mutation_expression(&mutation);
        let mut request = self
            .client
            .update_item()
            .table_name(&self.table_name)
            .key(ATTR_PK, av_s(partition_key))
            .key(ATTR_SK, av_s(sort_key))
            .update_expression(update_expr);

        if let Some(condition) = &condition {
            let (cond_expr, cond_names, cond_values) = condition_expression(condition, "c");
            names.extend(cond_names);
            values.extend(cond_values);
            request = request.condition_expression(cond_expr);
        }
        request = request.set_expression_attribute_names(Some(names)).set_expression_attribute_values(Some(values));
        request = request.return_values(match return_values {
            ReturnValues::None => aws_sdk_dynamodb::types::ReturnValue::None,
            ReturnValues::AllNew => aws_sdk_dynamodb::types::ReturnValue::AllNew,
            ReturnValues::AllOld => aws_sdk_dynamodb::types::ReturnValue::AllOld,
        });

        let output = request.send().await.map_err(|err| {
            match err.as_service_error() {
                Some(svc) if condition.is_some() && svc.is_conditional_check_failed_exception() => {
                    Error::ConditionFailed(format!("update_item condition failed for {partition_key}/{sort_key}"))
                }
                Some(svc) => classify_sdk_error("update_item", svc),
                None => Error::ServiceError(format!("update_item: {err}")),
            }
        })?;

        match output.attributes() {
            Some(attrs) => Ok(Some(attrs_to_item(attrs)?)),
            None => Ok(None),
        }
    }

    async fn delete_item(&self, partition_key: &str, sort_key: &str, condition: Option<Condition>) -> CResult<()> {
        let mut request = self
            .client
            .delete_item()
            .table_name(&self.table_name)
            .key(ATTR_PK, av_s(partition_key))
            .key(ATTR_SK, av_s(sort_key));
        if let Some(condition) = &condition {
            let (expr, names, values) = condition_expression(condition, "");
            request = request
                .condition_expression(expr)
                .set_expression_attribute_names(Some(names))
                .set_expression_attribute_values(Some(values));
        }
        request.send().await.map_err(|err| {
            match err.as_service_error() {
                Some(svc) if condition.is_some() && svc.is_conditional_check_failed_exception() => {
                    Error::ConditionFailed(format!("delete_item condition failed for {partition_key}/{sort_key}"))
                }
                Some(svc) => classify_sdk_error("delete_item", svc),
                None => Error::ServiceError(format!("delete_item: {err}")),
            }
        })?;
        Ok(())
    }

    async fn query(
        &self,
        partition_key: &str,
        sort_key_prefix: Option<&str>,
        limit: Option<usize>,
        ascending: bool,
    ) -> CResult<Vec<Item>> {
        let mut results = Vec::new();
        let mut exclusive_start_key = None;

        loop {
            let mut request = self
                .client
                .query()
                .table_name(&self.table_name)
                .scan_index_forward(ascending)
                .expression_attribute_names("#pk", ATTR_PK)
                .expression_attribute_values(":pk", av_s(partition_key));
            let mut key_condition = "#pk = :pk".to_string();
            if let Some(prefix) = sort_key_prefix {
                request = request.expression_attribute_names("#sk", ATTR_SK).expression_attribute_values(":sk", av_s(prefix));
                key_condition.push_str(" AND begins_with(#sk, :sk)");
            }
            request = request.key_condition_expression(key_condition);
            if let Some(limit) = limit {
                request = request.limit(limit as i32);
            }
            if let Some(start_key) = exclusive_start_key.take() {
                request = request.set_exclusive_start_key(Some(start_key));
            }

            let output = request.send().await.map_err(|err| {
                if let Some(svc) = err.as_service_error() {
                    classify_sdk_error("query", svc)
                } else {
                    Error::ServiceError(format!("query: {err}"))
                }
            })?;

            let now = crate::item::now_seconds();
            for attrs in output.items() {
                let item = attrs_to_item(attrs)?;
                if !item.is_expired(now) {
                    results.push(item);
                }
            }

            if let Some(limit) = limit {
                if results.len() >= limit {
                    results.truncate(limit);
                    break;
                }
            }
            match output.last_evaluated_key() {
                Some(key) => exclusive_start_key = Some(key.clone()),
                None => break,
            }
        }
        Ok(results)
    }

    async fn query_by_type(&self, item_type: ItemType, limit: Option<usize>) -> CResult<Vec<Item>> {
        let mut request = self
            .client
            .query()
            .table_name(&self.table_name)
            .index_name(TYPE_INDEX)
            .scan_index_forward(false)
            .key_condition_expression("#t = :t")
            .expression_attribute_names("#t", ATTR_TYPE)
            .expression_attribute_values(":t", av_s(item_type.to_string()));
        if let Some(limit) = limit {
            request = request.limit(limit as i32);
        }
        let output = request.send().await.map_err(|err| {
            if let Some(svc) = err.as_service_error() {
                classify_sdk_error("query_by_type", svc)
            } else {
                Error::ServiceError(format!("query_by_type: {err}"))
            }
        })?;

        let now = crate::item::now_seconds();
        output
            .items()
            .iter()
            .map(attrs_to_item)
            .filter(|res| res.as_ref().map(|item| !item.is_expired(now)).unwrap_or(true))
            .collect()
    }

    async fn transact_write(&self, actions: Vec<TransactAction>) -> CResult<()> {
        crate::store::validate_transact_batch(&actions)?;

        let mut items = Vec::with_capacity(actions.len());
        for action in actions {
            let transact_item = match action {
                TransactAction::Put { item, condition } => {
                    let mut builder = aws_sdk_dynamodb::types::Put::builder()
                        .table_name(&self.table_name)
                        .set_item(Some(item_to_attrs(&item)));
                    if let Some(condition) = &condition {
                        let (expr, names, values) = condition_expression(condition, "");
                        builder = builder
                            .condition_expression(expr)
                            .set_expression_attribute_names(Some(names))
                            .set_expression_attribute_values(Some(values));
                    }
                    aws_sdk_dynamodb::types::TransactWriteItem::builder()
                        .put(builder.build().map_err(|e| Error::Internal(e.to_string()))?)
                        .build()
                }
                TransactAction::Delete { partition_key, sort_key, condition } => {
                    let mut builder = aws_sdk_dynamodb::types::Delete::builder()
                        .table_name(&self.table_name)
                        .key(ATTR_PK, av_s(&partition_key))
                        .key(ATTR_SK, av_s(&sort_key));
                    if let Some(condition) = &condition {
                        let (expr, names, values) = condition_expression(condition, "");
                        builder = builder
                            .condition_expression(expr)
                            .set_expression_attribute_names(Some(names))
                            .set_expression_attribute_values(Some(values));
                    }
                    aws_sdk_dynamodb::types::TransactWriteItem::builder()
                        .delete(builder.build().map_err(|e| Error::Internal(e.to_string()))?)
                        .build()
                }
                TransactAction::Update { partition_key, sort_key, mutation, condition } => {
                    let (update_expr, mut names, mut values) = mutation_expression(&mutation);
                    let mut builder = aws_sdk_dynamodb::types::Update::builder()
                        .table_name(&self.table_name)
                        .key(ATTR_PK, av_s(&partition_key))
                        .key(ATTR_SK, av_s(&sort_key))
                        .update_expression(update_expr);
                    if let Some(condition) = &condition {
                        let (cond_expr, cond_names, cond_values) = condition_expression(condition, "c");
                        names.extend(cond_names);
                        values.extend(cond_values);
                        builder = builder.condition_expression(cond_expr);
                    }
                    builder = builder.set_expression_attribute_names(Some(names)).set_expression_attribute_values(Some(values));
                    aws_sdk_dynamodb::types::TransactWriteItem::builder()
                        .update(builder.build().map_err(|e| Error::Internal(e.to_string()))?)
                        .build()
                }
                TransactAction::ConditionCheck { partition_key, sort_key, condition } => {
                    let (expr, names, values) = condition_expression(&condition, "");
                    let builder = aws_sdk_dynamodb::types::ConditionCheck::builder()
                        .table_name(&self.table_name)
                        .key(ATTR_PK, av_s(&partition_key))
                        .key(ATTR_SK, av_s(&sort_key))
                        .condition_expression(expr)
                        .set_expression_attribute_names(Some(names))
                        .set_expression_attribute_values(Some(values));
                    aws_sdk_dynamodb::types::TransactWriteItem::builder()
                        .condition_check(builder.build().map_err(|e| Error::Internal(e.to_string()))?)
                        .build()
                }
            };
            items.push(transact_item);
        }

        self.client
            .transact_write_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(|err| {
                if let Some(svc) = err.as_service_error() {
                    if svc.is_transaction_canceled_exception() {
                        let reasons: Vec<String> = svc
                            .cancellation_reasons()
                            .iter()
                            .enumerate()
                            .filter(|(_, r)| r.code() != Some("None"))
                            .map(|(i, r)| format!("action[{i}]: {}", r.message().unwrap_or("cancelled")))
                            .collect();
                        return Error::ConditionFailed(format!("transaction cancelled: {}", reasons.join("; ")));
                    }
                    classify_sdk_error("transact_write_items", svc)
                } else {
                    Error::ServiceError(format!("transact_write_items: {err}"))
                }
            })?;
        Ok(())
    }

    async fn transact_get(&self, keys: Vec<(String, String)>) -> CResult<Vec<Option<Item>>> {
        let items: Vec<_> = keys
            .iter()
            .map(|(pk, sk)| {
                aws_sdk_dynamodb::types::TransactGetItem::builder()
                    .get(
                        aws_sdk_dynamodb::types::Get::builder()
                            .table_name(&self.table_name)
                            .key(ATTR_PK, av_s(pk))
                            .key(ATTR_SK, av_s(sk))
                            .build()
                            .expect("well-formed Get"),
                    )
                    .build()
            })
            .collect();

        let output = self
            .client
            .transact_get_items()
            .set_transact_items(Some(items))
            .send()
            .await
            .map_err(|err| {
                if let Some(svc) = err.as_service_error() {
                    classify_sdk_error("transact_get_items", svc)
                } else {
                    Error::ServiceError(format!("transact_get_items: {err}"))
                }
            })?;

        let now = crate::item::now_seconds();
        output
            .responses()
            .iter()
            .map(|response| match response.item() {
                Some(attrs) => {
                    let item = attrs_to_item(attrs)?;
                    Ok(if item.is_expired(now) { None } else { Some(item) })
                }
                None => Ok(None),
            })
            .collect()
    }
}
