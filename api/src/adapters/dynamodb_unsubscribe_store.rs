use crate::domain::unsubscribe_store::{StoreError, UnsubscribeStore};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use telemetry::get_trace_and_span_id;

#[derive(Debug, Clone)]
pub struct DynamoDbUnsubscribeStore {
    client: Client,
    table_name: String,
}

impl DynamoDbUnsubscribeStore {
    pub fn new(client: Client, table_name: String) -> Self {
        Self { client, table_name }
    }
}

#[async_trait]
impl UnsubscribeStore for DynamoDbUnsubscribeStore {
    #[tracing::instrument(name = "put_unsubscribe_in_dynamodb", skip(self, value))]
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let trace_details = get_trace_and_span_id();

        let mut put_res_builder = self
            .client
            .put_item()
            .table_name(&self.table_name)
            .item("PK", AttributeValue::S(key.to_string()))
            .item("Type", AttributeValue::S("Unsubscribe".to_string()))
            .item("UnsubscribedAt", AttributeValue::S(value.to_string()));

        put_res_builder = match trace_details {
            None => put_res_builder,
            Some((trace_id, span_id)) => put_res_builder
                .item("TraceParent", AttributeValue::S(trace_id))
                .item("ParentSpan", AttributeValue::S(span_id)),
        };

        put_res_builder.send().await.with_context(|| {
            format!(
                "Failure writing record to DynamoDB. Using table {}",
                &self.table_name
            )
        })?;

        Ok(())
    }
}
