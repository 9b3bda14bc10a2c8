use crate::domain::unsubscribe_store::{StoreError, UnsubscribeStore};
use anyhow::Context;
use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;

/// One object per address under `<prefix>/`, holding the opt-out timestamp.
#[derive(Debug, Clone)]
pub struct S3UnsubscribeStore {
    s3_client: Client,
    bucket_name: String,
    prefix: String,
}

impl S3UnsubscribeStore {
    pub fn new(s3_client: Client, bucket_name: String, prefix: String) -> Self {
        Self {
            s3_client,
            bucket_name,
            prefix,
        }
    }

    pub fn object_key(&self, key: &str) -> String {
        format!("{}/{}", self.prefix.trim_end_matches('/'), key)
    }
}

#[async_trait]
impl UnsubscribeStore for S3UnsubscribeStore {
    #[tracing::instrument(name = "put_unsubscribe_in_s3", skip(self, value))]
    async fn put(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let object_key = self.object_key(key);

        self.s3_client
            .put_object()
            .bucket(&self.bucket_name)
            .key(&object_key)
            .content_type("text/plain")
            .body(ByteStream::from(value.as_bytes().to_vec()))
            .send()
            .await
            .with_context(|| {
                format!(
                    "Failure writing {} to bucket {}",
                    object_key, &self.bucket_name
                )
            })?;

        Ok(())
    }
}
