pub mod dynamodb_unsubscribe_store;
pub mod in_memory_unsubscribe_store;
pub mod s3_unsubscribe_store;
