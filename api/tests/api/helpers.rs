use unsubscribe::adapters::in_memory_unsubscribe_store::InMemoryUnsubscribeStore;
use unsubscribe::configuration::get_configuration;
use unsubscribe::domain::unsubscribe_store::{StoreError, UnsubscribeStore};
use unsubscribe::startup::Application;
use async_trait::async_trait;
use once_cell::sync::Lazy;
use std::sync::Arc;
use telemetry::{get_subscriber, init_subscriber};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

static TRACING: Lazy<()> = Lazy::new(|| {
    let default_filter = "info".to_string();
    let subscriber_name = "test".to_string();

    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter, std::io::stdout, None);
        init_subscriber(subscriber);
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter, std::io::sink, None);
        init_subscriber(subscriber);
    }
});

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub store: InMemoryUnsubscribeStore,
    pub request_done_receiver: UnboundedReceiver<()>,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn get_unsubscribe(&self, query: &str) -> reqwest::Response {
        self.api_client
            .get(format!("{}/unsubscribe?{}", &self.address, query))
            .send()
            .await
            .expect("Failed to execute request.")
    }
}

pub async fn spawn_app() -> TestApp {
    let store = InMemoryUnsubscribeStore::default();
    let mut app = spawn_app_with_store(Arc::new(store.clone())).await;
    app.store = store;
    app
}

/// Runs the application on a random port in front of the given store. The
/// returned `store` is a fresh in-memory one unless set by the caller.
pub async fn spawn_app_with_store(store: Arc<dyn UnsubscribeStore>) -> TestApp {
    Lazy::force(&TRACING);

    let configuration = {
        let mut c = get_configuration()
            .await
            .expect("Failed to read configuration.");
        c.application.application_port = 0;
        c
    };

    let (request_done_sender, request_done_receiver) = unbounded_channel::<()>();

    let application =
        Application::build_with_store(configuration, store, Some(request_done_sender))
            .expect("Failed to build application.");
    let port = application.port();
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", port),
        port,
        store: InMemoryUnsubscribeStore::default(),
        request_done_receiver,
        api_client: reqwest::Client::new(),
    }
}

pub struct FailingUnsubscribeStore;

#[async_trait]
impl UnsubscribeStore for FailingUnsubscribeStore {
    async fn put(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(anyhow::anyhow!("ProvisionedThroughputExceededException").into())
    }
}
