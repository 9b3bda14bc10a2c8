use crate::adapters::dynamodb_unsubscribe_store::DynamoDbUnsubscribeStore;
use crate::adapters::in_memory_unsubscribe_store::InMemoryUnsubscribeStore;
use crate::adapters::s3_unsubscribe_store::S3UnsubscribeStore;
use crate::configuration::{Settings, StoreBackend, StoreSettings};
use crate::domain::unsubscribe_store::UnsubscribeStore;
use crate::middleware::{readiness_check_path, RequestDone};
use crate::routes::{health_check, unsubscribe};
use actix_web::dev::{Server, Service};
use actix_web::http::header::{HeaderName, HeaderValue};
use actix_web::web::Data;
use actix_web::{web, App, HttpMessage, HttpServer};
use anyhow::Context;
use std::net::TcpListener;
use std::sync::Arc;
use telemetry::CustomLevelRootSpanBuilder;
use tokio::sync::mpsc::UnboundedSender;
use tracing_actix_web::{RequestId, TracingLogger};

pub struct Application {
    port: u16,
    server: Server,
}

impl Application {
    pub async fn build(
        configuration: Settings,
        request_done_sender: Option<UnboundedSender<()>>,
    ) -> Result<Self, anyhow::Error> {
        let store = build_store(&configuration.store).await?;

        Self::build_with_store(configuration, store, request_done_sender)
    }

    pub fn build_with_store(
        configuration: Settings,
        store: Arc<dyn UnsubscribeStore>,
        request_done_sender: Option<UnboundedSender<()>>,
    ) -> Result<Self, anyhow::Error> {
        let listener = TcpListener::bind(format!(
            "{}:{}",
            configuration.application.host_name, configuration.application.application_port
        ))?;

        let port = listener.local_addr()?.port();
        let request_done = RequestDone::new(request_done_sender).skip_path(readiness_check_path());
        let server = run(listener, store, request_done)?;

        Ok(Self { port, server })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub async fn run_until_stopped(self) -> Result<(), std::io::Error> {
        self.server.await
    }
}

#[tracing::instrument(name = "build_unsubscribe_store", skip(settings), fields(backend = ?settings.backend))]
pub async fn build_store(
    settings: &StoreSettings,
) -> Result<Arc<dyn UnsubscribeStore>, anyhow::Error> {
    let store: Arc<dyn UnsubscribeStore> = match settings.backend {
        StoreBackend::Memory => Arc::new(InMemoryUnsubscribeStore::default()),
        StoreBackend::DynamoDb => {
            let sdk_config = settings.sdk_config().await;

            Arc::new(DynamoDbUnsubscribeStore::new(
                aws_sdk_dynamodb::Client::new(&sdk_config),
                settings.collection_name.clone(),
            ))
        }
        StoreBackend::S3 => {
            let bucket_name = settings
                .bucket_name
                .clone()
                .context("store.bucket_name is required for the s3 backend")?;
            let sdk_config = settings.sdk_config().await;
            // Local emulators only serve path-style addressing.
            let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
                .force_path_style(settings.endpoint_url.is_some())
                .build();

            Arc::new(S3UnsubscribeStore::new(
                aws_sdk_s3::Client::from_conf(s3_config),
                bucket_name,
                settings.collection_name.clone(),
            ))
        }
    };

    Ok(store)
}

fn run(
    listener: TcpListener,
    store: Arc<dyn UnsubscribeStore>,
    request_done: RequestDone,
) -> Result<Server, anyhow::Error> {
    let store_data: Data<dyn UnsubscribeStore> = Data::from(store);

    let server = HttpServer::new(move || {
        App::new()
            .wrap_fn(|req, srv| {
                let request_id = req.extensions().get::<RequestId>().copied();
                let res = srv.call(req);
                async move {
                    let mut res = res.await?;
                    if let Some(request_id) = request_id {
                        if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                            res.headers_mut()
                                .insert(HeaderName::from_static("x-request-id"), value);
                        }
                    }
                    Ok(res)
                }
            })
            .wrap(TracingLogger::<CustomLevelRootSpanBuilder>::new())
            .wrap(request_done.clone())
            .route("/health_check", web::get().to(health_check))
            .route("/unsubscribe", web::get().to(unsubscribe))
            .app_data(store_data.clone())
    })
    .listen(listener)?
    .run();

    Ok(server)
}
