use actix_web::body::MessageBody;
use actix_web::dev::{ServiceRequest, ServiceResponse};
use anyhow::anyhow;
use lambda_extension::{Error, NextEvent};
use opentelemetry::trace::{TraceContextExt, TracerProvider as _};
use opentelemetry::{global, KeyValue};
use opentelemetry_otlp::{SpanExporterBuilder, WithExportConfig};
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{Config, TracerProvider};
use opentelemetry_sdk::{runtime, Resource};
use secrecy::{ExposeSecret, Secret};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::Mutex;
use tracing::subscriber::set_global_default;
use tracing::{Span, Subscriber};
use tracing_actix_web::{DefaultRootSpanBuilder, Level, RootSpanBuilder};
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::LogTracer;
use tracing_opentelemetry::OpenTelemetrySpanExt;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, EnvFilter, Registry};

#[derive(Deserialize, Clone)]
pub struct TelemetrySettings {
    /// OTLP/HTTP collector. Span export is disabled when unset.
    pub otlp_endpoint: Option<String>,
    pub honeycomb_api_key: Option<Secret<String>>,
    pub dataset_name: String,
}

/// Compose multiple layers into a tracing subscriber.
pub fn get_subscriber<Sink>(
    name: String,
    env_filter: String,
    sink: Sink,
    tracer_provider: Option<&TracerProvider>,
) -> impl Subscriber + Send + Sync
where
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(env_filter));
    let formatting_layer = BunyanFormattingLayer::new(name.clone(), sink);
    let otel_layer = tracer_provider
        .map(|provider| tracing_opentelemetry::layer().with_tracer(provider.tracer(name)));

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
        .with(otel_layer)
}

pub fn init_subscriber(subscriber: impl Subscriber + Send + Sync) {
    let _ = LogTracer::init();
    global::set_text_map_propagator(TraceContextPropagator::new());

    let _ = set_global_default(subscriber);
}

pub fn init_tracer(
    trace_config: &TelemetrySettings,
) -> Result<Option<TracerProvider>, anyhow::Error> {
    let endpoint = match &trace_config.otlp_endpoint {
        Some(endpoint) => endpoint.clone(),
        None => return Ok(None),
    };

    let mut headers = HashMap::new();
    if let Some(api_key) = &trace_config.honeycomb_api_key {
        headers.insert(
            "x-honeycomb-dataset".to_string(),
            trace_config.dataset_name.clone(),
        );
        headers.insert(
            "x-honeycomb-team".to_string(),
            api_key.expose_secret().clone(),
        );
    }

    let span_exporter = opentelemetry_otlp::new_exporter()
        .http()
        .with_endpoint(endpoint)
        .with_http_client(reqwest::Client::default())
        .with_headers(headers)
        .with_timeout(Duration::from_secs(2));

    let exporter = SpanExporterBuilder::Http(span_exporter)
        .build_span_exporter()
        .map_err(|e| anyhow!("Failed to build the OTLP span exporter: {}", e))?;

    let provider = TracerProvider::builder()
        .with_config(
            Config::default().with_resource(Resource::new(vec![KeyValue::new(
                opentelemetry_semantic_conventions::resource::SERVICE_NAME.to_string(),
                trace_config.dataset_name.clone(),
            )])),
        )
        .with_batch_exporter(exporter, runtime::Tokio)
        .build();

    Ok(Some(provider))
}

pub fn flush_tracer(tracer_provider: &TracerProvider) {
    for result in tracer_provider.force_flush() {
        if let Err(e) = result {
            tracing::warn!(error.message = %e, "Failed to flush spans");
        }
    }
}

pub fn get_trace_and_span_id() -> Option<(String, String)> {
    let context = Span::current().context();
    let span_context = context.span().span_context().clone();

    if span_context.is_valid() {
        Some((
            span_context.trace_id().to_string(),
            span_context.span_id().to_string(),
        ))
    } else {
        None
    }
}

pub struct CustomLevelRootSpanBuilder;

impl RootSpanBuilder for CustomLevelRootSpanBuilder {
    fn on_request_start(request: &ServiceRequest) -> Span {
        let paths_to_skip = ["/", "/health_check"];

        let level = if paths_to_skip.contains(&request.path()) {
            Level::TRACE
        } else {
            Level::INFO
        };
        tracing_actix_web::root_span!(level = level, request)
    }

    fn on_request_end<B: MessageBody>(
        span: Span,
        outcome: &Result<ServiceResponse<B>, actix_web::Error>,
    ) {
        DefaultRootSpanBuilder::on_request_end(span, outcome);
    }
}

/// Internal Lambda extension that flushes spans once the runtime reports an
/// invocation as done.
pub struct TraceFlushExtension {
    request_done_receiver: Mutex<UnboundedReceiver<()>>,
    tracer_provider: Option<TracerProvider>,
}

impl TraceFlushExtension {
    pub fn new(
        request_done_receiver: UnboundedReceiver<()>,
        tracer_provider: Option<TracerProvider>,
    ) -> Self {
        Self {
            request_done_receiver: Mutex::new(request_done_receiver),
            tracer_provider,
        }
    }

    pub async fn invoke(&self, event: lambda_extension::LambdaEvent) -> Result<(), Error> {
        match event.next {
            // NB: Internal extensions only support the INVOKE event.
            NextEvent::Shutdown(shutdown) => {
                return Err(
                    anyhow!("extension received unexpected SHUTDOWN event: {:?}", shutdown).into(),
                );
            }
            NextEvent::Invoke(_e) => {}
        }

        tracing::debug!("Waiting for the invocation to be processed");

        self.request_done_receiver
            .lock()
            .await
            .recv()
            .await
            .ok_or_else(|| anyhow!("channel is closed"))?;

        if let Some(tracer_provider) = &self.tracer_provider {
            flush_tracer(tracer_provider);
        }

        Ok(())
    }
}
