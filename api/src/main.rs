use unsubscribe::configuration::get_configuration;
use unsubscribe::startup::Application;
use lambda_extension::{service_fn, Extension};
use std::env;
use std::sync::Arc;
use telemetry::{get_subscriber, init_subscriber, init_tracer, TraceFlushExtension};
use tokio::sync::mpsc::unbounded_channel;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    let configuration = get_configuration().await?;

    let tracer_provider = init_tracer(&configuration.telemetry)?;
    let subscriber = get_subscriber(
        configuration.telemetry.dataset_name.clone(),
        "info".into(),
        std::io::stdout,
        tracer_provider.as_ref(),
    );

    init_subscriber(subscriber);

    // Behind the Lambda web adapter every response is one invocation.
    let request_done_sender = if env::var("AWS_LAMBDA_RUNTIME_API").is_ok() {
        let (request_done_sender, request_done_receiver) = unbounded_channel::<()>();

        let flush_extension = Arc::new(TraceFlushExtension::new(
            request_done_receiver,
            tracer_provider,
        ));
        let extension = Extension::new()
            // Internal extensions only support INVOKE events.
            .with_events(&["INVOKE"])
            .with_events_processor(service_fn(move |event| {
                let flush_extension = flush_extension.clone();
                async move { flush_extension.invoke(event).await }
            }))
            // Internal extension names MUST be unique within a given Lambda function.
            .with_extension_name("internal-flush")
            .register()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to register the flush extension: {}", e))?;

        tokio::spawn(async move {
            if let Err(e) = extension.run().await {
                tracing::error!(error.message = %e, "The flush extension stopped");
            }
        });

        Some(request_done_sender)
    } else {
        None
    };

    let application = Application::build(configuration, request_done_sender).await?;

    application.run_until_stopped().await?;

    Ok(())
}
