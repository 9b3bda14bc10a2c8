use backend::adapters::smtp_email_client::SmtpEmailClient;
use backend::configuration::{get_configuration, SmtpCredentials};
use backend::domain::form_submission::SubmissionEvent;
use backend::send_welcome_handler::SendWelcomeEventHandler;
use lambda_extension::Extension;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use std::sync::Arc;
use telemetry::{get_subscriber, init_subscriber, init_tracer, TraceFlushExtension};
use tokio::sync::mpsc::unbounded_channel;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let configuration = get_configuration().await?;

    let tracer_provider = init_tracer(&configuration.telemetry)?;
    let subscriber = get_subscriber(
        configuration.telemetry.dataset_name.clone(),
        "info".into(),
        std::io::stdout,
        tracer_provider.as_ref(),
    );

    init_subscriber(subscriber);

    // Credentials are read once per cold start; without them every invocation is a logged no-op.
    let email_client = match SmtpCredentials::from_env()
        .map_err(anyhow::Error::from)
        .and_then(|credentials| SmtpEmailClient::new(&configuration.email_settings, credentials))
    {
        Ok(email_client) => Some(email_client),
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                "SMTP client unavailable, welcome emails are disabled"
            );
            None
        }
    };

    let (request_done_sender, request_done_receiver) = unbounded_channel::<()>();

    let flush_extension = Arc::new(TraceFlushExtension::new(
        request_done_receiver,
        tracer_provider,
    ));
    let extension = Extension::new()
        // Internal extensions only support INVOKE events.
        .with_events(&["INVOKE"])
        .with_events_processor(lambda_extension::service_fn(|event| {
            let flush_extension = flush_extension.clone();
            async move { flush_extension.invoke(event).await }
        }))
        // Internal extension names MUST be unique within a given Lambda function.
        .with_extension_name("internal-flush")
        // Extensions MUST be registered before calling lambda_runtime::run(), which ends the Init
        // phase and begins the Invoke phase.
        .register()
        .await?;

    let handler = Arc::new(SendWelcomeEventHandler::new(request_done_sender));

    tokio::try_join!(
        run(service_fn(|event: LambdaEvent<SubmissionEvent>| {
            let handler = handler.clone();
            let configuration = configuration.clone();
            let email_client = email_client.clone();

            async move {
                handler
                    .invoke(event, &configuration, email_client.as_ref())
                    .await
            }
        })),
        extension.run(),
    )?;

    Ok(())
}
