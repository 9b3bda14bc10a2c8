use crate::configuration::Settings;
use crate::domain::email_client::EmailClient;
use crate::domain::form_submission::{Submission, SubmissionEvent};
use crate::domain::welcome_email::build_welcome_email;
use crate::utils::error_chain_fmt;
use anyhow::Context;
use lambda_runtime::{Error, LambdaEvent};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;

#[derive(thiserror::Error)]
pub enum WelcomeEmailError {
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for WelcomeEmailError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

/// What a single invocation ended up doing. Returned to the platform as the
/// invocation result; failures are reported here rather than as errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WelcomeOutcome {
    Sent,
    Skipped(SkipReason),
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnexpectedForm,
    MissingEmail,
    MissingConfiguration,
}

/// Handles form submission events delivered to the welcome-mail function.
pub struct SendWelcomeEventHandler {
    request_done_sender: UnboundedSender<()>,
}

impl SendWelcomeEventHandler {
    pub fn new(request_done_sender: UnboundedSender<()>) -> Self {
        Self {
            request_done_sender,
        }
    }

    pub async fn invoke<TEmail: EmailClient>(
        &self,
        event: LambdaEvent<SubmissionEvent>,
        configuration: &Settings,
        email_client: Option<&TEmail>,
    ) -> Result<WelcomeOutcome, Error> {
        let outcome = handle_submission(&event.payload.payload, configuration, email_client).await;

        // Notify the extension to flush traces.
        let _ = self.request_done_sender.send(());

        Ok(outcome)
    }
}

#[tracing::instrument(
    name = "handle_form_submission",
    skip(submission, configuration, email_client),
    fields(form_name = %submission.form_name)
)]
pub async fn handle_submission<TEmail: EmailClient>(
    submission: &Submission,
    configuration: &Settings,
    email_client: Option<&TEmail>,
) -> WelcomeOutcome {
    if submission.form_name != configuration.notify_form_name {
        tracing::info!("Ignoring a submission from another form");
        return WelcomeOutcome::Skipped(SkipReason::UnexpectedForm);
    }

    let recipient = match submission.email() {
        Some(recipient) => recipient,
        None => {
            tracing::info!("Submission has no email address");
            return WelcomeOutcome::Skipped(SkipReason::MissingEmail);
        }
    };

    let email_client = match email_client {
        Some(email_client) => email_client,
        None => {
            tracing::error!("SMTP credentials are not configured, no welcome email was sent");
            return WelcomeOutcome::Skipped(SkipReason::MissingConfiguration);
        }
    };

    match send_welcome_email(email_client, recipient, &configuration.base_url).await {
        Ok(()) => {
            tracing::info!(subscriber_email = %recipient, "Welcome email sent");
            WelcomeOutcome::Sent
        }
        Err(e) => {
            tracing::error!(
                error.cause_chain = ?e,
                error.message = %e,
                subscriber_email = %recipient,
                "Failed to send the welcome email",
            );
            WelcomeOutcome::Failed
        }
    }
}

#[tracing::instrument(
    name = "send_welcome_email_to_subscriber",
    skip(email_client, base_url)
)]
pub async fn send_welcome_email<TEmail: EmailClient>(
    email_client: &TEmail,
    recipient: &str,
    base_url: &str,
) -> Result<(), WelcomeEmailError> {
    let email =
        build_welcome_email(recipient, base_url).context("Failed to build the welcome email")?;

    email_client
        .send_email(&email)
        .await
        .context("Failed to send the welcome email")?;

    Ok(())
}
