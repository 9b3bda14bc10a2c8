use crate::configuration::{EmailClientSettings, SmtpCredentials};
use crate::domain::email_client::{EmailClient, OutgoingEmail};
use anyhow::Context;
use async_trait::async_trait;
use lettre::message::header::{Header, HeaderName, HeaderValue};
use lettre::message::{Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use secrecy::ExposeSecret;

/// Sends mail through an authenticated relay over implicit TLS.
#[derive(Clone)]
pub struct SmtpEmailClient {
    sender: Mailbox,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailClient {
    pub fn new(
        settings: &EmailClientSettings,
        credentials: SmtpCredentials,
    ) -> Result<Self, anyhow::Error> {
        let sender = Mailbox::new(
            Some(settings.sender_name.clone()),
            credentials
                .sender_email
                .parse()
                .with_context(|| format!("{} is not a valid sender", credentials.sender_email))?,
        );

        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.smtp_host)
            .with_context(|| format!("Failed to configure the relay {}", settings.smtp_host))?
            .port(settings.smtp_port)
            .credentials(Credentials::new(
                credentials.sender_email.clone(),
                credentials.app_password.expose_secret().clone(),
            ))
            .timeout(Some(settings.timeout_duration()))
            .build();

        Ok(Self { sender, transport })
    }

    pub fn build_message(&self, email: &OutgoingEmail) -> Result<Message, anyhow::Error> {
        let recipient: Mailbox = email
            .recipient
            .parse()
            .with_context(|| format!("{} is not a valid recipient", email.recipient))?;

        let mut builder = Message::builder()
            .from(self.sender.clone())
            .to(recipient)
            .subject(email.subject.as_str());

        if let Some(link) = &email.list_unsubscribe {
            builder = builder
                .header(ListUnsubscribe(format!("<{}>", link)))
                .header(ListUnsubscribePost::one_click());
        }

        builder
            .multipart(MultiPart::alternative_plain_html(
                email.text_content.clone(),
                email.html_content.clone(),
            ))
            .context("Failed to assemble the message")
    }
}

#[async_trait]
impl EmailClient for SmtpEmailClient {
    #[tracing::instrument(name = "send_email_over_smtp", skip(self, email), fields(recipient = %email.recipient))]
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), anyhow::Error> {
        let message = self.build_message(email)?;

        let response = self
            .transport
            .send(message)
            .await
            .context("The SMTP relay rejected the message")?;

        tracing::info!(smtp.code = %response.code(), "Message accepted by the relay");

        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ListUnsubscribe(String);

impl Header for ListUnsubscribe {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("List-Unsubscribe")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_owned()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// RFC 8058 one-click unsubscribe marker.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ListUnsubscribePost(String);

impl ListUnsubscribePost {
    fn one_click() -> Self {
        Self("List-Unsubscribe=One-Click".to_string())
    }
}

impl Header for ListUnsubscribePost {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("List-Unsubscribe-Post")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_owned()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}
