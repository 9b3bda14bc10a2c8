use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use anyhow::anyhow;
use lambda_runtime::{Context, LambdaEvent};
use once_cell::sync::Lazy;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use backend::configuration::{get_configuration, Settings};
use backend::domain::email_client::{EmailClient, OutgoingEmail};
use backend::domain::form_submission::SubmissionEvent;
use backend::send_welcome_handler::{SendWelcomeEventHandler, WelcomeOutcome};
use telemetry::{get_subscriber, init_subscriber};

pub const BASE_URL: &str = "https://belowtheline.test";

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
    pub configuration: Settings,
    pub handler: SendWelcomeEventHandler,
    pub request_done_receiver: UnboundedReceiver<()>,
}

impl TestApp {
    pub async fn submit<TEmail: EmailClient>(
        &self,
        event: serde_json::Value,
        email_client: Option<&TEmail>,
    ) -> WelcomeOutcome {
        let payload: SubmissionEvent =
            serde_json::from_value(event).expect("Failed to deserialize the submission event");

        self.handler
            .invoke(
                LambdaEvent::new(payload, Context::default()),
                &self.configuration,
                email_client,
            )
            .await
            .expect("The welcome handler never fails an invocation")
    }

    pub async fn submit_without_smtp(&self, event: serde_json::Value) -> WelcomeOutcome {
        self.submit::<RecordingEmailClient>(event, None).await
    }
}

pub async fn spawn_app() -> TestApp {
    Lazy::force(&TRACING);

    let configuration = {
        let mut c = get_configuration()
            .await
            .expect("Failed to read configuration.");
        c.base_url = BASE_URL.to_string();
        c
    };

    let (request_done_sender, request_done_receiver) = unbounded_channel::<()>();

    TestApp {
        configuration,
        handler: SendWelcomeEventHandler::new(request_done_sender),
        request_done_receiver,
    }
}

pub fn submission(form_name: &str, email: Option<&str>) -> serde_json::Value {
    serde_json::json!({
        "payload": {
            "form_name": form_name,
            "data": { "email": email }
        }
    })
}

#[derive(Default)]
pub struct RecordingEmailClient {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingEmailClient {
    pub fn sent(&self) -> Vec<OutgoingEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl EmailClient for RecordingEmailClient {
    async fn send_email(&self, email: &OutgoingEmail) -> Result<(), anyhow::Error> {
        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct FailingEmailClient {
    attempts: AtomicUsize,
}

impl FailingEmailClient {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmailClient for FailingEmailClient {
    async fn send_email(&self, _email: &OutgoingEmail) -> Result<(), anyhow::Error> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(anyhow!("535 Authentication Failed"))
    }
}
