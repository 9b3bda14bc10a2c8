use crate::helpers::{
    spawn_app, submission, FailingEmailClient, RecordingEmailClient, BASE_URL,
};
use backend::send_welcome_handler::{SkipReason, WelcomeOutcome};
use quickcheck::TestResult;

#[tokio::test]
async fn a_notify_submission_sends_exactly_one_welcome_email() {
    let app = spawn_app().await;
    let email_client = RecordingEmailClient::default();

    let outcome = app
        .submit(submission("notify", Some("a@b.com")), Some(&email_client))
        .await;

    assert_eq!(outcome, WelcomeOutcome::Sent);
    let sent = email_client.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].recipient, "a@b.com");
    assert_eq!(
        sent[0].list_unsubscribe.as_deref(),
        Some(format!("{}/unsubscribe?email=a%40b.com", BASE_URL).as_str())
    );
}

#[tokio::test]
async fn the_welcome_email_links_to_the_unsubscribe_endpoint() {
    let app = spawn_app().await;
    let email_client = RecordingEmailClient::default();

    app.submit(submission("notify", Some("a@b.com")), Some(&email_client))
        .await;

    let email = &email_client.sent()[0];
    let get_link = |s: &str| {
        let links: Vec<_> = linkify::LinkFinder::new()
            .links(s)
            .filter(|l| *l.kind() == linkify::LinkKind::Url)
            .collect();
        assert_eq!(links.len(), 1);
        links[0].as_str().to_owned()
    };

    let html_link = get_link(&email.html_content);
    let text_link = get_link(&email.text_content);

    assert_eq!(html_link, text_link);
    assert!(html_link.starts_with(&format!("{}/unsubscribe?", BASE_URL)));
}

#[tokio::test]
async fn other_forms_are_ignored() {
    let app = spawn_app().await;
    let email_client = RecordingEmailClient::default();

    let outcome = app
        .submit(submission("contact", Some("a@b.com")), Some(&email_client))
        .await;

    assert_eq!(outcome, WelcomeOutcome::Skipped(SkipReason::UnexpectedForm));
    assert!(email_client.sent().is_empty());
}

#[tokio::test]
async fn notify_submissions_without_an_email_send_nothing() {
    let app = spawn_app().await;
    let email_client = RecordingEmailClient::default();

    let test_cases = vec![
        (submission("notify", None), "null email"),
        (submission("notify", Some("")), "empty email"),
        (submission("notify", Some("   ")), "blank email"),
        (
            serde_json::json!({ "payload": { "form_name": "notify" } }),
            "no data",
        ),
    ];

    for (event, description) in test_cases {
        let outcome = app.submit(event, Some(&email_client)).await;

        assert_eq!(
            outcome,
            WelcomeOutcome::Skipped(SkipReason::MissingEmail),
            "The handler did not skip a submission with {}",
            description
        );
    }
    assert!(email_client.sent().is_empty());
}

#[tokio::test]
async fn missing_smtp_credentials_turn_the_invocation_into_a_no_op() {
    let app = spawn_app().await;

    let outcome = app
        .submit_without_smtp(submission("notify", Some("a@b.com")))
        .await;

    assert_eq!(
        outcome,
        WelcomeOutcome::Skipped(SkipReason::MissingConfiguration)
    );
}

#[tokio::test]
async fn smtp_failures_are_swallowed_without_retrying() {
    let app = spawn_app().await;
    let email_client = FailingEmailClient::default();

    let outcome = app
        .submit(submission("notify", Some("a@b.com")), Some(&email_client))
        .await;

    assert_eq!(outcome, WelcomeOutcome::Failed);
    assert_eq!(email_client.attempts(), 1);
}

#[tokio::test]
async fn every_invocation_signals_the_flush_extension() {
    let mut app = spawn_app().await;
    let email_client = RecordingEmailClient::default();

    app.submit(submission("contact", None), Some(&email_client))
        .await;
    app.submit(submission("notify", Some("a@b.com")), Some(&email_client))
        .await;

    assert!(app.request_done_receiver.try_recv().is_ok());
    assert!(app.request_done_receiver.try_recv().is_ok());
    assert!(app.request_done_receiver.try_recv().is_err());
}

#[quickcheck_macros::quickcheck]
fn no_form_other_than_notify_ever_sends(form_name: String, email: Option<String>) -> TestResult {
    if form_name == "notify" {
        return TestResult::discard();
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .unwrap();

    runtime.block_on(async {
        let app = spawn_app().await;
        let email_client = RecordingEmailClient::default();

        let outcome = app
            .submit(submission(&form_name, email.as_deref()), Some(&email_client))
            .await;

        TestResult::from_bool(
            outcome == WelcomeOutcome::Skipped(SkipReason::UnexpectedForm)
                && email_client.sent().is_empty(),
        )
    })
}
