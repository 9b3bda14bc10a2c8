use crate::domain::opt_out::{opt_out_timestamp, UnsubscribeEmail};
use crate::domain::unsubscribe_store::UnsubscribeStore;
use crate::utils::error_chain_fmt;
use actix_web::http::header::ContentType;
use actix_web::http::StatusCode;
use actix_web::{web, HttpRequest, HttpResponse, ResponseError};
use anyhow::Context;
use chrono::Utc;
use tracing::Span;

#[derive(thiserror::Error)]
pub enum UnsubscribeError {
    #[error("{0}")]
    ValidationError(String),
    #[error(transparent)]
    UnexpectedError(#[from] anyhow::Error),
}

impl std::fmt::Debug for UnsubscribeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        error_chain_fmt(self, f)
    }
}

impl ResponseError for UnsubscribeError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ValidationError(_) => StatusCode::BAD_REQUEST,
            Self::UnexpectedError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            Self::ValidationError(message) => message.as_str(),
            Self::UnexpectedError(_) => "We could not process your request. Please try again later.",
        };

        HttpResponse::build(self.status_code())
            .content_type(ContentType::html())
            .body(error_page(message))
    }
}

#[tracing::instrument(
    name = "Unsubscribing an email address",
    skip(request, store),
    fields(subscriber_email = tracing::field::Empty)
)]
pub async fn unsubscribe(
    request: HttpRequest,
    store: web::Data<dyn UnsubscribeStore>,
) -> Result<HttpResponse, UnsubscribeError> {
    let email = UnsubscribeEmail::parse(
        &email_parameter(request.query_string()).unwrap_or_default(),
    )
    .map_err(UnsubscribeError::ValidationError)?;
    Span::current().record("subscriber_email", &tracing::field::display(&email));

    store
        .put(email.as_ref(), &opt_out_timestamp(Utc::now()))
        .await
        .context("Failed to record the opt-out")?;

    Ok(HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(confirmation_page(&email)))
}

/// The first non-blank `email` in the query string. Repeated parameters are
/// tolerated, and a query that does not decode has no email.
fn email_parameter(query: &str) -> Option<String> {
    serde_urlencoded::from_str::<Vec<(String, String)>>(query)
        .ok()?
        .into_iter()
        .find(|(key, value)| key == "email" && !value.trim().is_empty())
        .map(|(_, value)| value)
}

fn confirmation_page(email: &UnsubscribeEmail) -> String {
    page(
        "Unsubscribed",
        &format!(
            "<h1>You're unsubscribed.</h1>\n    \
             <p><strong>{}</strong> will no longer receive Below The Line.</p>\n    \
             <p>Changed your mind? Sign up again any time.</p>",
            htmlescape::encode_minimal(email.as_ref())
        ),
    )
}

fn error_page(message: &str) -> String {
    page(
        "Unsubscribe failed",
        &format!(
            "<h1>Something went wrong.</h1>\n    <p>{}</p>",
            htmlescape::encode_minimal(message)
        ),
    )
}

fn page(title: &str, content: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta http-equiv="content-type" content="text/html; charset=utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>{title} | Below The Line</title>
  </head>
  <body style="margin:0;padding:48px 16px;background:#0f172a;font-family:Helvetica,Arial,sans-serif;color:#e2e8f0;text-align:center;">
    {content}
  </body>
</html>"#
    )
}
