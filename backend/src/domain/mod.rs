pub mod email_client;
pub mod form_submission;
pub mod welcome_email;
