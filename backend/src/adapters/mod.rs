pub mod smtp_email_client;
