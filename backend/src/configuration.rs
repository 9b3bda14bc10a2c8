use anyhow::Context;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region};
use config::FileFormat;
use secrecy::Secret;
use serde::Deserialize;
use std::time::Duration;
use telemetry::TelemetrySettings;

pub const SENDER_EMAIL_VARIABLE: &str = "ZOHO_EMAIL";
pub const APP_PASSWORD_VARIABLE: &str = "ZOHO_APP_PASSWORD";

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub telemetry: TelemetrySettings,
    pub email_settings: EmailClientSettings,
    /// Public address of the site hosting the unsubscribe endpoint.
    pub base_url: String,
    pub notify_form_name: String,
}

#[derive(Deserialize, Clone)]
pub struct EmailClientSettings {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub sender_name: String,
    pub timeout_milliseconds: u64,
}

impl EmailClientSettings {
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_milliseconds)
    }
}

/// SMTP login for the relay. The sender address doubles as the `From` header.
#[derive(Clone, Debug)]
pub struct SmtpCredentials {
    pub sender_email: String,
    pub app_password: Secret<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum CredentialsError {
    #[error("{0} is not set")]
    Missing(&'static str),
}

impl SmtpCredentials {
    pub fn from_env() -> Result<Self, CredentialsError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CredentialsError> {
        let read = |key: &'static str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .ok_or(CredentialsError::Missing(key))
        };

        Ok(Self {
            sender_email: read(SENDER_EMAIL_VARIABLE)?,
            app_password: Secret::new(read(APP_PASSWORD_VARIABLE)?),
        })
    }
}

pub async fn get_configuration() -> Result<Settings, anyhow::Error> {
    let environment: Environment = std::env::var("APP_ENVIRONMENT")
        .unwrap_or_else(|_| "local".into())
        .try_into()
        .map_err(|e: String| anyhow::anyhow!(e))?;

    let builder = match environment {
        Environment::Local => {
            let base_path =
                std::env::current_dir().context("Failed to determine the current directory")?;
            let configuration_directory = base_path.join("configuration");

            config::Config::builder()
                .add_source(config::File::from(
                    configuration_directory.join("base.yaml"),
                ))
                .add_source(config::File::from(
                    configuration_directory.join(format!("{}.yaml", environment.as_str())),
                ))
        }
        Environment::Production => {
            let document = load_configuration_parameter().await?;

            config::Config::builder()
                .add_source(config::File::from_str(&document, FileFormat::Yaml))
        }
    };

    // E.g. `APP_EMAIL_SETTINGS__SMTP_PORT=587` would set `Settings.email_settings.smtp_port`
    let settings = builder
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<Settings>()?)
}

async fn load_configuration_parameter() -> Result<String, anyhow::Error> {
    let parameter_name = std::env::var("CONFIG_PARAMETER_NAME")
        .context("CONFIG_PARAMETER_NAME must be set in production")?;

    let sdk_config = aws_config::defaults(BehaviorVersion::latest())
        .region(make_region_provider())
        .load()
        .await;

    let parameter = aws_sdk_ssm::Client::new(&sdk_config)
        .get_parameter()
        .name(&parameter_name)
        .with_decryption(true)
        .send()
        .await
        .with_context(|| format!("Failed to retrieve parameter {}", parameter_name))?;

    parameter
        .parameter
        .and_then(|p| p.value)
        .with_context(|| format!("Parameter {} has no value", parameter_name))
}

pub fn make_region_provider() -> RegionProviderChain {
    RegionProviderChain::default_provider().or_else(Region::new("us-east-1"))
}

#[derive(Debug)]
pub enum Environment {
    Local,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Production => "production",
        }
    }
}

impl TryFrom<String> for Environment {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "local" => Ok(Self::Local),
            "production" => Ok(Self::Production),
            other => Err(format!(
                "{} is not a supported environment. Use either local or production",
                other
            )),
        }
    }
}
