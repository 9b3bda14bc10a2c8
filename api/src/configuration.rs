use anyhow::Context;
use aws_config::meta::region::RegionProviderChain;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use config::FileFormat;
use serde::Deserialize;
use telemetry::TelemetrySettings;

#[derive(Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub store: StoreSettings,
    pub telemetry: TelemetrySettings,
}

#[derive(Deserialize, Clone)]
pub struct ApplicationSettings {
    pub application_port: u16,
    pub host_name: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct StoreSettings {
    pub backend: StoreBackend,
    /// DynamoDB table name, or the key prefix inside the bucket for S3.
    pub collection_name: String,
    pub bucket_name: Option<String>,
    /// Points the AWS clients at a local emulator.
    pub endpoint_url: Option<String>,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    DynamoDb,
    S3,
    Memory,
}

impl StoreSettings {
    pub async fn sdk_config(&self) -> SdkConfig {
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(make_region_provider());

        if let Some(endpoint_url) = &self.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        loader.load().await
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

    // E.g. `APP_STORE__BACKEND=s3` would set `Settings.store.backend`
    let settings = builder
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
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
