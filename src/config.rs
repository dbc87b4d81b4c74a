use std::env;
use std::time::Duration;

use crate::error::FlowError;
use crate::flow::AttachPolicy;
use crate::share::customer_url;

#[derive(Debug, Clone)]
pub struct Config {
    pub environment: String,
    pub api_base_url: String,
    pub public_origin: String,
    pub attach_policy: AttachPolicy,
    /// `None` means calls wait indefinitely.
    pub request_timeout: Option<Duration>,
    pub default_expires_days: i64,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, FlowError> {
        dotenvy::dotenv().ok();

        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, FlowError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_base_url = lookup("INTAKE_API_BASE_URL")
            .unwrap_or_else(|| "http://localhost:7777".to_string())
            .trim_end_matches('/')
            .to_string();
        reqwest::Url::parse(&api_base_url).map_err(|e| {
            FlowError::Config(format!("INTAKE_API_BASE_URL {api_base_url:?} is invalid: {e}"))
        })?;

        let public_origin = lookup("INTAKE_PUBLIC_ORIGIN")
            .map(|origin| origin.trim_end_matches('/').to_string())
            .unwrap_or_else(|| api_base_url.clone());
        // The origin must be able to carry the customer link, not just parse.
        customer_url(&public_origin, "").map_err(|e| {
            FlowError::Config(format!("INTAKE_PUBLIC_ORIGIN {public_origin:?} is invalid: {e}"))
        })?;

        let attach_policy = match lookup("INTAKE_ATTACH_POLICY") {
            Some(raw) => raw.parse()?,
            None => AttachPolicy::default(),
        };

        let timeout_secs: u64 = parse_or(&lookup, "INTAKE_REQUEST_TIMEOUT_SECS", 0)?;
        let request_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        Ok(Self {
            environment: lookup("INTAKE_ENVIRONMENT")
                .unwrap_or_else(|| "development".to_string()),
            api_base_url,
            public_origin,
            attach_policy,
            request_timeout,
            default_expires_days: parse_or(&lookup, "INTAKE_DEFAULT_EXPIRES_DAYS", 7)?,
            otel_service_name: lookup("OTEL_SERVICE_NAME")
                .unwrap_or_else(|| "intake-desk".to_string()),
            otel_exporter_endpoint: lookup("OTEL_EXPORTER_OTLP_ENDPOINT")
                .filter(|endpoint| !endpoint.is_empty()),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, FlowError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| FlowError::Config(format!("{key} must be a number, got {raw:?}"))),
        None => Ok(default),
    }
}
