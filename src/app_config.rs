use std::{fmt, path::PathBuf};

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::error::CoffeeShopError;

pub const DEFAULT_CONFIG_PATH: &str = "Environment.toml";
pub const DEFAULT_PROFILE: &str = "development";
pub const ENV_PREFIX: &str = "COFFEE_SHOP_";

/// Why a single configured value was rejected. Surfaced through figment, which
/// adds the offending key path.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValueError {
    #[error("value must not be empty")]
    Empty,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("'{0}' is not an absolute URL with a scheme and host")]
    NotAbsolute(String),

    #[error("'{0}' is a tenant domain prefix and must not carry a scheme")]
    SchemeInTenant(String),

    #[error("'{0}' is not a valid tenant domain prefix")]
    InvalidTenant(String),
}

/// An absolute URL, kept exactly as configured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AbsoluteUrl {
    raw: String,
    url: Url,
}

impl AbsoluteUrl {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn url(&self) -> &Url {
        &self.url
    }
}

impl TryFrom<String> for AbsoluteUrl {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let raw = value.trim().to_string();
        if raw.is_empty() {
            return Err(ValueError::Empty);
        }

        let url = Url::parse(&raw)?;
        if url.cannot_be_a_base() || !url.has_host() {
            return Err(ValueError::NotAbsolute(raw));
        }

        Ok(Self { raw, url })
    }
}

impl From<AbsoluteUrl> for String {
    fn from(value: AbsoluteUrl) -> Self {
        value.raw
    }
}

impl fmt::Display for AbsoluteUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// An opaque identifier handed out by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct NonEmptyString(String);

impl NonEmptyString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for NonEmptyString {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() {
            Err(ValueError::Empty)
        } else {
            Ok(Self(value.to_string()))
        }
    }
}

impl From<NonEmptyString> for String {
    fn from(value: NonEmptyString) -> Self {
        value.0
    }
}

impl fmt::Display for NonEmptyString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The Auth0 tenant domain prefix, e.g. `auth-fsnd.eu` for `auth-fsnd.eu.auth0.com`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantPrefix(String);

impl TenantPrefix {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for TenantPrefix {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        let value = value.trim();
        if value.is_empty() {
            return Err(ValueError::Empty);
        }
        if value.contains("://") {
            return Err(ValueError::SchemeInTenant(value.to_string()));
        }
        // Host name only: no path, port or userinfo.
        let is_label = |label: &str| {
            !label.is_empty()
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        };
        if !value.split('.').all(is_label) {
            return Err(ValueError::InvalidTenant(value.to_string()));
        }

        Ok(Self(value.to_string()))
    }
}

impl From<TenantPrefix> for String {
    fn from(value: TenantPrefix) -> Self {
        value.0
    }
}

impl fmt::Display for TenantPrefix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Auth0Config {
    url: TenantPrefix,
    audience: NonEmptyString,
    client_id: NonEmptyString,
    callback_url: AbsoluteUrl,
}

impl Auth0Config {
    pub fn url(&self) -> &TenantPrefix {
        &self.url
    }

    pub fn audience(&self) -> &NonEmptyString {
        &self.audience
    }

    pub fn client_id(&self) -> &NonEmptyString {
        &self.client_id
    }

    pub fn callback_url(&self) -> &AbsoluteUrl {
        &self.callback_url
    }
}

/// The settings the front-end needs to reach its API and its Auth0 tenant.
///
/// Every key is required. Values are validated while extracting, so a
/// successfully built `EnvironmentConfig` is always complete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EnvironmentConfig {
    production: bool,
    api_server_url: AbsoluteUrl,
    auth0: Auth0Config,
}

/// Where to read the configuration from and which profile to select.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    pub path: PathBuf,
    pub profile: String,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_CONFIG_PATH),
            profile: DEFAULT_PROFILE.to_string(),
        }
    }
}

impl LoadOptions {
    /// Read `COFFEE_SHOP_CONFIG` and `COFFEE_SHOP_PROFILE`, falling back to the defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            path: std::env::var_os(format!("{ENV_PREFIX}CONFIG"))
                .map(PathBuf::from)
                .unwrap_or(defaults.path),
            profile: std::env::var(format!("{ENV_PREFIX}PROFILE")).unwrap_or(defaults.profile),
        }
    }
}

impl EnvironmentConfig {
    pub fn load(options: &LoadOptions) -> Result<Self, CoffeeShopError> {
        if !options.path.exists() {
            debug!(
                "{} does not exist, relying on environment variables",
                options.path.display()
            );
        }

        let figment = Figment::new()
            .merge(Toml::file(&options.path).nested())
            .merge(
                Env::prefixed(ENV_PREFIX)
                    .ignore(&["config", "profile", "access_token"])
                    .split("__")
                    .global(),
            )
            .select(options.profile.as_str());

        let config = Self::from_figment(&figment)?;
        info!(
            profile = %options.profile,
            production = config.production,
            api_server_url = %config.api_server_url,
            "Loaded environment"
        );

        Ok(config)
    }

    pub(crate) fn from_figment(figment: &Figment) -> Result<Self, CoffeeShopError> {
        let config: Self = figment.extract()?;
        config.check_production_urls()?;
        Ok(config)
    }

    fn check_production_urls(&self) -> Result<(), CoffeeShopError> {
        if !self.production {
            return Ok(());
        }

        let urls = [
            ("api_server_url", &self.api_server_url),
            ("auth0.callback_url", &self.auth0.callback_url),
        ];
        for (key, url) in urls {
            if url.url().scheme() != "https" {
                warn!("Refusing {key} = {url} in a production environment");
                return Err(CoffeeShopError::InsecureUrl {
                    key,
                    url: url.to_string(),
                });
            }
        }

        Ok(())
    }

    pub fn production(&self) -> bool {
        self.production
    }

    pub fn api_server_url(&self) -> &AbsoluteUrl {
        &self.api_server_url
    }

    pub fn auth0(&self) -> &Auth0Config {
        &self.auth0
    }
}
