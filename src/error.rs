use figment::Error as ConfigError;
use reqwest::StatusCode;
use thiserror::Error;

#[allow(clippy::module_name_repetitions)]
#[derive(Error, Debug)]
pub enum CoffeeShopError {
    #[error("Configuration Error: {source}")]
    ConfigError {
        #[from]
        source: ConfigError,
    },

    #[error("HTTP Error: {source:#?}")]
    HTTPError {
        #[from]
        source: reqwest::Error,
    },

    #[error("URL Error: {source}")]
    UrlError {
        #[from]
        source: url::ParseError,
    },

    #[error("Unable to deserialize JSON: {source:#?}")]
    SerdeJsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Unable to decode base64: {source}")]
    Base64Error {
        #[from]
        source: base64::DecodeError,
    },

    #[error("Unable to serialize TOML: {source}")]
    TomlError {
        #[from]
        source: toml::ser::Error,
    },

    #[error("API returned {status}: {message}")]
    Api { status: StatusCode, message: String },

    #[error("'{key}' must use https in production, got '{url}'")]
    InsecureUrl { key: &'static str, url: String },

    #[error("Redirect '{received}' does not match the configured callback '{expected}'")]
    RedirectMismatch { expected: String, received: String },

    #[error("Authorization denied by the identity provider: {0}")]
    AuthorizationDenied(String),

    #[error("No access token; log in first")]
    MissingToken,

    #[error("Invalid JWT: {0}")]
    InvalidJwt(String),

    #[error("Access token expired")]
    TokenExpired,

    #[error("Token audience does not include '{0}'")]
    AudienceMismatch(String),

    #[error("Environment was already installed")]
    AlreadyInstalled,

    #[error("Environment has not been installed")]
    NotInstalled,
}
