use chrono::{DateTime, Utc};
use reqwest::Url;
use tracing::{debug, info, warn};

use crate::{
    app_config::Auth0Config,
    error::CoffeeShopError,
    utils::{decode_claims, join_url, Claims},
};

const AUTH0_SUFFIX: &str = ".auth0.com";

/// The full tenant domain, e.g. `auth-fsnd.eu.auth0.com`
pub fn tenant_domain(auth0: &Auth0Config) -> String {
    let prefix = auth0.url().as_str();
    if prefix.ends_with(AUTH0_SUFFIX) {
        prefix.to_string()
    } else {
        format!("{prefix}{AUTH0_SUFFIX}")
    }
}

fn redirect_uri(auth0: &Auth0Config, callback_path: &str) -> String {
    let callback = auth0.callback_url().as_str();
    if callback_path.is_empty() {
        callback.to_string()
    } else {
        join_url(callback, callback_path)
    }
}

/// Build the implicit-flow authorize link the browser is sent to for login.
///
/// `callback_path` is appended to the configured callback URL; pass `""` to
/// have Auth0 redirect to exactly the configured URL.
pub fn build_login_link(auth0: &Auth0Config, callback_path: &str) -> Result<Url, CoffeeShopError> {
    let redirect_uri = redirect_uri(auth0, callback_path);
    let link = Url::parse_with_params(
        &format!("https://{}/authorize", tenant_domain(auth0)),
        &[
            ("audience", auth0.audience().as_str()),
            ("response_type", "token"),
            ("client_id", auth0.client_id().as_str()),
            ("redirect_uri", redirect_uri.as_str()),
        ],
    )?;

    debug!("Built login link {link}");
    Ok(link)
}

pub fn build_logout_link(auth0: &Auth0Config) -> Result<Url, CoffeeShopError> {
    let link = Url::parse_with_params(
        &format!("https://{}/v2/logout", tenant_domain(auth0)),
        &[
            ("client_id", auth0.client_id().as_str()),
            ("returnTo", auth0.callback_url().as_str()),
        ],
    )?;

    Ok(link)
}

/// Check that `redirect` came back to the configured callback and pull the
/// access token out of its fragment.
///
/// Returns `Ok(None)` if the redirect carries no token, e.g. a plain page load.
pub fn check_token_fragment(
    auth0: &Auth0Config,
    redirect: &str,
) -> Result<Option<String>, CoffeeShopError> {
    let received = Url::parse(redirect)?;
    let expected = auth0.callback_url().url();

    let same_origin = received.scheme() == expected.scheme()
        && received.host_str() == expected.host_str()
        && received.port_or_known_default() == expected.port_or_known_default();
    let expected_path = expected.path().trim_end_matches('/');
    let path = received.path();
    let under_callback = expected_path.is_empty()
        || path == expected_path
        || path.starts_with(&format!("{expected_path}/"));

    if !same_origin || !under_callback {
        warn!("Rejecting redirect to {received}");
        return Err(CoffeeShopError::RedirectMismatch {
            expected: auth0.callback_url().to_string(),
            received: redirect.to_string(),
        });
    }

    let Some(fragment) = received.fragment() else {
        return Ok(None);
    };

    let mut access_token = None;
    for (key, value) in url::form_urlencoded::parse(fragment.as_bytes()) {
        match key.as_ref() {
            "access_token" => access_token = Some(value.into_owned()),
            "error" => {
                return Err(CoffeeShopError::AuthorizationDenied(value.into_owned()));
            }
            _ => {}
        }
    }

    Ok(access_token.filter(|token| !token.is_empty()))
}

/// A logged-in user: the raw access token plus its decoded claims.
#[derive(Debug, Clone)]
pub struct Session {
    access_token: String,
    claims: Claims,
}

impl Session {
    pub fn from_token(access_token: String, auth0: &Auth0Config) -> Result<Self, CoffeeShopError> {
        Self::from_token_at(access_token, auth0, Utc::now())
    }

    pub fn from_token_at(
        access_token: String,
        auth0: &Auth0Config,
        now: DateTime<Utc>,
    ) -> Result<Self, CoffeeShopError> {
        let claims = decode_claims(&access_token)?;

        let audience = auth0.audience().as_str();
        if !claims.aud.as_ref().is_some_and(|aud| aud.contains(audience)) {
            return Err(CoffeeShopError::AudienceMismatch(audience.to_string()));
        }

        if claims.expires_at()? <= now {
            return Err(CoffeeShopError::TokenExpired);
        }

        info!(
            sub = claims.sub.as_deref().unwrap_or("unknown"),
            permissions = claims.permissions.len(),
            "Session established"
        );

        Ok(Self {
            access_token,
            claims,
        })
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    pub fn claims(&self) -> &Claims {
        &self.claims
    }

    /// Whether the token grants `permission`, e.g. `post:drinks`
    pub fn can(&self, permission: &str) -> bool {
        self.claims.permissions.iter().any(|p| p == permission)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        app_config::EnvironmentConfig,
        test::{make_jwt, sample_config, ENVIRONMENT_TOML},
    };
    use figment::{
        providers::{Format, Toml},
        Figment,
    };
    use serde_json::json;
    use std::collections::HashMap;

    const YEAR_2100: i64 = 4_102_444_800;

    fn query(link: &Url) -> HashMap<String, String> {
        link.query_pairs().into_owned().collect()
    }

    #[test]
    fn test_tenant_domain() {
        let config = sample_config();
        assert_eq!(tenant_domain(config.auth0()), "auth-fsnd.eu.auth0.com");
    }

    #[test]
    fn test_login_link_redirects_to_exact_callback() {
        let config = sample_config();
        let link = build_login_link(config.auth0(), "").unwrap();
        let params = query(&link);

        assert_eq!(link.scheme(), "https");
        assert_eq!(link.host_str(), Some("auth-fsnd.eu.auth0.com"));
        assert_eq!(link.path(), "/authorize");
        assert_eq!(params["redirect_uri"], "http://127.0.0.1:4200");
        assert_eq!(params["audience"], "drinks");
        assert_eq!(params["response_type"], "token");
        assert_eq!(params["client_id"], "oM6pOy1AlS9MCMjd9dYKJU2JNLHlptCh");
    }

    #[test]
    fn test_login_link_with_callback_path() {
        let config = sample_config();
        let link = build_login_link(config.auth0(), "/tabs/user-page").unwrap();

        assert_eq!(
            query(&link)["redirect_uri"],
            "http://127.0.0.1:4200/tabs/user-page"
        );
    }

    #[test]
    fn test_logout_link() {
        let config = sample_config();
        let link = build_logout_link(config.auth0()).unwrap();
        let params = query(&link);

        assert_eq!(link.path(), "/v2/logout");
        assert_eq!(params["returnTo"], "http://127.0.0.1:4200");
        assert_eq!(params["client_id"], "oM6pOy1AlS9MCMjd9dYKJU2JNLHlptCh");
    }

    #[test]
    fn test_check_token_fragment() {
        let config = sample_config();
        let token = check_token_fragment(
            config.auth0(),
            "http://127.0.0.1:4200/tabs/user-page#access_token=abc.def.ghi&expires_in=7200&token_type=Bearer",
        )
        .unwrap();

        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn test_check_token_fragment_without_token() {
        let config = sample_config();
        assert_eq!(
            check_token_fragment(config.auth0(), "http://127.0.0.1:4200/").unwrap(),
            None
        );
        assert_eq!(
            check_token_fragment(config.auth0(), "http://127.0.0.1:4200/#state=xyz").unwrap(),
            None
        );
    }

    #[test]
    fn test_check_token_fragment_rejects_foreign_redirect() {
        let config = sample_config();
        for redirect in [
            "http://127.0.0.1:4201/#access_token=abc",
            "https://127.0.0.1:4200/#access_token=abc",
            "http://evil.example:4200/#access_token=abc",
        ] {
            assert!(matches!(
                check_token_fragment(config.auth0(), redirect),
                Err(CoffeeShopError::RedirectMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_check_token_fragment_matches_whole_path_segments() {
        let toml = ENVIRONMENT_TOML.replace(
            "callback_url = \"http://127.0.0.1:4200\"",
            "callback_url = \"http://127.0.0.1:4200/app\"",
        );
        let figment = Figment::from(Toml::string(&toml).nested()).select("development");
        let config = EnvironmentConfig::from_figment(&figment).unwrap();

        for redirect in [
            "http://127.0.0.1:4200/app#access_token=abc",
            "http://127.0.0.1:4200/app/#access_token=abc",
            "http://127.0.0.1:4200/app/tabs/user-page#access_token=abc",
        ] {
            assert_eq!(
                check_token_fragment(config.auth0(), redirect).unwrap().as_deref(),
                Some("abc")
            );
        }
        for redirect in [
            "http://127.0.0.1:4200/application-evil#access_token=abc",
            "http://127.0.0.1:4200/ap#access_token=abc",
            "http://127.0.0.1:4200/#access_token=abc",
        ] {
            assert!(matches!(
                check_token_fragment(config.auth0(), redirect),
                Err(CoffeeShopError::RedirectMismatch { .. })
            ));
        }
    }

    #[test]
    fn test_check_token_fragment_denied() {
        let config = sample_config();
        let err = check_token_fragment(
            config.auth0(),
            "http://127.0.0.1:4200/#error=access_denied&error_description=nope",
        )
        .unwrap_err();

        assert!(matches!(err, CoffeeShopError::AuthorizationDenied(e) if e == "access_denied"));
    }

    #[test]
    fn test_session_permissions() {
        let config = sample_config();
        let jwt = make_jwt(&json!({
            "exp": YEAR_2100,
            "aud": "drinks",
            "permissions": ["get:drinks-detail", "patch:drinks"],
        }));
        let session = Session::from_token(jwt.clone(), config.auth0()).unwrap();

        assert_eq!(session.access_token(), jwt);
        assert!(session.can("patch:drinks"));
        assert!(!session.can("delete:drinks"));
    }

    #[test]
    fn test_session_rejects_wrong_audience() {
        let config = sample_config();
        let jwt = make_jwt(&json!({ "exp": YEAR_2100, "aud": "castings" }));

        assert!(matches!(
            Session::from_token(jwt, config.auth0()),
            Err(CoffeeShopError::AudienceMismatch(aud)) if aud == "drinks"
        ));
    }

    #[test]
    fn test_session_rejects_expired_token() {
        let config = sample_config();
        let jwt = make_jwt(&json!({ "exp": 1_000, "aud": ["drinks"] }));
        let now = DateTime::from_timestamp(2_000, 0).unwrap();

        assert!(matches!(
            Session::from_token_at(jwt, config.auth0(), now),
            Err(CoffeeShopError::TokenExpired)
        ));
    }
}
