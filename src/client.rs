mod methods;
mod models;

pub use methods::*;
pub use models::*;

use crate::{
    app_config::EnvironmentConfig, auth::Session, error::CoffeeShopError, utils::join_url,
};
use parking_lot::RwLock;
use reqwest::blocking::{Client, RequestBuilder};
use tracing::{info, trace, warn};

/// Client for the drinks API named by `api_server_url`.
#[allow(clippy::module_name_repetitions)]
pub struct DrinksClient {
    client: Client,
    base_url: String,
    access_token: RwLock<Option<String>>,
}

impl DrinksClient {
    /// Production builds refuse plain HTTP at the transport level too.
    pub fn new(config: &EnvironmentConfig) -> Result<Self, CoffeeShopError> {
        let client = Client::builder()
            .gzip(true)
            .https_only(config.production())
            .build()?;
        let base_url = config
            .api_server_url()
            .as_str()
            .trim_end_matches('/')
            .to_string();

        info!("Using API server at {base_url}");

        Ok(Self {
            client,
            base_url,
            access_token: RwLock::new(None),
        })
    }

    /// The full URL for `path` under the API base, with a single `/` between them.
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.base_url, path)
    }

    pub fn set_session(&self, session: &Session) {
        *self.access_token.write() = Some(session.access_token().to_string());
    }

    fn access_token(&self) -> Result<String, CoffeeShopError> {
        self.access_token
            .read()
            .clone()
            .ok_or(CoffeeShopError::MissingToken)
    }

    fn send<T: serde::de::DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, CoffeeShopError> {
        let response = request.send()?;
        trace!("{} {}", response.status(), response.url());

        match read_response(response) {
            Err(CoffeeShopError::Api { status, message }) => {
                warn!("API request failed with {status}: {message}");
                Err(CoffeeShopError::Api { status, message })
            }
            other => other,
        }
    }

    /// The public menu, short recipe form.
    pub fn get_drinks(&self) -> Result<Vec<Drink>, CoffeeShopError> {
        let response: DrinksResponse =
            self.send(get_drinks(&self.client, &self.endpoint("drinks")))?;
        Ok(response.drinks.into())
    }

    /// Full recipes. Needs `get:drinks-detail`.
    pub fn get_drinks_detail(&self) -> Result<Vec<Drink>, CoffeeShopError> {
        let access_token = self.access_token()?;
        let response: DrinksResponse = self.send(get_drinks_detail(
            &self.client,
            &self.endpoint("drinks-detail"),
            &access_token,
        ))?;
        Ok(response.drinks.into())
    }

    pub fn create_drink(&self, drink: &NewDrink) -> Result<Vec<Drink>, CoffeeShopError> {
        let access_token = self.access_token()?;
        let response: DrinksResponse = self.send(post_drink(
            &self.client,
            &self.endpoint("drinks"),
            &access_token,
            drink,
        ))?;
        Ok(response.drinks.into())
    }

    pub fn update_drink(&self, id: i64, patch: &DrinkPatch) -> Result<Vec<Drink>, CoffeeShopError> {
        let access_token = self.access_token()?;
        let response: DrinksResponse = self.send(patch_drink(
            &self.client,
            &self.endpoint(&format!("drinks/{id}")),
            &access_token,
            patch,
        ))?;
        Ok(response.drinks.into())
    }

    /// Returns the id the API reports as deleted.
    pub fn delete_drink(&self, id: i64) -> Result<i64, CoffeeShopError> {
        let access_token = self.access_token()?;
        let response: DeleteResponse = self.send(delete_drink(
            &self.client,
            &self.endpoint(&format!("drinks/{id}")),
            &access_token,
        ))?;
        Ok(response.delete)
    }
}
