use super::models::{DrinkPatch, ErrorResponse, NewDrink};

use crate::error::CoffeeShopError;
use reqwest::{
    blocking::{Client, RequestBuilder, Response},
    StatusCode,
};
use serde::de::DeserializeOwned;

pub fn get_drinks(http_client: &Client, url: &str) -> RequestBuilder {
    http_client.get(url)
}

pub fn get_drinks_detail(http_client: &Client, url: &str, access_token: &str) -> RequestBuilder {
    http_client.get(url).bearer_auth(access_token)
}

pub fn post_drink(
    http_client: &Client,
    url: &str,
    access_token: &str,
    body: &NewDrink,
) -> RequestBuilder {
    http_client
        .post(url)
        .bearer_auth(access_token)
        .json(body)
}

pub fn patch_drink(
    http_client: &Client,
    url: &str,
    access_token: &str,
    body: &DrinkPatch,
) -> RequestBuilder {
    http_client
        .patch(url)
        .bearer_auth(access_token)
        .json(body)
}

pub fn delete_drink(http_client: &Client, url: &str, access_token: &str) -> RequestBuilder {
    http_client.delete(url).bearer_auth(access_token)
}

fn api_error(status: StatusCode, error: &ErrorResponse) -> CoffeeShopError {
    CoffeeShopError::Api {
        status: StatusCode::from_u16(error.error).unwrap_or(status),
        message: error.describe(),
    }
}

/// Deserialize a successful response, or turn the API's error envelope into
/// [`CoffeeShopError::Api`].
///
/// The API answers some auth failures with HTTP 200 and `"success": false`,
/// so the envelope is checked whatever the status.
pub fn read_response<T: DeserializeOwned>(response: Response) -> Result<T, CoffeeShopError> {
    let status = response.status();
    let body = response.text()?;
    let envelope = serde_json::from_str::<ErrorResponse>(&body).ok();

    if status.is_success() {
        return match envelope {
            Some(error) if error.success == Some(false) => Err(api_error(status, &error)),
            _ => Ok(serde_json::from_str(&body)?),
        };
    }

    let error = match envelope {
        Some(error) => api_error(status, &error),
        None => CoffeeShopError::Api {
            status,
            message: status.canonical_reason().map_or(body, str::to_string),
        },
    };

    Err(error)
}
