use serde::{Deserialize, Serialize};

/// One line of a recipe. The public menu omits `name`; the detail view includes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ingredient {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub color: String,
    pub parts: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Drink {
    pub id: i64,
    pub title: String,
    pub recipe: Vec<Ingredient>,
}

#[derive(Debug, Serialize)]
pub struct NewDrink<'a> {
    pub title: &'a str,
    pub recipe: &'a [Ingredient],
}

#[derive(Debug, Default, Serialize)]
pub struct DrinkPatch<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recipe: Option<&'a [Ingredient]>,
}

/// Listing endpoints return an array, create/update return the single drink.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> From<OneOrMany<T>> for Vec<T> {
    fn from(value: OneOrMany<T>) -> Self {
        match value {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DrinksResponse {
    pub drinks: OneOrMany<Drink>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteResponse {
    pub delete: i64,
}

#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    pub success: Option<bool>,
    pub error: u16,
    pub message: serde_json::Value,
}

impl ErrorResponse {
    /// The API sends either a plain message or an `{code, description}` object for auth failures.
    pub fn describe(&self) -> String {
        match &self.message {
            serde_json::Value::String(message) => message.clone(),
            serde_json::Value::Object(map) => map
                .get("description")
                .or_else(|| map.get("code"))
                .and_then(serde_json::Value::as_str)
                .map_or_else(|| self.message.to_string(), str::to_string),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_menu() {
        let body = json!({
            "success": true,
            "drinks": [
                { "id": 1, "title": "water", "recipe": [{ "color": "blue", "parts": 1 }] },
            ]
        });
        let response: DrinksResponse = serde_json::from_value(body).unwrap();
        let drinks: Vec<Drink> = response.drinks.into();

        assert_eq!(drinks.len(), 1);
        assert_eq!(drinks[0].recipe[0].name, None);
    }

    #[test]
    fn test_deserialize_single_drink() {
        let body = json!({
            "success": true,
            "drinks": {
                "id": 2,
                "title": "latte",
                "recipe": [
                    { "name": "milk", "color": "white", "parts": 3 },
                    { "name": "espresso", "color": "brown", "parts": 1 },
                ]
            }
        });
        let response: DrinksResponse = serde_json::from_value(body).unwrap();
        let drinks: Vec<Drink> = response.drinks.into();

        assert_eq!(drinks[0].title, "latte");
        assert_eq!(drinks[0].recipe[1].name.as_deref(), Some("espresso"));
    }

    #[test]
    fn test_serialize_patch_skips_missing_fields() {
        let patch = DrinkPatch {
            title: Some("mocha"),
            ..Default::default()
        };

        assert_eq!(serde_json::to_value(&patch).unwrap(), json!({ "title": "mocha" }));
    }

    #[test]
    fn test_describe_error() {
        let plain: ErrorResponse = serde_json::from_value(json!({
            "success": false, "error": 404, "message": "resource not found"
        }))
        .unwrap();
        let auth: ErrorResponse = serde_json::from_value(json!({
            "success": false,
            "error": 401,
            "message": { "code": "token_expired", "description": "Token expired." }
        }))
        .unwrap();

        assert_eq!(plain.describe(), "resource not found");
        assert_eq!(auth.describe(), "Token expired.");
    }
}
