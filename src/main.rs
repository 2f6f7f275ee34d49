mod app_config;
mod auth;
mod client;
mod common;
mod error;
mod utils;


use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::{error, info, span, warn, Level};
use tracing_subscriber::EnvFilter;

use crate::{
    app_config::{EnvironmentConfig, LoadOptions},
    auth::{build_login_link, build_logout_link, check_token_fragment, Session},
    client::{Drink, DrinkPatch, DrinksClient, Ingredient, NewDrink},
    error::CoffeeShopError,
};

#[derive(Parser)]
#[command(about = "Inspect and use the coffee shop front-end environment")]
struct Cli {
    /// Environment file with one table per profile [env: COFFEE_SHOP_CONFIG]
    #[arg(long)]
    config: Option<PathBuf>,

    /// Profile to select, e.g. development or production [env: COFFEE_SHOP_PROFILE]
    #[arg(long)]
    profile: Option<String>,

    /// Access token for endpoints that need a permission
    #[arg(long, env = "COFFEE_SHOP_ACCESS_TOKEN", global = true)]
    token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the loaded environment as TOML
    Show,

    /// Print the Auth0 login link
    LoginLink {
        /// Path appended to the callback URL
        #[arg(long, default_value = "")]
        path: String,
    },

    /// Print the Auth0 logout link
    LogoutLink,

    /// Validate a redirect received at the callback URL and decode its token
    CheckCallback { url: String },

    /// List drinks from the API server
    Drinks {
        /// Fetch full recipes (needs get:drinks-detail)
        #[arg(long)]
        detail: bool,
    },

    /// Create a drink (needs post:drinks)
    AddDrink {
        title: String,

        /// Recipe line as name:color:parts, repeatable
        #[arg(long = "ingredient", value_parser = parse_ingredient, required = true)]
        ingredients: Vec<Ingredient>,
    },

    /// Change a drink's title (needs patch:drinks)
    RenameDrink { id: i64, title: String },

    /// Delete a drink (needs delete:drinks)
    DeleteDrink { id: i64 },
}

fn parse_ingredient(value: &str) -> Result<Ingredient, String> {
    let mut parts = value.splitn(3, ':');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(name), Some(color), Some(count)) if !name.is_empty() && !color.is_empty() => {
            Ok(Ingredient {
                name: Some(name.to_string()),
                color: color.to_string(),
                parts: count
                    .parse()
                    .map_err(|e| format!("invalid part count '{count}': {e}"))?,
            })
        }
        _ => Err(format!("expected name:color:parts, got '{value}'")),
    }
}

fn print_drinks(drinks: &[Drink]) {
    for drink in drinks {
        let recipe = drink
            .recipe
            .iter()
            .map(|i| format!("{} x{}", i.name.as_deref().unwrap_or(&i.color), i.parts))
            .collect::<Vec<_>>()
            .join(", ");
        println!("{:>4}  {:<24} {}", drink.id, drink.title, recipe);
    }
}

/// Build a client, logged in when a token was given.
fn drinks_client(
    env: &EnvironmentConfig,
    token: Option<String>,
    permission: Option<&str>,
) -> Result<DrinksClient, CoffeeShopError> {
    let client = DrinksClient::new(env)?;
    if let Some(token) = token {
        let session = Session::from_token(token, env.auth0())?;
        if let Some(permission) = permission.filter(|p| !session.can(p)) {
            warn!("Token does not grant {permission}, the API will likely refuse");
        }
        client.set_session(&session);
    }
    Ok(client)
}

fn run(cli: Cli) -> Result<(), CoffeeShopError> {
    let mut options = LoadOptions::from_env();
    if let Some(path) = cli.config {
        options.path = path;
    }
    if let Some(profile) = cli.profile {
        options.profile = profile;
    }

    let span = span!(Level::INFO, "Environment", profile = options.profile);
    let _enter = span.enter();

    let env = common::install(EnvironmentConfig::load(&options)?)?;

    match cli.command {
        Command::Show => print!("{}", toml::to_string_pretty(env)?),
        Command::LoginLink { path } => println!("{}", build_login_link(env.auth0(), &path)?),
        Command::LogoutLink => println!("{}", build_logout_link(env.auth0())?),
        Command::CheckCallback { url } => match check_token_fragment(env.auth0(), &url)? {
            Some(token) => {
                let session = Session::from_token(token, env.auth0())?;
                let claims = session.claims();
                println!("issuer:      {}", claims.iss.as_deref().unwrap_or("-"));
                println!("subject:     {}", claims.sub.as_deref().unwrap_or("-"));
                println!("expires at:  {}", claims.expires_at()?);
                println!("permissions: {}", claims.permissions.join(", "));
            }
            None => info!("Redirect matches the callback but carries no access token"),
        },
        Command::Drinks { detail } => {
            let permission = detail.then_some("get:drinks-detail");
            let client = drinks_client(env, cli.token, permission)?;
            let drinks = if detail {
                client.get_drinks_detail()?
            } else {
                client.get_drinks()?
            };
            print_drinks(&drinks);
        }
        Command::AddDrink { title, ingredients } => {
            let client = drinks_client(env, cli.token, Some("post:drinks"))?;
            let created = client.create_drink(&NewDrink {
                title: &title,
                recipe: &ingredients,
            })?;
            print_drinks(&created);
        }
        Command::RenameDrink { id, title } => {
            let client = drinks_client(env, cli.token, Some("patch:drinks"))?;
            let updated = client.update_drink(
                id,
                &DrinkPatch {
                    title: Some(&title),
                    ..Default::default()
                },
            )?;
            print_drinks(&updated);
        }
        Command::DeleteDrink { id } => {
            let client = drinks_client(env, cli.token, Some("delete:drinks"))?;
            println!("deleted {}", client.delete_drink(id)?);
        }
    }

    Ok(())
}

fn main() -> Result<(), CoffeeShopError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli) {
        error!("{err}");
        return Err(err);
    }

    Ok(())
}
