use once_cell::sync::OnceCell;

use crate::{app_config::EnvironmentConfig, error::CoffeeShopError};

/// The global, immutable environment. Set once at startup by [`install`].
static ENVIRONMENT: OnceCell<EnvironmentConfig> = OnceCell::new();

pub fn install(config: EnvironmentConfig) -> Result<&'static EnvironmentConfig, CoffeeShopError> {
    ENVIRONMENT
        .set(config)
        .map_err(|_| CoffeeShopError::AlreadyInstalled)?;
    environment()
}

pub fn environment() -> Result<&'static EnvironmentConfig, CoffeeShopError> {
    ENVIRONMENT.get().ok_or(CoffeeShopError::NotInstalled)
}
