//! Configuration sources and host settings.

mod host;
mod settings;

pub use host::{
    HostConfig, CONNECTION_STRINGS_SECTION, KEY_VAULT_NAME_KEY, MAX_BODY_SIZE_KEY,
    VALIDATE_ON_STARTUP_KEY,
};
pub use settings::{Settings, KEY_DELIMITER};
