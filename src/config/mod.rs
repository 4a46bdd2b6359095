//! Configuration loading.
//!
//! Settings are layered: built-in defaults, then an optional config file, then
//! `GATEWAY_`-prefixed environment variables (`__` separates nested keys, e.g.
//! `GATEWAY_BROKER__MAX_QUEUE_DEPTH`).

mod settings;

use config::{Config, ConfigError, Environment, File};

use settings::PartialSettings;

pub use settings::{BrokerSettings, LogSettings, NotifierSettings, ServerSettings, Settings};

pub const DEFAULT_CONFIG_PATH: &str = "config/default";

/// Loads the configuration from the default file location and the environment.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from(DEFAULT_CONFIG_PATH)
}

/// Loads the configuration from `path` (extension optional) and the
/// environment, merged over the defaults. A missing file is not an error.
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix("GATEWAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge_onto(Settings::default()))
}
