//! Settings merged from a config file and the environment
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError};
use log::debug;

/// Config file used when none is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "config/fat12-reader.toml";

/// Prefix of environment variables that override the config file,
/// `FAT12_MAX_CHAIN_LENGTH` sets `max_chain_length`
pub const ENVIRONMENT_PREFIX: &str = "FAT12";

/// Reader settings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Settings {
    /// Longest cluster chain to follow before giving up on a file.
    /// `None` uses the number of data clusters in the image.
    pub max_chain_length: Option<u32>,
    /// Log at debug level
    pub debug: bool,
}

impl Settings {
    /// Load settings from `config_name` and the environment.
    /// A missing config file isn't an error.
    pub fn load(config_name: &str) -> Result<Settings, ConfigError> {
        let config = file_builder(config_name)
            .add_source(config::Environment::with_prefix(ENVIRONMENT_PREFIX))
            .build()?;

        Settings::from_config(&config)
    }

    /// Pull the known keys out of a built config
    pub fn from_config(config: &Config) -> Result<Settings, ConfigError> {
        let mut settings = Settings::default();

        match config.get_int("max_chain_length") {
            Ok(value) => {
                let value = u32::try_from(value).map_err(|_| {
                    ConfigError::Message(format!("max_chain_length {} is out of range", value))
                })?;
                settings.max_chain_length = Some(value);
            }
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        match config.get_bool("debug") {
            Ok(value) => settings.debug = value,
            Err(ConfigError::NotFound(_)) => {}
            Err(e) => return Err(e),
        }

        debug!("Loaded settings: {:?}", settings);
        Ok(settings)
    }
}

/// Config builder holding only the optional config file
fn file_builder(config_name: &str) -> ConfigBuilder<DefaultState> {
    Config::builder().add_source(config::File::with_name(config_name).required(false))
}

#[cfg(test)]
mod tests {
    use config::{Config, FileFormat};
    use pretty_assertions::assert_eq;

    use super::{file_builder, Settings};

    fn from_toml(text: &str) -> Result<Settings, config::ConfigError> {
        let config = Config::builder()
            .add_source(config::File::from_str(text, FileFormat::Toml))
            .build()?;
        Settings::from_config(&config)
    }

    #[test]
    fn keys_are_read() {
        let settings = from_toml("max_chain_length = 128\ndebug = true\n").unwrap();

        assert_eq!(
            settings,
            Settings {
                max_chain_length: Some(128),
                debug: true,
            }
        );
    }

    #[test]
    fn missing_keys_use_defaults() {
        assert_eq!(from_toml("").unwrap(), Settings::default());
    }

    #[test]
    fn negative_chain_length_is_rejected() {
        assert!(from_toml("max_chain_length = -1\n").is_err());
    }

    #[test]
    fn missing_config_file_is_not_an_error() {
        let config = file_builder("config/does-not-exist").build().unwrap();

        assert_eq!(Settings::from_config(&config).unwrap(), Settings::default());
        assert!(Settings::load("config/does-not-exist").is_ok());
    }
}
