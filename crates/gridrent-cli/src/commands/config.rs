use crate::{
    config::{mask_secret, Config, ConfigError, KEYS},
    display::{print_info, print_success},
    CliError, ConfigCommands, Result,
};

/// Handle `gridrent config <action>`
pub fn handle(action: ConfigCommands, config: &mut Config) -> Result<()> {
    match action {
        ConfigCommands::Show => {
            let rendered = config.show_config();
            if rendered.trim().is_empty() {
                print_info(&format!(
                    "No configuration set. Config file: {}",
                    config.config_path.display()
                ));
            } else {
                println!("{}", rendered);
            }
        }
        ConfigCommands::Get { key } => match with_known_keys(config.get_value(&key))? {
            Some(value) if key == "api.token" => println!("{}", mask_secret(&value)),
            Some(value) => println!("{}", value),
            None => print_info(&format!("{} is not set", key)),
        },
        ConfigCommands::Set { key, value } => {
            with_known_keys(config.set_value(&key, &value))?;
            config.save()?;
            print_success(&format!("Set {}", key));
        }
        ConfigCommands::Unset { key } => {
            if with_known_keys(config.unset_value(&key))? {
                config.save()?;
                print_success(&format!("Removed {}", key));
            } else {
                print_info(&format!("{} was not set", key));
            }
        }
        ConfigCommands::Path => println!("{}", config.config_path.display()),
    }

    Ok(())
}

/// Append the list of valid keys to unknown-key errors
fn with_known_keys<T>(result: Result<T>) -> Result<T> {
    result.map_err(|e| match e {
        CliError::Config(ConfigError::UnknownKey(key)) => CliError::InvalidInput(format!(
            "Unknown configuration key '{}'. Valid keys: {}",
            key,
            KEYS.join(", ")
        )),
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_set_persists_and_unset_removes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::load_from(&path).unwrap();

        handle(
            ConfigCommands::Set {
                key: "provider.wallet".to_string(),
                value: "0x1234567890abcdef".to_string(),
            },
            &mut config,
        )
        .unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.wallet().as_deref(), Some("0x1234567890abcdef"));

        handle(
            ConfigCommands::Unset {
                key: "provider.wallet".to_string(),
            },
            &mut config,
        )
        .unwrap();
        assert!(Config::load_from(&path).unwrap().wallet().is_none());
    }

    #[test]
    fn test_unknown_key_lists_valid_keys() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load_from(dir.path().join("config.toml")).unwrap();

        let err = handle(
            ConfigCommands::Get {
                key: "api.secret".to_string(),
            },
            &mut config,
        )
        .unwrap_err();

        match err {
            CliError::InvalidInput(message) => assert!(message.contains("api.base_url")),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_invalid_value_is_not_saved() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let mut config = Config::load_from(&path).unwrap();

        assert!(handle(
            ConfigCommands::Set {
                key: "api.timeout_secs".to_string(),
                value: "soon".to_string(),
            },
            &mut config,
        )
        .is_err());
        assert!(!path.exists());
    }
}
