use std::path::PathBuf;
use std::env;
use std::fs;
use std::io;
use serde::{Deserialize, Serialize};

use crate::types::{GameVersion, VargTrimming};

/// Switches that change what the compiler checks and emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    /// Match `name=` prefixes of script-call arguments against the callee.
    #[serde(default = "enabled")]
    pub check_argument_names: bool,
    /// Match script-call argument values against the callee's argument types.
    #[serde(default = "enabled")]
    pub check_argument_types: bool,
    /// Skip the jump out of an `if` branch whose last command is a `return`.
    #[serde(default)]
    pub validation_mode: bool,
    #[serde(default)]
    pub varg_trimming: VargTrimming,
}

fn enabled() -> bool {
    true
}

impl Default for Preferences {
    fn default() -> Self {
        Preferences {
            check_argument_names: true,
            check_argument_types: true,
            validation_mode: false,
            varg_trimming: VargTrimming::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub env_name: String,
    pub catalog: PathBuf,
    #[serde(default)]
    pub scripts: Option<PathBuf>,
    #[serde(default)]
    pub game_version: GameVersion,
    #[serde(default)]
    pub preferences: Preferences,
}

fn home_dir() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from(env::var("USERPROFILE").unwrap_or_else(|_| String::from(".")))
    } else {
        PathBuf::from(env::var("HOME").unwrap_or_else(|_| String::from(".")))
    }
}

fn env_name() -> String {
    env::var("MSCI_ENV").unwrap_or_else(|_| String::from("default"))
}

impl Default for Config {
    fn default() -> Self {
        let env_name = env_name();
        let install_dir = home_dir().join(".msci").join(&env_name);

        let catalog = match env::var("MSCI_CATALOG") {
            Ok(custom) => PathBuf::from(custom),
            Err(_) => install_dir.join("catalog.json"),
        };
        let scripts = env::var("MSCI_SCRIPTS").ok().map(PathBuf::from);

        Config {
            env_name,
            catalog,
            scripts,
            game_version: GameVersion::default(),
            preferences: Preferences::default(),
        }
    }
}

impl Config {
    /// Reads the config of the current environment, writing the defaults
    /// first if there is none yet.
    pub fn load() -> Self {
        let config_path = Self::get_config_path();
        if !config_path.exists() {
            let config = Config::default();
            if let Err(e) = config.save() {
                log::warn!("could not write {}: {}", config_path.display(), e);
            }
            return config;
        }

        let mut config: Config = match fs::read_to_string(&config_path) {
            Ok(contents) => serde_json::from_str(&contents).unwrap_or_else(|e| {
                log::warn!("ignoring malformed {}: {}", config_path.display(), e);
                Config::default()
            }),
            Err(e) => {
                log::warn!("could not read {}: {}", config_path.display(), e);
                Config::default()
            }
        };

        // Environment variables win over the stored file.
        if let Ok(custom) = env::var("MSCI_CATALOG") {
            config.catalog = PathBuf::from(custom);
        }
        if let Ok(custom) = env::var("MSCI_SCRIPTS") {
            config.scripts = Some(PathBuf::from(custom));
        }
        config
    }

    pub fn save(&self) -> io::Result<()> {
        let config_path = Self::get_config_path();
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let contents = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, contents)
    }

    pub fn get_config_path() -> PathBuf {
        home_dir().join(".msci").join(env_name()).join("config.json")
    }
}
