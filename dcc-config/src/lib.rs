//! JSON configuration for the DCC command station: the set of locomotives
//! to register on startup, loaded from and saved back to disk in the same
//! shape a human might hand-edit.

mod error;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use dcc_core::Direction;
use dcc_station::Locomotive;

pub use error::ConfigError;

/// Default location the CLI looks for a config file when none is given.
pub const DEFAULT_CONFIG_PATH: &str = "~/.config/dcc-rs/config.json";

/// Top-level configuration document: just the locomotive roster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub locomotives: Vec<LocomotiveConfig>,
}

/// A single locomotive record as it appears on disk. Every field but
/// `name` and `address` defaults to its resting value, so a config file
/// only needs to spell out what differs from a freshly added locomotive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocomotiveConfig {
    pub name: String,
    pub address: u8,
    #[serde(default)]
    pub speed: u8,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default)]
    pub fl: bool,
    #[serde(default)]
    pub f1: bool,
    #[serde(default)]
    pub f2: bool,
    #[serde(default)]
    pub f3: bool,
    #[serde(default)]
    pub f4: bool,
}

impl LocomotiveConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.address == 0 || self.address == 0xFF {
            return Err(ConfigError::ReservedAddress {
                name: self.name.clone(),
                address: self.address,
            });
        }
        let max_speed = if dcc_core::timing::current().headlight_compat { 15 } else { 31 };
        if self.speed > max_speed {
            return Err(ConfigError::SpeedOutOfRange {
                name: self.name.clone(),
                speed: self.speed,
                max_speed,
            });
        }
        Ok(())
    }
}

impl From<&LocomotiveConfig> for Locomotive {
    fn from(cfg: &LocomotiveConfig) -> Self {
        Locomotive::new(
            cfg.name.clone(),
            cfg.address,
            cfg.speed,
            cfg.direction,
            cfg.fl,
            cfg.f1,
            cfg.f2,
            cfg.f3,
            cfg.f4,
        )
    }
}

impl From<&Locomotive> for LocomotiveConfig {
    fn from(loco: &Locomotive) -> Self {
        Self {
            name: loco.name().to_string(),
            address: loco.address(),
            speed: loco.speed(),
            direction: loco.direction(),
            fl: loco.fl(),
            f1: loco.f1(),
            f2: loco.f2(),
            f3: loco.f3(),
            f4: loco.f4(),
        }
    }
}

/// Reads and parses a configuration file, rejecting any locomotive record
/// with a reserved address or an out-of-range speed.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let raw = fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&raw)?;
    for loco in &config.locomotives {
        loco.validate()?;
    }
    log::info!(
        "loaded configuration for {} locomotive(s) from {}",
        config.locomotives.len(),
        path.display()
    );
    Ok(config)
}

/// Pretty-prints a configuration document and writes it to `path`,
/// overwriting whatever was there.
pub fn save_config(config: &Config, path: impl AsRef<Path>) -> Result<(), ConfigError> {
    let path = path.as_ref();
    let pretty = serde_json::to_string_pretty(config)?;
    fs::write(path, pretty)?;
    log::info!(
        "saved configuration for {} locomotive(s) to {}",
        config.locomotives.len(),
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Config {
        Config {
            locomotives: vec![LocomotiveConfig {
                name: "Thomas".into(),
                address: 3,
                speed: 10,
                direction: Direction::Forward,
                fl: true,
                f1: false,
                f2: false,
                f3: false,
                f4: false,
            }],
        }
    }

    #[test]
    fn round_trips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        save_config(&sample(), &path).unwrap();
        let loaded = load_config(&path).unwrap();

        assert_eq!(loaded.locomotives.len(), 1);
        assert_eq!(loaded.locomotives[0].name, "Thomas");
        assert_eq!(loaded.locomotives[0].address, 3);
    }

    #[test]
    fn defaults_fill_in_missing_fields() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"locomotives":[{"name":"Gordon","address":4}]}"#).unwrap();

        let loaded = load_config(&path).unwrap();
        let loco = &loaded.locomotives[0];
        assert_eq!(loco.speed, 0);
        assert_eq!(loco.direction, Direction::Backward);
        assert!(!loco.fl);
    }

    #[test]
    fn rejects_broadcast_address() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"locomotives":[{"name":"Gordon","address":0}]}"#).unwrap();

        assert!(matches!(
            load_config(&path),
            Err(ConfigError::ReservedAddress { .. })
        ));
    }

    #[test]
    fn rejects_speed_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"locomotives":[{"name":"Gordon","address":4,"speed":99}]}"#).unwrap();

        assert!(matches!(
            load_config(&path),
            Err(ConfigError::SpeedOutOfRange { .. })
        ));
    }

    #[test]
    fn missing_file_is_an_io_error() {
        assert!(matches!(load_config("/nonexistent/path.json"), Err(ConfigError::Io(_))));
    }
}
