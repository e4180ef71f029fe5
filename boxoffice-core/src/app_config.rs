use boxoffice_shared::VenueLevel;
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    #[serde(default)]
    pub holds: HoldSettings,
    #[serde(default = "default_levels")]
    pub levels: Vec<VenueLevel>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct HoldSettings {
    #[serde(default = "default_ttl_seconds")]
    pub ttl_seconds: u64,
    #[serde(default = "default_sweep_interval_ms")]
    pub sweep_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            holds: HoldSettings::default(),
            levels: default_levels(),
        }
    }
}

/// Longest hold TTL accepted from configuration: one day.
pub const MAX_TTL_SECONDS: u64 = 86_400;

fn default_ttl_seconds() -> u64 { 120 }
fn default_sweep_interval_ms() -> u64 { 2_000 }

impl Default for HoldSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl_seconds(),
            sweep_interval_ms: default_sweep_interval_ms(),
        }
    }
}

impl HoldSettings {
    /// Hold lifetime, clamped to `MAX_TTL_SECONDS` for settings that skipped
    /// validation.
    pub fn ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.ttl_seconds.min(MAX_TTL_SECONDS) as i64)
    }

    pub fn sweep_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.sweep_interval_ms)
    }
}

/// Orchestra, Main and two balconies: 6250 seats in total.
pub fn default_levels() -> Vec<VenueLevel> {
    vec![
        VenueLevel::new(1, "Orchestra", 100.0, 25, 50),
        VenueLevel::new(2, "Main", 75.0, 20, 100),
        VenueLevel::new(3, "Balcony 1", 50.0, 15, 100),
        VenueLevel::new(4, "Balcony 2", 40.0, 15, 100),
    ]
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            // Built-in defaults cover a missing file
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // Eg.. `BOXOFFICE__HOLDS__TTL_SECONDS=30`
            .add_source(
                config::Environment::with_prefix("BOXOFFICE")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Config = s.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.levels.is_empty() {
            return Err(config::ConfigError::Message("at least one venue level is required".into()));
        }

        // Level ids must be dense from 1 so the "all levels" range is 1..=len
        for (index, level) in self.levels.iter().enumerate() {
            let expected = index as i32 + 1;
            if level.id != expected {
                return Err(config::ConfigError::Message(format!(
                    "venue level ids must be dense and ordered from 1: expected {}, found {}",
                    expected, level.id
                )));
            }
            if level.capacity() == 0 {
                return Err(config::ConfigError::Message(format!(
                    "venue level {} ({}) has no seats",
                    level.id, level.name
                )));
            }
        }

        if self.holds.ttl_seconds == 0 || self.holds.ttl_seconds > MAX_TTL_SECONDS {
            return Err(config::ConfigError::Message(format!(
                "holds.ttl_seconds must be between 1 and {}",
                MAX_TTL_SECONDS
            )));
        }
        if self.holds.sweep_interval_ms == 0 || self.holds.sweep_interval_ms >= self.holds.ttl_seconds * 1000 {
            return Err(config::ConfigError::Message(
                "holds.sweep_interval_ms must be positive and shorter than the hold TTL".into(),
            ));
        }

        Ok(())
    }
}
