use serde::Deserialize;

use crate::error::ConfigError;

/// Tunables for the detector, Chronos and Replob's availability window.
///
/// Loaded in layers, lowest to highest precedence: built-in defaults, an
/// optional `replob.toml` in the working directory, then `REPLOB_*`
/// environment variables — the same precedence order `ConfigLoader` uses,
/// just without the CLI/user-config layers this workspace has no use for.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub pulse_interval_ms: u64,
    pub detector_threshold_ms: u64,
    pub availability_window_ms: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            pulse_interval_ms: 500,
            detector_threshold_ms: 1500,
            availability_window_ms: 50,
        }
    }
}

impl RuntimeSettings {
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with_file(config::File::with_name("replob").required(false))
    }

    fn load_with_file(file_source: config::File<config::FileSourceFile, config::FileFormat>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let settings = config::Config::builder()
            .set_default("pulse_interval_ms", defaults.pulse_interval_ms)?
            .set_default("detector_threshold_ms", defaults.detector_threshold_ms)?
            .set_default("availability_window_ms", defaults.availability_window_ms)?
            .add_source(file_source)
            .add_source(config::Environment::with_prefix("REPLOB"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_detector_s_documented_cadence() {
        let settings = RuntimeSettings::default();
        assert_eq!(settings.pulse_interval_ms, 500);
        assert_eq!(settings.detector_threshold_ms, 1500);
    }

    #[test]
    fn a_toml_file_overrides_the_default_pulse_interval() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "pulse_interval_ms = 250").unwrap();
        let source = config::File::from(file.path().to_path_buf()).required(true);
        let settings = RuntimeSettings::load_with_file(source).unwrap();
        assert_eq!(settings.pulse_interval_ms, 250);
        assert_eq!(settings.detector_threshold_ms, 1500, "unset keys keep their default");
    }
}
