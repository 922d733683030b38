use crate::error::CoreError;
use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};

/// Environment variable prefix shared by every binary in the workspace.
pub const ENV_PREFIX: &str = "APP";

/// Locate a crate's `config` directory whether the process runs from the
/// workspace root or from inside the crate directory.
pub fn configuration_directory(crate_dir: &str) -> Result<PathBuf, CoreError> {
    let base_path = std::env::current_dir()?;

    let candidates = [
        base_path.join("config"),
        base_path.join(crate_dir).join("config"),
    ];

    let preferred = if base_path.ends_with(crate_dir) {
        &candidates[0]
    } else {
        &candidates[1]
    };

    if preferred.is_dir() {
        return Ok(preferred.clone());
    }

    candidates
        .iter()
        .find(|dir| dir.is_dir())
        .cloned()
        .ok_or_else(|| CoreError::ConfigDirectoryMissing(preferred.display().to_string()))
}

/// Load settings from `base.yaml`, an optional `local.yaml` override and
/// `APP_`-prefixed environment variables (`__` separates nested keys).
pub fn load_layered<T: DeserializeOwned>(configuration_directory: &Path) -> Result<T, CoreError> {
    dotenvy::dotenv().ok();

    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join("base.yaml")).required(true))
        .add_source(File::from(configuration_directory.join("local.yaml")).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize::<T>()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Write;

    #[derive(Debug, Deserialize)]
    struct Sample {
        name: String,
        #[serde(default)]
        port: u16,
    }

    #[test]
    fn test_load_layered_reads_base_and_local_override() {
        let dir = tempfile::tempdir().unwrap();

        let mut base = std::fs::File::create(dir.path().join("base.yaml")).unwrap();
        writeln!(base, "name: base\nport: 8080").unwrap();

        let mut local = std::fs::File::create(dir.path().join("local.yaml")).unwrap();
        writeln!(local, "port: 9090").unwrap();

        let sample: Sample = load_layered(dir.path()).unwrap();
        assert_eq!(sample.name, "base");
        assert_eq!(sample.port, 9090);
    }

    #[test]
    fn test_load_layered_requires_base_file() {
        let dir = tempfile::tempdir().unwrap();
        let result: Result<Sample, _> = load_layered(dir.path());
        assert!(matches!(result, Err(CoreError::ConfigError(_))));
    }
}
