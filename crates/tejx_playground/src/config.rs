use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("unable to read config '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

/// Playground settings. Every key is optional in the TOML file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PlaygroundConfig {
    /// Compiled compiler artifact.
    pub compiler_path: PathBuf,
    /// File name handed to the compiler alongside the source.
    pub file_name: String,
    pub async_enabled: bool,
    pub entry_point: String,
    /// Size of the fresh linear memory given to each run, in 64 KiB pages.
    pub initial_memory_pages: u32,
    /// Whether compiler output in text form may be assembled.
    pub assembler: bool,
}

impl Default for PlaygroundConfig {
    fn default() -> Self {
        Self {
            compiler_path: PathBuf::from("tejxc_wasm.wasm"),
            file_name: "playground.tx".to_string(),
            async_enabled: true,
            entry_point: "main".to_string(),
            initial_memory_pages: 256,
            assembler: true,
        }
    }
}

impl PlaygroundConfig {
    pub fn from_toml(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn run_options(&self) -> tejx_runtime::RunOptions {
        tejx_runtime::RunOptions {
            entry_point: self.entry_point.clone(),
            initial_memory_pages: self.initial_memory_pages,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_file_gives_defaults() {
        let config = PlaygroundConfig::from_toml("").unwrap();
        assert_eq!(config, PlaygroundConfig::default());
        assert_eq!(config.file_name, "playground.tx");
        assert_eq!(config.initial_memory_pages, 256);
    }

    #[test]
    fn partial_file_overrides_named_keys() {
        let config = PlaygroundConfig::from_toml(
            "entry_point = \"start\"\ninitial_memory_pages = 4\nassembler = false\n",
        )
        .unwrap();
        assert_eq!(config.entry_point, "start");
        assert_eq!(config.initial_memory_pages, 4);
        assert!(!config.assembler);
        assert!(config.async_enabled);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(PlaygroundConfig::from_toml("colour = \"red\"").is_err());
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "compiler_path = \"bin/tejxc.wasm\"").unwrap();
        let config = PlaygroundConfig::load(file.path()).unwrap();
        assert_eq!(config.compiler_path, PathBuf::from("bin/tejxc.wasm"));
    }

    #[test]
    fn load_reports_missing_and_malformed_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            PlaygroundConfig::load(&missing),
            Err(ConfigError::Read { .. })
        ));
        let bad = dir.path().join("bad.toml");
        std::fs::write(&bad, "initial_memory_pages = \"lots\"").unwrap();
        let err = PlaygroundConfig::load(&bad).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }
}
