use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

const DEFAULT_CONFIG: &str = include_str!("../config.toml");

#[derive(Deserialize, Default)]
struct ConfigFile {
    #[serde(default)]
    resources: ResourcesConfig,
    #[serde(default)]
    engine: EngineConfig,
}

#[derive(Deserialize, Default)]
struct ResourcesConfig {
    base_url: Option<String>,
    path_prefix: Option<String>,
    request_timeout_ms: Option<u64>,
    catalog: Option<PathBuf>,
}

#[derive(Deserialize, Default)]
struct EngineConfig {
    output_option: Option<String>,
    binary: Option<String>,
}

pub struct Config {
    resources: ResourcesConfig,
    engine: EngineConfig,
}

impl Config {
    /// Embedded defaults merged with the user's config file, if present.
    pub fn load() -> Self {
        let mut config = Self::embedded();
        if let Some(path) = user_config_path() {
            if path.exists() {
                match std::fs::read_to_string(&path) {
                    Ok(contents) => {
                        if let Err(e) = config.merge_str(&contents) {
                            log::warn!(
                                target: "config",
                                "ignoring malformed config {}: {}",
                                path.display(),
                                e
                            )
                        }
                    }
                    Err(e) => {
                        log::warn!(
                            target: "config",
                            "could not read config {}: {}",
                            path.display(),
                            e
                        )
                    }
                }
            }
        }
        config
    }

    pub fn embedded() -> Self {
        let base: ConfigFile =
            toml::from_str(DEFAULT_CONFIG).expect("Failed to parse embedded config.toml");
        Config {
            resources: base.resources,
            engine: base.engine,
        }
    }

    /// Overlay a TOML document on top of the current values. Keys missing
    /// from `contents` keep their current value.
    pub fn merge_str(&mut self, contents: &str) -> Result<(), toml::de::Error> {
        let user: ConfigFile = toml::from_str(contents)?;
        merge_resources(&mut self.resources, user.resources);
        merge_engine(&mut self.engine, user.engine);
        Ok(())
    }

    pub fn set_base_url(&mut self, url: impl Into<String>) {
        self.resources.base_url = Some(url.into());
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        self.resources
            .base_url
            .as_deref()
            .unwrap_or("http://localhost:8000")
            .trim_end_matches('/')
    }

    pub fn path_prefix(&self) -> &str {
        self.resources
            .path_prefix
            .as_deref()
            .unwrap_or("/resources/SourceMaterials")
    }

    /// Per-request timeout (clamped to 500ms..5min).
    pub fn request_timeout(&self) -> Duration {
        let ms = self
            .resources
            .request_timeout_ms
            .unwrap_or(10_000)
            .clamp(500, 300_000);
        Duration::from_millis(ms)
    }

    /// User-supplied catalog file replacing the embedded one.
    pub fn catalog_path(&self) -> Option<&std::path::Path> {
        self.resources.catalog.as_deref()
    }

    /// Engine option applied right after instantiation (default audio output).
    pub fn output_option(&self) -> &str {
        self.engine.output_option.as_deref().unwrap_or("-odac")
    }

    pub fn engine_binary(&self) -> &str {
        self.engine.binary.as_deref().unwrap_or("csound")
    }
}

pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("csdplay").join("config.toml"))
}

fn merge_resources(base: &mut ResourcesConfig, user: ResourcesConfig) {
    if user.base_url.is_some() {
        base.base_url = user.base_url;
    }
    if user.path_prefix.is_some() {
        base.path_prefix = user.path_prefix;
    }
    if user.request_timeout_ms.is_some() {
        base.request_timeout_ms = user.request_timeout_ms;
    }
    if user.catalog.is_some() {
        base.catalog = user.catalog;
    }
}

fn merge_engine(base: &mut EngineConfig, user: EngineConfig) {
    if user.output_option.is_some() {
        base.output_option = user.output_option;
    }
    if user.binary.is_some() {
        base.binary = user.binary;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedded_defaults() {
        let config = Config::embedded();
        assert_eq!(config.base_url(), "http://localhost:8000");
        assert_eq!(config.path_prefix(), "/resources/SourceMaterials");
        assert_eq!(config.output_option(), "-odac");
        assert_eq!(config.engine_binary(), "csound");
        assert_eq!(config.request_timeout(), Duration::from_secs(10));
        assert!(config.catalog_path().is_none());
    }

    #[test]
    fn user_values_override_only_given_keys() {
        let mut config = Config::embedded();
        config
            .merge_str(
                r#"
                [resources]
                base_url = "https://flossmanual.example/"

                [engine]
                binary = "/opt/csound/bin/csound"
                "#,
            )
            .unwrap();
        assert_eq!(config.base_url(), "https://flossmanual.example");
        assert_eq!(config.path_prefix(), "/resources/SourceMaterials");
        assert_eq!(config.engine_binary(), "/opt/csound/bin/csound");
        assert_eq!(config.output_option(), "-odac");
    }

    #[test]
    fn malformed_user_config_is_rejected_without_changes() {
        let mut config = Config::embedded();
        assert!(config.merge_str("[resources\nbase_url = 3").is_err());
        assert_eq!(config.base_url(), "http://localhost:8000");
    }

    #[test]
    fn timeout_is_clamped() {
        let mut config = Config::embedded();
        config.merge_str("[resources]\nrequest_timeout_ms = 1").unwrap();
        assert_eq!(config.request_timeout(), Duration::from_millis(500));
    }
}
