//! Pipeline configuration file.
//!
//! A TOML document in which every field is optional:
//!
//! ```toml
//! year = 2015
//! data_dir = "data/"
//! output_dir = "out/"
//! agencies = ["Metropolitan Police", "City of London"]
//! unmatched = "keep"
//!
//! [catalog]
//! classes = ["A", "B", "M", "C", "U"]
//! identity_excluded_classes = ["C", "U"]
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use traffic_link_linkage_models::UnmatchedPolicy;
use traffic_link_spatial::CatalogConfig;

/// Config file read when neither `--config` nor [`CONFIG_ENV`] is given.
pub const DEFAULT_CONFIG_FILE: &str = "traffic_link.toml";

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TRAFFIC_LINK_CONFIG";

/// Errors loading or writing the configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Io {
        /// Config file path.
        path: String,
        /// The underlying error.
        source: std::io::Error,
    },

    /// The config file is not valid TOML for [`PipelineConfig`].
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        /// Config file path.
        path: String,
        /// The underlying error.
        source: toml::de::Error,
    },

    /// The configuration could not be rendered as TOML.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Everything one pipeline run needs to know.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Count year and casualty table suffix.
    pub year: i32,
    /// Directory holding the two source archives.
    pub data_dir: PathBuf,
    /// Directory the output CSV is written to.
    pub output_dir: PathBuf,
    /// Traffic counts archive, relative to `data_dir`.
    pub counts_archive: String,
    /// Road safety archive, relative to `data_dir`.
    pub casualties_archive: String,
    /// Police forces whose casualties are written out. Empty means all.
    pub agencies: Vec<String>,
    /// What to do with casualties no station group covers.
    pub unmatched: UnmatchedPolicy,
    /// Station grouping.
    pub catalog: CatalogConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            year: 2015,
            data_dir: PathBuf::from("data/"),
            output_dir: PathBuf::from("out/"),
            counts_archive: "gb-road-traffic-counts.zip".to_string(),
            casualties_archive: "road-accidents-safety-data.zip".to_string(),
            agencies: vec!["Metropolitan Police".to_string(), "City of London".to_string()],
            unmatched: UnmatchedPolicy::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Loads the configuration from `path`, else from the file named by
    /// [`CONFIG_ENV`], else from [`DEFAULT_CONFIG_FILE`].
    ///
    /// A missing default file yields the defaults. A file that was named
    /// explicitly must exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let explicit = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));

        let (path, required) = match explicit {
            Some(path) => (path, true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        if !required && !path.exists() {
            log::info!("No {} found, using default configuration", path.display());
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        let config = Self::from_toml(&text, &path.display().to_string())?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parses a TOML document; `origin` names it in errors.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is invalid.
    pub fn from_toml(text: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|e| ConfigError::Parse {
            path: origin.to_string(),
            source: e,
        })
    }

    /// Renders the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] if rendering fails.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string(self)?)
    }

    /// Whether casualties of `police_force` are written out.
    #[must_use]
    pub fn includes_agency(&self, police_force: &str) -> bool {
        self.agencies.is_empty() || self.agencies.iter().any(|a| a == police_force)
    }

    /// Output CSV path.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.output_dir.join("Casualties.csv")
    }
}

#[cfg(test)]
mod tests {
    use traffic_link_road_models::RoadClass;

    use super::*;

    #[test]
    fn empty_document_is_all_defaults() {
        let config = PipelineConfig::from_toml("", "test").unwrap();
        assert_eq!(config, PipelineConfig::default());
        assert_eq!(config.year, 2015);
        assert_eq!(config.catalog.identity_excluded, [RoadClass::C, RoadClass::Unclassified]);
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = PipelineConfig::from_toml(
            r#"
year = 2014
agencies = []
unmatched = "drop"

[catalog]
classes = ["A", "M"]
"#,
            "test",
        )
        .unwrap();

        assert_eq!(config.year, 2014);
        assert!(config.agencies.is_empty());
        assert_eq!(config.unmatched, UnmatchedPolicy::Drop);
        assert_eq!(config.catalog.classes, [RoadClass::A, RoadClass::Motorway]);
        assert_eq!(config.catalog.identity_excluded.len(), 2);
        assert_eq!(config.counts_archive, "gb-road-traffic-counts.zip");
    }

    #[test]
    fn invalid_document_is_a_parse_error() {
        let err = PipelineConfig::from_toml("year = \"soon\"", "bad.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == "bad.toml"));

        let err = PipelineConfig::from_toml("unmatched = \"maybe\"", "bad.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn rendered_config_parses_back() {
        let config = PipelineConfig {
            year: 2013,
            unmatched: UnmatchedPolicy::Drop,
            ..PipelineConfig::default()
        };

        let text = config.to_toml().unwrap();
        assert!(text.contains("year = 2013"));
        assert_eq!(PipelineConfig::from_toml(&text, "rendered").unwrap(), config);
    }

    #[test]
    fn agency_filter() {
        let mut config = PipelineConfig::default();
        assert!(config.includes_agency("City of London"));
        assert!(!config.includes_agency("Kent"));

        config.agencies.clear();
        assert!(config.includes_agency("Kent"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let path = std::env::temp_dir().join("traffic_link_no_such_config.toml");
        let _ = std::fs::remove_file(&path);
        let err = PipelineConfig::load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    fn loads_explicit_file() {
        let path = std::env::temp_dir().join("traffic_link_config_test.toml");
        std::fs::write(&path, "year = 2012\n").unwrap();

        let config = PipelineConfig::load(Some(&path)).unwrap();
        assert_eq!(config.year, 2012);

        let _ = std::fs::remove_file(&path);
    }
}
