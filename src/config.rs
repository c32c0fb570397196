use crate::constants;
use crate::error::{EtlError, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Connection parameters for the staging/core store
#[derive(Clone)]
pub struct DatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("database", &self.database)
            .field("host", &self.host)
            .field("port", &self.port)
            .finish()
    }
}

impl DatabaseConfig {
    /// Read connection parameters from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| EtlError::Config(format!("{key} environment variable not set")))
        };

        let host = lookup(constants::ENV_DB_HOST)
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| constants::DEFAULT_DB_HOST.to_string());

        let port = match lookup(constants::ENV_DB_PORT).filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| {
                EtlError::Config(format!(
                    "{} must be a port number, got '{}': {}",
                    constants::ENV_DB_PORT,
                    raw,
                    e
                ))
            })?,
            None => constants::DEFAULT_DB_PORT,
        };

        Ok(Self {
            user: required(constants::ENV_DB_USER)?,
            password: required(constants::ENV_DB_PASSWORD)?,
            database: required(constants::ENV_DB_NAME)?,
            host,
            port,
        })
    }
}

/// Locations of the two raw inputs
#[derive(Debug, Clone)]
pub struct SourcePaths {
    pub crime_records: PathBuf,
    pub district_document: PathBuf,
}

impl Default for SourcePaths {
    fn default() -> Self {
        Self {
            crime_records: PathBuf::from(constants::CRIME_RECORDS_PATH),
            district_document: PathBuf::from(constants::DISTRICT_DOCUMENT_PATH),
        }
    }
}

/// Fixed references to the page renderer and OCR executables
#[derive(Debug, Clone)]
pub struct OcrSettings {
    pub tesseract_cmd: PathBuf,
    pub pdftoppm_cmd: PathBuf,
    /// Page counter run before rendering; zero pages is a soft outcome
    pub pdfinfo_cmd: PathBuf,
    pub render_dpi: u32,
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            tesseract_cmd: PathBuf::from(constants::TESSERACT_CMD),
            pdftoppm_cmd: PathBuf::from(constants::PDFTOPPM_CMD),
            pdfinfo_cmd: PathBuf::from(constants::PDFINFO_CMD),
            render_dpi: constants::RENDER_DPI,
        }
    }
}

/// Cleaning tables used by the transform stages
#[derive(Debug, Clone, PartialEq)]
pub struct TransformRules {
    /// Exact, case-sensitive `crime_type` replacements applied before capitalization
    pub corrections: BTreeMap<String, String>,
    /// Literal tokens stripped from district names and governors
    pub placeholder_tokens: Vec<String>,
    pub miles_to_km: f64,
}

impl Default for TransformRules {
    fn default() -> Self {
        Self {
            corrections: constants::default_crime_corrections()
                .into_iter()
                .map(|(from, to)| (from.to_string(), to.to_string()))
                .collect(),
            placeholder_tokens: vec![constants::DISTRICT_PLACEHOLDER.to_string()],
            miles_to_km: constants::MILES_TO_KM,
        }
    }
}

/// Shape of the optional rules file
#[derive(Debug, Default, Deserialize)]
struct RulesFile {
    #[serde(default)]
    corrections: BTreeMap<String, String>,
    #[serde(default)]
    placeholder_tokens: Vec<String>,
}

impl TransformRules {
    /// Merge entries from a TOML document into these rules.
    /// Same-key corrections override, new keys and tokens are added.
    pub fn extend_from_toml(&mut self, content: &str) -> Result<()> {
        let file: RulesFile = toml::from_str(content)?;

        for (from, to) in file.corrections {
            if from.is_empty() {
                return Err(EtlError::Config(
                    "correction keys must not be empty".to_string(),
                ));
            }
            self.corrections.insert(from, to);
        }

        for token in file.placeholder_tokens {
            if token.is_empty() {
                return Err(EtlError::Config(
                    "placeholder tokens must not be empty".to_string(),
                ));
            }
            if !self.placeholder_tokens.contains(&token) {
                self.placeholder_tokens.push(token);
            }
        }

        Ok(())
    }

    /// Defaults, extended by the rules file at `path` when it exists
    pub fn load_from(path: &Path) -> Result<Self> {
        let mut rules = Self::default();
        if !path.exists() {
            debug!("No rules file at {}, using built-in rules", path.display());
            return Ok(rules);
        }

        let content = fs::read_to_string(path).map_err(|e| {
            EtlError::Config(format!(
                "Failed to read rules file '{}': {}",
                path.display(),
                e
            ))
        })?;
        rules.extend_from_toml(&content)?;
        info!(
            corrections = rules.corrections.len(),
            placeholder_tokens = rules.placeholder_tokens.len(),
            "Loaded transform rules from {}",
            path.display()
        );
        Ok(rules)
    }
}

/// Everything a run needs besides the store handle
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub database: DatabaseConfig,
    pub sources: SourcePaths,
    pub ocr: OcrSettings,
    pub rules: TransformRules,
}

impl EtlConfig {
    pub fn load() -> Result<Self> {
        let rules_path = match env::var(constants::ENV_RULES_FILE) {
            Ok(path) => path,
            Err(env::VarError::NotPresent) => constants::DEFAULT_RULES_FILE.to_string(),
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            database: DatabaseConfig::from_env()?,
            sources: SourcePaths::default(),
            ocr: OcrSettings::default(),
            rules: TransformRules::load_from(Path::new(&rules_path))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_database_config_defaults_host_and_port() {
        let config = DatabaseConfig::from_lookup(lookup_from(&[
            ("POSTGRES_USER", "etl"),
            ("POSTGRES_PASSWORD", "secret"),
            ("POSTGRES_DB", "crime"),
        ]))
        .unwrap();

        assert_eq!(config.host, "localhost");
        assert_eq!(config.port, 5432);
        assert_eq!(config.database, "crime");
    }

    #[test]
    fn test_database_config_requires_user() {
        let err = DatabaseConfig::from_lookup(lookup_from(&[
            ("POSTGRES_PASSWORD", "secret"),
            ("POSTGRES_DB", "crime"),
        ]))
        .unwrap_err();

        assert!(err.to_string().contains("POSTGRES_USER"));
    }

    #[test]
    fn test_database_config_rejects_bad_port() {
        let result = DatabaseConfig::from_lookup(lookup_from(&[
            ("POSTGRES_USER", "etl"),
            ("POSTGRES_PASSWORD", "secret"),
            ("POSTGRES_DB", "crime"),
            ("DB_PORT", "not-a-port"),
        ]));

        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_debug_redacts_password() {
        let config = DatabaseConfig::from_lookup(lookup_from(&[
            ("POSTGRES_USER", "etl"),
            ("POSTGRES_PASSWORD", "hunter2"),
            ("POSTGRES_DB", "crime"),
            ("DB_HOST", "db"),
        ]))
        .unwrap();

        let rendered = format!("{config:?}");
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("db"));
    }

    #[test]
    fn test_default_rules() {
        let rules = TransformRules::default();
        assert_eq!(rules.corrections.get("Assult").map(String::as_str), Some("assault"));
        assert_eq!(rules.corrections.get("Frued").map(String::as_str), Some("fraud"));
        assert_eq!(
            rules.corrections.get("cybercrime").map(String::as_str),
            Some("cyber crime")
        );
        assert_eq!(rules.placeholder_tokens, vec!["District".to_string()]);
    }

    #[test]
    fn test_rules_extend_from_toml() {
        let mut rules = TransformRules::default();
        rules
            .extend_from_toml(
                r#"
                placeholder_tokens = ["Province", "District"]

                [corrections]
                Robery = "robbery"
                Assult = "aggravated assault"
                "#,
            )
            .unwrap();

        assert_eq!(rules.corrections.len(), 4);
        assert_eq!(
            rules.corrections.get("Assult").map(String::as_str),
            Some("aggravated assault")
        );
        assert_eq!(
            rules.placeholder_tokens,
            vec!["District".to_string(), "Province".to_string()]
        );
    }

    #[test]
    fn test_rules_reject_empty_token() {
        let mut rules = TransformRules::default();
        let result = rules.extend_from_toml(r#"placeholder_tokens = [""]"#);
        assert!(matches!(result, Err(EtlError::Config(_))));
    }

    #[test]
    fn test_missing_rules_file_uses_defaults() {
        let rules = TransformRules::load_from(Path::new("/nonexistent/etl_rules.toml")).unwrap();
        assert_eq!(rules, TransformRules::default());
    }
}
