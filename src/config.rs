//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/pdxmerge/pdxmerge.toml`
//! 3. Local config: `<scan_dir>/.pdxmerge.toml` (the directory being merged)
//! 4. Environment variables: `PDXMERGE_*` prefix

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;

/// Raw settings for intermediate parsing (everything optional to detect "not specified").
///
/// Used during layered config merging to distinguish between:
/// - `None` → field not specified, inherit from base
/// - `Some([])` → explicit empty array
/// - `Some([...])` → explicit values to merge
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub file_extensions: Option<Vec<String>>,
    pub output_file: Option<PathBuf>,
    pub emit_defines: Option<bool>,
    pub parallel: Option<bool>,
}

/// Unified configuration for pdxmerge.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Extensions of script files picked up during discovery (without the dot)
    pub file_extensions: Vec<String>,
    /// Destination of `merge` when no `--output` is given
    pub output_file: PathBuf,
    /// Write the define table as `@name = value` lines before the merged nodes
    pub emit_defines: bool,
    /// Parse files on the rayon thread pool
    pub parallel: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            file_extensions: vec!["txt".into()],
            output_file: PathBuf::from("merged.txt"),
            emit_defines: false,
            parallel: true,
        }
    }
}

/// Get the XDG config directory for pdxmerge.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "pdxmerge").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("pdxmerge.toml"))
}

/// Get the path to the local config file of a scanned directory.
pub fn local_config_path(scan_dir: &Path) -> PathBuf {
    scan_dir.join(".pdxmerge.toml")
}

/// Load a TOML file into RawSettings for manual merging.
fn load_raw_settings(path: &Path) -> Result<RawSettings, ApplicationError> {
    let content = std::fs::read_to_string(path).map_err(|e| ApplicationError::Config {
        message: format!("read {}: {}", path.display(), e),
    })?;
    toml::from_str(&content).map_err(|e| ApplicationError::Config {
        message: format!("parse {}: {}", path.display(), e),
    })
}

impl Settings {
    /// Merge arrays with union semantics and negation support.
    ///
    /// - Items from overlay are added to base
    /// - Items prefixed with `!` remove the corresponding item from the result
    /// - Duplicates are de-duplicated
    ///
    /// # Examples
    /// ```ignore
    /// merge_array(&["txt"], &["gui"])          // → ["gui", "txt"]
    /// merge_array(&["gui", "txt"], &["!txt"])  // → ["gui"]
    /// ```
    pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
        let mut result: HashSet<String> = base.iter().cloned().collect();

        for pattern in overlay {
            if let Some(negated) = pattern.strip_prefix('!') {
                result.remove(negated);
            } else {
                result.insert(pattern.clone());
            }
        }

        // Sorted for deterministic output
        let mut vec: Vec<String> = result.into_iter().collect();
        vec.sort();
        vec
    }

    /// Whether `path` carries one of the configured extensions (case-insensitive).
    pub fn matches_extension(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                self.file_extensions
                    .iter()
                    .any(|wanted| wanted.eq_ignore_ascii_case(ext))
            })
    }

    /// Expand shell variables and tilde in path-like fields.
    ///
    /// Handles `~`, `$VAR`, and `${VAR}` syntax.
    fn expand_paths(&mut self) {
        let raw = self.output_file.to_string_lossy().into_owned();
        self.output_file = PathBuf::from(expand_env_vars(&raw));
    }

    /// Strip a leading dot so `.txt` and `txt` mean the same.
    fn normalize_extensions(&mut self) {
        for ext in &mut self.file_extensions {
            if let Some(stripped) = ext.strip_prefix('.') {
                *ext = stripped.to_string();
            }
        }
    }

    /// Merge overlay config onto self (base) with union semantics for arrays.
    ///
    /// - Scalar options: overlay wins if Some, otherwise keep base
    /// - Arrays: union merge with negation support
    fn merge_with(&self, overlay: &RawSettings) -> Self {
        Self {
            file_extensions: overlay
                .file_extensions
                .as_ref()
                .map(|o| Self::merge_array(&self.file_extensions, o))
                .unwrap_or_else(|| self.file_extensions.clone()),
            output_file: overlay
                .output_file
                .clone()
                .unwrap_or_else(|| self.output_file.clone()),
            emit_defines: overlay.emit_defines.unwrap_or(self.emit_defines),
            parallel: overlay.parallel.unwrap_or(self.parallel),
        }
    }

    /// Apply global config onto defaults with REPLACE semantics for arrays.
    fn apply_global(&self, global: &RawSettings) -> Self {
        Self {
            file_extensions: global
                .file_extensions
                .clone()
                .unwrap_or_else(|| self.file_extensions.clone()),
            output_file: global
                .output_file
                .clone()
                .unwrap_or_else(|| self.output_file.clone()),
            emit_defines: global.emit_defines.unwrap_or(self.emit_defines),
            parallel: global.parallel.unwrap_or(self.parallel),
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `scan_dir` - Optional directory being merged; its `.pdxmerge.toml` is the local layer
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/pdxmerge/pdxmerge.toml` (arrays REPLACE defaults)
    /// 3. Local config: `<scan_dir>/.pdxmerge.toml` (arrays UNION with global)
    /// 4. Environment variables: `PDXMERGE_*` prefix (REPLACES - explicit override)
    pub fn load(scan_dir: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("load: global config {}", global_path.display());
                let raw = load_raw_settings(&global_path)?;
                current = current.apply_global(&raw);
            }
        }

        if let Some(dir) = scan_dir {
            let local_path = local_config_path(dir);
            if local_path.exists() {
                debug!("load: local config {}", local_path.display());
                let raw = load_raw_settings(&local_path)?;
                current = current.merge_with(&raw);
            }
        }

        current = Self::apply_env_overrides(current)?;

        current.normalize_extensions();
        current.expand_paths();

        Ok(current)
    }

    /// Apply PDXMERGE_* environment variables as explicit overrides.
    ///
    /// Env vars replace values (not merge) - they are explicit user overrides.
    /// `PDXMERGE_FILE_EXTENSIONS` takes a comma separated list.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let builder = Config::builder().add_source(
            Environment::with_prefix("PDXMERGE")
                .prefix_separator("_")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("file_extensions"),
        );

        let config = builder.build().map_err(config_err)?;

        if let Ok(val) = config.get::<Vec<String>>("file_extensions") {
            settings.file_extensions = val;
        }
        if let Ok(val) = config.get_string("output_file") {
            settings.output_file = PathBuf::from(val);
        }
        if let Ok(val) = config.get_bool("emit_defines") {
            settings.emit_defines = val;
        }
        if let Ok(val) = config.get_bool("parallel") {
            settings.parallel = val;
        }

        Ok(settings)
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# pdxmerge configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/pdxmerge/pdxmerge.toml  (defines your baseline)
#   Local:  <scan_dir>/.pdxmerge.toml         (per mod directory additions)
#   Env:    PDXMERGE_* environment variables  (explicit overrides)
#
# Array Merge Semantics:
#   Global config REPLACES compiled defaults.
#   Local config UNIONS with global.
#   Use "!item" in local config to REMOVE an inherited item:
#     file_extensions = ["gui", "!txt"]  # adds gui, removes txt

# Extensions of script files to merge
# file_extensions = ["txt"]

# Output file of `pdxmerge merge` (relative to the working directory)
# output_file = "merged.txt"

# Write @name = value defines before the merged content
# emit_defines = false

# Parse files in parallel; output order is unaffected
# parallel = true
"#
        .to_string()
    }
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input unchanged.
fn expand_env_vars(input: &str) -> String {
    shellexpand::full(input)
        .map(|expanded| expanded.into_owned())
        .unwrap_or_else(|_| input.to_string())
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
