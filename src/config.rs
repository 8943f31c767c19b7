//! Configuration management with layered loading
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. Global config: `$XDG_CONFIG_HOME/tsconf/tsconf.toml`
//! 3. Local config: `./.tsconf.toml` or an explicit `--config` file
//! 4. Environment variables: `TSCONF_*` prefix

use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::application::ApplicationError;
use crate::domain::{ApplicationContext, ForwardedForPolicy, MatcherConfig};

/// Raw settings for intermediate parsing (`None` means "not specified").
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct RawSettings {
    pub application_context: Option<String>,
    pub dev_ip_mask: Option<String>,
    pub reverse_proxy_ips: Option<Vec<String>>,
    pub reverse_proxy_header_multi_value: Option<String>,
    pub max_reference_depth: Option<usize>,
    pub tree_file: Option<PathBuf>,
    pub form_path: Option<String>,
    pub features: BTreeMap<String, bool>,
}

/// Unified configuration for tsconf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Settings {
    /// Application context conditions are matched in (default: Production)
    pub application_context: String,
    /// IP list substituted for `devIP`
    pub dev_ip_mask: String,
    /// Trusted reverse proxies; `X-Forwarded-For` is honoured behind them
    pub reverse_proxy_ips: Vec<String>,
    /// Which `X-Forwarded-For` entry to use: none, first or last
    pub reverse_proxy_header_multi_value: String,
    /// Longest reference chain followed during resolution
    pub max_reference_depth: usize,
    /// Tree file used when a command is given none
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tree_file: Option<PathBuf>,
    /// Path of the form plugin inside a tree file
    pub form_path: String,
    /// Feature flags
    pub features: BTreeMap<String, bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            application_context: "Production".into(),
            dev_ip_mask: "127.0.0.1,::1".into(),
            reverse_proxy_ips: vec![],
            reverse_proxy_header_multi_value: "none".into(),
            max_reference_depth: crate::domain::DEFAULT_MAX_REFERENCE_DEPTH,
            tree_file: None,
            form_path: "plugin.tx_form".into(),
            features: BTreeMap::new(),
        }
    }
}

/// Expand `~`, `$VAR` and `${VAR}`; unknown variables leave the input unchanged.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}

/// Get the XDG config directory for tsconf.
pub fn global_config_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", "tsconf").map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the global config file.
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("tsconf.toml"))
}

/// Get the path to the local config file in a directory.
pub fn local_config_path(dir: &Path) -> PathBuf {
    dir.join(".tsconf.toml")
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

/// Union of two lists; `!item` in the overlay removes an inherited item.
///
/// ```ignore
/// merge_array(&["a", "b"], &["!a", "c"]) // → ["b", "c"]
/// ```
pub fn merge_array(base: &[String], overlay: &[String]) -> Vec<String> {
    let mut result: HashSet<String> = base.iter().cloned().collect();

    for item in overlay {
        if let Some(negated) = item.strip_prefix('!') {
            result.remove(negated);
        } else {
            result.insert(item.clone());
        }
    }

    let mut vec: Vec<String> = result.into_iter().collect();
    vec.sort();
    vec
}

impl Settings {
    /// Expand shell variables and tilde in path-like fields.
    fn expand_paths(&mut self) {
        if let Some(tree_file) = &self.tree_file {
            let expanded = expand_env_vars(tree_file.to_string_lossy().as_ref());
            self.tree_file = Some(PathBuf::from(expanded));
        }
    }

    /// Apply a config layer on top of self.
    ///
    /// Scalars: the layer wins if set. Features merge key-wise. Proxy lists
    /// are replaced by the global layer and unioned by the local one.
    fn merge_with(&self, layer: &RawSettings, union_lists: bool) -> Self {
        let mut features = self.features.clone();
        features.extend(layer.features.iter().map(|(k, v)| (k.clone(), *v)));

        let reverse_proxy_ips = match &layer.reverse_proxy_ips {
            Some(ips) if union_lists => merge_array(&self.reverse_proxy_ips, ips),
            Some(ips) => ips.clone(),
            None => self.reverse_proxy_ips.clone(),
        };

        Self {
            application_context: layer
                .application_context
                .clone()
                .unwrap_or_else(|| self.application_context.clone()),
            dev_ip_mask: layer
                .dev_ip_mask
                .clone()
                .unwrap_or_else(|| self.dev_ip_mask.clone()),
            reverse_proxy_ips,
            reverse_proxy_header_multi_value: layer
                .reverse_proxy_header_multi_value
                .clone()
                .unwrap_or_else(|| self.reverse_proxy_header_multi_value.clone()),
            max_reference_depth: layer
                .max_reference_depth
                .unwrap_or(self.max_reference_depth),
            tree_file: layer.tree_file.clone().or_else(|| self.tree_file.clone()),
            form_path: layer
                .form_path
                .clone()
                .unwrap_or_else(|| self.form_path.clone()),
            features,
        }
    }

    /// Load settings with layered precedence.
    ///
    /// # Arguments
    /// * `local` - Explicit local config file; defaults to `./.tsconf.toml`
    ///
    /// # Precedence (lowest to highest)
    /// 1. Compiled defaults
    /// 2. Global config: `$XDG_CONFIG_HOME/tsconf/tsconf.toml`
    /// 3. Local config (must exist if given explicitly)
    /// 4. Environment variables: `TSCONF_*` prefix
    pub fn load(local: Option<&Path>) -> Result<Self, ApplicationError> {
        let mut current = Self::default();

        if let Some(global_path) = global_config_path() {
            if global_path.exists() {
                debug!("load: global config {}", global_path.display());
                current = current.merge_with(&load_raw_settings(&global_path)?, false);
            }
        }

        match local {
            Some(path) => {
                debug!("load: local config {}", path.display());
                current = current.merge_with(&load_raw_settings(path)?, true);
            }
            None => {
                let path = local_config_path(Path::new("."));
                if path.exists() {
                    debug!("load: local config {}", path.display());
                    current = current.merge_with(&load_raw_settings(&path)?, true);
                }
            }
        }

        current = Self::apply_env_overrides(current)?;
        current.expand_paths();

        Ok(current)
    }

    /// Apply TSCONF_* environment variables as explicit overrides.
    ///
    /// `TSCONF_FEATURES__<NAME>=true` toggles a single feature flag.
    fn apply_env_overrides(mut settings: Self) -> Result<Self, ApplicationError> {
        let config = Config::builder()
            .add_source(
                Environment::with_prefix("TSCONF")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("reverse_proxy_ips")
                    .try_parsing(true),
            )
            .build()
            .map_err(config_err)?;

        if let Ok(val) = config.get_string("application_context") {
            settings.application_context = val;
        }
        if let Ok(val) = config.get_string("dev_ip_mask") {
            settings.dev_ip_mask = val;
        }
        if let Ok(val) = config.get::<Vec<String>>("reverse_proxy_ips") {
            settings.reverse_proxy_ips = val;
        }
        if let Ok(val) = config.get_string("reverse_proxy_header_multi_value") {
            settings.reverse_proxy_header_multi_value = val;
        }
        if let Ok(val) = config.get_int("max_reference_depth") {
            settings.max_reference_depth = usize::try_from(val).map_err(|_| ApplicationError::Config {
                message: format!("max_reference_depth must not be negative: {}", val),
            })?;
        }
        if let Ok(val) = config.get_string("tree_file") {
            settings.tree_file = Some(PathBuf::from(val));
        }
        if let Ok(val) = config.get_string("form_path") {
            settings.form_path = val;
        }
        if let Ok(table) = config.get_table("features") {
            for (name, value) in table {
                let enabled = value.into_bool().map_err(config_err)?;
                settings.features.insert(name, enabled);
            }
        }

        Ok(settings)
    }

    /// Validated application context.
    pub fn application_context(&self) -> Result<ApplicationContext, ApplicationError> {
        Ok(ApplicationContext::new(&self.application_context)?)
    }

    /// Matcher configuration derived from these settings.
    pub fn matcher_config(&self) -> Result<MatcherConfig, ApplicationError> {
        let forwarded_for: ForwardedForPolicy = self
            .reverse_proxy_header_multi_value
            .parse()
            .map_err(|e: crate::domain::DomainError| ApplicationError::Config {
                message: e.to_string(),
            })?;
        Ok(MatcherConfig {
            features: self.features.clone().into_iter().collect(),
            dev_ip_mask: self.dev_ip_mask.clone(),
            reverse_proxy_ips: self.reverse_proxy_ips.clone(),
            forwarded_for,
        })
    }

    /// Show the effective configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ApplicationError> {
        toml::to_string_pretty(self).map_err(|e| ApplicationError::Config {
            message: format!("serialize config: {e}"),
        })
    }

    /// Generate a template config file.
    pub fn template() -> String {
        r#"# tsconf configuration
#
# Locations (by precedence, lowest to highest):
#   Global: ~/.config/tsconf/tsconf.toml  (defines your baseline)
#   Local:  ./.tsconf.toml or --config    (project-specific additions)
#   Env:    TSCONF_* environment variables (explicit overrides)
#           e.g. TSCONF_DEV_IP_MASK=10.0.0.0/8, TSCONF_FEATURES__BETA=true
#
# List Merge Semantics:
#   Global config REPLACES the defaults.
#   Local config UNIONS with global; "!item" removes an inherited item:
#     reverse_proxy_ips = ["10.0.0.2", "!10.0.0.1"]

# Application context, must start with Production, Development or Testing
# application_context = "Production/Staging"

# Substituted for devIP in IP conditions
# dev_ip_mask = "127.0.0.1,::1"

# Trusted reverse proxies ("*" trusts every peer)
# reverse_proxy_ips = ["10.0.0.1"]

# X-Forwarded-For entry to use behind a proxy: none, first or last
# reverse_proxy_header_multi_value = "first"

# Longest reference chain followed before giving up
# max_reference_depth = 32

# Tree file used by resolve/elements when none is given
# tree_file = "~/typoscript/setup.toml"

# Path of the form plugin for the elements command
# form_path = "plugin.tx_form"

[features]
# newFormEngine = true
"#
        .to_string()
    }
}

fn config_err(e: ConfigError) -> ApplicationError {
    ApplicationError::Config {
        message: e.to_string(),
    }
}
