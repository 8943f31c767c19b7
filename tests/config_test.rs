//! Integration tests for Settings config loading with layered merge semantics.
//!
//! Merge Semantics:
//! - Defaults → Global: REPLACE (global defines the real baseline)
//! - Global → Local: UNION with negation support for proxy lists
//! - Features merge key-wise at every layer
//! - Any → Env vars: REPLACE (explicit user override)
//!
//! Note: These tests run without a global config (temp directories only),
//! so they effectively test local config merging with defaults.

use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;

use tsconf::config::{merge_array, Settings};
use tsconf::domain::ForwardedForPolicy;

fn write_config(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join(".tsconf.toml");
    fs::write(&path, content).expect("write config");
    path
}

#[test]
fn given_local_config_with_scalars_when_load_then_overrides_defaults() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
application_context = "Development/Local"
dev_ip_mask = "10.0.0.0/8"
max_reference_depth = 5
form_path = "plugin.tx_myform"
"#,
    );

    // Act
    let settings = Settings::load(Some(path.as_path())).expect("load settings");

    // Assert
    assert_eq!(settings.application_context, "Development/Local");
    assert_eq!(settings.dev_ip_mask, "10.0.0.0/8");
    assert_eq!(settings.max_reference_depth, 5);
    assert_eq!(settings.form_path, "plugin.tx_myform");
    assert_eq!(settings.reverse_proxy_header_multi_value, "none");
}

#[test]
fn given_local_config_without_values_when_load_then_defaults_kept() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "");

    // Act
    let settings = Settings::load(Some(path.as_path())).expect("load settings");

    // Assert
    assert_eq!(settings.application_context, "Production");
    assert_eq!(settings.dev_ip_mask, "127.0.0.1,::1");
    assert_eq!(settings.form_path, "plugin.tx_form");
    assert!(settings.tree_file.is_none());
}

#[test]
fn given_local_proxy_list_with_negation_when_load_then_union_without_negated() {
    // Arrange: defaults carry no proxies, so negation has nothing to remove
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
reverse_proxy_ips = ["10.0.0.2", "10.0.0.1", "!10.0.0.9"]
reverse_proxy_header_multi_value = "last"
"#,
    );

    // Act
    let settings = Settings::load(Some(path.as_path())).expect("load settings");

    // Assert
    assert_eq!(settings.reverse_proxy_ips, vec!["10.0.0.1", "10.0.0.2"]);
    let matcher = settings.matcher_config().expect("valid matcher config");
    assert_eq!(matcher.forwarded_for, ForwardedForPolicy::Last);
}

#[test]
fn given_features_table_when_load_then_flags_available_to_matcher() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
[features]
"test.testFeature" = true
legacy = false
"#,
    );

    // Act
    let settings = Settings::load(Some(path.as_path())).expect("load settings");
    let matcher = settings.matcher_config().expect("valid matcher config");

    // Assert
    assert_eq!(matcher.features.get("test.testFeature"), Some(&true));
    assert_eq!(matcher.features.get("legacy"), Some(&false));
}

#[test]
fn given_missing_explicit_config_when_load_then_error() {
    let dir = TempDir::new().unwrap();

    let result = Settings::load(Some(dir.path().join("missing.toml").as_path()));

    assert!(result.is_err());
}

#[test]
fn given_malformed_config_when_load_then_error() {
    let dir = TempDir::new().unwrap();
    let path = write_config(&dir, "max_reference_depth = \"deep\"");

    assert!(Settings::load(Some(path.as_path())).is_err());
}

#[test]
fn given_tree_file_with_tilde_when_load_then_expanded() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let path = write_config(
        &dir,
        r#"
tree_file = "~/site/setup.toml"
application_context = "Testing"
"#,
    );

    // Act
    let settings = Settings::load(Some(path.as_path())).expect("load settings");

    // Assert
    let tree_file = settings.tree_file.expect("tree file set");
    assert!(!tree_file.to_string_lossy().starts_with('~'));
    assert!(tree_file.ends_with("site/setup.toml"));
    assert_eq!(settings.application_context, "Testing");
    assert_eq!(settings.form_path, "plugin.tx_form");
}

#[test]
fn given_bad_forwarded_for_policy_when_building_matcher_config_then_config_error() {
    let settings = Settings {
        reverse_proxy_header_multi_value: "middle".into(),
        ..Settings::default()
    };

    assert!(settings.matcher_config().is_err());
}

#[test]
fn given_invalid_application_context_when_validating_then_error() {
    let settings = Settings {
        application_context: "Staging".into(),
        ..Settings::default()
    };

    assert!(settings.application_context().is_err());
}

#[test]
fn given_settings_when_serializing_then_round_trips_through_load() {
    // Arrange
    let dir = TempDir::new().unwrap();
    let original = Settings {
        application_context: "Production/Live".into(),
        reverse_proxy_ips: vec!["10.0.0.1".into()],
        ..Settings::default()
    };
    let path = write_config(&dir, &original.to_toml().expect("serialize"));

    // Act
    let loaded = Settings::load(Some(path.as_path())).expect("load settings");

    // Assert
    assert_eq!(loaded, original);
}

#[test]
fn given_template_when_parsing_then_yields_defaults() {
    let parsed: Settings = toml::from_str(&Settings::template()).expect("template is valid toml");

    assert_eq!(parsed, Settings::default(), "template keys are commented out");
}

#[test]
fn given_negation_in_overlay_when_merging_arrays_then_removed() {
    let base = vec!["a".to_string(), "b".to_string()];
    let overlay = vec!["!a".to_string(), "c".to_string()];

    assert_eq!(merge_array(&base, &overlay), vec!["b", "c"]);
}
