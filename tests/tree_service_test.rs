//! Tests for TreeService and ConditionService wired through the ServiceContainer

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{FixedOffset, TimeZone};
use tempfile::TempDir;

use tsconf::application::services::RequestOptions;
use tsconf::application::ApplicationError;
use tsconf::config::Settings;
use tsconf::domain::{FrontendUser, UserFunctionRegistry, Value};
use tsconf::infrastructure::di::ServiceContainer;
use tsconf::infrastructure::traits::{FixedClock, FixedHostname, RealFileSystem};

const SETUP: &str = r#"
[lib]
content = "TEXT"

[lib."content."]
value = "Hello"
wrap = "<p>|</p>"

[page."10"]
value = "Page"

[page]
"20" = "<lib.content"

[page."20."]
wrap = "<div>|</div>"

[plugin.tx_form.settings.registeredElements]
Text = "<lib.formBase"

[plugin.tx_form.settings.registeredElements."Text."]
partialPath = "Text.html"

[plugin.tx_form.settings.registeredElements.Email]
partialPath = "Email.html"

[lib."formBase."]
partialPath = "Base.html"

[lib."formBase.".htmlAttributes]
10 = "placeholder"
"#;

/// Helper to create a temp tree file for testing
fn create_tree_file(dir: &TempDir, content: &str) -> PathBuf {
    let path = dir.path().join("setup.toml");
    std::fs::write(&path, content).expect("write tree file");
    path
}

fn container(settings: Settings) -> ServiceContainer {
    let now = FixedOffset::east_opt(3600)
        .unwrap()
        .with_ymd_and_hms(2024, 12, 24, 18, 30, 0)
        .unwrap();
    ServiceContainer::with_deps(
        settings,
        Arc::new(RealFileSystem),
        Arc::new(FixedClock(now)),
        Arc::new(FixedHostname("www.example.org".into())),
    )
}

#[test]
fn given_tree_file_when_resolving_then_references_replaced() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let file = create_tree_file(&temp, SETUP);
    let service = container(Settings::default()).tree_service();

    // Act
    let resolved = service.resolve_file(&file, None).unwrap();

    // Assert
    assert_eq!(resolved.lookup("page.20").value, Some("TEXT"));
    assert_eq!(resolved.lookup("page.20.value").value, Some("Hello"));
    assert_eq!(resolved.lookup("page.20.wrap").value, Some("<div>|</div>"));
    assert_eq!(resolved.lookup("page.10.value").value, Some("Page"));
}

#[test]
fn given_subpath_when_resolving_then_only_subtree_returned() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let file = create_tree_file(&temp, SETUP);
    let service = container(Settings::default()).tree_service();

    // Act
    let resolved = service.resolve_file(&file, Some("page")).unwrap();

    // Assert
    assert_eq!(resolved.value("20"), Some("TEXT"));
    assert!(resolved.subtree("lib").is_none());
}

#[test]
fn given_missing_subpath_when_resolving_then_subtree_not_found() {
    let temp = TempDir::new().unwrap();
    let file = create_tree_file(&temp, SETUP);
    let service = container(Settings::default()).tree_service();

    let result = service.resolve_file(&file, Some("nope.nothing"));

    assert!(matches!(
        result,
        Err(ApplicationError::SubtreeNotFound { ref path, .. }) if path == "nope.nothing"
    ));
}

#[test]
fn given_missing_file_when_loading_then_operation_failed() {
    let temp = TempDir::new().unwrap();
    let service = container(Settings::default()).tree_service();

    let result = service.load(&temp.path().join("missing.toml"));

    assert!(matches!(result, Err(ApplicationError::OperationFailed { .. })));
}

#[test]
fn given_no_file_and_no_setting_when_choosing_tree_file_then_error() {
    // Arrange
    let service = container(Settings::default()).tree_service();
    let configured = container(Settings {
        tree_file: Some(PathBuf::from("/srv/setup.toml")),
        ..Settings::default()
    })
    .tree_service();

    // Act & Assert
    assert!(matches!(service.tree_file(None), Err(ApplicationError::NoTreeFile)));
    assert_eq!(
        configured.tree_file(None).unwrap(),
        PathBuf::from("/srv/setup.toml")
    );
    assert_eq!(
        configured.tree_file(Some(Path::new("other.toml"))).unwrap(),
        PathBuf::from("other.toml")
    );
}

#[test]
fn given_form_plugin_when_building_registry_then_inherited_definitions_visible() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let file = create_tree_file(&temp, SETUP);
    let service = container(Settings::default()).tree_service();

    // Act
    let registry = service.element_registry(&file, None).unwrap();

    // Assert
    assert_eq!(registry.registered_element_types(), ["Text", "Email"]);
    assert_eq!(registry.default_fluid_template("Text", None), "Text.html");
    assert_eq!(registry.default_fluid_template("Email", None), "Email.html");
    assert!(registry
        .model_defined_html_attributes("Text")
        .contains_key("placeholder"));
}

#[test]
fn given_shallow_depth_bound_when_resolving_chain_then_unresolved() {
    // Arrange
    let temp = TempDir::new().unwrap();
    let file = create_tree_file(
        &temp,
        r#"
a = "<b"
b = "<c"
c = "end"
"#,
    );
    let settings = Settings {
        max_reference_depth: 1,
        ..Settings::default()
    };

    // Act
    let resolved = container(settings).tree_service().resolve_file(&file, None).unwrap();

    // Assert
    assert_eq!(resolved.value("a"), None);
    assert_eq!(resolved.value("b"), Some("end"));
}

#[test]
fn given_request_options_when_matching_then_environment_built_from_them() {
    // Arrange
    let service = container(Settings::default()).condition_service();
    let options = RequestOptions {
        remote_addr: Some("127.0.0.1".into()),
        user: Some(FrontendUser {
            id: 7,
            groups: vec![2],
        }),
        ..RequestOptions::default()
    };

    // Act
    let matched = service
        .match_condition("[IP = devIP] && [usergroup = 2] && [hour = 18]", options)
        .unwrap();

    // Assert
    assert!(matched);
}

#[test]
fn given_no_options_when_matching_then_fixed_clock_and_host_used() {
    let service = container(Settings::default()).condition_service();

    assert!(service
        .match_condition("[hostname = *.example.org] && [dayofmonth = 24]", RequestOptions::default())
        .unwrap());
    assert!(!service
        .match_condition("[hostname = localhost]", RequestOptions::default())
        .unwrap());
}

#[test]
fn given_registered_user_function_when_matching_then_container_passes_it_on() {
    // Arrange
    let mut functions = UserFunctionRegistry::new();
    functions.register("isChristmasEve", |_| Value::Bool(true));
    let service = container(Settings::default())
        .with_user_functions(functions)
        .condition_service();

    // Act
    let matched = service
        .match_condition("[userFunc = isChristmasEve()]", RequestOptions::default())
        .unwrap();

    // Assert
    assert!(matched);
}

#[test]
fn given_invalid_context_in_settings_when_matching_then_error() {
    let service = container(Settings {
        application_context: "Live".into(),
        ..Settings::default()
    })
    .condition_service();

    assert!(service
        .match_condition("[applicationContext = Live]", RequestOptions::default())
        .is_err());
}
