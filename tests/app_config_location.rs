//! Integration test for locating the application config file.
//!
//! Kept in its own test binary: it changes the process environment.

#![cfg(feature = "xml")]

use keyswap_config::prelude::*;
use keyswap_config::sources::{APP_CONFIG_ENV, AppConfigSource};
use serde::Deserialize;
use std::fs;
use tempfile::TempDir;

#[derive(Debug, Deserialize, Clone, PartialEq)]
struct Endpoint {
    url: String,
}

fn set_app_config_env(value: &std::ffi::OsStr) {
    // SAFETY: this binary has a single test, so nothing else touches the
    // environment concurrently.
    unsafe { std::env::set_var(APP_CONFIG_ENV, value) };
}

#[test]
fn test_app_config_location_order() {
    let temp_dir = TempDir::new().unwrap();
    let env_path = temp_dir.path().join("from_env.config");
    fs::write(
        &env_path,
        r#"<configuration>
  <keyedConfigurations>
    <add key="orders" url="http://orders.env" />
  </keyedConfigurations>
</configuration>"#,
    )
    .unwrap();
    let builder_path = temp_dir.path().join("from_builder.config");
    fs::write(
        &builder_path,
        r#"<configuration>
  <keyedConfigurations>
    <add key="billing" url="http://billing.builder" />
  </keyedConfigurations>
</configuration>"#,
    )
    .unwrap();

    // The environment variable is used when no path was given.
    set_app_config_env(env_path.as_os_str());
    let manager: ConfigurationManager<String, Endpoint> = ConfigurationManager::new();
    manager.configure_from_app_config().unwrap();
    assert_eq!(manager.all_keys(), vec!["orders".to_string()]);
    assert_eq!(
        manager.get(&"orders".to_string()).unwrap().url,
        "http://orders.env"
    );
    assert_eq!(AppConfigSource::new().resolve_path().unwrap(), env_path);

    // A builder path wins over the environment variable.
    let manager: ConfigurationManager<String, Endpoint> = ConfigurationManager::builder()
        .with_app_config_path(&builder_path)
        .build();
    manager.configure_from_app_config().unwrap();
    assert_eq!(manager.all_keys(), vec!["billing".to_string()]);

    // An empty variable falls through to `<exe>.config`.
    set_app_config_env(std::ffi::OsStr::new(""));
    let mut expected = std::env::current_exe().unwrap().into_os_string();
    expected.push(".config");
    assert_eq!(
        AppConfigSource::new().resolve_path().unwrap(),
        std::path::PathBuf::from(expected)
    );

    let manager: ConfigurationManager<String, Endpoint> = ConfigurationManager::new();
    assert!(manager.configure_from_app_config().unwrap_err().is_not_found());
    assert!(manager.is_empty());
}
