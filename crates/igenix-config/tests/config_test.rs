// Loading, saving, and profile translation for device configs.
//
// Every test runs inside a figment `Jail` so environment overrides set
// by one test never leak into another.
#![allow(clippy::unwrap_used)]

use std::path::Path;
use std::time::Duration;

use figment::Jail;
use pretty_assertions::assert_eq;
use secrecy::ExposeSecret;

use igenix_config::{
    Config, ConfigError, Profile, load_config_from, resolve_local_key, save_config_to,
};

const CONFIG: &str = r#"
default_profile = "lounge"

[defaults]
timeout = 4

[profiles.lounge]
name = "Lounge AC"
device_id = "bf1122334455667788"
local_key = "0123456789abcdef"
resolve_timeout = 20

[profiles.bedroom]
device_id = "bf99887766554433"
uid = "eu1589345671234"
local_key_env = "BEDROOM_AC_KEY"
"#;

fn load(jail: &mut Jail) -> figment::error::Result<Config> {
    jail.create_file("config.toml", CONFIG)?;
    load_config_from(Path::new("config.toml")).map_err(|e| e.to_string().into())
}

#[test]
fn test_load_profiles_and_defaults() {
    Jail::expect_with(|jail| {
        let config = load(jail)?;

        assert_eq!(config.default_profile.as_deref(), Some("lounge"));
        assert_eq!(config.defaults.timeout, 4);
        assert_eq!(config.defaults.resolve_timeout, 10);
        assert_eq!(config.profiles.len(), 2);
        assert_eq!(config.profiles["lounge"].resolve_timeout, Some(20));
        Ok(())
    });
}

#[test]
fn test_missing_file_yields_defaults() {
    Jail::expect_with(|_jail| {
        let config = load_config_from(Path::new("absent.toml")).unwrap();

        assert_eq!(config.default_profile.as_deref(), Some("default"));
        assert_eq!(config.defaults.timeout, 5);
        assert!(config.profiles.is_empty());
        Ok(())
    });
}

#[test]
fn test_env_overrides_file() {
    Jail::expect_with(|jail| {
        jail.set_env("IGENIX_DEFAULTS__TIMEOUT", 8);
        jail.set_env("IGENIX_PROFILES__LOUNGE__NAME", "Living Room");

        let config = load(jail)?;

        assert_eq!(config.defaults.timeout, 8);
        assert_eq!(config.profiles["lounge"].name.as_deref(), Some("Living Room"));
        Ok(())
    });
}

#[test]
fn test_device_config_from_default_profile() {
    Jail::expect_with(|jail| {
        let config = load(jail)?;

        let device = config.device_config(None).unwrap();

        assert_eq!(device.identity.name, "Lounge AC");
        assert_eq!(device.identity.device_id, "bf1122334455667788");
        assert_eq!(device.identity.local_key.expose_secret(), "0123456789abcdef");
        assert_eq!(device.request_timeout, Duration::from_secs(4));
        assert_eq!(device.resolve_timeout, Duration::from_secs(20));
        Ok(())
    });
}

#[test]
fn test_local_key_from_env_variable() {
    Jail::expect_with(|jail| {
        jail.set_env("BEDROOM_AC_KEY", "fedcba9876543210");
        let config = load(jail)?;

        let device = config.device_config(Some("bedroom")).unwrap();

        assert_eq!(device.identity.name, "bedroom");
        assert_eq!(device.identity.uid.as_deref(), Some("eu1589345671234"));
        assert_eq!(device.identity.local_key.expose_secret(), "fedcba9876543210");
        Ok(())
    });
}

#[test]
fn test_profile_without_any_key_fails() {
    Jail::expect_with(|_jail| {
        let profile = Profile {
            device_id: "bf00".into(),
            local_key_env: Some("IGENIX_TEST_UNSET_KEY".into()),
            ..Profile::default()
        };

        let err = resolve_local_key(&profile, "igenix-test-no-key").unwrap_err();
        assert!(matches!(err, ConfigError::NoCredentials { .. }));
        Ok(())
    });
}

#[test]
fn test_unknown_profile() {
    Jail::expect_with(|jail| {
        let config = load(jail)?;

        assert!(matches!(
            config.device_config(Some("garage")),
            Err(ConfigError::UnknownProfile { .. })
        ));
        Ok(())
    });
}

#[test]
fn test_save_then_load() {
    Jail::expect_with(|jail| {
        let config = load(jail)?;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        save_config_to(&config, &path).unwrap();
        let reloaded = load_config_from(&path).unwrap();

        assert_eq!(reloaded.default_profile, config.default_profile);
        assert_eq!(reloaded.defaults.timeout, 4);
        assert_eq!(
            reloaded.profiles.keys().collect::<Vec<_>>(),
            vec!["bedroom", "lounge"]
        );
        assert_eq!(
            reloaded.profiles["bedroom"].local_key_env.as_deref(),
            Some("BEDROOM_AC_KEY")
        );
        Ok(())
    });
}
