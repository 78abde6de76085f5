use trowel_config::{
    ConfigError, ENV_API_ENDPOINT, ENV_DOMAIN_NAME, EnvConfig, current, install, try_current,
};

#[test]
fn installed_configuration_is_write_once() -> anyhow::Result<()> {
    assert!(try_current().is_none());
    assert!(matches!(current(), Err(ConfigError::NotInstalled)));

    let config = EnvConfig::from_lookup(|key| match key {
        ENV_API_ENDPOINT => Some("https://db.example.org/rest".to_string()),
        ENV_DOMAIN_NAME => Some("example.org".to_string()),
        _ => None,
    })?;
    let installed = install(config.clone())?;
    assert_eq!(installed, &config);
    assert_eq!(current()?.domain_name, "example.org");

    let second = install(config);
    assert!(matches!(second, Err(ConfigError::AlreadyInstalled)));
    Ok(())
}
