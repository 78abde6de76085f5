//! Shared REST client, error types, and argument helpers for the CLI.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use anyhow::anyhow;
use trowel_config::{ENV_API_ENDPOINT, ENV_DOMAIN_NAME, ENV_HTTP_TIMEOUT_SECS, EnvConfig};
use serde_json::Value;
use trowel_crud::record::UUID_FIELD;
use trowel_crud::{CrudError, DataLoader, Record, RecordGateway, RecordStore};
use trowel_rest::{Filter, RestClient, RestError};
use tracing::warn;
use trowel_telemetry::Metrics;
use url::Url;

use crate::cli::{Cli, OutputFormat};

/// CLI-level error type to distinguish validation from operational failures.
#[derive(Debug)]
pub(crate) enum CliError {
    Validation(String),
    Failure(anyhow::Error),
}

/// Convenience alias for functions returning a `CliError`.
pub(crate) type CliResult<T> = Result<T, CliError>;

impl CliError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub(crate) fn failure(error: impl Into<anyhow::Error>) -> Self {
        Self::Failure(error.into())
    }

    pub(crate) const fn exit_code(&self) -> i32 {
        match self {
            Self::Validation(_) => 2,
            Self::Failure(_) => 3,
        }
    }

    pub(crate) fn display_message(&self) -> String {
        match self {
            Self::Validation(message) => message.clone(),
            Self::Failure(error) => format!("{error:#}"),
        }
    }
}

impl Display for CliError {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> fmt::Result {
        formatter.write_str("cli error")
    }
}

impl std::error::Error for CliError {}

impl From<CrudError> for CliError {
    fn from(error: CrudError) -> Self {
        Self::Failure(anyhow!(error.message()))
    }
}

impl From<RestError> for CliError {
    fn from(error: RestError) -> Self {
        Self::Failure(anyhow!(error.message()))
    }
}

/// Dependencies constructed from environment variables and CLI options.
pub(crate) struct CliDependencies {
    pub(crate) config: EnvConfig,
    pub(crate) metrics: Metrics,
}

impl CliDependencies {
    /// Resolve configuration from the process environment, with flags taking precedence.
    pub(crate) fn from_env(cli: &Cli) -> CliResult<Self> {
        Self::from_lookup(cli, |key| std::env::var(key).ok())
    }

    /// Resolve configuration through `lookup`, with flags taking precedence.
    ///
    /// The domain falls back to the host of the API URL when neither the flag
    /// nor the environment names one.
    pub(crate) fn from_lookup<F>(cli: &Cli, lookup: F) -> CliResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_endpoint = cli
            .api_url
            .as_ref()
            .map(ToString::to_string)
            .or_else(|| lookup(ENV_API_ENDPOINT));
        let api_host = api_endpoint
            .as_deref()
            .and_then(|raw| Url::parse(raw).ok())
            .and_then(|url| url.host_str().map(str::to_string));

        let config = EnvConfig::from_lookup(|key| match key {
            ENV_API_ENDPOINT => api_endpoint.clone(),
            ENV_DOMAIN_NAME => cli
                .domain
                .clone()
                .or_else(|| lookup(key))
                .or_else(|| api_host.clone()),
            ENV_HTTP_TIMEOUT_SECS => cli
                .timeout
                .map(|secs| secs.to_string())
                .or_else(|| lookup(key)),
            _ => lookup(key),
        })
        .map_err(|err| CliError::validation(format!("invalid configuration: {err}")))?;

        let metrics = Metrics::new()
            .map_err(|err| CliError::failure(anyhow!("failed to set up metrics: {err}")))?;
        Ok(Self { config, metrics })
    }
}

/// How the acting user is identified for saves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ActorSelector {
    Uuid(String),
    Email(String),
}

/// Application context passed to command handlers.
#[derive(Clone)]
pub(crate) struct AppContext {
    pub(crate) client: Arc<RestClient>,
    pub(crate) config: EnvConfig,
    pub(crate) metrics: Metrics,
    pub(crate) output: OutputFormat,
    pub(crate) actor: Option<ActorSelector>,
}

impl AppContext {
    pub(crate) fn new(cli: &Cli, dependencies: CliDependencies) -> CliResult<Self> {
        let client = RestClient::from_config(&dependencies.config)
            .map_err(|err| CliError::failure(anyhow!("failed to build REST client: {err}")))?
            .with_metrics(dependencies.metrics.clone());
        let actor = match (&cli.actor, &cli.actor_email) {
            (Some(uuid), _) => Some(ActorSelector::Uuid(uuid.clone())),
            (None, Some(email)) => Some(ActorSelector::Email(email.clone())),
            (None, None) => None,
        };
        Ok(Self {
            client: Arc::new(client),
            config: dependencies.config,
            metrics: dependencies.metrics,
            output: cli.output,
            actor,
        })
    }

    pub(crate) fn gateway(&self) -> Arc<dyn RecordGateway> {
        self.client.clone()
    }

    /// Make the selected actor the active one in the loader's store.
    ///
    /// An e-mail that matches nobody leaves the actor unset.
    pub(crate) async fn apply_actor(&self, loader: &DataLoader) -> CliResult<()> {
        match &self.actor {
            Some(ActorSelector::Uuid(uuid)) => {
                set_actor_uuid(loader.store(), uuid);
            }
            Some(ActorSelector::Email(email)) => {
                if loader.resolve_active_actor(email).await?.is_none() {
                    warn!(email = %email, "no actor matches the given e-mail");
                }
            }
            None => {}
        }
        Ok(())
    }
}

fn set_actor_uuid(store: &RecordStore, uuid: &str) {
    let mut actor = Record::new();
    actor.insert(UUID_FIELD.to_string(), Value::String(uuid.to_string()));
    store.set_active_actor(Some(actor));
}

/// Parse the API URL provided to the CLI.
pub(crate) fn parse_url(input: &str) -> Result<Url, String> {
    input
        .parse::<Url>()
        .map_err(|err| format!("invalid URL '{input}': {err}"))
}

/// Parse an actor uuid, normalised to lower case.
pub(crate) fn parse_uuid(input: &str) -> Result<String, String> {
    uuid::Uuid::parse_str(input.trim())
        .map(|uuid| uuid.to_string())
        .map_err(|err| format!("invalid uuid '{input}': {err}"))
}

/// Parse a `key=value` pair. The value may be empty; the key may not.
pub(crate) fn parse_assignment(input: &str) -> Result<(String, String), String> {
    let (key, value) = input
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{input}'"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing key in '{input}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

/// Parse a list filter: `column=value` for equality, `column~pattern` for
/// a case-insensitive match.
pub(crate) fn parse_filter(input: &str) -> Result<Filter, String> {
    let eq = input.find('=');
    let like = input.find('~');
    let (index, ilike) = match (eq, like) {
        (Some(eq), Some(like)) if like < eq => (like, true),
        (Some(eq), _) => (eq, false),
        (None, Some(like)) => (like, true),
        (None, None) => return Err(format!("expected column=value or column~pattern, got '{input}'")),
    };
    let column = input[..index].trim();
    let value = &input[index + 1..];
    if column.is_empty() {
        return Err(format!("missing column in '{input}'"));
    }
    Ok(if ilike {
        Filter::ilike(column, value)
    } else {
        Filter::eq(column, value)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use trowel_test_support::fixtures::env_lookup;

    fn cli(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap_or_else(|err| panic!("{err}"))
    }

    #[test]
    fn exit_codes_split_validation_from_failures() {
        assert_eq!(CliError::validation("bad").exit_code(), 2);
        assert_eq!(CliError::failure(anyhow!("boom")).exit_code(), 3);
        assert_eq!(CliError::validation("bad").display_message(), "bad");
    }

    #[test]
    fn assignments_require_a_key() {
        assert_eq!(
            parse_assignment("title=Bowl = rim"),
            Ok(("title".into(), "Bowl = rim".into()))
        );
        assert_eq!(parse_assignment("note="), Ok(("note".into(), String::new())));
        assert!(parse_assignment("=x").is_err());
        assert!(parse_assignment("title").is_err());
    }

    #[test]
    fn filters_pick_the_first_operator() {
        assert_eq!(parse_filter("site=Ostia"), Ok(Filter::eq("site", "Ostia")));
        assert_eq!(parse_filter("name~%bowl%"), Ok(Filter::ilike("name", "%bowl%")));
        assert_eq!(parse_filter("note~a=b"), Ok(Filter::ilike("note", "a=b")));
        assert!(parse_filter("nothing").is_err());
        assert!(parse_filter("=x").is_err());
    }

    #[test]
    fn actor_uuids_are_normalised() {
        assert_eq!(
            parse_uuid("7B0F3C52-1A7E-4E4B-9E55-2F4B8C1D0A11"),
            Ok("7b0f3c52-1a7e-4e4b-9e55-2f4b8c1d0a11".into())
        );
        assert!(parse_uuid("A-2024-0117").is_err());
    }

    #[test]
    fn flags_override_environment() -> Result<(), CliError> {
        let cli = cli(&[
            "trowel",
            "--api-url",
            "http://flag.example/api",
            "--timeout",
            "5",
            "show",
            "--view",
            "list_finds",
            "abc",
        ]);
        let lookup = env_lookup(&[
            (ENV_API_ENDPOINT, "http://env.example/api"),
            (ENV_HTTP_TIMEOUT_SECS, "60"),
        ]);

        let deps = CliDependencies::from_lookup(&cli, lookup)?;

        assert_eq!(deps.config.api_endpoint.as_str(), "http://flag.example/api/");
        assert_eq!(deps.config.http_timeout.as_secs(), 5);
        assert_eq!(deps.config.domain_name, "flag.example");
        Ok(())
    }

    #[test]
    fn environment_domain_wins_over_api_host() -> Result<(), CliError> {
        let cli = cli(&["trowel", "list", "list_finds"]);
        let lookup = env_lookup(&[
            (ENV_API_ENDPOINT, "http://10.0.0.4:3000/"),
            (ENV_DOMAIN_NAME, "dig.example.org"),
        ]);

        let deps = CliDependencies::from_lookup(&cli, lookup)?;

        assert_eq!(deps.config.domain_name, "dig.example.org");
        assert_eq!(
            deps.config.conversion_endpoint.host_str(),
            Some("dig.example.org")
        );
        Ok(())
    }

    #[test]
    fn missing_api_endpoint_is_a_validation_error() {
        let cli = cli(&["trowel", "list", "list_finds"]);
        let result = CliDependencies::from_lookup(&cli, env_lookup(&[]));
        assert!(matches!(result, Err(CliError::Validation(message)) if message.contains(ENV_API_ENDPOINT)));
    }
}
