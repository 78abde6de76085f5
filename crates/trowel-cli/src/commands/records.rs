//! Record commands: reading rows and running screen actions.

use anyhow::{Context, anyhow};
use serde_json::Value;
use tracing::{debug, info};
use trowel_crud::edit::apply_input;
use trowel_crud::{ActionKind, DataLoader, LoadOutcome, Record, RecordStore, ScreenSession};
use trowel_rest::ResourcePath;

use crate::cli::{ListArgs, LookupArgs, SaveArgs, ScreenArgs, ShowArgs};
use crate::client::{AppContext, CliError, CliResult};
use crate::output::{format_lookups, format_outcome, format_record, format_records, render};

pub(crate) async fn handle_show(ctx: &AppContext, args: ShowArgs) -> CliResult<()> {
    let loader = DataLoader::new(ctx.gateway(), RecordStore::new());
    let record = load_record(&loader, &args.view, &args.id).await?;
    render(&format_record(&record, ctx.output)?);
    Ok(())
}

pub(crate) async fn handle_list(ctx: &AppContext, args: ListArgs) -> CliResult<()> {
    let path = args
        .filters
        .into_iter()
        .fold(ResourcePath::new(args.path), ResourcePath::filter)
        .to_string();
    let loader = DataLoader::new(ctx.gateway(), RecordStore::new());
    let records = loader.load_all(Some(path.as_str())).await?.unwrap_or_default();
    render(&format_records(&records, ctx.output)?);
    Ok(())
}

pub(crate) async fn handle_lookups(ctx: &AppContext, args: LookupArgs) -> CliResult<()> {
    let sources: Vec<(&str, &str)> = args
        .sources
        .iter()
        .map(|(name, path)| (name.as_str(), path.as_str()))
        .collect();
    let loader = DataLoader::new(ctx.gateway(), RecordStore::new());
    let lookups = loader.load_reference_data(&sources).await?;
    render(&format_lookups(&lookups, ctx.output)?);
    Ok(())
}

pub(crate) async fn handle_save(ctx: &AppContext, args: SaveArgs) -> CliResult<()> {
    let merged = match &args.file {
        Some(path) => read_fields(path).await?,
        None => Record::new(),
    };
    let assignments = args.assignments;
    run_screen_action(ctx, &args.screen, Some(args.id.as_str()), ActionKind::Save, |store| {
        let edited = store.update(|record| {
            record.extend(merged);
            for (name, raw) in &assignments {
                apply_input(record, name, raw);
            }
        });
        if edited {
            Ok(())
        } else {
            Err(CliError::failure(anyhow!("no record loaded to edit")))
        }
    })
    .await
}

pub(crate) async fn handle_action(
    ctx: &AppContext,
    screen: &ScreenArgs,
    id: Option<&str>,
    action: ActionKind,
) -> CliResult<()> {
    run_screen_action(ctx, screen, id, action, |_| Ok(())).await
}

/// Spawn a session for `screen`, load `id` into it, apply `edit`, and run
/// `action`. An error notification maps to a failure exit.
async fn run_screen_action<F>(
    ctx: &AppContext,
    screen: &ScreenArgs,
    id: Option<&str>,
    action: ActionKind,
    edit: F,
) -> CliResult<()>
where
    F: FnOnce(&RecordStore) -> CliResult<()>,
{
    let session = ScreenSession::builder(screen.config(), ctx.gateway())
        .metrics(ctx.metrics.clone())
        .spawn();
    let store = session.store().clone();
    let prepared = prepare(ctx, &session, screen, id, edit).await;
    let outcome = match prepared {
        Ok(()) => session.handle().request_and_wait(action).await,
        Err(err) => {
            shutdown(session).await;
            return Err(err);
        }
    };
    shutdown(session).await;
    let outcome = outcome?;

    let shown = store.current().or_else(|| outcome.record.clone());
    render(&format_outcome(&outcome, shown.as_ref(), ctx.output)?);
    if outcome.succeeded() {
        Ok(())
    } else {
        Err(CliError::failure(anyhow!(outcome.notification.message_text)))
    }
}

async fn prepare<F>(
    ctx: &AppContext,
    session: &ScreenSession,
    screen: &ScreenArgs,
    id: Option<&str>,
    edit: F,
) -> CliResult<()>
where
    F: FnOnce(&RecordStore) -> CliResult<()>,
{
    let loader = session.loader();
    ctx.apply_actor(&loader).await?;
    if let Some(id) = id {
        let _ = load_record(&loader, &screen.view, id).await?;
    }
    edit(session.store())
}

async fn shutdown(session: ScreenSession) {
    let screen = session.config().name.clone();
    if let Err(err) = session.shutdown().await {
        debug!(screen = %screen, error = %err, "session already stopped");
    }
}

async fn load_record(loader: &DataLoader, view: &str, id: &str) -> CliResult<Record> {
    match loader.load_current(Some(id), view).await? {
        LoadOutcome::Loaded(Some(record)) => {
            info!(view, id, "record loaded");
            Ok(record)
        }
        _ => Err(CliError::failure(anyhow!("no record {id} in {view}"))),
    }
}

async fn read_fields(path: &std::path::Path) -> CliResult<Record> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
        .map_err(CliError::failure)?;
    match serde_json::from_str::<Value>(&text) {
        Ok(Value::Object(fields)) => Ok(fields),
        Ok(_) => Err(CliError::validation(format!(
            "{} must hold a JSON object",
            path.display()
        ))),
        Err(err) => Err(CliError::validation(format!(
            "{} is not valid JSON: {err}",
            path.display()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::OutputFormat;
    use crate::client::{ActorSelector, CliDependencies};
    use httpmock::prelude::*;
    use serde_json::json;
    use std::sync::Arc;
    use trowel_config::EnvConfig;
    use trowel_rest::RestClient;
    use trowel_telemetry::Metrics;
    use trowel_test_support::fixtures::{
        ACTOR_EMAIL, ACTOR_UUID, FIND_UUID, actor_record, find_record, rows,
    };
    use trowel_test_support::postgrest::PostgrestMock;

    fn context(mock: &PostgrestMock, actor: Option<ActorSelector>) -> AppContext {
        let config = EnvConfig::for_api(mock.api_url(), "dig.example.org");
        let metrics = Metrics::new().unwrap_or_else(|err| panic!("metrics: {err}"));
        let deps = CliDependencies { config, metrics };
        let client = RestClient::from_config(&deps.config)
            .unwrap_or_else(|err| panic!("client: {err}"))
            .with_metrics(deps.metrics.clone());
        AppContext {
            client: Arc::new(client),
            config: deps.config,
            metrics: deps.metrics,
            output: OutputFormat::Json,
            actor,
        }
    }

    fn screen(edit: Option<&str>) -> ScreenArgs {
        ScreenArgs {
            view: "list_finds".into(),
            edit: edit.map(str::to_string),
            route_type: None,
        }
    }

    #[tokio::test]
    async fn show_reports_missing_rows_as_failure() {
        let mock = PostgrestMock::start().await;
        let select = mock.expect_select("list_finds", FIND_UUID, json!([]));
        let ctx = context(&mock, None);

        let result = handle_show(
            &ctx,
            ShowArgs {
                view: "list_finds".into(),
                id: FIND_UUID.into(),
            },
        )
        .await;

        select.assert();
        assert!(matches!(result, Err(ref err) if err.exit_code() == 3));
    }

    #[tokio::test]
    async fn save_stamps_actor_and_patches_edit_table() -> CliResult<()> {
        let mock = PostgrestMock::start().await;
        let select = mock.expect_select("list_finds", FIND_UUID, rows([find_record()]));
        let actor = mock.server().mock(|when, then| {
            when.method(GET)
                .path("/edit_actor")
                .query_param("email", format!("ilike.{ACTOR_EMAIL}"));
            then.status(200).json_body(rows([actor_record()]));
        });
        let update = mock.expect_update("edit_find", FIND_UUID, rows([find_record()]));
        let ctx = context(&mock, Some(ActorSelector::Email(ACTOR_EMAIL.into())));

        handle_save(
            &ctx,
            SaveArgs {
                screen: screen(Some("edit_find")),
                id: FIND_UUID.into(),
                assignments: vec![("title".into(), "Rim sherd, burnt".into())],
                file: None,
            },
        )
        .await?;

        select.assert();
        actor.assert();
        update.assert();
        assert_eq!(ctx.metrics.action_count("save", "success"), 1);
        Ok(())
    }

    #[tokio::test]
    async fn save_without_loaded_record_never_patches() {
        let mock = PostgrestMock::start().await;
        let _select = mock.expect_select("list_finds", FIND_UUID, json!([]));
        let update = mock.expect_update("edit_find", FIND_UUID, json!([]));
        let ctx = context(&mock, Some(ActorSelector::Uuid(ACTOR_UUID.into())));

        let result = handle_save(
            &ctx,
            SaveArgs {
                screen: screen(Some("edit_find")),
                id: FIND_UUID.into(),
                assignments: Vec::new(),
                file: None,
            },
        )
        .await;

        assert!(result.is_err());
        update.assert_hits(0);
    }

    #[tokio::test]
    async fn delete_failure_maps_to_failure_exit() {
        let mock = PostgrestMock::start().await;
        let _select = mock.expect_select("list_finds", FIND_UUID, rows([find_record()]));
        let delete = mock.expect_failure(
            httpmock::Method::DELETE,
            "edit_find",
            409,
            "still referenced",
        );
        let ctx = context(&mock, None);

        let result = handle_action(
            &ctx,
            &screen(Some("edit_find")),
            Some(FIND_UUID),
            ActionKind::Delete,
        )
        .await;

        delete.assert();
        let Err(err) = result else {
            panic!("expected a failure");
        };
        assert_eq!(err.exit_code(), 3);
        assert!(err.display_message().contains("still referenced"));
        assert_eq!(ctx.metrics.action_count("delete", "error"), 1);
    }

    #[tokio::test]
    async fn new_on_read_only_screen_fails_without_requests() {
        let mock = PostgrestMock::start().await;
        let ctx = context(&mock, None);

        let result = handle_action(&ctx, &screen(None), None, ActionKind::New).await;

        assert!(result.is_err());
        assert_eq!(ctx.metrics.action_count("new", "error"), 1);
        let rendered = ctx.metrics.render().unwrap_or_default();
        assert!(!rendered.contains("rest_requests_total{"));
    }

    #[tokio::test]
    async fn list_applies_filters() -> CliResult<()> {
        let mock = PostgrestMock::start().await;
        let list = mock.server().mock(|when, then| {
            when.method(GET)
                .path("/list_finds")
                .query_param("material", "eq.ceramic");
            then.status(200).json_body(rows([find_record()]));
        });
        let ctx = context(&mock, None);

        handle_list(
            &ctx,
            ListArgs {
                path: "list_finds".into(),
                filters: vec![trowel_rest::Filter::eq("material", "ceramic")],
            },
        )
        .await?;

        list.assert();
        Ok(())
    }
}
