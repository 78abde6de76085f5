//! Command-line host for record screens.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tracing::{debug, error};
use trowel_crud::{ActionKind, ResourceBinding, ScreenConfig};
use trowel_telemetry::{
    GlobalContextGuard, LoggingConfig, build_sha, init_logging, log_format_from_str,
};
use url::Url;
use uuid::Uuid;

use crate::client::{
    AppContext, CliDependencies, CliResult, parse_assignment, parse_filter, parse_url, parse_uuid,
};
use crate::commands::media::{handle_orcid, handle_upload};
use crate::commands::records::{
    handle_action, handle_list, handle_lookups, handle_save, handle_show,
};

/// Parses CLI arguments, executes the requested command, and reports the
/// outcome on stderr. Returns the process exit code.
pub async fn run() -> i32 {
    let cli = Cli::parse();
    let command_name = command_label(&cli.command);
    let deps = match CliDependencies::from_env(&cli) {
        Ok(deps) => deps,
        Err(err) => {
            eprintln!("error: {}", err.display_message());
            return err.exit_code();
        }
    };

    let logging = LoggingConfig {
        level: &deps.config.log_level,
        format: log_format_from_str(deps.config.log_format.as_deref()),
        build_sha: build_sha(),
    };
    if let Err(err) = init_logging(&logging) {
        eprintln!("warning: logging disabled: {err}");
    }
    let _context = GlobalContextGuard::new("cli");

    let result = match AppContext::new(&cli, deps) {
        Ok(ctx) => dispatch(&ctx, cli.command).await,
        Err(err) => Err(err),
    };

    match result {
        Ok(()) => {
            debug!(command = command_name, "command completed");
            0
        }
        Err(err) => {
            let exit_code = err.exit_code();
            let message = err.display_message();
            error!(command = command_name, exit_code, "command failed");
            eprintln!("error: {message}");
            exit_code
        }
    }
}

pub(crate) async fn dispatch(ctx: &AppContext, command: Command) -> CliResult<()> {
    match command {
        Command::Show(args) => handle_show(ctx, args).await,
        Command::List(args) => handle_list(ctx, args).await,
        Command::Lookups(args) => handle_lookups(ctx, args).await,
        Command::New(args) => handle_action(ctx, &args.screen, None, ActionKind::New).await,
        Command::Save(args) => handle_save(ctx, args).await,
        Command::Revert(args) => {
            handle_action(ctx, &args.screen, Some(args.id.as_str()), ActionKind::Revert).await
        }
        Command::Delete(args) => {
            handle_action(ctx, &args.screen, Some(args.id.as_str()), ActionKind::Delete).await
        }
        Command::Upload(args) => handle_upload(ctx, args).await,
        Command::Orcid(args) => handle_orcid(ctx, args).await,
    }
}

#[derive(Parser)]
#[command(
    name = "trowel",
    version,
    about = "Create, edit, and remove records through the resource API"
)]
pub(crate) struct Cli {
    #[arg(
        long,
        global = true,
        value_parser = parse_url,
        help = "Root of the resource API (overrides TROWEL_API_ENDPOINT)"
    )]
    pub(crate) api_url: Option<Url>,
    #[arg(
        long,
        global = true,
        help = "Public domain name (overrides TROWEL_DOMAIN_NAME)"
    )]
    pub(crate) domain: Option<String>,
    #[arg(
        long,
        global = true,
        help = "HTTP timeout in seconds (overrides TROWEL_HTTP_TIMEOUT_SECS)"
    )]
    pub(crate) timeout: Option<u64>,
    #[arg(
        long = "output",
        alias = "format",
        global = true,
        value_enum,
        default_value_t = OutputFormat::Table,
        help = "Select output format for commands that render structured data"
    )]
    pub(crate) output: OutputFormat,
    #[arg(
        long,
        global = true,
        value_parser = parse_uuid,
        help = "Uuid of the acting user, stamped into updated_by on save"
    )]
    pub(crate) actor: Option<String>,
    #[arg(
        long,
        global = true,
        conflicts_with = "actor",
        help = "E-mail of the acting user, resolved against the actor table"
    )]
    pub(crate) actor_email: Option<String>,
    #[command(subcommand)]
    pub(crate) command: Command,
}

#[derive(Subcommand)]
pub(crate) enum Command {
    /// Print one record.
    Show(ShowArgs),
    /// Print the rows of a resource.
    List(ListArgs),
    /// Fetch several lookup lists at once.
    Lookups(LookupArgs),
    /// Create a record and print where it lives.
    New(NewArgs),
    /// Apply edits to a record and save it.
    Save(SaveArgs),
    /// Discard local state and print the stored record.
    Revert(RecordArgs),
    /// Delete a record.
    Delete(RecordArgs),
    /// Send a media file to the conversion service.
    Upload(UploadArgs),
    /// Look up a public ORCID record.
    Orcid(OrcidArgs),
}

/// Resources a screen reads from and writes to.
#[derive(Args, Debug, Clone)]
pub(crate) struct ScreenArgs {
    #[arg(long, help = "Read view, e.g. list_finds")]
    pub(crate) view: String,
    #[arg(long, help = "Writable table; omit for read-only screens")]
    pub(crate) edit: Option<String>,
    #[arg(long, help = "Sub-route new records are opened under")]
    pub(crate) route_type: Option<String>,
}

impl ScreenArgs {
    pub(crate) fn config(&self) -> ScreenConfig {
        let binding = self.edit.as_ref().map_or_else(
            || ResourceBinding::read_only(self.view.clone()),
            |edit| ResourceBinding::new(self.view.clone(), edit.clone()),
        );
        let config = ScreenConfig::new(self.view.clone(), binding);
        match &self.route_type {
            Some(route_type) => config.with_route_type(route_type.clone()),
            None => config,
        }
    }
}

#[derive(Args, Debug)]
pub(crate) struct ShowArgs {
    #[arg(long, help = "Read view, e.g. list_finds")]
    pub(crate) view: String,
    #[arg(help = "Record uuid")]
    pub(crate) id: String,
}

#[derive(Args, Debug)]
pub(crate) struct ListArgs {
    #[arg(help = "Resource to list")]
    pub(crate) path: String,
    #[arg(
        long = "where",
        value_parser = parse_filter,
        help = "Filter as column=value or column~pattern; repeatable"
    )]
    pub(crate) filters: Vec<trowel_rest::Filter>,
}

#[derive(Args, Debug)]
pub(crate) struct LookupArgs {
    #[arg(
        long = "source",
        value_parser = parse_assignment,
        required = true,
        help = "Lookup as name=resource; repeatable"
    )]
    pub(crate) sources: Vec<(String, String)>,
}

#[derive(Args, Debug)]
pub(crate) struct NewArgs {
    #[command(flatten)]
    pub(crate) screen: ScreenArgs,
}

#[derive(Args, Debug)]
pub(crate) struct RecordArgs {
    #[command(flatten)]
    pub(crate) screen: ScreenArgs,
    #[arg(help = "Record uuid")]
    pub(crate) id: String,
}

#[derive(Args, Debug)]
pub(crate) struct SaveArgs {
    #[command(flatten)]
    pub(crate) screen: ScreenArgs,
    #[arg(help = "Record uuid")]
    pub(crate) id: String,
    #[arg(
        long = "set",
        value_parser = parse_assignment,
        help = "Field edit as name=value; JSON values are stored as JSON; repeatable"
    )]
    pub(crate) assignments: Vec<(String, String)>,
    #[arg(long, help = "JSON object whose fields are merged into the record")]
    pub(crate) file: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub(crate) struct UploadArgs {
    #[arg(help = "File to upload")]
    pub(crate) file: PathBuf,
    #[arg(long, help = "Media uuid (defaults to a random one)")]
    pub(crate) uuid: Option<Uuid>,
    #[arg(long)]
    pub(crate) media_type: Option<String>,
    #[arg(long)]
    pub(crate) media_type_uuid: Option<String>,
    #[arg(long)]
    pub(crate) creator: Option<String>,
    #[arg(long)]
    pub(crate) captured_at: Option<String>,
    #[arg(long)]
    pub(crate) license: Option<String>,
    #[arg(long)]
    pub(crate) description: Option<String>,
    #[arg(long)]
    pub(crate) parent_type: Option<String>,
    #[arg(long)]
    pub(crate) parent: Option<String>,
    #[arg(
        long,
        value_parser = parse_url,
        help = "Conversion endpoint (overrides TROWEL_CONVERSION_ENDPOINT)"
    )]
    pub(crate) endpoint: Option<Url>,
}

#[derive(Args, Debug)]
pub(crate) struct OrcidArgs {
    #[arg(help = "ORCID iD, e.g. 0000-0002-1825-0097")]
    pub(crate) id: String,
    #[arg(long, help = "Fetch through the configured redirect endpoint")]
    pub(crate) via_redirect: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    Table,
    Json,
}

const fn command_label(command: &Command) -> &'static str {
    match command {
        Command::Show(_) => "show",
        Command::List(_) => "list",
        Command::Lookups(_) => "lookups",
        Command::New(_) => "new",
        Command::Save(_) => "save",
        Command::Revert(_) => "revert",
        Command::Delete(_) => "delete",
        Command::Upload(_) => "upload",
        Command::Orcid(_) => "orcid",
    }
}
