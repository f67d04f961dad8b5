//! Top-level CLI definition and dispatch.

use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::{Path, PathBuf};

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell as CompletionShell, generate};
use colored::{Colorize, control};
use serde_json::{Value, json};
use thiserror::Error;

use metric_profile_editor::api::file::FileBackend;
use metric_profile_editor::api::runtime::{EditorSession, list_profiles};
use metric_profile_editor::api::versions::{
    DiffLine, ProfileVersion, VersionComparison, compare_versions, list_versions, version_details,
};
use metric_profile_editor::core::config::Config;
use metric_profile_editor::core::errors::MpeError;
use metric_profile_editor::editor::model::{EditorMode, EditorModel, EditorMsg, Notification, Prompt};
use metric_profile_editor::logger::activity::ActivityLog;

/// Metric profile editor: list, inspect, edit, and version metric profiles.
#[derive(Debug, Parser)]
#[command(
    name = "mpe",
    author,
    version,
    about = "Metric Profile Editor",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Override the data snapshot served by the file backend.
    #[arg(long, global = true, value_name = "PATH")]
    data: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// List metric profiles.
    List(ListArgs),
    /// Show one metric profile with its rows and validation state.
    Show(ShowArgs),
    /// Replay an edit script against a profile and optionally submit it.
    Apply(ApplyArgs),
    /// Delete a metric profile.
    Delete(DeleteArgs),
    /// List the stored versions of a profile.
    Versions(VersionsArgs),
    /// Show one stored version of a profile.
    Version(VersionArgs),
    /// Compare two stored versions of a profile.
    Diff(DiffArgs),
    /// View and validate configuration.
    Config(ConfigArgs),
    /// Generate shell completions.
    Completions(CompletionsArgs),
}

#[derive(Debug, Clone, Args)]
struct ListArgs {
    /// Read from the public endpoints (no session needed).
    #[arg(long)]
    public: bool,
}

#[derive(Debug, Clone, Args)]
struct ShowArgs {
    /// Profile name.
    name: String,
    /// Read-only view through the public endpoints.
    #[arg(long)]
    public: bool,
}

#[derive(Debug, Clone, Args)]
struct ApplyArgs {
    /// Profile to edit; omit together with --new.
    #[arg(required_unless_present = "new", conflicts_with = "new")]
    name: Option<String>,
    /// Start from an empty profile.
    #[arg(long)]
    new: bool,
    /// Save the edited profile as a new one.
    #[arg(long, conflicts_with = "new", requires = "name")]
    clone: bool,
    /// JSON array of edit messages.
    #[arg(long, value_name = "PATH")]
    script: PathBuf,
    /// Submit after the script and skip the confirmation prompt.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Clone, Args)]
struct DeleteArgs {
    /// Profile name.
    name: String,
    /// Skip the confirmation prompt.
    #[arg(long)]
    yes: bool,
}

#[derive(Debug, Clone, Args)]
struct VersionsArgs {
    /// Profile name.
    name: String,
}

#[derive(Debug, Clone, Args)]
struct VersionArgs {
    /// Profile name.
    name: String,
    /// Version identifier.
    version: String,
}

#[derive(Debug, Clone, Args)]
struct DiffArgs {
    /// Profile name.
    name: String,
    /// Newer version.
    version1: String,
    /// Older version.
    version2: String,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    #[command(subcommand)]
    command: Option<ConfigCommand>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum ConfigCommand {
    /// Print the config file path in use.
    Path,
    /// Print the effective configuration.
    Show,
    /// Validate the configuration and print its hash.
    Validate,
}

#[derive(Debug, Clone, Args)]
struct CompletionsArgs {
    /// Shell to generate completions for.
    #[arg(value_enum)]
    shell: CompletionShell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OutputMode {
    Human,
    Json,
}

/// CLI error type with explicit exit-code mapping.
#[derive(Debug, Error)]
pub enum CliError {
    /// Invalid user input at runtime.
    #[error("{0}")]
    User(String),
    /// Environment/runtime failure.
    #[error("{0}")]
    Runtime(String),
    /// Internal bug or invariant violation.
    #[error("{0}")]
    Internal(String),
    /// Operation partially succeeded.
    #[error("{0}")]
    Partial(String),
    /// JSON serialization failed.
    #[error("failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),
    /// Output write failed.
    #[error("failed to write output: {0}")]
    Io(#[from] io::Error),
}

impl CliError {
    /// Process exit code contract for the CLI.
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::User(_) => 1,
            Self::Runtime(_) | Self::Io(_) => 2,
            Self::Internal(_) | Self::Json(_) => 3,
            Self::Partial(_) => 4,
        }
    }
}

impl From<MpeError> for CliError {
    fn from(err: MpeError) -> Self {
        match err {
            MpeError::InvalidConfig { .. }
            | MpeError::MissingConfig { .. }
            | MpeError::ConfigParse { .. }
            | MpeError::SessionInactive
            | MpeError::NotFound { .. }
            | MpeError::PermissionDenied { .. } => Self::User(err.to_string()),
            MpeError::Fetch { .. }
            | MpeError::Serialization { .. }
            | MpeError::UpstreamRejected { .. }
            | MpeError::InternalRejected { .. }
            | MpeError::Io { .. }
            | MpeError::Runtime { .. } => Self::Runtime(err.to_string()),
        }
    }
}

/// Dispatch CLI commands.
pub fn run(cli: &Cli) -> Result<(), CliError> {
    if cli.no_color {
        control::set_override(false);
    }

    match &cli.command {
        Command::List(args) => run_list(cli, args),
        Command::Show(args) => run_show(cli, args),
        Command::Apply(args) => run_apply(cli, args),
        Command::Delete(args) => run_delete(cli, args),
        Command::Versions(args) => run_versions(cli, args),
        Command::Version(args) => run_version(cli, args),
        Command::Diff(args) => run_diff(cli, args),
        Command::Config(args) => run_config(cli, args),
        Command::Completions(args) => {
            let mut command = Cli::command();
            let binary_name = command.get_name().to_string();
            generate(args.shell, &mut command, binary_name, &mut io::stdout());
            Ok(())
        }
    }
}

// ──────────────────── environment ────────────────────

fn load_config(cli: &Cli) -> Result<Config, CliError> {
    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(data) = &cli.data {
        config.paths.data_file.clone_from(data);
    }
    Ok(config)
}

fn open_backend(config: &Config) -> Result<FileBackend, CliError> {
    Ok(FileBackend::open(&config.paths.data_file, config.api.clone())?)
}

// ──────────────────── list / show ────────────────────

fn run_list(cli: &Cli, args: &ListArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let backend = open_backend(&config)?;
    let list = list_profiles(&backend, &config.api, args.public)?;

    match output_mode(cli) {
        OutputMode::Human => {
            if list.profiles.is_empty() {
                println!("No metric profiles.");
            }
            for profile in &list.profiles {
                println!(
                    "{:<32} {:<16} {}",
                    profile.name.bold(),
                    profile.groupname,
                    profile.description
                );
            }
            if list.can_add {
                println!("\n  mpe apply --new --script <PATH> to add a profile");
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "list",
                "public": args.public,
                "profiles": list.profiles,
                "can_add": list.can_add,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_show(cli: &Cli, args: &ShowArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let backend = open_backend(&config)?;
    let mode = if args.public {
        EditorMode::Public
    } else {
        EditorMode::Change
    };
    let session = EditorSession::open(
        &backend,
        &config,
        ActivityLog::open(&config.log),
        mode,
        Some(&args.name),
    )?;
    let model = session.model();

    match output_mode(cli) {
        OutputMode::Human => print_model(model),
        OutputMode::Json => write_json_line(&model_payload("show", model)?)?,
    }
    Ok(())
}

// ──────────────────── apply / delete ────────────────────

fn read_script(path: &Path) -> Result<Vec<EditorMsg>, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| CliError::User(format!("cannot read script {}: {e}", path.display())))?;
    serde_json::from_str(&raw)
        .map_err(|e| CliError::User(format!("invalid script {}: {e}", path.display())))
}

fn run_apply(cli: &Cli, args: &ApplyArgs) -> Result<(), CliError> {
    let script = read_script(&args.script)?;
    let config = load_config(cli)?;
    let backend = open_backend(&config)?;
    let mode = if args.new {
        EditorMode::Add
    } else if args.clone {
        EditorMode::Clone
    } else {
        EditorMode::Change
    };

    let mut session = EditorSession::open(
        &backend,
        &config,
        ActivityLog::open(&config.log),
        mode,
        args.name.as_deref(),
    )?;
    ensure_editable(session.model())?;
    let notified_before = session.model().notifications.len();
    session.run_script(script)?;

    if args.yes && session.model().pending.is_none() {
        session.dispatch(EditorMsg::RequestSubmit)?;
    }
    settle_pending(&mut session, args.yes, cli)?;

    let model = session.into_model();
    finish("apply", cli, &model, notified_before, args.yes)
}

fn run_delete(cli: &Cli, args: &DeleteArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let backend = open_backend(&config)?;
    let mut session = EditorSession::open(
        &backend,
        &config,
        ActivityLog::open(&config.log),
        EditorMode::Change,
        Some(&args.name),
    )?;
    ensure_editable(session.model())?;
    let notified_before = session.model().notifications.len();
    session.dispatch(EditorMsg::RequestDelete)?;
    settle_pending(&mut session, args.yes, cli)?;

    let model = session.into_model();
    finish("delete", cli, &model, notified_before, false)
}

fn ensure_editable(model: &EditorModel) -> Result<(), CliError> {
    if model.is_editable() {
        return Ok(());
    }
    Err(MpeError::PermissionDenied {
        group: model.state.metadata.group_owner.clone(),
    }
    .into())
}

/// Answer an open confirmation dialog, asking on the terminal unless `yes`.
fn settle_pending(
    session: &mut EditorSession<'_, FileBackend>,
    yes: bool,
    cli: &Cli,
) -> Result<(), CliError> {
    let Some(prompt) = session.model().prompt() else {
        return Ok(());
    };
    let confirmed = if yes {
        true
    } else if output_mode(cli) == OutputMode::Json || !io::stdin().is_terminal() {
        return Err(CliError::User(format!(
            "{}: confirmation needed; rerun with --yes",
            prompt.title
        )));
    } else {
        ask(prompt)?
    };
    let answer = if confirmed {
        EditorMsg::Confirm
    } else {
        EditorMsg::Cancel
    };
    session.dispatch(answer)?;
    Ok(())
}

fn ask(prompt: Prompt) -> Result<bool, CliError> {
    print!("{}\n  {} [y/N] ", prompt.title.bold(), prompt.question);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin()
        .read_line(&mut input)
        .map_err(|e| CliError::Runtime(e.to_string()))?;
    Ok(matches!(input.trim().to_lowercase().as_str(), "y" | "yes"))
}

/// Report the session outcome and turn an error notification into an exit code.
fn finish(
    command: &str,
    cli: &Cli,
    model: &EditorModel,
    notified_before: usize,
    submit_requested: bool,
) -> Result<(), CliError> {
    let outcome = model.notifications.get(notified_before..).and_then(<[Notification]>::last);

    match output_mode(cli) {
        OutputMode::Human => {
            print_model(model);
            if let Some(notification) = outcome {
                print_notification(notification);
            }
        }
        OutputMode::Json => {
            let mut payload = model_payload(command, model)?;
            if let (Some(notification), Value::Object(map)) = (outcome, &mut payload) {
                map.insert("notification".to_string(), serde_json::to_value(notification)?);
            }
            write_json_line(&payload)?;
        }
    }

    match outcome {
        Some(n) if n.is_error() && n.partial => {
            Err(CliError::Partial(format!("{}: {}", n.title, n.message)))
        }
        Some(n) if n.is_error() => Err(CliError::Runtime(format!("{}: {}", n.title, n.message))),
        None if submit_requested && !model.errors.is_empty() => Err(CliError::User(format!(
            "form has {} validation error(s); nothing was submitted",
            model.errors.count()
        ))),
        _ => Ok(()),
    }
}

fn model_payload(command: &str, model: &EditorModel) -> Result<Value, CliError> {
    let meta = &model.state.metadata;
    Ok(json!({
        "command": command,
        "mode": model.mode,
        "editable": model.is_editable(),
        "profile": {
            "id": meta.id,
            "name": meta.name,
            "description": meta.description,
            "groupname": meta.group_owner,
            "group_choices": meta.group_choices(),
        },
        "search": {
            "service": model.state.search.service,
            "metric": model.state.search.metric,
        },
        "rows": model.state.visible,
        "total_rows": model.state.full.len(),
        "errors": serde_json::to_value(&model.errors)?,
    }))
}

fn print_model(model: &EditorModel) {
    let meta = &model.state.metadata;
    let name = if meta.name.is_empty() {
        "(unnamed)"
    } else {
        meta.name.as_str()
    };
    println!("{} [{}]", name.bold(), model.mode.label());
    if !meta.description.is_empty() {
        println!("  {}", meta.description);
    }
    println!("  Group: {}", meta.group_owner);
    if !model.is_editable() {
        println!("  {}", "read-only".dimmed());
    }
    if model.state.is_filtered() {
        println!(
            "  Filter: service={:?} metric={:?} ({} of {} rows)",
            model.state.search.service,
            model.state.search.metric,
            model.state.visible.len(),
            model.state.full.len()
        );
    }
    println!();
    for row in &model.state.visible {
        let marker = if row.is_new { "+" } else { " " };
        println!("  {marker}{:>4}  {:<28} {}", row.index, row.service, row.metric);
        if let Some(errors) = model.errors.row(row.index) {
            for message in [errors.dup, errors.service, errors.metric].into_iter().flatten() {
                println!("         {}", message.red());
            }
        }
    }
    for (field, message) in [("name", model.errors.name), ("groupname", model.errors.group_owner)] {
        if let Some(message) = message {
            println!("  {}: {}", field, message.red());
        }
    }
}

fn print_notification(notification: &Notification) {
    let title = if notification.is_error() {
        notification.title.red().bold()
    } else {
        notification.title.green().bold()
    };
    println!("\n{title}: {}", notification.message);
    if notification.partial {
        println!("  {}", "the upstream change was already applied".yellow());
    }
}

// ──────────────────── versions ────────────────────

fn run_versions(cli: &Cli, args: &VersionsArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let backend = open_backend(&config)?;
    let versions = list_versions(&backend, &config.api, &args.name)?;

    match output_mode(cli) {
        OutputMode::Human => {
            for version in &versions {
                println!(
                    "{:>6}  {}  {:<12} {}",
                    version.version.bold(),
                    version.date_created,
                    version.user,
                    version.comment
                );
            }
        }
        OutputMode::Json => {
            let payload = json!({
                "command": "versions",
                "name": args.name,
                "versions": versions,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn run_version(cli: &Cli, args: &VersionArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let backend = open_backend(&config)?;
    let version = version_details(&backend, &config.api, &args.name, &args.version)?;

    match output_mode(cli) {
        OutputMode::Human => print_version(&version),
        OutputMode::Json => {
            let payload = json!({
                "command": "version",
                "version": version,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn print_version(version: &ProfileVersion) {
    let fields = &version.fields;
    println!("{} @ {}", fields.name.bold(), version.version);
    println!("  Created: {} by {}", version.date_created, version.user);
    println!("  Group: {}", fields.groupname);
    if !fields.description.is_empty() {
        println!("  Description: {}", fields.description);
    }
    println!();
    for instance in &fields.metricinstances {
        println!("  {:<28} {}", instance.service, instance.metric);
    }
}

fn run_diff(cli: &Cli, args: &DiffArgs) -> Result<(), CliError> {
    let config = load_config(cli)?;
    let backend = open_backend(&config)?;
    let comparison = compare_versions(
        &backend,
        &config.api,
        &args.name,
        &args.version1,
        &args.version2,
    )?;

    match output_mode(cli) {
        OutputMode::Human => print_comparison(&comparison),
        OutputMode::Json => {
            let payload = json!({
                "command": "diff",
                "identical": comparison.is_identical(),
                "comparison": comparison,
            });
            write_json_line(&payload)?;
        }
    }
    Ok(())
}

fn print_comparison(comparison: &VersionComparison) {
    println!(
        "{}: {} vs {}",
        comparison.name.bold(),
        comparison.version1,
        comparison.version2
    );
    if comparison.is_identical() {
        println!("  versions are identical");
        return;
    }
    for diff in &comparison.fields {
        println!("\n  {}", diff.field.bold());
        println!("  {}", format!("- {}", diff.old).red());
        println!("  {}", format!("+ {}", diff.new).green());
    }
    if let Some(lines) = &comparison.metric_instances {
        println!("\n  {}", "metric instances".bold());
        for line in lines {
            match line {
                DiffLine::Same(text) => println!("    {text}"),
                DiffLine::Removed(text) => println!("  {}", format!("- {text}").red()),
                DiffLine::Added(text) => println!("  {}", format!("+ {text}").green()),
            }
        }
    }
}

// ──────────────────── config ────────────────────

fn run_config(cli: &Cli, args: &ConfigArgs) -> Result<(), CliError> {
    match args.command {
        None | Some(ConfigCommand::Path) => {
            let path = cli.config.clone().unwrap_or_else(Config::default_path);
            let exists = path.exists();

            match output_mode(cli) {
                OutputMode::Human => {
                    println!("{}", path.display());
                    if !exists {
                        println!("  (file does not exist; defaults will be used)");
                    }
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config path",
                        "path": path.to_string_lossy(),
                        "exists": exists,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Show) => {
            let config = load_config(cli)?;

            match output_mode(cli) {
                OutputMode::Human => {
                    let toml_str = toml::to_string_pretty(&config)
                        .map_err(|e| CliError::Runtime(format!("serialize config: {e}")))?;
                    println!("{toml_str}");
                }
                OutputMode::Json => {
                    let payload = json!({
                        "command": "config show",
                        "config": serde_json::to_value(&config)?,
                    });
                    write_json_line(&payload)?;
                }
            }
            Ok(())
        }
        Some(ConfigCommand::Validate) => match load_config(cli) {
            Ok(config) => {
                let hash = config.stable_hash()?;

                match output_mode(cli) {
                    OutputMode::Human => {
                        println!("Configuration is valid.");
                        println!("  Source: {}", config.paths.config_file.display());
                        println!("  Hash: {hash}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": true,
                            "path": config.paths.config_file.to_string_lossy(),
                            "hash": hash,
                        });
                        write_json_line(&payload)?;
                    }
                }
                Ok(())
            }
            Err(e) => {
                match output_mode(cli) {
                    OutputMode::Human => {
                        eprintln!("Configuration is INVALID: {e}");
                    }
                    OutputMode::Json => {
                        let payload = json!({
                            "command": "config validate",
                            "valid": false,
                            "error": e.to_string(),
                        });
                        write_json_line(&payload)?;
                    }
                }
                Err(e)
            }
        },
    }
}

// ──────────────────── output ────────────────────

fn write_json_line(payload: &Value) -> Result<(), CliError> {
    let mut stdout = io::stdout().lock();
    serde_json::to_writer(&mut stdout, payload)?;
    writeln!(stdout)?;
    Ok(())
}

fn output_mode(cli: &Cli) -> OutputMode {
    let env_mode = std::env::var("MPE_OUTPUT_FORMAT").ok();
    resolve_output_mode(cli.json, env_mode.as_deref(), io::stdout().is_terminal())
}

fn resolve_output_mode(json_flag: bool, env_mode: Option<&str>, stdout_is_tty: bool) -> OutputMode {
    if json_flag {
        return OutputMode::Json;
    }

    let fallback = if stdout_is_tty {
        OutputMode::Human
    } else {
        OutputMode::Json
    };

    match env_mode
        .map(str::trim)
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("json") => OutputMode::Json,
        Some("human") => OutputMode::Human,
        _ => fallback,
    }
}
