//! Command dispatch: each subcommand maps to a service call

use std::io;
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::application::services::RequestOptions;
use crate::cli::args::{Cli, Commands, ConfigCommands, RequestArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::{normalize_expression, parse_arguments, FrontendUser, Node};
use crate::exitcode;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Run the parsed command line; returns the process exit code.
pub fn execute_command(cli: &Cli) -> CliResult<i32> {
    let Some(command) = &cli.command else {
        let mut cmd = Cli::command();
        cmd.print_help().map_err(|e| InfraError::io("print help", e))?;
        return Ok(exitcode::USAGE);
    };

    match command {
        Commands::Normalize { expression } => {
            output::info(&normalize_expression(expression));
            Ok(exitcode::OK)
        }
        Commands::Args { call } => cmd_args(call),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(exitcode::OK)
        }
        Commands::Config {
            command: ConfigCommands::Template,
        } => {
            output::info(&Settings::template());
            Ok(exitcode::OK)
        }
        Commands::Config {
            command: ConfigCommands::Path,
        } => cmd_config_path(cli.config.as_deref()),
        _ => {
            let settings = Settings::load(cli.config.as_deref())?;
            let container = ServiceContainer::new(settings);
            execute_with_services(command, &container)
        }
    }
}

/// Commands that need settings and services.
pub fn execute_with_services(command: &Commands, container: &ServiceContainer) -> CliResult<i32> {
    match command {
        Commands::Match {
            expression,
            request,
        } => cmd_match(container, expression, request),
        Commands::Resolve { file, path, tree } => {
            cmd_resolve(container, file.as_deref(), path.as_deref(), *tree)
        }
        Commands::Elements {
            file,
            path,
            element,
            partial_type,
            class,
            scope,
        } => cmd_elements(
            container,
            file.as_deref(),
            path.as_deref(),
            element.as_deref(),
            partial_type.as_deref(),
            class.as_deref().map(|c| (c, scope.as_str())),
        ),
        Commands::Config {
            command: ConfigCommands::Show,
        } => {
            output::info(&container.settings.to_toml()?);
            Ok(exitcode::OK)
        }
        Commands::Normalize { .. }
        | Commands::Args { .. }
        | Commands::Completion { .. }
        | Commands::Config { .. } => Ok(exitcode::OK),
    }
}

impl From<&RequestArgs> for RequestOptions {
    fn from(args: &RequestArgs) -> Self {
        RequestOptions {
            remote_addr: args.ip.clone(),
            forwarded_for: args.forwarded_for.clone(),
            hostname: args.hostname.clone(),
            application_context: args.context.clone(),
            now: args.now,
            accept_language: args.language.clone(),
            user: args.user.map(|id| FrontendUser {
                id,
                groups: args.groups.clone(),
            }),
        }
    }
}

#[instrument(level = "debug", skip(container))]
fn cmd_match(container: &ServiceContainer, expression: &str, request: &RequestArgs) -> CliResult<i32> {
    let matched = container
        .condition_service()
        .match_condition(expression, RequestOptions::from(request))?;
    output::verdict(matched);
    Ok(if matched { exitcode::OK } else { exitcode::NOMATCH })
}

fn cmd_args(call: &str) -> CliResult<i32> {
    let parsed = parse_arguments(call);
    if parsed.name.is_empty() {
        return Err(CliError::InvalidArgs(format!(
            "expected a call like 'name(arg, ...)': {:?}",
            call
        )));
    }
    output::header(&parsed.name);
    for (i, arg) in parsed.arguments.iter().enumerate() {
        output::detail(&format!("{}: {} ({})", i, arg, arg.type_name()));
    }
    Ok(exitcode::OK)
}

#[instrument(level = "debug", skip(container))]
fn cmd_resolve(
    container: &ServiceContainer,
    file: Option<&Path>,
    path: Option<&str>,
    as_tree: bool,
) -> CliResult<i32> {
    let service = container.tree_service();
    let file = service.tree_file(file)?;
    let resolved = service.resolve_file(&file, path)?;
    debug!("resolved {} top-level keys", resolved.len());

    if as_tree {
        let label = path.map(String::from).unwrap_or_else(|| file.display().to_string());
        output::info(&output::render_tree(&label, &resolved).trim_end());
    } else {
        let prefix = path.map(|p| format!("{}.", p)).unwrap_or_default();
        for (key, value) in resolved.flatten() {
            output::assignment(&format!("{}{}", prefix, key), &value);
        }
    }
    Ok(exitcode::OK)
}

#[instrument(level = "debug", skip(container))]
fn cmd_elements(
    container: &ServiceContainer,
    file: Option<&Path>,
    path: Option<&str>,
    element: Option<&str>,
    partial_type: Option<&str>,
    class: Option<(&str, &str)>,
) -> CliResult<i32> {
    let service = container.tree_service();
    let file = service.tree_file(file)?;
    let registry = service.element_registry(&file, path)?;

    if let Some((name, scope)) = class {
        return match registry.registered_class_name(name, scope) {
            Some(class_name) => {
                output::info(&class_name);
                Ok(exitcode::OK)
            }
            None => {
                output::warning(&format!("no class registered for {:?} in {}", name, scope));
                Ok(exitcode::NOMATCH)
            }
        };
    }

    match element {
        None => {
            output::header("Registered elements");
            for element_type in registry.registered_element_types() {
                output::detail(element_type);
            }
        }
        Some(element) => {
            output::header(element);
            for (name, value) in registry.model_defined_html_attributes(element) {
                match value {
                    Some(v) => output::detail(&format!("{} = {}", name, v)),
                    None => output::detail(&name),
                }
            }
            let template = registry.default_fluid_template(element, partial_type);
            if !template.is_empty() {
                output::assignment("template", &template);
            }
            if let Some(Node::Value(v)) = registry.model_configuration_by_scope(element, "className") {
                output::assignment("className", v);
            }
        }
    }
    Ok(exitcode::OK)
}

fn cmd_config_path(local: Option<&Path>) -> CliResult<i32> {
    match global_config_path() {
        Some(path) => output::assignment("global", &path.display()),
        None => output::warning("cannot determine global config directory"),
    }
    let local = local
        .map(Path::to_path_buf)
        .unwrap_or_else(|| local_config_path(Path::new(".")));
    if local.exists() {
        output::assignment("local", &local.display());
    } else {
        output::assignment("local", &format!("{} (not found)", local.display()));
    }
    Ok(exitcode::OK)
}
