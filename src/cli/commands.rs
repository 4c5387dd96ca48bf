//! Command dispatch: maps parsed arguments onto services

use std::io::{self, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::generate;
use tracing::{debug, instrument};

use crate::cli::args::{Cli, Commands, ConfigCommands};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::config::{global_config_path, local_config_path, Settings};
use crate::exitcode;
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;

/// Run the selected command and return the process exit code.
#[instrument(level = "debug", skip(cli))]
pub fn execute_command(cli: &Cli) -> CliResult<i32> {
    match &cli.command {
        Commands::Merge {
            dir,
            output,
            emit_defines,
        } => cmd_merge(dir, output.as_deref(), *emit_defines),
        Commands::Parse { file } => cmd_parse(file),
        Commands::Check { dir } => cmd_check(dir),
        Commands::Defines { dir } => cmd_defines(dir),
        Commands::Files { dir } => cmd_files(dir),
        Commands::Config { dir, command } => cmd_config(dir.as_deref(), command),
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(*shell, &mut cmd, name, &mut io::stdout());
            Ok(exitcode::OK)
        }
    }
}

fn container_for(dir: Option<&Path>) -> CliResult<ServiceContainer> {
    let settings = Settings::load(dir)?;
    debug!("settings: {:?}", settings);
    Ok(ServiceContainer::new(settings))
}

/// Write rendered text to stdout.
fn emit(text: &str) -> CliResult<()> {
    let mut stdout = io::stdout().lock();
    stdout
        .write_all(text.as_bytes())
        .and_then(|()| stdout.flush())
        .map_err(|source| InfraError::Io {
            context: "write to stdout".into(),
            source,
        })?;
    Ok(())
}

fn cmd_merge(dir: &Path, output: Option<&Path>, emit_defines: bool) -> CliResult<i32> {
    let mut settings = Settings::load(Some(dir))?;
    if emit_defines {
        settings.emit_defines = true;
    }
    let container = ServiceContainer::new(settings);
    let target = output.unwrap_or(container.settings.output_file.as_path());
    if container.fs.is_dir(target) {
        return Err(CliError::Usage(format!(
            "output target is a directory: {}",
            target.display()
        )));
    }

    let report = container.scripts.write_merged(dir, target)?;

    for diagnostic in &report.diagnostics {
        output::warning(diagnostic);
    }
    output::success(&format!(
        "merged {} files into {} ({} roots, {} defines)",
        report.files,
        report.output.display(),
        report.roots,
        report.defines
    ));
    Ok(exitcode::OK)
}

fn cmd_parse(file: &Path) -> CliResult<i32> {
    let container = container_for(file.parent())?;
    if container.fs.exists(file) && !container.fs.is_file(file) {
        return Err(CliError::Usage(format!("not a file: {}", file.display())));
    }
    let parsed = container.scripts.parse_file(file)?;

    for diagnostic in &parsed.diagnostics {
        output::warning(diagnostic);
    }
    emit(&container.scripts.render(&parsed.forest))?;
    Ok(exitcode::OK)
}

fn cmd_check(dir: &Path) -> CliResult<i32> {
    let container = container_for(Some(dir))?;
    let loaded = container.scripts.load(dir)?;

    if loaded.diagnostics.is_empty() {
        output::success(&format!("{} files, no problems", loaded.files.len()));
        return Ok(exitcode::OK);
    }
    for diagnostic in &loaded.diagnostics {
        output::failure(diagnostic);
    }
    output::warning(&format!(
        "{} problems in {} files",
        loaded.diagnostics.len(),
        loaded.files.len()
    ));
    Ok(exitcode::DATAERR)
}

fn cmd_defines(dir: &Path) -> CliResult<i32> {
    let container = container_for(Some(dir))?;
    let loaded = container.scripts.load(dir)?;

    for define in &loaded.forest.defines {
        output::info(&format!("{}\t{}", define, define.source.display()));
    }
    Ok(exitcode::OK)
}

fn cmd_files(dir: &Path) -> CliResult<i32> {
    let container = container_for(Some(dir))?;
    for file in container.scripts.discover(dir)? {
        output::info(&file.display());
    }
    Ok(exitcode::OK)
}

fn cmd_config(dir: Option<&Path>, command: &ConfigCommands) -> CliResult<i32> {
    match command {
        ConfigCommands::Show => {
            let settings = Settings::load(dir)?;
            emit(&settings.to_toml()?)?;
        }
        ConfigCommands::Path => {
            output::header("Config files (lowest to highest precedence)");
            match global_config_path() {
                Some(path) => output::detail(&describe_path("global", &path)),
                None => output::detail(&"global: <no config directory>"),
            }
            if let Some(dir) = dir {
                output::detail(&describe_path("local", &local_config_path(dir)));
            }
            output::detail(&"env: PDXMERGE_* variables");
        }
        ConfigCommands::Init => {
            emit(&Settings::template())?;
        }
    }
    Ok(exitcode::OK)
}

fn describe_path(label: &str, path: &Path) -> String {
    let state = if path.exists() { "exists" } else { "missing" };
    format!("{label}: {} ({state})", path.display())
}
