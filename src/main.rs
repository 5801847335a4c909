//! rerun-archive CLI entrypoint.
//!
//! Wires the real collaborators (system executor, module search path, host
//! framework, packaging configuration) into a build context and runs the
//! requested builder. Errors are printed to stderr and mapped to the exit
//! status carried by the error.

use camino::Utf8PathBuf;
use clap::Parser;
use log::info;
use rerun_archive::cli::{Cli, default_template_dir};
use rerun_archive::config::PackagingConfig;
use rerun_archive::context::BuildContext;
use rerun_archive::dispatch::dispatch;
use rerun_archive::error::Result;
use rerun_archive::executor::SystemCommandExecutor;
use rerun_archive::fsutil::utf8_path;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    init_logging(&cli);
    let mut stderr = std::io::stderr();
    let exit_code = exit_code_for_run_result(run(&cli), &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// `RUST_LOG` directives take precedence over `-v` and `-q`.
fn init_logging(cli: &Cli) {
    env_logger::Builder::new()
        .filter_level(cli.log_level())
        .format_timestamp(None)
        .parse_default_env()
        .init();
}

fn run(cli: &Cli) -> Result<Vec<Utf8PathBuf>> {
    let request = cli.build_request()?;
    let executor = SystemCommandExecutor;
    let registry = cli.registry();
    let config = PackagingConfig::load(cli.config.as_deref())?;
    let working_dir = utf8_path(std::env::current_dir()?)?;

    let ctx = BuildContext::new(&executor, &registry, working_dir, template_dir()?)
        .with_host(cli.host())
        .with_config(config);

    let artefacts = dispatch(&ctx, &request)?;
    for artefact in &artefacts {
        info!("created {artefact}");
    }
    Ok(artefacts)
}

fn template_dir() -> Result<Utf8PathBuf> {
    let exe = std::env::current_exe()?;
    let exe_dir = exe.parent().map(|dir| utf8_path(dir.to_path_buf())).transpose()?;
    Ok(default_template_dir(exe_dir.as_deref()))
}

fn exit_code_for_run_result<T>(result: Result<T>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(_) => 0,
        Err(err) => {
            write_stderr_line(stderr, format_args!("rerun-archive: {err}"));
            err.exit_code()
        }
    }
}

fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort reporting; ignore write failures.
    }
}
