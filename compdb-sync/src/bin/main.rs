// SPDX-License-Identifier: GPL-3.0-or-later

use compdb_sync::{args, config, context, modes};
use std::env;
use std::process::ExitCode;

/// Driver function of the application.
fn main() -> anyhow::Result<ExitCode> {
    // Parse the command line arguments first, the verbosity sets the log level.
    let matches = args::cli().get_matches();
    let arguments = args::Arguments::try_from(matches)?;
    // Initialize the logging system, `RUST_LOG` takes precedence.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level(arguments.verbose))).init();
    // Get the package name and version from Cargo
    let pkg_name = env!("CARGO_PKG_NAME");
    let pkg_version = env!("CARGO_PKG_VERSION");
    log::info!("{pkg_name} v{pkg_version}");
    let os = env::consts::OS;
    let family = env::consts::FAMILY;
    let arch = env::consts::ARCH;
    log::info!("Running on... {family}/{os} {arch}");

    // Capture application context.
    let context = context::Context::capture()?;
    log::info!("{context}");
    log::info!("{arguments}");
    // Load the configuration.
    let configuration = config::Loader::load(&context, &arguments.config)?;
    log::info!("{configuration}");

    // Run the application.
    let application = modes::Mode::configure(context, arguments, configuration)?;
    log::debug!("Configuration complete, running now...");
    let result = application.run();
    log::debug!("Exit code: {result:?}");

    Ok(result)
}

fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}
