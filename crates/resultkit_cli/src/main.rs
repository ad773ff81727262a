use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Arg, ArgAction, Command};
use resultkit_cli::{load_options, run_pipeline};

fn build_command() -> Command {
    Command::new("pseb-analyse")
        .version(env!("CARGO_PKG_VERSION"))
        .about(
            "Clean a PSEB result workbook: extract subject marks, drop school metadata, \
             and write section-wise performance.",
        )
        .arg(
            Arg::new("file")
                .value_name("FILE")
                .help("Path to the Excel file")
                .required(true)
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("TOML")
                .help("Optional options file overriding sheet/column names")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Enable debug logging")
                .action(ArgAction::SetTrue),
        )
}

fn main() -> ExitCode {
    let matches = build_command().get_matches();

    let c_level = if matches.get_flag("verbose") {
        "debug"
    } else {
        "info"
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(c_level)).init();

    let Some(path_file) = matches.get_one::<PathBuf>("file") else {
        log::error!("missing FILE argument");
        return ExitCode::FAILURE;
    };
    let path_config = matches.get_one::<PathBuf>("config");

    let result = load_options(path_config.map(PathBuf::as_path))
        .and_then(|options| run_pipeline(path_file, &options));
    match result {
        Ok(outcome) => {
            log::info!(
                "{} (rows={} cols={})",
                outcome.report,
                outcome.n_rows_processed,
                outcome.n_cols_processed
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
