// Jackson Coxson
// idevice Rust implementation of libimobiledevice's ideviceinfo

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use crate::{
    cli::{Mode, Options},
    error::EXIT_DEVICE_FAILURE,
};

mod assistive;
mod cli;
mod common;
mod error;
mod find_driver;
mod info;
mod output;

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run_assistive(options: &Options, action: cli::AssistiveAction) -> ExitCode {
    let res = match common::get_provider(options, assistive::LABEL).await {
        Ok(provider) => assistive::main(&*provider, action).await,
        Err(e) => Err(e),
    };
    match res {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            println!("ERROR: {e}");
            ExitCode::from(EXIT_DEVICE_FAILURE)
        }
    }
}

async fn run_query(
    options: &Options,
    domain: Option<&str>,
    key: Option<&str>,
    format: cli::OutputFormat,
) -> ExitCode {
    let provider = match common::get_provider(options, info::LABEL).await {
        Ok(p) => p,
        Err(e) => {
            println!("ERROR: {e}");
            return ExitCode::from(EXIT_DEVICE_FAILURE);
        }
    };

    match info::main(&*provider, domain, key, format, options.simple).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("ERROR: {e}");
            ExitCode::from(EXIT_DEVICE_FAILURE)
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let options = match cli::try_parse_from(std::env::args_os()) {
        Ok(o) => o,
        Err(e) => {
            let report = cli::error_report(&e);
            if e.use_stderr() {
                eprint!("{report}");
            } else {
                print!("{report}");
            }
            std::process::exit(e.exit_code());
        }
    };
    init_logging(options.debug);

    match &options.mode {
        Mode::FindDriver { product_id } => {
            if let Some(product_id) = product_id {
                find_driver::main(*product_id, options.udid.as_deref());
            }
            ExitCode::SUCCESS
        }
        Mode::Assistive(action) => run_assistive(&options, *action).await,
        Mode::Query {
            domain,
            key,
            format,
        } => run_query(&options, domain.as_deref(), key.as_deref(), *format).await,
    }
}
