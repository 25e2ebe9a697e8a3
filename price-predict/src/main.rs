use clap::error::ErrorKind;
use clap::Parser;
use price_predict::cli::Cli;
use price_predict::output::format_price;
use price_predict::wrapper::{self, EXIT_INPUT};
use price_predict::{logging, WrapperError};
use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::from(EXIT_INPUT),
            };
        }
    };
    logging::init(cli.verbose);

    let result = if cli.stdin { run_resident(&cli) } else { run_once(&cli) };
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{}", err.diagnostic());
            ExitCode::from(err.exit_code())
        }
    }
}

fn run_once(cli: &Cli) -> Result<(), WrapperError> {
    let price = wrapper::run_once(cli.features.as_deref(), &cli.artifact_location())?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", format_price(price))
        .and_then(|()| stdout.flush())
        .map_err(|e| WrapperError::Pipeline(anyhow::Error::new(e).context("writing prediction")))?;
    Ok(())
}

fn run_resident(cli: &Cli) -> Result<(), WrapperError> {
    let pipeline = cli
        .artifact_location()
        .resolve()
        .and_then(|paths| wrapper::load_pipeline(&paths))
        .map_err(WrapperError::Pipeline)?;
    wrapper::serve(&pipeline, io::stdin().lock(), io::stdout().lock())
        .map_err(|e| WrapperError::Pipeline(e.into()))?;
    Ok(())
}
