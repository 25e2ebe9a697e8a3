//! Write the transformer and model artifacts from a JSON parameter file.

use anyhow::Result;
use clap::error::ErrorKind;
use clap::Parser;
use price_predict::export::ExportParams;
use price_predict::logging;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "export", version)]
struct Args {
    /// JSON file with fitted `transformer` and `model` parameters
    #[arg(long)]
    params: PathBuf,

    /// Output directory for the artifacts
    #[arg(long, default_value = ".")]
    out: PathBuf,

    /// Log debug diagnostics to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return match err.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => ExitCode::FAILURE,
            };
        }
    };
    logging::init(args.verbose);

    match export(&args.params, &args.out) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn export(params: &Path, out: &Path) -> Result<()> {
    let params = ExportParams::from_path(params)?;
    let paths = params.write(out)?;
    println!("Saved model to {:?}", paths.model);
    println!("Saved transformer to {:?}", paths.transformer);
    Ok(())
}
