use anyhow::Result;
use clap::Parser;
use docimg::cli::Cli;
use docimg::{logging, Pipeline};
use std::process::ExitCode;

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init(cli.verbose, cli.log_format)?;

    let output = Pipeline::new(cli.output_config()).run(&cli.request());
    println!("{}", output.status);

    if let Some(manifest) = &output.manifest {
        for file in &manifest.saved_files {
            tracing::info!(file = %file.display(), "Saved");
        }
    }

    Ok(if output.is_error() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
