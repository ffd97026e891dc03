use anyhow::Context;
use clap::Parser;
use mirrorsync::commands::run;
use mirrorsync::config::Cli;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();
    mirrorsync::logging::init(&cli.log_level);

    match execute(&cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(2)
        }
    }
}

fn execute(cli: &Cli) -> anyhow::Result<ExitCode> {
    let summary = run::execute(cli).context("mirror run did not start")?;

    if cli.json {
        let json =
            serde_json::to_string_pretty(&summary.reports).context("failed to encode report")?;
        println!("{}", json);
    }

    if let Some(e) = &summary.aborted {
        eprintln!("Error: mirror run did not start: {}", e);
        return Ok(ExitCode::from(2));
    }

    if summary.has_failures() {
        Ok(ExitCode::from(1))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
