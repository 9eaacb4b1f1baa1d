// src/main.rs

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use psquery::{
    automation::{self, QueryAutomation},
    config::Config,
    driver::HttpDriver,
    reformat::reformat,
    run::{Orchestrator, RunReport},
};
use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "psquery", version, about = "Batch queries against a web report portal")]
struct Cli {
    /// YAML settings file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the available automations
    List,
    /// Show the input headers an automation needs
    Requirements { automation: String },
    /// Reshape an input file to the required columns without querying
    Reformat {
        automation: String,
        #[arg(short, long)]
        input: PathBuf,
        #[arg(long)]
        no_headers: bool,
    },
    /// Query every row of the input and write the combined results
    Run {
        automation: String,
        #[arg(short, long)]
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Write a JSON run summary here
        #[arg(long)]
        report: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    // ─── logging ──────────────────────────────────────────────────────
    let fallback = config
        .log_filter
        .clone()
        .unwrap_or_else(|| "info,psquery=info".to_string());
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    match cli.command {
        Command::List => {
            for (name, auto) in automation::catalog(&config) {
                println!("{name:<14} {}", auto.description());
            }
        }
        Command::Requirements { automation } => {
            let auto = lookup(&automation, &config)?;
            let req = auto.requirements();
            println!("{}", req.description());
            for h in req.headers() {
                println!("  {h}");
            }
        }
        Command::Reformat {
            automation,
            input,
            no_headers,
        } => {
            let auto = lookup(&automation, &config)?;
            let source = read_input(&input)?;
            let names = auto.requirements().header_names();
            let text = reformat(&source, &names, !no_headers)
                .with_context(|| format!("reformatting {}", input.display()))?;
            println!("{text}");
        }
        Command::Run {
            automation,
            input,
            output,
            report,
        } => run(&config, &automation, &input, &output, report.as_deref()).await?,
    }
    Ok(())
}

fn lookup(name: &str, config: &Config) -> Result<Box<dyn QueryAutomation>> {
    automation::by_name(name, config).ok_or_else(|| {
        anyhow!(
            "unknown automation {name:?}; try one of: {}",
            automation::NAMES.join(", ")
        )
    })
}

fn read_input(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("reading input {}", path.display()))
}

async fn run(
    config: &Config,
    name: &str,
    input: &Path,
    output: &Path,
    report_path: Option<&Path>,
) -> Result<()> {
    let auto = lookup(name, config)?;
    let source = read_input(input)?;
    // the blocking client owns a runtime of its own; keep it off the async threads
    let user_agent = config.user_agent.clone();
    let driver = tokio::task::spawn_blocking(move || HttpDriver::new(&user_agent))
        .await?
        .context("building HTTP client")?;

    let orch = Arc::new(Orchestrator::new(auto, config.wait_policy()));
    let cancel = orch.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; stopping after the current row");
            cancel.cancel();
        }
    });

    info!(automation = name, input = %input.display(), "starting run");
    let outcome = Arc::clone(&orch)
        .spawn(source, Box::new(driver))
        .await
        .context("query worker panicked")?;

    let report = match outcome {
        Ok(report) => report,
        Err(e) => {
            // keep what was gathered before the abort
            if let Some(partial) = e.partial() {
                write_report(partial, output, report_path)?;
            }
            return Err(e.into());
        }
    };
    write_report(&report, output, report_path)?;

    if report.cancelled {
        bail!(
            "run cancelled after {} of the input rows",
            report.rows_attempted
        );
    }
    Ok(())
}

fn write_report(report: &RunReport, output: &Path, report_path: Option<&Path>) -> Result<()> {
    fs::write(output, report.output.to_text())
        .with_context(|| format!("writing output {}", output.display()))?;
    info!(rows = report.output.len(), output = %output.display(), "results written");

    if let Some(path) = report_path {
        let json = serde_json::to_string_pretty(&report.summary())?;
        fs::write(path, json).with_context(|| format!("writing report {}", path.display()))?;
    }

    for f in &report.failures {
        error!(key = %f.key, "{}", f.error);
    }
    Ok(())
}
