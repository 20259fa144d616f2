use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use colored::*;
use structopt::StructOpt;

use sec_analyzer::edgar::{ReportType, Ticker};
use sec_analyzer::utils::output::save_results;
use sec_analyzer::{Analyzer, AnalyzerConfig, AnalyzerError};

#[derive(Debug, StructOpt)]
#[structopt(
    name = "sec-analyzer",
    about = "Summarize a company's latest SEC filing with a locally hosted LLM"
)]
struct Opt {
    /// Company ticker symbol (e.g. AAPL, MSFT)
    ticker: String,

    /// SEC form type (e.g. 10-K, 10-Q)
    #[structopt(long, default_value = "10-K")]
    form: String,

    /// Override the directory summaries are written to
    #[structopt(long, parse(from_os_str))]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let opt = Opt::from_args();
    if let Err(err) = run(opt).await {
        match err.downcast_ref::<AnalyzerError>() {
            Some(core_err) => eprintln!("{}: {}", core_err.kind().red().bold(), core_err),
            None => eprintln!("{}: {}", "Error".red().bold(), err),
        }
        std::process::exit(1);
    }
}

async fn run(opt: Opt) -> Result<()> {
    let mut config = AnalyzerConfig::from_env()?;
    if let Some(dir) = opt.output_dir {
        config.output_dir = dir;
    }

    let ticker = Ticker::new(opt.ticker)?;
    let form = ReportType::from_str(&opt.form)
        .map_err(|e| anyhow::anyhow!("unrecognized form type: {}", e))?;
    if matches!(form, ReportType::Other(_)) {
        eprintln!(
            "{}",
            format!(
                "note: {} is an uncommon form type; common ones are {}",
                form,
                ReportType::list_types()
            )
            .yellow()
        );
    }

    let analyzer = Analyzer::new(config.clone())?;
    let result = analyzer.analyze(&ticker, &form).await?;

    println!("\n{}", "=".repeat(60));
    println!(
        "{}",
        format!("FILING SUMMARY - {} ({})", ticker, form).bold()
    );
    println!("{}\n", "=".repeat(60));
    println!("{}", result.text);
    println!("\n{}", "=".repeat(60));

    if !result.is_complete() {
        eprintln!(
            "{}",
            format!(
                "warning: {} of {} excerpts were unavailable; the summary is incomplete",
                result.unavailable_chunks.len(),
                result.chunk_count
            )
            .yellow()
        );
    }

    let path = save_results(&config.output_dir, &result)?;
    println!("Summary saved to {}", path.display());
    Ok(())
}
