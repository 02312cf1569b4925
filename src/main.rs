use clap::Parser;
use missive::pipeline::config::DEFAULT_CONCURRENCY;
use missive::{MergeError, MergePipelineBuilder};
use std::path::PathBuf;
use std::process::ExitCode;

// Zip and XML processing churn through many small allocations per row;
// mimalloc keeps the long-batch heap from fragmenting.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Bulk mail-merge: one filled document per spreadsheet row.
#[derive(Parser, Debug)]
#[command(name = "missive", version, about)]
struct Args {
    /// DOCX template containing #placeholder# tokens
    template: PathBuf,

    /// XLSX data source; the first row holds the column names
    data: PathBuf,

    /// Existing directory that receives the generated files
    destination: PathBuf,

    /// Convert every generated document to PDF (requires LibreOffice)
    #[arg(long)]
    pdf: bool,

    /// Maximum number of rows generating or converting at once
    #[arg(long, default_value_t = DEFAULT_CONCURRENCY)]
    jobs: usize,

    /// Placeholder delimiter character
    #[arg(long, default_value_t = '#')]
    marker: char,

    /// Write the run summary as JSON to this path
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    match run(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode, MergeError> {
    let pipeline = MergePipelineBuilder::new()
        .with_template_file(&args.template)
        .with_data_file(&args.data)
        .with_destination(&args.destination)
        .with_convert(args.pdf)
        .with_concurrency(args.jobs)
        .with_marker(args.marker)
        .build()?;

    let summary = pipeline.run()?;

    if let Some(path) = args.summary_json {
        std::fs::write(&path, serde_json::to_vec_pretty(&summary)?)?;
    }

    println!(
        "{} of {} documents generated in {:.2?} ({} failed)",
        summary.completed, summary.queued, summary.elapsed, summary.failed
    );

    // The batch itself always completes; failed rows are signalled
    // through the exit status.
    Ok(if summary.failed > 0 { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
