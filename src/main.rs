use clap::Parser;
use serde::Serialize;
use std::path::PathBuf;
use tracing::warn;

use bubblecard::grading::{self, GradeReport};
use bubblecard::{PipelineConfig, ProcessingOutcome, SheetPipeline, SheetUpload};

#[derive(Parser)]
#[command(name = "bubblecard")]
#[command(about = "Read the marked answers from photos of bubble answer cards")]
struct Cli {
    /// Answer sheet images (one or two cards per photo)
    #[arg(value_name = "IMAGE", required = true)]
    images: Vec<PathBuf>,

    /// JSON file overriding the detection policies
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON list of answer keys; grades every decoded card
    #[arg(long, value_name = "FILE")]
    answer_key: Option<PathBuf>,

    /// Points awarded for a fully correct card
    #[arg(long, default_value_t = 10.0)]
    exam_value: f64,

    /// Save debug outputs to directory (must be empty)
    #[arg(long, value_name = "DIR")]
    debug_out: Option<PathBuf>,

    /// Process images on parallel workers
    #[arg(long)]
    parallel: bool,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Serialize)]
struct Report {
    message: &'static str,
    results: Vec<ProcessingOutcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    grades: Option<Vec<GradedCard>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GradedCard {
    filename: String,
    card_index: Option<usize>,
    #[serde(flatten)]
    grade: GradeReport,
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    let config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };
    let mut pipeline = SheetPipeline::with_config(config)?;
    if let Some(debug_dir) = args.debug_out.clone() {
        pipeline = pipeline.with_debug(debug_dir)?;
    }

    let answer_keys = args.answer_key.as_ref().map(grading::load_answer_keys).transpose()?;

    // Unreadable files still get a record: empty bytes fail to decode
    let uploads: Vec<SheetUpload> = args
        .images
        .iter()
        .map(|path| {
            let bytes = std::fs::read(path).unwrap_or_else(|e| {
                warn!(path = %path.display(), error = %e, "Failed to read image file");
                Vec::new()
            });
            SheetUpload::new(path.display().to_string(), bytes)
        })
        .collect();

    let results = if args.parallel {
        let runtime = tokio::runtime::Runtime::new()?;
        runtime.block_on(pipeline.process_upload_parallel(uploads))
    } else {
        pipeline.process_upload(&uploads)
    };

    let grades = answer_keys.map(|keys| grade_all(&results, &keys, args.exam_value));

    let report = Report {
        message: "Image processing finished.",
        results,
        grades,
    };
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(())
}

fn grade_all(results: &[ProcessingOutcome], keys: &[grading::AnswerKey], exam_value: f64) -> Vec<GradedCard> {
    results
        .iter()
        .filter_map(|outcome| {
            let sheet = outcome.sheet()?;
            match grading::grade(sheet, keys, exam_value) {
                Ok(grade) => Some(GradedCard {
                    filename: outcome.filename.clone(),
                    card_index: outcome.card_index,
                    grade,
                }),
                Err(e) => {
                    warn!(filename = %outcome.filename, error = %e, "Card not graded");
                    None
                }
            }
        })
        .collect()
}
