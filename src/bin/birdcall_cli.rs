use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use birdcall_classifier::audio::{load_waveform, Windower};
use birdcall_classifier::config::{
    CLASS_NAMES, DEFAULT_MODEL_PATH, NUM_CLASSES, OVERLAP_MS, SAMPLE_RATE, WINDOW_MS,
};
use birdcall_classifier::error::ErrorCode;
use birdcall_classifier::inference::OnnxClassifier;
use birdcall_classifier::{init_logging, PredictionPipeline, PredictionResult};
use clap::{Parser, Subcommand};
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "birdcall_cli",
    about = "Offline bird call classification for local audio files"
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Classify one or more audio files and print a JSON report
    Classify {
        files: Vec<PathBuf>,
        #[arg(long, default_value = DEFAULT_MODEL_PATH)]
        model: PathBuf,
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        threads: usize,
    },
    /// Show how a file would be split into analysis segments
    Segments { file: PathBuf },
    /// List the class table
    Classes,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run(command: Commands) -> Result<ExitCode> {
    match command {
        Commands::Classify {
            files,
            model,
            output,
            threads,
        } => run_classify(&files, &model, output, threads),
        Commands::Segments { file } => run_segments(&file),
        Commands::Classes => run_classes(),
    }
}

fn run_classify(
    files: &[PathBuf],
    model: &Path,
    output_path: Option<PathBuf>,
    threads: usize,
) -> Result<ExitCode> {
    if files.is_empty() {
        anyhow::bail!("no input files given");
    }

    let classifier = OnnxClassifier::load(model, threads, NUM_CLASSES)
        .with_context(|| format!("loading model {}", model.display()))?;
    let pipeline = PredictionPipeline::new(Arc::new(classifier))?;

    let mut failed = false;
    let entries: Vec<FileReport> = files
        .iter()
        .map(|path| match pipeline.predict_file(path) {
            Ok(result) => FileReport {
                file: path.display().to_string(),
                segments: Some(result.segments),
                result: Some(result),
                error: None,
            },
            Err(err) => {
                failed = true;
                FileReport {
                    file: path.display().to_string(),
                    segments: None,
                    result: None,
                    error: Some(format!("{} (code {})", err.message(), err.code())),
                }
            }
        })
        .collect();

    emit_json(&entries, output_path)?;
    Ok(if failed {
        ExitCode::from(2)
    } else {
        ExitCode::from(0)
    })
}

fn run_segments(file: &Path) -> Result<ExitCode> {
    let waveform = load_waveform(file, SAMPLE_RATE, true)
        .with_context(|| format!("decoding {}", file.display()))?;
    let windower = Windower::new(SAMPLE_RATE, WINDOW_MS, OVERLAP_MS)?;
    let to_ms = |samples: usize| samples as f64 * 1_000.0 / SAMPLE_RATE as f64;

    let segments = windower
        .plan(waveform.len())
        .into_iter()
        .enumerate()
        .map(|(index, (start, padding))| SegmentReport {
            index,
            start_ms: to_ms(start),
            padding_ms: to_ms(padding),
        })
        .collect();

    let report = SegmentPlanReport {
        file: file.display().to_string(),
        sample_rate: SAMPLE_RATE,
        duration_ms: waveform.duration_ms(),
        window_ms: WINDOW_MS,
        overlap_ms: OVERLAP_MS,
        segments,
    };
    emit_json(&report, None)?;
    Ok(ExitCode::from(0))
}

fn run_classes() -> Result<ExitCode> {
    for (index, name) in CLASS_NAMES.iter().enumerate() {
        println!("{index}\t{name}");
    }
    Ok(ExitCode::from(0))
}

fn emit_json<T: Serialize + ?Sized>(value: &T, output_path: Option<PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}

#[derive(Serialize)]
struct FileReport {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    segments: Option<usize>,
    #[serde(flatten)]
    result: Option<PredictionResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

#[derive(Serialize)]
struct SegmentPlanReport {
    file: String,
    sample_rate: u32,
    duration_ms: f64,
    window_ms: u32,
    overlap_ms: u32,
    segments: Vec<SegmentReport>,
}

#[derive(Serialize)]
struct SegmentReport {
    index: usize,
    start_ms: f64,
    padding_ms: f64,
}
