use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use clip_detector::analysis::firls::{self, FilterSpec};
use clip_detector::clips::Clip;
use clip_detector::config::{AppConfig, DetectorSettings, LEGACY_SAMPLE_RATE};
use clip_detector::error::{log_configuration_error, log_extraction_error};
use clip_detector::fixtures::{write_wav, ExpectationDiff, FixtureCatalog, FixtureProcessor};
use clip_detector::reference::{compare, read_clip_list, FilterExtractor};
use clip_detector::testing::SyntheticSignal;
use serde::Serialize;

#[derive(Parser, Debug)]
#[command(
    name = "clip_cli",
    about = "Deterministic harness for the streaming clip detector"
)]
struct Cli {
    /// Override directory containing fixture assets (defaults to the crate fixtures/ directory)
    #[arg(long)]
    fixtures_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Detect clips in a fixture or WAV file and optionally compare against expectations
    Detect {
        /// Fixture name or path to a mono WAV file
        #[arg(long)]
        input: String,
        /// Detector preset (tseep or thrush); overrides the config file's detector
        #[arg(long)]
        preset: Option<String>,
        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,
        /// Chunk duration in seconds
        #[arg(long)]
        chunk_seconds: Option<f64>,
        /// Merge touching or overlapping clips
        #[arg(long)]
        merge: bool,
        #[arg(long)]
        expect: Option<PathBuf>,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Compare two clip lists (JSON) and report their alignment
    Compare {
        #[arg(long)]
        reference: PathBuf,
        #[arg(long)]
        candidate: PathBuf,
        /// Allowed start/end/length deviation in samples
        #[arg(long, default_value_t = 0)]
        tolerance: u64,
    },
    /// Design a least-squares bandpass filter and print its coefficients
    DesignFilter {
        #[arg(long)]
        taps: usize,
        #[arg(long, default_value_t = LEGACY_SAMPLE_RATE)]
        sample_rate: f64,
        #[arg(long)]
        f0: f64,
        #[arg(long)]
        f1: f64,
        #[arg(long)]
        bw: f64,
    },
    /// Recover filter coefficients from a legacy detector binary
    ExtractFilter {
        #[arg(long)]
        binary: PathBuf,
        #[arg(long, default_value_t = 100)]
        taps: usize,
        #[arg(long, default_value_t = 16_384)]
        dft_size: usize,
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Write a synthetic test recording
    Synthesize {
        #[arg(long)]
        output: PathBuf,
        #[arg(long, default_value_t = 22_050)]
        sample_rate: u32,
        /// Duration in seconds
        #[arg(long)]
        duration: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
        /// Background noise amplitude
        #[arg(long, default_value_t = 0.0)]
        noise: f64,
        /// Onset/offset ramp in seconds for tones, chirps and bursts
        #[arg(long, default_value_t = 0.01)]
        ramp: f64,
        /// START:DURATION:FREQUENCY:AMPLITUDE (repeatable)
        #[arg(long)]
        tone: Vec<String>,
        /// START:DURATION:F_START:F_END:AMPLITUDE (repeatable)
        #[arg(long)]
        chirp: Vec<String>,
        /// START:DURATION:AMPLITUDE (repeatable)
        #[arg(long)]
        noise_burst: Vec<String>,
        /// TIME:AMPLITUDE (repeatable)
        #[arg(long)]
        impulse: Vec<String>,
    },
    /// List available fixtures on disk
    DumpFixtures,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();
    let catalog = cli
        .fixtures_dir
        .map(FixtureCatalog::new)
        .unwrap_or_else(FixtureCatalog::default);

    match cli.command {
        Commands::Detect {
            input,
            preset,
            config,
            chunk_seconds,
            merge,
            expect,
            output,
        } => {
            let app_config = resolve_config(config.as_deref(), preset.as_deref())?;
            run_detect(&catalog, &input, app_config, chunk_seconds, merge, expect, output)
        }
        Commands::Compare {
            reference,
            candidate,
            tolerance,
        } => run_compare(&reference, &candidate, tolerance),
        Commands::DesignFilter {
            taps,
            sample_rate,
            f0,
            f1,
            bw,
        } => run_design_filter(taps, sample_rate, f0, f1, bw),
        Commands::ExtractFilter {
            binary,
            taps,
            dft_size,
            output,
        } => run_extract_filter(&binary, taps, dft_size, output),
        Commands::Synthesize {
            output,
            sample_rate,
            duration,
            seed,
            noise,
            ramp,
            tone,
            chirp,
            noise_burst,
            impulse,
        } => {
            let mut signal = SyntheticSignal::new(sample_rate as f64, duration, seed).noise(noise);
            for spec in &tone {
                let [start, length, frequency, amplitude] = parse_fields::<4>(spec)?;
                signal = signal.tone(start, length, frequency, amplitude, ramp);
            }
            for spec in &chirp {
                let [start, length, f_start, f_end, amplitude] = parse_fields::<5>(spec)?;
                signal = signal.chirp(start, length, f_start, f_end, amplitude, ramp);
            }
            for spec in &noise_burst {
                let [start, length, amplitude] = parse_fields::<3>(spec)?;
                signal = signal.noise_burst(start, length, amplitude, ramp);
            }
            for spec in &impulse {
                let [time, amplitude] = parse_fields::<2>(spec)?;
                signal = signal.impulse(time, amplitude);
            }
            write_wav(&output, signal.samples(), sample_rate)?;
            tracing::info!(
                samples = signal.samples().len(),
                path = %output.display(),
                "synthetic recording written"
            );
            Ok(ExitCode::from(0))
        }
        Commands::DumpFixtures => run_dump(&catalog),
    }
}

fn resolve_config(config: Option<&Path>, preset: Option<&str>) -> Result<AppConfig> {
    let mut app_config = match config {
        Some(path) => AppConfig::load_from_file(path),
        None => AppConfig::default(),
    };
    if let Some(name) = preset {
        app_config.detector = DetectorSettings::preset(name)
            .ok_or_else(|| anyhow!("Unknown preset '{name}' (expected tseep or thrush)"))?;
    }
    Ok(app_config)
}

fn run_detect(
    catalog: &FixtureCatalog,
    input: &str,
    app_config: AppConfig,
    chunk_seconds: Option<f64>,
    merge: bool,
    override_expect: Option<PathBuf>,
    output_path: Option<PathBuf>,
) -> Result<ExitCode> {
    let merge = merge || app_config.streaming.merge_clips;
    let mut processor = FixtureProcessor::new(app_config).with_merge(merge);
    if let Some(seconds) = chunk_seconds {
        processor = processor.with_chunk_duration(seconds);
    }

    let data = catalog.load(input, override_expect)?;
    let started = Instant::now();
    let clips = processor
        .run(&data)
        .with_context(|| format!("processing {}", input))?;

    tracing::info!(
        input = %data.metadata.name,
        sample_rate = data.sample_rate,
        samples = data.samples.len(),
        clips = clips.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "detection finished"
    );

    emit_report(&data.metadata.name, data.sample_rate, &clips, output_path)?;

    if let Some(expectations) = data.expectations {
        match expectations.verify(&clips) {
            Ok(()) => Ok(ExitCode::from(0)),
            Err(diff) => {
                emit_diff(&diff)?;
                Ok(ExitCode::from(2))
            }
        }
    } else {
        Ok(ExitCode::from(0))
    }
}

fn run_compare(reference: &Path, candidate: &Path, tolerance: u64) -> Result<ExitCode> {
    let reference_clips = read_clip_list(reference)?;
    let candidate_clips = read_clip_list(candidate)?;
    let report = compare(&reference_clips, &candidate_clips);

    println!("{}", serde_json::to_string_pretty(&report)?);

    tracing::info!(
        exact = report.exact_matches,
        missing = report.missing,
        extra = report.extra,
        max_deviation = report.max_deviation(),
        "comparison finished"
    );

    if report.is_within(tolerance) {
        Ok(ExitCode::from(0))
    } else {
        Ok(ExitCode::from(2))
    }
}

fn run_design_filter(taps: usize, sample_rate: f64, f0: f64, f1: f64, bw: f64) -> Result<ExitCode> {
    let settings = DetectorSettings {
        sample_rate,
        f0,
        f1,
        bw,
        filter_length: taps,
        ..DetectorSettings::tseep()
    };
    settings
        .validate()
        .inspect_err(|err| log_configuration_error(err, "design-filter"))?;

    let coefficients = firls::design(taps, &FilterSpec::bandpass(sample_rate, f0, f1, bw));
    print!("{}", format_coefficients(&coefficients));
    Ok(ExitCode::from(0))
}

fn run_extract_filter(
    binary: &Path,
    taps: usize,
    dft_size: usize,
    output: Option<PathBuf>,
) -> Result<ExitCode> {
    let data = fs::read(binary).with_context(|| format!("reading {}", binary.display()))?;
    let coefficients = FilterExtractor::new(dft_size, taps)
        .extract(&data)
        .inspect_err(|err| log_extraction_error(err, "extract-filter"))
        .with_context(|| format!("extracting filter from {}", binary.display()))?;

    let text = format_coefficients(&coefficients);
    match output {
        Some(path) => fs::write(&path, text).with_context(|| format!("writing {}", path.display()))?,
        None => print!("{text}"),
    }
    Ok(ExitCode::from(0))
}

fn run_dump(catalog: &FixtureCatalog) -> Result<ExitCode> {
    let fixtures = catalog.discover()?;
    if fixtures.is_empty() {
        println!("No fixtures found under {}", catalog.root().display());
        return Ok(ExitCode::from(0));
    }

    for metadata in fixtures {
        if let Some(expect) = metadata.expect_path {
            println!("{} -> {}", metadata.name, expect.display());
        } else {
            println!("{}", metadata.name);
        }
    }
    Ok(ExitCode::from(0))
}

fn format_coefficients(coefficients: &[f64]) -> String {
    coefficients.iter().map(|c| format!("{c:.20e}\n")).collect()
}

/// Parse `N` colon-separated numbers
fn parse_fields<const N: usize>(spec: &str) -> Result<[f64; N]> {
    let values = spec
        .split(':')
        .map(|field| {
            field
                .trim()
                .parse::<f64>()
                .with_context(|| format!("invalid number '{field}' in '{spec}'"))
        })
        .collect::<Result<Vec<f64>>>()?;
    match <[f64; N]>::try_from(values) {
        Ok(fields) => Ok(fields),
        Err(values) => bail!("expected {N} fields in '{spec}', found {}", values.len()),
    }
}

fn emit_report(
    input: &str,
    sample_rate: u32,
    clips: &[Clip],
    output_path: Option<PathBuf>,
) -> Result<()> {
    let report = DetectionReportPayload {
        input,
        sample_rate,
        clip_count: clips.len(),
        clips,
    };
    let json = serde_json::to_string_pretty(&report)?;

    if let Some(path) = output_path {
        fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
    } else {
        println!("{json}");
    }

    Ok(())
}

fn emit_diff(diff: &ExpectationDiff) -> Result<()> {
    let json = serde_json::to_string_pretty(&diff.to_json())?;
    eprintln!("{json}");
    Ok(())
}

#[derive(Serialize)]
struct DetectionReportPayload<'a> {
    input: &'a str,
    sample_rate: u32,
    clip_count: usize,
    clips: &'a [Clip],
}
