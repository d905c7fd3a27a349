use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use needle_cli::annotate::write_annotated;
use needle_cli::{
    load_detector_config, load_image, DetectParams, DetectResult, DetectorConfig, NeedleDetector, PipelineConfig,
    RatioTest, DEFAULT_RATIO,
};

/// Report whether a needle image appears inside a haystack image.
///
/// Exits with 0 when found, 1 when not found and 2 on error.
#[derive(Parser, Debug)]
#[command(name = "needle", version, about = "Needle-in-haystack image detection")]
struct CliArgs {
    /// Image to look for
    #[arg(value_name = "NEEDLE")]
    needle: PathBuf,
    /// Image to search in
    #[arg(value_name = "HAYSTACK")]
    haystack: PathBuf,
    /// FAST threshold; lower admits more, weaker keypoints. Rounded and
    /// clamped to 1..=127, so SURF-scale values (300-500) all act as 127
    #[arg(long, value_name = "N", default_value_t = 20.0)]
    sensitivity: f64,
    /// Accepted for compatibility; not consulted by the decision
    #[arg(long, value_name = "N", default_value_t = 0.0, allow_negative_numbers = true)]
    min_distance: f64,
    /// Minimum number of accepted matches for a positive result
    #[arg(long, value_name = "N", default_value_t = 10.0, allow_negative_numbers = true)]
    point_threshold: f64,
    /// Ratio-test threshold
    #[arg(long, value_name = "R", default_value_t = DEFAULT_RATIO)]
    ratio: f64,
    /// Worker threads (defaults to the configuration, then the CPU count)
    #[arg(long, value_name = "N")]
    threads: Option<usize>,
    /// Detector configuration (.json or .toml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Truncate numeric parameters to 32-bit integers before use
    #[arg(long)]
    truncate_params: bool,
    /// Only examine the first min(haystack_features - 1, matches) matches
    #[arg(long)]
    legacy_window: bool,
    /// Print a JSON report instead of plain text
    #[arg(long)]
    json: bool,
    /// Write the haystack with matches and needle outline drawn on it
    #[arg(long, value_name = "OUT.png")]
    annotate: Option<PathBuf>,
    /// Log verbosity (RUST_LOG takes precedence)
    #[arg(long, value_enum, default_value_t = LogLevel::Warn)]
    log_level: LogLevel,
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    fn as_str(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

fn init_logger(level: LogLevel) {
    let mut builder = env_logger::Builder::new();
    builder.target(env_logger::Target::Stderr);
    builder.parse_filters(level.as_str());
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    builder.init();
}

fn pipeline_config(args: &CliArgs) -> DetectResult<PipelineConfig> {
    let mut detector = match &args.config {
        Some(path) => load_detector_config(path)?,
        None => DetectorConfig::new(),
    };
    if let Some(threads) = args.threads {
        detector.core.n_threads = threads;
    }
    Ok(PipelineConfig {
        detector,
        ratio: RatioTest::new(args.ratio)?.with_legacy_window(args.legacy_window),
        localize: args.json || args.annotate.is_some(),
    })
}

fn run(args: &CliArgs) -> DetectResult<bool> {
    let mut params = DetectParams::new(args.sensitivity, args.min_distance, args.point_threshold);
    if args.truncate_params {
        params = params.truncated();
    }

    let detector = NeedleDetector::new(pipeline_config(args)?)?;
    let needle = load_image(&args.needle)?;
    let haystack = load_image(&args.haystack)?;
    let detection = detector.detect(&needle, &haystack, &params)?;

    if args.json {
        let report = serde_json::to_string_pretty(&detection.report())
            .map_err(|e| needle_cli::DetectError::Output(format!("JSON report: {}", e)))?;
        println!("{}", report);
    } else {
        println!(
            "{}: {} accepted matches (threshold {})",
            if detection.found { "found" } else { "not found" },
            detection.accepted_matches,
            params.point_threshold
        );
    }

    if let Some(path) = &args.annotate {
        write_annotated(&haystack, &detection, path)?;
    }
    Ok(detection.found)
}

fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_logger(args.log_level);

    match run(&args) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::from(2)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = CliArgs::try_parse_from(["needle", "a.png", "b.png"]).unwrap();
        assert_eq!(args.sensitivity, 20.0);
        assert_eq!(args.point_threshold, 10.0);
        assert_eq!(args.ratio, DEFAULT_RATIO);
        assert_eq!(args.log_level, LogLevel::Warn);
        assert!(!args.truncate_params && !args.legacy_window && !args.json);
        let cfg = pipeline_config(&args).unwrap();
        assert!(!cfg.localize);
        assert!(!cfg.ratio.legacy_window);
    }

    #[test]
    fn test_flags() {
        let args = CliArgs::try_parse_from([
            "needle", "a.png", "b.png", "--sensitivity", "35", "--min-distance", "-3", "--point-threshold", "12.5",
            "--ratio", "0.7", "--threads", "2", "--legacy-window", "--json", "--log-level", "debug",
        ])
        .unwrap();
        assert_eq!(args.min_distance, -3.0);
        assert_eq!(args.log_level, LogLevel::Debug);
        let cfg = pipeline_config(&args).unwrap();
        assert_eq!(cfg.detector.core.n_threads, 2);
        assert_eq!(cfg.ratio.ratio, 0.7);
        assert!(cfg.ratio.legacy_window);
        assert!(cfg.localize);
    }

    #[test]
    fn test_bad_ratio_is_an_error() {
        let args = CliArgs::try_parse_from(["needle", "a.png", "b.png", "--ratio", "1.5"]).unwrap();
        assert!(pipeline_config(&args).is_err());
    }

    #[test]
    fn test_missing_image_is_an_error() {
        let args = CliArgs::try_parse_from(["needle", "/nonexistent/a.png", "/nonexistent/b.png"]).unwrap();
        assert!(matches!(run(&args), Err(needle_cli::DetectError::InvalidInput(_))));
    }
}
