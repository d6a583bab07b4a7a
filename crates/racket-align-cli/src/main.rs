use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;
use racket_align_core::BarrettWam;
use racket_align_pipeline::{
    run_alignment, AlignConfig, AlignReport, ColorBlobDetector, FrameRange,
};

/// Offline check of the robot-to-camera alignment from a racket swing.
#[derive(Debug, Parser)]
#[command(author, version, about = "Racket/camera alignment check")]
struct Args {
    /// JSON AlignConfig. Defaults are used if omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Joint recording, overrides `input_path`.
    #[arg(long)]
    input: Option<PathBuf>,

    /// Root directory of the camera frames, overrides `frame_layout.root`.
    #[arg(long)]
    frames_root: Option<PathBuf>,

    /// Frames to detect the ball in, as `start..end`.
    #[arg(long, value_parser = parse_frame_range)]
    frames: Option<FrameRange>,

    /// Where to write the ball locations, overrides `output_path`.
    #[arg(long, conflicts_with = "no_output")]
    output: Option<PathBuf>,

    /// Do not write the ball locations.
    #[arg(long)]
    no_output: bool,
}

fn parse_frame_range(s: &str) -> Result<FrameRange, String> {
    let (start, end) = s
        .split_once("..")
        .ok_or_else(|| format!("expected start..end, got {s:?}"))?;
    let start: usize = start.trim().parse().map_err(|e| format!("bad start: {e}"))?;
    let end: usize = end.trim().parse().map_err(|e| format!("bad end: {e}"))?;
    if end <= start {
        return Err(format!("empty frame range {start}..{end}"));
    }
    Ok(FrameRange::new(start, end))
}

fn resolve_config(args: &Args) -> Result<AlignConfig> {
    let mut config = match &args.config {
        Some(path) => AlignConfig::load(path)?,
        None => AlignConfig::default(),
    };
    if let Some(input) = &args.input {
        config.input_path = input.clone();
    }
    if let Some(root) = &args.frames_root {
        config.frame_layout.root = root.clone();
    }
    if let Some(frames) = args.frames {
        config.frame_range = frames;
    }
    if let Some(output) = &args.output {
        config.output_path = Some(output.clone());
    }
    if args.no_output {
        config.output_path = None;
    }
    Ok(config)
}

fn run_from_config(config: &AlignConfig) -> Result<AlignReport> {
    let wam = BarrettWam::default();
    let detector = ColorBlobDetector::new(config.frame_layout.clone(), config.detector);
    run_alignment(config, &wam, &detector)
}

fn write_report_json(report: &AlignReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize report")
}

const DEFAULT_LOG: &str = "warn,racket_align_pipeline=info,racket_align_linear=info";

/// `RUST_LOG` when set, otherwise stage summaries from the pipeline crates.
fn log_filter(rust_log: Option<&str>) -> Result<EnvFilter> {
    match rust_log.filter(|s| !s.trim().is_empty()) {
        Some(directives) => EnvFilter::try_new(directives).context("invalid RUST_LOG"),
        None => Ok(EnvFilter::new(DEFAULT_LOG)),
    }
}

fn main() {
    if let Err(err) = try_main() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref())?)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = resolve_config(&args)?;
    let report = run_from_config(&config)?;
    println!("{}", write_report_json(&report)?);
    if let Some(path) = &config.output_path {
        eprintln!("ball locations written to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use racket_align_core::synthetic;
    use std::fs;

    fn args(list: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("racket-align").chain(list.iter().copied())).unwrap()
    }

    #[test]
    fn frame_range_argument() {
        assert_eq!(parse_frame_range("1000..1100"), Ok(FrameRange::new(1000, 1100)));
        assert!(parse_frame_range("1100..1000").is_err());
        assert!(parse_frame_range("1000-1100").is_err());
    }

    #[test]
    fn rust_log_directives_are_kept() {
        let filter = log_filter(Some("racket_align_pipeline=debug,debug")).unwrap().to_string();
        assert!(filter.contains("racket_align_pipeline=debug"), "{filter}");
        assert!(!filter.contains("info") && !filter.contains("warn"), "{filter}");

        let default = log_filter(None).unwrap().to_string();
        assert!(default.contains("racket_align_pipeline=info"), "{default}");
        assert_eq!(log_filter(Some("  ")).unwrap().to_string(), default);
    }

    #[test]
    fn overrides_apply_on_top_of_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let cfg_path = dir.path().join("align.json");
        fs::write(&cfg_path, r#"{ "velocity_threshold": 0.3, "camera_ids": [1] }"#).unwrap();

        let cfg = resolve_config(&args(&[
            "--config",
            cfg_path.to_str().unwrap(),
            "--input",
            "joints.txt",
            "--frames",
            "10..20",
            "--no-output",
        ]))
        .unwrap();
        assert_eq!(cfg.velocity_threshold, 0.3);
        assert_eq!(cfg.camera_ids, vec![1]);
        assert_eq!(cfg.input_path, PathBuf::from("joints.txt"));
        assert_eq!(cfg.frame_range, FrameRange::new(10, 20));
        assert_eq!(cfg.output_path, None);
    }

    #[test]
    fn missing_recording_names_the_file() {
        let cfg = resolve_config(&args(&["--input", "/nonexistent/joints.txt"])).unwrap();
        let err = run_from_config(&cfg).unwrap_err();
        assert!(format!("{err:#}").contains("/nonexistent/joints.txt"));
    }

    #[test]
    fn run_on_recording_and_frames() {
        let dir = tempfile::tempdir().unwrap();
        let joints = dir.path().join("joints.txt");
        let values = synthetic::swing_values(40_000, 0.002, 30.0, 40.0, 0.8);
        fs::write(&joints, synthetic::to_joint_text(&values)).unwrap();

        let frames = dir.path().join("frames");
        fs::create_dir_all(frames.join("cam0")).unwrap();
        for frame in 1000..1003u32 {
            let mut img = RgbImage::from_pixel(64, 48, Rgb([20, 40, 20]));
            let x = 10 + (frame - 1000) * 8;
            for y in 20..24 {
                for dx in 0..4 {
                    img.put_pixel(x + dx, y, Rgb([250, 140, 30]));
                }
            }
            img.save(frames.join(format!("cam0/{frame:06}.png"))).unwrap();
        }

        let out = dir.path().join("ball_locs.json");
        let cfg_path = dir.path().join("align.json");
        fs::write(&cfg_path, r#"{ "camera_ids": [0] }"#).unwrap();
        let cfg = resolve_config(&args(&[
            "--config",
            cfg_path.to_str().unwrap(),
            "--input",
            joints.to_str().unwrap(),
            "--frames-root",
            frames.to_str().unwrap(),
            "--frames",
            "1000..1003",
            "--output",
            out.to_str().unwrap(),
        ]))
        .unwrap();

        let report = run_from_config(&cfg).unwrap();
        let json = write_report_json(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["correspondences"], 3);
        assert_eq!(value["cameras"][0]["detections"], 3);
        assert!(value["cameras"][0]["skipped"].is_string());
        assert!(out.exists());
    }
}
