use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};

use faceblur_core::pipeline::infrastructure::blazeface_detector_provider::{
    blazeface_asset, BlazefaceDetectorProvider,
};
use faceblur_core::pipeline::infrastructure::ffmpeg_media_backend::FfmpegMediaBackend;
use faceblur_core::pipeline::orchestrator::FrameBlurringOrchestrator;
use faceblur_core::pipeline::pipeline_logger::StdoutPipelineLogger;
use faceblur_core::shared::config::{BlurConfig, DetectionFailurePolicy};
use faceblur_core::shared::constants::{
    DEFAULT_KERNEL_SIZE, DEFAULT_OUTPUT_DIR, DEFAULT_OUTPUT_FPS, IMAGE_EXTENSIONS,
};

/// Blur faces in images and videos.
#[derive(Parser, Debug)]
#[command(name = "faceblur")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    options: BlurOptions,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Blur a still image into <output-dir>/images/.
    Image { input: PathBuf },
    /// Blur a video into <output-dir>/video/<stem>.avi.
    Video { input: PathBuf },
}

#[derive(Args, Debug)]
struct BlurOptions {
    /// Face detection model (.onnx). Defaults to the cached BlazeFace model.
    #[arg(long, global = true)]
    model: Option<PathBuf>,

    /// Download source used when no local model is found.
    #[arg(long, global = true)]
    model_url: Option<String>,

    /// Face detection confidence threshold (0.0-1.0).
    #[arg(long, global = true, default_value = "0.5")]
    confidence: f64,

    /// Box blur kernel size in pixels.
    #[arg(long, global = true, default_value_t = DEFAULT_KERNEL_SIZE)]
    kernel_size: usize,

    /// Frame rate of the output video.
    #[arg(long, global = true, default_value_t = DEFAULT_OUTPUT_FPS)]
    fps: f64,

    /// Root directory for blurred outputs.
    #[arg(long, global = true, default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// What to do with a frame when detection fails: obscure, pass-through, abort.
    #[arg(long, global = true, default_value = "obscure")]
    on_detection_error: DetectionFailurePolicy,
}

fn main() {
    env_logger::init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    validate(&cli)?;

    let config = build_config(&cli.options);
    let provider = BlazefaceDetectorProvider::new(
        blazeface_asset(cli.options.model.clone(), cli.options.model_url.clone()),
        config.confidence,
    );
    let orchestrator =
        FrameBlurringOrchestrator::new(config, Box::new(FfmpegMediaBackend), Box::new(provider))?
            .with_logger_factory(Box::new(|| Box::new(StdoutPipelineLogger::default())));

    let output = match &cli.command {
        Command::Image { input } => orchestrator.blur_image(input)?,
        Command::Video { input } => orchestrator.blur_video(input)?,
    };
    log::info!("Output written to {}", output.display());
    println!("{}", output.display());
    Ok(())
}

fn build_config(options: &BlurOptions) -> BlurConfig {
    BlurConfig {
        kernel_size: options.kernel_size,
        output_fps: options.fps,
        output_dir: options.output_dir.clone(),
        confidence: options.confidence,
        failure_policy: options.on_detection_error,
        ..BlurConfig::default()
    }
}

fn validate(cli: &Cli) -> Result<(), Box<dyn std::error::Error>> {
    if let Command::Image { input } = &cli.command {
        if !is_image(input) {
            return Err(format!(
                "Unsupported image extension: {} (expected one of {})",
                input.display(),
                IMAGE_EXTENSIONS.join(", ")
            )
            .into());
        }
    }
    if let Some(model) = &cli.options.model {
        if !model.exists() {
            return Err(format!("Model file not found: {}", model.display()).into());
        }
    }
    build_config(&cli.options).validate()?;
    Ok(())
}

fn is_image(path: &std::path::Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["faceblur"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults_match_config_defaults() {
        let cli = parse(&["video", "clip.mp4"]);
        assert_eq!(build_config(&cli.options), BlurConfig::default());
    }

    #[test]
    fn test_options_after_subcommand() {
        let cli = parse(&[
            "image",
            "face.jpg",
            "--kernel-size",
            "31",
            "--on-detection-error",
            "abort",
            "--output-dir",
            "/tmp/out",
        ]);
        let config = build_config(&cli.options);
        assert_eq!(config.kernel_size, 31);
        assert_eq!(config.failure_policy, DetectionFailurePolicy::Abort);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert!(matches!(cli.command, Command::Image { .. }));
    }

    #[test]
    fn test_unknown_policy_rejected_by_parser() {
        let result = Cli::try_parse_from(["faceblur", "video", "a.mp4", "--on-detection-error", "ignore"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_missing_subcommand_rejected() {
        assert!(Cli::try_parse_from(["faceblur"]).is_err());
    }

    #[rstest]
    #[case("photo.jpg", true)]
    #[case("photo.JPEG", true)]
    #[case("scan.tif", true)]
    #[case("clip.mp4", false)]
    #[case("noext", false)]
    fn test_is_image(#[case] name: &str, #[case] expected: bool) {
        assert_eq!(is_image(std::path::Path::new(name)), expected);
    }

    #[rstest]
    #[case(&["image", "clip.mp4"])]
    #[case(&["video", "a.mp4", "--kernel-size", "0"])]
    #[case(&["video", "a.mp4", "--kernel-size", "20000000"])]
    #[case(&["video", "a.mp4", "--fps", "0"])]
    #[case(&["video", "a.mp4", "--confidence", "1.5"])]
    #[case(&["video", "a.mp4", "--model", "/nonexistent/model.onnx"])]
    fn test_validate_rejects(#[case] args: &[&str]) {
        assert!(validate(&parse(args)).is_err());
    }

    #[test]
    fn test_validate_accepts_image() {
        assert!(validate(&parse(&["image", "face.png", "--kernel-size", "1"])).is_ok());
    }
}
