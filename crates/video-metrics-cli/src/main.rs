//! video-metrics CLI - compare two raw YUV streams

use std::io;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{ArgAction, Parser};
use video_metrics::{
    CsvFrameWriter, MetricKind, PixelFormat, Sequence, SequenceConfig, VerbosePrinter,
    parse_metric_list,
};

const AFTER_HELP: &str = "\
Available metrics:
  psnr
  ssim
  ms_ssim
  mse

Formats:
  1  4:2:0 planar (yuv420p)

Example:
  video-metrics -a ref.yuv -b rec.yuv -m psnr,ssim -w 1920 -h 1080";

/// Objective quality metrics between two raw planar YUV streams.
#[derive(Parser)]
#[command(name = "video-metrics")]
#[command(author, version, about, long_about = None)]
#[command(disable_help_flag = true, after_help = AFTER_HELP)]
struct Cli {
    /// Reference stream
    #[arg(short = 'a', long, value_name = "REF.yuv", required_unless_present = "list_metrics")]
    reference: Option<PathBuf>,

    /// Reconstructed stream to compare against the reference
    #[arg(short = 'b', long, value_name = "REC.yuv", required_unless_present = "list_metrics")]
    test: Option<PathBuf>,

    /// Metrics to compute, comma separated
    #[arg(short, long, value_name = "LIST")]
    metrics: Option<String>,

    /// Luma width in pixels
    #[arg(short, long, required_unless_present = "list_metrics")]
    width: Option<usize>,

    /// Luma height in pixels
    #[arg(short = 'h', long, required_unless_present = "list_metrics")]
    height: Option<usize>,

    /// Pixel format code
    #[arg(short, long, default_value_t = 1)]
    format: i64,

    /// Print per-frame scores
    #[arg(short, long)]
    verbose: bool,

    /// Stop after this many frames
    #[arg(short = 'x', long, value_name = "FRAMES")]
    max_frames: Option<u64>,

    /// Write the sequence report as JSON
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Write per-frame scores as CSV
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// List available metrics and exit
    #[arg(long)]
    list_metrics: bool,

    /// Print help
    #[arg(long, action = ArgAction::Help)]
    help: Option<bool>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    if cli.list_metrics {
        for kind in MetricKind::ALL {
            println!("{kind}");
        }
        return Ok(());
    }

    let config = build_config(&cli)?;
    let (Some(reference), Some(test)) = (&cli.reference, &cli.test) else {
        bail!("both streams (-a and -b) are required");
    };

    let sequence = Sequence::open(&config, reference, test).context("Couldn't start sequence")?;

    let verbose = cli.verbose.then(|| VerbosePrinter::new(io::stdout().lock()));
    let mut csv = cli
        .csv
        .as_ref()
        .map(CsvFrameWriter::from_path)
        .transpose()
        .context("Failed to create CSV output")?;

    let report = sequence.run((verbose, csv.as_mut()))?;

    if let Some(writer) = csv {
        writer.finish().context("Failed to write CSV output")?;
    }

    report.write_summary(io::stdout().lock())?;

    if let Some(path) = &cli.json {
        report
            .write_json(path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
    }

    Ok(())
}

fn build_config(cli: &Cli) -> Result<SequenceConfig> {
    let format = PixelFormat::from_code(cli.format)?;

    let (Some(width), Some(height)) = (cli.width, cli.height) else {
        bail!("width (-w) and height (-h) are required");
    };

    // Unknown names are logged by the parser and otherwise ignored.
    let (metrics, _unknown) = parse_metric_list(cli.metrics.as_deref().unwrap_or_default());

    let mut builder = SequenceConfig::builder()
        .format(format)
        .dimensions(width, height)
        .metrics(metrics);
    if let Some(max_frames) = cli.max_frames {
        builder = builder.max_frames(max_frames);
    }

    let config = builder.build();
    config.validate()?;
    Ok(config)
}

fn init_tracing(verbose: bool) {
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(if verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::WARN
        })
        .with_target(false)
        .with_writer(io::stderr)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use video_metrics::Error;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("video-metrics").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_legacy_flags() {
        let cli = parse(&[
            "-a", "ref.yuv", "-b", "rec.yuv", "-m", "psnr,ssim", "-w", "176", "-h", "144", "-v",
            "-x", "10",
        ]);
        assert_eq!(cli.height, Some(144));
        assert!(cli.verbose);

        let config = build_config(&cli).unwrap();
        assert_eq!(config.metrics, [MetricKind::Psnr, MetricKind::Ssim]);
        assert_eq!((config.width, config.height), (176, 144));
        assert_eq!(config.max_frames, Some(10));
        assert_eq!(config.format, PixelFormat::Yuv420);
    }

    #[test]
    fn test_unknown_metric_alongside_known() {
        let cli = parse(&["-a", "a", "-b", "b", "-m", "vmaf,mse", "-w", "8", "-h", "8"]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.metrics, [MetricKind::Mse]);
    }

    #[test]
    fn test_no_known_metric() {
        let cli = parse(&["-a", "a", "-b", "b", "-m", "vmaf", "-w", "8", "-h", "8"]);
        let err = build_config(&cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NoMetricSelected)
        ));
    }

    #[test]
    fn test_metrics_flag_omitted() {
        let cli = parse(&["-a", "a", "-b", "b", "-w", "8", "-h", "8"]);
        let err = build_config(&cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::NoMetricSelected)
        ));
    }

    #[test]
    fn test_unsupported_format() {
        let cli = parse(&["-a", "a", "-b", "b", "-m", "psnr", "-w", "8", "-h", "8", "-f", "2"]);
        let err = build_config(&cli).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<Error>(),
            Some(Error::UnsupportedFormat(2))
        ));
    }

    #[test]
    fn test_list_metrics_needs_nothing_else() {
        let cli = parse(&["--list-metrics"]);
        assert!(cli.list_metrics);
    }

    #[test]
    fn test_missing_dimensions_rejected_by_parser() {
        let result = Cli::try_parse_from(["video-metrics", "-a", "a", "-b", "b", "-m", "psnr"]);
        assert!(result.is_err());
    }
}
