// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// docscan — command-line document capture and clean-up.
//
// Entry point. Initialises logging, parses the command line, and dispatches
// to the command implementations in `commands`.

mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use docscan_core::ProcessingMode;

#[derive(Debug, Parser)]
#[command(name = "docscan")]
#[command(about = "Detect, crop, and clean up photographed documents")]
#[command(version)]
struct Cli {
    /// JSON configuration file; defaults apply to anything it omits
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Clean up a single photographed page
    Process {
        /// Source image
        input: PathBuf,

        /// Destination image; the format follows the extension
        output: PathBuf,

        /// Processing mode (ocr-optimized, printed-document,
        /// handwritten-document, whiteboard, advanced)
        #[arg(short, long)]
        mode: Option<ProcessingMode>,

        /// Quality score (0-100) that selects the processing tier
        #[arg(short, long, value_parser = clap::value_parser!(u8).range(0..=100), conflicts_with = "auto_quality")]
        quality: Option<u8>,

        /// Estimate the quality score from the image resolution
        #[arg(long)]
        auto_quality: bool,

        /// Skip document boundary detection and cropping
        #[arg(long)]
        no_crop: bool,
    },
    /// Score how similar two frames are
    Compare {
        a: PathBuf,
        b: PathBuf,

        /// Downscale factor applied to both frames before comparing
        #[arg(short, long)]
        downscale: Option<u32>,
    },
    /// Auto-capture from a directory of frames, writing each new page
    Watch {
        /// Directory of frames, replayed in file-name order
        frames: PathBuf,

        /// Directory that receives processed pages
        out_dir: PathBuf,

        /// Processing mode for accepted frames
        #[arg(short, long)]
        mode: Option<ProcessingMode>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    tracing::debug!(?cli, "docscan starting");

    let result = match commands::load_config(cli.config.as_deref()) {
        Ok(config) => match cli.command {
            Command::Process {
                input,
                output,
                mode,
                quality,
                auto_quality,
                no_crop,
            } => commands::process(
                &config,
                commands::ProcessArgs {
                    input: &input,
                    output: &output,
                    mode,
                    quality,
                    auto_quality,
                    crop: !no_crop,
                },
            ),
            Command::Compare { a, b, downscale } => commands::compare(&config, &a, &b, downscale),
            Command::Watch {
                frames,
                out_dir,
                mode,
            } => commands::watch(&config, &frames, &out_dir, mode).await,
        },
        Err(e) => Err(e),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, recovery = ?e.recovery(), "docscan failed");
            eprintln!("docscan: {e}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_process_with_mode_and_quality() {
        let cli = Cli::try_parse_from([
            "docscan",
            "process",
            "in.jpg",
            "out.png",
            "--mode",
            "printed_document",
            "--quality",
            "42",
        ])
        .unwrap();
        match cli.command {
            Command::Process {
                mode,
                quality,
                auto_quality,
                no_crop,
                ..
            } => {
                assert_eq!(mode, Some(ProcessingMode::PrintedDocument));
                assert_eq!(quality, Some(42));
                assert!(!auto_quality);
                assert!(!no_crop);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn rejects_out_of_range_quality() {
        let err = Cli::try_parse_from(["docscan", "process", "a.png", "b.png", "-q", "101"]);
        assert!(err.is_err());
    }

    #[test]
    fn quality_and_auto_quality_conflict() {
        let err = Cli::try_parse_from([
            "docscan",
            "process",
            "a.png",
            "b.png",
            "-q",
            "50",
            "--auto-quality",
        ]);
        assert!(err.is_err());
    }

    #[test]
    fn rejects_unknown_mode() {
        let err = Cli::try_parse_from(["docscan", "watch", "in", "out", "--mode", "sepia"]);
        assert!(err.is_err());
    }

    #[test]
    fn global_config_flag_after_subcommand() {
        let cli =
            Cli::try_parse_from(["docscan", "compare", "a.png", "b.png", "--config", "scan.json"])
                .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("scan.json")));
    }
}
