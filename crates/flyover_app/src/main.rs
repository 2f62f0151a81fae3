// SPDX-License-Identifier: MIT OR Apache-2.0
//! `flyover` - preview and export camera flights over a 3D globe.
//!
//! Projects are JSON documents holding the clip settings and the keyframed
//! camera path. The tool can:
//! - sample the interpolated camera pose at any time
//! - play the path back in real time on a headless renderer
//! - export a video, either by capturing frames locally and uploading them
//!   or by handing the whole path to the render server
//!
//! Server address and export defaults live in `flyover.ron`.

mod commands;
mod config;
mod preview_renderer;

use clap::{Parser, Subcommand};
use commands::ExportOverrides;
use config::{AppConfig, ModeChoice, CONFIG_FILE_NAME};
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "flyover", version, about)]
struct Cli {
    /// Config file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    config: PathBuf,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the camera pose at a point in time.
    Sample {
        /// Project JSON.
        project: PathBuf,
        /// Seconds from the start.
        #[arg(long, short)]
        time: f64,
        /// Also render the frame to this PNG.
        #[arg(long)]
        png: Option<PathBuf>,
    },
    /// Play the camera path in real time.
    Preview {
        /// Project JSON.
        project: PathBuf,
        /// Restart from the beginning at the end (stop with Ctrl-C).
        #[arg(long = "loop")]
        looping: bool,
    },
    /// Export the camera path as a video.
    Export {
        /// Project JSON.
        project: PathBuf,
        /// Pipeline; defaults to the config value.
        #[arg(long, value_enum)]
        mode: Option<ModeChoice>,
        /// Output file; defaults to the server-suggested name in the output directory.
        #[arg(long, short)]
        out: Option<PathBuf>,
        /// Frame width in pixels.
        #[arg(long)]
        width: Option<u32>,
        /// Frame height in pixels.
        #[arg(long)]
        height: Option<u32>,
        /// Encoder quality, 1-100.
        #[arg(long, value_parser = clap::value_parser!(u8).range(1..=100))]
        quality: Option<u8>,
        /// Render server root URL.
        #[arg(long)]
        backend: Option<String>,
    },
    /// Write a default config file.
    InitConfig {
        /// Also write a starter project here.
        #[arg(long)]
        project: Option<PathBuf>,
        /// Overwrite existing files.
        #[arg(long)]
        force: bool,
    },
}

fn init_tracing() -> anyhow::Result<()> {
    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new("flyover=info")?,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .try_init()?;
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Cli {
        config: config_path,
        cmd,
    } = cli;
    let load_config = || AppConfig::load_or_default(&config_path);

    match cmd {
        Command::Sample { project, time, png } => {
            commands::sample(&load_config()?, &project, time, png.as_deref()).await
        }
        Command::Preview { project, looping } => {
            commands::preview(&load_config()?, &project, looping).await
        }
        Command::Export {
            project,
            mode,
            out,
            width,
            height,
            quality,
            backend,
        } => {
            let overrides = ExportOverrides {
                mode,
                width,
                height,
                quality,
                backend_url: backend,
                out,
            };
            commands::export(&load_config()?, &project, overrides).await
        }
        Command::InitConfig { project, force } => {
            commands::init_config(&config_path, project.as_deref(), force).await
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = init_tracing() {
        eprintln!("Failed to initialize logging: {e}");
    }

    let cli = Cli::parse();
    tracing::debug!("Starting Flyover v{}", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(cli).await {
        tracing::error!("{e:#}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_export_flags_parse() {
        let cli = Cli::try_parse_from([
            "flyover",
            "export",
            "alps.json",
            "--mode",
            "server",
            "--quality",
            "80",
            "--config",
            "custom.ron",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("custom.ron"));
        let Command::Export { mode, quality, .. } = cli.cmd else {
            panic!("expected export");
        };
        assert_eq!(mode, Some(ModeChoice::Server));
        assert_eq!(quality, Some(80));

        assert!(Cli::try_parse_from(["flyover", "export", "alps.json", "--quality", "0"]).is_err());
    }
}
