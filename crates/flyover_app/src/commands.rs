// SPDX-License-Identifier: MIT OR Apache-2.0
//! Command implementations behind the `flyover` CLI.

use crate::config::{AppConfig, ModeChoice};
use crate::preview_renderer::PreviewRenderer;
use anyhow::{bail, Context as _};
use flyover_export::{
    ExportEvent, ExportMode, ExportOutcome, ExportSettings, Exporter, HttpBackend, Studio,
};
use flyover_sequencer::{PlaybackEvent, DEFAULT_FOV};
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Export flags that override the config file
#[derive(Debug, Default, Clone)]
pub struct ExportOverrides {
    /// Pipeline
    pub mode: Option<ModeChoice>,
    /// Frame width
    pub width: Option<u32>,
    /// Frame height
    pub height: Option<u32>,
    /// Encoder quality
    pub quality: Option<u8>,
    /// Server root
    pub backend_url: Option<String>,
    /// Output file
    pub out: Option<PathBuf>,
}

/// Load a project document into a fresh studio
pub async fn open_project(
    path: &Path,
    renderer: PreviewRenderer,
) -> anyhow::Result<Studio<PreviewRenderer>> {
    let json = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("open project '{}'", path.display()))?;
    let mut studio = Studio::new(renderer, 1.0, 30.0)?;
    studio
        .import_document(&json)
        .with_context(|| format!("load project '{}'", path.display()))?;
    Ok(studio)
}

/// Print the pose at `time` as JSON and optionally render it to a PNG
pub async fn sample(
    config: &AppConfig,
    project: &Path,
    time: f64,
    png: Option<&Path>,
) -> anyhow::Result<()> {
    let settings = config.export_settings();
    let renderer = PreviewRenderer::new(settings.width, settings.height);
    let mut studio = open_project(project, renderer).await?;
    studio.seek(time);

    let pose = studio.timeline().sample(studio.clock().current_time());
    println!("{}", serde_json::to_string_pretty(&pose)?);

    if let Some(path) = png {
        let image = studio.renderer().encode_png()?;
        tokio::fs::write(path, image)
            .await
            .with_context(|| format!("write frame '{}'", path.display()))?;
        tracing::info!("Wrote frame at {time:.3}s to {}", path.display());
    }
    Ok(())
}

/// Play the path in real time on the headless renderer until it ends or
/// Ctrl-C is pressed
pub async fn preview(config: &AppConfig, project: &Path, looping: bool) -> anyhow::Result<()> {
    let settings = config.export_settings();
    let renderer = PreviewRenderer::new(settings.width, settings.height);
    let mut studio = open_project(project, renderer).await?;
    studio.set_loop(looping);
    studio.on_playback(|event| match event {
        PlaybackEvent::FrameUpdate(frame) => tracing::debug!(frame, "Preview frame"),
        PlaybackEvent::Finished => tracing::info!("Preview finished"),
        _ => {}
    });

    tracing::info!(
        keyframes = studio.timeline().len(),
        duration = studio.clock().duration(),
        fps = studio.clock().fps(),
        "Starting preview"
    );

    let mut ticker = tokio::time::interval(studio.clock().frame_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    studio.play();
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                studio.tick(Instant::now());
                if !studio.clock().is_playing() {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Interrupted, stopping preview");
                studio.stop();
                break;
            }
        }
    }

    let pose = studio.renderer().pose();
    tracing::info!(
        time = studio.clock().current_time(),
        latitude = pose.latitude,
        longitude = pose.longitude,
        height = pose.height,
        interactive = studio.renderer().is_interactive(),
        "Preview ended"
    );
    Ok(())
}

/// Export the project through the configured backend and write the video
pub async fn export(
    config: &AppConfig,
    project: &Path,
    overrides: ExportOverrides,
) -> anyhow::Result<()> {
    let defaults = config.export_settings();
    let settings = ExportSettings {
        width: overrides.width.unwrap_or(defaults.width),
        height: overrides.height.unwrap_or(defaults.height),
        quality: overrides.quality.unwrap_or(defaults.quality),
    };
    let mode = ExportMode::from(overrides.mode.unwrap_or(config.export.mode));
    let base_url = overrides
        .backend_url
        .as_deref()
        .unwrap_or(&config.backend.base_url);
    let backend = HttpBackend::new(base_url, &config.backend.user_agent)?;

    let renderer = PreviewRenderer::new(settings.width, settings.height);
    let mut studio = open_project(project, renderer)
        .await?
        .with_exporter(Exporter::new().with_poll_interval(config.poll_interval()));
    studio.on_export(log_export_event);

    let handle = studio.export_handle();
    let cancel_on_interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling export");
            handle.cancel();
        }
    });

    tracing::info!(
        mode = mode.name(),
        backend = %backend.base_url(),
        width = settings.width,
        height = settings.height,
        quality = settings.quality,
        "Exporting {}",
        project.display()
    );
    let outcome = match mode {
        ExportMode::ClientCapture => studio.export_client_capture(&backend, &settings).await,
        ExportMode::ServerRender => studio.export_server_render(&backend, &settings).await,
    };
    cancel_on_interrupt.abort();
    tracing::debug!(frames = studio.renderer().frames_rendered(), "Local frames rendered");

    let video = match outcome? {
        ExportOutcome::Completed(video) => video,
        ExportOutcome::AlreadyRunning => bail!("an export is already running"),
    };

    let out = overrides
        .out
        .unwrap_or_else(|| config.output_dir.join(&video.file_name));
    tokio::fs::write(&out, &video.bytes)
        .await
        .with_context(|| format!("write video '{}'", out.display()))?;
    tracing::info!(bytes = video.bytes.len(), "Saved video to {}", out.display());
    Ok(())
}

fn log_export_event(event: &ExportEvent) {
    match event {
        ExportEvent::Started(mode) => tracing::debug!("{} export started", mode.name()),
        ExportEvent::Progress {
            percent,
            message,
            indeterminate,
        } => {
            if *indeterminate {
                tracing::info!("{message}");
            } else {
                tracing::info!("[{percent:5.1}%] {message}");
            }
        }
        ExportEvent::Completed { file_name } => tracing::info!("Export ready: {file_name}"),
        ExportEvent::Failed { message } => tracing::warn!("Export failed: {message}"),
        ExportEvent::Cancelled => tracing::warn!("Export cancelled"),
        ExportEvent::Ended(_) => {}
    }
}

/// Write a default config file and optionally a starter project
pub async fn init_config(path: &Path, project: Option<&Path>, force: bool) -> anyhow::Result<()> {
    for target in std::iter::once(path).chain(project) {
        if target.exists() && !force {
            bail!("'{}' already exists (use --force to overwrite)", target.display());
        }
    }

    AppConfig::default().save(path)?;
    tracing::info!("Wrote default config to {}", path.display());

    if let Some(project) = project {
        tokio::fs::write(project, starter_project()?)
            .await
            .with_context(|| format!("write project '{}'", project.display()))?;
        tracing::info!("Wrote starter project to {}", project.display());
    }
    Ok(())
}

/// Two-keyframe project to start editing from
pub fn starter_project() -> anyhow::Result<String> {
    use flyover_sequencer::{CameraPose, Easing, Keyframe, ProjectDocument};

    let keyframes = [
        Keyframe::new(
            0.0,
            CameraPose::at(46.5197, 6.6323, 12_000.0).with_orientation(0.0, -45.0, 0.0),
        )
        .with_easing(Easing::EaseInOut),
        Keyframe::new(
            8.0,
            CameraPose::at(45.8326, 6.8652, 6_000.0)
                .with_orientation(140.0, -25.0, 0.0)
                .with_fov(DEFAULT_FOV - 15.0),
        ),
    ];
    Ok(ProjectDocument::from_keyframes(8.0, 30.0, &keyframes).to_json()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_starter_project_opens() {
        let json = starter_project().unwrap();
        let dir = std::env::temp_dir().join(format!("flyover-test-{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let path = dir.join("starter.json");
        tokio::fs::write(&path, json).await.unwrap();

        let studio = open_project(&path, PreviewRenderer::new(16, 9)).await.unwrap();
        assert_eq!(studio.timeline().len(), 2);
        assert_eq!(studio.clock().duration(), 8.0);
        assert_eq!(studio.clock().fps(), 30.0);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_missing_project_is_an_error() {
        let missing = Path::new("/nonexistent/flyover.json");
        let result = open_project(missing, PreviewRenderer::new(4, 4)).await;
        assert!(result.is_err());
    }
}
