use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::{Context, Result};
use serde::Deserialize;
use tempfile::tempdir;
use vitrine_assets::fixtures;

#[derive(Debug, Deserialize)]
struct Summary {
    frames: u32,
    content: String,
    auto_rotate: bool,
    model_yaw: Option<f32>,
    mixer_time: Option<f32>,
    camera_position: [f32; 3],
}

fn run_viewer(assets: &Path, extra: &[&str]) -> Result<std::process::Output> {
    Command::new(env!("CARGO_BIN_EXE_vitrine_viewer"))
        .arg("--headless")
        .arg("--assets-dir")
        .arg(assets)
        .args(extra)
        .output()
        .context("running vitrine_viewer --headless")
}

fn read_summary(path: &Path) -> Result<Summary> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("reading summary {}", path.display()))?;
    serde_json::from_str(&raw).context("parsing summary JSON")
}

#[test]
fn headless_run_plays_clip_and_starts_turntable() -> Result<()> {
    let dir = tempdir().context("creating asset directory")?;
    fs::write(
        dir.path().join("character.glb"),
        fixtures::skinned_triangle_glb(),
    )?;
    fs::write(
        dir.path().join("dance.glb"),
        fixtures::turntable_animation_glb(2.0),
    )?;
    let summary_path = dir.path().join("summary.json");
    let summary_arg = summary_path.to_str().context("utf-8 temp path")?;

    let output = run_viewer(
        dir.path(),
        &[
            "--animation",
            "dance.glb",
            "--frames",
            "241",
            "--summary-json",
            summary_arg,
        ],
    )?;
    assert!(
        output.status.success(),
        "viewer failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Headless run: 241 frames"), "{stdout}");

    let summary = read_summary(&summary_path)?;
    assert_eq!(summary.frames, 241);
    assert_eq!(summary.content, "ready");
    assert!(summary.auto_rotate, "idle turntable should be running after 4s");
    assert!(summary.model_yaw.is_some());
    let mixer_time = summary.mixer_time.context("mixer time")?;
    assert!((mixer_time - 4.0).abs() < 1e-2, "mixer time {mixer_time}");
    assert!(summary.camera_position.iter().all(|v| v.is_finite()));
    Ok(())
}

#[test]
fn short_run_stays_still() -> Result<()> {
    let dir = tempdir().context("creating asset directory")?;
    fs::write(dir.path().join("character.glb"), fixtures::static_triangle_glb())?;
    let summary_path = dir.path().join("summary.json");
    let summary_arg = summary_path.to_str().context("utf-8 temp path")?;

    let output = run_viewer(dir.path(), &["--frames", "30", "--summary-json", summary_arg])?;
    assert!(output.status.success());

    let summary = read_summary(&summary_path)?;
    assert!(!summary.auto_rotate);
    assert_eq!(summary.mixer_time, None);
    Ok(())
}

#[test]
fn missing_model_fails_with_location() -> Result<()> {
    let dir = tempdir().context("creating asset directory")?;
    let output = run_viewer(dir.path(), &["--model", "absent.glb", "--frames", "5"])?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("absent.glb"), "{stderr}");
    Ok(())
}
