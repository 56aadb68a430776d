use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, ensure};
use clap::Parser;
use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::loader::LoadRequest;

#[derive(Parser, Debug)]
#[command(
    about = "Orbit viewer for an animated glTF character with idle turntable",
    version
)]
pub struct Args {
    /// Directory (or URL prefix on the web) holding the model and animation files
    #[arg(long, default_value = "./model/")]
    pub assets_dir: PathBuf,

    /// Binary glTF model file inside --assets-dir
    #[arg(long, default_value = "character.glb")]
    pub model: String,

    /// Animation file inside --assets-dir; leave empty to play the model's own first clip
    #[arg(long, default_value = "")]
    pub animation: String,

    /// Spawn offset "x,y,z" handed to the loader before the model is centered
    #[arg(long, value_parser = parse_vec3, default_value = "0,10,0")]
    pub spawn_offset: Vec3,

    /// Initial window width in pixels
    #[arg(long, default_value_t = 1280)]
    pub width: u32,

    /// Initial window height in pixels
    #[arg(long, default_value_t = 720)]
    pub height: u32,

    /// Optional viewer preset JSON (idle delay, turntable step, render quality)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Let the page scroll offset (PageUp/PageDown/Home) drive the camera
    #[arg(long)]
    pub scroll_camera: bool,

    /// Build the viewer on the first open instead of at startup
    #[arg(long)]
    pub lazy: bool,

    /// Skip creating a window; load the model and simulate frames instead
    #[arg(long)]
    pub headless: bool,

    /// Frames to simulate in --headless mode (60 Hz cadence)
    #[arg(long, default_value_t = 240)]
    pub frames: u32,

    /// When set with --headless, write the run summary JSON to this path
    #[arg(long)]
    pub summary_json: Option<PathBuf>,
}

impl Args {
    /// Resolve the preset file (if any) and apply command-line overrides.
    pub fn viewer_config(&self) -> Result<ViewerConfig> {
        let preset = match &self.config {
            Some(path) => load_viewer_preset(path)?,
            None => ViewerPreset::default(),
        };
        let mut config = ViewerConfig::from_preset(&preset);
        if self.scroll_camera {
            config.scroll_camera = true;
        }
        if self.lazy {
            config.preload = false;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn load_request(&self) -> LoadRequest {
        LoadRequest {
            base_path: self.assets_dir.clone(),
            model_file: self.model.clone(),
            animation_file: self.animation.clone(),
            spawn_offset: self.spawn_offset,
        }
    }
}

fn parse_vec3(raw: &str) -> std::result::Result<Vec3, String> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != 3 {
        return Err(format!("expected x,y,z but got '{raw}'"));
    }
    let mut values = [0.0f32; 3];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse()
            .map_err(|err| format!("invalid component '{part}': {err}"))?;
    }
    Ok(Vec3::from_array(values))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ToneMapping {
    None,
    #[default]
    AcesFilmic,
}

/// On-disk preset; every field is optional and falls back to the built-in
/// viewer defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ViewerPreset {
    #[serde(default)]
    pub idle_rotate_delay_ms: Option<f64>,
    #[serde(default)]
    pub auto_rotate_step: Option<f32>,
    #[serde(default)]
    pub model_scale: Option<f32>,
    #[serde(default)]
    pub scroll_camera: Option<bool>,
    #[serde(default)]
    pub preload: Option<bool>,
    #[serde(default)]
    pub controls: Option<ControlsPreset>,
    #[serde(default)]
    pub render: Option<RenderPreset>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct ControlsPreset {
    #[serde(default)]
    pub enable_damping: Option<bool>,
    #[serde(default)]
    pub damping_factor: Option<f32>,
    #[serde(default)]
    pub rotate_speed: Option<f32>,
    #[serde(default)]
    pub zoom_speed: Option<f32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RenderPreset {
    #[serde(default)]
    pub msaa_samples: Option<u32>,
    #[serde(default)]
    pub shadow_map_size: Option<u32>,
    #[serde(default)]
    pub physically_correct_lights: Option<bool>,
    #[serde(default)]
    pub tone_mapping: Option<ToneMapping>,
    #[serde(default)]
    pub exposure: Option<f32>,
    #[serde(default)]
    pub transparent: Option<bool>,
    #[serde(default)]
    pub receive_shadows: Option<bool>,
}

pub fn load_viewer_preset(path: &Path) -> Result<ViewerPreset> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading viewer preset {}", path.display()))?;
    let preset: ViewerPreset = serde_json::from_str(&data)
        .with_context(|| format!("parsing viewer preset {}", path.display()))?;
    Ok(preset)
}

/// Fully resolved viewer tuning.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ViewerConfig {
    pub idle_rotate_delay_ms: f64,
    /// Radians added to the model yaw on every frame while idle.
    pub auto_rotate_step: f32,
    pub model_scale: f32,
    pub scroll_camera: bool,
    pub preload: bool,
    pub controls: ControlsSettings,
    pub render: RenderSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ControlsSettings {
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderSettings {
    pub msaa_samples: u32,
    pub shadow_map_size: u32,
    pub physically_correct_lights: bool,
    pub tone_mapping: ToneMapping,
    pub exposure: f32,
    pub transparent: bool,
    pub receive_shadows: bool,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::from_preset(&ViewerPreset::default())
    }
}

impl Default for RenderSettings {
    fn default() -> Self {
        ViewerConfig::default().render
    }
}

impl ViewerConfig {
    pub fn from_preset(preset: &ViewerPreset) -> Self {
        let controls = preset.controls.clone().unwrap_or_default();
        let render = preset.render.clone().unwrap_or_default();
        Self {
            idle_rotate_delay_ms: preset.idle_rotate_delay_ms.unwrap_or(3000.0),
            auto_rotate_step: preset.auto_rotate_step.unwrap_or(0.0025),
            model_scale: preset.model_scale.unwrap_or(0.1),
            scroll_camera: preset.scroll_camera.unwrap_or(false),
            preload: preset.preload.unwrap_or(true),
            controls: ControlsSettings {
                enable_damping: controls.enable_damping.unwrap_or(true),
                damping_factor: controls.damping_factor.unwrap_or(0.05),
                rotate_speed: controls.rotate_speed.unwrap_or(1.0),
                zoom_speed: controls.zoom_speed.unwrap_or(1.0),
            },
            render: RenderSettings {
                msaa_samples: render.msaa_samples.unwrap_or(4),
                shadow_map_size: render.shadow_map_size.unwrap_or(2048),
                physically_correct_lights: render.physically_correct_lights.unwrap_or(true),
                tone_mapping: render.tone_mapping.unwrap_or_default(),
                exposure: render.exposure.unwrap_or(1.0),
                transparent: render.transparent.unwrap_or(true),
                receive_shadows: render.receive_shadows.unwrap_or(true),
            },
        }
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.idle_rotate_delay_ms >= 0.0,
            "idle_rotate_delay_ms must be non-negative (got {})",
            self.idle_rotate_delay_ms
        );
        ensure!(
            self.model_scale > 0.0,
            "model_scale must be positive (got {})",
            self.model_scale
        );
        ensure!(
            (0.0..=1.0).contains(&self.controls.damping_factor),
            "damping_factor must be between 0 and 1 (got {})",
            self.controls.damping_factor
        );
        ensure!(
            self.render.shadow_map_size.is_power_of_two(),
            "shadow_map_size must be a power of two (got {})",
            self.render.shadow_map_size
        );
        ensure!(
            matches!(self.render.msaa_samples, 1 | 4),
            "msaa_samples must be 1 or 4 (got {})",
            self.render.msaa_samples
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_canonical_viewer() {
        let config = ViewerConfig::default();
        assert_eq!(config.idle_rotate_delay_ms, 3000.0);
        assert_eq!(config.auto_rotate_step, 0.0025);
        assert_eq!(config.model_scale, 0.1);
        assert!(!config.scroll_camera);
        assert!(config.preload);
        assert_eq!(config.render.shadow_map_size, 2048);
        assert_eq!(config.render.tone_mapping, ToneMapping::AcesFilmic);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn preset_overrides_only_named_fields() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"{{ "idle_rotate_delay_ms": 500, "render": {{ "msaa_samples": 1, "tone_mapping": "none" }} }}"#
        )
        .expect("write preset");

        let preset = load_viewer_preset(file.path()).expect("preset parses");
        let config = ViewerConfig::from_preset(&preset);
        assert_eq!(config.idle_rotate_delay_ms, 500.0);
        assert_eq!(config.render.msaa_samples, 1);
        assert_eq!(config.render.tone_mapping, ToneMapping::None);
        assert_eq!(config.auto_rotate_step, 0.0025);
        assert_eq!(config.render.shadow_map_size, 2048);
    }

    #[test]
    fn command_line_flags_override_preset() {
        let args = Args::parse_from(["vitrine_viewer", "--scroll-camera", "--lazy"]);
        let config = args.viewer_config().expect("config resolves");
        assert!(config.scroll_camera);
        assert!(!config.preload);
    }

    #[test]
    fn spawn_offset_parses_components() {
        let args = Args::parse_from(["vitrine_viewer", "--spawn-offset", "1, -2.5,3"]);
        assert_eq!(args.spawn_offset, Vec3::new(1.0, -2.5, 3.0));
        assert!(parse_vec3("1,2").is_err());
        assert!(parse_vec3("1,b,3").is_err());
    }

    #[test]
    fn validation_rejects_bad_shadow_map() {
        let mut config = ViewerConfig::default();
        config.render.shadow_map_size = 1000;
        assert!(config.validate().is_err());
    }
}
