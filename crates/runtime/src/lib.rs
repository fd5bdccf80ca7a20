//! Headless driver for compiled scenes: demo scenes, option loading, frame
//! accumulation and PNG output.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod scenes;

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use codegen::{Kernel, KernelOptions};
use compute::{Accumulator, ComputeBackend, FrameInput};
use glam::Vec2;

pub use scenes::DemoScene;

/// What to render and for how long.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RenderSettings {
    pub width: u32,
    pub height: u32,
    pub frames: u32,
    pub seed: u32,
    pub time: f32,
    pub mouse: Vec2,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            width: 320,
            height: 240,
            frames: 16,
            seed: 0,
            time: 0.0,
            mouse: Vec2::ZERO,
        }
    }
}

/// Accumulates `settings.frames` frames of `kernel`.
pub fn render(
    backend: &dyn ComputeBackend,
    kernel: &Kernel,
    settings: &RenderSettings,
) -> Result<Accumulator> {
    let mut accumulator = Accumulator::new(settings.width, settings.height)?;
    let input = FrameInput {
        mouse: settings.mouse,
        time: settings.time,
        clicked: false,
        seed: settings.seed,
    };
    for frame in 0..settings.frames {
        accumulator
            .render(backend, kernel, &input)
            .with_context(|| format!("frame {frame} failed"))?;
        if (frame + 1) % 8 == 0 {
            tracing::info!("{} of {} frames", frame + 1, settings.frames);
        }
    }
    Ok(accumulator)
}

/// Resolves the accumulation and writes it as an 8-bit PNG.
pub fn save_png(path: &Path, accumulator: &Accumulator, gamma: f32) -> Result<()> {
    let pixels = accumulator.resolve(gamma);
    let image = image::RgbaImage::from_raw(accumulator.width(), accumulator.height(), pixels)
        .context("resolved image has the wrong size")?;
    image
        .save(path)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

/// Reads kernel options from a JSON file. Missing fields keep their defaults.
pub fn load_options(path: &Path) -> Result<KernelOptions> {
    let text =
        fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
    let options = serde_json::from_str(&text)
        .with_context(|| format!("invalid options in {}", path.display()))?;
    Ok(options)
}

/// Parses a pointer position written as `x,y`.
pub fn parse_mouse(text: &str) -> Result<Vec2, String> {
    let (x, y) = text
        .split_once(',')
        .ok_or_else(|| format!("expected `x,y`, got `{text}`"))?;
    let parse = |v: &str| {
        v.trim()
            .parse::<f32>()
            .map_err(|e| format!("invalid coordinate `{v}`: {e}"))
    };
    Ok(Vec2::new(parse(x)?, parse(y)?))
}
