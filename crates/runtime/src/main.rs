//! `sdf-render`: path-traces one of the built-in scenes to a PNG.

#![deny(clippy::all, clippy::pedantic)]

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use compute::ComputeBackend;
use glam::Vec2;
use runtime::{load_options, parse_mouse, render, save_png, DemoScene, RenderSettings};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
    Cpu,
    Gpu,
}

#[derive(Parser, Debug)]
#[command(name = "sdf-render")]
#[command(about = "Path-trace a signed distance field scene", long_about = None)]
struct Cli {
    /// Built-in scene to render
    #[arg(long, value_enum, default_value_t = DemoScene::Spheres)]
    scene: DemoScene,

    #[arg(long, default_value_t = 320)]
    width: u32,

    #[arg(long, default_value_t = 240)]
    height: u32,

    /// Frames to accumulate
    #[arg(long, default_value_t = 16)]
    frames: u32,

    #[arg(long, default_value_t = 0)]
    seed: u32,

    /// Value of the `time` uniform
    #[arg(long, default_value_t = 0.0)]
    time: f32,

    /// Pointer position as `x,y`
    #[arg(long, value_parser = parse_mouse, default_value = "0,0")]
    mouse: Vec2,

    /// JSON file with kernel options
    #[arg(long)]
    options: Option<PathBuf>,

    #[arg(long)]
    steps: Option<u32>,

    #[arg(long)]
    bounces: Option<u32>,

    /// Samples per pixel per frame
    #[arg(long)]
    iterations: Option<u32>,

    #[arg(long, value_enum, default_value_t = Backend::Cpu)]
    backend: Backend,

    #[arg(short, long, default_value = "render.png")]
    output: PathBuf,

    /// Also write the generated WGSL here
    #[arg(long)]
    emit_wgsl: Option<PathBuf>,
}

fn backend(choice: Backend) -> Result<Arc<dyn ComputeBackend>> {
    match choice {
        Backend::Cpu => Ok(Arc::new(compute::CpuBackend::new())),
        #[cfg(feature = "gpu")]
        Backend::Gpu => Ok(Arc::new(compute::WgpuBackend::new()?)),
        #[cfg(not(feature = "gpu"))]
        Backend::Gpu => anyhow::bail!("built without the `gpu` feature"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let mut options = match &cli.options {
        Some(path) => load_options(path)?,
        None => cli.scene.options(),
    };
    if let Some(steps) = cli.steps {
        options.steps = steps;
    }
    if let Some(bounces) = cli.bounces {
        options.bounces = bounces;
    }
    if let Some(iterations) = cli.iterations {
        options.iterations = iterations;
    }

    let scene = cli.scene.build();
    let kernel = codegen::compile(&scene, &options)
        .with_context(|| format!("failed to compile scene {:?}", cli.scene))?;
    tracing::info!(
        scene = ?cli.scene,
        entities = scene.entities.len(),
        bytes = kernel.source().len(),
        "compiled kernel"
    );

    if let Some(path) = &cli.emit_wgsl {
        fs::write(path, kernel.source())
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("wrote {}", path.display());
    }

    let backend = backend(cli.backend)?;
    tracing::info!(backend = backend.name(), "rendering");
    let settings = RenderSettings {
        width: cli.width,
        height: cli.height,
        frames: cli.frames,
        seed: cli.seed,
        time: cli.time,
        mouse: cli.mouse,
    };
    let accumulator = render(backend.as_ref(), &kernel, &settings)?;
    save_png(&cli.output, &accumulator, options.gamma)?;
    tracing::info!("wrote {}", cli.output.display());
    Ok(())
}
