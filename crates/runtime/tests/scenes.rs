use std::num::NonZeroUsize;
use std::path::PathBuf;

use codegen::KernelOptions;
use compute::CpuBackend;
use runtime::{load_options, render, save_png, DemoScene, RenderSettings};

fn validate(source: &str) -> Result<(), String> {
    let module = naga::front::wgsl::parse_str(source).map_err(|e| e.emit_to_string(source))?;
    naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(&module)
    .map_err(|e| e.emit_to_string(source))?;
    Ok(())
}

fn scratch(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("sdf-render-{}-{name}", std::process::id()))
}

#[test]
fn every_demo_scene_emits_valid_wgsl() {
    for scene in DemoScene::ALL {
        let kernel = codegen::compile(&scene.build(), &scene.options())
            .unwrap_or_else(|e| panic!("{scene:?} failed to compile: {e}"));
        if let Err(report) = validate(kernel.source()) {
            panic!("{scene:?} produced invalid WGSL:\n{report}");
        }
    }
}

#[test]
fn small_cpu_render_produces_an_image() {
    let scene = DemoScene::Spheres;
    let options = KernelOptions {
        steps: 32,
        bounces: 2,
        ..scene.options()
    };
    let kernel = codegen::compile(&scene.build(), &options).unwrap();
    let settings = RenderSettings {
        width: 12,
        height: 8,
        frames: 2,
        ..RenderSettings::default()
    };
    let accumulator = render(&CpuBackend::with_threads(NonZeroUsize::new(2).unwrap()), &kernel, &settings).unwrap();
    assert_eq!(accumulator.frame(), 2);

    let pixels = accumulator.resolve(options.gamma);
    assert_eq!(pixels.len(), 12 * 8 * 4);
    assert!(pixels.chunks_exact(4).all(|p| p[3] == 255));
    // The sky is visible somewhere in an orbit view.
    assert!(pixels.chunks_exact(4).any(|p| p[0] > 0 || p[1] > 0 || p[2] > 0));

    let path = scratch("small.png");
    save_png(&path, &accumulator, options.gamma).unwrap();
    let decoded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(decoded.dimensions(), (12, 8));
    assert_eq!(decoded.into_raw(), pixels);
    std::fs::remove_file(&path).ok();
}

#[test]
fn zero_sized_render_is_an_error() {
    let kernel = codegen::compile(&DemoScene::Spheres.build(), &KernelOptions::default()).unwrap();
    let settings = RenderSettings {
        width: 0,
        ..RenderSettings::default()
    };
    assert!(render(&CpuBackend::with_threads(NonZeroUsize::MIN), &kernel, &settings).is_err());
}

#[test]
fn options_load_from_partial_json() {
    let path = scratch("options.json");
    std::fs::write(&path, r#"{ "steps": 12, "cheap_normals": true }"#).unwrap();
    let options = load_options(&path).unwrap();
    assert_eq!(options.steps, 12);
    assert!(options.cheap_normals);
    assert_eq!(options.bounces, KernelOptions::default().bounces);

    std::fs::write(&path, "{ steps: }").unwrap();
    assert!(load_options(&path).is_err());
    std::fs::remove_file(&path).ok();

    assert!(load_options(&scratch("missing.json")).is_err());
}
