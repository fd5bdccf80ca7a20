//! Executes compiled scene kernels.
//!
//! A [`ComputeBackend`] runs one frame of the path-tracing kernel: it reads the
//! previous accumulation buffer and returns the next one. The
//! [`Accumulator`] owns the two buffers and swaps them between frames.

#![deny(clippy::all, clippy::pedantic)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

use std::sync::Arc;

use bytemuck::{Pod, Zeroable};
use thiserror::Error;

mod accumulation;
pub mod kernels;
pub mod layout;

#[cfg(feature = "cpu")]
pub mod cpu_backend;
#[cfg(feature = "gpu")]
pub mod wgpu_backend;

pub use accumulation::{Accumulator, FrameInput};
pub use codegen::Kernel;
#[cfg(feature = "cpu")]
pub use cpu_backend::CpuBackend;
#[cfg(feature = "gpu")]
pub use wgpu_backend::WgpuBackend;

#[derive(Error, Debug)]
pub enum ComputeError {
    #[error("buffer shape mismatch: {0}")]
    ShapeMismatch(&'static str),
    #[error("backend not available")]
    BackendUnavailable,
    /// `wgsl` holds the generated kernel the backend rejected.
    #[error("kernel failed to compile: {message}")]
    ShaderCompilation { message: String, wgsl: String },
    #[error("dispatch failed: {0}")]
    Dispatch(String),
}

/// Per-frame uniforms, laid out like the kernel's `Uniforms` struct.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FrameUniforms {
    pub resolution: [f32; 2],
    pub mouse: [f32; 2],
    pub time: f32,
    /// Frames accumulated so far.
    pub frame: u32,
    /// Non-zero while the pointer is pressed.
    pub clicked: u32,
    pub seed: u32,
}

const _: () = assert!(std::mem::size_of::<FrameUniforms>() == 32);

impl FrameUniforms {
    #[allow(clippy::cast_precision_loss)]
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            resolution: [width as f32, height as f32],
            ..Self::default()
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn dimensions(&self) -> (u32, u32) {
        (self.resolution[0] as u32, self.resolution[1] as u32)
    }

    pub fn pixel_count(&self) -> usize {
        let (width, height) = self.dimensions();
        width as usize * height as usize
    }
}

#[derive(Clone, Debug)]
pub struct BufferView {
    pub data: Arc<[u8]>,
    /// Elements per dimension, outermost first.
    pub shape: Vec<usize>,
    pub element_size_in_bytes: usize,
}

impl BufferView {
    #[must_use]
    pub fn new(data: Arc<[u8]>, shape: Vec<usize>, element_size_in_bytes: usize) -> Self {
        Self {
            data,
            shape,
            element_size_in_bytes,
        }
    }

    /// Checks that the data length matches the shape.
    pub fn validate(&self) -> Result<(), ComputeError> {
        let expected = self.shape.iter().product::<usize>() * self.element_size_in_bytes;
        if self.data.len() == expected {
            Ok(())
        } else {
            Err(ComputeError::ShapeMismatch(
                "buffer data length does not match product of shape dimensions and element size",
            ))
        }
    }
}

/// Checks `previous` against the frame resolution.
pub(crate) fn check_previous(
    uniforms: &FrameUniforms,
    previous: &BufferView,
) -> Result<(), ComputeError> {
    previous.validate()?;
    let (width, height) = uniforms.dimensions();
    if width == 0 || height == 0 {
        return Err(ComputeError::ShapeMismatch("resolution must be non-zero"));
    }
    if previous.element_size_in_bytes != layout::PIXEL_BYTES
        || previous.shape != [height as usize, width as usize]
    {
        return Err(ComputeError::ShapeMismatch(
            "previous buffer must be [height, width] vec4<f32>",
        ));
    }
    Ok(())
}

pub trait ComputeBackend: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Runs one frame of `kernel`.
    ///
    /// `previous` holds the accumulation written by the last frame, shaped
    /// `[height, width]` with 16-byte elements. Returns the bytes of the next
    /// accumulation buffer, with the same shape.
    ///
    /// Returns `ComputeError::ShapeMismatch` if `previous` does not match
    /// `uniforms.resolution`.
    fn dispatch(
        &self,
        kernel: &Kernel,
        uniforms: &FrameUniforms,
        previous: &BufferView,
        workgroups: [u32; 3],
    ) -> Result<Vec<u8>, ComputeError>;
}

/// Workgroups needed to cover a `width` x `height` image.
pub fn workgroups_for(width: u32, height: u32) -> [u32; 3] {
    [
        width.div_ceil(codegen::WORKGROUP_SIZE),
        height.div_ceil(codegen::WORKGROUP_SIZE),
        1,
    ]
}

/// Returns a GPU backend when the `gpu` feature is enabled and an adapter is
/// found, otherwise the CPU backend.
#[must_use]
pub fn default_backend() -> Arc<dyn ComputeBackend> {
    #[cfg(feature = "gpu")]
    {
        match WgpuBackend::new() {
            Ok(gpu) => {
                tracing::info!("using wgpu backend");
                return Arc::new(gpu);
            }
            Err(e) => tracing::warn!("wgpu backend unavailable, falling back: {e}"),
        }
    }

    #[cfg(feature = "cpu")]
    {
        tracing::info!("using CPU backend");
        Arc::new(CpuBackend::new())
    }

    #[cfg(not(feature = "cpu"))]
    {
        compile_error!("No compute backend available. Enable the 'cpu' feature.");
    }
}
