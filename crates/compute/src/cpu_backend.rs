//! Multi-threaded CPU implementation of [`ComputeBackend`].
//!
//! Runs the same per-pixel algorithm as the generated WGSL, interpreting the
//! kernel's lowered program. Rows are split into bands, one per thread.

use std::num::NonZeroUsize;
use std::thread;

use glam::Vec4;

use crate::kernels::PathTracer;
use crate::{check_previous, BufferView, ComputeBackend, ComputeError, FrameUniforms, Kernel};

#[derive(Debug, Clone)]
pub struct CpuBackend {
    threads: NonZeroUsize,
}

impl Default for CpuBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CpuBackend {
    /// One worker per available core.
    pub fn new() -> Self {
        let threads = thread::available_parallelism().unwrap_or(NonZeroUsize::MIN);
        Self { threads }
    }

    pub fn with_threads(threads: NonZeroUsize) -> Self {
        Self { threads }
    }
}

impl ComputeBackend for CpuBackend {
    fn name(&self) -> &'static str {
        "cpu"
    }

    fn dispatch(
        &self,
        kernel: &Kernel,
        uniforms: &FrameUniforms,
        previous: &BufferView,
        _workgroups: [u32; 3],
    ) -> Result<Vec<u8>, ComputeError> {
        check_previous(uniforms, previous)?;
        let (width, height) = uniforms.dimensions();
        let history: Vec<[f32; 4]> = bytemuck::pod_collect_to_vec(&previous.data[..]);
        let mut next = vec![[0.0_f32; 4]; history.len()];

        let row = width as usize;
        let rows_per_band = (height as usize).div_ceil(self.threads.get());
        let program = kernel.program();

        thread::scope(|scope| {
            for (band, (out, before)) in next
                .chunks_mut(rows_per_band * row)
                .zip(history.chunks(rows_per_band * row))
                .enumerate()
            {
                scope.spawn(move || {
                    let mut tracer = PathTracer::new(program, uniforms);
                    let first_row = band * rows_per_band;
                    for (i, (pixel, old)) in out.iter_mut().zip(before).enumerate() {
                        let (x, y) = (i % row, first_row + i / row);
                        let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
                            continue;
                        };
                        *pixel = tracer.accumulate(x, y, Vec4::from(*old)).to_array();
                    }
                });
            }
        });

        tracing::trace!(width, height, frame = uniforms.frame, "cpu frame done");
        Ok(bytemuck::cast_slice(&next).to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codegen::{compile, KernelOptions};
    use sdf::Scene;

    #[test]
    fn mismatch_shape_fails() {
        let kernel = compile(&Scene::default(), &KernelOptions::default()).unwrap();
        let cpu = CpuBackend::new();
        let uniforms = FrameUniforms::new(2, 2);
        let bad = BufferView::new(vec![0u8; 48].into(), vec![2, 2], 16);
        let result = cpu.dispatch(&kernel, &uniforms, &bad, [1, 1, 1]);
        assert!(
            matches!(result, Err(ComputeError::ShapeMismatch(_))),
            "Expected ShapeMismatch error, got {result:?}"
        );
    }

    #[test]
    fn thread_count_does_not_change_the_image() {
        let kernel = compile(&Scene::default(), &KernelOptions::default()).unwrap();
        let uniforms = FrameUniforms::new(7, 5);
        let previous = BufferView::new(vec![0u8; 7 * 5 * 16].into(), vec![5, 7], 16);
        let one = CpuBackend::with_threads(NonZeroUsize::MIN)
            .dispatch(&kernel, &uniforms, &previous, [1, 1, 1])
            .unwrap();
        let many = CpuBackend::with_threads(NonZeroUsize::new(3).unwrap())
            .dispatch(&kernel, &uniforms, &previous, [1, 1, 1])
            .unwrap();
        assert_eq!(one, many);
    }
}
