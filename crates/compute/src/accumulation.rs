use std::sync::Arc;

use glam::{Vec2, Vec4};

use crate::layout::PIXEL_BYTES;
use crate::{workgroups_for, BufferView, ComputeBackend, ComputeError, FrameUniforms, Kernel};

/// Inputs that change from frame to frame.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FrameInput {
    pub mouse: Vec2,
    pub time: f32,
    pub clicked: bool,
    pub seed: u32,
}

/// The two accumulation buffers of a progressive render.
///
/// Frame `n` reads buffer `n % 2` and writes buffer `(n + 1) % 2`, so no frame
/// reads the buffer it writes.
pub struct Accumulator {
    width: u32,
    height: u32,
    frame: u32,
    buffers: [Arc<[u8]>; 2],
}

impl Accumulator {
    pub fn new(width: u32, height: u32) -> Result<Self, ComputeError> {
        if width == 0 || height == 0 {
            return Err(ComputeError::ShapeMismatch("resolution must be non-zero"));
        }
        let bytes = width as usize * height as usize * PIXEL_BYTES;
        Ok(Self {
            width,
            height,
            frame: 0,
            buffers: [vec![0; bytes].into(), vec![0; bytes].into()],
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Frames rendered since the last reset.
    pub fn frame(&self) -> u32 {
        self.frame
    }

    /// Buffer read by the next frame, which is the one written last.
    pub fn read_index(&self) -> usize {
        (self.frame % 2) as usize
    }

    pub fn write_index(&self) -> usize {
        1 - self.read_index()
    }

    pub fn uniforms(&self, input: &FrameInput) -> FrameUniforms {
        FrameUniforms {
            mouse: input.mouse.to_array(),
            time: input.time,
            frame: self.frame,
            clicked: u32::from(input.clicked),
            seed: input.seed,
            ..FrameUniforms::new(self.width, self.height)
        }
    }

    /// Renders one frame on `backend` and swaps the buffers.
    pub fn render(
        &mut self,
        backend: &dyn ComputeBackend,
        kernel: &Kernel,
        input: &FrameInput,
    ) -> Result<(), ComputeError> {
        let uniforms = self.uniforms(input);
        let previous = BufferView::new(
            Arc::clone(&self.buffers[self.read_index()]),
            vec![self.height as usize, self.width as usize],
            PIXEL_BYTES,
        );
        let next = backend.dispatch(
            kernel,
            &uniforms,
            &previous,
            workgroups_for(self.width, self.height),
        )?;
        if next.len() != previous.data.len() {
            return Err(ComputeError::ShapeMismatch(
                "backend returned a buffer of the wrong size",
            ));
        }
        self.buffers[self.write_index()] = next.into();
        self.frame = self.frame.wrapping_add(1);
        tracing::debug!(frame = self.frame, backend = backend.name(), "accumulated frame");
        Ok(())
    }

    /// Clears both buffers and the frame count.
    pub fn reset(&mut self) {
        let bytes = self.buffers[0].len();
        self.buffers = [vec![0; bytes].into(), vec![0; bytes].into()];
        self.frame = 0;
    }

    /// Accumulated `(r, g, b, samples)` per pixel, row-major from the top.
    pub fn pixels(&self) -> Vec<[f32; 4]> {
        bytemuck::pod_collect_to_vec(&self.buffers[self.read_index()][..])
    }

    /// Averages the samples, applies `gamma` and quantises to RGBA8.
    pub fn resolve(&self, gamma: f32) -> Vec<u8> {
        self.pixels()
            .into_iter()
            .flat_map(|pixel| resolve_pixel(Vec4::from(pixel), gamma))
            .collect()
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn resolve_pixel(pixel: Vec4, gamma: f32) -> [u8; 4] {
    let mean = if pixel.w > 0.0 {
        pixel.truncate() / pixel.w
    } else {
        glam::Vec3::ZERO
    };
    let encoded = mean.max(glam::Vec3::ZERO).powf(1.0 / gamma);
    let [r, g, b] = encoded
        .to_array()
        .map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8);
    [r, g, b, 255]
}
