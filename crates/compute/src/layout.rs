//! Binding slots shared by every generated kernel.

pub const UNIFORMS: u32 = 0;
pub const PREVIOUS: u32 = 1;
pub const ACCUMULATED: u32 = 2;

/// One `vec4<f32>` per pixel: summed radiance and sample count.
pub const PIXEL_BYTES: usize = 16;

pub const BINDING_COUNT: u32 = 3;

const _: () = assert!(ACCUMULATED == BINDING_COUNT - 1);

/// Whether `binding` is bound read-only.
pub const fn is_read_only(binding: u32) -> bool {
    binding == PREVIOUS
}

/// Whether `binding` is a uniform buffer rather than storage.
pub const fn is_uniform(binding: u32) -> bool {
    binding == UNIFORMS
}
