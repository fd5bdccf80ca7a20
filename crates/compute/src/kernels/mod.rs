//! Host implementation of the path-tracing kernel.

pub mod integrator;
pub mod sampling;

pub use integrator::{March, PathTracer};
pub use sampling::{reflect, refract, sample_hemisphere, sample_sphere, Pcg};
