use std::f32::consts::PI;

use glam::Vec3;

use crate::expr::{Axis, Param, Var};

/// Pinhole camera with optional thin-lens depth of field.
#[derive(Clone, Debug)]
pub struct Camera {
    pub eye: Param,
    pub target: Param,
    pub up: Param,
    /// Vertical field of view in radians.
    pub field_of_view: Param,
    /// Lens radius. Zero disables depth of field.
    pub aperture: Param,
    /// Focal distance as a multiple of the eye-target distance.
    pub focal_factor: Param,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            eye: Vec3::new(0.0, 0.0, -1.0).into(),
            target: Vec3::ZERO.into(),
            up: Vec3::Y.into(),
            field_of_view: 45.0_f32.to_radians().into(),
            aperture: 0.0.into(),
            focal_factor: 1.0.into(),
        }
    }
}

impl Camera {
    pub fn new(eye: impl Into<Param>, target: impl Into<Param>) -> Self {
        Self {
            eye: eye.into(),
            target: target.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_up(self, up: impl Into<Param>) -> Self {
        Self { up: up.into(), ..self }
    }

    #[must_use]
    pub fn with_field_of_view(self, field_of_view: impl Into<Param>) -> Self {
        Self {
            field_of_view: field_of_view.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_aperture(self, aperture: impl Into<Param>) -> Self {
        Self {
            aperture: aperture.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_focal_factor(self, focal_factor: impl Into<Param>) -> Self {
        Self {
            focal_factor: focal_factor.into(),
            ..self
        }
    }

    pub fn fields(&self) -> [&Param; 6] {
        [
            &self.eye,
            &self.target,
            &self.up,
            &self.field_of_view,
            &self.aperture,
            &self.focal_factor,
        ]
    }
}

#[derive(Clone, Debug)]
pub struct OrbitOptions {
    pub target: Param,
    pub radius: Param,
    /// Added to the pointer position before mapping to angles.
    pub offset: Param,
    pub camera: Camera,
}

impl Default for OrbitOptions {
    fn default() -> Self {
        Self {
            target: Vec3::ZERO.into(),
            radius: 1.0.into(),
            offset: Vec3::ZERO.into(),
            camera: Camera::default(),
        }
    }
}

/// Camera circling `target`, steered by the pointer: horizontal motion sweeps
/// the azimuth through a half turn, vertical motion the polar angle.
pub fn orbit(options: OrbitOptions) -> Camera {
    let OrbitOptions {
        target,
        radius,
        offset,
        camera,
    } = options;
    let center = target.clone();
    let eye = Param::new(move |cx| {
        let mouse = cx.var(Var::Mouse);
        let shift = offset.build(cx);
        let base = cx.constant(Vec3::new(0.5, 1.0, 0.0));
        let moved = cx.add(mouse, shift);
        let turns = cx.add(moved, base);
        let range = cx.constant(Vec3::new(PI, PI / 2.0, 0.0));
        let angles = cx.mul(turns, range);

        let azimuth = cx.component(angles, Axis::X);
        let polar = cx.component(angles, Axis::Y);
        let sin_polar = cx.unary(crate::Unary::Sin, polar);
        let cos_polar = cx.unary(crate::Unary::Cos, polar);
        let sin_azimuth = cx.unary(crate::Unary::Sin, azimuth);
        let cos_azimuth = cx.unary(crate::Unary::Cos, azimuth);
        let x = cx.mul(sin_polar, cos_azimuth);
        let z = cx.mul(sin_polar, sin_azimuth);
        let direction = cx.compose(x, cos_polar, z);

        let r = radius.build(cx);
        let rx = cx.component(r, Axis::X);
        let reach = cx.mul(rx, direction);
        let t = center.build(cx);
        cx.add(t, reach)
    });
    Camera {
        eye,
        target,
        ..camera
    }
}
