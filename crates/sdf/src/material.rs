//! Surface and medium descriptions.

use glam::Vec3;

use crate::expr::{Param, Var};
use crate::MAX_VALUE;

/// Optical properties of a surface and of the medium behind it. Each field is
/// an expression and may depend on `position`, `normal` and `direction`.
#[derive(Clone, Debug)]
pub struct Material {
    /// Probability in `[0, 1]` that a hit refracts instead of reflecting.
    pub transmittance: Param,
    /// `0` is fully diffuse, `1` is a perfect mirror.
    pub smoothness: Param,
    /// Index of refraction.
    pub refraction: Param,
    /// Mean free path inside the medium. [`MAX_VALUE`] or more never scatters.
    pub scatter: Param,
    pub color: Param,
    pub emissivity: Param,
}

impl Default for Material {
    fn default() -> Self {
        Self {
            transmittance: 0.0.into(),
            smoothness: 0.0.into(),
            refraction: 1.0.into(),
            scatter: MAX_VALUE.into(),
            color: Vec3::ONE.into(),
            emissivity: Vec3::ZERO.into(),
        }
    }
}

impl Material {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_transmittance(self, transmittance: impl Into<Param>) -> Self {
        Self {
            transmittance: transmittance.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_smoothness(self, smoothness: impl Into<Param>) -> Self {
        Self {
            smoothness: smoothness.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_refraction(self, refraction: impl Into<Param>) -> Self {
        Self {
            refraction: refraction.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_scatter(self, scatter: impl Into<Param>) -> Self {
        Self {
            scatter: scatter.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_color(self, color: impl Into<Param>) -> Self {
        Self {
            color: color.into(),
            ..self
        }
    }

    #[must_use]
    pub fn with_emissivity(self, emissivity: impl Into<Param>) -> Self {
        Self {
            emissivity: emissivity.into(),
            ..self
        }
    }

    /// The six fields in kernel order.
    pub fn fields(&self) -> [&Param; 6] {
        [
            &self.transmittance,
            &self.smoothness,
            &self.refraction,
            &self.scatter,
            &self.color,
            &self.emissivity,
        ]
    }
}

#[derive(Clone, Debug)]
pub struct SpotlightOptions {
    pub direction: Param,
    pub color: Param,
    /// Hardness of the light: near `0` is a narrow beam, `1` is uniform.
    pub spread: Param,
    pub ambient: Param,
}

impl Default for SpotlightOptions {
    fn default() -> Self {
        Self {
            direction: Vec3::Y.into(),
            color: Vec3::ONE.into(),
            spread: 0.5.into(),
            ambient: Vec3::ZERO.into(),
        }
    }
}

/// A black emitter whose radiance falls off with the angle between the hit
/// position (seen from the origin) and `direction`.
pub fn spotlight(options: SpotlightOptions) -> Material {
    let SpotlightOptions {
        direction,
        color,
        spread,
        ambient,
    } = options;
    let emissivity = Param::new(move |cx| {
        let p = cx.var(Var::Position);
        let np = cx.normalize(p);
        let dir = direction.build(cx);
        let nd = cx.normalize(dir);
        let cosine = cx.dot(np, nd);
        let half = cx.splat(0.5);
        let scaled = cx.mul(cosine, half);
        let falloff = cx.add(scaled, half);

        let spread = spread.build(cx);
        let s = cx.component(spread, crate::Axis::X);
        let one = cx.splat(1.0);
        let inverse = cx.div(one, s);
        let exponent = cx.sub(inverse, one);
        let shaped = cx.pow(falloff, exponent);

        let c = color.build(cx);
        let intensity = cx.div(c, s);
        let beam = cx.mul(intensity, shaped);
        let a = ambient.build(cx);
        cx.add(beam, a)
    });
    Material::new()
        .with_color(Vec3::ZERO)
        .with_emissivity(emissivity)
}
