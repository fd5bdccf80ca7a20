use serde::{Deserialize, Serialize};

use crate::CompileError;

/// Knobs baked into a compiled kernel as constants.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelOptions {
    /// Distance below which a march counts as a surface hit.
    pub epsilon: f32,
    /// Offset used when differentiating distance fields for normals.
    pub normal_epsilon: f32,
    /// March steps per ray segment.
    pub steps: u32,
    /// Ray segments per path.
    pub bounces: u32,
    /// Paths per pixel per frame.
    pub iterations: u32,
    /// Multiplier on each march step. Below one for fields that overestimate.
    pub step_factor: f32,
    /// Decay applied to the accumulated history every frame.
    pub memory: f32,
    /// Display gamma used when resolving the accumulation.
    pub gamma: f32,
    /// Four-tap tetrahedral normals instead of six-tap central differences.
    pub cheap_normals: bool,
}

impl Default for KernelOptions {
    fn default() -> Self {
        Self {
            epsilon: 1e-5,
            normal_epsilon: 1e-4,
            steps: 100,
            bounces: 8,
            iterations: 1,
            step_factor: 1.0,
            memory: 1.0,
            gamma: 2.2,
            cheap_normals: false,
        }
    }
}

impl KernelOptions {
    pub fn validate(&self) -> Result<(), CompileError> {
        let positive = |name: &'static str, v: f32| {
            if v.is_finite() && v > 0.0 {
                Ok(())
            } else {
                Err(CompileError::InvalidOption {
                    name,
                    reason: "must be positive and finite",
                })
            }
        };
        let nonzero = |name: &'static str, v: u32| {
            if v == 0 {
                Err(CompileError::InvalidOption {
                    name,
                    reason: "must be at least one",
                })
            } else if i32::try_from(v).is_err() {
                Err(CompileError::InvalidOption {
                    name,
                    reason: "must fit in an i32",
                })
            } else {
                Ok(())
            }
        };
        positive("epsilon", self.epsilon)?;
        positive("normal_epsilon", self.normal_epsilon)?;
        positive("gamma", self.gamma)?;
        // Counts become `i32` kernel constants.
        nonzero("steps", self.steps)?;
        nonzero("bounces", self.bounces)?;
        nonzero("iterations", self.iterations)?;
        if !(self.step_factor > 0.0 && self.step_factor <= 1.0) {
            return Err(CompileError::InvalidOption {
                name: "step_factor",
                reason: "must be in (0, 1]",
            });
        }
        if !(0.0..=1.0).contains(&self.memory) {
            return Err(CompileError::InvalidOption {
                name: "memory",
                reason: "must be in [0, 1]",
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(KernelOptions::default().validate().is_ok());
    }

    #[test]
    fn rejects_zero_steps() {
        let options = KernelOptions {
            steps: 0,
            ..KernelOptions::default()
        };
        assert!(matches!(
            options.validate(),
            Err(CompileError::InvalidOption { name: "steps", .. })
        ));
    }

    #[test]
    fn rejects_counts_beyond_i32() {
        let options = KernelOptions {
            bounces: u32::MAX,
            ..KernelOptions::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let options: KernelOptions = serde_json::from_str(r#"{ "bounces": 3 }"#).unwrap();
        assert_eq!(options.bounces, 3);
        assert_eq!(options.steps, KernelOptions::default().steps);
    }
}
