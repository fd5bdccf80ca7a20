use std::fmt;
use std::num::NonZeroU32;

use crate::camera::Camera;
use crate::material::Material;
use crate::shape::Shape;

/// Identifier of an [`Entity`] within its scene. Zero is reserved for
/// "nothing hit", so ids start at one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(NonZeroU32);

impl EntityId {
    pub fn new(raw: u32) -> Option<Self> {
        NonZeroU32::new(raw).map(Self)
    }

    pub const fn get(self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A shape paired with the material covering it.
#[derive(Clone, Debug)]
pub struct Entity {
    pub id: EntityId,
    pub shape: Shape,
    pub material: Material,
}

#[derive(Clone, Debug)]
pub struct Scene {
    pub entities: Vec<Entity>,
    pub camera: Camera,
    /// Medium surrounding every entity. Its colour is also the radiance of
    /// rays that leave the scene.
    pub air: Material,
}

impl Default for Scene {
    fn default() -> Self {
        Self {
            entities: Vec::new(),
            camera: Camera::default(),
            air: Material::default(),
        }
    }
}

impl Scene {
    pub fn builder() -> SceneBuilder {
        SceneBuilder::default()
    }

    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }
}

/// Collects entities and hands out their ids in insertion order.
#[derive(Debug)]
pub struct SceneBuilder {
    next_id: NonZeroU32,
    scene: Scene,
}

impl Default for SceneBuilder {
    fn default() -> Self {
        Self {
            next_id: NonZeroU32::MIN,
            scene: Scene::default(),
        }
    }
}

impl SceneBuilder {
    /// Adds an entity and returns its id.
    ///
    /// # Panics
    ///
    /// Panics after `u32::MAX` entities.
    pub fn push(&mut self, shape: Shape, material: Material) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id = self
            .next_id
            .checked_add(1)
            .unwrap_or_else(|| panic!("entity ids exhausted"));
        self.scene.entities.push(Entity {
            id,
            shape,
            material,
        });
        id
    }

    #[must_use]
    pub fn entity(mut self, shape: Shape, material: Material) -> Self {
        self.push(shape, material);
        self
    }

    #[must_use]
    pub fn camera(mut self, camera: Camera) -> Self {
        self.scene.camera = camera;
        self
    }

    #[must_use]
    pub fn air(mut self, air: Material) -> Self {
        self.scene.air = air;
        self
    }

    pub fn build(self) -> Scene {
        self.scene
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shape::sphere;

    #[test]
    fn ids_are_sequential_from_one() {
        let mut builder = Scene::builder();
        let a = builder.push(sphere(1.0), Material::new());
        let b = builder.push(sphere(2.0), Material::new());
        assert_eq!(a.get(), 1);
        assert_eq!(b.get(), 2);
        let scene = builder.build();
        assert!(scene.entity(b).is_some());
        assert!(scene.entity(EntityId::new(3).unwrap()).is_none());
    }

    #[test]
    fn builders_do_not_share_counters() {
        let first = Scene::builder().entity(sphere(1.0), Material::new()).build();
        let second = Scene::builder().entity(sphere(1.0), Material::new()).build();
        assert_eq!(first.entities[0].id, second.entities[0].id);
    }

    #[test]
    fn zero_is_not_an_id() {
        assert!(EntityId::new(0).is_none());
    }
}
