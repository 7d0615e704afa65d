//! Entity controllers.
//!
//! Controllers are polymorphic behaviors attached to an entity and
//! persisted through [`Entity::controller`](super::Entity). They are
//! reconstructed from their type tag via the registry, so new controller
//! types can be added without touching the serializer.

use std::sync::OnceLock;

use crate::serialize::{Reflect, Schema};

/// Orbits the entity around a target point.
pub struct OrbitController {
    pub target: [f32; 3],
    pub distance: f32,
    /// Angular speed in radians per second.
    pub speed: f32,
}

impl Default for OrbitController {
    fn default() -> Self {
        Self {
            target: [0.0, 0.0, 0.0],
            distance: 5.0,
            speed: 1.0,
        }
    }
}

impl Reflect for OrbitController {
    const NAME: &'static str = "OrbitController";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<OrbitController>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::NAME)
                .field(
                    1,
                    |c: &OrbitController| &c.target,
                    |c: &mut OrbitController| &mut c.target,
                )
                .field(
                    2,
                    |c: &OrbitController| &c.distance,
                    |c: &mut OrbitController| &mut c.distance,
                )
                .field(
                    3,
                    |c: &OrbitController| &c.speed,
                    |c: &mut OrbitController| &mut c.speed,
                )
        })
    }
}

/// Free-fly movement driven by editor input.
pub struct FreeFlyController {
    pub move_speed: f32,
    pub look_speed: f32,
}

impl Default for FreeFlyController {
    fn default() -> Self {
        Self {
            move_speed: 4.0,
            look_speed: 0.2,
        }
    }
}

impl Reflect for FreeFlyController {
    const NAME: &'static str = "FreeFlyController";

    fn schema() -> &'static Schema<Self> {
        static SCHEMA: OnceLock<Schema<FreeFlyController>> = OnceLock::new();
        SCHEMA.get_or_init(|| {
            Schema::new(Self::NAME)
                .field(
                    1,
                    |c: &FreeFlyController| &c.move_speed,
                    |c: &mut FreeFlyController| &mut c.move_speed,
                )
                .field(
                    2,
                    |c: &FreeFlyController| &c.look_speed,
                    |c: &mut FreeFlyController| &mut c.look_speed,
                )
        })
    }
}
