use bevy_math::prelude::*;

use super::{CollisionQuery, LocomotionConfig, Surface};

/// Ground under the body, as seen by a single downward probe.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlopeContact {
    pub normal: Vec3,
    /// Degrees between world-up and `normal`.
    pub angle: f32,
    /// `0 < angle < max_slope_angle`. Flat floors and walls are not slopes.
    pub on_slope: bool,
}

impl SlopeContact {
    pub fn from_normal(normal: Vec3, max_slope_angle: f32) -> Self {
        let normal = normal.try_normalize().unwrap_or(Vec3::Y);
        let angle = Vec3::Y.angle_between(normal).to_degrees();
        Self {
            normal,
            angle,
            on_slope: angle != 0.0 && angle < max_slope_angle,
        }
    }

    pub fn project(&self, direction: Vec3) -> Vec3 {
        project_onto_slope(direction, self)
    }
}

pub fn probe(
    collision: &dyn CollisionQuery,
    origin: Vec3,
    half_height: f32,
    cfg: &LocomotionConfig,
) -> Option<SlopeContact> {
    collision
        .cast_down(origin, half_height + cfg.slope_probe_margin, Surface::Any)
        .map(|hit| SlopeContact::from_normal(hit.normal, cfg.max_slope_angle))
}

/// Keeps `direction` tangent to the slope, then normalizes it.
pub fn project_onto_slope(direction: Vec3, contact: &SlopeContact) -> Vec3 {
    let normal = contact.normal;
    (direction - normal * direction.dot(normal)).normalize_or_zero()
}
