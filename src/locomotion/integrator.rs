//! Turns the tick's decisions into forces, drag, gravity and velocity limits.

use bevy_math::prelude::*;
use tracing::warn;

use super::{
    Body, DESCENT_EPSILON, ForceMode, LocomotionConfig, MovementMode, SlopeContact,
    slope::project_onto_slope,
};

/// Drives the body along `direction` for every mode except wall-running.
///
/// `slope` must only be passed for a valid slope contact that is not suppressed
/// by the exit-slope latch.
pub fn apply_movement(
    body: &mut dyn Body,
    direction: Vec3,
    current_speed: f32,
    mode: MovementMode,
    slope: Option<&SlopeContact>,
    cfg: &LocomotionConfig,
) {
    let velocity = body.velocity();
    match (mode, slope) {
        (MovementMode::WallRunning, _) => return,
        (MovementMode::Sliding, Some(contact)) if velocity.y <= -DESCENT_EPSILON => {
            body.add_force(
                project_onto_slope(direction, contact) * cfg.slide_force,
                ForceMode::Force,
            );
            body.set_drag(cfg.ground_drag);
        }
        (MovementMode::Sliding, _) => {
            body.add_force(direction.normalize_or_zero() * cfg.slide_force, ForceMode::Force);
            body.set_drag(cfg.ground_drag);
        }
        (MovementMode::Airborne, _) => {
            body.add_force(
                direction.normalize_or_zero()
                    * (current_speed * cfg.ground_force * cfg.air_multiplier),
                ForceMode::Force,
            );
            body.set_drag(cfg.air_drag);
        }
        (_, Some(contact)) => {
            body.add_force(
                project_onto_slope(direction, contact) * (current_speed * cfg.slope_force),
                ForceMode::Force,
            );
            // keeps the body from launching off the top of a ramp
            if velocity.y > 0.0 {
                body.add_force(Vec3::NEG_Y * cfg.slope_stick_force, ForceMode::Force);
            }
            body.set_drag(cfg.ground_drag);
        }
        (_, None) => {
            body.add_force(
                direction.normalize_or_zero() * (current_speed * cfg.ground_force),
                ForceMode::Force,
            );
            body.set_drag(cfg.ground_drag);
        }
    }

    body.set_use_gravity(slope.is_none());
    if body.uses_gravity() && cfg.extra_gravity > 0.0 {
        body.add_force(Vec3::NEG_Y * cfg.extra_gravity, ForceMode::Force);
    }
}

/// Caps velocity at the tick's speed. Off slopes, vertical velocity is left alone.
pub fn clamp_speed(body: &mut dyn Body, current_speed: f32, on_slope: bool) {
    let velocity = body.velocity();
    if on_slope {
        if velocity.length() > current_speed {
            body.set_velocity(velocity.normalize_or_zero() * current_speed);
        }
        return;
    }
    let flat = velocity.with_y(0.0);
    if flat.length() > current_speed {
        let limited = flat.normalize_or_zero() * current_speed;
        body.set_velocity(limited.with_y(velocity.y));
    }
}

/// Jump height does not depend on how fast the body was already moving vertically.
pub fn jump(body: &mut dyn Body, force: f32) {
    body.set_velocity(body.velocity().with_y(0.0));
    body.add_force(Vec3::Y * force, ForceMode::Impulse);
}

pub fn apply_stance(body: &mut dyn Body, scale: f32, crouch_impulse: bool, cfg: &LocomotionConfig) {
    if body.scale_y() != scale {
        body.set_scale_y(scale);
    }
    if crouch_impulse && cfg.crouch_impulse > 0.0 {
        // the shrunk collider would otherwise float for a few frames
        body.add_force(Vec3::NEG_Y * cfg.crouch_impulse, ForceMode::Impulse);
    }
}

pub fn validate_velocity(body: &mut dyn Body) {
    let mut velocity = body.velocity();
    let mut dirty = false;
    for i in 0..3 {
        if !velocity[i].is_finite() {
            warn!("velocity[{i}] is not finite: {}, setting to 0", velocity[i]);
            velocity[i] = 0.0;
            dirty = true;
        }
    }
    if dirty {
        body.set_velocity(velocity);
    }
}
