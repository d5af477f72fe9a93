use bevy_reflect::prelude::*;
use core::time::Duration;

use super::{curve::SpeedCurve, error::ConfigError};

/// How gravity is handled while a wall-run is active.
#[derive(Clone, Copy, Reflect, Debug, PartialEq)]
pub enum WallGravity {
    /// World gravity is switched off for the duration of the run.
    Disabled,
    /// World gravity stays on and this upward force partially cancels it.
    Counter(f32),
}

/// Every tunable of the controller. Loaded once and never mutated while ticking.
#[derive(Clone, Reflect, Debug)]
pub struct LocomotionConfig {
    // Speeds
    pub walk_speed: f32,
    pub sprint_speed: f32,
    pub crouch_speed: f32,
    pub slide_speed: f32,
    /// A slide only starts above this smoothed speed, and ends once the decay drops to it.
    pub minimum_slide_speed: f32,

    // Speed smoothing
    /// Changes in desired speed above this start a smoothing pass instead of snapping.
    pub speed_change_threshold: f32,
    pub speed_increase_multiplier: f32,
    pub slope_increase_multiplier: f32,
    pub slide_smoothing_rate: f32,
    pub speed_curve: SpeedCurve,
    pub slide_curve: SpeedCurve,

    // Forces
    pub ground_force: f32,
    pub slope_force: f32,
    /// Downward force pressing the body into a slope while it climbs.
    pub slope_stick_force: f32,
    pub air_multiplier: f32,
    pub slide_force: f32,
    /// Constant downward force added on top of world gravity.
    pub extra_gravity: f32,
    pub ground_drag: f32,
    pub air_drag: f32,

    // Geometry
    /// Standing collision height at `stand_scale`.
    pub height: f32,
    pub ground_distance: f32,
    pub slope_probe_margin: f32,
    /// Degrees from world-up.
    pub max_slope_angle: f32,

    // Crouch and slide
    pub crouch_scale: f32,
    pub stand_scale: f32,
    pub crouch_impulse: f32,
    pub max_slide_time: Duration,

    // Jump
    pub jump_force: f32,
    pub jump_cooldown: Duration,

    // Wall-run
    pub wall_check_distance: f32,
    /// Required clearance below the body before a wall-run may start.
    pub min_jump_height: f32,
    pub wall_run_force: f32,
    pub wall_push_force: f32,
    pub wall_climb_speed: f32,
    pub wall_gravity: WallGravity,
    pub max_wall_run_time: Duration,
    pub exit_wall_time: Duration,
    pub wall_jump_up_force: f32,
    pub wall_jump_side_force: f32,
}

impl Default for LocomotionConfig {
    fn default() -> Self {
        Self {
            walk_speed: 7.0,
            sprint_speed: 12.0,
            crouch_speed: 3.5,
            slide_speed: 18.0,
            minimum_slide_speed: 4.0,
            speed_change_threshold: 4.0,
            speed_increase_multiplier: 1.5,
            slope_increase_multiplier: 2.5,
            slide_smoothing_rate: 0.5,
            speed_curve: SpeedCurve::default(),
            slide_curve: SpeedCurve::linear(1.0),
            ground_force: 10.0,
            slope_force: 20.0,
            slope_stick_force: 80.0,
            air_multiplier: 0.4,
            slide_force: 400.0,
            extra_gravity: 10.0,
            ground_drag: 5.0,
            air_drag: 1.0,
            height: 2.0,
            ground_distance: 0.1,
            slope_probe_margin: 0.3,
            max_slope_angle: 40.0,
            crouch_scale: 0.5,
            stand_scale: 1.0,
            crouch_impulse: 20.0,
            max_slide_time: Duration::from_millis(750),
            jump_force: 12.0,
            jump_cooldown: Duration::from_millis(250),
            wall_check_distance: 0.7,
            min_jump_height: 2.0,
            wall_run_force: 200.0,
            wall_push_force: 100.0,
            wall_climb_speed: 3.0,
            wall_gravity: WallGravity::Disabled,
            max_wall_run_time: Duration::from_millis(1500),
            exit_wall_time: Duration::from_millis(200),
            wall_jump_up_force: 7.0,
            wall_jump_side_force: 12.0,
        }
    }
}

impl LocomotionConfig {
    /// Collision height at a given vertical scale.
    pub fn height_at(&self, scale: f32) -> f32 {
        self.height * scale / self.stand_scale
    }

    /// Speed at which a decaying slide is spent. Never below crouching speed.
    pub fn slide_floor(&self) -> f32 {
        self.minimum_slide_speed.max(self.crouch_speed)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.speed_curve.validate("speed_curve")?;
        self.slide_curve.validate("slide_curve")?;

        for (field, value) in [
            ("walk_speed", self.walk_speed),
            ("sprint_speed", self.sprint_speed),
            ("crouch_speed", self.crouch_speed),
            ("slide_speed", self.slide_speed),
            ("speed_increase_multiplier", self.speed_increase_multiplier),
            ("slope_increase_multiplier", self.slope_increase_multiplier),
            ("slide_smoothing_rate", self.slide_smoothing_rate),
            ("ground_force", self.ground_force),
            ("slope_force", self.slope_force),
            ("air_multiplier", self.air_multiplier),
            ("slide_force", self.slide_force),
            ("height", self.height),
            ("crouch_scale", self.crouch_scale),
            ("stand_scale", self.stand_scale),
            ("jump_force", self.jump_force),
            ("wall_check_distance", self.wall_check_distance),
            ("wall_run_force", self.wall_run_force),
            ("wall_jump_up_force", self.wall_jump_up_force),
            ("wall_jump_side_force", self.wall_jump_side_force),
            (
                "max_wall_run_time",
                self.max_wall_run_time.as_secs_f32(),
            ),
        ] {
            positive(field, value)?;
        }

        for (field, value) in [
            ("minimum_slide_speed", self.minimum_slide_speed),
            ("speed_change_threshold", self.speed_change_threshold),
            ("slope_stick_force", self.slope_stick_force),
            ("extra_gravity", self.extra_gravity),
            ("ground_drag", self.ground_drag),
            ("air_drag", self.air_drag),
            ("ground_distance", self.ground_distance),
            ("slope_probe_margin", self.slope_probe_margin),
            ("crouch_impulse", self.crouch_impulse),
            ("min_jump_height", self.min_jump_height),
            ("wall_push_force", self.wall_push_force),
            ("wall_climb_speed", self.wall_climb_speed),
        ] {
            non_negative(field, value)?;
        }

        if !(self.max_slope_angle > 0.0 && self.max_slope_angle < 90.0) {
            return Err(ConfigError::OutOfRange {
                field: "max_slope_angle",
                value: self.max_slope_angle,
            });
        }
        if self.crouch_scale > self.stand_scale {
            return Err(ConfigError::OutOfRange {
                field: "crouch_scale",
                value: self.crouch_scale,
            });
        }
        if let WallGravity::Counter(force) = self.wall_gravity {
            non_negative("wall_gravity", force)?;
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field });
    }
    if value <= 0.0 {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(())
}

fn non_negative(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field });
    }
    if value < 0.0 {
        return Err(ConfigError::OutOfRange { field, value });
    }
    Ok(())
}
