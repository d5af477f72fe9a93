use bevy_math::prelude::*;
use tracing::debug;

use super::{CollisionQuery, Intents, LocomotionConfig, MovementMode, SpeedProfile};

/// World facts the state machine decides on. Gathered before it runs.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Senses {
    pub grounded: bool,
    /// On a walkable slope and not climbing.
    pub downhill: bool,
    /// Nothing above the head would stop the body from standing up.
    pub ceiling_clear: bool,
    pub moving: bool,
    /// Smoothed speed from the previous tick.
    pub current_speed: f32,
}

/// The state machine's orders for the rest of the tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Directive {
    pub mode: MovementMode,
    pub desired_speed: f32,
    pub jump: bool,
    pub crouch_impulse: bool,
    /// Collision scale the body should have.
    pub scale: f32,
}

#[derive(Clone, Debug)]
pub struct MovementStateMachine {
    mode: MovementMode,
    desired_speed: f32,
    sliding: bool,
    /// The current crouch press already produced a slide.
    slide_spent: bool,
    slide_remaining: f32,
    wall_running: bool,
    crouch_force_applied: bool,
    ready_to_jump: bool,
    jump_cooldown_remaining: f32,
    exiting_slope: bool,
}

impl Default for MovementStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl MovementStateMachine {
    pub fn new() -> Self {
        Self {
            mode: MovementMode::Airborne,
            desired_speed: 0.0,
            sliding: false,
            slide_spent: false,
            slide_remaining: 0.0,
            wall_running: false,
            crouch_force_applied: false,
            ready_to_jump: true,
            jump_cooldown_remaining: 0.0,
            exiting_slope: false,
        }
    }

    pub fn mode(&self) -> MovementMode {
        self.mode
    }

    pub fn desired_speed(&self) -> f32 {
        self.desired_speed
    }

    pub fn is_sliding(&self) -> bool {
        self.sliding
    }

    pub fn is_wall_running(&self) -> bool {
        self.wall_running
    }

    pub fn ready_to_jump(&self) -> bool {
        self.ready_to_jump
    }

    pub fn exiting_slope(&self) -> bool {
        self.exiting_slope
    }

    pub fn crouch_force_applied(&self) -> bool {
        self.crouch_force_applied
    }

    /// The only way the wall-running flag changes. Starting a wall-run ends a slide.
    pub fn request_wall_run(&mut self, active: bool, profile: &SpeedProfile) {
        if active && !self.wall_running {
            self.request_slide(false, profile);
        }
        self.wall_running = active;
    }

    /// The only way the slide latch changes from outside a tick.
    ///
    /// Ending an active slide snaps the mode to crouching on the spot.
    pub fn request_slide(&mut self, active: bool, profile: &SpeedProfile) {
        match (active, self.sliding) {
            (true, false) => {
                self.sliding = true;
                self.slide_spent = true;
            }
            (false, true) => {
                self.sliding = false;
                if self.mode == MovementMode::Sliding {
                    self.mode = MovementMode::Crouching;
                    self.desired_speed = profile.crouch;
                }
                debug!("slide ended");
            }
            _ => {}
        }
    }

    pub fn tick(
        &mut self,
        dt: f32,
        intents: &Intents,
        senses: &Senses,
        profile: &SpeedProfile,
        cfg: &LocomotionConfig,
    ) -> Directive {
        let dt = dt.max(0.0);
        self.tick_jump_cooldown(dt);

        let crouch_held = intents.crouch > 0.0;
        let jump = intents.jump > 0.0 && senses.grounded && self.ready_to_jump && !self.wall_running;
        if jump {
            self.ready_to_jump = false;
            self.jump_cooldown_remaining = cfg.jump_cooldown.as_secs_f32();
            self.exiting_slope = true;
            self.request_slide(false, profile);
        }

        if !crouch_held {
            self.slide_spent = false;
        }
        if self.sliding {
            if !crouch_held {
                self.request_slide(false, profile);
            } else if !senses.downhill {
                self.slide_remaining = (self.slide_remaining - dt).max(0.0);
                if self.slide_remaining <= 0.0 {
                    self.request_slide(false, profile);
                }
            }
        } else if crouch_held
            && !self.slide_spent
            && !jump
            && !self.wall_running
            && senses.grounded
            && senses.moving
            && senses.current_speed > cfg.slide_floor()
        {
            self.request_slide(true, profile);
            self.slide_remaining = cfg.max_slide_time.as_secs_f32();
            debug!("slide started at {:.2}", senses.current_speed);
        }

        let grounded = senses.grounded;
        let mut desired = self.desired_speed;
        let mode = if self.wall_running {
            MovementMode::WallRunning
        } else if self.sliding {
            MovementMode::Sliding
        } else if crouch_held || (grounded && !senses.ceiling_clear) {
            MovementMode::Crouching
        } else if grounded && intents.sprint > 0.0 {
            MovementMode::Sprinting
        } else if grounded {
            MovementMode::Walking
        } else {
            MovementMode::Airborne
        };
        // airborne crouching keeps whatever speed the air inherited
        if grounded || mode == MovementMode::Sliding {
            if let Some(target) = profile.target(mode) {
                desired = target;
            }
        }

        let wants_low = matches!(mode, MovementMode::Crouching | MovementMode::Sliding)
            || (crouch_held && !self.wall_running);
        let mut crouch_impulse = false;
        let scale = if wants_low {
            if grounded && !self.crouch_force_applied {
                crouch_impulse = true;
                self.crouch_force_applied = true;
            }
            cfg.crouch_scale
        } else if !senses.ceiling_clear {
            cfg.crouch_scale
        } else {
            self.crouch_force_applied = false;
            cfg.stand_scale
        };

        self.mode = mode;
        self.desired_speed = desired;
        Directive {
            mode,
            desired_speed: desired,
            jump,
            crouch_impulse,
            scale,
        }
    }

    fn tick_jump_cooldown(&mut self, dt: f32) {
        if self.ready_to_jump {
            return;
        }
        self.jump_cooldown_remaining = (self.jump_cooldown_remaining - dt).max(0.0);
        if self.jump_cooldown_remaining <= 0.0 {
            self.ready_to_jump = true;
            self.exiting_slope = false;
        }
    }
}

/// Thin upward ray: is there room to grow from the current scale back to standing height?
pub fn can_crouch_up(
    collision: &dyn CollisionQuery,
    position: Vec3,
    scale: f32,
    cfg: &LocomotionConfig,
) -> bool {
    if scale >= cfg.stand_scale {
        return true;
    }
    // feet stay put, so the standing head ends up this far above the current center
    let clearance = cfg.height_at(cfg.stand_scale) - cfg.height_at(scale) * 0.5;
    collision.cast_up(position, clearance).is_none()
}
