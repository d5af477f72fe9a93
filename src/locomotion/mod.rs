//! Engine-agnostic locomotion core.
//!
//! [`Locomotion`] owns the movement state machine, the speed regulator and the
//! wall-run controller. Every fixed tick it is handed a [`Rig`] with the
//! collaborators it needs: a [`CollisionQuery`] to probe the world, a [`Body`]
//! to push around, an [`InputSampler`] and optionally some
//! [`PresentationHooks`].

use bevy_math::prelude::*;
use bevy_reflect::prelude::*;
use tracing::debug;

pub mod config;
pub mod curve;
pub mod error;
pub mod integrator;
pub mod slope;
pub mod speed;
pub mod state_machine;
pub mod wall_run;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{LocomotionConfig, WallGravity};
pub use curve::SpeedCurve;
pub use error::{ConfigError, LocomotionError};
pub use slope::SlopeContact;
pub use speed::{SpeedProfile, SpeedRegulator};
pub use state_machine::MovementStateMachine;
pub use wall_run::{WallRunController, WallRunPhase};

/// A body on a slope counts as going downhill once it sinks at least this fast.
pub const DESCENT_EPSILON: f32 = 0.1;

#[derive(Clone, Copy, Reflect, Debug, Default, PartialEq, Eq, Hash)]
pub enum MovementMode {
    #[default]
    Walking,
    Sprinting,
    Crouching,
    Sliding,
    Airborne,
    WallRunning,
}

impl MovementMode {
    pub fn is_grounded(self) -> bool {
        matches!(
            self,
            Self::Walking | Self::Sprinting | Self::Crouching | Self::Sliding
        )
    }
}

#[derive(Clone, Copy, Reflect, Debug, PartialEq, Eq, Hash)]
pub enum WallSide {
    Left,
    Right,
}

/// What the player wants this tick. Analog fields are either a 0/1 pulse or a 0..1 magnitude.
#[derive(Clone, Copy, Reflect, Debug, Default, PartialEq)]
pub struct Intents {
    /// `x` is strafe (right positive), `y` is forward.
    pub movement: Vec2,
    pub jump: f32,
    pub crouch: f32,
    pub sprint: f32,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Hit {
    pub normal: Vec3,
    pub distance: f32,
}

/// Which layers a probe should consider.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Surface {
    Any,
    Ground,
    Wall,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ForceMode {
    /// Continuous force, integrated over the physics step.
    Force,
    /// Instant change in momentum.
    Impulse,
}

pub trait CollisionQuery {
    fn cast_down(&self, origin: Vec3, max_distance: f32, surface: Surface) -> Option<Hit>;

    fn cast_side(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        surface: Surface,
    ) -> Option<Hit>;

    fn cast_up(&self, origin: Vec3, max_distance: f32) -> Option<Hit>;
}

/// The rigid body being driven.
pub trait Body {
    fn position(&self) -> Vec3;
    fn velocity(&self) -> Vec3;
    fn set_velocity(&mut self, velocity: Vec3);
    fn add_force(&mut self, force: Vec3, mode: ForceMode);
    fn drag(&self) -> f32;
    fn set_drag(&mut self, drag: f32);
    fn uses_gravity(&self) -> bool;
    fn set_use_gravity(&mut self, enabled: bool);
    fn scale_y(&self) -> f32;
    fn set_scale_y(&mut self, scale: f32);
}

pub trait InputSampler {
    fn sample(&self) -> Intents;
}

impl InputSampler for Intents {
    fn sample(&self) -> Intents {
        *self
    }
}

/// Fire-and-forget notifications, delivered after all forces of a tick have been applied.
pub trait PresentationHooks {
    fn on_mode_changed(&mut self, mode: MovementMode);
    fn on_wall_run_start(&mut self, side: WallSide);
    fn on_wall_run_end(&mut self);
}

/// Flat facing axes derived from the look orientation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Heading {
    pub forward: Vec3,
    pub right: Vec3,
}

impl Heading {
    pub fn from_orientation(rotation: Quat) -> Self {
        Self {
            forward: (rotation * Vec3::NEG_Z).with_y(0.0).normalize_or_zero(),
            right: (rotation * Vec3::X).with_y(0.0).normalize_or_zero(),
        }
    }

    pub fn wish_direction(&self, movement: Vec2) -> Vec3 {
        (self.forward * movement.y + self.right * movement.x).normalize_or_zero()
    }
}

/// Collaborators for a single tick.
pub struct Rig<'a> {
    pub collision: &'a dyn CollisionQuery,
    pub body: &'a mut dyn Body,
    pub input: &'a dyn InputSampler,
    pub hooks: Option<&'a mut dyn PresentationHooks>,
    pub orientation: Quat,
}

impl<'a> Rig<'a> {
    pub fn builder() -> RigBuilder<'a> {
        RigBuilder::default()
    }
}

#[derive(Default)]
pub struct RigBuilder<'a> {
    collision: Option<&'a dyn CollisionQuery>,
    body: Option<&'a mut dyn Body>,
    input: Option<&'a dyn InputSampler>,
    hooks: Option<&'a mut dyn PresentationHooks>,
    orientation: Option<Quat>,
}

impl<'a> RigBuilder<'a> {
    pub fn collision(mut self, collision: &'a dyn CollisionQuery) -> Self {
        self.collision = Some(collision);
        self
    }

    pub fn body(mut self, body: &'a mut dyn Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn input(mut self, input: &'a dyn InputSampler) -> Self {
        self.input = Some(input);
        self
    }

    pub fn hooks(mut self, hooks: &'a mut dyn PresentationHooks) -> Self {
        self.hooks = Some(hooks);
        self
    }

    pub fn orientation(mut self, orientation: Quat) -> Self {
        self.orientation = Some(orientation);
        self
    }

    pub fn build(self) -> Result<Rig<'a>, LocomotionError> {
        Ok(Rig {
            collision: self
                .collision
                .ok_or(LocomotionError::MissingDependency("collision query"))?,
            body: self
                .body
                .ok_or(LocomotionError::MissingDependency("rigid body"))?,
            input: self
                .input
                .ok_or(LocomotionError::MissingDependency("input sampler"))?,
            hooks: self.hooks,
            orientation: self
                .orientation
                .ok_or(LocomotionError::MissingDependency("orientation"))?,
        })
    }
}

/// What happened during a tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickReport {
    pub mode: MovementMode,
    pub current_speed: f32,
    pub desired_speed: f32,
    pub grounded: bool,
    pub jumped: bool,
    pub wall_jumped: bool,
}

enum Notification {
    ModeChanged(MovementMode),
    WallRunStarted(WallSide),
    WallRunEnded,
}

/// A character's complete locomotion state, bound to one body for its lifetime.
#[derive(Clone, Debug)]
pub struct Locomotion {
    config: LocomotionConfig,
    machine: MovementStateMachine,
    speed: SpeedRegulator,
    wall: WallRunController,
    last_mode: Option<MovementMode>,
    tick_index: u64,
}

impl Locomotion {
    pub fn new(config: LocomotionConfig) -> Result<Self, LocomotionError> {
        config.validate()?;
        Ok(Self {
            machine: MovementStateMachine::new(),
            speed: SpeedRegulator::new(SpeedProfile::from_config(&config)),
            wall: WallRunController::default(),
            last_mode: None,
            tick_index: 0,
            config,
        })
    }

    pub fn config(&self) -> &LocomotionConfig {
        &self.config
    }

    pub fn mode(&self) -> MovementMode {
        self.machine.mode()
    }

    /// The regulator's smoothed speed, before the cap applied when a slide runs out.
    pub fn current_speed(&self) -> f32 {
        self.speed.current()
    }

    pub fn machine(&self) -> &MovementStateMachine {
        &self.machine
    }

    pub fn speed(&self) -> &SpeedRegulator {
        &self.speed
    }

    pub fn wall_run(&self) -> &WallRunController {
        &self.wall
    }

    /// Back to the freshly spawned state: speeds zeroed, every timer cleared.
    pub fn reset(&mut self) {
        self.machine = MovementStateMachine::new();
        self.speed.reset();
        self.wall = WallRunController::default();
        self.last_mode = None;
    }

    pub fn tick(&mut self, dt: f32, rig: &mut Rig<'_>) -> TickReport {
        let dt = dt.max(0.0);
        self.tick_index = self.tick_index.wrapping_add(1);
        let cfg = &self.config;
        let intents = rig.input.sample();
        let heading = Heading::from_orientation(rig.orientation);
        let mut notifications = Vec::new();

        let position = rig.body.position();
        let scale = rig.body.scale_y();
        let half_height = cfg.height_at(scale) * 0.5;
        let grounded = rig
            .collision
            .cast_down(position, half_height + cfg.ground_distance, Surface::Any)
            .is_some();
        let contact = slope::probe(rig.collision, position, half_height, cfg);
        let ceiling_clear = state_machine::can_crouch_up(rig.collision, position, scale, cfg);

        let wall_event = self
            .wall
            .update(dt, &intents, &heading, rig.collision, &mut *rig.body, cfg);
        match wall_event {
            wall_run::WallRunEvent::Started(side) => {
                notifications.push(Notification::WallRunStarted(side));
            }
            wall_run::WallRunEvent::Stopped
            | wall_run::WallRunEvent::TimedOut
            | wall_run::WallRunEvent::Jumped => {
                notifications.push(Notification::WallRunEnded);
            }
            wall_run::WallRunEvent::None | wall_run::WallRunEvent::LockoutExpired => {}
        }
        self.machine
            .request_wall_run(self.wall.is_running(), self.speed.profile());

        let on_slope = contact
            .filter(|contact| contact.on_slope && !self.machine.exiting_slope())
            .is_some();
        let downhill = on_slope && rig.body.velocity().y <= -DESCENT_EPSILON;
        let senses = state_machine::Senses {
            grounded,
            downhill,
            ceiling_clear,
            moving: intents.movement != Vec2::ZERO,
            current_speed: self.speed.current(),
        };
        let mut directive = self.machine.tick(dt, &intents, &senses, self.speed.profile(), cfg);

        // a jump this tick raises the exit-slope latch
        let slope = contact.filter(|contact| contact.on_slope && !self.machine.exiting_slope());

        let sample = self.speed.tick(
            self.tick_index,
            dt,
            directive.desired_speed,
            speed::SpeedContext {
                mode: directive.mode,
                slope_angle: slope.map(|contact| contact.angle),
                downhill,
            },
            cfg,
        );
        let mut current_speed = sample.current;
        if sample.slide_exhausted {
            self.machine.request_slide(false, self.speed.profile());
            directive.mode = self.machine.mode();
            directive.desired_speed = self.machine.desired_speed();
            current_speed = current_speed.min(directive.desired_speed);
        }

        if directive.jump {
            integrator::jump(&mut *rig.body, cfg.jump_force);
        }
        integrator::apply_stance(&mut *rig.body, directive.scale, directive.crouch_impulse, cfg);
        if self.wall.is_running() {
            self.wall.apply_forces(&mut *rig.body, &intents, &heading, cfg);
        } else {
            integrator::apply_movement(
                &mut *rig.body,
                heading.wish_direction(intents.movement),
                current_speed,
                directive.mode,
                slope.as_ref(),
                cfg,
            );
        }
        let wall_jumped = wall_event == wall_run::WallRunEvent::Jumped;
        // the push-off tick is outside the envelope
        if !wall_jumped {
            integrator::clamp_speed(&mut *rig.body, current_speed, slope.is_some());
        }
        integrator::validate_velocity(&mut *rig.body);

        if self.last_mode != Some(directive.mode) {
            debug!(
                "movement mode {:?} -> {:?}",
                self.last_mode, directive.mode
            );
            notifications.push(Notification::ModeChanged(directive.mode));
            self.last_mode = Some(directive.mode);
        }
        if let Some(hooks) = rig.hooks.as_deref_mut() {
            for notification in notifications {
                match notification {
                    Notification::ModeChanged(mode) => hooks.on_mode_changed(mode),
                    Notification::WallRunStarted(side) => hooks.on_wall_run_start(side),
                    Notification::WallRunEnded => hooks.on_wall_run_end(),
                }
            }
        }

        TickReport {
            mode: directive.mode,
            current_speed,
            desired_speed: directive.desired_speed,
            grounded,
            jumped: directive.jump,
            wall_jumped,
        }
    }
}
