#![doc = include_str!("../readme.md")]

/// Everything you need to get started with `bevy_parkour`
pub mod prelude {
    pub(crate) use {
        avian3d::prelude::*,
        bevy_app::prelude::*,
        bevy_derive::{Deref, DerefMut},
        bevy_ecs::prelude::*,
        bevy_enhanced_input::prelude::*,
        bevy_math::prelude::*,
        bevy_reflect::prelude::*,
        bevy_time::prelude::*,
        bevy_transform::prelude::*,
        bevy_utils::prelude::*,
    };

    pub use crate::{
        CharacterController, CharacterControllerState, ParkourPlugin, ParkourSystems,
        camera::{CameraEffects, CharacterControllerCamera, CharacterControllerCameraOf},
        input::{Crouch, Jump, Movement, RotateCamera, Sprint},
        kcc::{MovementModeChanged, WallRunEnded, WallRunStarted},
        locomotion::{LocomotionConfig, MovementMode, SpeedCurve, WallGravity, WallSide},
    };
}

use crate::{input::AccumulatedInput, locomotion::Locomotion, prelude::*};
use bevy_ecs::{
    intern::Interned, lifecycle::HookContext,
    relationship::RelationshipSourceCollection as _, schedule::ScheduleLabel,
    world::DeferredWorld,
};
use core::time::Duration;
use tracing::error;

pub mod camera;
mod fixed_update_utils;
pub mod input;
mod kcc;
pub mod locomotion;

/// Also requires you to add [`PhysicsPlugins`] and [`EnhancedInputPlugin`] to work properly.
pub struct ParkourPlugin {
    schedule: Interned<dyn ScheduleLabel>,
}

impl ParkourPlugin {
    /// Create a new plugin in the given schedule. The default is [`FixedPostUpdate`].
    pub fn new(schedule: impl ScheduleLabel) -> Self {
        Self {
            schedule: schedule.intern(),
        }
    }
}

impl Default for ParkourPlugin {
    fn default() -> Self {
        Self {
            schedule: FixedPostUpdate.intern(),
        }
    }
}

impl Plugin for ParkourPlugin {
    fn build(&self, app: &mut App) {
        app.configure_sets(
            self.schedule,
            ParkourSystems::MoveCharacters.in_set(PhysicsSystems::First),
        )
        .add_plugins((
            camera::plugin,
            input::plugin,
            kcc::plugin(self.schedule),
            fixed_update_utils::plugin,
        ));
    }
}

/// System set used by all systems of `bevy_parkour`.
#[derive(SystemSet, Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum ParkourSystems {
    MoveCharacters,
}

/// A force-driven first-person body.
///
/// The configuration is checked once, when the component is added. A controller
/// with an invalid configuration logs an error and never moves.
#[derive(Component, Clone, Reflect, Debug)]
#[reflect(Component)]
#[require(
    AccumulatedInput,
    CharacterControllerState,
    TransformInterpolation,
    RigidBody = RigidBody::Dynamic,
    Collider = Collider::cylinder(0.5, 2.0),
    LockedAxes = LockedAxes::ROTATION_LOCKED,
    Friction = Friction::ZERO.with_combine_rule(CoefficientCombine::Min),
    LinearDamping,
    GravityScale,
    Transform,
)]
#[component(on_add = CharacterController::on_add)]
pub struct CharacterController {
    pub config: LocomotionConfig,
    /// Used for every probe. The character itself is excluded automatically.
    pub filter: SpatialQueryFilter,
    /// What counts as ground for the wall-run height check.
    pub ground_layers: LayerMask,
    /// What can be run along.
    pub wall_layers: LayerMask,
    /// Camera height above the feet.
    pub standing_view_height: f32,
    pub crouch_view_height: f32,
    /// How long a jump press stays usable before it is dropped.
    pub jump_input_buffer: Duration,
}

impl Default for CharacterController {
    fn default() -> Self {
        Self {
            config: LocomotionConfig::default(),
            filter: SpatialQueryFilter::default(),
            ground_layers: LayerMask::ALL,
            wall_layers: LayerMask::ALL,
            standing_view_height: 1.7,
            crouch_view_height: 0.8,
            jump_input_buffer: Duration::from_millis(150),
        }
    }
}

impl CharacterController {
    pub fn on_add(mut world: DeferredWorld, ctx: HookContext) {
        let config = {
            let Some(mut controller) = world.get_mut::<Self>(ctx.entity) else {
                return;
            };
            controller.filter.excluded_entities.add(ctx.entity);
            controller.config.clone()
        };

        let locomotion = match Locomotion::new(config) {
            Ok(locomotion) => Some(locomotion),
            Err(err) => {
                error!("character controller {} will not move: {err}", ctx.entity);
                None
            }
        };

        let Some(mut state) = world.get_mut::<CharacterControllerState>(ctx.entity) else {
            return;
        };
        state.locomotion = locomotion;
    }
}

#[derive(Component, Clone, Reflect, Default, Debug)]
#[reflect(Component)]
pub struct CharacterControllerState {
    /// `None` when the configuration was rejected.
    #[reflect(ignore)]
    pub locomotion: Option<Locomotion>,
    pub mode: MovementMode,
    pub grounded: bool,
    pub current_speed: f32,
    pub desired_speed: f32,
}

impl CharacterControllerState {
    pub fn is_inert(&self) -> bool {
        self.locomotion.is_none()
    }

    pub fn crouching(&self) -> bool {
        matches!(self.mode, MovementMode::Crouching | MovementMode::Sliding)
    }

    /// Puts the character back into its spawn state, e.g. after a respawn.
    pub fn reset(&mut self) {
        if let Some(locomotion) = self.locomotion.as_mut() {
            locomotion.reset();
        }
        self.mode = self
            .locomotion
            .as_ref()
            .map_or(MovementMode::default(), Locomotion::mode);
        self.grounded = false;
        self.current_speed = 0.0;
        self.desired_speed = 0.0;
    }
}
