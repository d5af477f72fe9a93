use bevy_ecs::{intern::Interned, schedule::ScheduleLabel};
use tracing::error;

use crate::{
    CharacterControllerState,
    input::AccumulatedInput,
    locomotion::{
        Body, CollisionQuery, ForceMode, Hit, PresentationHooks, Rig, Surface, TickReport,
    },
    prelude::*,
};

pub(super) fn plugin(schedule: Interned<dyn ScheduleLabel>) -> impl Fn(&mut App) {
    move |app: &mut App| {
        app.add_message::<MovementModeChanged>()
            .add_message::<WallRunStarted>()
            .add_message::<WallRunEnded>()
            .add_systems(
                schedule,
                run_controller.in_set(ParkourSystems::MoveCharacters),
            );
    }
}

/// Written whenever a character switches [`MovementMode`], including its first tick.
#[derive(Message, Clone, Copy, Debug, PartialEq)]
pub struct MovementModeChanged {
    pub entity: Entity,
    pub mode: MovementMode,
}

#[derive(Message, Clone, Copy, Debug, PartialEq)]
pub struct WallRunStarted {
    pub entity: Entity,
    pub side: WallSide,
}

/// The wall-run ended, whether by jumping off, timing out or losing the wall.
#[derive(Message, Clone, Copy, Debug, PartialEq)]
pub struct WallRunEnded {
    pub entity: Entity,
}

fn run_controller(
    mut controllers: Query<(
        Entity,
        &CharacterController,
        &mut CharacterControllerState,
        &mut AccumulatedInput,
        &mut Transform,
        &mut LinearVelocity,
        &mut LinearDamping,
        &mut GravityScale,
        &ComputedMass,
        Option<&CharacterControllerCamera>,
    )>,
    cams: Query<&Transform, Without<CharacterController>>,
    spatial_query: SpatialQuery,
    time: Res<Time>,
    mut mode_changed: MessageWriter<MovementModeChanged>,
    mut wall_run_started: MessageWriter<WallRunStarted>,
    mut wall_run_ended: MessageWriter<WallRunEnded>,
) {
    for (
        entity,
        controller,
        mut state,
        mut input,
        mut transform,
        mut velocity,
        mut damping,
        mut gravity,
        mass,
        cam,
    ) in &mut controllers
    {
        let state = &mut *state;
        let Some(locomotion) = state.locomotion.as_mut() else {
            continue;
        };

        let orientation = cam
            .and_then(|e| cams.get(e.get()).ok())
            .map_or(transform.rotation, |camera| camera.rotation);
        let probe = AvianProbe::new(&spatial_query, controller);
        let mut body = AvianBody {
            transform: &mut transform,
            velocity: &mut velocity,
            damping: &mut damping,
            gravity: &mut gravity,
            inverse_mass: mass.inverse(),
            dt: time.delta_secs(),
        };
        let mut hooks = MessageHooks {
            entity,
            mode_changed: &mut mode_changed,
            wall_run_started: &mut wall_run_started,
            wall_run_ended: &mut wall_run_ended,
        };

        let report = {
            let rig = Rig::builder()
                .collision(&probe)
                .body(&mut body)
                .input(&*input)
                .hooks(&mut hooks)
                .orientation(orientation)
                .build();
            let mut rig = match rig {
                Ok(rig) => rig,
                Err(err) => {
                    error!("skipping character controller {entity}: {err}");
                    continue;
                }
            };
            locomotion.tick(time.delta_secs(), &mut rig)
        };

        if report.jumped || report.wall_jumped {
            input.jumped = None;
        }
        record(state, &report);
    }
}

fn record(state: &mut CharacterControllerState, report: &TickReport) {
    state.mode = report.mode;
    state.grounded = report.grounded;
    state.current_speed = report.current_speed;
    state.desired_speed = report.desired_speed;
}

/// Ray probes against the Avian world, filtered per [`Surface`].
struct AvianProbe<'a, 'w, 's> {
    spatial_query: &'a SpatialQuery<'w, 's>,
    any: SpatialQueryFilter,
    ground: SpatialQueryFilter,
    wall: SpatialQueryFilter,
}

impl<'a, 'w, 's> AvianProbe<'a, 'w, 's> {
    fn new(spatial_query: &'a SpatialQuery<'w, 's>, controller: &CharacterController) -> Self {
        Self {
            spatial_query,
            any: controller.filter.clone(),
            ground: controller
                .filter
                .clone()
                .with_mask(controller.ground_layers),
            wall: controller.filter.clone().with_mask(controller.wall_layers),
        }
    }

    fn filter(&self, surface: Surface) -> &SpatialQueryFilter {
        match surface {
            Surface::Any => &self.any,
            Surface::Ground => &self.ground,
            Surface::Wall => &self.wall,
        }
    }

    fn cast(
        &self,
        origin: Vec3,
        direction: Dir3,
        max_distance: f32,
        filter: &SpatialQueryFilter,
    ) -> Option<Hit> {
        self.spatial_query
            .cast_ray(origin, direction, max_distance, true, filter)
            .map(|hit| Hit {
                normal: hit.normal,
                distance: hit.distance,
            })
    }
}

impl CollisionQuery for AvianProbe<'_, '_, '_> {
    fn cast_down(&self, origin: Vec3, max_distance: f32, surface: Surface) -> Option<Hit> {
        self.cast(origin, Dir3::NEG_Y, max_distance, self.filter(surface))
    }

    fn cast_side(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        surface: Surface,
    ) -> Option<Hit> {
        let direction = Dir3::new(direction).ok()?;
        self.cast(origin, direction, max_distance, self.filter(surface))
    }

    fn cast_up(&self, origin: Vec3, max_distance: f32) -> Option<Hit> {
        self.cast(origin, Dir3::Y, max_distance, &self.any)
    }
}

/// A dynamic rigid body. Forces are integrated into the velocity right away, so the
/// solver step that follows sees them.
struct AvianBody<'a> {
    transform: &'a mut Transform,
    velocity: &'a mut LinearVelocity,
    damping: &'a mut LinearDamping,
    gravity: &'a mut GravityScale,
    inverse_mass: f32,
    dt: f32,
}

impl Body for AvianBody<'_> {
    fn position(&self) -> Vec3 {
        self.transform.translation
    }

    fn velocity(&self) -> Vec3 {
        self.velocity.0
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity.0 = velocity;
    }

    fn add_force(&mut self, force: Vec3, mode: ForceMode) {
        let delta = match mode {
            ForceMode::Force => force * self.inverse_mass * self.dt,
            ForceMode::Impulse => force * self.inverse_mass,
        };
        self.velocity.0 += delta;
    }

    fn drag(&self) -> f32 {
        self.damping.0
    }

    fn set_drag(&mut self, drag: f32) {
        self.damping.0 = drag;
    }

    fn uses_gravity(&self) -> bool {
        self.gravity.0 != 0.0
    }

    fn set_use_gravity(&mut self, enabled: bool) {
        self.gravity.0 = if enabled { 1.0 } else { 0.0 };
    }

    fn scale_y(&self) -> f32 {
        self.transform.scale.y
    }

    fn set_scale_y(&mut self, scale: f32) {
        self.transform.scale.y = scale;
    }
}

struct MessageHooks<'a, 'w> {
    entity: Entity,
    mode_changed: &'a mut MessageWriter<'w, MovementModeChanged>,
    wall_run_started: &'a mut MessageWriter<'w, WallRunStarted>,
    wall_run_ended: &'a mut MessageWriter<'w, WallRunEnded>,
}

impl PresentationHooks for MessageHooks<'_, '_> {
    fn on_mode_changed(&mut self, mode: MovementMode) {
        self.mode_changed.write(MovementModeChanged {
            entity: self.entity,
            mode,
        });
    }

    fn on_wall_run_start(&mut self, side: WallSide) {
        self.wall_run_started.write(WallRunStarted {
            entity: self.entity,
            side,
        });
    }

    fn on_wall_run_end(&mut self) {
        self.wall_run_ended.write(WallRunEnded {
            entity: self.entity,
        });
    }
}
