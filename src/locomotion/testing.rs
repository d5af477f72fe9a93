//! In-memory collaborators for exercising the core without a physics engine.

use bevy_math::prelude::*;

use super::{
    Body, CollisionQuery, ForceMode, Hit, MovementMode, PresentationHooks, Surface, WallSide,
};

/// A horizontal floor, optional vertical walls and an optional ceiling.
#[derive(Clone, Debug)]
pub struct FlatWorld {
    /// Normal reported by the floor. The floor itself is always the plane `y = floor_height`.
    pub floor: Option<Vec3>,
    pub floor_height: f32,
    /// `(point on plane, outward normal)`
    pub walls: Vec<(Vec3, Vec3)>,
    pub ceiling: Option<f32>,
}

impl Default for FlatWorld {
    fn default() -> Self {
        Self {
            floor: Some(Vec3::Y),
            floor_height: 0.0,
            walls: Vec::new(),
            ceiling: None,
        }
    }
}

impl FlatWorld {
    pub fn with_floor_normal(normal: Vec3) -> Self {
        Self {
            floor: Some(normal),
            ..Default::default()
        }
    }
}

impl CollisionQuery for FlatWorld {
    fn cast_down(&self, origin: Vec3, max_distance: f32, surface: Surface) -> Option<Hit> {
        if surface == Surface::Wall {
            return None;
        }
        let normal = self.floor?;
        let distance = origin.y - self.floor_height;
        (0.0..=max_distance)
            .contains(&distance)
            .then_some(Hit { normal, distance })
    }

    fn cast_side(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        surface: Surface,
    ) -> Option<Hit> {
        if surface == Surface::Ground {
            return None;
        }
        self.walls
            .iter()
            .filter_map(|&(point, normal)| {
                let facing = direction.dot(normal);
                if facing >= 0.0 {
                    return None;
                }
                let distance = (point - origin).dot(normal) / facing;
                (0.0..=max_distance)
                    .contains(&distance)
                    .then_some(Hit { normal, distance })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }

    fn cast_up(&self, origin: Vec3, max_distance: f32) -> Option<Hit> {
        let distance = self.ceiling? - origin.y;
        (0.0..=max_distance).contains(&distance).then_some(Hit {
            normal: Vec3::NEG_Y,
            distance,
        })
    }
}

/// Records every force and applies impulses straight to velocity.
#[derive(Clone, Debug)]
pub struct SimBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub drag: f32,
    pub use_gravity: bool,
    pub scale_y: f32,
    pub mass: f32,
    /// Half height per unit of scale. Scaling keeps the feet where they are.
    pub half_height_per_scale: f32,
    pub forces: Vec<Vec3>,
    pub impulses: Vec<Vec3>,
}

impl Default for SimBody {
    fn default() -> Self {
        Self {
            position: Vec3::Y,
            velocity: Vec3::ZERO,
            drag: 0.0,
            use_gravity: true,
            scale_y: 1.0,
            mass: 1.0,
            half_height_per_scale: 1.0,
            forces: Vec::new(),
            impulses: Vec::new(),
        }
    }
}

impl Body for SimBody {
    fn position(&self) -> Vec3 {
        self.position
    }

    fn velocity(&self) -> Vec3 {
        self.velocity
    }

    fn set_velocity(&mut self, velocity: Vec3) {
        self.velocity = velocity;
    }

    fn add_force(&mut self, force: Vec3, mode: ForceMode) {
        match mode {
            ForceMode::Force => self.forces.push(force),
            ForceMode::Impulse => {
                self.impulses.push(force);
                self.velocity += force / self.mass;
            }
        }
    }

    fn drag(&self) -> f32 {
        self.drag
    }

    fn set_drag(&mut self, drag: f32) {
        self.drag = drag;
    }

    fn uses_gravity(&self) -> bool {
        self.use_gravity
    }

    fn set_use_gravity(&mut self, enabled: bool) {
        self.use_gravity = enabled;
    }

    fn scale_y(&self) -> f32 {
        self.scale_y
    }

    fn set_scale_y(&mut self, scale: f32) {
        self.position.y += (scale - self.scale_y) * self.half_height_per_scale;
        self.scale_y = scale;
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Recorded {
    Mode(MovementMode),
    WallRunStart(WallSide),
    WallRunEnd,
}

#[derive(Default, Debug)]
pub struct RecordingHooks(pub Vec<Recorded>);

impl PresentationHooks for RecordingHooks {
    fn on_mode_changed(&mut self, mode: MovementMode) {
        self.0.push(Recorded::Mode(mode));
    }

    fn on_wall_run_start(&mut self, side: WallSide) {
        self.0.push(Recorded::WallRunStart(side));
    }

    fn on_wall_run_end(&mut self) {
        self.0.push(Recorded::WallRunEnd);
    }
}
