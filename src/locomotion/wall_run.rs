//! Wall detection, the wall-run itself, wall-jumps and the re-attach lockout.

use bevy_math::prelude::*;
use tracing::debug;

use super::{
    Body, CollisionQuery, ForceMode, Heading, Hit, Intents, LocomotionConfig, Surface,
    WallGravity, WallSide,
};

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum WallRunPhase {
    #[default]
    Detecting,
    Running {
        side: WallSide,
        normal: Vec3,
        remaining: f32,
    },
    /// Eligibility is not even checked until `remaining` hits zero.
    ExitingLockout { remaining: f32 },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WallRunEvent {
    None,
    Started(WallSide),
    /// Eligibility was lost without a jump.
    Stopped,
    TimedOut,
    Jumped,
    LockoutExpired,
}

#[derive(Clone, Debug, Default)]
pub struct WallRunController {
    phase: WallRunPhase,
    left: Option<Hit>,
    right: Option<Hit>,
    jump_held: bool,
}

impl WallRunController {
    pub fn phase(&self) -> WallRunPhase {
        self.phase
    }

    pub fn is_running(&self) -> bool {
        matches!(self.phase, WallRunPhase::Running { .. })
    }

    pub fn wall_left(&self) -> Option<Hit> {
        self.left
    }

    pub fn wall_right(&self) -> Option<Hit> {
        self.right
    }

    /// Probes for walls and advances the phase. Only touches the body on a transition.
    pub fn update(
        &mut self,
        dt: f32,
        intents: &Intents,
        heading: &Heading,
        collision: &dyn CollisionQuery,
        body: &mut dyn Body,
        cfg: &LocomotionConfig,
    ) -> WallRunEvent {
        let dt = dt.max(0.0);
        let jump_pressed = intents.jump > 0.0 && !self.jump_held;
        self.jump_held = intents.jump > 0.0;

        if let WallRunPhase::ExitingLockout { remaining } = self.phase {
            self.left = None;
            self.right = None;
            let remaining = (remaining - dt).max(0.0);
            if remaining > 0.0 {
                self.phase = WallRunPhase::ExitingLockout { remaining };
                return WallRunEvent::None;
            }
            self.phase = WallRunPhase::Detecting;
            return WallRunEvent::LockoutExpired;
        }

        let position = body.position();
        self.right = collision.cast_side(
            position,
            heading.right,
            cfg.wall_check_distance,
            Surface::Wall,
        );
        self.left = collision.cast_side(
            position,
            -heading.right,
            cfg.wall_check_distance,
            Surface::Wall,
        );
        let above_ground = collision
            .cast_down(position, cfg.min_jump_height, Surface::Ground)
            .is_none();
        let eligible =
            (self.left.is_some() || self.right.is_some()) && intents.movement.y > 0.0 && above_ground;

        match self.phase {
            WallRunPhase::Detecting => {
                let Some((side, hit)) = self.contact(None).filter(|_| eligible) else {
                    return WallRunEvent::None;
                };
                self.phase = WallRunPhase::Running {
                    side,
                    normal: hit.normal,
                    remaining: cfg.max_wall_run_time.as_secs_f32(),
                };
                body.set_velocity(body.velocity().with_y(0.0));
                debug!("wall-run started on the {side:?} wall");
                WallRunEvent::Started(side)
            }
            WallRunPhase::Running {
                side,
                normal,
                remaining,
            } => {
                if jump_pressed {
                    self.lock_out(body, cfg);
                    body.set_velocity(body.velocity().with_y(0.0));
                    body.add_force(
                        Vec3::Y * cfg.wall_jump_up_force + normal * cfg.wall_jump_side_force,
                        ForceMode::Impulse,
                    );
                    debug!("wall-jump off the {side:?} wall");
                    return WallRunEvent::Jumped;
                }
                let contact = self.contact(Some(side)).filter(|_| eligible);
                let Some((side, hit)) = contact else {
                    self.phase = WallRunPhase::Detecting;
                    body.set_use_gravity(true);
                    debug!("wall-run lost its wall");
                    return WallRunEvent::Stopped;
                };
                let remaining = (remaining - dt).max(0.0);
                if remaining <= 0.0 {
                    self.lock_out(body, cfg);
                    debug!("wall-run timed out");
                    return WallRunEvent::TimedOut;
                }
                self.phase = WallRunPhase::Running {
                    side,
                    normal: hit.normal,
                    remaining,
                };
                WallRunEvent::None
            }
            WallRunPhase::ExitingLockout { .. } => WallRunEvent::None,
        }
    }

    /// Gravity override plus the forward, climb and push-to-wall forces.
    pub fn apply_forces(
        &self,
        body: &mut dyn Body,
        intents: &Intents,
        heading: &Heading,
        cfg: &LocomotionConfig,
    ) {
        let WallRunPhase::Running { side, normal, .. } = self.phase else {
            return;
        };

        match cfg.wall_gravity {
            WallGravity::Disabled => body.set_use_gravity(false),
            WallGravity::Counter(force) => {
                body.set_use_gravity(true);
                body.add_force(Vec3::Y * force, ForceMode::Force);
            }
        }

        let mut wall_forward = normal.cross(Vec3::Y);
        if (heading.forward - wall_forward).length() > (heading.forward + wall_forward).length() {
            wall_forward = -wall_forward;
        }
        body.add_force(wall_forward * cfg.wall_run_force, ForceMode::Force);

        let velocity = body.velocity();
        if intents.crouch > 0.0 {
            body.set_velocity(velocity.with_y(-cfg.wall_climb_speed));
        } else if intents.sprint > 0.0 {
            body.set_velocity(velocity.with_y(cfg.wall_climb_speed));
        }

        let steering_away = match side {
            WallSide::Left => intents.movement.x > 0.0,
            WallSide::Right => intents.movement.x < 0.0,
        };
        if !steering_away {
            body.add_force(-normal * cfg.wall_push_force, ForceMode::Force);
        }
    }

    /// The wall to run along, sticking with `preferred` while it is still there.
    fn contact(&self, preferred: Option<WallSide>) -> Option<(WallSide, Hit)> {
        let right = self.right.map(|hit| (WallSide::Right, hit));
        let left = self.left.map(|hit| (WallSide::Left, hit));
        match preferred {
            Some(WallSide::Left) => left.or(right),
            _ => right.or(left),
        }
    }

    fn lock_out(&mut self, body: &mut dyn Body, cfg: &LocomotionConfig) {
        self.phase = WallRunPhase::ExitingLockout {
            remaining: cfg.exit_wall_time.as_secs_f32(),
        };
        body.set_use_gravity(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locomotion::testing::{FlatWorld, SimBody};
    use core::time::Duration;

    const DT: f32 = 1.0 / 60.0;

    /// Airborne next to a wall at x = -0.5, looking down -Z.
    fn left_wall() -> FlatWorld {
        FlatWorld {
            floor: None,
            walls: vec![(vec3(-0.5, 0.0, 0.0), Vec3::X)],
            ..FlatWorld::default()
        }
    }

    fn heading() -> Heading {
        Heading::from_orientation(Quat::IDENTITY)
    }

    fn run_forward() -> Intents {
        Intents {
            movement: Vec2::Y,
            ..Default::default()
        }
    }

    fn airborne_body() -> SimBody {
        SimBody {
            position: vec3(0.0, 5.0, 0.0),
            velocity: vec3(0.0, 3.0, -6.0),
            ..Default::default()
        }
    }

    #[test]
    fn starts_on_eligible_wall_and_zeroes_vertical_velocity() {
        let cfg = LocomotionConfig::default();
        let mut wall = WallRunController::default();
        let mut body = airborne_body();
        let event = wall.update(DT, &run_forward(), &heading(), &left_wall(), &mut body, &cfg);
        assert_eq!(event, WallRunEvent::Started(WallSide::Left));
        assert!(wall.is_running());
        assert_eq!(body.velocity.y, 0.0);
        assert!(wall.wall_left().is_some());
        assert!(wall.wall_right().is_none());
    }

    #[test]
    fn needs_forward_input_and_air_below() {
        let cfg = LocomotionConfig::default();
        let mut wall = WallRunController::default();
        let mut body = airborne_body();
        let event = wall.update(DT, &Intents::default(), &heading(), &left_wall(), &mut body, &cfg);
        assert_eq!(event, WallRunEvent::None);

        let standing = FlatWorld {
            floor: Some(Vec3::Y),
            ..left_wall()
        };
        let mut body = SimBody {
            position: vec3(0.0, 1.0, 0.0),
            ..Default::default()
        };
        let event = wall.update(DT, &run_forward(), &heading(), &standing, &mut body, &cfg);
        assert_eq!(event, WallRunEvent::None);
        assert!(!wall.is_running());
    }

    #[test]
    fn wall_jump_pushes_up_and_away() {
        let cfg = LocomotionConfig {
            wall_jump_up_force: 6.0,
            wall_jump_side_force: 10.0,
            ..Default::default()
        };
        let mut wall = WallRunController::default();
        let mut body = airborne_body();
        wall.update(DT, &run_forward(), &heading(), &left_wall(), &mut body, &cfg);
        body.velocity.y = -2.0;

        let jump = Intents {
            jump: 1.0,
            ..run_forward()
        };
        let event = wall.update(DT, &jump, &heading(), &left_wall(), &mut body, &cfg);
        assert_eq!(event, WallRunEvent::Jumped);
        assert_eq!(body.impulses, vec![vec3(10.0, 6.0, 0.0)]);
        // vertical velocity was cleared before the impulse landed
        assert_eq!(body.velocity.y, 6.0);
        assert!(body.use_gravity);
        assert!(matches!(wall.phase(), WallRunPhase::ExitingLockout { .. }));
    }

    #[test]
    fn held_jump_does_not_fire_on_attach() {
        let cfg = LocomotionConfig::default();
        let mut wall = WallRunController::default();
        let mut body = airborne_body();
        let jump = Intents {
            jump: 1.0,
            ..run_forward()
        };
        assert_eq!(
            wall.update(DT, &jump, &heading(), &left_wall(), &mut body, &cfg),
            WallRunEvent::Started(WallSide::Left)
        );
        assert_eq!(
            wall.update(DT, &jump, &heading(), &left_wall(), &mut body, &cfg),
            WallRunEvent::None
        );
        assert!(wall.is_running());
    }

    #[test]
    fn lockout_blocks_reattach_for_its_full_duration() {
        let cfg = LocomotionConfig {
            max_wall_run_time: Duration::from_millis(100),
            exit_wall_time: Duration::from_millis(200),
            ..Default::default()
        };
        let mut wall = WallRunController::default();
        let mut body = airborne_body();
        let world = left_wall();

        let mut timed_out_at = None;
        for tick in 0..30 {
            let event = wall.update(DT, &run_forward(), &heading(), &world, &mut body, &cfg);
            if event == WallRunEvent::TimedOut {
                timed_out_at = Some(tick);
                break;
            }
        }
        assert!(timed_out_at.is_some());

        let mut locked_for = 0.0;
        loop {
            let event = wall.update(DT, &run_forward(), &heading(), &world, &mut body, &cfg);
            locked_for += DT;
            assert!(!matches!(event, WallRunEvent::Started(_)));
            if event == WallRunEvent::LockoutExpired {
                break;
            }
            assert!(locked_for < 1.0, "lockout never expired");
        }
        assert!(locked_for + 1e-4 >= 0.2);

        let event = wall.update(DT, &run_forward(), &heading(), &world, &mut body, &cfg);
        assert_eq!(event, WallRunEvent::Started(WallSide::Left));
    }

    #[test]
    fn losing_the_wall_returns_to_detecting() {
        let cfg = LocomotionConfig::default();
        let mut wall = WallRunController::default();
        let mut body = airborne_body();
        wall.update(DT, &run_forward(), &heading(), &left_wall(), &mut body, &cfg);
        body.use_gravity = false;

        let open = FlatWorld {
            floor: None,
            ..FlatWorld::default()
        };
        let event = wall.update(DT, &run_forward(), &heading(), &open, &mut body, &cfg);
        assert_eq!(event, WallRunEvent::Stopped);
        assert_eq!(wall.phase(), WallRunPhase::Detecting);
        assert!(body.use_gravity);
    }

    #[test]
    fn forces_follow_the_wall_and_press_into_it() {
        let cfg = LocomotionConfig::default();
        let mut wall = WallRunController::default();
        let mut body = airborne_body();
        wall.update(DT, &run_forward(), &heading(), &left_wall(), &mut body, &cfg);

        wall.apply_forces(&mut body, &run_forward(), &heading(), &cfg);
        assert!(!body.use_gravity);
        assert_eq!(body.forces[0], Vec3::NEG_Z * cfg.wall_run_force);
        assert_eq!(body.forces[1], Vec3::NEG_X * cfg.wall_push_force);

        // strafing off a left wall means moving right
        body.forces.clear();
        let away = Intents {
            movement: vec2(1.0, 1.0),
            ..Default::default()
        };
        wall.apply_forces(&mut body, &away, &heading(), &cfg);
        assert_eq!(body.forces.len(), 1);
    }

    #[test]
    fn climb_and_descend_override_vertical_velocity() {
        let cfg = LocomotionConfig {
            wall_gravity: WallGravity::Counter(5.0),
            ..Default::default()
        };
        let mut wall = WallRunController::default();
        let mut body = airborne_body();
        wall.update(DT, &run_forward(), &heading(), &left_wall(), &mut body, &cfg);

        let climb = Intents {
            sprint: 1.0,
            ..run_forward()
        };
        wall.apply_forces(&mut body, &climb, &heading(), &cfg);
        assert_eq!(body.velocity.y, cfg.wall_climb_speed);
        assert!(body.use_gravity);
        assert_eq!(body.forces[0], Vec3::Y * 5.0);

        let descend = Intents {
            crouch: 1.0,
            ..run_forward()
        };
        wall.apply_forces(&mut body, &descend, &heading(), &cfg);
        assert_eq!(body.velocity.y, -cfg.wall_climb_speed);
    }
}
