use core::f32::consts::FRAC_PI_2;

use crate::{CharacterControllerState, input::RotateCamera, prelude::*};

pub(super) fn plugin(app: &mut App) {
    app.add_systems(
        RunFixedMainLoop,
        sync_camera_transform.after(TransformEasingSystems::UpdateEasingTick),
    )
    .add_systems(Update, (react_to_movement, ease_camera_effects).chain())
    .add_observer(rotate_camera);
}

#[derive(Component, Clone, Copy)]
#[relationship(relationship_target = CharacterControllerCamera)]
pub struct CharacterControllerCameraOf(pub Entity);

#[derive(Component, Clone, Copy)]
#[relationship_target(relationship = CharacterControllerCameraOf)]
pub struct CharacterControllerCamera(Entity);

impl CharacterControllerCamera {
    pub fn get(self) -> Entity {
        self.0
    }
}

/// Field of view and roll that follow the character's movement.
///
/// The tilt is applied to the camera as roll. The field of view is only
/// tracked here: copy [`CameraEffects::fov`] into your projection.
#[derive(Component, Clone, Copy, Reflect, Debug)]
#[reflect(Component)]
pub struct CameraEffects {
    /// Degrees
    pub base_fov: f32,
    /// Added while sprinting or sliding.
    pub speed_fov: f32,
    /// Added while wall-running, instead of `speed_fov`.
    pub wall_run_fov: f32,
    /// Roll in degrees while wall-running, leaning into the wall.
    pub wall_run_tilt: f32,
    pub decay_rate: f32,
    pub fov: f32,
    pub tilt: f32,
    pub fast: bool,
    pub wall: Option<WallSide>,
}

impl Default for CameraEffects {
    fn default() -> Self {
        Self {
            base_fov: 80.0,
            speed_fov: 5.0,
            wall_run_fov: 10.0,
            wall_run_tilt: 5.0,
            decay_rate: 8.0,
            fov: 80.0,
            tilt: 0.0,
            fast: false,
            wall: None,
        }
    }
}

impl CameraEffects {
    pub fn target_fov(&self) -> f32 {
        if self.wall.is_some() {
            self.base_fov + self.wall_run_fov
        } else if self.fast {
            self.base_fov + self.speed_fov
        } else {
            self.base_fov
        }
    }

    pub fn target_tilt(&self) -> f32 {
        match self.wall {
            Some(WallSide::Left) => self.wall_run_tilt,
            Some(WallSide::Right) => -self.wall_run_tilt,
            None => 0.0,
        }
    }

    fn ease(&mut self, dt: f32) {
        let (fov, tilt) = (self.target_fov(), self.target_tilt());
        self.fov.smooth_nudge(&fov, self.decay_rate, dt);
        self.tilt.smooth_nudge(&tilt, self.decay_rate, dt);
    }
}

pub(crate) fn sync_camera_transform(
    mut cameras: Query<
        (
            &mut Transform,
            &CharacterControllerCameraOf,
            Option<&CameraEffects>,
        ),
        (Without<CharacterControllerState>,),
    >,
    kccs: Query<(&Transform, &CharacterController), With<CharacterControllerState>>,
) {
    // Reads the body's eased Transform; GlobalTransform lags a frame behind here
    for (mut camera_transform, camera_of, effects) in cameras.iter_mut() {
        let Ok((kcc_transform, controller)) = kccs.get(camera_of.0) else {
            continue;
        };
        let config = &controller.config;
        let scale = kcc_transform.scale.y;
        let feet = -config.height_at(scale) / 2.0;
        let view_height = if scale < config.stand_scale {
            controller.crouch_view_height
        } else {
            controller.standing_view_height
        };
        camera_transform.translation = kcc_transform.translation + Vec3::Y * (feet + view_height);

        if let Some(effects) = effects {
            let (yaw, pitch, _) = camera_transform.rotation.to_euler(EulerRot::YXZ);
            camera_transform.rotation =
                Quat::from_euler(EulerRot::YXZ, yaw, pitch, effects.tilt.to_radians());
        }
    }
}

fn react_to_movement(
    mut mode_changed: MessageReader<MovementModeChanged>,
    mut wall_run_started: MessageReader<WallRunStarted>,
    mut wall_run_ended: MessageReader<WallRunEnded>,
    cameras: Query<&CharacterControllerCamera>,
    mut effects: Query<&mut CameraEffects>,
) {
    for changed in mode_changed.read() {
        if let Some(mut effects) = effects_of(changed.entity, &cameras, &mut effects) {
            effects.fast = matches!(
                changed.mode,
                MovementMode::Sprinting | MovementMode::Sliding
            );
        }
    }
    for started in wall_run_started.read() {
        if let Some(mut effects) = effects_of(started.entity, &cameras, &mut effects) {
            effects.wall = Some(started.side);
        }
    }
    for ended in wall_run_ended.read() {
        if let Some(mut effects) = effects_of(ended.entity, &cameras, &mut effects) {
            effects.wall = None;
        }
    }
}

fn effects_of<'a>(
    controller: Entity,
    cameras: &Query<&CharacterControllerCamera>,
    effects: &'a mut Query<&mut CameraEffects>,
) -> Option<Mut<'a, CameraEffects>> {
    let camera = cameras.get(controller).ok()?;
    effects.get_mut(camera.get()).ok()
}

fn ease_camera_effects(mut effects: Query<&mut CameraEffects>, time: Res<Time>) {
    for mut effects in &mut effects {
        effects.ease(time.delta_secs());
    }
}

fn rotate_camera(
    rotate: On<Fire<RotateCamera>>,
    cameras: Query<&CharacterControllerCamera>,
    mut transforms: Query<&mut Transform>,
) {
    let Ok(camera) = cameras.get(rotate.context) else {
        return;
    };
    let Ok(mut transform) = transforms.get_mut(camera.get()) else {
        return;
    };
    let (mut yaw, mut pitch, roll) = transform.rotation.to_euler(EulerRot::YXZ);

    let delta = -rotate.value;
    yaw += delta.x.to_radians();
    pitch += delta.y.to_radians();
    pitch = pitch.clamp(-FRAC_PI_2 + 0.01, FRAC_PI_2 - 0.01);

    transform.rotation = Quat::from_euler(EulerRot::YXZ, yaw, pitch, roll);
}
