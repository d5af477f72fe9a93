use avian3d::prelude::*;
use bevy::{
    input::common_conditions::input_just_pressed,
    prelude::*,
    window::{CursorGrabMode, CursorOptions},
};
use bevy_enhanced_input::prelude::*;
use bevy_parkour::{CharacterControllerState, prelude::*};

fn main() -> AppExit {
    App::new()
        .add_plugins((
            DefaultPlugins,
            PhysicsPlugins::default(),
            EnhancedInputPlugin,
            ParkourPlugin::default(),
        ))
        .add_input_context::<PlayerInput>()
        .add_systems(Startup, (setup, setup_ui))
        .add_systems(
            Update,
            (
                capture_cursor.run_if(input_just_pressed(MouseButton::Left)),
                release_cursor.run_if(input_just_pressed(KeyCode::Escape)),
                apply_fov,
                update_debug_text,
                log_wall_runs,
            ),
        )
        .run()
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let player = commands
        .spawn((
            CharacterController::default(),
            Transform::from_xyz(0.0, 3.0, 0.0),
            PlayerInput,
            actions!(PlayerInput[
                (
                    Action::<Movement>::new(),
                    DeadZone::default(),
                    Bindings::spawn((
                        Cardinal::wasd_keys(),
                        Axial::left_stick()
                    ))
                ),
                (
                    Action::<Jump>::new(),
                    bindings![KeyCode::Space, GamepadButton::South],
                ),
                (
                    Action::<Crouch>::new(),
                    bindings![KeyCode::ControlLeft, GamepadButton::East],
                ),
                (
                    Action::<Sprint>::new(),
                    bindings![KeyCode::ShiftLeft, GamepadButton::LeftThumb],
                ),
                (
                    Action::<RotateCamera>::new(),
                    Bindings::spawn((
                        Spawn((Binding::mouse_motion(), Scale::splat(0.07))),
                        Axial::right_stick().with((Scale::splat(4.0), DeadZone::default())),
                    ))
                ),
            ]),
        ))
        .id();

    commands.spawn((
        Camera3d::default(),
        CharacterControllerCameraOf(player),
        CameraEffects::default(),
    ));

    commands.spawn((
        Transform::from_xyz(0.0, 1.0, 0.0).looking_at(vec3(1.0, -2.0, -2.0), Vec3::Y),
        DirectionalLight {
            shadows_enabled: true,
            ..default()
        },
    ));

    let mut block = |transform: Transform, size: Vec3, color: Color| {
        commands.spawn((
            transform,
            RigidBody::Static,
            Collider::cuboid(size.x, size.y, size.z),
            Mesh3d(meshes.add(Cuboid::from_size(size))),
            MeshMaterial3d(materials.add(color)),
        ));
    };

    // floor
    block(
        Transform::from_xyz(0.0, -1.0, 0.0),
        vec3(200.0, 2.0, 200.0),
        Color::srgb(0.5, 0.5, 0.5),
    );

    // ramps: one walkable, one too steep
    block(
        Transform::from_xyz(-12.0, 1.5, -10.0).with_rotation(Quat::from_rotation_x(25f32.to_radians())),
        vec3(6.0, 0.4, 12.0),
        Color::srgb(0.6, 0.8, 0.6),
    );
    block(
        Transform::from_xyz(-20.0, 2.5, -10.0).with_rotation(Quat::from_rotation_x(55f32.to_radians())),
        vec3(6.0, 0.4, 8.0),
        Color::srgb(0.8, 0.5, 0.5),
    );

    // a corridor of walls to run along
    for x in [-4.0, 4.0] {
        block(
            Transform::from_xyz(x, 4.0, -30.0),
            vec3(0.5, 8.0, 30.0),
            Color::srgb(0.7, 0.7, 0.8),
        );
    }

    // a low tunnel to slide into
    block(
        Transform::from_xyz(12.0, 1.75, -10.0),
        vec3(4.0, 0.5, 10.0),
        Color::srgb(0.9, 0.6, 0.2),
    );
    for x in [10.25, 13.75] {
        block(
            Transform::from_xyz(x, 0.75, -10.0),
            vec3(0.5, 1.5, 10.0),
            Color::srgb(0.9, 0.6, 0.2),
        );
    }
}

#[derive(Component, Default)]
struct PlayerInput;

#[derive(Component)]
struct DebugText;

fn setup_ui(mut commands: Commands) {
    commands.spawn((Node::default(), Text::default(), DebugText));
    commands.spawn((
        Node {
            justify_self: JustifySelf::End,
            justify_content: JustifyContent::End,
            align_self: AlignSelf::End,
            padding: UiRect::all(px(10.0)),
            ..default()
        },
        Text::new(
            "Controls:\nWASD: move\nShift: sprint\nSpace: jump\nCtrl: crouch / slide\nEsc: free mouse",
        ),
    ));
}

fn update_debug_text(
    mut text: Single<&mut Text, With<DebugText>>,
    kcc: Single<(&CharacterControllerState, &LinearVelocity), With<CharacterController>>,
) {
    let (state, velocity) = kcc.into_inner();
    text.0 = format!(
        "Mode: {:?}\nGrounded: {}\nSpeed: {:.2} / {:.2}\nHorizontal velocity: {:.2}",
        state.mode,
        state.grounded,
        state.current_speed,
        state.desired_speed,
        velocity.xz().length(),
    );
}

fn apply_fov(mut cameras: Query<(&mut Projection, &CameraEffects)>) {
    for (mut projection, effects) in &mut cameras {
        if let Projection::Perspective(perspective) = projection.as_mut() {
            perspective.fov = effects.fov.to_radians();
        }
    }
}

fn log_wall_runs(mut started: MessageReader<WallRunStarted>, mut ended: MessageReader<WallRunEnded>) {
    for started in started.read() {
        info!("{} started running along the {:?} wall", started.entity, started.side);
    }
    for ended in ended.read() {
        info!("{} left the wall", ended.entity);
    }
}

fn capture_cursor(mut cursor: Single<&mut CursorOptions>) {
    cursor.grab_mode = CursorGrabMode::Locked;
    cursor.visible = false;
}

fn release_cursor(mut cursor: Single<&mut CursorOptions>) {
    cursor.visible = true;
    cursor.grab_mode = CursorGrabMode::None;
}
