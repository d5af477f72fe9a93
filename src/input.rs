use bevy_time::Stopwatch;

use crate::{
    fixed_update_utils::fixed_loop_ran_this_frame,
    locomotion::{InputSampler, Intents},
    prelude::*,
};

pub(super) fn plugin(app: &mut App) {
    app.add_observer(apply_movement)
        .add_observer(apply_jump)
        .add_observer(apply_crouch)
        .add_observer(apply_sprint)
        .add_systems(
            RunFixedMainLoop,
            clear_accumulated_input
                .run_if(fixed_loop_ran_this_frame)
                .in_set(RunFixedMainLoopSystems::AfterFixedMainLoop),
        )
        .add_systems(PreUpdate, tick_timers.in_set(EnhancedInputSystems::Update));
}

#[derive(Debug, InputAction)]
#[action_output(Vec2)]
pub struct Movement;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct Jump;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct Crouch;

#[derive(Debug, InputAction)]
#[action_output(bool)]
pub struct Sprint;

#[derive(Debug, InputAction)]
#[action_output(Vec2)]
pub struct RotateCamera;

/// Input accumulated since the last fixed update loop. Is cleared after every fixed update loop.
#[derive(Component, Clone, Reflect, Default, Debug)]
#[reflect(Component)]
pub struct AccumulatedInput {
    // The last non-zero move that was input since the last fixed update loop
    pub last_movement: Option<Vec2>,
    // Time since the last jump input. `None` once the jump was used or went stale.
    pub jumped: Option<Stopwatch>,
    // Whether any frame since the last fixed update loop held crouch
    pub crouched: bool,
    pub sprinted: bool,
}

impl InputSampler for AccumulatedInput {
    fn sample(&self) -> Intents {
        let pulse = |on: bool| if on { 1.0 } else { 0.0 };
        Intents {
            movement: self.last_movement.unwrap_or_default(),
            jump: pulse(self.jumped.is_some()),
            crouch: pulse(self.crouched),
            sprint: pulse(self.sprinted),
        }
    }
}

fn apply_movement(
    movement: On<Fire<Movement>>,
    mut accumulated_inputs: Query<&mut AccumulatedInput>,
) {
    if let Ok(mut accumulated_inputs) = accumulated_inputs.get_mut(movement.context) {
        accumulated_inputs.last_movement = Some(movement.value);
    }
}

fn apply_jump(jump: On<Fire<Jump>>, mut accumulated_inputs: Query<&mut AccumulatedInput>) {
    if let Ok(mut accumulated_inputs) = accumulated_inputs.get_mut(jump.context) {
        accumulated_inputs.jumped = Some(Stopwatch::new());
    }
}

fn apply_crouch(crouch: On<Fire<Crouch>>, mut accumulated_inputs: Query<&mut AccumulatedInput>) {
    if let Ok(mut accumulated_inputs) = accumulated_inputs.get_mut(crouch.context) {
        accumulated_inputs.crouched = true;
    }
}

fn apply_sprint(sprint: On<Fire<Sprint>>, mut accumulated_inputs: Query<&mut AccumulatedInput>) {
    if let Ok(mut accumulated_inputs) = accumulated_inputs.get_mut(sprint.context) {
        accumulated_inputs.sprinted = true;
    }
}

fn clear_accumulated_input(mut accumulated_inputs: Query<&mut AccumulatedInput>) {
    for mut accumulated_input in &mut accumulated_inputs {
        *accumulated_input = AccumulatedInput {
            jumped: accumulated_input.jumped.clone(),
            ..default()
        }
    }
}

fn tick_timers(
    mut inputs: Query<(&mut AccumulatedInput, &CharacterController)>,
    time: Res<Time>,
) {
    for (mut input, controller) in inputs.iter_mut() {
        let Some(jumped) = input.jumped.as_mut() else {
            continue;
        };
        jumped.tick(time.delta());
        if jumped.elapsed() > controller.jump_input_buffer {
            input.jumped = None;
        }
    }
}
