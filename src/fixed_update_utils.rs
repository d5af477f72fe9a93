use crate::prelude::*;

pub(super) fn plugin(app: &mut App) {
    app.init_resource::<FixedLoopRan>()
        .add_systems(PreUpdate, forget_fixed_loop)
        .add_systems(FixedPreUpdate, note_fixed_loop);
}

/// Whether at least one fixed timestep ran during the current frame.
#[derive(Resource, Debug, Deref, DerefMut, Default)]
pub(crate) struct FixedLoopRan(bool);

fn forget_fixed_loop(mut ran: ResMut<FixedLoopRan>) {
    **ran = false;
}

fn note_fixed_loop(mut ran: ResMut<FixedLoopRan>) {
    **ran = true;
}

/// Run condition for systems that consume per-frame input once the fixed loop used it.
pub(crate) fn fixed_loop_ran_this_frame(ran: Res<FixedLoopRan>) -> bool {
    **ran
}
