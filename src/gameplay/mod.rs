pub mod cart;
pub mod collision;
pub mod course;
pub mod failure;
pub mod milestones;

use crate::config::GameConfig;
use crate::states::GameState;
use bevy::prelude::*;
use cart::CartPlugin;
use course::CoursePlugin;
use failure::FailurePlugin;
use milestones::MilestonePlugin;

pub struct GameplayPlugin;

impl Plugin for GameplayPlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((CartPlugin, CoursePlugin, FailurePlugin, MilestonePlugin))
            .add_systems(
                Update,
                // Contacts are drained first so the throttle and failure
                // checks see this frame's ground state; the camera runs last.
                (
                    collision::drain_contact_events,
                    course::extend_and_cull_course,
                    cart::read_throttle_input,
                    cart::throttle::apply_throttle_forces,
                    cart::clamp_cart_speed,
                    cart::stall::update_stall_meter,
                    failure::check_front_contact_timeout,
                    failure::resolve_failure_events,
                    cart::pitch::stabilize_cart_pitch,
                    milestones::award_distance_milestones,
                    cart::camera_follow_cart,
                )
                    .chain()
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            );
    }
}
