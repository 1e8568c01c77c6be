//! Distance milestones. Every interval crossed relieves part of the stall
//! meter and gives the rear wheel a small celebratory shove.

use crate::config::GameConfig;
use crate::gameplay::cart::{stall::StallMeter, CartBodies, CartChassis};
use crate::states::GameState;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

const PIXELS_PER_METER: f32 = 100.0;

pub struct MilestonePlugin;

impl Plugin for MilestonePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MilestoneState>()
            .add_systems(OnEnter(GameState::InRun), reset_milestones);
    }
}

#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct MilestoneState {
    pub reached: u32,
}

fn reset_milestones(mut milestones: ResMut<MilestoneState>) {
    *milestones = MilestoneState::default();
}

pub(crate) fn award_distance_milestones(
    config: Res<GameConfig>,
    cart: Option<Res<CartBodies>>,
    chassis_query: Query<&Transform, With<CartChassis>>,
    mut milestones: ResMut<MilestoneState>,
    mut stall: ResMut<StallMeter>,
    mut impulse_query: Query<&mut ExternalImpulse>,
) {
    let Some(cart) = cart else {
        return;
    };
    let Ok(transform) = chassis_query.single() else {
        return;
    };
    let settings = &config.game.milestones;

    let distance_m = (transform.translation.x - cart.start_x).max(0.0) / PIXELS_PER_METER;
    let crossed = milestones_crossed(distance_m, settings.interval_m);
    if crossed <= milestones.reached {
        return;
    }
    milestones.reached = crossed;

    stall.relieve(settings.stall_relief);
    if let Ok(mut impulse) = impulse_query.get_mut(cart.rear_wheel) {
        impulse.impulse += Vec2::new(settings.impulse_x, settings.impulse_y);
    }
    info!(
        "milestone {} at {:.0} m",
        milestones.reached,
        crossed as f32 * settings.interval_m
    );
}

pub fn milestones_crossed(distance_m: f32, interval_m: f32) -> u32 {
    (distance_m / interval_m).max(0.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn milestone_count_steps_at_each_interval() {
        assert_eq!(milestones_crossed(0.0, 250.0), 0);
        assert_eq!(milestones_crossed(249.9, 250.0), 0);
        assert_eq!(milestones_crossed(250.0, 250.0), 1);
        assert_eq!(milestones_crossed(777.0, 250.0), 3);
    }

    #[test]
    fn negative_distance_never_awards() {
        assert_eq!(milestones_crossed(-40.0, 250.0), 0);
    }
}
