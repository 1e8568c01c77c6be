//! Run-ending conditions. Individual systems report causes as messages; a
//! single resolver latches the first one, records the run distance, and moves
//! the app into the failed state.

use crate::config::GameConfig;
use crate::gameplay::cart::{CartBodies, CartChassis};
use crate::persistence::{day_stamp, DistanceStore, SessionBest};
use crate::states::GameState;
use bevy::prelude::*;
use std::fmt;

pub struct FailurePlugin;

impl Plugin for FailurePlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<FailureEvent>()
            .init_resource::<FailState>()
            .init_resource::<FrontContactTimer>()
            .add_systems(
                OnEnter(GameState::InRun),
                (reset_fail_state, reset_front_contact_timer),
            );
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailCause {
    FrontTouchdown,
    HazardHit,
    RoofLanding,
    StalledOut,
}

impl fmt::Display for FailCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailCause::FrontTouchdown => "Front wheel touched down",
            FailCause::HazardHit => "Hit a hazard",
            FailCause::RoofLanding => "Landed on the roof",
            FailCause::StalledOut => "Stalled out",
        };
        f.write_str(label)
    }
}

#[derive(Resource, Debug, Clone, Copy, Default, PartialEq)]
pub enum FailState {
    #[default]
    Running,
    Failed(FailCause),
}

/// Seconds timestamp of the moment the front wheel settled on ground, if it
/// is currently resting there.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct FrontContactTimer(pub Option<f64>);

#[derive(Message, Debug, Clone, Copy)]
pub struct FailureEvent {
    pub cause: FailCause,
}

fn reset_fail_state(mut fail: ResMut<FailState>) {
    *fail = FailState::Running;
}

fn reset_front_contact_timer(mut timer: ResMut<FrontContactTimer>) {
    timer.0 = None;
}

pub(crate) fn check_front_contact_timeout(
    time: Res<Time>,
    config: Res<GameConfig>,
    timer: Res<FrontContactTimer>,
    mut failures: MessageWriter<FailureEvent>,
) {
    let Some(started_at) = timer.0 else {
        return;
    };
    if front_contact_exceeded(
        time.elapsed_secs_f64(),
        started_at,
        config.tuning.front.contact_threshold_s,
    ) {
        failures.write(FailureEvent {
            cause: FailCause::FrontTouchdown,
        });
    }
}

pub fn front_contact_exceeded(now_s: f64, started_at_s: f64, threshold_s: f64) -> bool {
    now_s - started_at_s >= threshold_s
}

pub(crate) fn resolve_failure_events(
    mut failures: MessageReader<FailureEvent>,
    mut fail: ResMut<FailState>,
    mut store: ResMut<DistanceStore>,
    mut session: ResMut<SessionBest>,
    mut next_state: ResMut<NextState<GameState>>,
    cart: Option<Res<CartBodies>>,
    chassis_query: Query<&Transform, With<CartChassis>>,
) {
    let Some(first) = failures.read().next().copied() else {
        return;
    };
    failures.clear();
    if matches!(*fail, FailState::Failed(_)) {
        return;
    }
    *fail = FailState::Failed(first.cause);

    let distance_m = cart
        .as_deref()
        .zip(chassis_query.single().ok())
        .map(|(cart, transform)| (transform.translation.x - cart.start_x).max(0.0) / 100.0)
        .unwrap_or(0.0);

    info!("run over after {distance_m:.0} m: {}", first.cause);

    session.distance_m = session.distance_m.max(distance_m);
    store.record_max("best", distance_m);
    store.record_max(&day_stamp(), distance_m);

    next_state.set(GameState::Failed);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contact_below_threshold_does_not_trip() {
        assert!(!front_contact_exceeded(10.05, 10.0, 0.12));
    }

    #[test]
    fn contact_at_or_past_threshold_trips() {
        assert!(front_contact_exceeded(10.12, 10.0, 0.12));
        assert!(front_contact_exceeded(11.0, 10.0, 0.12));
    }

    #[test]
    fn causes_have_player_facing_labels() {
        assert_eq!(FailCause::HazardHit.to_string(), "Hit a hazard");
        assert_eq!(FailCause::StalledOut.to_string(), "Stalled out");
    }

    fn resolver_app() -> App {
        let path = std::env::temp_dir().join("wheelie-cart-test-fail-latch.json");
        let _ = std::fs::remove_file(&path);
        let mut app = App::new();
        app.add_message::<FailureEvent>()
            .init_resource::<FailState>()
            .init_resource::<SessionBest>()
            .init_resource::<NextState<GameState>>()
            .insert_resource(DistanceStore::load(path))
            .add_systems(Update, resolve_failure_events);
        app
    }

    fn report(app: &mut App, cause: FailCause) {
        app.world_mut()
            .resource_mut::<Messages<FailureEvent>>()
            .write(FailureEvent { cause });
    }

    #[test]
    fn first_failure_cause_wins_and_latches() {
        let mut app = resolver_app();

        report(&mut app, FailCause::HazardHit);
        report(&mut app, FailCause::StalledOut);
        app.update();

        assert_eq!(
            *app.world().resource::<FailState>(),
            FailState::Failed(FailCause::HazardHit)
        );
        assert!(matches!(
            app.world().resource::<NextState<GameState>>(),
            NextState::Pending(GameState::Failed)
        ));

        // Later reports must not overwrite the latched cause.
        report(&mut app, FailCause::RoofLanding);
        app.update();
        assert_eq!(
            *app.world().resource::<FailState>(),
            FailState::Failed(FailCause::HazardHit)
        );
    }

    #[test]
    fn no_failure_message_leaves_the_run_alive() {
        let mut app = resolver_app();
        app.update();
        assert_eq!(*app.world().resource::<FailState>(), FailState::Running);
    }
}
