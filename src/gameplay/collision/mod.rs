//! Contact bookkeeping. Drains the physics collision events each frame,
//! classifies them, and updates the rear-ground flag, the front-wheel
//! touchdown timer, and the failure messages they feed.

pub mod classify;

use crate::config::GameConfig;
use crate::gameplay::cart::{CartBodies, CartChassis, RearGroundState, RunClock};
use crate::gameplay::course::CourseState;
use crate::gameplay::failure::{FailCause, FailState, FailureEvent, FrontContactTimer};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use classify::{CartPart, ContactPhase, SemanticContact, SurfaceKind};

pub(crate) fn drain_contact_events(
    time: Res<Time>,
    config: Res<GameConfig>,
    mut events: MessageReader<CollisionEvent>,
    cart: Option<Res<CartBodies>>,
    course: Option<Res<CourseState>>,
    run_clock: Option<Res<RunClock>>,
    fail: Res<FailState>,
    mut rear_ground: ResMut<RearGroundState>,
    mut front_timer: ResMut<FrontContactTimer>,
    mut failures: MessageWriter<FailureEvent>,
    chassis_query: Query<&Transform, With<CartChassis>>,
) {
    let (Some(cart), Some(course), Some(run_clock)) = (cart, course, run_clock) else {
        events.clear();
        return;
    };
    if matches!(*fail, FailState::Failed(_)) {
        events.clear();
        return;
    }

    let now = time.elapsed_secs_f64();
    let in_grace = now - run_clock.started_at_s < config.tuning.start.grace_s;
    let chassis_transform = chassis_query.single().ok();

    for event in events.read() {
        let (first, second, phase) = match event {
            CollisionEvent::Started(a, b, _) => (*a, *b, ContactPhase::Started),
            CollisionEvent::Stopped(a, b, _) => (*a, *b, ContactPhase::Stopped),
        };
        let Some(contact) = classify::classify_pair(
            part_of(first, &cart),
            surface_of(first, &course),
            part_of(second, &cart),
            surface_of(second, &course),
            phase,
        ) else {
            continue;
        };

        match contact {
            SemanticContact {
                part: CartPart::FrontWheel,
                phase: ContactPhase::Started,
                surface,
            } => {
                // The launch grace window forgives every front contact.
                if in_grace {
                    continue;
                }
                match surface {
                    SurfaceKind::Hazard => {
                        failures.write(FailureEvent {
                            cause: FailCause::FrontTouchdown,
                        });
                    }
                    SurfaceKind::Ground => {
                        let travelled = chassis_transform
                            .map(|t| t.translation.x - cart.start_x)
                            .unwrap_or(0.0);
                        if front_timer.0.is_none()
                            && travelled >= config.tuning.front.distance_gate_px
                        {
                            front_timer.0 = Some(now);
                        }
                    }
                }
            }
            SemanticContact {
                part: CartPart::FrontWheel,
                phase: ContactPhase::Stopped,
                ..
            } => {
                front_timer.0 = None;
            }
            SemanticContact {
                part: CartPart::RearWheel,
                phase: ContactPhase::Started,
                surface,
            } => match surface {
                SurfaceKind::Hazard => {
                    failures.write(FailureEvent {
                        cause: FailCause::HazardHit,
                    });
                }
                SurfaceKind::Ground => {
                    rear_ground.grounded = true;
                    rear_ground.last_ground_s = now;
                }
            },
            SemanticContact {
                part: CartPart::RearWheel,
                phase: ContactPhase::Stopped,
                ..
            } => {
                rear_ground.grounded = false;
                rear_ground.last_ground_s = now;
            }
            SemanticContact {
                part: CartPart::Chassis,
                phase: ContactPhase::Started,
                surface,
            } => match surface {
                SurfaceKind::Hazard => {
                    failures.write(FailureEvent {
                        cause: FailCause::HazardHit,
                    });
                }
                SurfaceKind::Ground => {
                    let upside_down = chassis_transform
                        .map(|t| {
                            let (_, _, angle) = t.rotation.to_euler(EulerRot::XYZ);
                            classify::roof_landing(angle)
                        })
                        .unwrap_or(false);
                    if upside_down {
                        failures.write(FailureEvent {
                            cause: FailCause::RoofLanding,
                        });
                    }
                }
            },
            SemanticContact {
                part: CartPart::Chassis,
                phase: ContactPhase::Stopped,
                ..
            } => {}
        }
    }
}

fn part_of(entity: Entity, cart: &CartBodies) -> Option<CartPart> {
    if entity == cart.chassis {
        Some(CartPart::Chassis)
    } else if entity == cart.rear_wheel {
        Some(CartPart::RearWheel)
    } else if entity == cart.front_wheel {
        Some(CartPart::FrontWheel)
    } else {
        None
    }
}

fn surface_of(entity: Entity, course: &CourseState) -> Option<SurfaceKind> {
    if course.hazard_bodies.contains(&entity) {
        Some(SurfaceKind::Hazard)
    } else if course.ground_bodies.contains(&entity) {
        Some(SurfaceKind::Ground)
    } else {
        None
    }
}
