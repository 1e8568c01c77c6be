//! Throttle force model. Drive strength ramps in over the start of the run,
//! is gated on recent rear-wheel ground contact, and fades as the chassis
//! pitches past the drop-start angle. The resulting force is applied at the
//! rear wheel, the chassis center, and two lift points behind the center,
//! with a small angular assist while the cart is near level.

use super::{CartBodies, RearGroundState, RunClock, ThrottleState};
use crate::config::{GameConfig, ThrottleTuning};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

pub(crate) fn apply_throttle_forces(
    time: Res<Time>,
    config: Res<GameConfig>,
    throttle: Res<ThrottleState>,
    rear_ground: Res<RearGroundState>,
    run_clock: Option<Res<RunClock>>,
    cart: Option<Res<CartBodies>>,
    mut body_query: Query<(&Transform, &mut Velocity, Option<&mut ExternalForce>)>,
) {
    let (Some(run_clock), Some(cart)) = (run_clock, cart) else {
        return;
    };
    let tuning = &config.tuning.throttle;
    let now = time.elapsed_secs_f64();
    let dt = time.delta_secs();

    // Forces persist across physics steps, so clear last frame's application
    // before deciding whether to drive.
    for body in [cart.chassis, cart.rear_wheel] {
        if let Ok((_, _, Some(mut force))) = body_query.get_mut(body) {
            *force = ExternalForce::default();
        }
    }

    let Ok((chassis_transform, _, _)) = body_query.get(cart.chassis) else {
        return;
    };
    let (_, _, chassis_angle) = chassis_transform.rotation.to_euler(EulerRot::XYZ);
    let chassis_position = chassis_transform.translation.truncate();

    let elapsed_s = (now - run_clock.started_at_s) as f32;
    let rear_contact_recent = rear_ground.grounded
        || now - rear_ground.last_ground_s < tuning.rear_recent_s;
    let drive = drive_strength(
        throttle.active,
        elapsed_s,
        rear_ground.grounded,
        rear_contact_recent,
        chassis_angle,
        tuning,
    );
    if drive <= 0.0 {
        return;
    }

    let forces = &tuning.forces;
    let com_world = chassis_position
        + Mat2::from_angle(chassis_angle) * Vec2::new(config.cart.chassis.com_offset_x, 0.0);

    if let Ok((_, mut velocity, force)) = body_query.get_mut(cart.rear_wheel) {
        if let Some(mut force) = force {
            force.force += Vec2::new(drive * forces.rear_x, drive * forces.rear_y);
        }
        // Cosmetic spin-up so the driven wheel visibly leads the cart.
        velocity.angvel = (velocity.angvel - tuning.wheel_spin_rate * dt)
            .clamp(tuning.wheel_spin_min, tuning.wheel_spin_max);
    }

    let Ok((_, mut chassis_velocity, Some(mut chassis_force)) ) = body_query.get_mut(cart.chassis)
    else {
        return;
    };

    chassis_force.force += Vec2::new(drive * forces.chassis_x, drive * forces.chassis_y);
    *chassis_force += ExternalForce::at_point(
        Vec2::new(0.0, drive * forces.lift1_y),
        chassis_position + Vec2::new(forces.lift1_offset_x, forces.lift1_offset_y),
        com_world,
    );
    *chassis_force += ExternalForce::at_point(
        Vec2::new(0.0, drive * forces.lift2_y),
        chassis_position + Vec2::new(forces.lift2_offset_x, forces.lift2_offset_y),
        com_world,
    );

    let assist = &tuning.angular_impulse;
    if chassis_angle.abs() < assist.angle_limit_rad {
        let drive_fraction = drive / tuning.force_n;
        let delta = (drive_fraction * assist.gain).clamp(-assist.clamp, assist.clamp) * dt;
        chassis_velocity.angvel = (chassis_velocity.angvel + delta)
            .clamp(-assist.chassis_clamp, assist.chassis_clamp);
    }
}

pub fn throttle_ramp(elapsed_s: f32, tuning: &ThrottleTuning) -> f32 {
    (elapsed_s / tuning.ramp_s).clamp(tuning.ramp_min, 1.0)
}

pub fn pitch_drive_factor(chassis_angle: f32, tuning: &ThrottleTuning) -> f32 {
    let over = (chassis_angle.abs() - tuning.pitch_drop_start_rad).max(0.0);
    (1.0 - over * tuning.pitch_drop_slope).clamp(tuning.pitch_factor_min, 1.0)
}

/// Drive strength in force units; zero when the throttle is off or the rear
/// wheel has been off the ground longer than the recency window.
pub fn drive_strength(
    throttle_active: bool,
    elapsed_s: f32,
    rear_grounded: bool,
    rear_contact_recent: bool,
    chassis_angle: f32,
    tuning: &ThrottleTuning,
) -> f32 {
    if !throttle_active || !rear_contact_recent {
        return 0.0;
    }
    let ground_factor = if rear_grounded {
        tuning.rear_ground_factor
    } else {
        tuning.air_factor
    };
    tuning.force_n
        * throttle_ramp(elapsed_s, tuning)
        * ground_factor
        * pitch_drive_factor(chassis_angle, tuning)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::baseline_config;

    #[test]
    fn ramp_starts_at_floor_and_saturates() {
        let config = baseline_config();
        let tuning = &config.tuning.throttle;

        assert_eq!(throttle_ramp(0.0, tuning), tuning.ramp_min);
        assert_eq!(throttle_ramp(0.7, tuning), 0.5);
        assert_eq!(throttle_ramp(1.4, tuning), 1.0);
        assert_eq!(throttle_ramp(10.0, tuning), 1.0);
    }

    #[test]
    fn pitch_factor_is_full_below_drop_start() {
        let config = baseline_config();
        let tuning = &config.tuning.throttle;

        assert_eq!(pitch_drive_factor(0.0, tuning), 1.0);
        assert_eq!(pitch_drive_factor(0.19, tuning), 1.0);
        assert_eq!(pitch_drive_factor(-0.19, tuning), 1.0);
    }

    #[test]
    fn pitch_factor_fades_to_floor_at_steep_angles() {
        let config = baseline_config();
        let tuning = &config.tuning.throttle;

        let mid = pitch_drive_factor(0.3, tuning);
        assert!(mid < 1.0 && mid > tuning.pitch_factor_min);
        assert_eq!(pitch_drive_factor(1.2, tuning), tuning.pitch_factor_min);
        // Symmetric in the pitch direction.
        assert_eq!(pitch_drive_factor(-0.3, tuning), mid);
    }

    #[test]
    fn drive_is_zero_without_throttle_or_recent_rear_contact() {
        let config = baseline_config();
        let tuning = &config.tuning.throttle;

        assert_eq!(drive_strength(false, 5.0, true, true, 0.0, tuning), 0.0);
        assert_eq!(drive_strength(true, 5.0, false, false, 0.0, tuning), 0.0);
    }

    #[test]
    fn airborne_drive_is_reduced_while_contact_is_recent() {
        let config = baseline_config();
        let tuning = &config.tuning.throttle;

        let grounded = drive_strength(true, 5.0, true, true, 0.0, tuning);
        let airborne = drive_strength(true, 5.0, false, true, 0.0, tuning);

        assert_eq!(grounded, tuning.force_n);
        assert!((airborne - tuning.force_n * tuning.air_factor).abs() < 0.001);
    }
}
