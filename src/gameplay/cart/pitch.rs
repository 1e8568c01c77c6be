//! Pitch stabilization. Airborne the chassis spin is damped and clamped;
//! grounded it is damped toward level with a correction term that is softer
//! while the throttle is held, so deliberate wheelies are not fought.

use super::{CartBodies, CartChassis, RearGroundState, ThrottleState};
use crate::config::{GameConfig, PitchTuning};
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

pub(crate) fn stabilize_cart_pitch(
    time: Res<Time>,
    config: Res<GameConfig>,
    throttle: Res<ThrottleState>,
    rear_ground: Res<RearGroundState>,
    cart: Option<Res<CartBodies>>,
    mut chassis_query: Query<(&Transform, &mut Velocity), With<CartChassis>>,
) {
    if cart.is_none() {
        return;
    }
    let Ok((transform, mut velocity)) = chassis_query.single_mut() else {
        return;
    };

    let (_, _, chassis_angle) = transform.rotation.to_euler(EulerRot::XYZ);
    velocity.angvel = stabilized_angular_velocity(
        velocity.angvel,
        chassis_angle,
        time.delta_secs(),
        rear_ground.grounded,
        throttle.active,
        &config.tuning.pitch,
    );
}

pub fn stabilized_angular_velocity(
    angular_velocity: f32,
    chassis_angle: f32,
    dt: f32,
    rear_grounded: bool,
    throttle_active: bool,
    tuning: &PitchTuning,
) -> f32 {
    if !rear_grounded {
        return (angular_velocity * tuning.air_damp).clamp(-tuning.air_clamp, tuning.air_clamp);
    }

    let correction_scale = if throttle_active {
        tuning.throttle_scale
    } else {
        1.0
    };
    let damped = angular_velocity * tuning.damp;
    let correction = -chassis_angle * tuning.correction * correction_scale;
    let target = damped + correction * dt * tuning.target_gain;
    let clamp_limit = if throttle_active {
        tuning.clamp_throttle
    } else {
        tuning.clamp_coast
    };
    target.clamp(-clamp_limit, clamp_limit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::baseline_config;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn airborne_spin_is_damped_and_clamped() {
        let config = baseline_config();
        let tuning = &config.tuning.pitch;

        let damped = stabilized_angular_velocity(2.0, 0.5, DT, false, false, tuning);
        assert!((damped - 2.0 * tuning.air_damp).abs() < 0.0001);

        let clamped = stabilized_angular_velocity(40.0, 0.0, DT, false, true, tuning);
        assert_eq!(clamped, tuning.air_clamp);
    }

    #[test]
    fn grounded_correction_pushes_toward_level() {
        let config = baseline_config();
        let tuning = &config.tuning.pitch;

        // Nose pitched up with no spin: correction must be negative.
        let corrected = stabilized_angular_velocity(0.0, 0.4, DT, true, false, tuning);
        assert!(corrected < 0.0);

        // Nose pitched down mirrors the sign.
        let mirrored = stabilized_angular_velocity(0.0, -0.4, DT, true, false, tuning);
        assert!((corrected + mirrored).abs() < 0.0001);
    }

    #[test]
    fn throttle_softens_correction_and_tightens_clamp() {
        let config = baseline_config();
        let tuning = &config.tuning.pitch;

        let coasting = stabilized_angular_velocity(0.0, 0.4, DT, true, false, tuning);
        let throttling = stabilized_angular_velocity(0.0, 0.4, DT, true, true, tuning);
        assert!(throttling.abs() < coasting.abs());

        let spun = stabilized_angular_velocity(3.0, 0.0, DT, true, true, tuning);
        assert_eq!(spun, tuning.clamp_throttle);
        let spun_coast = stabilized_angular_velocity(3.0, 0.0, DT, true, false, tuning);
        assert_eq!(spun_coast, tuning.clamp_coast);
    }
}
