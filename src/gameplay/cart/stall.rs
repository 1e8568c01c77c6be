//! Stall meter: idling fills it, throttling drains it, and hitting the cap
//! ends the run. Milestones relieve it in chunks.

use super::ThrottleState;
use crate::config::{GameConfig, StallTuning};
use crate::gameplay::failure::{FailCause, FailureEvent};
use bevy::prelude::*;

#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct StallMeter {
    pub value: f32,
}

impl StallMeter {
    pub fn relieve(&mut self, amount: f32) {
        self.value = (self.value - amount).max(0.0);
    }

    pub fn fraction(&self, tuning: &StallTuning) -> f32 {
        (self.value / tuning.max).clamp(0.0, 1.0)
    }
}

pub(crate) fn reset_stall_meter(mut stall: ResMut<StallMeter>) {
    *stall = StallMeter::default();
}

pub(crate) fn update_stall_meter(
    time: Res<Time>,
    config: Res<GameConfig>,
    throttle: Res<ThrottleState>,
    mut stall: ResMut<StallMeter>,
    mut failures: MessageWriter<FailureEvent>,
) {
    let tuning = &config.tuning.stall;
    stall.value = advance_stall(stall.value, throttle.active, time.delta_secs(), tuning);

    if stall.value >= tuning.max {
        failures.write(FailureEvent {
            cause: FailCause::StalledOut,
        });
    }
}

/// One tick of the meter, clamped to `[0, max]`.
pub fn advance_stall(value: f32, throttle_active: bool, dt: f32, tuning: &StallTuning) -> f32 {
    let rate = if throttle_active {
        -tuning.drain_rate
    } else {
        tuning.fill_rate
    };
    (value + rate * dt).clamp(0.0, tuning.max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::baseline_config;

    const DT: f32 = 1.0 / 60.0;

    #[test]
    fn meter_stays_within_bounds() {
        let config = baseline_config();
        let tuning = &config.tuning.stall;

        assert_eq!(advance_stall(0.0, true, 1.0, tuning), 0.0);
        assert_eq!(advance_stall(tuning.max, false, 1.0, tuning), tuning.max);
    }

    #[test]
    fn idle_reaches_cap_after_expected_time() {
        let config = baseline_config();
        let tuning = &config.tuning.stall;

        // 100 / 25 per second = 4 seconds of idling.
        let mut value = 0.0;
        let mut elapsed = 0.0;
        while value < tuning.max {
            value = advance_stall(value, false, DT, tuning);
            elapsed += DT;
            assert!(elapsed < 10.0, "meter never reached the cap");
        }
        assert!((elapsed - tuning.max / tuning.fill_rate).abs() < DT * 2.0);
    }

    #[test]
    fn throttle_drains_faster_than_idle_fills() {
        let config = baseline_config();
        let tuning = &config.tuning.stall;

        let filled = advance_stall(50.0, false, 1.0, tuning) - 50.0;
        let drained = 50.0 - advance_stall(50.0, true, 1.0, tuning);
        assert!(drained > filled);
        assert_eq!(filled, tuning.fill_rate);
        assert_eq!(drained, tuning.drain_rate);
    }

    #[test]
    fn relief_never_goes_negative() {
        let mut meter = StallMeter { value: 12.0 };
        meter.relieve(20.0);
        assert_eq!(meter.value, 0.0);
    }
}
