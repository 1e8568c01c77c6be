#![allow(dead_code)]

use bevy::prelude::*;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fs;
use std::path::{Path, PathBuf};

const CONFIG_DIR: &str = "config";

pub struct ConfigPlugin;

impl Plugin for ConfigPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, load_game_config)
            .add_systems(Update, reload_game_config_hotkey);
    }
}

fn load_game_config(mut commands: Commands) {
    let config = GameConfig::load_from_dir(Path::new(CONFIG_DIR)).unwrap_or_else(|error| {
        panic!("failed to load configuration from `{CONFIG_DIR}`: {error}");
    });

    log_config_summary("Loaded", &config);
    info!("Press F5 to hot-reload config files from `{CONFIG_DIR}`.");

    commands.insert_resource(config);
}

fn reload_game_config_hotkey(
    keyboard: Res<ButtonInput<KeyCode>>,
    game_config: Option<ResMut<GameConfig>>,
) {
    if !keyboard.just_pressed(KeyCode::F5) {
        return;
    }

    let Some(mut current_config) = game_config else {
        warn!("Config hot-reload requested, but `GameConfig` resource is not initialized yet.");
        return;
    };

    match GameConfig::load_from_dir(Path::new(CONFIG_DIR)) {
        Ok(new_config) => {
            *current_config = new_config;
            log_config_summary("Hot-reloaded", &current_config);
        }
        Err(error) => {
            error!("Config hot-reload failed; keeping previous config: {error}");
        }
    }
}

fn log_config_summary(prefix: &str, config: &GameConfig) {
    info!(
        "{prefix} config: stall max {}, speed cap {} px/s, front threshold {} s, seed {}.",
        config.tuning.stall.max,
        config.tuning.speed.max_px_per_s,
        config.tuning.front.contact_threshold_s,
        config.game.app.rng_seed
    );
}

#[derive(Resource, Debug, Clone)]
pub struct GameConfig {
    pub game: GameFile,
    pub cart: CartFile,
    pub tuning: TuningFile,
}

impl GameConfig {
    pub fn load_from_dir(config_dir: &Path) -> Result<Self, ConfigError> {
        let game: GameFile = read_toml(&config_dir.join("game.toml"))?;
        let cart: CartFile = read_toml(&config_dir.join("cart.toml"))?;
        let tuning: TuningFile = read_toml(&config_dir.join("tuning.toml"))?;

        let config = Self { game, cart, tuning };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let chassis = &self.cart.chassis;
        if chassis.width <= 0.0 || chassis.height <= 0.0 {
            return Err(ConfigError::Validation(
                "cart.toml::chassis width/height must be > 0".to_string(),
            ));
        }
        if chassis.mass <= 0.0 {
            return Err(ConfigError::Validation(
                "cart.toml::chassis.mass must be > 0".to_string(),
            ));
        }
        if chassis.angular_inertia <= 0.0 {
            return Err(ConfigError::Validation(
                "cart.toml::chassis.angular_inertia must be > 0".to_string(),
            ));
        }
        for (label, wheel) in [
            ("rear_wheel", &self.cart.rear_wheel),
            ("front_wheel", &self.cart.front_wheel),
        ] {
            if wheel.radius <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "cart.toml::{label}.radius must be > 0"
                )));
            }
            if wheel.mass <= 0.0 {
                return Err(ConfigError::Validation(format!(
                    "cart.toml::{label}.mass must be > 0"
                )));
            }
            if wheel.friction < 0.0 {
                return Err(ConfigError::Validation(format!(
                    "cart.toml::{label}.friction must be >= 0"
                )));
            }
        }

        let throttle = &self.tuning.throttle;
        if throttle.force_n <= 0.0 {
            return Err(ConfigError::Validation(
                "tuning.toml::throttle.force_n must be > 0".to_string(),
            ));
        }
        if throttle.ramp_s <= 0.0 {
            return Err(ConfigError::Validation(
                "tuning.toml::throttle.ramp_s must be > 0".to_string(),
            ));
        }
        if !(0.0 < throttle.ramp_min && throttle.ramp_min <= 1.0) {
            return Err(ConfigError::Validation(
                "tuning.toml::throttle.ramp_min must be in (0, 1]".to_string(),
            ));
        }
        if throttle.rear_recent_s < 0.0 {
            return Err(ConfigError::Validation(
                "tuning.toml::throttle.rear_recent_s must be >= 0".to_string(),
            ));
        }
        if !(0.0 < throttle.pitch_factor_min && throttle.pitch_factor_min <= 1.0) {
            return Err(ConfigError::Validation(
                "tuning.toml::throttle.pitch_factor_min must be in (0, 1]".to_string(),
            ));
        }
        if throttle.pitch_drop_slope < 0.0 {
            return Err(ConfigError::Validation(
                "tuning.toml::throttle.pitch_drop_slope must be >= 0".to_string(),
            ));
        }

        let pitch = &self.tuning.pitch;
        if pitch.air_clamp <= 0.0 || pitch.clamp_throttle <= 0.0 || pitch.clamp_coast <= 0.0 {
            return Err(ConfigError::Validation(
                "tuning.toml::pitch clamps must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&pitch.air_damp) || !(0.0..=1.0).contains(&pitch.damp) {
            return Err(ConfigError::Validation(
                "tuning.toml::pitch damp factors must be in [0, 1]".to_string(),
            ));
        }

        let stall = &self.tuning.stall;
        if stall.max <= 0.0 {
            return Err(ConfigError::Validation(
                "tuning.toml::stall.max must be > 0".to_string(),
            ));
        }
        if stall.fill_rate <= 0.0 || stall.drain_rate <= 0.0 {
            return Err(ConfigError::Validation(
                "tuning.toml::stall fill_rate and drain_rate must be > 0".to_string(),
            ));
        }

        if self.tuning.speed.max_px_per_s <= 0.0 {
            return Err(ConfigError::Validation(
                "tuning.toml::speed.max_px_per_s must be > 0".to_string(),
            ));
        }
        if self.tuning.front.contact_threshold_s <= 0.0 {
            return Err(ConfigError::Validation(
                "tuning.toml::front.contact_threshold_s must be > 0".to_string(),
            ));
        }
        if self.tuning.front.distance_gate_px < 0.0 {
            return Err(ConfigError::Validation(
                "tuning.toml::front.distance_gate_px must be >= 0".to_string(),
            ));
        }
        if self.tuning.start.grace_s < 0.0 {
            return Err(ConfigError::Validation(
                "tuning.toml::start.grace_s must be >= 0".to_string(),
            ));
        }

        let milestones = &self.game.milestones;
        if milestones.interval_m <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::milestones.interval_m must be > 0".to_string(),
            ));
        }
        if milestones.stall_relief < 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::milestones.stall_relief must be >= 0".to_string(),
            ));
        }
        if self.game.hud.kmh_scale <= 0.0 {
            return Err(ConfigError::Validation(
                "game.toml::hud.kmh_scale must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse {
        path: PathBuf,
        source: Box<toml::de::Error>,
    },
    Validation(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read `{}`: {source}", path.display())
            }
            Self::Parse { path, source } => {
                write!(f, "failed to parse `{}`: {source}", path.display())
            }
            Self::Validation(message) => write!(f, "{message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse { source, .. } => Some(source),
            Self::Validation(_) => None,
        }
    }
}

fn read_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source: Box::new(source),
    })
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameFile {
    pub app: AppConfig,
    pub hud: HudConfig,
    pub milestones: MilestonesConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub debug_overlay: bool,
    /// Course generator seed; 0 draws a fresh seed per run.
    #[serde(default)]
    pub rng_seed: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HudConfig {
    pub kmh_scale: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MilestonesConfig {
    pub interval_m: f32,
    pub stall_relief: f32,
    pub impulse_x: f32,
    pub impulse_y: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CartFile {
    pub chassis: ChassisConfig,
    pub rear_wheel: WheelConfig,
    pub front_wheel: WheelConfig,
    pub joints: JointsConfig,
    pub start: StartConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChassisConfig {
    pub width: f32,
    pub height: f32,
    pub mass: f32,
    pub angular_inertia: f32,
    /// Center-of-mass shift along the chassis; negative moves it rearward.
    pub com_offset_x: f32,
    pub friction: f32,
    pub linear_damping: f32,
    pub angular_damping: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WheelConfig {
    pub radius: f32,
    pub mass: f32,
    pub friction: f32,
    pub linear_damping: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JointsConfig {
    pub rear_anchor_x: f32,
    pub rear_anchor_y: f32,
    pub front_anchor_x: f32,
    pub front_anchor_y: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartConfig {
    pub x: f32,
    pub y: f32,
    pub tilt_rad: f32,
    /// Extra height for the front wheel at spawn so the cart starts nose-up.
    pub front_lift: f32,
    pub nudge_x: f32,
    pub nudge_y: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TuningFile {
    pub start: StartTuning,
    pub front: FrontTuning,
    pub throttle: ThrottleTuning,
    pub pitch: PitchTuning,
    pub stall: StallTuning,
    pub speed: SpeedTuning,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartTuning {
    pub grace_s: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FrontTuning {
    pub contact_threshold_s: f64,
    pub distance_gate_px: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleTuning {
    pub force_n: f32,
    pub ramp_s: f32,
    pub ramp_min: f32,
    pub rear_recent_s: f64,
    pub rear_ground_factor: f32,
    pub air_factor: f32,
    pub pitch_drop_start_rad: f32,
    pub pitch_drop_slope: f32,
    pub pitch_factor_min: f32,
    pub forces: ThrottleForces,
    pub angular_impulse: AngularImpulseTuning,
    pub wheel_spin_rate: f32,
    pub wheel_spin_min: f32,
    pub wheel_spin_max: f32,
}

/// Per-body multipliers applied to the drive strength. The two lift entries
/// are world-space points behind the chassis center that pull the nose up.
#[derive(Debug, Clone, Deserialize)]
pub struct ThrottleForces {
    pub rear_x: f32,
    pub rear_y: f32,
    pub chassis_x: f32,
    pub chassis_y: f32,
    pub lift1_offset_x: f32,
    pub lift1_offset_y: f32,
    pub lift1_y: f32,
    pub lift2_offset_x: f32,
    pub lift2_offset_y: f32,
    pub lift2_y: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AngularImpulseTuning {
    pub gain: f32,
    pub clamp: f32,
    pub angle_limit_rad: f32,
    pub chassis_clamp: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PitchTuning {
    pub air_damp: f32,
    pub air_clamp: f32,
    pub damp: f32,
    pub correction: f32,
    pub throttle_scale: f32,
    pub target_gain: f32,
    pub clamp_throttle: f32,
    pub clamp_coast: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StallTuning {
    pub max: f32,
    pub fill_rate: f32,
    pub drain_rate: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeedTuning {
    pub max_px_per_s: f32,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn baseline_config() -> GameConfig {
        GameConfig {
            game: GameFile {
                app: AppConfig {
                    debug_overlay: true,
                    rng_seed: 7,
                },
                hud: HudConfig { kmh_scale: 0.036 },
                milestones: MilestonesConfig {
                    interval_m: 250.0,
                    stall_relief: 20.0,
                    impulse_x: 40.0,
                    impulse_y: 12.0,
                },
            },
            cart: CartFile {
                chassis: ChassisConfig {
                    width: 160.0,
                    height: 36.0,
                    mass: 5.0,
                    angular_inertia: 11200.0,
                    com_offset_x: -16.0,
                    friction: 0.7,
                    linear_damping: 0.36,
                    angular_damping: 0.0,
                },
                rear_wheel: WheelConfig {
                    radius: 28.0,
                    mass: 2.5,
                    friction: 0.9,
                    linear_damping: 0.66,
                },
                front_wheel: WheelConfig {
                    radius: 18.0,
                    mass: 1.0,
                    friction: 0.22,
                    linear_damping: 0.54,
                },
                joints: JointsConfig {
                    rear_anchor_x: -52.0,
                    rear_anchor_y: -14.0,
                    front_anchor_x: 62.0,
                    front_anchor_y: -14.0,
                },
                start: StartConfig {
                    x: 200.0,
                    y: 180.0,
                    tilt_rad: 0.1,
                    front_lift: 16.0,
                    nudge_x: 60.0,
                    nudge_y: 2.0,
                },
            },
            tuning: TuningFile {
                start: StartTuning { grace_s: 2.2 },
                front: FrontTuning {
                    contact_threshold_s: 0.12,
                    distance_gate_px: 260.0,
                },
                throttle: ThrottleTuning {
                    force_n: 520.0,
                    ramp_s: 1.4,
                    ramp_min: 0.35,
                    rear_recent_s: 0.16,
                    rear_ground_factor: 1.0,
                    air_factor: 0.62,
                    pitch_drop_start_rad: 0.2,
                    pitch_drop_slope: 2.1,
                    pitch_factor_min: 0.36,
                    forces: ThrottleForces {
                        rear_x: 8.4,
                        rear_y: 0.1,
                        chassis_x: 4.8,
                        chassis_y: 0.01,
                        lift1_offset_x: -52.0,
                        lift1_offset_y: -10.0,
                        lift1_y: 0.22,
                        lift2_offset_x: -64.0,
                        lift2_offset_y: -4.0,
                        lift2_y: 0.04,
                    },
                    angular_impulse: AngularImpulseTuning {
                        gain: 3.5,
                        clamp: 0.7,
                        angle_limit_rad: 0.35,
                        chassis_clamp: 1.8,
                    },
                    wheel_spin_rate: 3.0,
                    wheel_spin_min: -10.5,
                    wheel_spin_max: 8.5,
                },
                pitch: PitchTuning {
                    air_damp: 0.995,
                    air_clamp: 4.5,
                    damp: 0.979,
                    correction: 0.084,
                    throttle_scale: 0.55,
                    target_gain: 1.45,
                    clamp_throttle: 1.55,
                    clamp_coast: 2.0,
                },
                stall: StallTuning {
                    max: 100.0,
                    fill_rate: 25.0,
                    drain_rate: 40.0,
                },
                speed: SpeedTuning { max_px_per_s: 900.0 },
            },
        }
    }

    #[test]
    fn baseline_config_passes_validation() {
        baseline_config().validate().expect("baseline must validate");
    }

    #[test]
    fn validation_rejects_zero_stall_rates() {
        let mut config = baseline_config();
        config.tuning.stall.fill_rate = 0.0;

        let error = config.validate().expect_err("validation should fail");
        assert!(error.to_string().contains("fill_rate"));
    }

    #[test]
    fn validation_rejects_ramp_min_outside_unit_interval() {
        let mut config = baseline_config();
        config.tuning.throttle.ramp_min = 1.4;

        let error = config.validate().expect_err("validation should fail");
        assert!(error.to_string().contains("ramp_min"));
    }

    #[test]
    fn validation_rejects_negative_wheel_friction() {
        let mut config = baseline_config();
        config.cart.front_wheel.friction = -0.1;

        let error = config.validate().expect_err("validation should fail");
        assert!(error.to_string().contains("front_wheel.friction"));
    }
}
