use crate::config::GameConfig;
use crate::gameplay::cart::{
    stall::StallMeter, CartBodies, CartChassis, RearGroundState, ThrottleState,
};
use crate::gameplay::course::CourseState;
use crate::gameplay::failure::FrontContactTimer;
use crate::states::GameState;
use bevy::diagnostic::{DiagnosticsStore, FrameTimeDiagnosticsPlugin};
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use bevy_rapier2d::prelude::Velocity;
use std::fs;
use std::path::Path;

pub struct DebugOverlayPlugin;

impl Plugin for DebugOverlayPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<KeybindOverlayState>()
            .init_resource::<TuningPanelState>()
            .add_systems(Update, spawn_debug_overlay)
            .add_systems(Update, toggle_keybind_overlay)
            .add_systems(Update, toggle_tuning_panel)
            .add_systems(Update, sync_keybind_overlay_visibility)
            .add_systems(
                Update,
                update_debug_overlay_text
                    .run_if(in_state(GameState::InRun))
                    .run_if(resource_exists::<GameConfig>),
            )
            .add_systems(
                EguiPrimaryContextPass,
                tuning_panel_ui.run_if(resource_exists::<GameConfig>),
            );
    }
}

#[derive(Component)]
struct DebugOverlayText;

#[derive(Component)]
struct KeybindOverlayText;

#[derive(Resource, Debug, Clone, Default)]
struct KeybindOverlayState {
    visible: bool,
}

#[derive(Debug, Clone)]
struct CartTuningParams {
    throttle_force_n: f32,
    throttle_ramp_s: f32,
    throttle_ramp_min: f32,
    pitch_drop_slope: f32,
    pitch_factor_min: f32,
    pitch_damp: f32,
    pitch_correction: f32,
    pitch_clamp_throttle: f32,
    pitch_clamp_coast: f32,
    stall_fill_rate: f32,
    stall_drain_rate: f32,
    max_speed_px_per_s: f32,
}

impl CartTuningParams {
    fn from_config(config: &GameConfig) -> Self {
        let tuning = &config.tuning;
        Self {
            throttle_force_n: tuning.throttle.force_n,
            throttle_ramp_s: tuning.throttle.ramp_s,
            throttle_ramp_min: tuning.throttle.ramp_min,
            pitch_drop_slope: tuning.throttle.pitch_drop_slope,
            pitch_factor_min: tuning.throttle.pitch_factor_min,
            pitch_damp: tuning.pitch.damp,
            pitch_correction: tuning.pitch.correction,
            pitch_clamp_throttle: tuning.pitch.clamp_throttle,
            pitch_clamp_coast: tuning.pitch.clamp_coast,
            stall_fill_rate: tuning.stall.fill_rate,
            stall_drain_rate: tuning.stall.drain_rate,
            max_speed_px_per_s: tuning.speed.max_px_per_s,
        }
    }

    fn apply_to_config(&self, config: &mut GameConfig) {
        let tuning = &mut config.tuning;
        tuning.throttle.force_n = self.throttle_force_n;
        tuning.throttle.ramp_s = self.throttle_ramp_s;
        tuning.throttle.ramp_min = self.throttle_ramp_min;
        tuning.throttle.pitch_drop_slope = self.pitch_drop_slope;
        tuning.throttle.pitch_factor_min = self.pitch_factor_min;
        tuning.pitch.damp = self.pitch_damp;
        tuning.pitch.correction = self.pitch_correction;
        tuning.pitch.clamp_throttle = self.pitch_clamp_throttle;
        tuning.pitch.clamp_coast = self.pitch_clamp_coast;
        tuning.stall.fill_rate = self.stall_fill_rate;
        tuning.stall.drain_rate = self.stall_drain_rate;
        tuning.speed.max_px_per_s = self.max_speed_px_per_s;
    }
}

#[derive(Resource, Debug, Default)]
struct TuningPanelState {
    visible: bool,
    params: Option<CartTuningParams>,
    status: String,
}

fn spawn_debug_overlay(
    mut commands: Commands,
    keybind_overlay: Res<KeybindOverlayState>,
    config: Option<Res<GameConfig>>,
    existing_overlay: Query<Entity, With<DebugOverlayText>>,
) {
    if !existing_overlay.is_empty() {
        return;
    }

    let Some(config) = config else {
        return;
    };

    if !config.game.app.debug_overlay {
        return;
    }

    commands.spawn((
        DebugOverlayText,
        Text::new("debug overlay initializing..."),
        TextFont {
            font_size: 16.0,
            ..default()
        },
        TextColor(Color::srgb(0.92, 0.95, 0.97)),
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(12.0),
            top: Val::Px(12.0),
            ..default()
        },
        ZIndex(100),
    ));

    commands.spawn((
        KeybindOverlayText,
        Text::new(keybind_overlay_text()),
        TextFont {
            font_size: 15.0,
            ..default()
        },
        TextColor(Color::srgb(0.90, 0.94, 0.97)),
        BackgroundColor(Color::srgba(0.06, 0.08, 0.10, 0.82)),
        BorderColor::all(Color::srgba(0.60, 0.68, 0.74, 0.9)),
        Node {
            position_type: PositionType::Absolute,
            right: Val::Px(12.0),
            top: Val::Px(220.0),
            padding: UiRect::axes(Val::Px(10.0), Val::Px(8.0)),
            border: UiRect::all(Val::Px(1.0)),
            ..default()
        },
        if keybind_overlay.visible {
            Visibility::Inherited
        } else {
            Visibility::Hidden
        },
        ZIndex(100),
    ));
}

#[allow(clippy::too_many_arguments)]
fn update_debug_overlay_text(
    time: Res<Time>,
    diagnostics: Res<DiagnosticsStore>,
    throttle: Res<ThrottleState>,
    rear_ground: Res<RearGroundState>,
    stall: Res<StallMeter>,
    front_timer: Res<FrontContactTimer>,
    cart: Option<Res<CartBodies>>,
    course: Option<Res<CourseState>>,
    chassis_query: Query<(&Transform, &Velocity), With<CartChassis>>,
    mut overlay_query: Query<&mut Text, With<DebugOverlayText>>,
) {
    let Ok(mut text) = overlay_query.single_mut() else {
        return;
    };

    let fps = diagnostics
        .get(&FrameTimeDiagnosticsPlugin::FPS)
        .and_then(|value| value.smoothed())
        .unwrap_or(0.0);

    let (chassis_x, speed, angle_deg, angvel) = chassis_query
        .single()
        .map(|(transform, velocity)| {
            let (_, _, angle) = transform.rotation.to_euler(EulerRot::XYZ);
            (
                transform.translation.x,
                velocity.linvel.length(),
                angle.to_degrees(),
                velocity.angvel,
            )
        })
        .unwrap_or((0.0, 0.0, 0.0, 0.0));
    let start_x = cart.map(|cart| cart.start_x).unwrap_or(0.0);
    let (chunk_index, piece_count, world_width) = course
        .map(|course| {
            (
                course.cursor().chunk_index,
                course.piece_count(),
                course.world_width,
            )
        })
        .unwrap_or((0, 0, 0.0));
    let front_timer_s = front_timer
        .0
        .map(|started_at| time.elapsed_secs_f64() - started_at)
        .unwrap_or(0.0);

    *text = Text::new(format!(
        "FPS: {fps:>5.1}\nX: {chassis_x:>7.1} px ({distance:>6.1} m)\nSpeed: {speed:>6.1} px/s\nPitch: {angle_deg:>+6.1} deg | AngVel: {angvel:>+5.2}\nThrottle: {throttle} | Rear Grounded: {grounded}\nStall: {stall_value:>5.1}\nFront Contact: {front_timer_s:>4.2}s\nChunks: {chunk_index} | Bodies: {piece_count} | World: {world_width:.0} px\nHotkeys: H help | V tuning | F5 reload config",
        distance = (chassis_x - start_x).max(0.0) / 100.0,
        throttle = if throttle.active { "on" } else { "off" },
        grounded = if rear_ground.grounded { "yes" } else { "no" },
        stall_value = stall.value,
    ));
}

fn toggle_keybind_overlay(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut state: ResMut<KeybindOverlayState>,
    config: Option<Res<GameConfig>>,
) {
    let Some(config) = config else {
        return;
    };

    if !config.game.app.debug_overlay {
        return;
    }

    if keyboard.just_pressed(KeyCode::KeyH) {
        state.visible = !state.visible;
        info!(
            "Debug keybind panel {}.",
            if state.visible { "shown" } else { "hidden" }
        );
    }
}

fn sync_keybind_overlay_visibility(
    state: Res<KeybindOverlayState>,
    mut query: Query<&mut Visibility, With<KeybindOverlayText>>,
) {
    if !state.is_changed() {
        return;
    }

    let next_visibility = if state.visible {
        Visibility::Inherited
    } else {
        Visibility::Hidden
    };

    for mut visibility in &mut query {
        *visibility = next_visibility;
    }
}

fn toggle_tuning_panel(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut panel_state: ResMut<TuningPanelState>,
    config: Option<Res<GameConfig>>,
) {
    if !keyboard.just_pressed(KeyCode::KeyV) {
        return;
    }

    panel_state.visible = !panel_state.visible;
    if panel_state.visible {
        if let Some(config) = config {
            panel_state.params = Some(CartTuningParams::from_config(&config));
        }
        info!("Cart tuning panel shown.");
    } else {
        info!("Cart tuning panel hidden.");
    }
}

fn tuning_panel_ui(
    mut egui_contexts: EguiContexts,
    mut panel_state: ResMut<TuningPanelState>,
    mut config: ResMut<GameConfig>,
) {
    if !panel_state.visible {
        return;
    }

    if panel_state.params.is_none() {
        panel_state.params = Some(CartTuningParams::from_config(&config));
    }
    let Some(mut params) = panel_state.params.clone() else {
        return;
    };

    let mut window_open = panel_state.visible;
    let mut params_changed = false;
    let mut reload_clicked = false;
    let mut apply_clicked = false;
    let status = panel_state.status.clone();

    let Ok(ctx) = egui_contexts.ctx_mut() else {
        return;
    };
    egui::Window::new("Cart Tuning")
        .open(&mut window_open)
        .resizable(true)
        .default_width(520.0)
        .show(ctx, |ui| {
            ui.label("Each row has a slider plus a free-form float value.");
            ui.separator();

            ui.collapsing("Throttle", |ui| {
                params_changed |= tuning_slider_row(
                    ui,
                    "force_n",
                    &mut params.throttle_force_n,
                    10.0..=2000.0,
                    1.0,
                );
                params_changed |=
                    tuning_slider_row(ui, "ramp_s", &mut params.throttle_ramp_s, 0.1..=6.0, 0.01);
                params_changed |= tuning_slider_row(
                    ui,
                    "ramp_min",
                    &mut params.throttle_ramp_min,
                    0.01..=1.0,
                    0.01,
                );
                params_changed |= tuning_slider_row(
                    ui,
                    "pitch_drop_slope",
                    &mut params.pitch_drop_slope,
                    0.0..=8.0,
                    0.05,
                );
                params_changed |= tuning_slider_row(
                    ui,
                    "pitch_factor_min",
                    &mut params.pitch_factor_min,
                    0.05..=1.0,
                    0.01,
                );
            });

            ui.collapsing("Pitch Stabilization", |ui| {
                params_changed |=
                    tuning_slider_row(ui, "damp", &mut params.pitch_damp, 0.8..=1.0, 0.001);
                params_changed |= tuning_slider_row(
                    ui,
                    "correction",
                    &mut params.pitch_correction,
                    0.0..=20.0,
                    0.05,
                );
                params_changed |= tuning_slider_row(
                    ui,
                    "clamp_throttle",
                    &mut params.pitch_clamp_throttle,
                    0.1..=6.0,
                    0.01,
                );
                params_changed |= tuning_slider_row(
                    ui,
                    "clamp_coast",
                    &mut params.pitch_clamp_coast,
                    0.1..=6.0,
                    0.01,
                );
            });

            ui.collapsing("Stall + Speed", |ui| {
                params_changed |= tuning_slider_row(
                    ui,
                    "stall fill_rate",
                    &mut params.stall_fill_rate,
                    1.0..=200.0,
                    0.5,
                );
                params_changed |= tuning_slider_row(
                    ui,
                    "stall drain_rate",
                    &mut params.stall_drain_rate,
                    1.0..=200.0,
                    0.5,
                );
                params_changed |= tuning_slider_row(
                    ui,
                    "max_speed px/s",
                    &mut params.max_speed_px_per_s,
                    100.0..=3000.0,
                    1.0,
                );
            });

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Reload From Config").clicked() {
                    reload_clicked = true;
                }
                if ui.button("Apply To tuning.toml").clicked() {
                    apply_clicked = true;
                }
            });

            if !status.is_empty() {
                ui.separator();
                ui.label(status);
            }
        });

    panel_state.visible = window_open;

    if reload_clicked {
        panel_state.params = Some(CartTuningParams::from_config(&config));
        panel_state.status = "Reloaded values from current config.".to_string();
        return;
    }

    panel_state.params = Some(params.clone());

    if params_changed {
        params.apply_to_config(&mut config);
        panel_state.status = "Live-tuning active (in-memory config updated).".to_string();
    }

    if apply_clicked {
        match persist_tuning_and_reload(&mut config, &params) {
            Ok(message) => {
                panel_state.status = message;
                panel_state.params = Some(CartTuningParams::from_config(&config));
            }
            Err(error) => panel_state.status = error,
        }
    }
}

fn tuning_slider_row(
    ui: &mut egui::Ui,
    label: &str,
    value: &mut f32,
    slider_range: std::ops::RangeInclusive<f32>,
    drag_speed: f32,
) -> bool {
    let mut changed = false;
    ui.horizontal(|ui| {
        ui.label(label);
        changed |= ui
            .add(egui::Slider::new(value, slider_range).show_value(false))
            .changed();
        changed |= ui
            .add(egui::DragValue::new(value).speed(drag_speed as f64))
            .changed();
    });
    changed
}

fn persist_tuning_and_reload(
    config: &mut GameConfig,
    params: &CartTuningParams,
) -> Result<String, String> {
    let path = Path::new("config").join("tuning.toml");
    let original_raw = fs::read_to_string(&path)
        .map_err(|error| format!("Failed reading `{}`: {error}", path.display()))?;
    let mut root: toml::Value = toml::from_str(&original_raw)
        .map_err(|error| format!("Failed parsing `{}`: {error}", path.display()))?;

    write_params_to_toml_value(&mut root, params)?;

    let updated_raw = toml::to_string_pretty(&root)
        .map_err(|error| format!("Failed serializing tuning TOML: {error}"))?;
    fs::write(&path, updated_raw)
        .map_err(|error| format!("Failed writing `{}`: {error}", path.display()))?;

    match GameConfig::load_from_dir(Path::new("config")) {
        Ok(new_config) => {
            *config = new_config;
            Ok(format!(
                "Applied tuning and saved to {}.",
                path.to_string_lossy()
            ))
        }
        Err(error) => {
            let _ = fs::write(&path, original_raw);
            if let Ok(restored) = GameConfig::load_from_dir(Path::new("config")) {
                *config = restored;
            }
            Err(format!(
                "Apply failed validation: {error}. Reverted `{}`.",
                path.display()
            ))
        }
    }
}

fn write_params_to_toml_value(
    root: &mut toml::Value,
    params: &CartTuningParams,
) -> Result<(), String> {
    let throttle = section_table(root, "throttle")?;
    set_toml_float(throttle, "force_n", params.throttle_force_n)?;
    set_toml_float(throttle, "ramp_s", params.throttle_ramp_s)?;
    set_toml_float(throttle, "ramp_min", params.throttle_ramp_min)?;
    set_toml_float(throttle, "pitch_drop_slope", params.pitch_drop_slope)?;
    set_toml_float(throttle, "pitch_factor_min", params.pitch_factor_min)?;

    let pitch = section_table(root, "pitch")?;
    set_toml_float(pitch, "damp", params.pitch_damp)?;
    set_toml_float(pitch, "correction", params.pitch_correction)?;
    set_toml_float(pitch, "clamp_throttle", params.pitch_clamp_throttle)?;
    set_toml_float(pitch, "clamp_coast", params.pitch_clamp_coast)?;

    let stall = section_table(root, "stall")?;
    set_toml_float(stall, "fill_rate", params.stall_fill_rate)?;
    set_toml_float(stall, "drain_rate", params.stall_drain_rate)?;

    let speed = section_table(root, "speed")?;
    set_toml_float(speed, "max_px_per_s", params.max_speed_px_per_s)?;

    Ok(())
}

fn section_table<'a>(
    root: &'a mut toml::Value,
    section: &str,
) -> Result<&'a mut toml::map::Map<String, toml::Value>, String> {
    root.get_mut(section)
        .and_then(toml::Value::as_table_mut)
        .ok_or_else(|| format!("tuning.toml: missing or invalid `{section}` table"))
}

fn set_toml_float(
    table: &mut toml::map::Map<String, toml::Value>,
    key: &str,
    value: f32,
) -> Result<(), String> {
    if !value.is_finite() {
        return Err(format!("`{key}` is not a finite number"));
    }

    table.insert(key.to_string(), toml::Value::Float(value as f64));
    Ok(())
}

fn keybind_overlay_text() -> &'static str {
    "Keybinds\n\
H - Toggle this panel\n\
V - Toggle cart tuning panel\n\
F5 - Hot-reload config\n\
Space / Click / Touch - Throttle\n\
Space / Click - Retry after a failed run\n\
Q - Quit from the failed screen"
}
