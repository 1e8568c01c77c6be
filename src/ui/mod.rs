use crate::config::GameConfig;
use crate::gameplay::cart::{stall::StallMeter, CartBodies, CartChassis};
use crate::persistence::{day_stamp, DistanceStore, SessionBest};
use crate::states::GameState;
use bevy::prelude::*;
use bevy_rapier2d::prelude::Velocity;

const HUD_PANEL_Z_INDEX: i32 = 190;
const HUD_PANEL_BG: Color = Color::srgba(0.06, 0.09, 0.12, 0.86);
const HUD_PANEL_BORDER: Color = Color::srgba(0.58, 0.68, 0.76, 0.92);
const HUD_TEXT_PRIMARY: Color = Color::srgb(0.94, 0.97, 1.0);
const HUD_TEXT_MUTED: Color = Color::srgb(0.76, 0.83, 0.9);
const HUD_STALL_BAR_WIDTH_PX: f32 = 220.0;
const PIXELS_PER_METER: f32 = 100.0;

pub struct GameHudPlugin;

impl Plugin for GameHudPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::InRun), spawn_game_hud)
            .add_systems(OnExit(GameState::InRun), cleanup_game_hud)
            .add_systems(
                Update,
                update_game_hud.run_if(in_state(GameState::InRun)),
            );
    }
}

#[derive(Component)]
struct GameHudRoot;

#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
enum HudTextKind {
    Distance,
    Speed,
    Angle,
    Records,
    StallLabel,
}

#[derive(Component)]
struct HudStallFill;

fn spawn_game_hud(mut commands: Commands, existing_hud: Query<Entity, With<GameHudRoot>>) {
    if !existing_hud.is_empty() {
        return;
    }

    commands
        .spawn((
            Name::new("GameHudRoot"),
            GameHudRoot,
            Node {
                position_type: PositionType::Absolute,
                left: Val::Px(12.0),
                top: Val::Px(10.0),
                ..default()
            },
            ZIndex(HUD_PANEL_Z_INDEX),
        ))
        .with_children(|root| {
            root.spawn((
                Name::new("GameHudPanel"),
                Node {
                    width: Val::Px(340.0),
                    flex_direction: FlexDirection::Column,
                    row_gap: Val::Px(6.0),
                    padding: UiRect::all(Val::Px(12.0)),
                    border: UiRect::all(Val::Px(1.0)),
                    ..default()
                },
                BackgroundColor(HUD_PANEL_BG),
                BorderColor::all(HUD_PANEL_BORDER),
            ))
            .with_children(|panel| {
                panel.spawn((
                    HudTextKind::Distance,
                    Text::new("0 m"),
                    TextFont {
                        font_size: 30.0,
                        ..default()
                    },
                    TextColor(HUD_TEXT_PRIMARY),
                ));
                panel.spawn((
                    HudTextKind::Speed,
                    Text::new("0.0 km/h"),
                    TextFont {
                        font_size: 18.0,
                        ..default()
                    },
                    TextColor(HUD_TEXT_PRIMARY),
                ));
                panel.spawn((
                    HudTextKind::Angle,
                    Text::new("Pitch 0.0°"),
                    TextFont {
                        font_size: 16.0,
                        ..default()
                    },
                    TextColor(HUD_TEXT_MUTED),
                ));
                panel.spawn((
                    HudTextKind::StallLabel,
                    Text::new("STALL"),
                    TextFont {
                        font_size: 16.0,
                        ..default()
                    },
                    TextColor(HUD_TEXT_MUTED),
                ));
                panel
                    .spawn((
                        Name::new("HudStallBar"),
                        Node {
                            width: Val::Px(HUD_STALL_BAR_WIDTH_PX),
                            height: Val::Px(14.0),
                            border: UiRect::all(Val::Px(1.0)),
                            ..default()
                        },
                        BackgroundColor(Color::srgba(0.02, 0.03, 0.04, 0.84)),
                        BorderColor::all(Color::srgba(0.56, 0.64, 0.70, 0.9)),
                    ))
                    .with_children(|bar| {
                        bar.spawn((
                            HudStallFill,
                            Node {
                                width: Val::Px(0.0),
                                height: Val::Percent(100.0),
                                ..default()
                            },
                            BackgroundColor(Color::srgb(0.38, 0.90, 0.34)),
                        ));
                    });
                panel.spawn((
                    HudTextKind::Records,
                    Text::new("Best 0 m | Today 0 m | Session 0 m"),
                    TextFont {
                        font_size: 15.0,
                        ..default()
                    },
                    TextColor(HUD_TEXT_MUTED),
                ));
                panel.spawn((
                    Text::new("Hold Space / Click / Touch to drive"),
                    TextFont {
                        font_size: 14.0,
                        ..default()
                    },
                    TextColor(HUD_TEXT_MUTED),
                ));
            });
        });
}

fn cleanup_game_hud(mut commands: Commands, hud_query: Query<Entity, With<GameHudRoot>>) {
    for entity in &hud_query {
        commands.entity(entity).try_despawn();
    }
}

fn update_game_hud(
    config: Res<GameConfig>,
    cart: Option<Res<CartBodies>>,
    stall: Res<StallMeter>,
    store: Res<DistanceStore>,
    session: Res<SessionBest>,
    chassis_query: Query<(&Transform, &Velocity), With<CartChassis>>,
    mut text_query: Query<(&HudTextKind, &mut Text)>,
    mut stall_fill_query: Query<(&mut Node, &mut BackgroundColor), With<HudStallFill>>,
) {
    let Some(cart) = cart else {
        return;
    };
    let Ok((transform, velocity)) = chassis_query.single() else {
        return;
    };

    let distance_m = (transform.translation.x - cart.start_x).max(0.0) / PIXELS_PER_METER;
    let speed_kmh = velocity.linvel.length() * config.game.hud.kmh_scale;
    let (_, _, angle) = transform.rotation.to_euler(EulerRot::XYZ);
    let pitch_deg = angle.to_degrees();

    let stall_fraction = stall.fraction(&config.tuning.stall);
    if let Ok((mut fill_node, mut fill_color)) = stall_fill_query.single_mut() {
        fill_node.width = Val::Px(HUD_STALL_BAR_WIDTH_PX * stall_fraction);
        let red = (0.3 + stall_fraction * 0.7).clamp(0.0, 1.0);
        let green = (1.0 - stall_fraction * 0.75).clamp(0.0, 1.0);
        *fill_color = BackgroundColor(Color::srgb(red, green, 0.2));
    }

    for (kind, mut text) in &mut text_query {
        match kind {
            HudTextKind::Distance => {
                *text = Text::new(format!("{distance_m:.0} m"));
            }
            HudTextKind::Speed => {
                *text = Text::new(format!("{speed_kmh:.1} km/h"));
            }
            HudTextKind::Angle => {
                *text = Text::new(format!("Pitch {pitch_deg:+.1}\u{b0}"));
            }
            HudTextKind::Records => {
                *text = Text::new(format!(
                    "Best {:.0} m | Today {:.0} m | Session {:.0} m",
                    store.get("best").max(session.distance_m),
                    store.get(&day_stamp()),
                    session.distance_m,
                ));
            }
            HudTextKind::StallLabel => {}
        }
    }
}
