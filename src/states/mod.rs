use crate::gameplay::failure::FailState;
use crate::persistence::{day_stamp, DistanceStore, SessionBest};
use bevy::app::AppExit;
use bevy::prelude::*;

#[derive(States, Debug, Clone, Copy, Eq, PartialEq, Hash, Default)]
pub enum GameState {
    #[default]
    Boot,
    InRun,
    Failed,
}

pub struct GameStatePlugin;

impl Plugin for GameStatePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_camera)
            .add_systems(OnEnter(GameState::Boot), enter_boot)
            .add_systems(
                Update,
                boot_to_in_run
                    .run_if(in_state(GameState::Boot))
                    .run_if(resource_exists::<crate::config::GameConfig>),
            )
            .add_systems(OnEnter(GameState::InRun), enter_in_run)
            .add_systems(OnEnter(GameState::Failed), enter_failed)
            .add_systems(OnExit(GameState::Failed), cleanup_failed_screen)
            .add_systems(Update, failed_controls.run_if(in_state(GameState::Failed)));
    }
}

#[derive(Component)]
struct FailedScreenRoot;

fn setup_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn enter_boot() {
    info!("Entered state: Boot");
}

fn boot_to_in_run(mut next_state: ResMut<NextState<GameState>>) {
    next_state.set(GameState::InRun);
}

fn enter_in_run() {
    info!("Entered state: InRun");
}

fn enter_failed(
    mut commands: Commands,
    fail: Res<FailState>,
    store: Res<DistanceStore>,
    session: Res<SessionBest>,
) {
    let cause_line = match *fail {
        FailState::Failed(cause) => cause.to_string(),
        FailState::Running => "Run over".to_string(),
    };
    let summary_text = format!(
        "{cause_line}\n\n\
Best: {best:.0} m\n\
Today: {today:.0} m\n\
This session: {session:.0} m\n\n\
Space - New Run\n\
Q - Quit",
        best = store.get("best"),
        today = store.get(&day_stamp()),
        session = session.distance_m,
    );

    commands
        .spawn((
            Name::new("FailedOverlay"),
            FailedScreenRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                ..default()
            },
            BackgroundColor(Color::srgba(0.01, 0.02, 0.03, 0.88)),
            ZIndex(300),
        ))
        .with_children(|parent| {
            parent
                .spawn((
                    Node {
                        width: Val::Percent(56.0),
                        max_width: Val::Px(720.0),
                        min_width: Val::Px(420.0),
                        flex_direction: FlexDirection::Column,
                        row_gap: Val::Px(10.0),
                        padding: UiRect::all(Val::Px(16.0)),
                        border: UiRect::all(Val::Px(1.0)),
                        ..default()
                    },
                    BackgroundColor(Color::srgba(0.08, 0.10, 0.13, 0.96)),
                    BorderColor::all(Color::srgba(0.56, 0.62, 0.68, 0.92)),
                ))
                .with_children(|panel| {
                    panel.spawn((
                        Text::new("RUN OVER"),
                        TextFont {
                            font_size: 52.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.94, 0.97, 1.00)),
                    ));
                    panel.spawn((
                        Text::new(summary_text),
                        TextFont {
                            font_size: 22.0,
                            ..default()
                        },
                        TextColor(Color::srgb(0.90, 0.94, 0.98)),
                    ));
                });
        });

    info!("Entered state: Failed ({cause_line})");
}

fn cleanup_failed_screen(
    mut commands: Commands,
    failed_screen_query: Query<Entity, With<FailedScreenRoot>>,
) {
    for entity in &failed_screen_query {
        commands.entity(entity).try_despawn();
    }
}

fn failed_controls(
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    mut next_state: ResMut<NextState<GameState>>,
    mut exit: MessageWriter<AppExit>,
) {
    if keyboard.just_pressed(KeyCode::Space) || mouse.just_pressed(MouseButton::Left) {
        next_state.set(GameState::Boot);
    }

    if keyboard.just_pressed(KeyCode::KeyQ) {
        exit.write(AppExit::Success);
    }
}
