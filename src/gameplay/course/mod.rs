//! Course streaming. The generator plans chunks as pure data; this module
//! turns plans into fixed bodies and sprites, extends the course ahead of the
//! cart, and culls what has scrolled far enough behind.

pub mod generator;

use crate::config::GameConfig;
use crate::gameplay::cart::CartChassis;
use crate::states::GameState;
use bevy::platform::collections::HashSet;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;
use generator::{ChunkPlan, CourseCursor, DecorShape, DecorationPlan, SegmentPlan};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

pub const GROUND_GROUP: Group = Group::GROUP_1;
pub const CART_GROUP: Group = Group::GROUP_2;

const LOOKAHEAD_PX: f32 = 2000.0;
const TRAIL_WINDOW_PX: f32 = 1600.0;
const WORLD_PAD_PX: f32 = 1200.0;
const PRE_ROLL_PX: f32 = 3000.0;
const SEGMENT_CHAMFER_PX: f32 = 8.0;
const BOUNDARY_WALL_HALF_WIDTH_PX: f32 = 24.0;

pub struct CoursePlugin;

impl Plugin for CoursePlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(OnEnter(GameState::InRun), setup_course)
            .add_systems(OnExit(GameState::InRun), cleanup_course);
    }
}

struct GroundPiece {
    body: Entity,
    end_x: f32,
}

/// Static wall at the course's left edge.
#[derive(Component)]
pub struct CourseBoundary;

#[derive(Resource)]
pub struct CourseState {
    pieces: Vec<GroundPiece>,
    /// Standalone visuals paired with the x they can be culled at.
    decor: Vec<(Entity, f32)>,
    pub ground_bodies: HashSet<Entity>,
    pub hazard_bodies: HashSet<Entity>,
    cursor: CourseCursor,
    pub world_width: f32,
    rng: ChaCha8Rng,
}

impl CourseState {
    pub fn cursor(&self) -> &CourseCursor {
        &self.cursor
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }
}

fn setup_course(
    mut commands: Commands,
    config: Res<GameConfig>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
) {
    let seed = config.game.app.rng_seed;
    let rng = if seed == 0 {
        ChaCha8Rng::from_entropy()
    } else {
        ChaCha8Rng::seed_from_u64(seed)
    };
    let mut course = CourseState {
        pieces: Vec::new(),
        decor: Vec::new(),
        ground_bodies: HashSet::default(),
        hazard_bodies: HashSet::default(),
        cursor: CourseCursor::default(),
        world_width: generator::INITIAL_WORLD_WIDTH,
        rng,
    };

    // Nothing is ever generated left of the start line, so a wall there
    // keeps the cart from reversing out of the course.
    let wall = commands
        .spawn((
            CourseBoundary,
            RigidBody::Fixed,
            Collider::cuboid(BOUNDARY_WALL_HALF_WIDTH_PX, generator::WORLD_HEIGHT),
            CollisionGroups::new(GROUND_GROUP, Group::ALL),
            Transform::from_xyz(
                -BOUNDARY_WALL_HALF_WIDTH_PX,
                generator::WORLD_HEIGHT / 2.0,
                0.0,
            ),
        ))
        .id();
    course.decor.push((wall, f32::INFINITY));

    for plan in generator::plan_start_line() {
        let entity = spawn_decoration(&mut commands, &mut meshes, &mut materials, &plan);
        course.decor.push((entity, plan.position.x + 200.0));
    }
    let label = commands
        .spawn((
            Text2d::new("START"),
            TextFont {
                font_size: 26.0,
                ..default()
            },
            TextColor(Color::srgb_u8(230, 236, 244)),
            Transform::from_xyz(96.0, 240.0, 5.0),
        ))
        .id();
    course.decor.push((label, 400.0));

    // Lay enough easy road that the cart cannot outrun the generator during
    // the launch.
    while course.cursor.next_chunk_x < PRE_ROLL_PX {
        let CourseState { cursor, rng, .. } = &mut course;
        let plan = generator::plan_chunk(cursor, true, rng);
        let chunk_end = cursor.next_chunk_x;
        spawn_chunk(
            &mut commands,
            &mut meshes,
            &mut materials,
            &mut course,
            plan,
            chunk_end,
        );
    }
    course.world_width = course
        .world_width
        .max(course.cursor.next_chunk_x + WORLD_PAD_PX);

    info!(
        "course seeded (seed {}), pre-rolled to x {:.0}",
        seed, course.cursor.next_chunk_x
    );
    commands.insert_resource(course);
}

pub(crate) fn extend_and_cull_course(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    course: Option<ResMut<CourseState>>,
    chassis_query: Query<&Transform, With<CartChassis>>,
) {
    let Some(mut course) = course else {
        return;
    };
    let Ok(chassis_transform) = chassis_query.single() else {
        return;
    };
    let chassis_x = chassis_transform.translation.x;

    while course.cursor.next_chunk_x < chassis_x + LOOKAHEAD_PX {
        let CourseState { cursor, rng, .. } = &mut *course;
        let plan = generator::plan_chunk(cursor, false, rng);
        let chunk_end = cursor.next_chunk_x;
        spawn_chunk(
            &mut commands,
            &mut meshes,
            &mut materials,
            &mut course,
            plan,
            chunk_end,
        );
    }
    course.world_width = course
        .world_width
        .max(course.cursor.next_chunk_x + WORLD_PAD_PX);

    let cutoff = chassis_x - TRAIL_WINDOW_PX;
    let CourseState {
        pieces,
        decor,
        ground_bodies,
        hazard_bodies,
        ..
    } = &mut *course;
    for body in cull_passed_pieces(pieces, ground_bodies, hazard_bodies, cutoff) {
        commands.entity(body).try_despawn();
    }
    decor.retain(|(entity, cull_x)| {
        if *cull_x >= cutoff {
            return true;
        }
        commands.entity(*entity).try_despawn();
        false
    });
}

/// Drops every piece whose right edge is behind `cutoff` and forgets its
/// body in the ground and hazard sets. Returns the bodies to despawn.
fn cull_passed_pieces(
    pieces: &mut Vec<GroundPiece>,
    ground_bodies: &mut HashSet<Entity>,
    hazard_bodies: &mut HashSet<Entity>,
    cutoff: f32,
) -> Vec<Entity> {
    let mut culled = Vec::new();
    pieces.retain(|piece| {
        if piece.end_x >= cutoff {
            return true;
        }
        ground_bodies.remove(&piece.body);
        hazard_bodies.remove(&piece.body);
        culled.push(piece.body);
        false
    });
    culled
}

fn cleanup_course(mut commands: Commands, course: Option<Res<CourseState>>) {
    let Some(course) = course else {
        return;
    };
    for piece in &course.pieces {
        commands.entity(piece.body).try_despawn();
    }
    for (entity, _) in &course.decor {
        commands.entity(*entity).try_despawn();
    }
    commands.remove_resource::<CourseState>();
}

fn spawn_chunk(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<ColorMaterial>,
    course: &mut CourseState,
    plan: ChunkPlan,
    chunk_end: f32,
) {
    for segment in &plan.segments {
        let body = spawn_segment(commands, segment);
        if segment.is_hazard {
            course.hazard_bodies.insert(body);
        } else {
            course.ground_bodies.insert(body);
        }
        course.pieces.push(GroundPiece {
            body,
            end_x: segment.end_x(),
        });
    }
    for decoration in &plan.decorations {
        let entity = spawn_decoration(commands, meshes, materials, decoration);
        course.decor.push((entity, chunk_end));
    }
}

fn spawn_segment(commands: &mut Commands, segment: &SegmentPlan) -> Entity {
    let half_width = segment.width / 2.0;
    let half_height = segment.height / 2.0;
    // Chamfered tops keep the wheels from snagging on seams between pieces.
    let collider = if half_width > SEGMENT_CHAMFER_PX * 2.0 && half_height > SEGMENT_CHAMFER_PX * 2.0
    {
        Collider::round_cuboid(
            half_width - SEGMENT_CHAMFER_PX,
            half_height - SEGMENT_CHAMFER_PX,
            SEGMENT_CHAMFER_PX,
        )
    } else {
        Collider::cuboid(half_width, half_height)
    };

    let base_color = if segment.is_hazard {
        segment.color.with_alpha(0.95)
    } else {
        segment.color
    };

    commands
        .spawn((
            RigidBody::Fixed,
            collider,
            Friction::coefficient(segment.friction),
            CollisionGroups::new(GROUND_GROUP, Group::ALL),
            Transform::from_translation(segment.center.extend(0.0))
                .with_rotation(Quat::from_rotation_z(segment.angle)),
            Visibility::default(),
        ))
        .with_children(|parent| {
            parent.spawn(Sprite::from_color(
                base_color,
                Vec2::new(segment.width, segment.height),
            ));
            parent.spawn((
                Sprite::from_color(
                    segment.top_color,
                    Vec2::new(segment.width, generator::TOP_STRIP_HEIGHT),
                ),
                Transform::from_xyz(
                    0.0,
                    half_height - generator::TOP_STRIP_HEIGHT / 2.0,
                    0.1,
                ),
            ));
        })
        .id()
}

fn spawn_decoration(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<ColorMaterial>,
    plan: &DecorationPlan,
) -> Entity {
    let color = plan.color.with_alpha(plan.alpha);
    let transform = Transform::from_translation(plan.position.extend(plan.depth))
        .with_rotation(Quat::from_rotation_z(plan.rotation));

    match &plan.shape {
        DecorShape::Rect { size } => commands
            .spawn((Sprite::from_color(color, *size), transform))
            .id(),
        DecorShape::Circle { radius } => commands
            .spawn((
                Mesh2d(meshes.add(Circle::new(*radius))),
                MeshMaterial2d(materials.add(ColorMaterial::from(color))),
                transform,
            ))
            .id(),
        DecorShape::Ellipse { half_size } => commands
            .spawn((
                Mesh2d(meshes.add(Ellipse::new(half_size.x, half_size.y))),
                MeshMaterial2d(materials.add(ColorMaterial::from(color))),
                transform,
            ))
            .id(),
        DecorShape::Triangle { a, b, c } => commands
            .spawn((
                Mesh2d(meshes.add(Triangle2d::new(*a, *b, *c))),
                MeshMaterial2d(materials.add(ColorMaterial::from(color))),
                transform,
            ))
            .id(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    fn empty_course() -> CourseState {
        CourseState {
            pieces: Vec::new(),
            decor: Vec::new(),
            ground_bodies: HashSet::default(),
            hazard_bodies: HashSet::default(),
            cursor: CourseCursor::default(),
            world_width: generator::INITIAL_WORLD_WIDTH,
            rng: ChaCha8Rng::seed_from_u64(7),
        }
    }

    fn segment(center_x: f32, width: f32, is_hazard: bool) -> SegmentPlan {
        SegmentPlan {
            center: Vec2::new(center_x, 60.0),
            width,
            height: 80.0,
            angle: 0.0,
            color: Color::WHITE,
            top_color: Color::WHITE,
            is_hazard,
            friction: generator::GROUND_FRICTION,
        }
    }

    #[test]
    fn culling_forgets_hazards_behind_the_trail_window() {
        let mut world = World::new();
        let passed_ground = world.spawn_empty().id();
        let passed_hazard = world.spawn_empty().id();
        let ahead = world.spawn_empty().id();

        let mut pieces = vec![
            GroundPiece {
                body: passed_ground,
                end_x: 100.0,
            },
            GroundPiece {
                body: passed_hazard,
                end_x: 180.0,
            },
            GroundPiece {
                body: ahead,
                end_x: 2600.0,
            },
        ];
        let mut ground_bodies: HashSet<Entity> = [passed_ground, ahead].into_iter().collect();
        let mut hazard_bodies: HashSet<Entity> = [passed_hazard].into_iter().collect();

        let culled =
            cull_passed_pieces(&mut pieces, &mut ground_bodies, &mut hazard_bodies, 2000.0);

        assert_eq!(culled, vec![passed_ground, passed_hazard]);
        assert_eq!(pieces.len(), 1);
        assert_eq!(pieces[0].body, ahead);
        assert!(!ground_bodies.contains(&passed_ground));
        assert!(!hazard_bodies.contains(&passed_hazard));
        assert!(ground_bodies.contains(&ahead));
    }

    #[test]
    fn pieces_cull_by_their_own_right_edge() {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<ColorMaterial>>();

        world
            .run_system_once(
                |mut commands: Commands,
                 mut meshes: ResMut<Assets<Mesh>>,
                 mut materials: ResMut<Assets<ColorMaterial>>| {
                    let mut course = empty_course();
                    let plan = ChunkPlan {
                        segments: vec![
                            segment(3100.0, 200.0, false),
                            segment(3250.0, 100.0, true),
                            segment(3600.0, 600.0, false),
                        ],
                        decorations: Vec::new(),
                        advance: 1000.0,
                    };
                    spawn_chunk(
                        &mut commands,
                        &mut meshes,
                        &mut materials,
                        &mut course,
                        plan,
                        4000.0,
                    );
                    commands.insert_resource(course);
                },
            )
            .unwrap();

        let course = world.resource::<CourseState>();
        let edges: Vec<f32> = course.pieces.iter().map(|piece| piece.end_x).collect();
        assert_eq!(edges, vec![3200.0, 3300.0, 3900.0]);
    }

    #[test]
    fn setup_prerolls_terrain_and_walls_off_the_left_edge() {
        let mut world = World::new();
        world.insert_resource(crate::config::tests::baseline_config());
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<ColorMaterial>>();

        world.run_system_once(setup_course).unwrap();

        let course = world.resource::<CourseState>();
        assert!(course.cursor().next_chunk_x >= PRE_ROLL_PX);
        assert!(course.piece_count() > 0);

        let mut walls = world.query_filtered::<&Transform, With<CourseBoundary>>();
        let wall = walls.single(&world).unwrap();
        assert!(wall.translation.x < 0.0);
    }
}
