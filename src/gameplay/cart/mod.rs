use crate::config::GameConfig;
use crate::gameplay::course::{generator, CourseState, CART_GROUP, GROUND_GROUP};
use crate::states::GameState;
use bevy::math::primitives::Circle;
use bevy::prelude::*;
use bevy_rapier2d::prelude::*;

pub mod pitch;
pub mod stall;
pub mod throttle;

const CART_Z: f32 = 10.0;
const CHASSIS_CHAMFER_PX: f32 = 8.0;
const CAMERA_LERP: f32 = 0.18;
const CAMERA_LOOKAHEAD_PX: f32 = 180.0;
const HALF_VIEW_WIDTH_PX: f32 = 480.0;
const CAMERA_Y_PX: f32 = generator::WORLD_HEIGHT / 2.0;

pub struct CartPlugin;

impl Plugin for CartPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ThrottleState>()
            .init_resource::<RearGroundState>()
            .init_resource::<stall::StallMeter>()
            .add_systems(
                OnEnter(GameState::InRun),
                (reset_cart_run_state, stall::reset_stall_meter, spawn_cart).chain(),
            )
            .add_systems(OnExit(GameState::InRun), cleanup_cart);
    }
}

#[derive(Component)]
pub struct CartChassis;

#[derive(Component)]
pub struct CartRearWheel;

#[derive(Component)]
pub struct CartFrontWheel;

/// Entity handles for the three cart bodies plus the spawn x used by the
/// front-contact distance gate.
#[derive(Resource, Debug, Clone, Copy)]
pub struct CartBodies {
    pub chassis: Entity,
    pub rear_wheel: Entity,
    pub front_wheel: Entity,
    pub start_x: f32,
}

/// Elapsed-time anchor for the throttle ramp and the start grace window.
#[derive(Resource, Debug, Clone, Copy)]
pub struct RunClock {
    pub started_at_s: f64,
}

#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct ThrottleState {
    pub active: bool,
    pub last_change_s: f64,
}

/// Rear-wheel ground contact, fed by collision classification. The timestamp
/// lets drive persist through brief hops.
#[derive(Resource, Debug, Clone, Copy)]
pub struct RearGroundState {
    pub grounded: bool,
    pub last_ground_s: f64,
}

impl Default for RearGroundState {
    fn default() -> Self {
        Self {
            grounded: false,
            last_ground_s: f64::NEG_INFINITY,
        }
    }
}

fn reset_cart_run_state(
    mut commands: Commands,
    time: Res<Time>,
    mut throttle: ResMut<ThrottleState>,
    mut rear_ground: ResMut<RearGroundState>,
) {
    *throttle = ThrottleState::default();
    *rear_ground = RearGroundState::default();
    commands.insert_resource(RunClock {
        started_at_s: time.elapsed_secs_f64(),
    });
}

fn spawn_cart(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<ColorMaterial>>,
    config: Res<GameConfig>,
    existing_cart: Query<Entity, With<CartChassis>>,
) {
    if !existing_cart.is_empty() {
        return;
    }

    let cart = &config.cart;
    let start = &cart.start;
    let tilt = Quat::from_rotation_z(start.tilt_rad);
    let cart_groups = CollisionGroups::new(CART_GROUP, GROUND_GROUP);

    let chassis_half = Vec2::new(cart.chassis.width / 2.0, cart.chassis.height / 2.0);
    let chassis = commands
        .spawn((
            Name::new("CartChassis"),
            CartChassis,
            RigidBody::Dynamic,
            Collider::round_cuboid(
                chassis_half.x - CHASSIS_CHAMFER_PX,
                chassis_half.y - CHASSIS_CHAMFER_PX,
                CHASSIS_CHAMFER_PX,
            ),
            ColliderMassProperties::MassProperties(MassProperties {
                local_center_of_mass: Vec2::new(cart.chassis.com_offset_x, 0.0),
                mass: cart.chassis.mass,
                principal_inertia: cart.chassis.angular_inertia,
            }),
            Friction::coefficient(cart.chassis.friction),
            Damping {
                linear_damping: cart.chassis.linear_damping,
                angular_damping: cart.chassis.angular_damping,
            },
            Velocity::zero(),
            ExternalForce::default(),
            ActiveEvents::COLLISION_EVENTS,
            cart_groups,
            Transform::from_xyz(start.x, start.y, CART_Z).with_rotation(tilt),
            Visibility::default(),
        ))
        .with_children(|parent| {
            parent.spawn((
                Name::new("CartBodyVisual"),
                Sprite::from_color(
                    Color::srgb_u8(0xf9, 0x73, 0x16),
                    Vec2::new(cart.chassis.width, cart.chassis.height),
                ),
                Transform::from_xyz(0.0, 0.0, 0.0),
            ));
            parent.spawn((
                Name::new("CartCabVisual"),
                Sprite::from_color(Color::srgb_u8(0x38, 0xbd, 0xf8), Vec2::new(46.0, 26.0)),
                Transform::from_xyz(14.0, cart.chassis.height / 2.0 + 10.0, 0.1),
            ));
        })
        .id();

    let rear_wheel = spawn_wheel(
        &mut commands,
        &mut meshes,
        &mut materials,
        "CartRearWheel",
        &cart.rear_wheel,
        Vec2::new(start.x - 50.0, start.y - 26.0),
        tilt,
        cart_groups,
    );
    commands.entity(rear_wheel).insert((
        CartRearWheel,
        ExternalForce::default(),
        ExternalImpulse {
            impulse: Vec2::new(start.nudge_x, start.nudge_y),
            torque_impulse: 0.0,
        },
    ));

    let front_wheel = spawn_wheel(
        &mut commands,
        &mut meshes,
        &mut materials,
        "CartFrontWheel",
        &cart.front_wheel,
        Vec2::new(start.x + 55.0, start.y - 22.0 + start.front_lift),
        tilt,
        cart_groups,
    );
    commands.entity(front_wheel).insert(CartFrontWheel);

    let rear_joint = RevoluteJointBuilder::new()
        .local_anchor1(Vec2::new(cart.joints.rear_anchor_x, cart.joints.rear_anchor_y))
        .local_anchor2(Vec2::ZERO);
    commands
        .entity(rear_wheel)
        .insert(ImpulseJoint::new(chassis, rear_joint));

    let front_joint = RevoluteJointBuilder::new()
        .local_anchor1(Vec2::new(
            cart.joints.front_anchor_x,
            cart.joints.front_anchor_y,
        ))
        .local_anchor2(Vec2::ZERO);
    commands
        .entity(front_wheel)
        .insert(ImpulseJoint::new(chassis, front_joint));

    commands.insert_resource(CartBodies {
        chassis,
        rear_wheel,
        front_wheel,
        start_x: start.x,
    });

    info!(
        "Spawned cart at ({}, {}) with tilt {} rad.",
        start.x, start.y, start.tilt_rad
    );
}

#[allow(clippy::too_many_arguments)]
fn spawn_wheel(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<ColorMaterial>,
    name: &'static str,
    wheel: &crate::config::WheelConfig,
    position: Vec2,
    tilt: Quat,
    groups: CollisionGroups,
) -> Entity {
    let tire_mesh = meshes.add(Circle::new(wheel.radius));
    let hub_mesh = meshes.add(Circle::new(wheel.radius * 0.45));
    let tire_material = materials.add(ColorMaterial::from(Color::srgb_u8(0x1e, 0x29, 0x3b)));
    let hub_material = materials.add(ColorMaterial::from(Color::srgb_u8(0x94, 0xa3, 0xb8)));

    commands
        .spawn((
            Name::new(name),
            RigidBody::Dynamic,
            Collider::ball(wheel.radius),
            ColliderMassProperties::MassProperties(MassProperties {
                local_center_of_mass: Vec2::ZERO,
                mass: wheel.mass,
                principal_inertia: wheel.mass * wheel.radius * wheel.radius / 2.0,
            }),
            Friction::coefficient(wheel.friction),
            Damping {
                linear_damping: wheel.linear_damping,
                angular_damping: 0.0,
            },
            Velocity::zero(),
            ActiveEvents::COLLISION_EVENTS,
            groups,
            Transform::from_xyz(position.x, position.y, CART_Z + 0.2).with_rotation(tilt),
            Visibility::default(),
        ))
        .with_children(|parent| {
            parent.spawn((
                Mesh2d(tire_mesh),
                MeshMaterial2d(tire_material),
                Transform::from_xyz(0.0, 0.0, 0.0),
            ));
            parent.spawn((
                Mesh2d(hub_mesh),
                MeshMaterial2d(hub_material),
                Transform::from_xyz(0.0, wheel.radius * 0.3, 0.1),
            ));
        })
        .id()
}

#[allow(clippy::type_complexity)]
fn cleanup_cart(
    mut commands: Commands,
    cart_query: Query<
        Entity,
        Or<(With<CartChassis>, With<CartRearWheel>, With<CartFrontWheel>)>,
    >,
) {
    for entity in &cart_query {
        commands.entity(entity).try_despawn();
    }
    commands.remove_resource::<CartBodies>();
    commands.remove_resource::<RunClock>();
}

/// Edge-triggered throttle input: keyboard space, mouse button, or any touch.
pub(crate) fn read_throttle_input(
    time: Res<Time>,
    keyboard: Res<ButtonInput<KeyCode>>,
    mouse: Res<ButtonInput<MouseButton>>,
    touches: Res<Touches>,
    mut throttle: ResMut<ThrottleState>,
) {
    let pressed = keyboard.pressed(KeyCode::Space)
        || mouse.pressed(MouseButton::Left)
        || touches.iter().next().is_some();

    if pressed != throttle.active {
        throttle.active = pressed;
        throttle.last_change_s = time.elapsed_secs_f64();
    }
}

/// Rescales the chassis velocity uniformly so its magnitude never exceeds the
/// cap; direction is preserved.
pub(crate) fn clamp_cart_speed(
    config: Res<GameConfig>,
    mut chassis_query: Query<&mut Velocity, With<CartChassis>>,
) {
    let Ok(mut velocity) = chassis_query.single_mut() else {
        return;
    };
    velocity.linvel = clamp_speed(velocity.linvel, config.tuning.speed.max_px_per_s);
}

pub fn clamp_speed(velocity: Vec2, max_speed: f32) -> Vec2 {
    let speed = velocity.length();
    if speed <= max_speed || speed <= f32::EPSILON {
        return velocity;
    }
    velocity * (max_speed / speed)
}

pub(crate) fn camera_follow_cart(
    course: Option<Res<CourseState>>,
    chassis_query: Query<&Transform, With<CartChassis>>,
    mut camera_query: Query<&mut Transform, (With<Camera2d>, Without<CartChassis>)>,
) {
    let Ok(chassis_transform) = chassis_query.single() else {
        return;
    };
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    let world_width = course
        .map(|course| course.world_width)
        .unwrap_or(generator::INITIAL_WORLD_WIDTH);
    let target_x = (chassis_transform.translation.x + CAMERA_LOOKAHEAD_PX)
        .clamp(HALF_VIEW_WIDTH_PX, (world_width - HALF_VIEW_WIDTH_PX).max(HALF_VIEW_WIDTH_PX));

    camera_transform.translation.x +=
        (target_x - camera_transform.translation.x) * CAMERA_LERP;
    camera_transform.translation.y = CAMERA_Y_PX;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_speed_leaves_slow_velocities_untouched() {
        let velocity = Vec2::new(300.0, -120.0);
        assert_eq!(clamp_speed(velocity, 900.0), velocity);
    }

    #[test]
    fn clamp_speed_rescales_uniformly() {
        let velocity = Vec2::new(1200.0, -500.0);
        let clamped = clamp_speed(velocity, 900.0);

        assert!((clamped.length() - 900.0).abs() < 0.01);
        // Direction preserved: the clamped vector is collinear with the input.
        let cross = velocity.x * clamped.y - velocity.y * clamped.x;
        assert!(cross.abs() < 1.0);
        assert!(clamped.dot(velocity) > 0.0);
    }

    #[test]
    fn clamp_speed_handles_zero_velocity() {
        assert_eq!(clamp_speed(Vec2::ZERO, 900.0), Vec2::ZERO);
    }
}
