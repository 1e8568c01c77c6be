//! Pure course planning: given a cursor and an RNG, produce the segments and
//! decorations for the next chunk. Nothing here touches the ECS, so chunk
//! sequences are fully reproducible from a seed.
//!
//! World units are pixels, y-up. A positive segment angle raises the surface
//! toward the right edge of the segment.

use bevy::prelude::*;
use rand::Rng;

pub const WORLD_HEIGHT: f32 = 540.0;
pub const GROUND_Y: f32 = 100.0;
/// Segment surfaces are never placed below this line.
pub const MIN_SURFACE_Y: f32 = 60.0;
pub const INITIAL_WORLD_WIDTH: f32 = 4000.0;
pub const GROUND_FRICTION: f32 = 0.9;
pub const SAND_FRICTION: f32 = 1.8;
pub const TOP_STRIP_HEIGHT: f32 = 12.0;

const DIFFICULTY_CAP: f32 = 3.8;
const EASE_DIFFICULTY: f32 = 0.6;

pub mod palette {
    use bevy::prelude::*;

    pub fn ground(index: u32) -> Color {
        match index % 3 {
            0 => Color::srgb_u8(0x3f, 0x2d, 0x20),
            1 => Color::srgb_u8(0x35, 0x25, 0x1a),
            _ => Color::srgb_u8(0x2a, 0x1c, 0x13),
        }
    }

    pub fn grass_top() -> Color {
        Color::srgb_u8(0x65, 0xa3, 0x0d)
    }

    pub fn hazard() -> Color {
        Color::srgb_u8(0xbe, 0x12, 0x3c)
    }

    pub fn sand() -> Color {
        Color::srgb_u8(0xd7, 0xb5, 0x7a)
    }

    pub fn sand_top() -> Color {
        Color::srgb_u8(0xf5, 0xd3, 0x99)
    }

    pub fn marker() -> Color {
        Color::srgb_u8(0xf4, 0x72, 0xb6)
    }

    pub fn warn_strip() -> Color {
        Color::srgb_u8(0xfc, 0xa5, 0xa5)
    }
}

/// Where the generator left off after the previous chunk.
#[derive(Debug, Clone)]
pub struct CourseCursor {
    pub next_chunk_x: f32,
    pub chunk_index: u32,
    pub last_surface_y: f32,
}

impl Default for CourseCursor {
    fn default() -> Self {
        Self {
            next_chunk_x: 0.0,
            chunk_index: 0,
            last_surface_y: GROUND_Y,
        }
    }
}

/// One physics segment: a fixed rotated box with a friction value.
#[derive(Debug, Clone)]
pub struct SegmentPlan {
    pub center: Vec2,
    pub width: f32,
    pub height: f32,
    pub angle: f32,
    pub color: Color,
    pub top_color: Color,
    pub is_hazard: bool,
    pub friction: f32,
}

impl SegmentPlan {
    fn ground(center: Vec2, width: f32, height: f32, angle: f32, color: Color) -> Self {
        Self {
            center,
            width,
            height,
            angle,
            color,
            top_color: palette::grass_top(),
            is_hazard: false,
            friction: GROUND_FRICTION,
        }
    }

    fn hazard(center: Vec2, width: f32, height: f32) -> Self {
        Self {
            center,
            width,
            height,
            angle: 0.0,
            color: palette::hazard(),
            top_color: palette::hazard(),
            is_hazard: true,
            friction: GROUND_FRICTION,
        }
    }

    pub fn surface_y(&self) -> f32 {
        self.center.y + self.height / 2.0
    }

    pub fn end_x(&self) -> f32 {
        self.center.x + self.width / 2.0
    }
}

#[derive(Debug, Clone)]
pub enum DecorShape {
    Rect { size: Vec2 },
    Circle { radius: f32 },
    Ellipse { half_size: Vec2 },
    Triangle { a: Vec2, b: Vec2, c: Vec2 },
}

#[derive(Debug, Clone)]
pub struct DecorationPlan {
    pub shape: DecorShape,
    pub position: Vec2,
    pub rotation: f32,
    pub color: Color,
    pub alpha: f32,
    pub depth: f32,
}

#[derive(Debug, Clone, Default)]
pub struct ChunkPlan {
    pub segments: Vec<SegmentPlan>,
    pub decorations: Vec<DecorationPlan>,
    /// Horizontal span consumed; the cursor advances by exactly this much.
    pub advance: f32,
}

pub fn difficulty_factor(chunk_index: u32, initial_ease: bool) -> f32 {
    if initial_ease {
        return EASE_DIFFICULTY;
    }
    (0.9 + chunk_index as f32 * 0.08).clamp(0.9, DIFFICULTY_CAP)
}

fn progress_factor(chunk_index: u32) -> f32 {
    (chunk_index as f32 / 30.0).clamp(0.0, 1.0)
}

fn int_between(rng: &mut impl Rng, low: i32, high: i32) -> f32 {
    rng.gen_range(low..=high) as f32
}

/// Raises `base_y` just enough to keep the segment surface on screen.
fn raise_to_floor(base_y: f32, height: f32) -> f32 {
    let surface_y = base_y + height / 2.0;
    if surface_y < MIN_SURFACE_Y {
        base_y + (MIN_SURFACE_Y - surface_y)
    } else {
        base_y
    }
}

fn exit_surface_y(base_y: f32, height: f32, angle: f32, width: f32) -> f32 {
    base_y + height / 2.0 + angle.tan() * (width / 2.0)
}

/// Plans the next chunk and advances the cursor. Chunk type is a weighted
/// draw among roller, kicker, and gap; the ease phase only produces rollers.
pub fn plan_chunk(cursor: &mut CourseCursor, initial_ease: bool, rng: &mut impl Rng) -> ChunkPlan {
    let diff = difficulty_factor(cursor.chunk_index, initial_ease);
    let progress = progress_factor(cursor.chunk_index);

    let chunk_width = 720.0
        + int_between(rng, -80, 160)
        + (cursor.chunk_index as f32 * 10.0).min(360.0)
        + (diff * 40.0).floor();

    let feature_roll = rng.gen::<f32>();
    let gap_chance = if initial_ease {
        0.0
    } else {
        (0.12 + progress * 0.35).clamp(0.12, 0.5)
    };
    let kicker_chance = if initial_ease {
        0.1
    } else {
        (0.18 + progress * 0.25).clamp(0.18, 0.55)
    };

    if !initial_ease && feature_roll < gap_chance {
        return plan_gap_chunk(cursor, chunk_width, diff, rng);
    }
    if !initial_ease && feature_roll < gap_chance + kicker_chance {
        return plan_kicker_chunk(cursor, chunk_width, diff, progress, rng);
    }
    plan_roller_chunk(cursor, chunk_width, diff, progress, initial_ease, rng)
}

pub(crate) fn plan_roller_chunk(
    cursor: &mut CourseCursor,
    chunk_width: f32,
    diff: f32,
    progress: f32,
    initial_ease: bool,
    rng: &mut impl Rng,
) -> ChunkPlan {
    let start_x = cursor.next_chunk_x;
    let height = 78.0 + int_between(rng, -6, 12) + (diff * 6.0).floor();
    let angle_range = (0.02 + 0.012 * diff) * if initial_ease { 0.5 } else { 0.85 };
    let angle = rng.gen_range(-angle_range..angle_range);
    let target_base_y = cursor.last_surface_y - height / 2.0 + int_between(rng, -6, 4);
    let base_y = raise_to_floor(target_base_y, height);
    let center_x = start_x + chunk_width / 2.0;
    let color = palette::ground(cursor.chunk_index + 1);

    let mut plan = ChunkPlan {
        advance: chunk_width,
        ..default()
    };
    plan.segments.push(SegmentPlan::ground(
        Vec2::new(center_x, base_y),
        chunk_width,
        height,
        angle,
        color,
    ));

    let hazard_chance = if initial_ease {
        0.0
    } else {
        (0.14 + diff * 0.05 + progress * 0.05).clamp(0.0, 0.55)
    };
    // Climbs get narrower hazards and only rarely get one at all.
    let climbing = angle > 0.005;
    let hazard_allowed = chunk_width > 360.0 && (!climbing || rng.gen::<f32>() < 0.35);
    if hazard_allowed && rng.gen::<f32>() < hazard_chance {
        let max_width = if climbing { 180 } else { 240 };
        let hazard_width =
            int_between(rng, 120, max_width) + (diff * if climbing { 10.0 } else { 20.0 }).floor();
        let hazard_height = 38.0;
        let surface_y = base_y + height / 2.0;
        let hazard_center = start_x
            + int_between(
                rng,
                (chunk_width * 0.32).floor() as i32,
                (chunk_width * 0.74).floor() as i32,
            );

        let ramp_width = 120.0;
        let ramp_height = 60.0;
        let ramp_spacing = 10.0;
        let ramp_center = hazard_center - hazard_width / 2.0 - ramp_width / 2.0 - ramp_spacing;
        if climbing && ramp_center > start_x + 48.0 {
            // Small lip just before the hazard; top aligned with the surface.
            plan.segments.push(SegmentPlan::ground(
                Vec2::new(ramp_center, surface_y - ramp_height / 2.0),
                ramp_width,
                ramp_height,
                -0.12,
                color,
            ));
        }

        plan.segments.push(SegmentPlan::hazard(
            Vec2::new(hazard_center, base_y + 2.0),
            hazard_width,
            hazard_height,
        ));
    }

    maybe_plan_soft_sand(
        &mut plan,
        start_x,
        chunk_width,
        base_y,
        height,
        angle,
        diff,
        progress,
        initial_ease,
        rng,
    );
    plan_chunk_decorations(
        &mut plan,
        start_x,
        chunk_width,
        base_y,
        height,
        angle,
        initial_ease,
        rng,
    );

    cursor.next_chunk_x = start_x + chunk_width;
    cursor.chunk_index += 1;
    let exit = exit_surface_y(base_y, height, angle, chunk_width);
    cursor.last_surface_y = exit.max(MIN_SURFACE_Y);
    plan
}

pub(crate) fn plan_kicker_chunk(
    cursor: &mut CourseCursor,
    chunk_width: f32,
    diff: f32,
    progress: f32,
    rng: &mut impl Rng,
) -> ChunkPlan {
    let start_x = cursor.next_chunk_x;
    // The dipping variant carries the hazard: overshoot the ramp and land in it.
    let dips = rng.gen::<f32>() < 0.55;
    let height = 84.0 + int_between(rng, -6, 10) + (diff * 8.0).floor();
    let target_base_y = cursor.last_surface_y - height / 2.0
        + int_between(rng, -6, 4)
        + if dips { -6.0 } else { 4.0 };
    let base_y = raise_to_floor(target_base_y, height);
    let angle_base = if dips { -0.05 } else { 0.04 };
    let angle = angle_base + rng.gen_range(-0.01..0.008) - diff * 0.006;
    let color = palette::ground(cursor.chunk_index + 2);
    let center_x = start_x + chunk_width / 2.0;

    let mut plan = ChunkPlan {
        advance: chunk_width,
        ..default()
    };
    plan.segments.push(SegmentPlan::ground(
        Vec2::new(center_x, base_y),
        chunk_width,
        height,
        angle,
        color,
    ));

    let hazard_chance = (0.18 + diff * 0.06 + progress * 0.08).clamp(0.0, 0.72);
    if dips && rng.gen::<f32>() < hazard_chance {
        let hazard_width = int_between(rng, 110, 200) + (diff * 16.0).floor();
        let hazard_height = 36.0;
        let hazard_center = start_x
            + int_between(
                rng,
                (chunk_width * 0.45).floor() as i32,
                (chunk_width * 0.9).floor() as i32,
            );
        plan.segments.push(SegmentPlan::hazard(
            Vec2::new(hazard_center, base_y + 6.0),
            hazard_width,
            hazard_height,
        ));
    }

    maybe_plan_soft_sand(
        &mut plan, start_x, chunk_width, base_y, height, angle, diff, progress, false, rng,
    );
    plan_chunk_decorations(
        &mut plan, start_x, chunk_width, base_y, height, angle, false, rng,
    );

    cursor.next_chunk_x = start_x + chunk_width;
    cursor.chunk_index += 1;
    let exit = exit_surface_y(base_y, height, angle, chunk_width);
    cursor.last_surface_y = exit.max(MIN_SURFACE_Y);
    plan
}

pub(crate) fn plan_gap_chunk(
    cursor: &mut CourseCursor,
    chunk_width: f32,
    diff: f32,
    rng: &mut impl Rng,
) -> ChunkPlan {
    let start_x = cursor.next_chunk_x;
    let left_width = int_between(rng, 200, 320) + (diff * 16.0).floor();
    let raw_gap = int_between(rng, 70, 120) + (diff * 8.0).floor();
    let max_gap = (chunk_width - left_width - 260.0).max(80.0);
    let gap_width = raw_gap.clamp(70.0, max_gap);
    let right_width = (chunk_width - left_width - gap_width).max(220.0);
    let height = 78.0 + (diff * 6.0).floor();
    let target_base_y = cursor.last_surface_y - height / 2.0 + int_between(rng, -6, 6);
    let base_y = raise_to_floor(target_base_y, height);
    let angle_left = rng.gen_range(-0.012..0.01) - diff * 0.003;
    let angle_right = rng.gen_range(-0.012..0.01) + diff * 0.002;
    let color = palette::ground(cursor.chunk_index + 3);

    let left_center = start_x + left_width / 2.0;
    let right_center = start_x + left_width + gap_width + right_width / 2.0;

    let mut plan = ChunkPlan {
        advance: left_width + gap_width + right_width,
        ..default()
    };
    plan.segments.push(SegmentPlan::ground(
        Vec2::new(left_center, base_y),
        left_width,
        height,
        angle_left,
        color,
    ));
    plan.segments.push(SegmentPlan::ground(
        Vec2::new(right_center, base_y),
        right_width,
        height,
        angle_right,
        color,
    ));

    let hazard_height = 44.0;
    let hazard_y = base_y - 10.0;
    let hazard_center = start_x + left_width + gap_width / 2.0;
    plan.segments.push(SegmentPlan::hazard(
        Vec2::new(hazard_center, hazard_y),
        gap_width,
        hazard_height,
    ));

    let marker = DecorShape::Triangle {
        a: Vec2::new(-12.0, -9.0),
        b: Vec2::new(12.0, -9.0),
        c: Vec2::new(0.0, 9.0),
    };
    plan.decorations.push(DecorationPlan {
        shape: marker.clone(),
        position: Vec2::new(
            left_center + left_width / 2.0 - 16.0,
            base_y + height / 2.0 + 10.0,
        ),
        rotation: 0.0,
        color: palette::marker(),
        alpha: 0.95,
        depth: 5.0,
    });
    plan.decorations.push(DecorationPlan {
        shape: marker,
        position: Vec2::new(
            right_center - right_width / 2.0 + 16.0,
            base_y + height / 2.0 + 10.0,
        ),
        rotation: 0.0,
        color: palette::marker(),
        alpha: 0.95,
        depth: 5.0,
    });
    plan.decorations.push(DecorationPlan {
        shape: DecorShape::Rect {
            size: Vec2::new(gap_width, 6.0),
        },
        position: Vec2::new(hazard_center, hazard_y + hazard_height / 2.0 + 8.0),
        rotation: 0.0,
        color: palette::warn_strip(),
        alpha: 0.9,
        depth: 5.0,
    });

    plan_chunk_decorations(
        &mut plan, start_x, left_width, base_y, height, angle_left, false, rng,
    );
    plan_chunk_decorations(
        &mut plan,
        start_x + left_width + gap_width,
        right_width,
        base_y,
        height,
        angle_right,
        false,
        rng,
    );

    cursor.next_chunk_x = start_x + left_width + gap_width + right_width;
    cursor.chunk_index += 1;
    let exit = exit_surface_y(base_y, height, angle_right, right_width);
    cursor.last_surface_y = exit.max(MIN_SURFACE_Y);
    plan
}

#[allow(clippy::too_many_arguments)]
fn maybe_plan_soft_sand(
    plan: &mut ChunkPlan,
    start_x: f32,
    chunk_width: f32,
    base_y: f32,
    height: f32,
    angle: f32,
    diff: f32,
    progress: f32,
    initial_ease: bool,
    rng: &mut impl Rng,
) {
    let chance = if initial_ease {
        0.08
    } else {
        (0.12 + diff * 0.08 + progress * 0.12).clamp(0.0, 0.55)
    };
    if rng.gen::<f32>() > chance {
        return;
    }

    let sand_width =
        (int_between(rng, 110, 180) + (diff * 16.0).floor()).clamp(90.0, chunk_width * 0.65);
    let margin = 60.0;
    if sand_width > chunk_width - margin * 2.0 {
        return;
    }
    let sand_center = start_x
        + int_between(rng, margin as i32, (chunk_width - margin - sand_width) as i32)
        + sand_width / 2.0;
    let sand_height = 28.0;
    let sand_y = base_y + height / 2.0 - sand_height / 2.0 - 2.0;

    plan.segments.push(SegmentPlan {
        center: Vec2::new(sand_center, sand_y),
        width: sand_width,
        height: sand_height,
        angle: angle * 0.85,
        color: palette::sand(),
        top_color: palette::sand_top(),
        is_hazard: false,
        friction: SAND_FRICTION,
    });
}

#[allow(clippy::too_many_arguments)]
fn plan_chunk_decorations(
    plan: &mut ChunkPlan,
    start_x: f32,
    width: f32,
    base_y: f32,
    height: f32,
    angle: f32,
    initial_ease: bool,
    rng: &mut impl Rng,
) {
    let surface_y = base_y + height / 2.0;
    let decorations = &mut plan.decorations;

    if rng.gen::<f32>() < if initial_ease { 0.6 } else { 0.35 } {
        let tee_x = start_x + (width * 0.08).max(38.0);
        let gap = 28.0;
        decorations.push(circle(tee_x, surface_y + 6.0, 8.0, Color::srgb_u8(0x0e, 0xa5, 0xe9), 0.9, 4.0, angle));
        decorations.push(circle(tee_x + gap, surface_y + 6.0, 8.0, palette::marker(), 0.9, 4.0, angle));
        decorations.push(circle(tee_x + gap * 0.5, surface_y + 10.0, 5.0, Color::srgb_u8(0xf8, 0xfa, 0xfc), 1.0, 5.0, angle));
    }

    let bunker_chance = if initial_ease { 0.25 } else { 0.45 };
    if rng.gen::<f32>() < bunker_chance {
        let bunker_half = Vec2::new(int_between(rng, 120, 180) / 2.0, int_between(rng, 36, 54) / 2.0);
        let bunker_x = start_x
            + int_between(rng, (width * 0.25).floor() as i32, (width * 0.7).floor() as i32);
        let bunker_y = surface_y - int_between(rng, 16, 30);
        decorations.push(DecorationPlan {
            shape: DecorShape::Ellipse { half_size: bunker_half },
            position: Vec2::new(bunker_x, bunker_y),
            rotation: angle,
            color: palette::sand_top(),
            alpha: 0.92,
            depth: 3.0,
        });
    }

    let pin_chance = if initial_ease { 0.25 } else { 0.55 };
    if rng.gen::<f32>() < pin_chance && width > 320.0 {
        let pin_x = start_x + width * rng.gen_range(0.52..0.82);
        decorations.push(circle(pin_x, surface_y + 2.0, 6.0, Color::srgb_u8(0x11, 0x18, 0x27), 0.9, 5.0, angle));
        decorations.push(DecorationPlan {
            shape: DecorShape::Rect {
                size: Vec2::new(4.0, 52.0),
            },
            position: Vec2::new(pin_x, surface_y + 24.0),
            rotation: angle,
            color: Color::srgb_u8(0xf8, 0xfa, 0xfc),
            alpha: 0.95,
            depth: 6.0,
        });
        decorations.push(DecorationPlan {
            shape: DecorShape::Triangle {
                a: Vec2::new(0.0, 9.0),
                b: Vec2::new(22.0, -1.0),
                c: Vec2::new(0.0, -9.0),
            },
            position: Vec2::new(pin_x + 12.0, surface_y + 44.0),
            rotation: angle + 4.0_f32.to_radians(),
            color: Color::srgb_u8(0x10, 0xb9, 0x81),
            alpha: 0.95,
            depth: 7.0,
        });
    }

    plan_decals(decorations, start_x, width, surface_y, angle, initial_ease, rng);
}

fn plan_decals(
    decorations: &mut Vec<DecorationPlan>,
    start_x: f32,
    width: f32,
    surface_y: f32,
    angle: f32,
    initial_ease: bool,
    rng: &mut impl Rng,
) {
    let chance = if initial_ease { 0.35 } else { 0.6 };
    if rng.gen::<f32>() > chance {
        return;
    }

    let count = rng.gen_range(2..=if initial_ease { 4 } else { 7 });
    for _ in 0..count {
        let local_x = rng.gen_range(30.0..(width - 30.0).max(40.0));
        let x = start_x + local_x;
        if rng.gen::<f32>() < 0.55 {
            decorations.push(DecorationPlan {
                shape: DecorShape::Ellipse {
                    half_size: Vec2::new(int_between(rng, 8, 16) / 2.0, int_between(rng, 6, 12) / 2.0),
                },
                position: Vec2::new(x, surface_y + int_between(rng, 2, 6)),
                rotation: angle + rng.gen_range(-0.08..0.08),
                color: Color::srgb_u8(0x1f, 0x29, 0x37),
                alpha: 0.9,
                depth: 5.0,
            });
        } else {
            decorations.push(DecorationPlan {
                shape: DecorShape::Triangle {
                    a: Vec2::new(-6.0, -8.0),
                    b: Vec2::new(6.0, -8.0),
                    c: Vec2::new(0.0, 10.0),
                },
                position: Vec2::new(x, surface_y + int_between(rng, 4, 10)),
                rotation: angle + rng.gen_range(-0.12..0.12),
                color: palette::grass_top(),
                alpha: 0.92,
                depth: 6.0,
            });
        }
    }
}

fn circle(x: f32, y: f32, radius: f32, color: Color, alpha: f32, depth: f32, rotation: f32) -> DecorationPlan {
    DecorationPlan {
        shape: DecorShape::Circle { radius },
        position: Vec2::new(x, y),
        rotation,
        color,
        alpha,
        depth,
    }
}

/// Start-line post and stripe near the spawn point.
pub fn plan_start_line() -> Vec<DecorationPlan> {
    vec![
        DecorationPlan {
            shape: DecorShape::Rect {
                size: Vec2::new(16.0, 160.0),
            },
            position: Vec2::new(120.0, GROUND_Y + 60.0),
            rotation: 0.0,
            color: Color::srgb_u8(0xf8, 0xfa, 0xfc),
            alpha: 0.8,
            depth: 2.0,
        },
        DecorationPlan {
            shape: DecorShape::Rect {
                size: Vec2::new(6.0, 160.0),
            },
            position: Vec2::new(120.0, GROUND_Y + 60.0),
            rotation: 0.0,
            color: Color::srgb_u8(0x0e, 0xa5, 0xe9),
            alpha: 0.95,
            depth: 3.0,
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn seeded(seed: u64) -> ChaCha8Rng {
        ChaCha8Rng::seed_from_u64(seed)
    }

    #[test]
    fn same_seed_produces_identical_chunk_sequences() {
        let mut rng_a = seeded(42);
        let mut rng_b = seeded(42);
        let mut cursor_a = CourseCursor::default();
        let mut cursor_b = CourseCursor::default();

        for _ in 0..20 {
            let plan_a = plan_chunk(&mut cursor_a, false, &mut rng_a);
            let plan_b = plan_chunk(&mut cursor_b, false, &mut rng_b);

            assert_eq!(plan_a.segments.len(), plan_b.segments.len());
            for (seg_a, seg_b) in plan_a.segments.iter().zip(&plan_b.segments) {
                assert_eq!(seg_a.center, seg_b.center);
                assert_eq!(seg_a.width, seg_b.width);
                assert_eq!(seg_a.angle, seg_b.angle);
                assert_eq!(seg_a.is_hazard, seg_b.is_hazard);
            }
        }
        assert_eq!(cursor_a.next_chunk_x, cursor_b.next_chunk_x);
        assert_eq!(cursor_a.last_surface_y, cursor_b.last_surface_y);
    }

    #[test]
    fn cursor_advances_strictly_and_matches_plan_advance() {
        let mut rng = seeded(7);
        let mut cursor = CourseCursor::default();

        for _ in 0..40 {
            let before = cursor.next_chunk_x;
            let index_before = cursor.chunk_index;
            let plan = plan_chunk(&mut cursor, false, &mut rng);

            assert!(plan.advance > 0.0);
            assert_eq!(cursor.next_chunk_x, before + plan.advance);
            assert_eq!(cursor.chunk_index, index_before + 1);
        }
    }

    #[test]
    fn difficulty_ramps_monotonically_and_caps() {
        assert_eq!(difficulty_factor(0, true), 0.6);
        assert_eq!(difficulty_factor(100, true), 0.6);
        assert_eq!(difficulty_factor(0, false), 0.9);

        let mut previous = 0.0;
        for index in 0..80 {
            let diff = difficulty_factor(index, false);
            assert!(diff >= previous);
            assert!(diff <= 3.8);
            previous = diff;
        }
        assert_eq!(difficulty_factor(200, false), 3.8);
    }

    #[test]
    fn ease_chunks_never_contain_hazards() {
        for seed in 0..16 {
            let mut rng = seeded(seed);
            let mut cursor = CourseCursor::default();
            while cursor.next_chunk_x < 3000.0 {
                let plan = plan_chunk(&mut cursor, true, &mut rng);
                assert!(plan.segments.iter().all(|segment| !segment.is_hazard));
            }
        }
    }

    #[test]
    fn surface_floor_holds_over_long_runs() {
        let mut rng = seeded(99);
        let mut cursor = CourseCursor::default();

        for _ in 0..200 {
            let plan = plan_chunk(&mut cursor, false, &mut rng);
            assert!(cursor.last_surface_y >= MIN_SURFACE_Y);
            for segment in plan.segments.iter().filter(|segment| !segment.is_hazard) {
                if segment.friction == GROUND_FRICTION && segment.height > 70.0 {
                    assert!(segment.surface_y() >= MIN_SURFACE_Y - 0.01);
                }
            }
        }
    }

    #[test]
    fn surface_continuity_stays_within_jitter() {
        let mut rng = seeded(3);
        let mut cursor = CourseCursor::default();

        for _ in 0..60 {
            let entry_surface = cursor.last_surface_y;
            let plan = plan_roller_chunk(&mut cursor, 800.0, 1.2, 0.5, false, &mut rng);
            let main = &plan.segments[0];
            let deviation = (main.surface_y() - entry_surface).abs();
            // Jitter is at most 6 px, plus a possible floor-clamp raise.
            assert!(deviation <= 6.01 || main.surface_y() >= MIN_SURFACE_Y);
        }
    }

    #[test]
    fn gap_chunk_fills_void_with_hazard() {
        let mut rng = seeded(11);
        let mut cursor = CourseCursor::default();
        let plan = plan_gap_chunk(&mut cursor, 900.0, 1.5, &mut rng);

        let hazards: Vec<_> = plan.segments.iter().filter(|s| s.is_hazard).collect();
        assert_eq!(hazards.len(), 1);
        let hazard = hazards[0];

        let grounds: Vec<_> = plan.segments.iter().filter(|s| !s.is_hazard).collect();
        assert_eq!(grounds.len(), 2);
        let left = grounds[0];
        let right = grounds[1];

        // Hazard spans exactly the void between the two pieces.
        let gap_start = left.center.x + left.width / 2.0;
        let gap_end = right.center.x - right.width / 2.0;
        assert!((hazard.center.x - (gap_start + gap_end) / 2.0).abs() < 0.5);
        assert!((hazard.width - (gap_end - gap_start)).abs() < 0.5);
        // Hazard surface sits below the ground surface.
        assert!(hazard.surface_y() < left.surface_y());
        assert_eq!(plan.advance, left.width + hazard.width + right.width);
    }

    #[test]
    fn gap_always_leaves_landing_piece() {
        for seed in 0..32 {
            let mut rng = seeded(seed);
            let mut cursor = CourseCursor::default();
            let plan = plan_gap_chunk(&mut cursor, 760.0, 3.8, &mut rng);
            let right = plan
                .segments
                .iter()
                .filter(|s| !s.is_hazard)
                .nth(1)
                .expect("gap chunk has a landing piece");
            assert!(right.width >= 220.0);
        }
    }

    #[test]
    fn soft_sand_stays_inside_chunk() {
        for seed in 0..64 {
            let mut rng = seeded(seed);
            let mut cursor = CourseCursor::default();
            let start_x = cursor.next_chunk_x;
            let plan = plan_roller_chunk(&mut cursor, 700.0, 3.0, 1.0, false, &mut rng);
            for sand in plan
                .segments
                .iter()
                .filter(|s| s.friction == SAND_FRICTION)
            {
                assert!(sand.center.x - sand.width / 2.0 >= start_x);
                assert!(sand.center.x + sand.width / 2.0 <= start_x + 700.0);
                assert!(sand.width <= 700.0 * 0.65 + 0.01);
            }
        }
    }
}
