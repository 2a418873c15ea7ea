//! Axis-separated tile collision.
//!
//! The horizontal pass always runs before the vertical pass. Swapping them
//! changes how corners resolve, so replays depend on this order.

use crate::body::{KinematicBody, Rect};
use crate::error::{Axis, CollisionResolutionError};
use crate::tilemap::TileMap;

/// Re-scan bound per axis pass.
pub const MAX_RESOLVE_ITERATIONS: u32 = 8;
/// Penetration below this depth is treated as touching.
const CONTACT_EPSILON: f32 = 1e-3;
/// How far `refresh_contacts` looks past the body's edges.
const CONTACT_PROBE: f32 = 2.0 * CONTACT_EPSILON;

/// One physics tick for a body whose input has already been applied:
/// gravity, horizontal pass, vertical pass, then velocity from the
/// position delta.
pub fn tick_body(
    body: &mut KinematicBody,
    map: &TileMap,
    tile_size: f32,
) -> Result<(), CollisionResolutionError> {
    body.begin_tick();
    body.apply_gravity();
    resolve(body, map, tile_size)?;
    body.finish_tick();
    Ok(())
}

/// Horizontal then vertical resolution.
pub fn resolve(
    body: &mut KinematicBody,
    map: &TileMap,
    tile_size: f32,
) -> Result<(), CollisionResolutionError> {
    resolve_horizontal(body, map, tile_size)?;
    resolve_vertical(body, map, tile_size)
}

/// Displace by `vx` and push out of solid tiles along x.
pub fn resolve_horizontal(
    body: &mut KinematicBody,
    map: &TileMap,
    tile_size: f32,
) -> Result<(), CollisionResolutionError> {
    let mut rect = body.collision_rect();
    rect.x += body.velocity.x;
    let push = sweep(&mut rect, map, tile_size, Axis::Horizontal, body.velocity.x)?;

    body.set_collision_x(rect.x);
    body.contacts.on_left = push == Some(Push::Positive);
    body.contacts.on_right = push == Some(Push::Negative);
    if push.is_some() {
        body.velocity.x = 0.0;
    }
    Ok(())
}

/// Displace by `vy` and push out of solid tiles along y.
pub fn resolve_vertical(
    body: &mut KinematicBody,
    map: &TileMap,
    tile_size: f32,
) -> Result<(), CollisionResolutionError> {
    let mut rect = body.collision_rect();
    rect.y += body.velocity.y;
    let push = sweep(&mut rect, map, tile_size, Axis::Vertical, body.velocity.y)?;

    body.set_collision_y(rect.y);
    // Pushed up means the floor is below us.
    body.contacts.on_ground = push == Some(Push::Negative);
    body.contacts.on_ceiling = push == Some(Push::Positive);
    if push.is_some() {
        body.velocity.y = 0.0;
    }
    Ok(())
}

/// Set `on_ground`/`on_ceiling` from what the body is touching right now,
/// without moving it. Used after placing a body so that one standing on a
/// floor starts out grounded. Horizontal flags are cleared.
pub fn refresh_contacts(body: &mut KinematicBody, map: &TileMap, tile_size: f32) {
    let rect = body.collision_rect();
    let touching = |dy: f32| {
        let probe = Rect {
            y: rect.y + dy,
            ..rect
        };
        overlapping_cells(&probe, tile_size).any(|(col, row)| map.is_solid(col, row))
    };
    let below = touching(CONTACT_PROBE);
    body.contacts.on_ground = below;
    body.contacts.on_ceiling = !below && touching(-CONTACT_PROBE);
    body.contacts.on_left = false;
    body.contacts.on_right = false;
}

/// Direction a pass pushed the rectangle along its axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Push {
    /// Toward smaller coordinates (left / up).
    Negative,
    /// Toward larger coordinates (right / down).
    Positive,
}

/// Push `rect` out of every overlapping solid tile along `axis`.
///
/// The push direction opposes `velocity`; with zero velocity it is taken
/// from the first minimum-penetration choice and then held for the rest of
/// the pass. Returns the direction used, or `None` if nothing overlapped.
fn sweep(
    rect: &mut Rect,
    map: &TileMap,
    tile_size: f32,
    axis: Axis,
    velocity: f32,
) -> Result<Option<Push>, CollisionResolutionError> {
    let mut push = if velocity > 0.0 {
        Some(Push::Negative)
    } else if velocity < 0.0 {
        Some(Push::Positive)
    } else {
        None
    };
    let mut collided = false;

    for iteration in 0..=MAX_RESOLVE_ITERATIONS {
        let Some((dir, target)) = smallest_correction(rect, map, tile_size, axis, push) else {
            return Ok(if collided { push } else { None });
        };
        if iteration == MAX_RESOLVE_ITERATIONS {
            break;
        }
        match axis {
            Axis::Horizontal => rect.x = target,
            Axis::Vertical => rect.y = target,
        }
        push = Some(dir);
        collided = true;
    }

    Err(CollisionResolutionError {
        axis,
        iterations: MAX_RESOLVE_ITERATIONS,
    })
}

/// Among solid tiles overlapping `rect`, the one needing the smallest
/// correction. Returns the push direction and the new rectangle origin on
/// `axis`. Ties keep the first tile in row-major order.
fn smallest_correction(
    rect: &Rect,
    map: &TileMap,
    tile_size: f32,
    axis: Axis,
    push: Option<Push>,
) -> Option<(Push, f32)> {
    let mut best: Option<(f32, Push, f32)> = None;
    for (col, row) in overlapping_cells(rect, tile_size) {
        if !map.is_solid(col, row) {
            continue;
        }
        let tile = tile_rect(col, row, tile_size);
        let (pos, size, tile_min, tile_max) = match axis {
            Axis::Horizontal => (rect.x, rect.w, tile.x, tile.right()),
            Axis::Vertical => (rect.y, rect.h, tile.y, tile.bottom()),
        };
        let negative = (Push::Negative, tile_min - size, pos + size - tile_min);
        let positive = (Push::Positive, tile_max, tile_max - pos);
        let (dir, target, depth) = match push {
            Some(Push::Negative) => negative,
            Some(Push::Positive) => positive,
            None if positive.2 < negative.2 => positive,
            None => negative,
        };

        if best.is_none_or(|(d, _, _)| depth < d) {
            best = Some((depth, dir, target));
        }
    }
    best.map(|(_, dir, target)| (dir, target))
}

/// Pixel rectangle covered by the tile at `(col, row)`.
pub fn tile_rect(col: i32, row: i32, tile_size: f32) -> Rect {
    Rect {
        x: col as f32 * tile_size,
        y: row as f32 * tile_size,
        w: tile_size,
        h: tile_size,
    }
}

/// Cells whose tile `rect` actually penetrates, row-major. Cells that only
/// share an edge with `rect` are excluded.
pub fn overlapping_cells(rect: &Rect, tile_size: f32) -> impl Iterator<Item = (i32, i32)> + '_ {
    let min_col = (rect.x / tile_size).floor() as i32;
    let max_col = (rect.right() / tile_size).floor() as i32;
    let min_row = (rect.y / tile_size).floor() as i32;
    let max_row = (rect.bottom() / tile_size).floor() as i32;
    (min_row..=max_row)
        .flat_map(move |row| (min_col..=max_col).map(move |col| (col, row)))
        .filter(move |&(col, row)| penetrates(rect, &tile_rect(col, row, tile_size)))
}

fn penetrates(a: &Rect, b: &Rect) -> bool {
    a.x < b.right() - CONTACT_EPSILON
        && b.x < a.right() - CONTACT_EPSILON
        && a.y < b.bottom() - CONTACT_EPSILON
        && b.y < a.bottom() - CONTACT_EPSILON
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::Vec2;
    use crate::config::PhysicsConfig;
    use crate::tilemap::TileCodeTable;

    const TS: f32 = 64.0;

    /// Parse a picture of the map: `#` solid, anything else empty.
    fn map_from(picture: &[&str]) -> TileMap {
        let rows = picture
            .iter()
            .map(|line| {
                line.chars()
                    .map(|c| if c == '#' { 0 } else { -1 })
                    .collect()
            })
            .collect();
        TileMap::from_rows(rows, &TileCodeTable::default()).unwrap()
    }

    fn body_at(x: f32, y: f32) -> KinematicBody {
        KinematicBody::new(Vec2::new(x, y), &PhysicsConfig::default())
    }

    fn flat_floor() -> TileMap {
        map_from(&[
            "..........",
            "..........",
            "..........",
            "..........",
            "..........",
            "##########",
        ])
    }

    #[test]
    fn falls_onto_row_one_floor_in_one_tick() {
        // Rows 1..3 solid, feet resting at y = tile size.
        let map = map_from(&["....", "####", "####", "####"]);
        let mut body = body_at(0.0, TS - 56.0);

        body.begin_tick();
        body.apply_gravity();
        assert_eq!(body.velocity.y, 0.8);
        resolve(&mut body, &map, TS).unwrap();
        body.finish_tick();

        assert!(body.contacts.on_ground);
        assert!(!body.contacts.on_ceiling);
        assert_eq!(body.velocity.y, 0.0);
        assert_eq!(body.collision_rect().bottom(), TS);
    }

    #[test]
    fn lands_and_stops_on_flat_floor() {
        let map = flat_floor();
        let mut body = body_at(100.0, 0.0);
        let mut ticks = 0;
        while !body.contacts.on_ground {
            tick_body(&mut body, &map, TS).unwrap();
            ticks += 1;
            assert!(ticks < 100, "never landed");
        }
        assert_eq!(body.velocity.y, 0.0);
        assert_eq!(body.collision_rect().bottom(), 5.0 * TS);

        // Stays put while idle
        for _ in 0..10 {
            tick_body(&mut body, &map, TS).unwrap();
            assert!(body.contacts.on_ground);
            assert_eq!(body.collision_rect().bottom(), 5.0 * TS);
        }
    }

    #[test]
    fn wall_on_right_blocks_and_flags() {
        let map = map_from(&["....#", "....#", "#####"]);
        // Standing on row 2, two pixels left of the wall at x = 256.
        let mut body = body_at(256.0 - 50.0 - 2.0, 2.0 * TS - 56.0);
        body.contacts.on_ground = true;
        body.set_horizontal_intent(1);
        tick_body(&mut body, &map, TS).unwrap();

        assert!(body.contacts.on_right);
        assert!(!body.contacts.on_left);
        assert_eq!(body.collision_rect().right(), 256.0);
        assert_eq!(body.velocity.x, 2.0);
        assert!(body.contacts.on_ground);
    }

    #[test]
    fn wall_on_left_blocks_and_flags() {
        let map = map_from(&["#....", "#....", "#####"]);
        let mut body = body_at(TS + 3.0, 2.0 * TS - 56.0);
        body.set_horizontal_intent(-1);
        tick_body(&mut body, &map, TS).unwrap();

        assert!(body.contacts.on_left);
        assert!(!body.contacts.on_right);
        assert_eq!(body.collision_rect().x, TS);
    }

    #[test]
    fn ceiling_stops_upward_motion() {
        let map = map_from(&["#####", ".....", ".....", "#####"]);
        // Head 5 px below the ceiling row, moving up fast.
        let mut body = body_at(10.0, TS + 5.0);
        body.velocity.y = -16.0;
        body.begin_tick();
        resolve(&mut body, &map, TS).unwrap();

        assert!(body.contacts.on_ceiling);
        assert!(!body.contacts.on_ground);
        assert_eq!(body.velocity.y, 0.0);
        assert_eq!(body.collision_rect().y, TS);
    }

    #[test]
    fn ceiling_contact_releases_on_next_tick() {
        let map = map_from(&["#####", ".....", ".....", "#####"]);
        let mut body = body_at(10.0, TS + 5.0);
        body.velocity.y = -16.0;
        tick_body(&mut body, &map, TS).unwrap();
        assert!(body.contacts.on_ceiling);
        assert_eq!(body.velocity.y, 0.0);
        assert_eq!(body.collision_rect().y, TS);

        tick_body(&mut body, &map, TS).unwrap();
        assert!(!body.contacts.on_ceiling);
        assert!(body.collision_rect().y > TS);
    }

    #[test]
    fn refresh_contacts_detects_resting_floor() {
        let map = flat_floor();
        let mut body = body_at(100.0, 5.0 * TS - 56.0);
        body.contacts.on_left = true;
        refresh_contacts(&mut body, &map, TS);
        assert!(body.contacts.on_ground);
        assert!(!body.contacts.on_ceiling);
        assert!(!body.contacts.on_left);
        assert_eq!(body.position, Vec2::new(100.0, 5.0 * TS - 56.0));

        let mut floating = body_at(100.0, 5.0 * TS - 60.0);
        refresh_contacts(&mut floating, &map, TS);
        assert!(!floating.contacts.on_ground);
    }

    #[test]
    fn refresh_contacts_detects_ceiling() {
        let map = map_from(&["#####", ".....", ".....", "#####"]);
        let mut body = body_at(10.0, TS);
        refresh_contacts(&mut body, &map, TS);
        assert!(body.contacts.on_ceiling);
        assert!(!body.contacts.on_ground);
    }

    #[test]
    fn no_collision_clears_flags() {
        let map = flat_floor();
        let mut body = body_at(10.0, 10.0);
        body.contacts = crate::body::Contacts {
            on_ground: true,
            on_ceiling: true,
            on_left: true,
            on_right: true,
        };
        resolve(&mut body, &map, TS).unwrap();
        assert_eq!(body.contacts, crate::body::Contacts::default());
    }

    #[test]
    fn zero_velocity_overlap_uses_min_penetration() {
        // Body sunk 10 px into the floor with no vertical velocity is
        // lifted out, not pushed through.
        let map = flat_floor();
        let mut body = body_at(10.0, 5.0 * TS - 56.0 + 10.0);
        resolve_vertical(&mut body, &map, TS).unwrap();
        assert!(body.contacts.on_ground);
        assert_eq!(body.collision_rect().bottom(), 5.0 * TS);
    }

    #[test]
    fn corner_resolves_horizontal_first() {
        // Falling right into an inside corner: the wall stops x before the
        // floor stops y, so x is clamped against the wall column.
        let map = map_from(&["...#", "...#", "####"]);
        let mut body = body_at(3.0 * TS - 50.0 - 4.0, 2.0 * TS - 56.0 - 2.0);
        body.velocity = Vec2::new(8.0, 6.0);
        resolve(&mut body, &map, TS).unwrap();
        assert_eq!(body.collision_rect().right(), 3.0 * TS);
        assert_eq!(body.collision_rect().bottom(), 2.0 * TS);
        assert!(body.contacts.on_right);
        assert!(body.contacts.on_ground);
    }

    #[test]
    fn embedded_body_exceeds_iteration_bound() {
        // A solid column taller than the bound can push through.
        let picture: Vec<&str> = std::iter::repeat_n("#", 20).collect();
        let map = map_from(&picture);
        let mut body = body_at(0.0, 10.0 * TS);
        body.velocity.y = 1.0;
        let before = body.clone();
        let err = resolve_vertical(&mut body, &map, TS).unwrap_err();
        assert_eq!(err.axis, Axis::Vertical);
        assert_eq!(err.iterations, MAX_RESOLVE_ITERATIONS);
        assert_eq!(body, before, "failed pass must not move the body");
    }

    #[test]
    fn overlapping_cells_skip_edge_contact() {
        let rect = Rect {
            x: 64.0,
            y: 8.0,
            w: 50.0,
            h: 56.0,
        };
        let cells: Vec<_> = overlapping_cells(&rect, TS).collect();
        assert_eq!(cells, vec![(1, 0)]);

        let rect = Rect { x: 40.0, ..rect };
        let cells: Vec<_> = overlapping_cells(&rect, TS).collect();
        assert_eq!(cells, vec![(0, 0), (1, 0)]);
    }

    #[test]
    fn out_of_bounds_is_open_space() {
        let map = map_from(&["##", "##"]);
        let mut body = body_at(-500.0, -500.0);
        body.velocity = Vec2::new(-8.0, 20.0);
        resolve(&mut body, &map, TS).unwrap();
        assert_eq!(body.position, Vec2::new(-508.0, -480.0));
        assert_eq!(body.contacts, crate::body::Contacts::default());
    }

    // ================================================================
    // Property-based tests (proptest)
    // ================================================================

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn random_map() -> impl Strategy<Value = TileMap> {
            proptest::collection::vec(proptest::collection::vec(any::<bool>(), 12), 8).prop_map(
                |cells| {
                    let rows = cells
                        .into_iter()
                        .map(|r| r.into_iter().map(|s| if s { 0 } else { -1 }).collect())
                        .collect();
                    TileMap::from_rows(rows, &TileCodeTable::default()).unwrap()
                },
            )
        }

        proptest! {
            #[test]
            fn horizontal_pass_never_moves_y(
                map in random_map(),
                x in -64.0f32..800.0,
                y in -64.0f32..520.0,
                vx in -8.0f32..=8.0,
            ) {
                let mut body = body_at(x, y);
                body.velocity.x = vx;
                let y_before = body.position.y;
                if resolve_horizontal(&mut body, &map, TS).is_ok() {
                    prop_assert_eq!(body.position.y, y_before);
                }
            }

            #[test]
            fn vertical_pass_never_moves_x(
                map in random_map(),
                x in -64.0f32..800.0,
                y in -64.0f32..520.0,
                vy in -16.0f32..=20.0,
            ) {
                let mut body = body_at(x, y);
                body.velocity.y = vy;
                let x_before = body.position.x;
                if resolve_vertical(&mut body, &map, TS).is_ok() {
                    prop_assert_eq!(body.position.x, x_before);
                }
            }

            #[test]
            fn ground_and_ceiling_exclusive(
                map in random_map(),
                x in -64.0f32..800.0,
                y in -64.0f32..520.0,
                moves in proptest::collection::vec((-1i8..=1, any::<bool>()), 1..40),
            ) {
                let mut body = body_at(x, y);
                for (dir, jump) in moves {
                    body.set_horizontal_intent(dir);
                    if jump {
                        let _ = body.jump();
                    }
                    let snapshot = body.clone();
                    if tick_body(&mut body, &map, TS).is_err() {
                        body = snapshot;
                    }
                    prop_assert!(!(body.contacts.on_ground && body.contacts.on_ceiling));
                    prop_assert!(body.position.x.is_finite() && body.position.y.is_finite());
                }
            }

            #[test]
            fn body_above_flat_floor_settles(
                x in 0.0f32..500.0,
                y in 0.0f32..(5.0 * 64.0 - 57.0),
            ) {
                let map = flat_floor();
                let mut body = body_at(x, y);
                let mut settled = false;
                for _ in 0..60 {
                    tick_body(&mut body, &map, TS).unwrap();
                    if body.contacts.on_ground {
                        settled = true;
                        break;
                    }
                }
                prop_assert!(settled, "body at y={} never landed", y);
                prop_assert_eq!(body.velocity.y, 0.0);
                prop_assert_eq!(body.collision_rect().bottom(), 5.0 * TS);
            }
        }
    }
}
