use tilerun_core::{ObservationGrid, ObservationShape};

use crate::body::Vec2;
use crate::config::WindowSpec;
use crate::tilemap::TileMap;

/// Grid cell containing `position`: `floor(position / tile_size)`.
pub fn center_cell(position: Vec2, tile_size: f32) -> (i32, i32) {
    (
        (position.x / tile_size).floor() as i32,
        (position.y / tile_size).floor() as i32,
    )
}

pub fn window_shape(window: &WindowSpec) -> ObservationShape {
    ObservationShape {
        rows: window.rows(),
        cols: window.cols(),
        channels: 1,
    }
}

/// Binary occupancy of the tiles around `(center_col, center_row)`.
///
/// Solid tiles read 1.0; everything else, including cells beyond the map
/// edge, reads 0.0.
pub fn extract(
    map: &TileMap,
    center_col: i32,
    center_row: i32,
    window: &WindowSpec,
) -> ObservationGrid {
    let mut grid = ObservationGrid::zeros(window_shape(window));
    let rows = window.rows();
    let top = center_row - window.rows_above as i32;
    let left = center_col - window.cols_left as i32;

    for r in 0..rows {
        let map_row = top + r as i32;
        let out_row = if window.flip_vertical { rows - 1 - r } else { r };
        for c in 0..window.cols() {
            if map.is_solid(left + c as i32, map_row) {
                grid.set(out_row, c, 0, 1.0);
            }
        }
    }
    grid
}

/// Output (row, col) of the centre cell, for debug rendering.
pub fn center_index(window: &WindowSpec) -> (usize, usize) {
    let row = if window.flip_vertical {
        window.rows_below
    } else {
        window.rows_above
    };
    (row, window.cols_left)
}
