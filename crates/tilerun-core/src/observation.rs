use serde::{Deserialize, Serialize};

/// Dimensions of an observation tensor (rows × cols × channels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservationShape {
    pub rows: usize,
    pub cols: usize,
    pub channels: usize,
}

impl ObservationShape {
    pub fn len(&self) -> usize {
        self.rows * self.cols * self.channels
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dense row-major occupancy grid handed to a policy.
///
/// Values are stored as `data[(row * cols + col) * channels + channel]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationGrid {
    pub shape: ObservationShape,
    pub data: Vec<f32>,
}

impl ObservationGrid {
    /// All-zero grid of the given shape.
    pub fn zeros(shape: ObservationShape) -> Self {
        Self {
            shape,
            data: vec![0.0; shape.len()],
        }
    }

    pub fn get(&self, row: usize, col: usize, channel: usize) -> Option<f32> {
        let ObservationShape {
            rows,
            cols,
            channels,
        } = self.shape;
        if row >= rows || col >= cols || channel >= channels {
            return None;
        }
        self.data.get((row * cols + col) * channels + channel).copied()
    }

    pub fn set(&mut self, row: usize, col: usize, channel: usize, value: f32) {
        let ObservationShape {
            rows,
            cols,
            channels,
        } = self.shape;
        if row < rows && col < cols && channel < channels {
            self.data[(row * cols + col) * channels + channel] = value;
        }
    }

    /// Debug view: `#` for occupied cells, `.` for open cells and `P` at
    /// `marker` (row, col). Only channel 0 is shown.
    pub fn render_ascii(&self, marker: Option<(usize, usize)>) -> String {
        let mut out = String::with_capacity(self.shape.rows * (self.shape.cols * 2 + 1));
        for row in 0..self.shape.rows {
            for col in 0..self.shape.cols {
                if col > 0 {
                    out.push(' ');
                }
                let c = if marker == Some((row, col)) {
                    'P'
                } else if self.get(row, col, 0).unwrap_or(0.0) > 0.5 {
                    '#'
                } else {
                    '.'
                };
                out.push(c);
            }
            out.push('\n');
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shape() -> ObservationShape {
        ObservationShape {
            rows: 3,
            cols: 2,
            channels: 1,
        }
    }

    #[test]
    fn zeros_has_shape_len() {
        let grid = ObservationGrid::zeros(shape());
        assert_eq!(grid.data.len(), 6);
        assert!(grid.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn set_and_get_row_major() {
        let mut grid = ObservationGrid::zeros(shape());
        grid.set(2, 1, 0, 1.0);
        assert_eq!(grid.get(2, 1, 0), Some(1.0));
        assert_eq!(grid.data[5], 1.0);
        assert_eq!(grid.get(3, 0, 0), None);
    }

    #[test]
    fn out_of_range_set_ignored() {
        let mut grid = ObservationGrid::zeros(shape());
        grid.set(9, 9, 0, 1.0);
        assert!(grid.data.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn ascii_marks_player_and_solids() {
        let mut grid = ObservationGrid::zeros(shape());
        grid.set(1, 1, 0, 1.0);
        let text = grid.render_ascii(Some((0, 0)));
        assert_eq!(text, "P .\n. #\n. .\n");
    }
}
