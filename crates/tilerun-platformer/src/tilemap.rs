use serde::{Deserialize, Serialize};

use crate::error::LevelError;

/// Semantic class of a tile code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileClass {
    #[default]
    Empty,
    Solid,
    Hazard,
    Start,
    Goal,
    Coin,
}

/// Code → class membership table.
///
/// Codes listed under several classes resolve in the order goal, start,
/// hazard, coin, solid. Unlisted codes are empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TileCodeTable {
    pub solid: Vec<i32>,
    pub hazard: Vec<i32>,
    pub start: Vec<i32>,
    pub goal: Vec<i32>,
    pub coin: Vec<i32>,
}

impl Default for TileCodeTable {
    fn default() -> Self {
        Self {
            solid: (0..=15).collect(),
            hazard: vec![16, 17],
            start: vec![20],
            goal: vec![21],
            coin: vec![30],
        }
    }
}

impl TileCodeTable {
    pub fn classify(&self, code: i32) -> TileClass {
        if self.goal.contains(&code) {
            TileClass::Goal
        } else if self.start.contains(&code) {
            TileClass::Start
        } else if self.hazard.contains(&code) {
            TileClass::Hazard
        } else if self.coin.contains(&code) {
            TileClass::Coin
        } else if self.solid.contains(&code) {
            TileClass::Solid
        } else {
            TileClass::Empty
        }
    }

    /// A code of the given class, used when writing generated levels.
    pub fn code_for(&self, class: TileClass) -> i32 {
        let list = match class {
            TileClass::Empty => return -1,
            TileClass::Solid => &self.solid,
            TileClass::Hazard => &self.hazard,
            TileClass::Start => &self.start,
            TileClass::Goal => &self.goal,
            TileClass::Coin => &self.coin,
        };
        list.iter()
            .copied()
            .find(|&code| self.classify(code) == class)
            .unwrap_or(-1)
    }
}

/// Static tile grid for one episode.
///
/// Row 0 is the top of the world. Classes are resolved once at load so
/// per-tick queries are plain indexing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TileMap {
    width: usize,
    height: usize,
    /// Raw codes stored row-major (row * width + col).
    codes: Vec<i32>,
    classes: Vec<TileClass>,
}

impl TileMap {
    /// Parse comma-separated integer rows, one per line. Blank lines are
    /// skipped; whitespace around tokens is ignored.
    pub fn parse(text: &str, table: &TileCodeTable) -> Result<Self, LevelError> {
        let mut rows = Vec::new();
        let mut width = None;
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let row = line
                .split(',')
                .map(|tok| {
                    let tok = tok.trim();
                    tok.parse::<i32>().map_err(|_| LevelError::Malformed {
                        line: idx + 1,
                        reason: format!("non-integer token {tok:?}"),
                    })
                })
                .collect::<Result<Vec<i32>, _>>()?;
            match width {
                None => width = Some(row.len()),
                Some(w) if w != row.len() => {
                    return Err(LevelError::Malformed {
                        line: idx + 1,
                        reason: format!("expected {w} columns, found {}", row.len()),
                    });
                },
                Some(_) => {},
            }
            rows.push(row);
        }
        Self::from_rows(rows, table)
    }

    /// Build from already-split rows. Rows must be non-empty and of equal
    /// length.
    pub fn from_rows(rows: Vec<Vec<i32>>, table: &TileCodeTable) -> Result<Self, LevelError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if height == 0 || width == 0 {
            return Err(LevelError::Malformed {
                line: 1,
                reason: "level has no tiles".to_string(),
            });
        }
        if let Some(bad) = rows.iter().position(|r| r.len() != width) {
            return Err(LevelError::Malformed {
                line: bad + 1,
                reason: format!("expected {width} columns, found {}", rows[bad].len()),
            });
        }
        let codes: Vec<i32> = rows.into_iter().flatten().collect();
        let classes = codes.iter().map(|&c| table.classify(c)).collect();
        Ok(Self {
            width,
            height,
            codes,
            classes,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn pixel_width(&self, tile_size: f32) -> f32 {
        self.width as f32 * tile_size
    }

    pub fn pixel_height(&self, tile_size: f32) -> f32 {
        self.height as f32 * tile_size
    }

    fn index(&self, col: i32, row: i32) -> Option<usize> {
        if col < 0 || row < 0 || col as usize >= self.width || row as usize >= self.height {
            return None;
        }
        Some(row as usize * self.width + col as usize)
    }

    /// Raw code, `None` out of bounds.
    pub fn code(&self, col: i32, row: i32) -> Option<i32> {
        self.index(col, row).map(|i| self.codes[i])
    }

    /// Out-of-bounds cells classify as empty.
    pub fn classify(&self, col: i32, row: i32) -> TileClass {
        self.index(col, row)
            .map_or(TileClass::Empty, |i| self.classes[i])
    }

    pub fn is_solid(&self, col: i32, row: i32) -> bool {
        self.classify(col, row) == TileClass::Solid
    }

    /// Locate the single tile of `class`, scanning row-major.
    pub fn find_marker(&self, class: TileClass) -> Result<(i32, i32), LevelError> {
        let mut found = self
            .classes
            .iter()
            .enumerate()
            .filter(|&(_, &c)| c == class)
            .map(|(i, _)| ((i % self.width) as i32, (i / self.width) as i32));
        let first = found.next().ok_or(LevelError::MissingMarker(class))?;
        if let Some(second) = found.next() {
            return Err(LevelError::DuplicateMarker {
                class,
                first,
                second,
            });
        }
        Ok(first)
    }

    /// Every cell of `class`, row-major.
    pub fn cells_of(&self, class: TileClass) -> impl Iterator<Item = (i32, i32)> + '_ {
        let width = self.width;
        self.classes
            .iter()
            .enumerate()
            .filter(move |&(_, &c)| c == class)
            .map(move |(i, _)| ((i % width) as i32, (i / width) as i32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> TileCodeTable {
        TileCodeTable::default()
    }

    #[test]
    fn parse_simple_grid() {
        let map = TileMap::parse("-1,-1,-1\n20,-1,21\n0,0,0\n", &table()).unwrap();
        assert_eq!(map.width(), 3);
        assert_eq!(map.height(), 3);
        assert_eq!(map.code(2, 1), Some(21));
        assert_eq!(map.classify(0, 1), TileClass::Start);
        assert!(map.is_solid(1, 2));
        assert!(!map.is_solid(1, 0));
    }

    #[test]
    fn parse_tolerates_whitespace_and_blank_lines() {
        let map = TileMap::parse("\n 0 , -1 \r\n\n-1, 0\n\n", &table()).unwrap();
        assert_eq!(map.height(), 2);
        assert!(map.is_solid(0, 0));
        assert!(map.is_solid(1, 1));
    }

    #[test]
    fn ragged_rows_rejected() {
        let err = TileMap::parse("0,0,0\n0,0\n", &table()).unwrap_err();
        match err {
            LevelError::Malformed { line, .. } => assert_eq!(line, 2),
            other => panic!("expected Malformed, got {other:?}"),
        }
    }

    #[test]
    fn non_integer_token_rejected() {
        let err = TileMap::parse("0,x,0\n", &table()).unwrap_err();
        assert!(matches!(err, LevelError::Malformed { line: 1, .. }));
    }

    #[test]
    fn empty_level_rejected() {
        assert!(matches!(
            TileMap::parse("\n\n", &table()),
            Err(LevelError::Malformed { .. })
        ));
    }

    #[test]
    fn out_of_bounds_is_empty_and_non_solid() {
        let map = TileMap::parse("0,0\n0,0\n", &table()).unwrap();
        for (c, r) in [(-1, 0), (0, -1), (2, 0), (0, 2), (i32::MIN, i32::MAX)] {
            assert!(!map.is_solid(c, r));
            assert_eq!(map.classify(c, r), TileClass::Empty);
            assert_eq!(map.code(c, r), None);
        }
    }

    #[test]
    fn unknown_code_classifies_as_empty() {
        let map = TileMap::parse("999,-5\n", &table()).unwrap();
        assert_eq!(map.classify(0, 0), TileClass::Empty);
        assert_eq!(map.classify(1, 0), TileClass::Empty);
    }

    #[test]
    fn find_marker_unique() {
        let map = TileMap::parse("-1,21\n20,0\n", &table()).unwrap();
        assert_eq!(map.find_marker(TileClass::Start).unwrap(), (0, 1));
        assert_eq!(map.find_marker(TileClass::Goal).unwrap(), (1, 0));
    }

    #[test]
    fn find_marker_missing() {
        let map = TileMap::parse("0,0\n", &table()).unwrap();
        assert!(matches!(
            map.find_marker(TileClass::Goal),
            Err(LevelError::MissingMarker(TileClass::Goal))
        ));
    }

    #[test]
    fn find_marker_duplicate_reports_both() {
        let map = TileMap::parse("20,-1\n-1,20\n", &table()).unwrap();
        match map.find_marker(TileClass::Start) {
            Err(LevelError::DuplicateMarker { first, second, .. }) => {
                assert_eq!(first, (0, 0));
                assert_eq!(second, (1, 1));
            },
            other => panic!("expected DuplicateMarker, got {other:?}"),
        }
    }

    #[test]
    fn overlapping_lists_follow_precedence() {
        let table = TileCodeTable {
            solid: vec![1, 2],
            goal: vec![2],
            ..TileCodeTable::default()
        };
        assert_eq!(table.classify(2), TileClass::Goal);
        assert_eq!(table.classify(1), TileClass::Solid);
        assert_eq!(table.code_for(TileClass::Solid), 1);
    }

    #[test]
    fn cells_of_lists_coins() {
        let map = TileMap::parse("30,-1,30\n0,0,0\n", &table()).unwrap();
        let coins: Vec<_> = map.cells_of(TileClass::Coin).collect();
        assert_eq!(coins, vec![(0, 0), (2, 0)]);
    }
}
