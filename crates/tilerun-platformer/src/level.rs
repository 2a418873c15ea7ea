use std::collections::HashMap;
use std::path::PathBuf;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use tilerun_core::LevelId;

use crate::error::LevelError;
use crate::tilemap::{TileClass, TileCodeTable, TileMap};

/// Resolves a level identifier to a tile map.
pub trait LevelSource: Send + Sync {
    /// Load the map for `id`. Sources that do not know `id` return
    /// [`LevelError::UnknownLevel`].
    fn load_map(&self, id: &LevelId, table: &TileCodeTable) -> Result<TileMap, LevelError>;
}

/// Levels on disk at `<root>/<id>/level_<id>_terrain.csv`.
#[derive(Debug, Clone)]
pub struct DirLevelSource {
    root: PathBuf,
}

impl DirLevelSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn terrain_path(&self, id: &LevelId) -> PathBuf {
        self.root
            .join(id.as_str())
            .join(format!("level_{id}_terrain.csv"))
    }
}

impl LevelSource for DirLevelSource {
    fn load_map(&self, id: &LevelId, table: &TileCodeTable) -> Result<TileMap, LevelError> {
        let path = self.terrain_path(id);
        let text = std::fs::read_to_string(&path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                LevelError::UnknownLevel(id.to_string())
            } else {
                LevelError::Io {
                    path: path.display().to_string(),
                    source,
                }
            }
        })?;
        TileMap::parse(&text, table)
    }
}

/// In-memory level text keyed by id.
#[derive(Debug, Clone, Default)]
pub struct StaticLevels {
    levels: HashMap<LevelId, String>,
}

impl StaticLevels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_level(mut self, id: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(id, text);
        self
    }

    pub fn insert(&mut self, id: impl Into<String>, text: impl Into<String>) {
        self.levels.insert(LevelId::new(id), text.into());
    }
}

impl LevelSource for StaticLevels {
    fn load_map(&self, id: &LevelId, table: &TileCodeTable) -> Result<TileMap, LevelError> {
        let text = self
            .levels
            .get(id)
            .ok_or_else(|| LevelError::UnknownLevel(id.to_string()))?;
        TileMap::parse(text, table)
    }
}

/// Tries each source in order; the first one that knows the id wins.
#[derive(Default)]
pub struct ChainedLevels {
    sources: Vec<Box<dyn LevelSource>>,
}

impl ChainedLevels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, source: impl LevelSource + 'static) -> Self {
        self.sources.push(Box::new(source));
        self
    }
}

impl LevelSource for ChainedLevels {
    fn load_map(&self, id: &LevelId, table: &TileCodeTable) -> Result<TileMap, LevelError> {
        for source in &self.sources {
            match source.load_map(id, table) {
                Err(LevelError::UnknownLevel(_)) => continue,
                other => return other,
            }
        }
        Err(LevelError::UnknownLevel(id.to_string()))
    }
}

/// A loaded level: its map plus the validated start and goal cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Level {
    pub id: LevelId,
    pub map: TileMap,
    pub start: (i32, i32),
    pub goal: (i32, i32),
}

impl Level {
    pub fn load(
        source: &dyn LevelSource,
        id: &LevelId,
        table: &TileCodeTable,
    ) -> Result<Self, LevelError> {
        let map = source.load_map(id, table)?;
        Self::from_map(id.clone(), map)
    }

    pub fn from_map(id: LevelId, map: TileMap) -> Result<Self, LevelError> {
        let start = map.find_marker(TileClass::Start)?;
        let goal = map.find_marker(TileClass::Goal)?;
        Ok(Self {
            id,
            map,
            start,
            goal,
        })
    }
}

// ================================================================
// Procedural levels
// ================================================================

/// Prefix of generated level ids: `gen-<seed>`.
pub const GENERATED_PREFIX: &str = "gen-";
/// Chunk width in tiles (each procedural section is this wide).
const CHUNK_WIDTH: usize = 8;
/// Number of chunks in a generated level, including the flat spawn chunk.
const NUM_CHUNKS: usize = 8;
/// Generated level height in tiles.
pub const GENERATED_HEIGHT: usize = 12;

/// Deterministic seeded levels addressed as `gen-<seed>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GeneratedLevels;

impl GeneratedLevels {
    pub fn id_for(seed: u64) -> LevelId {
        LevelId::new(format!("{GENERATED_PREFIX}{seed}"))
    }
}

impl LevelSource for GeneratedLevels {
    fn load_map(&self, id: &LevelId, table: &TileCodeTable) -> Result<TileMap, LevelError> {
        let seed = id
            .as_str()
            .strip_prefix(GENERATED_PREFIX)
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or_else(|| LevelError::UnknownLevel(id.to_string()))?;
        TileMap::from_rows(generate_rows(seed, table), table)
    }
}

/// Generate level rows from a seed. The bottom two rows are ground; the
/// spawn chunk is flat; later chunks carry pits, hazard pools, steps and
/// floating platforms, all within single-jump reach.
pub fn generate_rows(seed: u64, table: &TileCodeTable) -> Vec<Vec<i32>> {
    let width = CHUNK_WIDTH * NUM_CHUNKS;
    let height = GENERATED_HEIGHT;
    let empty = table.code_for(TileClass::Empty);
    let solid = table.code_for(TileClass::Solid);
    let mut rows = vec![vec![empty; width]; height];
    let ground = height - 2;

    for col in 0..width {
        rows[ground][col] = solid;
        rows[ground + 1][col] = solid;
    }

    let mut rng = StdRng::seed_from_u64(seed);
    for chunk in 1..NUM_CHUNKS {
        generate_chunk(&mut rows, &mut rng, chunk * CHUNK_WIDTH, table);
    }

    // Markers go last so no chunk overwrites them.
    rows[ground - 1][1] = table.code_for(TileClass::Start);
    rows[ground - 1][width - 3] = table.code_for(TileClass::Goal);
    rows[ground][width - 3] = solid;
    rows[ground + 1][width - 3] = solid;
    rows
}

fn generate_chunk(rows: &mut [Vec<i32>], rng: &mut StdRng, base: usize, table: &TileCodeTable) {
    let ground = rows.len() - 2;
    let empty = table.code_for(TileClass::Empty);
    let solid = table.code_for(TileClass::Solid);
    let hazard = table.code_for(TileClass::Hazard);
    let coin = table.code_for(TileClass::Coin);

    match rng.random_range(0u8..5) {
        0 => {
            // Pit through the floor
            let start = base + rng.random_range(2..5);
            let len = rng.random_range(2..4);
            for col in start..start + len {
                rows[ground][col] = empty;
                rows[ground + 1][col] = empty;
            }
        },
        1 => {
            // Hazard pool sunk into the floor
            let start = base + rng.random_range(2..5);
            let len = rng.random_range(1..3);
            for col in start..start + len {
                rows[ground][col] = hazard;
            }
        },
        2 => {
            // Step up, one or two tiles high
            let start = base + rng.random_range(1..4);
            let h = rng.random_range(1..3);
            for col in start..base + CHUNK_WIDTH {
                for dy in 1..=h {
                    rows[ground - dy][col] = solid;
                }
            }
            rows[ground - h - 1][start] = coin;
        },
        3 => {
            // Floating platform with coins on top
            let start = base + rng.random_range(1..4);
            let len = rng.random_range(2..4);
            let y = ground - 3;
            for col in start..start + len {
                rows[y][col] = solid;
                rows[y - 1][col] = coin;
            }
        },
        _ => {
            // Flat run with a coin trail
            for col in (base + 1..base + CHUNK_WIDTH - 1).step_by(2) {
                rows[ground - 1][col] = coin;
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TINY: &str = "-1,-1,-1,-1\n20,-1,-1,21\n0,0,0,0\n";

    #[test]
    fn static_level_loads_markers() {
        let source = StaticLevels::new().with_level("tiny", TINY);
        let level = Level::load(&source, &LevelId::new("tiny"), &TileCodeTable::default()).unwrap();
        assert_eq!(level.start, (0, 1));
        assert_eq!(level.goal, (3, 1));
    }

    #[test]
    fn unknown_static_level() {
        let source = StaticLevels::new();
        let err = Level::load(&source, &LevelId::new("nope"), &TileCodeTable::default())
            .unwrap_err();
        assert!(matches!(err, LevelError::UnknownLevel(_)));
    }

    #[test]
    fn level_without_goal_fails_load() {
        let source = StaticLevels::new().with_level("x", "20,-1\n0,0\n");
        let err = Level::load(&source, &LevelId::new("x"), &TileCodeTable::default()).unwrap_err();
        assert!(matches!(err, LevelError::MissingMarker(TileClass::Goal)));
    }

    #[test]
    fn missing_dir_level_is_unknown() {
        let source = DirLevelSource::new("/nonexistent/tilerun-levels");
        let err = source
            .load_map(&LevelId::new("0"), &TileCodeTable::default())
            .unwrap_err();
        assert!(matches!(err, LevelError::UnknownLevel(_)));
    }

    #[test]
    fn terrain_path_layout() {
        let source = DirLevelSource::new("levels");
        let path = source.terrain_path(&LevelId::new("2"));
        assert_eq!(path, PathBuf::from("levels/2/level_2_terrain.csv"));
    }

    #[test]
    fn chained_falls_through_unknown() {
        let source = ChainedLevels::new()
            .with(StaticLevels::new())
            .with(GeneratedLevels);
        let map = source
            .load_map(&GeneratedLevels::id_for(7), &TileCodeTable::default())
            .unwrap();
        assert_eq!(map.height(), GENERATED_HEIGHT);
    }

    #[test]
    fn generated_level_reproducible() {
        let table = TileCodeTable::default();
        assert_eq!(generate_rows(42, &table), generate_rows(42, &table));
    }

    #[test]
    fn generated_levels_have_single_markers() {
        let table = TileCodeTable::default();
        for seed in 0..50 {
            let level = Level::load(&GeneratedLevels, &GeneratedLevels::id_for(seed), &table)
                .unwrap_or_else(|e| panic!("seed {seed}: {e}"));
            assert!(level.goal.0 > level.start.0);
            // Spawn cell stands on solid ground
            assert!(level.map.is_solid(level.start.0, level.start.1 + 1));
        }
    }

    #[test]
    fn malformed_generated_id_is_unknown() {
        let err = GeneratedLevels
            .load_map(&LevelId::new("gen-abc"), &TileCodeTable::default())
            .unwrap_err();
        assert!(matches!(err, LevelError::UnknownLevel(_)));
    }
}
