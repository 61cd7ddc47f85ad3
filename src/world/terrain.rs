use super::position::ROOM_SIZE;
use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Terrain {
    Plain,
    Swamp,
    Wall,
}

const TERRAIN_AREA: usize = (ROOM_SIZE * ROOM_SIZE) as usize;

/// Static terrain of one room, row major.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTerrain {
    tiles: Vec<Terrain>,
}

impl RoomTerrain {
    pub fn plains() -> RoomTerrain {
        RoomTerrain {
            tiles: vec![Terrain::Plain; TERRAIN_AREA],
        }
    }

    /// Build terrain from text rows: `#` wall, `~` swamp, anything else plain. Missing rows and
    /// columns are plain.
    pub fn from_rows(rows: &[&str]) -> RoomTerrain {
        let mut terrain = RoomTerrain::plains();

        for (y, row) in rows.iter().enumerate().take(ROOM_SIZE as usize) {
            for (x, c) in row.chars().enumerate().take(ROOM_SIZE as usize) {
                let tile = match c {
                    '#' => Terrain::Wall,
                    '~' => Terrain::Swamp,
                    _ => Terrain::Plain,
                };

                terrain.set(x as u8, y as u8, tile);
            }
        }

        terrain
    }

    fn index(x: u8, y: u8) -> Option<usize> {
        if (x as i32) < ROOM_SIZE && (y as i32) < ROOM_SIZE {
            Some(y as usize * ROOM_SIZE as usize + x as usize)
        } else {
            None
        }
    }

    pub fn get(&self, x: u8, y: u8) -> Terrain {
        Self::index(x, y)
            .and_then(|index| self.tiles.get(index))
            .copied()
            .unwrap_or(Terrain::Wall)
    }

    pub fn set(&mut self, x: u8, y: u8, terrain: Terrain) {
        if let Some(tile) = Self::index(x, y).and_then(|index| self.tiles.get_mut(index)) {
            *tile = terrain;
        }
    }

    pub fn is_wall(&self, x: u8, y: u8) -> bool {
        self.get(x, y) == Terrain::Wall
    }
}
