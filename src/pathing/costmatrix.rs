use crate::constants::*;
use crate::world::*;
use serde::{Deserialize, Serialize};
use shrinkwraprs::*;

const MATRIX_AREA: usize = (ROOM_SIZE * ROOM_SIZE) as usize;

/// Dense per-room movement costs. Zero defers to terrain, `IMPASSABLE` blocks the tile.
#[derive(Shrinkwrap, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[shrinkwrap(mutable)]
#[serde(transparent)]
pub struct CostMatrix(pub Vec<u8>);

impl Default for CostMatrix {
    fn default() -> Self {
        CostMatrix::new()
    }
}

impl CostMatrix {
    pub fn new() -> CostMatrix {
        CostMatrix(vec![0; MATRIX_AREA])
    }

    fn index(x: u8, y: u8) -> Option<usize> {
        if (x as i32) < ROOM_SIZE && (y as i32) < ROOM_SIZE {
            Some(y as usize * ROOM_SIZE as usize + x as usize)
        } else {
            None
        }
    }

    pub fn get(&self, x: u8, y: u8) -> u8 {
        Self::index(x, y).and_then(|i| self.0.get(i)).copied().unwrap_or(IMPASSABLE)
    }

    pub fn set(&mut self, x: u8, y: u8, cost: u8) {
        if let Some(tile) = Self::index(x, y).and_then(|i| self.0.get_mut(i)) {
            *tile = cost;
        }
    }

    /// Structures and construction sites of a visible room. Walkable structures keep a cost,
    /// everything else is blocked. Ramparts only pass when they are ours or public.
    pub fn from_structures(room: &RoomSnapshot, road_cost: u8) -> CostMatrix {
        let mut matrix = CostMatrix::new();

        let mut impassable = Vec::new();

        for structure in room.structures.iter() {
            match structure.kind {
                StructureKind::Rampart => {
                    if !structure.my && !structure.is_public {
                        impassable.push(structure.pos);
                    }
                }
                StructureKind::Road => matrix.set(structure.pos.x, structure.pos.y, road_cost),
                StructureKind::Container => matrix.set(structure.pos.x, structure.pos.y, CONTAINER_COST),
                _ => impassable.push(structure.pos),
            }
        }

        for site in room.construction_sites.iter().filter(|s| s.my) {
            match site.kind {
                StructureKind::Road | StructureKind::Container | StructureKind::Rampart => {}
                _ => matrix.set(site.pos.x, site.pos.y, IMPASSABLE),
            }
        }

        for pos in impassable {
            matrix.set(pos.x, pos.y, IMPASSABLE);
        }

        matrix
    }

    pub fn add_creeps(&mut self, room: &RoomSnapshot) {
        for creep in room.creeps.iter() {
            self.set(creep.pos.x, creep.pos.y, IMPASSABLE);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(x: u8, y: u8) -> Position {
        Position::new(x, y, RoomName::new("W1N1").unwrap())
    }

    fn structure(kind: StructureKind, x: u8, y: u8, my: bool) -> StructureSnapshot {
        StructureSnapshot {
            id: ObjectId::new(&format!("{:?}{}{}", kind, x, y)),
            kind,
            pos: position(x, y),
            hits: 1,
            hits_max: 1,
            my,
            owner: None,
            is_public: false,
            store: Store::default(),
        }
    }

    #[test]
    fn structures_and_sites_are_costed() {
        let mut room = RoomSnapshot::new(RoomName::new("W1N1").unwrap());
        room.structures.push(structure(StructureKind::Road, 1, 1, true));
        room.structures.push(structure(StructureKind::Container, 2, 1, true));
        room.structures.push(structure(StructureKind::Rampart, 3, 1, true));
        room.structures.push(structure(StructureKind::Rampart, 4, 1, false));
        room.structures.push(structure(StructureKind::Spawn, 5, 1, true));
        room.construction_sites.push(ConstructionSiteSnapshot {
            id: ObjectId::new("site"),
            kind: StructureKind::Tower,
            pos: position(6, 1),
            my: true,
        });
        room.construction_sites.push(ConstructionSiteSnapshot {
            id: ObjectId::new("road-site"),
            kind: StructureKind::Road,
            pos: position(7, 1),
            my: true,
        });

        let matrix = CostMatrix::from_structures(&room, ROAD_COST);

        assert_eq!(matrix.get(1, 1), ROAD_COST);
        assert_eq!(matrix.get(2, 1), CONTAINER_COST);
        assert_eq!(matrix.get(3, 1), 0);
        assert_eq!(matrix.get(4, 1), IMPASSABLE);
        assert_eq!(matrix.get(5, 1), IMPASSABLE);
        assert_eq!(matrix.get(6, 1), IMPASSABLE);
        assert_eq!(matrix.get(7, 1), 0);
        assert_eq!(matrix.get(60, 1), IMPASSABLE);
    }
}
