use super::costmatrix::*;
use crate::constants::*;
use crate::world::*;
use std::collections::HashMap;
use std::sync::Arc;

struct StructureEntry {
    tick: u32,
    built_fresh: bool,
    matrix: Arc<CostMatrix>,
}

/// Per-tick structure and creep matrices keyed by room. An entry is only reused during the tick
/// it was built in.
#[derive(Default)]
pub struct CostMatrixCache {
    structures: HashMap<RoomName, StructureEntry>,
    creeps: HashMap<RoomName, (u32, Arc<CostMatrix>)>,
}

impl CostMatrixCache {
    pub fn new() -> CostMatrixCache {
        CostMatrixCache::default()
    }

    /// A fresh request rebuilds the matrix unless it was already rebuilt on request this tick.
    pub fn structure_matrix(&mut self, room: &RoomSnapshot, time: u32, fresh: bool) -> Arc<CostMatrix> {
        let reusable = self
            .structures
            .get(&room.name)
            .map(|entry| entry.tick == time && (!fresh || entry.built_fresh))
            .unwrap_or(false);

        if !reusable {
            let matrix = Arc::new(CostMatrix::from_structures(room, ROAD_COST));

            self.structures.insert(
                room.name,
                StructureEntry {
                    tick: time,
                    built_fresh: fresh,
                    matrix,
                },
            );
        }

        self.structures
            .get(&room.name)
            .map(|entry| entry.matrix.clone())
            .unwrap_or_else(|| Arc::new(CostMatrix::from_structures(room, ROAD_COST)))
    }

    /// Structure matrix with every creep in the room marked impassable. Built on a freshly rebuilt
    /// structure matrix.
    pub fn creep_matrix(&mut self, room: &RoomSnapshot, time: u32) -> Arc<CostMatrix> {
        if let Some((tick, matrix)) = self.creeps.get(&room.name) {
            if *tick == time {
                return matrix.clone();
            }
        }

        let mut matrix = (*self.structure_matrix(room, time, true)).clone();

        matrix.add_creeps(room);

        let matrix = Arc::new(matrix);

        self.creeps.insert(room.name, (time, matrix.clone()));

        matrix
    }

    /// Drop entries from earlier ticks.
    pub fn prune(&mut self, time: u32) {
        self.structures.retain(|_, entry| entry.tick == time);
        self.creeps.retain(|_, (tick, _)| *tick == time);
    }
}
