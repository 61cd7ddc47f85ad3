use super::movementsystem::*;
use crate::constants::*;
use crate::features;
use crate::memorysystem::*;
use crate::world::*;
use log::*;
use specs::prelude::*;

#[derive(SystemData)]
pub struct RouteCacheSystemData<'a> {
    host: ReadExpect<'a, Host>,
    traveler: WriteExpect<'a, Traveler>,
    memory_arbiter: WriteExpect<'a, MemoryArbiter>,
}

/// Drops matrices from earlier ticks and pulls stored routes in once the intel segment is active.
pub struct RouteCacheLoadSystem;

impl<'a> System<'a> for RouteCacheLoadSystem {
    type SystemData = RouteCacheSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let time = data.host.get().time();

        data.traveler.matrices().prune(time);

        let routes = data.traveler.routes();

        if !routes.is_loaded() {
            if let Some(stored) = data.memory_arbiter.get(INTEL_SEGMENT) {
                match routes.load(stored) {
                    Ok(()) => info!("Loaded route cache - Routes: {}", routes.len()),
                    Err(err) => warn!("Discarding stored route cache: {}", err),
                }
            }
        }

        routes.prune(time);
    }
}

#[derive(SystemData)]
pub struct RouteCacheStoreSystemData<'a> {
    traveler: WriteExpect<'a, Traveler>,
    memory_arbiter: WriteExpect<'a, MemoryArbiter>,
    memory: Read<'a, RootMemory>,
}

/// Writes changed routes back to the intel segment and keeps the segment requested.
pub struct RouteCacheStoreSystem;

impl<'a> System<'a> for RouteCacheStoreSystem {
    type SystemData = RouteCacheStoreSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        data.memory_arbiter.request(INTEL_SEGMENT);

        if !features::intel::store(&data.memory.features) {
            return;
        }

        let routes = data.traveler.routes();

        if !routes.is_loaded() || !routes.is_dirty() {
            return;
        }

        match routes.store() {
            Ok(encoded) => data.memory_arbiter.set(INTEL_SEGMENT, encoded),
            Err(err) => error!("Failed to encode route cache: {}", err),
        }
    }
}
