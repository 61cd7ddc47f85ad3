use crate::cache::*;
use crate::cleanup::*;
use crate::features;
use crate::jitter::*;
use crate::memorysystem::*;
use crate::operations::managersystem::*;
use crate::operations::operationsystem::*;
use crate::pathing::movementsystem::*;
use crate::pathing::routecachesystem::*;
use crate::spawnsystem::*;
use crate::statssystem::*;
use crate::timeout;
use crate::world::intelsystem::*;
use crate::world::*;
use log::*;
use specs::prelude::*;

/// Everything that survives between ticks: the world resources and the dispatcher running the
/// systems over them. Memory is the only state reloaded from the host every tick.
pub struct Environment {
    world: World,
    dispatcher: Dispatcher<'static, 'static>,
}

impl Environment {
    pub fn new<H: GameHost + 'static>(host: H) -> Environment {
        Environment::with_types(host, OperationTypes::with_defaults())
    }

    pub fn with_types<H: GameHost + 'static>(host: H, types: OperationTypes) -> Environment {
        let mut world = World::new();

        world.insert(Host::new(host));
        world.insert(types);

        let mut dispatcher = build_dispatcher();

        dispatcher.setup(&mut world);

        let mut environment = Environment { world, dispatcher };

        environment.reset();

        environment
    }

    /// Drop every cross-tick cache.
    fn reset(&mut self) {
        self.world.insert(TickCache::new());
        self.world.insert(Traveler::new());
        self.world.insert(SpawnGroups::new());
        self.world.insert(MemoryArbiter::new());
        self.world.insert(TickRng::default());
        self.world.insert(Operations::new());
        self.world.insert(RootMemory::default());
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }

    pub fn tick(&mut self) {
        let (time, raw) = {
            let host = self.world.read_resource::<Host>();
            let host = host.get();

            (host.time(), host.raw_memory())
        };

        let mut memory = RootMemory::load(&raw);

        if features::reset::reset_environment(&memory.features) {
            info!("Resetting environment");

            self.reset();
        }

        if features::reset::reset_memory(&memory.features) {
            info!("Resetting memory");

            memory.reset();
        }

        features::reset::clear(&mut memory.features);

        timeout::init(&mut memory.timeout_tracker, &mut memory.notifier, time);

        self.world.write_resource::<TickCache>().reset(time);

        {
            let host = self.world.read_resource::<Host>();

            self.world.write_resource::<MemoryArbiter>().load(host.get());
        }

        self.world.insert(memory);

        self.dispatcher.dispatch(&self.world);
        self.world.maintain();

        let mut memory = self.world.write_resource::<RootMemory>();

        timeout::finalize(&mut memory.timeout_tracker);

        match memory.to_raw() {
            Ok(raw) => self.world.write_resource::<Host>().get_mut().set_raw_memory(raw),
            Err(err) => error!("Failed to serialize memory: {}", err),
        }
    }
}

fn build_dispatcher() -> Dispatcher<'static, 'static> {
    DispatcherBuilder::new()
        .with(CpuStatsSystem, "cpu_stats", &[])
        .with(IntelSystem, "intel", &[])
        .with(SpawnGroupSystem, "spawn_groups", &[])
        .with(RouteCacheLoadSystem, "route_cache_load", &[])
        .with(OperationManagerSystem, "operations_manager", &[])
        .with_barrier()
        .with(OperationPhaseSystem::new(OperationPhase::Init), "operations_init", &[])
        .with_barrier()
        .with(OperationPhaseSystem::new(OperationPhase::RoleCall), "operations_role_call", &[])
        .with_barrier()
        .with(OperationPhaseSystem::new(OperationPhase::Action), "operations_action", &[])
        .with_barrier()
        .with(OperationPhaseSystem::new(OperationPhase::InvalidateCache), "operations_invalidate_cache", &[])
        .with_barrier()
        .with(OperationPhaseSystem::new(OperationPhase::Finalize), "operations_finalize", &[])
        .with_barrier()
        .with(ScavengeSystem, "scavenge", &[])
        .with(GarbageCollectionSystem, "garbage_collection", &["scavenge"])
        .with(RouteCacheStoreSystem, "route_cache_store", &[])
        .with(MemoryArbiterSystem, "memory_arbiter", &["route_cache_store"])
        .build()
}
