//! World constants and tuned policy values. The policy values came out of long running
//! experimentation and are kept as-is; treat them as tuning knobs.

pub const CREEP_LIFE_TIME: u32 = 1500;
pub const CREEP_SPAWN_TIME: u32 = 3;
pub const MAX_CREEP_SIZE: u32 = 50;
pub const OBSERVER_RANGE: u32 = 10;
pub const MAX_CONSTRUCTION_SITES: u32 = 100;
pub const LAB_BOOST_MINERAL: u32 = 30;

//
// Travel
//

pub const DEFAULT_STUCK_VALUE: u32 = 5;
pub const DEFAULT_MAX_OPS: u32 = 20_000;
pub const DEFAULT_RESTRICT_DISTANCE: u32 = 16;
pub const ROUTE_SEARCH_DISTANCE: u32 = 2;
pub const REPORT_CPU_THRESHOLD: f64 = 2000.0;
pub const RETRY_WITHOUT_ROUTE_MAX_OPS: u32 = 2000;
pub const ROAD_COST: u8 = 1;
pub const CONTAINER_COST: u8 = 5;
pub const IMPASSABLE: u8 = 0xff;

//
// Headcount
//

pub const PRESPAWN_TICKS_PER_PART: u32 = 3;
pub const SPAWN_FAILURE_LOG_INTERVAL: u32 = 10;
pub const COMMUNITY_AGENT_RANGE: u32 = 3;

//
// Operations
//

pub const SPAWN_GROUP_RECHECK_INTERVAL: u32 = 10_000;
pub const SPAWN_GROUP_RETRY_INTERVAL: u32 = 100;
pub const REMOTE_SPAWN_DISTANCE: u32 = 8;
pub const SPAWN_AVAILABILITY_WINDOW: f64 = 50.0;
pub const SPAWN_DISTANCE_FALLBACK_PER_ROOM: u32 = 50;
pub const SPAWN_DISTANCE_FALLBACK_OFFSET: u32 = 25;
pub const SPAWN_DISTANCE_PORTAL: u32 = 200;

//
// Paving
//

pub const PAVE_INTERVAL: u32 = 1000;
pub const PAVE_MAX_ROOM_DISTANCE: u32 = 2;
pub const PAVE_SITE_LIMIT: u32 = 60;
pub const PAVE_ROAD_COST: u8 = 3;
pub const PAVE_PLAIN_COST: u8 = 4;
pub const PAVE_SWAMP_COST: u8 = 5;
pub const PAVE_AVOID_COST: u8 = 7;
pub const PAVE_MAX_OPS: u32 = 12_000;
pub const PAVE_SUMMON_HITS: u32 = 1_000_000;
pub const PAVE_SUMMON_RATIO: f64 = 0.2;
pub const PAVER_HITS_PER_POTENCY: u32 = 500_000;
pub const PAVER_REPAIR_MARGIN: u32 = 1000;
pub const PAVER_PRESPAWN: u32 = 10;
pub const PAVER_SMALL_ENERGY: u32 = 550;
pub const PAVER_POTENCY_RESET_CHANCE: f64 = 0.01;

//
// Medic
//

pub const HEAL_CHECK_INTERVAL: u32 = 25;
pub const HEAL_MIN_TICKS_TO_LIVE: u32 = 100;

//
// Scheduler
//

pub const GC_INTERVAL: u32 = 100;
pub const JITTER_FRACTION: f64 = 0.2;
pub const NOTIFIER_CAPACITY: usize = 1000;
pub const CPU_SAMPLE_INTERVAL: u32 = 10;
pub const CPU_HISTORY_LENGTH: usize = 100;
pub const CPU_THROTTLE_THRESHOLD: f64 = 0.9;
pub const INTEL_SEGMENT: u8 = 55;
