#![recursion_limit = "128"]
#![warn(clippy::all)]

pub mod cache;
pub mod cleanup;
pub mod constants;
pub mod creep;
pub mod features;
pub mod findnearest;
pub mod game_loop;
pub mod jitter;
pub mod logging;
pub mod memory_helper;
pub mod memorysystem;
pub mod missions;
pub mod notifier;
pub mod operations;
pub mod panic;
pub mod pathing;
pub mod serialize;
pub mod spawnsystem;
pub mod statssystem;
pub mod timeout;
pub mod world;

/// Install the logger and the panic hook. Call once when the environment is created.
pub fn initialize(verbosity: log::LevelFilter) {
    logging::setup_logging(verbosity);
    panic::setup_panic_hook();
}
