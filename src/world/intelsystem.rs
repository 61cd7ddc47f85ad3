use super::host::*;
use crate::cache::*;
use crate::memorysystem::*;
use crate::pathing::movementsystem::*;
use log::*;
use specs::prelude::*;

#[derive(SystemData)]
pub struct IntelSystemData<'a> {
    host: ReadExpect<'a, Host>,
    cache: WriteExpect<'a, TickCache>,
    traveler: WriteExpect<'a, Traveler>,
    memory: Write<'a, RootMemory>,
}

/// Records ownership of every visible room. Routes through a room whose occupation changed are
/// forgotten so they get recomputed.
pub struct IntelSystem;

impl<'a> System<'a> for IntelSystem {
    type SystemData = IntelSystemData<'a>;

    fn run(&mut self, mut data: Self::SystemData) {
        let host = data.host.get();
        let time = host.time();

        for room_name in host.visible_rooms() {
            let room = match data.cache.room(host, room_name) {
                Some(room) => room,
                None => continue,
            };

            let changed = data.memory.rooms.entry(room_name).or_default().update(&room, time);

            if changed {
                info!("Room occupation changed - Room: {}", room_name);

                data.traveler.routes().invalidate_room(room_name);
            }
        }
    }
}
