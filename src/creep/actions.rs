use crate::world::*;
use bitflags::*;

// Intents that share a bit cannot be issued by the same creep in the same tick. Intents on
// different bits combine freely, for example a move with a repair and a heal.

bitflags! {
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
    pub struct SimultaneousActionFlags: u16 {
        const UNSET = 0;

        const MOVE = 1;

        const HARVEST = 1 << 1;
        const BUILD = 1 << 1;
        const REPAIR = 1 << 1;

        const RANGED_HEAL = 1 << 2;

        const HEAL = 1 << 3;

        const WITHDRAW = 1 << 4;
        const TRANSFER = 1 << 4;
        const PICKUP = 1 << 4;

        const SAY = 1 << 5;

        const SUICIDE = 1 << 6;
        const NOTIFY = 1 << 7;
    }
}

impl SimultaneousActionFlags {
    pub fn for_intent(intent: &CreepIntent) -> SimultaneousActionFlags {
        match intent {
            CreepIntent::Move(_) => SimultaneousActionFlags::MOVE,
            CreepIntent::Harvest(_) => SimultaneousActionFlags::HARVEST,
            CreepIntent::Build(_) => SimultaneousActionFlags::BUILD,
            CreepIntent::Repair(_) => SimultaneousActionFlags::REPAIR,
            CreepIntent::RangedHeal(_) => SimultaneousActionFlags::RANGED_HEAL,
            CreepIntent::Heal(_) => SimultaneousActionFlags::HEAL,
            CreepIntent::Withdraw(..) => SimultaneousActionFlags::WITHDRAW,
            CreepIntent::Transfer(..) => SimultaneousActionFlags::TRANSFER,
            CreepIntent::Pickup(_) => SimultaneousActionFlags::PICKUP,
            CreepIntent::Say(_) => SimultaneousActionFlags::SAY,
            CreepIntent::Suicide => SimultaneousActionFlags::SUICIDE,
            CreepIntent::NotifyWhenAttacked(_) => SimultaneousActionFlags::NOTIFY,
        }
    }

    pub fn consume(&mut self, flags: SimultaneousActionFlags) -> bool {
        if !self.intersects(flags) {
            self.insert(flags);

            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipelines_are_exclusive() {
        let mut flags = SimultaneousActionFlags::UNSET;

        assert!(flags.consume(SimultaneousActionFlags::for_intent(&CreepIntent::Move(Direction::Top))));
        assert!(flags.consume(SimultaneousActionFlags::REPAIR));
        assert!(!flags.consume(SimultaneousActionFlags::BUILD));
        assert!(flags.consume(SimultaneousActionFlags::HEAL));
        assert!(!flags.consume(SimultaneousActionFlags::MOVE));
    }
}
