use crate::constants::*;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

/// Random source for the tick. Spreads periodic work so that operations created together do not
/// keep re-evaluating on the same tick.
pub struct TickRng(SmallRng);

impl Default for TickRng {
    fn default() -> Self {
        TickRng(SmallRng::from_entropy())
    }
}

impl TickRng {
    pub fn seeded(seed: u64) -> TickRng {
        TickRng(SmallRng::seed_from_u64(seed))
    }

    pub fn get_mut(&mut self) -> &mut SmallRng {
        &mut self.0
    }
}

/// `interval` moved by up to half the jitter fraction either way.
pub fn random_interval<R: Rng>(rng: &mut R, interval: u32) -> u32 {
    let offset = ((rng.gen::<f64>() - 0.5) * interval as f64 * JITTER_FRACTION).floor() as i64;

    (interval as i64 + offset).max(1) as u32
}

/// Suffix used to tell apart creeps of the same role.
pub fn name_suffix<R: Rng>(rng: &mut R) -> u32 {
    rng.gen_range(0..100)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intervals_stay_within_ten_percent() {
        let mut rng = TickRng::seeded(7);

        for _ in 0..1000 {
            let interval = random_interval(rng.get_mut(), 10_000);

            assert!((9_000..=10_000 + 1_000).contains(&interval));
        }

        for _ in 0..1000 {
            let interval = random_interval(rng.get_mut(), 100);

            assert!((90..=110).contains(&interval));
        }
    }
}
