use std::cell::Cell;
use std::collections::hash_map::RandomState;
use std::hash::BuildHasher;

#[derive(Debug, Clone, Default)]
pub struct PacketLossSimulation {
    pub enabled: bool,
    pub loss_percent: f32,
}

impl PacketLossSimulation {
    pub fn with_loss(loss_percent: f32) -> Self {
        Self {
            enabled: loss_percent > 0.0,
            loss_percent,
        }
    }

    pub fn should_drop(&self) -> bool {
        if !self.enabled || self.loss_percent <= 0.0 {
            return false;
        }
        rand_percent() * 100.0 < self.loss_percent
    }
}

#[derive(Debug, Clone, Default)]
pub struct NetworkStats {
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_dropped: u64,
    pub packets_rejected: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
}

thread_local! {
    static RNG_STATE: Cell<u64> = Cell::new(RandomState::new().hash_one(0u64) | 1);
}

/// Xorshift generator seeded per thread; only used for salts and loss
/// simulation.
pub fn rand_u64() -> u64 {
    RNG_STATE.with(|state| {
        let mut x = state.get();
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        state.set(x);
        x
    })
}

/// Uniform in `[0, 1)`.
pub fn rand_percent() -> f32 {
    (rand_u64() >> 40) as f32 / (1u64 << 24) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_values_differ() {
        assert_ne!(rand_u64(), rand_u64());
    }

    #[test]
    fn percent_in_range() {
        for _ in 0..1000 {
            let p = rand_percent();
            assert!((0.0..1.0).contains(&p));
        }
    }

    #[test]
    fn disabled_simulation_never_drops() {
        let sim = PacketLossSimulation::default();
        assert!((0..100).all(|_| !sim.should_drop()));
        let always = PacketLossSimulation::with_loss(100.0);
        assert!((0..100).all(|_| always.should_drop()));
    }
}
