use std::collections::HashMap;

use rand::rngs::StdRng;
use rand::SeedableRng;

/// Direction of travel for cycle-value resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleDirection {
    Forward,
    Backward,
}

impl CycleDirection {
    pub fn flipped(self) -> Self {
        match self {
            CycleDirection::Forward => CycleDirection::Backward,
            CycleDirection::Backward => CycleDirection::Forward,
        }
    }

    pub fn step(self) -> isize {
        match self {
            CycleDirection::Forward => 1,
            CycleDirection::Backward => -1,
        }
    }
}

/// Mutable engine-wide evaluation state, owned by whoever owns the
/// engine's lifetime and passed into every resolution call. Holds the
/// per-(light, parameter) cycle-direction memory and the RNG for random
/// value/effect draws. Seedable so scheduling tests are deterministic.
#[derive(Debug)]
pub struct ShowContext {
    cycle: HashMap<(String, String), CycleDirection>,
    rng: StdRng,
}

impl ShowContext {
    pub fn new() -> Self {
        Self {
            cycle: HashMap::new(),
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            cycle: HashMap::new(),
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Current cycle direction for a (light, parameter) pair. Fresh
    /// pairs start forward.
    pub fn cycle_direction(&self, light: &str, parameter: &str) -> CycleDirection {
        self.cycle
            .get(&(light.to_owned(), parameter.to_owned()))
            .copied()
            .unwrap_or(CycleDirection::Forward)
    }

    pub fn set_cycle_direction(&mut self, light: &str, parameter: &str, dir: CycleDirection) {
        self.cycle
            .insert((light.to_owned(), parameter.to_owned()), dir);
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }
}

impl Default for ShowContext {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direction_defaults_forward_and_persists() {
        let mut ctx = ShowContext::with_seed(1);
        assert_eq!(ctx.cycle_direction("l1", "color"), CycleDirection::Forward);
        ctx.set_cycle_direction("l1", "color", CycleDirection::Backward);
        assert_eq!(ctx.cycle_direction("l1", "color"), CycleDirection::Backward);
        // Scoped per (light, parameter).
        assert_eq!(ctx.cycle_direction("l2", "color"), CycleDirection::Forward);
        assert_eq!(ctx.cycle_direction("l1", "gobo"), CycleDirection::Forward);
    }
}
