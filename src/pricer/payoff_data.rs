// src/pricer/payoff_data.rs
//! Per-side solver state: the payoff slice and its adjoint companions.

use crate::pricer::adjoint::AdjointMode;

/// The value function on the current time slice, together with the adjoint
/// sensitivities carried through every solver operation.
///
/// `vega` and `rho_borrow` are grid-shaped (one entry per node) because the
/// product-rule recursions couple neighbouring nodes. `rho` is the fixed-b
/// rate sensitivity: the generator does not depend on `r`, so that
/// sensitivity enters only through the per-step discount factor and can be
/// carried as a single scalar at the pivot node.
#[derive(Debug, Clone)]
pub struct PayoffData {
    /// Value function, length `n + 1` at all times
    pub payoff: Vec<f64>,
    /// dV/dσ per node; empty unless the mode enables vega
    pub vega: Vec<f64>,
    /// dV/db per node; empty unless the mode enables rho
    pub rho_borrow: Vec<f64>,
    /// dV/dr at fixed b, carried at the pivot node
    pub rho: f64,
    /// Discount exposure accumulated at the pivot (the lifetime the pivot
    /// value has been discounted over); `rho = -rho_time · payoff[pivot]`
    pub rho_time: f64,
}

impl PayoffData {
    /// Allocate buffers for `nodes` grid points under adjoint mode `A`.
    /// Disabled sensitivity fields stay empty.
    pub fn new<A: AdjointMode>(nodes: usize) -> Self {
        PayoffData {
            payoff: vec![0.0; nodes],
            vega: if A::VEGA { vec![0.0; nodes] } else { Vec::new() },
            rho_borrow: if A::RHO { vec![0.0; nodes] } else { Vec::new() },
            rho: 0.0,
            rho_time: 0.0,
        }
    }

    /// Zero every carried field, keeping the allocations.
    pub fn clear(&mut self) {
        self.payoff.iter_mut().for_each(|v| *v = 0.0);
        self.vega.iter_mut().for_each(|v| *v = 0.0);
        self.rho_borrow.iter_mut().for_each(|v| *v = 0.0);
        self.rho = 0.0;
        self.rho_time = 0.0;
    }
}

/// Scratch storage shared by the Thomas solver and the dividend-jump
/// interpolation. Sized lazily on first use, reused for the pricer lifetime.
#[derive(Debug, Clone, Default)]
pub struct SolverCache {
    /// Eliminated superdiagonal from the Thomas forward sweep
    pub sup: Vec<f64>,
    /// Pre-jump copy of a grid-shaped field
    pub tmp: Vec<f64>,
}

impl SolverCache {
    pub fn new() -> Self {
        SolverCache::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricer::adjoint::{FullAdjoint, NoAdjoint, VegaAdjoint};

    #[test]
    fn test_buffer_shapes_follow_mode() {
        let none = PayoffData::new::<NoAdjoint>(11);
        assert_eq!(none.payoff.len(), 11);
        assert!(none.vega.is_empty());
        assert!(none.rho_borrow.is_empty());

        let vega = PayoffData::new::<VegaAdjoint>(11);
        assert_eq!(vega.vega.len(), 11);
        assert!(vega.rho_borrow.is_empty());

        let all = PayoffData::new::<FullAdjoint>(11);
        assert_eq!(all.vega.len(), 11);
        assert_eq!(all.rho_borrow.len(), 11);
    }

    #[test]
    fn test_clear_keeps_allocations() {
        let mut data = PayoffData::new::<FullAdjoint>(5);
        data.payoff[2] = 1.0;
        data.vega[2] = 2.0;
        data.rho = 3.0;
        data.clear();
        assert_eq!(data.payoff.len(), 5);
        assert_eq!(data.payoff[2], 0.0);
        assert_eq!(data.vega[2], 0.0);
        assert_eq!(data.rho, 0.0);
    }
}
