// src/pricer/adjoint.rs
//! Compile-time selection of the adjoint differentiation mode.
//!
//! The pricer, the evolution operator and the tridiagonal operator are all
//! generic over an [`AdjointMode`] tag. Each mode monomorphises to its own
//! concrete layout: disabled sensitivity buffers are empty and the adjoint
//! branches in the hot loop are const-folded away, so the price-only solver
//! carries no AAD overhead at all.

/// Which sensitivities the solver propagates alongside the payoff.
pub trait AdjointMode: Copy + Clone + Default + Send + Sync + 'static {
    /// Propagate the vega vector through the volatility derivative operator
    const VEGA: bool;
    /// Propagate the rho-borrow vector (and the scalar discount rho)
    /// through the cost-of-carry derivative operator
    const RHO: bool;

    const NAME: &'static str;
}

/// Price only, no sensitivities carried by the solver
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAdjoint;

/// Vega only
#[derive(Debug, Clone, Copy, Default)]
pub struct VegaAdjoint;

/// Rho and rho-borrow only
#[derive(Debug, Clone, Copy, Default)]
pub struct RhoAdjoint;

/// All adjoint sensitivities
#[derive(Debug, Clone, Copy, Default)]
pub struct FullAdjoint;

impl AdjointMode for NoAdjoint {
    const VEGA: bool = false;
    const RHO: bool = false;
    const NAME: &'static str = "None";
}

impl AdjointMode for VegaAdjoint {
    const VEGA: bool = true;
    const RHO: bool = false;
    const NAME: &'static str = "Vega";
}

impl AdjointMode for RhoAdjoint {
    const VEGA: bool = false;
    const RHO: bool = true;
    const NAME: &'static str = "Rho";
}

impl AdjointMode for FullAdjoint {
    const VEGA: bool = true;
    const RHO: bool = true;
    const NAME: &'static str = "All";
}
