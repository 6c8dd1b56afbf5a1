//! # fast-pde: Finite-Difference Pricing with Adjoint Greeks
//!
//! A Rust library for pricing European and American vanilla equity options
//! with a one-dimensional finite-difference PDE solver, producing vega and
//! rho sensitivities by adjoint algorithmic differentiation (AAD) of the
//! discrete scheme.
//!
//! ## Key Features
//!
//! - **θ-scheme solver**: explicit Euler, implicit Euler and Crank-Nicolson
//!   over a tridiagonal Black-Scholes generator, solved by the Thomas
//!   algorithm in O(N) per step
//! - **Non-uniform grids**: linear, logarithmic and sinh-adaptive meshes
//!   that always pass through the spot
//! - **Adjoint greeks**: vega and rho/rho-borrow carried through every
//!   solver operation instead of re-pricing under bumped parameters
//! - **Discrete dividends**: jump conditions with refined sub-stepping and
//!   local re-smoothing around the post-jump strike image
//! - **Payoff smoothing**: the strike cell is replaced by a closed-form
//!   one-step value to recover the scheme's formal order at the kink
//! - **Production Ready**: comprehensive error handling and validation
//!
//! ## Quick Start
//!
//! ```rust
//! use fast_pde::pricer::adjoint::VegaAdjoint;
//! use fast_pde::pricer::fd_pricer::{FdPricer, GreeksConfig, PricerSettings};
//! use fast_pde::InputData;
//!
//! // At-the-money European option, one year to expiry
//! let input = InputData {
//!     spot: 100.0,
//!     strike: 100.0,
//!     maturity: 1.0,
//!     sigma: 0.2,
//!     r: 0.05,
//!     ..Default::default()
//! };
//! let mut settings = PricerSettings::default();
//! settings.greeks = GreeksConfig::surface() | GreeksConfig::VEGA;
//!
//! let mut pricer = FdPricer::<VegaAdjoint>::new(input, settings).expect("Valid configuration");
//! let (call, put) = pricer.price().expect("Bounded computation");
//! println!("call = {:.4}, put = {:.4}, vega = {:.4}", call.price, put.price, call.vega);
//! ```
//!
//! ## Mathematical Foundation
//!
//! The engine discretises the Black-Scholes generator
//! `L = ½σ²x²∂ₓₓ + bx∂ₓ` on a non-uniform mesh and rolls the terminal
//! payoff back through `(I - θΔt·A) Vₙ = (I + (1-θ)Δt·A) Vₙ₊₁`, discounting
//! each step at the risk-free rate. The derivative operators `∂A/∂σ` and
//! `∂A/∂b` ride along through the product rule, which is what makes one
//! backward sweep return the price and its parameter sensitivities
//! together.

// Module declarations
pub mod error;
pub mod math_utils;
pub mod input;
pub mod output;
pub mod grid;
pub mod analytics;
pub mod operators;
pub mod pricer;

// Re-export commonly used types for convenience
pub use error::{FdError, FdResult};
pub use grid::{Grid, GridType};
pub use input::{Dividend, InputData};
pub use operators::evolution::SolverType;
pub use output::OptionResult;
pub use pricer::adjoint::{AdjointMode, FullAdjoint, NoAdjoint, RhoAdjoint, VegaAdjoint};
pub use pricer::fd_pricer::{
    price_batch, CalculationType, ExerciseType, FdPricer, FdSettings, GreeksConfig,
    PricerSettings,
};
