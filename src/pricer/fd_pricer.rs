// src/pricer/fd_pricer.rs
//! Backward-induction driver for the finite-difference engine
//!
//! # Pipeline
//!
//! 1. Build the mesh around the spot with bounds `S·exp(±kσ√T)`.
//! 2. Compose the θ-scheme evolution operator with `Δt = T/M`.
//! 3. Initialise terminal payoffs and smooth the single grid cell that
//!    straddles the strike with the closed-form value of a one-step option
//!    (its analytic σ/r/b derivatives seed the adjoint fields).
//! 4. Roll back from step `M` to `1`. Steps bracketing a discrete dividend
//!    are sub-split with the refinement factor, the jump condition
//!    `V(x, t⁻) = V(x - d, t⁺)` is applied by linear interpolation, and the
//!    payoff is re-smoothed around the post-jump strike image.
//! 5. American sides take `max(value, intrinsic)` after every step; the
//!    adjoint entries at exercised nodes are zeroed since the intrinsic has
//!    no σ or b dependence.
//! 6. Read the greeks: delta/gamma/theta by central differences on the
//!    surviving leaves around the pivot, vega/rho/rho-borrow directly from
//!    the adjoint fields.
//!
//! Acceleration: for European pricing of both sides only the call is
//! solved, the put follows from put-call parity; an American call with
//! `b ≥ r` and no discrete dividends is never exercised early and skips
//! the constraint.

use crate::analytics::bs_analytic;
use crate::error::{FdError, FdResult};
use crate::grid::{Grid, GridType};
use crate::input::{Dividend, InputData};
use crate::operators::evolution::{EvolutionOperator, SolverType};
use crate::output::OptionResult;
use crate::pricer::adjoint::AdjointMode;
use crate::pricer::payoff_data::{PayoffData, SolverCache};
use bitflags::bitflags;
use rayon::prelude::*;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct GreeksConfig: u32 {
        const NONE       = 0;
        const DELTA      = 1 << 0;
        const GAMMA      = 1 << 1;
        const THETA      = 1 << 2;
        const VEGA       = 1 << 3;
        const RHO        = 1 << 4;
        const RHO_BORROW = 1 << 5;
    }
}

impl GreeksConfig {
    /// The greeks read off the price surface, no adjoint mode required
    pub fn surface() -> Self {
        GreeksConfig::DELTA | GreeksConfig::GAMMA | GreeksConfig::THETA
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExerciseType {
    European,
    American,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalculationType {
    CallOnly,
    PutOnly,
    All,
}

/// Discretisation knobs for the spatial and temporal meshes
#[derive(Debug, Clone)]
pub struct FdSettings {
    pub grid_type: GridType,
    /// `k` in the default bounds `S·exp(±kσ√T)`
    pub bounds_multiplier: f64,
    /// Explicit `(lower, upper)` grid bounds overriding the default policy
    pub explicit_bounds: Option<(f64, f64)>,
    /// Sub-steps per interval when a step brackets a discrete dividend
    pub refinement_factor: usize,
}

impl Default for FdSettings {
    fn default() -> Self {
        FdSettings {
            grid_type: GridType::Adaptive,
            bounds_multiplier: 6.0,
            explicit_bounds: None,
            refinement_factor: 4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PricerSettings {
    pub exercise_type: ExerciseType,
    pub calculation_type: CalculationType,
    pub solver_type: SolverType,
    pub greeks: GreeksConfig,
    pub fd: FdSettings,
}

impl Default for PricerSettings {
    fn default() -> Self {
        PricerSettings {
            exercise_type: ExerciseType::European,
            calculation_type: CalculationType::All,
            solver_type: SolverType::CrankNicolson,
            greeks: GreeksConfig::surface(),
            fd: FdSettings::default(),
        }
    }
}

impl PricerSettings {
    pub fn validate(&self) -> FdResult<()> {
        if !(self.fd.bounds_multiplier.is_finite() && self.fd.bounds_multiplier > 0.0) {
            return Err(FdError::InvalidConfiguration {
                field: "fd.bounds_multiplier".to_string(),
                reason: "must be positive and finite".to_string(),
            });
        }
        if self.fd.refinement_factor == 0 {
            return Err(FdError::InvalidConfiguration {
                field: "fd.refinement_factor".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

/// Early-exercise handler, selected once at construction
type ExerciseFn = fn(&Grid, f64, &mut PayoffData);

fn exercise_none(_grid: &Grid, _strike: f64, _data: &mut PayoffData) {}

fn exercise_call_constraint(grid: &Grid, strike: f64, data: &mut PayoffData) {
    let pivot = grid.pivot();
    let track_vega = !data.vega.is_empty();
    let track_rho = !data.rho_borrow.is_empty();
    for i in 0..grid.size() {
        let intrinsic = (grid.get(i) - strike).max(0.0);
        if intrinsic > data.payoff[i] {
            data.payoff[i] = intrinsic;
            if track_vega {
                data.vega[i] = 0.0;
            }
            if track_rho {
                data.rho_borrow[i] = 0.0;
                if i == pivot {
                    data.rho = 0.0;
                    data.rho_time = 0.0;
                }
            }
        }
    }
}

fn exercise_put_constraint(grid: &Grid, strike: f64, data: &mut PayoffData) {
    let pivot = grid.pivot();
    let track_vega = !data.vega.is_empty();
    let track_rho = !data.rho_borrow.is_empty();
    for i in 0..grid.size() {
        let intrinsic = (strike - grid.get(i)).max(0.0);
        if intrinsic > data.payoff[i] {
            data.payoff[i] = intrinsic;
            if track_vega {
                data.vega[i] = 0.0;
            }
            if track_rho {
                data.rho_borrow[i] = 0.0;
                if i == pivot {
                    data.rho = 0.0;
                    data.rho_time = 0.0;
                }
            }
        }
    }
}

/// Finite-difference pricer for one option contract (both sides).
///
/// All buffers are allocated at construction; the time loop allocates only
/// when a dividend forces an operator rebuild, and the rebuild reuses the
/// existing row storage.
pub struct FdPricer<A: AdjointMode> {
    input: InputData,
    settings: PricerSettings,
    grid: Grid,
    evolution: EvolutionOperator<A>,
    call_data: PayoffData,
    put_data: PayoffData,
    cache: SolverCache,
    dt: f64,
    calculate_call: bool,
    calculate_put: bool,
    /// Call side solved without the exercise constraint
    accelerate_call: bool,
    /// Put side derived from parity instead of solved
    accelerate_put: bool,
    exercise_call: ExerciseFn,
    exercise_put: ExerciseFn,
    steps_call: usize,
    steps_put: usize,
}

impl<A: AdjointMode> FdPricer<A> {
    pub fn new(input: InputData, settings: PricerSettings) -> FdResult<Self> {
        input.validate()?;
        settings.validate()?;

        if settings.greeks.contains(GreeksConfig::VEGA) && !A::VEGA {
            return Err(FdError::InvalidConfiguration {
                field: "greeks".to_string(),
                reason: format!("vega requested but adjoint mode is {}", A::NAME),
            });
        }
        if settings
            .greeks
            .intersects(GreeksConfig::RHO | GreeksConfig::RHO_BORROW)
            && !A::RHO
        {
            return Err(FdError::InvalidConfiguration {
                field: "greeks".to_string(),
                reason: format!("rho requested but adjoint mode is {}", A::NAME),
            });
        }

        let (lower, upper) = match settings.fd.explicit_bounds {
            Some(bounds) => bounds,
            None => {
                let half_width =
                    settings.fd.bounds_multiplier * input.sigma * input.maturity.sqrt();
                (
                    input.spot * (-half_width).exp(),
                    input.spot * half_width.exp(),
                )
            }
        };
        let grid = Grid::new(input.spot, lower, upper, settings.fd.grid_type, input.n)?;

        let dt = input.maturity / input.m as f64;
        let evolution = EvolutionOperator::new(&input, &grid, settings.solver_type, dt);

        let nodes = grid.size();
        let has_dividends = !input.dividends.is_empty();
        let calculate_call = settings.calculation_type != CalculationType::PutOnly;
        let calculate_put = settings.calculation_type != CalculationType::CallOnly;

        let accelerate_put = calculate_call
            && calculate_put
            && settings.exercise_type == ExerciseType::European
            && !has_dividends;
        let accelerate_call = calculate_call
            && settings.exercise_type == ExerciseType::American
            && !has_dividends
            && input.q <= 0.0;

        let american = settings.exercise_type == ExerciseType::American;
        let exercise_call: ExerciseFn = if american && !accelerate_call {
            exercise_call_constraint
        } else {
            exercise_none
        };
        let exercise_put: ExerciseFn = if american {
            exercise_put_constraint
        } else {
            exercise_none
        };

        Ok(FdPricer {
            input,
            settings,
            grid,
            evolution,
            call_data: PayoffData::new::<A>(nodes),
            put_data: PayoffData::new::<A>(nodes),
            cache: SolverCache::new(),
            dt,
            calculate_call,
            calculate_put,
            accelerate_call,
            accelerate_put,
            exercise_call,
            exercise_put,
            steps_call: 0,
            steps_put: 0,
        })
    }

    /// Price both sides and extract the configured greeks.
    pub fn price(&mut self) -> FdResult<(OptionResult, OptionResult)> {
        self.steps_call = 0;
        self.steps_put = 0;
        self.initialise();

        let pivot = self.grid.pivot();
        let mut call_near_expiry = 0.0;
        let mut put_near_expiry = 0.0;

        for n in (1..=self.input.m).rev() {
            if n == 1 {
                // value one step away from t = 0, used for theta
                call_near_expiry = self.call_data.payoff[pivot];
                put_near_expiry = self.put_data.payoff[pivot];
            }

            // both endpoints as multiples of dt, so adjacent steps partition
            // the dividend times exactly
            let t_hi = n as f64 * self.dt;
            let t_lo = (n - 1) as f64 * self.dt;
            if self.has_dividend_in(t_lo, t_hi) {
                self.refined_step(t_lo, t_hi)?;
            } else {
                self.advance_sides(self.dt)?;
            }
        }

        let call = if self.calculate_call {
            self.extract(&self.call_data, call_near_expiry, "call")?
        } else {
            OptionResult::default()
        };
        let put = if self.calculate_put {
            if self.accelerate_put {
                self.parity_put(&call)
            } else {
                self.extract(&self.put_data, put_near_expiry, "put")?
            }
        } else {
            OptionResult::default()
        };

        Ok((call, put))
    }

    /// Backward-induction step counts for the (call, put) sides
    pub fn steps_taken(&self) -> (usize, usize) {
        (self.steps_call, self.steps_put)
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    fn solve_put_side(&self) -> bool {
        self.calculate_put && !self.accelerate_put
    }

    fn initialise(&mut self) {
        let strike = self.input.strike;
        let tau = self.dt;

        if self.calculate_call {
            self.call_data.clear();
            for i in 0..self.grid.size() {
                self.call_data.payoff[i] = (self.grid.get(i) - strike).max(0.0);
            }
            Self::smooth_cell(
                &self.grid,
                &self.input,
                &mut self.call_data,
                true,
                strike,
                0.0,
                tau,
            );
        }
        if self.solve_put_side() {
            self.put_data.clear();
            for i in 0..self.grid.size() {
                self.put_data.payoff[i] = (strike - self.grid.get(i)).max(0.0);
            }
            Self::smooth_cell(
                &self.grid,
                &self.input,
                &mut self.put_data,
                false,
                strike,
                0.0,
                tau,
            );
        }
    }

    /// Replace the payoff over the cell `[x[j], x[j+1]]` straddling
    /// `strike_image` with the closed-form value of maturity `tau`, seen
    /// from the shifted spot `x - shift`. The analytic derivatives seed the
    /// adjoint fields at the same indices.
    fn smooth_cell(
        grid: &Grid,
        input: &InputData,
        data: &mut PayoffData,
        is_call: bool,
        strike_image: f64,
        shift: f64,
        tau: f64,
    ) {
        let nodes = grid.size();
        if strike_image < grid.get(0) || strike_image >= grid.get(nodes - 1) {
            return;
        }
        let j = grid
            .as_slice()
            .partition_point(|&x| x <= strike_image)
            .saturating_sub(1);
        if j + 1 >= nodes {
            return;
        }

        let strike = input.strike;
        let r = input.r;
        let b = input.carry();
        let sigma = input.sigma;
        let pivot = grid.pivot();
        let track_vega = !data.vega.is_empty();
        let track_rho = !data.rho_borrow.is_empty();

        for i in [j, j + 1] {
            let spot = grid.get(i) - shift;
            if spot <= 0.0 {
                continue;
            }
            let value = if is_call {
                bs_analytic::bs_call_price(spot, strike, r, b, sigma, tau)
            } else {
                bs_analytic::bs_put_price(spot, strike, r, b, sigma, tau)
            };
            data.payoff[i] = value;
            if track_vega {
                data.vega[i] = bs_analytic::bs_vega(spot, strike, r, b, sigma, tau);
            }
            if track_rho {
                data.rho_borrow[i] = if is_call {
                    bs_analytic::bs_call_rho_borrow(spot, strike, r, b, sigma, tau)
                } else {
                    bs_analytic::bs_put_rho_borrow(spot, strike, r, b, sigma, tau)
                };
                if i == pivot {
                    // fixed-b rate sensitivity of the closed-form seed
                    data.rho = -tau * value;
                    data.rho_time = tau;
                }
            }
        }
    }

    /// One evolution step of length `sub_dt` for every actively solved
    /// side: operator apply, discounting, then the exercise constraint.
    /// The evolution operator must already be composed for `sub_dt`.
    fn advance_sides(&mut self, sub_dt: f64) -> FdResult<()> {
        let df = (-self.input.r * sub_dt).exp();
        let pivot = self.grid.pivot();
        let strike = self.input.strike;

        if self.calculate_call {
            self.evolution.apply(&mut self.call_data, &mut self.cache)?;
            Self::discount(&mut self.call_data, df, sub_dt, pivot);
            (self.exercise_call)(&self.grid, strike, &mut self.call_data);
            self.steps_call += 1;
        }
        if self.solve_put_side() {
            self.evolution.apply(&mut self.put_data, &mut self.cache)?;
            Self::discount(&mut self.put_data, df, sub_dt, pivot);
            (self.exercise_put)(&self.grid, strike, &mut self.put_data);
            self.steps_put += 1;
        }
        Ok(())
    }

    /// Apply the step discount factor to the payoff and every carried
    /// sensitivity. The generator is r-independent, so the pivot rho is
    /// the discount product rule collapsed to `ρ = -τ·V` with `τ` the
    /// accumulated discount exposure.
    fn discount(data: &mut PayoffData, df: f64, sub_dt: f64, pivot: usize) {
        for v in data.payoff.iter_mut() {
            *v *= df;
        }
        for v in data.vega.iter_mut() {
            *v *= df;
        }
        let track_rho = !data.rho_borrow.is_empty();
        for v in data.rho_borrow.iter_mut() {
            *v *= df;
        }
        if track_rho {
            data.rho_time += sub_dt;
            data.rho = -data.rho_time * data.payoff[pivot];
        }
    }

    fn has_dividend_in(&self, t_lo: f64, t_hi: f64) -> bool {
        self.input
            .dividends
            .iter()
            .any(|d| d.time > t_lo && d.time <= t_hi)
    }

    /// Step across `[t_lo, t_hi]` bracketing one or more dividends:
    /// advance to each ex-date with refined sub-steps, apply the jump
    /// condition, re-smooth around the post-jump strike image, continue.
    fn refined_step(&mut self, t_lo: f64, t_hi: f64) -> FdResult<()> {
        let bracketed: Vec<Dividend> = self
            .input
            .dividends
            .iter()
            .rev()
            .filter(|d| d.time > t_lo && d.time <= t_hi)
            .cloned()
            .collect();

        let mut current_hi = t_hi;
        for dividend in bracketed {
            self.advance_refined(dividend.time, current_hi)?;
            self.apply_jump(dividend.amount);
            self.resmooth(dividend.time, dividend.amount);
            current_hi = dividend.time;
        }
        self.advance_refined(t_lo, current_hi)?;

        // restore the regular step size
        self.evolution.rebuild(self.dt);
        Ok(())
    }

    fn advance_refined(&mut self, t_target: f64, t_from: f64) -> FdResult<()> {
        let interval = t_from - t_target;
        if interval <= f64::EPSILON * self.input.maturity {
            return Ok(());
        }
        let refinement = self.settings.fd.refinement_factor;
        let sub_dt = interval / refinement as f64;
        self.evolution.rebuild(sub_dt);
        for _ in 0..refinement {
            self.advance_sides(sub_dt)?;
        }
        Ok(())
    }

    fn apply_jump(&mut self, amount: f64) {
        if self.calculate_call {
            Self::jump_side(&self.grid, &mut self.call_data, &mut self.cache, amount);
        }
        if self.solve_put_side() {
            Self::jump_side(&self.grid, &mut self.put_data, &mut self.cache, amount);
        }
    }

    /// `V(x, t⁻) = V(x - d, t⁺)` by linear interpolation; the jump is
    /// linear in the state so the adjoint vectors transform identically.
    fn jump_side(grid: &Grid, data: &mut PayoffData, cache: &mut SolverCache, amount: f64) {
        Self::jump_field(grid, &mut data.payoff, &mut cache.tmp, amount);
        if !data.vega.is_empty() {
            Self::jump_field(grid, &mut data.vega, &mut cache.tmp, amount);
        }
        if !data.rho_borrow.is_empty() {
            Self::jump_field(grid, &mut data.rho_borrow, &mut cache.tmp, amount);
        }
    }

    fn jump_field(grid: &Grid, field: &mut [f64], tmp: &mut Vec<f64>, amount: f64) {
        let nodes = grid.size();
        if tmp.len() != nodes {
            tmp.resize(nodes, 0.0);
        }
        tmp.copy_from_slice(field);
        for i in 0..nodes {
            field[i] = Self::interpolate(grid, tmp, grid.get(i) - amount);
        }
    }

    /// Piecewise-linear read of a grid-shaped field, clamped to the
    /// boundary values outside `[lb, ub]`.
    fn interpolate(grid: &Grid, values: &[f64], target: f64) -> f64 {
        let nodes = grid.size();
        if target <= grid.get(0) {
            return values[0];
        }
        if target >= grid.get(nodes - 1) {
            return values[nodes - 1];
        }
        let j = grid.as_slice().partition_point(|&x| x <= target) - 1;
        let x_lo = grid.get(j);
        let x_hi = grid.get(j + 1);
        let weight = (target - x_lo) / (x_hi - x_lo);
        values[j] + weight * (values[j + 1] - values[j])
    }

    fn resmooth(&mut self, dividend_time: f64, amount: f64) {
        let tau = self.input.maturity - dividend_time;
        let strike_image = self.input.strike + amount;
        if self.calculate_call {
            Self::smooth_cell(
                &self.grid,
                &self.input,
                &mut self.call_data,
                true,
                strike_image,
                amount,
                tau,
            );
        }
        if self.solve_put_side() {
            Self::smooth_cell(
                &self.grid,
                &self.input,
                &mut self.put_data,
                false,
                strike_image,
                amount,
                tau,
            );
        }
    }

    /// Read price and greeks at the pivot from the time-zero slice.
    fn extract(&self, data: &PayoffData, near_expiry: f64, side: &str) -> FdResult<OptionResult> {
        let i = self.grid.pivot();
        if i == 0 || i + 1 >= self.grid.size() {
            return Err(FdError::InvalidState {
                context: "FdPricer::extract".to_string(),
                reason: format!("pivot node {} sits on the grid boundary", i),
            });
        }

        let flags = self.settings.greeks;
        let mut out = OptionResult {
            price: data.payoff[i],
            ..OptionResult::default()
        };

        let x_minus = self.grid.get(i - 1);
        let x_zero = self.grid.get(i);
        let x_plus = self.grid.get(i + 1);

        if flags.contains(GreeksConfig::DELTA) {
            out.delta = (data.payoff[i + 1] - data.payoff[i - 1]) / (x_plus - x_minus);
        }
        if flags.contains(GreeksConfig::GAMMA) {
            // non-uniform three-point second derivative
            let h_minus = x_zero - x_minus;
            let h_plus = x_plus - x_zero;
            out.gamma = 2.0 * data.payoff[i - 1] / (h_minus * (h_minus + h_plus))
                - 2.0 * data.payoff[i] / (h_minus * h_plus)
                + 2.0 * data.payoff[i + 1] / (h_plus * (h_minus + h_plus));
        }
        if flags.contains(GreeksConfig::THETA) {
            out.theta = (near_expiry - data.payoff[i]) / self.dt;
        }
        if A::VEGA && flags.contains(GreeksConfig::VEGA) {
            out.vega = data.vega[i];
        }
        if A::RHO {
            if flags.contains(GreeksConfig::RHO_BORROW) {
                out.rho_borrow = data.rho_borrow[i];
            }
            if flags.contains(GreeksConfig::RHO) {
                // b = r - q moves one-for-one with r at fixed q
                out.rho = data.rho + data.rho_borrow[i];
            }
        }

        for (name, value) in [
            ("price", out.price),
            ("delta", out.delta),
            ("gamma", out.gamma),
            ("theta", out.theta),
            ("vega", out.vega),
            ("rho", out.rho),
            ("rho_borrow", out.rho_borrow),
        ] {
            if !value.is_finite() {
                return Err(FdError::NumericalInstability {
                    method: "FdPricer::price".to_string(),
                    reason: format!("{} {} is not finite: {}", side, name, value),
                });
            }
        }
        Ok(out)
    }

    /// Derive the put side from European put-call parity:
    /// `P = C - S·e^((b-r)T) + K·e^(-rT)`, differentiated per greek.
    fn parity_put(&self, call: &OptionResult) -> OptionResult {
        let s = self.input.spot;
        let k = self.input.strike;
        let t = self.input.maturity;
        let r = self.input.r;
        let b = self.input.carry();
        let carry_df = ((b - r) * t).exp();
        let strike_df = (-r * t).exp();

        let flags = self.settings.greeks;
        let mut put = OptionResult {
            price: call.price - s * carry_df + k * strike_df,
            ..OptionResult::default()
        };
        if flags.contains(GreeksConfig::DELTA) {
            put.delta = call.delta - carry_df;
        }
        if flags.contains(GreeksConfig::GAMMA) {
            put.gamma = call.gamma;
        }
        if flags.contains(GreeksConfig::THETA) {
            put.theta = call.theta + (b - r) * s * carry_df + r * k * strike_df;
        }
        if flags.contains(GreeksConfig::VEGA) {
            put.vega = call.vega;
        }
        if flags.contains(GreeksConfig::RHO) {
            put.rho = call.rho - k * t * strike_df;
        }
        if flags.contains(GreeksConfig::RHO_BORROW) {
            put.rho_borrow = call.rho_borrow - s * t * carry_df;
        }
        put
    }
}

/// Price a batch of inputs under one settings block, one independent
/// pricer per input. Each pricer owns its state, so the fan-out is
/// embarrassingly parallel.
pub fn price_batch<A: AdjointMode>(
    inputs: &[InputData],
    settings: &PricerSettings,
) -> FdResult<Vec<(OptionResult, OptionResult)>> {
    inputs
        .par_iter()
        .map(|input| FdPricer::<A>::new(input.clone(), settings.clone())?.price())
        .collect()
}
