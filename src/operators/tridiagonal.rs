// src/operators/tridiagonal.rs
//! Tridiagonal space discretisation of the Black-Scholes generator
//!
//! # Mathematical Foundation
//!
//! The spatial operator of the pricing PDE is
//! ```text
//! L = ½σ²x²∂ₓₓ + bx∂ₓ
//! ```
//! discretised on a non-uniform grid with the standard three-point stencil.
//! For interior node `i` with `Δ₊ = x[i+1]-x[i]`, `Δ₋ = x[i]-x[i-1]`,
//! `Δ = Δ₊+Δ₋`, drift `μᵢ = b·x[i]` and diffusion `σᵢ² = σ²·x[i]²`:
//! ```text
//! A[i].minus = (-Δ₊·μᵢ + σᵢ²) / (Δ₋·Δ)
//! A[i].plus  = ( Δ₋·μᵢ + σᵢ²) / (Δ₊·Δ)
//! A[i].zero  = -A[i].minus - A[i].plus
//! ```
//! Boundary rows impose the zero-drift, vanishing-second-order condition so
//! the discrete operator has no outward flux.
//!
//! # Adjoint propagation
//!
//! Alongside `A` the operator can hold its parameter derivatives
//! `Aᵥ = ∂A/∂σ` (diffusion part, σ² → 2σ) and `A_b = ∂A/∂b` (drift part).
//! `dot` and `solve` then advance the sensitivity vectors by the product
//! rule:
//! ```text
//! x ← A·x      implies   dx ← J·x + A·dx     (read x before updating it)
//! A·x' = x     implies   A·dx' = dx - J·x'   (solve x first, then dx)
//! ```
//! Getting either order wrong produces silently wrong greeks, so both
//! methods are written against the pre/post-update payoff explicitly.

use crate::error::{FdError, FdResult};
use crate::grid::Grid;
use crate::input::InputData;
use crate::pricer::adjoint::AdjointMode;
use crate::pricer::payoff_data::{PayoffData, SolverCache};
use std::marker::PhantomData;

/// Position of a coefficient within a row stencil
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coefficient {
    Minus,
    Zero,
    Plus,
}

/// One row of a tridiagonal matrix: the `(-, 0, +)` stencil weights
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TridiagonalRow {
    pub minus: f64,
    pub zero: f64,
    pub plus: f64,
}

impl TridiagonalRow {
    pub fn get(&self, c: Coefficient) -> f64 {
        match c {
            Coefficient::Minus => self.minus,
            Coefficient::Zero => self.zero,
            Coefficient::Plus => self.plus,
        }
    }
}

/// Plain tridiagonal matrix storage with in-place apply and Thomas solve
#[derive(Debug, Clone, Default)]
pub struct TridiagonalMatrix {
    rows: Vec<TridiagonalRow>,
}

impl TridiagonalMatrix {
    pub fn zeros(nodes: usize) -> Self {
        TridiagonalMatrix {
            rows: vec![TridiagonalRow::default(); nodes],
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn row(&self, i: usize) -> &TridiagonalRow {
        &self.rows[i]
    }

    pub fn row_mut(&mut self, i: usize) -> &mut TridiagonalRow {
        &mut self.rows[i]
    }

    /// Overwrite this matrix with `other`, reusing the row storage.
    pub fn copy_from(&mut self, other: &Self) {
        self.rows.clone_from(&other.rows);
    }

    /// `x ← M·x`, carrying the pre-update left neighbour in a scalar so no
    /// extra buffer is needed.
    pub fn apply_in_place(&self, x: &mut [f64]) {
        let n = self.rows.len();
        let mut prev = x[0];
        x[0] = self.rows[0].zero * prev + self.rows[0].plus * x[1];
        for i in 1..n - 1 {
            let current = x[i];
            x[i] = self.rows[i].minus * prev + self.rows[i].zero * current
                + self.rows[i].plus * x[i + 1];
            prev = current;
        }
        let last = x[n - 1];
        x[n - 1] = self.rows[n - 1].minus * prev + self.rows[n - 1].zero * last;
    }

    /// `out ← out + M·x`
    pub fn accumulate_product(&self, x: &[f64], out: &mut [f64]) {
        let n = self.rows.len();
        out[0] += self.rows[0].zero * x[0] + self.rows[0].plus * x[1];
        for i in 1..n - 1 {
            out[i] += self.rows[i].minus * x[i - 1] + self.rows[i].zero * x[i]
                + self.rows[i].plus * x[i + 1];
        }
        out[n - 1] += self.rows[n - 1].minus * x[n - 2] + self.rows[n - 1].zero * x[n - 1];
    }

    /// `out ← out - M·x`
    pub fn subtract_product(&self, x: &[f64], out: &mut [f64]) {
        let n = self.rows.len();
        out[0] -= self.rows[0].zero * x[0] + self.rows[0].plus * x[1];
        for i in 1..n - 1 {
            out[i] -= self.rows[i].minus * x[i - 1] + self.rows[i].zero * x[i]
                + self.rows[i].plus * x[i + 1];
        }
        out[n - 1] -= self.rows[n - 1].minus * x[n - 2] + self.rows[n - 1].zero * x[n - 1];
    }

    /// Thomas algorithm: `x ← M⁻¹·x` in place.
    ///
    /// Non-pivoting three-sweep LU; the eliminated superdiagonal lives in
    /// `sup`, which is sized lazily on first use and reused afterwards.
    pub fn solve_in_place(&self, x: &mut [f64], sup: &mut Vec<f64>) -> FdResult<()> {
        let n = self.rows.len();
        if sup.len() != n {
            sup.resize(n, 0.0);
        }

        let mut pivot = self.rows[0].zero;
        if pivot == 0.0 {
            return Err(FdError::NumericalInstability {
                method: "Thomas solve".to_string(),
                reason: "zero pivot in row 0".to_string(),
            });
        }
        sup[0] = self.rows[0].plus / pivot;
        x[0] /= pivot;

        for i in 1..n {
            pivot = self.rows[i].zero - self.rows[i].minus * sup[i - 1];
            if pivot == 0.0 {
                return Err(FdError::NumericalInstability {
                    method: "Thomas solve".to_string(),
                    reason: format!("zero pivot in row {}", i),
                });
            }
            sup[i] = self.rows[i].plus / pivot;
            x[i] = (x[i] - self.rows[i].minus * x[i - 1]) / pivot;
        }

        for i in (0..n - 1).rev() {
            x[i] -= sup[i] * x[i + 1];
        }
        Ok(())
    }
}

/// Space discretisation of the generator, optionally paired with its
/// volatility and cost-of-carry derivative matrices.
///
/// The adjoint matrices exist only for modes that enable them; the
/// corresponding branches in `dot`/`solve` are const-folded away otherwise.
#[derive(Debug, Clone)]
pub struct TridiagonalOperator<A: AdjointMode> {
    matrix: TridiagonalMatrix,
    vega_matrix: TridiagonalMatrix,
    carry_matrix: TridiagonalMatrix,
    _mode: PhantomData<A>,
}

impl<A: AdjointMode> TridiagonalOperator<A> {
    /// Discretise `L = ½σ²x²∂ₓₓ + bx∂ₓ` (and its σ/b derivatives per the
    /// adjoint mode) on `grid`.
    pub fn make(input: &InputData, grid: &Grid) -> Self {
        let nodes = grid.size();
        let sigma = input.sigma;
        let sigma2 = sigma * sigma;
        let b = input.carry();

        let mut matrix = TridiagonalMatrix::zeros(nodes);
        let mut vega_matrix = if A::VEGA {
            TridiagonalMatrix::zeros(nodes)
        } else {
            TridiagonalMatrix::default()
        };
        let mut carry_matrix = if A::RHO {
            TridiagonalMatrix::zeros(nodes)
        } else {
            TridiagonalMatrix::default()
        };

        for i in 1..nodes - 1 {
            let x = grid.get(i);
            let dx_plus = grid.get(i + 1) - x;
            let dx_minus = x - grid.get(i - 1);
            let dx = dx_plus + dx_minus;
            let drift = b * x;
            let diffusion = sigma2 * x * x;

            let row = matrix.row_mut(i);
            row.minus = (-dx_plus * drift + diffusion) / (dx_minus * dx);
            row.plus = (dx_minus * drift + diffusion) / (dx_plus * dx);
            row.zero = -row.minus - row.plus;

            if A::VEGA {
                // ∂/∂σ hits the diffusion only: σ² → 2σ
                let diffusion_dsigma = 2.0 * sigma * x * x;
                let row = vega_matrix.row_mut(i);
                row.minus = diffusion_dsigma / (dx_minus * dx);
                row.plus = diffusion_dsigma / (dx_plus * dx);
                row.zero = -row.minus - row.plus;
            }
            if A::RHO {
                // ∂/∂b hits the drift only
                let row = carry_matrix.row_mut(i);
                row.minus = -dx_plus * x / (dx_minus * dx);
                row.plus = dx_minus * x / (dx_plus * dx);
                row.zero = -row.minus - row.plus;
            }
        }

        // Zero-drift boundary rows: two-point stencils, no outward flux
        {
            let x = grid.get(0);
            let dx = grid.get(1) - x;
            let diffusion = sigma2 * x * x / (dx * dx);
            let row = matrix.row_mut(0);
            row.minus = 0.0;
            row.zero = -diffusion;
            row.plus = diffusion;
            if A::VEGA {
                let diffusion_dsigma = 2.0 * sigma * x * x / (dx * dx);
                let row = vega_matrix.row_mut(0);
                row.zero = -diffusion_dsigma;
                row.plus = diffusion_dsigma;
            }
        }
        {
            let last = nodes - 1;
            let x = grid.get(last);
            let dx = x - grid.get(last - 1);
            let diffusion = sigma2 * x * x / (dx * dx);
            let row = matrix.row_mut(last);
            row.plus = 0.0;
            row.zero = -diffusion;
            row.minus = diffusion;
            if A::VEGA {
                let diffusion_dsigma = 2.0 * sigma * x * x / (dx * dx);
                let row = vega_matrix.row_mut(last);
                row.zero = -diffusion_dsigma;
                row.minus = diffusion_dsigma;
            }
        }

        TridiagonalOperator {
            matrix,
            vega_matrix,
            carry_matrix,
            _mode: PhantomData,
        }
    }

    pub fn len(&self) -> usize {
        self.matrix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matrix.is_empty()
    }

    pub fn matrix(&self) -> &TridiagonalMatrix {
        &self.matrix
    }

    /// Overwrite this operator with `other`, reusing all row storage.
    pub fn copy_from(&mut self, other: &Self) {
        self.matrix.copy_from(&other.matrix);
        self.vega_matrix.copy_from(&other.vega_matrix);
        self.carry_matrix.copy_from(&other.carry_matrix);
    }

    /// In-place affine composition `A ← α·I + β·A`.
    ///
    /// The adjoint matrices are derivatives of `A`, not of the identity, so
    /// they pick up the factor `β` only. This is what lets the evolution
    /// operator carry its own σ/b derivatives for free.
    pub fn add(&mut self, alpha: f64, beta: f64) {
        for i in 0..self.matrix.len() {
            let row = self.matrix.row_mut(i);
            row.minus *= beta;
            row.plus *= beta;
            row.zero = alpha + beta * row.zero;
        }
        for m in [&mut self.vega_matrix, &mut self.carry_matrix] {
            for i in 0..m.len() {
                let row = m.row_mut(i);
                row.minus *= beta;
                row.plus *= beta;
                row.zero *= beta;
            }
        }
    }

    fn check_shapes(&self, data: &PayoffData, context: &str) -> FdResult<()> {
        let n = self.matrix.len();
        if data.payoff.len() != n
            || (A::VEGA && data.vega.len() != n)
            || (A::RHO && data.rho_borrow.len() != n)
        {
            return Err(FdError::InvalidState {
                context: context.to_string(),
                reason: format!(
                    "payoff length {} (vega {}, rho_borrow {}) does not match operator size {}",
                    data.payoff.len(),
                    data.vega.len(),
                    data.rho_borrow.len(),
                    n
                ),
            });
        }
        Ok(())
    }

    /// `payoff ← A·payoff` with AAD side effects.
    ///
    /// The sensitivity updates `s ← A·s + J·payoff` read the payoff before
    /// it is overwritten; the payoff update comes last.
    pub fn dot(&self, data: &mut PayoffData) -> FdResult<()> {
        self.check_shapes(data, "TridiagonalOperator::dot")?;

        if A::VEGA {
            self.matrix.apply_in_place(&mut data.vega);
            self.vega_matrix.accumulate_product(&data.payoff, &mut data.vega);
        }
        if A::RHO {
            self.matrix.apply_in_place(&mut data.rho_borrow);
            self.carry_matrix
                .accumulate_product(&data.payoff, &mut data.rho_borrow);
        }
        self.matrix.apply_in_place(&mut data.payoff);
        Ok(())
    }

    /// `payoff ← A⁻¹·payoff` with AAD side effects.
    ///
    /// The payoff solve runs first; each sensitivity is then corrected with
    /// the post-solve payoff (`s ← A⁻¹(s - J·payoff)`).
    pub fn solve(&self, data: &mut PayoffData, cache: &mut SolverCache) -> FdResult<()> {
        self.check_shapes(data, "TridiagonalOperator::solve")?;

        self.matrix.solve_in_place(&mut data.payoff, &mut cache.sup)?;
        if A::VEGA {
            self.vega_matrix.subtract_product(&data.payoff, &mut data.vega);
            self.matrix.solve_in_place(&mut data.vega, &mut cache.sup)?;
        }
        if A::RHO {
            self.carry_matrix
                .subtract_product(&data.payoff, &mut data.rho_borrow);
            self.matrix
                .solve_in_place(&mut data.rho_borrow, &mut cache.sup)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridType;
    use crate::pricer::adjoint::{FullAdjoint, NoAdjoint};

    fn test_input() -> InputData {
        InputData {
            n: 50,
            ..InputData::default()
        }
    }

    fn test_grid(input: &InputData) -> Grid {
        Grid::new(input.spot, 30.0, 330.0, GridType::Adaptive, input.n).unwrap()
    }

    #[test]
    fn test_row_coefficient_tags() {
        let row = TridiagonalRow {
            minus: -1.0,
            zero: 2.0,
            plus: -0.5,
        };
        assert_eq!(row.get(Coefficient::Minus), -1.0);
        assert_eq!(row.get(Coefficient::Zero), 2.0);
        assert_eq!(row.get(Coefficient::Plus), -0.5);
    }

    #[test]
    fn test_boundary_rows_are_two_point() {
        let input = test_input();
        let grid = test_grid(&input);
        let op = TridiagonalOperator::<NoAdjoint>::make(&input, &grid);

        assert_eq!(op.matrix().row(0).minus, 0.0);
        assert_eq!(op.matrix().row(op.len() - 1).plus, 0.0);
    }

    #[test]
    fn test_generator_annihilates_constants_in_the_interior() {
        // Row sums are zero by construction, so A·1 = 0 everywhere
        let input = test_input();
        let grid = test_grid(&input);
        let op = TridiagonalOperator::<NoAdjoint>::make(&input, &grid);

        let mut ones = vec![1.0; grid.size()];
        op.matrix().apply_in_place(&mut ones);
        for (i, v) in ones.iter().enumerate() {
            assert!(v.abs() < 1e-10, "A·1 should vanish at row {}, got {}", i, v);
        }
    }

    #[test]
    fn test_add_identity_composition() {
        let input = test_input();
        let grid = test_grid(&input);
        let mut op = TridiagonalOperator::<NoAdjoint>::make(&input, &grid);

        // (α·I + β·A)·1 = α·1 + β·A·1 = α·1
        let alpha = 1.0;
        let beta = 0.01;
        op.add(alpha, beta);
        let mut ones = vec![1.0; grid.size()];
        op.matrix().apply_in_place(&mut ones);
        for v in &ones {
            assert!((v - alpha).abs() < 1e-10, "expected {}, got {}", alpha, v);
        }
    }

    #[test]
    fn test_solve_inverts_dot() {
        let input = test_input();
        let grid = test_grid(&input);
        let mut op = TridiagonalOperator::<NoAdjoint>::make(&input, &grid);
        op.add(1.0, -0.5 * 0.005); // R-shaped operator, diagonally dominant

        let mut data = PayoffData::new::<NoAdjoint>(grid.size());
        for i in 0..grid.size() {
            data.payoff[i] = (grid.get(i) - input.strike).max(0.0);
        }
        let original = data.payoff.clone();

        let mut cache = SolverCache::new();
        op.dot(&mut data).unwrap();
        op.solve(&mut data, &mut cache).unwrap();

        for i in 0..grid.size() {
            assert!(
                (data.payoff[i] - original[i]).abs() < 1e-8,
                "solve(dot(v)) != v at node {}: {} vs {}",
                i,
                data.payoff[i],
                original[i]
            );
        }
    }

    #[test]
    fn test_shape_mismatch_is_hard_error() {
        let input = test_input();
        let grid = test_grid(&input);
        let op = TridiagonalOperator::<FullAdjoint>::make(&input, &grid);

        let mut data = PayoffData::new::<FullAdjoint>(grid.size() + 1);
        assert!(matches!(
            op.dot(&mut data),
            Err(FdError::InvalidState { .. })
        ));

        let mut cache = SolverCache::new();
        assert!(matches!(
            op.solve(&mut data, &mut cache),
            Err(FdError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_vega_matrix_is_sigma_derivative_of_generator() {
        // Bump σ and compare (A(σ+ε) - A(σ-ε)) / 2ε against Aᵥ
        let input = test_input();
        let grid = test_grid(&input);
        let eps = 1e-6;

        let op = TridiagonalOperator::<FullAdjoint>::make(&input, &grid);
        let mut up = input.clone();
        up.sigma += eps;
        let mut down = input.clone();
        down.sigma -= eps;
        let op_up = TridiagonalOperator::<NoAdjoint>::make(&up, &grid);
        let op_down = TridiagonalOperator::<NoAdjoint>::make(&down, &grid);

        for i in 0..grid.size() {
            let bumped_minus =
                (op_up.matrix().row(i).minus - op_down.matrix().row(i).minus) / (2.0 * eps);
            let bumped_plus =
                (op_up.matrix().row(i).plus - op_down.matrix().row(i).plus) / (2.0 * eps);
            assert!(
                (op.vega_matrix.row(i).minus - bumped_minus).abs() < 1e-4,
                "vega minus mismatch at row {}",
                i
            );
            assert!(
                (op.vega_matrix.row(i).plus - bumped_plus).abs() < 1e-4,
                "vega plus mismatch at row {}",
                i
            );
        }
    }

    #[test]
    fn test_carry_matrix_is_b_derivative_of_generator() {
        let input = test_input();
        let grid = test_grid(&input);
        let eps = 1e-6;

        let op = TridiagonalOperator::<FullAdjoint>::make(&input, &grid);
        let mut up = input.clone();
        up.q -= eps; // b = r - q
        let mut down = input.clone();
        down.q += eps;
        let op_up = TridiagonalOperator::<NoAdjoint>::make(&up, &grid);
        let op_down = TridiagonalOperator::<NoAdjoint>::make(&down, &grid);

        for i in 0..grid.size() {
            let bumped_minus =
                (op_up.matrix().row(i).minus - op_down.matrix().row(i).minus) / (2.0 * eps);
            assert!(
                (op.carry_matrix.row(i).minus - bumped_minus).abs() < 1e-4,
                "carry minus mismatch at row {}",
                i
            );
        }
    }
}
