// src/analytics/bs_analytic.rs
//! Analytical Black-Scholes formulas in cost-of-carry form
//!
//! # Mathematical Foundation
//!
//! Under the generalized Black-Scholes model the underlying follows:
//! ```text
//! dS_t = b S_t dt + σ S_t dW_t
//! ```
//! with cost of carry `b = r - q`, and discounting at the risk-free rate:
//! ```text
//! C(S,K,r,b,σ,T) = S*e^((b-r)T)*Φ(d₁) - K*e^(-rT)*Φ(d₂)
//! ```
//!
//! Where:
//! ```text
//! d₁ = [ln(S/K) + (b + σ²/2)T] / (σ√T)
//! d₂ = d₁ - σ√T
//! ```
//!
//! The finite-difference engine uses these formulas in one place only:
//! smoothing the terminal payoff over the single grid cell straddling the
//! strike, together with the analytic σ/r/b derivatives that seed the
//! adjoint fields. The remaining exports serve the tests as a reference.

use crate::math_utils::{norm_cdf, norm_pdf};

fn d1_d2(s: f64, k: f64, b: f64, sigma: f64, t: f64) -> (f64, f64) {
    let sigma_sqrt_t = sigma * t.sqrt();
    let d1 = ((s / k).ln() + (b + 0.5 * sigma * sigma) * t) / sigma_sqrt_t;
    (d1, d1 - sigma_sqrt_t)
}

/// Generalized Black-Scholes European call price
///
/// Degenerates to the discounted intrinsic value for `t ≤ 0` (the smoothing
/// step may be asked for very small maturities).
pub fn bs_call_price(s: f64, k: f64, r: f64, b: f64, sigma: f64, t: f64) -> f64 {
    if t <= 0.0 {
        return (s - k).max(0.0);
    }
    let (d1, d2) = d1_d2(s, k, b, sigma, t);
    s * ((b - r) * t).exp() * norm_cdf(d1) - k * (-r * t).exp() * norm_cdf(d2)
}

/// Generalized Black-Scholes European put price
pub fn bs_put_price(s: f64, k: f64, r: f64, b: f64, sigma: f64, t: f64) -> f64 {
    if t <= 0.0 {
        return (k - s).max(0.0);
    }
    let (d1, d2) = d1_d2(s, k, b, sigma, t);
    k * (-r * t).exp() * norm_cdf(-d2) - s * ((b - r) * t).exp() * norm_cdf(-d1)
}

/// Call Delta: `Δ = e^((b-r)T) Φ(d₁)`
pub fn bs_call_delta(s: f64, k: f64, r: f64, b: f64, sigma: f64, t: f64) -> f64 {
    let (d1, _) = d1_d2(s, k, b, sigma, t);
    ((b - r) * t).exp() * norm_cdf(d1)
}

/// Put Delta: `Δ = -e^((b-r)T) Φ(-d₁)`
pub fn bs_put_delta(s: f64, k: f64, r: f64, b: f64, sigma: f64, t: f64) -> f64 {
    let (d1, _) = d1_d2(s, k, b, sigma, t);
    -((b - r) * t).exp() * norm_cdf(-d1)
}

/// Gamma, identical for calls and puts:
/// `Γ = e^((b-r)T) φ(d₁) / (S σ √T)`
pub fn bs_gamma(s: f64, k: f64, r: f64, b: f64, sigma: f64, t: f64) -> f64 {
    let (d1, _) = d1_d2(s, k, b, sigma, t);
    ((b - r) * t).exp() * norm_pdf(d1) / (s * sigma * t.sqrt())
}

/// Vega, identical for calls and puts:
/// `ν = S e^((b-r)T) φ(d₁) √T`
pub fn bs_vega(s: f64, k: f64, r: f64, b: f64, sigma: f64, t: f64) -> f64 {
    let (d1, _) = d1_d2(s, k, b, sigma, t);
    s * ((b - r) * t).exp() * norm_pdf(d1) * t.sqrt()
}

/// Call Theta (∂V/∂t, value decay as calendar time advances):
/// `Θ = -S e^((b-r)T) φ(d₁) σ/(2√T) - (b-r) S e^((b-r)T) Φ(d₁) - r K e^(-rT) Φ(d₂)`
pub fn bs_call_theta(s: f64, k: f64, r: f64, b: f64, sigma: f64, t: f64) -> f64 {
    let (d1, d2) = d1_d2(s, k, b, sigma, t);
    let carry_discount = ((b - r) * t).exp();
    -s * carry_discount * norm_pdf(d1) * sigma / (2.0 * t.sqrt())
        - (b - r) * s * carry_discount * norm_cdf(d1)
        - r * k * (-r * t).exp() * norm_cdf(d2)
}

/// Put Theta
pub fn bs_put_theta(s: f64, k: f64, r: f64, b: f64, sigma: f64, t: f64) -> f64 {
    let (d1, d2) = d1_d2(s, k, b, sigma, t);
    let carry_discount = ((b - r) * t).exp();
    -s * carry_discount * norm_pdf(d1) * sigma / (2.0 * t.sqrt())
        + (b - r) * s * carry_discount * norm_cdf(-d1)
        + r * k * (-r * t).exp() * norm_cdf(-d2)
}

/// Call Rho at fixed dividend yield (b = r - q moves with r):
/// `ρ = K T e^(-rT) Φ(d₂)`
pub fn bs_call_rho(s: f64, k: f64, r: f64, b: f64, sigma: f64, t: f64) -> f64 {
    let (_, d2) = d1_d2(s, k, b, sigma, t);
    k * t * (-r * t).exp() * norm_cdf(d2)
}

/// Put Rho at fixed dividend yield: `ρ = -K T e^(-rT) Φ(-d₂)`
pub fn bs_put_rho(s: f64, k: f64, r: f64, b: f64, sigma: f64, t: f64) -> f64 {
    let (_, d2) = d1_d2(s, k, b, sigma, t);
    -k * t * (-r * t).exp() * norm_cdf(-d2)
}

/// Call sensitivity to the cost of carry: `∂C/∂b = T S e^((b-r)T) Φ(d₁)`
pub fn bs_call_rho_borrow(s: f64, k: f64, r: f64, b: f64, sigma: f64, t: f64) -> f64 {
    let (d1, _) = d1_d2(s, k, b, sigma, t);
    t * s * ((b - r) * t).exp() * norm_cdf(d1)
}

/// Put sensitivity to the cost of carry: `∂P/∂b = -T S e^((b-r)T) Φ(-d₁)`
pub fn bs_put_rho_borrow(s: f64, k: f64, r: f64, b: f64, sigma: f64, t: f64) -> f64 {
    let (d1, _) = d1_d2(s, k, b, sigma, t);
    -t * s * ((b - r) * t).exp() * norm_cdf(-d1)
}
