// src/input.rs
use crate::error::{validation::*, FdError, FdResult};

/// A discrete cash dividend paid by the underlying.
///
/// `time` is the year fraction of the ex-dividend date, `amount` the cash
/// value paid per share. Across the ex-date the stock drops by `amount`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dividend {
    pub time: f64,
    pub amount: f64,
}

impl Dividend {
    pub fn new(time: f64, amount: f64) -> Self {
        Dividend { time, amount }
    }
}

/// Market and contract data consumed by the pricer.
///
/// The cost of carry is derived: `b = r - q`. The spatial grid has `n + 1`
/// nodes and the time axis is divided into `m` steps.
#[derive(Debug, Clone)]
pub struct InputData {
    /// Spot price of the underlying
    pub spot: f64,
    /// Strike price
    pub strike: f64,
    /// Time to expiry in year fractions
    pub maturity: f64,
    /// Volatility
    pub sigma: f64,
    /// Risk-free rate
    pub r: f64,
    /// Continuous dividend yield
    pub q: f64,
    /// Number of spatial intervals (grid has n + 1 nodes)
    pub n: usize,
    /// Number of time steps
    pub m: usize,
    /// Discrete cash dividends, ascending in time
    pub dividends: Vec<Dividend>,
}

impl InputData {
    /// Cost of carry `b = r - q`
    pub fn carry(&self) -> f64 {
        self.r - self.q
    }

    /// Validate the market data and discretisation sizes
    pub fn validate(&self) -> FdResult<()> {
        validate_positive("spot", self.spot)?;
        validate_positive("strike", self.strike)?;
        validate_positive("maturity", self.maturity)?;
        validate_positive("sigma", self.sigma)?;
        validate_finite("r", self.r)?;
        validate_finite("q", self.q)?;
        validate_intervals(self.n)?;
        validate_time_steps(self.m)?;

        let mut previous = 0.0;
        for (i, dividend) in self.dividends.iter().enumerate() {
            validate_non_negative("dividend amount", dividend.amount)?;
            if dividend.time <= 0.0 || dividend.time >= self.maturity {
                return Err(FdError::InvalidParameters {
                    parameter: format!("dividends[{}].time", i),
                    value: dividend.time,
                    constraint: format!("must lie strictly inside (0, {})", self.maturity),
                });
            }
            if dividend.time <= previous {
                return Err(FdError::InvalidConfiguration {
                    field: "dividends".to_string(),
                    reason: "schedule must be strictly ascending in time".to_string(),
                });
            }
            previous = dividend.time;
        }

        Ok(())
    }
}

impl Default for InputData {
    fn default() -> Self {
        InputData {
            spot: 100.0,
            strike: 100.0,
            maturity: 1.0,
            sigma: 0.2,
            r: 0.05,
            q: 0.0,
            n: 200,
            m: 200,
            dividends: Vec::new(),
        }
    }
}
