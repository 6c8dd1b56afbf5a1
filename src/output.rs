// src/output.rs
use std::fs::File;
use std::io::{self, Write};

/// Price and sensitivities for one option side.
///
/// Fields not selected by the pricer's `GreeksConfig` (or not supported by
/// the active adjoint mode) are left at zero.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OptionResult {
    pub price: f64,
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
    pub rho_borrow: f64,
}

pub fn write_results_to_csv(filename: &str, results: &[(&str, OptionResult)]) -> io::Result<()> {
    let mut file = File::create(filename)?;
    writeln!(file, "label,price,delta,gamma,theta,vega,rho,rho_borrow")?;
    for (label, r) in results {
        writeln!(
            file,
            "{},{},{},{},{},{},{},{}",
            label, r.price, r.delta, r.gamma, r.theta, r.vega, r.rho, r.rho_borrow
        )?;
    }
    Ok(())
}

pub fn write_summary_to_csv(filename: &str, summary_data: &[(&str, &str)]) -> io::Result<()> {
    let mut file = File::create(filename)?;
    for (key, value) in summary_data {
        writeln!(file, "{},{}", key, value)?;
    }
    Ok(())
}
