// scripts/benchmark.rs
use fast_pde::math_utils::Timer;
use fast_pde::output::write_summary_to_csv;
use fast_pde::{
    price_batch, FdPricer, FullAdjoint, GreeksConfig, InputData, NoAdjoint, PricerSettings,
};
use std::env;

fn scenario(n: usize, m: usize) -> InputData {
    InputData {
        spot: 100.0,
        strike: 100.0,
        maturity: 1.0,
        sigma: 0.2,
        r: 0.05,
        q: 0.0,
        n,
        m,
        dividends: Vec::new(),
    }
}

fn bench_price_only(n: usize, m: usize, repeats: usize) -> (f64, f64) {
    let settings = PricerSettings::default();
    let mut last_price = 0.0;
    let timer = Timer::new();
    for _ in 0..repeats {
        let mut pricer = FdPricer::<NoAdjoint>::new(scenario(n, m), settings.clone())
            .expect("Valid configuration");
        let (call, _) = pricer.price().expect("Bounded computation");
        last_price = call.price;
    }
    (timer.elapsed_ms() / repeats as f64, last_price)
}

fn bench_full_greeks(n: usize, m: usize, repeats: usize) -> (f64, f64) {
    let mut settings = PricerSettings::default();
    settings.greeks = GreeksConfig::all();
    let mut last_vega = 0.0;
    let timer = Timer::new();
    for _ in 0..repeats {
        let mut pricer = FdPricer::<FullAdjoint>::new(scenario(n, m), settings.clone())
            .expect("Valid configuration");
        let (call, _) = pricer.price().expect("Bounded computation");
        last_vega = call.vega;
    }
    (timer.elapsed_ms() / repeats as f64, last_vega)
}

fn bench_batch(size: usize, n: usize, m: usize) -> f64 {
    let inputs: Vec<InputData> = (0..size)
        .map(|i| InputData {
            strike: 80.0 + (i as f64) * 40.0 / size as f64,
            ..scenario(n, m)
        })
        .collect();
    let settings = PricerSettings::default();
    let timer = Timer::new();
    let results = price_batch::<NoAdjoint>(&inputs, &settings).expect("Valid batch");
    assert_eq!(results.len(), size);
    timer.elapsed_ms()
}

fn main() {
    let args: Vec<String> = env::args().collect();
    let repeats: usize = args
        .get(1)
        .and_then(|v| v.parse().ok())
        .unwrap_or(20);

    println!("fast-pde benchmark ({} repeats per cell)", repeats);
    println!(
        "{:>6} {:>6} {:>14} {:>14} {:>12} {:>12}",
        "N", "M", "price-only ms", "all-greeks ms", "call", "vega"
    );

    let mut summary: Vec<(String, String)> = Vec::new();
    for (n, m) in [(100, 100), (200, 200), (400, 400), (800, 400)] {
        let (price_ms, call) = bench_price_only(n, m, repeats);
        let (greeks_ms, vega) = bench_full_greeks(n, m, repeats);
        println!(
            "{:>6} {:>6} {:>14.3} {:>14.3} {:>12.4} {:>12.4}",
            n, m, price_ms, greeks_ms, call, vega
        );
        summary.push((format!("price_ms_{}x{}", n, m), format!("{:.4}", price_ms)));
        summary.push((format!("greeks_ms_{}x{}", n, m), format!("{:.4}", greeks_ms)));
    }

    let batch_size = 256;
    let batch_ms = bench_batch(batch_size, 200, 200);
    println!(
        "\nbatch of {} contracts (200x200, rayon): {:.1} ms total, {:.3} ms/contract",
        batch_size,
        batch_ms,
        batch_ms / batch_size as f64
    );
    summary.push(("batch_ms_total".to_string(), format!("{:.2}", batch_ms)));

    let rows: Vec<(&str, &str)> = summary
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();
    if let Err(e) = write_summary_to_csv("benchmark_summary.csv", &rows) {
        eprintln!("could not write benchmark_summary.csv: {}", e);
    }
}
