// tests/greeks_test.rs
use fast_pde::analytics::bs_analytic;
use fast_pde::{
    ExerciseType, FdPricer, FullAdjoint, GreeksConfig, InputData, NoAdjoint, PricerSettings,
    VegaAdjoint,
};

fn scenario_input() -> InputData {
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

fn vega_settings() -> PricerSettings {
    let mut settings = PricerSettings::default();
    settings.greeks = GreeksConfig::surface() | GreeksConfig::VEGA;
    settings
}

fn full_settings() -> PricerSettings {
    let mut settings = PricerSettings::default();
    settings.greeks = GreeksConfig::all();
    settings
}

#[test]
fn test_fd_delta_gamma_vs_analytic() {
    let input = scenario_input();
    let mut pricer =
        FdPricer::<NoAdjoint>::new(input.clone(), PricerSettings::default()).unwrap();
    let (call, put) = pricer.price().unwrap();

    let analytic_call_delta = bs_analytic::bs_call_delta(
        input.spot,
        input.strike,
        input.r,
        input.r,
        input.sigma,
        input.maturity,
    );
    let analytic_put_delta = bs_analytic::bs_put_delta(
        input.spot,
        input.strike,
        input.r,
        input.r,
        input.sigma,
        input.maturity,
    );
    let analytic_gamma = bs_analytic::bs_gamma(
        input.spot,
        input.strike,
        input.r,
        input.r,
        input.sigma,
        input.maturity,
    );

    println!("\nFD delta: {} vs analytic {}", call.delta, analytic_call_delta);
    println!("FD gamma: {} vs analytic {}", call.gamma, analytic_gamma);

    assert!(
        (call.delta - analytic_call_delta).abs() < 5e-3,
        "call delta error {}",
        (call.delta - analytic_call_delta).abs()
    );
    assert!(
        (put.delta - analytic_put_delta).abs() < 5e-3,
        "put delta error {}",
        (put.delta - analytic_put_delta).abs()
    );
    assert!(
        (call.gamma - analytic_gamma).abs() < 5e-4,
        "gamma error {}",
        (call.gamma - analytic_gamma).abs()
    );
}

#[test]
fn test_fd_theta_vs_analytic() {
    let input = scenario_input();
    let mut pricer =
        FdPricer::<NoAdjoint>::new(input.clone(), PricerSettings::default()).unwrap();
    let (call, put) = pricer.price().unwrap();

    let analytic_call_theta = bs_analytic::bs_call_theta(
        input.spot,
        input.strike,
        input.r,
        input.r,
        input.sigma,
        input.maturity,
    );
    let analytic_put_theta = bs_analytic::bs_put_theta(
        input.spot,
        input.strike,
        input.r,
        input.r,
        input.sigma,
        input.maturity,
    );

    println!("\nFD call theta: {} vs analytic {}", call.theta, analytic_call_theta);

    assert!(
        (call.theta - analytic_call_theta).abs() < 0.05,
        "call theta error {}",
        (call.theta - analytic_call_theta).abs()
    );
    assert!(
        (put.theta - analytic_put_theta).abs() < 0.05,
        "put theta error {}",
        (put.theta - analytic_put_theta).abs()
    );
}

#[test]
fn test_aad_vega_vs_analytic() {
    // Out-of-the-money strike exercises the smoothing away from the pivot
    let input = InputData {
        strike: 90.0,
        ..scenario_input()
    };
    let mut pricer = FdPricer::<VegaAdjoint>::new(input.clone(), vega_settings()).unwrap();
    let (call, put) = pricer.price().unwrap();

    let analytic_vega = bs_analytic::bs_vega(
        input.spot,
        input.strike,
        input.r,
        input.r,
        input.sigma,
        input.maturity,
    );

    println!("\nAAD vega: {} vs analytic {}", call.vega, analytic_vega);

    assert!(
        (call.vega - analytic_vega).abs() < 0.25,
        "AAD call vega {} strayed from analytic {}",
        call.vega,
        analytic_vega
    );
    assert_eq!(
        call.vega, put.vega,
        "European vega is the same for both sides"
    );
}

#[test]
fn test_aad_vega_vs_central_bump() {
    // Pin the grid bounds so the bump re-prices on the identical mesh
    let input = scenario_input();
    let mut settings = vega_settings();
    settings.fd.explicit_bounds = Some((30.0, 330.0));

    let mut pricer = FdPricer::<VegaAdjoint>::new(input.clone(), settings.clone()).unwrap();
    let (call, _) = pricer.price().unwrap();

    let eps = 1e-3;
    let mut bumped = PricerSettings::default();
    bumped.fd.explicit_bounds = Some((30.0, 330.0));

    let mut up = input.clone();
    up.sigma += eps;
    let (call_up, _) = FdPricer::<NoAdjoint>::new(up, bumped.clone())
        .unwrap()
        .price()
        .unwrap();
    let mut down = input.clone();
    down.sigma -= eps;
    let (call_down, _) = FdPricer::<NoAdjoint>::new(down, bumped)
        .unwrap()
        .price()
        .unwrap();

    let bump_vega = (call_up.price - call_down.price) / (2.0 * eps);
    let rel_error = (call.vega - bump_vega).abs() / bump_vega;

    println!("\nAAD vega: {}", call.vega);
    println!("Bump vega: {}", bump_vega);
    println!("Relative error: {}", rel_error);

    assert!(
        rel_error < 0.01,
        "AAD vega should track the central bump to 1%: {}",
        rel_error
    );
}

#[test]
fn test_aad_rho_vs_analytic() {
    let input = scenario_input();
    let mut pricer = FdPricer::<FullAdjoint>::new(input.clone(), full_settings()).unwrap();
    let (call, put) = pricer.price().unwrap();

    let analytic_rho = bs_analytic::bs_call_rho(
        input.spot,
        input.strike,
        input.r,
        input.r,
        input.sigma,
        input.maturity,
    );
    let analytic_rho_borrow = bs_analytic::bs_call_rho_borrow(
        input.spot,
        input.strike,
        input.r,
        input.r,
        input.sigma,
        input.maturity,
    );
    let analytic_put_rho_borrow = bs_analytic::bs_put_rho_borrow(
        input.spot,
        input.strike,
        input.r,
        input.r,
        input.sigma,
        input.maturity,
    );

    println!("\nAAD rho: {} vs analytic {}", call.rho, analytic_rho);
    println!(
        "AAD rho-borrow: {} vs analytic {}",
        call.rho_borrow, analytic_rho_borrow
    );

    assert!(
        (call.rho - analytic_rho).abs() < 0.5,
        "AAD call rho {} strayed from analytic {}",
        call.rho,
        analytic_rho
    );
    assert!(
        (call.rho_borrow - analytic_rho_borrow).abs() < 0.5,
        "AAD call rho-borrow {} strayed from analytic {}",
        call.rho_borrow,
        analytic_rho_borrow
    );
    assert!(
        (put.rho_borrow - analytic_put_rho_borrow).abs() < 0.5,
        "parity put rho-borrow {} strayed from analytic {}",
        put.rho_borrow,
        analytic_put_rho_borrow
    );
}

#[test]
fn test_aad_rho_borrow_vs_central_bump() {
    // The carry bump moves q only, so the default grid is unchanged
    let input = InputData {
        q: 0.02,
        ..scenario_input()
    };
    let mut pricer = FdPricer::<FullAdjoint>::new(input.clone(), full_settings()).unwrap();
    let (call, _) = pricer.price().unwrap();

    let eps = 1e-3;
    let mut up = input.clone();
    up.q -= eps; // b = r - q
    let (call_up, _) = FdPricer::<NoAdjoint>::new(up, PricerSettings::default())
        .unwrap()
        .price()
        .unwrap();
    let mut down = input.clone();
    down.q += eps;
    let (call_down, _) = FdPricer::<NoAdjoint>::new(down, PricerSettings::default())
        .unwrap()
        .price()
        .unwrap();

    let bump_rho_borrow = (call_up.price - call_down.price) / (2.0 * eps);
    let rel_error = (call.rho_borrow - bump_rho_borrow).abs() / bump_rho_borrow.abs();

    println!("\nAAD rho-borrow: {}", call.rho_borrow);
    println!("Bump rho-borrow: {}", bump_rho_borrow);
    println!("Relative error: {}", rel_error);

    assert!(
        rel_error < 0.01,
        "AAD rho-borrow should track the central bump to 1%: {}",
        rel_error
    );
}

#[test]
fn test_exercised_region_loses_sensitivity() {
    // Deep in-the-money American put: the pivot sits in the exercise
    // region, so the option behaves as its intrinsic there
    let input = InputData {
        spot: 60.0,
        strike: 100.0,
        ..scenario_input()
    };
    let mut settings = vega_settings();
    settings.exercise_type = ExerciseType::American;

    let mut pricer = FdPricer::<VegaAdjoint>::new(input.clone(), settings).unwrap();
    let (_, put) = pricer.price().unwrap();

    println!("\nDeep ITM American put: {}", put.price);
    println!("Vega at pivot: {}", put.vega);

    assert!(
        (put.price - 40.0).abs() < 1e-6,
        "deep ITM American put {} should sit on its intrinsic 40",
        put.price
    );
    assert!(
        put.vega.abs() < 1e-6,
        "exercised node must carry no vega, got {}",
        put.vega
    );
    assert!(
        (put.delta + 1.0).abs() < 2e-2,
        "deep ITM American put delta {} should be close to -1",
        put.delta
    );
}

#[test]
fn test_vega_is_positive_across_strikes() {
    for strike in [80.0, 95.0, 100.0, 105.0, 120.0] {
        let input = InputData {
            strike,
            ..scenario_input()
        };
        let mut pricer = FdPricer::<VegaAdjoint>::new(input, vega_settings()).unwrap();
        let (call, put) = pricer.price().unwrap();
        assert!(call.vega > 0.0, "call vega at strike {}: {}", strike, call.vega);
        assert!(put.vega > 0.0, "put vega at strike {}: {}", strike, put.vega);
    }
}
