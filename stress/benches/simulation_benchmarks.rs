//! Benchmarks for the stress simulation pipeline
//!
//! Run with: cargo bench

use ag_stress::*;

fn main() {
    println!("=== Stress Simulation Performance Benchmarks ===\n");

    benchmark_correlation();
    benchmark_simulation();
    benchmark_aggregation();
    benchmark_end_to_end();
}

fn one_factor_correlation(loadings: &[f64]) -> Vec<Vec<f64>> {
    loadings
        .iter()
        .enumerate()
        .map(|(i, a)| {
            loadings
                .iter()
                .enumerate()
                .map(|(j, b)| if i == j { 1.0 } else { a * b })
                .collect()
        })
        .collect()
}

fn benchmark_correlation() {
    println!("## Correlation Factorization");

    let rows = one_factor_correlation(&[0.6, 0.7, -0.3, -0.5, 0.2, 0.5, 0.4, -0.4]);
    let start = std::time::Instant::now();
    for _ in 0..1000 {
        let _ = CorrelationMatrix::new(rows.clone());
    }
    let elapsed = start.elapsed();
    println!("  8x8 validate + Cholesky (1000 iterations): {:?}", elapsed);
    println!("  Average: {:?}", elapsed / 1000);

    println!();
}

fn benchmark_simulation() {
    println!("## Monte Carlo Simulation");

    let exposures = MockLinearModel::new().sensitivities().unwrap();
    let stress = ShockMapper::new()
        .map(&ScenarioLibrary::equity_crash_with_recession())
        .unwrap();
    let correlation = CorrelationMatrix::identity(exposures.num_factors());

    for parallel in [false, true] {
        let engine = MonteCarloEngine::default().with_parallel(parallel);
        let start = std::time::Instant::now();
        let _ = engine.simulate(&stress, &exposures, 10_000, 12, &correlation, Some(42));
        let elapsed = start.elapsed();
        println!(
            "  10,000 trials x 12 months (parallel = {}): {:?}",
            parallel, elapsed
        );
    }

    println!();
}

fn benchmark_aggregation() {
    println!("## Risk Aggregation");

    let exposures = MockLinearModel::new().sensitivities().unwrap();
    let stress = ShockMapper::new()
        .map(&ScenarioLibrary::severe_global_recession())
        .unwrap();
    let correlation = CorrelationMatrix::identity(exposures.num_factors());
    let dist = MonteCarloEngine::default()
        .simulate(&stress, &exposures, 10_000, 12, &correlation, Some(42))
        .unwrap();

    let aggregator = RiskAggregator::default();
    let start = std::time::Instant::now();
    for _ in 0..100 {
        let _ = aggregator.aggregate(&dist, 0.99);
    }
    let elapsed = start.elapsed();
    println!("  Aggregate 10,000 trials (100 iterations): {:?}", elapsed);
    println!("  Average: {:?}", elapsed / 100);

    println!();
}

fn benchmark_end_to_end() {
    println!("## End-to-End Runner");

    let config = StressConfig::default()
        .with_seed(42)
        .with_correlation(one_factor_correlation(&[0.6, 0.7, -0.3, -0.5, 0.2, 0.5, 0.4, -0.4]));
    let runner = StressTestRunner::from_config(config).unwrap();
    let library = ScenarioLibrary::presets();

    let start = std::time::Instant::now();
    let _ = runner.run_all(&library);
    let elapsed = start.elapsed();
    println!(
        "  {} presets x 10,000 trials: {:?}",
        library.scenarios().len(),
        elapsed
    );

    println!();
}
