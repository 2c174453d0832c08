//! Example usage of the signal conditioning crate

use signal_conditioning::{
    despike, detrend, gaussian_kernel, mean_smooth, median_smooth, teager_kaiser,
    zscore_against_baseline, DespikeConfig, EdgePolicy, KernelSpec, Smoother, ThresholdPolicy,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Signal Conditioning Examples ===\n");

    let sample_rate = 1000.0;

    // Slow drift + oscillation + a few spikes, all deterministic
    let mut signal: Vec<f64> = (0..40)
        .map(|i| {
            let t = i as f64 / sample_rate;
            30.0 * t + (2.0 * std::f64::consts::PI * 40.0 * t).sin() + 0.2 * (i as f64 * 1.7).sin()
        })
        .collect();
    signal[12] += 25.0;
    signal[30] -= 18.0;

    println!("Original signal:");
    print_signal(&signal);

    // Example 1: Despike with a median over +/-2 samples
    println!("\n1. Despiked (|x| > 10, k=2):");
    let despiked = despike(&signal, &DespikeConfig::new(10.0, 2)?)?;
    print_signal(&despiked.series);
    println!("   replaced indices: {:?}", despiked.replaced);

    // Example 1b: Positive-only threshold leaves the negative spike
    let positive = despike(
        &signal,
        &DespikeConfig::new(10.0, 2)?.with_policy(ThresholdPolicy::Positive),
    )?;
    println!("1b. Positive-only policy replaced: {:?}", positive.replaced);

    // Example 2: Detrend with BIC order selection
    println!("\n2. Detrended (orders 0..=6):");
    let selection = detrend(&despiked.series, 6)?;
    print_signal(selection.detrended());
    println!("   selected order {}", selection.order);
    for (order, score) in &selection.bic_curve {
        println!("   BIC({}) = {:.2}", order, score);
    }

    // Example 3: Mean, median and Gaussian smoothing
    println!("\n3. Running mean (k=2):");
    print_signal(&mean_smooth(selection.detrended(), 2)?);

    println!("\n3b. Running median (k=2):");
    print_signal(&median_smooth(selection.detrended(), 2)?);

    println!("\n3c. Gaussian, FWHM 4 ms, reflected edges:");
    let mut smoother = Smoother::new(5).with_edge_policy(EdgePolicy::Reflect);
    print_signal(&smoother.gaussian_with_rate(selection.detrended(), 4.0, sample_rate)?);

    // Example 4: Kernel diagnostics
    let kernel = gaussian_kernel(&KernelSpec::new(5, 4.0)?.with_sample_rate(sample_rate)?)?;
    println!(
        "\n4. Kernel: {} taps, requested FWHM {:?} ms, empirical {:?} ms",
        kernel.len(),
        kernel.requested_fwhm(),
        kernel.empirical_fwhm()
    );

    // Example 5: Energy operator, z-scored against the first 10 samples
    println!("\n5. Teager-Kaiser energy (z-scored):");
    let energy = teager_kaiser(&signal)?;
    print_signal(&zscore_against_baseline(&energy, 0..10)?);

    Ok(())
}

fn print_signal(signal: &[f64]) {
    for (i, &value) in signal.iter().enumerate() {
        print!("{:8.3}", value);
        if i > 0 && (i + 1) % 8 == 0 {
            println!();
        }
    }
    if signal.len() % 8 != 0 {
        println!();
    }
}
