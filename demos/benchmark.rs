use signal_conditioning::{
    despike, detrend, mean_smooth, median_smooth, teager_kaiser, DespikeConfig, Smoother,
};
use std::time::Instant;

fn main() {
    env_logger::init();
    println!("=== Signal Conditioning Benchmarks ===\n");

    // Test different data sizes
    let sizes = vec![100, 1_000, 10_000, 100_000];

    for size in sizes {
        println!("Benchmarking with {} data points:", size);

        // Generate test data
        let data: Vec<f64> = (0..size)
            .map(|i| {
                let x = i as f64 * 0.01;
                x.sin() + 0.5 * (2.0 * x).cos() + 0.1 * (5.0 * x).sin() + if i % 97 == 0 { 8.0 } else { 0.0 }
            })
            .collect();

        for half_width in [2, 10, 40] {
            if 2 * half_width + 1 > size {
                continue;
            }

            let start = Instant::now();
            let _ = mean_smooth(&data, half_width).expect("window fits");
            let mean_duration = start.elapsed();

            let start = Instant::now();
            let _ = median_smooth(&data, half_width).expect("window fits");
            let median_duration = start.elapsed();

            let mut smoother = Smoother::new(half_width);
            let start = Instant::now();
            let _ = smoother.gaussian(&data, half_width as f64 / 2.0).expect("valid fwhm");
            let gaussian_duration = start.elapsed();

            println!(
                "  k={}: mean={:?}, median={:?}, gaussian={:?}",
                half_width, mean_duration, median_duration, gaussian_duration
            );
        }

        let start = Instant::now();
        let despiked = despike(&data, &DespikeConfig::new(4.0, 5).expect("finite threshold"))
            .expect("window fits");
        println!("  despike: {} replaced in {:?}", despiked.count(), start.elapsed());

        let start = Instant::now();
        let selection = detrend(&data, 8).expect("enough points");
        println!("  detrend: order {} in {:?}", selection.order, start.elapsed());

        let start = Instant::now();
        let _ = teager_kaiser(&data).expect("enough points");
        println!("  tkeo: {:?}", start.elapsed());

        println!();
    }

    // Kernel caching test
    println!("Kernel caching efficiency:");
    let test_data: Vec<f64> = (0..1000).map(|i| i as f64).collect();
    let mut smoother = Smoother::new(20);
    let start = Instant::now();
    for _ in 0..10 {
        let _ = smoother.gaussian(&test_data, 8.0).expect("valid fwhm");
    }
    let cached_duration = start.elapsed();

    println!("  10 runs with caching: {:?}", cached_duration);
    println!("  Average per run: {:?}", cached_duration / 10);
    println!("  Kernels cached: {}", smoother.cache().len());
}
