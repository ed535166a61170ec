//! Demonstration of OLS with Newey-West standard errors on an autocorrelated
//! return series.

use ndarray::{Array1, Array2};
use ronda_regression::{NeweyWestConfig, OlsConfig, OlsRegression, annualize, stars};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("=== Ronda Newey-West Demo ===\n");

    // A market factor and a strategy with beta 0.3, alpha 40 bps a month and
    // AR(1) noise.
    let n = 240;
    let market = Array1::from_shape_fn(n, |t| 0.045 * ((t as f64) * 0.7).sin());
    let mut noise = 0.0;
    let strategy = Array1::from_shape_fn(n, |t| {
        noise = 0.5 * noise + 0.02 * ((t as f64) * 2.9).cos();
        0.004 + 0.3 * market[t] + noise
    });
    let x = Array2::from_shape_vec((n, 1), market.to_vec())?;

    println!("{:>6} {:>10} {:>10} {:>8} {:>10}", "Lags", "Alpha", "SE", "t", "p");
    for lags in [0, 3, 6, 12] {
        let config = OlsConfig {
            newey_west: NeweyWestConfig {
                lags: Some(lags),
                ..Default::default()
            },
            ..Default::default()
        };
        let fit = OlsRegression::new(config).fit(&strategy, &x, &["Mkt-RF"])?;
        println!(
            "{:>6} {:>10.5} {:>10.5} {:>8.2} {:>9.4}{}",
            fit.lags,
            fit.params[0],
            fit.std_errors[0],
            fit.t_values[0],
            fit.p_values[0],
            stars(fit.p_values[0])
        );
    }

    let fit = OlsRegression::default().fit(&strategy, &x, &["Mkt-RF"])?;
    println!(
        "\nAnnualised alpha: {:.2}%  beta: {:.3}  R²: {:.3}",
        annualize(fit.params[0]) * 100.0,
        fit.params[1],
        fit.r_squared
    );

    Ok(())
}
