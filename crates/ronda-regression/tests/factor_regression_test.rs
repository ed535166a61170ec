//! Factor regressions against a factor table parsed from raw French files.

use approx::assert_relative_eq;
use chrono::NaiveDate;
use ronda_data::{FactorTable, ReturnSeries};
use ronda_regression::{
    BootstrapConfig, FactorModel, NeweyWestConfig, OlsConfig, bootstrap_capm, regress, regress_all,
};

const MONTHS: usize = 72;

/// Raw five-factor and momentum files with `MONTHS` months from 2000-01.
fn raw_files() -> (String, String) {
    let mut ff5 = String::from("Synthetic five-factor file\n\n,Mkt-RF,SMB,HML,RMW,CMA,RF\n");
    let mut umd = String::from("Synthetic momentum file\n\n,Mom   \n");
    for t in 0..MONTHS {
        let yyyymm = (2000 + t / 12) * 100 + t % 12 + 1;
        let f = |k: f64| 3.0 * ((t as f64 + 1.0) * k).sin();
        ff5.push_str(&format!(
            "{yyyymm},{:.4},{:.4},{:.4},{:.4},{:.4},0.20\n",
            f(0.61),
            f(1.37),
            f(2.11),
            f(0.29),
            f(1.83)
        ));
        umd.push_str(&format!("{yyyymm},{:.4}\n", f(2.71)));
    }
    ff5.push_str("\n Annual Factors: January-December \n,Mkt-RF,SMB,HML,RMW,CMA,RF\n2000,1.0,1.0,1.0,1.0,1.0,1.0\n");
    umd.push_str("\nAnnual Factors:\n,Mom\n2000,1.0\n");
    (ff5, umd)
}

fn strategy(factors: &FactorTable, alpha: f64, loadings: &[(&str, f64)]) -> ReturnSeries {
    let points: Vec<(NaiveDate, f64)> = factors
        .dates()
        .iter()
        .map(|d| {
            let rf = factors.value(*d, "RF").unwrap();
            let exposure: f64 = loadings.iter().map(|(name, b)| b * factors.value(*d, name).unwrap()).sum();
            (*d, rf + alpha + exposure)
        })
        .collect();
    ReturnSeries::new("net", points)
}

#[test]
fn test_ff5_umd_recovers_loadings() {
    let (ff5, umd) = raw_files();
    let factors = FactorTable::from_french(&ff5, &umd).unwrap();
    assert_eq!(factors.len(), MONTHS);

    let loadings = [("Mkt-RF", -0.2), ("SMB", 0.1), ("HML", -0.4), ("UMD", 0.9)];
    let series = strategy(&factors, 0.005, &loadings);
    let fit = regress(&series, &factors, FactorModel::Ff5Umd, &OlsConfig::default()).unwrap();

    assert_relative_eq!(fit.alpha_monthly(), 0.005, epsilon = 1e-9);
    for (name, beta) in loadings {
        assert_relative_eq!(fit.beta(name).unwrap(), beta, epsilon = 1e-9);
    }
    assert_relative_eq!(fit.beta("RMW").unwrap(), 0.0, epsilon = 1e-9);
    assert_relative_eq!(fit.r_squared(), 1.0, epsilon = 1e-9);
    assert_eq!(fit.nobs(), MONTHS);
    assert_eq!(fit.result.lags, 6);
}

#[test]
fn test_omitting_momentum_biases_alpha() {
    let (ff5, umd) = raw_files();
    let factors = FactorTable::from_french(&ff5, &umd).unwrap();
    let series = strategy(&factors, 0.0, &[("UMD", 1.0)]);

    let fits = regress_all(
        std::slice::from_ref(&series),
        &factors,
        &FactorModel::ALL,
        &OlsConfig {
            newey_west: NeweyWestConfig {
                lags: Some(3),
                ..Default::default()
            },
            ..Default::default()
        },
    )
    .unwrap();
    assert_eq!(fits.len(), 4);
    let full = &fits[3];
    assert_relative_eq!(full.alpha_monthly(), 0.0, epsilon = 1e-9);
    assert!(fits[0].r_squared() < full.r_squared());
    assert!(fits.iter().all(|f| f.alpha_p().is_nan() || (0.0..=1.0).contains(&f.alpha_p())));
}

#[test]
fn test_bootstrap_capm_is_seeded() {
    let (ff5, umd) = raw_files();
    let factors = FactorTable::from_french(&ff5, &umd).unwrap();
    let series = strategy(&factors, 0.01, &[("Mkt-RF", 0.5), ("HML", 0.3)]);
    let config = BootstrapConfig {
        n_iters: 250,
        seed: Some(42),
    };
    let first = bootstrap_capm(&series, &factors, &config).unwrap();
    let second = bootstrap_capm(&series, &factors, &config).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.nobs, MONTHS);
    assert_relative_eq!(first.beta, 0.5, epsilon = 0.2);
}
