//! Integration tests for the volatility connectedness pipeline

use approx::assert_abs_diff_eq;
use chrono::NaiveDate;
use ndarray::{s, Array2};
use std::path::Path;
use tempfile::tempdir;
use volatility_connectedness::data::{business_days, generate_correlated_bars};
use volatility_connectedness::{
    AlignedPanel, CoefficientSet, ConnectednessDecomposer, ConnectednessError, DegeneratePolicy,
    MarketSource, Pipeline, PipelineConfig, PriceBar, VarModel,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Write bars as a Yahoo-style CSV, newest first
fn write_csv(path: &Path, bars: &[PriceBar], null_row: Option<usize>) {
    let mut out = String::from("Date,Open,High,Low,Close,Adj Close,Volume\n");
    for (i, b) in bars.iter().enumerate().rev() {
        if Some(i) == null_row {
            out.push_str(&format!("{},null,null,null,null,null,null\n", b.date));
        } else {
            out.push_str(&format!(
                "{},{},{},{},{},{},1000\n",
                b.date, b.open, b.high, b.low, b.close, b.close
            ));
        }
    }
    std::fs::write(path, out).unwrap();
}

fn named(bars: Vec<Vec<PriceBar>>, names: &[&str]) -> Vec<(String, Vec<PriceBar>)> {
    names.iter().map(|s| s.to_string()).zip(bars).collect()
}

#[test]
fn test_pipeline_from_csv_files() {
    let dir = tempdir().unwrap();
    let bars = generate_correlated_bars(3, 300, date(2019, 1, 1), 0.01, 0.7, 99);
    let files = ["us.csv", "uk.csv", "hk.csv"];
    for (i, (file, b)) in files.iter().zip(bars.iter()).enumerate() {
        // One market has an interior gap that must be interpolated
        write_csv(&dir.path().join(file), b, if i == 1 { Some(150) } else { None });
    }

    let config = PipelineConfig {
        markets: vec![
            MarketSource::new("US", "us.csv"),
            MarketSource::new("UK", "uk.csv"),
            MarketSource::new("HK", "hk.csv"),
        ],
        data_dir: dir.path().to_path_buf(),
        start: date(2019, 1, 1),
        end: date(2020, 12, 31),
        rolling_window: 80,
        stride: 10,
        horizon: 10,
        ..Default::default()
    };

    let result = Pipeline::new(config).unwrap().run().unwrap();

    assert_eq!(result.panel.markets(), &["US", "UK", "HK"]);
    assert_eq!(result.panel.n_rows(), 299);
    assert!(result.panel.values().iter().all(|v| v.is_finite() && *v >= 0.0));
    assert!(result
        .panel
        .dates()
        .iter()
        .all(|d| *d >= date(2019, 1, 1) && *d <= date(2020, 12, 31)));

    let table = &result.full_sample.table;
    for row in table.shares().rows() {
        assert_abs_diff_eq!(row.sum(), 1.0, epsilon = 1e-9);
    }
    assert!((0.0..=1.0).contains(&table.total));
    assert_eq!(result.windows.len(), (299 - 80) / 10 + 1);
    assert_eq!(result.rolling_index().len(), result.windows.len());
}

#[test]
fn test_missing_file_is_missing_data() {
    let dir = tempdir().unwrap();
    let config = PipelineConfig {
        markets: vec![MarketSource::new("US", "absent.csv")],
        data_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let err = Pipeline::new(config).unwrap().run().unwrap_err();
    assert!(matches!(err, ConnectednessError::MissingData { .. }));
}

#[test]
fn test_disjoint_markets_signal_alignment_empty() {
    let a = generate_correlated_bars(1, 40, date(2020, 1, 1), 0.01, 0.0, 1);
    let b = generate_correlated_bars(1, 40, date(2020, 6, 1), 0.01, 0.0, 2);
    let c = generate_correlated_bars(1, 40, date(2021, 1, 1), 0.01, 0.0, 3);
    let bars = named(
        a.into_iter().chain(b).chain(c).collect(),
        &["A", "B", "C"],
    );

    let config = PipelineConfig {
        markets: vec![
            MarketSource::new("A", "a.csv"),
            MarketSource::new("B", "b.csv"),
            MarketSource::new("C", "c.csv"),
        ],
        start: date(2020, 1, 1),
        end: date(2021, 12, 31),
        rolling_window: 20,
        ..Default::default()
    };

    let err = Pipeline::new(config).unwrap().run_with_bars(bars).unwrap_err();
    assert!(matches!(err, ConnectednessError::AlignmentEmpty { .. }));
}

#[test]
fn test_twin_series() {
    let bars = generate_correlated_bars(1, 250, date(2020, 1, 1), 0.01, 0.0, 8);
    let twin = vec![bars[0].clone(), bars[0].clone()];
    let config = PipelineConfig {
        markets: vec![MarketSource::new("A", "a.csv"), MarketSource::new("B", "b.csv")],
        start: date(2020, 1, 1),
        end: date(2021, 12, 31),
        rolling: false,
        ..Default::default()
    };
    let pipeline = Pipeline::new(config).unwrap();

    // Identical columns make the VAR regressors collinear
    let err = pipeline
        .run_with_bars(named(twin.clone(), &["A", "B"]))
        .unwrap_err();
    assert!(matches!(err, ConnectednessError::DegenerateFit { .. }));

    // The twin system: each lag coefficient split evenly across the two
    // copies, perfectly correlated shocks. Every share is one half.
    let series = pipeline.volatility(&named(twin, &["A", "B"])).unwrap();
    let panel = pipeline.align(&series).unwrap();
    let single = panel.values().slice(s![.., 0..1]).to_owned();
    let fit = VarModel::new(1).unwrap().fit(single.view()).unwrap();
    let a = fit.coefficients.lag(1).unwrap()[[0, 0]];
    let v = fit.sigma[[0, 0]];

    let coefficients =
        CoefficientSet::without_intercept(vec![Array2::from_elem((2, 2), a / 2.0)]).unwrap();
    let sigma = Array2::from_elem((2, 2), v);
    let table = ConnectednessDecomposer::new(10)
        .unwrap()
        .decompose(&coefficients, &sigma, panel.markets())
        .unwrap();

    for share in table.shares().iter() {
        assert_abs_diff_eq!(*share, 0.5, epsilon = 1e-12);
    }
    assert_abs_diff_eq!(table.total, 0.5, epsilon = 1e-12);
}

fn panel_with_flat_tail() -> AlignedPanel {
    let bars = generate_correlated_bars(2, 121, date(2020, 1, 1), 0.01, 0.5, 4);
    let pipeline = Pipeline::new(PipelineConfig {
        markets: vec![MarketSource::new("A", "a.csv"), MarketSource::new("B", "b.csv")],
        start: date(2020, 1, 1),
        end: date(2020, 12, 31),
        rolling_window: 30,
        ..Default::default()
    })
    .unwrap();
    let series = pipeline.volatility(&named(bars, &["A", "B"])).unwrap();
    let live = pipeline.align(&series).unwrap();

    let mut values = live.values().clone();
    values.slice_mut(s![80.., ..]).fill(0.01);
    AlignedPanel::new(live.dates().to_vec(), live.markets().to_vec(), values).unwrap()
}

#[test]
fn test_degenerate_windows_skip_and_abort() {
    let base = PipelineConfig {
        markets: vec![MarketSource::new("A", "a.csv"), MarketSource::new("B", "b.csv")],
        start: date(2020, 1, 1),
        end: date(2020, 12, 31),
        rolling_window: 30,
        stride: 10,
        parallel: true,
        ..Default::default()
    };

    let skip = Pipeline::new(PipelineConfig {
        degenerate_policy: DegeneratePolicy::Skip,
        ..base.clone()
    })
    .unwrap()
    .run_with_panel(panel_with_flat_tail())
    .unwrap();
    assert!(!skip.windows.is_empty());
    assert!(!skip.failures.is_empty());
    assert!(skip
        .failures
        .iter()
        .all(|f| matches!(f.error, ConnectednessError::DegenerateFit { .. })));
    // Surviving windows stay in index order
    assert!(skip.windows.windows(2).all(|w| w[0].span.index < w[1].span.index));

    let abort = Pipeline::new(PipelineConfig {
        degenerate_policy: DegeneratePolicy::Abort,
        ..base
    })
    .unwrap()
    .run_with_panel(panel_with_flat_tail());
    assert!(matches!(abort, Err(ConnectednessError::DegenerateFit { .. })));
}

#[test]
fn test_weekend_dates_never_in_panel() {
    let bars = generate_correlated_bars(2, 60, date(2021, 3, 1), 0.01, 0.3, 5);
    let calendar = business_days(date(2021, 3, 1), 60);
    let pipeline = Pipeline::new(PipelineConfig {
        markets: vec![MarketSource::new("A", "a.csv"), MarketSource::new("B", "b.csv")],
        start: date(2021, 1, 1),
        end: date(2021, 12, 31),
        rolling_window: 20,
        ..Default::default()
    })
    .unwrap();
    let series = pipeline.volatility(&named(bars, &["A", "B"])).unwrap();
    let panel = pipeline.align(&series).unwrap();

    assert_eq!(panel.dates(), &calendar[1..]);
}
