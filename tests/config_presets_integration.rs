//! Integration tests for TOML configuration files and built-in presets.

mod common;

use std::fs;

use da_bidding::BidError;
use da_bidding::config::BiddingConfig;
use da_bidding::ensemble::combine_forecasts;

#[test]
fn presets_run_end_to_end_and_differ() {
    let forecast = common::diurnal_forecast();
    let mut outcomes = Vec::new();
    for name in BiddingConfig::PRESETS {
        let mut cfg = BiddingConfig::from_preset(name).unwrap();
        cfg.grid.price_step = 10.0;
        assert!(cfg.validate().is_empty(), "preset {name} should be valid");
        let opt = cfg.optimize(&forecast).unwrap();
        assert_eq!(opt.convergence_stats.total_points, 16);
        outcomes.push(opt);
    }
    assert_ne!(
        outcomes[0].expected_revenue.to_bits(),
        outcomes[1].expected_revenue.to_bits(),
        "baseline and tight_margin should price the same forecast differently"
    );
}

#[test]
fn toml_file_drives_grid_and_ensemble() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bidding.toml");
    fs::write(
        &path,
        r#"
[cost]
generation_cost = 390.0

[grid]
price_min = 400.0
price_max = 450.0
price_step = 5.0

[ensemble]
selection = "top_k"
top_k = 2
method = "simple_average"
"#,
    )
    .unwrap();

    let cfg = BiddingConfig::from_toml_file(&path).unwrap();
    assert!(cfg.validate().is_empty());
    assert_eq!(cfg.cost.generation_cost, 390.0);

    let opt = cfg.optimize(&common::diurnal_forecast()).unwrap();
    assert_eq!(opt.results.len(), 11);
    assert!((400.0..=450.0).contains(&opt.optimal_price));

    let ens = combine_forecasts(
        &common::four_models(),
        &common::validation_truth(),
        &cfg.ensemble,
    )
    .unwrap();
    assert_eq!(ens.selected_models, ["gbm", "lstm"]);
    assert_eq!(ens.weights["gbm"], 0.5);
}

#[test]
fn missing_file_reports_path() {
    let err = BiddingConfig::from_toml_file(std::path::Path::new("/nonexistent/bidding.toml"))
        .unwrap_err();
    assert_eq!(err.field, "config");
    assert!(err.message.contains("/nonexistent/bidding.toml"));
}

#[test]
fn expired_budget_is_reported_as_deadline() {
    let mut cfg = BiddingConfig::baseline();
    // fine grid that cannot finish within a millisecond
    cfg.grid.price_step = 0.01;
    cfg.grid.deadline_ms = Some(1);
    let err = cfg.optimize(&common::diurnal_forecast()).unwrap_err();
    assert!(matches!(err, BidError::DeadlineExceeded { total: 15001, .. }));
}
