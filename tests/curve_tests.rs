use hbx_tanks::{CurveDirection, Temperature, evaluate};

fn f(v: f64) -> Temperature {
    Temperature::from_fahrenheit(v)
}

fn heating(outdoor: f64) -> f64 {
    evaluate(f(outdoor), f(100.0), f(130.0), f(-10.0), f(60.0), CurveDirection::Heating).fahrenheit()
}

fn cooling(outdoor: f64) -> f64 {
    evaluate(f(outdoor), f(40.0), f(60.0), f(95.0), f(50.0), CurveDirection::Cooling).fahrenheit()
}

#[test]
fn output_stays_within_endpoints() {
    let mut outdoor = -60.0;
    while outdoor <= 140.0 {
        let h = heating(outdoor);
        assert!((100.0..=130.0).contains(&h), "heating({outdoor}) = {h}");
        let c = cooling(outdoor);
        assert!((40.0..=60.0).contains(&c), "cooling({outdoor}) = {c}");
        outdoor += 0.5;
    }
}

#[test]
fn heating_is_non_increasing_in_outdoor_temp() {
    let mut prev = heating(-60.0);
    let mut outdoor = -59.0;
    while outdoor <= 140.0 {
        let t = heating(outdoor);
        assert!(t <= prev, "heating rose from {prev} to {t} at outdoor {outdoor}");
        prev = t;
        outdoor += 1.0;
    }
}

#[test]
fn cooling_is_non_decreasing_in_outdoor_temp() {
    let mut prev = cooling(-60.0);
    let mut outdoor = -59.0;
    while outdoor <= 140.0 {
        let t = cooling(outdoor);
        assert!(t >= prev, "cooling fell from {prev} to {t} at outdoor {outdoor}");
        prev = t;
        outdoor += 1.0;
    }
}

#[test]
fn endpoints_are_reached_exactly() {
    assert_eq!(heating(-10.0), 130.0);
    assert_eq!(heating(60.0), 100.0);
    assert_eq!(cooling(95.0), 60.0);
    assert_eq!(cooling(50.0), 40.0);
}

#[test]
fn worked_scenario_hot_tank_at_25_outdoor() {
    // Linear between (60, 100) and (-10, 130):
    // 100 + (60 - 25) / (60 - (-10)) * 30 = 115.
    assert_eq!(heating(25.0), 115.0);
}

#[test]
fn degenerate_anchor_never_divides_by_zero() {
    for outdoor in [-100.0, 29.0, 30.0, 31.0, 200.0] {
        let t = evaluate(f(outdoor), f(100.0), f(130.0), f(30.0), f(30.0), CurveDirection::Heating);
        assert!(t.fahrenheit().is_finite());
        assert!(t.fahrenheit() == 100.0 || t.fahrenheit() == 130.0);
    }
}

#[test]
fn fractional_outdoor_interpolates_smoothly() {
    let lower = heating(25.5);
    let upper = heating(24.5);
    assert!(lower < 115.0 && 115.0 < upper);
    assert!((heating(25.0) - (lower + upper) / 2.0).abs() < 1e-9);
}
