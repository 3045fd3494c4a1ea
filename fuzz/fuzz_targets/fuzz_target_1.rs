#![no_main]

use arbitrary::Arbitrary;
use evalguard::{
    BlockShape, ResidualBlock, find_invalid_value, is_array_valid, is_evaluation_valid,
    render_error_report, render_full_dump,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|setup: Setup| {
    let shape = &setup.shape;
    let parameters: Vec<&[f64]> = setup.parameters.iter().map(Vec::as_slice).collect();
    let jacobians: Option<Vec<Option<&[f64]>>> = setup
        .jacobians
        .as_ref()
        .map(|jacobians| jacobians.iter().map(Option::as_deref).collect());
    let jacobians = jacobians.as_deref();

    let valid = is_evaluation_valid(shape, &setup.residuals, jacobians);
    let residuals_valid = is_array_valid(shape.num_residuals(), Some(&setup.residuals));
    assert_eq!(
        residuals_valid,
        find_invalid_value(shape.num_residuals(), Some(&setup.residuals)).is_none()
    );
    if !residuals_valid {
        assert!(!valid);
    }

    // Neither renderer may panic, whatever the buffers look like.
    let report = render_error_report(shape, &parameters, setup.cost, &setup.residuals, jacobians);
    if valid {
        assert!(!report.contains("Problem exists in"));
    } else {
        assert!(report.contains("Problem exists in"));
    }
    let _ = render_full_dump(shape, &parameters, setup.cost, &setup.residuals, jacobians);
});

#[derive(Debug, Arbitrary)]
struct Setup {
    shape: BlockShape,
    parameters: Vec<Vec<f64>>,
    cost: f64,
    residuals: Vec<f64>,
    jacobians: Option<Vec<Option<Vec<f64>>>>,
}
