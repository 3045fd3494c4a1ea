use super::*;
use crate::textual::Recording;


fn parse(txt: &str) -> Recording {
    txt.parse().unwrap()
}

/// One parameter block of size 3, two residuals.
fn recording(residuals: &str, jacobian: &str) -> Recording {
    parse(&format!(
        "# block
    residuals 2
    parameters 3

    # evaluation
    cost = 2.5
    residuals = {residuals}
    p0 = [1, 2, 3]
    {jacobian}
    "
    ))
}

#[test]
fn fully_written_is_valid() {
    let recording = recording("[1.0, 2.0]", "j0 = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6]");
    assert!(recording.is_valid());
    assert!(
        recording
            .render_error_report(&Config::default())
            .ends_with("No unwritten, missing or non-finite values were found.\n")
    );
}

#[test]
fn unwritten_residual_is_cited() {
    let recording = recording("[1.0, unset]", "j0 = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6]");
    assert!(!recording.is_valid());
    let report = recording.render_error_report(&Config::default());
    let unset = "  r[01] = 1.0000e+302         ERROR: Value was not set by cost function\n";
    assert!(report.contains(unset));
    assert!(report.contains("  r[00] = 1.0000e+00          OK\n"));
    assert!(!report.contains("jacobian values (d r[N]"));
}

#[test]
fn non_finite_residual_is_cited() {
    let recording = recording("[1.0, nan]", "j0 = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6]");
    assert!(!recording.is_valid());
    let report = recording.render_error_report(&Config::default());
    assert!(report.contains("  r[01] = NaN                 ERROR: Value is not finite\n"));
}

#[test]
fn constant_block_is_not_computed() {
    let recording = recording("[1.0, 2.0]", "j0 = constant");
    assert!(recording.is_valid());
    let jacobians = recording.jacobian_slices();
    assert_eq!(jacobians, Some(vec![None]));
    let dump = recording.render_full_dump();
    // Every jacobian cell: 3 rows of 2 residuals.
    assert_eq!(dump.matches("Not Computed  ").count(), 6);
    for row in ["1", "2", "3"] {
        assert!(dump.contains(&format!("{row:>13} | Not Computed  Not Computed  \n")));
    }
}

#[test]
fn poisoned_and_untouched_is_invalid() {
    let shape = BlockShape::new(2, vec![3, 2]).unwrap();
    let mut cost = 0.0;
    let mut residuals = [0.0; 2];
    let mut j0 = [0.0; 6];
    let mut jacobians = [Some(&mut j0[..]), None];
    poison(&shape, &mut cost, &mut residuals, Some(&mut jacobians));

    assert!(is_sentinel(cost));
    assert!(residuals.iter().all(|&r| is_sentinel(r)));
    assert!(!is_evaluation_valid(&shape, &residuals, None));

    residuals = [1.0, 2.0];
    let jacobians = [Some(&j0[..]), None];
    assert!(!is_evaluation_valid(&shape, &residuals, Some(&jacobians)));
    assert_eq!(find_invalid_value(6, jacobians[0]), Some(0));
}

#[test]
fn validation_is_pure() {
    let recording = recording("[1.0, inf]", "j0 = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6]");
    let first = recording.is_valid();
    let report = recording.render_error_report(&Config::default());
    assert_eq!(first, recording.is_valid());
    assert_eq!(report, recording.render_error_report(&Config::default()));
}

#[test]
fn report_for_many_blocks() {
    let recording = parse(
        "# block
    residuals 1
    parameters 2, 1, 2

    # evaluation
    cost = unset
    residuals = [3]
    p0 = [1, 2]
    p1 = [0.5]
    p2 = [-1, 1e-7]
    j0 = [1, 1]
    j2 = [-inf, unset]
    ",
    );
    assert!(!recording.is_valid());
    let report = recording.render_error_report(&Config::default().with_preamble(false));
    assert_eq!(
        report,
        "  3 parameter blocks; sizes: (2, 1, 2)
  1 residuals
  cost = 1.0000e+302         ERROR: Value was not set by cost function

Problem exists in: User-returned jacobian values (d r[N] / d p[M][Q])

  Jacobian values for parameter block 2 (p[2][...]), size: 2:
    evaluated at p[2] = (-1, 1e-07)
    d r[00] / d p[2][00] = -inf                ERROR: Value is not finite
    d r[00] / d p[2][01] = 1.0000e+302         ERROR: Value was not set by cost function

"
    );
}

#[test]
fn guarded_evaluation_of_a_recording() {
    // Replay a recording through the guard with a routine that copies it.
    let recording = recording("[1.0, unset]", "j0 = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6]");
    let parameters = recording.parameter_slices();
    let mut buffers = guard::EvaluationBuffers::with_all_jacobians(&recording.shape);
    let config = Config::default().with_log_reports(false);
    let result = guard::evaluate(
        &recording.shape,
        &parameters,
        &mut buffers,
        &config,
        |_, cost, residuals, jacobians| {
            *cost = recording.cost;
            residuals.copy_from_slice(&recording.residuals);
            let recorded = recording.jacobian_slices().unwrap();
            for (out, recorded) in jacobians.unwrap().iter_mut().zip(recorded) {
                if let (Some(out), Some(recorded)) = (out, recorded) {
                    out.copy_from_slice(recorded);
                }
            }
            true
        },
    );
    match result {
        Err(EvaluationError::InvalidOutput { report }) => {
            assert_eq!(report, recording.render_error_report(&config));
        }
        other => panic!("expected an invalid output error, got {other:?}"),
    }
}

#[test]
fn public_types_are_thread_safe() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<BlockShape>();
    assert_send_sync::<Config>();
    assert_send_sync::<Evaluation<'static, BlockShape>>();
    assert_send_sync::<guard::EvaluationBuffers>();
    assert_send_sync::<Recording>();
    assert_send_sync::<ShapeError>();
    assert_send_sync::<EvaluationError>();
}
