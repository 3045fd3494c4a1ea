//! Focused, self-explanatory report of why an evaluation failed validation.

use crate::{
    Config, ResidualBlock,
    classify::{EntryStatus, ValueClass, classify, classify_array, is_array_valid},
    format::{general, scientific},
};

const PREAMBLE: &str = "\
A problem was found in the result returned from a user-supplied evaluation routine.

User-supplied evaluation routines must do the following:

  (1) Fill in all residual values
  (2) Fill in jacobian values for each non-constant parameter for each residual
  (3) Fill data in with finite (non-inf, non-NaN) values

If you are seeing this error, your evaluation routine is either producing non-finite
values (infs or NaNs) or is not filling in all the values. Every output array is
pre-filled with a sentinel value (1e302) before your routine runs, which is how
entries you never wrote to are detected in either the residuals or the jacobians.

Which residual block is this? It cannot be identified from here, but this is the
block's size information:

";

/// Decimal places of the values printed next to each entry.
const VALUE_PRECISION: usize = 4;

/// Explain why an evaluation of `block` is invalid, entry by entry.
///
/// Meant to be called after [`crate::is_evaluation_valid`] returned false.
/// Uses the default [`Config`].
pub fn render_error_report<B: ResidualBlock + ?Sized>(
    block: &B,
    parameters: &[&[f64]],
    cost: f64,
    residuals: &[f64],
    jacobians: Option<&[Option<&[f64]>]>,
) -> String {
    render_error_report_with_config(
        block,
        parameters,
        cost,
        residuals,
        jacobians,
        &Config::default(),
    )
}

/// Like [`render_error_report`], with a custom [`Config`].
pub fn render_error_report_with_config<B: ResidualBlock + ?Sized>(
    block: &B,
    parameters: &[&[f64]],
    cost: f64,
    residuals: &[f64],
    jacobians: Option<&[Option<&[f64]>]>,
    config: &Config,
) -> String {
    let mut out = String::new();
    if config.include_preamble {
        out.push_str(PREAMBLE);
    }
    push_shape_summary(&mut out, block, cost);

    let num_residuals = block.num_residuals();
    let residuals_ok = is_array_valid(num_residuals, Some(residuals));
    if !residuals_ok {
        out.push_str("Problem exists in: User-returned residual values (r[N])\n\n");
        let list_all = config.lists_everything(num_residuals);
        for (k, status) in classify_array(num_residuals, Some(residuals)) {
            if list_all || !status.is_ok() {
                push_entry(&mut out, &format!("  r[{k:02}]"), status);
            }
        }
        out.push('\n');
    }

    let failures = jacobian_failures(block, jacobians);
    if !failures.is_empty() {
        out.push_str("Problem exists in: User-returned jacobian values (d r[N] / d p[M][Q])\n\n");
        for failure in &failures {
            match *failure {
                JacobianFailure::NoSlot { index, slots } => out.push_str(&format!(
                    "  No jacobian given for parameter block {index} (p[{index}][...]), \
                     the jacobian array only has {slots} entries\n\n"
                )),
                JacobianFailure::Invalid { index, jacobian } => {
                    push_jacobian_block(&mut out, block, parameters, index, jacobian, config);
                }
            }
        }
    }

    if residuals_ok && failures.is_empty() {
        out.push_str("No unwritten, missing or non-finite values were found.\n");
    }
    out
}

fn push_shape_summary<B: ResidualBlock + ?Sized>(out: &mut String, block: &B, cost: f64) {
    let sizes = block
        .parameter_block_sizes()
        .iter()
        .map(usize::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    out.push_str(&format!(
        "  {} parameter blocks; sizes: ({sizes})\n",
        block.num_parameter_blocks()
    ));
    out.push_str(&format!("  {} residuals\n", block.num_residuals()));
    push_entry(out, "  cost", EntryStatus::Present(cost, classify(cost)));
    out.push('\n');
}

fn push_jacobian_block<B: ResidualBlock + ?Sized>(
    out: &mut String,
    block: &B,
    parameters: &[&[f64]],
    index: usize,
    jacobian: &[f64],
    config: &Config,
) {
    let size = block.parameter_block_sizes()[index];
    out.push_str(&format!(
        "  Jacobian values for parameter block {index} (p[{index}][...]), size: {size}:\n"
    ));
    if let Some(values) = parameters.get(index) {
        let values = values.iter().copied().map(general).collect::<Vec<_>>();
        out.push_str(&format!("    evaluated at p[{index}] = ({})\n", values.join(", ")));
    }
    let len = block.jacobian_len(index);
    let list_all = config.lists_everything(len);
    for (offset, status) in classify_array(len, Some(jacobian)) {
        if list_all || !status.is_ok() {
            let (k, j) = (offset / size, offset % size);
            push_entry(out, &format!("    d r[{k:02}] / d p[{index}][{j:02}]"), status);
        }
    }
    out.push('\n');
}

/// One line of the report: label, value, and what's wrong with it.
fn push_entry(out: &mut String, label: &str, status: EntryStatus) {
    let value = match status {
        EntryStatus::Present(x, _) => scientific(x, VALUE_PRECISION),
        EntryStatus::Missing => "(missing)".to_owned(),
    };
    out.push_str(&format!("{label} = {value:<15}     {}\n", commentary(status)));
}

/// Human-readable verdict on one user-supplied entry.
pub(crate) fn commentary(status: EntryStatus) -> &'static str {
    match status {
        EntryStatus::Present(_, ValueClass::NonFinite) => "ERROR: Value is not finite",
        EntryStatus::Present(_, ValueClass::Unwritten) => {
            "ERROR: Value was not set by cost function"
        }
        EntryStatus::Present(_, ValueClass::Ok) => "OK",
        EntryStatus::Missing => "ERROR: Value is missing from the buffer",
    }
}

/// A requested Jacobian block that failed validation.
enum JacobianFailure<'a> {
    /// The Jacobian array is too short to have an entry for this block.
    NoSlot { index: usize, slots: usize },
    /// The block's Jacobian has bad entries.
    Invalid { index: usize, jacobian: &'a [f64] },
}

fn jacobian_failures<'a, B: ResidualBlock + ?Sized>(
    block: &B,
    jacobians: Option<&'a [Option<&'a [f64]>]>,
) -> Vec<JacobianFailure<'a>> {
    let Some(jacobians) = jacobians else {
        return Vec::new();
    };
    (0..block.num_parameter_blocks())
        .filter_map(|index| match jacobians.get(index) {
            None => Some(JacobianFailure::NoSlot {
                index,
                slots: jacobians.len(),
            }),
            Some(None) => None,
            Some(&Some(jacobian)) => (!is_array_valid(block.jacobian_len(index), Some(jacobian)))
                .then_some(JacobianFailure::Invalid { index, jacobian }),
        })
        .collect()
}
