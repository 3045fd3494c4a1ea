//! Full, always-renderable dump of one evaluation, for debugging by hand.

use crate::{
    ResidualBlock,
    classify::{EntryStatus, classify, classify_array},
    format::cell,
};

const LEGEND: &str = "\
Each parameter block is printed as one row per parameter. The first column is the
parameter's value, then after the '|' comes the jacobian entry for each residual,
in residual order. A parameter block held constant has its jacobian printed as
'Not Computed'. An entry that was requested but never written by the evaluation
routine is printed as 'Uninitialized', and one the buffer is too short to hold
is printed as 'Missing'. Both are errors, and so are residual or jacobian values
that are Inf or NaN.

";

/// Render every input and output of one evaluation as aligned text.
///
/// Works whether or not the evaluation is valid: unwritten entries are shown
/// as `Uninitialized` and non-finite values are printed as they are, so the
/// malformed number itself is visible.
pub fn render_full_dump<B: ResidualBlock + ?Sized>(
    block: &B,
    parameters: &[&[f64]],
    cost: f64,
    residuals: &[f64],
    jacobians: Option<&[Option<&[f64]>]>,
) -> String {
    let num_residuals = block.num_residuals();
    let mut out = format!(
        "Residual Block size: {} parameter blocks x {} residuals\n\n",
        block.num_parameter_blocks(),
        num_residuals
    );
    out.push_str(LEGEND);

    out.push_str("Cost:          ");
    out.push_str(&cell(Some(EntryStatus::Present(cost, classify(cost)))));
    out.push('\n');
    out.push_str("Residuals:     ");
    for (_, status) in classify_array(num_residuals, Some(residuals)) {
        out.push_str(&cell(Some(status)));
    }
    out.push_str("\n\n");

    for (i, &size) in block.parameter_block_sizes().iter().enumerate() {
        out.push_str(&format!("Parameter Block {i}, size: {size}\n\n"));
        let jacobian = JacobianColumn::for_block(jacobians, i);
        for (j, value) in classify_array(size, parameters.get(i).copied()) {
            out.push_str(&cell(Some(value)));
            out.push_str("| ");
            for k in 0..num_residuals {
                out.push_str(&cell(jacobian.entry(k * size + j)));
            }
            out.push('\n');
        }
        out.push('\n');
    }
    out.push('\n');
    out
}

/// Where one parameter block's Jacobian entries come from.
enum JacobianColumn<'a> {
    /// Not requested, or held constant.
    NotComputed,
    /// Requested, but the Jacobian array has no slot for this block.
    Missing,
    Present(&'a [f64]),
}

impl<'a> JacobianColumn<'a> {
    fn for_block(jacobians: Option<&'a [Option<&'a [f64]>]>, i: usize) -> Self {
        match jacobians.map(|jacobians| jacobians.get(i)) {
            None | Some(Some(None)) => JacobianColumn::NotComputed,
            Some(None) => JacobianColumn::Missing,
            Some(Some(&Some(jacobian))) => JacobianColumn::Present(jacobian),
        }
    }

    fn entry(&self, offset: usize) -> Option<EntryStatus> {
        match self {
            JacobianColumn::NotComputed => None,
            JacobianColumn::Missing => Some(EntryStatus::Missing),
            JacobianColumn::Present(jacobian) => Some(match jacobian.get(offset) {
                Some(&x) => EntryStatus::Present(x, classify(x)),
                None => EntryStatus::Missing,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BlockShape, SENTINEL};

    fn shape() -> BlockShape {
        BlockShape::new(2, vec![3]).unwrap()
    }

    #[test]
    fn layout() {
        let p0 = [1.0, 2.0, 3.0];
        let jacobian = [0.1, 0.2, 0.3, 0.4, 0.5, 0.6];
        let jacobians = [Some(&jacobian[..])];
        let dump = render_full_dump(&shape(), &[&p0[..]], 2.5, &[1.0, 2.0], Some(&jacobians));

        assert!(dump.starts_with("Residual Block size: 1 parameter blocks x 2 residuals\n\n"));
        assert!(dump.contains("Cost:                    2.5 \n"));
        assert!(dump.contains("Residuals:                 1             2 \n"));
        assert!(dump.contains("Parameter Block 0, size: 3\n\n"));
        // Row j holds d r[k] / d p[j] for every k, i.e. entries j and 3 + j.
        assert!(dump.contains("            1 |           0.1           0.4 \n"));
        assert!(dump.contains("            2 |           0.2           0.5 \n"));
        assert!(dump.contains("            3 |           0.3           0.6 \n"));
    }

    #[test]
    fn constant_block_is_not_computed() {
        let p0 = [1.0, 2.0, 3.0];
        let jacobians: [Option<&[f64]>; 1] = [None];
        let dump = render_full_dump(&shape(), &[&p0[..]], 2.5, &[1.0, 2.0], Some(&jacobians));
        assert_eq!(dump.matches("Not Computed").count(), 6 + 1);
        assert!(!dump.contains("Uninitialized "));
    }

    #[test]
    fn no_jacobians_requested() {
        let p0 = [1.0, 2.0, 3.0];
        let dump = render_full_dump(&shape(), &[&p0[..]], 2.5, &[1.0, 2.0], None);
        assert!(dump.contains("            1 | Not Computed  Not Computed  \n"));
    }

    #[test]
    fn invalid_values_are_visible() {
        let p0 = [1.0, 2.0, 3.0];
        let jacobian = [0.1, SENTINEL, 0.3, f64::INFINITY, 0.5];
        let jacobians = [Some(&jacobian[..])];
        let dump = render_full_dump(
            &shape(),
            &[&p0[..]],
            SENTINEL,
            &[f64::NAN, SENTINEL],
            Some(&jacobians),
        );
        assert!(dump.contains("Cost:          Uninitialized \n"));
        assert!(dump.contains("Residuals:               NaN Uninitialized \n"));
        assert!(dump.contains("            1 |           0.1           inf \n"));
        assert!(dump.contains("            2 | Uninitialized           0.5 \n"));
        assert!(dump.contains("            3 |           0.3 Missing       \n"));
    }

    #[test]
    fn missing_jacobian_slot() {
        let p0 = [1.0, 2.0, 3.0];
        let jacobians: [Option<&[f64]>; 0] = [];
        let dump = render_full_dump(&shape(), &[&p0[..]], 2.5, &[1.0, 2.0], Some(&jacobians));
        assert!(dump.contains("            1 | Missing       Missing       \n"));
    }
}
