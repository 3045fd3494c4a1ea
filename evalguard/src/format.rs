//! Fixed-width rendering of user-written numbers for dumps and reports.

use crate::classify::{EntryStatus, ValueClass};

/// Significant digits used by [`general`], same as C's `%g`.
const SIG_DIGITS: i32 = 6;

/// Every dump cell is this wide, including its trailing space.
pub(crate) const CELL_WIDTH: usize = 14;

/// Render `x` like C's `%g`: 6 significant digits, scientific notation for
/// very large or small magnitudes, no trailing zeros.
/// Non-finite values are rendered verbatim (`NaN`, `inf`, `-inf`).
pub fn general(x: f64) -> String {
    if !x.is_finite() {
        return x.to_string();
    }
    if x == 0.0 {
        return if x.is_sign_negative() { "-0" } else { "0" }.to_owned();
    }
    // Round first, because rounding can bump the exponent (999999.5 -> 1e6).
    let rounded = format!("{:.*e}", (SIG_DIGITS - 1) as usize, x);
    let Some((mantissa, exponent)) = rounded.split_once('e') else {
        return rounded;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return rounded;
    };
    if exponent < -4 || exponent >= SIG_DIGITS {
        format!("{}{}", trim_fraction(mantissa), c_exponent_suffix(exponent))
    } else {
        let decimals = (SIG_DIGITS - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{x:.decimals$}")).to_owned()
    }
}

/// Render `x` like C's `%.{precision}e`, e.g. `1.0000e+00`.
/// Non-finite values are rendered verbatim.
pub fn scientific(x: f64, precision: usize) -> String {
    if !x.is_finite() {
        return x.to_string();
    }
    let rust = format!("{x:.precision$e}");
    let Some((mantissa, exponent)) = rust.split_once('e') else {
        return rust;
    };
    let Ok(exponent) = exponent.parse::<i32>() else {
        return rust;
    };
    format!("{mantissa}{}", c_exponent_suffix(exponent))
}

/// C prints at least two exponent digits, always signed.
fn c_exponent_suffix(exponent: i32) -> String {
    let sign = if exponent < 0 { '-' } else { '+' };
    format!("e{sign}{:02}", exponent.unsigned_abs())
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

/// One fixed-width dump cell.
///
/// `None` means the whole array wasn't computed (e.g. a constant parameter block).
pub(crate) fn cell(entry: Option<EntryStatus>) -> String {
    let text = match entry {
        None => "Not Computed".to_owned(),
        Some(EntryStatus::Missing) => "Missing".to_owned(),
        Some(EntryStatus::Present(_, ValueClass::Unwritten)) => "Uninitialized".to_owned(),
        Some(EntryStatus::Present(x, _)) => {
            return format!("{:>width$} ", general(x), width = CELL_WIDTH - 1);
        }
    };
    format!("{text:<CELL_WIDTH$}")
}
