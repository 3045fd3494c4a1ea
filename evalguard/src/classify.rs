//! Per-entry classification of user-written values, and the array validator built on it.

use crate::sentinel::is_sentinel;

/// What a single output entry tells us about the routine that wrote it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueClass {
    /// Finite and actually written.
    Ok,
    /// Still holds the sentinel, so the routine never wrote it.
    Unwritten,
    /// NaN or ±infinity.
    NonFinite,
}

impl ValueClass {
    /// Is this entry usable by the solver?
    #[inline(always)]
    pub fn is_ok(self) -> bool {
        matches!(self, ValueClass::Ok)
    }

    /// Short tag, for summaries and log fields.
    #[mutants::skip]
    pub fn name(self) -> &'static str {
        match self {
            ValueClass::Ok => "ok",
            ValueClass::Unwritten => "unwritten",
            ValueClass::NonFinite => "non-finite",
        }
    }
}

/// Classify one entry.
#[inline(always)]
pub fn classify(x: f64) -> ValueClass {
    if !x.is_finite() {
        ValueClass::NonFinite
    } else if is_sentinel(x) {
        ValueClass::Unwritten
    } else {
        ValueClass::Ok
    }
}

/// One entry of an array that was required to hold `len` values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EntryStatus {
    /// The buffer holds this entry.
    Present(f64, ValueClass),
    /// The buffer is absent, or too short to hold this entry.
    Missing,
}

impl EntryStatus {
    /// Is this entry usable by the solver?
    pub fn is_ok(self) -> bool {
        matches!(self, EntryStatus::Present(_, class) if class.is_ok())
    }
}

/// Is `buffer` a valid array of `len` user-written values?
///
/// An absent buffer is only valid when nothing was required of it.
/// A buffer shorter than `len` is invalid. Entries past `len` are ignored.
#[inline]
pub fn is_array_valid(len: usize, buffer: Option<&[f64]>) -> bool {
    match buffer {
        None => len == 0,
        Some(buffer) => {
            buffer.len() >= len && buffer[..len].iter().all(|&x| classify(x).is_ok())
        }
    }
}

/// Index of the first entry that makes [`is_array_valid`] fail, if any.
/// Missing entries count, so an absent buffer with `len > 0` reports 0.
pub fn find_invalid_value(len: usize, buffer: Option<&[f64]>) -> Option<usize> {
    let buffer = buffer.unwrap_or_default();
    let present = len.min(buffer.len());
    buffer[..present]
        .iter()
        .position(|&x| !classify(x).is_ok())
        .or((present < len).then_some(present))
}

/// Classify each of the `len` required entries of `buffer`, in order.
pub fn classify_array(
    len: usize,
    buffer: Option<&[f64]>,
) -> impl Iterator<Item = (usize, EntryStatus)> + '_ {
    let buffer = buffer.unwrap_or_default();
    (0..len).map(move |i| {
        let status = match buffer.get(i) {
            Some(&x) => EntryStatus::Present(x, classify(x)),
            None => EntryStatus::Missing,
        };
        (i, status)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SENTINEL;

    #[test]
    fn classification() {
        assert_eq!(classify(0.0), ValueClass::Ok);
        assert_eq!(classify(-3.5), ValueClass::Ok);
        assert_eq!(classify(f64::MAX), ValueClass::Ok);
        assert_eq!(classify(SENTINEL), ValueClass::Unwritten);
        assert_eq!(classify(f64::NAN), ValueClass::NonFinite);
        assert_eq!(classify(f64::INFINITY), ValueClass::NonFinite);
        assert_eq!(classify(f64::NEG_INFINITY), ValueClass::NonFinite);
    }

    #[test]
    fn absent_buffers() {
        assert!(is_array_valid(0, None));
        assert!(!is_array_valid(1, None));
        assert_eq!(find_invalid_value(0, None), None);
        assert_eq!(find_invalid_value(3, None), Some(0));
    }

    #[test]
    fn short_buffers_are_invalid() {
        let buffer = [1.0, 2.0];
        assert!(!is_array_valid(3, Some(&buffer)));
        assert_eq!(find_invalid_value(3, Some(&buffer)), Some(2));
        // Only the required prefix matters.
        assert!(is_array_valid(1, Some(&[1.0, f64::NAN])));
    }

    #[test]
    fn first_invalid_entry() {
        let buffer = [1.0, SENTINEL, f64::NAN];
        assert!(!is_array_valid(3, Some(&buffer)));
        assert_eq!(find_invalid_value(3, Some(&buffer)), Some(1));
        assert_eq!(find_invalid_value(1, Some(&buffer)), None);
    }

    #[test]
    fn per_entry_statuses() {
        let buffer = [1.0, SENTINEL, f64::INFINITY];
        let statuses: Vec<_> = classify_array(4, Some(&buffer)).collect();
        assert_eq!(
            statuses,
            vec![
                (0, EntryStatus::Present(1.0, ValueClass::Ok)),
                (1, EntryStatus::Present(SENTINEL, ValueClass::Unwritten)),
                (2, EntryStatus::Present(f64::INFINITY, ValueClass::NonFinite)),
                (3, EntryStatus::Missing),
            ]
        );
        assert!(statuses[0].1.is_ok());
        assert!(!statuses[3].1.is_ok());
    }
}
