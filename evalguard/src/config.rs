/// Below this many entries, the error report lists every entry of a failing
/// array, not just the offending ones.
pub const DEFAULT_FULL_LISTING_THRESHOLD: usize = 50;

/// Knobs for the cold, diagnostic path. Validation itself has none.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Config {
    /// Arrays with fewer entries than this are listed in full in error reports.
    /// Longer arrays only list their offending entries.
    pub full_listing_threshold: usize,
    /// Start error reports with the explanation of what evaluation routines must do.
    pub include_preamble: bool,
    /// Emit the error report through `tracing` when a guarded evaluation fails.
    pub log_reports: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            full_listing_threshold: DEFAULT_FULL_LISTING_THRESHOLD,
            include_preamble: true,
            log_reports: true,
        }
    }
}

impl Config {
    /// Set [`Config::full_listing_threshold`].
    pub fn with_full_listing_threshold(mut self, threshold: usize) -> Self {
        self.full_listing_threshold = threshold;
        self
    }

    /// Set [`Config::include_preamble`].
    pub fn with_preamble(mut self, enabled: bool) -> Self {
        self.include_preamble = enabled;
        self
    }

    /// Set [`Config::log_reports`].
    pub fn with_log_reports(mut self, enabled: bool) -> Self {
        self.log_reports = enabled;
        self
    }

    /// Should an array of `len` entries be listed in full?
    pub(crate) fn lists_everything(&self, len: usize) -> bool {
        len < self.full_listing_threshold
    }
}
