//! Import options and configuration.

/// Options for importing documents.
#[derive(Debug, Clone)]
pub struct ImportOptions {
    /// Sanitize the final markup before it becomes a tree
    pub sanitize_html: bool,

    /// Append the advisory note to office extraction output
    pub append_conversion_note: bool,

    /// Office scanner tuning
    pub office: OfficeScanOptions,

    /// Fallback scanner tuning
    pub fallback: FallbackOptions,

    /// How extractor faults are handled
    pub error_mode: ErrorMode,
}

impl ImportOptions {
    /// Create new import options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set error mode.
    pub fn with_error_mode(mut self, mode: ErrorMode) -> Self {
        self.error_mode = mode;
        self
    }

    /// Surface extractor faults instead of degrading to the fallback scanner.
    pub fn strict(mut self) -> Self {
        self.error_mode = ErrorMode::Strict;
        self
    }

    /// Enable or disable final sanitization.
    pub fn with_sanitize(mut self, sanitize: bool) -> Self {
        self.sanitize_html = sanitize;
        self
    }

    /// Enable or disable the office conversion note.
    pub fn with_conversion_note(mut self, note: bool) -> Self {
        self.append_conversion_note = note;
        self
    }

    /// Set office scanner options.
    pub fn with_office(mut self, office: OfficeScanOptions) -> Self {
        self.office = office;
        self
    }

    /// Set fallback scanner options.
    pub fn with_fallback(mut self, fallback: FallbackOptions) -> Self {
        self.fallback = fallback;
        self
    }
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            sanitize_html: true,
            append_conversion_note: true,
            office: OfficeScanOptions::default(),
            fallback: FallbackOptions::default(),
            error_mode: ErrorMode::Lenient,
        }
    }
}

/// Error handling mode during import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ErrorMode {
    /// Degrade any extractor failure to the fallback scanner
    #[default]
    Lenient,
    /// Return unexpected extractor faults to the caller
    Strict,
}

/// Bounds used by the office body scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OfficeScanOptions {
    /// Bytes skipped past the body-part signature before the window starts
    pub skip: usize,
    /// Maximum window length in bytes
    pub window: usize,
    /// Look-behind distance before each text run
    pub lookbehind: usize,
}

impl Default for OfficeScanOptions {
    fn default() -> Self {
        Self {
            skip: 200,
            window: 300_000,
            lookbehind: 500,
        }
    }
}

/// Thresholds used by the fallback byte scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackOptions {
    /// Minimum printable bytes in a run before it is considered text
    pub min_run: usize,
    /// Run length at which a run is committed to the output
    pub commit_len: usize,
}

impl Default for FallbackOptions {
    fn default() -> Self {
        Self {
            min_run: 3,
            commit_len: 10,
        }
    }
}
