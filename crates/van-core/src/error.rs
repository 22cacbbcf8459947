//! Error types for van-monitor
//!
//! None of these are fatal to the monitor loop. Sampling errors are counted
//! and logged, the affected subsystem keeps its last known values.

use thiserror_no_std::Error;

/// Reasons a line from the positioning receiver was rejected
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,
    #[error("line is not ASCII text")]
    NotAscii,
    #[error("line does not start with '$'")]
    MissingPrefix,
    #[error("unsupported sentence type")]
    UnsupportedSentence,
    #[error("no '*' checksum delimiter")]
    MissingChecksum,
    #[error("checksum is not two hex digits")]
    MalformedChecksum,
    #[error("checksum mismatch: sentence says {expected:02X}, computed {computed:02X}")]
    ChecksumMismatch { expected: u8, computed: u8 },
    #[error("expected {min}..={max} fields, found {found}")]
    FieldCount { min: usize, max: usize, found: usize },
    #[error("invalid {field} field")]
    InvalidField { field: &'static str },
}

/// Failures of one sampling cycle
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum SampleError {
    #[error("sentence rejected: {0}")]
    Parse(ParseError),
    #[error("no line from the positioning receiver before the timeout")]
    ReadTimeout,
    #[error("battery voltage {millivolts} mV outside the plausible range")]
    OutOfRangeSample { millivolts: i32 },
    #[error("hardware readout failed: {0}")]
    Readout(&'static str),
}

impl From<ParseError> for SampleError {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

/// Rejected startup configuration
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} interval must be non-zero")]
    ZeroInterval(&'static str),
    #[error("sampling interval must not be shorter than the render interval")]
    RenderSlowerThanSampling,
    #[error("home radius must be positive")]
    NonPositiveRadius,
    #[error("home coordinate out of range")]
    HomeOutOfRange,
}
