use core::fmt;

/// Errors reported by the identification engine.
/// 
/// Only capturing raw data and loading snapshots can fail, all decoding is total.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum Error {
    /// The target has no CPUID equivalent that can be used
    UnsupportedPlatform,
    /// The processor predates the CPUID instruction
    InstructionUnsupported,
    /// A query found no matching entries
    EmptyResult,
    /// A raw data snapshot could not be parsed
    InvalidSnapshot { line: usize, reason: String },
    /// Reading or writing a snapshot file failed
    Io(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::UnsupportedPlatform              => f.write_str("CPU identification is not supported on this platform"),
            Error::InstructionUnsupported           => f.write_str("The processor does not support the CPUID instruction"),
            Error::EmptyResult                      => f.write_str("Query returned no results"),
            Error::InvalidSnapshot { line, reason } => write!(f, "Invalid raw data snapshot (line {line}): {reason}"),
            Error::Io(err)                          => write!(f, "Snapshot I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err.to_string())
    }
}

pub type Result<T> = core::result::Result<T, Error>;
