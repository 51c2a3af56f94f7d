//! Error types for the ingestion crate.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use snapshot_codec::DecodeError;
use storage::StoreError;

/// Errors that stop the orchestrator itself rather than a single record.
#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Failed to read file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Unknown data type: {0}")]
    UnknownDataType(String),

    #[error("Invalid routing attributes: {0}")]
    InvalidRouting(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Reference entry {entry} failed: {reason}")]
    ReferenceEntry { entry: String, reason: String },

    #[error("Processing {} failed: {source}", .file.display())]
    Fatal {
        file: PathBuf,
        #[source]
        source: RecordError,
    },

    #[error("Failed to remove {}: {source}", .file.display())]
    Cleanup {
        file: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A natural key with no matching reference row.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceNotFound {
    #[error("Unknown station: {0}")]
    UnknownStation(String),

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Unknown instrument {instrument} at station {station}")]
    UnknownStationInstrument { station: String, instrument: String },
}

impl ReferenceNotFound {
    pub fn kind(&self) -> &'static str {
        match self {
            ReferenceNotFound::UnknownStation(_) => "unknown-station",
            ReferenceNotFound::UnknownDevice(_) => "unknown-device",
            ReferenceNotFound::UnknownInstrument(_) => "unknown-instrument",
            ReferenceNotFound::UnknownStationInstrument { .. } => "unknown-station-instrument",
        }
    }
}

/// Why reference resolution failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ResolveError {
    #[error(transparent)]
    NotFound(#[from] ReferenceNotFound),

    #[error("Lookup failed: {0}")]
    Store(#[from] StoreError),
}

/// Pipeline stage at which a file's processing stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Filter,
    Decode,
    Resolve,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Filter => "filter",
            Stage::Decode => "decode",
            Stage::Resolve => "resolve",
            Stage::Persist => "persist",
        })
    }
}

/// Failure of a single delivered file. Caught at the orchestrator boundary.
#[derive(Error, Debug)]
pub enum RecordError {
    #[error("Unknown data type: {0}")]
    UnknownDataType(String),

    #[error("Failed to read file: {0}")]
    Read(#[from] std::io::Error),

    #[error("Unreadable envelope: {0}")]
    Envelope(String),

    #[error("Decode failed: {0}")]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("Persist failed: {0}")]
    Persist(StoreError),
}

impl RecordError {
    pub fn stage(&self) -> Stage {
        match self {
            RecordError::UnknownDataType(_) => Stage::Filter,
            RecordError::Read(_) | RecordError::Envelope(_) | RecordError::Decode(_) => {
                Stage::Decode
            }
            RecordError::Resolve(_) => Stage::Resolve,
            RecordError::Persist(_) => Stage::Persist,
        }
    }
}

/// Result type for ingestion operations.
pub type Result<T> = std::result::Result<T, IngestionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_of_record_errors() {
        let decode = RecordError::from(DecodeError::UnsupportedVersion(9));
        assert_eq!(decode.stage(), Stage::Decode);

        let resolve = RecordError::from(ResolveError::from(ReferenceNotFound::UnknownDevice(
            "cam9".into(),
        )));
        assert_eq!(resolve.stage(), Stage::Resolve);
        assert_eq!(resolve.to_string(), "Unknown device: cam9");

        let persist = RecordError::Persist(StoreError::CommitFailed("boom".into()));
        assert_eq!(persist.stage(), Stage::Persist);
        assert_eq!(persist.stage().to_string(), "persist");
    }

    #[test]
    fn test_fatal_names_file() {
        let err = IngestionError::Fatal {
            file: PathBuf::from("/spool/a.dat"),
            source: RecordError::Envelope("bz2: stream truncated".into()),
        };
        assert_eq!(
            err.to_string(),
            "Processing /spool/a.dat failed: Unreadable envelope: bz2: stream truncated"
        );
    }

    #[test]
    fn test_cleanup_names_file() {
        let err = IngestionError::Cleanup {
            file: PathBuf::from("/spool/a.dat.bz2"),
            source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
        };
        assert!(err.to_string().starts_with("Failed to remove /spool/a.dat.bz2: "));
    }
}
