//! Camera snapshot ingestion library.
//!
//! Takes files delivered by the station transport, decodes them with the
//! snapshot codec, resolves their station, device and instrument references
//! and upserts one canonical image row per capture.
//!
//! # Architecture
//!
//! - [`routing`]: data-type tag → codec and file-name patterns
//! - [`envelope`]: gzip inflation before decoding
//! - [`resolver`]: natural keys → reference ids (read-only)
//! - [`ingester`]: the per-file state machine, cleanup and exit-on-error
//! - [`reference_loader`]: populating reference tables from YAML

pub mod config;
pub mod envelope;
pub mod error;
pub mod ingester;
pub mod record;
pub mod reference_loader;
pub mod resolver;
pub mod routing;

// Re-exports
pub use config::{CleanupPolicy, IngestOptions};
pub use error::{IngestionError, RecordError, ReferenceNotFound, ResolveError, Result, Stage};
pub use ingester::{DeliveredFile, FileOutcome, IngestSummary, Ingester, PersistedSnapshot};
pub use reference_loader::{load_reference_file, load_references, parse_references, ReferenceEntry};
pub use resolver::{ReferenceKeys, ReferenceResolver, ResolvedReferences};
pub use routing::{default_routes, CodecKind, Route, RouteConfig, RoutingAttributes, RoutingTable};
