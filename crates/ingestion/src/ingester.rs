//! Per-file ingest orchestration.
//!
//! Each delivered file moves through
//! `received → filtered → decoded → resolved → persisted → cleaned_up`
//! and drops out to `failed` at the first error. Per-file errors are logged
//! and reported in the [`FileOutcome`]; they only escape as
//! [`IngestionError::Fatal`] when exit-on-error is set.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use tracing::{debug, error, info, instrument, warn};

use snapshot_codec::PixelMatrix;
use storage::{Image, Store, UpsertOutcome, IMAGE_KEY};

use crate::config::IngestOptions;
use crate::envelope::open_envelope;
use crate::error::{IngestionError, RecordError, Result};
use crate::record::image_from_snapshot;
use crate::resolver::{ReferenceKeys, ReferenceResolver};
use crate::routing::{CodecKind, RoutingAttributes, RoutingTable};

/// A file handed over by the transport.
#[derive(Debug, Clone)]
pub struct DeliveredFile {
    pub path: PathBuf,
    pub routing: RoutingAttributes,
}

/// What a successful ingest wrote.
#[derive(Debug, Clone)]
pub struct PersistedSnapshot {
    pub image: Image,
    pub outcome: UpsertOutcome,
    pub pixels: PixelMatrix,
}

#[derive(Debug)]
pub enum FileOutcome {
    Persisted(Box<PersistedSnapshot>),
    Skipped { reason: String },
    Failed(RecordError),
}

impl FileOutcome {
    pub fn is_failed(&self) -> bool {
        matches!(self, FileOutcome::Failed(_))
    }
}

/// Counts for a batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestSummary {
    pub persisted: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl IngestSummary {
    fn record(&mut self, outcome: &FileOutcome) {
        match outcome {
            FileOutcome::Persisted(_) => self.persisted += 1,
            FileOutcome::Skipped { .. } => self.skipped += 1,
            FileOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Drives delivered files through decode, resolution and persistence.
pub struct Ingester {
    store: Store,
    routes: RoutingTable,
    options: IngestOptions,
}

impl Ingester {
    pub fn new(store: Store, routes: RoutingTable, options: IngestOptions) -> Self {
        Self {
            store,
            routes,
            options,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn options(&self) -> &IngestOptions {
        &self.options
    }

    /// Process one delivered file, then apply the cleanup policy.
    #[instrument(
        skip(self, file),
        fields(file = %file.path.display(), data_type = %file.routing.data_type)
    )]
    pub async fn process_file(&self, file: &DeliveredFile) -> Result<FileOutcome> {
        let outcome = self.handle(file).await;

        match &outcome {
            FileOutcome::Persisted(persisted) => info!(
                site = %file.routing.site_name,
                id = persisted.outcome.id(),
                timestamp = %persisted.image.timestamp,
                "{} image record",
                persisted.outcome.verb()
            ),
            FileOutcome::Skipped { reason } => debug!(%reason, "Skipped file"),
            FileOutcome::Failed(e) => error!(stage = %e.stage(), error = %e, "Failed to process file"),
        }

        let removed = self.cleanup(&file.path, outcome.is_failed()).await;
        if let Err(e) = &removed {
            error!(error = %e, "Failed to remove file");
        }
        if !self.options.exit_on_error {
            return Ok(outcome);
        }

        match (outcome, removed) {
            (FileOutcome::Failed(source), _) => Err(IngestionError::Fatal {
                file: file.path.clone(),
                source,
            }),
            (_, Err(source)) => Err(IngestionError::Cleanup {
                file: file.path.clone(),
                source,
            }),
            (other, Ok(())) => Ok(other),
        }
    }

    /// Process files one after another.
    ///
    /// Stops at the first fatal error; files after it are left untouched.
    pub async fn process_batch(&self, files: &[DeliveredFile]) -> Result<IngestSummary> {
        let mut summary = IngestSummary::default();
        for file in files {
            let outcome = self.process_file(file).await?;
            summary.record(&outcome);
        }
        info!(
            persisted = summary.persisted,
            skipped = summary.skipped,
            failed = summary.failed,
            "Batch complete"
        );
        Ok(summary)
    }

    async fn handle(&self, file: &DeliveredFile) -> FileOutcome {
        let data_type = &file.routing.data_type;
        match self.routes.matches(data_type, &file.path) {
            Ok(true) => {}
            Ok(false) => {
                return FileOutcome::Skipped {
                    reason: format!("file name matches no {} pattern", data_type),
                }
            }
            Err(e) => {
                warn!(error = %e, "No route for file");
                return FileOutcome::Skipped {
                    reason: e.to_string(),
                };
            }
        }

        let data = match tokio::fs::read(&file.path).await {
            Ok(data) => Bytes::from(data),
            Err(e) => return FileOutcome::Failed(e.into()),
        };

        match self.ingest_bytes(data, &file.path, data_type).await {
            Ok(persisted) => FileOutcome::Persisted(Box::new(persisted)),
            Err(e) => FileOutcome::Failed(e),
        }
    }

    /// Decode, resolve and persist one payload.
    ///
    /// `file_name` selects the compression envelope; nothing is read from
    /// or removed on disk.
    pub async fn ingest_bytes(
        &self,
        data: Bytes,
        file_name: &Path,
        data_type: &str,
    ) -> std::result::Result<PersistedSnapshot, RecordError> {
        let route = self
            .routes
            .get(data_type)
            .ok_or_else(|| RecordError::UnknownDataType(data_type.to_string()))?;

        let payload = open_envelope(file_name, data)?;
        let snapshot = match route.codec {
            CodecKind::Artemis => snapshot_codec::decode(&payload)?,
        };

        let keys = ReferenceKeys::from_metadata(&snapshot.metadata, data_type);
        let refs = ReferenceResolver::new(&self.store).resolve(&keys).await?;

        let image = image_from_snapshot(&snapshot.metadata, &refs);
        let outcome = self
            .store
            .try_upsert(&image, Some(IMAGE_KEY))
            .await
            .map_err(RecordError::Persist)?;

        Ok(PersistedSnapshot {
            image,
            outcome,
            pixels: snapshot.pixels,
        })
    }

    async fn cleanup(&self, path: &Path, failed: bool) -> std::io::Result<()> {
        if !self.options.cleanup.removes(failed) {
            debug!(policy = %self.options.cleanup, "Keeping file");
            return Ok(());
        }
        match tokio::fs::remove_file(path).await {
            Ok(()) => {
                debug!("Removed file");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
