//! Subcommand runners.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use clap::Args;
use tracing::{info, warn};
use walkdir::WalkDir;

use ingestion::envelope::open_envelope;
use ingestion::{
    load_reference_file, DeliveredFile, IngestOptions, IngestSummary, Ingester, RoutingAttributes,
    RoutingTable,
};
use storage::{PgBackend, Store, SCHEMA};

use crate::config::IngesterConfig;

/// Flags of the `ingest` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct IngestArgs {
    /// Files to ingest, in order
    pub files: Vec<PathBuf>,

    /// Also ingest every file below this directory
    #[arg(long)]
    pub dir: Option<PathBuf>,

    /// Transport group, e.g. transport.mango.station.lwl.outbound.greenline
    #[arg(long, conflicts_with_all = ["data_type", "site", "location"])]
    pub newsgroup: Option<String>,

    /// Xref header of the delivery (server name first)
    #[arg(long, requires = "newsgroup")]
    pub xref: Option<String>,

    /// RFC 2822 delivery date; defaults to now
    #[arg(long, requires = "newsgroup")]
    pub date: Option<String>,

    /// Data-type tag selecting the route
    #[arg(long, required_unless_present = "newsgroup")]
    pub data_type: Option<String>,

    #[arg(long, default_value = "")]
    pub site: String,

    #[arg(long, default_value = "")]
    pub location: String,

    #[arg(long, default_value = "localhost")]
    pub server: String,

    /// RFC 3339 delivery time; defaults to now
    #[arg(long)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl IngestArgs {
    /// Routing attributes shared by every file of this run.
    pub fn routing(&self) -> Result<RoutingAttributes> {
        if let Some(newsgroup) = &self.newsgroup {
            let xref = self.xref.clone().unwrap_or_else(|| self.server.clone());
            let date = self
                .date
                .clone()
                .unwrap_or_else(|| Utc::now().to_rfc2822());
            return Ok(RoutingAttributes::from_newsgroup(newsgroup, &xref, &date)?);
        }

        let data_type = self
            .data_type
            .clone()
            .context("Either --newsgroup or --data-type is required")?;
        Ok(RoutingAttributes {
            server_name: self.server.clone(),
            data_type,
            location: self.location.clone(),
            site_name: self.site.clone(),
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        })
    }

    /// Explicit files first, then the directory walk sorted by name.
    pub fn collect_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = self.files.clone();

        if let Some(dir) = &self.dir {
            for entry in WalkDir::new(dir).sort_by_file_name() {
                let entry =
                    entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
                if entry.file_type().is_file() {
                    files.push(entry.into_path());
                }
            }
        }

        anyhow::ensure!(!files.is_empty(), "No files to ingest");
        Ok(files)
    }
}

pub async fn run_ingest(config: &IngesterConfig, args: &IngestArgs) -> Result<IngestSummary> {
    let routing = args.routing()?;
    let files = args.collect_files()?;

    let store = Store::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    info!(backend = store.backend_name(), files = files.len(), "Store ready");

    ingest_files(
        store,
        config.routing_table()?,
        config.ingest.clone(),
        files,
        routing,
    )
    .await
}

/// Ingest `files` under one set of routing attributes.
pub async fn ingest_files(
    store: Store,
    routes: RoutingTable,
    options: IngestOptions,
    files: Vec<PathBuf>,
    routing: RoutingAttributes,
) -> Result<IngestSummary> {
    let ingester = Ingester::new(store, routes, options);
    let delivered: Vec<DeliveredFile> = files
        .into_iter()
        .map(|path| DeliveredFile {
            path,
            routing: routing.clone(),
        })
        .collect();

    let summary = ingester.process_batch(&delivered).await?;
    if summary.failed > 0 {
        warn!(failed = summary.failed, "Some files could not be ingested");
    }
    Ok(summary)
}

/// Decode a snapshot file and render its header, one field per line.
pub fn describe_file(path: &Path) -> Result<String> {
    let data = std::fs::read(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let payload = open_envelope(path, Bytes::from(data))?;
    let snapshot = snapshot_codec::decode(&payload)?;

    let mut out = String::new();
    for (name, value) in snapshot.metadata.fields() {
        match snapshot_codec::units(name) {
            Some(unit) => writeln!(out, "{:<16} {} [{}]", name, value, unit)?,
            None => writeln!(out, "{:<16} {}", name, value)?,
        }
    }
    let (height, width) = snapshot.pixels.shape();
    writeln!(out, "{:<16} {}x{}", "pixels", height, width)?;
    Ok(out)
}

pub async fn run_load_refs(config: &IngesterConfig, file: &Path) -> Result<usize> {
    let store = Store::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    let loaded = load_reference_file(&store, file).await?;
    info!(file = %file.display(), entries = loaded, "References loaded");
    Ok(loaded)
}

pub async fn run_migrate(config: &IngesterConfig) -> Result<()> {
    let backend = PgBackend::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    backend.migrate(&SCHEMA).await?;
    info!(tables = SCHEMA.len(), "Schema ready");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use ingestion::CleanupPolicy;
    use storage::Image;
    use test_utils::{fixtures::routing, seeded_store, SnapshotBuilder, Spool, START_TIME};

    fn flag_args(data_type: &str) -> IngestArgs {
        IngestArgs {
            data_type: Some(data_type.to_string()),
            site: "lwl".to_string(),
            location: "mango".to_string(),
            server: "localhost".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn test_routing_from_flags() {
        let mut args = flag_args("greenline");
        let at = Utc.timestamp_opt(1_628_830_000, 0).unwrap();
        args.timestamp = Some(at);

        let routing = args.routing().unwrap();
        assert_eq!(routing.data_type, "greenline");
        assert_eq!(routing.site_name, "lwl");
        assert_eq!(routing.location, "mango");
        assert_eq!(routing.timestamp, at);
    }

    #[test]
    fn test_routing_from_newsgroup() {
        let args = IngestArgs {
            newsgroup: Some(routing::NEWSGROUP.to_string()),
            xref: Some(routing::XREF.to_string()),
            date: Some(routing::DATE.to_string()),
            ..Default::default()
        };

        let attrs = args.routing().unwrap();
        assert_eq!(attrs.server_name, "news.example.org");
        assert_eq!(attrs.data_type, "greenline");
        assert_eq!(attrs.site_name, "lwl");
    }

    #[test]
    fn test_routing_requires_data_type() {
        assert!(IngestArgs::default().routing().is_err());
    }

    #[test]
    fn test_collect_files_walks_sorted() {
        let spool = Spool::new();
        let b = spool.write("b.dat", b"");
        let a = spool.write("a.dat", b"");
        std::fs::create_dir(spool.path().join("sub")).unwrap();
        let c = spool.write("sub/c.dat", b"");

        let args = IngestArgs {
            dir: Some(spool.path().to_path_buf()),
            ..flag_args("greenline")
        };
        assert_eq!(args.collect_files().unwrap(), vec![a, b, c]);
    }

    #[test]
    fn test_collect_files_empty_is_error() {
        assert!(flag_args("greenline").collect_files().is_err());
    }

    #[tokio::test]
    async fn test_ingest_files_summary() {
        let (store, _) = seeded_store().await;
        let spool = Spool::new();
        let files = vec![
            spool.write("a.dat", &SnapshotBuilder::new().build()),
            spool.write("b.dat", &SnapshotBuilder::new().device("cam9").build()),
        ];
        let options = IngestOptions {
            cleanup: CleanupPolicy::OnSuccess,
            exit_on_error: false,
        };

        let summary = ingest_files(
            store.clone(),
            RoutingTable::default(),
            options,
            files.clone(),
            flag_args("greenline").routing().unwrap(),
        )
        .await
        .unwrap();

        assert_eq!(summary.persisted, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(store.count::<Image>().await.unwrap(), 1);
        assert!(!files[0].exists());
        assert!(files[1].exists());
    }

    #[tokio::test]
    async fn test_ingest_files_exit_on_error() {
        let (store, _) = seeded_store().await;
        let spool = Spool::new();
        let files = vec![spool.write("a.dat", &SnapshotBuilder::new().station("zzz").build())];
        let options = IngestOptions {
            cleanup: CleanupPolicy::Always,
            exit_on_error: true,
        };

        let result = ingest_files(
            store,
            RoutingTable::default(),
            options,
            files,
            flag_args("greenline").routing().unwrap(),
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_describe_file() {
        let spool = Spool::new();
        let path = spool.write(
            "a.dat",
            &SnapshotBuilder::new().start_time(START_TIME).build(),
        );

        let text = describe_file(&path).unwrap();
        assert!(text.contains("station"));
        assert!(text.contains("lwl"));
        assert!(text.contains(&START_TIME.to_string()));
        assert!(text
            .lines()
            .any(|line| line.starts_with("pixels") && line.ends_with("2x4")));
        // Inspection never removes the file
        assert!(path.exists());
    }

    #[test]
    fn test_describe_file_rejects_garbage() {
        let spool = Spool::new();
        let path = spool.write("a.dat", b"not a snapshot");
        assert!(describe_file(&path).is_err());
    }
}
