//! Routing of delivered files to a codec by data-type tag.
//!
//! Files arrive through a newsgroup-style transport whose group names look
//! like `transport.<location>.station.<site>.outbound.<datatype>`. The
//! data-type tag selects a [`Route`]: which codec understands the payload
//! and which file names are worth decoding at all.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use glob::Pattern;
use serde::{Deserialize, Serialize};

use crate::error::{IngestionError, Result};

/// Where a file came from, as reported by the transport.
#[derive(Debug, Clone, PartialEq)]
pub struct RoutingAttributes {
    pub server_name: String,
    pub data_type: String,
    pub location: String,
    pub site_name: String,
    pub timestamp: DateTime<Utc>,
}

impl RoutingAttributes {
    /// Parse transport headers.
    ///
    /// `newsgroup` is e.g. `transport.mango.station.lwl.outbound.greenline`,
    /// `xref` starts with the server name and `date` is an RFC 2822 date.
    pub fn from_newsgroup(newsgroup: &str, xref: &str, date: &str) -> Result<Self> {
        let parts: Vec<&str> = newsgroup.split('.').collect();
        if parts.len() < 6 || parts.iter().any(|p| p.is_empty()) {
            return Err(IngestionError::InvalidRouting(format!(
                "malformed newsgroup '{}'",
                newsgroup
            )));
        }

        let server_name = xref
            .split_whitespace()
            .next()
            .ok_or_else(|| IngestionError::InvalidRouting("empty Xref header".to_string()))?;

        let timestamp = DateTime::parse_from_rfc2822(date.trim())
            .map_err(|e| IngestionError::InvalidRouting(format!("bad date '{}': {}", date, e)))?
            .with_timezone(&Utc);

        Ok(Self {
            server_name: server_name.to_string(),
            data_type: parts[parts.len() - 1].to_string(),
            location: parts[1].to_string(),
            site_name: parts[3].to_string(),
            timestamp,
        })
    }
}

/// Decoder a route hands its files to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CodecKind {
    /// Camera snapshot records
    Artemis,
}

/// Route configuration as written in the config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteConfig {
    #[serde(default = "default_codec")]
    pub codec: CodecKind,
    #[serde(default = "default_patterns")]
    pub patterns: Vec<String>,
}

fn default_codec() -> CodecKind {
    CodecKind::Artemis
}

fn default_patterns() -> Vec<String> {
    vec![
        "*.dat.bz2".to_string(),
        "*.dat".to_string(),
        "*.dat.gz".to_string(),
    ]
}

impl Default for RouteConfig {
    fn default() -> Self {
        Self {
            codec: default_codec(),
            patterns: default_patterns(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Route {
    pub codec: CodecKind,
    pub patterns: Vec<Pattern>,
}

impl Route {
    /// True when the file name (not the full path) matches any pattern.
    pub fn accepts(&self, path: &Path) -> bool {
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            return false;
        };
        self.patterns.iter().any(|p| p.matches(name))
    }
}

/// Data-type tag → route.
#[derive(Debug, Clone)]
pub struct RoutingTable {
    routes: BTreeMap<String, Route>,
}

impl RoutingTable {
    pub fn from_config(config: &BTreeMap<String, RouteConfig>) -> Result<Self> {
        let mut routes = BTreeMap::new();
        for (data_type, route) in config {
            if route.patterns.is_empty() {
                return Err(IngestionError::InvalidConfig(format!(
                    "route '{}' has no file patterns",
                    data_type
                )));
            }
            let patterns = route
                .patterns
                .iter()
                .map(|p| {
                    Pattern::new(p).map_err(|e| {
                        IngestionError::InvalidConfig(format!(
                            "route '{}': bad pattern '{}': {}",
                            data_type, p, e
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            routes.insert(
                data_type.clone(),
                Route {
                    codec: route.codec,
                    patterns,
                },
            );
        }
        Ok(Self { routes })
    }

    pub fn get(&self, data_type: &str) -> Option<&Route> {
        self.routes.get(data_type)
    }

    pub fn data_types(&self) -> impl Iterator<Item = &str> {
        self.routes.keys().map(String::as_str)
    }

    /// Whether `file` should be decoded for `data_type`.
    pub fn matches(&self, data_type: &str, file: &Path) -> Result<bool> {
        let route = self
            .get(data_type)
            .ok_or_else(|| IngestionError::UnknownDataType(data_type.to_string()))?;
        Ok(route.accepts(file))
    }
}

/// The camera channels handled out of the box.
pub fn default_routes() -> BTreeMap<String, RouteConfig> {
    ["greenline", "redline"]
        .into_iter()
        .map(|t| (t.to_string(), RouteConfig::default()))
        .collect()
}

impl Default for RoutingTable {
    fn default() -> Self {
        let routes = default_routes()
            .into_iter()
            .map(|(data_type, config)| {
                let patterns = config
                    .patterns
                    .iter()
                    .filter_map(|p| Pattern::new(p).ok())
                    .collect();
                (
                    data_type,
                    Route {
                        codec: config.codec,
                        patterns,
                    },
                )
            })
            .collect();
        Self { routes }
    }
}
