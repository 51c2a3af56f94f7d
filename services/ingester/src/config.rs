//! Ingester configuration.
//!
//! Loaded from a YAML file in which `${VAR}` and `${VAR:-default}` are
//! substituted from the environment before parsing. Every section is
//! optional; an empty file yields the built-in defaults.

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use ingestion::{default_routes, IngestOptions, RouteConfig, RoutingTable};
use storage::DatabaseConfig;

/// Top-level ingester configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct IngesterConfig {
    #[serde(default)]
    pub database: DatabaseConfig,

    #[serde(default)]
    pub ingest: IngestOptions,

    /// Data-type tag → codec and accepted file names
    #[serde(default = "default_routes")]
    pub routes: BTreeMap<String, RouteConfig>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for IngesterConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            ingest: IngestOptions::default(),
            routes: default_routes(),
            logging: LoggingConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Text,
}

impl IngesterConfig {
    /// Load the configuration file, or the defaults when `path` is `None`.
    ///
    /// `DATABASE_URL` overrides `database.url` either way.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read config file: {}", path.display()))?;
                Self::from_yaml_str(&content)
                    .with_context(|| format!("Invalid config file: {}", path.display()))?
            }
            None => Self::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse a YAML document after environment substitution.
    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let expanded = expand_env_vars(content)?;
        if expanded.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&expanded).context("Failed to parse YAML")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(url) = env::var("DATABASE_URL") {
            if !url.is_empty() {
                self.database.url = url;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(
            !self.database.url.is_empty(),
            "Database URL cannot be empty"
        );
        anyhow::ensure!(
            self.database.max_connections > 0,
            "database.max_connections must be greater than 0"
        );

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        anyhow::ensure!(
            valid_levels.contains(&self.logging.level.to_lowercase().as_str()),
            "Invalid log level: {} (must be one of: {:?})",
            self.logging.level,
            valid_levels
        );

        anyhow::ensure!(!self.routes.is_empty(), "At least one route must be configured");
        self.routing_table()?;
        Ok(())
    }

    pub fn routing_table(&self) -> Result<RoutingTable> {
        RoutingTable::from_config(&self.routes).context("Invalid routes section")
    }
}

/// Substitute `${VAR}` and `${VAR:-default}` references.
///
/// Comment lines are copied unchanged.
fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = String::with_capacity(content.len());
    for line in content.split_inclusive('\n') {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
        } else {
            expand_line(line, &mut result)?;
        }
    }
    Ok(result)
}

fn expand_line(line: &str, result: &mut String) -> Result<()> {
    let mut chars = line.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'

            let mut var_expr = String::new();
            let mut depth = 1;

            while depth > 0 {
                match chars.next() {
                    Some('{') => {
                        depth += 1;
                        var_expr.push('{');
                    }
                    Some('}') => {
                        depth -= 1;
                        if depth > 0 {
                            var_expr.push('}');
                        }
                    }
                    Some(c) => var_expr.push(c),
                    None => anyhow::bail!("Unclosed variable substitution: ${{{}", var_expr),
                }
            }

            result.push_str(&resolve_var_expr(&var_expr)?);
        } else {
            result.push(ch);
        }
    }

    Ok(())
}

/// `VAR` must be set; `VAR:-default` falls back when unset or empty.
fn resolve_var_expr(expr: &str) -> Result<String> {
    if let Some((name, default)) = expr.split_once(":-") {
        match env::var(name.trim()) {
            Ok(val) if !val.is_empty() => Ok(val),
            _ => Ok(default.to_string()),
        }
    } else {
        env::var(expr.trim()).with_context(|| format!("Environment variable {} not set", expr))
    }
}
