//! CLI runner - executes commands

use crate::cli::commands::{Cli, Commands, OutputFormat};
use crate::config::{ConfiguredCatalog, SourceConfig};
use crate::connector::{Connector, KyveSource};
use crate::engine::{Message, SyncConfig};
use crate::error::{Error, Result, ResultExt};
use crate::output::{ParquetSink, ParquetWriterConfig};
use crate::state::StateManager;
use crate::types::SyncMode;
use serde_json::{json, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;
use std::time::Instant;
use tracing::warn;

/// CLI runner
pub struct Runner {
    cli: Cli,
    out: Mutex<Box<dyn Write + Send>>,
}

impl Runner {
    /// Create a runner printing protocol messages to stdout
    pub fn new(cli: Cli) -> Self {
        Self::with_writer(cli, Box::new(std::io::stdout()))
    }

    /// Create a runner printing protocol messages to `out`
    pub fn with_writer(cli: Cli, out: Box<dyn Write + Send>) -> Self {
        Self {
            cli,
            out: Mutex::new(out),
        }
    }

    /// Run the CLI command
    pub async fn run(&self) -> Result<()> {
        match &self.cli.command {
            Commands::Spec => self.spec(),
            Commands::Check => self.check().await,
            Commands::Discover => self.discover().await,
            Commands::Read {
                streams,
                output,
                max_records,
                state_per_page,
                full_refresh,
            } => {
                let mode = if *full_refresh {
                    SyncMode::FullRefresh
                } else {
                    SyncMode::Incremental
                };
                self.read(
                    streams.as_deref(),
                    output.as_deref(),
                    *max_records,
                    *state_per_page,
                    mode,
                )
                .await
            }
        }
    }

    /// Load configuration as raw JSON
    fn load_config(&self) -> Result<Value> {
        // Inline config takes precedence
        if let Some(json_str) = &self.cli.config_json {
            return serde_json::from_str(json_str)
                .map_err(|e| Error::config(format!("Invalid config JSON: {e}")));
        }

        let path = self
            .cli
            .config
            .as_ref()
            .ok_or_else(|| Error::config("No configuration given (use --config or --config-json)"))?;
        let content = fs::read_to_string(path)
            .map_err(|e| Error::config(format!("Failed to read config file: {e}")))?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| Error::config(format!("Invalid config YAML: {e}"))),
            _ => serde_json::from_str(&content)
                .map_err(|e| Error::config(format!("Invalid config JSON: {e}"))),
        }
    }

    /// Load state
    fn load_state(&self) -> Result<StateManager> {
        // Inline state takes precedence
        if let Some(state_json) = &self.cli.state_json {
            StateManager::from_json(state_json)
        } else if let Some(path) = &self.cli.state {
            StateManager::from_file(path)
        } else {
            Ok(StateManager::in_memory())
        }
    }

    /// Show spec
    fn spec(&self) -> Result<()> {
        let spec = KyveSource::new().spec();
        self.output_message(&json!({
            "type": "SPEC",
            "spec": spec
        }))
    }

    /// Check connection
    async fn check(&self) -> Result<()> {
        let config = self.load_config()?;
        self.output_message(&Message::info("Checking KYVE pools").to_protocol_json())?;

        let result = KyveSource::new().check(&config).await?;
        let status = if result.success {
            json!({"status": "SUCCEEDED", "message": "Connection successful"})
        } else {
            json!({
                "status": "FAILED",
                "message": format!(
                    "Connection failed: {}",
                    result.message.unwrap_or_default()
                )
            })
        };
        self.output_message(&json!({
            "type": "CONNECTION_STATUS",
            "connectionStatus": status
        }))
    }

    /// Discover streams
    async fn discover(&self) -> Result<()> {
        let config = self.load_config()?;
        let catalog = KyveSource::new().discover(&config).await?;
        self.output_message(&json!({
            "type": "CATALOG",
            "catalog": catalog
        }))
    }

    /// Read data
    async fn read(
        &self,
        streams: Option<&str>,
        output: Option<&Path>,
        max_records: Option<usize>,
        state_per_page: bool,
        mode: SyncMode,
    ) -> Result<()> {
        let sync_start = Instant::now();
        let raw_config = self.load_config()?;
        let config = SourceConfig::from_value(&raw_config)?;
        let state = self.load_state()?;

        let mut sink = match (self.cli.format, output) {
            (_, Some(dir)) => Some(ParquetSink::new(dir, ParquetWriterConfig::default())?),
            (OutputFormat::Parquet, None) => {
                return Err(Error::config("Parquet format requires --output directory"))
            }
            _ => None,
        };

        let discovered = KyveSource::new().discover(&raw_config).await?;
        let mut catalog = ConfiguredCatalog::from_catalog(&discovered, mode);
        if let Some(filter) = streams.filter(|s| !s.trim().is_empty()) {
            let names: Vec<String> = filter.split(',').map(|s| s.trim().to_string()).collect();
            if let Some(unknown) = names.iter().find(|n| catalog.get(n).is_none()) {
                return Err(Error::StreamNotFound {
                    stream: unknown.clone(),
                });
            }
            catalog = catalog.select(&names);
        }

        let sync_config = SyncConfig::new()
            .with_max_records(max_records.unwrap_or(0))
            .with_state_per_page(state_per_page);
        let source = KyveSource::new().with_sync_config(sync_config);
        let mut engine = source.build_engine(&config, &catalog, state.clone()).await?;

        let outcome = loop {
            match engine.next_message().await {
                Ok(Some(message)) => {
                    if let Err(e) = self.emit(&message, sink.as_mut()) {
                        break Err(e);
                    }
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        // Finalize output files and persist state even when the sync failed
        let finished = sink.map_or_else(|| Ok(Vec::new()), ParquetSink::finish);
        let saved = match &self.cli.state {
            Some(state_path) => state
                .save_to_file(state_path)
                .await
                .with_context(|| format!("Failed to save state to {}", state_path.display())),
            None => Ok(()),
        };
        let written = settle(outcome, finished, saved)?;

        let stats = engine.stats();
        self.output_message(&json!({
            "type": "SYNC_SUMMARY",
            "summary": {
                "status": if stats.errors == 0 { "SUCCEEDED" } else { "PARTIAL" },
                "total_records": stats.records_synced,
                "total_streams": catalog.streams.len(),
                "pages_fetched": stats.pages_fetched,
                "bundles_processed": stats.bundles_processed,
                "bundles_skipped": stats.bundles_skipped,
                "failed_streams": stats.errors,
                "duration_ms": sync_start.elapsed().as_millis() as u64,
                "output": {
                    "format": self.cli.format.as_str(),
                    "files": written
                        .iter()
                        .map(|w| json!({
                            "stream": w.stream,
                            "path": w.path.to_string_lossy(),
                            "rows": w.rows
                        }))
                        .collect::<Vec<_>>(),
                    "state_file": self.cli.state.as_ref().map(|p| p.to_string_lossy().to_string())
                }
            }
        }))
    }

    /// Route an engine message to stdout and/or the Parquet sink
    fn emit(&self, message: &Message, sink: Option<&mut ParquetSink>) -> Result<()> {
        if let Message::Record { stream, record, .. } = message {
            if let Some(sink) = sink {
                sink.push(stream, record.clone())?;
            }
            if self.cli.format == OutputFormat::Parquet {
                return Ok(());
            }
        }
        self.output_message(&message.to_protocol_json())
    }

    /// Output a message
    fn output_message(&self, msg: &Value) -> Result<()> {
        let line = match self.cli.format {
            OutputFormat::Json | OutputFormat::Parquet => serde_json::to_string(msg)?,
            OutputFormat::Pretty => serde_json::to_string_pretty(msg)?,
        };
        let mut out = self
            .out
            .lock()
            .map_err(|_| Error::Other("Output writer poisoned".to_string()))?;
        writeln!(out, "{line}")?;
        out.flush()?;
        Ok(())
    }
}

/// Combine a sync's outcome with the finalization steps that ran after it
///
/// A sync error is returned as is; finalization errors behind it are logged.
fn settle<T>(outcome: Result<()>, finished: Result<T>, saved: Result<()>) -> Result<T> {
    if let Err(e) = outcome {
        if let Err(finish_err) = finished {
            warn!(error = %finish_err, "Failed to finalize Parquet output");
        }
        if let Err(save_err) = saved {
            warn!(error = %save_err, "Failed to save state");
        }
        return Err(e);
    }
    let written = finished?;
    saved?;
    Ok(written)
}
