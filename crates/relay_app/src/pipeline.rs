//! flatten → rewrite → translate → chunk → persist → deliver.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use chat_session::{CancelSignal, ChatFailure, ChatSession, ChatUi, DeliveryOutcome};
use mom_relay::{
    chunk_text, flatten_rows, markdown_to_whatsapp, ChatText, Markdown, MessageChunk, Row,
};
use rewrite_provider::{ProviderProfile, RewriteProvider, RewriteRequest};
use sheets_api::{load_grid_file, SheetsApiClient, SheetsApiError};
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};

use crate::artifact::{ArtifactWriter, RunStamp};
use crate::error::RelayError;
use crate::logging::preview;

const RAW_PREVIEW_CHARS: usize = 1000;
const REWRITTEN_PREVIEW_CHARS: usize = 1200;

/// Supplies the spreadsheet rows for one run.
pub trait RowSource {
    /// Human-readable origin used in logs and errors.
    fn describe(&self) -> String;

    fn fetch_rows(&self) -> Result<Vec<Row>, SheetsApiError>;
}

/// Rows from a saved `spreadsheets.get` response.
#[derive(Debug, Clone)]
pub struct GridFileSource {
    path: PathBuf,
}

impl GridFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RowSource for GridFileSource {
    fn describe(&self) -> String {
        format!("grid file {}", self.path.display())
    }

    fn fetch_rows(&self) -> Result<Vec<Row>, SheetsApiError> {
        load_grid_file(&self.path)
    }
}

/// Rows fetched live from the Sheets API.
pub struct SheetsApiSource {
    runtime: Runtime,
    client: SheetsApiClient,
    spreadsheet_id: String,
    range: String,
}

impl SheetsApiSource {
    pub fn new(
        client: SheetsApiClient,
        spreadsheet_id: impl Into<String>,
        range: impl Into<String>,
    ) -> std::io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        Ok(Self {
            runtime,
            client,
            spreadsheet_id: spreadsheet_id.into(),
            range: range.into(),
        })
    }
}

impl RowSource for SheetsApiSource {
    fn describe(&self) -> String {
        if self.range.is_empty() {
            format!("spreadsheet {}", self.spreadsheet_id)
        } else {
            format!("spreadsheet {} ({})", self.spreadsheet_id, self.range)
        }
    }

    fn fetch_rows(&self) -> Result<Vec<Row>, SheetsApiError> {
        self.runtime
            .block_on(self.client.fetch_rows(&self.spreadsheet_id, &self.range))
    }
}

/// Everything produced before the chat client is touched.
#[derive(Debug, Clone)]
pub struct PreparedMessage {
    pub stamp: RunStamp,
    /// Rewritten markdown, as persisted.
    pub markdown: String,
    pub chat_text: ChatText,
    pub chunks: Vec<MessageChunk>,
    pub artifact: PathBuf,
    pub provider: ProviderProfile,
}

/// Summary of one run.
#[derive(Debug, Clone)]
pub struct DeliveryReport {
    pub artifact: PathBuf,
    pub chunk_count: usize,
    pub chunks_sent: usize,
    /// `None` for dry runs.
    pub outcome: Option<DeliveryOutcome>,
}

impl DeliveryReport {
    pub fn is_dry_run(&self) -> bool {
        self.outcome.is_none()
    }
}

/// Sequential delivery of one spreadsheet as chat messages.
pub struct DeliveryPipeline {
    source: Box<dyn RowSource>,
    provider: Arc<dyn RewriteProvider>,
    artifacts: ArtifactWriter,
    max_chunk_len: usize,
    system_instructions: Option<String>,
    layout_instructions: Option<String>,
}

impl DeliveryPipeline {
    pub fn new(
        source: Box<dyn RowSource>,
        provider: Arc<dyn RewriteProvider>,
        artifacts: ArtifactWriter,
        max_chunk_len: usize,
    ) -> Self {
        Self {
            source,
            provider,
            artifacts,
            max_chunk_len,
            system_instructions: None,
            layout_instructions: None,
        }
    }

    pub fn with_system_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.system_instructions = Some(instructions.into());
        self
    }

    pub fn with_layout_instructions(mut self, instructions: impl Into<String>) -> Self {
        self.layout_instructions = Some(instructions.into());
        self
    }

    pub fn artifacts(&self) -> &ArtifactWriter {
        &self.artifacts
    }

    fn rewrite_request(&self, document: &str) -> RewriteRequest {
        let mut request = RewriteRequest::new(document);
        if let Some(instructions) = &self.system_instructions {
            request = request.with_system_instructions(instructions.clone());
        }
        if let Some(instructions) = &self.layout_instructions {
            request = request.with_layout_instructions(instructions.clone());
        }
        request
    }

    /// Runs every stage up to and including the local artifact.
    pub fn prepare(&self, cancel: &CancelSignal) -> Result<PreparedMessage, RelayError> {
        let source_name = self.source.describe();
        info!(source = %source_name, "fetching rows");
        let rows = self
            .source
            .fetch_rows()
            .map_err(|error| RelayError::Fetch {
                source_name: source_name.clone(),
                error,
            })?;

        let document = flatten_rows(&rows)?;
        info!(
            rows = rows.len(),
            paragraphs = document.paragraph_count(),
            "flattened notes"
        );
        debug!(preview = %preview(document.as_str(), RAW_PREVIEW_CHARS), "raw notes");

        let stamp = RunStamp::now();
        let provider = self.provider.profile();
        info!(provider = %provider.provider_id, model = %provider.model_id, "rewriting notes");
        let markdown = match self
            .provider
            .rewrite(&self.rewrite_request(document.as_str()), cancel)
        {
            Ok(markdown) => markdown,
            Err(error) => {
                let raw_artifact = match self.artifacts.write_raw(&stamp, document.as_str()) {
                    Ok(path) => Some(path),
                    Err(write_error) => {
                        warn!(error = %write_error, "could not save raw notes");
                        None
                    }
                };
                return Err(RelayError::Rewrite {
                    error,
                    raw_artifact,
                });
            }
        };
        debug!(preview = %preview(&markdown, REWRITTEN_PREVIEW_CHARS), "rewritten notes");

        let chat_text = markdown_to_whatsapp(&Markdown::new(markdown.as_str()));
        let chunks = chunk_text(chat_text.as_str(), self.max_chunk_len);
        let artifact = self.artifacts.write_rewritten(&stamp, &markdown)?;
        info!(
            artifact = %artifact.display(),
            chunks = chunks.len(),
            max_chunk_len = self.max_chunk_len,
            "saved rewritten notes"
        );

        Ok(PreparedMessage {
            stamp,
            markdown,
            chat_text,
            chunks,
            artifact,
            provider,
        })
    }

    /// Sends a prepared message through `session`.
    pub fn deliver<U: ChatUi>(
        &self,
        prepared: &PreparedMessage,
        session: &mut ChatSession<U>,
        cancel: &CancelSignal,
    ) -> Result<DeliveryReport, RelayError> {
        let total = prepared.chunks.len();
        if cancel.load(Ordering::Acquire) {
            return Err(RelayError::Deliver {
                failure: ChatFailure::Cancelled { sent: 0, total },
                sent: 0,
                total,
                artifact: prepared.artifact.clone(),
            });
        }

        info!(
            conversation = %session.config().conversation,
            chunks = total,
            "delivering"
        );
        let outcome = session.deliver(&prepared.chunks, cancel);
        if let Some(failure) = outcome.failure() {
            return Err(RelayError::Deliver {
                failure: failure.clone(),
                sent: outcome.chunks_sent,
                total,
                artifact: prepared.artifact.clone(),
            });
        }

        Ok(DeliveryReport {
            artifact: prepared.artifact.clone(),
            chunk_count: total,
            chunks_sent: outcome.chunks_sent,
            outcome: Some(outcome),
        })
    }

    /// Full run against `session`.
    pub fn run<U: ChatUi>(
        &self,
        session: &mut ChatSession<U>,
        cancel: &CancelSignal,
    ) -> Result<DeliveryReport, RelayError> {
        let prepared = self.prepare(cancel)?;
        self.deliver(&prepared, session, cancel)
    }

    /// Stops after the artifact; no browser is opened.
    pub fn dry_run(&self, cancel: &CancelSignal) -> Result<(PreparedMessage, DeliveryReport), RelayError> {
        let prepared = self.prepare(cancel)?;
        let report = DeliveryReport {
            artifact: prepared.artifact.clone(),
            chunk_count: prepared.chunks.len(),
            chunks_sent: 0,
            outcome: None,
        };
        Ok((prepared, report))
    }
}
