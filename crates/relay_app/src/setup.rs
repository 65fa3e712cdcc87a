//! Builds pipeline collaborators from a [`RelayConfig`].

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chat_session::{ChatSession, WhatsAppWeb};
use rewrite_provider::{PassthroughProvider, RewriteProvider};
use rewrite_provider_mock::ScriptedProvider;
use rewrite_provider_openai::{OpenAiRewriteProvider, OpenAiRewriteProviderConfig};
use sheets_api::{ServiceAccountKey, SheetsApiClient, SheetsApiConfig};
use tracing::{info, warn};

use crate::artifact::ArtifactWriter;
use crate::config::{env_secret, RelayConfig, RewriteBackend, RewriteSection, SheetSection};
use crate::error::RelayError;
use crate::pipeline::{DeliveryPipeline, GridFileSource, RowSource, SheetsApiSource};

/// Command-line overrides applied on top of the file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub grid_file: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub conversation: Option<String>,
    pub dry_run: bool,
    pub passthrough: bool,
}

impl RunOptions {
    pub fn apply(&self, config: &mut RelayConfig) {
        if let Some(path) = &self.grid_file {
            config.sheet.grid_file = Some(path.clone());
        }
        if let Some(dir) = &self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(conversation) = &self.conversation {
            config.delivery.conversation = conversation.clone();
        }
        if self.passthrough {
            config.rewrite.provider = RewriteBackend::Passthrough;
        }
    }
}

pub fn build_source(sheet: &SheetSection) -> Result<Box<dyn RowSource>, RelayError> {
    if let Some(path) = &sheet.grid_file {
        return Ok(Box::new(GridFileSource::new(path.clone())));
    }

    let spreadsheet_id = sheet
        .spreadsheet_id
        .as_deref()
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .ok_or_else(|| RelayError::setup("spreadsheet source", "no spreadsheet_id or grid_file"))?;

    let mut api = match (
        env_secret(&sheet.access_token_env),
        &sheet.service_account_file,
        sheet.api_key_env.as_deref().and_then(env_secret),
    ) {
        (Some(token), _, _) => SheetsApiConfig::with_access_token(token),
        (None, Some(path), _) => {
            let key = ServiceAccountKey::from_file(path)
                .map_err(|error| RelayError::setup("spreadsheet source", error))?;
            SheetsApiConfig::with_service_account(key)
        }
        (None, None, Some(key)) => SheetsApiConfig::with_api_key(key),
        (None, None, None) => {
            return Err(RelayError::setup(
                "spreadsheet source",
                format!(
                    "set {} to an OAuth access token or configure sheet.service_account_file",
                    sheet.access_token_env
                ),
            ))
        }
    };
    if let Some(base_url) = &sheet.base_url {
        api = api.with_base_url(base_url.clone());
    }
    if sheet.timeout_secs > 0 {
        api = api.with_timeout(Duration::from_secs(sheet.timeout_secs));
    }

    let client =
        SheetsApiClient::new(api).map_err(|error| RelayError::setup("spreadsheet source", error))?;
    let source = SheetsApiSource::new(client, spreadsheet_id, sheet.range.clone())
        .map_err(|error| RelayError::setup("spreadsheet source", error))?;
    Ok(Box::new(source))
}

/// Picks the rewrite backend; a dry run without an API key falls back to passthrough.
pub fn build_provider(
    rewrite: &RewriteSection,
    dry_run: bool,
) -> Result<Arc<dyn RewriteProvider>, RelayError> {
    match rewrite.provider {
        RewriteBackend::Passthrough => Ok(Arc::new(PassthroughProvider)),
        RewriteBackend::Mock => Ok(Arc::new(ScriptedProvider::default())),
        RewriteBackend::Openai => {
            let Some(api_key) = rewrite.api_key() else {
                if dry_run {
                    warn!(
                        env = %rewrite.api_key_env,
                        "no API key for the rewrite; dry run keeps the notes unchanged"
                    );
                    return Ok(Arc::new(PassthroughProvider));
                }
                return Err(RelayError::setup(
                    "rewrite provider",
                    format!("set {} to an OpenAI API key", rewrite.api_key_env),
                ));
            };

            let mut config = OpenAiRewriteProviderConfig::new(api_key)
                .with_model(rewrite.model.clone())
                .with_temperature(rewrite.temperature)
                .with_max_tokens(rewrite.max_tokens)
                .with_max_retries(rewrite.max_retries);
            if let Some(base_url) = &rewrite.base_url {
                config = config.with_base_url(base_url.clone());
            }
            if rewrite.timeout_secs > 0 {
                config = config.with_timeout(Duration::from_secs(rewrite.timeout_secs));
            }
            let provider = OpenAiRewriteProvider::new(config)
                .map_err(|error| RelayError::setup("rewrite provider", error))?;
            Ok(Arc::new(provider))
        }
    }
}

pub fn build_pipeline(config: &RelayConfig, dry_run: bool) -> Result<DeliveryPipeline, RelayError> {
    let source = build_source(&config.sheet)?;
    let provider = build_provider(&config.rewrite, dry_run)?;
    let profile = provider.profile();
    info!(provider = %profile.provider_id, model = %profile.model_id, "rewrite provider ready");

    let mut pipeline = DeliveryPipeline::new(
        source,
        provider,
        ArtifactWriter::new(config.output_dir.clone()),
        config.delivery.max_chunk_len,
    );
    if let Some(instructions) = &config.rewrite.system_instructions {
        pipeline = pipeline.with_system_instructions(instructions.clone());
    }
    if let Some(instructions) = &config.rewrite.layout_instructions {
        pipeline = pipeline.with_layout_instructions(instructions.clone());
    }
    Ok(pipeline)
}

pub fn build_session(config: &RelayConfig) -> Result<ChatSession<WhatsAppWeb>, RelayError> {
    let ui = WhatsAppWeb::new(config.whatsapp_options())
        .map_err(|error| RelayError::setup("browser driver", error))?;
    Ok(ChatSession::new(
        ui,
        config.session_store(),
        config.chat_session_config(),
    ))
}
