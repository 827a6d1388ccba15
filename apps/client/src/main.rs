mod api;
mod config;
mod errors;
mod export;
mod formatter;
mod generate;
mod history;
mod models;
mod session;
mod stage;
mod upload;

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::generate::GenerationParams;
use crate::session::SessionContext;
use crate::stage::Stage;
use crate::upload::{content_type_for_extension, UploadKind, UploadPayload};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting CV matcher client v{}", env!("CARGO_PKG_VERSION"));

    let session = SessionContext::new(config);
    info!(
        session_id = %session.session_id,
        base_url = %session.config.api_base_url,
        "Session ready"
    );
    info!(
        "Pipeline: {}",
        Stage::ALL.map(|s| s.label()).join(" / ")
    );

    run_flow(&session).await
}

/// One end-to-end flow: upload the configured documents, follow the stage
/// transitions, generate a tailored CV, and write both export artifacts.
async fn run_flow(session: &SessionContext) -> Result<()> {
    let job_submitted = submit_if_configured(
        session,
        UploadKind::JobListing,
        session.config.job_path.clone(),
    );
    let cv_submitted = submit_if_configured(session, UploadKind::Cv, session.config.cv_path.clone());
    let (job_submitted, cv_submitted) = tokio::join!(job_submitted, cv_submitted);

    if job_submitted? && cv_submitted? {
        wait_for_match(session).await;
    } else {
        info!("Not all inputs configured, generating from existing backend state");
    }

    session.stages.advance_to(Stage::Generate).await;

    let params = GenerationParams {
        github_username: session.config.github_username.clone().unwrap_or_default(),
        linkedin_url: session.config.linkedin_url.clone().unwrap_or_default(),
        use_sample_data: session.config.use_sample_data,
    };
    let record = session.flow.generate(&params).await?;
    info!(chars = record.tailored_resume.len(), "Tailored CV generated");

    let document = formatter::parse(&record.tailored_resume);
    if document.is_empty() {
        warn!("Generated CV parsed to an empty document, PDF will be blank");
    }
    let text = export::export_text(&record);
    let pdf = export::export_pdf(&document).await?;

    let out_dir = Path::new(&session.config.output_dir);
    let text_path = export::save_artifact(&text, out_dir).await?;
    let pdf_path = export::save_artifact(&pdf, out_dir).await?;
    info!(
        text = %text_path.display(),
        pdf = %pdf_path.display(),
        "Export artifacts written"
    );

    let entries = session.history.entries().await;
    if let Some(latest) = entries.first() {
        info!(
            count = entries.len(),
            latest = %latest.id,
            "History cache populated"
        );
    }

    Ok(())
}

/// Submits one input document when a path is configured. PDF and Word
/// files upload as multipart file parts; anything else is read as text.
/// Returns whether a submission happened.
async fn submit_if_configured(
    session: &SessionContext,
    kind: UploadKind,
    path: Option<String>,
) -> Result<bool> {
    let Some(path) = path else {
        info!(%kind, "No input configured, skipping upload");
        return Ok(false);
    };

    let payload = payload_from_path(&path).await?;
    let receipt = session.uploads.submit(kind, payload).await?;
    info!(%kind, message = %receipt.message, "Upload accepted");
    Ok(true)
}

async fn payload_from_path(path: &str) -> Result<UploadPayload> {
    let extension = Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    match content_type_for_extension(extension) {
        Some(content_type) => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("Failed to read {path}"))?;
            let filename = Path::new(path)
                .file_name()
                .and_then(|n| n.to_str())
                .unwrap_or("document")
                .to_string();
            Ok(UploadPayload::from_file(filename, content_type, bytes.into()))
        }
        None => {
            let text = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {path}"))?;
            Ok(UploadPayload::Text(text))
        }
    }
}

/// Waits for the automatic Upload → Match transition after both uploads
/// succeed. The transition fires on a delay, so poll a little past the
/// configured window before giving up and continuing manually.
async fn wait_for_match(session: &SessionContext) {
    if !session.stages.has_auto_advanced() {
        warn!("Both uploads succeeded but no Match transition was armed");
        return;
    }

    let deadline =
        tokio::time::Instant::now() + Duration::from_millis(session.config.auto_advance_delay_ms + 500);

    loop {
        if session.stages.current().await == Stage::Match {
            info!("Automatic Match transition observed");
            return;
        }
        if tokio::time::Instant::now() >= deadline {
            warn!("Automatic Match transition not observed in time, continuing");
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
}
