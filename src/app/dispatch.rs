use crate::cli::{Cli, Commands};
use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use tokio::io::AsyncReadExt;
use tonegate::Config;
use tonegate::admission::{AdmissionController, RequestKind};
use tonegate::clock::SystemClock;
use tonegate::identity::{ClientAttributes, ClientIdentity};
use tonegate::llm::{AiBackend, AudioClip, OpenAiBackend, RetryingTransport};
use tonegate::session::{InteractionMode, Orchestrator, SessionSnapshot, Tone};
use tonegate::store::{MemoryStateStore, SqliteStateStore, StateStore};

use crate::app::status::{render_quota, render_snapshot, render_status};

/// Persistent admission state for this profile.
fn open_admission(config: &Config) -> Result<Arc<AdmissionController>> {
    let store: Arc<dyn StateStore> = if config.storage.in_memory {
        Arc::new(MemoryStateStore::new())
    } else {
        let path = config.storage.state_db_path();
        Arc::new(
            SqliteStateStore::open(&path)
                .with_context(|| format!("Failed to open state database {}", path.display()))?,
        )
    };
    let client = ClientIdentity::resolve(store.as_ref(), &ClientAttributes::detect())
        .context("Failed to resolve client identity")?;
    Ok(Arc::new(AdmissionController::new(
        client,
        config.admission.policy(),
        store,
        Arc::new(SystemClock),
    )))
}

/// Wire admission, the retrying transport and the queue into an orchestrator.
pub fn build_orchestrator(config: &Config, mode: Option<InteractionMode>) -> Result<Orchestrator> {
    let admission = open_admission(config)?;
    let backend: Arc<dyn AiBackend> = Arc::new(OpenAiBackend::new(config.backend_settings()));
    let transport = Arc::new(RetryingTransport::new(backend, config.transport.retry_policy()));
    let orchestrator = Orchestrator::new(admission, transport, config.orchestrator_settings());
    orchestrator.set_mode(mode.unwrap_or(config.session.default_mode));
    Ok(orchestrator)
}

async fn read_stdin() -> Result<String> {
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("Failed to read text from stdin")?;
    Ok(text)
}

fn audio_mime_type(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",
        Some("ogg") => "audio/ogg",
        Some("flac") => "audio/flac",
        _ => "audio/webm",
    }
}

/// Print the snapshot as text or JSON.
fn print_snapshot(snapshot: &SessionSnapshot, json: bool) -> Result<()> {
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(snapshot).context("Failed to serialize snapshot")?
        );
    } else {
        println!("{}", render_snapshot(snapshot));
    }
    Ok(())
}

async fn run_analyze(
    config: &Config,
    text: Option<String>,
    mode: Option<InteractionMode>,
    tone: Option<Tone>,
    json: bool,
) -> Result<()> {
    let text = match text {
        Some(text) => text,
        None => read_stdin().await?,
    };
    let orchestrator = build_orchestrator(config, mode)?;
    orchestrator.run_analysis(&text)?.wait().await?;
    if let Some(tone) = tone {
        if let Some(ticket) = orchestrator.run_variant(tone)? {
            ticket.wait().await?;
        }
    }
    print_snapshot(&orchestrator.snapshot(), json)
}

async fn run_transcribe(
    config: &Config,
    path: &Path,
    analyze: bool,
    mode: Option<InteractionMode>,
) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read audio file {}", path.display()))?;
    let file_name = path
        .file_name()
        .map_or_else(|| "audio.webm".to_string(), |name| name.to_string_lossy().into_owned());
    let clip = AudioClip::new(file_name, audio_mime_type(path), bytes);

    let orchestrator = build_orchestrator(config, mode)?;
    let transcript = orchestrator.submit_audio(clip)?.wait().await?;
    println!("{transcript}");

    if analyze {
        orchestrator.run_analysis(&transcript)?.wait().await?;
        print_snapshot(&orchestrator.snapshot(), false)?;
    }
    Ok(())
}

fn run_quota(config: &Config) -> Result<()> {
    let admission = open_admission(config)?;
    for kind in [RequestKind::Text, RequestKind::Audio] {
        let quota = admission.remaining_quota_for(admission.client(), kind)?;
        let cooldown = admission.cooldown(kind)?;
        println!("{}", render_quota(kind, &quota, &cooldown));
    }
    Ok(())
}

pub async fn dispatch(cli: Cli, config: Arc<Config>) -> Result<()> {
    match cli.command {
        Commands::Analyze {
            text,
            mode,
            tone,
            json,
        } => run_analyze(&config, text, mode, tone, json).await,
        Commands::Transcribe {
            path,
            analyze,
            mode,
        } => run_transcribe(&config, &path, analyze, mode).await,
        Commands::Quota => run_quota(&config),
        Commands::Shell { mode } => {
            let orchestrator = build_orchestrator(&config, mode)?;
            crate::app::shell::run(&orchestrator).await
        }
        Commands::Status => {
            println!("{}", render_status(&config));
            Ok(())
        }
    }
}
