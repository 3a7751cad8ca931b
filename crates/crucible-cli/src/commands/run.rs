//! The `run` command: a full interview session over the console.
//!
//! Stdin lines stand in for finalized voice transcripts; spoken lines and
//! frontend signals print to stdout. This is the same coordinator wiring the
//! voice deployment uses, with the console as the transport.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use crucible_core::config::SessionConfig;
use crucible_core::persona::CandidateProfile;
use crucible_infrastructure::{ArtifactStore, TomlScenarioRepository};
use crucible_interaction::RestChatClient;
use crucible_session::{RoomTransport, SessionCoordinator, TranscriptEvent};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// Transport that prints speech and signals to the console.
struct ConsoleTransport;

#[async_trait]
impl RoomTransport for ConsoleTransport {
    async fn publish_data(&self, payload: Vec<u8>) -> crucible_core::Result<()> {
        let rendered = match serde_json::from_slice::<serde_json::Value>(&payload) {
            Ok(value) => value.to_string(),
            Err(_) => format!("{} opaque bytes", payload.len()),
        };
        println!("[signal] {rendered}");
        Ok(())
    }

    async fn say(&self, text: &str) -> crucible_core::Result<()> {
        println!("[voice] {text}");
        Ok(())
    }
}

pub async fn execute(
    scenario_id: String,
    candidate: Option<String>,
    scenarios_dir: PathBuf,
    config_path: Option<PathBuf>,
    output: PathBuf,
) -> Result<()> {
    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("reading config file {}", path.display()))?;
            toml::from_str::<SessionConfig>(&content)
                .with_context(|| format!("parsing config file {}", path.display()))?
        }
        None => SessionConfig::default(),
    };

    let repository = TomlScenarioRepository::new(scenarios_dir);
    let scenario = repository.get_or_default(&scenario_id)?;
    println!("Starting interview: {}", scenario.title);

    let chat = Arc::new(
        RestChatClient::try_from_env().context("configuring the chat backend")?,
    );

    let profile = match candidate {
        Some(name) => CandidateProfile {
            name,
            ..Default::default()
        },
        None => CandidateProfile::default(),
    };

    let session_id = uuid::Uuid::new_v4().to_string();
    let coordinator = Arc::new(SessionCoordinator::new(
        session_id.clone(),
        scenario,
        profile,
        config,
        chat,
        Arc::new(ConsoleTransport),
        Some(ArtifactStore::new(output)),
    ));

    // Stdin lines become finalized transcripts; EOF closes the session.
    let (tx, rx) = mpsc::channel::<TranscriptEvent>(16);
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            if tx.send(TranscriptEvent::candidate(line)).await.is_err() {
                break;
            }
        }
    });

    let report = coordinator.run(rx).await?;

    println!();
    println!("Session {session_id} finished.");
    println!(
        "Decision: {} (overall {:.2} / 10, {} turns evaluated, {} unparseable)",
        report.decision, report.overall_score, report.evaluated_turns, report.parse_failures
    );
    println!("{}", report.summary);

    Ok(())
}
