use std::{sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    config::{load_settings, normalize_engine_url, ClientSettings},
    DialogueEngine, HttpDialogueEngine, ScriptedDialogueEngine, SessionController, SessionEvent,
    TurnOutcome,
};
use report::{
    build_report_view_model, encode_report_link, load_report, render::render_view,
    sample_payload, ReportView,
};
use shared::domain::{scenario_catalog, Sender, SessionPhase};
use tokio::{
    io::{AsyncBufReadExt, BufReader},
    sync::broadcast::{self, error::RecvError},
};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

const OFFLINE_REPLIES: [&str; 2] = [
    "I see. What would you say to the teammate who keeps missing deadlines?",
    "That sounds fair. How would you make sure everyone agrees on next steps?",
];

#[derive(Parser, Debug)]
#[command(name = "practice", about = "Cross-cultural soft-skills roleplay practice")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the scenario catalog.
    Scenarios,
    /// Run an interactive roleplay session.
    Chat {
        #[arg(long)]
        scenario: Option<String>,
        #[arg(long)]
        engine_url: Option<String>,
        #[arg(long)]
        timeout_secs: Option<u64>,
        /// Use a scripted engine instead of the remote one.
        #[arg(long)]
        offline: bool,
        #[arg(long, default_value = "http://localhost:3000")]
        report_base: String,
    },
    /// Show the report for a hand-off link or raw evaluation data.
    Report {
        #[arg(long, conflicts_with = "demo")]
        data: Option<String>,
        #[arg(long)]
        demo: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let settings = load_settings();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&settings.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    match args.command {
        Command::Scenarios => {
            print_catalog();
            Ok(())
        }
        Command::Chat {
            scenario,
            engine_url,
            timeout_secs,
            offline,
            report_base,
        } => {
            let settings = ClientSettings {
                engine_url: engine_url.unwrap_or(settings.engine_url),
                request_timeout: timeout_secs
                    .map(|secs| (secs > 0).then(|| Duration::from_secs(secs)))
                    .unwrap_or(settings.request_timeout),
                default_scenario: scenario.or(settings.default_scenario),
                log_filter: settings.log_filter,
            };
            let report_base = Url::parse(&report_base)
                .with_context(|| format!("invalid report base url '{report_base}'"))?;
            run_chat(settings, offline, report_base).await
        }
        Command::Report { data, demo } => {
            let view = if demo {
                ReportView::Ready(build_report_view_model(&sample_payload()))
            } else {
                load_report(data.as_deref())
            };
            print!("{}", render_view(&view));
            if matches!(view, ReportView::NoData { .. }) {
                println!("Run `practice report --demo` to load sample data.");
            }
            Ok(())
        }
    }
}

fn print_catalog() {
    for scenario in scenario_catalog() {
        println!(
            "{:<10} {:<6} {}",
            scenario.id,
            scenario.difficulty.label(),
            scenario.title
        );
    }
}

async fn build_engine(settings: &ClientSettings, offline: bool) -> Result<Arc<dyn DialogueEngine>> {
    if offline {
        let evaluation = serde_json::to_value(sample_payload())?;
        info!("using scripted offline engine");
        return Ok(Arc::new(ScriptedDialogueEngine::roleplay(
            &OFFLINE_REPLIES,
            evaluation,
        )));
    }

    let engine_url = normalize_engine_url(&settings.engine_url)?;
    let engine = HttpDialogueEngine::new(engine_url);
    if let Err(error) = engine.health().await {
        warn!(engine_url = engine.base_url(), %error, "dialogue engine health check failed");
    }
    Ok(Arc::new(engine))
}

async fn run_chat(settings: ClientSettings, offline: bool, report_base: Url) -> Result<()> {
    let engine = build_engine(&settings, offline).await?;
    let controller = SessionController::new_with_timeout(engine, settings.request_timeout);
    let printer = tokio::spawn(print_events(controller.subscribe()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    let mut scenario_id = settings.default_scenario.clone();
    loop {
        let id = match scenario_id.take() {
            Some(id) => id,
            None => {
                print_catalog();
                println!("Choose a scenario id:");
                match lines.next_line().await? {
                    Some(line) => line,
                    None => return Ok(()),
                }
            }
        };
        match controller.start_scenario(&id).await {
            Ok(_) => break,
            Err(reason) => println!("{reason}"),
        }
    }
    println!("Type your response. /restart starts over, /quit leaves.");

    while let Some(line) = lines.next_line().await? {
        match line.trim() {
            "/quit" => break,
            "/restart" => {
                if let Err(reason) = restart(&controller).await {
                    println!("{reason}");
                }
                continue;
            }
            _ => {}
        }

        match controller.send_message(&line).await {
            Ok(TurnOutcome::Ended(payload)) => {
                let model = build_report_view_model(&payload);
                print!("{}", report::render::render_report(&model));
                let link = encode_report_link(&report_base, &payload)?;
                println!("Report link: {link}");
                println!("Conversation ended. /restart to try again, /quit to leave.");
            }
            Ok(_) => {}
            Err(reason) => println!("{reason}"),
        }
    }

    // Dropping the last sender closes the channel once the printer drains it.
    drop(controller);
    printer.await.context("event printer panicked")?;
    Ok(())
}

async fn restart(controller: &SessionController) -> Result<(), shared::error::ValidationError> {
    let snapshot = controller.snapshot().await;
    let scenario_id = snapshot.selected_scenario.map(|scenario| scenario.id);
    if snapshot.phase == SessionPhase::Active {
        controller.return_to_welcome().await?;
    }
    controller.start_scenario(scenario_id.unwrap_or_default()).await?;
    Ok(())
}

async fn print_events(events: broadcast::Receiver<SessionEvent>) {
    forward_events(events, |line| println!("{line}")).await;
}

/// Feeds display lines to `emit` until every sender is gone.
async fn forward_events(
    mut events: broadcast::Receiver<SessionEvent>,
    mut emit: impl FnMut(String),
) {
    loop {
        match events.recv().await {
            Ok(SessionEvent::EntryAppended { entry, .. }) => match entry.sender {
                Sender::User => {}
                Sender::Bot => emit(format!("bot> {}", entry.text)),
                Sender::System => emit(format!("*** {}", entry.text)),
            },
            Ok(SessionEvent::TypingChanged(true)) => emit("bot is typing...".to_string()),
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "event printer lagged"),
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
