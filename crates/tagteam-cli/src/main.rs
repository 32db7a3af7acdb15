//! tagteam - run a team of agents on one task
//!
//! ## Commands
//!
//! - `run`: Run one session from a team config and a policy script
//! - `validate`: Check a team config and print the effective participants
//! - `inspect`: Verify a saved trajectory and summarize it
//! - `sessions`: List sessions recorded in the trajectory ledger

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn, Level};

use tagteam_core::obs::SessionSpan;
use tagteam_core::runtime::DEFAULT_TIMEOUT_SECS;
use tagteam_core::{
    read_trajectory_file, write_trajectory_artifact, AgentAdapter, LedgerRecorder, Outcome,
    PolicyScript, ProcessRuntime, SessionReport, TeamConfig, TeamOrchestrator, TerminationReason,
    TrajectoryArtifact,
};
use tagteam_state::{FsTrajectoryLedger, TrajectoryLedger};

const DEFAULT_OUTPUT_DIR: &str = ".tagteam/runs";

#[derive(Parser)]
#[command(name = "tagteam")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Turn-based multi-agent sessions", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one session and write its trajectory
    Run(RunArgs),

    /// Validate a team config
    Validate {
        /// Path to the team config (TOML)
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Verify and summarize a trajectory file
    Inspect {
        /// Path to a trajectory.json
        path: PathBuf,

        /// Print one line per recorded step
        #[arg(long)]
        steps: bool,
    },

    /// List sessions in the trajectory ledger
    Sessions {
        /// Root directory for run output
        #[arg(long, env = "TAGTEAM_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
        output_dir: PathBuf,

        /// Only show sessions for this team
        #[arg(long)]
        team: Option<String>,
    },
}

#[derive(Args, Debug, Clone)]
struct RunArgs {
    /// Path to the team config (TOML)
    #[arg(short, long)]
    config: PathBuf,

    /// Path to the policy script (JSON)
    #[arg(short, long)]
    script: PathBuf,

    /// Problem statement (overrides `task` in the config)
    #[arg(long)]
    task: Option<String>,

    /// Global step budget, retries included (overrides the config)
    #[arg(long, env = "TAGTEAM_STEP_BUDGET")]
    step_budget: Option<u64>,

    /// Working directory for shell commands
    #[arg(long, default_value = ".")]
    workdir: PathBuf,

    /// Root directory for run output
    #[arg(long, env = "TAGTEAM_OUTPUT_DIR", default_value = DEFAULT_OUTPUT_DIR)]
    output_dir: PathBuf,

    /// Per-command timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    tagteam_core::init_tracing(cli.json, level);

    match cli.command {
        Commands::Run(args) => cmd_run(&args).await,
        Commands::Validate { config } => cmd_validate(&config),
        Commands::Inspect { path, steps } => cmd_inspect(&path, steps),
        Commands::Sessions { output_dir, team } => {
            cmd_sessions(&output_dir, team.as_deref()).await
        }
    }
}

fn load_config(path: &Path) -> Result<TeamConfig> {
    TeamConfig::load(path).with_context(|| format!("Failed to load team config {:?}", path))
}

/// Pair every configured agent with its scripted policy, in rotation order.
fn build_adapters(config: &TeamConfig, script: &PolicyScript) -> Vec<AgentAdapter> {
    for name in script.agents.keys() {
        if !config.agents.iter().any(|a| &a.name == name) {
            warn!(agent = %name, "script entry does not match any configured agent");
        }
    }
    config
        .participants()
        .into_iter()
        .map(|participant| {
            if !script.agents.contains_key(&participant.name) {
                warn!(
                    agent = %participant.name,
                    "no script for agent; its first turn will abort the session"
                );
            }
            let policy = Arc::new(script.policy_for(&participant.name));
            AgentAdapter::new(participant, policy)
        })
        .collect()
}

/// Run one session end to end. Returns the report and the artifact path.
async fn run_session(args: &RunArgs) -> Result<(SessionReport, PathBuf)> {
    let config = load_config(&args.config)?;
    let script = PolicyScript::load(&args.script)
        .with_context(|| format!("Failed to load policy script {:?}", args.script))?;

    let runtime = Arc::new(ProcessRuntime::new(
        &args.workdir,
        Duration::from_secs(args.timeout),
    ));
    let ledger = Arc::new(
        FsTrajectoryLedger::new(args.output_dir.join("ledger"))
            .await
            .context("Failed to open trajectory ledger")?,
    );
    let recorder = Arc::new(LedgerRecorder::new(ledger));

    let mut orchestrator =
        TeamOrchestrator::new(config.name.clone(), build_adapters(&config, &script), runtime)
            .context("Failed to assemble team")?
            .with_observer(recorder.clone());
    if let Some(task) = args.task.as_deref().or(config.task.as_deref()) {
        orchestrator.seed_task(task);
    }

    let control = orchestrator.control();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling session");
            control.cancel();
        }
    });

    let step_budget = args.step_budget.or(config.step_budget);
    info!(
        team = %config.name,
        session_id = %orchestrator.session_id(),
        step_budget = ?step_budget,
        "starting session"
    );
    let report = orchestrator.run_session(step_budget).await;

    let _span = SessionSpan::enter(&report.session_id);
    let artifact = TrajectoryArtifact::from_report(&report)?;
    let path = write_trajectory_artifact(&artifact, &args.output_dir.join("trajectories"))
        .context("Failed to write trajectory artifact")?;
    info!(path = %path.display(), entries = recorder.recorded(), "trajectory written");

    Ok((report, path))
}

async fn cmd_run(args: &RunArgs) -> Result<()> {
    let (report, path) = run_session(args).await?;

    println!("Session:    {}", report.session_id);
    println!("Team:       {}", report.team_name);
    println!("Status:     {}", report.exit_status());
    println!(
        "Steps:      {} ({} recorded)",
        report.state.global_step_count,
        report.trajectory.len()
    );
    if let Some(submission) = &report.submission {
        println!("Submission: {}", submission);
    }
    println!("Duration:   {}ms", report.duration_ms);
    println!("Trajectory: {}", path.display());

    if let TerminationReason::Aborted { reason } = &report.termination {
        anyhow::bail!("Session aborted: {}", reason);
    }
    Ok(())
}

fn cmd_validate(path: &Path) -> Result<()> {
    let config = load_config(path)?;

    let budget = config
        .step_budget
        .map_or_else(|| "unlimited".to_string(), |b| b.to_string());
    println!(
        "Team '{}': {} agents, step budget {}",
        config.name,
        config.agents.len(),
        budget
    );
    for p in config.participants() {
        println!(
            "  {} {:<12} max_turns={} max_requeries={} handoff={} share={}{}",
            p.position,
            p.name,
            p.max_consecutive_turns,
            p.max_requeries,
            if p.handoff_enabled { "on" } else { "off" },
            if p.share_only_tool_results {
                "tool-results"
            } else {
                "full"
            },
            p.max_observation_chars
                .map(|n| format!(" max_observation_chars={}", n))
                .unwrap_or_default(),
        );
    }
    Ok(())
}

fn cmd_inspect(path: &Path, show_steps: bool) -> Result<()> {
    let artifact = read_trajectory_file(path)
        .with_context(|| format!("Failed to verify trajectory {:?}", path))?;

    println!("Session:  {}", artifact.session_id);
    println!("Team:     {}", artifact.team_name);
    println!(
        "Created:  {}",
        artifact.created_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("Status:   {}", artifact.info.exit_status);
    println!(
        "Steps:    {} ({} recorded, {} retries)",
        artifact.info.total_steps,
        artifact.steps.len(),
        artifact.retry_count()
    );
    if let Some(submission) = &artifact.info.submission {
        println!("Submission: {}", submission);
    }
    println!();
    for (author, count) in artifact.steps_by_author() {
        println!("  {:<12} {} steps", author, count);
    }

    if show_steps {
        println!();
        for step in &artifact.steps {
            let status = match &step.outcome {
                Outcome::Success { .. } => "ok".to_string(),
                Outcome::Error { kind, .. } => format!("error ({})", kind),
            };
            println!(
                "  #{:<4} {:<12} {:<10} {} retries={}",
                step.sequence,
                step.author,
                step.action.kind(),
                status,
                step.retry_index
            );
        }
    }

    println!();
    println!("Digest verified: {}", artifact.digest);
    Ok(())
}

async fn cmd_sessions(output_dir: &Path, team: Option<&str>) -> Result<()> {
    let ledger = FsTrajectoryLedger::new(output_dir.join("ledger"))
        .await
        .context("Failed to open trajectory ledger")?;
    let sessions = ledger.list_sessions(team).await?;

    if sessions.is_empty() {
        println!("No sessions found in {:?}", output_dir);
        return Ok(());
    }

    for record in sessions {
        let steps = record
            .summary
            .as_ref()
            .map_or_else(|| "-".to_string(), |s| s.total_steps.to_string());
        println!(
            "{}  {:<12} {:<10} steps={} {}",
            record.session_id,
            record.metadata.team_name,
            format!("{:?}", record.status).to_lowercase(),
            steps,
            record.created_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    Ok(())
}
