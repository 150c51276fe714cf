use std::future::Future;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use indexmap::IndexMap;
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use tokio_util::sync::CancellationToken;

use windlass_engine::{Engine, ExecutionContext, InvocationResult};
use windlass_nodes::builtin_registry;
use windlass_prepare::{inject_tokens, normalize_tokens, prepare_workflow};
use windlass_store::{AutomationData, RunRecord, SqliteStore, Store, StoreError, UserAutomation};
use windlass_workflow::Workflow;

/// Windlass - a workflow automation runner
#[derive(Parser)]
#[command(name = "windlass")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to the data directory (default: ~/.windlass)
  #[arg(long, global = true)]
  data_dir: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Run a workflow or a single node
  Run {
    #[command(subcommand)]
    target: RunTarget,
  },
}

#[derive(Subcommand)]
enum RunTarget {
  /// Run an entire workflow
  Workflow {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// JSON file with `{{NAME}}` parameter values
    #[arg(long)]
    params: Option<PathBuf>,

    /// JSON file with tokens and developer keys
    #[arg(long)]
    tokens: Option<PathBuf>,
  },

  /// Run a single node from a workflow
  Node {
    /// Path to the workflow file (JSON)
    workflow_file: PathBuf,

    /// The node name (or id) to execute
    #[arg(long)]
    node: String,

    /// JSON file with tokens and developer keys
    #[arg(long)]
    tokens: Option<PathBuf>,
  },
}

fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(io::stderr)
    .init();

  let cli = Cli::parse();

  let data_dir = cli.data_dir.unwrap_or_else(|| {
    dirs::home_dir()
      .expect("could not determine home directory")
      .join(".windlass")
  });

  match cli.command {
    Some(Commands::Run { target }) => match target {
      RunTarget::Workflow {
        workflow_file,
        params,
        tokens,
      } => run_blocking(run_workflow(workflow_file, params, tokens, data_dir)),
      RunTarget::Node {
        workflow_file,
        node,
        tokens,
      } => run_blocking(run_node(workflow_file, node, tokens)),
    },
    None => {
      println!("windlass - use --help to see available commands");
      Ok(())
    }
  }
}

fn run_blocking(task: impl Future<Output = Result<InvocationResult>>) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  let result = rt.block_on(task)?;
  println!("{}", serde_json::to_string_pretty(&result)?);
  if !result.success {
    std::process::exit(1);
  }
  Ok(())
}

async fn run_workflow(
  workflow_file: PathBuf,
  params_file: Option<PathBuf>,
  tokens_file: Option<PathBuf>,
  data_dir: PathBuf,
) -> Result<InvocationResult> {
  let workflow = load_workflow(&workflow_file).await?;
  let params: IndexMap<String, Value> = load_json_map(params_file.as_deref()).await?;
  let raw_tokens: IndexMap<String, String> = load_token_map(tokens_file.as_deref()).await?;

  workflow
    .validate()
    .with_context(|| format!("invalid workflow '{}'", workflow.name))?;

  // The token file doubles as the developer key bag: credential
  // placeholders are ALL_CAPS names, canonical token names are not.
  let prepared = prepare_workflow(&workflow, &params, &raw_tokens);
  let mut tokens = normalize_tokens(&raw_tokens, &IndexMap::new());
  tokens.extend(prepared.resolved_tokens.clone());
  let mut prepared_workflow = prepared.workflow;
  inject_tokens(&mut prepared_workflow, &tokens).context("token injection failed")?;

  let payload = read_payload_from_stdin()?;
  let workflow_name = prepared_workflow.name.clone();
  let engine = Engine::new(builtin_registry());
  let ctx = ExecutionContext::new(prepared_workflow, payload, tokens);

  let started_at = Utc::now();
  let result = engine.invoke(ctx, CancellationToken::new()).await;

  // Run history is best-effort; a broken data dir must not fail the run.
  if let Err(e) = record_run_history(&data_dir, &workflow_name, &params, &result, started_at).await
  {
    eprintln!("warning: failed to record run history: {e}");
  }

  Ok(result)
}

async fn run_node(
  workflow_file: PathBuf,
  node: String,
  tokens_file: Option<PathBuf>,
) -> Result<InvocationResult> {
  let workflow = load_workflow(&workflow_file).await?;
  let raw_tokens: IndexMap<String, String> = load_token_map(tokens_file.as_deref()).await?;

  let target = workflow
    .node(&node)
    .with_context(|| format!("node '{node}' not found in workflow '{}'", workflow.name))?
    .clone();

  // Execute the node in isolation: a one-node workflow fed directly
  // with the stdin payload.
  let mut single = Workflow {
    name: format!("{} ({node})", workflow.name),
    nodes: vec![target],
    connections: IndexMap::new(),
  };
  let tokens = normalize_tokens(&raw_tokens, &IndexMap::new());
  inject_tokens(&mut single, &tokens).context("token injection failed")?;

  let payload = read_payload_from_stdin()?;
  let engine = Engine::new(builtin_registry());
  let ctx = ExecutionContext::new(single, payload, tokens);
  Ok(engine.invoke(ctx, CancellationToken::new()).await)
}

/// Append this invocation to the run log in the data directory, under a
/// per-workflow `local/<name>` record.
async fn record_run_history(
  data_dir: &Path,
  workflow_name: &str,
  params: &IndexMap<String, Value>,
  result: &InvocationResult,
  started_at: DateTime<Utc>,
) -> Result<()> {
  let store = open_store(data_dir).await?;

  let record_id = format!("local/{workflow_name}");
  match store.get("local", workflow_name).await {
    Ok(_) => {}
    Err(StoreError::NotFound(_)) => {
      store
        .upsert(&UserAutomation {
          id: record_id.clone(),
          user_id: "local".to_string(),
          automation_id: workflow_name.to_string(),
          access_token: None,
          refresh_token: None,
          token_expiry: None,
          is_active: false,
          parameters: serde_json::to_value(params)?,
          automation_data: AutomationData::default(),
          run_count: 0,
          last_run_at: None,
        })
        .await?;
    }
    Err(e) => return Err(e.into()),
  }

  store.record_run(&record_id, started_at).await?;
  store
    .insert_run(&RunRecord {
      id: uuid::Uuid::new_v4().to_string(),
      user_automation_id: record_id,
      started_at,
      finished_at: Some(Utc::now()),
      success: result.success,
      error: result.error.clone(),
    })
    .await?;
  Ok(())
}

async fn open_store(data_dir: &Path) -> Result<SqliteStore> {
  tokio::fs::create_dir_all(data_dir)
    .await
    .with_context(|| format!("failed to create data directory: {}", data_dir.display()))?;
  let options = SqliteConnectOptions::new()
    .filename(data_dir.join("windlass.db"))
    .create_if_missing(true);
  let pool = SqlitePool::connect_with(options)
    .await
    .context("failed to open the run history database")?;
  let store = SqliteStore::new(pool);
  store
    .migrate()
    .await
    .context("failed to migrate the run history database")?;
  Ok(store)
}

async fn load_workflow(path: &Path) -> Result<Workflow> {
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read workflow file: {}", path.display()))?;
  let workflow: Workflow = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse workflow file: {}", path.display()))?;
  eprintln!("Loaded workflow: {}", workflow.name);
  Ok(workflow)
}

async fn load_json_map(path: Option<&Path>) -> Result<IndexMap<String, Value>> {
  let Some(path) = path else {
    return Ok(IndexMap::new());
  };
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read file: {}", path.display()))?;
  serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

async fn load_token_map(path: Option<&Path>) -> Result<IndexMap<String, String>> {
  let Some(path) = path else {
    return Ok(IndexMap::new());
  };
  let content = tokio::fs::read_to_string(path)
    .await
    .with_context(|| format!("failed to read file: {}", path.display()))?;
  serde_json::from_str(&content).with_context(|| format!("failed to parse {}", path.display()))
}

/// Read the initial payload from stdin when piped; an interactive
/// terminal means no payload.
fn read_payload_from_stdin() -> Result<Value> {
  let mut stdin = io::stdin();
  if stdin.is_terminal() {
    return Ok(Value::Null);
  }
  let mut buffer = String::new();
  stdin
    .read_to_string(&mut buffer)
    .context("failed to read payload from stdin")?;
  if buffer.trim().is_empty() {
    return Ok(Value::Null);
  }
  serde_json::from_str(buffer.trim()).context("payload on stdin is not valid JSON")
}
