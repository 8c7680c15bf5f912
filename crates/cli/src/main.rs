use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use events::EventBus;
use orchestrator::{
    ApprovalGateway, CodeModifierPlugin, DecisionOutcome, MilestonePlugin, Orchestrator,
    PermissionPolicy, PluginRegistry, ResearchPlugin, CODE_MODIFIER_ID,
};
use taskforge_core::{PermissionRule, Task};
use vcs::{GitRepo, SandboxRunner};

const TASKFORGE_DIR: &str = ".taskforge";
const CONFIG_FILE: &str = "config.toml";
const DEFAULT_DB_NAME: &str = "taskforge.db";

#[derive(Parser)]
#[command(name = "taskforge")]
#[command(about = "Plugin-driven task orchestration", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a .taskforge directory in the current project
    Init,
    /// Submit a task and run it to its next checkpoint
    Submit {
        /// What the task should accomplish
        prompt: String,

        #[arg(short, long, default_value = CODE_MODIFIER_ID)]
        plugin: String,

        /// Comma-separated repository-relative target files
        #[arg(short, long)]
        files: Option<String>,

        #[arg(long)]
        owner: Option<String>,
    },
    /// List all tasks
    Tasks,
    /// Show one task in full
    Show { id: Uuid },
    /// Approve a task parked at review
    Approve {
        id: Uuid,

        #[arg(long, default_value = "operator")]
        approver: String,
    },
    /// Reject a task parked at review
    Reject { id: Uuid },
    /// Send a phase decision (approve, skip, stop, replan) to a task
    Decide { id: Uuid, intent: String },
    /// List registered plugins
    Plugins,
    /// Add a path to the modification allow-list
    Grant {
        /// File path, or a directory ending with '/'
        path: String,

        #[arg(short, long)]
        comment: Option<String>,
    },
    /// List allow-list rules
    Permissions,
    /// Remove an allow-list rule
    Revoke { id: Uuid },
}

#[derive(Debug, Serialize, Deserialize)]
struct Config {
    project: ProjectConfig,
    repository: RepositoryConfig,
    model: ModelConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct ProjectConfig {
    name: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct RepositoryConfig {
    path: String,
    test_command: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ModelConfig {
    base_url: String,
    model: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: ProjectConfig {
                name: "my-project".to_string(),
            },
            repository: RepositoryConfig {
                path: ".".to_string(),
                test_command: vec!["cargo".to_string(), "test".to_string()],
            },
            model: ModelConfig {
                base_url: "http://localhost:11434".to_string(),
                model: "qwen2.5-coder".to_string(),
            },
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    match cli.command {
        Commands::Init => init_project().await,
        Commands::Submit { prompt, plugin, files, owner } => {
            submit(prompt, plugin, files, owner).await
        }
        Commands::Tasks => list_tasks().await,
        Commands::Show { id } => show_task(id).await,
        Commands::Approve { id, approver } => approve(id, &approver).await,
        Commands::Reject { id } => reject(id).await,
        Commands::Decide { id, intent } => decide(id, &intent).await,
        Commands::Plugins => list_plugins().await,
        Commands::Grant { path, comment } => grant(path, comment).await,
        Commands::Permissions => list_permissions().await,
        Commands::Revoke { id } => revoke(id).await,
    }
}

/// Everything a command needs, wired from the on-disk config.
struct Engine {
    tasks: Arc<db::TaskRepository>,
    permissions: Arc<db::PermissionRepository>,
    orchestrator: Arc<Orchestrator>,
    gateway: ApprovalGateway,
}

async fn load_config() -> Result<Config> {
    let config_path = std::env::current_dir()?.join(TASKFORGE_DIR).join(CONFIG_FILE);
    if !config_path.exists() {
        bail!("No {TASKFORGE_DIR}/{CONFIG_FILE} found. Run 'taskforge init' first.");
    }
    let content = tokio::fs::read_to_string(&config_path).await?;
    toml::from_str(&content).context("invalid config file")
}

async fn build_engine() -> Result<Engine> {
    let config = load_config().await?;

    let db_path = std::env::current_dir()?.join(TASKFORGE_DIR).join(DEFAULT_DB_NAME);
    let database_url = format!("sqlite:{}", db_path.display());
    let pool = db::create_pool(&database_url)
        .await
        .context("failed to open the task database")?;
    db::run_migrations(&pool).await?;

    let tasks = Arc::new(db::TaskRepository::new(pool.clone()));
    let permissions = Arc::new(db::PermissionRepository::new(pool));
    let events = EventBus::new();

    let model: Arc<dyn llm::TextGenerator> =
        Arc::new(llm::OllamaClient::new(&config.model.base_url, &config.model.model));

    let mut registry = PluginRegistry::new();

    // The code modifier only makes sense when the configured repository
    // path actually is a git repository.
    let code_modifier = match GitRepo::open(&config.repository.path) {
        Ok(repo) => {
            let sandbox = SandboxRunner::new(repo.clone(), config.repository.test_command.clone());
            let plugin = Arc::new(CodeModifierPlugin::new(
                Arc::clone(&model),
                PermissionPolicy::new(Arc::clone(&permissions)),
                repo,
                sandbox,
            ));
            registry.register(Arc::clone(&plugin) as Arc<dyn orchestrator::Plugin>);
            Some(plugin)
        }
        Err(e) => {
            tracing::warn!(error = %e, "repository unavailable, code modifier disabled");
            None
        }
    };

    registry.register(Arc::new(MilestonePlugin::new(Arc::clone(&model))));
    registry.register(Arc::new(ResearchPlugin::new(Arc::clone(&model), vec![])));

    let orchestrator = Arc::new(Orchestrator::new(
        Arc::new(registry),
        Arc::clone(&tasks),
        events.clone(),
    ));
    let gateway = ApprovalGateway::new(
        Arc::clone(&orchestrator),
        Arc::clone(&tasks),
        events,
        code_modifier,
    );

    Ok(Engine { tasks, permissions, orchestrator, gateway })
}

async fn init_project() -> Result<()> {
    let cwd = std::env::current_dir()?;
    let dir = cwd.join(TASKFORGE_DIR);

    if dir.exists() {
        println!("Already initialized at {}", dir.display());
        return Ok(());
    }

    tokio::fs::create_dir_all(&dir).await?;

    let project_name = cwd
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("my-project")
        .to_string();
    let config = Config {
        project: ProjectConfig { name: project_name.clone() },
        ..Default::default()
    };
    tokio::fs::write(dir.join(CONFIG_FILE), toml::to_string_pretty(&config)?).await?;

    let database_url = format!("sqlite:{}", dir.join(DEFAULT_DB_NAME).display());
    let pool = db::create_pool(&database_url).await?;
    db::run_migrations(&pool).await?;

    println!("Initialized taskforge for '{project_name}'");
    println!();
    println!("Next steps:");
    println!("  1. Review {TASKFORGE_DIR}/{CONFIG_FILE}");
    println!("  2. Allow some paths: taskforge grant src/");
    println!("  3. Submit a task:    taskforge submit \"...\" --files src/main.rs");
    Ok(())
}

async fn submit(
    prompt: String,
    plugin: String,
    files: Option<String>,
    owner: Option<String>,
) -> Result<()> {
    let engine = build_engine().await?;

    let mut task = Task::new(prompt, plugin);
    if let Some(files) = files {
        task = task.with_target_files(files);
    }
    if let Some(owner) = owner {
        task = task.with_owner(owner);
    }

    let task = engine.tasks.create(&task).await?;
    println!("Submitted task {}", task.id);

    // Run in the foreground so the result is visible before we exit.
    let task = engine.orchestrator.execute(task.id).await?;
    print_task(&task);
    Ok(())
}

async fn list_tasks() -> Result<()> {
    let engine = build_engine().await?;
    let tasks = engine.tasks.find_all().await?;

    if tasks.is_empty() {
        println!("No tasks yet.");
        return Ok(());
    }

    for task in &tasks {
        println!(
            "{}  [{:<18}] {}  {}",
            task.id,
            task.status.as_str(),
            task.plugin_id,
            truncate(&task.prompt, 60)
        );
    }
    Ok(())
}

async fn show_task(id: Uuid) -> Result<()> {
    let engine = build_engine().await?;
    let task = engine
        .tasks
        .find_by_id(id)
        .await?
        .with_context(|| format!("no task with id {id}"))?;
    print_task(&task);

    if let Some(diff) = &task.proposed_diff {
        println!();
        println!("Proposed diff:");
        println!("{diff}");
    }
    if let Some(output) = &task.test_output {
        println!();
        println!("Test output:");
        println!("{output}");
    }
    Ok(())
}

async fn approve(id: Uuid, approver: &str) -> Result<()> {
    let engine = build_engine().await?;
    let task = engine.gateway.approve(id, approver).await?;
    println!("Task {} is now '{}'", task.id, task.status.as_str());
    if let Some(commit) = &task.commit_id {
        println!("Committed as {commit}");
    }
    Ok(())
}

async fn reject(id: Uuid) -> Result<()> {
    let engine = build_engine().await?;
    let task = engine.gateway.reject(id).await?;
    println!("Task {} is now '{}'", task.id, task.status.as_str());
    Ok(())
}

async fn decide(id: Uuid, intent: &str) -> Result<()> {
    let engine = build_engine().await?;
    match engine.gateway.decide(id, intent).await? {
        DecisionOutcome::Advanced(task) => {
            println!("Task {} is now '{}'", task.id, task.status.as_str());
        }
        DecisionOutcome::Unrecognized { message, .. } => {
            println!("{message}");
        }
    }
    Ok(())
}

async fn list_plugins() -> Result<()> {
    let engine = build_engine().await?;
    for descriptor in engine.orchestrator.registry().list() {
        println!("{:<18} {}", descriptor.id, descriptor.name);
        println!("{:<18} {}", "", descriptor.description);
    }
    Ok(())
}

async fn grant(path: String, comment: Option<String>) -> Result<()> {
    let engine = build_engine().await?;
    let rule = engine
        .permissions
        .create(&PermissionRule::new(path, comment))
        .await?;
    println!("Granted '{}' ({})", rule.path, rule.id);
    Ok(())
}

async fn list_permissions() -> Result<()> {
    let engine = build_engine().await?;
    let rules = engine.permissions.find_all().await?;

    if rules.is_empty() {
        println!("The allow-list is empty; no files can be modified.");
        return Ok(());
    }

    for rule in &rules {
        let kind = if rule.is_directory_rule() { "dir " } else { "file" };
        match &rule.comment {
            Some(comment) => println!("{}  {kind}  {:<30} # {comment}", rule.id, rule.path),
            None => println!("{}  {kind}  {}", rule.id, rule.path),
        }
    }
    Ok(())
}

async fn revoke(id: Uuid) -> Result<()> {
    let engine = build_engine().await?;
    if engine.permissions.delete(id).await? {
        println!("Revoked rule {id}");
    } else {
        println!("No rule with id {id}");
    }
    Ok(())
}

fn print_task(task: &Task) {
    println!();
    println!("Task:    {}", task.id);
    println!("Plugin:  {}", task.plugin_id);
    println!("Status:  {}", task.status.as_str());
    println!("Tests:   {}", task.test_status.as_str());
    println!("Prompt:  {}", task.prompt);
    if let Some(files) = &task.target_files {
        println!("Files:   {files}");
    }
    if let Some(explanation) = &task.explanation {
        println!();
        println!("{explanation}");
    }
    if let Some(error) = &task.error_message {
        println!();
        println!("Error: {error}");
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 3).collect();
        format!("{cut}...")
    }
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "taskforge=info,orchestrator=info,db=warn".into()),
        )
        .init();
}
