// file: src/main.rs
// description: commandline application entry point with command handling
// reference: application bootstrap and orchestration

use anyhow::{Context, Result};
use clap::{ArgAction, Parser, Subcommand};
use gh_backup::utils::logging::{Status, failure_line, pass_summary, plan_line, status_line};
use gh_backup::{
    BackupOrchestrator, Config, GithubClient, SchedulePolicy, SyncAgent, Validator,
    shutdown_channel,
};
use std::path::PathBuf;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "gh_backup")]
#[command(author = "cipher")]
#[command(version = "0.1.0")]
#[command(about = "Two-way backup of local text files into a private GitHub repository", long_about = None)]
struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = gh_backup::config::DEFAULT_CONFIG_PATH
    )]
    config: PathBuf,

    #[arg(long, default_value_t = true, action = ArgAction::Set)]
    color: bool,

    #[arg(short, long, action = ArgAction::SetTrue)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run backup passes on the configured schedule until interrupted
    Run {
        /// Stop after this many passes
        #[arg(long, value_name = "NUM")]
        max_cycles: Option<u64>,
    },

    /// Run a single backup pass and exit
    Once,

    /// Show what the next pass would do without writing anything
    Plan,

    /// Verify or create the destination repository
    EnsureRepo,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    gh_backup::utils::logging::init_logger(cli.color, cli.verbose);

    info!("GitHub file backup");

    let config = if cli.config.exists() {
        info!("Loading configuration from: {}", cli.config.display());
        Config::load(Some(cli.config.as_path())).context("Failed to load configuration")?
    } else {
        warn!(
            "Config file {} not found, using environment only",
            cli.config.display()
        );
        Config::load(None).context("Failed to load configuration")?
    };

    match cli.command {
        Commands::Run { max_cycles } => {
            let mut policy = SchedulePolicy::from_config(&config.schedule);
            if let Some(max_cycles) = max_cycles {
                policy = policy.with_max_cycles(max_cycles);
            }
            cmd_backup(&config, policy).await?;
        }
        Commands::Once => {
            let policy = SchedulePolicy::from_config(&config.schedule).with_max_cycles(1);
            cmd_backup(&config, policy).await?;
        }
        Commands::Plan => {
            cmd_plan(&config).await?;
        }
        Commands::EnsureRepo => {
            cmd_ensure_repo(&config).await?;
        }
    }

    Ok(())
}

fn build_agent(config: &Config) -> Result<SyncAgent<GithubClient>> {
    let client = GithubClient::new(&config.github).context("Failed to create GitHub client")?;

    Ok(SyncAgent::new(client, config.github.owner.clone())
        .with_private(config.backup.private)
        .with_commit_prefix(config.backup.commit_prefix.clone()))
}

async fn cmd_backup(config: &Config, policy: SchedulePolicy) -> Result<()> {
    if let Err(e) = Validator::validate_directory(&config.backup.base_dir) {
        warn!("{}", e);
    }

    let files = config.tracked_files()?;
    if files.is_empty() {
        warn!("No files configured under backup.files");
    }

    println!(
        "{}",
        status_line(
            Status::Pending,
            &format!(
                "Backing up {} file(s) to {}/{} every {}s",
                files.len(),
                config.github.owner,
                config.backup.repository,
                policy.interval.as_secs()
            )
        )
    );

    let orchestrator =
        BackupOrchestrator::new(build_agent(config)?, config.backup.repository.clone(), files)
            .with_policy(policy);

    let (trigger, shutdown) = shutdown_channel();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current file");
            trigger.trigger();
        }
    });

    let stats = match orchestrator.start_backup(shutdown).await {
        Ok(stats) => stats,
        Err(e) => {
            eprintln!("{}", failure_line("Backup process terminated", &e));
            return Err(anyhow::Error::new(e).context("Backup process terminated"));
        }
    };

    println!("{}", pass_summary(&stats));
    Ok(())
}

async fn cmd_plan(config: &Config) -> Result<()> {
    let agent = build_agent(config)?;

    let Some(repo) = agent
        .find_repo(&config.backup.repository)
        .await
        .context("Failed to list repositories")?
    else {
        println!(
            "{}",
            status_line(
                Status::Warning,
                &format!(
                    "Repository {} does not exist yet; the next pass creates it and uploads every tracked file",
                    config.backup.repository
                )
            )
        );
        return Ok(());
    };

    println!("\nPlan for repository {}/{}\n", config.github.owner, repo);

    for file in config.tracked_files()? {
        match agent.plan_file(&repo, &file).await {
            Ok(plan) => println!("{}", plan_line(&plan)),
            Err(e) => println!("{}", failure_line(file.remote_key(), &e)),
        }
    }

    println!();
    Ok(())
}

async fn cmd_ensure_repo(config: &Config) -> Result<()> {
    let agent = build_agent(config)?;
    let repo = agent
        .ensure_repo(&config.backup.repository)
        .await
        .context("Failed to ensure repository")?;

    println!(
        "{}",
        status_line(
            Status::Clean,
            &format!("Repository {}/{} is ready", config.github.owner, repo)
        )
    );
    Ok(())
}
