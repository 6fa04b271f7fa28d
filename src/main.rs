//! wok-platform - command line entry point

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result, bail};

use wok_platform::cli::{Cli, Commands};
use wok_platform::{
    CommandRunner, ConfigElement, DryRunRunner, Flow, LogLevels, Platform, Project, SCRIPT_PATH,
    SystemRunner, Task, WorkflowInstance, check_logging_config, init_logging, load_platforms,
};

fn main() -> ExitCode {
    let cli = Cli::parse_args();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("✗ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let conf = ConfigElement::from_file(&cli.config)
        .with_context(|| format!("Failed to load configuration from {:?}", cli.config))?;

    // Initialize logging first
    let logging_conf = conf.element("logging").unwrap_or_default();
    check_logging_config(&logging_conf).context("Invalid logging configuration")?;
    init_logging(&logging_conf);
    let levels = LogLevels::from_config(&logging_conf);
    let logger = levels.logger("wok.cli");

    let runner: Arc<dyn CommandRunner> = if cli.dry_run {
        Arc::new(DryRunRunner::new(levels.logger("wok.runner")))
    } else {
        Arc::new(SystemRunner)
    };

    let mut platforms =
        load_platforms(&conf, runner, &levels).context("Invalid platform configuration")?;
    if platforms.is_empty() {
        bail!("No platforms configured in {:?}", cli.config);
    }

    if let Commands::Check = cli.command {
        for platform in &platforms {
            println!("✓ {} ({})", platform.name(), platform.kind());
        }
        return Ok(ExitCode::SUCCESS);
    }

    let index = select_platform(&platforms, cli.platform.as_deref())?;
    let platform = &mut platforms[index];
    platform.start()?;
    logger.debug(format!("Using platform {}", platform.name()));

    let code = match cli.command {
        Commands::Check => ExitCode::SUCCESS,
        Commands::Sync { project, path } => {
            let outcome = platform.sync_project(&Project::new(project, path));
            if outcome.is_ok() {
                println!("✓ {:?}", outcome);
                ExitCode::SUCCESS
            } else {
                eprintln!("✗ {:?}", outcome);
                ExitCode::FAILURE
            }
        }
        Commands::Submit {
            project,
            path,
            flow,
            script,
            tasks,
        } => submit(&**platform, Project::new(project, path), &flow, &script, tasks)?,
    };

    platform.stop();
    Ok(code)
}

fn select_platform(platforms: &[Box<dyn Platform>], name: Option<&str>) -> Result<usize> {
    match name {
        Some(name) => platforms
            .iter()
            .position(|p| p.name() == name)
            .with_context(|| format!("Platform '{}' is not configured", name)),
        None if platforms.len() == 1 => Ok(0),
        None => {
            let names: Vec<&str> = platforms.iter().map(|p| p.name()).collect();
            bail!("Several platforms configured, choose one with --platform: {}", names.join(", "))
        }
    }
}

fn submit(
    platform: &dyn Platform,
    project: Project,
    flow_path: &Path,
    script: &str,
    task_ids: Vec<String>,
) -> Result<ExitCode> {
    let flow_name = flow_path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "flow".to_string());
    let task_ids = if task_ids.is_empty() {
        vec![flow_name.clone()]
    } else {
        task_ids
    };

    let instance = Arc::new(WorkflowInstance::new(flow_name.clone(), Arc::new(project)));
    let flow = Arc::new(Flow::new(flow_name, flow_path));
    let tasks: Vec<Task> = task_ids
        .into_iter()
        .map(|id| Task::new(id, instance.clone(), flow.clone()).with_env(SCRIPT_PATH, script))
        .collect();

    let mut submissions = platform.job_submissions(&tasks);
    for js in submissions.by_ref() {
        println!("{}", serde_json::to_string(&js)?);
    }

    if submissions.failed() > 0 {
        eprintln!("✗ {} task(s) could not be submitted", submissions.failed());
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
