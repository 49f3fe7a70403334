use anyhow::{Context, Result};
use ml_pipeline::cli::commands::{PlanCommand, RunCommand, RunnerArg, StepsCommand};
use ml_pipeline::cli::output::*;
use ml_pipeline::cli::{Cli, Command};
use ml_pipeline::{
    EnvironmentManager, MlflowRunner, Orchestrator, OrchestratorOptions, ProcessRunner,
    StepRegistry,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    // Initialize logging; RUST_LOG wins over --verbose
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))
        .context("Failed to set logging subscriber")?;

    match &cli.command {
        Command::Run(cmd) => run_pipeline(cmd).await?,
        Command::Plan(cmd) => show_plan(cmd)?,
        Command::Steps(cmd) => list_steps(cmd)?,
    }

    Ok(())
}

async fn run_pipeline(cmd: &RunCommand) -> Result<()> {
    let config = match cmd.config.load() {
        Ok(config) => config,
        Err(e) => {
            println!("{} {}", CROSS, style(&e).red());
            std::process::exit(e.exit_code());
        }
    };

    for (key, value) in &cmd.config.overrides {
        println!(
            "{} Config override: {} = {}",
            INFO,
            style(key).cyan(),
            style(value).dim()
        );
    }

    let manager: Box<dyn EnvironmentManager> = match cmd.runner {
        RunnerArg::Mlflow => Box::new(MlflowRunner::with_executable(&cmd.mlflow)),
        RunnerArg::Process => match &cmd.interpreter {
            Some(interpreter) => Box::new(ProcessRunner::with_interpreter(interpreter)),
            None => Box::new(ProcessRunner::new()),
        },
    };

    let options = OrchestratorOptions {
        env_manager: cmd.env_manager.into(),
        project_root: cmd.config.project_root(),
        workspace_root: cmd.workspace_root.clone(),
    };
    let mut orchestrator = Orchestrator::new(manager, options);

    // Set up event handler for console output
    if !cmd.json {
        orchestrator.add_event_handler(|event| {
            println!("{}", format_execution_event(event));
        });
    }

    let outcome = orchestrator.run(&config).await;

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&outcome.summary)?);
    } else {
        println!("\n{}", format_run_summary(&outcome.summary));
    }

    match outcome.error {
        None => {
            if !cmd.json {
                println!("\n{} Pipeline completed {}", CHECK, style("successfully").green());
            }
            Ok(())
        }
        Some(e) => {
            if !cmd.json {
                println!("\n{} Pipeline {}", CROSS, style("failed").red());
            }
            error!("{}", e);
            std::process::exit(e.exit_code());
        }
    }
}

fn show_plan(cmd: &PlanCommand) -> Result<()> {
    let config = cmd.config.load().context("Failed to load pipeline config")?;
    let plan = ml_pipeline::execution::plan_run(
        &StepRegistry::standard(),
        &config,
        &cmd.config.project_root(),
    );

    let plan = match plan {
        Ok(plan) => plan,
        Err(e) => {
            println!("{} Plan failed:", CROSS);
            println!("  {}", style(&e).red());
            std::process::exit(e.exit_code());
        }
    };

    if cmd.json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    if plan.is_empty() {
        println!("{} No steps selected", WARN);
        return Ok(());
    }

    println!("{} {} step(s) would run:", INFO, style(plan.len()).cyan());
    for planned in &plan {
        println!("{}", format_planned_step(planned));
    }

    Ok(())
}

fn list_steps(cmd: &StepsCommand) -> Result<()> {
    let registry = StepRegistry::standard();

    if cmd.json {
        let steps: Vec<_> = registry
            .iter()
            .map(|step| {
                serde_json::json!({
                    "ordinal": step.ordinal,
                    "id": step.id(),
                    "entry_point": step.entry_point,
                    "version": step.version,
                    "default_active": step.is_default_active,
                    "note": step.note,
                })
            })
            .collect();
        let data = serde_json::json!({ "steps": steps });
        println!("{}", serde_json::to_string_pretty(&data)?);
        return Ok(());
    }

    println!("{} Pipeline steps:", INFO);
    for step in registry.iter() {
        println!("{}", format_catalog_step(step));
    }

    Ok(())
}
