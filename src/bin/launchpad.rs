use std::fs;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use galaxy_launchpad::catalog::{
    CatalogFileSource, CatalogHttpSource, CatalogRepository, CatalogSource,
};
use galaxy_launchpad::compat::compatible_categories;
use galaxy_launchpad::config::ConfigLoader;
use galaxy_launchpad::configure::ConfiguredInput;
use galaxy_launchpad::ena::{EnaClient, EnaHttpClient, filter_read_runs};
use galaxy_launchpad::error::LaunchpadError;
use galaxy_launchpad::launch::{GalaxyHttpClient, Launcher};
use galaxy_launchpad::steps::{PlanOptions, augment_plan, plan_steps};

#[derive(Parser)]
#[command(name = "launchpad")]
#[command(about = "Configure and launch Galaxy workflows from a genome data catalog")]
#[command(version, author)]
struct Cli {
    /// Catalog directory or base URL holding workflows.json and
    /// assemblies.json.
    #[arg(long, global = true, default_value = "catalog")]
    catalog: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "List workflow categories, optionally for one assembly")]
    Workflows(WorkflowsArgs),
    #[command(about = "Show the configuration step plan for a workflow")]
    Plan(PlanArgs),
    #[command(about = "List sequencing read runs available for an assembly")]
    Reads(ReadsArgs),
    #[command(about = "Launch a configured workflow and print the landing URL")]
    Launch(LaunchArgs),
}

#[derive(Args)]
struct WorkflowsArgs {
    /// Restrict to workflows compatible with this assembly accession.
    #[arg(long)]
    assembly: Option<String>,
}

#[derive(Args)]
struct PlanArgs {
    /// Workflow TRS id or slug.
    workflow: String,

    /// Configuration JSON; when given, the plan is augmented with the
    /// sequencing steps the configuration carries values for.
    #[arg(long)]
    input: Option<String>,

    /// Plan as if the assembly were not preselected.
    #[arg(long)]
    no_assembly: bool,
}

#[derive(Args)]
struct ReadsArgs {
    /// Assembly accession whose taxonomy subtree is searched.
    assembly: String,

    /// Workflow whose parameter data requirements filter the runs.
    #[arg(long)]
    workflow: Option<String>,

    /// Parameter key within --workflow.
    #[arg(long, requires = "workflow")]
    parameter: Option<String>,
}

#[derive(Args)]
struct LaunchArgs {
    /// Workflow TRS id or slug.
    workflow: String,

    /// Configuration JSON file.
    #[arg(long)]
    input: String,

    /// Config file path (default: launchpad.json if present).
    #[arg(long)]
    config: Option<String>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<LaunchpadError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &LaunchpadError) -> u8 {
    match error {
        LaunchpadError::WorkflowNotFound(_)
        | LaunchpadError::AssemblyNotFound(_)
        | LaunchpadError::ConfigRead(_) => 2,
        LaunchpadError::CatalogHttp(_)
        | LaunchpadError::CatalogStatus { .. }
        | LaunchpadError::EnaHttp(_)
        | LaunchpadError::EnaStatus { .. }
        | LaunchpadError::GalaxyHttp(_)
        | LaunchpadError::GalaxyStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut repository = CatalogRepository::new();
    let source = catalog_source(&cli.catalog)?;
    repository.init(source.as_ref()).into_diagnostic()?;

    match cli.command {
        Commands::Workflows(args) => run_workflows(args, &repository),
        Commands::Plan(args) => run_plan(args, &repository),
        Commands::Reads(args) => run_reads(args, &repository),
        Commands::Launch(args) => run_launch(args, &repository),
    }
}

fn catalog_source(catalog: &str) -> miette::Result<Box<dyn CatalogSource>> {
    if catalog.starts_with("http://") || catalog.starts_with("https://") {
        Ok(Box::new(CatalogHttpSource::new(catalog).into_diagnostic()?))
    } else {
        Ok(Box::new(CatalogFileSource::new(catalog)))
    }
}

fn run_workflows(args: WorkflowsArgs, repository: &CatalogRepository) -> miette::Result<()> {
    let categories = repository.categories().into_diagnostic()?;
    let categories = match args.assembly.as_deref() {
        Some(accession) => {
            let assembly = repository.assembly(accession).into_diagnostic()?;
            compatible_categories(categories, assembly)
        }
        None => categories.to_vec(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&categories).into_diagnostic()?
    );
    Ok(())
}

fn run_plan(args: PlanArgs, repository: &CatalogRepository) -> miette::Result<()> {
    let workflow = repository.workflow(&args.workflow).into_diagnostic()?;
    let options = PlanOptions {
        assembly_preselected: !args.no_assembly,
    };
    let input = args
        .input
        .as_deref()
        .map(read_input)
        .transpose()?
        .unwrap_or_default();
    let plan = augment_plan(&plan_steps(workflow, options), &input);

    for (index, step) in plan.iter().enumerate() {
        let state = if step.disabled { "disabled" } else { "enabled" };
        let value = step
            .render_value(&input)
            .unwrap_or_else(|| "-".to_string());
        println!("{}. {} [{state}] {value}", index + 1, step.label);
    }
    Ok(())
}

fn run_reads(args: ReadsArgs, repository: &CatalogRepository) -> miette::Result<()> {
    let assembly = repository.assembly(&args.assembly).into_diagnostic()?;
    let client = EnaHttpClient::new().into_diagnostic()?;
    let mut runs = client
        .read_runs(&assembly.ncbi_taxonomy_id)
        .into_diagnostic()?;

    if let (Some(workflow_id), Some(parameter_key)) = (&args.workflow, &args.parameter) {
        let workflow = repository.workflow(workflow_id).into_diagnostic()?;
        let requirements = workflow
            .parameters
            .iter()
            .find(|parameter| &parameter.key == parameter_key)
            .and_then(|parameter| parameter.data_requirements.clone())
            .unwrap_or_default();
        runs = filter_read_runs(runs, &requirements);
    }

    println!("{}", serde_json::to_string_pretty(&runs).into_diagnostic()?);
    Ok(())
}

fn run_launch(args: LaunchArgs, repository: &CatalogRepository) -> miette::Result<()> {
    let workflow = repository.workflow(&args.workflow).into_diagnostic()?;
    let input = read_input(&args.input)?;
    let env = ConfigLoader::resolve(args.config.as_deref()).into_diagnostic()?;

    let client = GalaxyHttpClient::new().into_diagnostic()?;
    let launcher = Launcher::new(client, env);

    let status = launcher.status(workflow, &input);
    if status.disabled {
        return Err(miette::Report::msg(
            "configuration is incomplete; run `launchpad plan` to see unanswered steps",
        ));
    }

    let redirect = launcher.launch(workflow, &input).into_diagnostic()?;
    println!("{redirect}");
    Ok(())
}

fn read_input(path: &str) -> miette::Result<ConfiguredInput> {
    let content = fs::read_to_string(path).into_diagnostic()?;
    serde_json::from_str(&content).into_diagnostic()
}
