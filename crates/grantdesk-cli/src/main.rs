//! Grantdesk command-line host
//!
//! Opens the workspace (cache, optional deep link, remote store), runs
//! startup reconciliation and then one user action.

mod config;
mod output;

use anyhow::{anyhow, bail, Context};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use config::AppConfig;
use grantdesk_core::{HealthMonitor, Workspace};
use grantdesk_model::{ApplicationStatus, GrantId, GrantPatch, ProjectId, ProjectPatch, Scale};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

fn cli() -> Command {
    Command::new("grantdesk")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Municipal grant-funding strategy workspace")
        .arg(
            Arg::new("config")
                .long("config")
                .global(true)
                .value_parser(value_parser!(PathBuf))
                .help("Path to the config file (default: grantdesk.toml)"),
        )
        .arg(
            Arg::new("link")
                .long("link")
                .global(true)
                .help("Share link, #id=<project> fragment or project id to open"),
        )
        .arg(
            Arg::new("log-json")
                .long("log-json")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Emit logs as JSON"),
        )
        .subcommand(Command::new("open").about("Resolve the active project and show it"))
        .subcommand(Command::new("list").about("List cached projects"))
        .subcommand(
            Command::new("select")
                .about("Make a cached project active")
                .arg(Arg::new("id").required(true).help("Project id")),
        )
        .subcommand(
            Command::new("create")
                .about("Generate a strategy and grant list for a city")
                .arg(Arg::new("city").required(true).help("City name")),
        )
        .subcommand(
            Command::new("status")
                .about("Show the active project and its funding summary")
                .arg(
                    Arg::new("json")
                        .long("json")
                        .action(ArgAction::SetTrue)
                        .help("Output the workspace snapshot as JSON"),
                ),
        )
        .subcommand(
            Command::new("grant")
                .about("Edit a grant of the active project")
                .arg(Arg::new("grant").required(true).help("Grant id"))
                .arg(
                    Arg::new("status")
                        .long("status")
                        .value_parser(parse_status)
                        .help("Not Started, In Progress, Submitted, Awarded or Denied"),
                )
                .arg(
                    Arg::new("confirmed-award")
                        .long("confirmed-award")
                        .help("Amount actually awarded; empty or 0 clears it"),
                )
                .arg(Arg::new("max").long("max").help("Maximum award"))
                .arg(Arg::new("narrative").long("narrative").help("Narrative pitch")),
        )
        .subcommand(
            Command::new("project")
                .about("Edit the active project")
                .arg(Arg::new("city").long("city").help("City name"))
                .arg(Arg::new("budget").long("budget").help("Estimated budget"))
                .arg(Arg::new("secured").long("secured").help("Funding committed outside grants"))
                .arg(Arg::new("scale").long("scale").help("Single Site, Multi-Site or Citywide"))
                .arg(Arg::new("equity-goals").long("equity-goals").help("Equity goals")),
        )
        .subcommand(
            Command::new("remove-grant")
                .about("Remove a grant from the active project")
                .arg(Arg::new("grant").required(true).help("Grant id")),
        )
        .subcommand(
            Command::new("narrative")
                .about("Print a grant's narrative for pasting into an application")
                .arg(Arg::new("grant").required(true).help("Grant id")),
        )
        .subcommand(Command::new("push").about("Save the active project to the cloud"))
        .subcommand(Command::new("health").about("Probe the cloud database"))
        .subcommand(Command::new("recover").about("Retry access to the cloud database"))
        .subcommand(Command::new("watch").about("Probe the cloud database until interrupted"))
        .subcommand(Command::new("share").about("Print the share link of the active project"))
        .subcommand(Command::new("new").about("Deselect the active project"))
}

fn parse_status(raw: &str) -> Result<ApplicationStatus, String> {
    ApplicationStatus::parse(raw).ok_or_else(|| format!("unknown status {raw:?}"))
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("grantdesk=info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn active_id(workspace: &Workspace) -> anyhow::Result<ProjectId> {
    workspace
        .active_id()
        .ok_or_else(|| anyhow!("no active project; use `select`, `create` or --link"))
}

fn print_status(workspace: &Workspace) {
    match (workspace.active_project(), workspace.summary()) {
        (Some(project), Some(summary)) => print!("{}", output::project_status(&project, &summary)),
        _ => println!("no active project"),
    }
}

async fn edit_grant(workspace: &Workspace, args: &ArgMatches) -> anyhow::Result<()> {
    let project = active_id(workspace)?;
    let grant = GrantId::from(args.get_one::<String>("grant").map_or("", String::as_str));

    let mut patch = GrantPatch::new();
    patch.status = args.get_one::<ApplicationStatus>("status").copied();
    patch.confirmed_award_amount = args.get_one::<String>("confirmed-award").map(|v| v.as_str().into());
    patch.max_val = args.get_one::<String>("max").map(|v| v.as_str().into());
    patch.narrative_draft = args.get_one::<String>("narrative").cloned();
    if patch.is_empty() {
        bail!("nothing to change; pass --status, --confirmed-award, --max or --narrative");
    }

    if !workspace.update_grant(&project, &grant, &patch).await? {
        bail!("grant {grant} not found in {project}");
    }
    print_status(workspace);
    Ok(())
}

async fn edit_project(workspace: &Workspace, args: &ArgMatches) -> anyhow::Result<()> {
    let project = active_id(workspace)?;
    let patch = ProjectPatch {
        city_name: args.get_one::<String>("city").cloned(),
        scale: args.get_one::<String>("scale").cloned().map(Scale::from),
        equity_goals: args.get_one::<String>("equity-goals").cloned(),
        budget_estimate: args.get_one::<String>("budget").map(|v| v.as_str().into()),
        funding_secured: args.get_one::<String>("secured").map(|v| v.as_str().into()),
        ..ProjectPatch::default()
    };
    if patch == ProjectPatch::default() {
        bail!("nothing to change; pass --city, --budget, --secured, --scale or --equity-goals");
    }

    workspace.update_project(&project, &patch).await?;
    print_status(workspace);
    Ok(())
}

async fn create(workspace: &Workspace, city: &str) -> anyhow::Result<()> {
    let mut stages = workspace.subscribe_stage();
    let progress = tokio::spawn(async move {
        while stages.changed().await.is_ok() {
            let stage = *stages.borrow_and_update();
            if stage.is_busy() {
                eprintln!("... {}", stage.label());
            }
        }
    });
    let created = workspace.create_project(city).await;
    progress.abort();

    let id = created?;
    println!("created {id}");
    print_status(workspace);
    Ok(())
}

async fn watch(workspace: &Arc<Workspace>) -> anyhow::Result<()> {
    let _monitor = HealthMonitor::spawn(workspace);
    let mut ticker = tokio::time::interval(workspace.config().health_interval());
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("waiting for interrupt")?;
                return Ok(());
            }
            _ = ticker.tick() => println!("{}", output::connectivity_line(&workspace.connectivity())),
        }
    }
}

async fn run(matches: &ArgMatches) -> anyhow::Result<()> {
    let config = AppConfig::load(matches.get_one::<PathBuf>("config").map(PathBuf::as_path))?.with_env_overrides();
    let link = matches.get_one::<String>("link").map(String::as_str);
    let workspace = Arc::new(Workspace::new(config.workspace.clone(), config.collaborators(link)?));

    workspace.startup().await;

    match matches.subcommand() {
        None | Some(("open", _)) | Some(("status", _)) => {
            let json = matches
                .subcommand_matches("status")
                .is_some_and(|args| args.get_flag("json"));
            if json {
                println!("{}", serde_json::to_string_pretty(&workspace.snapshot())?);
            } else {
                print_status(&workspace);
            }
        }
        Some(("list", _)) => print!("{}", output::project_list(&workspace.snapshot())),
        Some(("select", args)) => {
            let id = ProjectId::from(args.get_one::<String>("id").map_or("", String::as_str));
            if !workspace.select(&id).await? {
                bail!("no cached project {id}");
            }
            print_status(&workspace);
        }
        Some(("create", args)) => {
            create(&workspace, args.get_one::<String>("city").map_or("", String::as_str)).await?;
        }
        Some(("grant", args)) => edit_grant(&workspace, args).await?,
        Some(("project", args)) => edit_project(&workspace, args).await?,
        Some(("remove-grant", args)) => {
            let project = active_id(&workspace)?;
            let grant = GrantId::from(args.get_one::<String>("grant").map_or("", String::as_str));
            match workspace.remove_grant(&project, &grant).await? {
                Some(removed) => println!("removed {} ({})", removed.id, removed.name),
                None => bail!("grant {grant} not found in {project}"),
            }
        }
        Some(("narrative", args)) => {
            let project = workspace.active_project().ok_or_else(|| anyhow!("no active project"))?;
            let grant = GrantId::from(args.get_one::<String>("grant").map_or("", String::as_str));
            let grant = project
                .grant(&grant)
                .ok_or_else(|| anyhow!("grant {grant} not found in {}", project.id))?;
            println!("{}", grant.narrative_export());
        }
        Some(("push", _)) => {
            active_id(&workspace)?;
            if !workspace.push_active().await {
                bail!("push was not accepted");
            }
            println!("pushed");
        }
        Some(("health", _)) => {
            workspace.probe_health().await;
            println!("{}", output::connectivity_line(&workspace.connectivity()));
        }
        Some(("recover", _)) => {
            workspace.recover_access().await;
            println!("{}", output::connectivity_line(&workspace.connectivity()));
        }
        Some(("watch", _)) => watch(&workspace).await?,
        Some(("share", _)) => match workspace.share_link(&config.share_base_url)? {
            Some(link) => println!("{link}"),
            None => bail!("no active project to share"),
        },
        Some(("new", _)) => {
            workspace.start_new();
            println!("selection cleared");
        }
        Some((other, _)) => bail!("unknown command {other}"),
    }

    if let Some(banner) = workspace.banner() {
        eprintln!("! {banner}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let matches = cli().get_matches();
    init_tracing(matches.get_flag("log-json"));
    run(&matches).await
}
