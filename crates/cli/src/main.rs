mod cli;
mod config;
mod terminal;

use anyhow::{bail, Context, Result};
use clap::Parser;
use std::sync::Arc;
use tracing::{info, warn};

use tracity_client::HttpBackend;
use tracity_core::{ChartType, Facet, SortOrder, SourceKind, UploadFile};
use tracity_explorer::{Explorer, FileSessionStore, SessionContext, Settled};

use crate::cli::{CliArgs, Command, ExploreArgs};
use crate::config::CliConfig;
use crate::terminal::Terminal;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    let terminal = Terminal::new(args.json);

    if let Err(e) = run(args, &terminal).await {
        terminal.print_error(&format!("{:#}", e))?;
        std::process::exit(1);
    }
    Ok(())
}

async fn run(args: CliArgs, terminal: &Terminal) -> Result<()> {
    tracity_core::config::load_dotenv();
    let cli_config = CliConfig::load(args.config.as_deref())
        .context("failed to load configuration")?;

    let mut config = tracity_core::Config::from_env();
    config.backend.url = cli_config.resolve_backend_url(args.backend.as_deref(), &config);
    let session_file = cli_config.resolve_session_file(&config)?;
    config.session.file = Some(session_file.clone());
    config.log_summary();

    let session = SessionContext::restore(FileSessionStore::new(session_file));
    let backend = HttpBackend::from_config(&config.backend)
        .context("failed to create HTTP client")?;
    let explorer = Explorer::new(Arc::new(backend), Arc::new(session), &config.limits);

    match args.command {
        Command::Datasets => {
            if explorer.refresh_catalog().await != Settled::Ready {
                bail!("Failed to load datasets");
            }
            terminal.print_datasets(&explorer.snapshot().await.catalog.datasets)?;
        }
        Command::Files => {
            if explorer.refresh_user_files().await == Settled::LoginRequired {
                bail!("Session expired, please log in again");
            }
            terminal.print_files(&explorer.snapshot().await.catalog.user_files)?;
        }
        Command::Stats => {
            terminal.print_stats(&explorer.stats().await)?;
        }
        Command::Login {
            email,
            password,
            captcha_answer,
        } => {
            let answer = match captcha_answer {
                Some(answer) => answer,
                None => {
                    let captcha = explorer
                        .captcha()
                        .await
                        .map_err(|e| anyhow::anyhow!(e.user_message("Failed to load captcha")))?;
                    terminal.print_info(&captcha.question)?;
                    terminal.prompt_captcha()?
                }
            };
            let identity = explorer
                .login(&email, &password, answer)
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Login failed")))?;
            info!(user_id = %identity.user_id, "Signed in");
            terminal.print_identity(&identity)?;
        }
        Command::Logout => {
            explorer.logout().await;
            terminal.print_info("Signed out.")?;
        }
        Command::Upload { path } => {
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .with_context(|| format!("not a file: {}", path.display()))?;
            let bytes = std::fs::read(&path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let receipt = explorer
                .upload(UploadFile::new(filename, bytes))
                .await
                .map_err(|e| anyhow::anyhow!(e.user_message("Upload failed")))?;
            terminal.print_upload(&receipt)?;
        }
        Command::Explore(explore) => {
            let chart = cli_config.resolve_chart(explore.chart)?;
            run_explore(&explorer, terminal, &explore, chart).await?;
        }
    }
    Ok(())
}

fn require_session(explorer: &Explorer) -> Result<()> {
    if !explorer.session().is_authenticated() {
        bail!("Please log in to view your uploaded files");
    }
    Ok(())
}

async fn run_explore(
    explorer: &Explorer,
    terminal: &Terminal,
    args: &ExploreArgs,
    chart: ChartType,
) -> Result<()> {
    let (kind, id) = match (&args.dataset, &args.file) {
        (Some(collection), _) => (SourceKind::Public, collection.as_str()),
        (None, Some(file_id)) => {
            require_session(explorer)?;
            (SourceKind::User, file_id.as_str())
        }
        (None, None) => bail!("either --dataset or --file is required"),
    };

    explorer.refresh_catalog().await;
    explorer.select_chart_type(chart).await;
    explorer.set_year_separated(args.by_year).await;
    explorer.set_breadth(args.breadth()).await;

    let settled = match explorer.select_by_id(kind, id).await {
        Some(settled) => settled,
        None => bail!("no data source named '{}'", id),
    };
    report(terminal, settled)?;

    if args.has_filters() {
        let with_categories = kind == SourceKind::Public;
        if !with_categories && !args.categories.is_empty() {
            terminal.print_warning("Category filters apply to public datasets only; ignoring them.")?;
        }
        let facets = args.facets(with_categories);
        for facet in &facets {
            if !explorer.toggle(facet).await {
                let label = facet_label(facet);
                warn!(facet = %label, "Facet not offered by this source");
                terminal.print_warning(&format!("Ignoring unknown filter value: {}", label))?;
            }
        }

        if args.sort_by.is_some() {
            let order = if args.desc { SortOrder::Desc } else { SortOrder::Asc };
            explorer.set_sort(args.sort_by.clone(), order).await;
        }
        report(terminal, explorer.apply_filters().await)?;
    }

    terminal.print_render_model(&explorer.render_model().await)
}

fn facet_label(facet: &Facet) -> String {
    match facet {
        Facet::State(state) => format!("state {}", state),
        Facet::Year(year) => format!("year {}", year),
        Facet::Category(category) => format!("category {}", category),
    }
}

/// Turn a settled outcome into an error or a warning line.
fn report(terminal: &Terminal, settled: Settled) -> Result<()> {
    match settled {
        Settled::LoginRequired => bail!("Session expired, please log in again"),
        Settled::Degraded => {
            terminal.print_warning("Some data could not be loaded; showing fallback content.")
        }
        Settled::Ready | Settled::Stale | Settled::Idle => Ok(()),
    }
}
