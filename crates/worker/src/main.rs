use anyhow::Context;
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tickertone_core::config::Settings;
use tickertone_core::pipeline::Pipeline;
use tickertone_core::storage::{InMemoryRecommendationStore, PgRecommendationStore, RecommendationStore};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "tickertone_worker")]
struct Args {
    /// Keep results in memory instead of writing to the database.
    #[arg(long, global = true)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Recompute every portfolio symbol once.
    Refresh,
    /// Analyze one symbol and print the result.
    Analyze {
        symbol: String,

        /// Print the per-article breakdown instead of the stored row.
        #[arg(long)]
        report: bool,
    },
    /// Print cached recommendations.
    List,
    /// Refresh the portfolio periodically until interrupted.
    Schedule,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let args = Args::parse();

    let res = run(args, &settings).await;
    if let Err(err) = &res {
        sentry_anyhow::capture_anyhow(err);
        tracing::error!(error = %err, "worker run failed");
    }
    res
}

async fn run(args: Args, settings: &Settings) -> anyhow::Result<()> {
    let pool = if args.dry_run {
        None
    } else {
        let db_url = settings.require_database_url()?;
        let pool = sqlx::postgres::PgPoolOptions::new()
            .max_connections(5)
            .connect(db_url)
            .await
            .context("connect DATABASE_URL failed")?;
        tickertone_core::storage::migrate(&pool).await?;
        Some(pool)
    };

    let store: Arc<dyn RecommendationStore> = match &pool {
        Some(pool) => Arc::new(PgRecommendationStore::new(pool.clone())),
        None => Arc::new(InMemoryRecommendationStore::new()),
    };

    match args.command {
        Command::List => {
            let rows = store.get_all().await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
        }
        Command::Analyze { symbol, report } => {
            let pipeline = build_pipeline(settings, store, pool)?;
            if report {
                let report = pipeline.analyze_report(&symbol).await?;
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                let rec = pipeline.analyze(&symbol).await?;
                println!("{}", serde_json::to_string_pretty(&rec)?);
            }
        }
        Command::Refresh => {
            let pipeline = build_pipeline(settings, store, pool)?;
            let symbols = settings.symbols();

            let Some(results) = pipeline.refresh_all(&symbols).await else {
                tracing::warn!("refresh lock not acquired; another run in progress");
                return Ok(());
            };
            tracing::info!(
                dry_run = args.dry_run,
                requested = symbols.len(),
                refreshed = results.len(),
                "refresh run complete"
            );
        }
        Command::Schedule => {
            let pipeline = Arc::new(build_pipeline(settings, store, pool)?);
            let handle = tickertone_core::schedule::spawn_refresh_schedule(
                pipeline,
                settings.symbols(),
                settings.refresh_interval,
            );

            tokio::signal::ctrl_c()
                .await
                .context("failed to listen for ctrl-c")?;
            tracing::info!("shutting down refresh schedule");
            handle.abort();
        }
    }

    Ok(())
}

// Dry runs have no pool, so they skip the cross-process refresh lock.
fn build_pipeline(
    settings: &Settings,
    store: Arc<dyn RecommendationStore>,
    pool: Option<sqlx::PgPool>,
) -> anyhow::Result<Pipeline> {
    let pipeline = Pipeline::from_settings(settings, store)?;
    Ok(match pool {
        Some(pool) => pipeline.with_refresh_lock(pool),
        None => pipeline,
    })
}

fn init_sentry(settings: &Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_subcommands_and_global_dry_run() {
        let args = Args::try_parse_from(["tickertone_worker", "analyze", "aapl", "--report", "--dry-run"])
            .unwrap();
        assert!(args.dry_run);
        match args.command {
            Command::Analyze { symbol, report } => {
                assert_eq!(symbol, "aapl");
                assert!(report);
            }
            other => panic!("unexpected command {other:?}"),
        }

        let args = Args::try_parse_from(["tickertone_worker", "refresh"]).unwrap();
        assert!(!args.dry_run);
        assert!(matches!(args.command, Command::Refresh));
    }

    #[test]
    fn requires_a_subcommand() {
        assert!(Args::try_parse_from(["tickertone_worker"]).is_err());
    }
}
