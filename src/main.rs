use clap::{Args, Parser, Subcommand, ValueEnum};
use miette::{IntoDiagnostic, Result, miette};
use sakila_staging::application::analytics::Analytics;
use sakila_staging::application::loader::{LoadSummary, StagingLoader};
use sakila_staging::config::{
    DEFAULT_COLLECTION, DEFAULT_DATABASE, DEFAULT_EXTRACT_LIMIT, DEFAULT_MONGO_URI,
    DEFAULT_MYSQL_URL, extract_limit,
};
use sakila_staging::domain::aggregation::{Aggregation, GroupTotal, TOP_CUSTOMERS_DEFAULT};
use sakila_staging::domain::ports::{PaymentSourceBox, StagingStoreBox};
use sakila_staging::infrastructure::in_memory::{InMemoryPaymentSource, InMemoryStagingStore};
use sakila_staging::interfaces::csv::payment_reader::PaymentReader;
use sakila_staging::interfaces::csv::report_writer::ReportWriter;
use std::fs::File;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "mongo")]
use sakila_staging::config::MongoConfig;
#[cfg(feature = "mongo")]
use sakila_staging::infrastructure::mongo::MongoStagingStore;
#[cfg(feature = "mysql")]
use sakila_staging::config::MySqlConfig;
#[cfg(feature = "mysql")]
use sakila_staging::infrastructure::mysql::MySqlPaymentSource;

/// Stage Sakila payments in a document store and run exploratory revenue reports
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract payments and reload the staging collection
    Load {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        target: TargetArgs,
    },
    /// Run a report against the staging collection
    Report {
        /// Which report to print
        #[arg(value_enum)]
        kind: ReportKind,
        #[command(flatten)]
        target: TargetArgs,
        /// Number of customers in the top spenders report
        #[arg(long, default_value_t = TOP_CUSTOMERS_DEFAULT, value_parser = parse_top)]
        top: usize,
    },
    /// Load the staging collection, then run reports against it
    Run {
        #[command(flatten)]
        source: SourceArgs,
        #[command(flatten)]
        target: TargetArgs,
        /// Which report to print after loading
        #[arg(long, value_enum, default_value_t = ReportKind::All)]
        report: ReportKind,
        /// Number of customers in the top spenders report
        #[arg(long, default_value_t = TOP_CUSTOMERS_DEFAULT, value_parser = parse_top)]
        top: usize,
    },
}

#[derive(Args)]
struct SourceArgs {
    /// CSV export of the extract query. Takes precedence over a MySQL URL.
    #[arg(long)]
    from_csv: Option<PathBuf>,

    /// MySQL URL of the Sakila database (bare flag uses the local default)
    #[arg(long, env = "SAKILA_MYSQL_URL", num_args = 0..=1, default_missing_value = DEFAULT_MYSQL_URL)]
    mysql_url: Option<String>,

    /// Maximum number of payments to extract, 0 for all
    #[arg(long, default_value_t = DEFAULT_EXTRACT_LIMIT)]
    limit: u32,
}

#[derive(Args)]
struct TargetArgs {
    /// MongoDB URI of the staging server (bare flag uses the local default).
    /// `load` and `run` without it stage in memory for this run only.
    #[arg(long, env = "SAKILA_MONGO_URI", num_args = 0..=1, default_missing_value = DEFAULT_MONGO_URI)]
    mongo_uri: Option<String>,

    /// Staging database name
    #[arg(long, env = "SAKILA_MONGO_DATABASE", default_value = DEFAULT_DATABASE)]
    database: String,

    /// Staging collection name
    #[arg(long, env = "SAKILA_MONGO_COLLECTION", default_value = DEFAULT_COLLECTION)]
    collection: String,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ReportKind {
    /// Total revenue by store
    Store,
    /// Total revenue by film rating
    Rating,
    /// Customers with the largest total spend
    Customers,
    /// One staged document, as JSON
    Sample,
    /// The store, rating and customers reports
    All,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Load { source, target } => {
            let summary = load(&source, &target).await?.0;
            println!(
                "Loaded {} documents into staging: {}",
                summary.loaded, summary.target
            );
            if summary.skipped > 0 {
                println!("Skipped {} rows that could not be transformed", summary.skipped);
            }
        }
        Commands::Report { kind, target, top } => {
            if target.mongo_uri.is_none() {
                return Err(miette!(
                    "report reads an existing staging collection: pass --mongo-uri [URI] or set SAKILA_MONGO_URI"
                ));
            }
            let analytics = Analytics::new(open_store(&target).await?);
            print_report(&analytics, kind, top).await?;
        }
        Commands::Run {
            source,
            target,
            report,
            top,
        } => {
            let (_, store) = load(&source, &target).await?;
            print_report(&Analytics::new(store), report, top).await?;
        }
    }

    Ok(())
}

fn parse_top(value: &str) -> std::result::Result<usize, String> {
    match value.parse::<usize>() {
        Ok(0) => Err("must be at least 1".to_string()),
        Ok(top) => Ok(top),
        Err(e) => Err(e.to_string()),
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("sakila_staging=debug,info")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_ansi(io::stderr().is_terminal()),
        )
        .with(filter)
        .init();
}

async fn load(source: &SourceArgs, target: &TargetArgs) -> Result<(LoadSummary, StagingStoreBox)> {
    let loader = StagingLoader::new(open_source(source).await?, open_store(target).await?);
    let summary = loader
        .run(extract_limit(source.limit))
        .await
        .into_diagnostic()?;
    Ok((summary, loader.into_store()))
}

async fn open_source(args: &SourceArgs) -> Result<PaymentSourceBox> {
    if let Some(path) = &args.from_csv {
        let file = File::open(path).into_diagnostic()?;
        let mut rows = Vec::new();
        for row in PaymentReader::new(file).payments() {
            match row {
                Ok(row) => rows.push(row),
                Err(e) => tracing::warn!(error = %e, "Error reading payment"),
            }
        }
        return Ok(Box::new(InMemoryPaymentSource::new(rows)));
    }

    if let Some(url) = &args.mysql_url {
        #[cfg(feature = "mysql")]
        {
            let config = MySqlConfig { url: url.clone() };
            let source = MySqlPaymentSource::connect(&config)
                .await
                .into_diagnostic()?;
            return Ok(Box::new(source));
        }
        #[cfg(not(feature = "mysql"))]
        {
            let _ = url;
            return Err(miette!(
                "MySQL requested via --mysql-url, but the 'mysql' feature is not enabled"
            ));
        }
    }

    Err(miette!(
        "no payment source configured: pass --from-csv <PATH> or --mysql-url [URL]"
    ))
}

async fn open_store(args: &TargetArgs) -> Result<StagingStoreBox> {
    if let Some(uri) = &args.mongo_uri {
        #[cfg(feature = "mongo")]
        {
            let config = MongoConfig {
                uri: uri.clone(),
                database: args.database.clone(),
                collection: args.collection.clone(),
            };
            let store = MongoStagingStore::connect(&config).await.into_diagnostic()?;
            return Ok(Box::new(store));
        }
        #[cfg(not(feature = "mongo"))]
        {
            let _ = uri;
            tracing::warn!(
                "MongoDB requested via --mongo-uri, but the 'mongo' feature is not enabled. Falling back to in-memory storage."
            );
        }
    } else {
        tracing::warn!(
            "no MongoDB URI configured, staging {}.{} in memory for this run only",
            args.database,
            args.collection
        );
    }
    Ok(Box::new(InMemoryStagingStore::new()))
}

async fn tables(
    analytics: &Analytics,
    kind: ReportKind,
    top: usize,
) -> Result<Vec<(Aggregation, Vec<GroupTotal>)>> {
    let mut tables = Vec::new();
    if matches!(kind, ReportKind::Store | ReportKind::All) {
        let rows = analytics.revenue_by_store().await.into_diagnostic()?;
        tables.push((Aggregation::revenue_by_store(), rows));
    }
    if matches!(kind, ReportKind::Rating | ReportKind::All) {
        let rows = analytics.revenue_by_rating().await.into_diagnostic()?;
        tables.push((Aggregation::revenue_by_rating(), rows));
    }
    if matches!(kind, ReportKind::Customers | ReportKind::All) {
        let rows = analytics.top_customers(top).await.into_diagnostic()?;
        tables.push((Aggregation::top_customers(top), rows));
    }
    Ok(tables)
}

async fn print_report(analytics: &Analytics, kind: ReportKind, top: usize) -> Result<()> {
    if kind == ReportKind::Sample {
        match analytics.sample().await.into_diagnostic()? {
            Some(doc) => {
                let json = serde_json::to_string_pretty(&doc).into_diagnostic()?;
                println!("{json}");
            }
            None => tracing::warn!("staging collection is empty"),
        }
        return Ok(());
    }

    let tables = tables(analytics, kind, top).await?;
    let stdout = io::stdout();
    let mut out = stdout.lock();
    for (i, (aggregation, rows)) in tables.iter().enumerate() {
        if i > 0 {
            writeln!(out).into_diagnostic()?;
        }
        ReportWriter::new(&mut out)
            .write_totals(aggregation.group_by, aggregation.metric, rows)
            .into_diagnostic()?;
    }
    Ok(())
}
