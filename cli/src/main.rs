use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tibiawiki_core::file_utils::{load_articles, read_articles};
use tibiawiki_core::models::{Creature, Item, Key, Spell};
use tibiawiki_core::{
    Database, LoadSummary, MatchMode, Record, RecordKind, Row, Settings, parse_articles,
};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Parser)]
#[command(
    name = "tibiawiki",
    version = "0.1.0",
    about = "Parse TibiaWiki articles into a SQLite database",
    long_about = None
)]
struct Cli {
    /// Path to a TOML settings file
    #[arg(long, global = true, env = "TIBIAWIKI_CONFIG")]
    config: Option<PathBuf>,

    /// Path to SQLite database file (overrides settings)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Path to log file (overrides settings)
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Verbosity level (repeat for more verbose output)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Parse article dumps and print the records as JSON
    Parse {
        /// A JSON dump file, or a directory of them
        #[arg(long)]
        file: PathBuf,
        /// Only parse articles as this kind (item, key, creature, spell)
        #[arg(long)]
        kind: Option<RecordKind>,
    },

    /// Load article dumps into the database
    Load {
        /// Directory of JSON dumps (defaults to articles_dir from settings)
        #[arg(long)]
        input_dir: Option<PathBuf>,
        /// Keep existing rows instead of clearing the database first
        #[arg(long)]
        append: bool,
    },

    /// Look a record up by name and print it as JSON
    Show {
        /// Record kind (item, key, creature, spell)
        #[arg(long)]
        kind: RecordKind,
        /// Name to look for, case insensitive. Keys are looked up by number.
        #[arg(long)]
        name: String,
    },
}

fn setup_logging(
    verbose: u8,
    log_file: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard> {
    let filter_level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    let filter = EnvFilter::from_default_env().add_directive(filter_level.into());

    let file_appender = tracing_appender::rolling::never(
        log_file.parent().unwrap_or(Path::new(".")),
        log_file.file_name().unwrap_or(std::ffi::OsStr::new("tibiawiki.log")),
    );
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::Layer::new().with_writer(std::io::stderr).with_ansi(true))
        .with(fmt::Layer::new().with_writer(non_blocking).with_ansi(false));

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(guard)
}

fn load_settings(cli: &Cli) -> Result<Settings> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None => Settings::default(),
    };
    if let Some(database) = &cli.database {
        settings.database = database.clone();
    }
    if let Some(log_file) = &cli.log_file {
        settings.log_file = log_file.clone();
    }
    Ok(settings)
}

fn read_input(path: &Path) -> Result<Vec<tibiawiki_core::Article>> {
    let articles = if path.is_dir() {
        load_articles(path)?
    } else {
        read_articles(path).with_context(|| format!("Failed to read {}", path.display()))?
    };
    Ok(articles)
}

/// Fail the load when the store rejected any record.
fn check_summary(summary: &LoadSummary) -> Result<()> {
    if summary.failed > 0 {
        bail!(
            "{} records were rejected by the database, see the log for details",
            summary.failed
        );
    }
    Ok(())
}

fn show(db: &Database, kind: RecordKind, name: &str) -> Result<Option<Record>> {
    let conn = db.connection()?;
    let record = match kind {
        RecordKind::Item => Item::get_by_name(&conn, name)?.map(Record::Item),
        RecordKind::Creature => Creature::get_by_name(&conn, name)?.map(Record::Creature),
        RecordKind::Spell => Spell::get_by_name(&conn, name)?.map(Record::Spell),
        RecordKind::Key => {
            let key = match name.trim().parse::<i64>() {
                Ok(number) => Key::get_by_number(&conn, number)?,
                Err(_) => Key::get_by_field(&conn, "name", name, MatchMode::IgnoreCase)?,
            };
            key.map(Record::Key)
        }
    };
    Ok(record)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(&cli)?;

    let _guard = setup_logging(cli.verbose, &settings.log_file)?;

    info!("Starting tibiawiki CLI");

    match cli.command {
        Commands::Parse { file, kind } => {
            let articles = read_input(&file)?;
            let records = parse_articles(&articles, kind);
            println!("{}", serde_json::to_string_pretty(&records)?);
        }
        Commands::Load { input_dir, append } => {
            let Some(input_dir) = input_dir.or(settings.articles_dir.clone()) else {
                bail!("No input directory given and no articles_dir in settings");
            };
            let articles = load_articles(&input_dir)?;
            let records = parse_articles(&articles, None);

            let db = Database::new(&settings.database)?;
            if !append {
                db.clear()?;
            }

            let pb = ProgressBar::new(records.len() as u64);
            pb.set_style(ProgressStyle::default_bar().template("{bar:40} {pos}/{len} {msg}")?);
            let summary = db.insert_records_with_progress(&records, |record| {
                pb.set_message(record.title().to_string());
                pb.inc(1);
            })?;
            pb.finish_and_clear();

            for (kind, count) in &summary.inserted {
                info!("Inserted {} {} records", count, kind);
            }
            println!(
                "Loaded {} records from {} articles into {} ({} failed)",
                summary.total(),
                articles.len(),
                settings.database.display(),
                summary.failed
            );
            check_summary(&summary)?;
        }
        Commands::Show { kind, name } => {
            let db = Database::new(&settings.database)?;
            match show(&db, kind, &name)? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => bail!("No {} named {:?}", kind, name),
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_with_rejected_records_fails() {
        let mut summary = LoadSummary::default();
        summary.inserted.insert(RecordKind::Creature, 3);
        assert!(check_summary(&summary).is_ok());

        summary.failed = 1;
        let err = check_summary(&summary).unwrap_err();
        assert!(err.to_string().contains("1 records were rejected"));
    }

    #[test]
    fn test_cli_flags() {
        let args = ["tibiawiki", "load", "--input-dir", "dump", "--append", "-vv"];
        let cli = Cli::try_parse_from(args).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::Load { append: true, .. }));
        let args = ["tibiawiki", "show", "--kind", "npc", "--name", "x"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
