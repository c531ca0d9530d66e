// Module-specific lints configuration
#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow};
use clap::{Args, CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{Shell, generate};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError, info, warn};
use serde::Serialize;
use serde_json::json;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use translation_store::app_config::{Config, LogLevel};
use translation_store::database::{DatabaseConnection, Session};
use translation_store::locale_utils::{language_name, normalize_locale};
use translation_store::storage::{DatabaseStorage, TranslationStorage};
use translation_store::transfer::{self, CatalogueName};
use translation_store::{SortColumn, SortOrder, TransUnitFilters};

/// CLI Wrapper for LogLevel to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliLogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<CliLogLevel> for LogLevel {
    fn from(cli_level: CliLogLevel) -> Self {
        match cli_level {
            CliLogLevel::Error => LogLevel::Error,
            CliLogLevel::Warn => LogLevel::Warn,
            CliLogLevel::Info => LogLevel::Info,
            CliLogLevel::Debug => LogLevel::Debug,
            CliLogLevel::Trace => LogLevel::Trace,
        }
    }
}

/// CLI Wrapper for SortColumn to implement ValueEnum
#[derive(Debug, Clone, ValueEnum)]
enum CliSortColumn {
    Key,
    Domain,
    Id,
    CreatedAt,
    UpdatedAt,
}

impl From<CliSortColumn> for SortColumn {
    fn from(cli_column: CliSortColumn) -> Self {
        match cli_column {
            CliSortColumn::Key => SortColumn::Key,
            CliSortColumn::Domain => SortColumn::Domain,
            CliSortColumn::Id => SortColumn::Id,
            CliSortColumn::CreatedAt => SortColumn::CreatedAt,
            CliSortColumn::UpdatedAt => SortColumn::UpdatedAt,
        }
    }
}

/// Filters shared by `list` and `count`
#[derive(Args, Debug)]
struct FilterArgs {
    /// Restrict to units translated in these locales (repeatable)
    #[arg(long = "locale", value_name = "LOCALE")]
    locales: Vec<String>,

    /// Only units whose domain contains this text
    #[arg(long)]
    domain: Option<String>,

    /// Only units whose key contains this text
    #[arg(long)]
    key: Option<String>,

    /// Content filter as LOCALE=TEXT (repeatable)
    #[arg(long = "content", value_name = "LOCALE=TEXT", value_parser = parse_content_filter)]
    content: Vec<(String, String)>,

    /// Column to sort by
    #[arg(long, value_enum, default_value = "key")]
    sort: CliSortColumn,

    /// Sort in descending order
    #[arg(long)]
    desc: bool,
}

impl FilterArgs {
    // Requested locales, normalized; None when no locale was given
    fn locales(&self) -> Result<Option<Vec<String>>> {
        if self.locales.is_empty() {
            return Ok(None);
        }
        normalize_all(&self.locales).map(Some)
    }

    fn to_filters(&self) -> Result<TransUnitFilters> {
        let mut filters = TransUnitFilters::default();
        if let Some(domain) = &self.domain {
            filters = filters.with_domain(domain);
        }
        if let Some(key) = &self.key {
            filters = filters.with_key(key);
        }
        for (locale, text) in &self.content {
            filters = filters.with_content(&normalize_locale(locale)?, text);
        }

        let order = if self.desc { SortOrder::Desc } else { SortOrder::Asc };
        Ok(filters.sorted_by(self.sort.clone().into(), order))
    }
}

fn parse_content_filter(value: &str) -> Result<(String, String), String> {
    value
        .split_once('=')
        .map(|(locale, text)| (locale.to_string(), text.to_string()))
        .ok_or_else(|| format!("expected LOCALE=TEXT, got '{}'", value))
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the domains used by translation units
    Domains,

    /// List the domains translated in each locale
    Locales,

    /// List one page of translation units
    List {
        #[command(flatten)]
        filters: FilterArgs,

        /// Units per page
        #[arg(long, default_value_t = 20)]
        rows: u32,

        /// Page number, starting at 1
        #[arg(long, default_value_t = 1)]
        page: u32,
    },

    /// Count translation units matching the filters
    Count {
        #[command(flatten)]
        filters: FilterArgs,
    },

    /// Show a translation unit by id
    Show {
        /// Unit identifier
        id: String,
    },

    /// Find a translation unit by key and domain
    Lookup {
        /// Translation key
        key: String,

        /// Domain of the key
        #[arg(short, long, default_value = "messages")]
        domain: String,
    },

    /// Show an imported file by content hash
    File {
        /// SHA256 hash of the file content
        hash: String,
    },

    /// List imported files, optionally restricted to locales and domains
    Files {
        /// Locale of the files (repeatable)
        #[arg(long = "locale", value_name = "LOCALE")]
        locales: Vec<String>,

        /// Domain covered by the files (repeatable)
        #[arg(long = "domain", value_name = "DOMAIN")]
        domains: Vec<String>,
    },

    /// Import catalogues named <domain>.<locale>.json (files or directories)
    Import {
        /// Catalogue files or directories to scan
        #[arg(value_name = "PATH", required = true)]
        paths: Vec<PathBuf>,

        /// Overwrite manually edited translations
        #[arg(short, long)]
        force: bool,
    },

    /// Export the translations imported from a file
    Export {
        /// SHA256 hash of the imported file
        hash: String,

        /// Only translations edited since the import
        #[arg(long)]
        only_updated: bool,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show database statistics
    Stats,

    /// Generate shell completions for trstore
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// trstore - translation unit storage
///
/// Inspects and fills a SQLite store of translation units and the catalogue
/// files they were imported from.
#[derive(Parser, Debug)]
#[command(name = "trstore")]
#[command(version = "0.1.0")]
#[command(about = "Translation unit storage tool")]
#[command(long_about = "trstore stores translation units (a key in a domain with one translation per locale) and the catalogue files they were imported from.

EXAMPLES:
    trstore import translations/                 # Import every <domain>.<locale>.json found
    trstore import -f messages.fr.json           # Re-import, overwriting manual edits
    trstore list --locale fr --key menu          # Units whose key contains 'menu', French only
    trstore count --domain admin                 # Count units in domains containing 'admin'
    trstore lookup menu.home -d messages         # Find a unit by key and domain
    trstore export <hash> --only-updated         # Translations edited since import
    trstore completions bash > trstore.bash      # Generate bash completions

CONFIGURATION:
    Configuration is stored in trstore.json by default. You can specify a different
    config file with --config. If the config file doesn't exist, a default one
    will be created automatically.")]
struct CommandLineOptions {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path
    #[arg(short, long = "config", global = true, default_value = "trstore.json")]
    config_path: String,

    /// Database file, overriding the configured one
    #[arg(long, global = true, env = "TRSTORE_DATABASE")]
    database: Option<PathBuf>,

    /// Set logging level
    #[arg(short, long, global = true, value_enum)]
    log_level: Option<CliLogLevel>,
}

// @struct: Coloured stderr logger, filtered by the global max level
struct CustomLogger;

impl CustomLogger {
    // @initializes: Global logger
    fn init(level: LevelFilter) -> Result<(), SetLoggerError> {
        log::set_boxed_logger(Box::new(CustomLogger))?;
        log::set_max_level(level);
        Ok(())
    }

    // @returns: ANSI colour and label for a level
    fn style_for_level(level: Level) -> (&'static str, &'static str) {
        match level {
            Level::Error => ("1;31", "ERROR"),
            Level::Warn => ("1;33", "WARN "),
            Level::Info => ("1;32", "INFO "),
            Level::Debug => ("1;36", "DEBUG"),
            Level::Trace => ("1;35", "TRACE"),
        }
    }
}

impl Log for CustomLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let now = chrono::Local::now().format("%H:%M:%S.%3f");
            let (colour, label) = Self::style_for_level(record.level());
            let _ = writeln!(
                std::io::stderr(),
                "\x1B[{}m{} {} {}\x1B[0m",
                colour,
                now,
                label,
                record.args()
            );
        }
    }

    fn flush(&self) {
        let _ = std::io::stderr().flush();
    }
}

fn normalize_all(locales: &[String]) -> Result<Vec<String>> {
    locales.iter().map(|locale| normalize_locale(locale)).collect()
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize output")?;
    println!("{}", json);
    Ok(())
}

// Run `f` in its own session on the blocking pool; staged writes are
// flushed on success
async fn in_session<F, T>(db: &DatabaseConnection, storage: &Arc<DatabaseStorage>, f: F) -> Result<T>
where
    F: FnOnce(&DatabaseStorage, &mut Session) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let storage = Arc::clone(storage);
    db.with_session_async(move |session| f(&storage, session)).await
}

fn load_config(cli: &CommandLineOptions) -> Result<Config> {
    let mut config = Config::load_or_create(&cli.config_path)?;

    if let Some(database) = &cli.database {
        config.database.path = Some(database.to_string_lossy().into_owned());
    }
    if let Some(log_level) = &cli.log_level {
        config.log_level = log_level.clone().into();
    }

    config
        .validate()
        .context("Configuration validation failed")?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Start at info; the configured level is applied once the config is loaded
    CustomLogger::init(LevelFilter::Info)?;

    let cli = CommandLineOptions::parse();

    if let Commands::Completions { shell } = cli.command {
        let mut cmd = CommandLineOptions::command();
        generate(shell, &mut cmd, "trstore", &mut std::io::stdout());
        return Ok(());
    }

    if let Some(log_level) = &cli.log_level {
        log::set_max_level(LogLevel::from(log_level.clone()).to_level_filter());
    }

    let config = load_config(&cli)?;
    log::set_max_level(config.log_level.to_level_filter());

    let db = config.database.open()?;
    let storage = Arc::new(DatabaseStorage::new(&config.storage)?);

    run_command(cli.command, &config, &db, &storage).await
}

async fn run_command(
    command: Commands,
    config: &Config,
    db: &DatabaseConnection,
    storage: &Arc<DatabaseStorage>,
) -> Result<()> {
    match command {
        Commands::Domains => {
            let domains =
                in_session(db, storage, |storage, session| Ok(storage.get_trans_unit_domains(session)?))
                    .await?;
            print_json(&domains)
        }

        Commands::Locales => {
            let by_locale = in_session(db, storage, |storage, session| {
                Ok(storage.get_trans_unit_domains_by_locale(session)?)
            })
            .await?;
            for (locale, domains) in &by_locale {
                match language_name(locale) {
                    Ok(name) => info!("{} ({}): {} domain(s)", locale, name, domains.len()),
                    Err(_) => warn!("{}: not an ISO 639 locale", locale),
                }
            }
            print_json(&by_locale)
        }

        Commands::List { filters, rows, page } => {
            let locales = filters.locales()?;
            let filters = filters.to_filters()?;

            let units = in_session(db, storage, move |storage, session| {
                let locales: Option<Vec<&str>> = locales
                    .as_ref()
                    .map(|locales| locales.iter().map(String::as_str).collect());
                Ok(storage.get_trans_unit_list(session, locales.as_deref(), rows, page, &filters)?)
            })
            .await?;
            print_json(&units)
        }

        Commands::Count { filters } => {
            let locales = filters.locales()?;
            let filters = filters.to_filters()?;

            let count = in_session(db, storage, move |storage, session| {
                let locales: Option<Vec<&str>> = locales
                    .as_ref()
                    .map(|locales| locales.iter().map(String::as_str).collect());
                Ok(storage.count_trans_units(session, locales.as_deref(), &filters)?)
            })
            .await?;
            print_json(&json!({ "count": count }))
        }

        Commands::Show { id } => {
            let unit = in_session(db, storage, move |storage, session| {
                storage
                    .get_trans_unit_by_id(session, &id)?
                    .ok_or_else(|| anyhow!("No translation unit with id {}", id))
            })
            .await?;
            print_json(&unit)
        }

        Commands::Lookup { key, domain } => {
            let unit = in_session(db, storage, move |storage, session| {
                storage
                    .get_trans_unit_by_key_and_domain(session, &key, &domain)?
                    .ok_or_else(|| anyhow!("No translation unit '{}' in domain '{}'", key, domain))
            })
            .await?;
            print_json(&unit)
        }

        Commands::File { hash } => {
            let file = in_session(db, storage, move |storage, session| {
                storage
                    .get_file_by_hash(session, &hash)?
                    .ok_or_else(|| anyhow!("No imported file with hash {}", hash))
            })
            .await?;
            print_json(&file)
        }

        Commands::Files { locales, domains } => {
            let locales = normalize_all(&locales)?;

            let files = in_session(db, storage, move |storage, session| {
                let locales: Vec<&str> = locales.iter().map(String::as_str).collect();
                let domains: Vec<&str> = domains.iter().map(String::as_str).collect();
                Ok(transfer::select_files(storage, session, &locales, &domains)?)
            })
            .await?;
            print_json(&files)
        }

        Commands::Import { paths, force } => {
            let mut catalogues = Vec::new();
            for path in &paths {
                if path.is_dir() {
                    catalogues.extend(transfer::find_catalogues(path)?);
                } else if path.is_file() {
                    catalogues.push(path.clone());
                } else {
                    return Err(anyhow!("Input path does not exist: {:?}", path));
                }
            }

            if catalogues.is_empty() {
                warn!("No catalogues found in the given paths");
                return Ok(());
            }

            for path in &catalogues {
                if let Ok(name) = CatalogueName::parse(path) {
                    if !config.manages_locale(&name.locale) {
                        warn!(
                            "Locale '{}' of {} is not a managed locale",
                            name.locale,
                            path.display()
                        );
                    }
                }
            }

            info!("Importing {} catalogue(s)", catalogues.len());
            let reports = in_session(db, storage, move |storage, session| {
                catalogues
                    .iter()
                    .map(|path| {
                        transfer::import_catalogue_file(storage, session, path, force)
                            .with_context(|| format!("Failed to import {}", path.display()))
                    })
                    .collect::<Result<Vec<_>>>()
            })
            .await?;
            print_json(&reports)
        }

        Commands::Export {
            hash,
            only_updated,
            output,
        } => {
            let json = in_session(db, storage, move |storage, session| {
                Ok(transfer::export_file_json(storage, session, &hash, only_updated)?)
            })
            .await?;

            match output {
                Some(path) => {
                    std::fs::write(&path, json)
                        .with_context(|| format!("Failed to write export to {}", path.display()))?;
                    info!("Exported to {}", path.display());
                }
                None => println!("{}", json),
            }
            Ok(())
        }

        Commands::Stats => {
            let stats = db.stats()?;
            info!("{}", stats);
            print_json(&stats)
        }

        Commands::Completions { .. } => Ok(()),
    }
}
