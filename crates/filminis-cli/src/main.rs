//! Filminis CLI
//!
//! Command-line access to the catalog's movie relations:
//! - Inspecting a movie's genres, directors, dubbers, studios, languages and countries
//! - Adding or removing a single association
//! - Converging all associations to a desired state (with a dry-run plan)
//! - Creating or updating a movie together with its relations
//! - Retrying the failed writes of a saved sync report

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::Colorize;
use filminis_relations::{
    Catalog, CatalogConfig, EntityId, EntityKind, RelationType, RelationsSnapshot, SyncReport,
};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

mod report;

#[derive(Parser)]
#[command(name = "filminis")]
#[command(author, version, about = "Filminis: movie catalog relation tooling")]
struct Cli {
    #[command(flatten)]
    connection: ConnectionArgs,

    /// Log engine activity (debug level); `RUST_LOG` takes precedence
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct ConnectionArgs {
    /// Catalog API base URL
    #[arg(long, env = "FILMINIS_API_URL", global = true)]
    api_url: Option<String>,

    /// Bearer token for the catalog API
    #[arg(long, env = "FILMINIS_TOKEN", global = true, hide_env_values = true)]
    token: Option<String>,

    /// JSON config file (base_url, token, timeout_secs, schema)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Read and write a movie's relations
    Relations {
        #[command(subcommand)]
        command: RelationCommands,
    },

    /// Create or update a movie together with its relations
    Movie {
        #[command(subcommand)]
        command: MovieCommands,
    },

    /// List the rows of an entity resource (filme, genero, diretor, ...)
    List {
        kind: EntityKind,
        /// Print raw JSON
        #[arg(long)]
        json: bool,
    },

    /// Re-issue only the failed writes recorded in a sync report
    Retry {
        /// Report written by `--report-out`
        report: PathBuf,
        /// Write the retry's own report here
        #[arg(long)]
        report_out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum RelationCommands {
    /// Show every association of a movie
    Show {
        movie_id: EntityId,
        /// Print the snapshot as JSON
        #[arg(long)]
        json: bool,
    },

    /// Associate one entity with a movie
    Add {
        movie_id: EntityId,
        relation: RelationType,
        entity_id: EntityId,
    },

    /// Remove one association from a movie
    Remove {
        movie_id: EntityId,
        relation: RelationType,
        entity_id: EntityId,
    },

    /// Converge a movie's associations to the desired state
    Sync {
        movie_id: EntityId,
        #[command(flatten)]
        desired: DesiredArgs,
        /// Print the planned writes without issuing them
        #[arg(long)]
        dry_run: bool,
        /// Save the sync report as JSON (input for `retry`)
        #[arg(long)]
        report_out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum MovieCommands {
    /// Create a movie, then attach its relations
    Create {
        /// Movie fields as JSON, or @path to a JSON file
        #[arg(long)]
        data: String,
        #[command(flatten)]
        desired: DesiredArgs,
        #[arg(long)]
        report_out: Option<PathBuf>,
    },

    /// Update a movie's fields, then converge its relations
    Update {
        movie_id: EntityId,
        /// Movie fields as JSON, or @path to a JSON file
        #[arg(long)]
        data: String,
        #[command(flatten)]
        desired: DesiredArgs,
        #[arg(long)]
        report_out: Option<PathBuf>,
    },
}

/// Desired associations, per type.
///
/// Types without a flag (and absent from `--desired`) end up with no
/// associations, unless `--keep-unlisted` is given for an existing movie.
#[derive(Args, Default)]
struct DesiredArgs {
    /// JSON snapshot file, e.g. {"genre": [1, 2], "country": [3]}
    #[arg(long)]
    desired: Option<PathBuf>,

    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    genre: Option<Vec<EntityId>>,
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    director: Option<Vec<EntityId>>,
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    dubber: Option<Vec<EntityId>>,
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    studio: Option<Vec<EntityId>>,
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    language: Option<Vec<EntityId>>,
    #[arg(long, value_delimiter = ',', value_name = "IDS")]
    country: Option<Vec<EntityId>>,

    /// Leave types that were not given untouched instead of clearing them
    /// (existing movies only; aborts if a current association cannot be read)
    #[arg(long)]
    keep_unlisted: bool,
}

impl DesiredArgs {
    fn flag(&self, relation: RelationType) -> Option<&Vec<EntityId>> {
        match relation {
            RelationType::Genre => self.genre.as_ref(),
            RelationType::Director => self.director.as_ref(),
            RelationType::Dubber => self.dubber.as_ref(),
            RelationType::Studio => self.studio.as_ref(),
            RelationType::Language => self.language.as_ref(),
            RelationType::Country => self.country.as_ref(),
        }
    }

    /// Snapshot from `--desired` and the per-type flags (flags win), plus the
    /// types either of them mentions.
    fn explicit(&self) -> Result<(RelationsSnapshot, Vec<RelationType>)> {
        let file = match &self.desired {
            Some(path) => Some(read_json(path)?),
            None => None,
        };
        let mut snapshot: RelationsSnapshot = match &file {
            Some(value) => serde_json::from_value(value.clone())
                .context("--desired must map relation types to id lists")?,
            None => RelationsSnapshot::empty(),
        };

        for relation in RelationType::ALL {
            if let Some(ids) = self.flag(relation) {
                snapshot = snapshot.with(relation, ids.iter().copied());
            }
        }

        let listed = RelationType::ALL
            .into_iter()
            .filter(|t| {
                self.flag(*t).is_some()
                    || file.as_ref().is_some_and(|f| f.get(t.as_str()).is_some())
            })
            .collect();
        Ok((snapshot, listed))
    }
}

/// Desired state for an existing movie.
///
/// With `--keep-unlisted`, each unlisted type is read strictly: an unreadable
/// type aborts the command rather than being taken as empty and cleared.
async fn resolve_target(
    catalog: &Catalog,
    movie_id: EntityId,
    desired: &DesiredArgs,
) -> Result<RelationsSnapshot> {
    let (mut snapshot, listed) = desired.explicit()?;
    if !desired.keep_unlisted {
        return Ok(snapshot);
    }

    for relation in RelationType::ALL.into_iter().filter(|t| !listed.contains(t)) {
        let current = catalog
            .read_relation(movie_id, relation)
            .await
            .with_context(|| {
                format!("cannot read current {relation} of movie {movie_id} to keep it")
            })?;
        snapshot.set(relation, current);
    }
    Ok(snapshot)
}

// ============================================================================
// Main
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = load_config(&cli.connection)?;
    tracing::debug!(
        base_url = %config.base_url,
        authenticated = config.token.is_some(),
        timeout_secs = config.timeout_secs,
        "catalog configured"
    );
    let catalog = Catalog::from_config(&config).context("cannot set up catalog client")?;

    match cli.command {
        Commands::Relations { command } => match command {
            RelationCommands::Show { movie_id, json } => cmd_show(&catalog, movie_id, json).await,
            RelationCommands::Add {
                movie_id,
                relation,
                entity_id,
            } => {
                catalog
                    .add_relation(movie_id, relation, entity_id)
                    .await
                    .with_context(|| format!("cannot add {relation} {entity_id} to movie {movie_id}"))?;
                println!("{} {relation} {entity_id} → movie {movie_id}", "added".green().bold());
                Ok(())
            }
            RelationCommands::Remove {
                movie_id,
                relation,
                entity_id,
            } => {
                catalog
                    .remove_relation(movie_id, relation, entity_id)
                    .await
                    .with_context(|| {
                        format!("cannot remove {relation} {entity_id} from movie {movie_id}")
                    })?;
                println!("{} {relation} {entity_id} ✗ movie {movie_id}", "removed".yellow().bold());
                Ok(())
            }
            RelationCommands::Sync {
                movie_id,
                desired,
                dry_run,
                report_out,
            } => cmd_sync(&catalog, movie_id, &desired, dry_run, report_out.as_deref()).await,
        },
        Commands::Movie { command } => match command {
            MovieCommands::Create {
                data,
                desired,
                report_out,
            } => cmd_create(&catalog, &data, &desired, report_out.as_deref()).await,
            MovieCommands::Update {
                movie_id,
                data,
                desired,
                report_out,
            } => cmd_update(&catalog, movie_id, &data, &desired, report_out.as_deref()).await,
        },
        Commands::List { kind, json } => cmd_list(&catalog, kind, json).await,
        Commands::Retry { report, report_out } => {
            cmd_retry(&catalog, &report, report_out.as_deref()).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Config file (or environment) first, then explicit flags on top.
fn load_config(args: &ConnectionArgs) -> Result<CatalogConfig> {
    let config = match &args.config {
        Some(path) => CatalogConfig::from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => CatalogConfig::from_env().context("invalid FILMINIS_* environment")?,
    };
    apply_overrides(config, args)
}

fn apply_overrides(mut config: CatalogConfig, args: &ConnectionArgs) -> Result<CatalogConfig> {
    if let Some(url) = &args.api_url {
        config.base_url = url.clone();
    }
    if let Some(token) = args.token.as_ref().filter(|t| !t.is_empty()) {
        config = config.with_token(token.as_str());
    }
    if let Some(timeout) = args.timeout {
        config.timeout_secs = timeout;
    }
    config.validate()?;
    Ok(config)
}

// ============================================================================
// Commands
// ============================================================================

async fn cmd_show(catalog: &Catalog, movie_id: EntityId, json: bool) -> Result<()> {
    let snapshot = catalog.get_relations(movie_id).await;
    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        report::print_snapshot(movie_id, &snapshot);
    }
    Ok(())
}

async fn cmd_sync(
    catalog: &Catalog,
    movie_id: EntityId,
    desired: &DesiredArgs,
    dry_run: bool,
    report_out: Option<&Path>,
) -> Result<()> {
    let target = resolve_target(catalog, movie_id, desired).await?;

    if dry_run {
        let diffs = catalog.plan(movie_id, &target).await;
        report::print_plan(movie_id, &diffs);
        return Ok(());
    }

    let sync = catalog.sync_relations(movie_id, &target).await;
    finish(&sync, report_out)
}

async fn cmd_create(
    catalog: &Catalog,
    data: &str,
    desired: &DesiredArgs,
    report_out: Option<&Path>,
) -> Result<()> {
    if desired.keep_unlisted {
        bail!("--keep-unlisted needs an existing movie; use `movie update` or `relations sync`");
    }
    let data = parse_data(data)?;
    let (target, _) = desired.explicit()?;

    let created = catalog
        .create_with_relations(&data, &target)
        .await
        .context("cannot create movie")?;
    println!(
        "{} movie {}",
        "created".green().bold(),
        created.central_id.to_string().bold()
    );
    finish(&created.sync, report_out)
}

async fn cmd_update(
    catalog: &Catalog,
    movie_id: EntityId,
    data: &str,
    desired: &DesiredArgs,
    report_out: Option<&Path>,
) -> Result<()> {
    let data = parse_data(data)?;
    let target = resolve_target(catalog, movie_id, desired).await?;

    let sync = catalog
        .update_with_relations(movie_id, &data, &target)
        .await
        .with_context(|| format!("cannot update movie {movie_id}"))?;
    println!("{} movie {}", "updated".green().bold(), movie_id.to_string().bold());
    finish(&sync, report_out)
}

async fn cmd_list(catalog: &Catalog, kind: EntityKind, json: bool) -> Result<()> {
    let rows = catalog
        .entities()
        .list(kind)
        .await
        .with_context(|| format!("cannot list {kind}"))?;
    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        report::print_rows(&catalog.entities(), kind, &rows);
    }
    Ok(())
}

async fn cmd_retry(catalog: &Catalog, path: &Path, report_out: Option<&Path>) -> Result<()> {
    let previous: SyncReport = serde_json::from_value(read_json(path)?)
        .with_context(|| format!("{} is not a sync report", path.display()))?;
    if previous.is_fully_synced() {
        println!("{} nothing to retry", "ok".green().bold());
        return Ok(());
    }

    let sync = catalog.retry_failed(&previous).await;
    finish(&sync, report_out)
}

/// Prints the report, saves it when asked, and fails if any write failed.
fn finish(sync: &SyncReport, report_out: Option<&Path>) -> Result<()> {
    report::print_report(sync);

    if let Some(out) = report_out {
        let json = serde_json::to_string_pretty(sync)?;
        fs::write(out, json).with_context(|| format!("cannot write {}", out.display()))?;
        eprintln!("{} {}", "wrote".green().bold(), out.display().to_string().bold());
    }

    if !sync.is_fully_synced() {
        bail!(
            "{} relation write(s) failed for movie {}",
            sync.total_failures(),
            sync.central_id
        );
    }
    Ok(())
}

// ============================================================================
// Input helpers
// ============================================================================

fn read_json(path: &Path) -> Result<Value> {
    let text =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("{} is not valid JSON", path.display()))
}

/// `--data` is inline JSON, or `@path` to a JSON file.
fn parse_data(raw: &str) -> Result<Value> {
    let value = match raw.strip_prefix('@') {
        Some(path) => read_json(Path::new(path))?,
        None => serde_json::from_str(raw).context("--data is not valid JSON")?,
    };
    if !value.is_object() {
        bail!("--data must be a JSON object of movie fields");
    }
    Ok(value)
}
