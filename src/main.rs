//! folio-cli - management commands for the folio backend

use clap::{Parser, Subcommand};

use folio::db;
use folio::db::search::{Glue, ListParams, RecordSchema};
use folio::db::PgRecordStore;
use folio::queue::{JobPriority, JobQueue, JobType, PostgresJobQueue};
use folio::services::{search, IndexingService};
use folio::Config;

#[derive(Parser)]
#[clap(name = "folio-cli", about = "Folio management commands", version)]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Apply pending database migrations
    Migrate,
    /// Recompute search vectors for the given records
    UpdateSearchVectors {
        /// Record primary keys
        #[clap(required = true)]
        record_pks: Vec<i64>,
        /// Update in-process instead of enqueueing background jobs
        #[clap(long)]
        immediate: bool,
    },
    /// Run a ranked search against the records table
    Search {
        /// Free-text query
        q: String,
    },
    /// List records using the dynamic filter/sort surface
    List {
        /// JSON-encoded filter map
        #[clap(long)]
        filters: Option<String>,
        /// JSON-encoded exclude map
        #[clap(long)]
        exclude: Option<String>,
        /// Free-text query
        #[clap(long)]
        q: Option<String>,
        /// Date-range overlap token, "start,end"
        #[clap(long)]
        overlaps: Option<String>,
        /// Comma-separated sort keys, "-" prefix for descending
        #[clap(long)]
        orderby: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::load()?;
    let _guard = folio::logging::init_logging(&config.logging)?;

    let pool = db::connect(&config.database).await?;

    match cli.command {
        Command::Migrate => {
            db::run_migrations(&pool).await?;
            println!("migrations applied");
        }
        Command::UpdateSearchVectors {
            record_pks,
            immediate,
        } => {
            if immediate {
                let service = IndexingService::new(pool.clone(), config.search.clone());
                for pk in record_pks {
                    match service.update_search_vector(pk).await {
                        Ok(()) => println!("updated search vector for record {}", pk),
                        Err(e) => eprintln!("record {}: {}", pk, e),
                    }
                }
            } else {
                let queue = PostgresJobQueue::new(pool.clone());
                for pk in record_pks {
                    let job_id = queue
                        .enqueue(JobType::update_search_vector(pk), JobPriority::Normal)
                        .await?;
                    println!("enqueued vector refresh for record {} as job {}", pk, job_id);
                }
            }
        }
        Command::Search { q } => {
            let schema = RecordSchema::records();
            let hits = search::search_records(&pool, &schema, &q).await?;
            println!("search q:{} found:{}", q, hits.len());
            for hit in hits {
                println!(
                    "title: \"{}\" pk:{} rank:{:.4}",
                    hit.record.title, hit.record.id, hit.rank
                );
            }
        }
        Command::List {
            filters,
            exclude,
            q,
            overlaps,
            orderby,
        } => {
            let mut pairs: Vec<(&str, &str)> = Vec::new();
            for (key, value) in [
                ("filters", &filters),
                ("exclude", &exclude),
                ("q", &q),
                ("overlaps", &overlaps),
                ("orderby", &orderby),
            ] {
                if let Some(value) = value.as_deref() {
                    pairs.push((key, value));
                }
            }

            let schema = RecordSchema::records();
            let params = ListParams::from_query_pairs(pairs, &config.search);
            let glue = Glue::new(&params, &schema, &config.search);

            let store = PgRecordStore::new(pool.clone());
            let total = store.count(&glue.query).await?;
            let records = store.fetch_records(&glue.query).await?;
            println!("found:{} request:{}", total, params.digest());
            for record in records {
                println!(
                    "pk:{} slug:{} status:{} \"{}\"",
                    record.id, record.slug, record.status, record.title
                );
            }
            if let Some(warnings) = glue.warnings {
                eprintln!("warnings: {}", serde_json::to_string(&warnings)?);
            }
        }
    }

    Ok(())
}
