//! `asynq`: seed the sample school database, configure a backend, run the
//! sample queries, and compare the two executors' throughput.

mod school;
mod setup;

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::Context;
use asynq_configuration::{
    write_parsed_configuration, Backend, Configuration, ConnectionUri, ParsedConfiguration,
};
use clap::{Parser, Subcommand, ValueEnum};
use query_engine_execution::metrics::Metrics;
use query_engine_execution::parameters::SingleId;
use query_engine_execution::rusqlite_backend::RusqliteSession;
use query_engine_execution::sqlx_backend::{PostgresSession, SqliteSession};
use query_engine_execution::{
    AsyncQueryExecutor, ExecutionEnvironment, NativeAsyncExecutor, SynchronousExecutor,
};
use tracing::info;

use school::models::{ClassEnrollmentDetails, ProgramEnrollmentId};
use school::{queries, seed};

#[derive(Parser)]
#[command(name = "asynq")]
#[command(about = "Typed query descriptors over SQL backends", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create the sample school schema in a SQLite file and fill it.
    Seed {
        #[arg(long, value_name = "PATH")]
        database: PathBuf,
    },
    /// Write a configuration pointing at a database.
    Init {
        #[arg(long, value_name = "DIR", env = "ASYNQ_CONFIGURATION_DIRECTORY")]
        configuration: PathBuf,
        /// Connection URI, or the SQLite file path.
        #[arg(long)]
        connection_uri: Option<String>,
        #[arg(long, value_enum, default_value_t = BackendArg::Sqlite)]
        backend: BackendArg,
    },
    /// Print the class enrollment details of one program enrollment.
    Query {
        #[arg(long, value_name = "DIR", env = "ASYNQ_CONFIGURATION_DIRECTORY")]
        configuration: PathBuf,
        #[arg(long, default_value_t = 1)]
        program_enrollment: i32,
    },
    /// Run the details query through both executors and compare.
    Bench {
        #[arg(long, value_name = "DIR", env = "ASYNQ_CONFIGURATION_DIRECTORY")]
        configuration: PathBuf,
        #[arg(long, default_value_t = 250)]
        queries: u32,
        /// Print the collected metrics when done.
        #[arg(long)]
        metrics: bool,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum BackendArg {
    Postgres,
    Sqlite,
    SqliteSynchronous,
}

impl From<BackendArg> for Backend {
    fn from(backend: BackendArg) -> Self {
        match backend {
            BackendArg::Postgres => Backend::Postgres,
            BackendArg::Sqlite => Backend::Sqlite,
            BackendArg::SqliteSynchronous => Backend::SqliteSynchronous,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match Cli::parse().command {
        Command::Seed { database } => {
            let seeded = seed::seed(&database)
                .with_context(|| format!("seeding {}", database.display()))?;
            info!(
                database = %database.display(),
                courses = seeded.courses,
                staff = seeded.staff,
                terms = seeded.terms,
                classes = seeded.classes,
                class_enrollments = seeded.class_enrollments,
                "seeded the school database"
            );
        }
        Command::Init {
            configuration,
            connection_uri,
            backend,
        } => {
            let mut parsed = ParsedConfiguration::initial();
            parsed.connection.backend = backend.into();
            if let Some(uri) = connection_uri {
                parsed.connection.connection_uri = ConnectionUri::from(uri);
            }
            write_parsed_configuration(parsed, &configuration).await?;
            info!(directory = %configuration.display(), "wrote configuration");
        }
        Command::Query {
            configuration,
            program_enrollment,
        } => query(&configuration, ProgramEnrollmentId(program_enrollment)).await?,
        Command::Bench {
            configuration,
            queries,
            metrics,
        } => bench(&configuration, queries, metrics).await?,
    }
    Ok(())
}

async fn query(configuration_dir: &Path, program: ProgramEnrollmentId) -> anyhow::Result<()> {
    let configuration = setup::load_configuration(configuration_dir).await?;
    let environment = setup::execution_environment(&configuration, Metrics::unregistered()?);
    let descriptor = queries::class_enrollment_details_by_program_enrollment();
    let connection = &configuration.connection;

    let rows = match connection.backend {
        Backend::Postgres => {
            let uri = connection.connection_uri.clone();
            NativeAsyncExecutor::current(environment)
                .execute(|| PostgresSession::new(uri), &descriptor, SingleId(program), None)
                .await?
        }
        Backend::Sqlite => {
            let uri = connection.sqlx_uri();
            NativeAsyncExecutor::current(environment)
                .execute(|| SqliteSession::new(uri), &descriptor, SingleId(program), None)
                .await?
        }
        Backend::SqliteSynchronous => {
            let path = sqlite_path(&configuration)?;
            tokio::task::spawn_blocking(move || {
                SynchronousExecutor::new(environment).execute_sync(
                    || RusqliteSession::read_only(path),
                    &descriptor,
                    SingleId(program),
                    None,
                )
            })
            .await??
        }
    };

    for row in &rows {
        println!("{}", describe(row));
    }
    info!(rows = rows.len(), "query completed");
    Ok(())
}

fn describe(row: &ClassEnrollmentDetails) -> String {
    let class = row
        .class
        .as_ref()
        .map_or("-".to_string(), |class| format!("{} {}", class.code, class.section));
    let term = row.term.as_ref().map_or("-", |term| term.code.as_str());
    let course = row
        .class_course
        .as_ref()
        .or(row.required_course.as_ref())
        .map_or("-", |course| course.name.as_str());
    let instructor = row.instructor.as_ref().map_or("-".to_string(), |staff| {
        format!("{} {}", staff.first_name, staff.last_name)
    });
    format!(
        "#{:<4} {class:<8} {term:<6} {course:<16} {instructor}",
        row.enrollment.id.0
    )
}

fn sqlite_path(configuration: &Configuration) -> anyhow::Result<PathBuf> {
    configuration
        .connection
        .sqlite_path()
        .context("the configured backend is not SQLite")
}

fn parameters(index: u32) -> SingleId<ProgramEnrollmentId> {
    let program = i32::try_from(index).map_or(1, |index| index % seed::PROGRAM_ENROLLMENTS + 1);
    SingleId(ProgramEnrollmentId(program))
}

async fn bench(configuration_dir: &Path, queries: u32, print_metrics: bool) -> anyhow::Result<()> {
    let configuration = setup::load_configuration(configuration_dir).await?;
    let path = sqlite_path(&configuration)?;
    let uri = configuration.connection.sqlx_uri();

    let mut registry = prometheus::Registry::new();
    let metrics = Metrics::initialize(&mut registry)?;
    let environment = setup::execution_environment(&configuration, metrics);
    let descriptor = queries::class_enrollment_details_by_program_enrollment();

    info!("beginning asynchronous querying");
    let executor = NativeAsyncExecutor::current(environment.clone());
    let started = Instant::now();
    let pending: Vec<_> = (0..queries)
        .map(|index| {
            executor.execute(
                || SqliteSession::new(uri.clone()),
                &descriptor,
                parameters(index),
                Some(1),
            )
        })
        .collect();
    let mut asynchronous = Vec::with_capacity(pending.len());
    for future in pending {
        asynchronous.push(future.await?);
    }
    report("Asynchronous", queries, started.elapsed());

    info!("beginning synchronous querying");
    let (synchronous, elapsed) =
        tokio::task::spawn_blocking(move || run_synchronously(&environment, &path, queries))
            .await??;
    report("Synchronous", queries, elapsed);

    if let Some(index) = (0..asynchronous.len()).find(|&i| asynchronous.get(i) != synchronous.get(i)) {
        anyhow::bail!("the executors disagree on the results of query #{}", index + 1);
    }
    if asynchronous.len() != synchronous.len() {
        anyhow::bail!("the executors ran a different number of queries");
    }
    info!("both executors produced identical results");

    if print_metrics {
        print!("{}", prometheus::TextEncoder::new().encode_to_string(&registry.gather())?);
    }
    Ok(())
}

fn run_synchronously(
    environment: &ExecutionEnvironment,
    path: &Path,
    queries: u32,
) -> Result<(Vec<Vec<ClassEnrollmentDetails>>, Duration), query_engine_execution::Error> {
    let executor = SynchronousExecutor::new(environment.clone());
    let descriptor = queries::class_enrollment_details_by_program_enrollment();
    let started = Instant::now();
    let results = (0..queries)
        .map(|index| {
            executor.execute_sync(
                || RusqliteSession::read_only(path),
                &descriptor,
                parameters(index),
                Some(1),
            )
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok((results, started.elapsed()))
}

fn report(label: &str, queries: u32, elapsed: Duration) {
    let milliseconds = elapsed.as_secs_f64() * 1000.0;
    let count = f64::from(queries);
    println!(
        "{label} execution completed {queries} queries in {milliseconds:.0} ms, \
         average {:.3} ms/query, {:.1} queries/sec",
        milliseconds / count.max(1.0),
        count / elapsed.as_secs_f64().max(f64::EPSILON)
    );
}
