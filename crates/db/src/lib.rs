pub mod entry;
/// Database schema
pub mod schema;
pub mod team;
pub mod user;

use std::time::Instant;

use diesel::{
    connection::{set_default_instrumentation, Instrumentation, InstrumentationEvent},
    QueryResult, SqliteConnection,
};
use rocket_sync_db_pools::database;
use uuid::Uuid;

/// Pooled SQLite connection. The pool enables WAL mode and foreign keys on
/// every connection it hands out.
#[database("smileys")]
pub struct DbConn(SqliteConnection);

/// Generate a new public identifier.
pub fn gen_public_id() -> String {
    Uuid::now_v7().to_string()
}

/// Logs every query at `trace` and failed queries at `warn`, along with how
/// long they took.
#[derive(Default)]
struct QueryTracer {
    started: Option<Instant>,
}

impl Instrumentation for QueryTracer {
    fn on_connection_event(&mut self, event: InstrumentationEvent<'_>) {
        match event {
            InstrumentationEvent::StartQuery { query, .. } => {
                self.started = Some(Instant::now());
                tracing::trace!("Started running query {query:?}");
            }
            InstrumentationEvent::FinishQuery { query, error, .. } => {
                let elapsed = self.started.take().map(|t| t.elapsed());
                match error {
                    Some(error) => tracing::warn!(
                        ?elapsed,
                        "Encountered an error when running query {query} (error: {error})"
                    ),
                    None => tracing::trace!(?elapsed, "Finished query {query}"),
                }
            }
            _ => (),
        }
    }
}

fn query_tracer() -> Option<Box<dyn Instrumentation>> {
    Some(Box::new(QueryTracer::default()))
}

/// Installs query tracing for every connection opened after this call.
pub fn install_query_tracing() -> QueryResult<()> {
    set_default_instrumentation(query_tracer)
}
