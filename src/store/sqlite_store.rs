//! SQLite-backed cone search store.
//!
//! Opens a fixed pool of read-only connections over the catalog database.
//! Each connection carries the `angular_distance(ra1, dec1, ra2, dec2)` SQL
//! function so catalog templates can express the cone predicate directly.

use super::cancel::CancelFlag;
use super::row::{ResultColumn, ResultRow, Value};
use super::sphere::angular_separation_deg;
use super::{ConeSearchStore, RowSink};
use crate::catalog::{CatalogDescriptor, CatalogRegistry};
use crate::conesearch::{Cone, ConeSearchError};
use crate::server::metrics;
use anyhow::{bail, Context, Result};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, ErrorCode, OpenFlags, Statement};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Number of SQLite VM instructions between two cancellation checks.
const PROGRESS_CHECK_OPS: i32 = 1_000;

const NAMED_PARAMETERS: [&str; 3] = [":ra", ":dec", ":sr"];

#[derive(Clone)]
pub struct SqliteConeSearchStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    read_index: Arc<AtomicUsize>,
    query_timeout: Duration,
}

fn register_functions(conn: &Connection) -> rusqlite::Result<()> {
    conn.create_scalar_function(
        "angular_distance",
        4,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let ra1: Option<f64> = ctx.get(0)?;
            let dec1: Option<f64> = ctx.get(1)?;
            let ra2: Option<f64> = ctx.get(2)?;
            let dec2: Option<f64> = ctx.get(3)?;
            Ok(match (ra1, dec1, ra2, dec2) {
                (Some(ra1), Some(dec1), Some(ra2), Some(dec2)) => {
                    Some(angular_separation_deg(ra1, dec1, ra2, dec2))
                }
                _ => None,
            })
        },
    )
}

/// Binds the cone into a prepared template.
///
/// Templates referencing `:ra`, `:dec` or `:sr` are bound by name. Otherwise
/// the template must have exactly three positional parameters, bound in
/// `(ra, dec, sr)` order.
fn bind_cone(stmt: &mut Statement<'_>, cone: &Cone) -> rusqlite::Result<std::result::Result<(), String>> {
    let values = [cone.ra, cone.dec, cone.sr];

    let mut bound_by_name = false;
    for (name, value) in NAMED_PARAMETERS.iter().zip(values) {
        if let Some(index) = stmt.parameter_index(name)? {
            stmt.raw_bind_parameter(index, value)?;
            bound_by_name = true;
        }
    }
    if bound_by_name {
        return Ok(Ok(()));
    }

    let count = stmt.parameter_count();
    if count != values.len() {
        return Ok(Err(format!(
            "template must reference :ra/:dec/:sr or have exactly 3 positional parameters, found {}",
            count
        )));
    }
    for (index, value) in values.into_iter().enumerate() {
        stmt.raw_bind_parameter(index + 1, value)?;
    }
    Ok(Ok(()))
}

fn is_interrupt(err: &rusqlite::Error) -> bool {
    matches!(err, rusqlite::Error::SqliteFailure(e, _) if e.code == ErrorCode::OperationInterrupted)
}

/// Keeps the progress handler installed for the lifetime of one query.
struct InterruptGuard<'a> {
    conn: &'a Connection,
}

impl<'a> InterruptGuard<'a> {
    fn install(conn: &'a Connection, cancel: CancelFlag, deadline: Instant) -> Self {
        conn.progress_handler(
            PROGRESS_CHECK_OPS,
            Some(move || cancel.is_cancelled() || Instant::now() >= deadline),
        );
        InterruptGuard { conn }
    }
}

impl Drop for InterruptGuard<'_> {
    fn drop(&mut self) {
        self.conn.progress_handler(0, None::<fn() -> bool>);
    }
}

impl SqliteConeSearchStore {
    /// Open the catalog database.
    ///
    /// # Arguments
    /// * `db_path` - Path to the SQLite catalog database, which must exist
    /// * `read_pool_size` - Number of connections serving concurrent searches
    /// * `query_timeout` - Wall-clock limit for a single search, streaming included
    pub fn open<P: AsRef<Path>>(
        db_path: P,
        read_pool_size: usize,
        query_timeout: Duration,
    ) -> Result<Self> {
        let db_path_ref = db_path.as_ref();
        if read_pool_size == 0 {
            bail!("Read pool size must be at least 1");
        }

        let mut read_pool = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size {
            let read_conn = Connection::open_with_flags(
                db_path_ref,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )
            .with_context(|| format!("Failed to open catalog database {:?}", db_path_ref))?;
            read_conn.busy_timeout(Duration::from_secs(5))?;
            register_functions(&read_conn)
                .context("Failed to register angular_distance function")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        info!(
            "Opened catalog database {:?} with {} read connection(s), query timeout {:?}",
            db_path_ref, read_pool_size, query_timeout
        );

        Ok(SqliteConeSearchStore {
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
            query_timeout,
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    /// Prepares every catalog template once and checks its parameters.
    ///
    /// Problems are logged and returned, but do not prevent startup: the
    /// affected catalog still resolves and its searches fail at runtime.
    pub fn verify_templates(&self, registry: &CatalogRegistry) -> Vec<String> {
        let conn = self.get_read_conn();
        let conn = match conn.lock() {
            Ok(conn) => conn,
            Err(_) => return registry.ids(),
        };

        let mut failing = Vec::new();
        for id in registry.ids() {
            let Ok(catalog) = registry.resolve(&id) else {
                continue;
            };
            let problem = match conn.prepare(catalog.query.as_sql()) {
                Ok(mut stmt) => match bind_cone(&mut stmt, &Cone { ra: 0.0, dec: 0.0, sr: 0.0 }) {
                    Ok(Ok(())) => None,
                    Ok(Err(msg)) => Some(msg),
                    Err(e) => Some(e.to_string()),
                },
                Err(e) => Some(e.to_string()),
            };
            match problem {
                None => debug!("Catalog '{}': query template verified", id),
                Some(msg) => {
                    warn!("Catalog '{}': query template is invalid: {}", id, msg);
                    failing.push(id);
                }
            }
        }
        failing
    }

    fn run_query(
        &self,
        conn: &Connection,
        catalog: &CatalogDescriptor,
        cone: &Cone,
        cancel: &CancelFlag,
        sink: &mut dyn RowSink,
        rows_seen: &mut u64,
    ) -> std::result::Result<(), QueryFailure> {
        let mut stmt = conn.prepare(catalog.query.as_sql())?;
        bind_cone(&mut stmt, cone)?.map_err(QueryFailure::Template)?;

        let columns: Arc<[ResultColumn]> = stmt
            .columns()
            .iter()
            .map(|c| ResultColumn::new(c.name(), c.decl_type()))
            .collect();
        let column_count = columns.len();
        sink.start(&columns)?;

        let mut rows = stmt.raw_query();
        while let Some(row) = rows.next()? {
            let values = (0..column_count)
                .map(|i| row.get_ref(i).map(Value::from))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            *rows_seen += 1;
            if sink.row(ResultRow::new(columns.clone(), values))?.is_break() {
                break;
            }
            if cancel.is_cancelled() {
                break;
            }
        }
        Ok(())
    }
}

enum QueryFailure {
    Sqlite(rusqlite::Error),
    Template(String),
    Sink(ConeSearchError),
}

impl From<rusqlite::Error> for QueryFailure {
    fn from(err: rusqlite::Error) -> Self {
        QueryFailure::Sqlite(err)
    }
}

impl From<ConeSearchError> for QueryFailure {
    fn from(err: ConeSearchError) -> Self {
        QueryFailure::Sink(err)
    }
}

impl ConeSearchStore for SqliteConeSearchStore {
    fn execute(
        &self,
        catalog: &CatalogDescriptor,
        cone: &Cone,
        cancel: &CancelFlag,
        sink: &mut dyn RowSink,
    ) -> std::result::Result<(), ConeSearchError> {
        let started = Instant::now();
        let deadline = started + self.query_timeout;

        let conn = self.get_read_conn();
        let conn = conn.lock().map_err(|_| {
            ConeSearchError::QueryExecution("catalog connection lock poisoned".to_string())
        })?;

        let mut rows_seen = 0;
        let result = {
            let _interrupt = InterruptGuard::install(&conn, cancel.clone(), deadline);
            self.run_query(&conn, catalog, cone, cancel, sink, &mut rows_seen)
        };

        let (outcome, result) = match result {
            _ if cancel.is_cancelled() => {
                debug!(
                    "Catalog '{}': search cancelled after {} row(s)",
                    catalog.id, rows_seen
                );
                ("cancelled", Ok(()))
            }
            Ok(()) => ("ok", Ok(())),
            Err(QueryFailure::Sqlite(e)) if is_interrupt(&e) && Instant::now() >= deadline => (
                "timeout",
                Err(ConeSearchError::QueryExecution(format!(
                    "query exceeded the {:?} timeout",
                    self.query_timeout
                ))),
            ),
            Err(QueryFailure::Sqlite(e)) => ("error", Err(ConeSearchError::from(e))),
            Err(QueryFailure::Template(msg)) => ("error", Err(ConeSearchError::QueryExecution(msg))),
            Err(QueryFailure::Sink(e)) => ("error", Err(e)),
        };

        metrics::record_query(&catalog.id, outcome, rows_seen, started.elapsed());
        result
    }
}
