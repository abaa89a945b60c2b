//! Durable record of every input row and its scrape status.
//!
//! Three kinds of tables live in one SQLite database: `inputs` (one row per
//! distinct [`InputRow`], one column per field id), `results` (status per
//! input id) and any number of output tables named by the configuration.

use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;
use std::time::Duration;

use chrono::{SecondsFormat, Utc};
use engine_logging::{engine_debug, engine_info};
use formscrape_core::{InputRow, JobStatus, Provenance, Table, UnknownStatus};
use sha2::{Digest, Sha256};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, Sqlite, Transaction};
use thiserror::Error;

const INPUTS: &str = "inputs";
const RESULTS: &str = "results";
const FIXED_INPUT_COLUMNS: [&str; 5] = ["id", "row_hash", "url", "subkey", "subval"];
const BUSY_TIMEOUT: Duration = Duration::from_secs(30);
/// Write transactions hold the write lock from their first statement.
const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("database error: {0}")]
    Sql(#[from] sqlx::Error),
    #[error("could not encode input row: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("row {id}: illegal status change {from} -> {to}")]
    IllegalTransition {
        id: i64,
        from: JobStatus,
        to: JobStatus,
    },
    #[error("no status recorded for input row {0}")]
    UnknownRow(i64),
    #[error("field id {0:?} collides with a fixed column of the inputs table")]
    ReservedColumn(String),
    #[error("field id {field:?} differs only in case from column {existing:?} of the inputs table")]
    ColumnClash { field: String, existing: String },
    #[error("{0:?} is reserved and cannot name an output table")]
    ReservedTable(String),
    #[error("row {id}: {source}")]
    CorruptStatus {
        id: i64,
        #[source]
        source: UnknownStatus,
    },
}

/// What one `update_inputs` call did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GrowthReport {
    pub candidates: usize,
    pub new_rows: usize,
    pub total_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LedgerSnapshot {
    /// Every input row known to the ledger, keyed by id.
    pub rows: BTreeMap<i64, InputRow>,
    pub growth: GrowthReport,
}

/// An input row that still needs work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRow {
    pub id: i64,
    pub status: JobStatus,
}

#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
}

impl Ledger {
    /// Opens (creating if missing) the database named by `locator`, either a
    /// plain file path or a `sqlite:` URL.
    pub async fn open(locator: &str) -> Result<Self, LedgerError> {
        let options = if locator.starts_with("sqlite:") {
            SqliteConnectOptions::from_str(locator)?
        } else {
            SqliteConnectOptions::new().filename(locator)
        };
        let options = options.create_if_missing(true).busy_timeout(BUSY_TIMEOUT);

        // One connection: an in-memory database lives exactly as long as it,
        // and a file database sees one writer per process.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let ledger = Self { pool };
        ledger.ensure_schema().await?;
        engine_debug!("Opened ledger {}", locator);
        Ok(ledger)
    }

    pub async fn in_memory() -> Result<Self, LedgerError> {
        Self::open("sqlite::memory:").await
    }

    /// The underlying pool, for reading output tables back.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn ensure_schema(&self) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS inputs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                row_hash TEXT NOT NULL UNIQUE,
                url TEXT NOT NULL,
                subkey TEXT NOT NULL,
                subval TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS results (
                id INTEGER PRIMARY KEY,
                status TEXT NOT NULL,
                last_update TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Adds every candidate not already present and returns the full ledger.
    ///
    /// Runs as one transaction: either every new row is appended or none is.
    /// New rows get ids directly above the current maximum and ids are never
    /// reused.
    pub async fn update_inputs<I>(&self, candidates: I) -> Result<LedgerSnapshot, LedgerError>
    where
        I: IntoIterator<Item = InputRow>,
    {
        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;
        let mut columns = table_columns(&mut tx, INPUTS).await?;
        let mut stored = stored_hashes(&mut tx).await?;
        let mut growth = GrowthReport::default();

        for row in candidates {
            growth.candidates += 1;
            for field in row.fields.keys() {
                if FIXED_INPUT_COLUMNS
                    .iter()
                    .any(|fixed| fixed.eq_ignore_ascii_case(field))
                {
                    return Err(LedgerError::ReservedColumn(field.clone()));
                }
                match columns.get(&field.to_ascii_lowercase()) {
                    Some(existing) if existing != field => {
                        return Err(LedgerError::ColumnClash {
                            field: field.clone(),
                            existing: existing.clone(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        add_column(&mut tx, INPUTS, field).await?;
                        columns.insert(field.to_ascii_lowercase(), field.clone());
                    }
                }
            }

            // A duplicate insert would still consume an AUTOINCREMENT id.
            let hash = row_hash(&row)?;
            if !stored.insert(hash.clone()) {
                continue;
            }

            let field_columns: String = row
                .fields
                .keys()
                .map(|field| format!(", {}", quote_ident(field)))
                .collect();
            let placeholders = ", ?".repeat(row.fields.len());
            let sql = format!(
                "INSERT INTO inputs (row_hash, url, subkey, subval{field_columns}) \
                 VALUES (?, ?, ?, ?{placeholders})"
            );
            let mut query = sqlx::query(&sql)
                .bind(hash)
                .bind(&row.url)
                .bind(&row.subkey)
                .bind(&row.subval);
            for value in row.fields.values() {
                query = query.bind(value);
            }
            growth.new_rows += query.execute(&mut *tx).await?.rows_affected() as usize;
        }

        let rows = read_inputs(&mut tx).await?;
        tx.commit().await?;

        growth.total_rows = rows.len();
        engine_info!(
            "Input ledger: {} candidate rows, {} new, {} total",
            growth.candidates,
            growth.new_rows,
            growth.total_rows
        );
        Ok(LedgerSnapshot { rows, growth })
    }

    /// Every input row, keyed by id.
    pub async fn rows(&self) -> Result<BTreeMap<i64, InputRow>, LedgerError> {
        let mut tx = self.pool.begin().await?;
        let rows = read_inputs(&mut tx).await?;
        tx.commit().await?;
        Ok(rows)
    }

    /// Gives every input row without a status a `not_started` one and
    /// returns the work-list: rows neither done nor errored, by id.
    pub async fn sync_results(&self) -> Result<Vec<PendingRow>, LedgerError> {
        let added = sqlx::query(
            r#"
            INSERT INTO results (id, status, last_update)
            SELECT i.id, ?, ? FROM inputs i
            WHERE NOT EXISTS (SELECT 1 FROM results r WHERE r.id = i.id)
            "#,
        )
        .bind(JobStatus::NotStarted.as_str())
        .bind(now())
        .execute(&self.pool)
        .await?
        .rows_affected();
        if added > 0 {
            engine_debug!("Registered {} new row(s) as not started", added);
        }

        let rows = sqlx::query("SELECT id, status FROM results WHERE status NOT IN (?, ?) ORDER BY id")
            .bind(JobStatus::Done.as_str())
            .bind(JobStatus::Error.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter()
            .map(|row| {
                let (id, status) = read_status(row)?;
                Ok(PendingRow { id, status })
            })
            .collect()
    }

    /// Moves one row forward. Backwards or skipping moves are rejected and
    /// leave the stored status untouched.
    pub async fn set_status(&self, id: i64, status: JobStatus) -> Result<(), LedgerError> {
        let predecessors = status.predecessors();
        if !predecessors.is_empty() {
            let placeholders = vec!["?"; predecessors.len()].join(", ");
            let sql = format!(
                "UPDATE results SET status = ?, last_update = ? WHERE id = ? AND status IN ({placeholders})"
            );
            let mut query = sqlx::query(&sql).bind(status.as_str()).bind(now()).bind(id);
            for prev in &predecessors {
                query = query.bind(prev.as_str());
            }
            if query.execute(&self.pool).await?.rows_affected() == 1 {
                return Ok(());
            }
        }

        match self.status(id).await? {
            None => Err(LedgerError::UnknownRow(id)),
            Some(from) => Err(LedgerError::IllegalTransition {
                id,
                from,
                to: status,
            }),
        }
    }

    pub async fn status(&self, id: i64) -> Result<Option<JobStatus>, LedgerError> {
        let row = sqlx::query("SELECT id, status FROM results WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref()
            .map(|row| read_status(row).map(|(_, status)| status))
            .transpose()
    }

    /// Rows per status; every status is present, possibly with zero.
    pub async fn status_counts(&self) -> Result<BTreeMap<JobStatus, i64>, LedgerError> {
        let mut counts: BTreeMap<JobStatus, i64> =
            JobStatus::ALL.into_iter().map(|status| (status, 0)).collect();
        let rows = sqlx::query("SELECT status, COUNT(*) AS n FROM results GROUP BY status")
            .fetch_all(&self.pool)
            .await?;
        for row in &rows {
            let status: String = row.try_get("status")?;
            let status = JobStatus::from_str(&status)
                .map_err(|source| LedgerError::CorruptStatus { id: 0, source })?;
            counts.insert(status, row.try_get("n")?);
        }
        Ok(counts)
    }

    /// Appends every row of `table` to the output table `name`, each tagged
    /// with the provenance columns and a shared `posted` timestamp.
    ///
    /// The table and any missing columns are created on demand. Returns the
    /// number of records written.
    pub async fn post_table(
        &self,
        name: &str,
        table: &Table,
        provenance: &Provenance,
    ) -> Result<usize, LedgerError> {
        if is_reserved_table(name) {
            return Err(LedgerError::ReservedTable(name.to_string()));
        }
        if table.rows.is_empty() {
            return Ok(0);
        }

        let mut columns = dedupe_columns(&table.columns);
        let width = columns.len();
        let mut tags = provenance.columns();
        tags.push(("posted".to_string(), now()));
        let mut tag_slots = Vec::with_capacity(tags.len());
        for (column, value) in tags {
            let slot = match columns.iter().position(|c| c.eq_ignore_ascii_case(&column)) {
                Some(slot) => slot,
                None => {
                    columns.push(column);
                    columns.len() - 1
                }
            };
            tag_slots.push((slot, value));
        }

        let mut tx = self.pool.begin_with(BEGIN_WRITE).await?;
        let column_defs = columns
            .iter()
            .map(|c| format!("{} TEXT", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        sqlx::query(&format!(
            "CREATE TABLE IF NOT EXISTS {} ({column_defs})",
            quote_ident(name)
        ))
        .execute(&mut *tx)
        .await?;
        let mut existing = table_columns(&mut tx, name).await?;
        for column in &columns {
            if !existing.contains_key(&column.to_ascii_lowercase()) {
                add_column(&mut tx, name, column).await?;
                existing.insert(column.to_ascii_lowercase(), column.clone());
            }
        }

        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(name),
            columns.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", "),
            vec!["?"; columns.len()].join(", ")
        );
        for cells in &table.rows {
            let mut record: Vec<&str> = cells.iter().map(String::as_str).collect();
            record.resize(width, "");
            record.resize(columns.len(), "");
            for (slot, value) in &tag_slots {
                record[*slot] = value.as_str();
            }
            let mut query = sqlx::query(&sql);
            for value in record {
                query = query.bind(value);
            }
            query.execute(&mut *tx).await?;
        }
        tx.commit().await?;

        engine_debug!("Posted {} record(s) to {}", table.rows.len(), name);
        Ok(table.rows.len())
    }
}

/// Stable identity of an input row: SHA-256 over its canonical JSON.
pub fn row_hash(row: &InputRow) -> Result<String, LedgerError> {
    let canonical = serde_json::to_vec(row)?;
    Ok(format!("{:x}", Sha256::digest(&canonical)))
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn is_reserved_table(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower == INPUTS || lower == RESULTS || lower.starts_with("sqlite_")
}

/// Blank header cells become their position; repeats become `x.1`, `x.2`.
/// Names differing only in case count as repeats.
fn dedupe_columns(columns: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::with_capacity(columns.len());
    for (index, column) in columns.iter().enumerate() {
        let base = if column.trim().is_empty() {
            index.to_string()
        } else {
            column.clone()
        };
        let mut candidate = base.clone();
        let mut suffix = 0;
        while !seen.insert(candidate.to_ascii_lowercase()) {
            suffix += 1;
            candidate = format!("{base}.{suffix}");
        }
        out.push(candidate);
    }
    out
}

/// Columns of `table`, keyed by their ASCII-lowercased name.
async fn table_columns(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
) -> Result<BTreeMap<String, String>, LedgerError> {
    let rows = sqlx::query("SELECT name FROM pragma_table_info(?)")
        .bind(table)
        .fetch_all(&mut **tx)
        .await?;
    rows.iter()
        .map(|row| -> Result<(String, String), LedgerError> {
            let name: String = row.try_get("name")?;
            Ok((name.to_ascii_lowercase(), name))
        })
        .collect()
}

async fn stored_hashes(tx: &mut Transaction<'_, Sqlite>) -> Result<BTreeSet<String>, LedgerError> {
    let rows = sqlx::query("SELECT row_hash FROM inputs")
        .fetch_all(&mut **tx)
        .await?;
    rows.iter()
        .map(|row| row.try_get::<String, _>("row_hash").map_err(LedgerError::from))
        .collect()
}

async fn add_column(
    tx: &mut Transaction<'_, Sqlite>,
    table: &str,
    column: &str,
) -> Result<(), LedgerError> {
    sqlx::query(&format!(
        "ALTER TABLE {} ADD COLUMN {} TEXT",
        quote_ident(table),
        quote_ident(column)
    ))
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn read_inputs(
    tx: &mut Transaction<'_, Sqlite>,
) -> Result<BTreeMap<i64, InputRow>, LedgerError> {
    let rows = sqlx::query("SELECT * FROM inputs ORDER BY id")
        .fetch_all(&mut **tx)
        .await?;
    rows.iter().map(read_input).collect()
}

fn read_input(row: &SqliteRow) -> Result<(i64, InputRow), LedgerError> {
    let mut fields = BTreeMap::new();
    for column in row.columns() {
        if FIXED_INPUT_COLUMNS.contains(&column.name()) {
            continue;
        }
        // Rows stored before a field column existed have NULL there.
        if let Some(value) = row.try_get::<Option<String>, _>(column.ordinal())? {
            fields.insert(column.name().to_string(), value);
        }
    }
    Ok((
        row.try_get("id")?,
        InputRow {
            fields,
            url: row.try_get("url")?,
            subkey: row.try_get("subkey")?,
            subval: row.try_get("subval")?,
        },
    ))
}

fn read_status(row: &SqliteRow) -> Result<(i64, JobStatus), LedgerError> {
    let id: i64 = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let status =
        JobStatus::from_str(&status).map_err(|source| LedgerError::CorruptStatus { id, source })?;
    Ok((id, status))
}

#[cfg(test)]
mod tests {
    use super::dedupe_columns;

    #[test]
    fn repeated_and_blank_headers_get_distinct_names() {
        let columns = ["team", "odds", "odds", "", "odds.1"].map(String::from);
        assert_eq!(
            dedupe_columns(&columns),
            ["team", "odds", "odds.1", "3", "odds.1.1"]
        );
    }

    #[test]
    fn headers_differing_only_in_case_are_repeats() {
        let columns = ["Year", "year", "YEAR.1"].map(String::from);
        assert_eq!(dedupe_columns(&columns), ["Year", "year.1", "YEAR.1.1"]);
    }
}
