use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};
use tracing::{debug, info, warn};

use super::migrations::run_migrations;
use crate::model::{ElapsedTime, JudgLevel, JudgType, Judgment, JudgmentRecord};
use crate::traits::{JudgmentQuery, JudgmentStore, TitleMatch};

const SELECT_COLUMNS: &str = "SELECT id, user_id, sub_num, comp_num, task_num, resp_title, \
     judg_type, judg_level, judg_time, ration_time, rationale, created_at FROM judgments";

/// SQLite-backed judgment store.
///
/// The connection is shared behind a mutex and every statement runs on the
/// blocking pool, so inserts from concurrent sessions serialize on the lock.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Arc<PathBuf>,
}

impl SqliteStore {
    /// Open (or create) the database at `path` and apply migrations.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create database directory {}", parent.display())
            })?;
        }

        let conn = Connection::open(path)
            .with_context(|| format!("failed to open SQLite database {}", path.display()))?;
        if let Err(err) = conn.pragma_update(None, "journal_mode", "WAL") {
            warn!("failed to enable WAL mode: {err}");
        }

        let store = Self::from_connection(conn, path.to_path_buf())?;
        info!("judgment store opened at {}", path.display());
        Ok(store)
    }

    /// A private in-memory database, mostly for tests.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("failed to open in-memory database")?;
        Self::from_connection(conn, PathBuf::from(":memory:"))
    }

    fn from_connection(mut conn: Connection, path: PathBuf) -> Result<Self> {
        run_migrations(&mut conn).context("failed to run database migrations")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path: Arc::new(path),
        })
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    async fn execute<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let mut guard = conn
                .lock()
                .map_err(|_| anyhow!("database connection mutex poisoned"))?;
            task(&mut *guard)
        })
        .await
        .map_err(|e| anyhow!("database task panicked: {e}"))?
    }
}

fn to_i64(value: u64) -> Result<i64> {
    i64::try_from(value).map_err(|_| anyhow!("value {value} exceeds SQLite INTEGER range"))
}

fn to_u64(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| anyhow!("value {value} is negative"))
}

fn to_u32(value: i64, column: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| anyhow!("{column} value {value} out of range"))
}

fn row_to_record(row: &Row<'_>) -> Result<JudgmentRecord> {
    let judg_type: String = row.get("judg_type")?;
    let judg_level: i64 = row.get("judg_level")?;
    let judg_time: String = row.get("judg_time")?;
    let ration_time: String = row.get("ration_time")?;
    let created_at: String = row.get("created_at")?;

    let level = u8::try_from(judg_level)
        .map_err(|_| anyhow!("judg_level value {judg_level} out of range"))?;

    Ok(JudgmentRecord {
        id: row.get("id")?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|err| anyhow!("invalid created_at '{created_at}': {err}"))?,
        judgment: Judgment {
            user_id: to_u64(row.get("user_id")?)?,
            sub_num: to_u32(row.get("sub_num")?, "sub_num")?,
            comp_num: to_u32(row.get("comp_num")?, "comp_num")?,
            task_num: to_u32(row.get("task_num")?, "task_num")?,
            resp_title: row.get("resp_title")?,
            judg_type: judg_type.parse::<JudgType>().map_err(|e| anyhow!(e))?,
            judg_level: JudgLevel::try_from(level).map_err(|e| anyhow!(e))?,
            judg_time: judg_time.parse::<ElapsedTime>().map_err(|e| anyhow!(e))?,
            ration_time: ration_time.parse::<ElapsedTime>().map_err(|e| anyhow!(e))?,
            rationale: row.get("rationale")?,
        },
    })
}

/// Translate a query into a WHERE clause and its positional parameters.
fn where_clause(query: &JudgmentQuery) -> Result<(String, Vec<Value>)> {
    let mut conditions = Vec::new();
    let mut values = Vec::new();

    if let Some(user_id) = query.user_id {
        conditions.push("user_id = ?".to_string());
        values.push(Value::Integer(to_i64(user_id)?));
    }
    match &query.resp_title {
        Some(TitleMatch::Exact(title)) => {
            conditions.push("resp_title = ?".to_string());
            values.push(Value::Text(title.clone()));
        }
        Some(TitleMatch::Prefix(prefix)) => {
            // substr instead of LIKE keeps % and _ in the prefix literal
            conditions.push("substr(resp_title, 1, ?) = ?".to_string());
            values.push(Value::Integer(prefix.chars().count() as i64));
            values.push(Value::Text(prefix.clone()));
        }
        Some(TitleMatch::Contains(needle)) => {
            conditions.push("instr(resp_title, ?) > 0".to_string());
            values.push(Value::Text(needle.clone()));
        }
        None => {}
    }
    if let Some(judg_type) = query.judg_type {
        // legacy rows may carry `rev` or mixed case
        let spellings = judg_type.spellings();
        let placeholders = vec!["?"; spellings.len()].join(", ");
        conditions.push(format!("lower(judg_type) IN ({placeholders})"));
        values.extend(spellings.iter().map(|s| Value::Text(s.to_string())));
    }

    let clause = if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    };
    Ok((clause, values))
}

#[async_trait]
impl JudgmentStore for SqliteStore {
    fn name(&self) -> &str {
        "sqlite"
    }

    async fn insert(&self, judgment: Judgment) -> Result<()> {
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO judgments (user_id, sub_num, comp_num, task_num, resp_title, \
                 judg_type, judg_level, judg_time, ration_time, rationale, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                params![
                    to_i64(judgment.user_id)?,
                    judgment.sub_num,
                    judgment.comp_num,
                    judgment.task_num,
                    judgment.resp_title,
                    judgment.judg_type.as_str(),
                    judgment.judg_level.number(),
                    judgment.judg_time.to_string(),
                    judgment.ration_time.to_string(),
                    judgment.rationale,
                    Utc::now().to_rfc3339(),
                ],
            )
            .context("failed to insert judgment")?;
            debug!(id = conn.last_insert_rowid(), "judgment inserted");
            Ok(())
        })
        .await
    }

    async fn query_all(&self, query: &JudgmentQuery) -> Result<Vec<JudgmentRecord>> {
        let (clause, values) = where_clause(query)?;
        self.execute(move |conn| {
            let sql = format!("{SELECT_COLUMNS}{clause} ORDER BY id ASC");
            let mut stmt = conn.prepare(&sql).context("failed to prepare judgment query")?;
            let mut rows = stmt.query(params_from_iter(values.iter()))?;
            let mut records = Vec::new();
            while let Some(row) = rows.next()? {
                records.push(row_to_record(row)?);
            }
            Ok(records)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn judgment(user_id: u64, title: &str, judg_type: JudgType) -> Judgment {
        Judgment {
            user_id,
            sub_num: 2,
            comp_num: 1,
            task_num: 1,
            resp_title: title.into(),
            judg_type,
            judg_level: JudgLevel::Master,
            judg_time: ElapsedTime::Seconds(14),
            ration_time: ElapsedTime::normalize(75),
            rationale: "uses evidence from the scenario".into(),
        }
    }

    #[tokio::test]
    async fn insert_then_query_last_equals_inserted() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert(judgment(4, "c1-t1-sub1", JudgType::Code))
            .await
            .unwrap();
        let inserted = judgment(4, "c1-t1-sub1", JudgType::Review);
        store.insert(inserted.clone()).await.unwrap();

        let found = store
            .query_all(&JudgmentQuery::all().user(4).title("c1-t1-sub1"))
            .await
            .unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found.last().unwrap().judgment, inserted);
        assert_eq!(
            found.last().unwrap().judgment.ration_time,
            ElapsedTime::Clock("01:15:00".into())
        );
    }

    #[tokio::test]
    async fn prefix_and_type_filters() {
        let store = SqliteStore::open_in_memory().unwrap();
        for (title, kind) in [
            ("c1-t1-sub1", JudgType::Code),
            ("c1-t1-sub2", JudgType::Review),
            ("c1-t10-sub1", JudgType::Code),
            ("c2-t1-sub1", JudgType::Code),
        ] {
            store.insert(judgment(1, title, kind)).await.unwrap();
        }

        let prefixed = store
            .query_all(&JudgmentQuery::all().title_prefix("c1-t1-"))
            .await
            .unwrap();
        let titles: Vec<_> = prefixed.iter().map(|r| r.judgment.resp_title.as_str()).collect();
        assert_eq!(titles, vec!["c1-t1-sub1", "c1-t1-sub2"]);

        let reviews = store
            .query_all(
                &JudgmentQuery::all()
                    .title_prefix("c1-t1-")
                    .judg_type(JudgType::Review),
            )
            .await
            .unwrap();
        assert_eq!(reviews.len(), 1);

        let contains = store
            .query_all(&JudgmentQuery::all().title_contains("t10"))
            .await
            .unwrap();
        assert_eq!(contains.len(), 1);
    }

    #[tokio::test]
    async fn review_filter_matches_legacy_spelling() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert(judgment(1, "c1-t1-sub1", JudgType::Review))
            .await
            .unwrap();
        store
            .execute(|conn| {
                conn.execute(
                    "INSERT INTO judgments (user_id, sub_num, comp_num, task_num, resp_title, \
                     judg_type, judg_level, judg_time, ration_time, rationale, created_at)
                     VALUES (1, 3, 1, 1, 'c1-t1-sub2', 'rev', 2, '5', '5', 'legacy', ?1)",
                    params![Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .unwrap();

        let reviews = store
            .query_all(&JudgmentQuery::all().judg_type(JudgType::Review))
            .await
            .unwrap();
        assert_eq!(reviews.len(), 2);
        assert_eq!(reviews[1].judgment.judg_type, JudgType::Review);

        let codes = store
            .query_all(&JudgmentQuery::all().judg_type(JudgType::Code))
            .await
            .unwrap();
        assert!(codes.is_empty());
    }

    #[tokio::test]
    async fn concurrent_inserts_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("judgments.db")).unwrap();

        let mut handles = Vec::new();
        for user in 0..8u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for n in 0..10 {
                    let title = format!("c1-t{user}-sub{n}");
                    store
                        .insert(judgment(user, &title, JudgType::Code))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let all = store.query_all(&JudgmentQuery::all()).await.unwrap();
        assert_eq!(all.len(), 80);
        let ids: Vec<_> = all.iter().map(|r| r.id).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        let user3 = store.query_all(&JudgmentQuery::all().user(3)).await.unwrap();
        assert_eq!(user3.len(), 10);
    }

    #[tokio::test]
    async fn prefix_wildcards_are_literal() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .insert(judgment(1, "c1-t1-sub1", JudgType::Code))
            .await
            .unwrap();
        let found = store
            .query_all(&JudgmentQuery::all().title_prefix("c1-t%"))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn reopen_persists_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("judgments.db");
        {
            let store = SqliteStore::open(&path).unwrap();
            store
                .insert(judgment(9, "c3-t2-sub5", JudgType::Code))
                .await
                .unwrap();
        }
        let store = SqliteStore::open(&path).unwrap();
        let all = store.query_all(&JudgmentQuery::all()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].judgment.user_id, 9);
        assert_eq!(store.path(), path.as_path());
    }
}
