//! 评分数据存储 - 基础设施层
//!
//! 持有唯一的 SQLite 连接，只暴露读写能力：
//! - 评分要求目录（按等级读取）
//! - 原创度比对语料（基准 + 历史，追加写入）
//! - 提交记录（按身份原子 upsert）
//!
//! 所有访问都经过 `Mutex<Connection>` 串行化。

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, warn};

use crate::error::StoreError;
use crate::infrastructure::migrations;
use crate::models::{GradeBand, RequirementRecord, SubmissionRecord};

/// 评分要求的读取能力
pub trait RequirementSource: Send + Sync {
    /// 按等级读取全部评分要求，顺序即目录顺序
    fn find_requirements(&self, grade_band: GradeBand)
        -> Result<Vec<RequirementRecord>, StoreError>;
}

/// 比对语料快照（不含本次追加的候选文本）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorpusSnapshot {
    pub baseline: Vec<String>,
    pub historical: Vec<String>,
}

/// 比对语料的读写能力
pub trait CorpusStore: Send + Sync {
    /// 读取基准语料与历史语料，并把候选文本追加到历史语料中
    ///
    /// `window` 限制返回的历史语料数量（取最近的 N 条）
    fn append_and_fetch_corpus(
        &self,
        candidate_text: &str,
        window: Option<usize>,
    ) -> Result<CorpusSnapshot, StoreError>;
}

/// 提交记录的写入能力
pub trait SubmissionStore: Send + Sync {
    /// 身份已存在则原地更新，否则插入
    fn upsert_submission(&self, record: &SubmissionRecord) -> Result<(), StoreError>;

    /// 在同一事务内完成入库：读取比对语料 → `score` 计分 → 追加候选文本 → upsert
    ///
    /// 任一步失败则整体回滚，语料库与提交记录保持一致
    fn ingest_submission(
        &self,
        record: SubmissionRecord,
        window: Option<usize>,
        score: &(dyn Fn(&CorpusSnapshot) -> u8 + Sync),
    ) -> Result<SubmissionRecord, StoreError>;
}

/// SQLite 存储句柄
///
/// Clone 只复制内部 `Arc`
#[derive(Clone)]
pub struct GradeStore {
    conn: Arc<Mutex<Connection>>,
}

impl GradeStore {
    /// 打开（或创建）数据库并执行迁移
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| StoreError::Io {
                    path: parent.display().to_string(),
                    source: e,
                })?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        migrations::run_all(&conn)?;

        info!("✓ 数据库已打开: {}", path.display());

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 打开内存数据库（测试用）
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrations::run_all(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 加锁访问底层连接
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&Connection) -> Result<T, StoreError>,
    {
        let conn = self.conn.lock().map_err(|_| StoreError::LockPoisoned)?;
        f(&conn)
    }

    /// 写入评分要求种子（按 id upsert）
    pub fn seed_requirements(&self, records: &[RequirementRecord]) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            for record in records {
                let requirements = serde_json::to_string(&record.requirements)?;
                tx.execute(
                    "INSERT INTO requirements (id, title, location, grade_band, requirements)
                     VALUES (?1, ?2, ?3, ?4, ?5)
                     ON CONFLICT(id) DO UPDATE SET
                       title = ?2,
                       location = ?3,
                       grade_band = ?4,
                       requirements = ?5",
                    params![
                        record.id,
                        record.title,
                        record.location,
                        record.grade_band.as_str(),
                        requirements,
                    ],
                )?;
            }
            tx.commit()?;
            Ok(records.len())
        })
    }

    /// 写入基准语料种子（重复文本忽略），返回新增条数
    pub fn seed_baseline(&self, texts: &[String]) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let mut inserted = 0;
            for text in texts {
                inserted += tx.execute(
                    "INSERT OR IGNORE INTO baseline_corpus (text) VALUES (?1)",
                    params![text],
                )?;
            }
            tx.commit()?;
            Ok(inserted)
        })
    }

    /// 按身份读取提交记录
    pub fn find_submission(&self, identity: &str) -> Result<Option<SubmissionRecord>, StoreError> {
        self.with_conn(|conn| {
            let record = conn
                .query_row(
                    "SELECT identity, student_name, text, score, report, created_at, updated_at
                     FROM submissions WHERE identity = ?1",
                    params![identity],
                    submission_from_row,
                )
                .optional()?;
            Ok(record)
        })
    }

    /// 提交记录总数
    pub fn count_submissions(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let count: i64 = conn.query_row("SELECT COUNT(*) FROM submissions", [], |r| r.get(0))?;
            Ok(count as usize)
        })
    }

    /// 历史语料条数（不含基准语料）
    pub fn count_corpus_entries(&self) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let count: i64 =
                conn.query_row("SELECT COUNT(*) FROM corpus_entries", [], |r| r.get(0))?;
            Ok(count as usize)
        })
    }
}

impl RequirementSource for GradeStore {
    fn find_requirements(
        &self,
        grade_band: GradeBand,
    ) -> Result<Vec<RequirementRecord>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, location, grade_band, requirements
                 FROM requirements WHERE grade_band = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![grade_band.as_str()], |row| {
                Ok((
                    row.get::<_, i64>("id")?,
                    row.get::<_, String>("title")?,
                    row.get::<_, String>("location")?,
                    row.get::<_, String>("grade_band")?,
                    row.get::<_, String>("requirements")?,
                ))
            })?;

            let mut records = Vec::new();
            for row in rows {
                let (id, title, location, band, requirements) = row?;
                let Some(grade_band) = GradeBand::parse(&band) else {
                    warn!("评分要求 {} 的等级无效: {}，已跳过", id, band);
                    continue;
                };
                let requirements: BTreeSet<String> = serde_json::from_str(&requirements)?;
                records.push(RequirementRecord {
                    id,
                    title,
                    location,
                    grade_band,
                    requirements,
                });
            }

            debug!("读取等级 {} 的评分要求 {} 条", grade_band, records.len());
            Ok(records)
        })
    }
}

impl CorpusStore for GradeStore {
    fn append_and_fetch_corpus(
        &self,
        candidate_text: &str,
        window: Option<usize>,
    ) -> Result<CorpusSnapshot, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let snapshot = fetch_corpus(&tx, window)?;
            append_corpus(&tx, candidate_text)?;
            tx.commit()?;
            Ok(snapshot)
        })
    }
}

impl SubmissionStore for GradeStore {
    fn upsert_submission(&self, record: &SubmissionRecord) -> Result<(), StoreError> {
        self.with_conn(|conn| upsert(conn, record))
    }

    fn ingest_submission(
        &self,
        mut record: SubmissionRecord,
        window: Option<usize>,
        score: &(dyn Fn(&CorpusSnapshot) -> u8 + Sync),
    ) -> Result<SubmissionRecord, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            let snapshot = fetch_corpus(&tx, window)?;
            record.score = score(&snapshot);
            append_corpus(&tx, &record.text)?;
            upsert(&tx, &record)?;
            tx.commit()?;
            Ok(record)
        })
    }
}

fn fetch_corpus(conn: &Connection, window: Option<usize>) -> Result<CorpusSnapshot, StoreError> {
    let baseline = {
        let mut stmt = conn.prepare("SELECT text FROM baseline_corpus ORDER BY id")?;
        let texts = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        texts
    };

    // LIMIT -1 表示不限
    let limit = window.map(|w| w as i64).unwrap_or(-1);
    let mut historical = {
        let mut stmt = conn.prepare("SELECT text FROM corpus_entries ORDER BY id DESC LIMIT ?1")?;
        let texts = stmt
            .query_map(params![limit], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        texts
    };
    historical.reverse();

    Ok(CorpusSnapshot {
        baseline,
        historical,
    })
}

fn append_corpus(conn: &Connection, text: &str) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO corpus_entries (text, added_at) VALUES (?1, ?2)",
        params![text, chrono::Local::now().to_rfc3339()],
    )?;
    Ok(())
}

fn upsert(conn: &Connection, record: &SubmissionRecord) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO submissions (identity, student_name, text, score, report, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(identity) DO UPDATE SET
           student_name = ?2,
           text = ?3,
           score = ?4,
           report = ?5,
           updated_at = ?7",
        params![
            record.identity,
            record.student_name,
            record.text,
            record.score,
            record.report,
            record.created_at,
            record.updated_at,
        ],
    )?;
    Ok(())
}

fn submission_from_row(row: &Row<'_>) -> Result<SubmissionRecord, rusqlite::Error> {
    Ok(SubmissionRecord {
        identity: row.get("identity")?,
        student_name: row.get("student_name")?,
        text: row.get("text")?,
        score: row.get("score")?,
        report: row.get("report")?,
        created_at: row.get("created_at")?,
        updated_at: row.get("updated_at")?,
    })
}
