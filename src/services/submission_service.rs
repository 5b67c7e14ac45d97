//! 提交入库 - 业务能力层
//!
//! 流程结束后由调用方执行：在一个存储事务内计算原创度、追加语料并按身份 upsert 提交记录。
//! 入库失败时语料库不会留下孤立文本。

use std::sync::Arc;

use chrono::Local;
use tracing::info;

use crate::error::StoreError;
use crate::infrastructure::SubmissionStore;
use crate::models::{SubmissionRecord, SubmissionRequest};
use crate::services::similarity::SimilarityScorer;

pub struct SubmissionService {
    scorer: SimilarityScorer,
    store: Arc<dyn SubmissionStore>,
}

impl SubmissionService {
    pub fn new(scorer: SimilarityScorer, store: Arc<dyn SubmissionStore>) -> Self {
        Self { scorer, store }
    }

    /// 入库一次提交，返回写入的记录
    ///
    /// 同一身份重复提交时覆盖旧记录（保留首次创建时间）
    pub fn ingest(
        &self,
        request: &SubmissionRequest,
        text: &str,
        report_json: String,
    ) -> Result<SubmissionRecord, StoreError> {
        let now = Local::now().to_rfc3339();
        let draft = SubmissionRecord {
            identity: request.identity.clone(),
            student_name: request.student_name.clone(),
            text: text.to_string(),
            score: 0,
            report: report_json,
            created_at: now.clone(),
            updated_at: now,
        };

        let record = self.store.ingest_submission(draft, self.scorer.window(), &|snapshot| {
            SimilarityScorer::score_snapshot(text, snapshot)
        })?;

        info!("{} 💾 已入库，原创度 {}", request, record.score);
        Ok(record)
    }
}
