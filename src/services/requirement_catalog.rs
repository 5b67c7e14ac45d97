//! 评分要求目录 - 业务能力层
//!
//! 只读查询：按等级取出要求，再按关键字包含关系筛选候选。

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::debug;

use crate::error::StoreError;
use crate::infrastructure::RequirementSource;
use crate::models::{GradeBand, RequirementRecord};

/// 评分要求目录
#[derive(Clone)]
pub struct RequirementCatalog {
    source: Arc<dyn RequirementSource>,
}

impl RequirementCatalog {
    pub fn new(source: Arc<dyn RequirementSource>) -> Self {
        Self { source }
    }

    /// 查询指定等级下、至少有一条要求包含某个标签的记录
    ///
    /// 包含判断与 SQLite 的 `LIKE '%tag%'` 一致：ASCII 大小写不敏感。
    /// 结果保持目录顺序。
    pub fn find_candidates(
        &self,
        grade_band: GradeBand,
        tags: &BTreeSet<String>,
    ) -> Result<Vec<RequirementRecord>, StoreError> {
        if tags.is_empty() {
            return Ok(Vec::new());
        }

        let lowered_tags: Vec<String> = tags.iter().map(|t| t.to_ascii_lowercase()).collect();
        let candidates: Vec<RequirementRecord> = self
            .source
            .find_requirements(grade_band)?
            .into_iter()
            .filter(|record| {
                record.requirements.iter().any(|requirement| {
                    let requirement = requirement.to_ascii_lowercase();
                    lowered_tags.iter().any(|tag| requirement.contains(tag.as_str()))
                })
            })
            .collect();

        debug!(
            "等级 {} 下找到 {} 条候选要求",
            grade_band,
            candidates.len()
        );
        Ok(candidates)
    }
}
