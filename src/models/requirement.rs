use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::models::grade::GradeBand;

/// 评分要求记录（来自要求目录）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequirementRecord {
    pub id: i64,
    pub title: String,
    pub location: String,
    pub grade_band: GradeBand,
    pub requirements: BTreeSet<String>,
}

/// 单条匹配结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    pub title: String,
    /// 匹配百分比 (0-100)
    pub match_score: u8,
    pub location: String,
    pub grade_band: GradeBand,
    pub requirements: BTreeSet<String>,
}

/// 一次匹配调用的完整输出
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchReport {
    /// 修正后的等级
    pub grade_band: GradeBand,
    /// 按分数降序排列，最多 3 条
    pub matches: Vec<MatchResult>,
    /// 截断前满足阈值的候选数量
    pub total_candidates: usize,
    /// 要求目录不可用时为 true
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub catalog_unavailable: bool,
}

impl MatchReport {
    /// 最高匹配分数，没有匹配时为 0
    pub fn best_score(&self) -> u8 {
        self.matches.first().map(|m| m.match_score).unwrap_or(0)
    }
}
