//! 各阶段的结构化输出
//!
//! 每个阶段产出一个 `StageResult`：状态标签 + 该阶段专属的负载。
//! 致命错误不在这里表示，而是由阶段返回 `Err(StageError)`。

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::models::grade::GradeBand;
use crate::models::requirement::MatchReport;

/// 流程阶段（声明顺序即执行顺序）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    Extract,
    Analyze,
    Match,
    Mark,
    Recommend,
}

impl StageKind {
    pub const PIPELINE: [StageKind; 5] = [
        StageKind::Extract,
        StageKind::Analyze,
        StageKind::Match,
        StageKind::Mark,
        StageKind::Recommend,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StageKind::Extract => "extract",
            StageKind::Analyze => "analyze",
            StageKind::Match => "match",
            StageKind::Mark => "mark",
            StageKind::Recommend => "recommend",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 阶段结果状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Ok,
    /// 使用了兜底负载
    Degraded,
}

/// 报告中识别的章节
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    Introduction,
    Content,
    References,
    Citations,
    Data,
    Tables,
    Images,
    Recommendations,
    Summary,
}

impl Section {
    pub const ALL: [Section; 9] = [
        Section::Introduction,
        Section::Content,
        Section::References,
        Section::Citations,
        Section::Data,
        Section::Tables,
        Section::Images,
        Section::Recommendations,
        Section::Summary,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Section::Introduction => "introduction",
            Section::Content => "content",
            Section::References => "references",
            Section::Citations => "citations",
            Section::Data => "data",
            Section::Tables => "tables",
            Section::Images => "images",
            Section::Recommendations => "recommendations",
            Section::Summary => "summary",
        }
    }
}

/// 提取阶段结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub raw_text: String,
    /// 每个章节的摘录，未找到的章节为 None
    pub sections: BTreeMap<Section, Option<String>>,
    pub content_tags: BTreeSet<String>,
}

impl ExtractionResult {
    pub fn sections_found(&self) -> usize {
        self.sections.values().filter(|s| s.is_some()).count()
    }
}

/// 分析阶段结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub total_score: u8,
    /// 字母等级 A/B/C/D/F
    pub grade: String,
    /// 生成服务给出的等级带原文（匹配阶段负责修正）
    pub grade_band: Option<String>,
    pub contents: Vec<String>,
    pub recommendations: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    pub confidence: f32,
}

/// 批改阶段结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkingResult {
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
    /// 章节 -> "n/10"
    pub grading_details: BTreeMap<String, String>,
    pub red_flags: Vec<String>,
    pub student_score: u8,
    pub grade_band: GradeBand,
}

/// 推荐学习资源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub topic: String,
    pub resource: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    High,
    Low,
}

/// 建议阶段结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationResult {
    pub next_steps: String,
    pub resources: Vec<Resource>,
    pub encouragement: String,
    pub confidence_level: ConfidenceLevel,
}

/// 阶段负载（按阶段区分的标签联合）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum StagePayload {
    Extraction(ExtractionResult),
    Analysis(AnalysisResult),
    Match(MatchReport),
    Marking(MarkingResult),
    Recommendation(RecommendationResult),
}

impl StagePayload {
    /// 负载所属的阶段
    pub fn kind(&self) -> StageKind {
        match self {
            StagePayload::Extraction(_) => StageKind::Extract,
            StagePayload::Analysis(_) => StageKind::Analyze,
            StagePayload::Match(_) => StageKind::Match,
            StagePayload::Marking(_) => StageKind::Mark,
            StagePayload::Recommendation(_) => StageKind::Recommend,
        }
    }
}

/// 单个阶段的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub status: StageStatus,
    pub payload: StagePayload,
    pub completed_at: DateTime<Local>,
}

impl StageResult {
    pub fn ok(payload: StagePayload) -> Self {
        Self {
            status: StageStatus::Ok,
            payload,
            completed_at: Local::now(),
        }
    }

    pub fn degraded(payload: StagePayload) -> Self {
        Self {
            status: StageStatus::Degraded,
            payload,
            completed_at: Local::now(),
        }
    }

    pub fn kind(&self) -> StageKind {
        self.payload.kind()
    }

    pub fn is_degraded(&self) -> bool {
        self.status == StageStatus::Degraded
    }
}
