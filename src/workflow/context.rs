//! 流程上下文
//!
//! 一次提交在整个流程中累积的状态。只追加：每个阶段的结果写入一次后不可覆盖，
//! 流程进入终态（completed / failed）后拒绝任何写入。

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::error::ContextError;
use crate::models::{
    AnalysisResult, ExtractionResult, MarkingResult, MatchReport, RecommendationResult,
    StageKind, StagePayload, StageResult, SubmissionRequest,
};

/// 当前上下文结构版本
pub const SCHEMA_VERSION: u32 = 1;

/// 流程状态（线性状态机）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Initiated,
    Extracting,
    Analyzing,
    Matching,
    Marking,
    Recommending,
    Completed,
    Failed,
}

impl WorkflowStatus {
    /// 执行某个阶段时的状态
    pub fn running(stage: StageKind) -> Self {
        match stage {
            StageKind::Extract => WorkflowStatus::Extracting,
            StageKind::Analyze => WorkflowStatus::Analyzing,
            StageKind::Match => WorkflowStatus::Matching,
            StageKind::Mark => WorkflowStatus::Marking,
            StageKind::Recommend => WorkflowStatus::Recommending,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Initiated => "initiated",
            WorkflowStatus::Extracting => "extracting",
            WorkflowStatus::Analyzing => "analyzing",
            WorkflowStatus::Matching => "matching",
            WorkflowStatus::Marking => "marking",
            WorkflowStatus::Recommending => "recommending",
            WorkflowStatus::Completed => "completed",
            WorkflowStatus::Failed => "failed",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 中止流程的错误记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkflowError {
    pub stage: StageKind,
    pub message: String,
}

/// 流程上下文
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowContext {
    pub schema_version: u32,
    pub submission: SubmissionRequest,
    status: WorkflowStatus,
    current_stage: Option<StageKind>,
    results: BTreeMap<StageKind, StageResult>,
    error: Option<WorkflowError>,
    pub started_at: DateTime<Local>,
    finished_at: Option<DateTime<Local>>,
}

impl WorkflowContext {
    pub fn new(submission: SubmissionRequest) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            submission,
            status: WorkflowStatus::Initiated,
            current_stage: None,
            results: BTreeMap::new(),
            error: None,
            started_at: Local::now(),
            finished_at: None,
        }
    }

    pub fn status(&self) -> WorkflowStatus {
        self.status
    }

    pub fn current_stage(&self) -> Option<StageKind> {
        self.current_stage
    }

    pub fn error(&self) -> Option<&WorkflowError> {
        self.error.as_ref()
    }

    pub fn finished_at(&self) -> Option<DateTime<Local>> {
        self.finished_at
    }

    pub fn results(&self) -> &BTreeMap<StageKind, StageResult> {
        &self.results
    }

    pub fn result(&self, stage: StageKind) -> Option<&StageResult> {
        self.results.get(&stage)
    }

    /// 是否有阶段使用了兜底负载
    pub fn has_degraded(&self) -> bool {
        self.results.values().any(StageResult::is_degraded)
    }

    fn ensure_open(&self, stage: StageKind) -> Result<(), ContextError> {
        if self.status.is_terminal() {
            return Err(ContextError::Finalized {
                status: self.status.to_string(),
                stage: stage.to_string(),
            });
        }
        Ok(())
    }

    /// 进入某个阶段
    pub fn begin_stage(&mut self, stage: StageKind) -> Result<(), ContextError> {
        self.ensure_open(stage)?;
        self.status = WorkflowStatus::running(stage);
        self.current_stage = Some(stage);
        Ok(())
    }

    /// 写入阶段结果（只能写一次）
    pub fn record(&mut self, result: StageResult) -> Result<(), ContextError> {
        let stage = result.kind();
        self.ensure_open(stage)?;
        if self.results.contains_key(&stage) {
            return Err(ContextError::AlreadyRecorded {
                stage: stage.to_string(),
            });
        }
        self.results.insert(stage, result);
        Ok(())
    }

    /// 标记完成
    pub fn complete(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = WorkflowStatus::Completed;
        self.finished_at = Some(Local::now());
    }

    /// 标记失败并附上错误
    pub fn fail(&mut self, stage: StageKind, message: impl Into<String>) {
        if self.status.is_terminal() {
            return;
        }
        self.status = WorkflowStatus::Failed;
        self.error = Some(WorkflowError {
            stage,
            message: message.into(),
        });
        self.finished_at = Some(Local::now());
    }

    pub fn extraction(&self) -> Option<&ExtractionResult> {
        match self.result(StageKind::Extract).map(|r| &r.payload) {
            Some(StagePayload::Extraction(p)) => Some(p),
            _ => None,
        }
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match self.result(StageKind::Analyze).map(|r| &r.payload) {
            Some(StagePayload::Analysis(p)) => Some(p),
            _ => None,
        }
    }

    pub fn match_report(&self) -> Option<&MatchReport> {
        match self.result(StageKind::Match).map(|r| &r.payload) {
            Some(StagePayload::Match(p)) => Some(p),
            _ => None,
        }
    }

    pub fn marking(&self) -> Option<&MarkingResult> {
        match self.result(StageKind::Mark).map(|r| &r.payload) {
            Some(StagePayload::Marking(p)) => Some(p),
            _ => None,
        }
    }

    pub fn recommendation(&self) -> Option<&RecommendationResult> {
        match self.result(StageKind::Recommend).map(|r| &r.payload) {
            Some(StagePayload::Recommendation(p)) => Some(p),
            _ => None,
        }
    }

    /// 序列化为格式化 JSON（报告文件与入库记录使用）
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
