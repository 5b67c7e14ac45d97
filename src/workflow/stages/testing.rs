//! 阶段测试用的假实现和样例上下文

use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::clients::TextGenerator;
use crate::error::LlmError;
use crate::models::{
    AnalysisResult, ExtractionResult, GradeBand, MarkingResult, MatchReport, MatchResult,
    Section, StageKind, StagePayload, StageResult, SubmissionRequest,
};
use crate::workflow::context::WorkflowContext;

/// 返回固定回复（或固定失败）的生成器
pub struct FakeGenerator {
    reply: Option<String>,
    calls: AtomicUsize,
}

impl FakeGenerator {
    pub fn replying(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(reply.to_string()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TextGenerator for FakeGenerator {
    async fn generate(&self, _system_prompt: &str, _user_prompt: &str) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.reply.clone().ok_or(LlmError::Timeout {
            model: "fake".to_string(),
            timeout_secs: 1,
        })
    }
}

pub fn sample_extraction() -> ExtractionResult {
    let mut sections: BTreeMap<Section, Option<String>> =
        Section::ALL.into_iter().map(|s| (s, None)).collect();
    sections.insert(Section::Introduction, Some("Rainfall study.".to_string()));
    sections.insert(Section::Data, Some("Rainfall rose by 10%.".to_string()));
    sections.insert(Section::Summary, Some("Rain is increasing.".to_string()));

    ExtractionResult {
        raw_text: "Introduction\nRainfall study.\nData\nRainfall rose by 10%.\nSummary\nRain is increasing."
            .to_string(),
        sections,
        content_tags: ["data", "introduction", "summary"]
            .iter()
            .map(|s| s.to_string())
            .collect(),
    }
}

pub fn sample_analysis() -> AnalysisResult {
    AnalysisResult {
        total_score: 80,
        grade: "B".to_string(),
        grade_band: Some("Merit".to_string()),
        contents: vec!["tables".to_string()],
        recommendations: vec!["Add more tables".to_string()],
        strengths: vec!["Clear data".to_string()],
        weaknesses: vec!["Few references".to_string()],
        confidence: 0.9,
    }
}

pub fn sample_match_report() -> MatchReport {
    MatchReport {
        grade_band: GradeBand::Merit,
        matches: vec![MatchResult {
            title: "Data presentation".to_string(),
            match_score: 50,
            location: "Unit 2".to_string(),
            grade_band: GradeBand::Merit,
            requirements: BTreeSet::from(["data".to_string(), "charts".to_string()]),
        }],
        total_candidates: 1,
        catalog_unavailable: false,
    }
}

pub fn sample_marking() -> MarkingResult {
    MarkingResult {
        strengths: vec!["Clear data".to_string()],
        weaknesses: vec!["No tables".to_string()],
        grading_details: BTreeMap::from([("data".to_string(), "8/10".to_string())]),
        red_flags: Vec::new(),
        student_score: 60,
        grade_band: GradeBand::Merit,
    }
}

/// 已写入指定阶段样例结果的上下文
pub fn context_after(stages: &[StageKind]) -> WorkflowContext {
    let mut ctx = WorkflowContext::new(SubmissionRequest::from_text("S-TEST", "Rainfall study."));
    for stage in stages {
        let payload = match stage {
            StageKind::Extract => StagePayload::Extraction(sample_extraction()),
            StageKind::Analyze => StagePayload::Analysis(sample_analysis()),
            StageKind::Match => StagePayload::Match(sample_match_report()),
            StageKind::Mark => StagePayload::Marking(sample_marking()),
            StageKind::Recommend => continue,
        };
        ctx.record(StageResult::ok(payload)).unwrap();
    }
    ctx
}
