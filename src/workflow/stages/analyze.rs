//! 分析阶段：请生成服务给出总分、字母等级、优缺点

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::clients::TextGenerator;
use crate::error::StageError;
use crate::models::{AnalysisResult, StageKind, StagePayload, StageResult};
use crate::utils::{parse_json_as, truncate_text};
use crate::workflow::context::WorkflowContext;
use crate::workflow::stage::{require, Stage};

const SYSTEM_PROMPT: &str = "You are an experienced examiner. Analyze structured student \
submissions and answer with a single JSON object only.";

const FALLBACK_CONFIDENCE: f32 = 0.5;
const PARSED_CONFIDENCE: f32 = 0.9;

/// 生成服务回复的宽松结构
#[derive(Debug, Deserialize)]
struct AnalysisReply {
    #[serde(default)]
    total_score: f64,
    #[serde(default)]
    grade: Option<String>,
    #[serde(default)]
    grade_band: Option<String>,
    #[serde(default)]
    contents: Vec<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
}

/// 无法解析回复时使用的固定负载
pub fn fallback_analysis() -> AnalysisResult {
    AnalysisResult {
        total_score: 0,
        grade: "F".to_string(),
        grade_band: None,
        contents: Vec::new(),
        recommendations: vec![
            "Improve understanding of core concepts".to_string(),
            "Practice problem-solving".to_string(),
        ],
        strengths: vec!["Consistency in effort".to_string()],
        weaknesses: Vec::new(),
        confidence: FALLBACK_CONFIDENCE,
    }
}

fn letter_grade(score: u8) -> &'static str {
    match score {
        90.. => "A",
        80..=89 => "B",
        70..=79 => "C",
        60..=69 => "D",
        _ => "F",
    }
}

impl From<AnalysisReply> for AnalysisResult {
    fn from(reply: AnalysisReply) -> Self {
        let total_score = reply.total_score.round().clamp(0.0, 100.0) as u8;
        let grade = reply
            .grade
            .map(|g| g.trim().to_ascii_uppercase())
            .filter(|g| matches!(g.as_str(), "A" | "B" | "C" | "D" | "F"))
            .unwrap_or_else(|| letter_grade(total_score).to_string());

        AnalysisResult {
            total_score,
            grade,
            grade_band: reply.grade_band,
            contents: reply.contents,
            recommendations: reply.recommendations,
            strengths: reply.strengths,
            weaknesses: reply.weaknesses,
            confidence: PARSED_CONFIDENCE,
        }
    }
}

pub struct AnalyzeStage {
    generator: Arc<dyn TextGenerator>,
}

impl AnalyzeStage {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn build_prompt(sections_json: &str) -> String {
        format!(
            r#"Analyze these student results and return a JSON object with the following structure:
{{
    "total_score": number (0-100),
    "grade": "A/B/C/D/F",
    "grade_band": "Fail/Pass/Merit/Distinction",
    "contents": ["topic covered", "..."],
    "recommendations": ["improvement1", "improvement2"],
    "strengths": ["strength1", "strength2"],
    "weaknesses": ["weakness1", "weakness2"]
}}

Student results:
{sections_json}

Return ONLY the JSON object, no other text."#
        )
    }
}

#[async_trait]
impl Stage for AnalyzeStage {
    fn kind(&self) -> StageKind {
        StageKind::Analyze
    }

    async fn run(&self, ctx: &WorkflowContext) -> Result<StageResult, StageError> {
        let extraction = require(ctx.extraction(), StageKind::Analyze, StageKind::Extract)?;
        let sections_json = serde_json::to_string_pretty(&extraction.sections)
            .map_err(|e| StageError::internal(StageKind::Analyze.as_str(), e.to_string()))?;

        let reply = self
            .generator
            .generate(SYSTEM_PROMPT, &Self::build_prompt(&sections_json))
            .await?;

        match parse_json_as::<AnalysisReply>(&reply) {
            Some(parsed) => {
                let analysis = AnalysisResult::from(parsed);
                debug!(
                    "{} 分析完成: {} 分 / {}",
                    ctx.submission, analysis.total_score, analysis.grade
                );
                Ok(StageResult::ok(StagePayload::Analysis(analysis)))
            }
            None => {
                warn!(
                    "{} ⚠️ 分析结果无法解析，使用兜底结果: {}",
                    ctx.submission,
                    truncate_text(&reply, 80)
                );
                Ok(StageResult::degraded(StagePayload::Analysis(
                    fallback_analysis(),
                )))
            }
        }
    }
}
