//! 建议阶段：根据优缺点和覆盖的主题给出下一步建议与学习资源

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::clients::TextGenerator;
use crate::error::StageError;
use crate::models::{
    ConfidenceLevel, RecommendationResult, Resource, StageKind, StagePayload, StageResult,
};
use crate::utils::{parse_json_as, truncate_text};
use crate::workflow::context::WorkflowContext;
use crate::workflow::stage::{require, Stage};

const SYSTEM_PROMPT: &str = "You write final recommendations for students: clear, actionable \
next steps, tailored study advice and specific learning resources. Answer with a single JSON \
object only.";

pub const FALLBACK_NEXT_STEPS: &str =
    "Review the core concepts of this assignment and practise with similar exercises.";
const FALLBACK_ENCOURAGEMENT: &str = "Keep up the effort.";

/// 无法解析回复时使用的固定负载
pub fn fallback_recommendation() -> RecommendationResult {
    RecommendationResult {
        next_steps: FALLBACK_NEXT_STEPS.to_string(),
        resources: Vec::new(),
        encouragement: FALLBACK_ENCOURAGEMENT.to_string(),
        confidence_level: ConfidenceLevel::Low,
    }
}

#[derive(Debug, Deserialize)]
struct RecommendationReply {
    next_steps: String,
    #[serde(default)]
    resources: Vec<Resource>,
    #[serde(default)]
    encouragement: String,
}

pub struct RecommendStage {
    generator: Arc<dyn TextGenerator>,
}

impl RecommendStage {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn build_prompt(strengths: &[String], weaknesses: &[String], topics: &[String]) -> String {
        format!(
            r#"Generate final recommendations for a student.

Strengths: {strengths}
Weaknesses: {weaknesses}
Topics covered: {topics}

Return a JSON object structured as:
{{
    "next_steps": "what to focus on next",
    "resources": [{{"topic": "topic", "resource": "specific resource"}}],
    "encouragement": "one or two encouraging sentences"
}}

Return ONLY the JSON object, no other text."#,
            strengths = strengths.join(", "),
            weaknesses = weaknesses.join(", "),
            topics = topics.join(", "),
        )
    }
}

fn merged(first: &[String], second: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for item in first.iter().chain(second) {
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}

#[async_trait]
impl Stage for RecommendStage {
    fn kind(&self) -> StageKind {
        StageKind::Recommend
    }

    async fn run(&self, ctx: &WorkflowContext) -> Result<StageResult, StageError> {
        let extraction = require(ctx.extraction(), StageKind::Recommend, StageKind::Extract)?;
        let analysis = require(ctx.analysis(), StageKind::Recommend, StageKind::Analyze)?;
        let marking = require(ctx.marking(), StageKind::Recommend, StageKind::Mark)?;

        let strengths = merged(&analysis.strengths, &marking.strengths);
        let weaknesses = merged(&analysis.weaknesses, &marking.weaknesses);
        let topics: Vec<String> = extraction.content_tags.iter().cloned().collect();

        let reply = self
            .generator
            .generate(
                SYSTEM_PROMPT,
                &Self::build_prompt(&strengths, &weaknesses, &topics),
            )
            .await?;

        match parse_json_as::<RecommendationReply>(&reply) {
            Some(parsed) if !parsed.next_steps.trim().is_empty() => {
                debug!(
                    "{} 建议生成完成，资源 {} 条",
                    ctx.submission,
                    parsed.resources.len()
                );
                Ok(StageResult::ok(StagePayload::Recommendation(
                    RecommendationResult {
                        next_steps: parsed.next_steps,
                        resources: parsed.resources,
                        encouragement: parsed.encouragement,
                        confidence_level: ConfidenceLevel::High,
                    },
                )))
            }
            _ => {
                warn!(
                    "{} ⚠️ 建议结果无法解析，使用兜底建议: {}",
                    ctx.submission,
                    truncate_text(&reply, 80)
                );
                Ok(StageResult::degraded(StagePayload::Recommendation(
                    fallback_recommendation(),
                )))
            }
        }
    }
}
