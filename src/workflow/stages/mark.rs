//! 批改阶段
//!
//! 优缺点、分项评分和警示由生成服务给出；学生得分由加权公式确定性计算，
//! 不依赖生成服务的回复。

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::clients::TextGenerator;
use crate::error::StageError;
use crate::models::{MarkingResult, Section, StageKind, StagePayload, StageResult};
use crate::services::score_util::{classify_band, weighted_composite, CompositeInputs};
use crate::utils::{parse_json_as, truncate_text};
use crate::workflow::context::WorkflowContext;
use crate::workflow::stage::{require, Stage};

const SYSTEM_PROMPT: &str = "You mark student solution papers against a marking guide. \
Answer with a single JSON object only.";

#[derive(Debug, Default, Deserialize)]
struct MarkingReply {
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
    #[serde(default)]
    grading_details: BTreeMap<String, String>,
    #[serde(default)]
    red_flags: Vec<String>,
}

pub struct MarkStage {
    generator: Arc<dyn TextGenerator>,
}

impl MarkStage {
    pub fn new(generator: Arc<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    fn build_prompt(context_json: &str) -> String {
        let sections: Vec<String> = Section::ALL
            .iter()
            .map(|s| format!("        \"{}\": \"score/10\"", s.as_str()))
            .collect();
        format!(
            r#"Mark the student paper based on the following context:
{context_json}

Provide a JSON report structured as:
{{
    "strengths": ["strength1", "strength2"],
    "weaknesses": ["weakness1", "weakness2"],
    "grading_details": {{
{details}
    }},
    "red_flags": ["concern such as suspected plagiarism"]
}}

Return ONLY the JSON object, no other text."#,
            details = sections.join(",\n")
        )
    }
}

#[async_trait]
impl Stage for MarkStage {
    fn kind(&self) -> StageKind {
        StageKind::Mark
    }

    async fn run(&self, ctx: &WorkflowContext) -> Result<StageResult, StageError> {
        let extraction = require(ctx.extraction(), StageKind::Mark, StageKind::Extract)?;
        let analysis = require(ctx.analysis(), StageKind::Mark, StageKind::Analyze)?;
        let report = require(ctx.match_report(), StageKind::Mark, StageKind::Match)?;

        let context_json = serde_json::to_string_pretty(&json!({
            "sections": extraction.sections,
            "analysis": analysis,
            "requirement_matches": report.matches,
        }))
        .map_err(|e| StageError::internal(StageKind::Mark.as_str(), e.to_string()))?;

        let reply = self
            .generator
            .generate(SYSTEM_PROMPT, &Self::build_prompt(&context_json))
            .await?;

        let (parsed, degraded) = match parse_json_as::<MarkingReply>(&reply) {
            Some(parsed) => (parsed, false),
            None => {
                warn!(
                    "{} ⚠️ 批改结果无法解析，使用兜底结果: {}",
                    ctx.submission,
                    truncate_text(&reply, 80)
                );
                (MarkingReply::default(), true)
            }
        };

        let student_score = weighted_composite(CompositeInputs {
            similarity: f64::from(analysis.total_score) / 100.0,
            clarity: extraction.sections_found() as f64 / Section::ALL.len() as f64,
            alignment: f64::from(report.best_score()) / 100.0,
            red_flags: parsed.red_flags.len(),
        });

        let marking = MarkingResult {
            strengths: parsed.strengths,
            weaknesses: parsed.weaknesses,
            grading_details: parsed.grading_details,
            red_flags: parsed.red_flags,
            student_score,
            grade_band: classify_band(student_score),
        };
        debug!(
            "{} 批改完成: {} 分 ({})",
            ctx.submission, marking.student_score, marking.grade_band
        );

        let payload = StagePayload::Marking(marking);
        Ok(if degraded {
            StageResult::degraded(payload)
        } else {
            StageResult::ok(payload)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::GradeBand;
    use crate::workflow::stages::testing::{context_after, FakeGenerator};

    const UPSTREAM: [StageKind; 3] = [StageKind::Extract, StageKind::Analyze, StageKind::Match];

    #[tokio::test]
    async fn test_score_is_weighted_composite() {
        let generator = FakeGenerator::replying(
            r#"{"strengths": ["Clear data"], "weaknesses": [], "grading_details": {"data": "8/10"}, "red_flags": []}"#,
        );
        let stage = MarkStage::new(generator);
        let result = stage.run(&context_after(&UPSTREAM)).await.unwrap();

        assert!(!result.is_degraded());
        let StagePayload::Marking(marking) = result.payload else {
            panic!("unexpected payload");
        };
        // 0.4·0.8 + 0.3·(3/9) + 0.25·0.5 = 0.545
        assert_eq!(marking.student_score, 54);
        assert_eq!(marking.grade_band, GradeBand::Pass);
        assert_eq!(marking.grading_details["data"], "8/10");
    }

    #[tokio::test]
    async fn test_red_flags_lower_score() {
        let generator = FakeGenerator::replying(r#"{"red_flags": ["copied paragraph"]}"#);
        let stage = MarkStage::new(generator);
        let result = stage.run(&context_after(&UPSTREAM)).await.unwrap();
        let StagePayload::Marking(marking) = result.payload else {
            panic!("unexpected payload");
        };
        assert_eq!(marking.student_score, 49);
        assert_eq!(marking.red_flags.len(), 1);
    }

    #[tokio::test]
    async fn test_unparsable_reply_degrades_but_still_scores() {
        let stage = MarkStage::new(FakeGenerator::replying("no json"));
        let result = stage.run(&context_after(&UPSTREAM)).await.unwrap();
        assert!(result.is_degraded());
        let StagePayload::Marking(marking) = result.payload else {
            panic!("unexpected payload");
        };
        assert!(marking.strengths.is_empty());
        assert!(marking.grading_details.is_empty());
        assert_eq!(marking.student_score, 54);
    }

    #[tokio::test]
    async fn test_requires_match_report() {
        let stage = MarkStage::new(FakeGenerator::replying("{}"));
        let err = stage
            .run(&context_after(&[StageKind::Extract, StageKind::Analyze]))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::MissingInput { needed: "match", .. }));
    }
}
