//! 匹配阶段：内容标签对照评分要求目录

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::StageError;
use crate::models::{StageKind, StagePayload, StageResult};
use crate::services::RequirementMatcher;
use crate::workflow::context::WorkflowContext;
use crate::workflow::stage::{require, Stage};

pub struct MatchStage {
    matcher: RequirementMatcher,
}

impl MatchStage {
    pub fn new(matcher: RequirementMatcher) -> Self {
        Self { matcher }
    }
}

#[async_trait]
impl Stage for MatchStage {
    fn kind(&self) -> StageKind {
        StageKind::Match
    }

    async fn run(&self, ctx: &WorkflowContext) -> Result<StageResult, StageError> {
        let extraction = require(ctx.extraction(), StageKind::Match, StageKind::Extract)?;
        let analysis = require(ctx.analysis(), StageKind::Match, StageKind::Analyze)?;

        let tags: BTreeSet<String> = extraction
            .content_tags
            .iter()
            .cloned()
            .chain(
                analysis
                    .contents
                    .iter()
                    .map(|c| c.trim().to_string())
                    .filter(|c| !c.is_empty()),
            )
            .collect();
        let band = analysis.grade_band.as_deref().unwrap_or("Pass");

        let report = self.matcher.match_tags(&tags, band);
        debug!(
            "{} 匹配完成: {} 条结果 (候选 {})",
            ctx.submission,
            report.matches.len(),
            report.total_candidates
        );

        if report.catalog_unavailable {
            warn!("{} ⚠️ 评分要求目录不可用，匹配结果为空", ctx.submission);
            return Ok(StageResult::degraded(StagePayload::Match(report)));
        }
        Ok(StageResult::ok(StagePayload::Match(report)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::error::StoreError;
    use crate::infrastructure::{GradeStore, RequirementSource};
    use crate::models::{GradeBand, RequirementRecord};
    use crate::services::RequirementCatalog;
    use crate::workflow::stages::testing::context_after;

    struct BrokenSource;

    impl RequirementSource for BrokenSource {
        fn find_requirements(
            &self,
            _grade_band: GradeBand,
        ) -> Result<Vec<RequirementRecord>, StoreError> {
            Err(StoreError::LockPoisoned)
        }
    }

    fn stage_with(records: &[RequirementRecord]) -> MatchStage {
        let store = GradeStore::open_in_memory().unwrap();
        store.seed_requirements(records).unwrap();
        MatchStage::new(RequirementMatcher::new(RequirementCatalog::new(Arc::new(
            store,
        ))))
    }

    #[tokio::test]
    async fn test_tags_merge_extraction_and_analysis() {
        let record = RequirementRecord {
            id: 1,
            title: "Data and tables".to_string(),
            location: "Unit 2".to_string(),
            grade_band: GradeBand::Merit,
            requirements: BTreeSet::from(["data".to_string(), "tables".to_string()]),
        };
        let stage = stage_with(&[record]);
        let ctx = context_after(&[StageKind::Extract, StageKind::Analyze]);

        let result = stage.run(&ctx).await.unwrap();
        assert!(!result.is_degraded());
        let StagePayload::Match(report) = result.payload else {
            panic!("unexpected payload");
        };
        // "data" 来自提取，"tables" 来自分析
        assert_eq!(report.grade_band, GradeBand::Merit);
        assert_eq!(report.best_score(), 100);
    }

    #[tokio::test]
    async fn test_catalog_failure_degrades() {
        let stage = MatchStage::new(RequirementMatcher::new(RequirementCatalog::new(
            Arc::new(BrokenSource),
        )));
        let ctx = context_after(&[StageKind::Extract, StageKind::Analyze]);

        let result = stage.run(&ctx).await.unwrap();
        assert!(result.is_degraded());
        let StagePayload::Match(report) = result.payload else {
            panic!("unexpected payload");
        };
        assert!(report.matches.is_empty());
        assert_eq!(report.total_candidates, 0);
    }

    #[tokio::test]
    async fn test_requires_analysis() {
        let stage = stage_with(&[]);
        let err = stage
            .run(&context_after(&[StageKind::Extract]))
            .await
            .unwrap_err();
        assert!(matches!(err, StageError::MissingInput { needed: "analyze", .. }));
    }
}
