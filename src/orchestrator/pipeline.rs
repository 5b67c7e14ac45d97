//! 单个提交的流程编排器 - 编排层
//!
//! 严格按 extract → analyze → match → mark → recommend 顺序执行，
//! 每个阶段的结果（ok 或 degraded）写入上下文。
//! 任一阶段返回错误即中止：状态置为 failed，附上错误，返回部分上下文。
//! 不重试，不回滚，不写存储。

use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info, info_span, warn, Instrument};

use crate::clients::{TextExtractor, TextGenerator};
use crate::models::SubmissionRequest;
use crate::services::RequirementMatcher;
use crate::workflow::{
    AnalyzeStage, ExtractStage, MarkStage, MatchStage, RecommendStage, StageSet, WorkflowContext,
};

pub struct PipelineOrchestrator {
    stages: StageSet,
}

impl PipelineOrchestrator {
    pub fn new(stages: StageSet) -> Self {
        Self { stages }
    }

    /// 用默认的五个阶段组装
    pub fn with_defaults(
        extractor: Arc<dyn TextExtractor>,
        generator: Arc<dyn TextGenerator>,
        matcher: RequirementMatcher,
    ) -> Self {
        Self::new(StageSet {
            extract: Box::new(ExtractStage::new(extractor)),
            analyze: Box::new(AnalyzeStage::new(generator.clone())),
            matching: Box::new(MatchStage::new(matcher)),
            mark: Box::new(MarkStage::new(generator.clone())),
            recommend: Box::new(RecommendStage::new(generator)),
        })
    }

    pub async fn process(&self, request: SubmissionRequest) -> WorkflowContext {
        let mut ctx = WorkflowContext::new(request);
        info!("{} 🚀 开始评分流程", ctx.submission);

        for stage in self.stages.in_order() {
            let kind = stage.kind();
            if let Err(e) = ctx.begin_stage(kind) {
                error!("{} ❌ {}", ctx.submission, e);
                return ctx;
            }

            let span = info_span!("stage", identity = %ctx.submission.identity, stage = %kind);
            let started = Instant::now();
            let outcome = stage.run(&ctx).instrument(span).await;
            let elapsed_ms = started.elapsed().as_millis();

            let result = match outcome {
                Ok(result) if result.kind() == kind => result,
                Ok(result) => {
                    let message = format!("阶段 {} 返回了 {} 的结果", kind, result.kind());
                    error!("{} ❌ {}", ctx.submission, message);
                    ctx.fail(kind, message);
                    return ctx;
                }
                Err(e) => {
                    error!(
                        "{} ❌ 阶段 {} 失败 ({} ms): {}",
                        ctx.submission, kind, elapsed_ms, e
                    );
                    ctx.fail(kind, e.to_string());
                    return ctx;
                }
            };

            if result.is_degraded() {
                warn!("{} ⚠️ 阶段 {} 降级 ({} ms)", ctx.submission, kind, elapsed_ms);
            } else {
                info!("{} ✓ 阶段 {} 完成 ({} ms)", ctx.submission, kind, elapsed_ms);
            }

            if let Err(e) = ctx.record(result) {
                error!("{} ❌ {}", ctx.submission, e);
                ctx.fail(kind, e.to_string());
                return ctx;
            }
        }

        ctx.complete();
        info!("{} ✅ 评分流程完成", ctx.submission);
        ctx
    }
}
