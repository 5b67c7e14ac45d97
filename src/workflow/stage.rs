//! 阶段契约
//!
//! 每个阶段读取只读的流程上下文，在边界处校验所需的上游结果，
//! 返回带 ok / degraded 标签的 [`StageResult`]，或返回致命错误中止流程。

use async_trait::async_trait;

use crate::error::StageError;
use crate::models::{StageKind, StageResult};
use crate::workflow::context::WorkflowContext;

#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    async fn run(&self, ctx: &WorkflowContext) -> Result<StageResult, StageError>;
}

/// 固定顺序的五个阶段
pub struct StageSet {
    pub extract: Box<dyn Stage>,
    pub analyze: Box<dyn Stage>,
    pub matching: Box<dyn Stage>,
    pub mark: Box<dyn Stage>,
    pub recommend: Box<dyn Stage>,
}

impl StageSet {
    /// 按执行顺序返回
    pub fn in_order(&self) -> [&dyn Stage; 5] {
        [
            self.extract.as_ref(),
            self.analyze.as_ref(),
            self.matching.as_ref(),
            self.mark.as_ref(),
            self.recommend.as_ref(),
        ]
    }
}

/// 取上游结果，缺失时返回 `MissingInput`
pub(crate) fn require<'a, T>(
    value: Option<&'a T>,
    stage: StageKind,
    needed: StageKind,
) -> Result<&'a T, StageError> {
    value.ok_or(StageError::MissingInput {
        stage: stage.as_str(),
        needed: needed.as_str(),
    })
}
