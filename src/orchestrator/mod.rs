//! 编排层（Orchestration Layer）
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 批量提交处理器
//! - 管理应用生命周期（初始化、运行）
//! - 批量加载提交描述文件，控制并发数量（Semaphore）
//! - 输出全局统计信息
//!
//! ### `submission_processor` - 单个提交处理器
//! - 跑完评分流程，入库，写报告，清理描述文件
//!
//! ### `pipeline` - 流程编排器
//! - 按固定顺序执行五个阶段，维护流程上下文
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (处理 Vec<SubmissionRequest>)
//!     ↓
//! submission_processor (处理单个提交)
//!     ↓
//! pipeline::PipelineOrchestrator (五个阶段)
//!     ↓
//! workflow::stages → services → infrastructure / clients
//! ```

pub mod batch_processor;
pub mod pipeline;
pub mod submission_processor;

pub use batch_processor::{App, ProcessingStats};
pub use pipeline::PipelineOrchestrator;
pub use submission_processor::{process_submission, SubmissionOutcome};
