//! # Grade Submission
//!
//! 学生提交的自动评分流水线
//!
//! ## 架构设计
//!
//! ### ① 基础设施层（Infrastructure / Clients）
//! - `infrastructure/` - 持有唯一的 SQLite 连接，只暴露读写能力
//! - `clients/` - 文本生成（OpenAI 兼容接口）与文档文本提取
//!
//! ### ② 业务能力层（Services）
//! - `RequirementMatcher` - 内容标签对照评分要求目录打分
//! - `SimilarityScorer` - TF-IDF 原创度评分
//! - `SubmissionService` - 提交入库（原创度 + upsert）
//!
//! ### ③ 流程层（Workflow）
//! - `WorkflowContext` - 只追加的流程上下文
//! - `Stage` - 阶段契约，extract → analyze → match → mark → recommend
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/pipeline` - 单个提交的阶段编排
//! - `orchestrator/batch_processor` - 批量处理、并发控制和统计

pub mod clients;
pub mod config;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{SubmissionRequest, SubmissionSource};
pub use orchestrator::{App, PipelineOrchestrator};
pub use workflow::{WorkflowContext, WorkflowStatus};
