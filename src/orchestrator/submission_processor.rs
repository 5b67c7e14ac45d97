//! 单个提交处理器 - 编排层
//!
//! ## 核心功能
//!
//! 1. **流程调度**：交给 `PipelineOrchestrator` 跑完五个阶段
//! 2. **入库**：流程完成后计算原创度并 upsert 提交记录
//! 3. **报告输出**：写入 `analysis_<身份>_<时间>.json`
//! 4. **文件清理**：按配置删除已处理的描述文件

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{error, info, warn};

use crate::models::SubmissionRequest;
use crate::orchestrator::pipeline::PipelineOrchestrator;
use crate::services::SubmissionService;
use crate::workflow::{WorkflowContext, WorkflowStatus};

/// 单个提交的处理结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionOutcome {
    Completed,
    /// 完成，但有阶段使用了兜底结果
    Degraded,
    Failed,
}

/// 写入结果目录的报告
#[derive(Debug, Serialize)]
pub struct GradingReport<'a> {
    #[serde(flatten)]
    pub context: &'a WorkflowContext,
    /// 仅在入库成功时存在
    pub originality_score: Option<u8>,
}

/// 处理单个提交
pub async fn process_submission(
    orchestrator: &PipelineOrchestrator,
    ingestion: &SubmissionService,
    request: SubmissionRequest,
    results_folder: &Path,
    remove_processed: bool,
) -> Result<SubmissionOutcome> {
    let descriptor = request.descriptor_path.clone();
    let ctx = orchestrator.process(request).await;

    let originality_score = if ctx.status() == WorkflowStatus::Completed {
        ingest(ingestion, &ctx)
    } else {
        None
    };

    let report = GradingReport {
        context: &ctx,
        originality_score,
    };
    let report_path = write_report(results_folder, &report)?;
    info!("{} 📄 报告已写入: {}", ctx.submission, report_path.display());

    if remove_processed {
        if let Some(path) = descriptor {
            remove_descriptor(&path);
        }
    }

    Ok(match ctx.status() {
        WorkflowStatus::Completed if ctx.has_degraded() => SubmissionOutcome::Degraded,
        WorkflowStatus::Completed => SubmissionOutcome::Completed,
        _ => SubmissionOutcome::Failed,
    })
}

/// 入库失败不影响报告输出
fn ingest(ingestion: &SubmissionService, ctx: &WorkflowContext) -> Option<u8> {
    let Some(extraction) = ctx.extraction() else {
        warn!("{} ⚠️ 缺少提取结果，跳过入库", ctx.submission);
        return None;
    };

    let report_json = match ctx.to_json_pretty() {
        Ok(json) => json,
        Err(e) => {
            error!("{} ❌ 报告序列化失败: {}", ctx.submission, e);
            return None;
        }
    };

    match ingestion.ingest(&ctx.submission, &extraction.raw_text, report_json) {
        Ok(record) => Some(record.score),
        Err(e) => {
            error!("{} ❌ 入库失败: {}", ctx.submission, e);
            None
        }
    }
}

/// 同名报告已存在时追加的序号上限
const MAX_REPORT_SUFFIX: u32 = 1000;

/// 身份编码为文件名：ASCII 字母数字和 `-` 原样保留，其余字节写成 `_xx`
///
/// `_` 只作为转义前缀出现，不同身份得到不同的文件名
fn encode_identity(identity: &str) -> String {
    let mut encoded = String::with_capacity(identity.len());
    for byte in identity.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("_{:02x}", byte));
        }
    }
    encoded
}

fn report_file_stem(ctx: &WorkflowContext) -> String {
    format!(
        "analysis_{}_{}",
        encode_identity(&ctx.submission.identity),
        ctx.started_at.format("%Y%m%d_%H%M%S")
    )
}

/// 写入报告，从不覆盖已有文件
fn write_report(results_folder: &Path, report: &GradingReport<'_>) -> Result<PathBuf> {
    fs::create_dir_all(results_folder)
        .with_context(|| format!("无法创建结果目录: {}", results_folder.display()))?;

    let json = serde_json::to_string_pretty(report).context("报告序列化失败")?;
    let stem = report_file_stem(report.context);

    for suffix in 0..MAX_REPORT_SUFFIX {
        let name = if suffix == 0 {
            format!("{}.json", stem)
        } else {
            format!("{}_{}.json", stem, suffix)
        };
        let path = results_folder.join(name);

        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(json.as_bytes())
                    .with_context(|| format!("无法写入报告: {}", path.display()))?;
                return Ok(path);
            }
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => {
                return Err(e).with_context(|| format!("无法创建报告: {}", path.display()))
            }
        }
    }

    anyhow::bail!("报告文件名已被占用: {}", stem)
}

fn remove_descriptor(path: &Path) {
    match fs::remove_file(path) {
        Ok(_) => info!("🗑️ 已删除描述文件: {}", path.display()),
        Err(e) => warn!("⚠️ 删除描述文件失败 {}: {}", path.display(), e),
    }
}
