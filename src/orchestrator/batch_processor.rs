//! 批量提交处理器 - 编排层
//!
//! ## 职责
//!
//! 本模块是整个应用的入口，负责批量提交的处理和资源管理。
//!
//! ## 核心功能
//!
//! 1. **应用初始化**：打开数据库、导入种子数据、创建生成客户端和提取器
//! 2. **批量加载**：扫描并加载所有待处理的提交描述文件
//! 3. **并发控制**：使用 Semaphore 限制并发数量
//! 4. **分批处理**：每批完成后再开始下一批
//! 5. **全局统计**：汇总成功 / 降级 / 失败数量
//!
//! 每个任务使用独立的 `PipelineOrchestrator`，任务之间只共享存储。

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clients::{DocumentExtractor, LlmClient, TextExtractor, TextGenerator};
use crate::config::Config;
use crate::infrastructure::GradeStore;
use crate::models::{self, SubmissionRequest, SubmissionSource};
use crate::orchestrator::pipeline::PipelineOrchestrator;
use crate::orchestrator::submission_processor::{process_submission, SubmissionOutcome};
use crate::services::{RequirementCatalog, RequirementMatcher, SimilarityScorer, SubmissionService};
use crate::utils::{logging, truncate_text};

/// 应用主结构
pub struct App {
    config: Config,
    store: Arc<GradeStore>,
    generator: Arc<dyn TextGenerator>,
    extractor: Arc<dyn TextExtractor>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        logging::init_log_file(&config.output_log_file)?;
        logging::log_startup(config.max_concurrent_submissions, &config.llm_model_name);

        let store = GradeStore::open(Path::new(&config.database_path))
            .with_context(|| format!("无法打开数据库: {}", config.database_path))?;
        seed_store(&store, &config).await?;

        let generator: Arc<dyn TextGenerator> = Arc::new(LlmClient::new(&config));
        Ok(Self::with_parts(
            config,
            Arc::new(store),
            generator,
            Arc::new(DocumentExtractor::new()),
        ))
    }

    /// 使用外部提供的组件创建（测试时注入假实现）
    pub fn with_parts(
        config: Config,
        store: Arc<GradeStore>,
        generator: Arc<dyn TextGenerator>,
        extractor: Arc<dyn TextExtractor>,
    ) -> Self {
        Self {
            config,
            store,
            generator,
            extractor,
        }
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<ProcessingStats> {
        info!("\n📁 正在扫描待处理的提交...");
        let submissions = models::load_all_submissions(&self.config.submissions_folder).await?;

        if submissions.is_empty() {
            warn!("⚠️ 没有找到待处理的提交描述文件，程序结束");
            return Ok(ProcessingStats::default());
        }

        logging::log_submissions_loaded(submissions.len(), self.batch_size());
        let stats = self.process_all(submissions).await?;

        logging::print_final_stats(
            stats.success,
            stats.degraded,
            stats.failed,
            stats.total,
            &self.config.output_log_file,
        );
        Ok(stats)
    }

    fn batch_size(&self) -> usize {
        self.config.max_concurrent_submissions.max(1)
    }

    fn build_orchestrator(&self) -> PipelineOrchestrator {
        let matcher = RequirementMatcher::new(RequirementCatalog::new(self.store.clone()));
        PipelineOrchestrator::with_defaults(
            self.extractor.clone(),
            self.generator.clone(),
            matcher,
        )
    }

    fn build_ingestion(&self) -> SubmissionService {
        let scorer = SimilarityScorer::new(self.store.clone(), self.config.corpus_window);
        SubmissionService::new(scorer, self.store.clone())
    }

    /// 分批处理所有提交
    async fn process_all(&self, submissions: Vec<SubmissionRequest>) -> Result<ProcessingStats> {
        let batch_size = self.batch_size();
        let semaphore = Arc::new(Semaphore::new(batch_size));
        let total = submissions.len();
        let total_batches = total.div_ceil(batch_size);
        let mut stats = ProcessingStats {
            total,
            ..Default::default()
        };

        for (batch_idx, batch) in submissions.chunks(batch_size).enumerate() {
            let batch_num = batch_idx + 1;
            let batch_start = batch_idx * batch_size;
            logging::log_batch_start(
                batch_num,
                total_batches,
                batch_start + 1,
                batch_start + batch.len(),
                total,
            );

            let batch_stats = self.process_batch(batch, semaphore.clone()).await?;
            logging::log_batch_complete(
                batch_num,
                batch_stats.success + batch_stats.degraded,
                batch.len(),
            );
            stats.absorb(&batch_stats);
        }

        Ok(stats)
    }

    /// 处理单个批次
    async fn process_batch(
        &self,
        batch: &[SubmissionRequest],
        semaphore: Arc<Semaphore>,
    ) -> Result<ProcessingStats> {
        let results_folder = PathBuf::from(&self.config.results_folder);
        let mut handles = Vec::new();

        for request in batch {
            if self.config.verbose_logging {
                log_submission_preview(request);
            }
            let permit = semaphore.clone().acquire_owned().await?;
            let orchestrator = self.build_orchestrator();
            let ingestion = self.build_ingestion();
            let request = request.clone();
            let label = request.to_string();
            let results_folder = results_folder.clone();
            let remove_processed = self.config.remove_processed;

            let handle = tokio::spawn(async move {
                let _permit = permit;
                process_submission(
                    &orchestrator,
                    &ingestion,
                    request,
                    &results_folder,
                    remove_processed,
                )
                .await
            });
            handles.push((label, handle));
        }

        let mut stats = ProcessingStats::default();
        for (label, handle) in handles {
            match handle.await {
                Ok(Ok(outcome)) => stats.record(outcome),
                Ok(Err(e)) => {
                    error!("{} ❌ 处理过程中发生错误: {:#}", label, e);
                    stats.failed += 1;
                }
                Err(e) => {
                    error!("{} 任务执行失败: {}", label, e);
                    stats.failed += 1;
                }
            }
        }

        Ok(stats)
    }
}

fn log_submission_preview(request: &SubmissionRequest) {
    match &request.source {
        SubmissionSource::Text(text) => {
            info!("{} 📝 内容预览: {}", request, truncate_text(text.trim(), 60))
        }
        SubmissionSource::File(path) => info!("{} 📝 文件: {}", request, path.display()),
    }
}

/// 导入种子数据（文件不存在时跳过）
async fn seed_store(store: &GradeStore, config: &Config) -> Result<()> {
    let requirements_path = Path::new(&config.requirements_file);
    if requirements_path.exists() {
        let records = models::load_requirement_seeds(requirements_path).await?;
        let count = store.seed_requirements(&records)?;
        info!("✓ 已导入 {} 条评分要求", count);
    } else {
        warn!("⚠️ 评分要求文件不存在: {}", requirements_path.display());
    }

    let baseline_path = Path::new(&config.baseline_file);
    if baseline_path.exists() {
        let texts = models::load_baseline_corpus(baseline_path).await?;
        let inserted = store.seed_baseline(&texts)?;
        info!("✓ 基准语料 {} 篇，新增 {} 篇", texts.len(), inserted);
    } else {
        warn!("⚠️ 基准语料文件不存在: {}", baseline_path.display());
    }

    Ok(())
}

/// 处理统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProcessingStats {
    /// 完成且无降级
    pub success: usize,
    /// 完成但有阶段降级
    pub degraded: usize,
    pub failed: usize,
    pub total: usize,
}

impl ProcessingStats {
    fn record(&mut self, outcome: SubmissionOutcome) {
        match outcome {
            SubmissionOutcome::Completed => self.success += 1,
            SubmissionOutcome::Degraded => self.degraded += 1,
            SubmissionOutcome::Failed => self.failed += 1,
        }
    }

    fn absorb(&mut self, other: &ProcessingStats) {
        self.success += other.success;
        self.degraded += other.degraded;
        self.failed += other.failed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_record_and_absorb() {
        let mut batch = ProcessingStats::default();
        batch.record(SubmissionOutcome::Completed);
        batch.record(SubmissionOutcome::Degraded);
        batch.record(SubmissionOutcome::Failed);

        let mut total = ProcessingStats {
            total: 3,
            ..Default::default()
        };
        total.absorb(&batch);
        assert_eq!(
            total,
            ProcessingStats {
                success: 1,
                degraded: 1,
                failed: 1,
                total: 3
            }
        );
    }

    #[tokio::test]
    async fn test_seed_store_skips_missing_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            requirements_file: dir.path().join("none.toml").display().to_string(),
            baseline_file: dir.path().join("none.toml").display().to_string(),
            ..Config::default()
        };
        let store = GradeStore::open_in_memory().unwrap();
        seed_store(&store, &config).await.unwrap();
    }
}
