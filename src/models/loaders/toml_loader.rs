use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use futures::future::join_all;
use serde::Deserialize;
use tokio::fs;

use crate::models::grade::GradeBand;
use crate::models::requirement::RequirementRecord;
use crate::models::submission::{SubmissionRequest, SubmissionSource};

/// 提交描述文件的 TOML 结构
#[derive(Debug, Deserialize)]
struct SubmissionDescriptor {
    student_id: String,
    student_name: Option<String>,
    file_path: Option<String>,
    text: Option<String>,
    /// RFC 3339 字符串
    submitted_at: Option<String>,
}

/// 评分要求种子文件的 TOML 结构
#[derive(Debug, Deserialize)]
struct RequirementSeedFile {
    #[serde(default, rename = "requirement")]
    requirements: Vec<RequirementSeed>,
}

#[derive(Debug, Deserialize)]
struct RequirementSeed {
    id: i64,
    title: String,
    location: String,
    grade_band: String,
    #[serde(default)]
    requirements: Vec<String>,
}

/// 基准语料种子文件的 TOML 结构
#[derive(Debug, Deserialize)]
struct BaselineFile {
    #[serde(default)]
    texts: Vec<String>,
}

/// 从 TOML 文件加载单个提交描述
///
/// `file_path` 为相对路径时，相对于描述文件所在目录解析
pub async fn load_submission(descriptor_path: &Path) -> Result<SubmissionRequest> {
    let content = fs::read_to_string(descriptor_path)
        .await
        .with_context(|| format!("无法读取TOML文件: {}", descriptor_path.display()))?;

    let descriptor: SubmissionDescriptor = toml::from_str(&content)
        .with_context(|| format!("无法解析TOML文件: {}", descriptor_path.display()))?;

    let source = match (descriptor.file_path, descriptor.text) {
        (Some(file_path), _) => {
            let path = PathBuf::from(&file_path);
            let resolved = if path.is_relative() {
                descriptor_path
                    .parent()
                    .map(|dir| dir.join(&path))
                    .unwrap_or(path)
            } else {
                path
            };
            SubmissionSource::File(resolved)
        }
        (None, Some(text)) => SubmissionSource::Text(text),
        (None, None) => anyhow::bail!(
            "提交描述缺少 file_path 或 text: {}",
            descriptor_path.display()
        ),
    };

    let submitted_at = match descriptor.submitted_at.as_deref() {
        Some(raw) => DateTime::parse_from_rfc3339(raw)
            .with_context(|| format!("submitted_at 格式无效: {}", raw))?
            .with_timezone(&Local),
        None => Local::now(),
    };

    Ok(SubmissionRequest {
        identity: descriptor.student_id,
        student_name: descriptor.student_name,
        source,
        submitted_at,
        descriptor_path: Some(descriptor_path.to_path_buf()),
    })
}

/// 从文件夹中加载所有提交描述
///
/// 单个文件解析失败只记录警告，不影响其他文件
pub async fn load_all_submissions(folder_path: &str) -> Result<Vec<SubmissionRequest>> {
    let folder = PathBuf::from(folder_path);

    if !folder.exists() {
        anyhow::bail!("文件夹不存在: {}", folder_path);
    }

    let mut paths = Vec::new();
    let mut entries = fs::read_dir(&folder)
        .await
        .with_context(|| format!("无法读取文件夹: {}", folder_path))?;

    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            paths.push(path);
        }
    }
    // 保证处理顺序稳定
    paths.sort();

    tracing::info!("正在加载 {} 个描述文件", paths.len());
    let loaded = join_all(paths.iter().map(|path| load_submission(path))).await;

    let mut submissions = Vec::new();
    for (path, result) in paths.iter().zip(loaded) {
        match result {
            Ok(submission) => submissions.push(submission),
            Err(e) => {
                tracing::warn!("加载文件失败 {}: {:#}", path.display(), e);
            }
        }
    }

    Ok(submissions)
}

/// 加载评分要求种子
pub async fn load_requirement_seeds(path: &Path) -> Result<Vec<RequirementRecord>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取评分要求文件: {}", path.display()))?;

    let file: RequirementSeedFile = toml::from_str(&content)
        .with_context(|| format!("无法解析评分要求文件: {}", path.display()))?;

    file.requirements
        .into_iter()
        .map(|seed| {
            let grade_band = GradeBand::parse(&seed.grade_band).with_context(|| {
                format!("评分要求 {} 的等级无效: {}", seed.id, seed.grade_band)
            })?;
            Ok(RequirementRecord {
                id: seed.id,
                title: seed.title,
                location: seed.location,
                grade_band,
                requirements: seed.requirements.into_iter().collect(),
            })
        })
        .collect()
}

/// 加载基准语料
pub async fn load_baseline_corpus(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path)
        .await
        .with_context(|| format!("无法读取基准语料文件: {}", path.display()))?;

    let file: BaselineFile = toml::from_str(&content)
        .with_context(|| format!("无法解析基准语料文件: {}", path.display()))?;

    Ok(file
        .texts
        .into_iter()
        .filter(|t| !t.trim().is_empty())
        .collect())
}
