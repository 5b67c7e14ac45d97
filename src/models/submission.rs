use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// 提交内容来源
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionSource {
    /// 文件路径（.txt / .md / .pdf）
    File(PathBuf),
    /// 直接提供的原始文本
    Text(String),
}

/// 一次提交的描述
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionRequest {
    /// 学生身份标识（唯一）
    pub identity: String,
    pub student_name: Option<String>,
    pub source: SubmissionSource,
    pub submitted_at: DateTime<Local>,
    /// 描述文件路径（仅用于清理）
    #[serde(skip)]
    pub descriptor_path: Option<PathBuf>,
}

impl SubmissionRequest {
    pub fn from_text(identity: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            student_name: None,
            source: SubmissionSource::Text(text.into()),
            submitted_at: Local::now(),
            descriptor_path: None,
        }
    }

    pub fn from_file(identity: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            identity: identity.into(),
            student_name: None,
            source: SubmissionSource::File(path.into()),
            submitted_at: Local::now(),
            descriptor_path: None,
        }
    }
}

impl fmt::Display for SubmissionRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            SubmissionSource::File(path) => {
                write!(f, "[提交 {} 文件#{}]", self.identity, path.display())
            }
            SubmissionSource::Text(text) => {
                write!(f, "[提交 {} 文本#{}字符]", self.identity, text.chars().count())
            }
        }
    }
}

/// 数据库中的提交记录（每个身份至多一条）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionRecord {
    pub identity: String,
    pub student_name: Option<String>,
    pub text: String,
    /// 原创度得分（入库时计算，之后不再重算）
    pub score: u8,
    /// 评分报告 JSON
    pub report: String,
    pub created_at: String,
    pub updated_at: String,
}
