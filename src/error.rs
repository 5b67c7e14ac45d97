use thiserror::Error;

/// 应用程序错误类型
#[derive(Debug, Error)]
pub enum AppError {
    /// LLM 服务错误
    #[error("LLM错误: {0}")]
    Llm(#[from] LlmError),
    /// 文本提取错误
    #[error("提取错误: {0}")]
    Extract(#[from] ExtractError),
    /// 存储错误
    #[error("存储错误: {0}")]
    Store(#[from] StoreError),
    /// 流程阶段错误
    #[error("阶段错误: {0}")]
    Stage(#[from] StageError),
    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),
    /// 文件操作错误
    #[error("文件错误: {0}")]
    File(#[from] FileError),
}

/// LLM 服务错误
#[derive(Debug, Error)]
pub enum LlmError {
    /// 构建请求失败
    #[error("构建 LLM 请求失败 (模型: {model}): {message}")]
    RequestBuildFailed { model: String, message: String },
    /// API 调用失败
    #[error("LLM API调用失败 (模型: {model}): {source}")]
    ApiCallFailed {
        model: String,
        #[source]
        source: async_openai::error::OpenAIError,
    },
    /// 请求超时
    #[error("LLM 请求超时 (模型: {model}, {timeout_secs} 秒)")]
    Timeout { model: String, timeout_secs: u64 },
    /// 返回内容为空
    #[error("LLM返回内容为空 (模型: {model})")]
    EmptyContent { model: String },
}

/// 文本提取错误
#[derive(Debug, Error)]
pub enum ExtractError {
    /// 文件不存在
    #[error("文件不存在: {path}")]
    NotFound { path: String },
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// PDF 解析失败
    #[error("PDF解析失败 ({path}): {message}")]
    PdfParseFailed { path: String, message: String },
    /// 不支持的文件类型
    #[error("不支持的文件类型: {path}")]
    UnsupportedFormat { path: String },
    /// 提取结果为空
    #[error("提取到的文本为空")]
    EmptyText,
}

/// 存储错误
#[derive(Debug, Error)]
pub enum StoreError {
    /// SQLite 错误
    #[error("SQLite错误: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// 创建目录失败
    #[error("IO错误 ({path}): {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    /// 字段序列化失败
    #[error("字段序列化失败: {0}")]
    Serialization(#[from] serde_json::Error),
    /// 迁移失败
    #[error("迁移 v{version} 失败: {reason}")]
    Migration { version: u32, reason: String },
    /// 数据库锁中毒
    #[error("数据库锁中毒")]
    LockPoisoned,
}

/// 流程阶段错误（致命错误，会中止流程）
#[derive(Debug, Error)]
pub enum StageError {
    /// 文本提取失败
    #[error("文本提取失败: {0}")]
    Extraction(#[from] ExtractError),
    /// 文本生成服务不可用
    #[error("文本生成失败: {0}")]
    Generation(#[from] LlmError),
    /// 上游阶段结果缺失
    #[error("阶段 {stage} 缺少上游结果: {needed}")]
    MissingInput {
        stage: &'static str,
        needed: &'static str,
    },
    /// 阶段内部逻辑错误
    #[error("阶段 {stage} 内部错误: {message}")]
    Internal {
        stage: &'static str,
        message: String,
    },
}

/// 上下文写入错误
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContextError {
    /// 流程已结束，禁止写入
    #[error("流程已结束 ({status})，拒绝写入阶段 {stage}")]
    Finalized { status: String, stage: String },
    /// 阶段结果已存在，禁止覆盖
    #[error("阶段 {stage} 的结果已存在，禁止覆盖")]
    AlreadyRecorded { stage: String },
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置文件解析失败
    #[error("配置文件解析失败 ({path}): {source}")]
    FileParseFailed {
        path: String,
        #[source]
        source: toml::de::Error,
    },
}

/// 文件操作错误
#[derive(Debug, Error)]
pub enum FileError {
    /// 读取文件失败
    #[error("读取文件失败 ({path}): {source}")]
    ReadFailed {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ========== 便捷构造函数 ==========

impl AppError {
    /// 创建文件读取错误
    pub fn file_read_failed(path: impl Into<String>, source: std::io::Error) -> Self {
        AppError::File(FileError::ReadFailed {
            path: path.into(),
            source,
        })
    }
}

impl StageError {
    /// 创建阶段内部错误
    pub fn internal(stage: &'static str, message: impl Into<String>) -> Self {
        StageError::Internal {
            stage,
            message: message.into(),
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_error_wraps_llm_error() {
        let err: StageError = LlmError::EmptyContent {
            model: "test-model".to_string(),
        }
        .into();
        assert!(err.to_string().contains("test-model"));
        assert!(matches!(err, StageError::Generation(_)));
    }

    #[test]
    fn test_app_error_from_store_error() {
        let err: AppError = StoreError::LockPoisoned.into();
        assert_eq!(err.to_string(), "存储错误: 数据库锁中毒");
    }

    #[test]
    fn test_context_error_display() {
        let err = ContextError::AlreadyRecorded {
            stage: "match".to_string(),
        };
        assert_eq!(err.to_string(), "阶段 match 的结果已存在，禁止覆盖");
    }
}
