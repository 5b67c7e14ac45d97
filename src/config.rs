use std::path::Path;

use serde::Deserialize;

use crate::error::{AppError, AppResult, ConfigError};

/// 程序配置文件
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// 同时处理的提交数量
    pub max_concurrent_submissions: usize,
    /// 待处理提交描述文件（TOML）存放目录
    pub submissions_folder: String,
    /// 评分报告输出目录
    pub results_folder: String,
    /// SQLite 数据库路径
    pub database_path: String,
    /// 评分要求种子文件
    pub requirements_file: String,
    /// 基准语料种子文件
    pub baseline_file: String,
    /// 输出日志文件
    pub output_log_file: String,
    /// 是否显示详细日志
    pub verbose_logging: bool,
    /// 处理完成后是否删除描述文件
    pub remove_processed: bool,
    /// 原创度比对时使用的历史提交数量上限（None 表示不限）
    pub corpus_window: Option<usize>,
    // --- LLM 配置 ---
    pub llm_api_key: String,
    pub llm_api_base_url: String,
    pub llm_model_name: String,
    pub llm_temperature: f32,
    pub llm_max_tokens: u32,
    pub llm_timeout_secs: u64,
    pub llm_max_retries: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_concurrent_submissions: 4,
            submissions_folder: "submissions".to_string(),
            results_folder: "results".to_string(),
            database_path: "data/grading.sqlite".to_string(),
            requirements_file: "data/requirements.toml".to_string(),
            baseline_file: "data/baseline.toml".to_string(),
            output_log_file: "output.txt".to_string(),
            verbose_logging: false,
            remove_processed: false,
            corpus_window: None,
            llm_api_key: String::new(),
            llm_api_base_url: "https://api.groq.com/openai/v1".to_string(),
            llm_model_name: "llama-3.3-70b-versatile".to_string(),
            llm_temperature: 0.7,
            llm_max_tokens: 2000,
            llm_timeout_secs: 60,
            llm_max_retries: 3,
        }
    }
}

/// 指定 TOML 配置文件路径的环境变量
pub const CONFIG_PATH_VAR: &str = "GRADE_CONFIG";

impl Config {
    /// 程序入口使用：设置了 `GRADE_CONFIG` 时读取该文件，否则只读环境变量
    pub fn load() -> AppResult<Self> {
        match std::env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_file(Path::new(&path)),
            Err(_) => Self::from_env(),
        }
    }

    /// 从环境变量加载配置，未设置的项使用默认值
    pub fn from_env() -> AppResult<Self> {
        Self::default().merge_env()
    }

    /// 从 TOML 文件加载配置，再用环境变量覆盖
    pub fn from_file(path: &Path) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::FileParseFailed {
                path: path.display().to_string(),
                source,
            })?;
        config.merge_env()
    }

    fn merge_env(self) -> AppResult<Self> {
        Ok(Self {
            max_concurrent_submissions: env_parse(
                "MAX_CONCURRENT_SUBMISSIONS",
                self.max_concurrent_submissions,
            )?,
            submissions_folder: env_string("SUBMISSIONS_FOLDER", self.submissions_folder),
            results_folder: env_string("RESULTS_FOLDER", self.results_folder),
            database_path: env_string("DATABASE_PATH", self.database_path),
            requirements_file: env_string("REQUIREMENTS_FILE", self.requirements_file),
            baseline_file: env_string("BASELINE_FILE", self.baseline_file),
            output_log_file: env_string("OUTPUT_LOG_FILE", self.output_log_file),
            verbose_logging: env_parse("VERBOSE_LOGGING", self.verbose_logging)?,
            remove_processed: env_parse("REMOVE_PROCESSED", self.remove_processed)?,
            corpus_window: match std::env::var("CORPUS_WINDOW") {
                Ok(v) => Some(parse_value("CORPUS_WINDOW", &v)?),
                Err(_) => self.corpus_window,
            },
            llm_api_key: env_string("LLM_API_KEY", self.llm_api_key),
            llm_api_base_url: env_string("LLM_API_BASE_URL", self.llm_api_base_url),
            llm_model_name: env_string("LLM_MODEL_NAME", self.llm_model_name),
            llm_temperature: env_parse("LLM_TEMPERATURE", self.llm_temperature)?,
            llm_max_tokens: env_parse("LLM_MAX_TOKENS", self.llm_max_tokens)?,
            llm_timeout_secs: env_parse("LLM_TIMEOUT_SECS", self.llm_timeout_secs)?,
            llm_max_retries: env_parse("LLM_MAX_RETRIES", self.llm_max_retries)?,
        })
    }
}

fn env_string(var_name: &str, default: String) -> String {
    std::env::var(var_name).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(var_name: &str, default: T) -> AppResult<T> {
    match std::env::var(var_name) {
        Ok(v) => parse_value(var_name, &v),
        Err(_) => Ok(default),
    }
}

fn parse_value<T: std::str::FromStr>(var_name: &str, value: &str) -> AppResult<T> {
    value.trim().parse().map_err(|_| {
        ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            value: value.to_string(),
            expected_type: std::any::type_name::<T>().to_string(),
        }
        .into()
    })
}
