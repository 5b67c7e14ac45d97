//! 文本生成客户端
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用
//! - 兼容 OpenAI API 的服务（如 Groq、本地推理服务等）
//!
//! 流程阶段只依赖 [`TextGenerator`] trait，测试中用假实现替换。

use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use tokio::time::{sleep, timeout};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::LlmError;

/// 文本生成能力
#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// 发送一组提示词，返回生成的文本（已去除首尾空白）
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError>;
}

/// OpenAI 兼容的聊天补全客户端
///
/// 超时和重试都在这里处理，调用方只看到最终结果。
pub struct LlmClient {
    client: Client<OpenAIConfig>,
    model_name: String,
    temperature: f32,
    max_tokens: u32,
    timeout_secs: u64,
    max_retries: usize,
}

impl LlmClient {
    pub fn new(config: &Config) -> Self {
        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.llm_api_key)
            .with_api_base(&config.llm_api_base_url);

        Self {
            client: Client::with_config(openai_config),
            model_name: config.llm_model_name.clone(),
            temperature: config.llm_temperature,
            max_tokens: config.llm_max_tokens,
            timeout_secs: config.llm_timeout_secs,
            max_retries: config.llm_max_retries.max(1),
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    fn build_messages(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Vec<ChatCompletionRequestMessage>, LlmError> {
        let system_msg = ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()
            .map_err(|e| self.build_error(e))?;
        let user_msg = ChatCompletionRequestUserMessageArgs::default()
            .content(user_prompt)
            .build()
            .map_err(|e| self.build_error(e))?;

        Ok(vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ])
    }

    fn build_error(&self, e: impl std::fmt::Display) -> LlmError {
        LlmError::RequestBuildFailed {
            model: self.model_name.clone(),
            message: e.to_string(),
        }
    }

    /// 单次请求（带超时）
    async fn call_once(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model_name)
            .messages(self.build_messages(system_prompt, user_prompt)?)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| self.build_error(e))?;

        let response = timeout(
            Duration::from_secs(self.timeout_secs),
            self.client.chat().create(request),
        )
        .await
        .map_err(|_| LlmError::Timeout {
            model: self.model_name.clone(),
            timeout_secs: self.timeout_secs,
        })?
        .map_err(|source| LlmError::ApiCallFailed {
            model: self.model_name.clone(),
            source,
        })?;

        response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or_else(|| LlmError::EmptyContent {
                model: self.model_name.clone(),
            })
    }
}

#[async_trait]
impl TextGenerator for LlmClient {
    async fn generate(&self, system_prompt: &str, user_prompt: &str) -> Result<String, LlmError> {
        debug!(
            "调用 LLM API，模型: {}，用户消息长度: {} 字符",
            self.model_name,
            user_prompt.len()
        );

        let mut last_error = None;
        for retry_count in 0..self.max_retries {
            match self.call_once(system_prompt, user_prompt).await {
                Ok(content) => {
                    debug!("LLM API 调用成功，返回 {} 字符", content.len());
                    return Ok(content);
                }
                // 构建失败重试也无意义
                Err(e @ LlmError::RequestBuildFailed { .. }) => return Err(e),
                Err(e) => {
                    warn!(
                        "LLM API 调用失败 (尝试 {}/{}): {}",
                        retry_count + 1,
                        self.max_retries,
                        e
                    );
                    last_error = Some(e);
                    if retry_count + 1 < self.max_retries {
                        sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::EmptyContent {
            model: self.model_name.clone(),
        }))
    }
}
