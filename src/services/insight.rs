use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
        ChatCompletionRequestUserMessage, ChatCompletionRequestUserMessageContent,
        CreateChatCompletionRequest, Role,
    },
    Client,
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Config;
use crate::error::AppError;
use crate::services::analysis::types::{
    limits, ChartKind, ChartSpec, ColumnProfile, Dataset, DatasetProfile, Row,
};

static JSON_BLOCK: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{[\s\S]*\}").expect("valid json block regex"));

const REPORT_FIELDS: [&str; 5] = [
    "dataType",
    "keyInsights",
    "trends",
    "recommendations",
    "summary",
];

const UNAVAILABLE_SUMMARY: &str = "analysis unavailable";

/// Structured report extracted from the generator's free-text response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InsightReport {
    pub data_type: String,
    pub key_insights: Vec<String>,
    pub trends: Vec<String>,
    pub recommendations: Vec<String>,
    pub summary: String,
}

impl InsightReport {
    /// Fixed degrade value: returned whenever the generator is missing,
    /// fails, or times out. Statistical output never depends on it.
    pub fn unavailable() -> Self {
        Self {
            summary: UNAVAILABLE_SUMMARY.to_string(),
            ..Self::default()
        }
    }
}

/// Seam to the text-generation service, injectable so tests can substitute
/// a deterministic stub and exercise the degrade path offline.
#[async_trait]
pub trait InsightBackend: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AppError>;
}

pub struct OpenAiBackend {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiBackend {
    pub fn new(api_key: &str, model: &str) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: model.to_string(),
        }
    }
}

#[async_trait]
impl InsightBackend for OpenAiBackend {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, AppError> {
        let messages = vec![
            ChatCompletionRequestMessage::System(ChatCompletionRequestSystemMessage {
                content: system_prompt.to_string(),
                name: None,
                role: Role::System,
            }),
            ChatCompletionRequestMessage::User(ChatCompletionRequestUserMessage {
                content: ChatCompletionRequestUserMessageContent::Text(user_prompt.to_string()),
                name: None,
                role: Role::User,
            }),
        ];

        let request = CreateChatCompletionRequest {
            model: self.model.clone(),
            messages,
            temperature: Some(0.1),
            ..Default::default()
        };

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| AppError::Insight(e.to_string()))?;

        Ok(response
            .choices
            .first()
            .and_then(|choice| choice.message.content.clone())
            .unwrap_or_default())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DatasetInsightPayload<'a> {
    column_names: &'a [String],
    row_count: usize,
    sample_rows: Vec<&'a Row>,
    profile: &'a DatasetProfile,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PointInsightPayload<'a> {
    chart_kind: ChartKind,
    columns: &'a [String],
    point: &'a Value,
    total_rows: usize,
    column_profile: Option<&'a ColumnProfile>,
}

pub struct InsightAgent {
    backend: Option<Arc<dyn InsightBackend>>,
    timeout: Duration,
}

impl InsightAgent {
    /// A missing API key is not a startup error: the agent simply degrades
    /// every request to the placeholder report.
    pub fn from_config(config: &Config) -> Self {
        let backend: Option<Arc<dyn InsightBackend>> = config
            .openai_api_key
            .as_deref()
            .map(|key| {
                Arc::new(OpenAiBackend::new(key, &config.insight_model))
                    as Arc<dyn InsightBackend>
            });
        if backend.is_none() {
            tracing::warn!("no OPENAI_API_KEY configured, insights will degrade to placeholder");
        }
        Self {
            backend,
            timeout: config.insight_timeout,
        }
    }

    pub fn with_backend(backend: Arc<dyn InsightBackend>, timeout: Duration) -> Self {
        Self {
            backend: Some(backend),
            timeout,
        }
    }

    /// Dataset-level prose over the column names, row count, a small row
    /// sample, and the computed profile. Never fails.
    pub async fn dataset_insight(
        &self,
        dataset: &Dataset,
        profile: &DatasetProfile,
    ) -> InsightReport {
        let payload = DatasetInsightPayload {
            column_names: &dataset.columns,
            row_count: dataset.rows.len(),
            sample_rows: dataset.rows.iter().take(limits::SAMPLE_ROWS).collect(),
            profile,
        };
        let user_prompt = match serde_json::to_string(&payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("failed to serialize dataset insight payload: {e}");
                return InsightReport::unavailable();
            }
        };
        self.run(DATASET_SYSTEM_PROMPT, user_prompt).await
    }

    /// Point-level prose for one data point of one planned chart.
    pub async fn point_insight(
        &self,
        spec: &ChartSpec,
        point: &Value,
        total_rows: usize,
        column_profile: Option<&ColumnProfile>,
    ) -> InsightReport {
        let payload = PointInsightPayload {
            chart_kind: spec.kind,
            columns: &spec.columns,
            point,
            total_rows,
            column_profile,
        };
        let user_prompt = match serde_json::to_string(&payload) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("failed to serialize point insight payload: {e}");
                return InsightReport::unavailable();
            }
        };
        self.run(POINT_SYSTEM_PROMPT, user_prompt).await
    }

    async fn run(&self, system_prompt: &str, user_prompt: String) -> InsightReport {
        let Some(backend) = &self.backend else {
            return InsightReport::unavailable();
        };
        match tokio::time::timeout(self.timeout, backend.complete(system_prompt, &user_prompt))
            .await
        {
            Ok(Ok(text)) => parse_report(&text),
            Ok(Err(e)) => {
                tracing::warn!("insight backend failed: {e}");
                InsightReport::unavailable()
            }
            Err(_) => {
                tracing::warn!("insight backend timed out after {:?}", self.timeout);
                InsightReport::unavailable()
            }
        }
    }
}

/// Extract the structured report from a free-text response. A brace block
/// counts only when it parses as a JSON object carrying at least one of the
/// known report fields; anything else falls back to treating the whole
/// response as the summary.
pub fn parse_report(text: &str) -> InsightReport {
    if let Some(found) = JSON_BLOCK.find(text) {
        if let Ok(Value::Object(block)) = serde_json::from_str::<Value>(found.as_str()) {
            if REPORT_FIELDS.iter().any(|field| block.contains_key(*field)) {
                if let Ok(report) = serde_json::from_value(Value::Object(block)) {
                    return report;
                }
            }
        }
    }
    InsightReport {
        summary: text.trim().to_string(),
        ..InsightReport::default()
    }
}

const DATASET_SYSTEM_PROMPT: &str = "\
You are a data analyst. You receive a JSON payload describing a tabular \
dataset: its column names, row count, a few sample rows, and a statistical \
profile of every column. Write a short plain-language analysis of the data.

Respond with a JSON object of this shape:
{
  \"dataType\": \"one phrase naming what kind of data this is\",
  \"keyInsights\": [\"two to four notable observations\"],
  \"trends\": [\"patterns visible in the statistics\"],
  \"recommendations\": [\"suggested next analysis steps\"],
  \"summary\": \"two or three sentences summarizing the dataset\"
}";

const POINT_SYSTEM_PROMPT: &str = "\
You are a data analyst. You receive a JSON payload describing a single data \
point of one chart: the chart kind, the column(s) charted, the point itself, \
the dataset's total row count, and the charted column's statistical profile. \
Explain what this point means in context.

Respond with a JSON object of this shape:
{
  \"dataType\": \"one phrase naming what the charted column holds\",
  \"keyInsights\": [\"one to three observations about this point\"],
  \"trends\": [\"how the point relates to the column's distribution\"],
  \"recommendations\": [\"suggested follow-up questions\"],
  \"summary\": \"one or two sentences about this point\"
}";
