//! Optional AI assistance over an OpenAI-compatible chat completion API.
//!
//! The client only reads diff results; it never alters a change set or a
//! plan. Generated DDL is handed back as text for the caller to validate.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use serde::{Deserialize, Serialize};
use sql_diff_core::{BatchReport, Plan};
use tracing::debug;

use crate::config::AiConfig;

const SYSTEM_PROMPT: &str = "You are a senior database architect and SQL expert, \
     experienced in table design and schema migrations.";

/// Supported providers. Both speak the OpenAI chat completion protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// `DeepSeek`.
    DeepSeek,
    /// `OpenAI` or any compatible endpoint.
    OpenAi,
}

impl FromStr for Provider {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "deepseek" => Ok(Self::DeepSeek),
            "openai" => Ok(Self::OpenAi),
            other => bail!("unsupported AI provider '{other}', expected deepseek or openai"),
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DeepSeek => "deepseek",
            Self::OpenAi => "openai",
        })
    }
}

/// Structured analysis of a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Analysis {
    /// Free-form overview.
    pub summary: String,
    /// Improvement suggestions.
    pub suggestions: Vec<String>,
    /// Migration risks.
    pub risks: Vec<String>,
    /// Best practices that apply.
    pub best_practices: Vec<String>,
}

impl Analysis {
    /// Returns true when the analysis holds no text at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.suggestions.is_empty()
            && self.risks.is_empty()
            && self.best_practices.is_empty()
    }
}

// ================================================================
// Client
// ================================================================

/// Chat completion client.
pub struct AiClient {
    provider: Provider,
    endpoint: String,
    api_key: String,
    model: String,
    http_client: reqwest::Client,
}

impl AiClient {
    /// Builds a client from configuration.
    ///
    /// # Errors
    ///
    /// Fails on an unknown provider or when the HTTP client cannot be built.
    pub fn new(config: &AiConfig) -> Result<Self> {
        let provider = config.provider.parse()?;
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()?;
        Ok(Self {
            provider,
            endpoint: config.api_endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            http_client,
        })
    }

    /// Provider in use.
    #[must_use]
    pub const fn provider(&self) -> Provider {
        self.provider
    }

    /// Asks for an analysis of the differences between two schemas.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the response is malformed.
    pub async fn analyze(
        &self,
        source_ddl: &str,
        target_ddl: &str,
        report: &BatchReport,
        plan: &Plan,
    ) -> Result<Analysis> {
        let prompt = analysis_prompt(source_ddl, target_ddl, report, plan);
        let response = self.chat(&prompt).await?;
        Ok(parse_analysis(&response))
    }

    /// Drafts a `CREATE TABLE` statement from a description.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the response is malformed.
    pub async fn generate_create_table(&self, description: &str) -> Result<String> {
        let prompt = format!(
            "Write one CREATE TABLE statement for the following requirement.\n\n\
             Requirement:\n{description}\n\n\
             Rules:\n\
             1. The statement must be complete and directly executable.\n\
             2. Pick sensible types: sized VARCHAR, DECIMAL for money.\n\
             3. Declare the primary key, indexes, defaults and comments.\n\
             4. Use snake_case for table and column names.\n\
             5. Return only the SQL, without explanations.\n"
        );
        let response = self.chat(&prompt).await?;
        Ok(clean_sql_response(&response))
    }

    /// Drafts `ALTER TABLE` statements turning `current_ddl` into what the
    /// description asks for.
    ///
    /// # Errors
    ///
    /// Fails when the request fails or the response is malformed.
    pub async fn generate_alter_table(&self, current_ddl: &str, description: &str) -> Result<String> {
        let prompt = format!(
            "Write the ALTER TABLE statements that apply the requested change to \
             the existing table.\n\n\
             Existing table:\n{current_ddl}\n\n\
             Requested change:\n{description}\n\n\
             Rules:\n\
             1. Statements must be complete and directly executable.\n\
             2. Put each statement on its own line.\n\
             3. Keep existing data safe; prefer compatible type changes.\n\
             4. Return only the SQL, without explanations.\n"
        );
        let response = self.chat(&prompt).await?;
        Ok(clean_sql_response(&response))
    }

    async fn chat(&self, prompt: &str) -> Result<String> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt}
            ],
            "stream": false
        });

        let url = completions_url(&self.endpoint);
        debug!(provider = %self.provider, url = %url, "Sending chat completion request");

        let resp = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;

        if !status.is_success() {
            return Err(anyhow!("{} API error ({}): {}", self.provider, status, text));
        }

        let json: serde_json::Value = serde_json::from_str(&text)?;
        extract_content(&json)
    }
}

/// URL of the chat completion route under `endpoint`.
#[must_use]
pub fn completions_url(endpoint: &str) -> String {
    format!("{}/chat/completions", endpoint.trim_end_matches('/'))
}

/// Message content of the first choice.
///
/// # Errors
///
/// Fails when the response has no choices.
pub fn extract_content(json: &serde_json::Value) -> Result<String> {
    json["choices"][0]["message"]["content"]
        .as_str()
        .map(ToString::to_string)
        .ok_or_else(|| anyhow!("API returned an empty response"))
}

fn analysis_prompt(source_ddl: &str, target_ddl: &str, report: &BatchReport, plan: &Plan) -> String {
    let ddl = if plan.is_empty() {
        "(none)".to_string()
    } else {
        plan.to_sql()
    };
    format!(
        "Analyze the differences between the two table definitions below and \
         give practical advice.\n\n\
         Source schema:\n{source_ddl}\n\n\
         Target schema:\n{target_ddl}\n\n\
         Detected differences:\n{report}\n\
         Migration DDL ({dialect}):\n{ddl}\n\n\
         Answer in Markdown with these sections:\n\n\
         ## Summary\n[short overview of the main differences]\n\n\
         ## Suggestions\n- [suggestion]\n\n\
         ## Risks\n- [risk]\n\n\
         ## Best Practices\n- [practice]\n",
        dialect = plan.dialect,
    )
}

// ================================================================
// Response parsing
// ================================================================

#[derive(Clone, Copy)]
enum Section {
    Summary,
    Suggestions,
    Risks,
    BestPractices,
}

fn section_of(heading: &str) -> Option<Section> {
    let heading = heading.to_ascii_lowercase();
    if heading.contains("summary") || heading.contains("difference") || heading.contains("overview") {
        Some(Section::Summary)
    } else if heading.contains("suggestion") || heading.contains("recommendation") {
        Some(Section::Suggestions)
    } else if heading.contains("risk") {
        Some(Section::Risks)
    } else if heading.contains("practice") {
        Some(Section::BestPractices)
    } else {
        None
    }
}

fn bullet(line: &str) -> Option<String> {
    line.strip_prefix('-')
        .or_else(|| line.strip_prefix('*'))
        .map(|rest| rest.trim().to_string())
}

/// Splits a Markdown answer into an [`Analysis`]. `##` headings select the
/// section and `-`/`*` bullets become items. An answer without a summary
/// or suggestions becomes the summary as a whole.
#[must_use]
pub fn parse_analysis(response: &str) -> Analysis {
    let mut analysis = Analysis::default();
    let mut section = None;

    for line in response.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if line.starts_with("##") {
            if let Some(next) = section_of(line) {
                section = Some(next);
            }
            continue;
        }
        match section {
            Some(Section::Summary) => {
                if !line.starts_with('#') {
                    if !analysis.summary.is_empty() {
                        analysis.summary.push('\n');
                    }
                    analysis.summary.push_str(line);
                }
            }
            Some(Section::Suggestions) => analysis.suggestions.extend(bullet(line)),
            Some(Section::Risks) => analysis.risks.extend(bullet(line)),
            Some(Section::BestPractices) => analysis.best_practices.extend(bullet(line)),
            None => {}
        }
    }

    if analysis.summary.is_empty() && analysis.suggestions.is_empty() {
        analysis.summary = response.to_string();
    }
    analysis
}

/// Extracts SQL from a chat answer: code fences are removed and, when a
/// `CREATE TABLE` or `ALTER TABLE` line is present, the text from that line
/// up to the first line ending in `;` is kept. The trailing `;` is dropped.
#[must_use]
pub fn clean_sql_response(response: &str) -> String {
    let text = response
        .replace("```sql", "")
        .replace("```mysql", "")
        .replace("```", "");
    let text = text.trim();

    let mut sql_lines = Vec::new();
    let mut in_sql = false;
    for line in text.lines() {
        let trimmed = line.trim();
        let upper = trimmed.to_ascii_uppercase();
        if upper.starts_with("CREATE TABLE") || upper.starts_with("ALTER TABLE") {
            in_sql = true;
        }
        if in_sql {
            sql_lines.push(line);
            if trimmed.ends_with(';') {
                break;
            }
        }
    }

    let sql = if sql_lines.is_empty() {
        text.to_string()
    } else {
        sql_lines.join("\n")
    };
    let sql = sql.trim();
    sql.strip_suffix(';').unwrap_or(sql).to_string()
}
