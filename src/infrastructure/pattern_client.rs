use crate::domain::models::SetupBundle;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use reqwest::Client;
use url::Url;

const GENERATIVE_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/";
const PATTERN_MODEL: &str = "gemini-3-pro-preview";
const THINKING_BUDGET_TOKENS: u32 = 4096;

/// Boundary to the hosted model that proposes one representative week of
/// training sessions. The returned JSON is untrusted; coercion into
/// canonical template sessions happens in the application layer.
#[async_trait]
pub trait PatternGeneratorClient: Send + Sync {
    async fn generate_weekly_pattern(
        &self,
        api_key: &str,
        bundle: &SetupBundle,
    ) -> Result<serde_json::Value, InfraError>;
}

#[derive(Debug, Clone, Default)]
pub struct ReqwestPatternClient {
    client: Client,
}

impl ReqwestPatternClient {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    fn ensure_non_empty(value: &str, field: &str) -> Result<(), InfraError> {
        if value.trim().is_empty() {
            return Err(InfraError::Generation(format!("{field} must not be empty")));
        }
        Ok(())
    }

    fn generation_http_error(status: reqwest::StatusCode, body: &str) -> InfraError {
        let message = if body.trim().is_empty() {
            format!("generative api error: http {}", status.as_u16())
        } else {
            format!("generative api error: http {}; body={body}", status.as_u16())
        };
        InfraError::Generation(message)
    }

    fn generate_endpoint() -> Result<Url, InfraError> {
        // The trailing `:generateContent` is part of the method name and must
        // stay a literal colon, so the path is assembled before parsing.
        Url::parse(&format!(
            "{GENERATIVE_API_BASE}models/{PATTERN_MODEL}:generateContent"
        ))
        .map_err(|error| {
            InfraError::Generation(format!("invalid generative api endpoint: {error}"))
        })
    }

    fn build_prompt(bundle: &SetupBundle) -> Result<String, InfraError> {
        let context = serde_json::to_string_pretty(bundle)?;
        Ok(format!(
            "You are the master scheduler for a university training-operations system.\n\
             \n\
             Context Data:\n{context}\n\
             \n\
             Tasks:\n\
             1. Create a training schedule for one representative week (Monday to Friday).\n\
             2. Merge department sections into batches of two (e.g. CSE-A + CSE-B = CSE-A+B).\n\
             3. Weekly load rule: each batch gets exactly TWO sessions per week, one TECHNICAL \
             topic picked from that department's curriculum list and one NON-TECHNICAL topic \
             (Aptitude or Soft Skills). Never schedule a generic 'Technical' topic.\n\
             4. Trainer matching: assign a trainer whose 'courses' list contains the session \
             topic; assume trainers are available for all slots. Leave trainerName empty only \
             when no listed trainer teaches the course.\n\
             5. Timing: semester 6 TECHNICAL sessions use the FULL_DAY rule; everything else \
             uses an FN or AN rule from the timings list.\n\
             6. Every session object MUST carry topic, batch, year (integer 1-4), venue, \
             trainerId, trainerName, date (YYYY-MM-DD within the upcoming week), startTime and \
             endTime (24-hour HH:MM).\n\
             \n\
             Output: a JSON array of session objects and nothing else."
        ))
    }
}

#[derive(Debug, serde::Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, serde::Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, serde::Deserialize)]
struct CandidateContent {
    parts: Option<Vec<CandidatePart>>,
}

#[derive(Debug, serde::Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[async_trait]
impl PatternGeneratorClient for ReqwestPatternClient {
    async fn generate_weekly_pattern(
        &self,
        api_key: &str,
        bundle: &SetupBundle,
    ) -> Result<serde_json::Value, InfraError> {
        Self::ensure_non_empty(api_key, "api key")?;

        let endpoint = Self::generate_endpoint()?;
        let prompt = Self::build_prompt(bundle)?;
        let request = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "thinkingConfig": { "thinkingBudget": THINKING_BUDGET_TOKENS }
            }
        });

        let response = self
            .client
            .post(endpoint)
            .header("x-goog-api-key", api_key.trim())
            .json(&request)
            .send()
            .await
            .map_err(|error| {
                InfraError::Generation(format!("network error while generating pattern: {error}"))
            })?;

        let status = response.status();
        let body = response.text().await.map_err(|error| {
            InfraError::Generation(format!("failed reading generation response: {error}"))
        })?;

        if !status.is_success() {
            return Err(Self::generation_http_error(status, &body));
        }

        let parsed: GenerateContentResponse = serde_json::from_str(&body).map_err(|error| {
            InfraError::Generation(format!("invalid generation payload: {error}; body={body}"))
        })?;

        let text = parsed
            .candidates
            .unwrap_or_default()
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .filter_map(|content| content.parts)
            .flatten()
            .filter_map(|part| part.text)
            .find(|text| !text.trim().is_empty())
            .ok_or_else(|| {
                InfraError::Generation("generation response contained no text part".to_string())
            })?;

        serde_json::from_str(&text).map_err(|error| {
            InfraError::Generation(format!("generated pattern is not valid JSON: {error}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_bundle() -> SetupBundle {
        SetupBundle {
            trainers: Vec::new(),
            venues: Vec::new(),
            curriculum: Vec::new(),
            timings: Vec::new(),
            training_types: Vec::new(),
            sections: Vec::new(),
        }
    }

    #[test]
    fn endpoint_targets_generate_content() {
        let endpoint = ReqwestPatternClient::generate_endpoint().expect("endpoint");
        assert_eq!(
            endpoint.as_str(),
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-3-pro-preview:generateContent"
        );
    }

    #[test]
    fn prompt_embeds_the_bundle() {
        let mut bundle = empty_bundle();
        bundle.curriculum.push(crate::domain::models::CurriculumMapping {
            department: "CSE".to_string(),
            semester: 6,
            courses: vec!["Java Full Stack".to_string()],
        });
        let prompt = ReqwestPatternClient::build_prompt(&bundle).expect("prompt");
        assert!(prompt.contains("Java Full Stack"));
        assert!(prompt.contains("JSON array"));
    }

    #[tokio::test]
    async fn empty_api_key_is_rejected() {
        let client = ReqwestPatternClient::new();
        let result = client.generate_weekly_pattern("  ", &empty_bundle()).await;
        assert!(matches!(result, Err(InfraError::Generation(_))));
    }
}
