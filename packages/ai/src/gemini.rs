//! Google Gemini provider implementation.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use surfaced_venue_models::{LocalitySuggestions, MAX_SUGGESTED_LOCALITIES};

use crate::{AiError, LocalitySuggester, parse_suggestions};

/// Model used when `GEMINI_MODEL` is not set.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-exp";

const API_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini `generateContent` API provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    /// Creates a new Gemini provider.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the HTTP client cannot be built.
    pub fn new(api_key: String, model: String) -> Result<Self, AiError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            api_key,
            model,
            base_url: API_BASE_URL.to_string(),
            client,
        })
    }

    /// Creates a provider from `GEMINI_API_KEY` and `GEMINI_MODEL`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Config`] if `GEMINI_API_KEY` is not set, or
    /// [`AiError::Http`] if the HTTP client cannot be built.
    pub fn from_env() -> Result<Self, AiError> {
        let api_key = std::env::var("GEMINI_API_KEY").map_err(|_| AiError::Config {
            message: "GEMINI_API_KEY environment variable not set".to_string(),
        })?;
        let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        log::info!("Using Gemini model {model}");
        Self::new(api_key, model)
    }

    /// Answers a general question about Bengaluru in plain text.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the reply has no text.
    pub async fn answer_general_query(&self, query: &str) -> Result<String, AiError> {
        self.generate(&general_prompt(query)).await
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn generate(&self, prompt: &str) -> Result<String, AiError> {
        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        log::debug!("Sending generateContent request to {}", self.model);

        let resp = self
            .client
            .post(self.endpoint())
            .query(&[("key", &self.api_key)])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<GeminiError>(&text)
                .map_or(text, |e| e.error.message);
            return Err(AiError::Provider {
                message: format!("Gemini returned {status}: {message}"),
            });
        }

        let response: GenerateResponse = resp.json().await?;
        response_text(response)
    }
}

#[derive(Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Serialize, Deserialize)]
struct Part {
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct GeminiError {
    error: GeminiErrorDetail,
}

#[derive(Deserialize)]
struct GeminiErrorDetail {
    message: String,
}

/// Concatenates the text parts of the first candidate.
fn response_text(response: GenerateResponse) -> Result<String, AiError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| content.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(AiError::Format {
            message: "Gemini reply contained no text".to_string(),
        });
    }
    Ok(text)
}

fn locality_prompt(query: &str) -> String {
    format!(
        r#"You are a helpful assistant that understands natural language queries about locations in Bengaluru, India.

User Query: "{query}"

Please analyze this query and return a JSON response with the following structure:
{{
  "locations": [
    {{
      "name": "locality/area name",
      "coordinates": {{
        "latitude": number,
        "longitude": number
      }},
      "description": "brief description of the area",
      "category": "nightlife/residential/commercial/tech/etc",
      "tagline": "funny/witty tagline relevant to the user's query context"
    }}
  ],
  "query_type": "party_hubs/restaurants/tech_areas/shopping/etc",
  "search_terms": ["relevant", "search", "terms", "for", "venues"]
}}

Guidelines:
- Focus on well-known areas in Bengaluru
- Include accurate coordinates for each location
- For party/nightlife queries, include areas like Koramangala, Indiranagar, Brigade Road, UB City Mall, etc.
- For tech areas, include Whitefield, Electronic City, HSR Layout, etc.
- Limit to EXACTLY {MAX_SUGGESTED_LOCALITIES} most relevant locations
- search_terms should be specific venue types (e.g., ["pubs", "bars", "nightclubs"] for party queries)
- tagline should be funny, witty, and contextual to the user's query (e.g., for party queries: "Drunkard's Paradise", for coffee queries: "Caffeine Central", for tech queries: "Code Monkey Habitat")
- Keep taglines short (3-4 words max) and Bengaluru-specific when possible

Return ONLY the JSON response, no additional text."#
    )
}

fn general_prompt(query: &str) -> String {
    format!(
        "You are a helpful assistant for Bengaluru city information. \
         Answer the following query concisely and helpfully:\n\n\
         Query: \"{query}\"\n\n\
         Provide a brief, informative response about Bengaluru."
    )
}

#[async_trait::async_trait]
impl LocalitySuggester for GeminiProvider {
    async fn suggest_localities(&self, query: &str) -> Result<LocalitySuggestions, AiError> {
        let text = self.generate(&locality_prompt(query)).await?;
        log::debug!("Raw Gemini reply: {text}");

        let suggestions = parse_suggestions(&text)?;
        log::info!(
            "Gemini suggested {} localit{} for '{query}' ({})",
            suggestions.locations.len(),
            if suggestions.locations.len() == 1 { "y" } else { "ies" },
            suggestions.query_type
        );
        Ok(suggestions)
    }
}
