use super::{
    GenerationError, GenerationRequest, GenerationResult, Part, ResponseFormat, SseDecoder,
    TextGenerator, Turn,
};
use crate::config::EnvConfig;
use futures::stream::{self, LocalBoxStream};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;

/// REST client for the Gemini `generateContent` family of endpoints.
#[derive(Clone, Debug)]
pub struct GeminiClient {
    pub api_url: String,
    pub model: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(api_url: impl Into<String>, model: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            api_url: api_url.into(),
            model: model.into(),
            api_key,
        }
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(
            config.gemini_api_url.clone(),
            config.gemini_model.clone(),
            config.gemini_api_key.clone(),
        )
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1beta/models/{}:{}", self.api_url, self.model, method)
    }

    fn key(&self) -> GenerationResult<String> {
        self.api_key
            .clone()
            .ok_or_else(|| GenerationError::NotConfigured("GEMINI_API_KEY is not set".into()))
    }
}

// --- wire format ---

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct InlineDataBody {
    mime_type: String,
    data: String,
}

#[derive(Serialize, Debug)]
#[serde(untagged)]
enum PartBody {
    Text {
        text: String,
    },
    Inline {
        #[serde(rename = "inlineData")]
        inline_data: InlineDataBody,
    },
}

#[derive(Serialize, Debug)]
struct ContentBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<PartBody>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerationConfigBody {
    response_mime_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<ContentBody>,
    contents: Vec<ContentBody>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfigBody>,
}

fn part_body(part: &Part) -> PartBody {
    match part {
        Part::Text(text) => PartBody::Text { text: text.clone() },
        Part::Image(img) => PartBody::Inline {
            inline_data: InlineDataBody {
                mime_type: img.mime_type.clone(),
                data: img.data.clone(),
            },
        },
    }
}

fn content_body(turn: &Turn) -> ContentBody {
    ContentBody {
        role: Some(turn.role.as_wire()),
        parts: turn.parts.iter().map(part_body).collect(),
    }
}

fn request_body(request: &GenerationRequest) -> GenerateContentBody {
    GenerateContentBody {
        system_instruction: request.system_instruction.as_ref().map(|s| ContentBody {
            role: None,
            parts: vec![PartBody::Text { text: s.clone() }],
        }),
        contents: request.contents.iter().map(content_body).collect(),
        generation_config: match &request.response_format {
            ResponseFormat::Text => None,
            ResponseFormat::Json { schema } => Some(GenerationConfigBody {
                response_mime_type: "application/json",
                response_schema: schema.clone(),
            }),
        },
    }
}

#[derive(Deserialize, Debug, Default)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    #[serde(default)]
    content: Option<ResponseContent>,
}

#[derive(Deserialize, Debug)]
struct ServiceErrorBody {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize, Debug)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    error: Option<ServiceErrorBody>,
}

impl GenerateContentResponse {
    fn text(&self) -> String {
        self.candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default()
    }
}

/// Text carried by one streamed event. `Ok(None)` for events without text.
fn chunk_text(event: &str) -> GenerationResult<Option<String>> {
    let parsed: GenerateContentResponse =
        serde_json::from_str(event).map_err(|e| GenerationError::Malformed(e.to_string()))?;
    if let Some(err) = parsed.error {
        return Err(GenerationError::Service {
            status: err.code,
            body: err.message,
        });
    }
    let text = parsed.text();
    Ok(if text.is_empty() { None } else { Some(text) })
}

async fn post(url: &str, key: &str, body: &GenerateContentBody) -> GenerationResult<reqwest::Response> {
    let client = reqwest::Client::new();
    let res = client
        .post(url)
        .header("x-goog-api-key", key)
        .json(body)
        .send()
        .await
        .map_err(|e| GenerationError::Network(e.to_string()))?;

    if res.status().is_success() {
        Ok(res)
    } else {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        log::error!("event=generation_request module=genai status=error http_status={status}");
        Err(GenerationError::Service { status, body })
    }
}

struct SseState<S> {
    bytes: Pin<Box<S>>,
    decoder: SseDecoder,
    ended: bool,
    failed: bool,
}

fn sse_text_stream<S, B, E>(bytes: S) -> impl Stream<Item = GenerationResult<String>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let state = SseState {
        bytes: Box::pin(bytes),
        decoder: SseDecoder::new(),
        ended: false,
        failed: false,
    };

    stream::unfold(state, |mut st| async move {
        loop {
            if st.failed {
                return None;
            }
            let event = match st.decoder.next_event() {
                Some(e) => Some(e),
                None if st.ended => st.decoder.finish(),
                None => None,
            };
            if let Some(event) = event {
                match chunk_text(&event) {
                    Ok(Some(text)) => return Some((Ok(text), st)),
                    Ok(None) => continue,
                    Err(e) => {
                        st.failed = true;
                        return Some((Err(e), st));
                    }
                }
            }
            if st.ended {
                return None;
            }
            match st.bytes.next().await {
                Some(Ok(chunk)) => st.decoder.push(chunk.as_ref()),
                Some(Err(e)) => {
                    st.failed = true;
                    return Some((Err(GenerationError::Network(e.to_string())), st));
                }
                None => st.ended = true,
            }
        }
    })
}

impl TextGenerator for GeminiClient {
    async fn generate_text(&self, request: &GenerationRequest) -> GenerationResult<String> {
        let key = self.key()?;
        let body = request_body(request);
        let res = post(&self.endpoint("generateContent"), &key, &body).await?;
        let parsed: GenerateContentResponse = res
            .json()
            .await
            .map_err(|e| GenerationError::Malformed(e.to_string()))?;
        let text = parsed.text();
        if text.trim().is_empty() {
            return Err(GenerationError::Empty);
        }
        log::debug!(
            "event=generation_request module=genai status=ok chars={}",
            text.len()
        );
        Ok(text)
    }

    fn stream_text(
        &self,
        request: &GenerationRequest,
    ) -> LocalBoxStream<'static, GenerationResult<String>> {
        let key = match self.key() {
            Ok(k) => k,
            Err(e) => return stream::once(async move { Err(e) }).boxed_local(),
        };
        let url = format!("{}?alt=sse", self.endpoint("streamGenerateContent"));
        let body = request_body(request);

        stream::once(async move { post(&url, &key, &body).await })
            .flat_map(|opened| match opened {
                Ok(res) => sse_text_stream(res.bytes_stream()).boxed_local(),
                Err(e) => stream::once(async move { Err(e) }).boxed_local(),
            })
            .boxed_local()
    }
}
