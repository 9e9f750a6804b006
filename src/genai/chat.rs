use super::{GenerationRequest, Part, ResponseFormat, Turn};
use crate::models::{ChatMessage, MessageAuthor};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload, without the `data:` prefix.
    pub data: String,
}

/// Splits `data:<mime>;base64,<payload>` into its parts.
pub fn parse_data_url(url: &str) -> Option<InlineImage> {
    let rest = url.strip_prefix("data:")?;
    let (meta, data) = rest.split_once(',')?;
    let mime_type = meta.split(';').next().unwrap_or_default().trim();
    if mime_type.is_empty() || data.is_empty() || !meta.contains(";base64") {
        return None;
    }
    Some(InlineImage {
        mime_type: mime_type.to_string(),
        data: data.to_string(),
    })
}

/// Builds a chat turn request: prior messages become `user`/`model` turns and
/// `input` (with an optional image placed first) becomes the final user turn.
///
/// Messages with no text, such as an answer still being streamed, are skipped.
pub fn build_chat_request(
    system_instruction: &str,
    history: &[ChatMessage],
    input: &str,
    image_data_url: Option<&str>,
) -> GenerationRequest {
    let mut contents: Vec<Turn> = history
        .iter()
        .filter(|m| !m.text.trim().is_empty())
        .map(|m| match m.author {
            MessageAuthor::User => Turn::user(m.text.clone()),
            MessageAuthor::Ai => Turn::model(m.text.clone()),
        })
        .collect();

    let mut parts = Vec::with_capacity(2);
    if let Some(image) = image_data_url.and_then(parse_data_url) {
        parts.push(Part::Image(image));
    } else if image_data_url.is_some() {
        log::warn!("event=chat_image module=genai status=error reason=unsupported_data_url");
    }
    parts.push(Part::Text(input.to_string()));
    contents.push(Turn {
        role: super::Role::User,
        parts,
    });

    GenerationRequest {
        system_instruction: Some(system_instruction.to_string()),
        contents,
        response_format: ResponseFormat::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::super::Role;
    use super::*;

    #[test]
    fn test_parse_data_url() {
        let img = parse_data_url("data:image/png;base64,AAAA").expect("valid data url");
        assert_eq!(img.mime_type, "image/png");
        assert_eq!(img.data, "AAAA");
        assert!(parse_data_url("https://example.com/a.png").is_none());
        assert!(parse_data_url("data:image/png,plain").is_none());
        assert!(parse_data_url("data:;base64,AAAA").is_none());
    }

    #[test]
    fn test_build_chat_request_maps_roles_and_skips_empty() {
        let history = vec![
            ChatMessage::new(MessageAuthor::User, "what is retina?"),
            ChatMessage::new(MessageAuthor::Ai, "The retina is..."),
            ChatMessage::new(MessageAuthor::Ai, ""),
        ];
        let req = build_chat_request("tutor", &history, "and the macula?", None);
        assert_eq!(req.system_instruction.as_deref(), Some("tutor"));
        assert_eq!(req.contents.len(), 3);
        assert_eq!(req.contents[0].role, Role::User);
        assert_eq!(req.contents[1].role, Role::Model);
        assert_eq!(req.instruction(), "and the macula?");
    }

    #[test]
    fn test_build_chat_request_puts_image_first() {
        let req = build_chat_request(
            "tutor",
            &[],
            "Analyze this image.",
            Some("data:image/jpeg;base64,/9j/"),
        );
        let last = req.contents.last().expect("user turn");
        assert!(matches!(&last.parts[0], Part::Image(i) if i.mime_type == "image/jpeg"));
        assert!(matches!(&last.parts[1], Part::Text(t) if t == "Analyze this image."));
    }
}
