use crate::genai::{GenerationError, GenerationResult, TextGenerator};
use crate::models::{Folder, Note, GENERAL_FOLDER_ID};
use crate::prompts::{study_notes_request, NoteOptions};
use crate::util::new_id;

/// Generates markdown notes on `keywords`, titled by the keywords and filed
/// under `active_folder` when it still exists, otherwise under `general`.
pub async fn generate_study_note<G: TextGenerator>(
    generator: &G,
    keywords: &str,
    options: &NoteOptions,
    folders: &[Folder],
    active_folder: Option<&str>,
    now_ms: i64,
) -> GenerationResult<Note> {
    let keywords = keywords.trim();
    if keywords.is_empty() {
        return Err(GenerationError::Malformed("no keywords given".into()));
    }
    let content = generator
        .generate_text(&study_notes_request(keywords, options))
        .await?;
    let content = content.trim();
    if content.is_empty() {
        return Err(GenerationError::Empty);
    }

    let folder_id = active_folder
        .filter(|id| folders.iter().any(|f| f.id == *id))
        .unwrap_or(GENERAL_FOLDER_ID);
    log::info!("event=study_note module=study_notes status=ok folder={folder_id}");
    Ok(Note {
        id: new_id(),
        title: keywords.to_string(),
        content: content.to_string(),
        created_at: now_ms,
        last_edited_at: None,
        tags: vec![],
        folder_id: folder_id.to_string(),
    })
}
