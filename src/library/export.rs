use crate::models::{CaseStudy, Flow, GuidedStudySession, Note};
use crate::util::{file_stem, leading_heading, new_id};

pub const TAG_STUDY_SESSION: &str = "study-session";
pub const TAG_CASE_STUDY: &str = "case-study";
pub const TAG_FLOW: &str = "flow";
pub const TAG_CANVAS: &str = "canvas";
pub const UNTITLED_NOTE: &str = "AI Generated Note";

/// A note that has not been placed in a folder yet.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteDraft {
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
}

impl NoteDraft {
    pub fn into_note(self, folder_id: impl Into<String>, now_ms: i64) -> Note {
        Note {
            id: new_id(),
            title: self.title,
            content: self.content,
            created_at: now_ms,
            last_edited_at: None,
            tags: self.tags,
            folder_id: folder_id.into(),
        }
    }
}

/// Study session with the student's answers, one review block per section.
pub fn session_note(session: &GuidedStudySession, answers: &[Option<String>]) -> NoteDraft {
    let sections: Vec<String> = session
        .sections
        .iter()
        .enumerate()
        .map(|(i, section)| {
            let given = answers
                .get(i)
                .and_then(|a| a.as_deref())
                .unwrap_or("Not Answered");
            format!(
                "## {title}\n\n{content}\n\n---\n\n### Question & Review\n\n**Question:** {question}\n\n\
                 *   **Your Answer:** {given}\n*   **Correct Answer:** {answer}\n*   **Explanation:** {explanation}",
                title = section.sub_topic_title,
                content = section.content,
                question = section.question.question,
                answer = section.question.answer,
                explanation = section.question.explanation,
            )
        })
        .collect();

    NoteDraft {
        title: format!("Session: {}", session.title),
        content: format!(
            "# Study Session: {}\n\n{}",
            session.title,
            sections.join("\n\n---\n\n")
        ),
        tags: vec![TAG_STUDY_SESSION.to_string()],
    }
}

/// Case sections as `## title` blocks; the text the case tutor is grounded on.
pub fn case_content(case: &CaseStudy) -> String {
    case.sections
        .iter()
        .map(|s| format!("## {}\n{}", s.section_title, s.content))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn case_note(case: &CaseStudy) -> NoteDraft {
    let sections: Vec<String> = case
        .sections
        .iter()
        .map(|s| match &s.question {
            Some(q) => format!(
                "## {}\n\n{}\n\n### Question\n**{}**",
                s.section_title, s.content, q.question_text
            ),
            None => format!("## {}\n\n{}", s.section_title, s.content),
        })
        .collect();

    NoteDraft {
        title: format!("Case: {}", case.case_title),
        content: format!(
            "# Case Study: {}\n\n**Patient Summary:** {}\n\n---\n\n{}",
            case.case_title,
            case.patient_summary,
            sections.join("\n\n---\n\n")
        ),
        tags: vec![TAG_CASE_STUDY.to_string()],
    }
}

pub fn flow_note(flow: &Flow) -> NoteDraft {
    let mut tags = vec![TAG_FLOW.to_string()];
    if !flow.sub_topic.trim().is_empty() {
        tags.push(flow.sub_topic.clone());
    }
    NoteDraft {
        title: format!("Flow: {}", flow.title),
        content: format!("# {}\n\n{}", flow.title, flow.content),
        tags,
    }
}

/// Canvas document. A `# title` heading is added unless the body already has one.
pub fn canvas_note(title: &str, content: &str) -> NoteDraft {
    let content = if leading_heading(content).is_some() {
        content.to_string()
    } else {
        format!("# {title}\n\n{content}")
    };
    NoteDraft {
        title: format!("{title} (Canvas)"),
        content,
        tags: vec![TAG_CANVAS.to_string()],
    }
}

pub const MARKDOWN_MIME: &str = "text/markdown;charset=utf-8";

/// A document offered as a browser download.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExportFile {
    pub file_name: String,
    pub mime: &'static str,
    pub body: String,
}

/// Canvas body as a `.md` file named after its title.
pub fn canvas_file(title: &str, content: &str) -> ExportFile {
    ExportFile {
        file_name: format!("{}.md", file_stem(title)),
        mime: MARKDOWN_MIME,
        body: content.to_string(),
    }
}

/// Assistant answer saved verbatim; titled by its leading heading.
pub fn chat_message_note(text: &str) -> NoteDraft {
    NoteDraft {
        title: leading_heading(text).unwrap_or_else(|| UNTITLED_NOTE.to_string()),
        content: text.to_string(),
        tags: vec![],
    }
}
