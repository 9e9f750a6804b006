use pulldown_cmark::{html, Event, Options, Parser, Tag, TagEnd};

/// Markdown to sanitized HTML for `inner_html`. Model output is untrusted, so
/// raw HTML in it is cleaned.
pub fn render_markdown(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    let parser = Parser::new_ext(content, options);
    let mut html_output = String::new();
    html::push_html(&mut html_output, parser);
    ammonia::clean(&html_output)
}

/// Bodies of the fenced and indented code blocks in `content`, in order.
pub fn code_blocks(content: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current: Option<String> = None;
    for event in Parser::new(content) {
        match event {
            Event::Start(Tag::CodeBlock(_)) => current = Some(String::new()),
            Event::Text(text) => {
                if let Some(block) = current.as_mut() {
                    block.push_str(&text);
                }
            }
            Event::End(TagEnd::CodeBlock) => {
                if let Some(block) = current.take() {
                    blocks.push(block.trim_end_matches('\n').to_string());
                }
            }
            _ => {}
        }
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_render() {
        let html = render_markdown("| Sign | Meaning |\n|---|---|\n| Cupping | Glaucoma |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>Cupping</td>"));
    }

    #[test]
    fn test_code_blocks_in_order() {
        let text = "Use this:\n\n```python\nprint('VA')\nprint('IOP')\n```\n\nThen `inline` and\n\n```\nx = 1\n```\n";
        assert_eq!(code_blocks(text), vec!["print('VA')\nprint('IOP')", "x = 1"]);
        assert!(code_blocks("No code, only `inline`.").is_empty());
    }

    #[test]
    fn test_script_is_stripped() {
        let html = render_markdown("**IOP**<script>alert(1)</script>");
        assert!(html.contains("<strong>IOP</strong>"));
        assert!(!html.contains("<script>"));
    }
}
