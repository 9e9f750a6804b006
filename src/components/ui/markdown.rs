use crate::util::render_markdown;
use leptos::prelude::*;
use tw_merge::tw_merge;

/// Renders model-written markdown.
#[component]
pub fn Markdown(
    #[prop(into)] content: Signal<String>,
    #[prop(into, optional)] class: String,
) -> impl IntoView {
    let merged_class = tw_merge!(
        "prose prose-sm max-w-none dark:prose-invert [&_table]:w-full [&_td]:border [&_th]:border [&_td]:px-2 [&_th]:px-2",
        class
    );

    view! { <div data-name="Markdown" class=merged_class inner_html=move || render_markdown(&content.get())></div> }
}
