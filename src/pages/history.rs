use crate::components::ui::{Button, ButtonSize, ButtonVariant, CardItem, CardList, Input};
use crate::library::filter_history;
use crate::models::{HistoryItem, HistoryKind};
use crate::state::{AppContext, Tool};
use crate::util::format_day;
use leptos::prelude::*;

const KIND_FILTERS: [(Option<HistoryKind>, &str); 3] = [
    (None, "All"),
    (Some(HistoryKind::Chat), "Chats"),
    (Some(HistoryKind::CaseStudy), "Case Studies"),
];

#[component]
pub fn HistoryPage() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let kind: RwSignal<Option<HistoryKind>> = RwSignal::new(None);
    let search = RwSignal::new(String::new());
    let renaming: RwSignal<Option<String>> = RwSignal::new(None);
    let rename_to = RwSignal::new(String::new());

    let entries = Memo::new(move |_| {
        let query = search.get();
        let kind = kind.get();
        app.store.with(|s| {
            filter_history(s.history(), kind, &query)
                .into_iter()
                .cloned()
                .collect::<Vec<HistoryItem>>()
        })
    });

    let open = move |item: &HistoryItem| match item.kind() {
        HistoryKind::Chat => {
            app.current_chat.set(Some(item.id().to_string()));
            app.open_tool(Tool::Assistant);
        }
        HistoryKind::CaseStudy => {
            app.opened_case.set(Some(item.id().to_string()));
            app.open_tool(Tool::CaseStudies);
        }
    };

    let finish_rename = move |id: String| {
        let title = rename_to.get_untracked();
        if !title.trim().is_empty() {
            app.persist(|s| s.rename_history(&id, title.trim()));
        }
        renaming.set(None);
    };

    let delete = move |id: String| {
        app.persist(|s| s.delete_history(&id));
        if app.current_chat.get_untracked().as_deref() == Some(id.as_str()) {
            app.current_chat.set(None);
        }
    };

    view! {
        <div class="mx-auto flex w-full max-w-3xl flex-col gap-4">
            <h2 class="text-lg font-semibold">"History"</h2>
            <div class="flex flex-wrap items-center gap-2">
                {move || {
                    let current = kind.get();
                    KIND_FILTERS
                        .into_iter()
                        .map(|(value, label)| {
                            let variant = if current == value { ButtonVariant::Selected } else { ButtonVariant::Outline };
                            view! {
                                <Button size=ButtonSize::Sm variant=variant on:click=move |_| kind.set(value)>
                                    {label}
                                </Button>
                            }
                        })
                        .collect_view()
                }}
                <Input r#type="search" placeholder="Search history…" bind_value=search class="h-8 max-w-xs text-sm" />
            </div>
            <Show
                when=move || !entries.with(Vec::is_empty)
                fallback=|| view! { <div class="text-sm text-muted-foreground">"Nothing here yet."</div> }
            >
                <CardList>
                    {move || {
                        let editing = renaming.get();
                        entries
                            .get()
                            .into_iter()
                            .map(|item| {
                                let id = item.id().to_string();
                                let badge = match item.kind() {
                                    HistoryKind::Chat => "Chat",
                                    HistoryKind::CaseStudy => "Case Study",
                                };
                                let day = format_day(item.created_at());
                                if editing.as_deref() == Some(id.as_str()) {
                                    let save_id = id.clone();
                                    return view! {
                                        <CardItem>
                                            <Input bind_value=rename_to class="h-8 text-sm" />
                                            <Button size=ButtonSize::Sm on:click=move |_| finish_rename(save_id.clone())>"Save"</Button>
                                            <Button size=ButtonSize::Sm variant=ButtonVariant::Ghost on:click=move |_| renaming.set(None)>
                                                "Cancel"
                                            </Button>
                                        </CardItem>
                                    }
                                    .into_any();
                                }
                                let title = item.title().to_string();
                                let current_title = title.clone();
                                let rename_id = id.clone();
                                let item = StoredValue::new(item);
                                view! {
                                    <CardItem>
                                        <button
                                            class="flex min-w-0 flex-1 flex-col text-left"
                                            on:click=move |_| item.with_value(open)
                                        >
                                            <span class="truncate text-sm font-medium">{title}</span>
                                            <span class="text-xs text-muted-foreground">{format!("{badge} · {day}")}</span>
                                        </button>
                                        <Button
                                            size=ButtonSize::Badge
                                            variant=ButtonVariant::Ghost
                                            attr:title="Rename"
                                            on:click=move |_| {
                                                rename_to.set(current_title.clone());
                                                renaming.set(Some(rename_id.clone()));
                                            }
                                        >
                                            "✎"
                                        </Button>
                                        <Button
                                            size=ButtonSize::Badge
                                            variant=ButtonVariant::Ghost
                                            attr:title="Delete"
                                            on:click=move |_| delete(id.clone())
                                        >
                                            "✕"
                                        </Button>
                                    </CardItem>
                                }
                                .into_any()
                            })
                            .collect_view()
                    }}
                </CardList>
            </Show>
        </div>
    }
}
