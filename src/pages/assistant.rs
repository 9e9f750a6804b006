use super::{picked_file, read_as_data_url, CopyButton, SaveToNotes};
use crate::components::ui::{
    BusyLabel, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription, CardHeader,
    CardTitle, ErrorAlert, Input, Label, Markdown, Spinner, SpinnerCircle, Textarea,
};
use crate::features::assistant::{
    canvas_placeholder, edit_canvas_selection, generate_canvas, new_chat_session, selection_range,
    send_turn, set_canvas_content, settle_canvas, ChatLog, Outgoing, NEW_CHAT_TITLE,
};
use crate::library::{canvas_file, canvas_note, chat_message_note};
use crate::models::{CanvasState, ChatMessage, HistoryItem, MessageAuthor};
use crate::prompts::{AiEditAction, CanvasEditAction};
use crate::state::{AppContext, AppState};
use crate::util::browser::download_text;
use crate::util::{code_blocks, now_ms};
use leptos::html;
use leptos::prelude::*;
use leptos::task::spawn_local;
use strum::IntoEnumIterator;

/// Id of the open chat, creating a fresh one when none is open or the open
/// one was deleted.
fn ensure_session(app: AppState) -> String {
    let existing = app.current_chat.get_untracked().filter(|id| {
        app.store
            .with_untracked(|s| s.history_item(id).and_then(HistoryItem::as_chat).is_some())
    });
    if let Some(id) = existing {
        return id;
    }
    let session = new_chat_session(now_ms());
    let id = session.id().to_string();
    app.persist(|s| s.insert_history(session));
    app.current_chat.set(Some(id.clone()));
    id
}

#[component]
pub fn AssistantPage() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let input = RwSignal::new(String::new());
    let canvas_topic = RwSignal::new(String::new());
    let custom_instructions = RwSignal::new(String::new());
    let show_instructions = RwSignal::new(false);
    let busy = RwSignal::new(false);
    let open_canvas: RwSignal<Option<String>> = RwSignal::new(None);

    let messages = Memo::new(move |_| {
        let id = app.current_chat.get();
        app.store.with(|s| {
            id.and_then(|id| s.history_item(&id).and_then(HistoryItem::as_chat).map(|c| c.messages.clone()))
                .unwrap_or_default()
        })
    });
    let title = move || {
        let id = app.current_chat.get();
        app.store.with(|s| {
            id.and_then(|id| s.history_item(&id).map(|h| h.title().to_string()))
                .unwrap_or_else(|| NEW_CHAT_TITLE.to_string())
        })
    };

    let send = move |outgoing: Outgoing| {
        if busy.get_untracked() {
            return;
        }
        let session_id = ensure_session(app);
        let Some(session) = app.store.with_untracked(|s| {
            s.history_item(&session_id).and_then(HistoryItem::as_chat).cloned()
        }) else {
            return;
        };
        let generator = app.generator();
        let custom = custom_instructions.get_untracked();
        busy.set(true);

        spawn_local(async move {
            let custom = Some(custom.trim()).filter(|c| !c.is_empty());
            let _ = send_turn(&generator, &app, &session, &outgoing, custom).await;
            busy.set(false);
        });
    };

    let send_typed = move || {
        let text = input.get_untracked();
        if text.trim().is_empty() || busy.get_untracked() {
            return;
        }
        input.set(String::new());
        send(Outgoing::typed(text));
    };

    let on_image = move |ev: web_sys::Event| {
        if let Some(file) = picked_file(&ev) {
            read_as_data_url(&file, move |url| send(Outgoing::image(url)));
        }
    };

    let create_canvas = move |_| {
        let topic = canvas_topic.get_untracked().trim().to_string();
        if topic.is_empty() {
            return;
        }
        canvas_topic.set(String::new());
        let session_id = ensure_session(app);
        let placeholder = canvas_placeholder(&topic);
        let message_id = placeholder.id.clone();
        app.push_message(&session_id, placeholder);
        let generator = app.generator();

        spawn_local(async move {
            let outcome = generate_canvas(&generator, &topic).await;
            app.update_message(&session_id, &message_id, |m| settle_canvas(m, outcome));
        });
    };

    let new_chat = move |_| {
        app.current_chat.set(None);
        open_canvas.set(None);
        ensure_session(app);
    };

    view! {
        <div class="mx-auto flex w-full max-w-3xl flex-col gap-4">
            <div class="flex items-center justify-between gap-2">
                <h2 class="truncate text-lg font-semibold">{title}</h2>
                <div class="flex gap-2">
                    <Button
                        size=ButtonSize::Sm
                        variant=ButtonVariant::Ghost
                        on:click=move |_| show_instructions.update(|v| *v = !*v)
                    >
                        "Custom instructions"
                    </Button>
                    <Button size=ButtonSize::Sm variant=ButtonVariant::Outline on:click=new_chat>
                        "New Chat"
                    </Button>
                </div>
            </div>

            <Show when=move || show_instructions.get() fallback=|| ().into_view()>
                <Textarea
                    placeholder="Extra instructions for the assistant, e.g. answer in short bullet points"
                    bind_value=custom_instructions
                    rows=2
                />
            </Show>

            {move || match open_canvas.get() {
                Some(message_id) => view! { <CanvasEditor message_id on_close=move || open_canvas.set(None) /> }.into_any(),
                None => ().into_view().into_any(),
            }}

            <div class="flex flex-col gap-4">
                <Show
                    when=move || !messages.with(Vec::is_empty)
                    fallback=|| view! {
                        <div class="py-16 text-center text-sm text-muted-foreground">
                            "Ask about eye anatomy, pathology, optics or contact lenses, or upload a clinical image."
                        </div>
                    }
                >
                    {move || {
                        messages
                            .get()
                            .into_iter()
                            .map(|message| view! {
                                <MessageView message busy=busy send=send open_canvas=open_canvas />
                            })
                            .collect_view()
                    }}
                </Show>
            </div>

            <div class="sticky bottom-0 flex flex-col gap-2 rounded-xl border bg-background p-3 shadow-sm">
                <Textarea
                    placeholder="Ask a question or upload an image..."
                    bind_value=input
                    rows=2
                    on:keydown=move |ev: web_sys::KeyboardEvent| {
                        if ev.key() == "Enter" && !ev.shift_key() {
                            ev.prevent_default();
                            send_typed();
                        }
                    }
                />
                <div class="flex flex-wrap items-center gap-2">
                    <label class="cursor-pointer text-xs text-muted-foreground hover:text-foreground">
                        "Attach image"
                        <input type="file" accept="image/*" class="hidden" disabled=move || busy.get() on:change=on_image />
                    </label>
                    <div class="ml-auto flex items-center gap-2">
                        <Input placeholder="Canvas topic" bind_value=canvas_topic class="h-8 w-44 text-sm" />
                        <Button
                            size=ButtonSize::Sm
                            variant=ButtonVariant::Outline
                            attr:disabled=move || canvas_topic.with(|t| t.trim().is_empty())
                            on:click=create_canvas
                        >
                            "Create Canvas"
                        </Button>
                        <Button
                            size=ButtonSize::Sm
                            attr:disabled=move || busy.get() || input.with(|t| t.trim().is_empty())
                            on:click=move |_| send_typed()
                        >
                            <BusyLabel busy=busy idle_text="Send" busy_text="Thinking..." />
                        </Button>
                    </div>
                </div>
            </div>
        </div>
    }
}

#[component]
fn MessageView<F>(
    message: ChatMessage,
    busy: RwSignal<bool>,
    send: F,
    open_canvas: RwSignal<Option<String>>,
) -> impl IntoView
where
    F: Fn(Outgoing) + Copy + Send + Sync + 'static,
{
    if message.author == MessageAuthor::User {
        return view! {
            <div class="ml-auto flex max-w-[80%] flex-col gap-2 rounded-xl bg-primary px-4 py-2 text-sm text-primary-foreground">
                {message.image_url.map(|url| view! { <img src=url class="max-h-64 rounded-md" alt="Uploaded image" /> })}
                <div class="whitespace-pre-wrap">{message.text}</div>
            </div>
        }
        .into_any();
    }

    if let Some(canvas) = message.canvas.clone() {
        let id = message.id.clone();
        return view! {
            <Card class="py-4">
                <CardHeader>
                    <CardTitle class="text-sm">
                        {canvas.title.clone().unwrap_or_else(|| format!("Canvas: {}", canvas.topic))}
                    </CardTitle>
                    <CardDescription class="text-xs">{canvas.description.clone().unwrap_or(message.text.clone())}</CardDescription>
                </CardHeader>
                <CardContent>
                    {match canvas.state {
                        CanvasState::Generating => view! {
                            <div class="flex items-center gap-2 text-xs text-muted-foreground"><Spinner />"Writing canvas..."</div>
                        }
                        .into_any(),
                        CanvasState::Ready => view! {
                            <Button size=ButtonSize::Sm on:click=move |_| open_canvas.set(Some(id.clone()))>"Open Canvas"</Button>
                        }
                        .into_any(),
                    }}
                </CardContent>
            </Card>
        }
        .into_any();
    }

    let text = message.text.clone();
    let streaming = text.is_empty();
    let draft = (!streaming).then(|| chat_message_note(&text));
    let suggestions = message.suggested_questions.clone().unwrap_or_default();
    let generating_suggestions = message.generating_suggestions;

    view! {
        <div class="flex flex-col gap-2">
            {if streaming {
                view! { <SpinnerCircle class="size-5" /> }.into_any()
            } else {
                view! { <Markdown content=text.clone() /> }.into_any()
            }}

            {(!streaming).then(|| {
                let actions = AiEditAction::iter()
                    .map(|action| {
                        let text = text.clone();
                        view! {
                            <Button
                                size=ButtonSize::Badge
                                variant=ButtonVariant::Ghost
                                attr:disabled=move || busy.get()
                                on:click=move |_| send(Outgoing::edit(action, text.clone()))
                            >
                                {action.to_string()}
                            </Button>
                        }
                    })
                    .collect_view();
                let blocks = code_blocks(&text);
                let many = blocks.len() > 1;
                let copy_code = blocks
                    .into_iter()
                    .enumerate()
                    .map(|(i, code)| {
                        let label = if many { format!("Copy code {}", i + 1) } else { "Copy code".to_string() };
                        view! { <CopyButton text=code label /> }
                    })
                    .collect_view();
                view! {
                    <div class="flex flex-wrap items-center gap-1">
                        <CopyButton text=text.clone() />
                        {copy_code}
                        {actions}
                    </div>
                    <SaveToNotes draft=draft.clone() />
                }
            })}

            {generating_suggestions.then(|| view! {
                <div class="flex items-center gap-2 text-xs text-muted-foreground"><Spinner />"Finding follow-up questions..."</div>
            })}
            <div class="flex flex-col items-start gap-1">
                {suggestions
                    .into_iter()
                    .map(|q| {
                        let question = q.clone();
                        view! {
                            <Button
                                size=ButtonSize::Sm
                                variant=ButtonVariant::Outline
                                class="h-auto whitespace-normal text-left"
                                attr:disabled=move || busy.get()
                                on:click=move |_| send(Outgoing::typed(question.clone()))
                            >
                                {q}
                            </Button>
                        }
                    })
                    .collect_view()}
            </div>
        </div>
    }
    .into_any()
}

/// Full-width editor for a ready canvas: manual edits, AI rewrites of the
/// selected passage, and saving to notes.
#[component]
fn CanvasEditor<F>(message_id: String, on_close: F) -> impl IntoView
where
    F: Fn() + Copy + Send + Sync + 'static,
{
    let app = expect_context::<AppContext>().0;
    let session_id = app.current_chat.get_untracked().unwrap_or_default();
    let editor: NodeRef<html::Textarea> = NodeRef::new();
    let busy = RwSignal::new(false);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let editing = RwSignal::new(false);

    let canvas = app.store.with_untracked(|s| {
        s.history_item(&session_id)
            .and_then(HistoryItem::as_chat)
            .and_then(|c| c.messages.iter().find(|m| m.id == message_id))
            .and_then(|m| m.canvas.clone())
    });
    let title = canvas.as_ref().and_then(|c| c.title.clone()).unwrap_or_default();
    let content = RwSignal::new(canvas.and_then(|c| c.content).unwrap_or_default());

    let ids = StoredValue::new((session_id, message_id));
    let store_content = move |text: String| {
        ids.with_value(|(session_id, message_id)| {
            app.update_message(session_id, message_id, |m| set_canvas_content(m, &text));
        });
    };

    let run_action = move |action: CanvasEditAction| {
        let Some(area) = editor.get_untracked() else {
            return;
        };
        let text = content.get_untracked();
        let start = area.selection_start().ok().flatten().unwrap_or(0) as usize;
        let end = area.selection_end().ok().flatten().unwrap_or(0) as usize;
        let Some(range) = selection_range(&text, start, end) else {
            error.set(Some("Select some text in the editor first.".to_string()));
            return;
        };
        let generator = app.generator();
        busy.set(true);
        error.set(None);

        spawn_local(async move {
            match edit_canvas_selection(&generator, action, &text, range).await {
                Ok(updated) => {
                    content.set(updated.clone());
                    store_content(updated);
                }
                Err(e) => {
                    log::error!("event=canvas_edit module=pages status=error reason={e}");
                    error.set(Some(e.user_message()));
                }
            }
            busy.set(false);
        });
    };

    let draft = {
        let title = title.clone();
        Signal::derive(move || Some(canvas_note(&title, &content.get())))
    };

    let export_title = StoredValue::new(title.clone());
    let export = move |_| {
        let file = export_title.with_value(|t| canvas_file(t, &content.get_untracked()));
        match download_text(&file.file_name, file.mime, &file.body) {
            Ok(()) => log::info!("event=canvas_export module=pages status=ok bytes={}", file.body.len()),
            Err(e) => {
                log::error!("event=canvas_export module=pages status=error reason={e:?}");
                error.set(Some("Could not export the canvas. Please try again.".to_string()));
            }
        }
    };

    view! {
        <Card>
            <CardHeader>
                <div class="flex w-full items-center justify-between gap-2">
                    <CardTitle>{title}</CardTitle>
                    <div class="flex gap-2">
                        <Button
                            size=ButtonSize::Sm
                            variant=ButtonVariant::Outline
                            on:click=move |_| {
                                if editing.get_untracked() {
                                    store_content(content.get_untracked());
                                }
                                editing.update(|e| *e = !*e);
                            }
                        >
                            {move || if editing.get() { "Done" } else { "Edit" }}
                        </Button>
                        <Button size=ButtonSize::Sm variant=ButtonVariant::Ghost on:click=move |_| on_close()>
                            "Close"
                        </Button>
                    </div>
                </div>
            </CardHeader>
            <CardContent class="flex flex-col gap-3">
                <Show
                    when=move || editing.get()
                    fallback=move || view! { <Markdown content=content /> }
                >
                    <Label>"Select a passage, then pick a rewrite."</Label>
                    <div class="flex flex-wrap gap-1">
                        {CanvasEditAction::iter()
                            .map(|action| view! {
                                <Button
                                    size=ButtonSize::Badge
                                    variant=ButtonVariant::Outline
                                    attr:disabled=move || busy.get()
                                    on:click=move |_| run_action(action)
                                >
                                    {action.to_string()}
                                </Button>
                            })
                            .collect_view()}
                        <Show when=move || busy.get() fallback=|| ().into_view()>
                            <Spinner />
                        </Show>
                    </div>
                    <Textarea bind_value=content rows=18 node_ref=editor disabled=busy class="font-mono text-xs" />
                    <ErrorAlert message=error />
                </Show>
                <div class="flex flex-wrap items-start gap-2">
                    <SaveToNotes draft />
                    <Button size=ButtonSize::Sm variant=ButtonVariant::Outline on:click=export>
                        "Export as MD"
                    </Button>
                </div>
                <Show when=move || !editing.get() fallback=|| ()>
                    <ErrorAlert message=error />
                </Show>
            </CardContent>
        </Card>
    }
}
