use super::{enum_from_label, enum_options};
use crate::components::ui::{
    BusyLabel, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription, CardHeader,
    CardTitle, Checkbox, ErrorAlert, Input, Label, Markdown, Select, Textarea,
};
use crate::features::study_notes::generate_study_note;
use crate::library::{all_tags, NoteFilter};
use crate::models::{Folder, Note};
use crate::prompts::{NoteOptions, NoteStyle, StudentLevel};
use crate::state::AppContext;
use crate::util::{new_id, now_ms};
use crate::wizard::Wizard;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn NotesPage() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let search = RwSignal::new(String::new());
    let tag_filter: RwSignal<Option<String>> = RwSignal::new(None);
    let selected_note: RwSignal<Option<String>> = RwSignal::new(None);

    let filtered = Memo::new(move |_| {
        let filter = NoteFilter {
            folder: app.active_folder.get(),
            tag: tag_filter.get(),
            search: search.get(),
        };
        app.store.with(|s| filter.apply(s.notes()).into_iter().cloned().collect::<Vec<Note>>())
    });
    let tags = Memo::new(move |_| app.store.with(|s| all_tags(s.notes())));

    view! {
        <div class="flex w-full gap-6">
            <div class="flex w-56 shrink-0 flex-col gap-4">
                <FolderList />
                <div class="flex flex-col gap-1">
                    <Label>"Tags"</Label>
                    <div class="flex flex-wrap gap-1">
                        {move || {
                            let current = tag_filter.get();
                            tags.get()
                                .into_iter()
                                .map(|tag| {
                                    let variant = if current.as_deref() == Some(tag.as_str()) {
                                        ButtonVariant::Selected
                                    } else {
                                        ButtonVariant::Outline
                                    };
                                    let value = tag.clone();
                                    view! {
                                        <Button
                                            size=ButtonSize::Badge
                                            variant=variant
                                            on:click=move |_| {
                                                let value = value.clone();
                                                tag_filter.update(|t| {
                                                    *t = if t.as_deref() == Some(value.as_str()) { None } else { Some(value) };
                                                });
                                            }
                                        >
                                            {tag}
                                        </Button>
                                    }
                                })
                                .collect_view()
                        }}
                    </div>
                </div>
            </div>

            <div class="flex min-w-0 flex-1 flex-col gap-4">
                <NoteGenerator on_created=move |id| selected_note.set(Some(id)) />
                <Input r#type="search" placeholder="Search notes…" bind_value=search class="h-8 text-sm" />
                {move || match selected_note.get() {
                    Some(id) => view! { <NoteDetail id on_close=move || selected_note.set(None) /> }.into_any(),
                    None => view! {
                        <div class="flex flex-col gap-2">
                            <Show
                                when=move || !filtered.with(Vec::is_empty)
                                fallback=|| view! { <div class="text-sm text-muted-foreground">"No notes yet."</div> }
                            >
                                {move || {
                                    filtered
                                        .get()
                                        .into_iter()
                                        .map(|note| {
                                            let id = note.id.clone();
                                            let preview: String = note.content.chars().take(140).collect();
                                            view! {
                                                <button
                                                    class="rounded-md border px-3 py-2 text-left transition-colors hover:bg-accent"
                                                    on:click=move |_| selected_note.set(Some(id.clone()))
                                                >
                                                    <div class="truncate text-sm font-medium">{note.title}</div>
                                                    <div class="line-clamp-2 text-xs text-muted-foreground">{preview}</div>
                                                </button>
                                            }
                                        })
                                        .collect_view()
                                }}
                            </Show>
                        </div>
                    }
                    .into_any(),
                }}
            </div>
        </div>
    }
}

#[component]
fn FolderList() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let new_name = RwSignal::new(String::new());
    let renaming: RwSignal<Option<String>> = RwSignal::new(None);
    let rename_to = RwSignal::new(String::new());

    let add_folder = move |_| {
        let name = new_name.get_untracked().trim().to_string();
        if name.is_empty() {
            return;
        }
        let folder = Folder { id: new_id(), name };
        app.persist(|s| s.insert_folder(folder));
        new_name.set(String::new());
    };

    let finish_rename = move |id: String| {
        let name = rename_to.get_untracked();
        app.persist(|s| s.rename_folder(&id, &name));
        renaming.set(None);
    };

    let delete_folder = move |id: String| {
        if app.persist(|s| s.delete_folder(&id)) == Some(true)
            && app.active_folder.get_untracked().as_deref() == Some(id.as_str())
        {
            app.active_folder.set(None);
        }
    };

    view! {
        <div class="flex flex-col gap-1">
            <Label>"Folders"</Label>
            {move || {
                let active = app.active_folder.get();
                let all_variant = if active.is_none() { ButtonVariant::Secondary } else { ButtonVariant::Ghost };
                view! {
                    <Button size=ButtonSize::Sm variant=all_variant class="justify-start" on:click=move |_| app.active_folder.set(None)>
                        "All notes"
                    </Button>
                }
            }}
            {move || {
                let active = app.active_folder.get();
                let editing = renaming.get();
                app.store
                    .with(|s| s.folders().to_vec())
                    .into_iter()
                    .map(|folder| {
                        let id = folder.id.clone();
                        if editing.as_deref() == Some(id.as_str()) {
                            return view! {
                                <div class="flex gap-1">
                                    <Input bind_value=rename_to class="h-8 text-sm" />
                                    <Button size=ButtonSize::Sm on:click=move |_| finish_rename(id.clone())>"Save"</Button>
                                </div>
                            }
                            .into_any();
                        }
                        let variant = if active.as_deref() == Some(id.as_str()) {
                            ButtonVariant::Secondary
                        } else {
                            ButtonVariant::Ghost
                        };
                        let general = folder.is_general();
                        let (select_id, rename_id, delete_id) = (id.clone(), id.clone(), id);
                        let name = folder.name.clone();
                        view! {
                            <div class="group flex items-center gap-1">
                                <Button
                                    size=ButtonSize::Sm
                                    variant=variant
                                    class="min-w-0 flex-1 justify-start"
                                    on:click=move |_| app.active_folder.set(Some(select_id.clone()))
                                >
                                    <span class="truncate">{folder.name}</span>
                                </Button>
                                {(!general).then(|| view! {
                                    <Button
                                        size=ButtonSize::Badge
                                        variant=ButtonVariant::Ghost
                                        attr:title="Rename folder"
                                        on:click=move |_| {
                                            rename_to.set(name.clone());
                                            renaming.set(Some(rename_id.clone()));
                                        }
                                    >
                                        "✎"
                                    </Button>
                                    <Button
                                        size=ButtonSize::Badge
                                        variant=ButtonVariant::Ghost
                                        attr:title="Delete folder"
                                        on:click=move |_| delete_folder(delete_id.clone())
                                    >
                                        "✕"
                                    </Button>
                                })}
                            </div>
                        }
                        .into_any()
                    })
                    .collect_view()
            }}
            <div class="mt-1 flex gap-1">
                <Input placeholder="New folder" bind_value=new_name class="h-8 text-sm" />
                <Button size=ButtonSize::Sm variant=ButtonVariant::Outline on:click=add_folder>"Add"</Button>
            </div>
        </div>
    }
}

#[component]
fn NoteGenerator<F>(on_created: F) -> impl IntoView
where
    F: Fn(String) + Copy + Send + Sync + 'static,
{
    let app = expect_context::<AppContext>().0;
    let wizard: RwSignal<Wizard<()>> = RwSignal::new(Wizard::new());
    let keywords = RwSignal::new(String::new());
    let style = RwSignal::new(NoteStyle::default().to_string());
    let level = RwSignal::new(StudentLevel::default().to_string());
    let defaults = NoteOptions::default();
    let tables = RwSignal::new(defaults.tables);
    let mnemonics = RwSignal::new(defaults.mnemonics);
    let analogies = RwSignal::new(defaults.analogies);
    let case_examples = RwSignal::new(defaults.case_examples);

    let loading = Signal::derive(move || wizard.with(Wizard::is_loading));
    let error = Signal::derive(move || wizard.with(|w| w.error().map(str::to_string)));

    let on_generate = move |_| {
        let topic = keywords.get_untracked();
        if topic.trim().is_empty() || wizard.try_update(Wizard::begin) != Some(Ok(())) {
            return;
        }
        let options = NoteOptions {
            style: enum_from_label(&style.get_untracked()).unwrap_or_default(),
            level: enum_from_label(&level.get_untracked()).unwrap_or_default(),
            tables: tables.get_untracked(),
            mnemonics: mnemonics.get_untracked(),
            analogies: analogies.get_untracked(),
            case_examples: case_examples.get_untracked(),
        };
        let folders = app.store.with_untracked(|s| s.folders().to_vec());
        let active = app.active_folder.get_untracked();
        let generator = app.generator();

        spawn_local(async move {
            let outcome =
                generate_study_note(&generator, &topic, &options, &folders, active.as_deref(), now_ms()).await;
            match outcome {
                Ok(note) => {
                    let id = note.id.clone();
                    app.persist(|s| s.insert_note(note));
                    wizard.update(|w| w.finish(Ok(())));
                    wizard.update(Wizard::start_over);
                    keywords.set(String::new());
                    on_created(id);
                }
                Err(e) => wizard.update(|w| w.finish(Err(e))),
            }
        });
    };

    let toggle = move |id: &'static str, label: &'static str, value: RwSignal<bool>| {
        view! {
            <div class="flex items-center gap-2">
                <Checkbox id=id checked=value disabled=loading />
                <Label html_for=id>{label}</Label>
            </div>
        }
    };

    view! {
        <Card class="py-4">
            <CardHeader>
                <CardTitle class="text-sm">"Generate study notes"</CardTitle>
                <CardDescription class="text-xs">
                    {move || {
                        let folder = app.active_folder.get().and_then(|id| {
                            app.store.with(|s| s.folders().iter().find(|f| f.id == id).map(|f| f.name.clone()))
                        });
                        format!("Saved to {}.", folder.unwrap_or_else(|| "General".to_string()))
                    }}
                </CardDescription>
            </CardHeader>
            <CardContent class="flex flex-col gap-3">
                <Input placeholder="Keywords, e.g. primary open angle glaucoma" bind_value=keywords disabled=loading class="h-8 text-sm" />
                <div class="grid grid-cols-2 gap-2">
                    <Select options={enum_options::<NoteStyle>()} bind_value=style disabled=loading />
                    <Select options={enum_options::<StudentLevel>()} bind_value=level disabled=loading />
                </div>
                <div class="flex flex-wrap gap-4">
                    {toggle("opt-tables", "Tables", tables)}
                    {toggle("opt-mnemonics", "Mnemonics", mnemonics)}
                    {toggle("opt-analogies", "Analogies", analogies)}
                    {toggle("opt-cases", "Case examples", case_examples)}
                </div>
                <ErrorAlert message=error />
                <Button
                    size=ButtonSize::Sm
                    attr:disabled=move || loading.get() || keywords.with(|k| k.trim().is_empty())
                    on:click=on_generate
                >
                    <BusyLabel busy=loading idle_text="Generate Notes" busy_text="Generating..." />
                </Button>
            </CardContent>
        </Card>
    }
}

#[component]
fn NoteDetail<F>(id: String, on_close: F) -> impl IntoView
where
    F: Fn() + Copy + Send + Sync + 'static,
{
    let app = expect_context::<AppContext>().0;
    let note_id = StoredValue::new(id);
    let note = Memo::new(move |_| note_id.with_value(|id| app.store.with(|s| s.note(id).cloned())));

    let editing = RwSignal::new(false);
    let title = RwSignal::new(String::new());
    let content = RwSignal::new(String::new());
    let new_tag = RwSignal::new(String::new());
    let move_to = RwSignal::new(note.get_untracked().map(|n| n.folder_id).unwrap_or_default());

    let folder_options = Signal::derive(move || {
        app.store.with(|s| {
            s.folders()
                .iter()
                .map(|f| (f.id.clone(), f.name.clone()))
                .collect::<Vec<_>>()
        })
    });

    let start_edit = move |_| {
        if let Some(n) = note.get_untracked() {
            title.set(n.title);
            content.set(n.content);
            editing.set(true);
        }
    };
    let save_edit = move |_| {
        note_id.with_value(|id| {
            app.persist(|s| s.update_note(id, &title.get_untracked(), &content.get_untracked(), now_ms()))
        });
        editing.set(false);
    };
    let add_tag = move || {
        let tag = new_tag.get_untracked();
        note_id.with_value(|id| app.persist(|s| s.add_tag(id, &tag)));
        new_tag.set(String::new());
    };
    let do_move = move |_| {
        let folder = move_to.get_untracked();
        note_id.with_value(|id| app.persist(|s| s.move_note(id, &folder)));
    };
    let delete = move |_| {
        note_id.with_value(|id| app.persist(|s| s.delete_note(id)));
        on_close();
    };

    view! {
        {move || match note.get() {
            None => view! { <div class="text-sm text-muted-foreground">"This note no longer exists."</div> }.into_any(),
            Some(n) => {
                let body = n.content.clone();
                view! {
                    <Card>
                        <CardHeader>
                            <div class="flex w-full items-center justify-between gap-2">
                                <CardTitle>{n.title.clone()}</CardTitle>
                                <div class="flex gap-2">
                                    <Show
                                        when=move || editing.get()
                                        fallback=move || view! {
                                            <Button size=ButtonSize::Sm variant=ButtonVariant::Outline on:click=start_edit>"Edit"</Button>
                                        }
                                    >
                                        <Button size=ButtonSize::Sm on:click=save_edit>"Save"</Button>
                                    </Show>
                                    <Button size=ButtonSize::Sm variant=ButtonVariant::Destructive on:click=delete>"Delete"</Button>
                                    <Button size=ButtonSize::Sm variant=ButtonVariant::Ghost on:click=move |_| on_close()>"Back"</Button>
                                </div>
                            </div>
                        </CardHeader>
                        <CardContent class="flex flex-col gap-3">
                            <div class="flex flex-wrap items-center gap-1">
                                {n.tags
                                    .iter()
                                    .map(|tag| {
                                        let tag = tag.clone();
                                        let label = tag.clone();
                                        view! {
                                            <Button
                                                size=ButtonSize::Badge
                                                variant=ButtonVariant::Outline
                                                attr:title="Remove tag"
                                                on:click=move |_| {
                                                    note_id.with_value(|id| app.persist(|s| s.remove_tag(id, &tag)));
                                                }
                                            >
                                                {format!("#{label} ✕")}
                                            </Button>
                                        }
                                    })
                                    .collect_view()}
                                <Input
                                    placeholder="Add tag"
                                    bind_value=new_tag
                                    class="h-7 w-28 text-xs"
                                    on:keydown=move |ev: web_sys::KeyboardEvent| {
                                        if ev.key() == "Enter" {
                                            ev.prevent_default();
                                            add_tag();
                                        }
                                    }
                                />
                            </div>
                            <div class="flex items-center gap-2">
                                <Select options=folder_options bind_value=move_to class="h-8 w-48" />
                                <Button size=ButtonSize::Sm variant=ButtonVariant::Outline on:click=do_move>"Move"</Button>
                            </div>
                            <Show
                                when=move || editing.get()
                                fallback=move || view! { <Markdown content=body.clone() /> }
                            >
                                <Input bind_value=title class="h-8 text-sm" />
                                <Textarea bind_value=content rows=20 class="font-mono text-xs" />
                            </Show>
                        </CardContent>
                    </Card>
                }
                .into_any()
            }
        }}
    }
}
