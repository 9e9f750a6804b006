//! Browser pages. Each tool page owns its form signals and a [`Wizard`]
//! signal; generation runs in `spawn_local` and settles the wizard.
//!
//! [`Wizard`]: crate::wizard::Wizard

use crate::components::ui::{Button, ButtonSize, ButtonVariant, Input, Label, Select};
use crate::library::{resolve_save_target, NoteDraft};
use crate::models::GENERAL_FOLDER_ID;
use crate::prompts::Difficulty;
use crate::state::AppContext;
use crate::util::browser::copy_text;
use crate::util::now_ms;
use crate::wizard::Wizard;
use leptos::prelude::*;
use leptos_dom::helpers::set_timeout;
use std::time::Duration;
use strum::IntoEnumIterator;
use wasm_bindgen::JsCast;

mod assistant;
mod case_study;
mod certificate;
mod flows;
mod history;
mod landing;
mod notes;
mod quiz;
mod session;
mod workspace;

pub use landing::LandingPage;
pub use workspace::Workspace;

/// `(value, label)` pairs for a strum enum, keyed by its display text.
pub(crate) fn enum_options<E>() -> Vec<(String, String)>
where
    E: IntoEnumIterator + std::fmt::Display,
{
    E::iter().map(|v| (v.to_string(), v.to_string())).collect()
}

/// Parses a value produced by [`enum_options`] back into the enum.
pub(crate) fn enum_from_label<E>(label: &str) -> Option<E>
where
    E: IntoEnumIterator + std::fmt::Display,
{
    E::iter().find(|v| v.to_string() == label)
}

pub(crate) fn str_options(values: &[&str]) -> Vec<(String, String)> {
    values.iter().map(|v| (v.to_string(), v.to_string())).collect()
}

/// Applies `change` to the wizard's result, if one is ready.
pub(crate) fn update_result<T>(wizard: RwSignal<Wizard<T>>, change: impl FnOnce(&mut T))
where
    T: Send + Sync + 'static,
{
    wizard.update(|w| {
        if let Some(result) = w.result_mut() {
            change(result);
        }
    });
}

/// Row of chips for picking a difficulty.
#[component]
pub(crate) fn DifficultyPicker(
    value: RwSignal<Difficulty>,
    #[prop(into)] disabled: Signal<bool>,
) -> impl IntoView {
    move || {
        let current = value.get();
        Difficulty::iter()
            .map(|d| {
                let variant = if current == d { ButtonVariant::Selected } else { ButtonVariant::Outline };
                view! {
                    <Button
                        size=ButtonSize::Sm
                        variant=variant
                        attr:r#type="button"
                        attr:disabled=move || disabled.get()
                        on:click=move |_| value.set(d)
                    >
                        {d.label()}
                    </Button>
                }
            })
            .collect_view()
    }
}

/// Inline "save to notes" panel: pick a folder or name a new one.
#[component]
pub(crate) fn SaveToNotes(#[prop(into)] draft: Signal<Option<NoteDraft>>) -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let open = RwSignal::new(false);
    let saved = RwSignal::new(false);
    let selected = RwSignal::new(GENERAL_FOLDER_ID.to_string());
    let new_folder = RwSignal::new(String::new());

    let folder_options = Signal::derive(move || {
        app.store.with(|s| {
            s.folders()
                .iter()
                .map(|f| (f.id.clone(), f.name.clone()))
                .collect::<Vec<_>>()
        })
    });

    let on_save = move |_| {
        let Some(draft) = draft.get_untracked() else {
            return;
        };
        let target = app.store.with_untracked(|s| {
            resolve_save_target(
                s.folders(),
                Some(&selected.get_untracked()),
                Some(&new_folder.get_untracked()),
            )
        });
        let note = draft.into_note(target.folder_id, now_ms());
        app.persist(|s| {
            let folder = match target.new_folder {
                Some(folder) => s.insert_folder(folder),
                None => Ok(()),
            };
            let note = s.insert_note(note);
            folder.and(note)
        });
        new_folder.set(String::new());
        open.set(false);
        saved.set(true);
    };

    view! {
        <div class="flex flex-col gap-2">
            <Button
                size=ButtonSize::Sm
                variant=ButtonVariant::Outline
                attr:disabled=move || draft.with(Option::is_none)
                on:click=move |_| {
                    saved.set(false);
                    open.update(|o| *o = !*o);
                }
            >
                {move || if saved.get() { "Saved to Notes" } else { "Save to Notes" }}
            </Button>
            <Show when=move || open.get() fallback=|| ().into_view()>
                <div class="flex flex-col gap-2 rounded-md border p-3">
                    <Label html_for="save-folder">"Folder"</Label>
                    <Select id="save-folder" options=folder_options bind_value=selected />
                    <Label html_for="save-new-folder">"Or create a new folder"</Label>
                    <Input id="save-new-folder" placeholder="New folder name" bind_value=new_folder class="h-8 text-sm" />
                    <div class="flex gap-2">
                        <Button size=ButtonSize::Sm on:click=on_save>"Save"</Button>
                        <Button size=ButtonSize::Sm variant=ButtonVariant::Ghost on:click=move |_| open.set(false)>
                            "Cancel"
                        </Button>
                    </div>
                </div>
            </Show>
        </div>
    }
}

const COPIED_FOR: Duration = Duration::from_secs(2);

/// Copies `text` to the clipboard and reads "Copied!" for a moment.
#[component]
pub(crate) fn CopyButton(
    #[prop(into)] text: String,
    #[prop(optional, into)] label: Option<String>,
) -> impl IntoView {
    let copied = RwSignal::new(false);
    let text = StoredValue::new(text);
    let label = label.unwrap_or_else(|| "Copy".to_string());

    let on_copy = move |_| match text.with_value(|t| copy_text(t)) {
        Ok(()) => {
            copied.set(true);
            set_timeout(
                move || {
                    copied.try_set(false);
                },
                COPIED_FOR,
            );
        }
        Err(e) => log::warn!("event=clipboard_write module=pages status=error reason={e:?}"),
    };

    view! {
        <Button
            size=ButtonSize::Badge
            variant=ButtonVariant::Ghost
            attr:r#type="button"
            attr:disabled=move || copied.get()
            on:click=on_copy
        >
            {move || if copied.get() { "Copied!".to_string() } else { label.clone() }}
        </Button>
    }
}

/// First file chosen in the `<input type="file">` that fired `ev`.
pub(crate) fn picked_file(ev: &web_sys::Event) -> Option<web_sys::File> {
    let input = ev.target()?.dyn_into::<web_sys::HtmlInputElement>().ok()?;
    input.files()?.get(0)
}

fn read_file(
    file: &web_sys::File,
    start: impl FnOnce(&web_sys::FileReader, &web_sys::File) -> Result<(), wasm_bindgen::JsValue>,
    on_load: impl FnOnce(wasm_bindgen::JsValue) + 'static,
) {
    let Ok(reader) = web_sys::FileReader::new() else {
        log::error!("event=file_read module=pages status=error reason=no_reader");
        return;
    };
    let handle = reader.clone();
    let onload = wasm_bindgen::closure::Closure::once_into_js(move |_: web_sys::ProgressEvent| {
        match handle.result() {
            Ok(result) => on_load(result),
            Err(_) => log::error!("event=file_read module=pages status=error reason=no_result"),
        }
    });
    reader.set_onload(Some(onload.unchecked_ref()));
    if start(&reader, file).is_err() {
        log::error!("event=file_read module=pages status=error reason=read_failed");
    }
}

/// Reads `file` as a `data:` URL.
pub(crate) fn read_as_data_url(file: &web_sys::File, on_load: impl FnOnce(String) + 'static) {
    read_file(file, |r, f| r.read_as_data_url(f), move |result| {
        if let Some(url) = result.as_string() {
            on_load(url);
        }
    });
}

/// Reads `file` into memory.
pub(crate) fn read_as_bytes(file: &web_sys::File, on_load: impl FnOnce(Vec<u8>) + 'static) {
    read_file(file, |r, f| r.read_as_array_buffer(f), move |result| {
        on_load(js_sys::Uint8Array::new(&result).to_vec());
    });
}
