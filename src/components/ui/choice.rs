use super::input::FIELD_CLASS;
use leptos::prelude::*;
use tw_merge::tw_merge;
use wasm_bindgen::JsCast;

/// Native `<select>` over `(value, label)` pairs.
#[component]
pub fn Select(
    #[prop(into, optional)] class: String,
    #[prop(into, optional)] id: String,
    #[prop(into)] options: Signal<Vec<(String, String)>>,
    #[prop(into, optional)] disabled: MaybeProp<bool>,
    #[prop(into)] bind_value: RwSignal<String>,
) -> impl IntoView {
    let merged_class = tw_merge!(FIELD_CLASS, "h-9", class);

    let on_change = move |ev: web_sys::Event| {
        if let Some(target) = ev.target() {
            if let Some(select) = target.dyn_ref::<web_sys::HtmlSelectElement>() {
                bind_value.set(select.value());
            }
        }
    };

    view! {
        <select
            data-name="Select"
            class=merged_class
            id=id
            disabled=move || disabled.get().unwrap_or(false)
            on:change=on_change
            prop:value=move || bind_value.get()
        >
            {move || {
                options
                    .get()
                    .into_iter()
                    .map(|(value, label)| {
                        let selected = bind_value.get_untracked() == value;
                        view! { <option value=value selected=selected>{label}</option> }
                    })
                    .collect_view()
            }}
        </select>
    }
}

#[component]
pub fn Checkbox(
    #[prop(into, optional)] id: String,
    #[prop(into, optional)] disabled: MaybeProp<bool>,
    #[prop(into)] checked: RwSignal<bool>,
) -> impl IntoView {
    view! {
        <input
            data-name="Checkbox"
            type="checkbox"
            id=id
            class="peer size-4 shrink-0 rounded-[4px] border border-input accent-primary disabled:opacity-50"
            disabled=move || disabled.get().unwrap_or(false)
            prop:checked=move || checked.get()
            on:change=move |ev: web_sys::Event| {
                if let Some(input) = ev.target().and_then(|t| t.dyn_into::<web_sys::HtmlInputElement>().ok()) {
                    checked.set(input.checked());
                }
            }
        />
    }
}
