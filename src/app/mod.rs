use crate::config::EnvConfig;
use crate::pages::{LandingPage, Workspace};
use crate::state::{AppContext, AppState};
use leptos::prelude::*;

/// Root component: the landing page until someone signs in, then the workspace.
#[component]
pub fn App(config: EnvConfig) -> impl IntoView {
    let state = AppState::new(config);
    provide_context(AppContext(state));

    view! {
        <Show when=move || state.user.with(Option::is_some) fallback=|| view! { <LandingPage /> }>
            <Workspace />
        </Show>
    }
}
