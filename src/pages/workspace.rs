use super::assistant::AssistantPage;
use super::case_study::CaseStudyPage;
use super::flows::FlowsPage;
use super::history::HistoryPage;
use super::landing::SubscriptionForm;
use super::notes::NotesPage;
use super::quiz::QuizPage;
use super::session::SessionPage;
use crate::components::ui::{
    Alert, AlertDescription, AlertTitle, Button, ButtonSize, ButtonVariant,
};
use crate::models::Tier;
use crate::state::{AppContext, Tool};
use crate::util::now_ms;
use leptos::prelude::*;
use strum::IntoEnumIterator;

#[component]
pub fn Workspace() -> impl IntoView {
    let app = expect_context::<AppContext>().0;

    let trial_expired = move || app.user.with(|u| u.as_ref().is_some_and(|u| u.is_trial_expired(now_ms())));

    view! {
        <Show when=move || !trial_expired() fallback=|| view! { <TrialEnded /> }>
            <div class="flex min-h-screen bg-background text-foreground">
                <Sidebar />
                <main class="min-w-0 flex-1 px-6 py-6">
                    <TrialBanner />
                    {move || match app.tool.get() {
                        Tool::Assistant => view! { <AssistantPage /> }.into_any(),
                        Tool::Notes => view! { <NotesPage /> }.into_any(),
                        Tool::Sessions => view! { <SessionPage /> }.into_any(),
                        Tool::CaseStudies => view! { <CaseStudyPage /> }.into_any(),
                        Tool::Quizzes => view! { <QuizPage /> }.into_any(),
                        Tool::Flows => view! { <FlowsPage /> }.into_any(),
                        Tool::History => view! { <HistoryPage /> }.into_any(),
                    }}
                </main>
            </div>
        </Show>
    }
}

#[component]
fn Sidebar() -> impl IntoView {
    let app = expect_context::<AppContext>().0;

    let username = move || app.user.with(|u| u.as_ref().map(|u| u.username.clone()).unwrap_or_default());
    let tier = move || app.user.with(|u| u.as_ref().map(|u| u.tier));

    view! {
        <aside class="sticky top-0 flex h-screen w-56 shrink-0 flex-col gap-4 border-r px-3 py-6">
            <div class="px-2 text-lg font-semibold">"Focus.AI"</div>
            <nav class="flex flex-col gap-1">
                {move || {
                    let current = app.tool.get();
                    Tool::iter()
                        .map(|tool| {
                            let variant = if tool == current { ButtonVariant::Secondary } else { ButtonVariant::Ghost };
                            view! {
                                <Button
                                    variant=variant
                                    size=ButtonSize::Sm
                                    class="w-full justify-start"
                                    attr:aria-current=move || if tool == current { Some("page") } else { None }
                                    on:click=move |_| app.open_tool(tool)
                                >
                                    {tool.to_string()}
                                </Button>
                            }
                        })
                        .collect_view()
                }}
            </nav>
            <div class="mt-auto flex flex-col gap-2 px-2 text-xs text-muted-foreground">
                <div class="truncate text-sm text-foreground">{username}</div>
                <div>{move || match tier() {
                    Some(Tier::Pro) => "Pro",
                    Some(Tier::Trial) => "Free trial",
                    None => "",
                }}</div>
                <Button variant=ButtonVariant::Outline size=ButtonSize::Sm on:click=move |_| app.sign_out()>
                    "Sign out"
                </Button>
            </div>
        </aside>
    }
}

#[component]
fn TrialBanner() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let days_left = move || app.user.with(|u| u.as_ref().and_then(|u| u.trial_days_remaining(now_ms())));

    view! {
        {move || days_left().map(|days| {
            let unit = if days == 1 { "day" } else { "days" };
            view! {
                <div class="mb-4 rounded-md border border-primary/30 bg-primary/5 px-3 py-2 text-xs">
                    {format!("Free trial: {days} {unit} left.")}
                </div>
            }
        })}
    }
}

#[component]
fn TrialEnded() -> impl IntoView {
    let app = expect_context::<AppContext>().0;

    view! {
        <div class="min-h-screen bg-background text-foreground">
            <div class="mx-auto flex min-h-screen w-full max-w-md flex-col justify-center gap-4 px-4 py-10">
                <Alert>
                    <AlertTitle>"Your free trial has ended"</AlertTitle>
                    <AlertDescription class="text-xs text-muted-foreground">
                        "Your notes and history are still saved in this browser. Subscribe to keep studying with Focus.AI."
                    </AlertDescription>
                </Alert>
                <SubscriptionForm />
                <Button variant=ButtonVariant::Ghost size=ButtonSize::Sm on:click=move |_| app.sign_out()>
                    "Sign out"
                </Button>
            </div>
        </div>
    }
}
