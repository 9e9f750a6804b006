use super::SaveToNotes;
use crate::components::ui::{
    BusyLabel, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription, CardHeader,
    CardTitle, ErrorAlert, Input, Label, Markdown, Spinner,
};
use crate::features::flows::{generate_flows, start_session, FlowFeed, Vote};
use crate::library::flow_note;
use crate::models::FlowSession;
use crate::state::AppContext;
use crate::util::now_ms;
use crate::wizard::Wizard;
use leptos::ev;
use leptos::prelude::*;
use leptos::task::spawn_local;
use leptos_dom::helpers::window_event_listener;
use wasm_bindgen::JsCast;

#[component]
pub fn FlowsPage() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let wizard: RwSignal<Wizard<FlowFeed>> = RwSignal::new(Wizard::new());
    let topic = RwSignal::new(String::new());

    let loading = Signal::derive(move || wizard.with(Wizard::is_loading));
    let error = Signal::derive(move || wizard.with(|w| w.error().map(str::to_string)));
    let has_feed = move || wizard.with(|w| w.result().is_some());

    let on_start = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let topic = topic.get_untracked();
        if topic.trim().is_empty() || wizard.try_update(Wizard::begin) != Some(Ok(())) {
            return;
        }
        let generator = app.generator();
        spawn_local(async move {
            let outcome = start_session(&generator, &topic, now_ms()).await;
            if let Ok(session) = &outcome {
                let session = session.clone();
                app.persist(|s| s.insert_flow_session(session));
            }
            wizard.update(|w| w.finish(outcome.map(FlowFeed::new)));
        });
    };

    let open_session = move |session: FlowSession| {
        wizard.update(|w| {
            w.start_over();
            if w.begin().is_ok() {
                w.finish(Ok(FlowFeed::new(session)));
            }
        });
    };

    view! {
        <div class="mx-auto flex w-full max-w-2xl flex-col gap-4">
            <Show
                when=has_feed
                fallback=move || view! {
                    <Card class="py-4">
                        <CardHeader>
                            <CardTitle>"Flows"</CardTitle>
                            <CardDescription class="text-xs">
                                "Bite-sized cards on one topic. Like or dislike cards to steer what comes next."
                            </CardDescription>
                        </CardHeader>
                        <CardContent>
                            <form class="flex flex-col gap-3" on:submit=on_start>
                                <Label html_for="flow-topic">"Topic"</Label>
                                <Input id="flow-topic" placeholder="e.g. Contact lens complications" bind_value=topic disabled=loading class="h-8 text-sm" />
                                <ErrorAlert message=error />
                                <Button
                                    size=ButtonSize::Sm
                                    attr:disabled=move || loading.get() || topic.with(|t| t.trim().is_empty())
                                >
                                    <BusyLabel busy=loading idle_text="Start Flow" busy_text="Generating..." />
                                </Button>
                            </form>
                        </CardContent>
                    </Card>
                    <PastSessions on_open=open_session />
                }
            >
                <FlowViewer wizard />
            </Show>
        </div>
    }
}

#[component]
fn PastSessions<F>(on_open: F) -> impl IntoView
where
    F: Fn(FlowSession) + Copy + Send + Sync + 'static,
{
    let app = expect_context::<AppContext>().0;
    let sessions = Memo::new(move |_| app.store.with(|s| s.flow_sessions().to_vec()));

    view! {
        <Show when=move || !sessions.with(Vec::is_empty) fallback=|| ()>
            <div class="flex flex-col gap-1">
                <Label>"Previous flows"</Label>
                {move || {
                    sessions
                        .get()
                        .into_iter()
                        .map(|session| {
                            let id = session.id.clone();
                            let label = format!("{} ({} cards)", session.topic, session.flows.len());
                            let session = StoredValue::new(session);
                            view! {
                                <div class="flex items-center gap-1">
                                    <Button
                                        size=ButtonSize::Sm
                                        variant=ButtonVariant::Ghost
                                        class="flex-1 justify-start"
                                        on:click=move |_| on_open(session.get_value())
                                    >
                                        {label}
                                    </Button>
                                    <Button
                                        size=ButtonSize::Badge
                                        variant=ButtonVariant::Ghost
                                        attr:title="Delete"
                                        on:click=move |_| {
                                            app.persist(|s| s.delete_flow_session(&id));
                                        }
                                    >
                                        "✕"
                                    </Button>
                                </div>
                            }
                        })
                        .collect_view()
                }}
            </div>
        </Show>
    }
}

#[component]
fn FlowViewer(wizard: RwSignal<Wizard<FlowFeed>>) -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let feed = Memo::new(move |_| wizard.with(|w| w.result().cloned()));

    // Starts a background fetch when the viewer nears the end of the feed.
    let prefetch = move || {
        let Some((session_id, settings)) = wizard
            .try_update(|w| {
                let feed = w.result_mut()?;
                let settings = feed.begin_fetch()?;
                Some((feed.session().id.clone(), settings))
            })
            .flatten()
        else {
            return;
        };
        let generator = app.generator();
        spawn_local(async move {
            let outcome = generate_flows(&generator, &settings).await;
            let grown = wizard
                .try_update(|w| {
                    let feed = w.result_mut().filter(|f| f.session().id == session_id)?;
                    (feed.finish_fetch(outcome) > 0).then(|| feed.session().flows.clone())
                })
                .flatten();
            if let Some(flows) = grown {
                app.persist(|s| s.update_flow_session(&session_id, flows));
            }
        });
    };

    let paginate = move |step: isize| {
        if wizard.try_update(|w| w.result_mut().is_some_and(|f| f.paginate(step))) == Some(true) {
            prefetch();
        }
    };

    let vote = move |flow_id: String, choice: Vote| {
        wizard.update(|w| {
            if let Some(feed) = w.result_mut() {
                feed.vote(&flow_id, choice);
            }
        });
        prefetch();
    };

    let key_handle = window_event_listener(ev::keydown, move |ev: web_sys::KeyboardEvent| {
        let typing = ev
            .target()
            .and_then(|t| t.dyn_into::<web_sys::Element>().ok())
            .is_some_and(|el| matches!(el.tag_name().to_lowercase().as_str(), "input" | "textarea"));
        if typing {
            return;
        }
        match ev.key().as_str() {
            "ArrowRight" => paginate(1),
            "ArrowLeft" => paginate(-1),
            _ => {}
        }
    });
    on_cleanup(move || key_handle.remove());

    prefetch();

    view! {
        {move || {
            let Some(feed) = feed.get() else {
                return ().into_any();
            };
            let topic = feed.session().topic.clone();
            let position = format!("{} / {}", (feed.index() + 1).min(feed.len()), feed.len());
            let progress = format!("width: {:.0}%", feed.progress() * 100.0);
            let can_back = feed.can_go_back();
            let can_forward = feed.can_go_forward();

            let card = match feed.current().cloned() {
                Some(flow) => {
                    let voted = feed.vote_for(&flow.id);
                    let vote_button = |choice: Vote, label: &'static str| {
                        let variant = if voted == Some(choice) { ButtonVariant::Selected } else { ButtonVariant::Outline };
                        let id = flow.id.clone();
                        view! {
                            <Button
                                size=ButtonSize::Sm
                                variant=variant
                                attr:disabled=voted.is_some()
                                on:click=move |_| vote(id.clone(), choice)
                            >
                                {label}
                            </Button>
                        }
                    };
                    let like = vote_button(Vote::Like, "👍 Like");
                    let dislike = vote_button(Vote::Dislike, "👎 Dislike");
                    let draft = flow_note(&flow);
                    view! {
                        <Card class="min-h-72 py-4">
                            <CardHeader>
                                <CardDescription class="text-xs">{flow.sub_topic.clone()}</CardDescription>
                                <CardTitle>{flow.title.clone()}</CardTitle>
                            </CardHeader>
                            <CardContent class="flex flex-col gap-4">
                                <Markdown content=Signal::derive(move || flow.content.clone()) />
                                <div class="flex flex-wrap items-start gap-2">
                                    {like}
                                    {dislike}
                                    <SaveToNotes draft=Signal::derive(move || Some(draft.clone())) />
                                </div>
                            </CardContent>
                        </Card>
                    }
                    .into_any()
                }
                None => view! {
                    <div class="flex min-h-72 items-center justify-center gap-2 text-sm text-muted-foreground">
                        <Spinner />
                        "Loading more flows..."
                    </div>
                }
                .into_any(),
            };

            view! {
                <div class="flex items-center justify-between">
                    <h2 class="text-lg font-semibold">{topic}</h2>
                    <Button size=ButtonSize::Sm variant=ButtonVariant::Ghost on:click=move |_| wizard.update(Wizard::start_over)>
                        "New Flow"
                    </Button>
                </div>
                <div class="h-1 w-full rounded bg-muted">
                    <div class="h-1 rounded bg-primary" style=progress></div>
                </div>
                {card}
                <div class="flex items-center justify-between text-sm">
                    <Button size=ButtonSize::Sm variant=ButtonVariant::Outline attr:disabled=!can_back on:click=move |_| paginate(-1)>
                        "Previous"
                    </Button>
                    <span class="text-muted-foreground">{position}</span>
                    <Button size=ButtonSize::Sm variant=ButtonVariant::Outline attr:disabled=!can_forward on:click=move |_| paginate(1)>
                        "Next"
                    </Button>
                </div>
            }
            .into_any()
        }}
    }
}
