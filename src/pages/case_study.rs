use super::{enum_from_label, enum_options, update_result, SaveToNotes};
use crate::components::ui::{
    BusyLabel, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription, CardHeader,
    CardTitle, ErrorAlert, Input, Label, Markdown, Select, Spinner,
};
use crate::features::case_study::{
    ask_about_case, case_record, generate_case, generate_case_quiz, CaseMode, CaseQuizRun, CaseRun,
    CASE_CHAT_FAILED_TEXT, NOT_ANSWERED,
};
use crate::library::case_note;
use crate::models::{CaseQuestionKind, CaseStudy, CaseStudyQuestion, ChatMessage, MessageAuthor};
use crate::state::AppContext;
use crate::util::now_ms;
use crate::wizard::Wizard;
use leptos::prelude::*;
use leptos::task::spawn_local;

/// Wizard already holding `case`, for cases reopened from history.
fn ready_with(case: CaseStudy) -> Wizard<CaseStudy> {
    let mut wizard = Wizard::new();
    if wizard.begin().is_ok() {
        wizard.finish(Ok(case));
    }
    wizard
}

#[component]
pub fn CaseStudyPage() -> impl IntoView {
    let app = expect_context::<AppContext>().0;

    let reopened = app.opened_case.get_untracked().and_then(|id| {
        app.store.with_untracked(|s| {
            s.history_item(&id)
                .and_then(|item| item.as_case_study())
                .map(|record| record.case_data.clone())
        })
    });
    app.opened_case.set(None);

    let wizard: RwSignal<Wizard<CaseStudy>> = RwSignal::new(reopened.map(ready_with).unwrap_or_default());
    let topic = RwSignal::new(String::new());
    let mode = RwSignal::new(CaseMode::default().to_string());

    let loading = Signal::derive(move || wizard.with(Wizard::is_loading));
    let error = Signal::derive(move || wizard.with(|w| w.error().map(str::to_string)));
    let case = Memo::new(move |_| wizard.with(|w| w.result().cloned()));

    let on_generate = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let topic = topic.get_untracked().trim().to_string();
        if topic.is_empty() || wizard.try_update(Wizard::begin) != Some(Ok(())) {
            return;
        }
        let generator = app.generator();
        spawn_local(async move {
            let outcome = generate_case(&generator, &topic).await;
            if let Ok(case) = &outcome {
                let record = case_record(case, now_ms());
                app.persist(|s| s.insert_history(record));
            }
            wizard.update(|w| w.finish(outcome));
        });
    };

    view! {
        <div class="mx-auto flex w-full max-w-3xl flex-col gap-4">
            {move || match case.get() {
                Some(case) => {
                    let mode = enum_from_label::<CaseMode>(&mode.get_untracked()).unwrap_or_default();
                    view! {
                        <CaseView case mode on_reset=move || wizard.update(Wizard::start_over) />
                    }
                    .into_any()
                }
                None => view! {
                    <Card class="py-4">
                        <CardHeader>
                            <CardTitle>"Case Study"</CardTitle>
                            <CardDescription class="text-xs">
                                "Work through a realistic clinical case, then quiz yourself on it."
                            </CardDescription>
                        </CardHeader>
                        <CardContent>
                            <form class="flex flex-col gap-3" on:submit=on_generate>
                                <Label html_for="case-topic">"Condition or topic"</Label>
                                <Input
                                    id="case-topic"
                                    placeholder="e.g. Acute angle closure"
                                    bind_value=topic
                                    disabled=loading
                                    class="h-8 text-sm"
                                />
                                <Label html_for="case-mode">"Mode"</Label>
                                <Select id="case-mode" options={enum_options::<CaseMode>()} bind_value=mode disabled=loading />
                                <ErrorAlert message=error />
                                <Button
                                    size=ButtonSize::Sm
                                    attr:disabled=move || loading.get() || topic.with(|t| t.trim().is_empty())
                                >
                                    <BusyLabel busy=loading idle_text="Generate Case" busy_text="Generating..." />
                                </Button>
                            </form>
                        </CardContent>
                    </Card>
                }
                .into_any(),
            }}
        </div>
    }
}

#[component]
fn CaseView<F>(case: CaseStudy, mode: CaseMode, on_reset: F) -> impl IntoView
where
    F: Fn() + Copy + Send + Sync + 'static,
{
    let draft = case_note(&case);
    let body = match mode {
        CaseMode::Full => view! { <FullCase case=case.clone() /> }.into_any(),
        CaseMode::Interactive => view! { <InteractiveCase case=case.clone() /> }.into_any(),
    };

    let case_title = case.case_title.clone();
    let patient_summary = case.patient_summary.clone();
    view! {
        <Card class="py-4">
            <CardHeader>
                <CardTitle>{case_title}</CardTitle>
                <CardDescription>{patient_summary}</CardDescription>
            </CardHeader>
            <CardContent class="flex flex-col gap-4">
                {body}
                <div class="flex gap-2">
                    <SaveToNotes draft=Signal::derive(move || Some(draft.clone())) />
                    <Button size=ButtonSize::Sm variant=ButtonVariant::Ghost on:click=move |_| on_reset()>
                        "New Case"
                    </Button>
                </div>
            </CardContent>
        </Card>
        <CaseChat case=case.clone() />
        <CaseQuiz case />
    }
}

#[component]
fn FullCase(case: CaseStudy) -> impl IntoView {
    case.sections
        .into_iter()
        .map(|section| {
            let question = section.question.map(|q| {
                view! {
                    <details class="rounded-md border px-3 py-2 text-sm">
                        <summary class="cursor-pointer font-medium">{q.question_text}</summary>
                        <div class="mt-2">{format!("Answer: {}", q.correct_answer)}</div>
                        <div class="text-xs text-muted-foreground">{q.explanation}</div>
                    </details>
                }
            });
            view! {
                <section class="flex flex-col gap-2">
                    <h3 class="text-sm font-semibold">{section.section_title}</h3>
                    <Markdown content=Signal::derive(move || section.content.clone()) />
                    {question}
                </section>
            }
        })
        .collect_view()
}

/// Answer control for one question: option buttons, or a text field for
/// short answers. Only the option highlight tracks `given`.
fn question_input<F>(question: &CaseStudyQuestion, given: Signal<Option<String>>, locked: bool, on_answer: F) -> AnyView
where
    F: Fn(String) + Copy + Send + Sync + 'static,
{
    match question.kind {
        CaseQuestionKind::MultipleChoice => {
            let options = question.options.clone();
            view! {
                <div class="flex flex-col gap-2">
                    {move || {
                        let chosen = given.get();
                        options
                            .iter()
                            .map(|option| {
                                let variant = if chosen.as_deref() == Some(option.as_str()) {
                                    ButtonVariant::Selected
                                } else {
                                    ButtonVariant::Outline
                                };
                                let value = option.clone();
                                let text = option.clone();
                                view! {
                                    <Button
                                        size=ButtonSize::Sm
                                        variant=variant
                                        class="h-auto justify-start whitespace-normal py-2 text-left"
                                        attr:disabled=locked
                                        on:click=move |_| on_answer(value.clone())
                                    >
                                        {text}
                                    </Button>
                                }
                            })
                            .collect_view()
                    }}
                </div>
            }
            .into_any()
        }
        CaseQuestionKind::ShortAnswer => {
            let text = RwSignal::new(given.get_untracked().unwrap_or_default());
            Effect::new(move |_| on_answer(text.get()));
            view! { <Input placeholder="Your answer" bind_value=text disabled=locked class="h-8 text-sm" /> }.into_any()
        }
    }
}

#[component]
fn InteractiveCase(case: CaseStudy) -> impl IntoView {
    let run: RwSignal<Wizard<CaseRun>> = RwSignal::new(Wizard::new());
    run.update(|w| {
        if w.begin().is_ok() {
            w.finish(Ok(CaseRun::new(case)));
        }
    });
    let current = Memo::new(move |_| run.with(|w| w.result().map(|r| (r.walk().current(), r.is_reviewing()))));
    let can_advance = Memo::new(move |_| run.with(|w| w.result().is_some_and(|r| r.walk().can_advance())));

    view! {
        {move || {
            let Some((index, reviewing)) = current.get() else {
                return ().into_any();
            };
            if reviewing {
                return run.with_untracked(|w| {
                    let Some(r) = w.result() else {
                        return ().into_any();
                    };
                    let rows = r.review();
                    let correct = rows.iter().filter(|row| row.is_correct).count();
                    let total = rows.len();
                    let rows = rows
                        .into_iter()
                        .map(|row| {
                            let tone = if row.is_correct { "text-green-600" } else { "text-destructive" };
                            view! {
                                <div class="flex flex-col gap-1 rounded-md border p-3 text-sm">
                                    <div class="text-xs text-muted-foreground">{row.section_title.to_string()}</div>
                                    <div class="font-medium">{row.question.question_text.clone()}</div>
                                    <div class=tone>{row.given.unwrap_or(NOT_ANSWERED).to_string()}</div>
                                    <div class="text-xs">{format!("Answer: {}", row.question.correct_answer)}</div>
                                    <div class="text-xs text-muted-foreground">{row.question.explanation.clone()}</div>
                                </div>
                            }
                        })
                        .collect_view();
                    view! {
                        <div class="flex flex-col gap-2">
                            <div class="text-sm font-medium">{format!("Review: {correct} of {total} correct")}</div>
                            {rows}
                        </div>
                    }
                    .into_any()
                });
            }

            let (section, total) = run.with_untracked(|w| {
                let r = w.result();
                (
                    r.and_then(|r| r.case().sections.get(index).cloned()),
                    r.map(|r| r.walk().len()).unwrap_or_default(),
                )
            });
            let given = Signal::derive(move || {
                run.with(|w| w.result().and_then(|r| r.walk().answer_at(index).map(str::to_string)))
            });
            let Some(section) = section else {
                return ().into_any();
            };
            let question = section.question.as_ref().map(|q| {
                let input = question_input(q, given, false, move |text| {
                    update_result(run, |r| r.answer(&text));
                });
                view! {
                    <div class="flex flex-col gap-2 border-t pt-3">
                        <div class="text-sm font-medium">{q.question_text.clone()}</div>
                        {input}
                    </div>
                }
            });
            view! {
                <div class="flex flex-col gap-3">
                    <div class="text-xs text-muted-foreground">{format!("Section {} of {total}", index + 1)}</div>
                    <h3 class="text-sm font-semibold">{section.section_title.clone()}</h3>
                    <Markdown content=Signal::derive(move || section.content.clone()) />
                    {question}
                    <Button
                        size=ButtonSize::Sm
                        class="self-end"
                        attr:disabled=move || !can_advance.get()
                        on:click=move |_| update_result(run, |r| {
                            let _ = r.next();
                        })
                    >
                        {if index + 1 >= total { "Review Answers" } else { "Next" }}
                    </Button>
                </div>
            }
            .into_any()
        }}
    }
}

#[component]
fn CaseChat(case: CaseStudy) -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let case = StoredValue::new(case);
    let messages: RwSignal<Vec<ChatMessage>> = RwSignal::new(Vec::new());
    let input = RwSignal::new(String::new());
    let sending = RwSignal::new(false);

    let on_send = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let question = input.get_untracked().trim().to_string();
        if question.is_empty() || sending.get_untracked() {
            return;
        }
        let history = messages.get_untracked();
        let reply = ChatMessage::new(MessageAuthor::Ai, "");
        let reply_id = reply.id.clone();
        messages.update(|m| {
            m.push(ChatMessage::new(MessageAuthor::User, question.clone()));
            m.push(reply);
        });
        input.set(String::new());
        sending.set(true);

        let generator = app.generator();
        let case = case.get_value();
        spawn_local(async move {
            let set_reply = |text: &str| {
                messages.update(|m| {
                    if let Some(msg) = m.iter_mut().find(|m| m.id == reply_id) {
                        msg.text = text.to_string();
                    }
                });
            };
            if ask_about_case(&generator, &case, &history, &question, set_reply).await.is_err() {
                set_reply(CASE_CHAT_FAILED_TEXT);
            }
            sending.set(false);
        });
    };

    view! {
        <Card class="py-4">
            <CardHeader>
                <CardTitle class="text-sm">"Ask about this case"</CardTitle>
            </CardHeader>
            <CardContent class="flex flex-col gap-3">
                <For
                    each=move || messages.get()
                    key=|m| (m.id.clone(), m.text.clone())
                    children=move |message: ChatMessage| match message.author {
                        MessageAuthor::User => view! {
                            <div class="self-end rounded-md bg-primary px-3 py-2 text-sm text-primary-foreground">{message.text}</div>
                        }
                        .into_any(),
                        MessageAuthor::Ai if message.text.is_empty() => view! { <Spinner /> }.into_any(),
                        MessageAuthor::Ai => {
                            let text = message.text;
                            view! { <Markdown content=Signal::derive(move || text.clone()) class="rounded-md bg-muted px-3 py-2" /> }.into_any()
                        }
                    }
                />
                <form class="flex gap-2" on:submit=on_send>
                    <Input placeholder="e.g. Why not a vein occlusion?" bind_value=input disabled=sending class="h-8 text-sm" />
                    <Button size=ButtonSize::Sm attr:disabled=move || sending.get() || input.with(|i| i.trim().is_empty())>
                        "Ask"
                    </Button>
                </form>
            </CardContent>
        </Card>
    }
}

#[component]
fn CaseQuiz(case: CaseStudy) -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let case = StoredValue::new(case);
    let wizard: RwSignal<Wizard<CaseQuizRun>> = RwSignal::new(Wizard::new());
    let loading = Signal::derive(move || wizard.with(Wizard::is_loading));
    let error = Signal::derive(move || wizard.with(|w| w.error().map(str::to_string)));
    // Re-render on load and submit only; answers update in place.
    let status = Memo::new(move |_| wizard.with(|w| w.result().map(CaseQuizRun::is_submitted)));

    let on_generate = move |_| {
        if wizard.try_update(Wizard::begin) != Some(Ok(())) {
            return;
        }
        let generator = app.generator();
        let case = case.get_value();
        spawn_local(async move {
            let outcome = generate_case_quiz(&generator, &case).await.map(CaseQuizRun::new);
            wizard.update(|w| w.finish(outcome));
        });
    };

    view! {
        <Card class="py-4">
            <CardHeader>
                <CardTitle class="text-sm">"Case quiz"</CardTitle>
            </CardHeader>
            <CardContent class="flex flex-col gap-3">
                {move || match status.get().and_then(|_| wizard.with_untracked(|w| w.result().cloned())) {
                    None => view! {
                        <ErrorAlert message=error />
                        <Button size=ButtonSize::Sm variant=ButtonVariant::Outline attr:disabled=move || loading.get() on:click=on_generate>
                            <BusyLabel busy=loading idle_text="Quiz Me on This Case" busy_text="Generating..." />
                        </Button>
                    }
                    .into_any(),
                    Some(run) => {
                        let submitted = run.is_submitted();
                        let questions = run
                            .questions()
                            .iter()
                            .enumerate()
                            .map(|(i, q)| {
                                let given = run.answer_at(i).map(str::to_string);
                                let live = Signal::derive(move || {
                                    wizard.with(|w| w.result().and_then(|r| r.answer_at(i).map(str::to_string)))
                                });
                                let input = question_input(q, live, submitted, move |text| {
                                    update_result(wizard, |r| r.choose(i, &text));
                                });
                                let verdict = submitted.then(|| {
                                    let correct = given.as_deref().is_some_and(|g| q.is_correct(g));
                                    let tone = if correct { "text-green-600" } else { "text-destructive" };
                                    view! {
                                        <div class=format!("text-xs {tone}")>{format!("Answer: {}", q.correct_answer)}</div>
                                        <div class="text-xs text-muted-foreground">{q.explanation.clone()}</div>
                                    }
                                });
                                view! {
                                    <div class="flex flex-col gap-2 rounded-md border p-3">
                                        <div class="text-sm font-medium">{format!("{}. {}", i + 1, q.question_text)}</div>
                                        {input}
                                        {verdict}
                                    </div>
                                }
                            })
                            .collect_view();
                        let summary = submitted.then(|| {
                            format!("You got {} of {} correct.", run.correct_count(), run.questions().len())
                        });
                        view! {
                            {questions}
                            {summary.map(|s| view! { <div class="text-sm font-medium">{s}</div> })}
                            {if submitted {
                                view! {
                                    <Button size=ButtonSize::Sm variant=ButtonVariant::Outline on:click=move |_| wizard.update(Wizard::start_over)>
                                        "New Quiz"
                                    </Button>
                                }
                                .into_any()
                            } else {
                                view! {
                                    <Button size=ButtonSize::Sm on:click=move |_| update_result(wizard, CaseQuizRun::submit)>
                                        "Submit"
                                    </Button>
                                }
                                .into_any()
                            }}
                        }
                        .into_any()
                    }
                }}
            </CardContent>
        </Card>
    }
}
