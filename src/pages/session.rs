use super::certificate::CertificateDownload;
use super::{str_options, update_result, DifficultyPicker, SaveToNotes};
use crate::components::ui::{
    BusyLabel, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription, CardHeader,
    CardTitle, ErrorAlert, Input, Label, Markdown, Select,
};
use crate::features::session::{generate_session, SessionRun};
use crate::prompts::{Difficulty, SessionSettings, SESSION_SECTION_CHOICES};
use crate::state::AppContext;
use crate::wizard::Wizard;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[component]
pub fn SessionPage() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let wizard: RwSignal<Wizard<SessionRun>> = RwSignal::new(Wizard::new());
    let topic = RwSignal::new(String::new());
    let sections = RwSignal::new(SESSION_SECTION_CHOICES[1].to_string());
    let difficulty = RwSignal::new(Difficulty::default());

    let loading = Signal::derive(move || wizard.with(Wizard::is_loading));
    let error = Signal::derive(move || wizard.with(|w| w.error().map(str::to_string)));
    let has_run = move || wizard.with(|w| w.result().is_some());

    let on_generate = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let topic = topic.get_untracked().trim().to_string();
        if topic.is_empty() || wizard.try_update(Wizard::begin) != Some(Ok(())) {
            return;
        }
        let settings = SessionSettings {
            topic,
            num_sections: sections.get_untracked().parse().unwrap_or(SESSION_SECTION_CHOICES[1]),
            difficulty: difficulty.get_untracked(),
        };
        let generator = app.generator();
        spawn_local(async move {
            let outcome = generate_session(&generator, &settings).await.map(SessionRun::new);
            wizard.update(|w| w.finish(outcome));
        });
    };

    let section_choices: Vec<String> = SESSION_SECTION_CHOICES.iter().map(usize::to_string).collect();
    let section_refs: Vec<&str> = section_choices.iter().map(String::as_str).collect();
    let section_options = str_options(&section_refs);

    view! {
        <div class="mx-auto flex w-full max-w-3xl flex-col gap-4">
            <Show
                when=has_run
                fallback=move || {
                    let section_options = section_options.clone();
                    view! {
                        <Card class="py-4">
                            <CardHeader>
                                <CardTitle>"Study Session"</CardTitle>
                                <CardDescription class="text-xs">
                                    "Learn a topic section by section. Answer each checkpoint question to move on."
                                </CardDescription>
                            </CardHeader>
                            <CardContent>
                                <form class="flex flex-col gap-3" on:submit=on_generate>
                                    <Label html_for="session-topic">"Topic"</Label>
                                    <Input
                                        id="session-topic"
                                        placeholder="e.g. Diabetic retinopathy grading"
                                        bind_value=topic
                                        disabled=loading
                                        class="h-8 text-sm"
                                    />
                                    <Label html_for="session-sections">"Sections"</Label>
                                    <Select id="session-sections" options=section_options bind_value=sections disabled=loading />
                                    <Label>"Difficulty"</Label>
                                    <div class="flex gap-2">
                                        <DifficultyPicker value=difficulty disabled=loading />
                                    </div>
                                    <ErrorAlert message=error />
                                    <Button
                                        size=ButtonSize::Sm
                                        attr:disabled=move || loading.get() || topic.with(|t| t.trim().is_empty())
                                    >
                                        <BusyLabel busy=loading idle_text="Start Session" busy_text="Preparing..." />
                                    </Button>
                                </form>
                            </CardContent>
                        </Card>
                    }
                }
            >
                <SessionRunner wizard />
            </Show>
        </div>
    }
}

#[component]
fn SessionRunner(wizard: RwSignal<Wizard<SessionRun>>) -> impl IntoView {
    let run = Memo::new(move |_| wizard.with(|w| w.result().cloned()));

    view! {
        {move || {
            let Some(run) = run.get() else {
                return ().into_any();
            };
            let title = run.session().title.clone();
            if run.is_finished() {
                let score = run.score();
                let draft = run.to_note();
                let finished = run.clone();
                let rows = run
                    .session()
                    .sections
                    .iter()
                    .enumerate()
                    .map(|(i, section)| {
                        let given = run.walk().answer_at(i).unwrap_or("").to_string();
                        let correct = run.is_correct(i) == Some(true);
                        let mark = if correct { "✓" } else { "✗" };
                        let tone = if correct { "text-green-600" } else { "text-destructive" };
                        view! {
                            <div class="flex flex-col gap-1 rounded-md border p-3 text-sm">
                                <div class="font-medium">{section.sub_topic_title.clone()}</div>
                                <div class="text-muted-foreground">{section.question.question.clone()}</div>
                                <div class=tone>{format!("{mark} {given}")}</div>
                                {(!correct).then(|| view! {
                                    <div class="text-xs">{format!("Answer: {}", section.question.answer)}</div>
                                })}
                                <div class="text-xs text-muted-foreground">{section.question.explanation.clone()}</div>
                            </div>
                        }
                    })
                    .collect_view();
                return view! {
                    <Card class="py-4">
                        <CardHeader>
                            <CardTitle>{title}</CardTitle>
                            <CardDescription>
                                {format!("You scored {} of {} ({}%).", score.correct, score.total, score.percent())}
                            </CardDescription>
                        </CardHeader>
                        <CardContent class="flex flex-col gap-3">
                            {rows}
                            <div class="flex flex-wrap items-start gap-2">
                                <SaveToNotes draft=Signal::derive(move || Some(draft.clone())) />
                                <CertificateDownload run=finished />
                            </div>
                            <div class="flex gap-2">
                                <Button size=ButtonSize::Sm variant=ButtonVariant::Outline on:click=move |_| update_result(wizard, SessionRun::back)>
                                    "Back"
                                </Button>
                                <Button size=ButtonSize::Sm on:click=move |_| wizard.update(Wizard::start_over)>
                                    "New Session"
                                </Button>
                            </div>
                        </CardContent>
                    </Card>
                }
                .into_any();
            }

            let index = run.walk().current();
            let total = run.walk().len();
            let Some(section) = run.session().sections.get(index).cloned() else {
                return ().into_any();
            };
            let chosen = run.walk().answer_at(index).map(str::to_string);
            let can_advance = run.walk().can_advance();
            let is_last = run.walk().is_last();
            let question = section.question.clone();
            let options = question
                .options
                .iter()
                .map(|option| {
                    let variant = match chosen.as_deref() {
                        Some(c) if c == option && question.is_correct(c) => ButtonVariant::Success,
                        Some(c) if c == option => ButtonVariant::Destructive,
                        _ => ButtonVariant::Outline,
                    };
                    let value = option.clone();
                    let text = option.clone();
                    view! {
                        <Button
                            size=ButtonSize::Sm
                            variant=variant
                            class="h-auto justify-start whitespace-normal py-2 text-left"
                            on:click=move |_| update_result(wizard, |r| r.choose(&value))
                        >
                            {text}
                        </Button>
                    }
                })
                .collect_view();
            let feedback = chosen.as_deref().map(|c| {
                let verdict = if question.is_correct(c) { "Correct." } else { "Not quite." };
                view! {
                    <div class="rounded-md bg-muted px-3 py-2 text-sm">
                        <span class="font-medium">{verdict}</span>
                        " "
                        {question.explanation.clone()}
                    </div>
                }
            });

            view! {
                <Card class="py-4">
                    <CardHeader>
                        <CardDescription class="text-xs">
                            {format!("{title} · Section {} of {total}", index + 1)}
                        </CardDescription>
                        <CardTitle>{section.sub_topic_title.clone()}</CardTitle>
                    </CardHeader>
                    <CardContent class="flex flex-col gap-4">
                        <Markdown content=Signal::derive(move || section.content.clone()) />
                        <div class="flex flex-col gap-2 border-t pt-4">
                            <div class="text-sm font-medium">{question.question.clone()}</div>
                            {options}
                            {feedback}
                        </div>
                        <div class="flex justify-between">
                            <Button
                                size=ButtonSize::Sm
                                variant=ButtonVariant::Outline
                                attr:disabled=index == 0
                                on:click=move |_| update_result(wizard, SessionRun::back)
                            >
                                "Back"
                            </Button>
                            <Button
                                size=ButtonSize::Sm
                                attr:disabled=!can_advance
                                on:click=move |_| update_result(wizard, |r| {
                                    let _ = r.next();
                                })
                            >
                                {if is_last { "Finish" } else { "Next" }}
                            </Button>
                        </div>
                    </CardContent>
                </Card>
            }
            .into_any()
        }}
    }
}
