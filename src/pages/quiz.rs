use super::{enum_from_label, enum_options, str_options, DifficultyPicker};
use crate::components::ui::{
    BusyLabel, Button, ButtonSize, ButtonVariant, Card, CardContent, CardDescription, CardHeader,
    CardTitle, ErrorAlert, Input, Label, Select,
};
use crate::features::quiz::{answer_key, generate_quiz, grade, OutputFormat, QuizAnswer, QuizForm};
use crate::models::{CustomQuiz, QuizQuestion, QuizQuestionType};
use crate::prompts::{Difficulty, QUIZ_COUNT_CHOICES};
use crate::state::AppContext;
use crate::wizard::Wizard;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::collections::HashMap;
use strum::IntoEnumIterator;

#[component]
pub fn QuizPage() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let wizard: RwSignal<Wizard<CustomQuiz>> = RwSignal::new(Wizard::new());
    let form = RwSignal::new(QuizForm::default());
    let topic = RwSignal::new(String::new());
    let count = RwSignal::new(QuizForm::default().question_count.to_string());
    let difficulty = RwSignal::new(Difficulty::default());
    let format = RwSignal::new(OutputFormat::default().to_string());
    // Format the current quiz was generated with.
    let shown_format = RwSignal::new(OutputFormat::default());

    let loading = Signal::derive(move || wizard.with(Wizard::is_loading));
    let error = Signal::derive(move || wizard.with(|w| w.error().map(str::to_string)));
    let quiz = Memo::new(move |_| wizard.with(|w| w.result().cloned()));

    let on_generate = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        form.update(|f| {
            f.topic = topic.get_untracked();
            f.question_count = count.get_untracked().parse().unwrap_or(f.question_count);
            f.difficulty = difficulty.get_untracked();
            f.output_format = enum_from_label(&format.get_untracked()).unwrap_or_default();
        });
        let (ready, settings, output) = form.with_untracked(|f| (f.can_submit(), f.settings(), f.output_format));
        if !ready || wizard.try_update(Wizard::begin) != Some(Ok(())) {
            return;
        }
        shown_format.set(output);
        let generator = app.generator();
        spawn_local(async move {
            let outcome = generate_quiz(&generator, &settings).await;
            wizard.update(|w| w.finish(outcome));
        });
    };

    let count_choices: Vec<String> = QUIZ_COUNT_CHOICES.iter().map(usize::to_string).collect();
    let count_refs: Vec<&str> = count_choices.iter().map(String::as_str).collect();
    let count_options = str_options(&count_refs);

    view! {
        <div class="mx-auto flex w-full max-w-3xl flex-col gap-4">
            {move || match quiz.get() {
                Some(quiz) => {
                    let show_answers = shown_format.get_untracked().shows_answers();
                    let questions = quiz
                        .questions
                        .into_iter()
                        .enumerate()
                        .map(|(index, question)| view! { <QuestionCard index question show_answers /> })
                        .collect_view();
                    view! {
                        <div class="flex items-center justify-between">
                            <h2 class="text-lg font-semibold">{quiz.title}</h2>
                            <Button size=ButtonSize::Sm variant=ButtonVariant::Outline on:click=move |_| wizard.update(Wizard::start_over)>
                                "New Quiz"
                            </Button>
                        </div>
                        {questions}
                    }
                    .into_any()
                }
                None => {
                    let count_options = count_options.clone();
                    view! {
                        <Card class="py-4">
                            <CardHeader>
                                <CardTitle>"Custom Quiz"</CardTitle>
                                <CardDescription class="text-xs">"Mix question types and check your answers as you go."</CardDescription>
                            </CardHeader>
                            <CardContent>
                                <form class="flex flex-col gap-3" on:submit=on_generate>
                                    <Label html_for="quiz-topic">"Topic"</Label>
                                    <Input id="quiz-topic" placeholder="e.g. Ocular pharmacology" bind_value=topic disabled=loading class="h-8 text-sm" />
                                    <div class="grid grid-cols-2 gap-2">
                                        <div class="flex flex-col gap-1">
                                            <Label html_for="quiz-count">"Questions"</Label>
                                            <Select id="quiz-count" options=count_options bind_value=count disabled=loading />
                                        </div>
                                        <div class="flex flex-col gap-1">
                                            <Label html_for="quiz-format">"Output"</Label>
                                            <Select id="quiz-format" options={enum_options::<OutputFormat>()} bind_value=format disabled=loading />
                                        </div>
                                    </div>
                                    <Label>"Difficulty"</Label>
                                    <div class="flex gap-2">
                                        <DifficultyPicker value=difficulty disabled=loading />
                                    </div>
                                    <Label>"Question types"</Label>
                                    <div class="flex flex-wrap gap-2">
                                        {move || {
                                            QuizQuestionType::iter()
                                                .map(|kind| {
                                                    let variant = if form.with(|f| f.is_selected(kind)) {
                                                        ButtonVariant::Selected
                                                    } else {
                                                        ButtonVariant::Outline
                                                    };
                                                    view! {
                                                        <Button
                                                            size=ButtonSize::Sm
                                                            variant=variant
                                                            attr:r#type="button"
                                                            attr:disabled=move || loading.get()
                                                            on:click=move |_| {
                                                                form.update(|f| {
                                                                    f.toggle_type(kind);
                                                                });
                                                            }
                                                        >
                                                            {kind.label()}
                                                        </Button>
                                                    }
                                                })
                                                .collect_view()
                                        }}
                                    </div>
                                    <ErrorAlert message=error />
                                    <Button
                                        size=ButtonSize::Sm
                                        attr:disabled=move || loading.get() || topic.with(|t| t.trim().is_empty())
                                    >
                                        <BusyLabel busy=loading idle_text="Generate Quiz" busy_text="Generating..." />
                                    </Button>
                                </form>
                            </CardContent>
                        </Card>
                    }
                    .into_any()
                }
            }}
        </div>
    }
}

/// Inputs for one question. The answer is assembled only when checked.
#[derive(Clone)]
enum AnswerInput {
    Choice(RwSignal<String>),
    Text(RwSignal<String>),
    Matches(Vec<(String, RwSignal<String>)>),
}

impl AnswerInput {
    fn for_question(question: &QuizQuestion) -> Self {
        match question {
            QuizQuestion::MultipleChoice(_) => AnswerInput::Choice(RwSignal::new(String::new())),
            QuizQuestion::ShortAnswer(_) => AnswerInput::Text(RwSignal::new(String::new())),
            QuizQuestion::Matching(q) => AnswerInput::Matches(
                q.premises
                    .iter()
                    .map(|p| (p.id.clone(), RwSignal::new(String::new())))
                    .collect(),
            ),
        }
    }

    fn answer(&self) -> QuizAnswer {
        match self {
            AnswerInput::Choice(c) => QuizAnswer::Choice(c.get_untracked()),
            AnswerInput::Text(t) => QuizAnswer::Text(t.get_untracked()),
            AnswerInput::Matches(pairs) => QuizAnswer::Matches(
                pairs
                    .iter()
                    .filter_map(|(premise, chosen)| {
                        let chosen = chosen.get_untracked();
                        (!chosen.is_empty()).then(|| (premise.clone(), chosen))
                    })
                    .collect::<HashMap<_, _>>(),
            ),
        }
    }
}

#[component]
fn QuestionCard(index: usize, question: QuizQuestion, show_answers: bool) -> impl IntoView {
    let answer_input = AnswerInput::for_question(&question);
    let verdict: RwSignal<Option<bool>> = RwSignal::new(None);
    let reveal = RwSignal::new(false);

    let controls = match (&question, answer_input.clone()) {
        (QuizQuestion::MultipleChoice(mc), AnswerInput::Choice(chosen)) => {
            let options = mc.options.clone();
            view! {
                <div class="flex flex-col gap-2">
                    {move || {
                        let current = chosen.get();
                        options
                            .iter()
                            .map(|option| {
                                let variant = if current == *option { ButtonVariant::Selected } else { ButtonVariant::Outline };
                                let value = option.clone();
                                let text = option.clone();
                                view! {
                                    <Button
                                        size=ButtonSize::Sm
                                        variant=variant
                                        class="h-auto justify-start whitespace-normal py-2 text-left"
                                        on:click=move |_| {
                                            chosen.set(value.clone());
                                            verdict.set(None);
                                        }
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
        (QuizQuestion::ShortAnswer(_), AnswerInput::Text(text)) => {
            view! { <Input placeholder="Your answer" bind_value=text class="h-8 text-sm" /> }.into_any()
        }
        (QuizQuestion::Matching(m), AnswerInput::Matches(pairs)) => {
            let mut response_options = vec![(String::new(), "Select a match".to_string())];
            response_options.extend(m.responses.iter().map(|r| (r.id.clone(), r.value.clone())));
            m.premises
                .iter()
                .zip(pairs)
                .map(|(premise, (_, chosen))| {
                    let options = response_options.clone();
                    view! {
                        <div class="grid grid-cols-2 items-center gap-2 text-sm">
                            <div>{premise.value.clone()}</div>
                            <Select options=options bind_value=chosen />
                        </div>
                    }
                })
                .collect_view()
                .into_any()
        }
        _ => ().into_any(),
    };

    let input = StoredValue::new(answer_input);
    let question = StoredValue::new(question);
    let on_check = move |_| {
        let answer = input.with_value(AnswerInput::answer);
        verdict.set(question.with_value(|q| grade(q, &answer)));
    };

    let prompt = question.with_value(|q| format!("{}. {}", index + 1, q.prompt()));

    view! {
        <Card class="py-4">
            <CardContent class="flex flex-col gap-3">
                <div class="text-sm font-medium">{prompt}</div>
                {controls}
                <div class="flex items-center gap-2">
                    <Button size=ButtonSize::Sm variant=ButtonVariant::Outline on:click=on_check>"Check"</Button>
                    {show_answers.then(|| view! {
                        <Button size=ButtonSize::Sm variant=ButtonVariant::Ghost on:click=move |_| reveal.update(|r| *r = !*r)>
                            {move || if reveal.get() { "Hide Answer" } else { "Show Answer" }}
                        </Button>
                    })}
                    {move || verdict.get().map(|correct| {
                        let (text, tone) = if correct {
                            ("Correct", "text-green-600")
                        } else {
                            ("Incorrect", "text-destructive")
                        };
                        view! { <span class=format!("text-sm font-medium {tone}")>{text}</span> }
                    })}
                </div>
                <Show when=move || reveal.get() fallback=|| ()>
                    <div class="flex flex-col gap-1 rounded-md bg-muted px-3 py-2 text-sm">
                        {question.with_value(|q| {
                            answer_key(q).into_iter().map(|line| view! { <div>{line}</div> }).collect_view()
                        })}
                        <div class="text-xs text-muted-foreground">{question.with_value(|q| q.explanation().to_string())}</div>
                    </div>
                </Show>
            </CardContent>
        </Card>
    }
}
