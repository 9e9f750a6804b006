use super::{picked_file, read_as_bytes, str_options};
use crate::account::{AccountDirectory, SubscriptionQuote, INVALID_CREDENTIALS_TEXT, TRIAL_DAYS};
use crate::components::ui::{
    Alert, AlertDescription, BusyLabel, Button, ButtonSize, ButtonVariant, Card, CardContent,
    CardDescription, CardFooter, CardHeader, CardTitle, Checkbox, ErrorAlert, Input, Label, Select,
};
use crate::notify::{
    Notifier, Screenshot, SubscriptionApplication, WaitlistSignup, REGIONS, ROLES, YEARS_OF_STUDY,
};
use crate::state::AppContext;
use crate::util::now_ms;
use leptos::prelude::*;
use leptos::task::spawn_local;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Panel {
    SignIn,
    Waitlist,
    Subscribe,
}

#[component]
pub fn LandingPage() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let panel = RwSignal::new(Panel::SignIn);
    let show_announcement = RwSignal::new(!app.store.with_untracked(|s| s.announcement_dismissed()));

    let dismiss = move |_| {
        app.settle_write(app.store.with_untracked(|s| s.dismiss_announcement()));
        show_announcement.set(false);
    };

    let tabs = move || {
        let current = panel.get();
        [
            (Panel::SignIn, "Sign in"),
            (Panel::Waitlist, "Free trial"),
            (Panel::Subscribe, "Subscribe"),
        ]
        .into_iter()
        .map(|(target, label)| {
            let variant = if current == target { ButtonVariant::Default } else { ButtonVariant::Ghost };
            view! {
                <Button size=ButtonSize::Sm variant=variant on:click=move |_| panel.set(target)>
                    {label}
                </Button>
            }
        })
        .collect_view()
    };

    view! {
        <div class="min-h-screen bg-background text-foreground">
            <Show when=move || show_announcement.get() fallback=|| ().into_view()>
                <div class="flex items-center justify-center gap-3 bg-primary px-4 py-2 text-sm text-primary-foreground">
                    <span>{format!("Get your free trial for {TRIAL_DAYS} days!")}</span>
                    <button class="font-semibold underline" on:click=move |_| panel.set(Panel::Waitlist)>
                        "Join the waitlist →"
                    </button>
                    <button class="ml-auto text-xs opacity-80 hover:opacity-100" on:click=dismiss title="Dismiss">
                        "✕"
                    </button>
                </div>
            </Show>

            <div class="mx-auto flex min-h-screen w-full max-w-md flex-col justify-center gap-6 px-4 py-10">
                <div class="text-center">
                    <h1 class="text-2xl font-semibold">"Focus.AI"</h1>
                    <p class="text-sm text-muted-foreground">
                        "AI study assistant for optometry students: notes, guided sessions, clinical cases, quizzes and flows."
                    </p>
                </div>

                <div class="flex justify-center gap-2">
                    {tabs}
                </div>

                {move || match panel.get() {
                    Panel::SignIn => view! { <SignInForm /> }.into_any(),
                    Panel::Waitlist => view! { <WaitlistForm /> }.into_any(),
                    Panel::Subscribe => view! { <SubscriptionForm /> }.into_any(),
                }}
            </div>
        </div>
    }
}

#[component]
fn SignInForm() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let username = RwSignal::new(String::new());
    let password = RwSignal::new(String::new());
    let error: RwSignal<Option<String>> = RwSignal::new(None);

    let directory = app.config.with_value(AccountDirectory::from_config);
    let configured = !directory.is_empty();

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        error.set(None);
        match directory.authenticate(&username.get_untracked(), &password.get_untracked(), now_ms()) {
            Some(user) => app.sign_in(user),
            None => {
                log::warn!("event=sign_in module=pages status=rejected");
                error.set(Some(INVALID_CREDENTIALS_TEXT.to_string()));
            }
        }
    };

    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-lg">"Sign in"</CardTitle>
                <CardDescription class="text-xs">"Use the username and password you were given."</CardDescription>
            </CardHeader>
            <CardContent>
                <form class="flex flex-col gap-3" on:submit=on_submit>
                    <div class="flex flex-col gap-1.5">
                        <Label html_for="username">"Username"</Label>
                        <Input id="username" bind_value=username required=true class="h-8 text-sm" />
                    </div>
                    <div class="flex flex-col gap-1.5">
                        <Label html_for="password">"Password"</Label>
                        <Input
                            id="password"
                            r#type="password"
                            placeholder="••••••••"
                            bind_value=password
                            required=true
                            class="h-8 text-sm"
                        />
                    </div>

                    <ErrorAlert message=error />

                    <Show when=move || !configured fallback=|| ().into_view()>
                        <Alert>
                            <AlertDescription class="text-xs text-muted-foreground">
                                "No accounts are configured for this deployment."
                            </AlertDescription>
                        </Alert>
                    </Show>

                    <Button class="w-full" size=ButtonSize::Sm>
                        "Continue"
                    </Button>
                </form>
            </CardContent>
        </Card>
    }
}

#[component]
fn WaitlistForm() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let full_name = RwSignal::new(String::new());
    let email = RwSignal::new(String::new());
    let role = RwSignal::new(String::new());
    let year = RwSignal::new(String::new());
    let region = RwSignal::new(String::new());
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let loading = RwSignal::new(false);
    let joined = RwSignal::new(false);

    let signup = move || WaitlistSignup {
        full_name: full_name.get_untracked(),
        email: email.get_untracked(),
        role: role.get_untracked(),
        year_of_study: year.get_untracked(),
        region: region.get_untracked(),
    };
    let is_student = move || {
        WaitlistSignup {
            role: role.get(),
            ..WaitlistSignup::default()
        }
        .is_student()
    };

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        if loading.get_untracked() {
            return;
        }
        let signup = signup();
        let notifier = app.config.with_value(Notifier::from_config);
        loading.set(true);
        error.set(None);

        spawn_local(async move {
            match notifier.join_waitlist(&signup).await {
                Ok(()) => joined.set(true),
                Err(e) => error.set(Some(e.user_message())),
            }
            loading.set(false);
        });
    };

    let with_placeholder = |placeholder: &str, values: &[&str]| {
        let mut options = vec![(String::new(), placeholder.to_string())];
        options.extend(str_options(values));
        options
    };
    let role_options = with_placeholder("Current Role/Study Level", &ROLES);
    let year_options = with_placeholder("Year of Study", &YEARS_OF_STUDY);
    let region_options = with_placeholder("Region in India", &REGIONS);

    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-lg">"Join the free trial waitlist"</CardTitle>
                <CardDescription class="text-xs">
                    {format!("We will send you {TRIAL_DAYS}-day trial credentials.")}
                </CardDescription>
            </CardHeader>
            <CardContent>
                <Show
                    when=move || !joined.get()
                    fallback=|| view! {
                        <Alert>
                            <AlertDescription class="text-sm">
                                "You're on the list! We'll email you when your trial is ready."
                            </AlertDescription>
                        </Alert>
                    }
                >
                    <form class="flex flex-col gap-3" on:submit=on_submit>
                        <Input placeholder="Full Name" bind_value=full_name disabled=loading class="h-8 text-sm" />
                        <Input r#type="email" placeholder="Email Address" bind_value=email disabled=loading class="h-8 text-sm" />
                        <Select options=role_options.clone() bind_value=role disabled=loading />
                        {
                            let year_options = year_options.clone();
                            view! {
                                <Show when=is_student fallback=|| ().into_view()>
                                    <Select options=year_options.clone() bind_value=year disabled=loading />
                                </Show>
                            }
                        }
                        <Select options=region_options.clone() bind_value=region disabled=loading />

                        <ErrorAlert message=error />

                        <Button class="w-full" size=ButtonSize::Sm attr:disabled=move || loading.get()>
                            <BusyLabel busy=loading idle_text="Join Waitlist" busy_text="Submitting..." />
                        </Button>
                    </form>
                </Show>
            </CardContent>
        </Card>
    }
}

/// Subscription request form. Also shown when a trial has ended.
#[component]
pub(crate) fn SubscriptionForm() -> impl IntoView {
    let app = expect_context::<AppContext>().0;
    let full_name = RwSignal::new(String::new());
    let email = RwSignal::new(String::new());
    let is_member = RwSignal::new(false);
    let referral = RwSignal::new(String::new());
    let screenshot: RwSignal<Option<Screenshot>> = RwSignal::new(None);
    let error: RwSignal<Option<String>> = RwSignal::new(None);
    let loading = RwSignal::new(false);
    let sent = RwSignal::new(false);

    let quote = Memo::new(move |_| SubscriptionQuote::for_referral(&referral.get()));
    let payee = app.config.with_value(|c| c.upi_payee.clone());

    let on_file = move |ev: web_sys::Event| {
        let Some(file) = picked_file(&ev) else {
            return;
        };
        if let Err(e) = Screenshot::check_size(file.size() as usize) {
            screenshot.set(None);
            error.set(Some(e.user_message()));
            return;
        }
        error.set(None);
        let file_name = file.name();
        let mime_type = file.type_();
        read_as_bytes(&file, move |bytes| {
            screenshot.set(Some(Screenshot {
                file_name,
                mime_type,
                bytes,
            }));
        });
    };

    let on_submit = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        if loading.get_untracked() {
            return;
        }
        let application = SubscriptionApplication {
            full_name: full_name.get_untracked(),
            email: email.get_untracked(),
            is_member: is_member.get_untracked(),
            quote: quote.get_untracked(),
            screenshot: screenshot.get_untracked(),
        };
        let notifier = app.config.with_value(Notifier::from_config);
        loading.set(true);
        error.set(None);

        spawn_local(async move {
            match notifier.apply_for_subscription(&application).await {
                Ok(()) => sent.set(true),
                Err(e) => error.set(Some(e.user_message())),
            }
            loading.set(false);
        });
    };

    view! {
        <Card>
            <CardHeader>
                <CardTitle class="text-lg">"Subscribe to Focus.AI Pro"</CardTitle>
                <CardDescription class="text-xs">
                    "Pay with UPI, upload the payment screenshot and we will activate your account."
                </CardDescription>
            </CardHeader>
            <CardContent>
                <Show
                    when=move || !sent.get()
                    fallback=|| view! {
                        <Alert>
                            <AlertDescription class="text-sm">
                                "Thank you! Your payment is being verified. You will receive your login details by email."
                            </AlertDescription>
                        </Alert>
                    }
                >
                    <form class="flex flex-col gap-3" on:submit=on_submit>
                        <Input placeholder="Full Name" bind_value=full_name disabled=loading class="h-8 text-sm" />
                        <Input r#type="email" placeholder="Email Address" bind_value=email disabled=loading class="h-8 text-sm" />
                        <div class="flex items-center gap-2">
                            <Checkbox id="is-member" checked=is_member disabled=loading />
                            <Label html_for="is-member">"I am a member of an optometry association"</Label>
                        </div>
                        <Input placeholder="Referral code (optional)" bind_value=referral disabled=loading class="h-8 text-sm" />

                        <div class="rounded-md border p-3 text-sm">
                            <div class="flex items-baseline justify-between">
                                <span class="text-muted-foreground">"1 year"</span>
                                <span class="text-lg font-semibold">{move || quote.get().price_label()}</span>
                            </div>
                            <Show when=move || quote.get().has_discount() fallback=|| ().into_view()>
                                <div class="text-xs text-success">
                                    {move || format!("Referral applied: ₹{} off", quote.get().discount())}
                                </div>
                            </Show>
                            {match payee.clone() {
                                Some(payee) => view! {
                                    <a
                                        class="mt-2 block text-primary underline underline-offset-4"
                                        href=move || quote.get().upi_link(&payee)
                                    >
                                        "Pay with UPI"
                                    </a>
                                }
                                .into_any(),
                                None => view! {
                                    <div class="mt-2 text-xs text-muted-foreground">
                                        "UPI payment details are not configured."
                                    </div>
                                }
                                .into_any(),
                            }}
                        </div>

                        <Label html_for="screenshot">"Payment screenshot"</Label>
                        <input
                            id="screenshot"
                            type="file"
                            accept="image/*"
                            class="text-xs"
                            disabled=move || loading.get()
                            on:change=on_file
                        />

                        <ErrorAlert message=error />

                        <Button class="w-full" size=ButtonSize::Sm attr:disabled=move || loading.get()>
                            <BusyLabel busy=loading idle_text="Submit for Verification" busy_text="Submitting..." />
                        </Button>
                    </form>
                </Show>
            </CardContent>
            <CardFooter class="text-xs text-muted-foreground">
                "Activation usually takes a few hours."
            </CardFooter>
        </Card>
    }
}
