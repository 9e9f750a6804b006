use crate::components::ui::{Button, ButtonSize, ButtonVariant, Input, Label};
use crate::features::session::{Certificate, SessionRun, CERTIFICATE_FAILED_TEXT};
use crate::util::browser::{alert, document, download_data_url};
use crate::util::now_ms;
use leptos::prelude::*;
use wasm_bindgen::{JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement};

const WIDTH: f64 = 1000.0;
const HEIGHT: f64 = 700.0;
const PIXEL_RATIO: f64 = 2.0;
const SERIF: &str = "'Times New Roman', Times, serif";
const NAVY: &str = "#1e3a8a";
const BLUE: &str = "#1e40af";
const INK: &str = "#1f2937";
const GOLD: &str = "#ca8a04";

fn text(ctx: &CanvasRenderingContext2d, font: &str, color: &str, value: &str, x: f64, y: f64) -> Result<(), JsValue> {
    ctx.set_font(&format!("{font} {SERIF}"));
    ctx.set_fill_style_str(color);
    ctx.fill_text_with_max_width(value, x, y, WIDTH - 120.0)
}

fn rule(ctx: &CanvasRenderingContext2d, color: &str, from: f64, to: f64, y: f64) {
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(2.0);
    ctx.begin_path();
    ctx.move_to(from, y);
    ctx.line_to(to, y);
    ctx.stroke();
}

/// Draws the certificate on an offscreen canvas and returns a PNG data URL.
fn render_png(certificate: &Certificate) -> Result<String, JsValue> {
    let canvas: HtmlCanvasElement = document()?.create_element("canvas")?.dyn_into()?;
    canvas.set_width((WIDTH * PIXEL_RATIO) as u32);
    canvas.set_height((HEIGHT * PIXEL_RATIO) as u32);
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context is unavailable"))?
        .dyn_into()?;
    ctx.scale(PIXEL_RATIO, PIXEL_RATIO)?;

    ctx.set_fill_style_str("#f3f4f6");
    ctx.fill_rect(0.0, 0.0, WIDTH, HEIGHT);
    ctx.set_stroke_style_str(BLUE);
    ctx.set_line_width(16.0);
    ctx.stroke_rect(8.0, 8.0, WIDTH - 16.0, HEIGHT - 16.0);
    ctx.set_text_align("center");

    let center = WIDTH / 2.0;
    text(&ctx, "bold 48px", NAVY, "Certificate of Completion", center, 110.0)?;
    text(&ctx, "20px", INK, "This certificate is proudly presented to", center, 150.0)?;
    rule(&ctx, GOLD, center - 320.0, center + 320.0, 205.0);
    text(&ctx, "800 60px", INK, &certificate.recipient, center, 275.0)?;
    rule(&ctx, GOLD, center - 320.0, center + 320.0, 300.0);
    text(&ctx, "20px", INK, "for successfully completing the Study Session on", center, 370.0)?;
    text(&ctx, "600 30px", BLUE, &format!("\"{}\"", certificate.session_title), center, 420.0)?;
    text(&ctx, "20px", INK, &certificate.score_line(), center, 465.0)?;

    rule(&ctx, INK, 70.0, 270.0, 600.0);
    text(&ctx, "bold 14px", INK, "Focus.AI", 170.0, 622.0)?;
    text(&ctx, "14px", INK, "AI Study Platform", 170.0, 642.0)?;
    text(&ctx, "bold 18px", NAVY, "Focus.AI", center, 630.0)?;
    rule(&ctx, INK, WIDTH - 270.0, WIDTH - 70.0, 600.0);
    text(&ctx, "bold 14px", INK, &certificate.date, WIDTH - 170.0, 622.0)?;
    text(&ctx, "14px", INK, "Date", WIDTH - 170.0, 642.0)?;

    canvas.to_data_url_with_type("image/png")
}

/// "Download Certificate" for a finished session: asks for the name to print,
/// then saves the certificate as a PNG.
#[component]
pub(crate) fn CertificateDownload(run: SessionRun) -> impl IntoView {
    let run = StoredValue::new(run);
    let open = RwSignal::new(false);
    let name = RwSignal::new(String::new());

    let on_generate = move |ev: web_sys::SubmitEvent| {
        ev.prevent_default();
        let Some(certificate) = run.with_value(|r| r.certificate(&name.get_untracked(), now_ms())) else {
            return;
        };
        let saved = render_png(&certificate)
            .and_then(|png| download_data_url(&certificate.file_name(), &png));
        match saved {
            Ok(()) => {
                log::info!("event=certificate module=pages status=ok percent={}", certificate.percent);
                open.set(false);
            }
            Err(e) => {
                log::error!("event=certificate module=pages status=error reason={e:?}");
                alert(CERTIFICATE_FAILED_TEXT);
            }
        }
        name.set(String::new());
    };

    view! {
        <Show
            when=move || open.get()
            fallback=move || view! {
                <Button size=ButtonSize::Sm variant=ButtonVariant::Outline on:click=move |_| open.set(true)>
                    "Download Certificate"
                </Button>
            }
        >
            <form class="flex flex-col gap-2 rounded-md border p-3" on:submit=on_generate>
                <Label html_for="certificate-name">"Please enter your full name to be printed on the certificate."</Label>
                <Input id="certificate-name" placeholder="Your full name" bind_value=name class="h-8 text-sm" />
                <div class="flex gap-2">
                    <Button size=ButtonSize::Sm attr:disabled=move || name.with(|n| n.trim().is_empty())>
                        "Generate & Download"
                    </Button>
                    <Button
                        size=ButtonSize::Sm
                        variant=ButtonVariant::Ghost
                        attr:r#type="button"
                        on:click=move |_| open.set(false)
                    >
                        "Cancel"
                    </Button>
                </div>
            </form>
        </Show>
    }
}
