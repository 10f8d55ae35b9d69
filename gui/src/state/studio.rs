use color_eyre::Result;
use iced::{
    Color, ContentFit, Element, Font, Length, padding,
    widget::{
        self, button, column, container, row, rule, scrollable, space, stack, text, text_editor,
        text_input,
    },
};

use crate::{
    TryIntoExt, bold_text,
    context::Context,
    elem_list,
    feedback::{self, Feedback, Level},
    italic_text,
    message::{UiMessage, ui_messages::Studio as MyMessage},
    state::{Modal, State, StateCommand, cmd},
    top_level_container,
};

const TITLE: &str = "🎨ImagiCraft🎨";
const PROMPT_HELP: &str = "Describe the image you want to generate. Be specific!";

const GET_STARTED: &str = indoc::indoc! {"
    1. Create a free account at https://huggingface.co/join
    2. Go to Settings → Access Tokens
    3. Create a new token (READ access is sufficient)
    4. Paste your token above and press Enter
"};

const TIPS: &str = indoc::indoc! {r#"
    - Be specific in your descriptions
    - Include details about style (e.g., "digital art", "oil painting", "photograph")
    - Mention lighting and composition
    - Specify colors and mood
    - Add artistic references if desired

    Example: "A serene landscape at sunset, showing a peaceful lake surrounded by pine trees,
    with mountains in the background, digital art style, warm colors, dramatic lighting"
"#};

/// The one page of the app: token sidebar on the left, prompt and result on the right.
#[derive(Debug, Clone)]
pub struct Studio {
    prompt: text_editor::Content,
}

impl Studio {
    pub fn new() -> Self {
        Self {
            prompt: text_editor::Content::default(),
        }
    }
}

impl Default for Studio {
    fn default() -> Self {
        Self::new()
    }
}

impl State for Studio {
    fn update(&mut self, event: UiMessage, ctx: &mut Context) -> Result<StateCommand> {
        use MyMessage::*;
        match event.try_into_ex()? {
            TokenEdited(value) => {
                ctx.edit_token(value);
                cmd::none()
            }
            TokenSubmitted => cmd::task(ctx.submit_token()),
            PromptAction(action) => {
                self.prompt.perform(action);
                cmd::none()
            }
            Generate => cmd::task(ctx.generate(prompt_text(&self.prompt))),
            ShowTips => cmd::transition(Modal::message(
                State::clone(self),
                "💡 Tips for Better Results",
                TIPS,
            )),
        }
    }

    fn view<'a>(&'a self, ctx: &'a Context) -> Element<'a, UiMessage> {
        let page = row![sidebar(ctx), main_area(&self.prompt, ctx)].height(Length::Fill);

        match &ctx.background {
            Some(bg) => stack![
                widget::image(bg.clone())
                    .content_fit(ContentFit::Cover)
                    .width(Length::Fill)
                    .height(Length::Fill),
                page
            ]
            .into(),
            None => page.into(),
        }
    }

    fn clone(&self) -> Box<dyn State> {
        Box::new(Clone::clone(self))
    }
}

/// What the user typed, minus the line ending the editor appends
fn prompt_text(content: &text_editor::Content) -> String {
    let mut text = content.text();
    if text.ends_with('\n') {
        text.pop();
    }
    text
}

fn sidebar(ctx: &Context) -> Element<'_, UiMessage> {
    let mut items = Vec::from(elem_list![
        bold_text("API Configuration").size(20),
        text("Enter your Hugging Face API token:"),
        text_input("hf_...", ctx.session.credential())
            .secure(true)
            .on_input(|s| MyMessage::TokenEdited(s).into())
            .on_submit(MyMessage::TokenSubmitted.into()),
        text("Get your free token at huggingface.co/settings/tokens").size(12),
        button("Validate").on_press_maybe(
            (!ctx.session.is_validating()).then(|| MyMessage::TokenSubmitted.into())
        ),
    ]);

    if let Some(status) = feedback::for_token(&ctx.session) {
        items.push(feedback_line(status));
    }

    if ctx.config.show_diagnostics {
        if let Some(diag) = &ctx.token_diagnostics {
            items.extend(
                feedback::diagnostics_lines(diag)
                    .into_iter()
                    .map(|line| text(line).size(12).into()),
            );
        }
    }

    items.extend(elem_list![
        rule::horizontal(1),
        bold_text("📝 How to Get Started:"),
        text(GET_STARTED),
        text!("Model: {}", ctx.config.model).size(12),
    ]);

    container(scrollable(
        column(items).spacing(12).padding(padding::all(20).right(25)),
    ))
    .width(340)
    .height(Length::Fill)
    .style(|_theme| container::background(Color::from_rgba(0.95, 0.95, 0.95, 0.92)))
    .into()
}

fn main_area<'a>(prompt: &'a text_editor::Content, ctx: &'a Context) -> Element<'a, UiMessage> {
    let generating = ctx.session.is_generating();

    let mut items = Vec::from(elem_list![
        text(TITLE)
            .size(42)
            .font(Font::MONOSPACE)
            .color(Color::from_rgb(0.0, 0.5, 0.0))
            .width(Length::Fill)
            .center(),
    ]);

    if let Some(banner) = ctx.banner {
        items.push(feedback_line(Feedback {
            level: Level::Warning,
            text: banner.into(),
        }));
    }

    items.extend(elem_list![
        bold_text("Create Your Image").size(24),
        text("Image Description:"),
        text_editor(prompt)
            .placeholder(PROMPT_HELP)
            .height(100)
            .on_action(|a| MyMessage::PromptAction(a).into()),
        button(text("🎨 Generate Image").width(Length::Fill).center())
            .width(Length::Fill)
            .padding(10)
            .on_press_maybe((!generating).then(|| MyMessage::Generate.into())),
    ]);

    if generating {
        items.push(text(feedback::GENERATING).into());
    }
    items.extend(ctx.feedback.iter().cloned().map(feedback_line));

    if let Some(handle) = &ctx.image {
        let caption = ctx
            .session
            .last_outcome()
            .map(|o| o.prompt.as_str())
            .unwrap_or_default();
        items.extend(elem_list![
            widget::image(handle.clone()).width(Length::Fill),
            italic_text(caption).width(Length::Fill).center(),
        ]);
    }

    items.push(
        row![
            space::horizontal(),
            button("💡 Tips").on_press(MyMessage::ShowTips.into())
        ]
        .into(),
    );

    top_level_container(column(items).spacing(15)).into()
}

fn feedback_line<'a>(fb: Feedback) -> Element<'a, UiMessage> {
    let color = match fb.level {
        Level::Success => Color::from_rgb(0.1, 0.5, 0.2),
        Level::Info => Color::from_rgb(0.1, 0.3, 0.6),
        Level::Warning => Color::from_rgb(0.6, 0.45, 0.0),
        Level::Error => Color::from_rgb(0.7, 0.1, 0.1),
    };
    container(text(fb.text).color(color))
        .padding(10)
        .width(Length::Fill)
        .style(move |_theme| container::background(Color { a: 0.12, ..color }))
        .into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_keeps_surrounding_spaces() {
        let content = text_editor::Content::with_text("  a cat in the rain  ");
        assert_eq!(prompt_text(&content), "  a cat in the rain  ");
    }

    #[test]
    fn multi_line_prompt_is_kept_whole() {
        let content = text_editor::Content::with_text("a cat\n\nin the rain");
        assert_eq!(prompt_text(&content), "a cat\n\nin the rain");
    }
}
