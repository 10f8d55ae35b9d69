use derive_more::{From, TryInto};
use engine::{image_model::GenerationResult, token::TokenCheck};

#[derive(Debug, Clone, From)]
pub enum Message {
    Ui(UiMessage),
    Context(ContextMessage),
}

/// Results of background requests, handled by the context rather than a state
#[derive(Debug, Clone)]
pub enum ContextMessage {
    TokenChecked { epoch: u64, check: TokenCheck },
    ImageGenerated {
        prompt: String,
        result: GenerationResult,
    },
}

#[derive(Debug, Clone, From, TryInto)]
pub enum UiMessage {
    Studio(ui_messages::Studio),
    MessageDialog(ui_messages::MessageDialog),
}

pub mod ui_messages {
    use iced::widget::text_editor;

    #[derive(Debug, Clone)]
    pub enum Studio {
        TokenEdited(String),
        TokenSubmitted,
        PromptAction(text_editor::Action),
        Generate,
        ShowTips,
    }

    #[derive(Debug, Clone)]
    pub enum MessageDialog {
        Confirm,
        EditAction(text_editor::Action),
    }
}
