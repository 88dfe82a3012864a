//! Transient generation parameters for one open creation workflow.
//!
//! Never persisted. A new [`crate::workflow::CreationWorkflow`] starts from a
//! fresh draft.

use crate::model::{AiModel, User};

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VideoDraft {
    /// Provider that writes the script.
    pub model: AiModel,
    /// Background-footage search query.
    pub theme: String,
    /// Burn subtitles into the final video.
    pub subtitles: bool,
    /// Set while a remote call is outstanding.
    pub busy: bool,
}

impl VideoDraft {
    /// A fresh draft whose model follows the user's default, falling back to
    /// Groq when the setting names no known provider.
    pub fn for_user(user: Option<&User>) -> Self {
        let model = user
            .and_then(|u| u.settings.default_model.parse::<AiModel>().ok())
            .unwrap_or_default();
        Self {
            model,
            ..Self::default()
        }
    }

    /// The theme as a search query, or `None` when blank so the backend
    /// applies its own default.
    pub fn theme_query(&self) -> Option<&str> {
        let t = self.theme.trim();
        (!t.is_empty()).then_some(t)
    }
}
