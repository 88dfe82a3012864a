//! Data model shared by the session store, the workflow and the CLI.
//!
//! Field names serialise in camelCase (`validUntil`, `apiKeys`, `createdAt`)
//! so a stored session stays readable by anything that consumed the old
//! browser-side blob.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Length of the subscription period granted at login or registration.
pub const TRIAL_PERIOD_DAYS: i64 = 30;

// ── User ─────────────────────────────────────────────────────────────────

/// The authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub subscription: Subscription,
    #[serde(default)]
    pub api_keys: ApiKeys,
    pub settings: Settings,
}

impl User {
    /// A fresh free-tier profile valid for [`TRIAL_PERIOD_DAYS`] from `now`.
    pub fn free_tier(
        id: impl Into<String>,
        email: impl Into<String>,
        name: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
            name: name.into(),
            avatar: None,
            subscription: Subscription {
                plan: Plan::Free,
                status: SubscriptionStatus::Active,
                valid_until: now + Duration::days(TRIAL_PERIOD_DAYS),
            },
            api_keys: ApiKeys::default(),
            settings: Settings::default(),
        }
    }

    /// Apply a shallow merge: every present field replaces the current value.
    pub fn apply(&mut self, patch: UserPatch) {
        let UserPatch {
            email,
            name,
            avatar,
            subscription,
            api_keys,
            settings,
        } = patch;
        if let Some(v) = email {
            self.email = v;
        }
        if let Some(v) = name {
            self.name = v;
        }
        if let Some(v) = avatar {
            self.avatar = v;
        }
        if let Some(v) = subscription {
            self.subscription = v;
        }
        if let Some(v) = api_keys {
            self.api_keys = v;
        }
        if let Some(v) = settings {
            self.settings = v;
        }
    }
}

/// Partial update for [`User`]. `None` leaves a field untouched.
///
/// Nested values are replaced whole: a patch carrying `api_keys` with only
/// `openai` set drops any existing `groq` key.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserPatch {
    pub email: Option<String>,
    pub name: Option<String>,
    /// `Some(None)` clears the avatar.
    pub avatar: Option<Option<String>>,
    pub subscription: Option<Subscription>,
    pub api_keys: Option<ApiKeys>,
    pub settings: Option<Settings>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub plan: Plan,
    pub status: SubscriptionStatus,
    pub valid_until: DateTime<Utc>,
}

/// Subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    Free,
    Pro,
    Enterprise,
}

impl Plan {
    pub const ALL: [Plan; 3] = [Plan::Free, Plan::Pro, Plan::Enterprise];

    pub fn as_str(self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Pro => "pro",
            Plan::Enterprise => "enterprise",
        }
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Plan {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "free" => Ok(Plan::Free),
            "pro" => Ok(Plan::Pro),
            "enterprise" => Ok(Plan::Enterprise),
            other => Err(format!("unknown plan '{other}' (expected free, pro or enterprise)")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    Cancelled,
}

/// Per-provider secrets. Each entry is optional.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeys {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub openai: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub groq: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gemini: Option<String>,
}

impl ApiKeys {
    /// The key for `model`, ignoring empty strings.
    pub fn get(&self, model: AiModel) -> Option<&str> {
        let slot = match model {
            AiModel::Groq => &self.groq,
            AiModel::OpenAi => &self.openai,
            AiModel::Gemini => &self.gemini,
        };
        slot.as_deref().filter(|k| !k.is_empty())
    }

    pub fn set(&mut self, model: AiModel, key: Option<String>) {
        let slot = match model {
            AiModel::Groq => &mut self.groq,
            AiModel::OpenAi => &mut self.openai,
            AiModel::Gemini => &mut self.gemini,
        };
        *slot = key;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub notifications: bool,
    pub theme: Theme,
    pub default_model: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            notifications: true,
            theme: Theme::Light,
            default_model: AiModel::Groq.as_str().to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn as_str(self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── Video ────────────────────────────────────────────────────────────────

/// A finished video in the user's list. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: DateTime<Utc>,
    /// Seconds.
    pub duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
}

// ── AI model selection ───────────────────────────────────────────────────

/// Which LLM provider writes the script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiModel {
    #[default]
    Groq,
    OpenAi,
    Gemini,
}

impl AiModel {
    pub const ALL: [AiModel; 3] = [AiModel::Groq, AiModel::OpenAi, AiModel::Gemini];

    pub fn as_str(self) -> &'static str {
        match self {
            AiModel::Groq => "groq",
            AiModel::OpenAi => "openai",
            AiModel::Gemini => "gemini",
        }
    }
}

impl fmt::Display for AiModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AiModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "groq" => Ok(AiModel::Groq),
            "openai" => Ok(AiModel::OpenAi),
            "gemini" => Ok(AiModel::Gemini),
            other => Err(format!("unknown model '{other}' (expected groq, openai or gemini)")),
        }
    }
}
