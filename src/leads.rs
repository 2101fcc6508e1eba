//! Lead-capture modal.
//!
//! The modal is overlay state owned by the controller, not markup inside the
//! generated document, so page replacement never touches it.

use chrono::{DateTime, Utc};
use ngw_generation::LeadSubmission;
use serde::Serialize;
use thiserror::Error;

/// Which form a CTA opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FormKind {
    Demo,
    Trial,
    Signup,
    Contact,
    Pricing,
    Default,
}

/// Optional fields a form may show besides name and email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtraField {
    Company,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormConfig {
    pub title: &'static str,
    pub subtitle: &'static str,
    pub submit_label: &'static str,
    pub extra_fields: &'static [ExtraField],
}

impl FormKind {
    /// Precedence order for keyword matching. A keyword must start a word.
    const MATCH_ORDER: [(FormKind, &'static [&'static str]); 5] = [
        (FormKind::Demo, &["demo"]),
        (FormKind::Trial, &["trial", "try"]),
        (FormKind::Signup, &["signup", "sign-up", "sign up", "register", "get started", "get-started"]),
        (FormKind::Contact, &["contact", "sales", "talk"]),
        (FormKind::Pricing, &["pricing", "price", "quote"]),
    ];

    /// Pick a form from the CTA type, then from the button label.
    pub fn from_cta(cta_type: &str, label: &str) -> Self {
        Self::match_keywords(cta_type)
            .or_else(|| Self::match_keywords(label))
            .unwrap_or(FormKind::Default)
    }

    fn match_keywords(text: &str) -> Option<Self> {
        let text = text.to_lowercase();
        if text.trim().is_empty() {
            return None;
        }
        Self::MATCH_ORDER
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|k| starts_word(&text, k)))
            .map(|(kind, _)| *kind)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FormKind::Demo => "demo",
            FormKind::Trial => "trial",
            FormKind::Signup => "signup",
            FormKind::Contact => "contact",
            FormKind::Pricing => "pricing",
            FormKind::Default => "default",
        }
    }

    pub fn config(&self) -> FormConfig {
        use ExtraField::*;
        match self {
            FormKind::Demo => FormConfig {
                title: "Book a demo",
                subtitle: "See the product in action with someone from our team.",
                submit_label: "Request demo",
                extra_fields: &[Company, Message],
            },
            FormKind::Trial => FormConfig {
                title: "Start your free trial",
                subtitle: "Get full access. No credit card required.",
                submit_label: "Start trial",
                extra_fields: &[Company],
            },
            FormKind::Signup => FormConfig {
                title: "Create your account",
                subtitle: "Get started in less than a minute.",
                submit_label: "Sign up",
                extra_fields: &[],
            },
            FormKind::Contact => FormConfig {
                title: "Contact us",
                subtitle: "Tell us what you need and we'll get back to you.",
                submit_label: "Send message",
                extra_fields: &[Company, Message],
            },
            FormKind::Pricing => FormConfig {
                title: "Get pricing",
                subtitle: "We'll send a quote tailored to your team.",
                submit_label: "Get a quote",
                extra_fields: &[Company],
            },
            FormKind::Default => FormConfig {
                title: "Get in touch",
                subtitle: "Leave your details and we'll reach out.",
                submit_label: "Submit",
                extra_fields: &[Message],
            },
        }
    }
}

/// What the visitor typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeadForm {
    pub name: String,
    pub email: String,
    pub company: Option<String>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LeadFormError {
    #[error("Please enter your name")]
    MissingName,

    #[error("Please enter a valid email address")]
    InvalidEmail,

    #[error("No lead form is open")]
    NotOpen,
}

/// Overlay state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LeadModal {
    #[default]
    Closed,
    Open {
        kind: FormKind,
        cta_type: String,
        label: String,
    },
    Submitting {
        kind: FormKind,
        cta_type: String,
    },
    Success {
        kind: FormKind,
    },
}

impl LeadModal {
    /// Open (or re-open) the modal for a CTA.
    pub fn open(&mut self, cta_type: &str, label: &str) -> FormKind {
        let kind = FormKind::from_cta(cta_type, label);
        *self = LeadModal::Open {
            kind,
            cta_type: cta_type.to_string(),
            label: label.to_string(),
        };
        kind
    }

    pub fn close(&mut self) {
        *self = LeadModal::Closed;
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, LeadModal::Closed)
    }

    pub fn kind(&self) -> Option<FormKind> {
        match self {
            LeadModal::Closed => None,
            LeadModal::Open { kind, .. }
            | LeadModal::Submitting { kind, .. }
            | LeadModal::Success { kind } => Some(*kind),
        }
    }

    /// Validate the form and move to `Submitting`.
    ///
    /// On a validation error the modal stays open and nothing is built.
    pub fn begin_submit(
        &mut self,
        form: &LeadForm,
        site_id: &str,
        source: &str,
        now: DateTime<Utc>,
    ) -> Result<LeadSubmission, LeadFormError> {
        let (kind, cta_type) = match self {
            LeadModal::Open { kind, cta_type, .. } => (*kind, cta_type.clone()),
            _ => return Err(LeadFormError::NotOpen),
        };
        let name = form.name.trim();
        if name.is_empty() {
            return Err(LeadFormError::MissingName);
        }
        let email = form.email.trim();
        if !looks_like_email(email) {
            return Err(LeadFormError::InvalidEmail);
        }

        let submission = LeadSubmission {
            site_id: site_id.to_string(),
            name: name.to_string(),
            email: email.to_string(),
            company: non_blank(form.company.as_deref()),
            message: non_blank(form.message.as_deref()),
            cta_type: cta_type.clone(),
            source: source.to_string(),
            timestamp: now.to_rfc3339(),
        };
        *self = LeadModal::Submitting { kind, cta_type };
        Ok(submission)
    }

    /// Delivery finished, successfully or not.
    ///
    /// Only a `Submitting` modal moves to `Success`; a form opened or closed
    /// while the post was in flight is left as is.
    pub fn finish(&mut self) {
        if let LeadModal::Submitting { kind, .. } = *self {
            *self = LeadModal::Success { kind };
        }
    }
}

/// `keyword` occurs in `text` at the start of a word.
fn starts_word(text: &str, keyword: &str) -> bool {
    text.match_indices(keyword).any(|(at, _)| {
        text[..at]
            .chars()
            .next_back()
            .map_or(true, |prev| !prev.is_alphanumeric())
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn looks_like_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .is_some_and(|(host, tld)| !host.is_empty() && !tld.is_empty())
        }
        None => false,
    }
}
