//! Per-control fill strategies.
//!
//! Strategies report `Ok(false)` for "tried, did not take" and `Err` for
//! interaction failures; [`FillExecutor::fill`] folds both into a
//! [`FillOutcome`] so a single control can never abort a run.

use std::path::PathBuf;

use chrono::Datelike;
use tracing::{debug, info, warn};

use crate::catalog::FieldType;
use crate::config::FillerConfig;
use crate::document::{Document, FramePath, Key, Locator};
use crate::error::Result;
use crate::extract::{self, ControlKind, FormField};
use crate::matching::{self, CalendarKind, Choice, SafeStep, SuggestionContext};
use crate::profile::Profile;

/// Fallback selectors for phone inputs that hide behind country-code widgets.
const PHONE_SELECTORS: &[&str] = &[
    "input[type=\"tel\"]",
    "input[name*=\"phone\" i]",
    "input[id*=\"phone\" i]",
    "input[autocomplete=\"tel\"]",
];

const DROPDOWN_LABEL_HINTS: &[&str] = &[
    "authorized",
    "sponsorship",
    "visa",
    "legally",
    "previously worked",
    "currently work",
    "how did you hear",
    "hear about",
    "referral source",
];

const AUTOCOMPLETE_LABEL_HINTS: &[&str] = &[
    "location",
    "city",
    "school",
    "university",
    "college",
    "institution",
    "employer",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FillOutcome {
    Filled,
    /// Nothing took. `options` holds what a custom dropdown offered when
    /// none of it matched.
    Failed { options: Vec<String> },
    /// A single answer-choice control that is not the wanted answer.
    NotApplicable,
}

enum Dropdown {
    Selected,
    NoMatch(Vec<String>),
    NotOpened,
}

pub struct FillExecutor<'a, D: Document + ?Sized> {
    doc: &'a D,
    config: &'a FillerConfig,
    profile: &'a Profile,
}

impl<'a, D: Document + ?Sized> FillExecutor<'a, D> {
    pub fn new(doc: &'a D, config: &'a FillerConfig, profile: &'a Profile) -> Self {
        Self {
            doc,
            config,
            profile,
        }
    }

    /// Apply `value` to the control behind `field`.
    pub async fn fill(&self, field: &FormField, value: &str) -> FillOutcome {
        let mut options = Vec::new();
        let result = match field.kind {
            ControlKind::Text | ControlKind::TextArea => self.text(field, value, &mut options).await,
            ControlKind::Select => self.select(field, value).await,
            ControlKind::Checkbox => self.checkbox(field, value).await,
            ControlKind::Radio if !field.name.is_empty() => self.radio_group(field, value).await,
            ControlKind::Radio => self.radio_option(field, value).await,
            ControlKind::File => self.file(field, value).await,
        };
        match result {
            Ok(true) => FillOutcome::Filled,
            Ok(false) if field.kind == ControlKind::Radio && field.name.is_empty() => {
                FillOutcome::NotApplicable
            }
            Ok(false) => FillOutcome::Failed { options },
            Err(e) => {
                debug!(label = %field.label, locator = %field.locator, error = %e, "fill failed");
                FillOutcome::Failed { options }
            }
        }
    }

    /// Pick the decline-to-answer choice of a demographic question that has
    /// no answer. Returns the chosen option text.
    pub async fn decline(&self, field: &FormField) -> Option<String> {
        let phrases = &self.config.decline_phrases;
        let (frame, locator) = (&field.frame, &field.locator);
        let chosen = match field.kind {
            ControlKind::Select => {
                let idx = matching::decline_option(field.options.iter().map(String::as_str), phrases)?;
                let option = &field.options[idx];
                self.doc.select_option(frame, locator, option).await.ok()?;
                Some(option.clone())
            }
            ControlKind::Radio if field.name.is_empty() => {
                let declining = matching::decline_option([field.label.as_str()], phrases).is_some();
                if declining && self.activate(frame, locator).await {
                    Some(field.label.clone())
                } else {
                    None
                }
            }
            ControlKind::Radio => {
                let (members, choices) = self.radio_choices(field).await.ok()?;
                let idx = matching::decline_option(choices.iter().map(Choice::display), phrases)?;
                self.activate(frame, &members[idx]).await.then(|| choices[idx].display().to_string())
            }
            ControlKind::Text => match self.custom_dropdown(field, "").await {
                Ok(Dropdown::Selected) => Some(String::from("declined")),
                _ => None,
            },
            _ => None,
        };
        if let Some(option) = &chosen {
            info!(label = %field.label, option = %option, "declined to answer");
        }
        chosen
    }

    // ── Text ────────────────────────────────────────────────────────

    async fn text(&self, field: &FormField, value: &str, options: &mut Vec<String>) -> Result<bool> {
        let (frame, locator) = (&field.frame, &field.locator);
        if !self.doc.is_visible(frame, locator).await? {
            if field.field_type == FieldType::Phone {
                return self.phone_fallback(frame, value).await;
            }
            debug!(label = %field.label, "control not visible");
            return Ok(false);
        }
        if self.doc.read_value(frame, locator).await? == value {
            return Ok(true);
        }

        if field.kind == ControlKind::Text && is_dropdown_candidate(field) {
            match self.custom_dropdown(field, value).await {
                Ok(Dropdown::Selected) => return Ok(true),
                Ok(Dropdown::NoMatch(offered)) => {
                    *options = offered;
                    return Ok(false);
                }
                Ok(Dropdown::NotOpened) => {}
                Err(e) => debug!(label = %field.label, error = %e, "custom dropdown attempt failed"),
            }
        }

        if field.kind == ControlKind::Text && is_autocomplete_candidate(field) {
            match self.autocomplete(field, value).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => debug!(label = %field.label, error = %e, "autocomplete attempt failed"),
            }
        }

        match self.plain_entry(frame, locator, value).await {
            Err(e) if field.field_type == FieldType::Phone => {
                debug!(error = %e, "phone entry failed, trying fallbacks");
                self.phone_fallback(frame, value).await
            }
            other => other,
        }
    }

    async fn plain_entry(&self, frame: &FramePath, locator: &Locator, value: &str) -> Result<bool> {
        if self.doc.read_value(frame, locator).await? == value {
            return Ok(true);
        }
        self.doc.focus(frame, locator).await?;
        tokio::time::sleep(self.config.focus_settle).await;
        self.doc.fill(frame, locator, value).await?;
        tokio::time::sleep(self.config.focus_settle).await;
        let written = self.doc.read_value(frame, locator).await?;
        Ok(!written.trim().is_empty())
    }

    async fn phone_fallback(&self, frame: &FramePath, value: &str) -> Result<bool> {
        for selector in PHONE_SELECTORS {
            let locator = Locator::new(*selector);
            if !self.doc.is_visible(frame, &locator).await.unwrap_or(false) {
                continue;
            }
            match self.plain_entry(frame, &locator, value).await {
                Ok(true) => return Ok(true),
                Ok(false) => {}
                Err(e) => debug!(selector, error = %e, "phone fallback failed"),
            }
        }
        match self.doc.locate_by_label(frame, "phone").await? {
            Some(locator) => self.plain_entry(frame, &locator, value).await,
            None => Ok(false),
        }
    }

    /// Combobox rendered from a text input: open it, pick the best visible
    /// option, else a decline option, else close it.
    async fn custom_dropdown(&self, field: &FormField, value: &str) -> Result<Dropdown> {
        let (frame, locator) = (&field.frame, &field.locator);
        self.doc.focus(frame, locator).await?;
        self.doc.click(frame, locator).await?;
        tokio::time::sleep(self.config.dropdown_open_wait).await;

        let offered = self.doc.visible_options(frame).await?;
        if offered.is_empty() {
            return Ok(Dropdown::NotOpened);
        }

        let pick = if value.trim().is_empty() {
            None
        } else {
            matching::best_dropdown_option(&offered, value)
        };
        let pick = pick.or_else(|| {
            matching::decline_option(offered.iter().map(String::as_str), &self.config.decline_phrases)
        });
        if let Some(idx) = pick {
            self.doc.click_visible_option(frame, idx).await?;
            tokio::time::sleep(self.config.option_settle).await;
            debug!(label = %field.label, option = %offered[idx], "dropdown option chosen");
            return Ok(Dropdown::Selected);
        }

        self.doc.press_key(frame, locator, Key::Escape).await?;
        if field.is_eeo() {
            debug!(label = %field.label, "no safe dropdown option, leaving unanswered");
        }
        Ok(Dropdown::NoMatch(offered))
    }

    /// Typeahead: type, wait for suggestions, choose one by context.
    async fn autocomplete(&self, field: &FormField, value: &str) -> Result<bool> {
        let (frame, locator) = (&field.frame, &field.locator);
        self.doc.focus(frame, locator).await?;
        self.doc.click(frame, locator).await?;
        tokio::time::sleep(self.config.focus_settle).await;
        self.doc.fill(frame, locator, "").await?;
        self.doc.type_text(frame, locator, value).await?;
        tokio::time::sleep(self.config.autocomplete_wait).await;

        let raw = self.doc.suggestions(frame, locator).await?;
        let suggestions = matching::clean_suggestions(&raw);
        if suggestions.is_empty() {
            return Ok(false);
        }

        let ctx = SuggestionContext {
            label: field.question().to_string(),
            field_type: field.field_type,
            state: self.profile.location.state.clone(),
            country: self.profile.location.country.clone(),
        };
        let Some(idx) = matching::best_suggestion(&ctx, value, &suggestions) else {
            debug!(label = %field.label, count = suggestions.len(), "no suggestion matches");
            self.doc.press_key(frame, locator, Key::Escape).await?;
            return Ok(false);
        };
        let choice = &suggestions[idx];

        // Retyping reopens a list that may have closed while we scored it.
        self.doc.fill(frame, locator, "").await?;
        self.doc.type_text(frame, locator, value).await?;
        tokio::time::sleep(self.config.option_settle).await;

        let clicked = self.doc.click_option_containing(frame, choice).await?;
        if !clicked {
            self.doc.focus(frame, locator).await?;
            for _ in 0..=idx {
                self.doc.press_key(frame, locator, Key::ArrowDown).await?;
            }
            self.doc.press_key(frame, locator, Key::Enter).await?;
        }
        tokio::time::sleep(self.config.option_settle).await;

        let written = self.doc.read_value(frame, locator).await?;
        if written.trim().is_empty() {
            debug!(label = %field.label, clicked, "suggestion did not stick");
            self.doc.press_key(frame, locator, Key::Escape).await?;
            return Ok(false);
        }
        info!(label = %field.label, choice = %choice, "suggestion chosen");
        Ok(true)
    }

    // ── Select ──────────────────────────────────────────────────────

    async fn select(&self, field: &FormField, value: &str) -> Result<bool> {
        let (frame, locator) = (&field.frame, &field.locator);
        if field.is_high_risk() {
            let choices: Vec<Choice> = field.options.iter().map(|o| Choice::text(o)).collect();
            for (step, idx) in self.plan(&choices, value, field.question()) {
                let option = &field.options[idx];
                if field.current_value == *option {
                    return Ok(true);
                }
                match self.doc.select_option(frame, locator, option).await {
                    Ok(()) => {
                        debug!(label = %field.label, ?step, option = %option, "safe option selected");
                        return Ok(true);
                    }
                    Err(e) => debug!(label = %field.label, ?step, error = %e, "safe option rejected"),
                }
            }
            debug!(label = %field.label, "no safe option, leaving unanswered");
            return Ok(false);
        }

        let calendar = match matching::calendar_kind(&field.label) {
            Some(CalendarKind::Month) => matching::match_month(&field.options, value),
            Some(CalendarKind::Year) => {
                let year = chrono::Local::now().year();
                matching::match_year(&field.options, &field.label, value, year)
            }
            None => None,
        };
        let Some(idx) = calendar.or_else(|| matching::match_select_option(&field.options, value)) else {
            debug!(label = %field.label, value, "no option matches");
            return Ok(false);
        };
        let option = &field.options[idx];
        if field.current_value == *option {
            return Ok(true);
        }
        self.doc.select_option(frame, locator, option).await?;
        Ok(true)
    }

    // ── Checkbox and radio ──────────────────────────────────────────

    async fn checkbox(&self, field: &FormField, value: &str) -> Result<bool> {
        let want = matching::truthy(value);
        if self.doc.is_checked(&field.frame, &field.locator).await? != want {
            self.doc.set_checked(&field.frame, &field.locator, want).await?;
        }
        Ok(true)
    }

    async fn radio_choices(&self, field: &FormField) -> Result<(Vec<Locator>, Vec<Choice>)> {
        let members = self.doc.radio_group(&field.frame, &field.name).await?;
        let choices = members
            .iter()
            .map(|m| {
                let label = extract::label_from_sources(ControlKind::Radio, &m.labels)
                    .unwrap_or_else(|| extract::clean_label(&m.adjacent_text));
                Choice::new(m.value.clone(), label)
            })
            .collect();
        Ok((members.into_iter().map(|m| m.locator).collect(), choices))
    }

    /// Named group: always the conservative sequence.
    async fn radio_group(&self, field: &FormField, value: &str) -> Result<bool> {
        let (members, choices) = self.radio_choices(field).await?;
        if members.is_empty() {
            return self.radio_option(field, value).await;
        }
        for (step, idx) in self.plan(&choices, value, field.question()) {
            if self.activate(&field.frame, &members[idx]).await {
                debug!(label = %field.label, ?step, option = %choices[idx].display(), "radio selected");
                return Ok(true);
            }
        }
        debug!(label = %field.label, "no safe radio option, leaving unanswered");
        Ok(false)
    }

    /// One input per answer: activate it only when it stands for `value`.
    async fn radio_option(&self, field: &FormField, value: &str) -> Result<bool> {
        let matched = matching::option_matches(
            &field.label,
            value,
            field.question(),
            &self.config.decline_phrases,
        );
        if !matched {
            return Ok(false);
        }
        Ok(self.activate(&field.frame, &field.locator).await)
    }

    /// Direct check, pointer click, script click, label click.
    async fn activate(&self, frame: &FramePath, locator: &Locator) -> bool {
        if self.doc.set_checked(frame, locator, true).await.is_ok() {
            return true;
        }
        if self.doc.click(frame, locator).await.is_ok() {
            return true;
        }
        if self.doc.script_click(frame, locator).await.is_ok() {
            return true;
        }
        match self.doc.click_label(frame, locator).await {
            Ok(()) => true,
            Err(e) => {
                debug!(locator = %locator, error = %e, "every activation strategy failed");
                false
            }
        }
    }

    fn plan(&self, choices: &[Choice], value: &str, question: &str) -> Vec<(SafeStep, usize)> {
        matching::safe_plan(choices, value, question, &self.config.decline_phrases)
    }

    // ── File ────────────────────────────────────────────────────────

    async fn file(&self, field: &FormField, value: &str) -> Result<bool> {
        let path = if value.trim().is_empty() {
            match self.profile.resume_path(&self.config.resume_file_names) {
                Some(path) => path,
                None => return Ok(false),
            }
        } else {
            PathBuf::from(value)
        };
        if !path.exists() {
            warn!(path = %path.display(), "attachment not found");
            return Ok(false);
        }
        let (frame, locator) = (&field.frame, &field.locator);
        self.doc.set_files(frame, locator, &path).await?;
        for event in ["change", "input"] {
            self.doc.dispatch_event(frame, locator, event).await?;
        }
        tokio::time::sleep(self.config.upload_settle).await;
        info!(label = %field.label, path = %path.display(), "attachment uploaded");
        Ok(true)
    }
}

/// Text inputs that are likely comboboxes over a fixed choice list.
pub fn is_dropdown_candidate(field: &FormField) -> bool {
    if field.is_eeo()
        || matches!(
            field.field_type,
            FieldType::AuthorizedToWork | FieldType::RequireSponsorship | FieldType::HowDidYouHear
        )
    {
        return true;
    }
    let label = field.question().to_lowercase();
    DROPDOWN_LABEL_HINTS.iter().any(|k| label.contains(k))
}

/// Text inputs that likely offer typeahead suggestions.
pub fn is_autocomplete_candidate(field: &FormField) -> bool {
    if matches!(
        field.field_type,
        FieldType::City
            | FieldType::State
            | FieldType::Country
            | FieldType::University
            | FieldType::CurrentCompany
            | FieldType::Address
    ) {
        return true;
    }
    let label = field.question().to_lowercase();
    AUTOCOMPLETE_LABEL_HINTS.iter().any(|k| label.contains(k))
}
