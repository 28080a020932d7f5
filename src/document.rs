//! The seam between the filling engine and a rendered page.
//!
//! Everything the engine knows about a page comes through [`Document`]:
//! raw control facts for extraction and a small set of interaction commands.
//! Controls are addressed by [`Locator`] inside a [`FramePath`], never by a
//! retained element handle, so any control can be re-resolved after the page
//! mutates underneath it.

use std::fmt;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Which document inside the page holds the form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FramePath {
    TopLevel,
    /// An embedded document, reached through the host element matching `selector`.
    Embedded { selector: String },
}

impl FramePath {
    pub fn embedded(selector: impl Into<String>) -> Self {
        FramePath::Embedded {
            selector: selector.into(),
        }
    }

    pub fn is_top_level(&self) -> bool {
        matches!(self, FramePath::TopLevel)
    }
}

impl fmt::Display for FramePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FramePath::TopLevel => f.write_str("top-level"),
            FramePath::Embedded { selector } => write!(f, "frame({selector})"),
        }
    }
}

/// Durable CSS selector for one control.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Locator(String);

impl Locator {
    pub fn new(selector: impl Into<String>) -> Self {
        Locator(selector.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Locator {
    fn from(s: &str) -> Self {
        Locator(s.to_string())
    }
}

/// An embedded document host as seen from the top-level page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedFrame {
    /// Stable selector for the host element.
    pub selector: String,
    pub url: String,
}

/// Text found near a control that may serve as its label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelSources {
    /// `<label for=...>` text.
    pub explicit: String,
    /// Text of an enclosing `<label>`.
    pub ancestor: String,
    /// Text of a `<label>` among the preceding siblings of the control or its parent.
    pub sibling: String,
    /// Heading and caption texts found walking up at most five ancestors,
    /// nearest first.
    pub captions: Vec<Caption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Caption {
    pub text: String,
    pub heading: bool,
}

/// Attribute candidate for a fallback locator, with its uniqueness in the
/// owning document already checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeHint {
    pub attr: String,
    pub value: String,
    pub unique: bool,
}

/// Facts the page reports about one interactive control.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawControl {
    pub tag: String,
    pub input_type: String,
    pub name: String,
    pub id: String,
    pub placeholder: String,
    pub aria_label: String,
    pub value: String,
    pub checked: bool,
    pub required: bool,
    /// Option texts for `<select>` controls, in document order.
    pub options: Vec<String>,
    /// `None` when the visibility check itself failed.
    pub visible: Option<bool>,
    pub labels: LabelSources,
    /// Question text of the enclosing fieldset or radiogroup, if any.
    pub group_label: String,
    /// Fallback attributes in preference order.
    pub attributes: Vec<AttributeHint>,
    /// Id of the nearest ancestor carrying one.
    pub anchor_id: Option<String>,
    /// `tag:nth-of-type(n)` steps from the anchor (or the root) down to the control.
    pub path: Vec<String>,
}

/// One member of a named radio group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioMember {
    pub locator: Locator,
    pub value: String,
    pub checked: bool,
    pub labels: LabelSources,
    /// Text immediately following the input, for bare `<input> Yes` layouts.
    pub adjacent_text: String,
}

impl Default for Locator {
    fn default() -> Self {
        Locator(String::new())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Enter,
    Escape,
    ArrowDown,
    Tab,
}

impl Key {
    pub fn name(self) -> &'static str {
        match self {
            Key::Enter => "Enter",
            Key::Escape => "Escape",
            Key::ArrowDown => "ArrowDown",
            Key::Tab => "Tab",
        }
    }

    pub fn key_code(self) -> i64 {
        match self {
            Key::Enter => 13,
            Key::Escape => 27,
            Key::ArrowDown => 40,
            Key::Tab => 9,
        }
    }
}

/// A live, navigable page. Implementations must tolerate any control having
/// been removed since it was last reported and answer with
/// [`Error::Detached`](crate::Error::Detached) rather than panicking.
#[async_trait]
pub trait Document: Send + Sync {
    async fn url(&self) -> Result<String>;

    async fn html(&self) -> Result<String>;

    async fn embedded_frames(&self) -> Result<Vec<EmbeddedFrame>>;

    /// Whether the host element matches and its document is reachable.
    async fn probe_frame(&self, selector: &str) -> Result<bool>;

    /// Number of non-hidden fillable controls in the frame.
    async fn count_controls(&self, frame: &FramePath) -> Result<usize>;

    /// Every candidate control in the frame, in document order.
    async fn scan_controls(&self, frame: &FramePath) -> Result<Vec<RawControl>>;

    async fn is_visible(&self, frame: &FramePath, locator: &Locator) -> Result<bool>;

    async fn is_checked(&self, frame: &FramePath, locator: &Locator) -> Result<bool>;

    async fn read_value(&self, frame: &FramePath, locator: &Locator) -> Result<String>;

    async fn focus(&self, frame: &FramePath, locator: &Locator) -> Result<()>;

    /// Pointer click at the control's centre.
    async fn click(&self, frame: &FramePath, locator: &Locator) -> Result<()>;

    /// `element.click()` from script, bypassing hit-testing.
    async fn script_click(&self, frame: &FramePath, locator: &Locator) -> Result<()>;

    /// Replace the control's value and notify input listeners.
    async fn fill(&self, frame: &FramePath, locator: &Locator, value: &str) -> Result<()>;

    /// Type character by character into the focused control.
    async fn type_text(&self, frame: &FramePath, locator: &Locator, text: &str) -> Result<()>;

    async fn press_key(&self, frame: &FramePath, locator: &Locator, key: Key) -> Result<()>;

    /// Select the native option whose text is `label`.
    async fn select_option(&self, frame: &FramePath, locator: &Locator, label: &str)
        -> Result<()>;

    async fn set_checked(&self, frame: &FramePath, locator: &Locator, checked: bool)
        -> Result<()>;

    async fn set_files(&self, frame: &FramePath, locator: &Locator, path: &Path) -> Result<()>;

    async fn dispatch_event(&self, frame: &FramePath, locator: &Locator, event: &str)
        -> Result<()>;

    /// Suggestion texts from the list tied to this control: the list named by
    /// `aria-controls`/`aria-owns`, else the nearest list found in a bounded
    /// ancestor search.
    async fn suggestions(&self, frame: &FramePath, locator: &Locator) -> Result<Vec<String>>;

    /// Click the first visible option element whose text contains `text`.
    async fn click_option_containing(&self, frame: &FramePath, text: &str) -> Result<bool>;

    /// Texts of all currently visible option-like elements.
    async fn visible_options(&self, frame: &FramePath) -> Result<Vec<String>>;

    async fn click_visible_option(&self, frame: &FramePath, index: usize) -> Result<()>;

    async fn radio_group(&self, frame: &FramePath, name: &str) -> Result<Vec<RadioMember>>;

    /// Click the label associated with the control.
    async fn click_label(&self, frame: &FramePath, locator: &Locator) -> Result<()>;

    /// Find a fillable control whose label text contains `label`.
    async fn locate_by_label(&self, frame: &FramePath, label: &str) -> Result<Option<Locator>>;

    async fn wait_for_selector(
        &self,
        frame: &FramePath,
        selector: &str,
        timeout: Duration,
    ) -> Result<Locator>;
}
