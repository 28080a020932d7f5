#![allow(dead_code)]

use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use applyfill::document::{EmbeddedFrame, Key, RadioMember, RawControl};
use applyfill::extract::build_locator;
use applyfill::{Document, Error, FramePath, Locator, Profile, Result};
use async_trait::async_trait;

pub const PROFILE: &str = r#"
personal:
  first_name: Ada
  last_name: Lovelace
  email: ada@example.com
  phone: "555-0100"
location:
  city: San Diego
  state: CA
  country: United States
work_authorization:
  authorized_to_work: true
  require_sponsorship: false
  visa_status: H-1B
diversity:
  gender: Female
  hispanic_latino: "No"
  race: Asian
"#;

pub fn profile() -> Arc<Profile> {
    Arc::new(Profile::from_yaml(PROFILE, None).unwrap())
}

/// How a typeahead list reacts to the mouse and keyboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ListMode {
    #[default]
    Clickable,
    /// Clicks miss; ArrowDown/Enter pick the highlighted entry.
    KeyboardOnly,
    /// Clicks miss; Enter clears the input.
    Unresponsive,
}

/// One control of the in-memory page.
#[derive(Debug, Clone, Default)]
pub struct FakeControl {
    pub raw: RawControl,
    pub visible: bool,
    /// Options shown when the control is clicked (custom dropdown).
    pub dropdown: Vec<String>,
    /// Typeahead entries offered once something is typed.
    pub suggestions: Vec<String>,
    /// Present only while the control at `.0` holds value `.1`.
    pub reveal_when: Option<(String, String)>,
    /// Writing this control overwrites the control at `.0` with `.1`.
    pub clobbers: Option<(String, String)>,
    pub list_mode: ListMode,
    highlighted: usize,
}

impl FakeControl {
    fn new(tag: &str, input_type: &str, id: &str, label: &str) -> Self {
        let mut raw = RawControl {
            tag: tag.to_string(),
            input_type: input_type.to_string(),
            id: id.to_string(),
            visible: Some(true),
            ..Default::default()
        };
        raw.labels.explicit = label.to_string();
        Self {
            raw,
            visible: true,
            ..Default::default()
        }
    }

    pub fn text(id: &str, label: &str) -> Self {
        Self::new("input", "text", id, label)
    }

    pub fn textarea(id: &str, label: &str) -> Self {
        Self::new("textarea", "", id, label)
    }

    pub fn select(id: &str, label: &str, options: &[&str]) -> Self {
        let mut c = Self::new("select", "", id, label);
        c.raw.options = options.iter().map(|s| s.to_string()).collect();
        c
    }

    pub fn file(id: &str, label: &str) -> Self {
        Self::new("input", "file", id, label)
    }

    pub fn radio(id: &str, name: &str, value: &str, label: &str, question: &str) -> Self {
        let mut c = Self::new("input", "radio", id, label);
        c.raw.name = name.to_string();
        c.raw.value = value.to_string();
        c.raw.group_label = question.to_string();
        c
    }

    pub fn required(mut self) -> Self {
        self.raw.required = true;
        self
    }

    pub fn with_value(mut self, value: &str) -> Self {
        self.raw.value = value.to_string();
        self
    }

    pub fn dropdown(mut self, options: &[&str]) -> Self {
        self.dropdown = options.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn suggestions(mut self, options: &[&str]) -> Self {
        self.suggestions = options.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn list_mode(mut self, mode: ListMode) -> Self {
        self.list_mode = mode;
        self
    }

    pub fn revealed_when(mut self, locator: &str, value: &str) -> Self {
        self.reveal_when = Some((locator.to_string(), value.to_string()));
        self
    }

    pub fn clobbers(mut self, locator: &str, value: &str) -> Self {
        self.clobbers = Some((locator.to_string(), value.to_string()));
        self
    }

    pub fn locator(&self) -> Locator {
        build_locator(&self.raw)
    }
}

struct FakeFrame {
    path: FramePath,
    url: String,
    unreachable: bool,
    controls: Vec<FakeControl>,
}

impl FakeFrame {
    fn present(&self) -> Vec<usize> {
        (0..self.controls.len())
            .filter(|&i| match &self.controls[i].reveal_when {
                None => true,
                Some((locator, value)) => self.controls.iter().any(|c| {
                    c.locator().as_str() == locator && c.raw.value.eq_ignore_ascii_case(value)
                }),
            })
            .collect()
    }

    fn index_of(&self, locator: &Locator) -> Result<usize> {
        self.present()
            .into_iter()
            .find(|&i| self.controls[i].locator() == *locator)
            .ok_or_else(|| Error::Detached(locator.to_string()))
    }
}

struct State {
    url: String,
    url_reads: usize,
    navigate: Option<(usize, String)>,
    html: String,
    frames: Vec<FakeFrame>,
    open: Option<(FramePath, Locator)>,
    focused: Option<(FramePath, Locator)>,
    writes: usize,
}

impl State {
    fn frame(&mut self, path: &FramePath) -> Result<&mut FakeFrame> {
        self.frames
            .iter_mut()
            .find(|f| f.path == *path && !f.unreachable)
            .ok_or_else(|| Error::FrameUnavailable(path.to_string()))
    }

    fn control(&mut self, path: &FramePath, locator: &Locator) -> Result<&mut FakeControl> {
        let frame = self.frame(path)?;
        let idx = frame.index_of(locator)?;
        Ok(&mut frame.controls[idx])
    }

    fn write(&mut self, path: &FramePath, locator: &Locator, value: &str) -> Result<()> {
        let control = self.control(path, locator)?;
        if control.raw.value == value {
            return Ok(());
        }
        control.raw.value = value.to_string();
        let clobber = control.clobbers.clone();
        self.writes += 1;
        if let Some((target, junk)) = clobber {
            if let Ok(c) = self.control(path, &Locator::new(target)) {
                c.raw.value = junk;
            }
        }
        Ok(())
    }

    fn check(&mut self, path: &FramePath, locator: &Locator, checked: bool) -> Result<()> {
        let control = self.control(path, locator)?;
        if control.raw.checked == checked {
            return Ok(());
        }
        let (name, is_radio) = (control.raw.name.clone(), control.raw.input_type == "radio");
        control.raw.checked = checked;
        self.writes += 1;
        if is_radio && checked && !name.is_empty() {
            let frame = self.frame(path)?;
            for c in frame.controls.iter_mut() {
                if c.raw.name == name && c.locator() != *locator {
                    c.raw.checked = false;
                }
            }
        }
        Ok(())
    }
}

/// In-memory page implementing [`Document`].
pub struct FakeDocument {
    state: Mutex<State>,
}

impl FakeDocument {
    pub fn new(url: &str, controls: Vec<FakeControl>) -> Self {
        Self {
            state: Mutex::new(State {
                url: url.to_string(),
                url_reads: 0,
                navigate: None,
                html: String::new(),
                frames: vec![FakeFrame {
                    path: FramePath::TopLevel,
                    url: url.to_string(),
                    unreachable: false,
                    controls,
                }],
                open: None,
                focused: None,
                writes: 0,
            }),
        }
    }

    pub fn with_html(self, html: &str) -> Self {
        self.state.lock().unwrap().html = html.to_string();
        self
    }

    pub fn with_frame(self, selector: &str, url: &str, controls: Vec<FakeControl>) -> Self {
        self.push_frame(selector, url, controls, false)
    }

    pub fn with_unreachable_frame(self, selector: &str, url: &str, controls: Vec<FakeControl>) -> Self {
        self.push_frame(selector, url, controls, true)
    }

    fn push_frame(self, selector: &str, url: &str, controls: Vec<FakeControl>, unreachable: bool) -> Self {
        self.state.lock().unwrap().frames.push(FakeFrame {
            path: FramePath::embedded(selector),
            url: url.to_string(),
            unreachable,
            controls,
        });
        self
    }

    /// The page URL changes after `reads` URL reads.
    pub fn navigate_after(&self, reads: usize, url: &str) {
        self.state.lock().unwrap().navigate = Some((reads, url.to_string()));
    }

    /// Value of a control in any frame, present or not.
    pub fn value(&self, locator: &str) -> String {
        let state = self.state.lock().unwrap();
        state
            .frames
            .iter()
            .flat_map(|f| f.controls.iter())
            .find(|c| c.locator().as_str() == locator)
            .map(|c| c.raw.value.clone())
            .unwrap_or_default()
    }

    pub fn set_value(&self, locator: &str, value: &str) {
        let mut state = self.state.lock().unwrap();
        for c in state.frames.iter_mut().flat_map(|f| f.controls.iter_mut()) {
            if c.locator().as_str() == locator {
                c.raw.value = value.to_string();
            }
        }
    }

    pub fn is_checked_now(&self, locator: &str) -> bool {
        let state = self.state.lock().unwrap();
        state
            .frames
            .iter()
            .flat_map(|f| f.controls.iter())
            .any(|c| c.locator().as_str() == locator && c.raw.checked)
    }

    /// Number of state-changing interactions so far.
    pub fn writes(&self) -> usize {
        self.state.lock().unwrap().writes
    }
}

#[async_trait]
impl Document for FakeDocument {
    async fn url(&self) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        state.url_reads += 1;
        if let Some((after, url)) = state.navigate.clone() {
            if state.url_reads > after {
                state.url = url;
            }
        }
        Ok(state.url.clone())
    }

    async fn html(&self) -> Result<String> {
        Ok(self.state.lock().unwrap().html.clone())
    }

    async fn embedded_frames(&self) -> Result<Vec<EmbeddedFrame>> {
        let state = self.state.lock().unwrap();
        Ok(state
            .frames
            .iter()
            .filter_map(|f| match &f.path {
                FramePath::Embedded { selector } => Some(EmbeddedFrame {
                    selector: selector.clone(),
                    url: f.url.clone(),
                }),
                FramePath::TopLevel => None,
            })
            .collect())
    }

    async fn probe_frame(&self, selector: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        Ok(state.frame(&FramePath::embedded(selector)).is_ok())
    }

    async fn count_controls(&self, frame: &FramePath) -> Result<usize> {
        let mut state = self.state.lock().unwrap();
        let frame: &FakeFrame = state.frame(frame)?;
        Ok(frame.present().len())
    }

    async fn scan_controls(&self, frame: &FramePath) -> Result<Vec<RawControl>> {
        let mut state = self.state.lock().unwrap();
        let frame: &FakeFrame = state.frame(frame)?;
        Ok(frame
            .present()
            .into_iter()
            .map(|i| {
                let c = &frame.controls[i];
                RawControl {
                    visible: Some(c.visible),
                    ..c.raw.clone()
                }
            })
            .collect())
    }

    async fn is_visible(&self, frame: &FramePath, locator: &Locator) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        Ok(state.control(frame, locator)?.visible)
    }

    async fn is_checked(&self, frame: &FramePath, locator: &Locator) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        Ok(state.control(frame, locator)?.raw.checked)
    }

    async fn read_value(&self, frame: &FramePath, locator: &Locator) -> Result<String> {
        let mut state = self.state.lock().unwrap();
        Ok(state.control(frame, locator)?.raw.value.clone())
    }

    async fn focus(&self, frame: &FramePath, locator: &Locator) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.control(frame, locator)?;
        state.focused = Some((frame.clone(), locator.clone()));
        Ok(())
    }

    async fn click(&self, frame: &FramePath, locator: &Locator) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let has_dropdown = !state.control(frame, locator)?.dropdown.is_empty();
        state.focused = Some((frame.clone(), locator.clone()));
        if has_dropdown {
            state.open = Some((frame.clone(), locator.clone()));
        }
        Ok(())
    }

    async fn script_click(&self, frame: &FramePath, locator: &Locator) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.check(frame, locator, true)
    }

    async fn fill(&self, frame: &FramePath, locator: &Locator, value: &str) -> Result<()> {
        self.state.lock().unwrap().write(frame, locator, value)
    }

    async fn type_text(&self, frame: &FramePath, locator: &Locator, text: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let control = state.control(frame, locator)?;
        control.highlighted = 0;
        let typed = format!("{}{}", control.raw.value, text);
        state.write(frame, locator, &typed)
    }

    async fn press_key(&self, frame: &FramePath, locator: &Locator, key: Key) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let control = state.control(frame, locator)?;
        let picked = match (key, control.list_mode) {
            (Key::ArrowDown, _) => {
                control.highlighted += 1;
                None
            }
            (Key::Enter, ListMode::KeyboardOnly) => control
                .highlighted
                .checked_sub(1)
                .and_then(|i| control.suggestions.get(i).cloned()),
            (Key::Enter, ListMode::Unresponsive) => Some(String::new()),
            _ => None,
        };
        if key == Key::Escape {
            state.open = None;
        }
        match picked {
            Some(value) => state.write(frame, locator, &value),
            None => Ok(()),
        }
    }

    async fn select_option(&self, frame: &FramePath, locator: &Locator, label: &str)
        -> Result<()> {
        let mut state = self.state.lock().unwrap();
        if !state.control(frame, locator)?.raw.options.iter().any(|o| o == label) {
            return Err(Error::JsError(format!("no option {label}")));
        }
        state.write(frame, locator, label)
    }

    async fn set_checked(&self, frame: &FramePath, locator: &Locator, checked: bool)
        -> Result<()> {
        self.state.lock().unwrap().check(frame, locator, checked)
    }

    async fn set_files(&self, frame: &FramePath, locator: &Locator, path: &Path) -> Result<()> {
        self.state
            .lock()
            .unwrap()
            .write(frame, locator, &path.display().to_string())
    }

    async fn dispatch_event(&self, frame: &FramePath, locator: &Locator, _event: &str)
        -> Result<()> {
        self.state.lock().unwrap().control(frame, locator).map(|_| ())
    }

    async fn suggestions(&self, frame: &FramePath, locator: &Locator) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        let control = state.control(frame, locator)?;
        if control.raw.value.is_empty() {
            return Ok(Vec::new());
        }
        Ok(control.suggestions.clone())
    }

    async fn click_option_containing(&self, frame: &FramePath, text: &str) -> Result<bool> {
        let mut state = self.state.lock().unwrap();
        let Some((path, locator)) = state.focused.clone() else {
            return Ok(false);
        };
        if path != *frame {
            return Ok(false);
        }
        let needle = text.to_lowercase();
        let control = state.control(&path, &locator)?;
        if control.list_mode != ListMode::Clickable {
            return Ok(false);
        }
        let found = control
            .suggestions
            .iter()
            .find(|s| s.to_lowercase().contains(&needle))
            .cloned();
        match found {
            Some(choice) => {
                state.write(&path, &locator, &choice)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn visible_options(&self, frame: &FramePath) -> Result<Vec<String>> {
        let mut state = self.state.lock().unwrap();
        match state.open.clone() {
            Some((path, locator)) if path == *frame => Ok(state.control(&path, &locator)?.dropdown.clone()),
            _ => Ok(Vec::new()),
        }
    }

    async fn click_visible_option(&self, frame: &FramePath, index: usize) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        let Some((path, locator)) = state.open.clone().filter(|(p, _)| p == frame) else {
            return Err(Error::Detached("no open dropdown".into()));
        };
        let option = state
            .control(&path, &locator)?
            .dropdown
            .get(index)
            .cloned()
            .ok_or_else(|| Error::Detached(format!("option {index}")))?;
        state.write(&path, &locator, &option)?;
        state.open = None;
        Ok(())
    }

    async fn radio_group(&self, frame: &FramePath, name: &str) -> Result<Vec<RadioMember>> {
        let mut state = self.state.lock().unwrap();
        let frame: &FakeFrame = state.frame(frame)?;
        Ok(frame
            .present()
            .into_iter()
            .map(|i| &frame.controls[i])
            .filter(|c| c.raw.input_type == "radio" && c.raw.name == name)
            .map(|c| RadioMember {
                locator: c.locator(),
                value: c.raw.value.clone(),
                checked: c.raw.checked,
                labels: c.raw.labels.clone(),
                adjacent_text: String::new(),
            })
            .collect())
    }

    async fn click_label(&self, frame: &FramePath, locator: &Locator) -> Result<()> {
        self.state.lock().unwrap().check(frame, locator, true)
    }

    async fn locate_by_label(&self, frame: &FramePath, label: &str) -> Result<Option<Locator>> {
        let mut state = self.state.lock().unwrap();
        let frame: &FakeFrame = state.frame(frame)?;
        let needle = label.to_lowercase();
        Ok(frame
            .present()
            .into_iter()
            .map(|i| &frame.controls[i])
            .find(|c| c.raw.labels.explicit.to_lowercase().contains(&needle))
            .map(FakeControl::locator))
    }

    async fn wait_for_selector(
        &self,
        frame: &FramePath,
        selector: &str,
        _timeout: Duration,
    ) -> Result<Locator> {
        let mut state = self.state.lock().unwrap();
        let locator = Locator::new(selector);
        state
            .control(frame, &locator)
            .map(|_| locator.clone())
            .map_err(|_| Error::Timeout(selector.to_string()))
    }
}
