use std::path::Path;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::dom::{DescribeNodeParams, SetFileInputFilesParams};
use chromiumoxide::cdp::browser_protocol::input::{DispatchKeyEventParams, DispatchKeyEventType};
use chromiumoxide::cdp::js_protocol::runtime::{EvaluateParams, ExecutionContextId, RemoteObject};
use chromiumoxide::layout::Point;
use chromiumoxide::page::Page as CrPage;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::document::{
    Document, EmbeddedFrame, FramePath, Key, LabelSources, Locator, RadioMember, RawControl,
};
use crate::error::{Error, Result};
use crate::extract;

/// Shared helpers prepended to every in-page script.
const HELPERS: &str = r##"
const __text = (el) => ((el && (el.innerText || el.textContent)) || '').trim();
const __shown = (el) => {
    const style = el.ownerDocument.defaultView.getComputedStyle(el);
    if (style.display === 'none' || style.visibility === 'hidden') return false;
    const rect = el.getBoundingClientRect();
    return rect.width > 0 && rect.height > 0;
};
const __visible = (el) => {
    const type = (el.type || '').toLowerCase();
    if (type === 'file') return true;
    if (__shown(el)) return true;
    if (type === 'radio' || type === 'checkbox') {
        return Array.from(el.labels || []).some(__shown);
    }
    return false;
};
const __find = (root, sel) => {
    const el = root.querySelector(sel);
    if (!el) throw { detached: true, message: 'no element matches ' + sel };
    return el;
};
const __selector = (el) => {
    if (el.id) return '#' + CSS.escape(el.id);
    if (el.name) return '[name="' + el.name.replace(/"/g, '\\"') + '"]';
    return null;
};
const __labels = (el, root) => {
    const out = { explicit: '', ancestor: '', sibling: '', captions: [] };
    if (el.id) {
        const l = root.querySelector('label[for="' + CSS.escape(el.id) + '"]');
        if (l) out.explicit = __text(l);
    }
    const anc = el.closest('label');
    if (anc) out.ancestor = __text(anc);
    for (const start of [el, el.parentElement]) {
        let s = start && start.previousElementSibling;
        while (s && !out.sibling) {
            if (s.tagName === 'LABEL') out.sibling = __text(s);
            s = s.previousElementSibling;
        }
    }
    let p = el.parentElement;
    for (let depth = 0; p && depth < 5; depth++, p = p.parentElement) {
        for (const c of p.children) {
            if (c.contains(el) || c.querySelector('input, select, textarea')) continue;
            if (!/^(H[1-6]|LEGEND|LABEL|SPAN|DIV|P)$/.test(c.tagName)) continue;
            const t = __text(c);
            if (t) out.captions.push({ text: t, heading: /^(H[1-6]|LEGEND)$/.test(c.tagName) });
        }
    }
    return out;
};
const __groupLabel = (el, root) => {
    const fs = el.closest('fieldset');
    if (fs) {
        const legend = fs.querySelector('legend');
        if (legend) return __text(legend);
    }
    const rg = el.closest('[role="radiogroup"], [role="group"]');
    if (rg) {
        if (rg.getAttribute('aria-label')) return rg.getAttribute('aria-label');
        const by = rg.getAttribute('aria-labelledby');
        if (by) {
            const l = root.getElementById(by);
            if (l) return __text(l);
        }
    }
    if ((el.type || '').toLowerCase() !== 'radio' || !el.name) return '';
    const peers = root.querySelectorAll('input[type="radio"][name="' + el.name.replace(/"/g, '\\"') + '"]');
    let box = el.parentElement;
    while (box && box.parentElement && Array.from(peers).some((p) => !box.contains(p))) box = box.parentElement;
    for (let depth = 0; box && depth < 3; depth++, box = box.parentElement) {
        const prev = box.previousElementSibling;
        if (prev && !prev.querySelector('input, select, textarea')) {
            const t = __text(prev);
            if (t) return t;
        }
        for (const c of box.children) {
            if (c.querySelector('input') || c.tagName === 'INPUT') break;
            const t = __text(c);
            if (t) return t;
        }
    }
    return '';
};
const __options = (root) => Array.from(
    root.querySelectorAll('[role="option"], [class*="option"]:not(option), li[class*="select"], li[class*="item"]')
).filter((o) => { try { return __shown(o) && __text(o); } catch (e) { return false; } });
const __press = (el) => {
    for (const t of ['mousedown', 'mouseup', 'click']) {
        el.dispatchEvent(new MouseEvent(t, { bubbles: true, cancelable: true, view: el.ownerDocument.defaultView }));
    }
};
"##;

const SCAN_CONTROLS: &str = r##"
const hints = ['data-qa', 'data-testid', 'data-automation-id', 'aria-label', 'placeholder', 'autocomplete'];
const out = [];
for (const el of root.querySelectorAll('input, select, textarea')) {
    const tag = el.tagName.toLowerCase();
    const type = tag === 'input' ? (el.type || 'text').toLowerCase() : '';
    if (['hidden', 'submit', 'button', 'reset', 'image'].includes(type)) continue;
    let visible = null;
    try { visible = __visible(el); } catch (e) {}
    const attributes = [];
    for (const attr of hints) {
        const value = el.getAttribute(attr);
        if (!value) continue;
        const sel = '[' + attr + '="' + value.replace(/"/g, '\\"') + '"]';
        let unique = false;
        try { unique = root.querySelectorAll(sel).length === 1; } catch (e) {}
        attributes.push({ attr, value, unique });
    }
    const path = [];
    let node = el;
    let anchor = null;
    while (node && node.nodeType === 1 && node !== root.documentElement) {
        const parent = node.parentElement;
        if (!parent) break;
        const same = Array.from(parent.children).filter((c) => c.tagName === node.tagName);
        path.unshift(node.tagName.toLowerCase() + ':nth-of-type(' + (same.indexOf(node) + 1) + ')');
        if (parent.id) { anchor = parent.id; break; }
        node = parent;
    }
    out.push({
        tag,
        input_type: type,
        name: el.name || '',
        id: el.id || '',
        placeholder: el.getAttribute('placeholder') || '',
        aria_label: el.getAttribute('aria-label') || '',
        value: tag === 'select'
            ? ((el.selectedOptions && el.selectedOptions[0] && el.selectedOptions[0].text.trim()) || '')
            : (el.value || ''),
        checked: !!el.checked,
        required: !!el.required || el.getAttribute('aria-required') === 'true',
        options: tag === 'select' ? Array.from(el.options).map((o) => (o.text || o.value || '').trim()) : [],
        visible,
        labels: __labels(el, root),
        group_label: __groupLabel(el, root),
        attributes,
        anchor_id: anchor,
        path,
    });
}
return out;
"##;

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    ok: Option<Value>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detached: bool,
    #[serde(default)]
    frame_missing: bool,
}

#[derive(Deserialize)]
struct ClickPoint {
    x: f64,
    y: f64,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawRadio {
    id: String,
    name: String,
    value: String,
    checked: bool,
    labels: LabelSources,
    adjacent_text: String,
}

enum Target {
    /// The top-level document, or a same-origin frame under `host`.
    Page { host: Option<String> },
    Context(ExecutionContextId),
}

/// A chromiumoxide tab driven as a [`Document`].
///
/// Every query runs as one script that first resolves the frame root, then
/// the control, and reports failures in a small JSON envelope. Same-origin
/// frames are read through the host's `contentDocument` from the top-level
/// page. Cross-origin frames run the script in the frame's own execution
/// context, which chromiumoxide only tracks for frames rendered in the page's
/// process (launch Chrome with `--disable-site-isolation-trials` and
/// `--disable-features=IsolateOrigins,site-per-process` for such forms).
pub struct Page {
    inner: CrPage,
    default_timeout: Duration,
}

impl Page {
    pub fn new(inner: CrPage) -> Self {
        Self {
            inner,
            default_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    /// Returns a reference to the underlying chromiumoxide Page.
    pub fn inner(&self) -> &CrPage {
        &self.inner
    }

    /// Navigate to the given URL and wait for the page to load.
    pub async fn goto(&self, url: &str) -> Result<()> {
        self.inner
            .goto(url)
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?;
        Ok(())
    }

    /// Wait for the default timeout for `selector` to appear in `frame`.
    pub async fn wait_for(&self, frame: &FramePath, selector: &str) -> Result<Locator> {
        self.wait_for_selector(frame, selector, self.default_timeout)
            .await
    }

    // ── Script plumbing ─────────────────────────────────────────────

    /// Where scripts for `frame` run. Same-origin frames are reached from the
    /// top-level page; any other frame is entered through its own execution
    /// context.
    async fn target(&self, frame: &FramePath) -> Result<Target> {
        let FramePath::Embedded { selector } = frame else {
            return Ok(Target::Page { host: None });
        };
        let access = self
            .evaluate(
                None,
                format!(
                    r#"(() => {{
    const h = document.querySelector({sel});
    if (!h) return 'missing';
    try {{ if (h.contentDocument) return 'shared'; }} catch (e) {{}}
    return 'isolated';
}})()"#,
                    sel = serde_json::to_string(selector)?,
                ),
                true,
            )
            .await?
            .value;
        match access.as_ref().and_then(Value::as_str) {
            Some("shared") => Ok(Target::Page {
                host: Some(selector.clone()),
            }),
            Some("isolated") => Ok(Target::Context(self.frame_context(selector).await?)),
            _ => Err(Error::FrameUnavailable(frame.to_string())),
        }
    }

    /// Execution context of the document loaded in the iframe at `selector`.
    async fn frame_context(&self, selector: &str) -> Result<ExecutionContextId> {
        let unavailable = || Error::FrameUnavailable(format!("frame {selector}"));
        let host = self
            .evaluate(
                None,
                format!("document.querySelector({})", serde_json::to_string(selector)?),
                false,
            )
            .await?;
        let object_id = host.object_id.ok_or_else(unavailable)?;
        let node = self
            .inner
            .execute(DescribeNodeParams::builder().object_id(object_id).build())
            .await?
            .result
            .node;
        let frame_id = node.frame_id.ok_or_else(unavailable)?;
        debug!(%selector, frame = ?frame_id, "entering frame context");
        self.inner
            .frame_execution_context(frame_id)
            .await?
            .ok_or_else(unavailable)
    }

    async fn evaluate(
        &self,
        context: Option<ExecutionContextId>,
        expression: String,
        by_value: bool,
    ) -> Result<RemoteObject> {
        let mut builder = EvaluateParams::builder()
            .expression(expression)
            .return_by_value(by_value);
        if let Some(context) = context {
            builder = builder.context_id(context);
        }
        let params = builder.build().map_err(Error::JsError)?;
        let returns = self.inner.execute(params).await?.result;
        if let Some(details) = returns.exception_details {
            return Err(Error::JsError(details.text));
        }
        Ok(returns.result)
    }

    async fn run<T: DeserializeOwned>(&self, frame: &FramePath, args: Value, body: &str) -> Result<T> {
        let (host, context) = match self.target(frame).await? {
            Target::Page { host } => (serde_json::to_string(&host)?, None),
            Target::Context(id) => ("null".to_string(), Some(id)),
        };
        let script = format!(
            r#"(() => {{
{HELPERS}
const __hostSel = {host};
let __root = document;
if (__hostSel !== null) {{
    const __host = document.querySelector(__hostSel);
    try {{ __root = __host && __host.contentDocument; }} catch (e) {{ __root = null; }}
    if (!__root) return JSON.stringify({{ frame_missing: true }});
}}
try {{
    const __result = ((root, args) => {{
{body}
    }})(__root, {args});
    return JSON.stringify({{ ok: __result === undefined ? null : __result }});
}} catch (e) {{
    return JSON.stringify({{ error: String((e && e.message) || e), detached: !!(e && e.detached) }});
}}
}})()"#,
            args = serde_json::to_string(&args)?,
        );
        let value = self.evaluate(context, script, true).await?.value;
        let raw = value
            .as_ref()
            .and_then(Value::as_str)
            .ok_or_else(|| Error::JsError("script returned no result".into()))?;
        let envelope: Envelope = serde_json::from_str(raw)?;
        if envelope.frame_missing {
            return Err(Error::FrameUnavailable(frame.to_string()));
        }
        if let Some(message) = envelope.error {
            return Err(if envelope.detached {
                Error::Detached(message)
            } else {
                Error::JsError(message)
            });
        }
        Ok(serde_json::from_value(envelope.ok.unwrap_or(Value::Null))?)
    }

    /// Run `body` with `el` bound to the control behind `locator`.
    async fn on_control<T: DeserializeOwned>(
        &self,
        frame: &FramePath,
        locator: &Locator,
        mut args: Value,
        body: &str,
    ) -> Result<T> {
        args["locator"] = Value::String(locator.as_str().to_string());
        let body = format!("const el = __find(root, args.locator);\n{body}");
        self.run(frame, args, &body).await
    }

    async fn key_event(&self, down: bool, key: Key) -> Result<()> {
        let kind = if down {
            DispatchKeyEventType::KeyDown
        } else {
            DispatchKeyEventType::KeyUp
        };
        let mut builder = DispatchKeyEventParams::builder()
            .r#type(kind)
            .key(key.name())
            .code(key.name())
            .windows_virtual_key_code(key.key_code())
            .native_virtual_key_code(key.key_code());
        if down && key == Key::Enter {
            builder = builder.text("\r");
        }
        let params = builder.build().map_err(Error::JsError)?;
        self.inner.execute(params).await?;
        Ok(())
    }
}

fn radio_locator(radio: &RawRadio) -> Locator {
    if !radio.id.is_empty() {
        return Locator::new(extract::id_selector(&radio.id));
    }
    let quote = |s: &str| s.replace('\\', "\\\\").replace('"', "\\\"");
    Locator::new(format!(
        "input[type=\"radio\"][name=\"{}\"][value=\"{}\"]",
        quote(&radio.name),
        quote(&radio.value)
    ))
}

#[async_trait]
impl Document for Page {
    async fn url(&self) -> Result<String> {
        self.inner
            .url()
            .await
            .map_err(|e| Error::NavigationError(e.to_string()))?
            .ok_or_else(|| Error::NavigationError("No URL found".into()))
    }

    async fn html(&self) -> Result<String> {
        self.inner
            .content()
            .await
            .map_err(|e| Error::JsError(e.to_string()))
    }

    async fn embedded_frames(&self) -> Result<Vec<EmbeddedFrame>> {
        self.run(
            &FramePath::TopLevel,
            json!({}),
            r#"
            return Array.from(document.querySelectorAll('iframe')).map((f, i) => {
                let selector;
                if (f.id) selector = '#' + CSS.escape(f.id);
                else if (f.name) selector = 'iframe[name="' + f.name.replace(/"/g, '\\"') + '"]';
                else {
                    f.setAttribute('data-applyfill-frame', String(i));
                    selector = 'iframe[data-applyfill-frame="' + i + '"]';
                }
                return { selector, url: f.src || '' };
            });
            "#,
        )
        .await
    }

    async fn probe_frame(&self, selector: &str) -> Result<bool> {
        match self
            .run::<bool>(&FramePath::embedded(selector), json!({}), "return true;")
            .await
        {
            Ok(found) => Ok(found),
            Err(Error::FrameUnavailable(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    async fn count_controls(&self, frame: &FramePath) -> Result<usize> {
        self.run(
            frame,
            json!({}),
            r#"return root.querySelectorAll('input:not([type="hidden"]), select, textarea').length;"#,
        )
        .await
    }

    async fn scan_controls(&self, frame: &FramePath) -> Result<Vec<RawControl>> {
        self.run(frame, json!({}), SCAN_CONTROLS).await
    }

    async fn is_visible(&self, frame: &FramePath, locator: &Locator) -> Result<bool> {
        self.on_control(frame, locator, json!({}), "return __visible(el);")
            .await
    }

    async fn is_checked(&self, frame: &FramePath, locator: &Locator) -> Result<bool> {
        self.on_control(frame, locator, json!({}), "return !!el.checked;")
            .await
    }

    async fn read_value(&self, frame: &FramePath, locator: &Locator) -> Result<String> {
        self.on_control(frame, locator, json!({}), "return el.value || '';")
            .await
    }

    async fn focus(&self, frame: &FramePath, locator: &Locator) -> Result<()> {
        self.on_control(frame, locator, json!({}), "el.focus();")
            .await
    }

    async fn click(&self, frame: &FramePath, locator: &Locator) -> Result<()> {
        let point: ClickPoint = self
            .on_control(
                frame,
                locator,
                json!({}),
                r#"
                el.scrollIntoView({ block: 'center' });
                const r = el.getBoundingClientRect();
                return { x: r.left + r.width / 2, y: r.top + r.height / 2 };
                "#,
            )
            .await?;
        let offset = match frame {
            FramePath::TopLevel => ClickPoint { x: 0.0, y: 0.0 },
            FramePath::Embedded { selector } => {
                self.run(
                    &FramePath::TopLevel,
                    json!({ "host": selector }),
                    r#"
                    const h = __find(root, args.host);
                    const r = h.getBoundingClientRect();
                    return { x: r.left + h.clientLeft, y: r.top + h.clientTop };
                    "#,
                )
                .await?
            }
        };
        self.inner
            .click(Point::new(point.x + offset.x, point.y + offset.y))
            .await?;
        Ok(())
    }

    async fn script_click(&self, frame: &FramePath, locator: &Locator) -> Result<()> {
        self.on_control(frame, locator, json!({}), "el.click();")
            .await
    }

    async fn fill(&self, frame: &FramePath, locator: &Locator, value: &str) -> Result<()> {
        self.on_control(
            frame,
            locator,
            json!({ "value": value }),
            r#"
            const win = el.ownerDocument.defaultView;
            const proto = el.tagName === 'TEXTAREA' ? win.HTMLTextAreaElement.prototype : win.HTMLInputElement.prototype;
            const desc = Object.getOwnPropertyDescriptor(proto, 'value');
            if (desc && desc.set) desc.set.call(el, args.value); else el.value = args.value;
            el.dispatchEvent(new Event('input', { bubbles: true }));
            el.dispatchEvent(new Event('change', { bubbles: true }));
            "#,
        )
        .await
    }

    async fn type_text(&self, frame: &FramePath, locator: &Locator, text: &str) -> Result<()> {
        self.focus(frame, locator).await?;
        for ch in text.chars() {
            let params = DispatchKeyEventParams::builder()
                .r#type(DispatchKeyEventType::Char)
                .text(ch.to_string())
                .build()
                .map_err(Error::JsError)?;
            self.inner.execute(params).await?;
        }
        Ok(())
    }

    async fn press_key(&self, frame: &FramePath, locator: &Locator, key: Key) -> Result<()> {
        self.focus(frame, locator).await?;
        self.key_event(true, key).await?;
        self.key_event(false, key).await
    }

    async fn select_option(&self, frame: &FramePath, locator: &Locator, label: &str)
        -> Result<()> {
        self.on_control(
            frame,
            locator,
            json!({ "label": label }),
            r#"
            const want = args.label.trim();
            const option = Array.from(el.options || []).find((o) => o.text.trim() === want)
                || Array.from(el.options || []).find((o) => o.value === want);
            if (!option) throw new Error('no option ' + want);
            el.value = option.value;
            option.selected = true;
            el.dispatchEvent(new Event('input', { bubbles: true }));
            el.dispatchEvent(new Event('change', { bubbles: true }));
            "#,
        )
        .await
    }

    async fn set_checked(&self, frame: &FramePath, locator: &Locator, checked: bool)
        -> Result<()> {
        self.on_control(
            frame,
            locator,
            json!({ "checked": checked }),
            r#"
            if (el.checked !== args.checked) el.click();
            if (el.checked !== args.checked) {
                el.checked = args.checked;
                el.dispatchEvent(new Event('change', { bubbles: true }));
            }
            if (el.checked !== args.checked) throw new Error('state did not change');
            "#,
        )
        .await
    }

    async fn set_files(&self, frame: &FramePath, locator: &Locator, path: &Path) -> Result<()> {
        let locator_json = serde_json::to_string(locator.as_str())?;
        let (expression, context) = match self.target(frame).await? {
            Target::Page { host: None } => (format!("document.querySelector({locator_json})"), None),
            Target::Page { host: Some(host) } => (
                format!(
                    r#"(() => {{
                const h = document.querySelector({host});
                let root = null;
                try {{ root = h && h.contentDocument; }} catch (e) {{}}
                return root ? root.querySelector({locator_json}) : null;
            }})()"#,
                    host = serde_json::to_string(&host)?,
                ),
                None,
            ),
            Target::Context(id) => (format!("document.querySelector({locator_json})"), Some(id)),
        };
        let object_id = self
            .evaluate(context, expression, false)
            .await?
            .object_id
            .ok_or_else(|| Error::Detached(locator.to_string()))?;

        let mut upload = SetFileInputFilesParams::new(vec![path.to_string_lossy().into_owned()]);
        upload.object_id = Some(object_id);
        self.inner.execute(upload).await?;
        Ok(())
    }

    async fn dispatch_event(&self, frame: &FramePath, locator: &Locator, event: &str)
        -> Result<()> {
        self.on_control(
            frame,
            locator,
            json!({ "event": event }),
            "el.dispatchEvent(new Event(args.event, { bubbles: true }));",
        )
        .await
    }

    async fn suggestions(&self, frame: &FramePath, locator: &Locator) -> Result<Vec<String>> {
        self.on_control(
            frame,
            locator,
            json!({}),
            r#"
            const items = (list) => Array.from(list.querySelectorAll('[role="option"], li'))
                .filter((o) => { try { return __shown(o); } catch (e) { return false; } })
                .map(__text)
                .filter((t) => t);
            for (const attr of ['aria-controls', 'aria-owns']) {
                const id = el.getAttribute(attr);
                const list = id && root.getElementById(id);
                if (list) return items(list);
            }
            let p = el.parentElement;
            for (let depth = 0; p && depth < 5; depth++, p = p.parentElement) {
                const list = p.querySelector('[role="listbox"], ul[class*="suggest"], ul[class*="autocomplete"], [class*="menu"]');
                if (list) return items(list);
            }
            const global = root.querySelector('[role="listbox"], .pac-container');
            return global ? items(global) : [];
            "#,
        )
        .await
    }

    async fn click_option_containing(&self, frame: &FramePath, text: &str) -> Result<bool> {
        self.run(
            frame,
            json!({ "text": text.to_lowercase() }),
            r#"
            const option = __options(root).find((o) => __text(o).toLowerCase().includes(args.text));
            if (!option) return false;
            __press(option);
            return true;
            "#,
        )
        .await
    }

    async fn visible_options(&self, frame: &FramePath) -> Result<Vec<String>> {
        self.run(frame, json!({}), "return __options(root).map(__text);")
            .await
    }

    async fn click_visible_option(&self, frame: &FramePath, index: usize) -> Result<()> {
        self.run(
            frame,
            json!({ "index": index }),
            r#"
            const option = __options(root)[args.index];
            if (!option) throw { detached: true, message: 'option ' + args.index + ' is gone' };
            __press(option);
            "#,
        )
        .await
    }

    async fn radio_group(&self, frame: &FramePath, name: &str) -> Result<Vec<RadioMember>> {
        let raws: Vec<RawRadio> = self
            .run(
                frame,
                json!({ "name": name }),
                r#"
                const sel = 'input[type="radio"][name="' + args.name.replace(/"/g, '\\"') + '"]';
                return Array.from(root.querySelectorAll(sel)).map((el) => {
                    const next = el.nextSibling;
                    const adjacent = next
                        ? (next.nodeType === 3 ? next.textContent : __text(next))
                        : '';
                    return {
                        id: el.id || '',
                        name: el.name,
                        value: el.value || '',
                        checked: !!el.checked,
                        labels: __labels(el, root),
                        adjacent_text: (adjacent || '').trim(),
                    };
                });
                "#,
            )
            .await?;
        Ok(raws
            .into_iter()
            .map(|raw| RadioMember {
                locator: radio_locator(&raw),
                value: raw.value,
                checked: raw.checked,
                labels: raw.labels,
                adjacent_text: raw.adjacent_text,
            })
            .collect())
    }

    async fn click_label(&self, frame: &FramePath, locator: &Locator) -> Result<()> {
        self.on_control(
            frame,
            locator,
            json!({}),
            r#"
            const label = (el.labels && el.labels[0]) || el.closest('label')
                || (el.id && root.querySelector('label[for="' + CSS.escape(el.id) + '"]'));
            if (!label) throw new Error('control has no label');
            label.click();
            "#,
        )
        .await
    }

    async fn locate_by_label(&self, frame: &FramePath, label: &str) -> Result<Option<Locator>> {
        let selector: Option<String> = self
            .run(
                frame,
                json!({ "label": label.to_lowercase() }),
                r#"
                for (const l of root.querySelectorAll('label')) {
                    if (!__text(l).toLowerCase().includes(args.label)) continue;
                    const control = (l.htmlFor && root.getElementById(l.htmlFor))
                        || l.querySelector('input, select, textarea');
                    if (control) {
                        const sel = __selector(control);
                        if (sel) return sel;
                    }
                }
                return null;
                "#,
            )
            .await?;
        Ok(selector.map(Locator::new))
    }

    async fn wait_for_selector(
        &self,
        frame: &FramePath,
        selector: &str,
        timeout: Duration,
    ) -> Result<Locator> {
        let interval = Duration::from_millis(100);
        let start = Instant::now();

        loop {
            let found = self
                .run::<bool>(
                    frame,
                    json!({ "selector": selector }),
                    "return !!root.querySelector(args.selector);",
                )
                .await
                .unwrap_or(false);
            if found {
                return Ok(Locator::new(selector));
            }
            if start.elapsed() >= timeout {
                return Err(Error::Timeout(format!(
                    "Timed out waiting for selector: {}",
                    selector
                )));
            }
            tokio::time::sleep(interval).await;
        }
    }
}
