//! Which document in the page actually holds the application form.

use tracing::{debug, info};

use crate::document::{Document, FramePath};

/// Host elements used by embedded job boards, most specific first.
pub const PLATFORM_EMBEDS: &[&str] = &[
    "#grnhse_iframe",
    "#grnhse_app iframe",
    "iframe[src*=\"greenhouse\"]",
];

/// URL fragments of frames that likely host an application form.
pub const PLATFORM_KEYWORDS: &[&str] = &["greenhouse", "lever", "ashby", "workday", "job_app", "apply"];

/// A document needs more than this many controls to count as "the form".
const MIN_FORM_CONTROLS: usize = 3;

/// Remembers the form document between passes and re-probes when it goes
/// away.
#[derive(Debug, Default)]
pub struct FrameLocator {
    resolved: Option<FramePath>,
}

impl FrameLocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn resolved(&self) -> Option<&FramePath> {
        self.resolved.as_ref()
    }

    /// Probe the page from scratch. Never fails: when nothing looks like a
    /// form the top-level document is returned.
    pub async fn locate<D: Document + ?Sized>(&mut self, doc: &D) -> FramePath {
        let frame = probe(doc).await;
        info!(frame = %frame, "form document located");
        self.resolved = Some(frame.clone());
        frame
    }

    /// The remembered document if it is still reachable, else a fresh probe.
    pub async fn current<D: Document + ?Sized>(&mut self, doc: &D) -> FramePath {
        match &self.resolved {
            Some(FramePath::TopLevel) => {
                if control_count(doc, &FramePath::TopLevel).await > 0 {
                    return FramePath::TopLevel;
                }
                debug!("top-level document has no controls, re-probing");
            }
            Some(frame @ FramePath::Embedded { selector }) => {
                if doc.probe_frame(selector).await.unwrap_or(false) {
                    return frame.clone();
                }
                debug!(frame = %frame, "form frame lost, re-probing");
            }
            None => {}
        }
        self.locate(doc).await
    }
}

async fn control_count<D: Document + ?Sized>(doc: &D, frame: &FramePath) -> usize {
    match doc.count_controls(frame).await {
        Ok(n) => n,
        Err(e) => {
            debug!(frame = %frame, error = %e, "could not count controls");
            0
        }
    }
}

async fn probe<D: Document + ?Sized>(doc: &D) -> FramePath {
    for selector in PLATFORM_EMBEDS {
        if !doc.probe_frame(selector).await.unwrap_or(false) {
            continue;
        }
        let frame = FramePath::embedded(*selector);
        if control_count(doc, &frame).await > 0 {
            return frame;
        }
    }

    if control_count(doc, &FramePath::TopLevel).await > MIN_FORM_CONTROLS {
        return FramePath::TopLevel;
    }

    let frames = doc.embedded_frames().await.unwrap_or_else(|e| {
        debug!(error = %e, "could not list embedded frames");
        Vec::new()
    });

    let (likely, others): (Vec<_>, Vec<_>) = frames.into_iter().partition(|f| {
        let url = f.url.to_lowercase();
        PLATFORM_KEYWORDS.iter().any(|k| url.contains(k))
    });
    for candidate in likely.into_iter().chain(others) {
        let frame = FramePath::embedded(candidate.selector);
        if control_count(doc, &frame).await > MIN_FORM_CONTROLS {
            return frame;
        }
    }

    FramePath::TopLevel
}
