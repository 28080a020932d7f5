//! The fill run: extraction, resolution, execution and reconciliation
//! passes over one application page.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::answers::{AnswerStore, CustomAnswers, PendingQuestion};
use crate::ats::{self, AtsDetection};
use crate::catalog::{FieldCategory, FieldType};
use crate::config::FillerConfig;
use crate::document::{Document, FramePath, Locator};
use crate::extract::{self, ControlKind, FieldKey, FormField};
use crate::fill::{FillExecutor, FillOutcome};
use crate::frame::FrameLocator;
use crate::profile::Profile;
use crate::resolve::{self, AnswerBackend, ValueResolver, ValueSource};

/// Result of one control attempt.
#[derive(Debug, Clone, Serialize)]
pub struct FilledField {
    pub field: FormField,
    pub value: String,
    pub source: Option<ValueSource>,
    pub success: bool,
    pub high_risk: bool,
}

/// Everything a run did, for review before submission.
#[derive(Debug, Clone, Serialize)]
pub struct ApplicationReport {
    pub url: String,
    pub ats: AtsDetection,
    pub fields: Vec<FilledField>,
    pub pending: Vec<PendingQuestion>,
}

impl ApplicationReport {
    pub fn filled(&self) -> impl Iterator<Item = &FilledField> {
        self.fields.iter().filter(|f| f.success)
    }

    pub fn failed_required(&self) -> impl Iterator<Item = &FilledField> {
        self.fields.iter().filter(|f| !f.success && f.field.required)
    }

    /// Successful answers to high-risk questions; these deserve a second look.
    pub fn high_risk(&self) -> impl Iterator<Item = &FilledField> {
        self.fields.iter().filter(|f| f.success && f.high_risk)
    }
}

struct IdentityGuard {
    frame: FramePath,
    locator: Locator,
    label: String,
    value: String,
}

pub struct FormFiller<D: Document> {
    doc: Arc<D>,
    profile: Arc<Profile>,
    config: FillerConfig,
    frames: FrameLocator,
    resolver: ValueResolver,
    store: Option<(Arc<dyn AnswerStore>, String)>,
    /// Questions attempted this run, and whether they took.
    registry: HashMap<FieldKey, bool>,
    seen: HashSet<(FramePath, Locator)>,
    guards: Vec<IdentityGuard>,
    pending: Vec<PendingQuestion>,
    attempts: usize,
}

impl<D: Document> FormFiller<D> {
    /// Answered pending questions are promoted and the store is loaded here,
    /// once per filler.
    pub fn new(
        doc: Arc<D>,
        profile: Arc<Profile>,
        config: FillerConfig,
        backend: Option<Arc<dyn AnswerBackend>>,
        store: Option<(Arc<dyn AnswerStore>, String)>,
        answers: Option<CustomAnswers>,
    ) -> Self {
        let answers = match &store {
            Some((store, profile_id)) => load_answers(store.as_ref(), profile_id),
            None => answers.unwrap_or_default(),
        };
        info!(answers = answers.len(), "custom answers loaded");
        let resolver = ValueResolver::new(profile.clone(), answers, backend);
        Self {
            doc,
            profile,
            config,
            frames: FrameLocator::new(),
            resolver,
            store,
            registry: HashMap::new(),
            seen: HashSet::new(),
            guards: Vec::new(),
            pending: Vec::new(),
            attempts: 0,
        }
    }

    pub fn config(&self) -> &FillerConfig {
        &self.config
    }

    pub fn document(&self) -> &Arc<D> {
        &self.doc
    }

    /// Fill every recognisable control on the current page. Never fails:
    /// problems end up as unsuccessful entries in the report.
    pub async fn fill_all(&mut self) -> ApplicationReport {
        self.resolver.reset();
        self.pending.clear();
        tokio::time::sleep(self.config.initial_settle).await;

        let url = self.doc.url().await.unwrap_or_else(|e| {
            warn!(error = %e, "could not read page url");
            String::new()
        });
        let html = self.doc.html().await.ok();
        let detection = ats::detect(&url, html.as_deref());
        info!(
            ats = %detection.ats,
            confidence = detection.confidence,
            method = ?detection.method,
            "application platform"
        );

        let frame = self.frames.locate(&*self.doc).await;
        let fields = self.extract(&frame).await;
        info!(count = fields.len(), frame = %frame, "fields extracted");

        let mut results = Vec::new();
        self.fill_pass(fields, &mut results).await;
        self.reconcile(&mut results).await;

        let report = ApplicationReport {
            url,
            ats: detection,
            fields: results,
            pending: self.pending.clone(),
        };
        info!(
            filled = report.filled().count(),
            total = report.fields.len(),
            failed_required = report.failed_required().count(),
            pending = report.pending.len(),
            "fill run finished"
        );
        report
    }

    async fn extract(&self, frame: &FramePath) -> Vec<FormField> {
        match extract::extract(&*self.doc, frame).await {
            Ok(fields) => fields,
            Err(e) => {
                warn!(frame = %frame, error = %e, "field extraction failed");
                Vec::new()
            }
        }
    }

    fn skip(&self, field: &FormField) -> bool {
        if field.field_type == FieldType::Unknown && !field.required {
            debug!(label = %field.label, "unclassified optional control, skipped");
            return true;
        }
        if self.registry.contains_key(&field.key()) {
            debug!(label = %field.label, "question already attempted, skipped");
            return true;
        }
        false
    }

    async fn fill_pass(&mut self, fields: Vec<FormField>, results: &mut Vec<FilledField>) {
        for field in fields {
            self.seen.insert((field.frame.clone(), field.locator.clone()));
            if self.skip(&field) {
                continue;
            }
            if self.attempts == 0 {
                tokio::time::sleep(self.config.first_field_delay).await;
            } else {
                tokio::time::sleep(self.config.between_fields).await;
            }
            self.attempts += 1;

            let mut outcome = self.attempt(&field).await;
            let retry = matches!(&outcome, Some(r) if !r.success)
                && field.field_type.category() == FieldCategory::Identity;
            if retry {
                debug!(label = %field.label, "identity field failed, retrying after re-acquisition");
                self.frames.locate(&*self.doc).await;
                outcome = self.attempt(&field).await;
            }

            let Some(result) = outcome else {
                continue;
            };
            self.registry.insert(field.key(), result.success);

            if result.success
                && field.field_type.category() == FieldCategory::Identity
                && field.kind == ControlKind::Text
            {
                self.guards.push(IdentityGuard {
                    frame: result.field.frame.clone(),
                    locator: result.field.locator.clone(),
                    label: field.label.clone(),
                    value: result.value.clone(),
                });
            }
            results.push(result);
            self.check_guards().await;
        }
    }

    /// `None` when the control is one answer choice that does not apply.
    async fn attempt(&mut self, field: &FormField) -> Option<FilledField> {
        let high_risk = field.is_high_risk();
        let resolution = self.resolver.resolve(field, &self.config).await;

        let Some(resolution) = resolution else {
            if field.is_eeo() && field.kind != ControlKind::File {
                if let Some(target) = self.reacquire(field).await {
                    let executor = FillExecutor::new(&*self.doc, &self.config, &self.profile);
                    if let Some(option) = executor.decline(&target).await {
                        return Some(FilledField {
                            field: target,
                            value: option,
                            source: None,
                            success: true,
                            high_risk,
                        });
                    }
                }
                if field.kind == ControlKind::Radio && field.name.is_empty() {
                    return None;
                }
            } else if resolve::should_queue_pending(field) {
                self.queue_pending(field, &field.options);
            }
            debug!(label = %field.label, field_type = %field.field_type, "no value");
            return Some(FilledField {
                field: field.clone(),
                value: String::new(),
                source: None,
                success: false,
                high_risk,
            });
        };

        let Some(target) = self.reacquire(field).await else {
            warn!(label = %field.label, "control could not be re-acquired");
            return Some(FilledField {
                field: field.clone(),
                value: resolution.value,
                source: Some(resolution.source),
                success: false,
                high_risk,
            });
        };

        let executor = FillExecutor::new(&*self.doc, &self.config, &self.profile);
        let outcome = executor.fill(&target, &resolution.value).await;
        let success = match outcome {
            FillOutcome::Filled => true,
            FillOutcome::NotApplicable => return None,
            FillOutcome::Failed { options } => {
                if resolve::should_queue_pending(field) && !options.is_empty() {
                    self.queue_pending(field, &options);
                }
                false
            }
        };
        if success {
            info!(label = %field.label, field_type = %field.field_type, source = ?resolution.source, "filled");
        } else {
            debug!(label = %field.label, "fill did not take");
        }
        Some(FilledField {
            field: target,
            value: resolution.value,
            source: Some(resolution.source),
            success,
            high_risk,
        })
    }

    /// Re-resolve the field's frame and check its locator still answers,
    /// with a bounded retry; fall back to a search by label text.
    async fn reacquire(&mut self, field: &FormField) -> Option<FormField> {
        for attempt in 1..=self.config.reacquire_retries {
            let frame = self.frames.current(&*self.doc).await;
            match self.doc.is_visible(&frame, &field.locator).await {
                Ok(_) => {
                    return Some(FormField {
                        frame,
                        ..field.clone()
                    })
                }
                Err(e) if e.is_transient() => {
                    debug!(label = %field.label, attempt, error = %e, "control not reachable, retrying");
                    tokio::time::sleep(self.config.reacquire_backoff).await;
                }
                Err(e) => {
                    debug!(label = %field.label, error = %e, "control gone");
                    break;
                }
            }
        }

        let label = field.question();
        if label.is_empty() {
            return None;
        }
        let frame = self.frames.current(&*self.doc).await;
        match self.doc.locate_by_label(&frame, label).await {
            Ok(Some(locator)) => {
                debug!(label, locator = %locator, "control re-located by label");
                Some(FormField {
                    frame,
                    locator,
                    ..field.clone()
                })
            }
            Ok(None) => None,
            Err(e) => {
                debug!(label, error = %e, "label search failed");
                None
            }
        }
    }

    /// Put back identity values that a later interaction overwrote.
    async fn check_guards(&self) {
        for guard in &self.guards {
            let current = match self.doc.read_value(&guard.frame, &guard.locator).await {
                Ok(value) => value,
                Err(_) => continue,
            };
            if current == guard.value {
                continue;
            }
            warn!(label = %guard.label, found = %current, "identity field was overwritten, restoring");
            if let Err(e) = self.doc.fill(&guard.frame, &guard.locator, &guard.value).await {
                warn!(label = %guard.label, error = %e, "could not restore identity field");
            }
        }
    }

    /// Re-scan for controls revealed by earlier answers.
    async fn reconcile(&mut self, results: &mut Vec<FilledField>) {
        for pass in 1..=self.config.max_dynamic_passes {
            tokio::time::sleep(self.config.reconcile_settle).await;
            let frame = self.frames.current(&*self.doc).await;
            let fresh: Vec<FormField> = self
                .extract(&frame)
                .await
                .into_iter()
                .filter(|f| !self.seen.contains(&(f.frame.clone(), f.locator.clone())))
                .filter(|f| !self.registry.contains_key(&f.key()))
                .filter(|f| !(f.field_type == FieldType::Unknown && !f.required))
                .collect();
            if fresh.is_empty() {
                debug!(pass, "no new controls");
                break;
            }
            info!(pass, count = fresh.len(), "new controls appeared");
            self.fill_pass(fresh, results).await;
        }
    }

    fn queue_pending(&mut self, field: &FormField, options: &[String]) {
        let question = field.question().to_string();
        if self.pending.iter().any(|p| p.question == question) {
            return;
        }
        let job = self.config.job_context();
        if let Some((store, profile_id)) = &self.store {
            store.save_pending(profile_id, &question, options, &job);
        }
        info!(question = %question, "queued for a human answer");
        self.pending.push(PendingQuestion {
            question,
            answer: String::new(),
            encountered_at: chrono::Local::now().format("%Y-%m-%d %H:%M").to_string(),
            job,
            options: options.to_vec(),
        });
    }
}

fn load_answers(store: &dyn AnswerStore, profile_id: &str) -> CustomAnswers {
    match store.promote(profile_id) {
        Ok(0) => {}
        Ok(moved) => info!(moved, "promoted answered pending questions"),
        Err(e) => warn!(error = %e, "could not promote pending questions"),
    }
    match store.load(profile_id) {
        Ok((answered, pending)) => {
            if !pending.is_empty() {
                info!(count = pending.len(), "questions still waiting for an answer");
            }
            CustomAnswers::new(answered)
        }
        Err(e) => {
            warn!(error = %e, "could not load custom answers");
            CustomAnswers::default()
        }
    }
}
