use std::sync::Arc;
use std::time::Duration;

use crate::answers::{AnswerStore, CustomAnswers};
use crate::catalog::DECLINE_PHRASES;
use crate::document::Document;
use crate::filler::FormFiller;
use crate::profile::Profile;
use crate::resolve::AnswerBackend;

pub struct FillerConfig {
    /// Wait before the first extraction, for late-rendering forms.
    pub initial_settle: Duration,
    /// Extra wait before the first field of a run.
    pub first_field_delay: Duration,
    /// Pause after focus/click before typing.
    pub focus_settle: Duration,
    /// Wait for a custom dropdown to open after clicking it.
    pub dropdown_open_wait: Duration,
    /// Wait for typeahead suggestions to populate after typing.
    pub autocomplete_wait: Duration,
    /// Pause after choosing an option or typing a value.
    pub option_settle: Duration,
    pub between_fields: Duration,
    /// Wait before each reconciliation re-scan.
    pub reconcile_settle: Duration,
    pub upload_settle: Duration,
    pub reacquire_retries: u32,
    pub reacquire_backoff: Duration,
    /// Extra extraction passes after the first fill pass.
    pub max_dynamic_passes: usize,
    /// Decline-to-answer phrases, most preferred first.
    pub decline_phrases: Vec<String>,
    /// Answer for "how did you hear about us" when the profile has none.
    pub referral_default: String,
    /// File names searched in the profile directory when no resume path is set.
    pub resume_file_names: Vec<String>,
    pub submission_poll_interval: Duration,
    pub submission_timeout: Duration,
    pub job_title: String,
    pub company: String,
    /// Custom answers included as generative-answer context.
    pub answer_context_limit: usize,
}

impl FillerConfig {
    /// "Company - Title", attached to pending questions.
    pub fn job_context(&self) -> String {
        match (self.company.is_empty(), self.job_title.is_empty()) {
            (false, false) => format!("{} - {}", self.company, self.job_title),
            (false, true) => self.company.clone(),
            (true, false) => self.job_title.clone(),
            (true, true) => String::new(),
        }
    }
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            initial_settle: Duration::from_secs(3),
            first_field_delay: Duration::from_secs(1),
            focus_settle: Duration::from_millis(100),
            dropdown_open_wait: Duration::from_millis(500),
            autocomplete_wait: Duration::from_secs(1),
            option_settle: Duration::from_millis(300),
            between_fields: Duration::from_millis(300),
            reconcile_settle: Duration::from_secs(1),
            upload_settle: Duration::from_millis(500),
            reacquire_retries: 3,
            reacquire_backoff: Duration::from_millis(500),
            max_dynamic_passes: 2,
            decline_phrases: DECLINE_PHRASES.iter().map(|s| s.to_string()).collect(),
            referral_default: "LinkedIn".to_string(),
            resume_file_names: vec![
                "resume.pdf".to_string(),
                "Resume.pdf".to_string(),
                "resume.PDF".to_string(),
            ],
            submission_poll_interval: Duration::from_secs(2),
            submission_timeout: Duration::from_secs(300),
            job_title: String::new(),
            company: String::new(),
            answer_context_limit: 15,
        }
    }
}

pub struct FillerBuilder {
    config: FillerConfig,
    backend: Option<Arc<dyn AnswerBackend>>,
    store: Option<(Arc<dyn AnswerStore>, String)>,
    answers: Option<CustomAnswers>,
}

impl FillerBuilder {
    pub fn new() -> Self {
        Self {
            config: FillerConfig::default(),
            backend: None,
            store: None,
            answers: None,
        }
    }

    /// The job being applied to; used for pending-question context and
    /// generative prompts.
    pub fn job(mut self, company: impl Into<String>, title: impl Into<String>) -> Self {
        self.config.company = company.into();
        self.config.job_title = title.into();
        self
    }

    pub fn autocomplete_wait(mut self, wait: Duration) -> Self {
        self.config.autocomplete_wait = wait;
        self
    }

    pub fn between_fields(mut self, delay: Duration) -> Self {
        self.config.between_fields = delay;
        self
    }

    pub fn max_dynamic_passes(mut self, passes: usize) -> Self {
        self.config.max_dynamic_passes = passes;
        self
    }

    pub fn reacquire(mut self, retries: u32, backoff: Duration) -> Self {
        self.config.reacquire_retries = retries;
        self.config.reacquire_backoff = backoff;
        self
    }

    pub fn decline_phrases<I, S>(mut self, phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.decline_phrases = phrases.into_iter().map(Into::into).collect();
        self
    }

    pub fn referral_default(mut self, answer: impl Into<String>) -> Self {
        self.config.referral_default = answer.into();
        self
    }

    pub fn resume_file_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.resume_file_names = names.into_iter().map(Into::into).collect();
        self
    }

    /// Poll interval and ceiling for [`wait_for_submission`](crate::wait_for_submission).
    pub fn submission_wait(mut self, interval: Duration, timeout: Duration) -> Self {
        self.config.submission_poll_interval = interval;
        self.config.submission_timeout = timeout;
        self
    }

    /// Drop every settle delay. Meant for in-memory documents.
    pub fn no_delays(mut self) -> Self {
        let c = &mut self.config;
        for d in [
            &mut c.initial_settle,
            &mut c.first_field_delay,
            &mut c.focus_settle,
            &mut c.dropdown_open_wait,
            &mut c.autocomplete_wait,
            &mut c.option_settle,
            &mut c.between_fields,
            &mut c.reconcile_settle,
            &mut c.upload_settle,
            &mut c.reacquire_backoff,
        ] {
            *d = Duration::ZERO;
        }
        self
    }

    pub fn backend(mut self, backend: Arc<dyn AnswerBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Persisted answers for `profile_id`. Pending entries answered since the
    /// last run are promoted when the filler is built.
    pub fn answer_store(mut self, store: Arc<dyn AnswerStore>, profile_id: impl Into<String>) -> Self {
        self.store = Some((store, profile_id.into()));
        self
    }

    /// Answers to use directly, without a store.
    pub fn custom_answers(mut self, answers: CustomAnswers) -> Self {
        self.answers = Some(answers);
        self
    }

    pub fn build_config(self) -> FillerConfig {
        self.config
    }

    pub fn build<D: Document>(self, doc: Arc<D>, profile: Arc<Profile>) -> FormFiller<D> {
        FormFiller::new(
            doc,
            profile,
            self.config,
            self.backend,
            self.store,
            self.answers,
        )
    }
}

impl Default for FillerBuilder {
    fn default() -> Self {
        Self::new()
    }
}
