//! Value resolution: which answer, if any, a classified field should get.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::answers::CustomAnswers;
use crate::catalog::{FieldCategory, FieldType};
use crate::config::FillerConfig;
use crate::error::Result;
use crate::extract::{ControlKind, FormField};
use crate::matching;
use crate::profile::Profile;

/// Where a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    Profile,
    Default,
    CustomAnswer,
    Attachment,
    Generative,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub value: String,
    pub source: ValueSource,
}

impl Resolution {
    fn new(value: impl Into<String>, source: ValueSource) -> Self {
        Self {
            value: value.into(),
            source,
        }
    }
}

/// Context handed to a generative backend for one question.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerRequest {
    pub field_description: String,
    pub options: Vec<String>,
    pub profile_summary: String,
    pub custom_answers_summary: String,
    pub job_title: String,
    pub company_name: String,
}

/// Generative fallback for questions nothing else answers. `"SKIP"`, an
/// empty answer and an error all mean "no answer".
#[async_trait]
pub trait AnswerBackend: Send + Sync {
    async fn answer(&self, request: &AnswerRequest) -> Result<String>;
}

const VISA_TOKENS: &[&str] = &[
    "h1b",
    "h-1b",
    "opt",
    "f1",
    "f-1",
    "green card",
    "l1",
    "l-1",
    "tn",
    "o1",
    "o-1",
];

const VISA_LABEL_KEYWORDS: &[&str] = &[
    "visa",
    "immigration",
    "sponsorship",
    "authorization",
    "work status",
];

const EEO_LABEL_KEYWORDS: &[&str] = &[
    "disability",
    "veteran",
    "gender",
    "race",
    "ethnicity",
    "hispanic",
    "do not want to answer",
    "decline",
    "prefer not",
    "self-identify",
];

const PAY_LABEL_KEYWORDS: &[&str] = &["salary", "compensation", "pay", "wage"];

/// Whether `value` visibly belongs to another domain than the field: a visa
/// token outside work-authorization questions, or a salary-shaped number
/// outside compensation questions. Location fields are exempt from the visa
/// check ("TN" is also Tennessee).
pub fn provenance_conflict(field_type: FieldType, label: &str, value: &str) -> bool {
    let label = label.to_lowercase();
    let lower = value.to_lowercase();

    let visa_value = field_type.category() != FieldCategory::Location
        && VISA_TOKENS.iter().any(|t| matching::contains_word(&lower, t));
    let visa_field = field_type.category() == FieldCategory::WorkAuthorization;
    let visa_label = VISA_LABEL_KEYWORDS.iter().any(|k| label.contains(k));
    let eeo_label = EEO_LABEL_KEYWORDS.iter().any(|k| label.contains(k));
    if visa_value && (!visa_field || eeo_label) && !visa_label {
        return true;
    }

    if field_type.category() != FieldCategory::Compensation
        && value.chars().any(|c| c.is_ascii_digit())
        && (value.contains(',') || value.chars().count() > 5)
        && !PAY_LABEL_KEYWORDS.iter().any(|k| label.contains(k))
    {
        let digits: String = value.chars().filter(|c| *c != ',' && *c != '$').collect();
        if !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit())
            && digits.parse::<u64>().map_or(true, |n| n > 10_000)
        {
            return true;
        }
    }
    false
}

pub struct ValueResolver {
    profile: Arc<Profile>,
    answers: CustomAnswers,
    backend: Option<Arc<dyn AnswerBackend>>,
    file_inputs_seen: usize,
}

impl ValueResolver {
    pub fn new(
        profile: Arc<Profile>,
        answers: CustomAnswers,
        backend: Option<Arc<dyn AnswerBackend>>,
    ) -> Self {
        Self {
            profile,
            answers,
            backend,
            file_inputs_seen: 0,
        }
    }

    pub fn answers(&self) -> &CustomAnswers {
        &self.answers
    }

    /// Start a new application: unlabeled file inputs count from zero again.
    pub fn reset(&mut self) {
        self.file_inputs_seen = 0;
    }

    /// Profile, then fixed defaults, then custom answers, then attachments,
    /// then the generative backend. Every candidate passes the provenance
    /// check; a conflicting one is dropped and resolution moves on.
    pub async fn resolve(&mut self, field: &FormField, config: &FillerConfig) -> Option<Resolution> {
        let question = field.question().to_string();
        let accept = |value: String, source: ValueSource| -> Option<Resolution> {
            if value.trim().is_empty() {
                return None;
            }
            if provenance_conflict(field.field_type, &question, &value) {
                debug!(label = %question, value = %value, "value belongs to another domain, discarded");
                return None;
            }
            Some(Resolution::new(value, source))
        };

        if let Some(found) = self
            .profile
            .value_for(field.field_type)
            .and_then(|v| accept(v, ValueSource::Profile))
        {
            return Some(found);
        }

        if field.field_type == FieldType::HowDidYouHear {
            let answer = self
                .profile
                .default_answer("how_did_you_hear")
                .unwrap_or_else(|| config.referral_default.clone());
            if let Some(found) = accept(answer, ValueSource::Default) {
                return Some(found);
            }
        }

        if field.kind == ControlKind::File {
            return self.attachment(field, config).map(|path| {
                Resolution::new(path.to_string_lossy().into_owned(), ValueSource::Attachment)
            });
        }

        // Demographic answers come from the profile or are declined, never
        // borrowed from another stored question.
        let stored = if field.is_eeo() {
            None
        } else {
            self.answers.find(&question, &field.options)
        };
        if let Some(found) = stored
            .map(str::to_string)
            .and_then(|v| accept(v, ValueSource::CustomAnswer))
        {
            return Some(found);
        }

        if field.field_type.is_structural() || (field.field_type == FieldType::Unknown && !field.required) {
            return None;
        }
        let answer = self.ask_backend(field, config).await?;
        accept(answer, ValueSource::Generative)
    }

    /// Cover letters only ever get the cover letter; the first unlabeled
    /// file input gets the resume and later unlabeled ones nothing.
    fn attachment(&mut self, field: &FormField, config: &FillerConfig) -> Option<PathBuf> {
        let label = field.label.to_lowercase();
        let name = field.name.to_lowercase();
        let mentions = |words: &[&str]| words.iter().any(|w| label.contains(w) || name.contains(w));

        if field.field_type == FieldType::CoverLetter || mentions(&["cover", "letter"]) {
            return self.profile.cover_letter_path();
        }
        if field.field_type == FieldType::Resume || mentions(&["resume", "cv"]) {
            return self.profile.resume_path(&config.resume_file_names);
        }
        self.file_inputs_seen += 1;
        if self.file_inputs_seen == 1 {
            self.profile.resume_path(&config.resume_file_names)
        } else {
            debug!(label = %field.label, "unlabeled file input after the first, skipped");
            None
        }
    }

    async fn ask_backend(&self, field: &FormField, config: &FillerConfig) -> Option<String> {
        let backend = self.backend.as_ref()?;
        let request = AnswerRequest {
            field_description: describe(field),
            options: field.options.clone(),
            profile_summary: self.profile.summary(),
            custom_answers_summary: self.answers.summary(config.answer_context_limit),
            job_title: config.job_title.clone(),
            company_name: config.company.clone(),
        };
        let answer = match backend.answer(&request).await {
            Ok(answer) => answer,
            Err(e) => {
                warn!(label = %field.label, error = %e, "answer backend failed");
                return None;
            }
        };
        let answer = answer.trim();
        if answer.is_empty() || answer.eq_ignore_ascii_case("skip") {
            return None;
        }
        if field.options.iter().any(|o| !matching::is_placeholder(o)) {
            let snapped = matching::snap_to_option(answer, &field.options);
            if snapped.is_none() {
                debug!(label = %field.label, answer, "generated answer matches no option");
            }
            return snapped;
        }
        Some(answer.to_string())
    }
}

fn describe(field: &FormField) -> String {
    let mut text = format!("Question: {}\nInput type: {:?}", field.question(), field.kind);
    if field.required {
        text.push_str("\nRequired: yes");
    }
    if !field.options.is_empty() {
        text.push_str("\nOptions: ");
        text.push_str(&field.options.join(", "));
    }
    text
}

/// Whether an unresolved field should be queued for a human: never for
/// demographic questions, never for profile-backed types (the referral
/// source included), never for unclassified controls.
pub fn should_queue_pending(field: &FormField) -> bool {
    !field.is_eeo() && matches!(field.field_type, FieldType::Referral | FieldType::CustomQuestion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::answers::CustomAnswer;
    use crate::config::FillerBuilder;
    use crate::document::{FramePath, Locator};
    use std::sync::Mutex;

    fn field(field_type: FieldType, kind: ControlKind, label: &str) -> FormField {
        FormField {
            frame: FramePath::TopLevel,
            locator: Locator::new("#f"),
            kind,
            field_type,
            label: label.to_string(),
            group: String::new(),
            name: String::new(),
            id: String::new(),
            options: Vec::new(),
            current_value: String::new(),
            required: false,
            confidence: 0.9,
        }
    }

    fn profile(yaml: &str) -> Arc<Profile> {
        Arc::new(Profile::from_yaml(yaml, None).unwrap())
    }

    struct Scripted {
        reply: Result<String>,
        seen: Mutex<Vec<AnswerRequest>>,
    }

    #[async_trait]
    impl AnswerBackend for Scripted {
        async fn answer(&self, request: &AnswerRequest) -> Result<String> {
            self.seen.lock().unwrap().push(request.clone());
            match &self.reply {
                Ok(s) => Ok(s.clone()),
                Err(_) => Err(crate::Error::Backend("offline".into())),
            }
        }
    }

    fn scripted(reply: Result<String>) -> Arc<Scripted> {
        Arc::new(Scripted {
            reply,
            seen: Mutex::new(Vec::new()),
        })
    }

    #[test]
    fn provenance_rules() {
        assert!(provenance_conflict(FieldType::DisabilityStatus, "Disability status", "H-1B"));
        assert!(!provenance_conflict(FieldType::VisaStatus, "Current visa status", "H-1B"));
        assert!(!provenance_conflict(FieldType::CustomQuestion, "Which visa do you hold?", "OPT"));
        assert!(!provenance_conflict(FieldType::City, "City", "Optimism Falls"));
        assert!(!provenance_conflict(FieldType::State, "State", "TN"));
        assert!(provenance_conflict(FieldType::Gender, "Gender", "OPT"));
        assert!(provenance_conflict(FieldType::YearsOfExperience, "Years", "150,000"));
        assert!(!provenance_conflict(FieldType::CustomQuestion, "Desired pay", "150,000"));
        assert!(!provenance_conflict(FieldType::ExpectedSalary, "Expectations", "$150,000"));
        assert!(!provenance_conflict(FieldType::ZipCode, "Zip", "92101"));
        assert!(!provenance_conflict(FieldType::Phone, "Phone", "+1 619 555 0100"));
    }

    #[tokio::test]
    async fn visa_token_never_reaches_a_disability_field() {
        let p = profile(
            "work_authorization:\n  visa_status: H-1B\ndiversity:\n  disability_status: H-1B\n",
        );
        let mut resolver = ValueResolver::new(p, CustomAnswers::default(), None);
        let f = field(FieldType::DisabilityStatus, ControlKind::Select, "Disability status");
        assert_eq!(resolver.resolve(&f, &FillerConfig::default()).await, None);

        let visa = field(FieldType::VisaStatus, ControlKind::Text, "Visa status");
        let got = resolver.resolve(&visa, &FillerConfig::default()).await.unwrap();
        assert_eq!(got.value, "H-1B");
        assert_eq!(got.source, ValueSource::Profile);
    }

    #[tokio::test]
    async fn referral_source_defaults() {
        let mut resolver = ValueResolver::new(profile("{}"), CustomAnswers::default(), None);
        let f = field(FieldType::HowDidYouHear, ControlKind::Text, "How did you hear about us?");
        let got = resolver.resolve(&f, &FillerConfig::default()).await.unwrap();
        assert_eq!(got.value, "LinkedIn");
        assert_eq!(got.source, ValueSource::Default);

        let p = profile("default_answers:\n  how_did_you_hear: Company website\n");
        let mut resolver = ValueResolver::new(p, CustomAnswers::default(), None);
        let got = resolver.resolve(&f, &FillerConfig::default()).await.unwrap();
        assert_eq!(got.value, "Company website");
    }

    #[tokio::test]
    async fn custom_answers_cover_open_questions() {
        let answers = CustomAnswers::new(vec![CustomAnswer {
            question: "Have you ever worked at Acme Corp?".into(),
            answer: "No".into(),
            options: vec![],
            keywords: vec![],
        }]);
        let mut resolver = ValueResolver::new(profile("{}"), answers, None);
        let f = field(
            FieldType::CustomQuestion,
            ControlKind::Text,
            "Have you ever been employed by Acme Corp?",
        );
        let got = resolver.resolve(&f, &FillerConfig::default()).await.unwrap();
        assert_eq!(got.value, "No");
        assert_eq!(got.source, ValueSource::CustomAnswer);
    }

    #[tokio::test]
    async fn demographic_fields_ignore_custom_answers() {
        let answers = CustomAnswers::new(vec![
            CustomAnswer {
                question: "Do You Have A Non-Compete Agreement?".into(),
                answer: "No".into(),
                options: vec![],
                keywords: vec![],
            },
            CustomAnswer {
                question: "Do you have a disability?".into(),
                answer: "No".into(),
                options: vec![],
                keywords: vec![],
            },
        ]);
        let mut resolver = ValueResolver::new(profile("{}"), answers, None);
        let mut f = field(FieldType::DisabilityStatus, ControlKind::Select, "Do You Have A Disability?");
        f.options = vec!["Select...".into(), "Yes".into(), "No".into(), "I don't wish to answer".into()];
        assert_eq!(resolver.resolve(&f, &FillerConfig::default()).await, None);

        let open = field(FieldType::CustomQuestion, ControlKind::Text, "Do you have a non-compete agreement?");
        let got = resolver.resolve(&open, &FillerConfig::default()).await.unwrap();
        assert_eq!(got.source, ValueSource::CustomAnswer);
    }

    #[tokio::test]
    async fn file_inputs_by_label_and_position() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("resume.pdf"), b"%PDF").unwrap();
        let p = Arc::new(Profile::from_yaml("{}", Some(dir.path().to_path_buf())).unwrap());
        let config = FillerConfig::default();
        let mut resolver = ValueResolver::new(p, CustomAnswers::default(), None);

        let cover = field(FieldType::CoverLetter, ControlKind::File, "Cover Letter");
        assert_eq!(resolver.resolve(&cover, &config).await, None);

        let first = field(FieldType::Unknown, ControlKind::File, "Attach");
        let got = resolver.resolve(&first, &config).await.unwrap();
        assert!(got.value.ends_with("resume.pdf"));
        assert_eq!(got.source, ValueSource::Attachment);

        let second = field(FieldType::Unknown, ControlKind::File, "Attach");
        assert_eq!(resolver.resolve(&second, &config).await, None);

        resolver.reset();
        assert!(resolver.resolve(&first, &config).await.is_some());
    }

    #[tokio::test]
    async fn backend_answers_are_snapped_to_options() {
        let backend = scripted(Ok("  yes, definitely ".into()));
        let mut resolver =
            ValueResolver::new(profile("{}"), CustomAnswers::default(), Some(backend.clone()));
        let mut f = field(
            FieldType::CustomQuestion,
            ControlKind::Select,
            "Are you comfortable working on-site?",
        );
        f.options = vec!["Select...".into(), "Yes".into(), "No".into()];
        let config = FillerBuilder::new().job("Acme", "Engineer").build_config();
        let got = resolver.resolve(&f, &config).await.unwrap();
        assert_eq!(got.value, "Yes");
        assert_eq!(got.source, ValueSource::Generative);

        let seen = backend.seen.lock().unwrap();
        assert_eq!(seen[0].company_name, "Acme");
        assert!(seen[0].field_description.contains("on-site"));
    }

    #[tokio::test]
    async fn backend_skip_and_failure_mean_no_answer() {
        let f = field(FieldType::CustomQuestion, ControlKind::TextArea, "Why Acme?");
        for reply in [Ok("SKIP".to_string()), Err(crate::Error::Backend("x".into()))] {
            let backend = scripted(reply);
            let mut resolver =
                ValueResolver::new(profile("{}"), CustomAnswers::default(), Some(backend));
            assert_eq!(resolver.resolve(&f, &FillerConfig::default()).await, None);
        }
    }

    #[tokio::test]
    async fn structural_gaps_never_reach_the_backend() {
        let backend = scripted(Ok("555-0100".into()));
        let mut resolver =
            ValueResolver::new(profile("{}"), CustomAnswers::default(), Some(backend.clone()));
        let f = field(FieldType::Phone, ControlKind::Text, "Phone");
        assert_eq!(resolver.resolve(&f, &FillerConfig::default()).await, None);
        assert!(backend.seen.lock().unwrap().is_empty());
    }

    #[test]
    fn pending_queue_rules() {
        let open = field(FieldType::CustomQuestion, ControlKind::Text, "Why Acme?");
        assert!(should_queue_pending(&open));
        let race = field(FieldType::Race, ControlKind::Select, "Race");
        assert!(!should_queue_pending(&race));
        let eeo_words = field(
            FieldType::CustomQuestion,
            ControlKind::Text,
            "Do you identify as transgender or gender non-conforming?",
        );
        assert!(!should_queue_pending(&eeo_words));
        let phone = field(FieldType::Phone, ControlKind::Text, "Phone");
        assert!(!should_queue_pending(&phone));
        let source = field(FieldType::HowDidYouHear, ControlKind::Text, "How did you hear about us?");
        assert!(!should_queue_pending(&source));
        let referrer = field(FieldType::Referral, ControlKind::Text, "Who referred you?");
        assert!(should_queue_pending(&referrer));
    }
}
