mod common;

use std::sync::{Arc, Mutex};

use applyfill::answers::{AnswerStore, CustomAnswer, CustomAnswers, YamlAnswerStore};
use applyfill::resolve::{AnswerBackend, AnswerRequest};
use applyfill::{FieldType, FillerBuilder, Profile, Result};
use async_trait::async_trait;
use common::{profile, FakeControl, FakeDocument, ListMode};

const AUTHORIZED_OPTIONS: &[&str] = &["Select...", "Yes, I am authorized", "No, I require sponsorship"];

fn basic_form() -> Vec<FakeControl> {
    vec![
        FakeControl::text("first_name", "First Name").required(),
        FakeControl::text("last_name", "Last Name").required(),
        FakeControl::text("email", "Email").required(),
        FakeControl::select(
            "authorized",
            "Are you legally authorized to work in the United States?",
            AUTHORIZED_OPTIONS,
        ),
    ]
}

struct Fixed {
    answer: String,
    asked: Mutex<Vec<String>>,
}

#[async_trait]
impl AnswerBackend for Fixed {
    async fn answer(&self, request: &AnswerRequest) -> Result<String> {
        self.asked.lock().unwrap().push(request.field_description.clone());
        Ok(self.answer.clone())
    }
}

#[tokio::test]
async fn fills_profile_fields() {
    let doc = Arc::new(FakeDocument::new("https://jobs.lever.co/acme/1/apply", basic_form()));
    let mut filler = FillerBuilder::new().no_delays().build(doc.clone(), profile());

    let report = filler.fill_all().await;

    assert_eq!(doc.value("#first_name"), "Ada");
    assert_eq!(doc.value("#last_name"), "Lovelace");
    assert_eq!(doc.value("#email"), "ada@example.com");
    assert_eq!(doc.value("#authorized"), "Yes, I am authorized");
    assert_eq!(report.filled().count(), 4);
    assert_eq!(report.failed_required().count(), 0);
    assert_eq!(report.ats.ats, applyfill::Ats::Lever);

    let high_risk: Vec<_> = report.high_risk().map(|f| f.field.field_type).collect();
    assert_eq!(high_risk, vec![FieldType::AuthorizedToWork]);
}

#[tokio::test]
async fn second_run_writes_nothing() {
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", basic_form()));
    let mut filler = FillerBuilder::new().no_delays().build(doc.clone(), profile());
    filler.fill_all().await;
    let writes = doc.writes();
    assert!(writes >= 4);

    // same filler: every question is already in the registry
    let again = filler.fill_all().await;
    assert!(again.fields.is_empty());
    assert_eq!(doc.writes(), writes);

    // fresh filler over the filled page: values already match
    let mut fresh = FillerBuilder::new().no_delays().build(doc.clone(), profile());
    let report = fresh.fill_all().await;
    assert_eq!(report.filled().count(), 4);
    assert_eq!(doc.writes(), writes);
}

#[tokio::test]
async fn revealed_question_is_filled_in_a_later_pass() {
    let controls = vec![
        FakeControl::select(
            "hispanic",
            "Are you Hispanic or Latino?",
            &["Select...", "Yes", "No", "Decline to self-identify"],
        ),
        FakeControl::select(
            "race",
            "Race",
            &["Select...", "White", "Asian", "Decline to self-identify"],
        )
        .revealed_when("#hispanic", "No"),
    ];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new().no_delays().build(doc.clone(), profile());

    let report = filler.fill_all().await;

    assert_eq!(doc.value("#hispanic"), "No");
    assert_eq!(doc.value("#race"), "Asian");
    assert!(report
        .fields
        .iter()
        .any(|f| f.field.field_type == FieldType::Race && f.success));
}

#[tokio::test]
async fn no_reconciliation_when_passes_disabled() {
    let controls = vec![
        FakeControl::select("hispanic", "Are you Hispanic or Latino?", &["Select...", "Yes", "No"]),
        FakeControl::select("race", "Race", &["Select...", "Asian"]).revealed_when("#hispanic", "No"),
    ];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new()
        .no_delays()
        .max_dynamic_passes(0)
        .build(doc.clone(), profile());

    filler.fill_all().await;

    assert_eq!(doc.value("#hispanic"), "No");
    assert_eq!(doc.value("#race"), "");
}

#[tokio::test]
async fn demographic_dropdown_without_match_is_not_queued() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("ada")).unwrap();
    std::fs::write(dir.path().join("ada/profile.yaml"), common::PROFILE).unwrap();
    let store = Arc::new(YamlAnswerStore::new(dir.path()));

    let controls = vec![
        FakeControl::text("gender", "Gender").dropdown(&["Man", "Woman", "Non-binary"]),
        FakeControl::text("language", "What is your favorite programming language?"),
    ];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new()
        .no_delays()
        .job("Acme", "Engineer")
        .answer_store(store.clone(), "ada")
        .build(doc.clone(), profile());

    let report = filler.fill_all().await;

    assert_eq!(doc.value("#gender"), "");
    let gender = report
        .fields
        .iter()
        .find(|f| f.field.field_type == FieldType::Gender)
        .unwrap();
    assert!(!gender.success);

    let questions: Vec<_> = report.pending.iter().map(|p| p.question.as_str()).collect();
    assert_eq!(questions, vec!["What is your favorite programming language?"]);
    assert_eq!(report.pending[0].job, "Acme - Engineer");

    let (_, pending) = store.load("ada").unwrap();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].question, "What is your favorite programming language?");
}

#[tokio::test]
async fn demographic_without_answer_declines() {
    let controls = vec![FakeControl::select(
        "veteran",
        "Veteran status",
        &["Select...", "I am a protected veteran", "I am not a protected veteran", "I don't wish to answer"],
    )];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new().no_delays().build(doc.clone(), profile());

    let report = filler.fill_all().await;

    assert_eq!(doc.value("#veteran"), "I don't wish to answer");
    assert!(report.fields[0].success);
    assert!(report.pending.is_empty());
}

#[tokio::test]
async fn yes_maps_to_descriptive_option() {
    let controls = vec![FakeControl::select(
        "sponsor",
        "Will you now or in the future require sponsorship?",
        &["Select...", "Yes, I will require sponsorship", "No, I will not require sponsorship"],
    )];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new().no_delays().build(doc.clone(), profile());

    filler.fill_all().await;

    assert_eq!(doc.value("#sponsor"), "No, I will not require sponsorship");
}

#[tokio::test]
async fn city_suggestion_prefers_home_state() {
    let controls = vec![FakeControl::text("city", "City").suggestions(&[
        "San Diego, Baja California, Mexico",
        "San Diego State University",
        "San Diego, California",
    ])];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new().no_delays().build(doc.clone(), profile());

    let report = filler.fill_all().await;

    assert_eq!(doc.value("#city"), "San Diego, California");
    assert!(report.fields[0].success);
}

#[tokio::test]
async fn visa_token_never_lands_in_unrelated_answer() {
    let backend = Arc::new(Fixed {
        answer: "H-1B".to_string(),
        asked: Mutex::new(Vec::new()),
    });
    let controls = vec![
        FakeControl::textarea("orientation", "Sexual orientation").required(),
        FakeControl::text("visa", "Visa status"),
    ];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new()
        .no_delays()
        .backend(backend.clone())
        .build(doc.clone(), profile());

    let report = filler.fill_all().await;

    assert_eq!(backend.asked.lock().unwrap().len(), 1);
    assert_eq!(doc.value("#orientation"), "");
    assert_eq!(doc.value("#visa"), "H-1B");
    let orientation = report.fields.iter().find(|f| f.field.id == "orientation").unwrap();
    assert!(!orientation.success);
    assert!(orientation.value.is_empty());
}

#[tokio::test]
async fn stored_answer_fills_custom_question() {
    let answers = CustomAnswers::new(vec![CustomAnswer {
        question: "Why do you want to work at Acme?".to_string(),
        answer: "I want to build reliable rockets.".to_string(),
        options: Vec::new(),
        keywords: Vec::new(),
    }]);
    let controls = vec![FakeControl::textarea("why", "Why do you want to work at Acme?")];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new()
        .no_delays()
        .custom_answers(answers)
        .build(doc.clone(), profile());

    let report = filler.fill_all().await;

    assert_eq!(doc.value("#why"), "I want to build reliable rockets.");
    assert_eq!(report.fields[0].source, Some(applyfill::ValueSource::CustomAnswer));
}

#[tokio::test]
async fn overwritten_identity_field_is_restored() {
    let controls = vec![
        FakeControl::text("first_name", "First Name"),
        FakeControl::text("last_name", "Last Name").clobbers("#first_name", "Lovelace"),
    ];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new().no_delays().build(doc.clone(), profile());

    filler.fill_all().await;

    assert_eq!(doc.value("#first_name"), "Ada");
    assert_eq!(doc.value("#last_name"), "Lovelace");
}

#[tokio::test]
async fn named_radio_group_uses_safe_selection() {
    let q = "Are you legally authorized to work in the United States?";
    let controls = vec![
        FakeControl::radio("auth_yes", "auth", "1", "Yes", q),
        FakeControl::radio("auth_no", "auth", "0", "No", q),
    ];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new().no_delays().build(doc.clone(), profile());

    let report = filler.fill_all().await;

    assert!(doc.is_checked_now("#auth_yes"));
    assert!(!doc.is_checked_now("#auth_no"));
    assert_eq!(report.fields.len(), 1);
    assert!(report.fields[0].success);
}

#[tokio::test]
async fn unknown_optional_controls_are_skipped() {
    let controls = vec![
        FakeControl::text("first_name", "First Name"),
        FakeControl::text("misc", "Misc"),
    ];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new().no_delays().build(doc.clone(), profile());

    let report = filler.fill_all().await;

    assert_eq!(report.fields.len(), 1);
    assert_eq!(doc.value("#misc"), "");
}

#[tokio::test]
async fn resume_is_attached_from_profile_directory() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("resume.pdf"), b"%PDF-1.4").unwrap();
    let profile = Profile::from_yaml(common::PROFILE, Some(dir.path().to_path_buf())).unwrap();

    let controls = vec![
        FakeControl::file("resume", "Resume/CV"),
        FakeControl::file("cover", "Cover Letter"),
    ];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new().no_delays().build(doc.clone(), Arc::new(profile));

    let report = filler.fill_all().await;

    assert!(doc.value("#resume").ends_with("resume.pdf"));
    assert_eq!(doc.value("#cover"), "");
    let cover = report.fields.iter().find(|f| f.field.id == "cover").unwrap();
    assert!(!cover.success);
    assert!(report.pending.is_empty());
}

fn profile_without(line: &str) -> Arc<Profile> {
    let yaml = common::PROFILE.replace(line, "");
    Arc::new(Profile::from_yaml(&yaml, None).unwrap())
}

#[tokio::test]
async fn revealed_demographic_question_without_answer_is_declined() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(dir.path().join("ada")).unwrap();
    std::fs::write(dir.path().join("ada/profile.yaml"), common::PROFILE).unwrap();
    let store = Arc::new(YamlAnswerStore::new(dir.path()));

    let controls = vec![
        FakeControl::select(
            "hispanic",
            "Are you Hispanic or Latino?",
            &["Select...", "Yes", "No", "Decline to self-identify"],
        ),
        FakeControl::select(
            "race",
            "Please identify your race",
            &["Select...", "White", "Black or African American", "Decline to self-identify"],
        )
        .revealed_when("#hispanic", "No"),
    ];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new()
        .no_delays()
        .answer_store(store.clone(), "ada")
        .build(doc.clone(), profile_without("  race: Asian\n"));

    let report = filler.fill_all().await;

    assert_eq!(doc.value("#race"), "Decline to self-identify");
    let race = report.fields.iter().find(|f| f.field.id == "race").unwrap();
    assert!(race.success);
    assert_eq!(race.source, None);
    assert!(report.pending.is_empty());
    let (_, pending) = store.load("ada").unwrap();
    assert!(pending.is_empty());
}

#[tokio::test]
async fn unrelated_stored_answer_never_fills_demographic_question() {
    let answers = CustomAnswers::new(vec![CustomAnswer {
        question: "Do You Have A Non-Compete Agreement?".to_string(),
        answer: "No".to_string(),
        options: Vec::new(),
        keywords: Vec::new(),
    }]);
    let controls = vec![FakeControl::select(
        "disability",
        "Do You Have A Disability?",
        &["Select...", "Yes", "No", "I don't wish to answer"],
    )];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new()
        .no_delays()
        .custom_answers(answers)
        .build(doc.clone(), profile());

    let report = filler.fill_all().await;

    assert_eq!(doc.value("#disability"), "I don't wish to answer");
    assert_eq!(report.fields[0].source, None);
}

#[tokio::test]
async fn keyboard_selection_is_read_back() {
    let controls = vec![FakeControl::text("city", "City")
        .suggestions(&["San Diego, Baja California, Mexico", "San Diego, California"])
        .list_mode(ListMode::KeyboardOnly)];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new().no_delays().build(doc.clone(), profile());

    let report = filler.fill_all().await;

    assert_eq!(doc.value("#city"), "San Diego, California");
    assert!(report.fields[0].success);
}

#[tokio::test]
async fn lost_suggestion_falls_back_to_typed_value() {
    let controls = vec![FakeControl::text("city", "City")
        .suggestions(&["San Diego, California"])
        .list_mode(ListMode::Unresponsive)];
    let doc = Arc::new(FakeDocument::new("https://example.com/apply", controls));
    let mut filler = FillerBuilder::new().no_delays().build(doc.clone(), profile());

    let report = filler.fill_all().await;

    assert_eq!(doc.value("#city"), "San Diego");
    assert!(report.fields[0].success);
}
