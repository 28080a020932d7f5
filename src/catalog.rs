//! Static registry mapping semantic field types to label/name/placeholder rules.
//!
//! Classification is pure: the same `(label, name, id, placeholder)` always
//! yields the same `(FieldType, confidence)`. A label hit scores 0.9, a
//! name/id hit 0.8 and a placeholder hit 0.7; the highest-scoring pattern
//! wins and earlier catalog entries win ties.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::matching;

pub const LABEL_CONFIDENCE: f32 = 0.9;
pub const NAME_CONFIDENCE: f32 = 0.8;
pub const PLACEHOLDER_CONFIDENCE: f32 = 0.7;

/// Meaning of a control independent of its markup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    FirstName,
    LastName,
    FullName,
    Email,
    Phone,
    Linkedin,
    Github,
    Portfolio,
    Website,
    Address,
    City,
    State,
    ZipCode,
    Country,
    WillingToRelocate,
    AuthorizedToWork,
    RequireSponsorship,
    VisaStatus,
    YearsOfExperience,
    CurrentCompany,
    CurrentTitle,
    HighestDegree,
    FieldOfStudy,
    University,
    GraduationYear,
    Resume,
    CoverLetter,
    ExpectedSalary,
    SalaryRangeMin,
    SalaryRangeMax,
    StartDate,
    AvailableImmediately,
    Gender,
    Ethnicity,
    Race,
    HispanicLatino,
    VeteranStatus,
    DisabilityStatus,
    HowDidYouHear,
    Referral,
    CustomQuestion,
    Unknown,
}

/// Coarse grouping of field types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldCategory {
    Identity,
    Contact,
    Location,
    WorkAuthorization,
    Experience,
    Education,
    Compensation,
    Availability,
    Demographic,
    Attachment,
    FreeText,
    Unknown,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            FieldType::FirstName => "first_name",
            FieldType::LastName => "last_name",
            FieldType::FullName => "full_name",
            FieldType::Email => "email",
            FieldType::Phone => "phone",
            FieldType::Linkedin => "linkedin",
            FieldType::Github => "github",
            FieldType::Portfolio => "portfolio",
            FieldType::Website => "website",
            FieldType::Address => "address",
            FieldType::City => "city",
            FieldType::State => "state",
            FieldType::ZipCode => "zip_code",
            FieldType::Country => "country",
            FieldType::WillingToRelocate => "willing_to_relocate",
            FieldType::AuthorizedToWork => "authorized_to_work",
            FieldType::RequireSponsorship => "require_sponsorship",
            FieldType::VisaStatus => "visa_status",
            FieldType::YearsOfExperience => "years_of_experience",
            FieldType::CurrentCompany => "current_company",
            FieldType::CurrentTitle => "current_title",
            FieldType::HighestDegree => "highest_degree",
            FieldType::FieldOfStudy => "field_of_study",
            FieldType::University => "university",
            FieldType::GraduationYear => "graduation_year",
            FieldType::Resume => "resume",
            FieldType::CoverLetter => "cover_letter",
            FieldType::ExpectedSalary => "expected_salary",
            FieldType::SalaryRangeMin => "salary_range_min",
            FieldType::SalaryRangeMax => "salary_range_max",
            FieldType::StartDate => "start_date",
            FieldType::AvailableImmediately => "available_immediately",
            FieldType::Gender => "gender",
            FieldType::Ethnicity => "ethnicity",
            FieldType::Race => "race",
            FieldType::HispanicLatino => "hispanic_latino",
            FieldType::VeteranStatus => "veteran_status",
            FieldType::DisabilityStatus => "disability_status",
            FieldType::HowDidYouHear => "how_did_you_hear",
            FieldType::Referral => "referral",
            FieldType::CustomQuestion => "custom_question",
            FieldType::Unknown => "unknown",
        }
    }

    pub fn category(self) -> FieldCategory {
        use FieldType::*;
        match self {
            FirstName | LastName | FullName => FieldCategory::Identity,
            Email | Phone | Linkedin | Github | Portfolio | Website => FieldCategory::Contact,
            Address | City | State | ZipCode | Country | WillingToRelocate => {
                FieldCategory::Location
            }
            AuthorizedToWork | RequireSponsorship | VisaStatus => FieldCategory::WorkAuthorization,
            YearsOfExperience | CurrentCompany | CurrentTitle => FieldCategory::Experience,
            HighestDegree | FieldOfStudy | University | GraduationYear => FieldCategory::Education,
            ExpectedSalary | SalaryRangeMin | SalaryRangeMax => FieldCategory::Compensation,
            StartDate | AvailableImmediately => FieldCategory::Availability,
            Gender | Ethnicity | Race | HispanicLatino | VeteranStatus | DisabilityStatus => {
                FieldCategory::Demographic
            }
            Resume | CoverLetter => FieldCategory::Attachment,
            HowDidYouHear | Referral | CustomQuestion => FieldCategory::FreeText,
            Unknown => FieldCategory::Unknown,
        }
    }

    /// Fields whose value carries legal or compliance weight.
    pub fn is_high_risk(self) -> bool {
        matches!(
            self.category(),
            FieldCategory::WorkAuthorization | FieldCategory::Compensation | FieldCategory::Demographic
        )
    }

    pub fn is_eeo(self) -> bool {
        self.category() == FieldCategory::Demographic
    }

    /// Types whose value must come from the profile. Missing data for these is
    /// a profile gap, not a question for a human or a generative backend.
    pub fn is_structural(self) -> bool {
        use FieldType::*;
        matches!(
            self,
            FirstName
                | LastName
                | FullName
                | Email
                | Phone
                | Address
                | ZipCode
                | Linkedin
                | Github
                | Portfolio
                | Website
                | Resume
                | CoverLetter
        )
    }
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label keywords that mark a question as an equal-employment demographic one.
pub const EEO_KEYWORDS: &[&str] = &[
    "race",
    "ethnicity",
    "gender",
    "sex",
    "sexual orientation",
    "disability",
    "veteran",
    "eeo",
    "equal employment",
    "hispanic",
    "latino",
    "eeoc",
    "voluntary self-identification",
    "demographic",
];

/// Decline phrases, most preferred first.
pub const DECLINE_PHRASES: &[&str] = &[
    "i do not wish to disclose",
    "decline to answer",
    "prefer not to say",
    "decline to self-identify",
    "i don't wish to answer",
    "choose not to disclose",
    "decline",
    "prefer not to answer",
    "i choose not to disclose",
];

/// Whole-word keyword test, so "trace" or "Essex" do not count.
pub fn is_eeo_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    EEO_KEYWORDS.iter().any(|kw| matching::contains_word(&lower, kw))
}

/// Matching rules for one semantic type. Immutable once the catalog is built.
#[derive(Debug)]
pub struct FieldPattern {
    pub field_type: FieldType,
    pub label: Vec<Regex>,
    pub name: Vec<Regex>,
    pub placeholder: Vec<Regex>,
}

impl FieldPattern {
    fn new(field_type: FieldType, label: &[&str], name: &[&str], placeholder: &[&str]) -> Self {
        Self {
            field_type,
            label: compile(label),
            name: compile(name),
            placeholder: compile(placeholder),
        }
    }

    /// Best confidence this pattern earns for the given (lowercased) signals.
    fn score(&self, label: &str, name: &str, id: &str, placeholder: &str) -> f32 {
        let mut score = 0.0f32;
        if self.label.iter().any(|re| re.is_match(label)) {
            score = score.max(LABEL_CONFIDENCE);
        }
        if self.name.iter().any(|re| re.is_match(name) || re.is_match(id)) {
            score = score.max(NAME_CONFIDENCE);
        }
        if self.placeholder.iter().any(|re| re.is_match(placeholder)) {
            score = score.max(PLACEHOLDER_CONFIDENCE);
        }
        score
    }
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
}

static CATALOG: Lazy<Vec<FieldPattern>> = Lazy::new(|| {
    use FieldType::*;
    vec![
        FieldPattern::new(
            FirstName,
            &[r"first\s*name", r"given\s*name", r"^name$"],
            &[r"first_?name", r"fname", r"given_?name"],
            &[r"first\s*name", r"john"],
        ),
        FieldPattern::new(
            LastName,
            &[r"last\s*name", r"family\s*name", r"surname"],
            &[r"last_?name", r"lname", r"surname", r"family_?name"],
            &[r"last\s*name", r"doe"],
        ),
        FieldPattern::new(
            FullName,
            &[r"full\s*name", r"^name$", r"your\s*name"],
            &[r"full_?name", r"^name$"],
            &[r"full\s*name", r"john doe"],
        ),
        FieldPattern::new(
            Email,
            &[r"e-?mail", r"email\s*address"],
            &[r"e-?mail", r"email_?address"],
            &[r"e-?mail", r"@", r"example\.com"],
        ),
        FieldPattern::new(
            Phone,
            &[r"phone", r"telephone", r"mobile", r"\bcell"],
            &[r"phone", r"\btel", r"mobile", r"cell"],
            &[r"phone", r"\(\d{3}\)", r"\+1"],
        ),
        FieldPattern::new(
            Linkedin,
            &[r"linkedin", r"linked\s*in"],
            &[r"linkedin"],
            &[r"linkedin\.com", r"linkedin"],
        ),
        FieldPattern::new(Github, &[r"github"], &[r"github"], &[r"github\.com", r"github"]),
        FieldPattern::new(
            Portfolio,
            &[r"portfolio", r"personal\s*website", r"website"],
            &[r"portfolio", r"website", r"url"],
            &[r"https?://", r"\.com"],
        ),
        FieldPattern::new(
            Address,
            &[r"street\s*address", r"^address$", r"address\s*line"],
            &[r"address", r"street"],
            &[r"street", r"address"],
        ),
        FieldPattern::new(
            City,
            &[r"^city$", r"location.*city", r"city.*location"],
            &[r"^city$", r"location.*city"],
            &[r"city", r"san francisco"],
        ),
        FieldPattern::new(
            State,
            &[r"^state$", r"province"],
            &[r"^state$", r"province"],
            &[r"state", r"^ca$", r"california"],
        ),
        FieldPattern::new(
            ZipCode,
            &[r"zip", r"postal\s*code"],
            &[r"zip", r"postal"],
            &[r"zip", r"\d{5}"],
        ),
        FieldPattern::new(
            Country,
            &[r"^country$"],
            &[r"^country$"],
            &[r"country", r"united states"],
        ),
        FieldPattern::new(
            WillingToRelocate,
            &[r"relocat"],
            &[r"relocat"],
            &[],
        ),
        FieldPattern::new(
            AuthorizedToWork,
            &[r"authorized\s*to\s*work", r"legally\s*(authorized|eligible)"],
            &[r"authorized", r"work_auth"],
            &[],
        ),
        FieldPattern::new(
            RequireSponsorship,
            &[r"sponsorship", r"require.*visa", r"need.*sponsorship"],
            &[r"sponsor", r"visa"],
            &[],
        ),
        FieldPattern::new(
            VisaStatus,
            &[r"visa\s*status", r"immigration\s*status", r"work\s*status"],
            &[r"visa", r"immigration"],
            &[],
        ),
        FieldPattern::new(
            YearsOfExperience,
            &[r"years?\s*(of)?\s*experience", r"experience\s*\(years\)"],
            &[r"experience", r"years"],
            &[r"\d+\s*years?"],
        ),
        FieldPattern::new(
            CurrentCompany,
            &[
                r"current\s*(company|employer)",
                r"employer",
                r"^company\s*name",
                r"company$",
            ],
            &[r"company", r"employer", r"organization"],
            &[r"company", r"employer"],
        ),
        FieldPattern::new(
            CurrentTitle,
            &[
                r"current\s*(title|position|role)",
                r"job\s*title",
                r"^title\*?$",
                r"position",
            ],
            &[r"title", r"position", r"role", r"job_title"],
            &[r"title", r"position"],
        ),
        FieldPattern::new(
            HighestDegree,
            &[r"(highest\s*)?degree", r"education\s*level", r"^degree\*?$"],
            &[r"degree", r"education", r"edu_degree"],
            &[r"degree", r"bachelor", r"master"],
        ),
        FieldPattern::new(
            FieldOfStudy,
            &[r"field\s*of\s*study", r"\bmajor\b", r"discipline"],
            &[r"field_?of_?study", r"major", r"discipline"],
            &[],
        ),
        FieldPattern::new(
            University,
            &[
                r"university",
                r"school",
                r"institution",
                r"college",
                r"^school\*?$",
            ],
            &[
                r"university",
                r"school",
                r"college",
                r"institution",
                r"edu_school",
            ],
            &[r"school", r"university"],
        ),
        FieldPattern::new(
            GraduationYear,
            &[r"graduation\s*(year|date)", r"year\s*of\s*graduation"],
            &[r"grad_?year", r"graduation"],
            &[],
        ),
        FieldPattern::new(
            Resume,
            &[
                r"resume",
                r"\bcv\b",
                r"curriculum\s*vitae",
                r"^attach$",
                r"attach.*resume",
                r"upload.*resume",
            ],
            &[r"resume", r"\bcv\b", r"data_compliance\[resume", r"resume_file"],
            &[],
        ),
        FieldPattern::new(
            CoverLetter,
            &[r"cover\s*letter"],
            &[r"cover", r"letter", r"cover_letter"],
            &[],
        ),
        FieldPattern::new(
            ExpectedSalary,
            &[r"(expected|desired)\s*salary", r"salary\s*expectation"],
            &[r"salary"],
            &[],
        ),
        FieldPattern::new(
            StartDate,
            &[
                r"start\s*date",
                r"(available|availability)\s*date",
                r"when.*start",
            ],
            &[r"start", r"available"],
            &[],
        ),
        FieldPattern::new(
            Gender,
            &[r"^gender:?$", r"gender\s*identity", r"^gender\s*:"],
            &[r"gender"],
            &[],
        ),
        FieldPattern::new(
            HispanicLatino,
            &[r"hispanic.*latino", r"latino.*hispanic", r"are you hispanic"],
            &[r"hispanic", r"latino"],
            &[],
        ),
        FieldPattern::new(
            Race,
            &[r"^race$", r"^race:", r"identify your race"],
            &[r"^race$"],
            &[],
        ),
        FieldPattern::new(Ethnicity, &[r"ethnicity", r"ethnic"], &[r"ethnicity", r"ethnic"], &[]),
        FieldPattern::new(
            VeteranStatus,
            &[r"veteran", r"military"],
            &[r"veteran", r"military"],
            &[],
        ),
        FieldPattern::new(
            DisabilityStatus,
            &[r"disability", r"disabled"],
            &[r"disability"],
            &[],
        ),
        FieldPattern::new(
            HowDidYouHear,
            &[
                r"how\s*did\s*you\s*(hear|find)",
                r"source",
                r"referral\s*source",
            ],
            &[r"source", r"hear", r"referral"],
            &[],
        ),
        FieldPattern::new(
            Referral,
            &[
                r"who\s*referred",
                r"referred\s*by",
                r"referrer",
                r"referral\s*name",
                r"name\s*of\s*(your\s*)?referr",
            ],
            &[r"referrer", r"referred_by"],
            &[],
        ),
    ]
});

/// All registered patterns, in priority order.
pub fn patterns() -> &'static [FieldPattern] {
    &CATALOG
}

/// Classify a control from its textual signals.
pub fn classify(label: &str, name: &str, id: &str, placeholder: &str) -> (FieldType, f32) {
    let label = label.trim().to_lowercase();
    let name = name.to_lowercase();
    let id = id.to_lowercase();
    let placeholder = placeholder.to_lowercase();

    let mut best = (FieldType::Unknown, 0.0f32);
    for pattern in CATALOG.iter() {
        let score = pattern.score(&label, &name, &id, &placeholder);
        if score > best.1 {
            best = (pattern.field_type, score);
        }
    }
    best
}
