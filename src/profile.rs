//! Read-only applicant record and its lookup by semantic type.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::catalog::FieldType;
use crate::error::Result;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Personal {
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub email: String,
    pub phone: String,
    pub linkedin: String,
    pub github: String,
    pub portfolio: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
    pub willing_to_relocate: bool,
}

impl Default for Location {
    fn default() -> Self {
        Self {
            address: String::new(),
            city: String::new(),
            state: String::new(),
            zip_code: String::new(),
            country: String::new(),
            willing_to_relocate: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkAuthorization {
    pub authorized_to_work: bool,
    pub require_sponsorship: bool,
    pub visa_status: String,
}

impl Default for WorkAuthorization {
    fn default() -> Self {
        Self {
            authorized_to_work: true,
            require_sponsorship: false,
            visa_status: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Experience {
    pub years_of_experience: u32,
    pub current_company: String,
    pub current_title: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Education {
    pub highest_degree: String,
    pub field_of_study: String,
    pub university: String,
    pub graduation_year: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Resume {
    pub path: String,
    pub cover_letter_path: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Salary {
    pub expected_salary: String,
    pub salary_range_min: String,
    pub salary_range_max: String,
    pub currency: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Availability {
    pub start_date: String,
    pub available_immediately: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Diversity {
    pub gender: String,
    pub race: String,
    pub ethnicity: String,
    pub hispanic_latino: String,
    pub veteran_status: String,
    pub disability_status: String,
}

/// Structured applicant record. Immutable for the duration of a run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    pub personal: Personal,
    pub location: Location,
    pub work_authorization: WorkAuthorization,
    pub experience: Experience,
    pub education: Education,
    pub resume: Resume,
    pub salary: Salary,
    pub availability: Availability,
    pub diversity: Diversity,
    pub default_answers: HashMap<String, String>,

    /// Directory the profile was loaded from; anchors relative attachment paths.
    #[serde(skip)]
    pub profile_dir: Option<PathBuf>,
}

fn yes_no(flag: bool) -> String {
    if flag { "Yes" } else { "No" }.to_string()
}

fn non_zero(n: u32) -> String {
    if n == 0 {
        String::new()
    } else {
        n.to_string()
    }
}

impl Profile {
    /// Parse a profile document. Unknown sections (such as `custom_answers`)
    /// are ignored here; they belong to the answer store.
    pub fn from_yaml(yaml: &str, profile_dir: Option<PathBuf>) -> Result<Self> {
        let mut profile: Profile = serde_yaml::from_str(yaml)?;
        profile.profile_dir = profile_dir;
        Ok(profile)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml(&text, path.parent().map(Path::to_path_buf))
    }

    /// Direct profile lookup. Returns `None` for types the profile does not
    /// carry and for empty entries.
    pub fn value_for(&self, field_type: FieldType) -> Option<String> {
        use FieldType::*;
        let value = match field_type {
            FirstName => self.personal.first_name.clone(),
            LastName => self.personal.last_name.clone(),
            FullName => {
                if self.personal.full_name.is_empty() {
                    format!("{} {}", self.personal.first_name, self.personal.last_name)
                        .trim()
                        .to_string()
                } else {
                    self.personal.full_name.clone()
                }
            }
            Email => self.personal.email.clone(),
            Phone => self.personal.phone.clone(),
            Linkedin => self.personal.linkedin.clone(),
            Github => self.personal.github.clone(),
            Portfolio | Website => self.personal.portfolio.clone(),
            Address => self.location.address.clone(),
            City => self.location.city.clone(),
            State => self.location.state.clone(),
            ZipCode => self.location.zip_code.clone(),
            Country => self.location.country.clone(),
            WillingToRelocate => yes_no(self.location.willing_to_relocate),
            AuthorizedToWork => yes_no(self.work_authorization.authorized_to_work),
            RequireSponsorship => yes_no(self.work_authorization.require_sponsorship),
            VisaStatus => self.work_authorization.visa_status.clone(),
            YearsOfExperience => non_zero(self.experience.years_of_experience),
            CurrentCompany => self.experience.current_company.clone(),
            CurrentTitle => self.experience.current_title.clone(),
            HighestDegree => self.education.highest_degree.clone(),
            FieldOfStudy => self.education.field_of_study.clone(),
            University => self.education.university.clone(),
            GraduationYear => non_zero(self.education.graduation_year),
            ExpectedSalary => self.salary.expected_salary.clone(),
            SalaryRangeMin => self.salary.salary_range_min.clone(),
            SalaryRangeMax => self.salary.salary_range_max.clone(),
            StartDate => self.availability.start_date.clone(),
            AvailableImmediately => yes_no(self.availability.available_immediately),
            Gender => self.diversity.gender.clone(),
            Race => self.diversity.race.clone(),
            Ethnicity => {
                if self.diversity.ethnicity.is_empty() {
                    self.diversity.race.clone()
                } else {
                    self.diversity.ethnicity.clone()
                }
            }
            HispanicLatino => self.diversity.hispanic_latino.clone(),
            VeteranStatus => self.diversity.veteran_status.clone(),
            DisabilityStatus => self.diversity.disability_status.clone(),
            Resume | CoverLetter | HowDidYouHear | Referral | CustomQuestion | Unknown => {
                String::new()
            }
        };
        Some(value).filter(|v| !v.trim().is_empty())
    }

    pub fn default_answer(&self, key: &str) -> Option<String> {
        self.default_answers
            .get(key)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }

    /// Absolute resume path: the configured path (relative paths resolve
    /// against the profile directory), else the first conventional file name
    /// found in the profile directory.
    pub fn resume_path(&self, conventional_names: &[String]) -> Option<PathBuf> {
        if let Some(path) = self.existing(&self.resume.path) {
            return Some(path);
        }
        let dir = self.profile_dir.as_ref()?;
        conventional_names
            .iter()
            .map(|name| dir.join(name))
            .find(|candidate| candidate.exists())
            .map(|found| absolute(&found))
    }

    pub fn cover_letter_path(&self) -> Option<PathBuf> {
        self.existing(&self.resume.cover_letter_path)
    }

    fn existing(&self, raw: &str) -> Option<PathBuf> {
        if raw.trim().is_empty() {
            return None;
        }
        let mut path = expand_home(raw);
        if path.is_relative() {
            if let Some(dir) = &self.profile_dir {
                path = dir.join(path);
            }
        }
        path.exists().then(|| absolute(&path))
    }

    /// Compact text summary used as generative-answer context.
    pub fn summary(&self) -> String {
        let p = self;
        format!(
            "- Name: {}\n- Current Role: {} at {}\n- Years of Experience: {}\n\
             - Education: {} in {} from {}\n- Location: {}, {}\n\
             - Work Authorization: {}\n- Sponsorship Required: {}",
            p.value_for(FieldType::FullName).unwrap_or_default(),
            p.experience.current_title,
            p.experience.current_company,
            p.experience.years_of_experience,
            p.education.highest_degree,
            p.education.field_of_study,
            p.education.university,
            p.location.city,
            p.location.state,
            if p.work_authorization.authorized_to_work {
                "Authorized to work"
            } else {
                "Not authorized"
            },
            yes_no(p.work_authorization.require_sponsorship),
        )
    }
}

fn expand_home(raw: &str) -> PathBuf {
    if let Some(rest) = raw.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(rest);
        }
    }
    PathBuf::from(raw)
}

fn absolute(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}
