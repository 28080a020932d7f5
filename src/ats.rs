//! Applicant-tracking platform fingerprinting. Diagnostic only: nothing in
//! the fill path branches on the result.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Ats {
    Lever,
    Greenhouse,
    Ashby,
    Workday,
    Icims,
    Taleo,
    BambooHr,
    Jobvite,
    SmartRecruiters,
    Unknown,
}

impl Ats {
    pub fn as_str(self) -> &'static str {
        match self {
            Ats::Lever => "lever",
            Ats::Greenhouse => "greenhouse",
            Ats::Ashby => "ashby",
            Ats::Workday => "workday",
            Ats::Icims => "icims",
            Ats::Taleo => "taleo",
            Ats::BambooHr => "bamboohr",
            Ats::Jobvite => "jobvite",
            Ats::SmartRecruiters => "smartrecruiters",
            Ats::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Ats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionMethod {
    Url,
    Dom,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AtsDetection {
    pub ats: Ats,
    pub confidence: f32,
    pub method: DetectionMethod,
}

impl AtsDetection {
    const UNKNOWN: AtsDetection = AtsDetection {
        ats: Ats::Unknown,
        confidence: 0.0,
        method: DetectionMethod::None,
    };
}

static URL_PATTERNS: Lazy<Vec<(Ats, Regex)>> = Lazy::new(|| {
    let table: &[(Ats, &[&str])] = &[
        (Ats::Lever, &[r"jobs\.lever\.co", r"lever\.co/[^/]+/jobs"]),
        (
            Ats::Greenhouse,
            &[r"boards\.greenhouse\.io", r"greenhouse\.io/[^/]+/jobs", r"/greenhouse/"],
        ),
        (Ats::Ashby, &[r"jobs\.ashbyhq\.com", r"ashbyhq\.com/[^/]+/jobs"]),
        (
            Ats::Workday,
            &[r"myworkdayjobs\.com", r"\.workday\.com", r"/workday/"],
        ),
        (Ats::Icims, &[r"careers-[^.]+\.icims\.com", r"\.icims\.com"]),
        (Ats::Taleo, &[r"\.taleo\.net", r"taleo\.com"]),
        (Ats::BambooHr, &[r"[^.]+\.bamboohr\.com/jobs"]),
        (Ats::Jobvite, &[r"jobs\.jobvite\.com", r"\.jobvite\.com"]),
        (
            Ats::SmartRecruiters,
            &[r"jobs\.smartrecruiters\.com", r"\.smartrecruiters\.com"],
        ),
    ];
    table
        .iter()
        .flat_map(|(ats, patterns)| {
            patterns
                .iter()
                .filter_map(move |p| Regex::new(p).ok().map(|re| (*ats, re)))
        })
        .collect()
});

const DOM_MARKERS: &[(Ats, &[&str])] = &[
    (
        Ats::Lever,
        &["lever-jobs-container", "lever-application-form", "data-lever"],
    ),
    (
        Ats::Greenhouse,
        &["greenhouse-job-board", "grnhse_app", "data-greenhouse"],
    ),
    (Ats::Ashby, &["ashby-job-posting", "_ashby_"]),
    (Ats::Workday, &["workday-application", "myworkdayjobs", "workday"]),
    (Ats::Icims, &["icims"]),
];

pub fn detect_from_url(url: &str) -> Option<AtsDetection> {
    let url = url.to_lowercase();
    URL_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(&url))
        .map(|(ats, _)| AtsDetection {
            ats: *ats,
            confidence: 0.95,
            method: DetectionMethod::Url,
        })
}

pub fn detect_from_dom(html: &str) -> Option<AtsDetection> {
    let html = html.to_lowercase();
    DOM_MARKERS
        .iter()
        .find(|(_, markers)| markers.iter().any(|m| html.contains(m)))
        .map(|(ats, _)| AtsDetection {
            ats: *ats,
            confidence: 0.75,
            method: DetectionMethod::Dom,
        })
}

/// URL first, then markup markers, else unknown.
pub fn detect(url: &str, html: Option<&str>) -> AtsDetection {
    detect_from_url(url)
        .or_else(|| html.and_then(detect_from_dom))
        .unwrap_or(AtsDetection::UNKNOWN)
}
