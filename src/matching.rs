//! Pure option-matching rules shared by the fill strategies.
//!
//! Nothing here touches a page: strategies gather option texts, ask these
//! functions which one to pick, and then act on the answer.

use crate::catalog::FieldType;

/// A selectable answer: the submitted value plus the text a person sees.
/// For native options both are the option text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub value: String,
    pub label: String,
}

impl Choice {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }

    pub fn text(text: &str) -> Self {
        Self::new(text, text)
    }

    /// Label if present, else value.
    pub fn display(&self) -> &str {
        if self.label.trim().is_empty() {
            &self.value
        } else {
            &self.label
        }
    }
}

const PLACEHOLDER_PREFIXES: &[&str] = &["select", "choose", "please select", "--", "pick"];

/// Options like "Select..." or "-- choose --" that stand for "no answer".
pub fn is_placeholder(option: &str) -> bool {
    let o = option.trim().to_lowercase();
    o.is_empty() || PLACEHOLDER_PREFIXES.iter().any(|p| o.starts_with(p))
}

/// Checkbox reading of a resolved value.
pub fn truthy(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "yes" | "true" | "1" | "checked"
    )
}

fn yes_no(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "yes" | "true" | "y" | "1" => Some(true),
        "no" | "false" | "n" | "0" => Some(false),
        _ => None,
    }
}

/// `needle` occurs in `haystack` with no letter or digit touching either end.
pub fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }
    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(char::is_alphanumeric) && !after.is_some_and(char::is_alphanumeric)
    })
}

fn starts_with_word(haystack: &str, word: &str) -> bool {
    haystack.starts_with(word)
        && !haystack[word.len()..]
            .chars()
            .next()
            .is_some_and(char::is_alphanumeric)
}

fn is_negated(option: &str) -> bool {
    option.starts_with("not ")
        || option.starts_with("non")
        || starts_with_word(option, "no")
        || option.contains(" not ")
        || option.contains("n't")
}

const DECLINE_MARKERS: &[&str] = &["decline", "wish", "prefer not", "choose not", "don't want"];

fn is_decline_like(option: &str) -> bool {
    DECLINE_MARKERS.iter().any(|d| option.contains(d))
}

// ── Native dropdowns ────────────────────────────────────────────────

/// Exact (case-insensitive) → whole-word containment either way → yes/no
/// equivalence. Placeholder options are never returned.
pub fn match_select_option(options: &[String], value: &str) -> Option<usize> {
    let v = value.trim().to_lowercase();
    if v.is_empty() {
        return None;
    }
    let candidates: Vec<(usize, String)> = options
        .iter()
        .enumerate()
        .filter(|(_, o)| !is_placeholder(o))
        .map(|(i, o)| (i, o.trim().to_lowercase()))
        .collect();

    if let Some((i, _)) = candidates.iter().find(|(_, o)| *o == v) {
        return Some(*i);
    }
    if let Some((i, _)) = candidates
        .iter()
        .find(|(_, o)| contains_word(o, &v) || contains_word(&v, o))
    {
        return Some(*i);
    }
    let wanted = yes_no(&v)?;
    candidates
        .iter()
        .find(|(_, o)| {
            let word = if wanted { ["yes", "true"] } else { ["no", "false"] };
            word.iter().any(|w| starts_with_word(o, w))
        })
        .map(|(i, _)| *i)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalendarKind {
    Month,
    Year,
}

/// Month and year dropdowns are recognised by their label.
pub fn calendar_kind(label: &str) -> Option<CalendarKind> {
    let l = label.to_lowercase();
    if l.contains("year") {
        Some(CalendarKind::Year)
    } else if ["month", "start date", "end date"].iter().any(|k| l.contains(k)) {
        Some(CalendarKind::Month)
    } else {
        None
    }
}

const MONTHS: [(&str, &str); 12] = [
    ("january", "jan"),
    ("february", "feb"),
    ("march", "mar"),
    ("april", "apr"),
    ("may", "may"),
    ("june", "jun"),
    ("july", "jul"),
    ("august", "aug"),
    ("september", "sep"),
    ("october", "oct"),
    ("november", "nov"),
    ("december", "dec"),
];

/// Month number (1-12) named by a dropdown option: full name, abbreviation
/// ("Sept" included) or number.
pub fn month_of(text: &str) -> Option<u32> {
    let t = text.trim().to_lowercase();
    if let Ok(n) = t.parse::<u32>() {
        return (1..=12).contains(&n).then_some(n);
    }
    if t == "sept" {
        return Some(9);
    }
    MONTHS
        .iter()
        .position(|(full, abbr)| t == *abbr || t.contains(full))
        .map(|i| i as u32 + 1)
}

/// Month wanted by a resolved value such as "June", "2024-06" or "06/2024".
fn wanted_month(value: &str) -> Option<u32> {
    if let Some(m) = month_of(value) {
        return Some(m);
    }
    let parts: Vec<&str> = value
        .split(|c: char| c == '-' || c == '/' || c.is_whitespace())
        .filter(|p| !p.is_empty())
        .collect();
    match parts.as_slice() {
        [year, month, ..] if year.len() == 4 => month_of(month),
        [month, year, ..] if year.len() == 4 => month_of(month),
        _ => parts.iter().find_map(|p| month_of(p).filter(|_| p.len() > 2)),
    }
}

/// The option naming the wanted month, else the first real month option.
pub fn match_month(options: &[String], value: &str) -> Option<usize> {
    let months: Vec<(usize, u32)> = options
        .iter()
        .enumerate()
        .filter(|(_, o)| !is_placeholder(o))
        .filter_map(|(i, o)| month_of(o).map(|m| (i, m)))
        .collect();
    if let Some(want) = wanted_month(value) {
        if let Some((i, _)) = months.iter().find(|(_, m)| *m == want) {
            return Some(*i);
        }
    }
    months.first().map(|(i, _)| *i)
}

/// End-date years prefer "Present"/"Current"; otherwise a year named in the
/// value, else the nearest recent year.
pub fn match_year(options: &[String], label: &str, value: &str, current_year: i32) -> Option<usize> {
    let lower: Vec<String> = options.iter().map(|o| o.to_lowercase()).collect();
    if label.to_lowercase().contains("end") {
        if let Some(i) = lower
            .iter()
            .position(|o| o.contains("present") || o.contains("current"))
        {
            return Some(i);
        }
    }
    let named = value
        .split(|c: char| !c.is_ascii_digit())
        .find(|p| p.len() == 4)
        .map(str::to_string);
    let targets = named.into_iter().chain(
        (0..3).map(|back| (current_year - back).to_string()),
    );
    for year in targets {
        if let Some(i) = lower.iter().position(|o| o.contains(&year)) {
            return Some(i);
        }
    }
    None
}

// ── Custom dropdowns rendered as text inputs ────────────────────────

/// Score one visible option against the wanted value. Zero means no match.
pub fn score_dropdown_option(option: &str, value: &str) -> i32 {
    let o = option.trim().to_lowercase();
    let v = value.trim().to_lowercase();
    if v.is_empty() {
        return 0;
    }
    if o == v {
        100
    } else if starts_with_word(&o, &v) {
        80
    } else if yes_no(&v).is_some_and(|yes| starts_with_word(&o, if yes { "yes" } else { "no" })) {
        75
    } else if o.split(',').any(|seg| starts_with_word(seg.trim(), &v)) {
        70
    } else if contains_word(&o, &v) {
        50
    } else {
        0
    }
}

/// Highest-scoring option above zero; earlier options win ties.
pub fn best_dropdown_option(options: &[String], value: &str) -> Option<usize> {
    let mut best: Option<(usize, i32)> = None;
    for (i, option) in options.iter().enumerate() {
        let score = score_dropdown_option(option, value);
        if score > 0 && best.map_or(true, |(_, s)| score > s) {
            best = Some((i, score));
        }
    }
    best.map(|(i, _)| i)
}

/// First option carrying a decline phrase, trying phrases in priority order.
pub fn decline_option<'a, I>(options: I, phrases: &[String]) -> Option<usize>
where
    I: IntoIterator<Item = &'a str>,
    I::IntoIter: Clone,
{
    let options = options.into_iter();
    phrases.iter().find_map(|phrase| {
        let phrase = phrase.to_lowercase();
        options
            .clone()
            .position(|o| o.to_lowercase().contains(&phrase))
    })
}

// ── Typeahead suggestions ───────────────────────────────────────────

const MAX_SUGGESTION_LEN: usize = 150;

/// Drop overlong entries and strip trailing dialling codes
/// ("United States +1" → "United States").
pub fn clean_suggestions(raw: &[String]) -> Vec<String> {
    raw.iter()
        .filter_map(|s| {
            let s = s.trim();
            if s.is_empty() || s.chars().count() >= MAX_SUGGESTION_LEN {
                return None;
            }
            let stripped = match s.rfind('+') {
                Some(pos) if pos > 0 && s[pos + 1..].chars().all(|c| c.is_ascii_digit())
                    && pos + 1 < s.len() =>
                {
                    s[..pos].trim()
                }
                _ => s,
            };
            (!stripped.is_empty()).then(|| stripped.to_string())
        })
        .collect()
}

const US_STATES: &[(&str, &str)] = &[
    ("al", "alabama"),
    ("ak", "alaska"),
    ("az", "arizona"),
    ("ar", "arkansas"),
    ("ca", "california"),
    ("co", "colorado"),
    ("ct", "connecticut"),
    ("de", "delaware"),
    ("dc", "district of columbia"),
    ("fl", "florida"),
    ("ga", "georgia"),
    ("hi", "hawaii"),
    ("id", "idaho"),
    ("il", "illinois"),
    ("in", "indiana"),
    ("ia", "iowa"),
    ("ks", "kansas"),
    ("ky", "kentucky"),
    ("la", "louisiana"),
    ("me", "maine"),
    ("md", "maryland"),
    ("ma", "massachusetts"),
    ("mi", "michigan"),
    ("mn", "minnesota"),
    ("ms", "mississippi"),
    ("mo", "missouri"),
    ("mt", "montana"),
    ("ne", "nebraska"),
    ("nv", "nevada"),
    ("nh", "new hampshire"),
    ("nj", "new jersey"),
    ("nm", "new mexico"),
    ("ny", "new york"),
    ("nc", "north carolina"),
    ("nd", "north dakota"),
    ("oh", "ohio"),
    ("ok", "oklahoma"),
    ("or", "oregon"),
    ("pa", "pennsylvania"),
    ("ri", "rhode island"),
    ("sc", "south carolina"),
    ("sd", "south dakota"),
    ("tn", "tennessee"),
    ("tx", "texas"),
    ("ut", "utah"),
    ("vt", "vermont"),
    ("va", "virginia"),
    ("wa", "washington"),
    ("wv", "west virginia"),
    ("wi", "wisconsin"),
    ("wy", "wyoming"),
];

const OTHER_COUNTRIES: &[&str] = &[
    "costa rica",
    "mexico",
    "canada",
    "puerto rico",
    "brazil",
    "argentina",
    "chile",
    "spain",
    "portugal",
    "philippines",
    "united kingdom",
    "india",
    "australia",
];

/// What a typeahead field is about, plus the applicant's home region.
#[derive(Debug, Clone)]
pub struct SuggestionContext {
    pub label: String,
    pub field_type: FieldType,
    pub state: String,
    pub country: String,
}

impl SuggestionContext {
    fn is_location(&self) -> bool {
        let l = self.label.to_lowercase();
        self.field_type == FieldType::City || l.contains("location") || l.contains("city")
    }

    fn is_country(&self) -> bool {
        self.field_type == FieldType::Country || self.label.to_lowercase().contains("country")
    }

    fn is_school(&self) -> bool {
        let l = self.label.to_lowercase();
        self.field_type == FieldType::University
            || ["school", "university", "college", "institution"]
                .iter()
                .any(|k| l.contains(k))
    }

    fn state_variants(&self) -> Vec<String> {
        let state = self.state.trim().to_lowercase();
        if state.is_empty() {
            return Vec::new();
        }
        let mut variants = vec![state.clone()];
        for (abbr, full) in US_STATES {
            if state == *abbr {
                variants.push(full.to_string());
            } else if state == *full {
                variants.push(abbr.to_string());
            }
        }
        variants
    }

    fn home_is_us(&self) -> bool {
        self.country.to_lowercase().contains("united states")
    }

    fn country_variants(&self) -> Vec<String> {
        let country = self.country.trim().to_lowercase();
        if country.is_empty() {
            return Vec::new();
        }
        let mut variants = vec![country];
        if self.home_is_us() {
            variants.extend(["usa", "us", "u.s.", "united states"].map(String::from));
        }
        variants
    }
}

/// Index of the best suggestion for `typed`, or `None` when no suggestion
/// scores above zero.
pub fn best_suggestion(ctx: &SuggestionContext, typed: &str, options: &[String]) -> Option<usize> {
    let typed = typed.trim().to_lowercase();
    if typed.is_empty() {
        return None;
    }
    let states = ctx.state_variants();
    let countries = ctx.country_variants();
    let prefix: String = typed.chars().take(3).collect();

    let mut best: Option<(usize, i32)> = None;
    for (idx, option) in options.iter().enumerate() {
        let o = option.to_lowercase();
        let related = o.contains(&typed)
            || typed.contains(&o)
            || o.starts_with(&prefix)
            || typed.starts_with(&o.chars().take(3).collect::<String>());
        if !related {
            continue;
        }

        let mut score = 0;
        if o.contains(&typed) {
            score += 10;
        }
        if o.starts_with(&typed) {
            score += 5;
        }

        if ctx.is_location() {
            if states.iter().any(|s| contains_word(&o, s)) {
                score += 50;
            }
            if countries.iter().any(|c| contains_word(&o, c)) {
                score += 30;
            }
            if ctx.home_is_us() && OTHER_COUNTRIES.iter().any(|c| o.contains(c)) {
                score -= 100;
            }
            if o.contains("county") {
                score -= 8;
            }
            if ["university", "college", "school"].iter().any(|k| o.contains(k)) {
                score -= 15;
            }
            if o.contains("airport") {
                score -= 12;
            }
            if o.contains("station") {
                score -= 10;
            }
        }
        if ctx.is_country() && (o == typed || o.contains(&typed)) {
            score += 10;
        }
        if ctx.is_school() && (o.contains("university") || o.contains("college")) {
            score += 5;
        }

        let len = option.chars().count();
        if len < 40 {
            score += 3;
        } else if len > 80 {
            score -= 2;
        }
        score += match idx {
            0 => 2,
            1 => 1,
            _ => 0,
        };

        if best.map_or(true, |(_, s)| score > s) {
            best = Some((idx, score));
        }
    }
    best.filter(|(_, s)| *s > 0).map(|(i, _)| i)
}

// ── High-risk selection ─────────────────────────────────────────────

/// Steps of the conservative selection used for high-risk and demographic
/// questions. Each step is tried only after the previous one failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SafeStep {
    TryExactPreferred,
    TryYesNoEquivalent,
    TryPartialMatch,
    TryDeclineOption,
    GiveUpSilently,
}

impl SafeStep {
    pub fn next(self) -> SafeStep {
        match self {
            SafeStep::TryExactPreferred => SafeStep::TryYesNoEquivalent,
            SafeStep::TryYesNoEquivalent => SafeStep::TryPartialMatch,
            SafeStep::TryPartialMatch => SafeStep::TryDeclineOption,
            SafeStep::TryDeclineOption | SafeStep::GiveUpSilently => SafeStep::GiveUpSilently,
        }
    }

    /// The choice this step would pick, if any.
    pub fn candidate(
        self,
        choices: &[Choice],
        value: &str,
        question: &str,
        decline_phrases: &[String],
    ) -> Option<usize> {
        let v = value.trim().to_lowercase();
        let usable = |c: &Choice| !is_placeholder(c.display());
        match self {
            SafeStep::TryExactPreferred => choices.iter().position(|c| {
                usable(c)
                    && !v.is_empty()
                    && (c.value.trim().to_lowercase() == v || c.label.trim().to_lowercase() == v)
            }),
            SafeStep::TryYesNoEquivalent => {
                let wanted = yes_no(&v)?;
                let topics = topic_words(question);
                choices.iter().position(|c| {
                    usable(c) && yes_no_equivalent(c, wanted, &topics)
                })
            }
            SafeStep::TryPartialMatch => {
                if v.len() < 2 {
                    return None;
                }
                choices.iter().position(|c| {
                    usable(c)
                        && (contains_word(&c.label.to_lowercase(), &v)
                            || contains_word(&c.value.to_lowercase(), &v))
                })
            }
            SafeStep::TryDeclineOption => {
                let texts: Vec<String> = choices
                    .iter()
                    .map(|c| format!("{} {}", c.label, c.value))
                    .collect();
                decline_option(texts.iter().map(String::as_str), decline_phrases)
            }
            SafeStep::GiveUpSilently => None,
        }
    }
}

/// Every candidate the safe sequence would try, in step order, without
/// repeats. An empty plan means give up.
pub fn safe_plan(
    choices: &[Choice],
    value: &str,
    question: &str,
    decline_phrases: &[String],
) -> Vec<(SafeStep, usize)> {
    let mut plan: Vec<(SafeStep, usize)> = Vec::new();
    let mut step = SafeStep::TryExactPreferred;
    while step != SafeStep::GiveUpSilently {
        if let Some(idx) = step.candidate(choices, value, question, decline_phrases) {
            if !plan.iter().any(|(_, i)| *i == idx) {
                plan.push((step, idx));
            }
        }
        step = step.next();
    }
    plan
}

const QUESTION_STOPWORDS: &[&str] = &[
    "are", "you", "your", "have", "please", "identify", "which", "what", "with", "this", "that",
    "does", "describe", "best", "following", "select",
];

fn topic_words(question: &str) -> Vec<String> {
    question
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= 5 && !QUESTION_STOPWORDS.contains(w))
        .map(String::from)
        .collect()
}

fn yes_no_equivalent(choice: &Choice, wanted: bool, topics: &[String]) -> bool {
    let label = choice.display().trim().to_lowercase();
    let value = choice.value.trim().to_lowercase();
    if is_decline_like(&label) {
        return false;
    }
    if yes_no(&value) == Some(wanted) || yes_no(&label) == Some(wanted) {
        return true;
    }
    if wanted {
        starts_with_word(&label, "yes")
            || (!is_negated(&label) && topics.iter().any(|t| label.contains(t.as_str())))
    } else {
        is_negated(&label)
    }
}

/// Whether a single option control (one input per answer, no shared group
/// name) stands for `value`.
pub fn option_matches(option: &str, value: &str, question: &str, decline_phrases: &[String]) -> bool {
    let o = option.trim().to_lowercase();
    let v = value.trim().to_lowercase();
    if o.is_empty() || v.is_empty() {
        return false;
    }
    if o == v {
        return true;
    }
    if let Some(wanted) = yes_no(&v) {
        return yes_no_equivalent(&Choice::text(option), wanted, &topic_words(question));
    }
    let declining = |s: &str| decline_phrases.iter().any(|p| s.contains(&p.to_lowercase()));
    if declining(&o) {
        return declining(&v);
    }
    v.len() >= 3 && contains_word(&o, &v)
}

/// Snap free text to one of the given options: exact, then prefix in either
/// direction, then containment in either direction.
pub fn snap_to_option(answer: &str, options: &[String]) -> Option<String> {
    let a = answer.trim().to_lowercase();
    if a.is_empty() {
        return None;
    }
    let real: Vec<&String> = options.iter().filter(|o| !is_placeholder(o)).collect();
    let lower = |o: &str| o.trim().to_lowercase();
    real.iter()
        .find(|o| lower(o) == a)
        .or_else(|| {
            real.iter()
                .find(|o| lower(o).starts_with(&a) || a.starts_with(&lower(o)))
        })
        .or_else(|| real.iter().find(|o| lower(o).contains(&a) || a.contains(&lower(o))))
        .map(|o| o.to_string())
}
