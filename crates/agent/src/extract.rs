use std::collections::{HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;

use fundy_core::domain::project::ProjectId;
use fundy_core::ledger::Ledger;

/// Word-level tokens: runs of letters/digits, with comma-grouped numbers
/// kept whole ("1,250,000" is one token, "223, 500" is two).
static TOKEN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:,\d{3})+|[\p{L}\p{N}]+").expect("token pattern compiles")
});

/// How an utterance resolved against the project ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProjectResolution {
    None,
    Unique(ProjectId),
    /// Several distinct projects matched and none of them subsumes the
    /// others; the caller should ask which one was meant.
    Ambiguous(Vec<ProjectId>),
}

/// A fund request pulled out of one utterance. Nothing here is persisted;
/// the runtime decides what becomes an order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FundRequest {
    pub amount: Option<u64>,
    pub project: ProjectResolution,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Span {
    start: usize,
    len: usize,
}

impl Span {
    fn end(&self) -> usize {
        self.start + self.len
    }

    fn covers(&self, other: &Span) -> bool {
        self.start <= other.start && other.end() <= self.end()
    }
}

struct Candidate {
    id: ProjectId,
    best: Span,
    best_chars: usize,
    spans: Vec<Span>,
}

impl Candidate {
    fn offer(&mut self, span: Span, chars: usize) {
        let better = (span.len, chars) > (self.best.len, self.best_chars)
            || ((span.len, chars) == (self.best.len, self.best_chars)
                && span.start < self.best.start);
        if better {
            self.best = span;
            self.best_chars = chars;
        }
        self.spans.push(span);
    }
}

/// Turns free-form text into a [`FundRequest`] against a ledger.
///
/// Matching is whole-token: a project key must appear as a full word or
/// word sequence, so `ark` never matches inside `marketing`. When keys
/// nest ("mobile" inside "mobile app"), the longer, more specific match
/// wins; genuinely separate mentions of different projects come back as
/// [`ProjectResolution::Ambiguous`]. The amount is the first numeric
/// token that is not part of the matched project keys, which keeps
/// "project 223, 500 riyals" from reading 223 as the amount.
#[derive(Clone, Copy, Debug, Default)]
pub struct RequestExtractor;

impl RequestExtractor {
    pub fn new() -> Self {
        Self
    }

    pub fn extract(&self, text: &str, ledger: &Ledger) -> FundRequest {
        let normalized = normalize(text);
        let tokens = tokenize(&normalized);

        let candidates = collect_candidates(&tokens, ledger);
        let excluded = excluded_indices(&candidates);
        let project = resolve(candidates);
        let amount = first_free_amount(&tokens, &excluded);

        FundRequest { amount, project }
    }
}

/// Lower-cases and folds Arabic-Indic digits so `٥٠٠` reads as `500`.
fn normalize(text: &str) -> String {
    text.to_lowercase().chars().map(fold_digit).collect()
}

fn fold_digit(c: char) -> char {
    match c {
        '\u{0660}'..='\u{0669}' => char::from(b'0' + (c as u32 - 0x0660) as u8),
        '\u{06F0}'..='\u{06F9}' => char::from(b'0' + (c as u32 - 0x06F0) as u8),
        _ => c,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    TOKEN
        .find_iter(text)
        .map(|token| {
            let token = token.as_str();
            if token.contains(',') {
                token.replace(',', "")
            } else {
                token.to_string()
            }
        })
        .collect()
}

fn collect_candidates(tokens: &[String], ledger: &Ledger) -> Vec<Candidate> {
    let mut by_project: HashMap<ProjectId, Candidate> = HashMap::new();

    for (key, project) in ledger.entries() {
        let key_tokens = tokenize(key);
        if key_tokens.is_empty() || key_tokens.len() > tokens.len() {
            continue;
        }
        let chars: usize = key_tokens.iter().map(String::len).sum();

        for start in 0..=(tokens.len() - key_tokens.len()) {
            let window = &tokens[start..start + key_tokens.len()];
            if window == key_tokens.as_slice() {
                let span = Span { start, len: key_tokens.len() };
                by_project
                    .entry(project.id.clone())
                    .and_modify(|candidate| candidate.offer(span, chars))
                    .or_insert_with(|| Candidate {
                        id: project.id.clone(),
                        best: span,
                        best_chars: chars,
                        spans: vec![span],
                    });
            }
        }
    }

    by_project.into_values().collect()
}

/// Token indices consumed by any project match. Numeric ids and numbers
/// inside project names are not amount candidates.
fn excluded_indices(candidates: &[Candidate]) -> HashSet<usize> {
    let mut excluded = HashSet::new();
    for candidate in candidates {
        for span in &candidate.spans {
            excluded.extend(span.start..span.end());
        }
    }
    excluded
}

fn resolve(candidates: Vec<Candidate>) -> ProjectResolution {
    if candidates.is_empty() {
        return ProjectResolution::None;
    }

    // A candidate whose best match sits inside a longer match of another
    // project was only ever part of that bigger name.
    let mut survivors: Vec<usize> = Vec::new();
    for (index, candidate) in candidates.iter().enumerate() {
        let subsumed = candidates.iter().any(|other| {
            other.id != candidate.id
                && other
                    .spans
                    .iter()
                    .any(|span| span.len > candidate.best.len && span.covers(&candidate.best))
        });
        if !subsumed {
            survivors.push(index);
        }
    }

    match survivors.as_slice() {
        [] => ProjectResolution::None,
        [only] => ProjectResolution::Unique(candidates[*only].id.clone()),
        _ => {
            let mut order: Vec<(usize, ProjectId)> = survivors
                .into_iter()
                .map(|index| (candidates[index].best.start, candidates[index].id.clone()))
                .collect();
            order.sort_by(|(a_start, a_id), (b_start, b_id)| {
                a_start.cmp(b_start).then_with(|| a_id.0.cmp(&b_id.0))
            });
            ProjectResolution::Ambiguous(order.into_iter().map(|(_, id)| id).collect())
        }
    }
}

fn first_free_amount(tokens: &[String], excluded: &HashSet<usize>) -> Option<u64> {
    tokens
        .iter()
        .enumerate()
        .filter(|(index, token)| {
            !excluded.contains(index) && token.bytes().all(|b| b.is_ascii_digit())
        })
        .find_map(|(_, token)| token.parse::<u64>().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fundy_core::ledger::parse_registry;

    fn ledger(raw: &str) -> Ledger {
        parse_registry(raw).ledger
    }

    fn standard() -> Ledger {
        ledger(
            "\
- Project ID: 7 | Name: Alpha | Budget: 2000 Riyals
- Project ID: 223 | Name: Tools | Budget: 8000 Riyals
- Project ID: 41 | Name: Mobile | Budget: 1000 Riyals
- Project ID: 42 | Name: Mobile App | Budget: 5000 Riyals
",
        )
    }

    fn extract(text: &str, ledger: &Ledger) -> FundRequest {
        RequestExtractor::new().extract(text, ledger)
    }

    #[test]
    fn finds_amount_and_project_in_plain_request() {
        let request = extract("Request 500$ for tools", &standard());
        assert_eq!(request.amount, Some(500));
        assert_eq!(request.project, ProjectResolution::Unique(ProjectId("223".to_string())));
    }

    #[test]
    fn matches_project_by_numeric_id() {
        let request = extract("Send 100 to project 7 please", &standard());
        assert_eq!(request.amount, Some(100));
        assert_eq!(request.project, ProjectResolution::Unique(ProjectId("7".to_string())));
    }

    #[test]
    fn project_id_is_not_mistaken_for_the_amount() {
        let request = extract("Request money for project 223, 500 riyals for tools", &standard());
        assert_eq!(request.amount, Some(500));
        assert_eq!(request.project, ProjectResolution::Unique(ProjectId("223".to_string())));
    }

    #[test]
    fn key_never_matches_inside_a_longer_word() {
        let ledger = ledger("- Project ID: 9 | Name: Ark | Budget: 100 Riyals\n");
        let request = extract("Spending 50 on marketing materials", &ledger);
        assert_eq!(request.project, ProjectResolution::None);
        assert_eq!(request.amount, Some(50));
    }

    #[test]
    fn longest_name_wins_over_its_prefix() {
        let request = extract("Move 400 to mobile app", &standard());
        assert_eq!(request.project, ProjectResolution::Unique(ProjectId("42".to_string())));
        assert_eq!(request.amount, Some(400));
    }

    #[test]
    fn separate_mentions_of_two_projects_are_ambiguous() {
        let request = extract("Split 300 between alpha and tools", &standard());
        assert_eq!(
            request.project,
            ProjectResolution::Ambiguous(vec![
                ProjectId("7".to_string()),
                ProjectId("223".to_string()),
            ])
        );
    }

    #[test]
    fn name_and_id_of_the_same_project_stay_unique() {
        let request = extract("alpha, project 7, needs 50", &standard());
        assert_eq!(request.project, ProjectResolution::Unique(ProjectId("7".to_string())));
        assert_eq!(request.amount, Some(50));
    }

    #[test]
    fn comma_grouped_amount_is_one_number() {
        let request = extract("Send 1,000 to alpha", &standard());
        assert_eq!(request.amount, Some(1000));
    }

    #[test]
    fn arabic_digits_fold_to_ascii() {
        let request = extract("حول ٥٠٠ الى alpha", &standard());
        assert_eq!(request.amount, Some(500));
        assert_eq!(request.project, ProjectResolution::Unique(ProjectId("7".to_string())));
    }

    #[test]
    fn oversized_number_is_skipped_for_the_next_one() {
        let request = extract("99999999999999999999999999 no, 500 for alpha", &standard());
        assert_eq!(request.amount, Some(500));
    }

    #[test]
    fn missing_pieces_extract_as_none() {
        let request = extract("How do I request funds?", &standard());
        assert_eq!(request.amount, None);
        assert_eq!(request.project, ProjectResolution::None);

        let request = extract("something for alpha", &standard());
        assert_eq!(request.amount, None);
        assert_eq!(request.project, ProjectResolution::Unique(ProjectId("7".to_string())));
    }

    #[test]
    fn empty_ledger_matches_nothing() {
        let request = extract("Request 500 for alpha", &Ledger::default());
        assert_eq!(request.project, ProjectResolution::None);
        assert_eq!(request.amount, Some(500));
    }

    #[test]
    fn case_and_punctuation_do_not_matter() {
        let request = extract("PLEASE send 75 to Alpha.", &standard());
        assert_eq!(request.amount, Some(75));
        assert_eq!(request.project, ProjectResolution::Unique(ProjectId("7".to_string())));
    }
}
