use crate::model::Borough;

const PROGRAM_PREFIXES: &[&str] = &["SIP ", "IFA "];
const WORK_TYPE: &str = "Concrete";

/// How a single physical line of schedule text was classified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Blank,
    /// Page titles ("Schedule for ...") and the column header row.
    Boilerplate,
    /// A borough token with nothing after it.
    BoroughHeader(Borough),
    /// A concrete row seen before any borough token.
    BeforeBorough,
    NotConcrete,
    Row { borough: Borough, block: &'a str },
}

/// Carries the most recently seen borough across lines and pages.
#[derive(Debug, Clone, Default)]
pub struct BoroughTracker {
    current: Option<Borough>,
}

impl BoroughTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<Borough> {
        self.current
    }

    /// Classify one line. A borough token updates the tracker before the
    /// rest of the same line is looked at.
    pub fn classify<'a>(&mut self, raw: &'a str) -> Line<'a> {
        let line = raw.trim();
        if line.is_empty() {
            return Line::Blank;
        }
        if line.contains("Schedule for") || line.starts_with("Borough") {
            return Line::Boilerplate;
        }

        let mut content = line;
        if let Some((borough, rest)) = split_borough(line) {
            self.current = Some(borough);
            if rest.is_empty() {
                return Line::BoroughHeader(borough);
            }
            content = rest;
        }

        let Some(block) = concrete_block(content) else {
            return Line::NotConcrete;
        };
        match self.current {
            Some(borough) => Line::Row { borough, block },
            None => Line::BeforeBorough,
        }
    }
}

/// Split a borough header line into the borough and the rest of the line.
///
/// The borough token is consumed, along with the `ISLAND` that follows
/// `STATEN` and a numeric community-board cell if one comes next. Spacing
/// inside the remainder is kept since column gaps matter downstream.
fn split_borough(line: &str) -> Option<(Borough, &str)> {
    let (first, mut rest) = next_token(line);
    let borough = Borough::from_token(first)?;

    if borough == Borough::StatenIsland {
        let (word, after) = next_token(rest);
        if word.eq_ignore_ascii_case("ISLAND") {
            rest = after;
        }
    }
    let (cell, after) = next_token(rest);
    if !cell.is_empty() && cell.chars().all(|c| c.is_ascii_digit()) {
        rest = after;
    }
    Some((borough, rest))
}

fn next_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

/// Remove leading program tags (`SIP `, `IFA `). Applying it twice is the
/// same as applying it once.
pub fn strip_program_prefix(content: &str) -> &str {
    let mut s = content.trim_start();
    while let Some(rest) = PROGRAM_PREFIXES.iter().find_map(|p| s.strip_prefix(p)) {
        s = rest.trim_start();
    }
    s
}

/// Street-name text of a concrete row, or `None` for any other work type.
pub fn concrete_block(content: &str) -> Option<&str> {
    let stripped = strip_program_prefix(content);
    stripped.strip_suffix(WORK_TYPE).map(str::trim)
}
