use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Borough {
    Bronx,
    Brooklyn,
    Manhattan,
    Queens,
    #[serde(rename = "Staten Island")]
    StatenIsland,
}

impl Borough {
    pub const ALL: [Borough; 5] = [
        Borough::Bronx,
        Borough::Brooklyn,
        Borough::Manhattan,
        Borough::Queens,
        Borough::StatenIsland,
    ];

    /// Display name, also used in geocoder addresses.
    pub fn name(self) -> &'static str {
        match self {
            Borough::Bronx => "Bronx",
            Borough::Brooklyn => "Brooklyn",
            Borough::Manhattan => "Manhattan",
            Borough::Queens => "Queens",
            Borough::StatenIsland => "Staten Island",
        }
    }

    /// Recognise the leading token of a borough header line.
    /// Any token beginning with `STATEN` maps to Staten Island.
    pub fn from_token(token: &str) -> Option<Borough> {
        match token {
            t if t.starts_with("Bronx") => Some(Borough::Bronx),
            t if t.starts_with("Brooklyn") => Some(Borough::Brooklyn),
            t if t.starts_with("Manhattan") => Some(Borough::Manhattan),
            t if t.starts_with("Queens") => Some(Borough::Queens),
            t if t.starts_with("STATEN") => Some(Borough::StatenIsland),
            _ => None,
        }
    }
}

impl fmt::Display for Borough {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One concrete-repair work item as read from the schedule.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreetSegmentRecord {
    pub borough: Borough,
    pub on_street: String,
    pub from_street: String,
    /// Empty for single-point segments.
    pub to_street: String,
}

impl StreetSegmentRecord {
    pub fn start_address(&self) -> String {
        format!("{} & {}, {}, NY", self.on_street, self.from_street, self.borough)
    }

    pub fn end_address(&self) -> Option<String> {
        if self.to_street.is_empty() {
            return None;
        }
        Some(format!("{} & {}, {}, NY", self.on_street, self.to_street, self.borough))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedSegment {
    pub record: StreetSegmentRecord,
    pub start: Coordinate,
    pub end: Option<Coordinate>,
}

impl ResolvedSegment {
    pub fn is_point_only(&self) -> bool {
        self.end.is_none()
    }
}

/// Page-ordered text of the schedule document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub pages: Vec<Page>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub number: usize,
    pub lines: Vec<String>,
}

impl Document {
    /// One page per input string, numbered from 1 in input order. Pages
    /// with no lines are dropped but keep their place in the numbering.
    pub fn from_pages<I, S>(pages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pages = pages
            .into_iter()
            .enumerate()
            .map(|(idx, page)| Page {
                number: idx + 1,
                lines: page.as_ref().lines().map(str::to_string).collect(),
            })
            .filter(|p| !p.lines.is_empty())
            .collect();
        Self { pages }
    }

    /// Split a text dump into pages on form-feed characters.
    pub fn from_text(text: &str) -> Self {
        Self::from_pages(text.split('\x0C'))
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.pages
            .iter()
            .flat_map(|p| p.lines.iter().map(String::as_str))
    }
}
