//! Header-driven column resolution.
//!
//! Hand-edited sheets rarely keep a fixed layout, so field positions are
//! inferred from the header row on every fetch. Resolution is a pure function
//! over an ordered rule table: for each field the rules naming it are tried in
//! order, and within a rule the headers are scanned left to right. A field that
//! no rule matches falls back to a fixed position, so every field always
//! resolves to *some* column.
//!
//! Attendance columns are detected separately: any header that is exactly a
//! `YYYY-MM-DD` date.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::Serialize;

/// Semantic fields of a student row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Id,
    Name,
    Class,
    School,
    Mobile,
}

impl Field {
    pub const ALL: [Field; 5] = [
        Field::Id,
        Field::Name,
        Field::Class,
        Field::School,
        Field::Mobile,
    ];

    /// Column used when no header matches the field.
    pub const fn default_index(self) -> usize {
        match self {
            Field::Id => 0,
            Field::Name => 1,
            Field::Class => 2,
            Field::School => 3,
            Field::Mobile => 4,
        }
    }
}

/// One entry of the ordered header-matching table.
///
/// A header matches when its lower-cased text contains any of `keywords` and
/// none of `exclude`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchRule {
    pub field: Field,
    pub keywords: &'static [&'static str],
    pub exclude: &'static [&'static str],
}

impl MatchRule {
    const fn new(field: Field, keywords: &'static [&'static str]) -> Self {
        Self {
            field,
            keywords,
            exclude: &[],
        }
    }

    const fn excluding(mut self, exclude: &'static [&'static str]) -> Self {
        self.exclude = exclude;
        self
    }

    /// Returns whether `header` satisfies this rule.
    pub fn matches(&self, header: &str) -> bool {
        let lower = header.to_lowercase();
        self.keywords.iter().any(|k| lower.contains(k))
            && !self.exclude.iter().any(|k| lower.contains(k))
    }

    fn find<S: AsRef<str>>(&self, headers: &[S]) -> Option<usize> {
        headers.iter().position(|h| self.matches(h.as_ref()))
    }
}

/// Rules used for student records and row lookups.
///
/// `number`/`phone` only stand in for the id when no header mentions `id`.
pub const STUDENT_RULES: &[MatchRule] = &[
    MatchRule::new(Field::Id, &["id"]),
    MatchRule::new(Field::Id, &["number", "phone"]),
    MatchRule::new(Field::Name, &["name"]),
    MatchRule::new(Field::Class, &["class"]),
    MatchRule::new(Field::School, &["school"]),
    MatchRule::new(Field::Mobile, &["mobile", "phone"]),
];

/// Rules used by the attendance views, where a "School Name" header must not
/// be read as the student's name.
pub const ANALYTICS_RULES: &[MatchRule] = &[
    MatchRule::new(Field::Id, &["id"]),
    MatchRule::new(Field::Id, &["number", "phone"]),
    MatchRule::new(Field::Name, &["name"]).excluding(&["school"]),
    MatchRule::new(Field::Class, &["class"]),
    MatchRule::new(Field::School, &["school"]),
    MatchRule::new(Field::Mobile, &["mobile", "phone"]),
];

/// Zero-based column index for each [`Field`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ColumnMap {
    pub id: usize,
    pub name: usize,
    pub class: usize,
    pub school: usize,
    pub mobile: usize,
}

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            id: Field::Id.default_index(),
            name: Field::Name.default_index(),
            class: Field::Class.default_index(),
            school: Field::School.default_index(),
            mobile: Field::Mobile.default_index(),
        }
    }
}

impl ColumnMap {
    /// Resolves a header row with [`STUDENT_RULES`].
    pub fn resolve<S: AsRef<str>>(headers: &[S]) -> Self {
        Self::resolve_with(headers, STUDENT_RULES)
    }

    /// Resolves a header row with [`ANALYTICS_RULES`].
    pub fn resolve_for_analytics<S: AsRef<str>>(headers: &[S]) -> Self {
        Self::resolve_with(headers, ANALYTICS_RULES)
    }

    /// Resolves a header row against an arbitrary ordered rule table.
    pub fn resolve_with<S: AsRef<str>>(headers: &[S], rules: &[MatchRule]) -> Self {
        let lookup = |field: Field| {
            rules
                .iter()
                .filter(|rule| rule.field == field)
                .find_map(|rule| rule.find(headers))
                .unwrap_or(field.default_index())
        };

        Self {
            id: lookup(Field::Id),
            name: lookup(Field::Name),
            class: lookup(Field::Class),
            school: lookup(Field::School),
            mobile: lookup(Field::Mobile),
        }
    }

    pub fn get(&self, field: Field) -> usize {
        match field {
            Field::Id => self.id,
            Field::Name => self.name,
            Field::Class => self.class,
            Field::School => self.school,
            Field::Mobile => self.mobile,
        }
    }

    /// Number of cells needed to hold every mapped field.
    pub fn width(&self) -> usize {
        [self.id, self.name, self.class, self.school, self.mobile]
            .into_iter()
            .max()
            .unwrap_or(0)
            + 1
    }

    /// Field columns a row write may touch under `header`, in [`Field::ALL`]
    /// order.
    ///
    /// No field is ever placed on an attendance date column. The mobile
    /// column is also dropped when it lies past a non-empty header row, since
    /// only its fallback position can put it there.
    pub fn writable_fields<S: AsRef<str>>(&self, header: &[S]) -> Vec<(Field, usize)> {
        Field::ALL
            .into_iter()
            .map(|field| (field, self.get(field)))
            .filter(|&(field, index)| match header.get(index) {
                Some(text) => !is_date_header(text.as_ref()),
                None => field != Field::Mobile || header.is_empty(),
            })
            .collect()
    }
}

static DATE_HEADER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date header pattern is valid"));

/// A header that holds per-student attendance for one day.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateColumn {
    pub index: usize,
    pub header: String,
    /// `None` when the header has the date shape but is not a calendar date.
    pub date: Option<NaiveDate>,
}

/// Returns whether a header is an attendance date header.
pub fn is_date_header(header: &str) -> bool {
    DATE_HEADER.is_match(header)
}

/// Collects attendance date columns in header order.
pub fn date_columns<S: AsRef<str>>(headers: &[S]) -> Vec<DateColumn> {
    headers
        .iter()
        .enumerate()
        .filter(|(_, header)| is_date_header(header.as_ref()))
        .map(|(index, header)| {
            let header = header.as_ref().to_string();
            let date = NaiveDate::parse_from_str(&header, "%Y-%m-%d").ok();
            DateColumn {
                index,
                header,
                date,
            }
        })
        .collect()
}

/// Converts a zero-based column index to its A1 letter (0 = A, 26 = AA).
pub fn column_letter(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = Some(index);

    while let Some(current) = n {
        letters.push(b'A' + u8::try_from(current % 26).unwrap_or(0));
        n = (current / 26).checked_sub(1);
    }

    letters.reverse();
    String::from_utf8(letters).unwrap_or_default()
}

/// Converts an A1 column letter back to a zero-based index.
///
/// Returns `None` for empty input or anything other than ASCII letters.
pub fn column_index(letter: &str) -> Option<usize> {
    if letter.is_empty() {
        return None;
    }

    letter.chars().try_fold(0usize, |acc, c| {
        if !c.is_ascii_alphabetic() {
            return None;
        }
        let digit = (c.to_ascii_uppercase() as usize) - ('A' as usize) + 1;
        acc.checked_mul(26)?.checked_add(digit)
    })?
    .checked_sub(1)
}
