//! Attendance aggregation over a fetched grid.
//!
//! Every aggregate is recomputed from the grid on demand; nothing here is
//! persisted. Status cells are classified by case-insensitive substring:
//! "present" wins over "absent", anything else is [`AttendanceStatus::Other`].
//!
//! Denominators differ by call site. The report tallies count *every*
//! non-blank cell in `total`, so an "Other" cell such as "Late" lowers the
//! rate. [`SessionSummary`], used while marks are being taken, only counts
//! present and absent marks and divides by the number of marks taken.

use std::collections::HashSet;

use serde::{Serialize, ser::SerializeStruct};

use crate::{
    columns::{ColumnMap, DateColumn, date_columns},
    grid::SheetGrid,
};

/// Number of students returned by [`AttendanceReport::lowest_students`].
pub const LOWEST_STUDENT_LIMIT: usize = 10;

/// Sentinel accepted by [`Selection::from`] for "no filter".
pub const ALL: &str = "All";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AttendanceStatus {
    Present,
    Absent,
    Other,
}

impl AttendanceStatus {
    /// Classifies a status cell. Empty cells are not entries at all.
    pub fn classify(cell: &str) -> Option<Self> {
        if cell.is_empty() {
            return None;
        }

        let lower = cell.to_lowercase();
        Some(if lower.contains("present") {
            Self::Present
        } else if lower.contains("absent") {
            Self::Absent
        } else {
            Self::Other
        })
    }
}

/// Present/absent counts for one scope.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttendanceTally {
    pub present: u32,
    pub absent: u32,
    /// Non-blank entries, including ones that are neither present nor absent.
    pub total: u32,
}

impl AttendanceTally {
    pub fn record(&mut self, cell: &str) {
        let Some(status) = AttendanceStatus::classify(cell) else {
            return;
        };

        self.total += 1;
        match status {
            AttendanceStatus::Present => self.present += 1,
            AttendanceStatus::Absent => self.absent += 1,
            AttendanceStatus::Other => {}
        }
    }

    /// Present percentage, `0.0` when there are no entries.
    pub fn rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.present) / f64::from(self.total) * 100.0
        }
    }

    /// Absent percentage, `0.0` when there are no entries.
    pub fn absent_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            f64::from(self.absent) / f64::from(self.total) * 100.0
        }
    }

    fn tally_row(row: &[String], columns: &[&DateColumn]) -> Self {
        let mut tally = Self::default();
        for column in columns {
            tally.record(cell(row, column.index));
        }
        tally
    }

    fn merge(&mut self, other: Self) {
        self.present += other.present;
        self.absent += other.absent;
        self.total += other.total;
    }
}

impl Serialize for AttendanceTally {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("AttendanceTally", 4)?;
        state.serialize_field("present", &self.present)?;
        state.serialize_field("absent", &self.absent)?;
        state.serialize_field("total", &self.total)?;
        state.serialize_field("rate", &self.rate())?;
        state.end()
    }
}

/// A filter value: everything, or one exact cell value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Selection {
    #[default]
    All,
    Only(String),
}

impl Selection {
    pub fn matches(&self, value: &str) -> bool {
        match self {
            Selection::All => true,
            Selection::Only(expected) => expected == value,
        }
    }
}

impl From<&str> for Selection {
    fn from(value: &str) -> Self {
        if value == ALL {
            Selection::All
        } else {
            Selection::Only(value.to_string())
        }
    }
}

impl From<Option<String>> for Selection {
    fn from(value: Option<String>) -> Self {
        value.map_or(Selection::All, |v| Selection::from(v.as_str()))
    }
}

/// Active filters of the attendance views.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filters {
    pub school: Selection,
    pub class: Selection,
    pub date: Selection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchoolAttendance {
    pub school: String,
    #[serde(flatten)]
    pub tally: AttendanceTally,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StudentAttendance {
    pub id: String,
    pub name: String,
    pub class: String,
    pub school: String,
    #[serde(flatten)]
    pub tally: AttendanceTally,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendPoint {
    pub date: String,
    #[serde(flatten)]
    pub tally: AttendanceTally,
}

/// All aggregates shown by the attendance views for one set of filters.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AttendanceReport {
    /// Filtered rows over the selected date (or every date).
    pub overall: AttendanceTally,
    /// One entry per school, ignoring the school and class filters.
    pub by_school: Vec<SchoolAttendance>,
    /// Filtered students with at least one entry, lowest rate first.
    pub lowest_students: Vec<StudentAttendance>,
    /// One entry per date column in calendar order, ignoring the date filter.
    pub trend: Vec<TrendPoint>,
}

impl AttendanceReport {
    pub fn compute(grid: &SheetGrid, filters: &Filters) -> Self {
        let columns = ColumnMap::resolve_for_analytics(grid.header());
        let dates = date_columns(grid.header());
        if dates.is_empty() {
            return Self::default();
        }

        let selected: Vec<&DateColumn> = match &filters.date {
            Selection::All => dates.iter().collect(),
            Selection::Only(date) => dates.iter().filter(|c| c.header == *date).take(1).collect(),
        };

        let filtered: Vec<&Vec<String>> = grid
            .data_rows()
            .iter()
            .filter(|row| {
                filters.school.matches(cell(row, columns.school))
                    && filters.class.matches(cell(row, columns.class))
            })
            .collect();

        let mut overall = AttendanceTally::default();
        for row in &filtered {
            overall.merge(AttendanceTally::tally_row(row, &selected));
        }

        let by_school = distinct_values(grid, columns.school)
            .into_iter()
            .map(|school| {
                let mut tally = AttendanceTally::default();
                for row in grid.data_rows() {
                    if cell(row, columns.school) == school {
                        tally.merge(AttendanceTally::tally_row(row, &selected));
                    }
                }
                SchoolAttendance { school, tally }
            })
            .collect();

        let mut lowest_students: Vec<StudentAttendance> = filtered
            .iter()
            .map(|row| StudentAttendance {
                id: cell(row, columns.id).to_string(),
                name: cell(row, columns.name).to_string(),
                class: cell(row, columns.class).to_string(),
                school: cell(row, columns.school).to_string(),
                tally: AttendanceTally::tally_row(row, &selected),
            })
            .filter(|student| student.tally.total > 0)
            .collect();
        lowest_students.sort_by(|a, b| a.tally.rate().total_cmp(&b.tally.rate()));
        lowest_students.truncate(LOWEST_STUDENT_LIMIT);

        let mut chronological: Vec<&DateColumn> = dates.iter().collect();
        chronological.sort_by_key(|c| (c.date.is_none(), c.date));
        let trend = chronological
            .into_iter()
            .map(|column| {
                let mut tally = AttendanceTally::default();
                for row in &filtered {
                    tally.record(cell(row, column.index));
                }
                TrendPoint {
                    date: column.header.clone(),
                    tally,
                }
            })
            .collect();

        Self {
            overall,
            by_school,
            lowest_students,
            trend,
        }
    }
}

/// Values offered by the attendance view's filter controls.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilterOptions {
    pub schools: Vec<String>,
    pub classes: Vec<String>,
    pub dates: Vec<String>,
}

impl FilterOptions {
    pub fn from_grid(grid: &SheetGrid) -> Self {
        let columns = ColumnMap::resolve_for_analytics(grid.header());
        Self {
            schools: distinct_values(grid, columns.school),
            classes: distinct_values(grid, columns.class),
            dates: date_columns(grid.header())
                .into_iter()
                .map(|c| c.header)
                .collect(),
        }
    }
}

fn cell(row: &[String], index: usize) -> &str {
    row.get(index).map_or("", String::as_str)
}

/// Non-empty values of a column in first-seen order.
fn distinct_values(grid: &SheetGrid, column: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    grid.data_rows()
        .iter()
        .filter_map(|row| row.get(column))
        .filter(|value| !value.is_empty() && seen.insert(value.as_str()))
        .cloned()
        .collect()
}

/// Running counts while a day's marks are being taken.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub present: u32,
    pub absent: u32,
    /// Every mark taken, whatever its value.
    pub marked: u32,
}

impl SessionSummary {
    pub fn from_marks<'a>(marks: impl IntoIterator<Item = &'a str>) -> Self {
        let mut summary = Self::default();
        for mark in marks {
            summary.marked += 1;
            match AttendanceStatus::classify(mark) {
                Some(AttendanceStatus::Present) => summary.present += 1,
                Some(AttendanceStatus::Absent) => summary.absent += 1,
                _ => {}
            }
        }
        summary
    }

    /// Present share of all marks, rounded to a whole percent.
    pub fn present_percent(&self) -> f64 {
        if self.marked == 0 {
            0.0
        } else {
            (f64::from(self.present) / f64::from(self.marked) * 100.0).round()
        }
    }
}
