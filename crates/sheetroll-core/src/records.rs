//! Student records and their row representation.

use serde::{Deserialize, Serialize};

use crate::{
    columns::{ColumnMap, Field},
    grid::SheetGrid,
};

/// Value used for a missing class or school.
pub const NOT_AVAILABLE: &str = "N/A";

/// One student as shown to callers.
///
/// `id` is the externally visible key. Uniqueness is assumed, never checked:
/// the spreadsheet is the source of truth.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentRecord {
    pub id: String,
    pub name: String,
    pub class: String,
    pub school: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile_number: Option<String>,
}

impl StudentRecord {
    /// Lays the record out as a sheet row following `layout`.
    ///
    /// The row is as wide as the highest mapped column; unmapped gaps are
    /// empty strings.
    pub fn to_row(&self, layout: &ColumnMap) -> Vec<String> {
        let mut row = vec![String::new(); layout.width()];
        // Later writes win, so the id is placed last when columns collide.
        row[layout.mobile] = self.mobile_number.clone().unwrap_or_default();
        row[layout.name].clone_from(&self.name);
        row[layout.class].clone_from(&self.class);
        row[layout.school].clone_from(&self.school);
        row[layout.id].clone_from(&self.id);
        row
    }

    /// Reads a record from the raw `cells` of a row under `header`.
    ///
    /// Unlike [`grid_to_students`] no placeholders are filled in: an empty
    /// cell stays empty. Columns a write may not touch are ignored.
    pub fn from_cells<S: AsRef<str>>(header: &[S], cells: &[String]) -> Self {
        let fields = ColumnMap::resolve(header).writable_fields(header);
        let cell = |wanted: Field| {
            fields
                .iter()
                .find(|(field, _)| *field == wanted)
                .and_then(|&(_, index)| cells.get(index))
                .map_or("", |c| c.trim())
        };

        Self {
            id: cell(Field::Id).to_string(),
            name: cell(Field::Name).to_string(),
            class: cell(Field::Class).to_string(),
            school: cell(Field::School).to_string(),
            mobile_number: Some(cell(Field::Mobile))
                .filter(|m| !m.is_empty())
                .map(str::to_string),
        }
    }

    pub fn field(&self, field: Field) -> &str {
        match field {
            Field::Id => &self.id,
            Field::Name => &self.name,
            Field::Class => &self.class,
            Field::School => &self.school,
            Field::Mobile => self.mobile_number.as_deref().unwrap_or_default(),
        }
    }

    /// Lays the record over the `existing` cells of a row under `header`.
    ///
    /// Only [`ColumnMap::writable_fields`] are replaced. Every other cell up
    /// to the last written column keeps its value from `existing`, so a
    /// write of the result never clears an attendance mark. The id wins when
    /// two fields share a column.
    pub fn to_sheet_row<S: AsRef<str>>(&self, header: &[S], existing: &[String]) -> Vec<String> {
        let fields = ColumnMap::resolve(header).writable_fields(header);
        let width = fields.iter().map(|&(_, index)| index + 1).max().unwrap_or(0);

        let mut row: Vec<String> = existing.iter().take(width).cloned().collect();
        row.resize(width, String::new());
        for &(field, index) in fields.iter().rev() {
            self.field(field).clone_into(&mut row[index]);
        }
        row
    }
}

/// Placeholder id for the `ordinal`-th data row (1-based): `S001`, `S002`, ...
pub fn placeholder_id(ordinal: usize) -> String {
    format!("S{ordinal:03}")
}

/// Maps every data row of `grid` to a [`StudentRecord`].
///
/// Field positions come from the header row. Rows with missing cells still
/// produce a record, filled with placeholders.
pub fn grid_to_students(grid: &SheetGrid) -> Vec<StudentRecord> {
    let columns = ColumnMap::resolve(grid.header());
    tracing::debug!(?columns, "resolved student columns");

    grid.data_rows()
        .iter()
        .enumerate()
        .map(|(index, row)| row_to_student(row, &columns, index + 1))
        .collect()
}

fn row_to_student(row: &[String], columns: &ColumnMap, ordinal: usize) -> StudentRecord {
    let cell = |index: usize| row.get(index).map(|c| c.trim()).filter(|c| !c.is_empty());

    StudentRecord {
        id: cell(columns.id).map_or_else(|| placeholder_id(ordinal), str::to_string),
        name: cell(columns.name).map_or_else(|| format!("Student {ordinal}"), str::to_string),
        class: cell(columns.class).unwrap_or(NOT_AVAILABLE).to_string(),
        school: cell(columns.school).unwrap_or(NOT_AVAILABLE).to_string(),
        mobile_number: cell(columns.mobile).map(str::to_string),
    }
}

/// Returns one more than the highest numeric id in the first column.
///
/// An id counts by its leading digits, so `"12a"` reads as 12 while `"S001"`
/// is ignored. Signs are not read, so `"-3"` and `"+3"` are ignored too, as
/// are ids that do not fit a `u64` or are too large to increment. With no
/// usable id at all the result is `"1"`.
pub fn next_student_id(grid: &SheetGrid) -> String {
    grid.data_rows()
        .iter()
        .filter_map(|row| row.first())
        .map(String::as_str)
        .filter_map(leading_number)
        .filter_map(|id| id.checked_add(1))
        .max()
        .unwrap_or(1)
        .to_string()
}

fn leading_number(cell: &str) -> Option<u64> {
    let trimmed = cell.trim_start();
    let end = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    trimmed[..end].parse().ok()
}

/// Strips everything but ASCII digits from a phone number.
pub fn format_phone_number(phone: &str) -> String {
    phone.chars().filter(char::is_ascii_digit).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids_grid(ids: &[&str]) -> SheetGrid {
        let mut rows = vec![vec!["ID".to_string(), "Name".to_string()]];
        rows.extend(ids.iter().map(|id| vec![(*id).to_string(), "x".to_string()]));
        SheetGrid::new(rows)
    }

    #[test]
    fn test_grid_to_students_uses_header_positions() {
        let grid = SheetGrid::from_rows([
            vec!["School", "Student Name", "ID", "Class", "Mobile"],
            vec!["North", "Asha", "7", "6th Class", "98765"],
        ]);

        let students = grid_to_students(&grid);
        assert_eq!(
            students,
            [StudentRecord {
                id: "7".to_string(),
                name: "Asha".to_string(),
                class: "6th Class".to_string(),
                school: "North".to_string(),
                mobile_number: Some("98765".to_string()),
            }]
        );
    }

    #[test]
    fn test_grid_to_students_fills_placeholders_and_keeps_every_row() {
        let grid = SheetGrid::from_rows([
            vec!["ID", "Name", "Class", "School"],
            vec!["", "", "", ""],
            vec!["5", "Ravi"],
            vec![],
        ]);

        let students = grid_to_students(&grid);
        assert_eq!(students.len(), 3);
        assert_eq!(students[0].id, "S001");
        assert_eq!(students[0].name, "Student 1");
        assert_eq!(students[0].class, NOT_AVAILABLE);
        assert_eq!(students[0].school, NOT_AVAILABLE);
        assert_eq!(students[1].id, "5");
        assert_eq!(students[1].class, NOT_AVAILABLE);
        assert_eq!(students[2].id, "S003");
        assert!(students[2].mobile_number.is_none());
    }

    #[test]
    fn test_grid_to_students_header_only_is_empty() {
        let grid = SheetGrid::from_rows([vec!["ID", "Name"]]);
        assert!(grid_to_students(&grid).is_empty());
    }

    #[test]
    fn test_to_row_follows_default_layout() {
        let record = StudentRecord {
            id: "9".to_string(),
            name: "Mira".to_string(),
            class: "8th Class".to_string(),
            school: "South".to_string(),
            mobile_number: Some("12345".to_string()),
        };
        assert_eq!(
            record.to_row(&ColumnMap::default()),
            ["9", "Mira", "8th Class", "South", "12345"]
        );
    }

    #[test]
    fn test_to_row_follows_resolved_layout() {
        let layout = ColumnMap::resolve(&["ID", "Name", "School", "Class", "Mobile Number"]);
        let record = StudentRecord {
            id: "9".to_string(),
            name: "Mira".to_string(),
            class: "8th Class".to_string(),
            school: "South".to_string(),
            mobile_number: None,
        };
        assert_eq!(record.to_row(&layout), ["9", "Mira", "South", "8th Class", ""]);
    }

    #[test]
    fn test_row_round_trips_through_grid() {
        let layout = ColumnMap::default();
        let record = StudentRecord {
            id: "4".to_string(),
            name: "Hema".to_string(),
            class: "7th Class".to_string(),
            school: "East".to_string(),
            mobile_number: Some("555".to_string()),
        };
        let grid = SheetGrid::new(vec![
            ["ID", "Name", "Class", "School", "Mobile"]
                .map(String::from)
                .to_vec(),
            record.to_row(&layout),
        ]);
        assert_eq!(grid_to_students(&grid), [record]);
    }

    #[test]
    fn test_next_student_id_is_max_plus_one() {
        assert_eq!(next_student_id(&ids_grid(&["1", "2", "5"])), "6");
        assert_eq!(next_student_id(&ids_grid(&["5", "2", "1"])), "6");
    }

    #[test]
    fn test_next_student_id_ignores_non_numeric_ids() {
        assert_eq!(next_student_id(&ids_grid(&["S001", "3", "abc", " 4 "])), "5");
    }

    #[test]
    fn test_next_student_id_without_numeric_ids_is_non_empty() {
        let id = next_student_id(&ids_grid(&["S001", "none"]));
        assert!(!id.is_empty());
        assert_eq!(id, "1");
        assert_eq!(next_student_id(&SheetGrid::default()), "1");
    }

    #[test]
    fn test_next_student_id_reads_leading_digits() {
        assert_eq!(next_student_id(&ids_grid(&["12a", "3"])), "13");
        assert_eq!(next_student_id(&ids_grid(&["7 (left)"])), "8");
        assert_eq!(next_student_id(&ids_grid(&["-30", "+20", "4"])), "5");
    }

    #[test]
    fn test_next_student_id_skips_ids_that_cannot_be_incremented() {
        let max = u64::MAX.to_string();
        assert_eq!(next_student_id(&ids_grid(&[max.as_str()])), "1");
        assert_eq!(next_student_id(&ids_grid(&[max.as_str(), "41"])), "42");
        assert_eq!(next_student_id(&ids_grid(&["99999999999999999999999"])), "1");
    }

    #[test]
    fn test_from_cells_keeps_empty_cells_empty() {
        let header = ["ID", "Name", "Class", "School", "Mobile"];
        let cells = vec!["1".to_string(), "Asha".to_string()];
        let record = StudentRecord::from_cells(&header, &cells);
        assert_eq!(record.id, "1");
        assert_eq!(record.name, "Asha");
        assert_eq!(record.class, "");
        assert_eq!(record.school, "");
        assert!(record.mobile_number.is_none());
        assert_eq!(record.to_sheet_row(&header, &cells), ["1", "Asha", "", "", ""]);
    }

    #[test]
    fn test_from_cells_ignores_attendance_columns() {
        let header = ["ID", "Name", "Class", "School", "2024-05-06"];
        let cells: Vec<String> = ["1", "Asha", "6th", "North", "Present"]
            .map(String::from)
            .to_vec();
        assert!(StudentRecord::from_cells(&header, &cells).mobile_number.is_none());
    }

    #[test]
    fn test_to_sheet_row_never_touches_date_columns() {
        let header = ["ID", "Name", "Class", "School", "2024-05-06"];
        let record = StudentRecord {
            id: "1".to_string(),
            name: "Asha B".to_string(),
            class: "6th".to_string(),
            school: "North".to_string(),
            mobile_number: Some("98765".to_string()),
        };
        let existing: Vec<String> = ["1", "Asha", "6th", "North", "Present"]
            .map(String::from)
            .to_vec();
        assert_eq!(
            record.to_sheet_row(&header, &existing),
            ["1", "Asha B", "6th", "North"]
        );
    }

    #[test]
    fn test_to_sheet_row_keeps_cells_between_fields() {
        let header = ["ID", "2024-05-06", "Name", "Class", "School"];
        let record = StudentRecord {
            id: "1".to_string(),
            name: "Asha".to_string(),
            class: "6th".to_string(),
            school: "North".to_string(),
            mobile_number: None,
        };
        let existing: Vec<String> = ["1", "Absent", "A", "5th", "North"]
            .map(String::from)
            .to_vec();
        assert_eq!(
            record.to_sheet_row(&header, &existing),
            ["1", "Absent", "Asha", "6th", "North"]
        );
    }

    #[test]
    fn test_to_sheet_row_without_header_uses_default_layout() {
        let header: [&str; 0] = [];
        let record = StudentRecord {
            id: "9".to_string(),
            name: "Mira".to_string(),
            class: "8th".to_string(),
            school: "South".to_string(),
            mobile_number: Some("12345".to_string()),
        };
        assert_eq!(
            record.to_sheet_row(&header, &[]),
            ["9", "Mira", "8th", "South", "12345"]
        );
    }

    #[test]
    fn test_format_phone_number_keeps_digits() {
        assert_eq!(format_phone_number("+91 (987) 654-3210"), "919876543210");
        assert_eq!(format_phone_number(""), "");
    }

    #[test]
    fn test_student_record_serializes_camel_case() {
        let record = StudentRecord {
            id: "1".to_string(),
            name: "A".to_string(),
            class: "B".to_string(),
            school: "C".to_string(),
            mobile_number: Some("1".to_string()),
        };
        let value = serde_json::to_value(record).unwrap();
        assert_eq!(value["mobileNumber"], "1");
    }
}
