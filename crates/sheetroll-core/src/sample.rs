//! Built-in grids substituted for failed reads.

use crate::grid::SheetGrid;

/// Cell shown when no sample exists for a sheet.
pub const NO_DATA_PLACEHOLDER: &str = "No Data Available";

const SAMPLE_SCHOOL: &str = "BV & B N high school Jandrapet";

const SAMPLE_STUDENTS: &[(&str, &str, &str)] = &[
    ("1", "Harshavardhan", "6th Class"),
    ("2", "Lakshmi priya p", "9th Class"),
    ("3", "Madhu sree", "8th Class"),
    ("4", "Muthukuri.thirupathamma", "10th Class"),
    ("5", "Pallavi p", "11th Class"),
    ("6", "Varshini D.", "12th Class"),
    ("7", "Nitya Sri", "6th Class"),
    ("8", "KOLLURU Sir Vidya", "7th Class"),
    ("9", "Perikala Bhavishya", "8th Class"),
    ("10", "Shanmukha priya", "9th Class"),
    ("11", "M.Manasvi", "10th Class"),
    ("12", "MANCHIKANTI NIHARIKA", "11th Class"),
    ("13", "MANCHIKANTI VEERA VENKAT SIVA SAI VARUN", "12th Class"),
    ("14", "KOLLURU shanvitha sir ram", "6th Class"),
    ("15", "Hema sai", "7th Class"),
    ("16", "Mokshitha", "8th Class"),
];

/// Returns the sample grid for `sheet_name`.
///
/// Only the students sheet (matched case-insensitively) has sample rows; any
/// other sheet gets a single placeholder cell.
pub fn sample_grid(sheet_name: &str) -> SheetGrid {
    if !sheet_name.eq_ignore_ascii_case("students") {
        return SheetGrid::from_rows([[NO_DATA_PLACEHOLDER]]);
    }

    let header = ["ID", "Name", "Class", "School"].map(String::from).to_vec();
    let rows = SAMPLE_STUDENTS.iter().map(|(id, name, class)| {
        vec![
            (*id).to_string(),
            (*name).to_string(),
            (*class).to_string(),
            SAMPLE_SCHOOL.to_string(),
        ]
    });

    SheetGrid::new(std::iter::once(header).chain(rows).collect())
}
