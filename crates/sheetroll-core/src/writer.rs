//! Writes back to the sheet.
//!
//! Every write runs the same small state machine. A signed-in session makes a
//! real attempt. A signed-out session, or an attempt the API rejects, yields
//! [`WriteOutcome::Simulated`] describing what would have been written, so a
//! caller can always show the intended change without ever reporting it as
//! saved. Errors are reserved for writes that cannot even be described: an
//! unknown student, a sheet without headers, or an unreadable sheet when the
//! sample fallback is off.
//!
//! Row-addressed writes re-read the sheet first and never cache it. Nothing is
//! locked, so two writers can race; duplicate ids resolve to the first match.

use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::{
    analytics::SessionSummary,
    client::{WriteAuth, a1_range},
    columns::{ColumnMap, column_letter},
    error::{SheetsError, WriteError},
    grid::{GridSource, SheetGrid},
    records::StudentRecord,
    service::SheetService,
};

/// Range read to find the header row.
const HEADER_RANGE: &str = "1:1";

/// Why a write was simulated instead of applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "snake_case")]
pub enum SimulationReason {
    /// No access token; signing in would make the write real.
    SignedOut,
    /// A real attempt was made and rejected, or could not be made safely.
    Rejected(String),
}

impl std::fmt::Display for SimulationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SimulationReason::SignedOut => f.write_str("not signed in"),
            SimulationReason::Rejected(message) => f.write_str(message),
        }
    }
}

/// Result of a write that did not fail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WriteOutcome<T> {
    Applied(T),
    Simulated { detail: T, reason: SimulationReason },
}

impl<T> WriteOutcome<T> {
    pub fn is_simulated(&self) -> bool {
        matches!(self, WriteOutcome::Simulated { .. })
    }

    pub fn detail(&self) -> &T {
        match self {
            WriteOutcome::Applied(detail) | WriteOutcome::Simulated { detail, .. } => detail,
        }
    }

    pub fn into_detail(self) -> T {
        match self {
            WriteOutcome::Applied(detail) | WriteOutcome::Simulated { detail, .. } => detail,
        }
    }

    pub fn reason(&self) -> Option<&SimulationReason> {
        match self {
            WriteOutcome::Applied(_) => None,
            WriteOutcome::Simulated { reason, .. } => Some(reason),
        }
    }

    fn simulated(detail: T, reason: SimulationReason) -> Self {
        warn!(%reason, "write simulated");
        WriteOutcome::Simulated { detail, reason }
    }

    /// Applied on success; simulated with the classified error otherwise.
    fn settle<R>(detail: T, result: Result<R, SheetsError>) -> Self {
        match result {
            Ok(_) => WriteOutcome::Applied(detail),
            Err(err) => {
                Self::simulated(detail, SimulationReason::Rejected(WriteError::from(err).to_string()))
            }
        }
    }
}

/// Column chosen for a date header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnWrite {
    pub column_index: usize,
    pub column_letter: String,
    /// The header already existed, so nothing was written.
    pub is_existing: bool,
}

/// One attendance cell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CellWrite {
    /// 1-based sheet row.
    pub row_number: usize,
    pub column_letter: String,
    pub range: String,
}

/// A whole student row, rewritten or removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowWrite {
    /// 1-based sheet row.
    pub row_number: usize,
    pub range: String,
}

/// A row appended after the existing table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AppendWrite {
    pub range: String,
    /// Where the row landed, as reported by the API.
    pub updated_range: Option<String>,
}

/// Location of a student in a freshly read grid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StudentRow {
    /// 1-based sheet row.
    pub row_number: usize,
    /// Zero-based column holding ids.
    pub id_column: usize,
    pub header: Vec<String>,
    pub grid: SheetGrid,
    pub source: GridSource,
}

impl StudentRow {
    pub fn cells(&self) -> &[String] {
        self.grid
            .rows()
            .get(self.row_number - 1)
            .map_or(&[], Vec::as_slice)
    }

    /// The row as stored, empty cells left empty.
    pub fn to_record(&self) -> StudentRecord {
        StudentRecord::from_cells(&self.header, self.cells())
    }
}

/// One student's mark in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttendanceMark {
    pub student_id: String,
    pub status: String,
}

impl AttendanceMark {
    pub fn new(student_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            student_id: student_id.into(),
            status: status.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    /// The date column could not be written; no cells were touched.
    Simulated,
    /// Some cells were simulated or failed.
    Partial,
    Complete,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MarkResult {
    pub student_id: String,
    pub outcome: Result<WriteOutcome<CellWrite>, String>,
}

/// Outcome of recording a whole day's attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub status: BatchStatus,
    pub column: WriteOutcome<ColumnWrite>,
    /// Per-student results, empty when the column write was simulated.
    pub marks: Vec<MarkResult>,
    pub summary: SessionSummary,
}

impl SheetService {
    /// Finds or creates the header column for `date`.
    ///
    /// An existing header equal to `date` is reused without writing.
    /// Otherwise the header goes in the first column after the current
    /// header row.
    ///
    /// # Errors
    ///
    /// `Headers` when the sheet has no header row; `Remote` when it cannot be
    /// read and the sample fallback is off.
    #[instrument(skip(self))]
    pub async fn add_date_column(
        &self,
        sheet: &str,
        date: &str,
    ) -> Result<WriteOutcome<ColumnWrite>, WriteError> {
        let (grid, source) = self
            .client
            .fetch_range_with_source(sheet, HEADER_RANGE)
            .await?;
        let header = grid
            .rows()
            .first()
            .filter(|row| !row.is_empty())
            .ok_or(WriteError::Headers)?;

        let existing = header.iter().position(|h| h == date);
        let column_index = existing.unwrap_or(header.len());
        let detail = ColumnWrite {
            column_index,
            column_letter: column_letter(column_index),
            is_existing: existing.is_some(),
        };

        let token = match self.write_token(source) {
            Ok(token) => token,
            Err(reason) => return Ok(WriteOutcome::simulated(detail, reason)),
        };
        if detail.is_existing {
            info!(column = %detail.column_letter, "date column already present");
            return Ok(WriteOutcome::Applied(detail));
        }

        let range = format!("{sheet}!{}1", detail.column_letter);
        let result = self
            .client
            .update_values(token, &range, &[vec![date.to_string()]])
            .await;
        Ok(WriteOutcome::settle(detail, result))
    }

    /// Writes `status` into `column_letter` of the first row whose id is
    /// `student_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` when no row has that id.
    #[instrument(skip(self))]
    pub async fn update_attendance_by_student_id(
        &self,
        sheet: &str,
        student_id: &str,
        column_letter: &str,
        status: &str,
    ) -> Result<WriteOutcome<CellWrite>, WriteError> {
        let row = self.find_student_row(sheet, student_id).await?;
        let range = format!("{sheet}!{column_letter}{}", row.row_number);
        let detail = CellWrite {
            row_number: row.row_number,
            column_letter: column_letter.to_string(),
            range,
        };

        let token = match self.write_token(row.source) {
            Ok(token) => token,
            Err(reason) => return Ok(WriteOutcome::simulated(detail, reason)),
        };
        let result = self
            .client
            .update_values(token, &detail.range, &[vec![status.to_string()]])
            .await;
        Ok(WriteOutcome::settle(detail, result))
    }

    /// Rewrites the row of `student_id` with `record`, laid out by the
    /// sheet's own header.
    ///
    /// # Errors
    ///
    /// `NotFound` when no row has that id.
    #[instrument(skip(self, record))]
    pub async fn update_student_by_id(
        &self,
        sheet: &str,
        student_id: &str,
        record: &StudentRecord,
    ) -> Result<WriteOutcome<RowWrite>, WriteError> {
        let row = self.find_student_row(sheet, student_id).await?;
        let values = record.to_sheet_row(&row.header, row.cells());
        let last = column_letter(values.len().saturating_sub(1));
        let detail = RowWrite {
            row_number: row.row_number,
            range: format!("{sheet}!A{n}:{last}{n}", n = row.row_number),
        };

        let token = match self.write_token(row.source) {
            Ok(token) => token,
            Err(reason) => return Ok(WriteOutcome::simulated(detail, reason)),
        };
        let result = self.client.update_values(token, &detail.range, &[values]).await;
        Ok(WriteOutcome::settle(detail, result))
    }

    /// Removes the row of `student_id`; rows below it shift up.
    ///
    /// # Errors
    ///
    /// `NotFound` when no row has that id.
    #[instrument(skip(self))]
    pub async fn delete_student_by_id(
        &self,
        sheet: &str,
        student_id: &str,
    ) -> Result<WriteOutcome<RowWrite>, WriteError> {
        let row = self.find_student_row(sheet, student_id).await?;
        let detail = RowWrite {
            row_number: row.row_number,
            range: format!("{sheet}!{n}:{n}", n = row.row_number),
        };

        let token = match self.write_token(row.source) {
            Ok(token) => token,
            Err(reason) => return Ok(WriteOutcome::simulated(detail, reason)),
        };

        let sheet_id = match self.client.sheet_properties(sheet).await {
            Ok(properties) => properties.sheet_id,
            Err(err) => {
                warn!(error = %err, "could not resolve sheet id, assuming the first sheet");
                0
            }
        };

        let result = self
            .client
            .delete_rows(token, sheet_id, row.row_number - 1, row.row_number)
            .await;
        Ok(WriteOutcome::settle(detail, result))
    }

    /// Appends `values` as a new row after the sheet's table.
    ///
    /// A signed-in session tries its token first; the API key is tried next.
    /// Only when both fail is the append simulated.
    ///
    /// # Errors
    ///
    /// Never fails today; the `Result` keeps the write operations uniform.
    #[instrument(skip(self, values))]
    pub async fn append_row(
        &self,
        sheet: &str,
        values: Vec<String>,
    ) -> Result<WriteOutcome<AppendWrite>, WriteError> {
        let range = a1_range(sheet, "A1");
        let rows = [values];
        let mut first_rejection = None;

        if let Some(token) = self.session.access_token() {
            match self
                .client
                .append_values(WriteAuth::Bearer(token), &range, &rows)
                .await
            {
                Ok(updates) => {
                    return Ok(WriteOutcome::Applied(AppendWrite {
                        range,
                        updated_range: Some(updates.updated_range),
                    }));
                }
                Err(err) => {
                    warn!(error = %err, "authenticated append failed, trying the API key");
                    first_rejection = Some(WriteError::from(err).to_string());
                }
            }
        }

        match self
            .client
            .append_values(WriteAuth::ApiKey, &range, &rows)
            .await
        {
            Ok(updates) => Ok(WriteOutcome::Applied(AppendWrite {
                range,
                updated_range: Some(updates.updated_range),
            })),
            Err(err) => {
                let reason = match first_rejection {
                    Some(message) => SimulationReason::Rejected(message),
                    None if !self.session.is_signed_in() => SimulationReason::SignedOut,
                    None => SimulationReason::Rejected(WriteError::from(err).to_string()),
                };
                let detail = AppendWrite {
                    range,
                    updated_range: None,
                };
                Ok(WriteOutcome::simulated(detail, reason))
            }
        }
    }

    /// Appends `record` laid out by the sheet's header, or by the default
    /// layout when the header cannot be read.
    ///
    /// # Errors
    ///
    /// See [`append_row`](Self::append_row).
    #[instrument(skip(self, record))]
    pub async fn append_student(
        &self,
        sheet: &str,
        record: &StudentRecord,
    ) -> Result<WriteOutcome<AppendWrite>, WriteError> {
        let header = match self.client.fetch_range(sheet, HEADER_RANGE).await {
            Ok(grid) => grid.header().to_vec(),
            Err(err) => {
                warn!(error = %err, "could not read headers, using the default layout");
                Vec::new()
            }
        };

        self.append_row(sheet, record.to_sheet_row(&header, &[])).await
    }

    /// Locates the first data row whose id cell, trimmed, equals `student_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` when no row has that id; `Remote` when the sheet cannot be
    /// read and the sample fallback is off.
    #[instrument(skip(self))]
    pub async fn find_student_row(
        &self,
        sheet: &str,
        student_id: &str,
    ) -> Result<StudentRow, WriteError> {
        let (grid, source) = self
            .client
            .fetch_range_with_source(sheet, &self.data_range)
            .await?;
        let header = grid.header().to_vec();
        let id_column = ColumnMap::resolve(&header).id;
        let wanted = student_id.trim();

        let index = grid
            .rows()
            .iter()
            .enumerate()
            .skip(1)
            .find(|(_, row)| row.get(id_column).is_some_and(|id| id.trim() == wanted))
            .map(|(index, _)| index)
            .ok_or_else(|| WriteError::student_not_found(student_id))?;

        Ok(StudentRow {
            row_number: index + 1,
            id_column,
            header,
            grid,
            source,
        })
    }

    /// Records a day's attendance: the date column first, then every mark in
    /// order.
    ///
    /// When the column write is simulated no cell is touched. A mark that
    /// fails does not stop the ones after it.
    ///
    /// # Errors
    ///
    /// Only errors from the date column write are returned.
    #[instrument(skip(self, marks), fields(marks = marks.len()))]
    pub async fn record_attendance(
        &self,
        sheet: &str,
        date: &str,
        marks: &[AttendanceMark],
    ) -> Result<BatchReport, WriteError> {
        let column = self.add_date_column(sheet, date).await?;
        let summary = SessionSummary::from_marks(marks.iter().map(|m| m.status.as_str()));

        if column.is_simulated() {
            return Ok(BatchReport {
                status: BatchStatus::Simulated,
                column,
                marks: Vec::new(),
                summary,
            });
        }

        let letter = column.detail().column_letter.clone();
        let mut results = Vec::with_capacity(marks.len());
        for mark in marks {
            let outcome = self
                .update_attendance_by_student_id(sheet, &mark.student_id, &letter, &mark.status)
                .await
                .map_err(|err| err.to_string());
            results.push(MarkResult {
                student_id: mark.student_id.clone(),
                outcome,
            });
        }

        let complete = results
            .iter()
            .all(|r| r.outcome.as_ref().is_ok_and(|o| !o.is_simulated()));
        let status = if complete {
            BatchStatus::Complete
        } else {
            BatchStatus::Partial
        };
        info!(?status, "attendance recorded");

        Ok(BatchReport {
            status,
            column,
            marks: results,
            summary,
        })
    }

    /// Token for a real write, or the reason the write must be simulated.
    ///
    /// A grid substituted from sample data never backs a real write.
    fn write_token(&self, source: GridSource) -> Result<&str, SimulationReason> {
        let token = self
            .session
            .access_token()
            .ok_or(SimulationReason::SignedOut)?;
        if source == GridSource::Sample {
            return Err(SimulationReason::Rejected(
                "the sheet could not be read, so the change was not sent".to_string(),
            ));
        }
        Ok(token)
    }
}
