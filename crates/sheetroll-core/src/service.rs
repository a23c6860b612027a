//! The caller-facing context object.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{instrument, warn};

use crate::{
    analytics::{AttendanceReport, FilterOptions, Filters},
    client::SheetsClient,
    config::{Config, CredentialsConfig},
    error::SheetsError,
    grid::{GridSource, SheetGrid},
    records::{StudentRecord, grid_to_students, next_student_id},
    sample::sample_grid,
    session::AuthSession,
};

/// Range read by [`SheetService::next_student_id`].
const ID_RANGE: &str = "A1:A1000";

/// Default range for row lookups when no config supplies one.
const DEFAULT_DATA_RANGE: &str = "A1:Z1000";

/// Owns the sheet client and the sign-in state.
///
/// Reads are here; writes live in [`crate::writer`]. The service is built
/// and dropped by the caller, nothing is global.
#[derive(Debug)]
pub struct SheetService {
    pub(crate) client: SheetsClient,
    pub(crate) session: AuthSession,
    pub(crate) data_range: String,
}

impl SheetService {
    pub fn new(client: SheetsClient, session: AuthSession) -> Self {
        Self {
            client,
            session,
            data_range: DEFAULT_DATA_RANGE.to_string(),
        }
    }

    /// Builds a client from `config` and a session from `credentials`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` when the configured endpoint is unusable.
    pub fn from_config(
        config: &Config,
        credentials: &CredentialsConfig,
    ) -> Result<Self, SheetsError> {
        let client = SheetsClient::new(config, credentials.api_key.clone())?;
        Ok(Self::new(client, AuthSession::from_credentials(credentials))
            .with_data_range(config.data_range.clone()))
    }

    /// Range re-read by row-addressed writes.
    #[must_use]
    pub fn with_data_range(mut self, range: impl Into<String>) -> Self {
        self.data_range = range.into();
        self
    }

    pub fn client(&self) -> &SheetsClient {
        &self.client
    }

    pub fn session(&self) -> &AuthSession {
        &self.session
    }

    /// Replaces the session, e.g. after signing in or out.
    pub fn set_session(&mut self, session: AuthSession) {
        self.session = session;
    }

    /// # Errors
    ///
    /// See [`SheetsClient::fetch_range`].
    pub async fn fetch_range(&self, sheet: &str, range: &str) -> Result<SheetGrid, SheetsError> {
        self.client.fetch_range(sheet, range).await
    }

    /// # Errors
    ///
    /// See [`SheetsClient::fetch_range_with_source`].
    pub async fn fetch_range_with_source(
        &self,
        sheet: &str,
        range: &str,
    ) -> Result<(SheetGrid, GridSource), SheetsError> {
        self.client.fetch_range_with_source(sheet, range).await
    }

    /// Reads the roster as student records.
    ///
    /// An empty sheet is an error unless the sample fallback is enabled, in
    /// which case the sample roster is returned instead.
    ///
    /// # Errors
    ///
    /// `NoStudentData` for an empty sheet without fallback, `NoSampleData`
    /// when the fallback has no rows for `sheet`, or the read error.
    #[instrument(skip(self))]
    pub async fn get_student_data(
        &self,
        sheet: &str,
        range: &str,
    ) -> Result<Vec<StudentRecord>, SheetsError> {
        let grid = self.client.fetch_range(sheet, range).await?;
        if !grid.is_empty() {
            return Ok(grid_to_students(&grid));
        }

        if !self.client.uses_sample_fallback() {
            return Err(SheetsError::NoStudentData);
        }

        warn!(sheet, "sheet is empty, using sample students");
        let students = grid_to_students(&sample_grid(sheet));
        if students.is_empty() {
            return Err(SheetsError::NoSampleData(sheet.to_string()));
        }
        Ok(students)
    }

    /// Next sequential id for `sheet`.
    ///
    /// When the id column cannot be read the current Unix time in seconds is
    /// used instead. Ids are not reserved: two callers can get the same one.
    #[instrument(skip(self))]
    pub async fn next_student_id(&self, sheet: &str) -> String {
        match self.client.fetch_range(sheet, ID_RANGE).await {
            Ok(grid) => next_student_id(&grid),
            Err(err) => {
                warn!(error = %err, "could not read ids, using a timestamp");
                SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| d.as_secs())
                    .unwrap_or_default()
                    .to_string()
            }
        }
    }

    /// # Errors
    ///
    /// Returns the read error when the sample fallback is disabled.
    #[instrument(skip(self))]
    pub async fn attendance_report(
        &self,
        sheet: &str,
        range: &str,
        filters: &Filters,
    ) -> Result<AttendanceReport, SheetsError> {
        let grid = self.client.fetch_range(sheet, range).await?;
        Ok(AttendanceReport::compute(&grid, filters))
    }

    /// # Errors
    ///
    /// Returns the read error when the sample fallback is disabled.
    #[instrument(skip(self))]
    pub async fn filter_options(
        &self,
        sheet: &str,
        range: &str,
    ) -> Result<FilterOptions, SheetsError> {
        let grid = self.client.fetch_range(sheet, range).await?;
        Ok(FilterOptions::from_grid(&grid))
    }

    /// See [`SheetsClient::check_access`].
    pub async fn check_access(&self) -> bool {
        self.client.check_access().await
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    use super::*;
    use crate::{analytics::Selection, config::RetryConfig};

    fn service(server: &MockServer, fallback: bool) -> SheetService {
        let config = Config {
            spreadsheet_id: "sheet-1".to_string(),
            endpoint: server.uri(),
            use_sample_data_on_error: fallback,
            retry: RetryConfig {
                max_retries: 3,
                initial_delay_ms: 1,
                metadata_retries: 2,
            },
            ..Config::default()
        };
        let credentials = CredentialsConfig {
            api_key: "test-key".to_string(),
            ..CredentialsConfig::default()
        };
        SheetService::from_config(&config, &credentials).unwrap()
    }

    #[tokio::test]
    async fn test_get_student_data_transforms_rows() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spreadsheets/sheet-1/values/Students!A1:Z1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [["Name", "ID"], ["Asha", 3]]
            })))
            .mount(&server)
            .await;

        let students = service(&server, false)
            .get_student_data("Students", "A1:Z1000")
            .await
            .unwrap();
        assert_eq!(students.len(), 1);
        assert_eq!(students[0].id, "3");
        assert_eq!(students[0].name, "Asha");
    }

    #[tokio::test]
    async fn test_get_student_data_empty_sheet_without_fallback_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let err = service(&server, false)
            .get_student_data("Students", "A1:Z1000")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "No student data found in the sheet");
    }

    #[tokio::test]
    async fn test_get_student_data_empty_sheet_with_fallback_uses_sample() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let service = service(&server, true);
        let students = service
            .get_student_data("Students", "A1:Z1000")
            .await
            .unwrap();
        assert_eq!(students.len(), 16);

        let err = service
            .get_student_data("Teachers", "A1:Z1000")
            .await
            .unwrap_err();
        assert!(matches!(err, SheetsError::NoSampleData(_)));
    }

    #[tokio::test]
    async fn test_next_student_id_reads_id_column() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/spreadsheets/sheet-1/values/Students!A1:A1000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [["ID"], ["1"], ["2"], ["5"]]
            })))
            .mount(&server)
            .await;

        assert_eq!(service(&server, false).next_student_id("Students").await, "6");
    }

    #[tokio::test]
    async fn test_next_student_id_falls_back_to_timestamp() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let id = service(&server, false).next_student_id("Students").await;
        assert!(!id.is_empty());
        assert!(id.parse::<u64>().unwrap() > 1_600_000_000);
    }

    #[tokio::test]
    async fn test_attendance_report_over_fetched_grid() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "values": [
                    ["ID", "Name", "School", "2024-01-01", "2024-01-02"],
                    ["1", "Asha", "North", "Present", "Absent"],
                    ["2", "Ravi", "South", "Present", "Present"]
                ]
            })))
            .mount(&server)
            .await;

        let service = service(&server, false);
        let filters = Filters {
            school: Selection::from("North"),
            ..Filters::default()
        };
        let report = service
            .attendance_report("Students", "A1:Z1000", &filters)
            .await
            .unwrap();
        assert_eq!(report.overall.total, 2);
        assert_eq!(report.by_school.len(), 2);

        let options = service
            .filter_options("Students", "A1:Z1000")
            .await
            .unwrap();
        assert_eq!(options.schools, ["North", "South"]);
        assert_eq!(options.dates, ["2024-01-01", "2024-01-02"]);
    }

    #[test]
    fn test_service_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SheetService>();
    }

    #[tokio::test]
    async fn test_set_session_switches_sign_in_state() {
        let server = MockServer::start().await;
        let mut service = service(&server, false);
        assert!(!service.session().is_signed_in());
        service.set_session(AuthSession::signed_in("tok"));
        assert!(service.session().is_signed_in());
    }
}
