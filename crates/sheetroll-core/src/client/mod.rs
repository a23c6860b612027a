//! HTTP access to the Google Sheets v4 API.
//!
//! Reads authenticate with the API key and retry on rate limiting; when a
//! read still fails the client can substitute built-in sample data instead of
//! failing (see [`Config::use_sample_data_on_error`]). Writes take their
//! credentials per call and are never retried.

use std::sync::atomic::{AtomicBool, Ordering};

use backon::{ExponentialBuilder, Retryable};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::{
    config::{Config, RetryConfig},
    error::SheetsError,
    grid::{GridSource, SheetGrid},
    sample::sample_grid,
};

mod types;
pub use types::{GridProperties, SheetProperties, UpdateValuesResponse};
use types::{
    BatchUpdateRequest, BatchUpdateResponse, DeleteDimension, DimensionRange, Request,
    SheetsAppendInput, SheetsAppendResponse, SheetsValueRange, SheetsValueRangeInput,
    SpreadsheetSheets, SpreadsheetTitle,
};

/// How a write request is authorized.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum WriteAuth<'a> {
    /// OAuth access token sent as a bearer header.
    Bearer(&'a str),
    /// The client's API key. Google only accepts this for writes on sheets
    /// that are publicly editable.
    ApiKey,
}

impl std::fmt::Debug for WriteAuth<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteAuth::Bearer(_) => f.write_str("Bearer(<redacted>)"),
            WriteAuth::ApiKey => f.write_str("ApiKey"),
        }
    }
}

/// Builds `{sheet}!{range}`.
pub fn a1_range(sheet: &str, range: &str) -> String {
    format!("{sheet}!{range}")
}

// ============================================================================
// HTTP Client Implementation
// ============================================================================

/// Client bound to one spreadsheet.
///
/// The only interior state is the access flag set by [`check_access`], so a
/// client can be shared freely between tasks.
///
/// [`check_access`]: SheetsClient::check_access
#[derive(Debug)]
pub struct SheetsClient {
    http: reqwest::Client,
    base_url: String,
    spreadsheet_id: String,
    api_key: String,
    retry: RetryConfig,
    use_sample_data_on_error: bool,
    accessible: AtomicBool,
}

impl SheetsClient {
    /// Creates a client for the spreadsheet named by `config`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidUrl` if the endpoint is empty or not an absolute URL.
    pub fn new(config: &Config, api_key: impl Into<String>) -> Result<Self, SheetsError> {
        let base_url = normalize_base_url(&config.endpoint)?;
        let parsed =
            reqwest::Url::parse(&base_url).map_err(|e| SheetsError::InvalidUrl(e.to_string()))?;
        if parsed.cannot_be_a_base() {
            return Err(SheetsError::InvalidUrl(base_url));
        }

        Ok(Self {
            http: reqwest::Client::new(),
            base_url,
            spreadsheet_id: config.spreadsheet_id.trim().to_string(),
            api_key: api_key.into().trim().to_string(),
            retry: config.retry,
            use_sample_data_on_error: config.use_sample_data_on_error,
            accessible: AtomicBool::new(false),
        })
    }

    pub fn spreadsheet_id(&self) -> &str {
        &self.spreadsheet_id
    }

    pub fn uses_sample_fallback(&self) -> bool {
        self.use_sample_data_on_error
    }

    /// Result of the last [`check_access`](Self::check_access) call; `false`
    /// before the first one.
    pub fn is_accessible(&self) -> bool {
        self.accessible.load(Ordering::Relaxed)
    }

    /// Reads `{sheet}!{range}` as a grid.
    ///
    /// # Errors
    ///
    /// Only fails when the sample fallback is disabled; see
    /// [`fetch_range_with_source`](Self::fetch_range_with_source).
    pub async fn fetch_range(&self, sheet: &str, range: &str) -> Result<SheetGrid, SheetsError> {
        self.fetch_range_with_source(sheet, range)
            .await
            .map(|(grid, _)| grid)
    }

    /// Reads `{sheet}!{range}` and reports whether the sample fallback fired.
    ///
    /// Rate-limited reads are retried with exponential backoff. A read that
    /// still fails yields the sample grid for `sheet` when the fallback is
    /// enabled.
    ///
    /// # Errors
    ///
    /// Returns the read error when the fallback is disabled.
    #[instrument(skip(self))]
    pub async fn fetch_range_with_source(
        &self,
        sheet: &str,
        range: &str,
    ) -> Result<(SheetGrid, GridSource), SheetsError> {
        let read = || self.read_values(sheet, range);

        let result = read
            .retry(self.backoff(self.retry.max_retries))
            .when(SheetsError::is_rate_limited)
            .notify(|err, delay| warn!(error = %err, ?delay, "rate limited, retrying read"))
            .await;

        match result {
            Ok(grid) => Ok((grid, GridSource::Remote)),
            Err(err) if self.use_sample_data_on_error => {
                warn!(error = %err, sheet, "read failed, using sample data");
                Ok((sample_grid(sheet), GridSource::Sample))
            }
            Err(err) => Err(err),
        }
    }

    /// Probes whether the spreadsheet can be read with the API key.
    ///
    /// Never fails: the outcome is logged and remembered for
    /// [`is_accessible`](Self::is_accessible).
    #[instrument(skip(self))]
    pub async fn check_access(&self) -> bool {
        let accessible = match self.spreadsheet_title().await {
            Ok(title) => {
                info!(title = %title, "spreadsheet is accessible");
                true
            }
            Err(err) => {
                match err.status() {
                    Some(StatusCode::NOT_FOUND) => {
                        warn!("spreadsheet not found, check the spreadsheet id");
                    }
                    Some(StatusCode::FORBIDDEN) => {
                        warn!("permission denied, share the spreadsheet or make it viewable by link");
                    }
                    _ => warn!(error = %err, "spreadsheet access check failed"),
                }
                false
            }
        };

        self.accessible.store(accessible, Ordering::Relaxed);
        accessible
    }

    /// Looks up a sheet's properties by title, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns `SheetNotFound` when no sheet has that title, or the request
    /// error once rate-limit retries are exhausted.
    #[instrument(skip(self))]
    pub async fn sheet_properties(&self, sheet: &str) -> Result<SheetProperties, SheetsError> {
        let lookup = || self.sheet_list();

        let sheets = lookup
            .retry(self.backoff(self.retry.metadata_retries))
            .when(SheetsError::is_rate_limited)
            .notify(|err, delay| warn!(error = %err, ?delay, "rate limited, retrying metadata"))
            .await?;

        sheets
            .sheets
            .into_iter()
            .map(|entry| entry.properties)
            .find(|properties| properties.title.eq_ignore_ascii_case(sheet))
            .ok_or_else(|| SheetsError::SheetNotFound(sheet.to_string()))
    }

    /// Overwrites `range` with `rows`, parsing values as if typed by a user.
    ///
    /// # Errors
    ///
    /// Returns the request error; 401 and 403 are left for the caller to
    /// classify.
    #[instrument(skip(self, token, rows))]
    pub async fn update_values(
        &self,
        token: &str,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<UpdateValuesResponse, SheetsError> {
        let url = self.url_with_segments(&["spreadsheets", &self.spreadsheet_id, "values", range])?;
        let body = SheetsValueRangeInput {
            range,
            major_dimension: "ROWS",
            values: rows,
        };

        let response: UpdateValuesResponse = self
            .send_json(
                self.http.put(url),
                WriteAuth::Bearer(token),
                &[("valueInputOption", "USER_ENTERED")],
                Some(&body),
            )
            .await?;

        info!(updated_range = %response.updated_range, "values updated");
        Ok(response)
    }

    /// Appends `rows` after the table found at `range`, inserting new rows.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[instrument(skip(self, rows))]
    pub async fn append_values(
        &self,
        auth: WriteAuth<'_>,
        range: &str,
        rows: &[Vec<String>],
    ) -> Result<UpdateValuesResponse, SheetsError> {
        let url = self.url_with_segments(&[
            "spreadsheets",
            &self.spreadsheet_id,
            "values",
            &format!("{range}:append"),
        ])?;

        let response: SheetsAppendResponse = self
            .send_json(
                self.http.post(url),
                auth,
                &[
                    ("valueInputOption", "USER_ENTERED"),
                    ("insertDataOption", "INSERT_ROWS"),
                ],
                Some(&SheetsAppendInput { values: rows }),
            )
            .await?;

        info!(
            updated_range = %response.updates.updated_range,
            table_range = ?response.table_range,
            "rows appended"
        );
        Ok(response.updates)
    }

    /// Deletes rows `start..end` (zero-based, end exclusive) of a sheet.
    /// Later rows shift up.
    ///
    /// # Errors
    ///
    /// Returns the request error.
    #[instrument(skip(self, token))]
    pub async fn delete_rows(
        &self,
        token: &str,
        sheet_id: u32,
        start: usize,
        end: usize,
    ) -> Result<(), SheetsError> {
        let url = self.url_with_segments(&[
            "spreadsheets",
            &format!("{}:batchUpdate", self.spreadsheet_id),
        ])?;
        let body = BatchUpdateRequest {
            requests: vec![Request {
                delete_dimension: DeleteDimension {
                    range: DimensionRange {
                        sheet_id,
                        dimension: "ROWS",
                        start_index: start,
                        end_index: end,
                    },
                },
            }],
        };

        let _: BatchUpdateResponse = self
            .send_json(self.http.post(url), WriteAuth::Bearer(token), &[], Some(&body))
            .await?;

        info!(sheet_id, start, end, "rows deleted");
        Ok(())
    }

    async fn read_values(&self, sheet: &str, range: &str) -> Result<SheetGrid, SheetsError> {
        let url = self.url_with_segments(&[
            "spreadsheets",
            &self.spreadsheet_id,
            "values",
            &a1_range(sheet, range),
        ])?;
        debug!(%url, "reading values");

        let response: SheetsValueRange = self
            .send_json::<(), _>(
                self.http.get(url),
                WriteAuth::ApiKey,
                &[("majorDimension", "ROWS")],
                None,
            )
            .await?;

        debug!(range = %response.range, rows = response.values.len(), "values read");
        Ok(SheetGrid::from_values(response.values))
    }

    async fn spreadsheet_title(&self) -> Result<String, SheetsError> {
        let url = self.url_with_segments(&["spreadsheets", &self.spreadsheet_id])?;
        let response: SpreadsheetTitle = self
            .send_json::<(), _>(
                self.http.get(url),
                WriteAuth::ApiKey,
                &[("fields", "properties.title")],
                None,
            )
            .await?;

        Ok(response.properties.map(|p| p.title).unwrap_or_default())
    }

    async fn sheet_list(&self) -> Result<SpreadsheetSheets, SheetsError> {
        let url = self.url_with_segments(&["spreadsheets", &self.spreadsheet_id])?;
        self.send_json::<(), _>(
            self.http.get(url),
            WriteAuth::ApiKey,
            &[("fields", "sheets.properties")],
            None,
        )
        .await
    }

    fn backoff(&self, max_times: usize) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(self.retry.initial_delay())
            .with_factor(2.0)
            .with_max_times(max_times)
    }

    fn url_with_segments(&self, segments: &[&str]) -> Result<reqwest::Url, SheetsError> {
        let mut url =
            reqwest::Url::parse(&self.base_url).map_err(|e| SheetsError::InvalidUrl(e.to_string()))?;
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| SheetsError::InvalidUrl("base_url must be an absolute URL".into()))?;
            for segment in segments {
                path.push(segment);
            }
        }
        Ok(url)
    }

    async fn send_json<TReq: Serialize, TRes: for<'de> Deserialize<'de>>(
        &self,
        request: reqwest::RequestBuilder,
        auth: WriteAuth<'_>,
        query: &[(&str, &str)],
        body: Option<&TReq>,
    ) -> Result<TRes, SheetsError> {
        let mut request = request
            .query(query)
            .header(reqwest::header::ACCEPT, "application/json");

        request = match auth {
            WriteAuth::Bearer(token) => request.bearer_auth(token),
            WriteAuth::ApiKey if self.api_key.is_empty() => request,
            WriteAuth::ApiKey => request.query(&[("key", self.api_key.as_str())]),
        };

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        handle_response(response).await
    }
}

async fn handle_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, SheetsError> {
    let status = response.status();
    if status.is_success() {
        response
            .json::<T>()
            .await
            .map_err(|e| SheetsError::Decode(e.to_string()))
    } else {
        let body = response.text().await.unwrap_or_default();
        Err(SheetsError::Http { status, body })
    }
}

fn normalize_base_url(endpoint: &str) -> Result<String, SheetsError> {
    let trimmed = endpoint.trim();
    if trimmed.is_empty() {
        return Err(SheetsError::InvalidUrl("endpoint must not be empty".into()));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}
