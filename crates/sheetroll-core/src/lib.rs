//! Student roster and attendance records kept in a Google Sheet.
//!
//! The spreadsheet is the only store. Every read fetches a fresh grid, field
//! positions are inferred from its header row, and attendance lives in one
//! column per day headed `YYYY-MM-DD`.
//!
//! # Key Components
//!
//! - **Column heuristics** ([`columns`]): header row to [`ColumnMap`], date
//!   columns, A1 column letters
//! - **Client** ([`client`]): values reads with rate-limit retry and sample
//!   fallback, plus the raw write endpoints
//! - **Records** ([`records`]) and **analytics** ([`analytics`]): student
//!   records and attendance aggregates computed from a grid
//! - **Writes** ([`writer`]): real or simulated mutations, see [`WriteOutcome`]
//! - **Service** ([`SheetService`]): the context object callers hold
//!
//! # Example
//!
//! ```no_run
//! use sheetroll_core::{AuthSession, Config, SheetService, SheetsClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     spreadsheet_id: "1AbC".to_string(),
//!     ..Config::default()
//! };
//! let client = SheetsClient::new(&config, "api-key")?;
//! let service = SheetService::new(client, AuthSession::signed_out());
//!
//! for student in service.get_student_data("Students", "A1:Z1000").await? {
//!     println!("{} {}", student.id, student.name);
//! }
//!
//! // Signed out, so this only describes the write.
//! let outcome = service.add_date_column("Students", "2024-05-06").await?;
//! assert!(outcome.is_simulated());
//! # Ok(())
//! # }
//! ```

pub mod analytics;
pub mod client;
pub mod columns;
pub mod config;
pub mod error;
pub mod grid;
pub mod records;
pub mod sample;
pub mod service;
pub mod session;
pub mod writer;

pub use analytics::{
    AttendanceReport, AttendanceStatus, AttendanceTally, FilterOptions, Filters, Selection,
    SessionSummary,
};
pub use client::{SheetProperties, SheetsClient, WriteAuth};
pub use columns::{ColumnMap, DateColumn, Field, column_index, column_letter};
pub use config::{Config, ConfigError, ConfigFile, ConfigKind, CredentialsConfig, RetryConfig};
pub use error::{SheetsError, WriteError};
pub use grid::{ColumnFilters, GridSource, SheetGrid};
pub use records::{StudentRecord, format_phone_number};
pub use service::SheetService;
pub use session::{AuthSession, SPREADSHEETS_SCOPE};
pub use writer::{
    AppendWrite, AttendanceMark, BatchReport, BatchStatus, CellWrite, ColumnWrite, MarkResult,
    RowWrite, SimulationReason, StudentRow, WriteOutcome,
};
