//! Settings shared by every subcommand.

use anyhow::{Context as _, Result};
use clap::Args;
use sheetroll_core::{Config, CredentialsConfig, SheetService};
use tracing::debug;

/// Overrides the API key from `credentials.toml`.
const API_KEY_ENV: &str = "SHEETROLL_API_KEY";

/// Signs the session in without a credentials file.
const ACCESS_TOKEN_ENV: &str = "SHEETROLL_ACCESS_TOKEN";

#[derive(Debug, Default, Args)]
pub struct GlobalArgs {
    /// Spreadsheet id, overriding `spreadsheet_id` in `sheetroll.toml`
    #[arg(long, global = true, value_name = "ID")]
    pub spreadsheet: Option<String>,

    /// Sheet holding the roster, overriding `student_sheet`
    #[arg(long, global = true, value_name = "NAME")]
    pub sheet: Option<String>,

    /// Sheets API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub endpoint: Option<String>,
}

/// Resolved configuration plus the service built from it.
#[derive(Debug)]
pub struct Context {
    pub service: SheetService,
    pub sheet: String,
    pub data_range: String,
}

impl Context {
    /// Resolves config files, applies `global` and the environment, and
    /// builds the service.
    pub fn load(global: &GlobalArgs) -> Result<Self> {
        let mut config = Config::load_resolved()
            .context("failed to load sheetroll.toml")?
            .unwrap_or_default();
        apply_overrides(&mut config, global);
        config.validate().context("invalid configuration")?;

        let mut credentials = CredentialsConfig::load_resolved()
            .context("failed to load credentials")?
            .unwrap_or_default();
        apply_env(&mut credentials, |key| std::env::var(key).ok());

        let service = SheetService::from_config(&config, &credentials)
            .context("failed to build the sheets client")?;
        debug!(
            spreadsheet = %config.spreadsheet_id,
            signed_in = service.session().is_signed_in(),
            "context ready"
        );

        Ok(Self {
            service,
            sheet: config.student_sheet,
            data_range: config.data_range,
        })
    }

    pub fn session_label(&self) -> &'static str {
        if self.service.session().is_signed_in() {
            "signed in"
        } else {
            "signed out"
        }
    }
}

fn apply_overrides(config: &mut Config, global: &GlobalArgs) {
    if let Some(id) = &global.spreadsheet {
        config.spreadsheet_id.clone_from(id);
    }
    if let Some(sheet) = &global.sheet {
        config.student_sheet.clone_from(sheet);
    }
    if let Some(endpoint) = &global.endpoint {
        config.endpoint.clone_from(endpoint);
    }
}

fn apply_env(credentials: &mut CredentialsConfig, var: impl Fn(&str) -> Option<String>) {
    if let Some(key) = var(API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
        credentials.api_key = key;
    }
    if let Some(token) = var(ACCESS_TOKEN_ENV).filter(|v| !v.trim().is_empty()) {
        credentials.access_token = Some(token);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overrides_replace_only_given_fields() {
        let mut config = Config {
            spreadsheet_id: "from-file".to_string(),
            ..Config::default()
        };
        let global = GlobalArgs {
            sheet: Some("Roster".to_string()),
            ..GlobalArgs::default()
        };
        apply_overrides(&mut config, &global);

        assert_eq!(config.spreadsheet_id, "from-file");
        assert_eq!(config.student_sheet, "Roster");
        assert_eq!(config.endpoint, Config::default().endpoint);
    }

    #[test]
    fn test_env_overrides_credentials() {
        let mut credentials = CredentialsConfig {
            api_key: "file-key".to_string(),
            ..CredentialsConfig::default()
        };
        apply_env(&mut credentials, |key| match key {
            API_KEY_ENV => Some("env-key".to_string()),
            ACCESS_TOKEN_ENV => Some("tok".to_string()),
            _ => None,
        });

        assert_eq!(credentials.api_key, "env-key");
        assert_eq!(credentials.access_token.as_deref(), Some("tok"));
    }

    #[test]
    fn test_blank_env_values_are_ignored() {
        let mut credentials = CredentialsConfig {
            api_key: "file-key".to_string(),
            ..CredentialsConfig::default()
        };
        apply_env(&mut credentials, |_| Some("  ".to_string()));

        assert_eq!(credentials.api_key, "file-key");
        assert!(credentials.access_token.is_none());
    }
}
