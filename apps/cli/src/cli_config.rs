use std::env;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use deskform_application::FormReference;
use deskform_core::{AppError, AppResult};
use deskform_domain::{FieldKind, OptionMatchPolicy};
use deskform_infrastructure::ServiceDeskCredentials;
use tracing_subscriber::EnvFilter;

/// Where the form definition comes from and where requests go.
#[derive(Debug, Clone)]
pub enum ServiceDeskConfig {
    /// Live customer portal.
    Remote {
        credentials: ServiceDeskCredentials,
        timeout_secs: u64,
    },
    /// Form definition read from disk; submissions are dry runs.
    File(PathBuf),
}

#[derive(Debug, Clone)]
pub struct CliConfig {
    pub form: Option<FormReference>,
    pub service_desk: ServiceDeskConfig,
    pub option_policy: OptionMatchPolicy,
}

impl CliConfig {
    pub fn load() -> AppResult<Self> {
        let form = match (
            parse_optional_u64("SERVICEDESK_PORTAL_ID")?,
            parse_optional_u64("SERVICEDESK_REQUEST_TYPE_ID")?,
        ) {
            (Some(portal_id), Some(request_type_id)) => {
                Some(FormReference::new(portal_id, request_type_id))
            }
            (None, None) => None,
            _ => {
                return Err(AppError::Validation(
                    "SERVICEDESK_PORTAL_ID and SERVICEDESK_REQUEST_TYPE_ID must be set together"
                        .to_owned(),
                ));
            }
        };

        let option_policy = OptionMatchPolicy {
            case_sensitive: parse_env_bool("SERVICEDESK_OPTION_CASE_SENSITIVE", true)?,
            trim_whitespace: parse_env_bool("SERVICEDESK_OPTION_TRIM", false)?,
        };

        let form_file = env::var("SERVICEDESK_FORM_FILE")
            .ok()
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        let service_desk = match form_file {
            Some(path) => ServiceDeskConfig::File(PathBuf::from(path)),
            None => {
                let timeout_secs = parse_env_u64("SERVICEDESK_HTTP_TIMEOUT_SECS", 15)?;
                if timeout_secs == 0 {
                    return Err(AppError::Validation(
                        "SERVICEDESK_HTTP_TIMEOUT_SECS must be greater than zero".to_owned(),
                    ));
                }

                ServiceDeskConfig::Remote {
                    credentials: ServiceDeskCredentials {
                        base_url: required_non_empty_env("SERVICEDESK_BASE_URL")?,
                        username: required_non_empty_env("SERVICEDESK_USERNAME")?,
                        api_token: required_non_empty_env("SERVICEDESK_API_TOKEN")?,
                    },
                    timeout_secs,
                }
            }
        };

        Ok(Self {
            form,
            service_desk,
            option_policy,
        })
    }

    /// Returns the configured form, falling back to the one a form file describes.
    pub fn form_reference(&self, file_form: Option<FormReference>) -> AppResult<FormReference> {
        self.form.or(file_form).ok_or_else(|| {
            AppError::Validation(
                "SERVICEDESK_PORTAL_ID and SERVICEDESK_REQUEST_TYPE_ID are required for form commands"
                    .to_owned(),
            )
        })
    }
}

/// Inspect, fill and submit Service Desk request forms.
#[derive(Debug, Parser)]
#[command(name = "deskform", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum CliCommand {
    /// List the service desks visible to the account.
    Desks,
    /// List the request types of a service desk.
    RequestTypes {
        service_desk_id: u64,
        /// Only request types listed in this portal group.
        #[arg(long)]
        group: Option<u64>,
    },
    /// Show the metadata of the configured form.
    Form,
    /// List the fields of the configured form.
    Fields {
        /// Only fields of this kind, for example `select_cascading`.
        #[arg(long)]
        kind: Option<FieldKind>,
    },
    /// List the candidate values of a field.
    Values {
        field: String,
        /// Parent option used to narrow a cascading child.
        parent_value: Option<String>,
    },
    /// Search object-picker candidates.
    Search {
        field: String,
        #[arg(default_value = "")]
        query: String,
    },
    /// Print the payload built from a values file.
    Payload { values: PathBuf },
    /// Submit the request built from a values file.
    Submit { values: PathBuf },
}

impl CliCommand {
    /// Returns whether the command works on a fetched form.
    pub fn needs_form(&self) -> bool {
        !matches!(self, Self::Desks | Self::RequestTypes { .. })
    }
}

pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

fn required_non_empty_env(name: &str) -> AppResult<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Validation(format!("{name} is required")))
}

fn parse_optional_u64(name: &str) -> AppResult<Option<u64>> {
    let Ok(value) = required_non_empty_env(name) else {
        return Ok(None);
    };
    value
        .parse::<u64>()
        .map(Some)
        .map_err(|error| AppError::Validation(format!("invalid {name} value '{value}': {error}")))
}

fn parse_env_u64(name: &str, default: u64) -> AppResult<u64> {
    match env::var(name) {
        Ok(value) => value.parse::<u64>().map_err(|error| {
            AppError::Validation(format!("invalid {name} value '{value}': {error}"))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_env_bool(name: &str, default: bool) -> AppResult<bool> {
    match env::var(name) {
        Ok(value) => parse_bool(value.as_str()).ok_or_else(|| {
            AppError::Validation(format!(
                "invalid {name} value '{value}': expected 'true' or 'false'"
            ))
        }),
        Err(_) => Ok(default),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("true") || value == "1" {
        Some(true)
    } else if value.eq_ignore_ascii_case("false") || value == "0" {
        Some(false)
    } else {
        None
    }
}
