//! Command-line client for Service Desk request forms.

#![forbid(unsafe_code)]

mod cli_config;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use deskform_application::{
    AutocompleteLookup, DirectoryService, FormModel, FormReference, FormSource, RequestSubmitter,
    ServiceDeskDirectory,
};
use deskform_core::{AppError, AppResult};
use deskform_domain::FormSummary;
use deskform_infrastructure::{HttpServiceDeskClient, InMemoryServiceDesk};
use serde_json::{Map, Value};
use tracing::{info, warn};

use crate::cli_config::{Cli, CliCommand, CliConfig, ServiceDeskConfig, init_tracing};

/// Ports wired for one run, plus the form a form file describes.
struct Adapters {
    form_source: Arc<dyn FormSource>,
    autocomplete: Arc<dyn AutocompleteLookup>,
    submitter: Arc<dyn RequestSubmitter>,
    directory: Arc<dyn ServiceDeskDirectory>,
    file_form: Option<FormReference>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = CliConfig::load()?;
    let adapters = build_adapters(&config).await?;

    let output = if cli.command.needs_form() {
        run_form_command(cli.command, &config, adapters).await?
    } else {
        run_directory_command(cli.command, adapters).await?
    };

    let rendered = serde_json::to_string_pretty(&output)
        .map_err(|error| AppError::Internal(format!("failed to render output: {error}")))?;
    println!("{rendered}");

    Ok(())
}

async fn run_directory_command(command: CliCommand, adapters: Adapters) -> AppResult<Value> {
    let directory = DirectoryService::new(adapters.directory);

    match command {
        CliCommand::Desks => to_json(&directory.service_desks().await?),
        CliCommand::RequestTypes {
            service_desk_id,
            group,
        } => to_json(&directory.request_types(service_desk_id, group).await?),
        other => Err(AppError::Internal(format!(
            "{other:?} is not a directory command"
        ))),
    }
}

async fn run_form_command(
    command: CliCommand,
    config: &CliConfig,
    adapters: Adapters,
) -> AppResult<Value> {
    let reference = config.form_reference(adapters.file_form)?;
    let mut model = FormModel::new(
        adapters.form_source,
        adapters.autocomplete,
        adapters.submitter,
        config.option_policy,
    );

    let form = model.fetch_and_parse_form(reference).await?;
    info!(
        form = %reference,
        form_name = %form.metadata().form_name(),
        "deskform ready"
    );

    match command {
        CliCommand::Form => to_json(&FormSummary::from(model.form()?.metadata())),
        CliCommand::Fields { kind } => {
            let mut fields = model.list_fields()?;
            if let Some(kind) = kind {
                fields.retain(|field| field.kind == kind);
            }
            to_json(&fields)
        }
        CliCommand::Values {
            field,
            parent_value,
        } => to_json(
            &model
                .list_field_values(field.as_str(), parent_value.as_deref(), None)
                .await?,
        ),
        CliCommand::Search { field, query } => to_json(
            &model
                .list_field_values(field.as_str(), None, Some(query.as_str()))
                .await?,
        ),
        CliCommand::Payload { values } => {
            model.set_form_values(read_values(&values).await?)?;
            model.serialize()?.to_json()
        }
        CliCommand::Submit { values } => {
            model.set_form_values(read_values(&values).await?)?;
            if matches!(config.service_desk, ServiceDeskConfig::File(_)) {
                warn!("SERVICEDESK_FORM_FILE is set, request is not sent to the portal");
            }
            to_json(&model.create_request().await?)
        }
        other => Err(AppError::Internal(format!("{other:?} is not a form command"))),
    }
}

async fn build_adapters(config: &CliConfig) -> AppResult<Adapters> {
    match &config.service_desk {
        ServiceDeskConfig::Remote {
            credentials,
            timeout_secs,
        } => {
            let http_client = reqwest::Client::builder()
                .timeout(Duration::from_secs(*timeout_secs))
                .build()
                .map_err(|error| {
                    AppError::Internal(format!("failed to build HTTP client: {error}"))
                })?;
            let client = Arc::new(HttpServiceDeskClient::new(
                http_client,
                credentials.clone(),
            )?);

            Ok(Adapters {
                form_source: client.clone(),
                autocomplete: client.clone(),
                submitter: client.clone(),
                directory: client,
                file_form: None,
            })
        }
        ServiceDeskConfig::File(path) => {
            let raw = read_json(path, "form definition").await?;
            let service_desk = Arc::new(InMemoryServiceDesk::new());
            let file_form = service_desk.load_form(raw.clone()).await?;
            if let Some(form) = config.form {
                service_desk.insert_form(form, raw).await;
            }

            Ok(Adapters {
                form_source: service_desk.clone(),
                autocomplete: service_desk.clone(),
                submitter: service_desk.clone(),
                directory: service_desk,
                file_form: Some(file_form),
            })
        }
    }
}

async fn read_values(path: &Path) -> AppResult<Map<String, Value>> {
    match read_json(path, "values file").await? {
        Value::Object(values) => Ok(values),
        _ => Err(AppError::Validation(format!(
            "values file '{}' must contain a JSON object of label to value",
            path.display()
        ))),
    }
}

async fn read_json(path: &Path, context: &str) -> AppResult<Value> {
    let contents = tokio::fs::read_to_string(path).await.map_err(|error| {
        AppError::Validation(format!(
            "failed to read {context} '{}': {error}",
            path.display()
        ))
    })?;

    serde_json::from_str(contents.as_str()).map_err(|error| {
        AppError::Validation(format!(
            "{context} '{}' is not valid JSON: {error}",
            path.display()
        ))
    })
}

fn to_json<T: serde::Serialize>(value: &T) -> AppResult<Value> {
    serde_json::to_value(value)
        .map_err(|error| AppError::Internal(format!("failed to encode output: {error}")))
}
