pub mod analytics;
pub mod config;
pub mod doctor;
pub mod migrate;
pub mod review;
pub mod rules;
pub mod sale;
pub mod seed;

use std::future::Future;

use commissions_core::config::{AppConfig, LoadOptions};
use commissions_core::domain::actor::{Actor, ActorRole};
use commissions_core::errors::InterfaceError;
use commissions_db::{connect, migrations, CommissionService, Repositories, ServiceError};
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_DATABASE: u8 = 4;
pub const EXIT_MIGRATION: u8 = 5;
pub const EXIT_VERIFICATION: u8 = 6;
pub const EXIT_BAD_REQUEST: u8 = 10;
pub const EXIT_UNPROCESSABLE: u8 = 11;
pub const EXIT_CONFLICT: u8 = 12;
pub const EXIT_NOT_FOUND: u8 = 13;
pub const EXIT_FORBIDDEN: u8 = 14;
pub const EXIT_INTERNAL: u8 = 15;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

#[derive(Debug, Serialize)]
struct DataOutcome<'a, T> {
    command: &'a str,
    status: &'static str,
    data: &'a T,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    pub fn data<T: Serialize>(command: &str, data: &T) -> Self {
        let payload = DataOutcome { command, status: "ok", data };
        Self { exit_code: 0, output: serialize_payload(&payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(&payload) }
    }
}

fn serialize_payload<T: Serialize>(payload: &T) -> String {
    serde_json::to_string(payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}

/// Error class, message, and exit code of a failed command.
pub(crate) type Failure = (&'static str, String, u8);

pub(crate) fn load_config(command: &str) -> Result<AppConfig, CommandResult> {
    AppConfig::load(LoadOptions::default()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn build_runtime(command: &str) -> Result<tokio::runtime::Runtime, CommandResult> {
    tokio::runtime::Builder::new_current_thread().enable_all().build().map_err(|error| {
        CommandResult::failure(
            command,
            "runtime_init",
            format!("failed to initialize async runtime: {error}"),
            EXIT_RUNTIME,
        )
    })
}

/// Connects, applies pending migrations, and hands a configured service to `action`.
/// The value `action` returns becomes the command's data payload.
pub(crate) fn run_with_service<T, F, Fut>(command: &str, action: F) -> CommandResult
where
    T: Serialize,
    F: FnOnce(CommissionService) -> Fut,
    Fut: Future<Output = Result<T, ServiceError>>,
{
    let config = match load_config(command) {
        Ok(config) => config,
        Err(result) => return result,
    };
    let runtime = match build_runtime(command) {
        Ok(runtime) => runtime,
        Err(result) => return result,
    };

    let result = runtime.block_on(async {
        let pool = connect(&config.database)
            .await
            .map_err(|error| ("db_connectivity", error.to_string(), EXIT_DATABASE))?;
        migrations::run_pending(&pool)
            .await
            .map_err(|error| ("migration", error.to_string(), EXIT_MIGRATION))?;

        let service =
            CommissionService::from_config(Repositories::sqlite(pool.clone()), &config.commissions);
        let outcome = action(service).await.map_err(service_failure);
        pool.close().await;
        outcome
    });

    match result {
        Ok(data) => CommandResult::data(command, &data),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure(command, error_class, message, exit_code)
        }
    }
}

pub(crate) fn service_failure(error: ServiceError) -> Failure {
    let error_class = error.kind();
    let interface = error.into_application().into_interface("cli");
    let exit_code = match interface {
        InterfaceError::BadRequest { .. } => EXIT_BAD_REQUEST,
        InterfaceError::Unprocessable { .. } => EXIT_UNPROCESSABLE,
        InterfaceError::Conflict { .. } => EXIT_CONFLICT,
        InterfaceError::NotFound { .. } => EXIT_NOT_FOUND,
        InterfaceError::Forbidden { .. } => EXIT_FORBIDDEN,
        InterfaceError::ServiceUnavailable { .. } => EXIT_DATABASE,
        InterfaceError::Internal { .. } => EXIT_INTERNAL,
    };
    (error_class, interface.to_string(), exit_code)
}

pub(crate) fn parse_actor(command: &str, actor_id: &str, role: &str) -> Result<Actor, CommandResult> {
    let invalid = |message: String| {
        CommandResult::failure(command, "validation_error", message, EXIT_BAD_REQUEST)
    };
    if actor_id.trim().is_empty() {
        return Err(invalid("`--actor` must not be blank".to_string()));
    }
    let role = role.parse::<ActorRole>().map_err(|error| invalid(error.to_string()))?;
    Ok(Actor::new(actor_id.trim(), role))
}

#[cfg(test)]
mod tests {
    use commissions_core::domain::sale::SaleId;
    use commissions_core::errors::{CommissionError, StateError};
    use commissions_db::ServiceError;

    use super::{parse_actor, service_failure, CommandResult, EXIT_BAD_REQUEST, EXIT_NOT_FOUND};

    #[test]
    fn data_payload_wraps_value() {
        let result = CommandResult::data("analytics", &vec![1, 2, 3]);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.output, r#"{"command":"analytics","status":"ok","data":[1,2,3]}"#);
    }

    #[test]
    fn not_found_maps_to_stable_exit_code() {
        let error = ServiceError::Commission(CommissionError::from(StateError::NotFound(SaleId(
            "sale-1".to_string(),
        ))));
        let (class, message, code) = service_failure(error);
        assert_eq!(class, "not_found");
        assert!(message.contains("sale-1"));
        assert_eq!(code, EXIT_NOT_FOUND);
    }

    #[test]
    fn unknown_role_is_a_validation_failure() {
        let result = parse_actor("approve", "fin-1", "auditor").expect_err("unknown role");
        assert_eq!(result.exit_code, EXIT_BAD_REQUEST);
        assert!(result.output.contains("validation_error"));

        let actor = parse_actor("approve", " fin-1 ", "finance").expect("actor");
        assert_eq!(actor.id, "fin-1");
    }
}
