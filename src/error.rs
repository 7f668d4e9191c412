//! Error reporting surface shared by every failure kind.

use crate::charts::ChartError;
use crate::config::ConfigError;
use crate::data::LoadError;
use serde::Serialize;

/// Serializable `{ name, code, description }` report of a failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub name: String,
    pub code: u16,
    pub description: String,
}

impl ErrorReport {
    pub fn new(name: &str, code: u16, description: impl Into<String>) -> Self {
        Self {
            name: name.to_string(),
            code,
            description: description.into(),
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"name":"{}","code":{},"description":"unserializable error"}}"#,
                self.name, self.code
            )
        })
    }
}

impl From<&LoadError> for ErrorReport {
    fn from(err: &LoadError) -> Self {
        ErrorReport::new("DataLoadError", 500, err.to_string())
    }
}

impl From<&ChartError> for ErrorReport {
    fn from(err: &ChartError) -> Self {
        if err.is_client_error() {
            ErrorReport::new("UnknownOptionError", 400, err.to_string())
        } else {
            ErrorReport::new("RenderError", 500, err.to_string())
        }
    }
}

impl From<&ConfigError> for ErrorReport {
    fn from(err: &ConfigError) -> Self {
        ErrorReport::new("ConfigError", 500, err.to_string())
    }
}

impl From<&anyhow::Error> for ErrorReport {
    /// Uses the typed report of the root cause when there is one.
    fn from(err: &anyhow::Error) -> Self {
        if let Some(e) = err.downcast_ref::<LoadError>() {
            return e.into();
        }
        if let Some(e) = err.downcast_ref::<ChartError>() {
            return e.into();
        }
        if let Some(e) = err.downcast_ref::<ConfigError>() {
            return e.into();
        }
        ErrorReport::new("InternalError", 500, format!("{:#}", err))
    }
}
