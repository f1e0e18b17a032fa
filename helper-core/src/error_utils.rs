use crate::error::*;
use tracing::{error, info, warn};

pub trait ErrorExt {
    fn log_error(&self) -> &Self;
    fn log_warn(&self) -> &Self;
    fn user_friendly_message(&self) -> String;
    fn error_code(&self) -> String;
}

impl ErrorExt for HelperError {
    fn log_error(&self) -> &Self {
        error!("HelperError: {}", self);
        match self {
            HelperError::Backend(e) => {
                error!("Backend error details: {:?}", e);
            }
            HelperError::Config(e) => {
                error!("Configuration error details: {:?}", e);
            }
            _ => {}
        }
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("HelperError (warning): {}", self);
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            HelperError::Backend(e) => e.user_friendly_message(),
            HelperError::Config(e) => e.user_friendly_message(),
            HelperError::ExtractionUnavailable { .. } => {
                "Could not read this page. Reload the tab and try again.".to_string()
            }
            HelperError::EmptyContent { .. } => {
                "No post title or body was found on this page.".to_string()
            }
            HelperError::InjectionTargetMissing { .. } => {
                "The post body could not be located; the answer was added at the end of the page."
                    .to_string()
            }
            HelperError::TabClosed { .. } => "The tab was closed.".to_string(),
            HelperError::AlreadyRunning { .. } => {
                "An analysis is already running for this tab.".to_string()
            }
            _ => "An unexpected error occurred. Please try again later.".to_string(),
        }
    }

    fn error_code(&self) -> String {
        match self {
            HelperError::ExtractionUnavailable { .. } => "EXTRACTION_UNAVAILABLE".to_string(),
            HelperError::EmptyContent { .. } => "EMPTY_CONTENT".to_string(),
            HelperError::Backend(e) => e.error_code(),
            HelperError::InjectionTargetMissing { .. } => "INJECTION_TARGET_MISSING".to_string(),
            HelperError::TabClosed { .. } => "TAB_CLOSED".to_string(),
            HelperError::BackgroundUnavailable => "BACKGROUND_UNAVAILABLE".to_string(),
            HelperError::AlreadyRunning { .. } => "ALREADY_RUNNING".to_string(),
            HelperError::Config(_) => "CONFIG".to_string(),
            HelperError::Io(_) => "IO".to_string(),
            HelperError::Serialization(_) => "SERIALIZATION".to_string(),
        }
    }
}

impl ErrorExt for BackendError {
    fn log_error(&self) -> &Self {
        error!("BackendError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("BackendError (warning): {}", self);
        self
    }

    // Shown verbatim as the summary text.
    fn user_friendly_message(&self) -> String {
        self.to_string()
    }

    fn error_code(&self) -> String {
        match self {
            BackendError::Network { .. } => "NETWORK_FAILURE".to_string(),
            BackendError::Decode { .. } => "DECODE_FAILURE".to_string(),
            BackendError::Http { .. } => "BACKEND_HTTP_ERROR".to_string(),
        }
    }
}

impl ErrorExt for ConfigError {
    fn log_error(&self) -> &Self {
        error!("ConfigError: {}", self);
        self
    }

    fn log_warn(&self) -> &Self {
        warn!("ConfigError (warning): {}", self);
        self
    }

    fn user_friendly_message(&self) -> String {
        match self {
            ConfigError::FileNotFound { path } => {
                format!("Configuration file '{}' was not found.", path)
            }
            ConfigError::InvalidValue { field, value } => {
                format!("Invalid value '{}' for configuration field '{}'.", value, field)
            }
            ConfigError::ValidationFailed { reason } => {
                format!("Configuration is invalid: {}", reason)
            }
            ConfigError::Parse(_) => {
                "Configuration file could not be parsed. Check the TOML syntax.".to_string()
            }
        }
    }

    fn error_code(&self) -> String {
        match self {
            ConfigError::FileNotFound { .. } => "CONFIG_FILE_NOT_FOUND".to_string(),
            ConfigError::InvalidValue { .. } => "CONFIG_INVALID_VALUE".to_string(),
            ConfigError::ValidationFailed { .. } => "CONFIG_VALIDATION_FAILED".to_string(),
            ConfigError::Parse(_) => "CONFIG_PARSE_ERROR".to_string(),
        }
    }
}

pub struct ErrorReporter {
    report_errors: bool,
    report_warnings: bool,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self {
            report_errors: true,
            report_warnings: true,
        }
    }

    pub fn with_error_reporting(mut self, enabled: bool) -> Self {
        self.report_errors = enabled;
        self
    }

    pub fn with_warning_reporting(mut self, enabled: bool) -> Self {
        self.report_warnings = enabled;
        self
    }

    pub fn report_error(&self, error: &HelperError) {
        if self.report_errors {
            error.log_error();
            info!("Error code: {}", error.error_code());
        }
    }

    pub fn report_warning(&self, error: &HelperError) {
        if self.report_warnings {
            error.log_warn();
        }
    }
}

impl Default for ErrorReporter {
    fn default() -> Self {
        Self::new()
    }
}
