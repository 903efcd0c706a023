use thiserror::Error;

#[derive(Error, Debug)]
pub enum BotError {
    // Configuration errors
    #[error("Failed to load config file '{path}': {source}")]
    ConfigLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid config: {message}")]
    ConfigValidation { message: String },

    // Catalog state errors
    #[error("Failed to save state to '{path}': {source}")]
    StateSave {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to load state from '{path}': {source}")]
    StateLoad {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse state file '{path}': {source}")]
    StateParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    // Panel API errors
    #[error("Panel request failed: {0}")]
    PanelHttp(#[from] reqwest::Error),

    #[error("Panel returned {status} for {endpoint}: {body}")]
    PanelStatus {
        endpoint: String,
        status: u16,
        body: String,
    },

    // Command validation errors
    #[error("{message}")]
    Validation { message: String },

    #[error("Image not found: {name}")]
    ImageNotFound { name: String },

    #[error("Node catalog is empty")]
    NoNodes,

    // Discord errors
    #[error("Discord API error: {message}")]
    Discord { message: String },

    // Permission errors
    #[error("Permission denied: {message}")]
    PermissionDenied { message: String },

    // Generic errors
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl BotError {
    /// Text shown to the invoking user. Remote and internal failures stay generic.
    pub fn user_message(&self) -> String {
        match self {
            BotError::Validation { message } => message.clone(),
            BotError::ImageNotFound { .. } => "Image not found.".to_string(),
            BotError::NoNodes => {
                "No nodes available. Ask an admin to run fetchnodes.".to_string()
            }
            BotError::PermissionDenied { .. } => {
                "You do not have permission to use this command.".to_string()
            }
            BotError::PanelHttp(_) | BotError::PanelStatus { .. } => {
                "An error occurred. Please try again later.".to_string()
            }
            _ => "An unexpected error occurred.".to_string(),
        }
    }

    /// True for failures the user caused and can fix by re-running the command.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            BotError::Validation { .. }
                | BotError::ImageNotFound { .. }
                | BotError::NoNodes
                | BotError::PermissionDenied { .. }
        )
    }
}

impl From<serenity::Error> for BotError {
    fn from(err: serenity::Error) -> Self {
        BotError::Discord {
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for BotError {
    fn from(err: std::io::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for BotError {
    fn from(err: serde_json::Error) -> Self {
        BotError::Internal {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, BotError>;

use poise::serenity_prelude as serenity;
