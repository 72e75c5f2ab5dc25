pub mod auth_check;
pub use self::auth_check::check_credentials;

pub mod health;
pub use self::health::health;

pub mod led;
pub use self::led::{LedTopic, set_led};

pub mod root;

pub mod temperature;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// `{"message": "OK"}` and other textual acknowledgements.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatusMessage {
    pub message: String,
}

impl StatusMessage {
    #[must_use]
    pub fn ok() -> Self {
        Self {
            message: "OK".to_string(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TemperatureMessage {
    pub message: f64,
}

/// Newest reading first.
#[derive(ToSchema, Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TemperaturesMessage {
    pub message: Vec<f64>,
}

/// Failure envelope, `{"error": ...}`.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) const MSG_INTERNAL: &str = "internal server error";
