use serde::{Deserialize, Serialize};

/// The persisted unit of work.
///
/// `data` is the JSON payload for `name`, kept opaque until it is decoded
/// into a typed notification at dispatch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub name: String,
    pub data: String,
    #[serde(default)]
    pub sent: bool,
}

impl NotificationRecord {
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
            sent: false,
        }
    }
}
