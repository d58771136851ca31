//! Typed notification payloads.
//!
//! A [`NotificationRecord`] carries its payload as opaque JSON. It is decoded
//! exactly once, into [`Notification`], before any handler runs.

use serde::{Deserialize, Serialize};

use crate::queue::NotificationRecord;

use super::error::DispatchError;
use super::names::NotificationName;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WelcomeMail {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Otp {
    pub email: String,
    pub otp_token: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetPassword {
    pub email: String,
    pub token: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailVerification {
    pub email: String,
    #[serde(default)]
    pub code: u64,
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicLink {
    pub email: String,
    pub magic_link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Squeeze {
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactUs {
    pub name: String,
    pub email: String,
    // Older producers send "Subject"
    #[serde(default, alias = "Subject")]
    pub subject: String,
    pub message: String,
}

/// A decoded notification job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    WelcomeMail(WelcomeMail),
    Otp(Otp),
    ResetPassword(ResetPassword),
    EmailVerification(EmailVerification),
    MagicLink(MagicLink),
    Squeeze(Squeeze),
    ContactUs(ContactUs),
}

impl Notification {
    pub fn name(&self) -> NotificationName {
        match self {
            Notification::WelcomeMail(_) => NotificationName::WelcomeMail,
            Notification::Otp(_) => NotificationName::Otp,
            Notification::ResetPassword(_) => NotificationName::ResetPassword,
            Notification::EmailVerification(_) => NotificationName::EmailVerification,
            Notification::MagicLink(_) => NotificationName::MagicLink,
            Notification::Squeeze(_) => NotificationName::Squeeze,
            Notification::ContactUs(_) => NotificationName::ContactUs,
        }
    }

    /// Decode a queued record into its typed form.
    pub fn decode(record: &NotificationRecord) -> Result<Self, DispatchError> {
        let name: NotificationName = record
            .name
            .parse()
            .map_err(|_| DispatchError::UnknownNotificationType(record.name.clone()))?;

        let data = record.data.as_str();
        let decoded = match name {
            NotificationName::WelcomeMail => Notification::WelcomeMail(decode_payload(name, data)?),
            NotificationName::Otp => Notification::Otp(decode_payload(name, data)?),
            NotificationName::ResetPassword => {
                Notification::ResetPassword(decode_payload(name, data)?)
            }
            NotificationName::EmailVerification => {
                Notification::EmailVerification(decode_payload(name, data)?)
            }
            NotificationName::MagicLink => Notification::MagicLink(decode_payload(name, data)?),
            NotificationName::Squeeze => Notification::Squeeze(decode_payload(name, data)?),
            NotificationName::ContactUs => Notification::ContactUs(decode_payload(name, data)?),
        };

        Ok(decoded)
    }

    /// Encode into an unsent record.
    pub fn to_record(&self) -> Result<NotificationRecord, serde_json::Error> {
        let data = match self {
            Notification::WelcomeMail(p) => serde_json::to_string(p)?,
            Notification::Otp(p) => serde_json::to_string(p)?,
            Notification::ResetPassword(p) => serde_json::to_string(p)?,
            Notification::EmailVerification(p) => serde_json::to_string(p)?,
            Notification::MagicLink(p) => serde_json::to_string(p)?,
            Notification::Squeeze(p) => serde_json::to_string(p)?,
            Notification::ContactUs(p) => serde_json::to_string(p)?,
        };

        Ok(NotificationRecord::new(self.name().as_str(), data))
    }
}

fn decode_payload<T: serde::de::DeserializeOwned>(
    name: NotificationName,
    data: &str,
) -> Result<T, DispatchError> {
    serde_json::from_str(data).map_err(|e| DispatchError::Decode {
        name: name.as_str().to_string(),
        reason: e.to_string(),
    })
}

macro_rules! impl_from_payload {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for Notification {
                fn from(payload: $variant) -> Self {
                    Notification::$variant(payload)
                }
            }
        )*
    };
}

impl_from_payload!(
    WelcomeMail,
    Otp,
    ResetPassword,
    EmailVerification,
    MagicLink,
    Squeeze,
    ContactUs,
);
