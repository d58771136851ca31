use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// The closed set of notification job types, by wire name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationName {
    #[serde(rename = "send_welcome_mail")]
    WelcomeMail,
    #[serde(rename = "send_otp")]
    Otp,
    #[serde(rename = "send_reset_password_mail")]
    ResetPassword,
    #[serde(rename = "send_email_verification_mail")]
    EmailVerification,
    #[serde(rename = "send_magic_link")]
    MagicLink,
    #[serde(rename = "send_squeeze")]
    Squeeze,
    #[serde(rename = "send_contact_us")]
    ContactUs,
}

impl NotificationName {
    pub const ALL: [NotificationName; 7] = [
        NotificationName::WelcomeMail,
        NotificationName::Otp,
        NotificationName::ResetPassword,
        NotificationName::EmailVerification,
        NotificationName::MagicLink,
        NotificationName::Squeeze,
        NotificationName::ContactUs,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationName::WelcomeMail => "send_welcome_mail",
            NotificationName::Otp => "send_otp",
            NotificationName::ResetPassword => "send_reset_password_mail",
            NotificationName::EmailVerification => "send_email_verification_mail",
            NotificationName::MagicLink => "send_magic_link",
            NotificationName::Squeeze => "send_squeeze",
            NotificationName::ContactUs => "send_contact_us",
        }
    }

    /// Template file stem rendered for this type
    pub fn template(&self) -> &'static str {
        match self {
            NotificationName::WelcomeMail => "welcome-email",
            NotificationName::Otp => "send_otp",
            NotificationName::ResetPassword => "password_reset_mail",
            NotificationName::EmailVerification => "email_verification",
            NotificationName::MagicLink => "send_magic_link",
            NotificationName::Squeeze => "squeeze",
            NotificationName::ContactUs => "default",
        }
    }
}

impl fmt::Display for NotificationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown notification type: {0}")]
pub struct UnknownName(pub String);

impl FromStr for NotificationName {
    type Err = UnknownName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NotificationName::ALL
            .into_iter()
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownName(s.to_string()))
    }
}
