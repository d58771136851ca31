//! One handler per notification type.
//!
//! A handler turns a typed payload into a [`PreparedMail`]: who receives it,
//! its subject, which template renders it and the template data. Rendering
//! and delivery are left to the dispatcher.

use chrono::Datelike;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::config::AppConfig;
use crate::users::{this_or_that, User, UserDirectory};

use super::error::DispatchError;
use super::names::NotificationName;
use super::payloads::{
    ContactUs, EmailVerification, MagicLink, Otp, ResetPassword, Squeeze, WelcomeMail,
};

pub const WELCOME_SUBJECT: &str = "Welcome on board!🎉";
pub const RESET_PASSWORD_SUBJECT: &str = "Password Reset";
pub const EMAIL_VERIFICATION_SUBJECT: &str = "Please verify your email address";
pub const MAGIC_LINK_SUBJECT: &str = "Secure Login: Your Magic Link";
pub const SQUEEZE_SUBJECT: &str = "Welcome to Our Service";
pub const CONTACT_US_SUBJECT: &str = "Contact us message received";

/// What handlers need besides their payload.
pub struct HandlerContext<'a> {
    pub users: &'a dyn UserDirectory,
    pub app: &'a AppConfig,
}

impl HandlerContext<'_> {
    async fn require_user(&self, email: &str) -> Result<User, DispatchError> {
        self.users
            .find_by_email(email)
            .await?
            .ok_or_else(|| DispatchError::NotFound(email.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreparedMail {
    pub name: NotificationName,
    pub recipient: String,
    pub subject: String,
    pub template: &'static str,
    pub data: Map<String, Value>,
}

impl PreparedMail {
    fn new(
        name: NotificationName,
        recipient: impl Into<String>,
        subject: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            name,
            recipient: recipient.into(),
            subject: subject.into(),
            template: name.template(),
            data,
        }
    }
}

pub async fn welcome_mail(
    ctx: &HandlerContext<'_>,
    payload: &WelcomeMail,
) -> Result<PreparedMail, DispatchError> {
    let user = ctx.require_user(&payload.email).await?;

    let mut data = payload_fields(payload);
    data.insert("firstname".into(), json!(user.display_name()));
    add_common_template_data(&mut data, ctx.app);

    Ok(PreparedMail::new(
        NotificationName::WelcomeMail,
        user.email,
        WELCOME_SUBJECT,
        data,
    ))
}

pub async fn otp(ctx: &HandlerContext<'_>, payload: &Otp) -> Result<PreparedMail, DispatchError> {
    let user = ctx.require_user(&payload.email).await?;

    let mut data = payload_fields(payload);
    data.insert("firstname".into(), json!(user.display_name()));
    data.insert("business_name".into(), json!(""));
    add_common_template_data(&mut data, ctx.app);

    Ok(PreparedMail::new(
        NotificationName::Otp,
        user.email,
        format!("Secure Login: Your OTP Code Is: {}", payload.otp_token),
        data,
    ))
}

pub async fn reset_password(
    ctx: &HandlerContext<'_>,
    payload: &ResetPassword,
) -> Result<PreparedMail, DispatchError> {
    let user = ctx.require_user(&payload.email).await?;

    let mut data = payload_fields(payload);
    data.insert("firstname".into(), json!(user.display_name()));
    data.insert("business_name".into(), json!(""));
    data.insert(
        "password_reset_url".into(),
        json!(format!("{}/reset-password/", base_url(ctx.app))),
    );
    add_common_template_data(&mut data, ctx.app);

    Ok(PreparedMail::new(
        NotificationName::ResetPassword,
        user.email,
        RESET_PASSWORD_SUBJECT,
        data,
    ))
}

pub async fn email_verification(
    ctx: &HandlerContext<'_>,
    payload: &EmailVerification,
) -> Result<PreparedMail, DispatchError> {
    let user = ctx.require_user(&payload.email).await?;

    let mut data = payload_fields(payload);
    data.insert("firstname".into(), json!(user.display_name()));
    data.insert("business_name".into(), json!(""));
    data.insert(
        "verification_url".into(),
        json!(format!("{}/email-verify/", base_url(ctx.app))),
    );
    add_common_template_data(&mut data, ctx.app);

    Ok(PreparedMail::new(
        NotificationName::EmailVerification,
        user.email,
        EMAIL_VERIFICATION_SUBJECT,
        data,
    ))
}

pub async fn magic_link(
    ctx: &HandlerContext<'_>,
    payload: &MagicLink,
) -> Result<PreparedMail, DispatchError> {
    let user = ctx.require_user(&payload.email).await?;

    let mut data = payload_fields(payload);
    data.insert("firstname".into(), json!(user.display_name()));
    data.insert("business_name".into(), json!(""));
    add_common_template_data(&mut data, ctx.app);

    Ok(PreparedMail::new(
        NotificationName::MagicLink,
        user.email,
        MAGIC_LINK_SUBJECT,
        data,
    ))
}

pub async fn squeeze(
    ctx: &HandlerContext<'_>,
    payload: &Squeeze,
) -> Result<PreparedMail, DispatchError> {
    let mut data = payload_fields(payload);
    data.insert(
        "firstname".into(),
        json!(this_or_that(&payload.first_name, &payload.email)),
    );
    data.insert("business_name".into(), json!(""));
    add_common_template_data(&mut data, ctx.app);

    Ok(PreparedMail::new(
        NotificationName::Squeeze,
        payload.email.clone(),
        SQUEEZE_SUBJECT,
        data,
    ))
}

pub async fn contact_us(
    ctx: &HandlerContext<'_>,
    payload: &ContactUs,
) -> Result<PreparedMail, DispatchError> {
    let mut data = payload_fields(payload);
    data.insert(
        "firstname".into(),
        json!(this_or_that(&payload.name, &payload.email)),
    );
    data.insert("business_name".into(), json!(""));
    add_common_template_data(&mut data, ctx.app);

    Ok(PreparedMail::new(
        NotificationName::ContactUs,
        payload.email.clone(),
        CONTACT_US_SUBJECT,
        data,
    ))
}

/// Fields every mail template can rely on: `year`, `faq`, `dashboard`,
/// `business_logo_uri` and `app_name`.
///
/// `dashboard` points at the account when the data carries a non-zero
/// `account_id` (number or numeric string).
pub fn add_common_template_data(data: &mut Map<String, Value>, app: &AppConfig) {
    let url = base_url(app);
    let account_id = data.get("account_id").and_then(account_id_of).unwrap_or(0);

    data.insert("year".into(), json!(chrono::Utc::now().year()));
    data.insert("faq".into(), json!(format!("{url}/faq")));
    let dashboard = if account_id != 0 {
        format!("{url}/login?account-id={account_id}")
    } else {
        format!("{url}/login")
    };
    data.insert("dashboard".into(), json!(dashboard));
    data.insert("business_logo_uri".into(), json!(""));
    data.insert("app_name".into(), json!(app.name));
}

fn account_id_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn base_url(app: &AppConfig) -> &str {
    app.url.trim_end_matches('/')
}

fn payload_fields<T: Serialize>(payload: &T) -> Map<String, Value> {
    match serde_json::to_value(payload) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::users::InMemoryUserDirectory;

    fn app() -> AppConfig {
        AppConfig {
            name: "Acme".to_string(),
            url: "https://app.example.com/".to_string(),
        }
    }

    fn directory() -> InMemoryUserDirectory {
        InMemoryUserDirectory::with_users([
            User::new("1", "ada@example.com", "Ada"),
            User::new("2", "nameless@example.com", ""),
        ])
    }

    #[tokio::test]
    async fn test_welcome_uses_first_name() {
        let users = directory();
        let app = app();
        let ctx = HandlerContext { users: &users, app: &app };

        let mail = welcome_mail(&ctx, &WelcomeMail { email: "ada@example.com".into() })
            .await
            .unwrap();
        assert_eq!(mail.recipient, "ada@example.com");
        assert_eq!(mail.subject, WELCOME_SUBJECT);
        assert_eq!(mail.template, "welcome-email");
        assert_eq!(mail.data["firstname"], json!("Ada"));
        assert!(!mail.data.contains_key("business_name"));
    }

    #[tokio::test]
    async fn test_empty_first_name_falls_back_to_email() {
        let users = directory();
        let app = app();
        let ctx = HandlerContext { users: &users, app: &app };

        let mail = magic_link(
            &ctx,
            &MagicLink {
                email: "nameless@example.com".into(),
                magic_link: "https://app.example.com/m/abc".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(mail.data["firstname"], json!("nameless@example.com"));
        assert_eq!(mail.subject, MAGIC_LINK_SUBJECT);
    }

    #[tokio::test]
    async fn test_missing_user_is_not_found() {
        let users = directory();
        let app = app();
        let ctx = HandlerContext { users: &users, app: &app };

        let err = otp(&ctx, &Otp { email: "ghost@example.com".into(), otp_token: 1 })
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::NotFound(email) if email == "ghost@example.com"));
    }

    #[tokio::test]
    async fn test_otp_subject_embeds_code() {
        let users = directory();
        let app = app();
        let ctx = HandlerContext { users: &users, app: &app };

        let mail = otp(&ctx, &Otp { email: "ada@example.com".into(), otp_token: 482913 })
            .await
            .unwrap();
        assert_eq!(mail.subject, "Secure Login: Your OTP Code Is: 482913");
        assert_eq!(mail.data["otp_token"], json!(482913));
    }

    #[tokio::test]
    async fn test_links_are_built_from_app_url() {
        let users = directory();
        let app = app();
        let ctx = HandlerContext { users: &users, app: &app };

        let reset = reset_password(&ctx, &ResetPassword { email: "ada@example.com".into(), token: 7 })
            .await
            .unwrap();
        assert_eq!(
            reset.data["password_reset_url"],
            json!("https://app.example.com/reset-password/")
        );

        let verify = email_verification(
            &ctx,
            &EmailVerification {
                email: "ada@example.com".into(),
                code: 1234,
                token: "tok".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(
            verify.data["verification_url"],
            json!("https://app.example.com/email-verify/")
        );
        assert_eq!(verify.template, "email_verification");
    }

    #[tokio::test]
    async fn test_contact_us_sends_to_payload_email_without_lookup() {
        let users = InMemoryUserDirectory::new();
        let app = app();
        let ctx = HandlerContext { users: &users, app: &app };

        let mail = contact_us(
            &ctx,
            &ContactUs {
                name: String::new(),
                email: "a@b.com".into(),
                subject: "Hi".into(),
                message: "Hello".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(mail.recipient, "a@b.com");
        assert_eq!(mail.template, "default");
        assert_eq!(mail.data["firstname"], json!("a@b.com"));
        assert_eq!(mail.data["message"], json!("Hello"));
    }

    #[tokio::test]
    async fn test_squeeze_uses_payload_first_name() {
        let users = InMemoryUserDirectory::new();
        let app = app();
        let ctx = HandlerContext { users: &users, app: &app };

        let mail = squeeze(
            &ctx,
            &Squeeze {
                first_name: "Grace".into(),
                last_name: "Hopper".into(),
                email: "grace@example.com".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(mail.recipient, "grace@example.com");
        assert_eq!(mail.data["firstname"], json!("Grace"));
        assert_eq!(mail.subject, SQUEEZE_SUBJECT);
    }

    #[test]
    fn test_common_template_data() {
        let mut data = Map::new();
        add_common_template_data(&mut data, &app());

        assert_eq!(data["faq"], json!("https://app.example.com/faq"));
        assert_eq!(data["dashboard"], json!("https://app.example.com/login"));
        assert_eq!(data["business_logo_uri"], json!(""));
        assert_eq!(data["app_name"], json!("Acme"));
        assert_eq!(data["year"], json!(chrono::Utc::now().year()));
    }

    #[test]
    fn test_dashboard_points_at_account() {
        let mut data = Map::new();
        data.insert("account_id".into(), json!(42));
        add_common_template_data(&mut data, &app());
        assert_eq!(
            data["dashboard"],
            json!("https://app.example.com/login?account-id=42")
        );

        let mut data = Map::new();
        data.insert("account_id".into(), json!("17"));
        add_common_template_data(&mut data, &app());
        assert_eq!(
            data["dashboard"],
            json!("https://app.example.com/login?account-id=17")
        );

        let mut data = Map::new();
        data.insert("account_id".into(), json!(0));
        add_common_template_data(&mut data, &app());
        assert_eq!(data["dashboard"], json!("https://app.example.com/login"));
    }
}
