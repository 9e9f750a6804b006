//! One-way webhook notifications: waitlist signups and subscription payment
//! proofs. Posts carry a chat-webhook embed; nothing is read back beyond the
//! status code.

use crate::account::SubscriptionQuote;
use crate::util::now_rfc3339;
use regex::Regex;
use serde_json::{json, Value};
use std::sync::OnceLock;
use thiserror::Error;

pub const MAX_SCREENSHOT_BYTES: usize = 8 * 1024 * 1024;
pub const INVALID_FORM_TEXT: &str = "Please fill in all required fields with valid information.";
pub const SCREENSHOT_TOO_LARGE_TEXT: &str = "File is too large. Max size is 8MB.";
pub const SCREENSHOT_MISSING_TEXT: &str = "Please upload a payment screenshot to submit.";

pub const ROLES: [&str; 6] = [
    "Student (B.Sc Optometry)",
    "Student (M.Sc Optometry)",
    "Student (PhD)",
    "Practicing Optometrist",
    "Lecturer/Educator",
    "Other",
];
pub const YEARS_OF_STUDY: [&str; 5] = ["1st Year", "2nd Year", "3rd Year", "4th Year / Intern", "Postgraduate"];
pub const REGIONS: [&str; 6] = [
    "North India",
    "South India",
    "East India",
    "West India",
    "Central India",
    "Northeast India",
];

const AVATAR_URL: &str = "https://i.imgur.com/8z2aPjT.png";
const COLOR_BLUE: u32 = 3_447_003;
const COLOR_GREEN: u32 = 3_066_993;
const COLOR_PLAIN: u32 = 5_814_783;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("{0}")]
    Validation(String),
    #[error("notifications are not configured")]
    NotConfigured,
    #[error("network error: {0}")]
    Network(String),
    #[error("webhook rejected the request ({status})")]
    Rejected { status: u16 },
}

impl NotifyError {
    pub fn user_message(&self) -> String {
        match self {
            NotifyError::Validation(msg) => msg.clone(),
            _ => "There was an error submitting your request. Please try again later.".to_string(),
        }
    }
}

pub type NotifyResult<T = ()> = Result<T, NotifyError>;

fn email_regex() -> Option<&'static Regex> {
    static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();
    EMAIL
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
}

pub fn is_valid_email(email: &str) -> bool {
    email_regex().is_some_and(|re| re.is_match(email.trim()))
}

fn field(name: &str, value: &str, inline: bool) -> Value {
    json!({ "name": name, "value": value, "inline": inline })
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WaitlistSignup {
    pub full_name: String,
    pub email: String,
    pub role: String,
    pub year_of_study: String,
    pub region: String,
}

impl WaitlistSignup {
    /// Students must also give their year of study.
    pub fn is_student(&self) -> bool {
        self.role.to_lowercase().contains("student")
    }

    pub fn validate(&self) -> NotifyResult {
        let missing = [&self.full_name, &self.email, &self.role, &self.region]
            .iter()
            .any(|v| v.trim().is_empty());
        if missing
            || !is_valid_email(&self.email)
            || (self.is_student() && self.year_of_study.trim().is_empty())
        {
            return Err(NotifyError::Validation(INVALID_FORM_TEXT.to_string()));
        }
        Ok(())
    }

    pub fn payload(&self, timestamp: &str) -> Value {
        let mut fields = vec![
            field("👤 Full Name", self.full_name.trim(), true),
            field("✉️ Email", self.email.trim(), true),
            field("🎓 Role/Level", self.role.trim(), false),
        ];
        if self.is_student() {
            fields.push(field("🗓️ Year of Study", self.year_of_study.trim(), true));
        }
        fields.push(field("📍 Region", self.region.trim(), true));

        json!({
            "username": "Focus.AI Waitlist Bot",
            "avatar_url": AVATAR_URL,
            "embeds": [{
                "title": "📬 New Waitlist Signup!",
                "description": "A new user has requested to join the free trial waitlist.",
                "color": COLOR_BLUE,
                "fields": fields,
                "timestamp": timestamp,
                "footer": { "text": "Focus.AI Waitlist Notification" },
            }],
        })
    }
}

/// Payment screenshot read from the file picker.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Screenshot {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl Screenshot {
    /// Size check done as soon as a file is picked.
    pub fn check_size(size: usize) -> NotifyResult {
        if size > MAX_SCREENSHOT_BYTES {
            Err(NotifyError::Validation(SCREENSHOT_TOO_LARGE_TEXT.to_string()))
        } else {
            Ok(())
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionApplication {
    pub full_name: String,
    pub email: String,
    pub is_member: bool,
    pub quote: SubscriptionQuote,
    pub screenshot: Option<Screenshot>,
}

impl SubscriptionApplication {
    pub fn validate(&self) -> NotifyResult<&Screenshot> {
        if self.full_name.trim().is_empty() || !is_valid_email(&self.email) {
            return Err(NotifyError::Validation(INVALID_FORM_TEXT.to_string()));
        }
        let shot = self
            .screenshot
            .as_ref()
            .ok_or_else(|| NotifyError::Validation(SCREENSHOT_MISSING_TEXT.to_string()))?;
        Screenshot::check_size(shot.bytes.len())?;
        Ok(shot)
    }

    pub fn payload(&self, file_name: &str, timestamp: &str) -> Value {
        let discounted = self.quote.has_discount();
        let coupon = self
            .quote
            .coupon
            .map(|c| format!("`{c}`"))
            .unwrap_or_else(|| "None".to_string());
        let (description, color) = if discounted {
            ("✨ **Referred by OPTOBHARAT!** ✨", COLOR_GREEN)
        } else {
            ("Standard Subscription.", COLOR_PLAIN)
        };
        json!({
            "username": "Focus.AI Subscriptions",
            "avatar_url": AVATAR_URL,
            "embeds": [{
                "title": "New Subscription Initiated!",
                "description": description,
                "color": color,
                "fields": [
                    field("Full Name", self.full_name.trim(), true),
                    field("Email", self.email.trim(), true),
                    field("OPTOBHARAT Member", if self.is_member { "Yes" } else { "No" }, true),
                    field("Coupon Used", &coupon, true),
                    field("Final Price", &self.quote.price_label(), true),
                ],
                "timestamp": timestamp,
                "footer": { "text": "Focus.AI Notification" },
                "image": { "url": format!("attachment://{file_name}") },
            }],
        })
    }
}

/// Posts notifications to the configured webhook URLs.
#[derive(Clone, Debug, Default)]
pub struct Notifier {
    waitlist_url: Option<String>,
    subscription_url: Option<String>,
}

impl Notifier {
    pub fn new(waitlist_url: Option<String>, subscription_url: Option<String>) -> Self {
        Self {
            waitlist_url,
            subscription_url,
        }
    }

    pub fn from_config(config: &crate::config::EnvConfig) -> Self {
        Self::new(
            config.waitlist_webhook_url.clone(),
            config.subscription_webhook_url.clone(),
        )
    }

    fn check(res: reqwest::Response, what: &str) -> NotifyResult {
        let status = res.status();
        if status.is_success() {
            log::info!("event=notify module=notify status=ok kind={what}");
            Ok(())
        } else {
            log::error!(
                "event=notify module=notify status=error kind={what} http_status={}",
                status.as_u16()
            );
            Err(NotifyError::Rejected {
                status: status.as_u16(),
            })
        }
    }

    pub async fn join_waitlist(&self, signup: &WaitlistSignup) -> NotifyResult {
        signup.validate()?;
        let url = self.waitlist_url.as_deref().ok_or(NotifyError::NotConfigured)?;
        let res = reqwest::Client::new()
            .post(url)
            .json(&signup.payload(&now_rfc3339()))
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;
        Self::check(res, "waitlist")
    }

    pub async fn apply_for_subscription(&self, application: &SubscriptionApplication) -> NotifyResult {
        let shot = application.validate()?;
        let url = self.subscription_url.as_deref().ok_or(NotifyError::NotConfigured)?;
        let payload = application.payload(&shot.file_name, &now_rfc3339());

        let file = reqwest::multipart::Part::bytes(shot.bytes.clone())
            .file_name(shot.file_name.clone())
            .mime_str(&shot.mime_type)
            .map_err(|e| NotifyError::Validation(e.to_string()))?;
        let form = reqwest::multipart::Form::new()
            .text("payload_json", payload.to_string())
            .part("file1", file);

        let res = reqwest::Client::new()
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;
        Self::check(res, "subscription")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;

    fn signup(role: &str, year: &str) -> WaitlistSignup {
        WaitlistSignup {
            full_name: "Asha R".into(),
            email: "asha@example.com".into(),
            role: role.into(),
            year_of_study: year.into(),
            region: "Tamil Nadu".into(),
        }
    }

    #[test]
    fn test_email_pattern() {
        assert!(is_valid_email("a@b.co"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.d"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn test_waitlist_requires_year_for_students() {
        assert!(signup("Optometry Student", "").validate().is_err());
        assert!(signup("Optometry Student", "3rd year").validate().is_ok());
        assert!(signup("Practitioner", "").validate().is_ok());

        let mut missing_region = signup("Practitioner", "");
        missing_region.region = " ".into();
        assert_eq!(
            missing_region.validate(),
            Err(NotifyError::Validation(INVALID_FORM_TEXT.to_string()))
        );
    }

    #[test]
    fn test_role_list_marks_students() {
        let students = ROLES
            .iter()
            .filter(|r| {
                WaitlistSignup {
                    role: r.to_string(),
                    ..WaitlistSignup::default()
                }
                .is_student()
            })
            .count();
        assert_eq!(students, 3);
    }

    #[test]
    fn test_waitlist_payload_fields() {
        let student = signup("Student", "2nd year").payload("2026-01-01T00:00:00Z");
        let fields = student["embeds"][0]["fields"].as_array().cloned().unwrap_or_default();
        let names: Vec<&str> = fields.iter().filter_map(|f| f["name"].as_str()).collect();
        assert_eq!(
            names,
            vec!["👤 Full Name", "✉️ Email", "🎓 Role/Level", "🗓️ Year of Study", "📍 Region"]
        );
        assert_eq!(student["embeds"][0]["timestamp"], "2026-01-01T00:00:00Z");

        let other = signup("Practitioner", "").payload("t");
        assert_eq!(other["embeds"][0]["fields"].as_array().map(Vec::len), Some(4));
    }

    fn application(bytes: usize) -> SubscriptionApplication {
        SubscriptionApplication {
            full_name: "Asha R".into(),
            email: "asha@example.com".into(),
            is_member: true,
            quote: SubscriptionQuote::for_referral("OPTOBHARAT60"),
            screenshot: Some(Screenshot {
                file_name: "pay.png".into(),
                mime_type: "image/png".into(),
                bytes: vec![0; bytes],
            }),
        }
    }

    #[test]
    fn test_subscription_screenshot_rules() {
        assert!(application(10).validate().is_ok());
        assert_eq!(
            application(MAX_SCREENSHOT_BYTES + 1).validate().map(|_| ()),
            Err(NotifyError::Validation(SCREENSHOT_TOO_LARGE_TEXT.to_string()))
        );
        let mut none = application(1);
        none.screenshot = None;
        assert_eq!(
            none.validate().map(|_| ()),
            Err(NotifyError::Validation(SCREENSHOT_MISSING_TEXT.to_string()))
        );
        assert!(Screenshot::check_size(MAX_SCREENSHOT_BYTES).is_ok());
    }

    #[test]
    fn test_subscription_payload() {
        let payload = application(1).payload("pay.png", "t");
        let embed = &payload["embeds"][0];
        assert_eq!(embed["color"], COLOR_GREEN);
        assert_eq!(embed["image"]["url"], "attachment://pay.png");
        assert_eq!(embed["fields"][3]["value"], "`OPTOBHARAT60`");
        assert_eq!(embed["fields"][4]["value"], "₹199.00");
        assert_eq!(embed["fields"][2]["value"], "Yes");
    }

    #[test]
    fn test_unconfigured_notifier_fails_after_validation() {
        let notifier = Notifier::default();
        assert_eq!(
            block_on(notifier.join_waitlist(&signup("Practitioner", ""))),
            Err(NotifyError::NotConfigured)
        );
        assert!(matches!(
            block_on(notifier.join_waitlist(&WaitlistSignup::default())),
            Err(NotifyError::Validation(_))
        ));
    }
}
