//! Sign-in, trial window and subscription pricing.
//!
//! # Invariants
//! - A trial is expired iff `now > trial_start + 7 days`; pro users never expire.
//! - Sign-in checks configured accounts in the browser. It gates features for
//!   convenience only and is not a security boundary: anyone can read the
//!   configuration or edit the stored user.

use crate::config::{AccountEntry, EnvConfig};
use crate::models::{Tier, User};
use crate::util::DAY_MS;

pub const TRIAL_DAYS: i64 = 7;
pub const TRIAL_DURATION_MS: i64 = TRIAL_DAYS * DAY_MS;
pub const INVALID_CREDENTIALS_TEXT: &str = "Invalid credentials. Please try again.";

pub const BASE_PRICE: u32 = 499;
pub const REFERRAL_PRICE: u32 = 199;
pub const REFERRAL_CODE: &str = "OPTOBHARAT60";
pub const PAYEE_NAME: &str = "Focus AI";
pub const PAYMENT_NOTE: &str = "Focus AI Subscription (1 Year)";

impl User {
    fn trial_end(&self) -> Option<i64> {
        match (self.tier, self.trial_start_date) {
            (Tier::Trial, Some(start)) => Some(start.saturating_add(TRIAL_DURATION_MS)),
            _ => None,
        }
    }

    pub fn is_trial_expired(&self, now_ms: i64) -> bool {
        self.trial_end().is_some_and(|end| now_ms > end)
    }

    /// Whole days left, rounded up; `0` once over, `None` without a trial.
    pub fn trial_days_remaining(&self, now_ms: i64) -> Option<i64> {
        let remaining = self.trial_end()?.saturating_sub(now_ms);
        if remaining <= 0 {
            return Some(0);
        }
        Some(remaining / DAY_MS + i64::from(remaining % DAY_MS != 0))
    }
}

/// Accounts allowed to sign in, from configuration.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccountDirectory {
    accounts: Vec<AccountEntry>,
}

impl AccountDirectory {
    pub fn new(accounts: Vec<AccountEntry>) -> Self {
        Self { accounts }
    }

    pub fn from_config(config: &EnvConfig) -> Self {
        Self::new(config.accounts.clone())
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Exact username and password match. Trial accounts start their trial now.
    pub fn authenticate(&self, username: &str, password: &str, now_ms: i64) -> Option<User> {
        let entry = self
            .accounts
            .iter()
            .find(|a| a.username == username.trim() && a.password == password)?;
        let user = User {
            username: entry.display_name.clone().unwrap_or_else(|| entry.username.clone()),
            tier: entry.tier,
            trial_start_date: (entry.tier == Tier::Trial).then_some(now_ms),
        };
        log::info!(
            "event=sign_in module=account status=ok tier={}",
            user.tier
        );
        Some(user)
    }
}

/// Price for a subscription given the referral code typed by the user.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SubscriptionQuote {
    pub base_price: u32,
    pub final_price: u32,
    pub coupon: Option<&'static str>,
}

impl SubscriptionQuote {
    pub fn for_referral(code: &str) -> Self {
        let applies = code.trim().eq_ignore_ascii_case(REFERRAL_CODE);
        Self {
            base_price: BASE_PRICE,
            final_price: if applies { REFERRAL_PRICE } else { BASE_PRICE },
            coupon: applies.then_some(REFERRAL_CODE),
        }
    }

    pub fn has_discount(&self) -> bool {
        self.coupon.is_some()
    }

    pub fn discount(&self) -> u32 {
        self.base_price - self.final_price
    }

    /// `₹199.00` style amount.
    pub fn price_label(&self) -> String {
        format!("₹{}.00", self.final_price)
    }

    /// UPI deep link for a one-year subscription paid to `payee`.
    pub fn upi_link(&self, payee: &str) -> String {
        format!(
            "upi://pay?pa={}&pn={}&am={}.00&cu=INR&tn={}",
            urlencoding::encode(payee.trim()),
            urlencoding::encode(PAYEE_NAME),
            self.final_price,
            urlencoding::encode(PAYMENT_NOTE)
        )
    }
}
