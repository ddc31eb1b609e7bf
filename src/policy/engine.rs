//! Withdrawal Policy Engine
//!
//! Pure mapping from wall-clock time to the withdrawal window and limits.
//! All decisions use the local time of the configured time zone.

use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::Serialize;

use super::{WithdrawalLimits, WithdrawalPolicyConfig};

const MINUTES_PER_DAY: i64 = 24 * 60;

/// Whether withdrawals are currently permitted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WindowStatus {
    pub open: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Limits tier selected for an instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyTier {
    Weekend,
    BusinessHours,
    AfterHours,
}

#[derive(Debug, Clone)]
pub struct WithdrawalPolicy {
    config: WithdrawalPolicyConfig,
    timezone: Tz,
}

impl WithdrawalPolicy {
    pub fn new(config: WithdrawalPolicyConfig, timezone: Tz) -> Self {
        Self { config, timezone }
    }

    pub fn config(&self) -> &WithdrawalPolicyConfig {
        &self.config
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    pub fn local_time(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.timezone)
    }

    fn in_blackout(&self, hour: u32) -> bool {
        let start = self.config.blackout_start_hour;
        let end = self.config.blackout_end_hour;
        if start > end {
            hour >= start || hour < end
        } else {
            hour >= start && hour < end
        }
    }

    /// Hard blackout check. Applies every day of the week.
    pub fn withdrawal_window(&self, now: DateTime<Utc>) -> WindowStatus {
        let hour = self.local_time(now).hour();
        if self.in_blackout(hour) {
            return WindowStatus {
                open: false,
                reason: Some(format!(
                    "withdrawals are not allowed between {:02}:00 and {:02}:00",
                    self.config.blackout_start_hour, self.config.blackout_end_hour
                )),
            };
        }

        WindowStatus {
            open: true,
            reason: None,
        }
    }

    pub fn tier_for(&self, now: DateTime<Utc>) -> PolicyTier {
        let local = self.local_time(now);
        if matches!(local.weekday(), Weekday::Sat | Weekday::Sun) {
            return PolicyTier::Weekend;
        }

        let hour = local.hour();
        if hour >= self.config.blackout_end_hour && hour < self.config.business_hours_end_hour {
            PolicyTier::BusinessHours
        } else {
            PolicyTier::AfterHours
        }
    }

    pub fn limits_for(&self, now: DateTime<Utc>) -> WithdrawalLimits {
        match self.tier_for(now) {
            PolicyTier::Weekend => self.config.weekend,
            PolicyTier::BusinessHours => self.config.business_hours,
            PolicyTier::AfterHours => self.config.after_hours,
        }
    }

    /// Half-open UTC range `[start, end)` covering the local calendar day of `now`
    pub fn day_bounds(&self, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
        let date = self.local_time(now).date_naive();
        let start = self.local_midnight(date);
        let end = date
            .succ_opt()
            .map(|next| self.local_midnight(next))
            .unwrap_or_else(|| start + chrono::Duration::days(1));
        (start, end)
    }

    /// Local calendar `(month, year)` of `now`
    pub fn period_of(&self, now: DateTime<Utc>) -> (u32, i32) {
        let local = self.local_time(now);
        (local.month(), local.year())
    }

    /// First instant of the local day. When a DST jump skips midnight the
    /// day starts at the first local minute after the gap.
    fn local_midnight(&self, date: NaiveDate) -> DateTime<Utc> {
        let midnight = date.and_time(NaiveTime::default());
        (0..MINUTES_PER_DAY)
            .map(|minute| midnight + chrono::Duration::minutes(minute))
            .find_map(|naive| self.timezone.from_local_datetime(&naive).earliest())
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| midnight.and_utc())
    }
}

impl Default for WithdrawalPolicy {
    fn default() -> Self {
        Self::new(WithdrawalPolicyConfig::default(), Tz::UTC)
    }
}
