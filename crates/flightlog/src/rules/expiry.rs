//! Day countdowns for the medical certificate and custom expiry fields.

use chrono::NaiveDate;
use serde::Serialize;

use super::dates::{calendar_days_between, parse_date};
use crate::settings::{CustomTrackingField, PilotProfile};

/// Countdown to an expiry date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExpiryStatus {
    /// The expiry date.
    pub expires_on: NaiveDate,
    /// Days from today; negative once past.
    pub days_until_expiry: i64,
    /// Inside the warning window, which includes already expired.
    pub warning: bool,
    /// Past the expiry date.
    pub expired: bool,
}

/// Count down from `today` to `expires_on`.
#[must_use]
pub fn evaluate_expiry(today: NaiveDate, expires_on: NaiveDate, warning_days: i64) -> ExpiryStatus {
    let days_until_expiry = calendar_days_between(today, expires_on);
    ExpiryStatus {
        expires_on,
        days_until_expiry,
        warning: days_until_expiry <= warning_days,
        expired: days_until_expiry < 0,
    }
}

/// How a custom field should be shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldStatus {
    /// Shown as-is, never alarmed.
    Informational {
        /// The raw value.
        value: String,
    },
    /// An expiry countdown.
    Expiry(ExpiryStatus),
}

/// A custom field with its evaluated status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldReport {
    /// Field id.
    pub id: String,
    /// Field name.
    pub name: String,
    /// Evaluated status.
    pub status: FieldStatus,
}

/// Evaluate one custom field.
///
/// Non-expiry fields are informational. An expiry field whose value is not a
/// readable date falls back to informational as well.
#[must_use]
pub fn evaluate_field(field: &CustomTrackingField, today: NaiveDate, default_warning_days: i64) -> FieldReport {
    let status = if field.is_expiry_field {
        parse_date(&field.value).map(|expires_on| {
            let warning_days = field.warning_days.unwrap_or(default_warning_days);
            FieldStatus::Expiry(evaluate_expiry(today, expires_on, warning_days))
        })
    } else {
        None
    };

    FieldReport {
        id: field.id.clone(),
        name: field.name.clone(),
        status: status.unwrap_or_else(|| FieldStatus::Informational {
            value: field.value.clone(),
        }),
    }
}

/// Expiry view of a pilot profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileExpiry {
    /// Medical countdown, when an expiry is recorded.
    pub medical: Option<ExpiryStatus>,
    /// Custom fields, in profile order.
    pub fields: Vec<FieldReport>,
}

impl ProfileExpiry {
    /// Whether anything is in its warning window.
    #[must_use]
    pub fn any_warning(&self) -> bool {
        self.medical.is_some_and(|m| m.warning)
            || self
                .fields
                .iter()
                .any(|f| matches!(f.status, FieldStatus::Expiry(s) if s.warning))
    }
}

/// Evaluate the medical and every custom field of `profile`.
#[must_use]
pub fn evaluate_profile(profile: &PilotProfile, today: NaiveDate) -> ProfileExpiry {
    let warning_days = profile.medical_warning_days;
    ProfileExpiry {
        medical: profile
            .medical_expiry
            .map(|expires_on| evaluate_expiry(today, expires_on, warning_days)),
        fields: profile
            .custom_tracking_fields
            .iter()
            .map(|field| evaluate_field(field, today, warning_days))
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::FieldType;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn field(value: &str, is_expiry_field: bool, warning_days: Option<i64>) -> CustomTrackingField {
        CustomTrackingField {
            id: "f1".to_string(),
            name: "Water survival".to_string(),
            field_type: if is_expiry_field { FieldType::Date } else { FieldType::Text },
            value: value.to_string(),
            is_expiry_field,
            warning_days,
        }
    }

    #[test]
    fn test_expiry_countdown() {
        let status = evaluate_expiry(date(2024, 5, 1), date(2024, 6, 15), 30);
        assert_eq!(status.days_until_expiry, 45);
        assert!(!status.warning);
        assert!(!status.expired);

        let status = evaluate_expiry(date(2024, 5, 16), date(2024, 6, 15), 30);
        assert_eq!(status.days_until_expiry, 30);
        assert!(status.warning);
    }

    #[test]
    fn test_expired_is_also_warning() {
        let status = evaluate_expiry(date(2024, 6, 20), date(2024, 6, 15), 30);
        assert_eq!(status.days_until_expiry, -5);
        assert!(status.warning);
        assert!(status.expired);
    }

    #[test]
    fn test_expiry_day_itself_is_not_expired() {
        let status = evaluate_expiry(date(2024, 6, 15), date(2024, 6, 15), 0);
        assert_eq!(status.days_until_expiry, 0);
        assert!(status.warning);
        assert!(!status.expired);
    }

    #[test]
    fn test_field_uses_its_own_warning_days() {
        let report = evaluate_field(&field("2024-08-01", true, Some(90)), date(2024, 6, 1), 30);
        match report.status {
            FieldStatus::Expiry(status) => {
                assert_eq!(status.days_until_expiry, 61);
                assert!(status.warning);
            }
            FieldStatus::Informational { .. } => panic!("expected expiry status"),
        }
    }

    #[test]
    fn test_non_expiry_field_is_informational() {
        let report = evaluate_field(&field("2024-06-02", false, Some(90)), date(2024, 6, 1), 30);
        assert_eq!(
            report.status,
            FieldStatus::Informational {
                value: "2024-06-02".to_string()
            }
        );
    }

    #[test]
    fn test_unreadable_expiry_value_is_informational() {
        let report = evaluate_field(&field("next spring", true, None), date(2024, 6, 1), 30);
        assert!(matches!(report.status, FieldStatus::Informational { .. }));
    }

    #[test]
    fn test_profile_expiry() {
        let profile = PilotProfile {
            name: Some("Test Pilot".to_string()),
            medical_expiry: Some(date(2024, 6, 20)),
            medical_warning_days: 30,
            custom_tracking_fields: vec![field("2025-01-01", true, Some(10))],
        };
        let expiry = evaluate_profile(&profile, date(2024, 6, 1));
        assert_eq!(expiry.medical.unwrap().days_until_expiry, 19);
        assert!(expiry.medical.unwrap().warning);
        assert!(expiry.any_warning());
        assert_eq!(expiry.fields.len(), 1);
    }

    #[test]
    fn test_profile_without_medical() {
        let expiry = evaluate_profile(&PilotProfile::default(), date(2024, 6, 1));
        assert!(expiry.medical.is_none());
        assert!(!expiry.any_warning());
    }
}
