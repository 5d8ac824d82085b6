//! Per-user requirement settings and profile data.
//!
//! These are plain snapshots; the rules read them and never write back.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::flight::ModeFilter;
use crate::rules::dates::lenient;

/// Default currency lookback in days.
pub const DEFAULT_CURRENCY_PERIOD_DAYS: u32 = 60;

/// Default medical warning lead time in days.
pub const DEFAULT_MEDICAL_WARNING_DAYS: i64 = 30;

/// NG/NS currency thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencySettings {
    /// Hours of NG required in the trailing window. Zero disables NG tracking.
    pub ng_required_hours: f64,
    /// Hours of NS required in the trailing window. Zero disables NS tracking.
    pub ns_required_hours: f64,
    /// Length of the currency window in days.
    pub currency_period_days: u32,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        Self {
            ng_required_hours: 1.0,
            ns_required_hours: 1.0,
            currency_period_days: DEFAULT_CURRENCY_PERIOD_DAYS,
        }
    }
}

impl CurrencySettings {
    /// Check the window length and thresholds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] naming the first bad value.
    pub fn validate(&self) -> Result<()> {
        if self.currency_period_days == 0 {
            return Err(Error::invalid_input(
                "currency_period_days must be greater than 0",
            ));
        }

        for (name, value) in [
            ("ng_required_hours", self.ng_required_hours),
            ("ns_required_hours", self.ns_required_hours),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::invalid_input(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }

        Ok(())
    }
}

/// A user-defined sub-quota inside the semi-annual period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomRequirement {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Hours required in the period.
    #[serde(default)]
    pub required_hours: f64,
    /// Mode filter; `None` counts every mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<ModeFilter>,
    /// Seat filter; `None` counts every seat.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seat_position: Option<String>,
    /// Count simulator sessions instead of aircraft flights.
    #[serde(default)]
    pub is_simulator: bool,
}

/// Semi-annual flight-hour requirements.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SemiannualSettings {
    /// First day of period one.
    #[serde(with = "lenient")]
    pub period_one_start: Option<NaiveDate>,
    /// Last day of period one.
    #[serde(with = "lenient")]
    pub period_one_end: Option<NaiveDate>,
    /// First day of period two.
    #[serde(with = "lenient")]
    pub period_two_start: Option<NaiveDate>,
    /// Last day of period two.
    #[serde(with = "lenient")]
    pub period_two_end: Option<NaiveDate>,
    /// Aircraft counted toward `required_hours`; `None` or "All Aircraft" counts all.
    pub aircraft_type: Option<String>,
    /// Simulator type counted toward `simulator_required_hours`.
    pub simulator_aircraft_type: Option<String>,
    /// Aircraft hours required in the period.
    pub required_hours: f64,
    /// Simulator hours required in the period. Zero means no simulator quota.
    pub simulator_required_hours: f64,
    /// Additional quotas, in the user's chosen order.
    pub custom_fields: Vec<CustomRequirement>,
}

impl SemiannualSettings {
    /// Move the custom field at `from` so it ends up at index `to`.
    ///
    /// # Errors
    ///
    /// Returns an error if either index is out of range.
    pub fn move_custom_field(&mut self, from: usize, to: usize) -> Result<()> {
        let len = self.custom_fields.len();
        if from >= len || to >= len {
            return Err(Error::invalid_input(format!(
                "cannot move custom field {from} to {to}: only {len} fields"
            )));
        }
        let field = self.custom_fields.remove(from);
        self.custom_fields.insert(to, field);
        Ok(())
    }
}

/// Kind of value a custom tracking field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// A calendar date.
    Date,
    /// A number.
    Number,
    /// Free text.
    #[default]
    Text,
    /// An hour count.
    Hours,
}

/// A user-defined profile field, optionally counting down to an expiry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomTrackingField {
    /// Stable identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Kind of value.
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    /// Raw value as entered.
    #[serde(default)]
    pub value: String,
    /// Whether `value` is an expiry date to count down to.
    #[serde(default)]
    pub is_expiry_field: bool,
    /// Warning lead time; the medical default applies when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning_days: Option<i64>,
}

/// Pilot profile data relevant to expiry tracking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PilotProfile {
    /// Pilot name, for report headers.
    pub name: Option<String>,
    /// Medical certificate expiry.
    #[serde(with = "lenient")]
    pub medical_expiry: Option<NaiveDate>,
    /// Days before medical expiry to start warning.
    pub medical_warning_days: i64,
    /// User-defined fields, in display order.
    pub custom_tracking_fields: Vec<CustomTrackingField>,
}

impl Default for PilotProfile {
    fn default() -> Self {
        Self {
            name: None,
            medical_expiry: None,
            medical_warning_days: DEFAULT_MEDICAL_WARNING_DAYS,
            custom_tracking_fields: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flight::FlightMode;

    fn requirement(id: &str) -> CustomRequirement {
        CustomRequirement {
            id: id.to_string(),
            name: id.to_uppercase(),
            required_hours: 1.0,
            mode: None,
            seat_position: None,
            is_simulator: false,
        }
    }

    #[test]
    fn test_currency_defaults() {
        let settings = CurrencySettings::default();
        assert_eq!(settings.currency_period_days, 60);
        assert!((settings.ng_required_hours - 1.0).abs() < f64::EPSILON);
        assert!((settings.ns_required_hours - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_currency_validate() {
        assert!(CurrencySettings::default().validate().is_ok());

        let zero_period = CurrencySettings {
            currency_period_days: 0,
            ..CurrencySettings::default()
        };
        let err = zero_period.validate().unwrap_err();
        assert!(matches!(err, Error::InvalidInput { .. }));
        assert!(err.to_string().contains("currency_period_days"));

        let negative: CurrencySettings =
            serde_json::from_str(r#"{"ng_required_hours": -0.5}"#).unwrap();
        assert!(negative
            .validate()
            .unwrap_err()
            .to_string()
            .contains("ng_required_hours"));

        let disabled = CurrencySettings {
            ng_required_hours: 0.0,
            ..CurrencySettings::default()
        };
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn test_currency_partial_document_uses_defaults() {
        let settings: CurrencySettings =
            serde_json::from_str(r#"{"ns_required_hours": 0}"#).unwrap();
        assert_eq!(settings.currency_period_days, 60);
        assert!(settings.ns_required_hours.abs() < f64::EPSILON);
    }

    #[test]
    fn test_semiannual_malformed_dates_read_as_unset() {
        let json = r#"{
            "period_one_start": "2024-01-01",
            "period_one_end": "end of june",
            "period_two_start": null,
            "required_hours": 48,
            "custom_fields": [
                {"id": "nvd", "name": "NVD", "required_hours": 12, "mode": "NVD"}
            ]
        }"#;
        let settings: SemiannualSettings = serde_json::from_str(json).unwrap();
        assert!(settings.period_one_start.is_some());
        assert!(settings.period_one_end.is_none());
        assert!(settings.period_two_start.is_none());
        assert_eq!(settings.custom_fields[0].mode, Some(ModeFilter::Nvd));
    }

    #[test]
    fn test_custom_requirement_mode_serializes_as_code() {
        let mut req = requirement("ng");
        req.mode = Some(ModeFilter::Exact(FlightMode::NightGoggle));
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains(r#""mode":"NG""#));
    }

    #[test]
    fn test_move_custom_field_preserves_others() {
        let mut settings = SemiannualSettings {
            custom_fields: vec![requirement("a"), requirement("b"), requirement("c")],
            ..SemiannualSettings::default()
        };
        settings.move_custom_field(2, 0).unwrap();
        let ids: Vec<_> = settings.custom_fields.iter().map(|f| f.id.as_str()).collect();
        assert_eq!(ids, ["c", "a", "b"]);
    }

    #[test]
    fn test_move_custom_field_out_of_range() {
        let mut settings = SemiannualSettings {
            custom_fields: vec![requirement("a")],
            ..SemiannualSettings::default()
        };
        assert!(settings.move_custom_field(0, 3).is_err());
    }

    #[test]
    fn test_tracking_field_type_key() {
        let json = r#"{"id": "pp", "name": "Passport", "type": "date",
                       "value": "2030-01-01", "is_expiry_field": true, "warning_days": 90}"#;
        let field: CustomTrackingField = serde_json::from_str(json).unwrap();
        assert_eq!(field.field_type, FieldType::Date);
        assert_eq!(field.warning_days, Some(90));
    }

    #[test]
    fn test_profile_default_warning_days() {
        let profile: PilotProfile = serde_json::from_str("{}").unwrap();
        assert_eq!(profile.medical_warning_days, 30);
        assert!(profile.medical_expiry.is_none());
    }
}
