//! Threshold evaluation for environmental readings.
//!
//! Given one temperature/humidity sample, decides whether an alert should be
//! raised and at what severity. Pure logic, no I/O.

use crate::entity::alert::{AlertType, Severity};

/// Acceptable temperature band, degrees Celsius.
pub const TEMPERATURE_MIN: f64 = 18.0;
pub const TEMPERATURE_MAX: f64 = 26.0;
/// Beyond these the temperature rule escalates straight to Critical.
pub const TEMPERATURE_CRITICAL_MIN: f64 = 15.0;
pub const TEMPERATURE_CRITICAL_MAX: f64 = 30.0;
/// Acceptable relative humidity band, percent.
pub const HUMIDITY_MIN: f64 = 30.0;
pub const HUMIDITY_MAX: f64 = 60.0;

/// An alert the evaluator wants raised, not yet persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
}

/// Evaluate one reading against the fixed environmental thresholds.
///
/// Each rule is checked independently; messages of all fired rules are
/// joined with " and ". Severity starts at Low and only ever escalates:
/// humidity rules contribute Medium, temperature rules Medium or Critical
/// depending on how far outside the band the value lies. The alert type is
/// Environmental when both dimensions fired, otherwise the single dimension
/// that did.
///
/// Returns `None` when the reading is within bounds on both dimensions.
pub fn evaluate(temperature: f64, humidity: f64) -> Option<AlertDraft> {
    let mut messages: Vec<String> = Vec::new();
    let mut severity = Severity::Low;
    let mut temperature_fired = false;
    let mut humidity_fired = false;

    if temperature < TEMPERATURE_MIN {
        messages.push(format!("Temperature too low ({temperature}°C)"));
        severity = severity.max(if temperature < TEMPERATURE_CRITICAL_MIN {
            Severity::Critical
        } else {
            Severity::Medium
        });
        temperature_fired = true;
    }
    if temperature > TEMPERATURE_MAX {
        messages.push(format!("Temperature too high ({temperature}°C)"));
        severity = severity.max(if temperature > TEMPERATURE_CRITICAL_MAX {
            Severity::Critical
        } else {
            Severity::Medium
        });
        temperature_fired = true;
    }
    if humidity < HUMIDITY_MIN {
        messages.push(format!("Humidity too low ({humidity}%)"));
        severity = severity.max(Severity::Medium);
        humidity_fired = true;
    }
    if humidity > HUMIDITY_MAX {
        messages.push(format!("Humidity too high ({humidity}%)"));
        severity = severity.max(Severity::Medium);
        humidity_fired = true;
    }

    if messages.is_empty() {
        return None;
    }

    let alert_type = match (temperature_fired, humidity_fired) {
        (true, true) => AlertType::Environmental,
        (true, false) => AlertType::Temperature,
        _ => AlertType::Humidity,
    };

    Some(AlertDraft {
        alert_type,
        severity,
        message: messages.join(" and "),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_band_reading_raises_nothing() {
        assert_eq!(evaluate(22.0, 45.0), None);
        // Band edges are inclusive.
        assert_eq!(evaluate(18.0, 30.0), None);
        assert_eq!(evaluate(26.0, 60.0), None);
    }

    #[test]
    fn very_cold_room_is_critical() {
        let draft = evaluate(14.0, 45.0).unwrap();
        assert_eq!(draft.severity, Severity::Critical);
        assert_eq!(draft.alert_type, AlertType::Temperature);
        assert!(draft.message.contains("too low"));
    }

    #[test]
    fn slightly_cold_room_is_medium() {
        let draft = evaluate(17.0, 50.0).unwrap();
        assert_eq!(draft.severity, Severity::Medium);
        assert_eq!(draft.alert_type, AlertType::Temperature);
    }

    #[test]
    fn critical_boundary_is_exclusive() {
        // Exactly 15°C is below the band but not below the critical bound.
        assert_eq!(evaluate(15.0, 45.0).unwrap().severity, Severity::Medium);
        assert_eq!(evaluate(30.0, 45.0).unwrap().severity, Severity::Medium);
        assert_eq!(evaluate(14.9, 45.0).unwrap().severity, Severity::Critical);
        assert_eq!(evaluate(30.1, 45.0).unwrap().severity, Severity::Critical);
    }

    #[test]
    fn humid_room_is_medium_humidity_alert() {
        let draft = evaluate(22.0, 65.0).unwrap();
        assert_eq!(draft.severity, Severity::Medium);
        assert_eq!(draft.alert_type, AlertType::Humidity);
        assert!(draft.message.contains("too high"));
    }

    #[test]
    fn dry_room_is_medium_humidity_alert() {
        let draft = evaluate(22.0, 20.0).unwrap();
        assert_eq!(draft.severity, Severity::Medium);
        assert_eq!(draft.alert_type, AlertType::Humidity);
        assert!(draft.message.contains("too low"));
    }

    #[test]
    fn both_dimensions_firing_is_environmental() {
        let draft = evaluate(31.0, 20.0).unwrap();
        assert_eq!(draft.alert_type, AlertType::Environmental);
        // Temperature extreme wins the severity escalation.
        assert_eq!(draft.severity, Severity::Critical);
        assert!(draft.message.contains("Temperature too high"));
        assert!(draft.message.contains("Humidity too low"));
        assert!(draft.message.contains(" and "));
    }

    #[test]
    fn humidity_rule_never_lowers_temperature_severity() {
        // Critical from temperature must survive a Medium humidity rule
        // evaluated afterwards.
        let draft = evaluate(12.0, 65.0).unwrap();
        assert_eq!(draft.severity, Severity::Critical);
    }
}
