//! Alert data models

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

use super::reading::WeatherReading;

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Low
    Low,
    /// Medium
    Medium,
    /// High
    High,
    /// Critical
    Critical,
}

impl Severity {
    /// Upper-case label used in messages and storage
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "LOW",
            Severity::Medium => "MEDIUM",
            Severity::High => "HIGH",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Severity {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOW" => Ok(Severity::Low),
            "MEDIUM" => Ok(Severity::Medium),
            "HIGH" => Ok(Severity::High),
            "CRITICAL" => Ok(Severity::Critical),
            other => Err(Error::validation(format!("unknown severity: {other}"))),
        }
    }
}

/// Identifier of a trigger in the fixed catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    /// Temperature above threshold in the evening with wind
    ExtremeHeatEvening,
    /// High winds with low visibility
    DustStormWarning,
    /// Temperature above threshold during daytime
    ExtremeHeatDay,
    /// Heavy rain with strong winds
    MonsoonAlert,
}

impl TriggerKind {
    /// Stable string key
    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::ExtremeHeatEvening => "extreme_heat_evening",
            TriggerKind::DustStormWarning => "dust_storm_warning",
            TriggerKind::ExtremeHeatDay => "extreme_heat_day",
            TriggerKind::MonsoonAlert => "monsoon_alert",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TriggerKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "extreme_heat_evening" => Ok(TriggerKind::ExtremeHeatEvening),
            "dust_storm_warning" => Ok(TriggerKind::DustStormWarning),
            "extreme_heat_day" => Ok(TriggerKind::ExtremeHeatDay),
            "monsoon_alert" => Ok(TriggerKind::MonsoonAlert),
            other => Err(Error::validation(format!("unknown trigger: {other}"))),
        }
    }
}

/// Predicate of a trigger, with its named thresholds
///
/// Temperature thresholds are strict (`>`); wind, visibility, rain and hour
/// bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TriggerCondition {
    /// `temperature > temp_threshold && hour >= time_after && wind_speed >= wind_speed_min`
    ExtremeHeatEvening {
        temp_threshold: f64,
        time_after: u32,
        wind_speed_min: f64,
    },
    /// `wind_speed >= wind_speed_min && visibility <= visibility_max`
    DustStorm {
        wind_speed_min: f64,
        visibility_max: f64,
    },
    /// `temperature > temp_threshold && start_hour <= hour <= end_hour`
    ExtremeHeatDay {
        temp_threshold: f64,
        start_hour: u32,
        end_hour: u32,
    },
    /// `rain_1h >= rain_threshold && wind_speed >= wind_speed_min`
    Monsoon {
        rain_threshold: f64,
        wind_speed_min: f64,
    },
}

impl TriggerCondition {
    /// The trigger this condition belongs to
    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerCondition::ExtremeHeatEvening { .. } => TriggerKind::ExtremeHeatEvening,
            TriggerCondition::DustStorm { .. } => TriggerKind::DustStormWarning,
            TriggerCondition::ExtremeHeatDay { .. } => TriggerKind::ExtremeHeatDay,
            TriggerCondition::Monsoon { .. } => TriggerKind::MonsoonAlert,
        }
    }

    /// Check if a reading at the given local hour satisfies this condition
    pub fn matches(&self, reading: &WeatherReading, hour: u32) -> bool {
        match *self {
            TriggerCondition::ExtremeHeatEvening {
                temp_threshold,
                time_after,
                wind_speed_min,
            } => {
                reading.temperature > temp_threshold
                    && hour >= time_after
                    && reading.wind_speed >= wind_speed_min
            }
            TriggerCondition::DustStorm {
                wind_speed_min,
                visibility_max,
            } => reading.wind_speed >= wind_speed_min && reading.visibility <= visibility_max,
            TriggerCondition::ExtremeHeatDay {
                temp_threshold,
                start_hour,
                end_hour,
            } => reading.temperature > temp_threshold && (start_hour..=end_hour).contains(&hour),
            TriggerCondition::Monsoon {
                rain_threshold,
                wind_speed_min,
            } => reading.rain_1h >= rain_threshold && reading.wind_speed >= wind_speed_min,
        }
    }
}

/// A named fixed predicate with an associated severity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertTrigger {
    /// Human-readable description
    pub description: String,

    /// Severity copied onto every alert this trigger produces
    pub severity: Severity,

    /// The predicate and its thresholds
    pub condition: TriggerCondition,
}

impl AlertTrigger {
    /// Create a new trigger
    pub fn new(
        condition: TriggerCondition,
        severity: Severity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            description: description.into(),
            severity,
            condition,
        }
    }

    /// Trigger identifier, derived from the condition variant
    pub fn kind(&self) -> TriggerKind {
        self.condition.kind()
    }
}

/// An alert produced by one fired trigger for one reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// The trigger that fired
    #[serde(rename = "type")]
    pub kind: TriggerKind,

    /// Severity copied from the trigger
    pub severity: Severity,

    /// Location of the source reading
    #[serde(rename = "city")]
    pub location: String,

    /// Human-readable message
    pub message: String,

    /// The reading that fired the trigger
    #[serde(rename = "weather_data")]
    pub reading: WeatherReading,
}

impl Alert {
    /// Short form used in pass responses
    pub fn summary(&self) -> AlertSummary {
        AlertSummary {
            city: self.location.clone(),
            kind: self.kind,
            severity: self.severity,
        }
    }
}

/// `{city, type, severity}` view of an alert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertSummary {
    /// Location
    pub city: String,
    /// Trigger identifier
    #[serde(rename = "type")]
    pub kind: TriggerKind,
    /// Severity
    pub severity: Severity,
}

/// Notification channel configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationChannel {
    /// SMTP email; an empty `to` falls back to the configured recipient
    Email {
        #[serde(default)]
        to: Vec<String>,
    },
    /// Generic JSON webhook
    Webhook {
        url: String,
        #[serde(default)]
        headers: HashMap<String, String>,
    },
    /// Structured log event only
    Log,
}

impl NotificationChannel {
    /// Channel type label
    pub fn channel_type(&self) -> &'static str {
        match self {
            NotificationChannel::Email { .. } => "email",
            NotificationChannel::Webhook { .. } => "webhook",
            NotificationChannel::Log => "log",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_channel_serde() {
        let channels: Vec<NotificationChannel> = serde_json::from_str(
            r#"[{"type":"email"},{"type":"webhook","url":"http://hooks.local/x"},{"type":"log"}]"#,
        )
        .unwrap();

        assert_eq!(channels[0], NotificationChannel::Email { to: vec![] });
        assert_eq!(channels[1].channel_type(), "webhook");
        assert_eq!(channels[2], NotificationChannel::Log);
    }

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Low < Severity::Medium);
        assert!(Severity::Medium < Severity::High);
        assert!(Severity::High < Severity::Critical);
    }

    #[test]
    fn test_severity_serde() {
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"CRITICAL\"");
        assert_eq!("high".parse::<Severity>().unwrap(), Severity::High);
        assert!("severe".parse::<Severity>().is_err());
    }

    #[test]
    fn test_trigger_kind_round_trips_through_str() {
        for kind in [
            TriggerKind::ExtremeHeatEvening,
            TriggerKind::DustStormWarning,
            TriggerKind::ExtremeHeatDay,
            TriggerKind::MonsoonAlert,
        ] {
            assert_eq!(kind.as_str().parse::<TriggerKind>().unwrap(), kind);
            assert_eq!(
                serde_json::to_string(&kind).unwrap(),
                format!("\"{}\"", kind.as_str())
            );
        }
    }

    #[test]
    fn test_trigger_kind_derived_from_condition() {
        let trigger = AlertTrigger::new(
            TriggerCondition::Monsoon {
                rain_threshold: 0.5,
                wind_speed_min: 20.0,
            },
            Severity::Medium,
            "Heavy rain with strong winds",
        );
        assert_eq!(trigger.kind(), TriggerKind::MonsoonAlert);
    }
}
