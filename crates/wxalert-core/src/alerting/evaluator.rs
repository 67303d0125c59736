//! Alert rule evaluation engine
//!
//! Maps a batch of readings plus the local hour to the alerts that fire. The
//! engine holds no mutable state: the same input always yields the same
//! output, and one reading never influences another's result.

use chrono::{DateTime, FixedOffset, Timelike, Utc};
use tracing::debug;

use crate::config::{MonitorConfig, TriggersConfig};
use crate::error::{Error, Result};
use crate::models::{Alert, AlertTrigger, Severity, TriggerCondition, TriggerKind, WeatherReading};

/// The fixed, ordered set of triggers
///
/// Order is part of the contract: alerts for one reading are emitted in
/// catalog order.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerCatalog {
    triggers: Vec<AlertTrigger>,
}

impl TriggerCatalog {
    /// Build the catalog from configured thresholds
    pub fn from_config(config: &TriggersConfig) -> Self {
        let evening = &config.extreme_heat_evening;
        let dust = &config.dust_storm_warning;
        let day = &config.extreme_heat_day;
        let monsoon = &config.monsoon_alert;

        let triggers = vec![
            AlertTrigger::new(
                TriggerCondition::ExtremeHeatEvening {
                    temp_threshold: evening.temp_threshold,
                    time_after: evening.time_after,
                    wind_speed_min: evening.wind_speed_min,
                },
                Severity::High,
                format!(
                    "Temperature above {}°F after {} with wind",
                    evening.temp_threshold,
                    hour_label(evening.time_after)
                ),
            ),
            AlertTrigger::new(
                TriggerCondition::DustStorm {
                    wind_speed_min: dust.wind_speed_min,
                    visibility_max: dust.visibility_max,
                },
                Severity::High,
                "High winds with low visibility conditions",
            ),
            AlertTrigger::new(
                TriggerCondition::ExtremeHeatDay {
                    temp_threshold: day.temp_threshold,
                    start_hour: day.start_hour,
                    end_hour: day.end_hour,
                },
                Severity::Critical,
                format!("Temperature above {}°F during daytime", day.temp_threshold),
            ),
            AlertTrigger::new(
                TriggerCondition::Monsoon {
                    rain_threshold: monsoon.rain_threshold,
                    wind_speed_min: monsoon.wind_speed_min,
                },
                Severity::Medium,
                "Heavy rain with strong winds",
            ),
        ];

        Self { triggers }
    }

    /// Triggers in evaluation order
    pub fn iter(&self) -> impl Iterator<Item = &AlertTrigger> {
        self.triggers.iter()
    }

    /// Look up a trigger by identifier
    pub fn get(&self, kind: TriggerKind) -> Option<&AlertTrigger> {
        self.triggers.iter().find(|t| t.kind() == kind)
    }
}

impl Default for TriggerCatalog {
    fn default() -> Self {
        Self::from_config(&TriggersConfig::default())
    }
}

/// Pure rule engine over a trigger catalog
#[derive(Debug, Clone)]
pub struct AlertEngine {
    catalog: TriggerCatalog,
    utc_offset: FixedOffset,
}

impl AlertEngine {
    /// Create an engine from a catalog and the offset that defines local time
    pub fn new(catalog: TriggerCatalog, utc_offset: FixedOffset) -> Self {
        Self {
            catalog,
            utc_offset,
        }
    }

    /// Create an engine from configuration
    pub fn from_config(triggers: &TriggersConfig, monitor: &MonitorConfig) -> Result<Self> {
        let utc_offset = FixedOffset::east_opt(monitor.utc_offset_hours * 3600).ok_or_else(|| {
            Error::config(format!(
                "invalid utc_offset_hours: {}",
                monitor.utc_offset_hours
            ))
        })?;

        Ok(Self::new(TriggerCatalog::from_config(triggers), utc_offset))
    }

    /// The trigger catalog
    pub fn catalog(&self) -> &TriggerCatalog {
        &self.catalog
    }

    /// Local wall-clock hour (0-23) of an instant
    pub fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        now.with_timezone(&self.utc_offset).hour()
    }

    /// Evaluate a batch at the local hour of `now`
    pub fn evaluate_at(&self, readings: &[WeatherReading], now: DateTime<Utc>) -> Vec<Alert> {
        self.evaluate(readings, self.local_hour(now))
    }

    /// Evaluate a batch of readings at a local hour.
    ///
    /// Alerts come out in input reading order, then catalog order. Readings
    /// that fail validation are skipped.
    pub fn evaluate(&self, readings: &[WeatherReading], hour: u32) -> Vec<Alert> {
        readings
            .iter()
            .flat_map(|reading| self.evaluate_reading(reading, hour))
            .collect()
    }

    /// Evaluate every trigger against one reading
    pub fn evaluate_reading(&self, reading: &WeatherReading, hour: u32) -> Vec<Alert> {
        if let Err(e) = reading.validate() {
            debug!(city = %reading.location, error = %e, "Skipping reading that cannot be evaluated");
            return Vec::new();
        }

        self.catalog
            .iter()
            .filter(|trigger| {
                let fired = trigger.condition.matches(reading, hour);
                debug!(
                    city = %reading.location,
                    trigger = %trigger.kind(),
                    hour,
                    fired,
                    "Evaluated trigger"
                );
                fired
            })
            .map(|trigger| Alert {
                kind: trigger.kind(),
                severity: trigger.severity,
                location: reading.location.clone(),
                message: format_alert_message(trigger, reading),
                reading: reading.clone(),
            })
            .collect()
    }
}

/// Render the message for a fired trigger
fn format_alert_message(trigger: &AlertTrigger, reading: &WeatherReading) -> String {
    let city = &reading.location;

    match trigger.condition {
        TriggerCondition::ExtremeHeatEvening { time_after, .. } => format!(
            "EXTREME HEAT ALERT: {} - {:.1}°F with {:.1} mph winds after {}",
            city,
            reading.temperature,
            reading.wind_speed,
            hour_label(time_after)
        ),
        TriggerCondition::DustStorm { .. } => format!(
            "DUST STORM WARNING: {} - High winds ({:.1} mph) with reduced visibility ({:.1} miles)",
            city, reading.wind_speed, reading.visibility
        ),
        TriggerCondition::ExtremeHeatDay { .. } => format!(
            "EXTREME HEAT WARNING: {} - Dangerous temperature of {:.1}°F",
            city, reading.temperature
        ),
        TriggerCondition::Monsoon { .. } => format!(
            "MONSOON ALERT: {} - Heavy rain ({:.2} in/hr) with strong winds ({:.1} mph)",
            city, reading.rain_1h, reading.wind_speed
        ),
    }
}

/// 12-hour clock label for a 24-hour hour ("5 PM")
fn hour_label(hour: u32) -> String {
    let suffix = if hour % 24 < 12 { "AM" } else { "PM" };
    let display = match hour % 12 {
        0 => 12,
        h => h,
    };
    format!("{display} {suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::rstest;

    fn create_test_engine() -> AlertEngine {
        AlertEngine::from_config(&TriggersConfig::default(), &MonitorConfig::default()).unwrap()
    }

    fn create_test_reading(
        city: &str,
        temperature: f64,
        wind_speed: f64,
        visibility: f64,
        rain_1h: f64,
    ) -> WeatherReading {
        let observed_at = Utc.with_ymd_and_hms(2025, 7, 14, 1, 0, 0).unwrap();
        WeatherReading {
            location: city.to_string(),
            temperature,
            feels_like: temperature,
            humidity: 15,
            pressure: 1009.0,
            wind_speed,
            wind_direction: 200.0,
            visibility,
            condition: "Clear".to_string(),
            description: "clear sky".to_string(),
            rain_1h,
            observed_at,
            sunrise: observed_at,
            sunset: observed_at,
        }
    }

    fn kinds(alerts: &[Alert]) -> Vec<TriggerKind> {
        alerts.iter().map(|a| a.kind).collect()
    }

    #[test]
    fn test_empty_batch_yields_no_alerts() {
        let engine = create_test_engine();
        for hour in 0..24 {
            assert!(engine.evaluate(&[], hour).is_empty());
        }
    }

    #[test]
    fn test_phoenix_evening_heat() {
        let engine = create_test_engine();
        let reading = create_test_reading("Phoenix", 106.0, 15.0, 10.0, 0.0);

        let alerts = engine.evaluate(&[reading], 18);

        assert_eq!(kinds(&alerts), vec![TriggerKind::ExtremeHeatEvening]);
        assert_eq!(alerts[0].severity, Severity::High);
        assert_eq!(alerts[0].location, "Phoenix");
        assert_eq!(
            alerts[0].message,
            "EXTREME HEAT ALERT: Phoenix - 106.0°F with 15.0 mph winds after 5 PM"
        );
    }

    #[test]
    fn test_tucson_dust_storm() {
        let engine = create_test_engine();
        let reading = create_test_reading("Tucson", 90.0, 30.0, 3.0, 0.0);

        let alerts = engine.evaluate(&[reading], 12);

        assert_eq!(kinds(&alerts), vec![TriggerKind::DustStormWarning]);
        assert_eq!(alerts[0].severity, Severity::High);
        assert_eq!(
            alerts[0].message,
            "DUST STORM WARNING: Tucson - High winds (30.0 mph) with reduced visibility (3.0 miles)"
        );
    }

    #[test]
    fn test_mesa_monsoon() {
        let engine = create_test_engine();
        let reading = create_test_reading("Mesa", 90.0, 25.0, 10.0, 0.6);

        let alerts = engine.evaluate(&[reading], 14);

        assert_eq!(kinds(&alerts), vec![TriggerKind::MonsoonAlert]);
        assert_eq!(alerts[0].severity, Severity::Medium);
        assert_eq!(
            alerts[0].message,
            "MONSOON ALERT: Mesa - Heavy rain (0.60 in/hr) with strong winds (25.0 mph)"
        );
    }

    #[test]
    fn test_daytime_heat_is_critical() {
        let engine = create_test_engine();
        let reading = create_test_reading("Phoenix", 117.3, 5.0, 10.0, 0.0);

        let alerts = engine.evaluate(&[reading], 15);

        assert_eq!(kinds(&alerts), vec![TriggerKind::ExtremeHeatDay]);
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(
            alerts[0].message,
            "EXTREME HEAT WARNING: Phoenix - Dangerous temperature of 117.3°F"
        );
    }

    #[test]
    fn test_dust_and_monsoon_fire_in_catalog_order() {
        let engine = create_test_engine();
        let reading = create_test_reading("Tucson", 90.0, 30.0, 3.0, 0.6);

        let alerts = engine.evaluate(&[reading], 12);

        assert_eq!(
            kinds(&alerts),
            vec![TriggerKind::DustStormWarning, TriggerKind::MonsoonAlert]
        );
    }

    #[test]
    fn test_all_triggers_fire_in_catalog_order() {
        let engine = create_test_engine();
        let reading = create_test_reading("Phoenix", 120.0, 30.0, 2.0, 1.0);

        let alerts = engine.evaluate(&[reading], 17);

        assert_eq!(
            kinds(&alerts),
            vec![
                TriggerKind::ExtremeHeatEvening,
                TriggerKind::DustStormWarning,
                TriggerKind::ExtremeHeatDay,
                TriggerKind::MonsoonAlert,
            ]
        );
    }

    #[test]
    fn test_alerts_follow_reading_order() {
        let engine = create_test_engine();
        let readings = vec![
            create_test_reading("Mesa", 90.0, 25.0, 10.0, 0.6),
            create_test_reading("Phoenix", 106.0, 15.0, 10.0, 0.0),
            create_test_reading("Tucson", 90.0, 30.0, 3.0, 0.0),
        ];

        let alerts = engine.evaluate(&readings, 18);
        let cities: Vec<_> = alerts.iter().map(|a| a.location.as_str()).collect();

        assert_eq!(cities, vec!["Mesa", "Phoenix", "Tucson"]);
    }

    #[test]
    fn test_calm_batch_yields_no_alerts() {
        let engine = create_test_engine();
        let readings = vec![
            create_test_reading("Phoenix", 95.0, 8.0, 10.0, 0.0),
            create_test_reading("Tucson", 92.0, 6.0, 10.0, 0.0),
            create_test_reading("Scottsdale", 97.0, 4.0, 10.0, 0.0),
            create_test_reading("Mesa", 96.0, 9.0, 10.0, 0.1),
        ];

        assert!(engine.evaluate(&readings, 18).is_empty());
    }

    #[rstest]
    #[case::temperature_exactly_at_threshold(101.0, 15.0, 18, false)]
    #[case::temperature_just_above(101.1, 15.0, 18, true)]
    #[case::wind_exactly_at_minimum(106.0, 10.0, 17, true)]
    #[case::wind_just_below(106.0, 9.9, 17, false)]
    #[case::hour_before_evening(106.0, 15.0, 16, false)]
    #[case::hour_at_evening_start(106.0, 15.0, 17, true)]
    #[case::late_night(106.0, 15.0, 23, true)]
    fn test_evening_heat_boundaries(
        #[case] temperature: f64,
        #[case] wind_speed: f64,
        #[case] hour: u32,
        #[case] fires: bool,
    ) {
        let engine = create_test_engine();
        let reading = create_test_reading("Phoenix", temperature, wind_speed, 10.0, 0.0);

        let alerts = engine.evaluate(&[reading], hour);

        assert_eq!(alerts.contains_kind(TriggerKind::ExtremeHeatEvening), fires);
    }

    #[rstest]
    #[case::temperature_exactly_at_threshold(115.0, 12, false)]
    #[case::temperature_just_above(115.1, 12, true)]
    #[case::window_start(116.0, 10, true)]
    #[case::window_end(116.0, 18, true)]
    #[case::before_window(116.0, 9, false)]
    #[case::after_window(116.0, 19, false)]
    fn test_day_heat_boundaries(#[case] temperature: f64, #[case] hour: u32, #[case] fires: bool) {
        let engine = create_test_engine();
        let reading = create_test_reading("Phoenix", temperature, 0.0, 10.0, 0.0);

        let alerts = engine.evaluate(&[reading], hour);

        assert_eq!(alerts.contains_kind(TriggerKind::ExtremeHeatDay), fires);
    }

    #[rstest]
    #[case::both_at_bounds(25.0, 5.0, true)]
    #[case::wind_below(24.9, 5.0, false)]
    #[case::visibility_above(25.0, 5.1, false)]
    fn test_dust_storm_boundaries(
        #[case] wind_speed: f64,
        #[case] visibility: f64,
        #[case] fires: bool,
    ) {
        let engine = create_test_engine();
        let reading = create_test_reading("Tucson", 90.0, wind_speed, visibility, 0.0);

        let alerts = engine.evaluate(&[reading], 12);

        assert_eq!(alerts.contains_kind(TriggerKind::DustStormWarning), fires);
    }

    #[rstest]
    #[case::both_at_bounds(0.5, 20.0, true)]
    #[case::rain_below(0.49, 20.0, false)]
    #[case::wind_below(0.5, 19.9, false)]
    fn test_monsoon_boundaries(#[case] rain_1h: f64, #[case] wind_speed: f64, #[case] fires: bool) {
        let engine = create_test_engine();
        let reading = create_test_reading("Mesa", 90.0, wind_speed, 10.0, rain_1h);

        let alerts = engine.evaluate(&[reading], 14);

        assert_eq!(alerts.contains_kind(TriggerKind::MonsoonAlert), fires);
    }

    #[test]
    fn test_temperature_at_101_never_fires_heat_triggers() {
        let engine = create_test_engine();
        let reading = create_test_reading("Phoenix", 101.0, 40.0, 10.0, 0.0);

        for hour in 0..24 {
            let alerts = engine.evaluate(std::slice::from_ref(&reading), hour);
            assert!(!alerts.contains_kind(TriggerKind::ExtremeHeatEvening));
            assert!(!alerts.contains_kind(TriggerKind::ExtremeHeatDay));
        }
    }

    #[test]
    fn test_substituted_thresholds() {
        let mut triggers = TriggersConfig::default();
        triggers.extreme_heat_evening.temp_threshold = 80.0;
        triggers.extreme_heat_evening.time_after = 20;
        let engine = AlertEngine::from_config(&triggers, &MonitorConfig::default()).unwrap();
        let reading = create_test_reading("Flagstaff", 85.0, 12.0, 10.0, 0.0);

        assert!(engine.evaluate(std::slice::from_ref(&reading), 19).is_empty());

        let alerts = engine.evaluate(&[reading], 20);
        assert_eq!(kinds(&alerts), vec![TriggerKind::ExtremeHeatEvening]);
        assert!(alerts[0].message.ends_with("after 8 PM"));
    }

    #[test]
    fn test_invalid_reading_is_skipped() {
        let engine = create_test_engine();
        let mut broken = create_test_reading("Phoenix", 120.0, 30.0, 2.0, 1.0);
        broken.wind_speed = f64::NAN;
        let healthy = create_test_reading("Tucson", 90.0, 30.0, 3.0, 0.0);

        let alerts = engine.evaluate(&[broken, healthy], 12);

        assert_eq!(kinds(&alerts), vec![TriggerKind::DustStormWarning]);
        assert_eq!(alerts[0].location, "Tucson");
    }

    #[test]
    fn test_alert_embeds_source_reading() {
        let engine = create_test_engine();
        let reading = create_test_reading("Phoenix", 106.0, 15.0, 10.0, 0.0);

        let alerts = engine.evaluate(std::slice::from_ref(&reading), 18);

        assert_eq!(alerts[0].reading, reading);
    }

    #[test]
    fn test_local_hour_uses_configured_offset() {
        let engine = create_test_engine();
        // 01:30 UTC is 18:30 the previous day in Arizona (UTC-7)
        let now = Utc.with_ymd_and_hms(2025, 7, 15, 1, 30, 0).unwrap();

        assert_eq!(engine.local_hour(now), 18);

        let reading = create_test_reading("Phoenix", 106.0, 15.0, 10.0, 0.0);
        assert_eq!(
            engine.evaluate_at(std::slice::from_ref(&reading), now),
            engine.evaluate(&[reading], 18)
        );
    }

    #[test]
    fn test_rejects_invalid_offset() {
        let monitor = MonitorConfig {
            utc_offset_hours: 30,
            ..MonitorConfig::default()
        };
        assert!(AlertEngine::from_config(&TriggersConfig::default(), &monitor).is_err());
    }

    #[test]
    fn test_catalog_order_and_severities() {
        let catalog = TriggerCatalog::default();
        let entries: Vec<_> = catalog.iter().map(|t| (t.kind(), t.severity)).collect();

        assert_eq!(
            entries,
            vec![
                (TriggerKind::ExtremeHeatEvening, Severity::High),
                (TriggerKind::DustStormWarning, Severity::High),
                (TriggerKind::ExtremeHeatDay, Severity::Critical),
                (TriggerKind::MonsoonAlert, Severity::Medium),
            ]
        );
        assert_eq!(
            catalog.get(TriggerKind::ExtremeHeatEvening).unwrap().description,
            "Temperature above 101°F after 5 PM with wind"
        );
    }

    #[test]
    fn test_hour_label() {
        assert_eq!(hour_label(0), "12 AM");
        assert_eq!(hour_label(9), "9 AM");
        assert_eq!(hour_label(12), "12 PM");
        assert_eq!(hour_label(17), "5 PM");
    }

    trait ContainsKind {
        fn contains_kind(&self, kind: TriggerKind) -> bool;
    }

    impl ContainsKind for Vec<Alert> {
        fn contains_kind(&self, kind: TriggerKind) -> bool {
            self.iter().any(|a| a.kind == kind)
        }
    }

    fn reading_strategy() -> impl Strategy<Value = WeatherReading> {
        (60.0..130.0f64, 0.0..50.0f64, 0.0..15.0f64, 0.0..2.0f64).prop_map(
            |(temperature, wind_speed, visibility, rain_1h)| {
                create_test_reading("Anywhere", temperature, wind_speed, visibility, rain_1h)
            },
        )
    }

    proptest! {
        #[test]
        fn prop_evaluate_is_idempotent(
            readings in prop::collection::vec(reading_strategy(), 0..6),
            hour in 0u32..24,
        ) {
            let engine = create_test_engine();
            prop_assert_eq!(engine.evaluate(&readings, hour), engine.evaluate(&readings, hour));
        }

        #[test]
        fn prop_readings_are_evaluated_independently(
            readings in prop::collection::vec(reading_strategy(), 0..6),
            hour in 0u32..24,
        ) {
            let engine = create_test_engine();
            let batch = engine.evaluate(&readings, hour);
            let one_by_one: Vec<Alert> = readings
                .iter()
                .flat_map(|r| engine.evaluate_reading(r, hour))
                .collect();
            prop_assert_eq!(batch, one_by_one);
        }
    }
}
