//! Notification delivery for alerts

use chrono::{DateTime, Utc};
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use reqwest::Client;
use serde::Serialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::config::{EmailConfig, NotificationConfig};
use crate::error::{Error, Result};
use crate::models::{Alert, NotificationChannel, Severity};

/// Result of sending a notification
#[derive(Debug, Clone)]
pub struct NotificationResult {
    pub channel_type: String,
    pub success: bool,
    pub error: Option<String>,
    pub sent_at: DateTime<Utc>,
}

/// Sends alerts through the configured channels
///
/// Delivery is best-effort: a failed channel is logged and never stops the
/// remaining deliveries.
pub struct NotificationSender {
    client: Client,
    channels: Vec<NotificationChannel>,
    subject_prefix: String,
    email: Option<EmailSender>,
}

impl NotificationSender {
    /// Create a new notification sender
    pub fn new(config: &NotificationConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        let email = if config.email.is_configured() {
            Some(EmailSender::new(&config.email)?)
        } else {
            None
        };

        Ok(Self {
            client,
            channels: config.channels.clone(),
            subject_prefix: config.subject_prefix.clone(),
            email,
        })
    }

    /// Send every alert to every configured channel
    pub async fn send_alerts(&self, alerts: &[Alert]) {
        for alert in alerts {
            for channel in &self.channels {
                let result = self.send(channel, alert).await;
                if let Some(e) = &result.error {
                    metrics::counter!("wxalert_notification_failures_total").increment(1);
                    error!(
                        channel = %result.channel_type,
                        city = %alert.location,
                        trigger = %alert.kind,
                        error = %e,
                        "Notification failed"
                    );
                }
            }
        }
    }

    /// Send a single notification
    pub async fn send(&self, channel: &NotificationChannel, alert: &Alert) -> NotificationResult {
        let sent_at = Utc::now();

        let result = match channel {
            NotificationChannel::Email { to } => self.send_email(to, alert).await,
            NotificationChannel::Webhook { url, headers } => {
                self.send_webhook(url, headers, alert).await
            }
            NotificationChannel::Log => {
                warn!(
                    city = %alert.location,
                    trigger = %alert.kind,
                    severity = %alert.severity,
                    "{}",
                    alert.message
                );
                Ok(())
            }
        };

        NotificationResult {
            channel_type: channel.channel_type().to_string(),
            success: result.is_ok(),
            error: result.err().map(|e| e.to_string()),
            sent_at,
        }
    }

    /// Send email notification
    async fn send_email(&self, to: &[String], alert: &Alert) -> Result<()> {
        let Some(email) = &self.email else {
            warn!(city = %alert.location, "Email not configured, skipping email alert");
            return Ok(());
        };

        let subject = render_subject(&self.subject_prefix, alert);
        let body = render_email_body(&self.subject_prefix, alert);
        email.send(to, subject, body).await?;

        info!(city = %alert.location, trigger = %alert.kind, "Email alert sent");
        Ok(())
    }

    /// Send generic webhook notification
    async fn send_webhook(
        &self,
        url: &str,
        headers: &HashMap<String, String>,
        alert: &Alert,
    ) -> Result<()> {
        let payload = WebhookPayload::from_alert(alert, Utc::now());

        let mut request = self.client.post(url).json(&payload);
        for (key, value) in headers {
            request = request.header(key, value);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::notification(format!(
                "Webhook returned {}: {}",
                status, body
            )));
        }

        info!(city = %alert.location, trigger = %alert.kind, url = %url, "Webhook alert sent");
        Ok(())
    }
}

/// SMTP transport with sender and default recipient
struct EmailSender {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    default_to: Option<Mailbox>,
}

impl EmailSender {
    fn new(config: &EmailConfig) -> Result<Self> {
        let username = config.username.clone().unwrap_or_default();
        let password = config.password.clone().unwrap_or_default();

        let from = parse_mailbox(&username)?;
        let default_to = config.recipient.as_deref().map(parse_mailbox).transpose()?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_server)
            .map_err(|e| Error::config(format!("invalid SMTP server: {}", e)))?
            .port(config.smtp_port)
            .credentials(Credentials::new(username, password))
            .timeout(Some(Duration::from_secs(config.timeout_seconds)))
            .build();

        Ok(Self {
            transport,
            from,
            default_to,
        })
    }

    async fn send(&self, to: &[String], subject: String, body: String) -> Result<()> {
        let mut builder = Message::builder()
            .from(self.from.clone())
            .subject(subject)
            .header(ContentType::TEXT_HTML);

        if to.is_empty() {
            let Some(recipient) = &self.default_to else {
                return Err(Error::notification("no email recipient configured"));
            };
            builder = builder.to(recipient.clone());
        } else {
            for address in to {
                builder = builder.to(parse_mailbox(address)?);
            }
        }

        let message = builder
            .body(body)
            .map_err(|e| Error::notification(format!("failed to build email: {}", e)))?;

        self.transport
            .send(message)
            .await
            .map_err(|e| Error::notification(format!("SMTP delivery failed: {}", e)))?;

        Ok(())
    }
}

fn parse_mailbox(address: &str) -> Result<Mailbox> {
    address
        .parse()
        .map_err(|e| Error::config(format!("invalid email address {:?}: {}", address, e)))
}

/// Email subject: `"{prefix} - {SEVERITY} - {city}"`
pub fn render_subject(prefix: &str, alert: &Alert) -> String {
    format!("{} - {} - {}", prefix, alert.severity, alert.location)
}

fn severity_color(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "#FF0000",
        Severity::High => "#FF6600",
        Severity::Medium => "#FFAA00",
        Severity::Low => "#00AA00",
    }
}

/// HTML email body with the conditions table and safety recommendations
pub fn render_email_body(title: &str, alert: &Alert) -> String {
    let color = severity_color(alert.severity);
    let weather = &alert.reading;
    let cell = r#"style="padding: 5px; border-bottom: 1px solid #ddd;""#;

    let rows = [
        (
            "Temperature",
            format!(
                "{:.1}°F (feels like {:.1}°F)",
                weather.temperature, weather.feels_like
            ),
        ),
        ("Wind", format!("{:.1} mph", weather.wind_speed)),
        ("Humidity", format!("{}%", weather.humidity)),
        ("Visibility", format!("{:.1} miles", weather.visibility)),
        ("Conditions", title_case(&weather.description)),
        ("Rain (1hr)", format!("{:.2} inches", weather.rain_1h)),
        (
            "Time",
            weather.observed_at.format("%Y-%m-%d %H:%M:%S").to_string(),
        ),
    ];

    let table: String = rows
        .iter()
        .map(|(label, value)| {
            format!(
                "<tr><td {cell}><strong>{label}:</strong></td><td {cell}>{value}</td></tr>\n"
            )
        })
        .collect();

    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; margin: 20px;">
<div style="border-left: 5px solid {color}; padding-left: 20px; margin-bottom: 20px;">
<h2 style="color: {color}; margin-top: 0;">{title} - {severity}</h2>
<h3>{message}</h3>
</div>
<div style="background-color: #f5f5f5; padding: 15px; border-radius: 5px;">
<h4>Current Weather Conditions - {city}</h4>
<table style="width: 100%; border-collapse: collapse;">
{table}</table>
</div>
<div style="margin-top: 20px; padding: 10px; background-color: #e8f4f8; border-radius: 5px;">
<p><strong>Safety Recommendations:</strong></p>
<ul>
<li>Stay hydrated and avoid prolonged outdoor exposure</li>
<li>Check on elderly neighbors and pets</li>
<li>Avoid outdoor activities during extreme conditions</li>
<li>Keep windows and doors closed during dust storms</li>
</ul>
</div>
</body>
</html>
"#,
        severity = alert.severity,
        message = alert.message,
        city = alert.location,
    )
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

// Generic webhook payload
#[derive(Debug, Serialize)]
struct WebhookPayload {
    timestamp: DateTime<Utc>,
    alert_type: String,
    city: String,
    severity: String,
    message: String,
    temperature: f64,
    wind_speed: f64,
    conditions: String,
}

impl WebhookPayload {
    fn from_alert(alert: &Alert, timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            alert_type: alert.kind.to_string(),
            city: alert.location.clone(),
            severity: alert.severity.to_string(),
            message: alert.message.clone(),
            temperature: alert.reading.temperature,
            wind_speed: alert.reading.wind_speed,
            conditions: alert.reading.description.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{TriggerKind, WeatherReading};
    use chrono::TimeZone;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn create_test_alert() -> Alert {
        let observed_at = Utc.with_ymd_and_hms(2025, 7, 14, 1, 0, 0).unwrap();
        Alert {
            kind: TriggerKind::DustStormWarning,
            severity: Severity::High,
            location: "Tucson".to_string(),
            message: "DUST STORM WARNING: Tucson - High winds (30.0 mph) with reduced visibility (3.0 miles)"
                .to_string(),
            reading: WeatherReading {
                location: "Tucson".to_string(),
                temperature: 98.4,
                feels_like: 96.0,
                humidity: 18,
                pressure: 1006.0,
                wind_speed: 30.0,
                wind_direction: 180.0,
                visibility: 3.0,
                condition: "Dust".to_string(),
                description: "dust storm".to_string(),
                rain_1h: 0.0,
                observed_at,
                sunrise: observed_at,
                sunset: observed_at,
            },
        }
    }

    fn create_test_sender(channels: Vec<NotificationChannel>) -> NotificationSender {
        let config = NotificationConfig {
            channels,
            ..NotificationConfig::default()
        };
        NotificationSender::new(&config).unwrap()
    }

    #[tokio::test]
    async fn test_webhook_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("x-api-key", "secret"))
            .and(body_partial_json(serde_json::json!({
                "alert_type": "dust_storm_warning",
                "city": "Tucson",
                "severity": "HIGH",
                "temperature": 98.4,
                "wind_speed": 30.0,
                "conditions": "dust storm",
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = NotificationChannel::Webhook {
            url: format!("{}/hook", server.uri()),
            headers: HashMap::from([("x-api-key".to_string(), "secret".to_string())]),
        };
        let sender = create_test_sender(vec![channel.clone()]);

        let result = sender.send(&channel, &create_test_alert()).await;

        assert!(result.success, "{:?}", result.error);
        assert_eq!(result.channel_type, "webhook");
    }

    #[tokio::test]
    async fn test_webhook_non_success_is_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&server)
            .await;

        let channel = NotificationChannel::Webhook {
            url: server.uri(),
            headers: HashMap::new(),
        };
        let sender = create_test_sender(vec![channel.clone()]);

        let result = sender.send(&channel, &create_test_alert()).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn test_failed_channel_does_not_stop_remaining_deliveries() {
        let failing = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(2)
            .mount(&failing)
            .await;

        let healthy = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&healthy)
            .await;

        let sender = create_test_sender(vec![
            NotificationChannel::Webhook {
                url: failing.uri(),
                headers: HashMap::new(),
            },
            NotificationChannel::Log,
            NotificationChannel::Webhook {
                url: healthy.uri(),
                headers: HashMap::new(),
            },
        ]);

        let alert = create_test_alert();
        sender.send_alerts(&[alert.clone(), alert]).await;
        // expectations verified when the mock servers drop
    }

    #[tokio::test]
    async fn test_unconfigured_email_is_skipped() {
        let channel = NotificationChannel::Email { to: vec![] };
        let sender = create_test_sender(vec![channel.clone()]);

        let result = sender.send(&channel, &create_test_alert()).await;

        assert!(result.success);
        assert_eq!(result.channel_type, "email");
    }

    #[tokio::test]
    async fn test_log_channel_always_succeeds() {
        let sender = create_test_sender(vec![NotificationChannel::Log]);
        let result = sender.send(&NotificationChannel::Log, &create_test_alert()).await;
        assert!(result.success);
    }

    #[test]
    fn test_invalid_sender_address_is_config_error() {
        let mut config = NotificationConfig::default();
        config.email.username = Some("not an address".to_string());
        config.email.password = Some("app-password".to_string());
        config.email.recipient = Some("ops@example.com".to_string());

        assert!(matches!(
            NotificationSender::new(&config),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_render_subject() {
        assert_eq!(
            render_subject("Arizona Weather Alert", &create_test_alert()),
            "Arizona Weather Alert - HIGH - Tucson"
        );
    }

    #[test]
    fn test_render_email_body() {
        let body = render_email_body("Arizona Weather Alert", &create_test_alert());

        assert!(body.contains("border-left: 5px solid #FF6600"));
        assert!(body.contains("Arizona Weather Alert - HIGH"));
        assert!(body.contains("Current Weather Conditions - Tucson"));
        assert!(body.contains("98.4°F (feels like 96.0°F)"));
        assert!(body.contains("3.0 miles"));
        assert!(body.contains("Dust Storm"));
        assert!(body.contains("0.00 inches"));
        assert!(body.contains("2025-07-14 01:00:00"));
        assert!(body.contains("Safety Recommendations"));
    }
}
