//! Security-focused logging module to track authentication events

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Types of security events to track
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SecurityEvent {
    // Authentication events
    AuthenticationFailed { email: String, remote: Option<SocketAddr> },
    AuthenticationSuccess { subject: String, remote: Option<SocketAddr> },
    TokenRevoked { subject: Option<String>, token_fingerprint: String },
    TokenValidationFailed { token_fingerprint: String, reason: String },

    // Authorization events
    UnauthorizedAccess { remote: Option<SocketAddr>, reason: String },

    // Infrastructure
    StoreFault { component: String, error: String },
}

impl SecurityEvent {
    /// Key used for counting and alert thresholds
    pub fn key(&self) -> &'static str {
        match self {
            SecurityEvent::AuthenticationFailed { .. } => "auth_failed",
            SecurityEvent::AuthenticationSuccess { .. } => "auth_success",
            SecurityEvent::TokenRevoked { .. } => "token_revoked",
            SecurityEvent::TokenValidationFailed { .. } => "token_validation_failed",
            SecurityEvent::UnauthorizedAccess { .. } => "unauthorized_access",
            SecurityEvent::StoreFault { .. } => "store_fault",
        }
    }
}

/// Security event with timestamp
#[derive(Debug, Clone)]
struct TimestampedEvent {
    event: SecurityEvent,
    timestamp: Instant,
}

/// Window over which alert thresholds are counted
const ALERT_WINDOW: Duration = Duration::from_secs(300);

/// Security logger for tracking and alerting on security events
pub struct SecurityLogger {
    events: RwLock<Vec<TimestampedEvent>>,
    max_events: usize,
    alert_thresholds: HashMap<&'static str, usize>,
}

impl SecurityLogger {
    /// Create a new security logger
    pub fn new() -> Self {
        let mut alert_thresholds = HashMap::new();
        alert_thresholds.insert("auth_failed", 5);
        alert_thresholds.insert("token_validation_failed", 10);
        alert_thresholds.insert("unauthorized_access", 20);
        alert_thresholds.insert("store_fault", 1);

        Self {
            events: RwLock::new(Vec::new()),
            max_events: 10000,
            alert_thresholds,
        }
    }

    /// Log a security event.
    ///
    /// Returns true when this event brought its kind up to the alert
    /// threshold within `ALERT_WINDOW`.
    pub async fn log_event(&self, event: SecurityEvent) -> bool {
        let event_key = event.key();

        {
            let mut events = self.events.write().await;
            events.push(TimestampedEvent {
                event: event.clone(),
                timestamp: Instant::now(),
            });

            // Limit memory usage
            if events.len() > self.max_events {
                let events_to_remove = events.len() - self.max_events;
                events.drain(0..events_to_remove);
            }
        }

        let mut alerted = false;
        if let Some(&threshold) = self.alert_thresholds.get(event_key) {
            let recent = self
                .get_recent_events(ALERT_WINDOW)
                .await
                .into_iter()
                .filter(|recent| recent.key() == event_key)
                .count();
            if recent == threshold {
                log::error!(
                    "SECURITY ALERT: {} events of type '{}' in the last {}s",
                    recent,
                    event_key,
                    ALERT_WINDOW.as_secs()
                );
                log::error!("Sample event: {:?}", event);
                alerted = true;
            }
        }

        match event {
            SecurityEvent::AuthenticationFailed { email, remote } => {
                log::warn!("SECURITY: Authentication failed - Email: {}, Remote: {:?}", email, remote);
            }
            SecurityEvent::AuthenticationSuccess { subject, remote } => {
                log::info!("SECURITY: Authentication success - Subject: {}, Remote: {:?}", subject, remote);
            }
            SecurityEvent::TokenRevoked { subject, token_fingerprint } => {
                log::info!("SECURITY: Token revoked - Subject: {:?}, Token: {}", subject, token_fingerprint);
            }
            SecurityEvent::TokenValidationFailed { token_fingerprint, reason } => {
                log::warn!("SECURITY: Token validation failed - Token: {}, Reason: {}", token_fingerprint, reason);
            }
            SecurityEvent::UnauthorizedAccess { remote, reason } => {
                log::warn!("SECURITY: Unauthorized access attempt - Remote: {:?}, Reason: {}", remote, reason);
            }
            SecurityEvent::StoreFault { component, error } => {
                log::error!("SECURITY: Store fault, failing closed - Component: {}, Error: {}", component, error);
            }
        }

        alerted
    }

    /// Get recent security events
    pub async fn get_recent_events(&self, duration: Duration) -> Vec<SecurityEvent> {
        let events = self.events.read().await;
        let now = Instant::now();

        events
            .iter()
            .filter(|event| now.duration_since(event.timestamp) <= duration)
            .map(|event| event.event.clone())
            .collect()
    }

    /// Clean up old events
    pub async fn cleanup_old_events(&self, max_age: Duration) {
        let mut events = self.events.write().await;
        let now = Instant::now();

        events.retain(|event| now.duration_since(event.timestamp) <= max_age);
    }

    /// Start periodic cleanup task
    pub fn start_cleanup_task(self: Arc<Self>) {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(300));
            loop {
                interval.tick().await;
                self.cleanup_old_events(Duration::from_secs(3600 * 24)).await;
            }
        });
    }
}

impl Default for SecurityLogger {
    fn default() -> Self {
        Self::new()
    }
}

/// Global security logger instance
static SECURITY_LOGGER: OnceLock<Arc<SecurityLogger>> = OnceLock::new();

/// Initialize the global security logger. Must run inside a tokio runtime.
pub fn init_security_logger() {
    SECURITY_LOGGER.get_or_init(|| {
        let logger = Arc::new(SecurityLogger::new());
        logger.clone().start_cleanup_task();
        logger
    });
}

/// Get the global security logger
pub fn get_security_logger() -> Option<Arc<SecurityLogger>> {
    SECURITY_LOGGER.get().cloned()
}

/// Log a security event using the global logger, if one is initialized
pub async fn log_security_event(event: SecurityEvent) {
    if let Some(logger) = get_security_logger() {
        logger.log_event(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_events_are_recorded() {
        let logger = SecurityLogger::new();
        logger
            .log_event(SecurityEvent::AuthenticationFailed {
                email: "eve@example.com".to_string(),
                remote: None,
            })
            .await;
        logger
            .log_event(SecurityEvent::StoreFault {
                component: "revocation".to_string(),
                error: "timeout".to_string(),
            })
            .await;

        let recent = logger.get_recent_events(Duration::from_secs(60)).await;
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].key(), "auth_failed");
        assert_eq!(recent[1].key(), "store_fault");
    }

    #[tokio::test]
    async fn test_alert_fires_when_threshold_reached() {
        let logger = SecurityLogger::new();
        let failed = || SecurityEvent::AuthenticationFailed {
            email: "eve@example.com".to_string(),
            remote: None,
        };

        for _ in 0..4 {
            assert!(!logger.log_event(failed()).await);
        }
        assert!(logger.log_event(failed()).await);
        assert!(!logger.log_event(failed()).await);

        // Other kinds are counted separately
        assert!(
            logger
                .log_event(SecurityEvent::StoreFault {
                    component: "revocation_store".to_string(),
                    error: "timeout".to_string(),
                })
                .await
        );
    }

    #[tokio::test]
    async fn test_event_buffer_is_bounded() {
        let mut logger = SecurityLogger::new();
        logger.max_events = 3;

        for i in 0..5 {
            logger
                .log_event(SecurityEvent::UnauthorizedAccess {
                    remote: None,
                    reason: format!("attempt {}", i),
                })
                .await;
        }

        let recent = logger.get_recent_events(Duration::from_secs(60)).await;
        assert_eq!(recent.len(), 3);
        assert_eq!(
            recent[0],
            SecurityEvent::UnauthorizedAccess {
                remote: None,
                reason: "attempt 2".to_string()
            }
        );
    }
}
