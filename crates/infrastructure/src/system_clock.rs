use chrono::{DateTime, Utc};
use wardlog_application::Clock;

/// Clock adapter backed by the host's wall clock.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}
