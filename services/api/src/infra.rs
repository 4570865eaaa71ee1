use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use metrics_exporter_prometheus::PrometheusHandle;
use project_pulse::auth::TokenService;
use project_pulse::config::AppConfig;
use project_pulse::tracking::{
    Clock, InMemoryActivityLog, InMemoryTrackingStore, ProjectTrackingService,
};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

pub(crate) type ApiService = ProjectTrackingService<InMemoryTrackingStore, InMemoryActivityLog>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Wall clock that can be pinned while demo history is replayed.
#[derive(Default)]
pub(crate) struct SeedClock {
    pinned: Mutex<Option<DateTime<Utc>>>,
}

impl SeedClock {
    pub(crate) fn pin(&self, at: DateTime<Utc>) {
        if let Ok(mut guard) = self.pinned.lock() {
            *guard = Some(at);
        }
    }

    pub(crate) fn release(&self) {
        if let Ok(mut guard) = self.pinned.lock() {
            *guard = None;
        }
    }
}

impl Clock for SeedClock {
    fn now(&self) -> DateTime<Utc> {
        self.pinned
            .lock()
            .ok()
            .and_then(|guard| *guard)
            .unwrap_or_else(Utc::now)
    }
}

/// Wires the in-memory store, activity log, and token service into a tracking service.
pub(crate) fn build_service(config: &AppConfig) -> (Arc<ApiService>, Arc<SeedClock>) {
    let clock = Arc::new(SeedClock::default());
    let service = ProjectTrackingService::with_clock(
        Arc::new(InMemoryTrackingStore::default()),
        Arc::new(InMemoryActivityLog::default()),
        Arc::new(TokenService::new(&config.auth)),
        config.tracking,
        clock.clone(),
    );
    (Arc::new(service), clock)
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN))
}
