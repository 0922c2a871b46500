use crate::ports;
use crate::reminders::slot_time::DailyTrigger;
use crate::types::reminders::SlotKey;

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use time::OffsetDateTime;
use time_tz::{TimeZone, Tz};
use tokio::task::JoinHandle;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct JobKey {
    endpoint: String,
    slot_key: SlotKey,
}

struct ScheduledJob {
    trigger: DailyTrigger,
    timezone: &'static Tz,
    armed_at: OffsetDateTime,
    next_fire_at: Arc<Mutex<Option<OffsetDateTime>>>,
    handle: JoinHandle<()>,
}

#[derive(Debug, Clone, Serialize)]
pub struct JobSummary {
    pub endpoint: String,
    pub slot_key: SlotKey,
    pub time_24h: String,
    pub timezone: String,
    #[serde(with = "time::serde::rfc3339")]
    pub armed_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option")]
    pub next_fire_at: Option<OffsetDateTime>,
    pub finished: bool,
}

/// Armed reminder timers, at most one per (endpoint, slot).
///
/// Each job is a tokio task; removing a job aborts its task. Dropping the table aborts
/// everything it still holds.
#[derive(Default)]
pub struct ScheduleTable {
    jobs: Mutex<HashMap<JobKey, ScheduledJob>>,
}

impl ScheduleTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn jobs(&self) -> MutexGuard<'_, HashMap<JobKey, ScheduledJob>> {
        self.jobs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn clear(&self) {
        let drained: Vec<ScheduledJob> = self.jobs().drain().map(|(_, job)| job).collect();
        for job in drained {
            job.handle.abort();
        }
    }

    /// Arms a timer that calls `on_fire` every day at `trigger` in `timezone`.
    /// An existing job for the same endpoint and slot is aborted and replaced.
    pub fn add<T, F, Fut>(
        &self,
        time: T,
        endpoint: &str,
        slot_key: SlotKey,
        trigger: DailyTrigger,
        timezone: &'static Tz,
        on_fire: F,
    ) where
        T: ports::TimeProvider,
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let armed_at = time.now();
        let next_fire_at = Arc::new(Mutex::new(None));
        let handle = tokio::spawn(run_daily(
            time,
            trigger,
            timezone,
            Arc::clone(&next_fire_at),
            on_fire,
        ));
        let key = JobKey {
            endpoint: endpoint.to_string(),
            slot_key,
        };
        let job = ScheduledJob {
            trigger,
            timezone,
            armed_at,
            next_fire_at,
            handle,
        };
        if let Some(previous) = self.jobs().insert(key, job) {
            previous.handle.abort();
        }
    }

    pub fn size(&self) -> usize {
        self.jobs().len()
    }

    /// Aborts and drops every job armed for `endpoint`, returning how many there were.
    pub fn remove_endpoint(&self, endpoint: &str) -> usize {
        let removed: Vec<ScheduledJob> = {
            let mut jobs = self.jobs();
            let keys: Vec<JobKey> = jobs
                .keys()
                .filter(|key| key.endpoint == endpoint)
                .cloned()
                .collect();
            keys.iter().filter_map(|key| jobs.remove(key)).collect()
        };
        for job in &removed {
            job.handle.abort();
        }
        removed.len()
    }

    pub fn snapshot(&self) -> Vec<JobSummary> {
        let jobs = self.jobs();
        let mut summaries: Vec<JobSummary> = jobs
            .iter()
            .map(|(key, job)| JobSummary {
                endpoint: key.endpoint.clone(),
                slot_key: key.slot_key,
                time_24h: job.trigger.to_string(),
                timezone: job.timezone.name().to_string(),
                armed_at: job.armed_at,
                next_fire_at: *job
                    .next_fire_at
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner),
                finished: job.handle.is_finished(),
            })
            .collect();
        summaries.sort_by(|a, b| {
            a.endpoint
                .cmp(&b.endpoint)
                .then_with(|| a.slot_key.cmp(&b.slot_key))
        });
        summaries
    }
}

impl Drop for ScheduleTable {
    fn drop(&mut self) {
        self.clear();
    }
}

fn compute_delay<T: ports::TimeProvider>(time: &T, at: OffsetDateTime) -> Option<Duration> {
    let now = time.now();
    let delay = at - now;
    if delay.is_positive() {
        match delay.try_into() {
            Ok(std_delay) => Some(std_delay),
            Err(_) => Some(Duration::MAX),
        }
    } else {
        None
    }
}

async fn run_daily<T, F, Fut>(
    time: T,
    trigger: DailyTrigger,
    timezone: &'static Tz,
    next_fire_at: Arc<Mutex<Option<OffsetDateTime>>>,
    on_fire: F,
) where
    T: ports::TimeProvider,
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut after = time.now();
    loop {
        let Some(fire_at) = trigger.next_after(after, timezone) else {
            tracing::warn!(
                %trigger,
                timezone = timezone.name(),
                "no next occurrence; timer stopped"
            );
            return;
        };
        *next_fire_at.lock().unwrap_or_else(PoisonError::into_inner) = Some(fire_at);

        if let Some(delay) = compute_delay(&time, fire_at) {
            time.sleep(delay).await;
        }
        on_fire().await;

        after = fire_at.max(time.now());
    }
}
