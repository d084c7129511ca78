//! Refresh mode state machine and per-group polling timers.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use automator_core::{GroupKey, RefreshMode};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::mirror::{Mirror, RefreshSummary};
use crate::transport::Transport;

struct SchedulerState {
    mode: RefreshMode,
    timers: HashMap<GroupKey, JoinHandle<()>>,
}

/// Drives [`Mirror`] refreshes in `Auto`, `Manual` or `Off` mode.
///
/// Starts in `Off`. Timers must be started from within a Tokio runtime.
pub struct RefreshScheduler<T> {
    mirror: Arc<Mirror<T>>,
    interval: Duration,
    manual_floor: Duration,
    state: Mutex<SchedulerState>,
}

impl<T: Transport> RefreshScheduler<T> {
    pub fn new(mirror: Arc<Mirror<T>>, interval: Duration, manual_floor: Duration) -> Self {
        Self {
            mirror,
            interval,
            manual_floor,
            state: Mutex::new(SchedulerState {
                mode: RefreshMode::Off,
                timers: HashMap::new(),
            }),
        }
    }

    pub fn from_config(mirror: Arc<Mirror<T>>, config: &ClientConfig) -> Self {
        Self::new(mirror, config.refresh_interval(), config.manual_refresh_floor())
    }

    pub fn mirror(&self) -> &Arc<Mirror<T>> {
        &self.mirror
    }

    fn state(&self) -> MutexGuard<'_, SchedulerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn mode(&self) -> RefreshMode {
        self.state().mode
    }

    pub fn is_auto(&self) -> bool {
        self.mode() == RefreshMode::Auto
    }

    pub fn is_manual(&self) -> bool {
        self.mode() == RefreshMode::Manual
    }

    pub fn is_off(&self) -> bool {
        self.mode() == RefreshMode::Off
    }

    pub fn is_refreshing(&self) -> bool {
        self.mode().is_refreshing()
    }

    /// Whether a polling timer is installed for `group`.
    pub fn has_timer(&self, group: GroupKey) -> bool {
        self.state().timers.contains_key(&group)
    }

    /// Enter `Auto` and make sure every group has exactly one timer. A group
    /// that gets a new timer is fetched once right away, independently of
    /// the timer, then once per interval.
    pub fn start_fetching(&self) {
        let mut state = self.state();
        state.mode = RefreshMode::Auto;
        for group in GroupKey::ALL {
            if state.timers.contains_key(&group) {
                continue;
            }
            spawn_fetch(Arc::clone(&self.mirror), group);
            let timer = spawn_group_timer(Arc::clone(&self.mirror), group, self.interval);
            state.timers.insert(group, timer);
        }
        info!(interval = ?self.interval, "polling started");
    }

    /// Cancel every timer and enter `Off`. Fetches already in flight still
    /// complete and apply.
    pub fn stop_fetching(&self) {
        let mut state = self.state();
        abort_all(&mut state);
        state.mode = RefreshMode::Off;
        info!("polling stopped");
    }

    /// `Off` starts polling; any other mode stops it.
    pub fn toggle(&self) {
        if self.is_off() {
            self.start_fetching();
        } else {
            self.stop_fetching();
        }
    }

    /// One-shot refresh of every group. The mode reads `Manual` for at least
    /// the configured floor, then reverts to what it was, unless something
    /// else changed it meanwhile.
    pub async fn manual_refresh(&self) -> RefreshSummary {
        let started = Instant::now();
        let previous = {
            let mut state = self.state();
            std::mem::replace(&mut state.mode, RefreshMode::Manual)
        };
        debug!(?previous, "manual refresh");

        let summary = self.mirror.refresh_all().await;
        time::sleep_until(started + self.manual_floor).await;

        let mut state = self.state();
        if state.mode == RefreshMode::Manual {
            state.mode = previous;
        }
        summary
    }

    /// Cancel timers without touching the mode.
    pub fn shutdown(&self) {
        abort_all(&mut self.state());
    }
}

impl<T> Drop for RefreshScheduler<T> {
    fn drop(&mut self) {
        let state = self.state.get_mut().unwrap_or_else(PoisonError::into_inner);
        abort_all(state);
    }
}

fn abort_all(state: &mut SchedulerState) {
    for (_, timer) in state.timers.drain() {
        timer.abort();
    }
}

// Detached: aborting a timer never cancels a fetch already started.
fn spawn_fetch<T: Transport>(mirror: Arc<Mirror<T>>, group: GroupKey) {
    tokio::spawn(async move {
        let _ = mirror.refresh_group(group).await;
    });
}

fn spawn_group_timer<T: Transport>(
    mirror: Arc<Mirror<T>>,
    group: GroupKey,
    period: Duration,
) -> JoinHandle<()> {
    let first = Instant::now() + period;
    tokio::spawn(async move {
        let mut tick = time::interval_at(first, period);
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tick.tick().await;
            spawn_fetch(Arc::clone(&mirror), group);
        }
    })
}
