use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
    thread,
    time::{Duration, Instant},
};

use chrono::NaiveDateTime;
use log::{debug, info};

use crate::clock::{Clock, SystemClock};
use crate::constants::{HIGH_GROWTH_LABEL, HIGH_GROWTH_THRESHOLD, SLEEP_SLICE_MS, TIMESTAMP_FORMAT};
use crate::error::Result;
use crate::network::ViewSource;
use crate::store::{LogStore, Sample};

// Last observation of one identifier, kept for the next rate computation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LastSeen {
    pub views: u64,
    pub timestamp: NaiveDateTime,
}

impl LastSeen {
    // None when no whole second has passed between the two
    pub fn rate_to(&self, views: u64, timestamp: NaiveDateTime) -> Option<f64> {
        let elapsed_secs = (timestamp - self.timestamp).num_seconds();
        if elapsed_secs == 0 {
            return None;
        }
        let elapsed_mins = elapsed_secs as f64 / 60.0;
        Some((views as f64 - self.views as f64) / elapsed_mins)
    }
}

pub fn is_high_growth(rate: Option<f64>) -> bool {
    rate.is_some_and(|r| r > HIGH_GROWTH_THRESHOLD)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub id: String,
    pub sample: Sample,
    pub high_growth: bool,
}

#[derive(Debug, Default)]
pub struct Cycle {
    pub observations: Vec<Observation>,
    pub failures: usize,
    pub interrupted: bool,
}

/// Polls a fixed set of identifiers and appends each sample to its log.
///
/// The last-seen map lives only as long as the tracker, so a fresh tracker
/// always writes a null rate for its first sample of each identifier.
pub struct Tracker<S, C = SystemClock> {
    source: S,
    clock: C,
    store: LogStore,
    ids: Vec<String>,
    last_seen: HashMap<String, LastSeen>,
}

impl<S: ViewSource> Tracker<S, SystemClock> {
    pub fn new(source: S, store: LogStore, ids: Vec<String>) -> Self {
        Self::with_clock(source, SystemClock, store, ids)
    }
}

impl<S: ViewSource, C: Clock> Tracker<S, C> {
    pub fn with_clock(source: S, clock: C, store: LogStore, ids: Vec<String>) -> Self {
        let last_seen = HashMap::with_capacity(ids.len());
        Self {
            source,
            clock,
            store,
            ids,
            last_seen,
        }
    }

    // Nothing is written and last-seen is untouched if the fetch or append fails
    pub fn observe(&mut self, id: &str) -> Result<Observation> {
        let views = self.source.views(id)?;
        let timestamp = self.clock.now();

        let rate = self
            .last_seen
            .get(id)
            .and_then(|last| last.rate_to(views, timestamp));
        let sample = Sample {
            timestamp,
            views,
            rate,
        };

        self.store.append(id, &sample)?;
        self.last_seen
            .insert(id.to_string(), LastSeen { views, timestamp });

        Ok(Observation {
            id: id.to_string(),
            high_growth: is_high_growth(rate),
            sample,
        })
    }

    pub fn poll_cycle(&mut self, stop: &AtomicBool) -> Cycle {
        let mut cycle = Cycle::default();
        let ids = self.ids.clone();

        for id in &ids {
            if stop.load(Ordering::SeqCst) {
                cycle.interrupted = true;
                break;
            }
            match self.observe(id) {
                Ok(observation) => {
                    self.report(&observation);
                    cycle.observations.push(observation);
                }
                Err(err) => {
                    debug!("skipping {id} this cycle: {err:?}");
                    eprintln!("Error: {err}");
                    cycle.failures += 1;
                }
            }
        }
        cycle
    }

    pub fn run(&mut self, interval: Duration, stop: &AtomicBool) {
        let platform = self.source.platform();
        info!(
            "tracking {} {platform} identifier(s) every {}s",
            self.ids.len(),
            interval.as_secs()
        );

        loop {
            let cycle = self.poll_cycle(stop);
            debug!(
                "cycle done: {} recorded, {} failed",
                cycle.observations.len(),
                cycle.failures
            );
            if cycle.interrupted || !sleep_unless_stopped(interval, stop) {
                break;
            }
        }
        println!("Tracking stopped.");
    }

    fn report(&self, observation: &Observation) {
        let title = self.source.platform().title();
        let Observation {
            id,
            sample,
            high_growth,
        } = observation;

        println!(
            "{title} ID: {id}, Time: {}, Views: {}",
            sample.timestamp.format(TIMESTAMP_FORMAT),
            sample.views
        );
        if let Some(rate) = sample.rate {
            let label = if *high_growth { HIGH_GROWTH_LABEL } else { "" };
            println!("Rate of Increase for {title} ID {id}: {rate:.2} views/min, {label}");
        }
    }
}

// false if `stop` was set before the interval ran out
pub fn sleep_unless_stopped(interval: Duration, stop: &AtomicBool) -> bool {
    let slice = Duration::from_millis(SLEEP_SLICE_MS);
    let deadline = Instant::now() + interval;

    loop {
        if stop.load(Ordering::SeqCst) {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        thread::sleep(remaining.min(slice));
    }
}
