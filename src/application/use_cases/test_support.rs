//! Shared fakes for use case tests

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};

use crate::domain::traffic::{ResolutionResult, TrafficRecord};
use crate::infrastructure::geo_clients::IspLookup;

/// Scripted resolver that records every call and the peak number of
/// lookups in flight
#[derive(Default)]
pub struct FakeLookup {
    responses: HashMap<String, ResolutionResult>,
    delays: HashMap<String, Duration>,
    calls: Mutex<Vec<String>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, ip: &str, result: ResolutionResult) -> Self {
        self.responses.insert(ip.to_string(), result);
        self
    }

    pub fn delay(mut self, ip: &str, delay: Duration) -> Self {
        self.delays.insert(ip.to_string(), delay);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IspLookup for FakeLookup {
    async fn lookup(&self, ip: &str) -> ResolutionResult {
        self.calls.lock().unwrap().push(ip.to_string());
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        let delay = self
            .delays
            .get(ip)
            .copied()
            .unwrap_or(Duration::from_millis(5));
        tokio::time::sleep(delay).await;

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.responses
            .get(ip)
            .cloned()
            .unwrap_or_else(|| ResolutionResult::transport("connection refused"))
    }
}

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

pub fn record(category: &str, application: &str, ip: &str) -> TrafficRecord {
    TrafficRecord::new(category, application, at(1, 8), at(1, 9), 1024.0, ip)
}
