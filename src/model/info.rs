use crate::model::events::{CheckEventsResult, DaemonEvent, EventCheckStatus};
use serde::Serialize;
use std::collections::BTreeMap;

/// Static information about the profiler and the hardware counters of this machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OpInfo {
    pub num_counters: u32,
    /// CPU frequency in MHz.
    pub cpu_frequency: f64,
    /// Whether the kernel driver fell back to timer interrupts (no hardware counters).
    pub timer_mode: bool,
    pub defaults: OpDefaults,
    /// Scalar fields opxml reported that are not modeled above, keyed by tag name.
    pub other: BTreeMap<String, String>,
    pub counters: Vec<CounterEvents>,
}

/// Default file locations used by the daemon.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OpDefaults {
    pub sample_dir: Option<String>,
    pub lock_file: Option<String>,
    pub log_file: Option<String>,
    pub dump_status: Option<String>,
}

/// The events a single hardware counter can be programmed with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CounterEvents {
    pub counter: u32,
    pub events: Vec<OpEvent>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OpEvent {
    pub name: String,
    pub description: String,
    pub number: u32,
    /// Smallest reset count the hardware accepts for this event.
    pub minimum_count: u64,
    pub unit_mask: UnitMask,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitMaskKind {
    #[default]
    Mandatory,
    Exclusive,
    Bitmask,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitMask {
    pub kind: UnitMaskKind,
    pub default: u32,
    pub options: Vec<UnitMaskOption>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitMaskOption {
    pub value: u32,
    pub description: String,
}

impl UnitMask {
    /// Whether `mask` is an acceptable setting for this unit mask.
    pub fn accepts(&self, mask: u32) -> bool {
        match self.kind {
            UnitMaskKind::Mandatory => mask == self.default,
            UnitMaskKind::Exclusive => {
                mask == self.default || self.options.iter().any(|o| o.value == mask)
            }
            UnitMaskKind::Bitmask => {
                let allowed = self.options.iter().fold(self.default, |acc, o| acc | o.value);
                mask & !allowed == 0
            }
        }
    }
}

impl OpInfo {
    pub fn counter(&self, counter: u32) -> Option<&CounterEvents> {
        self.counters.iter().find(|c| c.counter == counter)
    }

    /// Looks up an event by name on the given counter.
    pub fn find_event(&self, counter: u32, name: &str) -> Option<&OpEvent> {
        self.counter(counter)?.events.iter().find(|e| e.name == name)
    }

    /// Validates an event setting against the capabilities reported by opxml, without
    /// running the producer.
    ///
    /// An invalid setting is a regular outcome and is described in the returned result.
    pub fn check_event(&self, event: &DaemonEvent) -> CheckEventsResult {
        if event.counter >= self.num_counters {
            return CheckEventsResult::from_statuses(vec![EventCheckStatus::InvalidCounter]);
        }

        let Some(known) = self.find_event(event.counter, &event.name) else {
            return CheckEventsResult::from_statuses(vec![EventCheckStatus::InvalidEvent]);
        };

        let mut statuses = Vec::new();
        if !known.unit_mask.accepts(event.unit_mask) {
            statuses.push(EventCheckStatus::InvalidUnitMask);
        }
        if event.count < known.minimum_count {
            statuses.push(EventCheckStatus::InvalidCount);
        }
        if statuses.is_empty() {
            statuses.push(EventCheckStatus::Ok);
        }

        CheckEventsResult::from_statuses(statuses)
    }

    /// Validates every event of a daemon configuration, in order.
    pub fn check_events<'a>(
        &'a self,
        events: &'a [DaemonEvent],
    ) -> impl Iterator<Item = (&'a DaemonEvent, CheckEventsResult)> + 'a {
        events.iter().map(move |e| (e, self.check_event(e)))
    }
}
