use crate::err::Result;
use crate::model::{
    CheckEventsResult, DaemonEvent, EventSamples, ModelData, OpInfo, SampleTree, SessionList,
    SessionSamples,
};
use crate::runner::{CancellationToken, OpxmlRunner};

use log::debug;

const INFO_ARG: &str = "info";
const CHECKEVENTS_ARG: &str = "check-events";
const MODELDATA_ARG: &str = "model-data";
const SESSIONS_ARG: &str = "sessions";

/// Typed access to the documents opxml produces.
///
/// Every call runs the producer once. All calls share the client's [`CancellationToken`], so a
/// cancel from another thread also stops a [`sample_tree`](Opxml::sample_tree) walk between
/// two runs.
#[derive(Debug, Clone)]
pub struct Opxml<'r> {
    runner: OpxmlRunner<'r>,
    cancel: CancellationToken,
}

impl Default for Opxml<'static> {
    fn default() -> Self {
        Opxml::new(OpxmlRunner::default())
    }
}

impl<'r> Opxml<'r> {
    pub fn new(runner: OpxmlRunner<'r>) -> Self {
        Opxml {
            runner,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Counters, CPU frequency, daemon defaults and the hardware events of each counter.
    pub fn info(&self) -> Result<OpInfo> {
        self.runner.run_as([INFO_ARG], &self.cancel)
    }

    /// Asks the producer whether the event can be programmed on its counter. A rejected event
    /// is an `Ok` result with `valid == false`.
    pub fn check_events(&self, event: &DaemonEvent) -> Result<CheckEventsResult> {
        let counter = event.counter.to_string();
        let unit_mask = event.unit_mask.to_string();
        self.runner.run_as(
            [
                CHECKEVENTS_ARG,
                counter.as_str(),
                event.name.as_str(),
                unit_mask.as_str(),
            ],
            &self.cancel,
        )
    }

    /// Lists the sessions with samples, optionally restricted to some events.
    pub fn sessions(&self, events: &[&str]) -> Result<SessionList> {
        let args = std::iter::once(SESSIONS_ARG).chain(events.iter().copied());
        self.runner.run_as(args, &self.cancel)
    }

    /// Images, symbols and samples collected for `event` in `session`.
    pub fn model_data(&self, event: &str, session: &str) -> Result<ModelData> {
        self.runner.run_as([MODELDATA_ARG, event, session], &self.cancel)
    }

    /// Walks every event and session and loads their model data.
    ///
    /// Sessions that are not attached to an event cannot be queried and are left out.
    pub fn sample_tree(&self) -> Result<SampleTree> {
        let sessions = self.sessions(&[])?;
        let mut tree = SampleTree::default();

        for (event, names) in sessions.by_event() {
            let Some(event) = event else {
                debug!("skipping {} session(s) without an event", names.len());
                continue;
            };

            let mut samples = EventSamples {
                name: event.to_string(),
                sessions: Vec::with_capacity(names.len()),
            };
            for name in names {
                samples.sessions.push(SessionSamples {
                    name: name.to_string(),
                    data: self.model_data(event, name)?,
                });
            }
            tree.events.push(samples);
        }

        Ok(tree)
    }
}
