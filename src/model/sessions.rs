use serde::Serialize;

/// A saved (or the current) profiling session, as listed by opxml.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionEntry {
    /// The event the session collected samples for, when opxml grouped sessions by event.
    pub event: Option<String>,
    pub name: String,
}

/// Sessions in document order. Duplicates are kept: the same session name appears once
/// per event it has samples for.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionList {
    pub sessions: Vec<SessionEntry>,
}

impl SessionList {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sessions.iter().map(|s| s.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Sessions grouped by event, in order of first appearance. Sessions without an event
    /// are grouped under `None`.
    pub fn by_event(&self) -> Vec<(Option<&str>, Vec<&str>)> {
        let mut groups: Vec<(Option<&str>, Vec<&str>)> = Vec::new();
        for entry in &self.sessions {
            let event = entry.event.as_deref();
            match groups.iter_mut().find(|(e, _)| *e == event) {
                Some((_, names)) => names.push(entry.name.as_str()),
                None => groups.push((event, vec![entry.name.as_str()])),
            }
        }
        groups
    }
}
