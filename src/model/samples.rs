use serde::Serialize;

/// Samples for one event in one session: the binaries that were sampled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelData {
    pub images: Vec<ModelImage>,
}

/// A sampled binary (executable, shared library or kernel module).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelImage {
    pub name: String,
    /// Sum of the symbol counts, or the count opxml reported when the image has no symbols.
    pub count: u64,
    pub symbols: Vec<ModelSymbol>,
    /// Images loaded by this one (libraries, modules), each with its own symbols.
    pub dependents: Vec<ModelImage>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelSymbol {
    pub name: String,
    pub file: Option<String>,
    pub line: Option<u32>,
    /// Sum of the sample counts, or the count opxml reported when the symbol has no samples.
    pub count: u64,
    pub samples: Vec<ModelSample>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModelSample {
    pub addr: u64,
    pub count: u64,
    pub line: Option<u32>,
}

impl ModelData {
    /// Samples in all images, dependents included.
    pub fn total_count(&self) -> u64 {
        self.images.iter().map(ModelImage::total_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }
}

impl ModelImage {
    /// Samples in this image and all of its dependents.
    pub fn total_count(&self) -> u64 {
        self.count
            + self
                .dependents
                .iter()
                .map(ModelImage::total_count)
                .sum::<u64>()
    }

    /// Follows an index path through nested dependents, starting at this image.
    pub(crate) fn descend_mut(&mut self, path: &[usize]) -> Option<&mut ModelImage> {
        match path.split_first() {
            None => Some(self),
            Some((first, rest)) => self.dependents.get_mut(*first)?.descend_mut(rest),
        }
    }

    pub(crate) fn aggregate(&mut self) {
        if !self.symbols.is_empty() {
            self.count = self.symbols.iter().map(|s| s.count).sum();
        }
    }
}

impl ModelSymbol {
    pub(crate) fn aggregate(&mut self) {
        if !self.samples.is_empty() {
            self.count = self.samples.iter().map(|s| s.count).sum();
        }
    }
}

/// Model data of a single session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSamples {
    pub name: String,
    pub data: ModelData,
}

/// The full sample hierarchy: events, their sessions, and the sampled images.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SampleTree {
    pub events: Vec<EventSamples>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventSamples {
    pub name: String,
    pub sessions: Vec<SessionSamples>,
}

impl SampleTree {
    pub fn event(&self, name: &str) -> Option<&EventSamples> {
        self.events.iter().find(|e| e.name == name)
    }
}

impl EventSamples {
    pub fn session(&self, name: &str) -> Option<&SessionSamples> {
        self.sessions.iter().find(|s| s.name == name)
    }

    pub fn total_count(&self) -> u64 {
        self.sessions.iter().map(|s| s.data.total_count()).sum()
    }
}
