//! Document header.

/// Header of a devices or streams document.
///
/// Attributes not modelled here are not preserved.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Header {
    pub creation_time: Option<String>,
    pub sender: Option<String>,
    pub instance_id: Option<u64>,
    pub version: Option<String>,
    pub buffer_size: Option<u64>,
    pub asset_buffer_size: Option<u64>,
    pub asset_count: Option<u64>,
    pub first_sequence: Option<u64>,
    pub last_sequence: Option<u64>,
    pub next_sequence: Option<u64>,
    pub device_model_change_time: Option<String>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_creation_time(mut self, time: impl Into<String>) -> Self {
        self.creation_time = Some(time.into());
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_instance_id(mut self, instance_id: u64) -> Self {
        self.instance_id = Some(instance_id);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Sets the sequence window of a streams header.
    pub fn with_sequences(mut self, first: u64, last: u64, next: u64) -> Self {
        self.first_sequence = Some(first);
        self.last_sequence = Some(last);
        self.next_sequence = Some(next);
        self
    }
}
