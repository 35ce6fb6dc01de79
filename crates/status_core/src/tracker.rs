use crate::error::Result;
use crate::extract::BlockExtractor;
use crate::history::{find_latest_block, ChatMessage};
use crate::mapping::map_fields;
use crate::schema::{FieldDescriptor, StatusRecord};
use tracing::{debug, info};

/// Host events that invalidate the displayed status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEvent {
    MessageReceived,
    MessageSwiped(Option<usize>),
    MessageEdited(Option<usize>),
    ChatChanged,
    MessageDeleted(Option<usize>),
}

impl HostEvent {
    pub fn name(&self) -> &'static str {
        match self {
            HostEvent::MessageReceived => "message_received",
            HostEvent::MessageSwiped(_) => "message_swiped",
            HostEvent::MessageEdited(_) => "message_edited",
            HostEvent::ChatChanged => "chat_changed",
            HostEvent::MessageDeleted(_) => "message_deleted",
        }
    }

    pub fn message_id(&self) -> Option<usize> {
        match self {
            HostEvent::MessageSwiped(id) | HostEvent::MessageEdited(id) | HostEvent::MessageDeleted(id) => *id,
            HostEvent::MessageReceived | HostEvent::ChatChanged => None,
        }
    }
}

/// Receiver of scan outcomes. Every scan ends in exactly one call.
pub trait StatusSink {
    fn on_status_update(&mut self, record: &StatusRecord);
    fn on_status_clear(&mut self);
}

/// Sink that keeps the last record, replacing it wholesale.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LatestStatus {
    pub current: Option<StatusRecord>,
}

impl StatusSink for LatestStatus {
    fn on_status_update(&mut self, record: &StatusRecord) {
        self.current = Some(record.clone());
    }

    fn on_status_clear(&mut self) {
        self.current = None;
    }
}

/// Stateless bridge between host events and a status sink.
#[derive(Debug, Clone)]
pub struct StatusTracker {
    extractor: BlockExtractor,
}

impl StatusTracker {
    pub fn new(marker: &str) -> Result<Self> {
        Ok(Self {
            extractor: BlockExtractor::new(marker)?,
        })
    }

    pub fn with_extractor(extractor: BlockExtractor) -> Self {
        Self { extractor }
    }

    pub fn extractor(&self) -> &BlockExtractor {
        &self.extractor
    }

    /// Full backward scan plus mapping; `None` when no message has a block.
    pub fn scan(&self, messages: &[ChatMessage], fields: &[FieldDescriptor]) -> Option<StatusRecord> {
        let block = find_latest_block(&self.extractor, messages)?;
        Some(map_fields(&block, fields))
    }

    pub fn handle_event(
        &self,
        event: HostEvent,
        messages: &[ChatMessage],
        fields: &[FieldDescriptor],
        sink: &mut dyn StatusSink,
    ) {
        debug!(event = event.name(), message_id = ?event.message_id(), "host event");
        self.refresh(messages, fields, sink);
    }

    /// Same as an event, used for the initial load.
    pub fn refresh(&self, messages: &[ChatMessage], fields: &[FieldDescriptor], sink: &mut dyn StatusSink) {
        match self.scan(messages, fields) {
            Some(record) => sink.on_status_update(&record),
            None => {
                info!(marker = self.extractor.marker(), "no status block found, clearing status");
                sink.on_status_clear();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::DEFAULT_MARKER;
    use crate::schema::{FieldType, FieldValue};

    #[derive(Default)]
    struct Recorder {
        calls: Vec<Option<StatusRecord>>,
    }

    impl StatusSink for Recorder {
        fn on_status_update(&mut self, record: &StatusRecord) {
            self.calls.push(Some(record.clone()));
        }

        fn on_status_clear(&mut self) {
            self.calls.push(None);
        }
    }

    fn fields() -> Vec<FieldDescriptor> {
        vec![FieldDescriptor {
            id: "hp-id".into(),
            name: "hp".into(),
            description: String::new(),
            order: 0,
            enabled: true,
            field_type: FieldType::Number,
        }]
    }

    #[test]
    fn each_event_ends_in_exactly_one_sink_call() {
        let tracker = StatusTracker::new(DEFAULT_MARKER).unwrap();
        let mut messages = vec![ChatMessage::assistant("```myst\nweather: rain\nhp: 80%\n```")];
        let mut sink = Recorder::default();

        tracker.handle_event(HostEvent::MessageReceived, &messages, &fields(), &mut sink);
        messages.clear();
        tracker.handle_event(HostEvent::MessageDeleted(Some(0)), &messages, &fields(), &mut sink);

        assert_eq!(sink.calls.len(), 2);
        let record = sink.calls[0].as_ref().unwrap();
        assert_eq!(record.weather, "rain");
        assert_eq!(record.custom_fields["hp-id"].as_f64(), Some(80.0));
        assert!(sink.calls[1].is_none());
    }

    #[test]
    fn later_scans_replace_the_record_wholesale() {
        let tracker = StatusTracker::new(DEFAULT_MARKER).unwrap();
        let mut latest = LatestStatus::default();

        let first = vec![ChatMessage::assistant("```myst\nweather: rain\nhp: 10\n```")];
        tracker.refresh(&first, &fields(), &mut latest);
        assert_eq!(latest.current.as_ref().unwrap().custom_fields["hp-id"], FieldValue::Number(10.0));

        let second = vec![ChatMessage::assistant("```myst\nplace: Home\n```")];
        tracker.handle_event(HostEvent::ChatChanged, &second, &fields(), &mut latest);
        let record = latest.current.as_ref().unwrap();
        assert_eq!(record.location, "Home");
        assert_eq!(record.weather, "");
        assert!(record.custom_fields.is_empty());
    }

    #[test]
    fn event_metadata() {
        assert_eq!(HostEvent::MessageSwiped(Some(4)).message_id(), Some(4));
        assert_eq!(HostEvent::ChatChanged.message_id(), None);
        assert_eq!(HostEvent::MessageEdited(None).name(), "message_edited");
    }
}
