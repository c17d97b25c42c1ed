use std::io::Write;

use uuid::Uuid;

use super::attachment::Attachment;
use super::client_report::{ClientReport, DataCategory};
use super::event::Event;
use super::session::SessionUpdate;
use super::transaction::Transaction;

/// An Envelope Item.
///
/// Each item is addressed independently on the wire, with its own type and
/// length-prefixed payload, so the relay can process or reject them
/// individually.
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum EnvelopeItem {
    /// An error or message event.
    Event(Event),
    /// A transaction with its child spans.
    Transaction(Transaction),
    /// A release-health session update.
    SessionUpdate(SessionUpdate),
    /// A client report with aggregated drop counts.
    ClientReport(ClientReport),
    /// An attachment.
    Attachment(Attachment),
}

impl EnvelopeItem {
    /// The data category this item is accounted under.
    pub fn data_category(&self) -> DataCategory {
        match self {
            EnvelopeItem::Event(_) => DataCategory::Error,
            EnvelopeItem::Transaction(_) => DataCategory::Transaction,
            EnvelopeItem::SessionUpdate(_) => DataCategory::Session,
            EnvelopeItem::Attachment(_) => DataCategory::Attachment,
            EnvelopeItem::ClientReport(_) => DataCategory::Default,
        }
    }
}

impl From<Event> for EnvelopeItem {
    fn from(event: Event) -> Self {
        EnvelopeItem::Event(event)
    }
}

impl From<Transaction> for EnvelopeItem {
    fn from(transaction: Transaction) -> Self {
        EnvelopeItem::Transaction(transaction)
    }
}

impl From<SessionUpdate> for EnvelopeItem {
    fn from(session: SessionUpdate) -> Self {
        EnvelopeItem::SessionUpdate(session)
    }
}

impl From<ClientReport> for EnvelopeItem {
    fn from(report: ClientReport) -> Self {
        EnvelopeItem::ClientReport(report)
    }
}

impl From<Attachment> for EnvelopeItem {
    fn from(attachment: Attachment) -> Self {
        EnvelopeItem::Attachment(attachment)
    }
}

/// A Faultline Envelope.
///
/// An Envelope is the data format the relay ingests.  It can contain multiple
/// items, some of which are related, such as events and their attachments,
/// while others, such as sessions, are independent.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Envelope {
    event_id: Option<Uuid>,
    items: Vec<EnvelopeItem>,
}

impl Envelope {
    /// Creates a new empty Envelope.
    pub fn new() -> Envelope {
        Default::default()
    }

    /// Add a new item to this envelope.
    pub fn add_item<I>(&mut self, item: I)
    where
        I: Into<EnvelopeItem>,
    {
        let item = item.into();
        if self.event_id.is_none() {
            match &item {
                EnvelopeItem::Event(event) => self.event_id = Some(event.event_id),
                EnvelopeItem::Transaction(transaction) => {
                    self.event_id = Some(transaction.event_id)
                }
                _ => {}
            }
        }
        self.items.push(item);
    }

    /// Returns an iterator over the items in this envelope.
    pub fn items(&self) -> impl Iterator<Item = &EnvelopeItem> {
        self.items.iter()
    }

    /// Returns the Envelope's Uuid, if any.
    pub fn uuid(&self) -> Option<&Uuid> {
        self.event_id.as_ref()
    }

    /// Returns the [`Event`] contained in this Envelope, if any.
    pub fn event(&self) -> Option<&Event> {
        self.items.iter().find_map(|item| match item {
            EnvelopeItem::Event(event) => Some(event),
            _ => None,
        })
    }

    /// Returns whether the envelope contains no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Filters the envelope's items with a predicate, returning a new
    /// envelope, or `None` if no items remain.
    pub fn filter<P>(self, mut predicate: P) -> Option<Envelope>
    where
        P: FnMut(&EnvelopeItem) -> bool,
    {
        let Envelope { event_id, items } = self;
        let items: Vec<_> = items.into_iter().filter(|item| predicate(item)).collect();
        if items.is_empty() {
            return None;
        }
        let keeps_event = items.iter().any(|item| {
            matches!(item, EnvelopeItem::Event(_) | EnvelopeItem::Transaction(_))
        });
        Some(Envelope {
            event_id: event_id.filter(|_| keeps_event),
            items,
        })
    }

    /// Serialize the envelope into the given [`Write`].
    ///
    /// Each item is written as a JSON header line containing the item type
    /// and payload length, followed by the payload itself.
    pub fn to_writer<W>(&self, mut writer: W) -> std::io::Result<()>
    where
        W: Write,
    {
        let mut item_buf = Vec::new();

        // write the envelope header:
        match self.event_id {
            Some(uuid) => writeln!(writer, r#"{{"event_id":"{}"}}"#, uuid.as_simple())?,
            _ => writeln!(writer, "{{}}")?,
        }

        // write each item:
        for item in &self.items {
            // attachments are not JSON payloads, their header carries more fields
            if let EnvelopeItem::Attachment(attachment) = item {
                attachment.to_writer(&mut writer)?;
                writeln!(writer)?;
                continue;
            }

            // serialize to a temporary buffer first, since the header needs the length
            match item {
                EnvelopeItem::Event(event) => serde_json::to_writer(&mut item_buf, event)?,
                EnvelopeItem::Transaction(transaction) => {
                    serde_json::to_writer(&mut item_buf, transaction)?
                }
                EnvelopeItem::SessionUpdate(session) => {
                    serde_json::to_writer(&mut item_buf, session)?
                }
                EnvelopeItem::ClientReport(report) => {
                    serde_json::to_writer(&mut item_buf, report)?
                }
                EnvelopeItem::Attachment(_) => unreachable!(),
            }
            let item_type = match item {
                EnvelopeItem::Event(_) => "event",
                EnvelopeItem::Transaction(_) => "transaction",
                EnvelopeItem::SessionUpdate(_) => "session",
                EnvelopeItem::ClientReport(_) => "client_report",
                EnvelopeItem::Attachment(_) => unreachable!(),
            };
            writeln!(
                writer,
                r#"{{"type":"{}","length":{}}}"#,
                item_type,
                item_buf.len()
            )?;
            writer.write_all(&item_buf)?;
            writeln!(writer)?;
            item_buf.clear();
        }

        Ok(())
    }

    /// Serializes the envelope into a byte vector.
    pub fn to_vec(&self) -> std::io::Result<Vec<u8>> {
        let mut vec = Vec::new();
        self.to_writer(&mut vec)?;
        Ok(vec)
    }
}

impl From<Event> for Envelope {
    fn from(event: Event) -> Self {
        let mut envelope = Self::default();
        envelope.add_item(event);
        envelope
    }
}

impl From<Transaction> for Envelope {
    fn from(transaction: Transaction) -> Self {
        let mut envelope = Self::default();
        envelope.add_item(transaction);
        envelope
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, SystemTime};

    fn to_buf(envelope: Envelope) -> Vec<u8> {
        envelope.to_vec().unwrap()
    }

    #[test]
    fn test_empty() {
        assert_eq!(to_buf(Envelope::new()), b"{}\n");
    }

    #[test]
    fn test_event() {
        let event_id = Uuid::parse_str("22d00b3f-d1b1-4b5d-8d20-49d138cd8a9c").unwrap();
        let timestamp = SystemTime::UNIX_EPOCH + Duration::new(1_595_256_674, 296_000_000);
        let event = Event {
            event_id,
            timestamp,
            ..Default::default()
        };
        let envelope: Envelope = event.into();
        assert_eq!(
            to_buf(envelope),
            br#"{"event_id":"22d00b3fd1b14b5d8d2049d138cd8a9c"}
{"type":"event","length":110}
{"event_id":"22d00b3fd1b14b5d8d2049d138cd8a9c","level":"error","platform":"native","timestamp":1595256674.296}
"#
            .as_ref()
        )
    }

    #[test]
    fn test_filter_drops_event_id_with_event() {
        let envelope: Envelope = Event::default().into();
        assert!(envelope.uuid().is_some());
        let filtered = envelope.filter(|item| !matches!(item, EnvelopeItem::Event(_)));
        assert!(filtered.is_none());
    }
}
