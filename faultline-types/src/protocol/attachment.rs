use std::fmt;

use serde::{Deserialize, Serialize};

/// The different types an attachment can have.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttachmentType {
    /// A generic attachment.
    #[default]
    #[serde(rename = "event.attachment")]
    Attachment,
    /// A minidump file.
    #[serde(rename = "event.minidump")]
    Minidump,
    /// A log file.
    #[serde(rename = "event.applelog")]
    FileLog,
}

impl AttachmentType {
    /// The string representation used in the envelope item header.
    pub fn as_str(self) -> &'static str {
        match self {
            AttachmentType::Attachment => "event.attachment",
            AttachmentType::Minidump => "event.minidump",
            AttachmentType::FileLog => "event.applelog",
        }
    }
}

/// Represents an attachment item.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Attachment {
    /// The actual attachment data.
    pub buffer: Vec<u8>,
    /// The filename of the attachment.
    pub filename: String,
    /// The special type of this attachment.
    pub ty: Option<AttachmentType>,
    /// The content type of the attachment.
    pub content_type: Option<String>,
}

impl Attachment {
    /// Writes the attachment item header and payload into the given writer.
    pub fn to_writer<W>(&self, writer: &mut W) -> std::io::Result<()>
    where
        W: std::io::Write,
    {
        writeln!(
            writer,
            r#"{{"type":"attachment","length":{length},"filename":"{filename}","attachment_type":"{at}","content_type":"{ct}"}}"#,
            filename = self.filename,
            length = self.buffer.len(),
            at = self.ty.unwrap_or_default().as_str(),
            ct = self
                .content_type
                .as_deref()
                .unwrap_or("application/octet-stream"),
        )?;
        writer.write_all(&self.buffer)?;
        Ok(())
    }
}

impl fmt::Debug for Attachment {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Attachment")
            .field("buffer", &self.buffer.len())
            .field("filename", &self.filename)
            .field("type", &self.ty)
            .field("content_type", &self.content_type)
            .finish()
    }
}
