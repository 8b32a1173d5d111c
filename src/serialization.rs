use std::io::Cursor;

use serde_json::Value;

use crate::client::Error;

/// Wire format for record streams (items, logs, collection entries).
///
/// The platform serves both; msgpack is the default because item payloads can
/// be large and repetitive. `HS_DISABLE_MSGPACK` forces JSON everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    Json,
    MsgPack,
}

impl WireFormat {
    pub fn accept(&self) -> &'static str {
        match self {
            Self::Json => "application/x-jsonlines",
            Self::MsgPack => "application/x-msgpack",
        }
    }

    /// Cassette-name suffix for tests parameterized over the wire format.
    /// Only the JSON variant is suffixed; msgpack cassettes keep the bare name.
    pub fn cassette_suffix(&self) -> &'static str {
        match self {
            Self::Json => "-json",
            Self::MsgPack => "",
        }
    }

    pub fn decode_records(&self, body: Vec<u8>) -> RecordIter {
        RecordIter {
            format: *self,
            cursor: Cursor::new(body),
        }
    }
}

/// Lazy, single-pass iterator over the records of a response body, either
/// JSON-lines or a concatenated msgpack value stream.
pub struct RecordIter {
    format: WireFormat,
    cursor: Cursor<Vec<u8>>,
}

impl RecordIter {
    fn at_end(&self) -> bool {
        self.cursor.position() as usize >= self.cursor.get_ref().len()
    }

    fn next_json_line(&mut self) -> Option<Result<Value, Error>> {
        let buffer = self.cursor.get_ref();
        let mut start = self.cursor.position() as usize;
        while start < buffer.len() && (buffer[start] == b'\n' || buffer[start] == b'\r') {
            start += 1;
        }
        if start >= buffer.len() {
            self.cursor.set_position(buffer.len() as u64);
            return None;
        }

        let end = buffer[start..]
            .iter()
            .position(|byte| *byte == b'\n')
            .map_or(buffer.len(), |offset| start + offset);
        let line = &buffer[start..end];
        let parsed = serde_json::from_slice(line)
            .map_err(|err| Error::Decode(format!("decode json record: {err}")));
        self.cursor.set_position(end as u64);
        Some(parsed)
    }

    fn next_msgpack_value(&mut self) -> Option<Result<Value, Error>> {
        if self.at_end() {
            return None;
        }
        Some(
            rmp_serde::decode::from_read(&mut self.cursor)
                .map_err(|err| Error::Decode(format!("decode msgpack record: {err}"))),
        )
    }
}

impl Iterator for RecordIter {
    type Item = Result<Value, Error>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.format {
            WireFormat::Json => self.next_json_line(),
            WireFormat::MsgPack => self.next_msgpack_value(),
        }
    }
}
