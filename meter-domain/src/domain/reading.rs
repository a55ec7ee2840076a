use time::OffsetDateTime;

use super::MeterType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScmMessage {
    pub meter_id: u64,
    pub protocol_type: u32,
    pub consumption: u64,
}

/// One decoded observation from the radio decoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reading {
    pub time: OffsetDateTime,
    /// Decoder sample offset, passed through untouched.
    pub offset: i64,
    pub meter_type: MeterType,
    pub message: ScmMessage,
}

impl Reading {
    pub fn meter_id(&self) -> u64 {
        self.message.meter_id
    }
}
