//! Broadcast fan-out
//!
//! Delivers one record to many participants. Each recipient is independent:
//! a full or closed queue loses that one copy and nothing else.

use log::debug;

use crate::error::DeliveryError;
use crate::protocol::{ServerMessage, encode_message};
use crate::session::{Participant, SessionId};

/// What happened to one fan-out.
///
/// Failures are kept so tests can see them; the relay itself never reports
/// them back to whoever caused the broadcast.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanoutReport {
    pub delivered: usize,
    pub failures: Vec<DeliveryError>,
}

impl FanoutReport {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failures.len()
    }
}

/// Serializes `message` once and queues it for every recipient except
/// `exclude`.
pub fn fan_out<'a, I>(
    recipients: I,
    message: &ServerMessage,
    exclude: Option<SessionId>,
) -> Result<FanoutReport, serde_json::Error>
where
    I: IntoIterator<Item = &'a Participant>,
{
    let frame = encode_message(message)?;
    let mut report = FanoutReport::default();

    for participant in recipients {
        if Some(participant.id()) == exclude {
            continue;
        }
        match participant.deliver(frame.clone()) {
            Ok(()) => report.delivered += 1,
            Err(e) => {
                debug!("Dropped broadcast copy: {}", e);
                report.failures.push(e);
            }
        }
    }

    Ok(report)
}
