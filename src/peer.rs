//! The sending side of the exchange, run by every rank except the root.

use crate::error::{Error, Phase, Result};
use crate::group::GroupContext;
use crate::message::Communicator;
use crate::protocol::{Frame, ROOT};
use tracing::debug;

/// Placeholder in a greeting template that is replaced by the sender's rank.
pub const RANK_PLACEHOLDER: &str = "{rank}";

/// Template used when none is configured.
pub const DEFAULT_GREETING: &str = "Процесс {rank} приветствует главный!";

/// The text a peer sends, as a function of its rank.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Greeting {
    template: String,
}

impl Greeting {
    /// The template must mention `{rank}`, so that every message can be
    /// traced back to its sender.
    pub fn new(template: impl Into<String>) -> Result<Self> {
        let template = template.into();
        if !template.contains(RANK_PLACEHOLDER) {
            return Err(Error::Config(format!(
                "greeting template {:?} does not contain {}",
                template, RANK_PLACEHOLDER
            )));
        }
        Ok(Self { template })
    }

    pub fn render(&self, rank: usize) -> String {
        self.template.replace(RANK_PLACEHOLDER, &rank.to_string())
    }
}

impl Default for Greeting {
    fn default() -> Self {
        Self {
            template: DEFAULT_GREETING.to_string(),
        }
    }
}

/// Send one message to the root: first its length in code points on the
/// length tag, then the code points on the payload tag. Nothing is retried.
pub fn send_message<C: Communicator>(comm: &C, context: GroupContext, text: &str) -> Result<()> {
    let payload: Vec<char> = text.chars().collect();
    let length = Frame::Length(payload.len());
    let payload = Frame::Payload(payload);

    debug!(rank = context.rank, length = ?length, "announcing message");
    comm.send(ROOT, length.tag(), length.encode())
        .map_err(Error::transport(Phase::SendLength, ROOT))?;

    comm.send(ROOT, payload.tag(), payload.encode())
        .map_err(Error::transport(Phase::SendPayload, ROOT))?;
    debug!(rank = context.rank, "message sent");
    Ok(())
}
