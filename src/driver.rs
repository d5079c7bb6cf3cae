//! Runs one rank from start to finish: initialize the group, report in,
//! play the role that the rank dictates, and finalize.

use crate::error::Result;
use crate::group::Group;
use crate::message::Communicator;
use crate::peer::{self, Greeting};
use crate::root::{self, Received, Summary};
use serde::Serialize;
use std::io::Write;
use tracing::info;

/// How the console report is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    /// One human-readable line per event
    #[default]
    Text,
    /// One JSON object per line
    Json,
}

/// What a rank did before it finalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// A peer delivered its message.
    Sent,
    /// The root collected every peer's message.
    Collected(Summary),
}

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "lowercase")]
enum Event<'a> {
    Ready { rank: usize, size: usize },
    Received(&'a Received),
    Summary(Summary),
}

struct Reporter<W> {
    out: W,
    format: Format,
}

impl<W: Write> Reporter<W> {
    fn emit(&mut self, event: Event) -> Result<()> {
        match self.format {
            Format::Text => match event {
                Event::Ready { rank, size } => {
                    writeln!(self.out, "Process {} of {} is ready", rank, size)?
                }
                Event::Received(r) => writeln!(self.out, "Received from {}: {}", r.source, r.text)?,
                Event::Summary(s) => writeln!(self.out, "Messages processed: {}", s.processed)?,
            },
            Format::Json => {
                serde_json::to_writer(&mut self.out, &event).map_err(std::io::Error::from)?;
                writeln!(self.out)?;
            }
        }
        Ok(self.out.flush()?)
    }
}

/// Run one rank of the exchange over the given transport, writing the
/// console report to `out`. The group is finalized before this returns,
/// whether or not the exchange succeeded.
pub fn run_rank<C, W>(comm: C, greeting: &Greeting, format: Format, out: W) -> Result<Outcome>
where
    C: Communicator,
    W: Write,
{
    let group = Group::init(comm)?;
    let context = group.context();
    let mut reporter = Reporter { out, format };
    reporter.emit(Event::Ready {
        rank: context.rank,
        size: context.size,
    })?;

    let outcome = if context.is_root() {
        let summary = root::collect(group.comm(), context, |r| {
            reporter.emit(Event::Received(r))
        })?;
        reporter.emit(Event::Summary(summary))?;
        info!(processed = summary.processed, "root finished");
        Outcome::Collected(summary)
    } else {
        peer::send_message(group.comm(), context, &greeting.render(context.rank))?;
        info!(rank = context.rank, "peer finished");
        Outcome::Sent
    };

    group.finalize();
    Ok(outcome)
}
