//! Best-effort pretty-printed XML trace of request/response envelopes.
//!
//! The worker runs off the calling thread; enqueueing never blocks and
//! never fails the call. Jobs are dropped when tracing is off or the
//! queue is full.

use std::thread;

use crossbeam_channel::{Receiver, Sender, bounded};
use tracing::{Level, debug, warn};
use xmltree::{Element, EmitterConfig};

const TRACE_QUEUE_DEPTH: usize = 32;

#[derive(Clone, Copy)]
pub(crate) enum Direction {
    Outbound,
    Inbound,
}

impl Direction {
    fn label(self) -> &'static str {
        match self {
            Direction::Outbound => "Sending post:",
            Direction::Inbound => "Receiving post response:",
        }
    }
}

struct TraceJob {
    direction: Direction,
    url: String,
    xml: Vec<u8>,
}

pub(crate) struct XmlTracer {
    tx: Option<Sender<TraceJob>>,
}

impl XmlTracer {
    pub(crate) fn start() -> Self {
        let (tx, rx) = bounded(TRACE_QUEUE_DEPTH);

        match thread::Builder::new()
            .name("soap-xml-trace".into())
            .spawn(move || run_trace_worker(rx))
        {
            Ok(_) => Self { tx: Some(tx) },
            Err(err) => {
                warn!("Failed to spawn XML trace worker: {}", err);
                Self { tx: None }
            }
        }
    }

    pub(crate) fn enqueue(&self, direction: Direction, url: &str, xml: &[u8]) {
        if !tracing::enabled!(Level::DEBUG) {
            return;
        }

        if let Some(tx) = &self.tx {
            let _ = tx.try_send(TraceJob {
                direction,
                url: url.to_string(),
                xml: xml.to_vec(),
            });
        }
    }
}

fn run_trace_worker(rx: Receiver<TraceJob>) {
    while let Ok(job) = rx.recv() {
        match pretty_print(&job.xml) {
            Some(pretty) => debug!("{} {}\n{}", job.direction.label(), job.url, pretty),
            None => debug!(
                "{} {} ({} bytes, not printable as XML)",
                job.direction.label(),
                job.url,
                job.xml.len()
            ),
        }
    }
}

fn pretty_print(xml: &[u8]) -> Option<String> {
    let root = Element::parse(xml).ok()?;

    let config = EmitterConfig::new()
        .perform_indent(true)
        .indent_string("  ");

    let mut out = Vec::new();
    root.write_with_config(&mut out, config).ok()?;
    String::from_utf8(out).ok()
}
