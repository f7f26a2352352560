//! Background parsing with last-request-wins semantics.
use std::sync::Arc;
use std::sync::mpsc;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::Sender;
use std::sync::mpsc::TryRecvError;
use std::thread;
use std::thread::JoinHandle;

use tracing::debug;
use tracing::trace;
use tracing::warn;

use crate::ast::Ast;
use crate::error::ParseError;
use crate::parser::Flavour;
use crate::parser::MarkdownParser;

struct Request {
    generation: u64,
    source: String,
    flavour: Flavour,
}

/// A finished parse, tagged with the request it answers.
#[derive(Debug)]
pub struct ParseOutcome {
    pub generation: u64,
    pub source: String,
    pub result: Result<Ast, ParseError>,
}

/// Runs [`MarkdownParser::parse`] on a dedicated thread.
///
/// Every [`Self::submit`] bumps the generation. The thread skips requests that a newer one has
/// already superseded, and [`Self::poll`] drops any outcome that is not for the latest
/// generation, so only the most recent submission is ever delivered.
pub struct ParseWorker {
    tx: Option<Sender<Request>>,
    rx: Receiver<ParseOutcome>,
    handle: Option<JoinHandle<()>>,
    latest: u64,
}

impl ParseWorker {
    pub fn spawn(parser: Arc<dyn MarkdownParser>) -> Result<Self, ParseError> {
        let (tx, requests) = mpsc::channel::<Request>();
        let (results, rx) = mpsc::channel::<ParseOutcome>();
        let handle = thread::Builder::new()
            .name("markdown-parse".to_string())
            .spawn(move || run(parser.as_ref(), &requests, &results))
            .map_err(|err| ParseError::Worker(err.to_string()))?;
        Ok(Self {
            tx: Some(tx),
            rx,
            handle: Some(handle),
            latest: 0,
        })
    }

    /// Queues `source` and returns its generation.
    pub fn submit(&mut self, source: impl Into<String>, flavour: &Flavour) -> Result<u64, ParseError> {
        self.latest += 1;
        let request = Request {
            generation: self.latest,
            source: source.into(),
            flavour: flavour.clone(),
        };
        self.tx
            .as_ref()
            .ok_or_else(|| ParseError::Worker("worker stopped".to_string()))?
            .send(request)
            .map_err(|_| ParseError::Worker("parse thread exited".to_string()))?;
        trace!(generation = self.latest, "queued markdown parse");
        Ok(self.latest)
    }

    pub fn latest_generation(&self) -> u64 {
        self.latest
    }

    /// The outcome for the latest submission, once it is ready.
    pub fn poll(&mut self) -> Option<ParseOutcome> {
        let mut found = None;
        loop {
            match self.rx.try_recv() {
                Ok(outcome) if outcome.generation == self.latest => found = Some(outcome),
                Ok(outcome) => {
                    warn!(
                        generation = outcome.generation,
                        latest = self.latest,
                        "discarding stale markdown parse"
                    );
                }
                Err(TryRecvError::Empty) => return found,
                Err(TryRecvError::Disconnected) => {
                    return found.or_else(|| {
                        Some(ParseOutcome {
                            generation: self.latest,
                            source: String::new(),
                            result: Err(ParseError::Worker("parse thread exited".to_string())),
                        })
                    });
                }
            }
        }
    }

    /// Blocks until the latest submission has an outcome.
    pub fn wait(&mut self) -> Result<ParseOutcome, ParseError> {
        loop {
            let outcome = self
                .rx
                .recv()
                .map_err(|_| ParseError::Worker("parse thread exited".to_string()))?;
            if outcome.generation == self.latest {
                return Ok(outcome);
            }
            warn!(
                generation = outcome.generation,
                latest = self.latest,
                "discarding stale markdown parse"
            );
        }
    }
}

impl Drop for ParseWorker {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            warn!("markdown parse thread panicked");
        }
    }
}

fn run(parser: &dyn MarkdownParser, requests: &Receiver<Request>, results: &Sender<ParseOutcome>) {
    while let Ok(mut request) = requests.recv() {
        // Only the newest queued request is worth parsing.
        while let Ok(newer) = requests.try_recv() {
            trace!(
                skipped = request.generation,
                generation = newer.generation,
                "superseded markdown parse"
            );
            request = newer;
        }
        let result = parser.parse(&request.source, &request.flavour);
        if let Err(err) = &result {
            warn!(%err, generation = request.generation, "markdown parse failed");
        }
        let outcome = ParseOutcome {
            generation: request.generation,
            source: request.source,
            result,
        };
        if results.send(outcome).is_err() {
            break;
        }
    }
    debug!("markdown parse thread exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::NodeKind;
    use crate::parser::PulldownParser;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Blocks each parse until the test lets it through.
    struct Gated {
        gate: Mutex<Receiver<()>>,
    }

    impl MarkdownParser for Gated {
        fn parse(&self, source: &str, flavour: &Flavour) -> Result<Ast, ParseError> {
            if let Ok(gate) = self.gate.lock() {
                let _ = gate.recv_timeout(Duration::from_secs(5));
            }
            PulldownParser.parse(source, flavour)
        }
    }

    #[test]
    fn parses_in_background() {
        let mut worker = ParseWorker::spawn(Arc::new(PulldownParser)).unwrap();
        let generation = worker.submit("# hi", &Flavour::default()).unwrap();
        let outcome = worker.wait().unwrap();
        assert_eq!(outcome.generation, generation);
        let ast = outcome.result.unwrap();
        assert_eq!(
            ast.kind(ast.root_children()[0]),
            &NodeKind::Heading {
                level: 1,
                setext: false
            }
        );
    }

    #[test]
    fn last_request_wins() {
        let (open, gate) = mpsc::channel();
        let parser = Arc::new(Gated {
            gate: Mutex::new(gate),
        });
        let mut worker = ParseWorker::spawn(parser).unwrap();
        worker.submit("first", &Flavour::default()).unwrap();
        worker.submit("second", &Flavour::default()).unwrap();
        let last = worker.submit("third", &Flavour::default()).unwrap();
        for _ in 0..3 {
            open.send(()).unwrap();
        }
        let outcome = worker.wait().unwrap();
        assert_eq!(outcome.generation, last);
        assert_eq!(outcome.source, "third");
        assert!(worker.poll().is_none());
    }

    #[test]
    fn errors_are_delivered() {
        let mut worker = ParseWorker::spawn(Arc::new(PulldownParser)).unwrap();
        let flavour = Flavour {
            max_input_len: Some(1),
            ..Flavour::default()
        };
        worker.submit("long", &flavour).unwrap();
        let outcome = worker.wait().unwrap();
        assert_eq!(outcome.result, Err(ParseError::TooLarge { len: 4, max: 1 }));
    }
}
