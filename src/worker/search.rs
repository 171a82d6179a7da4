//! Search worker: generates keypairs and tests them against the condition.

use std::sync::Arc;

use crossbeam_channel::{select, Receiver, Sender, TryRecvError, TrySendError};
use log::debug;

use crate::crypto::KeyPair;
use crate::error::SearchError;
use crate::matcher::SearchCondition;

use super::{Control, Event, Report};

/// A worker that generates and tests keypairs until told to quit.
pub struct SearchWorker {
    /// Worker ID
    id: usize,
    /// The condition to match against
    condition: Arc<SearchCondition>,
    /// Shared report channel
    reports: Sender<Report>,
    /// Bounded channel for matching keypairs
    results: Sender<KeyPair>,
    /// Private control channel
    control: Receiver<Control>,
    /// Keys generated since the last count report
    tally: u64,
}

impl SearchWorker {
    /// Creates a new search worker.
    pub fn new(
        id: usize,
        condition: Arc<SearchCondition>,
        reports: Sender<Report>,
        results: Sender<KeyPair>,
        control: Receiver<Control>,
    ) -> Self {
        Self {
            id,
            condition,
            reports,
            results,
            control,
            tally: 0,
        }
    }

    /// Returns the worker ID.
    pub fn id(&self) -> usize {
        self.id
    }

    /// Runs the worker loop until a quit signal arrives or key generation fails.
    ///
    /// The generated count is flushed as a final report in both cases. The
    /// worker is consumed, which closes its control channel.
    pub fn run(mut self) -> Result<(), SearchError> {
        debug!("worker {} started", self.id);
        let outcome = self.search();
        self.flush_count();
        debug!("worker {} stopped", self.id);
        outcome
    }

    fn search(&mut self) -> Result<(), SearchError> {
        loop {
            let keypair = KeyPair::generate()?;
            self.tally += 1;

            if let Some(candidate) = self.condition.test(&keypair.public_key()) {
                if !self.deliver(keypair) {
                    return Ok(());
                }
                self.report(Event::Found(candidate));
                self.flush_count();
            }

            match self.control.try_recv() {
                Err(TryRecvError::Empty) => {}
                Ok(Control::Quit) | Err(TryRecvError::Disconnected) => return Ok(()),
            }
        }
    }

    /// Enqueues a matching keypair, blocking while the result channel is full.
    ///
    /// Returns false if the worker was told to quit before the pair could be
    /// enqueued; the pair is dropped in that case.
    fn deliver(&self, keypair: KeyPair) -> bool {
        match self.results.try_send(keypair) {
            Ok(()) => true,
            Err(TrySendError::Disconnected(_)) => false,
            Err(TrySendError::Full(keypair)) => select! {
                send(self.results, keypair) -> sent => sent.is_ok(),
                recv(self.control) -> _ => false,
            },
        }
    }

    fn report(&self, event: Event) {
        // A closed report channel means the coordinator is gone; the control
        // channel disconnects along with it and ends the loop.
        let _ = self.reports.send(Report { worker: self.id, event });
    }

    fn flush_count(&mut self) {
        let count = std::mem::take(&mut self.tally);
        self.report(Event::Count(count));
    }
}
