//! Coordinator: spawns the workers, enforces the quota and collects results.

use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, never, select, Receiver, Sender};
use log::{debug, error, info, warn};

use crate::config::SearchConfig;
use crate::crypto::KeyPair;
use crate::error::SearchError;
use crate::output::{KeyFileWriter, KeyFiles};

use super::{Control, Event, Report, SearchWorker, WorkerExit};

/// Counters for one search run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchStats {
    /// Accepted matches
    pub found: usize,
    /// Keys generated by all workers
    pub generated: u64,
    /// Time from spawning the workers until the last one stopped
    pub elapsed: Duration,
}

impl SearchStats {
    /// Returns the generation rate in keys per second.
    pub fn throughput(&self) -> u64 {
        throughput(self.generated, self.elapsed)
    }
}

/// Keys per second for `generated` keys over `elapsed`; zero if no time passed.
pub fn throughput(generated: u64, elapsed: Duration) -> u64 {
    let nanos = elapsed.as_nanos();
    if nanos == 0 {
        return 0;
    }
    let rate = u128::from(generated) * 1_000_000_000 / nanos;
    u64::try_from(rate).unwrap_or(u64::MAX)
}

/// Matching keypairs collected by a finished search, in drain order.
#[derive(Debug)]
pub struct Harvest {
    pub keypairs: Vec<KeyPair>,
    pub stats: SearchStats,
}

/// Outcome of a search followed by persistence.
#[derive(Debug)]
pub struct SearchSummary {
    pub stats: SearchStats,
    /// Files written, indexed by their suffix
    pub written: Vec<KeyFiles>,
    /// Key pairs that could not be written
    pub failures: Vec<SearchError>,
}

/// Mutable state of the report loop.
#[derive(Default)]
struct Tally {
    found: usize,
    generated: u64,
    exited: usize,
    quit_sent: bool,
    fatal: Option<SearchError>,
    pending: Vec<KeyPair>,
}

impl Tally {
    /// Sends one quit signal to every worker. Never sends twice.
    fn broadcast_quit(&mut self, controls: &[Sender<Control>]) {
        if self.quit_sent {
            return;
        }
        self.quit_sent = true;
        debug!("Stopping {} worker(s)", controls.len());
        for control in controls {
            // Capacity is one and this is the only send, so this only fails
            // for a worker that has already stopped.
            let _ = control.try_send(Control::Quit);
        }
    }
}

/// Runs a search described by a [`SearchConfig`].
pub struct Coordinator {
    config: SearchConfig,
}

impl Coordinator {
    /// Creates a coordinator for the given configuration.
    pub fn new(config: SearchConfig) -> Self {
        Self { config }
    }

    /// Searches, then writes every accepted keypair to disk.
    ///
    /// A keypair that cannot be written is recorded in
    /// [`SearchSummary::failures`] without affecting the others. `interrupt`
    /// is dropped before the files are written, so later sends on it fail
    /// with a disconnected error instead of being queued unread.
    pub fn run(&self, interrupt: Receiver<()>) -> Result<SearchSummary, SearchError> {
        let harvest = self.search(&interrupt)?;
        drop(interrupt);
        let (written, failures) = self.persist(&harvest.keypairs);
        Ok(SearchSummary {
            stats: harvest.stats,
            written,
            failures,
        })
    }

    /// Runs the workers until the quota is met or `interrupt` fires, and
    /// returns the accepted keypairs.
    ///
    /// In unlimited mode only `interrupt` ends the search.
    pub fn search(&self, interrupt: &Receiver<()>) -> Result<Harvest, SearchError> {
        let workers = self.config.workers.max(1);
        let quota = self.config.quota.max(1);
        let unlimited = self.config.unlimited;

        let (report_tx, report_rx) = bounded::<Report>(self.config.report_capacity.max(1));
        let (result_tx, result_rx) = bounded::<KeyPair>(quota);
        let (exit_tx, exit_rx) = bounded::<WorkerExit>(workers);

        let start = Instant::now();
        let mut controls = Vec::with_capacity(workers);
        let mut handles = Vec::with_capacity(workers);

        for id in 0..workers {
            let (control_tx, control_rx) = bounded(1);
            let worker = SearchWorker::new(
                id,
                self.config.condition.clone(),
                report_tx.clone(),
                result_tx.clone(),
                control_rx,
            );
            let exit_tx = exit_tx.clone();

            let spawned = thread::Builder::new()
                .name(format!("ssh-vanity-worker-{}", id))
                .spawn(move || {
                    let outcome = panic::catch_unwind(AssertUnwindSafe(|| worker.run()))
                        .unwrap_or_else(|_| Err(SearchError::WorkerPanicked(id)));
                    let _ = exit_tx.send(WorkerExit { worker: id, outcome });
                });

            match spawned {
                Ok(handle) => {
                    controls.push(control_tx);
                    handles.push(handle);
                }
                Err(err) => {
                    // Unblock workers already running, then stop them.
                    drop(report_rx);
                    drop(result_rx);
                    Tally::default().broadcast_quit(&controls);
                    join_all(handles);
                    return Err(SearchError::Spawn(err));
                }
            }
        }
        drop(report_tx);
        drop(result_tx);
        drop(exit_tx);

        info!(
            "Searching with {} worker(s) for {}",
            workers,
            if unlimited {
                "an unlimited number of keys".to_string()
            } else {
                format!("{} key(s)", quota)
            }
        );

        let mut tally = Tally::default();
        let mut reports_open = true;
        let mut interrupt_open = true;
        let mut results_open = unlimited;

        while tally.exited < workers {
            let reports = if reports_open { report_rx.clone() } else { never() };
            let interrupts = if interrupt_open { interrupt.clone() } else { never() };
            // Without a quota nobody drains the result channel after the
            // loop, so pairs are collected as they arrive.
            let results = if results_open { result_rx.clone() } else { never() };

            select! {
                recv(reports) -> report => match report {
                    Ok(report) => self.handle_report(report, &mut tally, &controls),
                    Err(_) => reports_open = false,
                },
                recv(exit_rx) -> exit => match exit {
                    Ok(exit) => handle_exit(exit, &mut tally, &controls),
                    Err(_) => tally.exited = workers,
                },
                recv(interrupts) -> signal => match signal {
                    Ok(()) => {
                        warn!("Interrupted, stopping workers");
                        tally.broadcast_quit(&controls);
                    }
                    Err(_) => interrupt_open = false,
                },
                recv(results) -> keypair => match keypair {
                    Ok(keypair) => tally.pending.push(keypair),
                    Err(_) => results_open = false,
                },
            }
        }

        // Every report was sent before its worker's exit message.
        for report in report_rx.try_iter() {
            self.handle_report(report, &mut tally, &controls);
        }
        let elapsed = start.elapsed();
        join_all(handles);

        if let Some(err) = tally.fatal {
            return Err(err);
        }

        let mut keypairs = tally.pending;
        keypairs.extend(result_rx.try_iter());
        if keypairs.len() != tally.found {
            warn!(
                "Collected {} key pair(s) for {} match(es)",
                keypairs.len(),
                tally.found
            );
        }
        if !unlimited && tally.found < quota {
            warn!("Stopped after {} of {} key(s)", tally.found, quota);
        }

        Ok(Harvest {
            keypairs,
            stats: SearchStats {
                found: tally.found,
                generated: tally.generated,
                elapsed,
            },
        })
    }

    fn handle_report(&self, report: Report, tally: &mut Tally, controls: &[Sender<Control>]) {
        match report.event {
            Event::Found(candidate) => {
                tally.found += 1;
                info!("Found: {} (worker {})", candidate, report.worker);
                if !self.config.unlimited && tally.found >= self.config.quota {
                    tally.broadcast_quit(controls);
                }
            }
            Event::Count(count) => tally.generated += count,
        }
    }

    /// Writes keypairs as `id_ed25519_00`, `id_ed25519_01`, ...
    fn persist(&self, keypairs: &[KeyPair]) -> (Vec<KeyFiles>, Vec<SearchError>) {
        let writer = KeyFileWriter::new(&self.config.output_dir);
        let mut written = Vec::with_capacity(keypairs.len());
        let mut failures = Vec::new();

        for (index, keypair) in keypairs.iter().enumerate() {
            match writer.write(index, keypair, &self.config.comment) {
                Ok(files) => {
                    info!("Saved {}", files.private_path.display());
                    written.push(files);
                }
                Err(err) => {
                    error!("Could not save key pair {:02}: {}", index, err);
                    failures.push(err);
                }
            }
        }

        (written, failures)
    }
}

fn handle_exit(exit: WorkerExit, tally: &mut Tally, controls: &[Sender<Control>]) {
    tally.exited += 1;
    debug!("Worker {} finished", exit.worker);

    if let Err(err) = exit.outcome {
        if err.is_fatal() {
            error!("Worker {} failed: {}", exit.worker, err);
            tally.fatal.get_or_insert(err);
            tally.broadcast_quit(controls);
        } else {
            warn!("Worker {} stopped: {}", exit.worker, err);
        }
    }
}

fn join_all(handles: Vec<JoinHandle<()>>) {
    for handle in handles {
        let _ = handle.join();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::matcher::SearchCondition;
    use std::collections::HashSet;

    fn make_config(pattern: &str, quota: usize, workers: usize, unlimited: bool) -> SearchConfig {
        let mut config = SearchConfig::new(SearchCondition::new(pattern).unwrap());
        config.quota = quota;
        config.workers = workers;
        config.unlimited = unlimited;
        config
    }

    fn interrupt_after(delay: Duration) -> Receiver<()> {
        let (tx, rx) = bounded(1);
        thread::spawn(move || {
            thread::sleep(delay);
            let _ = tx.send(());
            // Keep the sender alive so the channel never reads as closed.
            thread::sleep(Duration::from_secs(60));
        });
        rx
    }

    #[test]
    fn test_throughput() {
        assert_eq!(throughput(1_000, Duration::from_secs(1)), 1_000);
        assert_eq!(throughput(3, Duration::from_secs(2)), 1);
        assert_eq!(throughput(5, Duration::from_millis(500)), 10);
    }

    #[test]
    fn test_throughput_zero_elapsed() {
        assert_eq!(throughput(0, Duration::ZERO), 0);
        assert_eq!(throughput(1_000_000, Duration::ZERO), 0);
        assert_eq!(throughput(u64::MAX, Duration::from_nanos(1)), u64::MAX);
    }

    #[test]
    fn test_quota_reached_exactly() {
        let (_tx, interrupt) = bounded(1);
        let coordinator = Coordinator::new(make_config("^AAAAC3", 3, 4, false));
        let harvest = coordinator.search(&interrupt).unwrap();

        assert_eq!(harvest.keypairs.len(), 3);
        assert_eq!(harvest.stats.found, 3);
        assert!(harvest.stats.generated >= 3);

        let distinct: HashSet<[u8; 32]> = harvest.keypairs.iter().map(|k| k.public_key()).collect();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_single_match_many_workers() {
        let (_tx, interrupt) = bounded(1);
        let condition = "^AAAAC3NzaC1lZDI1NTE5AAAAI[A-D]";
        let coordinator = Coordinator::new(make_config(condition, 1, 4, false));
        let harvest = coordinator.search(&interrupt).unwrap();

        assert_eq!(harvest.keypairs.len(), 1);
        let matcher = SearchCondition::new(condition).unwrap();
        assert!(matcher.test(&harvest.keypairs[0].public_key()).is_some());
    }

    #[test]
    fn test_interrupt_before_quota() {
        let coordinator = Coordinator::new(make_config("never matches!", 5, 2, false));
        let harvest = coordinator.search(&interrupt_after(Duration::from_millis(50))).unwrap();

        assert!(harvest.keypairs.is_empty());
        assert_eq!(harvest.stats.found, 0);
        assert!(harvest.stats.generated > 0);
    }

    #[test]
    fn test_unlimited_waits_for_interrupt() {
        let delay = Duration::from_millis(200);
        let coordinator = Coordinator::new(make_config("never matches!", 1, 2, true));
        let harvest = coordinator.search(&interrupt_after(delay)).unwrap();

        assert!(harvest.stats.elapsed >= delay);
        assert!(harvest.keypairs.is_empty());
    }

    #[test]
    fn test_unlimited_collects_every_match() {
        // Every key matches; the quota of one must not stop the search.
        let delay = Duration::from_millis(100);
        let coordinator = Coordinator::new(make_config("^AAAA", 1, 2, true));
        let harvest = coordinator.search(&interrupt_after(delay)).unwrap();

        assert!(harvest.stats.elapsed >= delay);
        assert!(harvest.stats.found > 1);
        assert_eq!(harvest.keypairs.len(), harvest.stats.found);
    }

    #[test]
    fn test_run_persists_each_match() {
        let dir = std::env::temp_dir().join(format!("ssh-vanity-coordinator-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();

        let mut config = make_config("^AAAA", 2, 2, false);
        config.output_dir = dir.clone();
        config.comment = "coordinator@test".into();

        let (_tx, interrupt) = bounded(1);
        let summary = Coordinator::new(config).run(interrupt).unwrap();
        assert!(summary.failures.is_empty());
        assert_eq!(summary.written.len(), 2);
        assert!(dir.join("id_ed25519_00").is_file());
        assert!(dir.join("id_ed25519_01.pub").is_file());
        assert!(!dir.join("id_ed25519_02").exists());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_run_reports_write_failures() {
        let mut config = make_config("^AAAA", 1, 1, false);
        config.output_dir = std::env::temp_dir().join("ssh-vanity-missing-dir-9c1e");

        let (_tx, interrupt) = bounded(1);
        let summary = Coordinator::new(config).run(interrupt).unwrap();
        assert!(summary.written.is_empty());
        assert_eq!(summary.failures.len(), 1);
        assert!(matches!(summary.failures[0], SearchError::FileSystem { .. }));
    }

    #[test]
    fn test_run_releases_interrupt_before_saving() {
        let dir = std::env::temp_dir().join(format!("ssh-vanity-release-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut config = make_config("^AAAA", 1, 1, false);
        config.output_dir = dir.clone();

        let (tx, interrupt) = bounded(1);
        let summary = Coordinator::new(config).run(interrupt).unwrap();
        assert_eq!(summary.written.len(), 1);
        assert!(matches!(
            tx.try_send(()),
            Err(crossbeam_channel::TrySendError::Disconnected(()))
        ));

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_unlimited_interrupt_without_match_writes_nothing() {
        let dir = std::env::temp_dir().join(format!("ssh-vanity-unlimited-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let mut config = make_config("never matches!", 1, 2, true);
        config.output_dir = dir.clone();

        let summary = Coordinator::new(config)
            .run(interrupt_after(Duration::from_millis(100)))
            .unwrap();
        assert_eq!(summary.stats.found, 0);
        assert!(summary.written.is_empty());
        assert!(summary.failures.is_empty());
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
