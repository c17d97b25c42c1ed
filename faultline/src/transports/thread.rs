use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{sync_channel, SyncSender, TrySendError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use faultline_core::protocol::{DiscardReason, Envelope};
use faultline_core::{faultline_debug, ClientOptions, OutcomeRecorder};

use super::ratelimit::{RateLimiter, RateLimitingCategory};

/// How often accumulated client reports are sent along at the latest.
const REPORT_FLUSH_INTERVAL: Duration = Duration::from_secs(60);

/// The initial sleep before the first re-send of a retryable envelope.
/// Doubles with every further attempt.
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(250);

/// The outcome of a single HTTP submission attempt.
pub enum SendResult {
    /// The relay accepted the envelope.
    Success,
    /// The relay answered with `429`, the items count as rate limited.
    RateLimited,
    /// A transient failure, trying again later may succeed.
    Retryable,
    /// A permanent failure, trying again will not help.
    Fatal,
}

enum Task {
    SendEnvelope(Envelope),
    Flush(SyncSender<()>),
    Shutdown,
}

/// The worker thread shared by all HTTP transports.
///
/// Envelopes are handed over through a bounded queue.  When the queue is at
/// capacity the newest envelope is dropped and counted as a `QueueOverflow`
/// outcome rather than blocking the thread that captured the event.
pub struct TransportThread {
    sender: SyncSender<Task>,
    outcomes: OutcomeRecorder,
    shutdown: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl TransportThread {
    pub fn new<SendFn>(options: &ClientOptions, outcomes: OutcomeRecorder, mut send: SendFn) -> Self
    where
        SendFn: FnMut(&Envelope, &mut RateLimiter) -> SendResult + Send + 'static,
    {
        let (sender, receiver) = sync_channel(options.max_queue_size);
        let max_retries = options.send_retries;
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_worker = shutdown.clone();
        let worker_outcomes = outcomes.clone();
        let handle = thread::Builder::new()
            .name("faultline-transport".into())
            .spawn(move || {
                let mut rl = RateLimiter::new();
                let mut last_report = Instant::now();

                let flush_report =
                    |send: &mut SendFn, rl: &mut RateLimiter, last_report: &mut Instant| {
                        *last_report = Instant::now();
                        if let Some(report) = worker_outcomes.flush() {
                            let mut envelope = Envelope::new();
                            envelope.add_item(report);
                            send(&envelope, rl);
                        }
                    };

                for task in receiver.into_iter() {
                    if shutdown_worker.load(Ordering::SeqCst) {
                        flush_report(&mut send, &mut rl, &mut last_report);
                        return;
                    }
                    let envelope = match task {
                        Task::SendEnvelope(envelope) => envelope,
                        Task::Flush(done) => {
                            flush_report(&mut send, &mut rl, &mut last_report);
                            done.send(()).ok();
                            continue;
                        }
                        Task::Shutdown => {
                            flush_report(&mut send, &mut rl, &mut last_report);
                            return;
                        }
                    };

                    if let Some(time_left) = rl.is_disabled(RateLimitingCategory::Any) {
                        faultline_debug!(
                            "Skipping envelope send, disabled due to rate limits for {}s",
                            time_left.as_secs()
                        );
                        for item in envelope.items() {
                            worker_outcomes
                                .record(DiscardReason::RatelimitBackoff, item.data_category());
                        }
                        continue;
                    }

                    if let Some(envelope) = rl.filter_envelope(envelope, &worker_outcomes) {
                        let mut delay = INITIAL_RETRY_DELAY;
                        let mut attempts = 0;
                        loop {
                            match send(&envelope, &mut rl) {
                                SendResult::Success => break,
                                SendResult::RateLimited => {
                                    for item in envelope.items() {
                                        worker_outcomes.record(
                                            DiscardReason::RatelimitBackoff,
                                            item.data_category(),
                                        );
                                    }
                                    break;
                                }
                                SendResult::Fatal => {
                                    for item in envelope.items() {
                                        worker_outcomes.record(
                                            DiscardReason::SendError,
                                            item.data_category(),
                                        );
                                    }
                                    break;
                                }
                                SendResult::Retryable => {
                                    if attempts >= max_retries
                                        || shutdown_worker.load(Ordering::SeqCst)
                                    {
                                        for item in envelope.items() {
                                            worker_outcomes.record(
                                                DiscardReason::NetworkError,
                                                item.data_category(),
                                            );
                                        }
                                        break;
                                    }
                                    attempts += 1;
                                    faultline_debug!(
                                        "Envelope send failed, retry {attempts} in {delay:?}"
                                    );
                                    thread::sleep(delay);
                                    delay *= 2;
                                }
                            }
                        }
                    } else {
                        faultline_debug!("Envelope was discarded due to per-item rate limits");
                    }

                    if last_report.elapsed() >= REPORT_FLUSH_INTERVAL {
                        flush_report(&mut send, &mut rl, &mut last_report);
                    }
                }
            })
            .ok();

        Self {
            sender,
            outcomes,
            shutdown,
            handle,
        }
    }

    pub fn send(&self, envelope: Envelope) {
        // Dropping on the floor beats blocking the thread that captured the
        // event.  The dropped items still show up in the client report.
        if let Err(TrySendError::Full(Task::SendEnvelope(envelope))) =
            self.sender.try_send(Task::SendEnvelope(envelope))
        {
            faultline_debug!("Envelope dropped, transport queue is full");
            for item in envelope.items() {
                self.outcomes
                    .record(DiscardReason::QueueOverflow, item.data_category());
            }
        }
    }

    pub fn flush(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let (sender, receiver) = sync_channel(1);

        // The queue is bounded, so even enqueueing the flush marker has to
        // respect the deadline.  A pinned worker must not turn a timed flush
        // into an unbounded wait.
        let mut task = Task::Flush(sender);
        loop {
            match self.sender.try_send(task) {
                Ok(()) => break,
                Err(TrySendError::Full(pending)) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return false;
                    }
                    task = pending;
                    thread::sleep(remaining.min(Duration::from_millis(10)));
                }
                Err(TrySendError::Disconnected(_)) => return false,
            }
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        receiver.recv_timeout(remaining).is_ok()
    }
}

impl Drop for TransportThread {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::SeqCst);
        let _ = self.sender.send(Task::Shutdown);
        if let Some(handle) = self.handle.take() {
            handle.join().ok();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::mpsc;
    use std::sync::Mutex;

    use faultline_core::protocol::{DataCategory, EnvelopeItem, Event};

    use super::*;

    fn event_envelope() -> Envelope {
        Envelope::from(Event::new())
    }

    fn options(max_queue_size: usize, send_retries: u32) -> ClientOptions {
        ClientOptions {
            max_queue_size,
            send_retries,
            ..Default::default()
        }
    }

    #[test]
    fn test_full_queue_drops_newest_and_records_overflow() {
        let outcomes = OutcomeRecorder::new();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let thread = TransportThread::new(&options(1, 0), outcomes.clone(), move |_, _| {
            started_tx.send(()).ok();
            let _ = release_rx.recv();
            SendResult::Success
        });

        thread.send(event_envelope());
        // the worker is now inside the send callback, so the queue is empty
        started_rx.recv().unwrap();
        thread.send(event_envelope());
        thread.send(event_envelope());

        let report = outcomes.flush().expect("an overflow outcome");
        assert_eq!(report.discarded_events.len(), 1);
        assert_eq!(
            report.discarded_events[0].reason,
            DiscardReason::QueueOverflow
        );
        assert_eq!(report.discarded_events[0].category, DataCategory::Error);
        assert_eq!(report.discarded_events[0].quantity, 1);

        drop(release_tx);
    }

    #[test]
    fn test_flush_returns_within_deadline_when_worker_is_pinned() {
        let outcomes = OutcomeRecorder::new();
        let (started_tx, started_rx) = mpsc::channel();
        let (release_tx, release_rx) = mpsc::channel::<()>();

        let thread = TransportThread::new(&options(1, 0), outcomes, move |_, _| {
            started_tx.send(()).ok();
            let _ = release_rx.recv();
            SendResult::Success
        });

        thread.send(event_envelope());
        started_rx.recv().unwrap();
        // fill the queue while the worker hangs in the callback
        thread.send(event_envelope());

        let start = Instant::now();
        assert!(!thread.flush(Duration::from_millis(50)));
        assert!(start.elapsed() < Duration::from_secs(2));

        drop(release_tx);
    }

    #[test]
    fn test_retry_exhaustion_is_reported_as_network_error() {
        let outcomes = OutcomeRecorder::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_worker = seen.clone();

        let thread = TransportThread::new(&options(8, 0), outcomes, move |envelope, _| {
            seen_worker.lock().unwrap().push(envelope.clone());
            SendResult::Retryable
        });

        thread.send(event_envelope());
        // the flush marker queues behind the envelope, so a successful flush
        // means the envelope already went through all of its attempts
        assert!(thread.flush(Duration::from_secs(5)));

        let seen = seen.lock().unwrap();
        let report = seen
            .iter()
            .flat_map(|envelope| envelope.items())
            .find_map(|item| match item {
                EnvelopeItem::ClientReport(report) => Some(report.clone()),
                _ => None,
            })
            .expect("a client report envelope");
        assert_eq!(report.discarded_events.len(), 1);
        assert_eq!(
            report.discarded_events[0].reason,
            DiscardReason::NetworkError
        );
        assert_eq!(report.discarded_events[0].quantity, 1);
    }
}
