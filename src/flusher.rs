//! Periodic background ticker driving time-based flushes.

use std::io;
use std::ops::ControlFlow;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, warn};

/// A named thread calling `tick` once per interval until stopped.
///
/// Stopping drops the channel sender, which wakes the thread immediately
/// instead of waiting out the current interval.
pub(crate) struct Flusher {
    name: String,
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl Flusher {
    /// Start ticking. `tick` returning [`ControlFlow::Break`] ends the thread.
    pub(crate) fn spawn<F>(name: String, interval: Duration, mut tick: F) -> io::Result<Self>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        let (stop, stopped) = mpsc::channel::<()>();
        let thread = thread::Builder::new().name(name.clone()).spawn(move || {
            loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        if tick().is_break() {
                            break;
                        }
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            }
        })?;
        debug!("{name}: started, interval {interval:?}");
        Ok(Self {
            name,
            stop: Some(stop),
            thread: Some(thread),
        })
    }

    /// Stop the thread and wait for an in-progress tick to finish.
    pub(crate) fn stop(&mut self) {
        drop(self.stop.take());
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("{}: thread panicked", self.name);
            } else {
                debug!("{}: stopped", self.name);
            }
        }
    }
}

impl Drop for Flusher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Instant;

    fn wait_until(deadline: Duration, cond: impl Fn() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn ticks_repeatedly() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let mut flusher = Flusher::spawn("tick-test".into(), Duration::from_millis(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        })
        .unwrap();

        assert!(wait_until(Duration::from_secs(5), || ticks.load(Ordering::SeqCst) >= 3));
        flusher.stop();
    }

    #[test]
    fn stop_is_prompt_and_final() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let mut flusher = Flusher::spawn("stop-test".into(), Duration::from_secs(60), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Continue(())
        })
        .unwrap();

        let start = Instant::now();
        flusher.stop();
        assert!(start.elapsed() < Duration::from_secs(30));
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        // Stopping twice is harmless.
        flusher.stop();
    }

    #[test]
    fn break_ends_the_thread() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&ticks);
        let flusher = Flusher::spawn("break-test".into(), Duration::from_millis(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            ControlFlow::Break(())
        })
        .unwrap();

        assert!(wait_until(Duration::from_secs(5), || ticks.load(Ordering::SeqCst) == 1));
        drop(flusher);
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }
}
