//! Waiting for a commanded motion to finish.
//!
//! The controller's script port gives no completion signal, so the default
//! policy sleeps a fixed time after each command and assumes the arm got
//! there. A slow move can still be running when the next command arrives,
//! and a fast one wastes the rest of the delay. When the controller program
//! writes one line back per finished command, [`SettlePolicy::Acknowledged`]
//! waits for that line instead.

use crate::{Result, RobotError};
use crossbeam_channel::{Receiver, Sender};
use std::io::{BufRead, BufReader, Read};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What kind of step just ran, for picking the fixed delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepKind {
    Motion,
    Relative,
    Gripper,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettlePolicy {
    /// Sleep a fixed time per step kind.
    Fixed {
        motion: Duration,
        relative: Duration,
        gripper: Duration,
    },
    /// Block until the controller acknowledges, up to `timeout`.
    Acknowledged { timeout: Duration },
}

impl SettlePolicy {
    /// No waiting at all. Used by tests and dry runs.
    pub const fn immediate() -> SettlePolicy {
        SettlePolicy::Fixed {
            motion: Duration::ZERO,
            relative: Duration::ZERO,
            gripper: Duration::ZERO,
        }
    }

    pub fn fixed_delay(&self, kind: StepKind) -> Option<Duration> {
        match self {
            SettlePolicy::Fixed {
                motion,
                relative,
                gripper,
            } => Some(match kind {
                StepKind::Motion => *motion,
                StepKind::Relative => *relative,
                StepKind::Gripper => *gripper,
            }),
            SettlePolicy::Acknowledged { .. } => None,
        }
    }
}

impl Default for SettlePolicy {
    fn default() -> Self {
        SettlePolicy::Fixed {
            motion: Duration::from_secs(2),
            relative: Duration::from_secs(1),
            gripper: Duration::from_secs(1),
        }
    }
}

/// Acknowledgment lines read from the controller by a background thread.
pub struct AckStream {
    receiver: Receiver<String>,
    stop_flag: Arc<AtomicBool>,
    thread: Option<std::thread::JoinHandle<()>>,
}

impl AckStream {
    /// Spawn the reader thread. It owns `reader` and forwards each
    /// non-empty line until EOF, a read error, or [`AckStream::stop`].
    pub fn start<R>(reader: R) -> Result<AckStream>
    where
        R: Read + Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded(64);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name("wordbuddy-ack".into())
            .spawn(move || {
                ack_reader_loop(reader, sender, stop_clone);
            })?;

        Ok(AckStream {
            receiver,
            stop_flag,
            thread: Some(thread),
        })
    }

    /// Block until the next acknowledgment arrives or `timeout` passes.
    pub fn await_ack(&self, timeout: Duration) -> Result<String> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            crossbeam_channel::RecvTimeoutError::Timeout => RobotError::SettleTimeout,
            crossbeam_channel::RecvTimeoutError::Disconnected => RobotError::AckStreamStopped,
        })
    }

    /// Discard acknowledgments that arrived without anyone waiting.
    pub fn drain(&self) -> usize {
        self.receiver.try_iter().count()
    }

    pub fn is_active(&self) -> bool {
        !self.stop_flag.load(Ordering::Relaxed)
    }

    /// Signal the reader to stop. The thread exits once its blocking read
    /// returns, so close the underlying socket as well.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            if thread.is_finished() {
                let _ = thread.join();
            }
        }
    }
}

impl Drop for AckStream {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn ack_reader_loop<R: Read>(reader: R, sender: Sender<String>, stop_flag: Arc<AtomicBool>) {
    let reader = BufReader::new(reader);
    log::debug!("ack reader started");

    for line in reader.lines() {
        if stop_flag.load(Ordering::Relaxed) {
            break;
        }
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::warn!("ack read error: {}", e);
                break;
            }
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match sender.try_send(line.to_string()) {
            Ok(()) => {}
            Err(crossbeam_channel::TrySendError::Full(_)) => {
                log::trace!("ack channel full, dropping '{}'", line);
            }
            Err(crossbeam_channel::TrySendError::Disconnected(_)) => break,
        }
    }

    stop_flag.store(true, Ordering::Relaxed);
    log::debug!("ack reader stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_fixed_delays() {
        let policy = SettlePolicy::default();
        assert_eq!(
            policy.fixed_delay(StepKind::Motion),
            Some(Duration::from_secs(2))
        );
        assert_eq!(
            policy.fixed_delay(StepKind::Gripper),
            Some(Duration::from_secs(1))
        );
        let ack = SettlePolicy::Acknowledged {
            timeout: Duration::from_secs(1),
        };
        assert_eq!(ack.fixed_delay(StepKind::Motion), None);
    }

    #[test]
    fn test_ack_lines_forwarded() {
        let stream = AckStream::start(Cursor::new(b"done\n\n  done 2 \n".to_vec())).unwrap();
        assert_eq!(stream.await_ack(Duration::from_secs(1)).unwrap(), "done");
        assert_eq!(stream.await_ack(Duration::from_secs(1)).unwrap(), "done 2");
        // Reader hit EOF and dropped its sender.
        assert!(matches!(
            stream.await_ack(Duration::from_secs(1)),
            Err(RobotError::AckStreamStopped)
        ));
        assert!(!stream.is_active());
    }

    #[test]
    fn test_ack_timeout() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let _writer = std::net::TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (reader, _) = listener.accept().unwrap();
        let stream = AckStream::start(reader).unwrap();
        assert!(matches!(
            stream.await_ack(Duration::from_millis(50)),
            Err(RobotError::SettleTimeout)
        ));
    }

    #[test]
    fn test_binary_data_stops_reader() {
        let bytes = vec![0x00, 0x00, 0x00, 0x35, 0x10, 0xff, 0xfe, b'\n', b'o', b'k', b'\n'];
        let stream = AckStream::start(Cursor::new(bytes)).unwrap();
        assert!(matches!(
            stream.await_ack(Duration::from_secs(1)),
            Err(RobotError::AckStreamStopped)
        ));
        assert!(!stream.is_active());
        assert_eq!(stream.drain(), 0);
    }
}
