//! The acquisition loop.
//!
//! `PollLoop` is the single long-running driver of the sensor: on a fixed
//! cadence it samples, stores the decoded reading, and hands it to the
//! configured sink as a detached task. Bus faults are logged and retried
//! on the same cadence — a failing sensor never terminates the loop and
//! never touches the stored reading.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, warn};

use super::reading::Reading;
use super::sensor::{Ee895, RegisterBus};
use super::state::StateStore;

/// Capability implemented by the publish fan-out.
///
/// Publishing is best-effort: a sink error is logged by the spawned task
/// and the cycle's reading is abandoned — no retry, no backlog.
#[async_trait::async_trait]
pub trait ReadingSink: Send + Sync {
    async fn publish(&self, reading: Reading)
        -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Fixed-cadence sensor poll loop.
///
/// There is exactly one instance per process; it is the only writer of the
/// state store and the only caller of the sensor.
pub struct PollLoop<B> {
    reader: Ee895<B>,
    store: StateStore,
    sink: Option<Arc<dyn ReadingSink>>,
    interval: Duration,
}

impl<B: RegisterBus> PollLoop<B> {
    pub fn new(
        reader: Ee895<B>,
        store: StateStore,
        sink: Option<Arc<dyn ReadingSink>>,
        interval: Duration,
    ) -> Self {
        Self {
            reader,
            store,
            sink,
            interval,
        }
    }

    /// Runs the loop forever.
    ///
    /// The wait is identical after success and failure; failure does not
    /// extend or shorten the cadence.
    pub async fn run(mut self) -> ! {
        loop {
            match self.reader.sample() {
                Ok(reading) => {
                    debug!(
                        co2_ppm = reading.co2,
                        temperature_c = reading.temperature,
                        pressure_hpa = reading.pressure,
                        "sensor sampled"
                    );
                    self.store.set(reading);

                    if let Some(sink) = &self.sink {
                        let sink = sink.clone();
                        tokio::spawn(async move {
                            if let Err(e) = sink.publish(reading).await {
                                error!("failed to publish reading: {}", e);
                            }
                        });
                    }
                }
                Err(e) => {
                    warn!("failed to read sensor: {}", e);
                }
            }

            sleep(self.interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use tokio::time::{sleep, Duration};
    use tracing_test::traced_test;

    use super::*;
    use crate::core::reading::FRAME_LEN;
    use crate::core::sensor::SensorError;

    const FRAME: [u8; FRAME_LEN] = [0x01, 0xF4, 0x02, 0x71, 0x00, 0x00, 0x03, 0xE8];

    enum Step {
        Frame([u8; FRAME_LEN]),
        IoError,
        Short(usize),
    }

    /// Bus that replays a script, then keeps returning the last frame.
    struct ScriptedBus {
        steps: VecDeque<Step>,
    }

    impl ScriptedBus {
        fn new(steps: Vec<Step>) -> Self {
            Self {
                steps: steps.into(),
            }
        }
    }

    impl RegisterBus for ScriptedBus {
        fn read_register_block(
            &mut self,
            _register: u8,
            buf: &mut [u8],
        ) -> Result<usize, SensorError> {
            match self.steps.pop_front().unwrap_or(Step::Frame(FRAME)) {
                Step::Frame(frame) => {
                    buf.copy_from_slice(&frame);
                    Ok(buf.len())
                }
                Step::IoError => Err(SensorError::Io(std::io::Error::other("transfer aborted"))),
                Step::Short(got) => Ok(got),
            }
        }
    }

    #[derive(Default)]
    struct MockSink {
        publish_count: Mutex<usize>,
        fail: bool,
        last_reading: Mutex<Option<Reading>>,
    }

    impl MockSink {
        fn failing() -> Self {
            Self {
                fail: true,
                ..Default::default()
            }
        }

        fn count(&self) -> usize {
            *self.publish_count.lock().unwrap()
        }
    }

    #[async_trait::async_trait]
    impl ReadingSink for MockSink {
        async fn publish(
            &self,
            reading: Reading,
        ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
            *self.publish_count.lock().unwrap() += 1;
            *self.last_reading.lock().unwrap() = Some(reading);
            if self.fail {
                return Err("broker unreachable".into());
            }
            Ok(())
        }
    }

    fn spawn_loop(
        bus: ScriptedBus,
        store: StateStore,
        sink: Option<Arc<dyn ReadingSink>>,
    ) -> tokio::task::JoinHandle<()> {
        let poller = PollLoop::new(
            Ee895::new(bus),
            store,
            sink,
            Duration::from_millis(20),
        );
        tokio::spawn(async move {
            poller.run().await;
        })
    }

    #[tokio::test]
    async fn successful_cycle_updates_store_and_sink() {
        let store = StateStore::new();
        let sink = Arc::new(MockSink::default());

        let handle = spawn_loop(
            ScriptedBus::new(vec![Step::Frame(FRAME)]),
            store.clone(),
            Some(sink.clone()),
        );
        sleep(Duration::from_millis(50)).await;

        assert_eq!(store.get().co2, 500);
        assert!(sink.count() >= 1);
        assert_eq!(sink.last_reading.lock().unwrap().unwrap().co2, 500);

        handle.abort();
    }

    #[tokio::test]
    #[traced_test]
    async fn io_error_leaves_store_unchanged_and_loop_running() {
        let store = StateStore::new();
        let sink = Arc::new(MockSink::default());

        let handle = spawn_loop(
            ScriptedBus::new(vec![Step::IoError, Step::Frame(FRAME)]),
            store.clone(),
            Some(sink.clone()),
        );

        // After the failed first cycle the store must still be zero and
        // the sink untouched.
        sleep(Duration::from_millis(10)).await;
        assert_eq!(store.get(), Reading::default());
        assert_eq!(sink.count(), 0);

        // The next cycle is attempted on the same cadence and succeeds.
        sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get().co2, 500);
        assert!(sink.count() >= 1);
        assert!(logs_contain("failed to read sensor"));

        handle.abort();
    }

    #[tokio::test]
    #[traced_test]
    async fn short_read_is_handled_like_an_io_error() {
        let store = StateStore::new();
        let sink = Arc::new(MockSink::default());

        let handle = spawn_loop(
            ScriptedBus::new(vec![Step::Short(7), Step::Frame(FRAME)]),
            store.clone(),
            Some(sink.clone()),
        );

        sleep(Duration::from_millis(10)).await;
        assert_eq!(store.get(), Reading::default());
        assert_eq!(sink.count(), 0);

        sleep(Duration::from_millis(60)).await;
        assert_eq!(store.get().co2, 500);
        assert!(logs_contain("short read of 7 bytes"));

        handle.abort();
    }

    #[tokio::test]
    #[traced_test]
    async fn sink_failure_does_not_disturb_store_or_loop() {
        let store = StateStore::new();
        let sink = Arc::new(MockSink::failing());

        let handle = spawn_loop(ScriptedBus::new(vec![]), store.clone(), Some(sink.clone()));
        sleep(Duration::from_millis(90)).await;

        // Publishes keep failing, yet the store keeps updating and the
        // loop keeps invoking the sink each cycle.
        assert_eq!(store.get().co2, 500);
        assert!(sink.count() >= 2);
        assert!(logs_contain("failed to publish reading"));

        handle.abort();
    }

    #[tokio::test]
    async fn runs_without_a_sink() {
        let store = StateStore::new();

        let handle = spawn_loop(ScriptedBus::new(vec![]), store.clone(), None);
        sleep(Duration::from_millis(50)).await;

        assert_eq!(store.get().co2, 500);

        handle.abort();
    }
}
