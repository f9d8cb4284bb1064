//! Sensor sampler thread
//!
//! Samples the sensors every `sensor_period` seconds (read from the register
//! store, so `SETSENSORPERIOD` applies without a restart), stores the reading,
//! evaluates the alarms and sounds the beeper message while any alarm is
//! active. `SCAN` forces an immediate sample.

use super::{alarm, keys, morse};
use crate::core::driver::{Beeper, SensorDriver};
use crate::core::types::SharedRegisters;
use crate::error::{Error, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How often a pending wait re-reads the sensor period register
const PERIOD_RECHECK: Duration = Duration::from_secs(1);

/// Requests to the sampler thread
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerSignal {
    /// Sample now
    Scan,
    /// Exit the loop
    Shutdown,
}

/// Cloneable handle that forces an immediate sample
#[derive(Debug, Clone)]
pub struct ScanTrigger {
    tx: Sender<SamplerSignal>,
}

impl ScanTrigger {
    /// Trigger plus the receiving end for the sampler loop
    pub fn channel() -> (Self, Receiver<SamplerSignal>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (Self { tx }, rx)
    }

    pub fn trigger(&self) {
        if self.tx.send(SamplerSignal::Scan).is_err() {
            log::warn!("Sampler not running, scan request dropped");
        }
    }

    fn shutdown(&self) {
        let _ = self.tx.send(SamplerSignal::Shutdown);
    }
}

/// Sampler loop state
struct SamplerThread {
    sensors: Box<dyn SensorDriver>,
    beeper: Box<dyn Beeper>,
    registers: SharedRegisters,
    rx: Receiver<SamplerSignal>,
    alarm_active: bool,
}

impl SamplerThread {
    fn run(&mut self) {
        log::info!("Sampler started");

        loop {
            self.sample_once();
            let sampled_at = Instant::now();

            if !self.wait_for_next(sampled_at) {
                break;
            }
        }

        log::info!("Sampler stopped");
    }

    /// Block until the period elapses or a scan arrives
    ///
    /// Returns false on shutdown.
    fn wait_for_next(&self, sampled_at: Instant) -> bool {
        loop {
            // Out of `Instant` range behaves like a paused period
            let deadline = self
                .period()
                .and_then(|period| sampled_at.checked_add(period));
            let recheck = Instant::now() + PERIOD_RECHECK;
            let wait_until = deadline.map_or(recheck, |d| d.min(recheck));

            match self.rx.recv_deadline(wait_until) {
                Ok(SamplerSignal::Scan) => {
                    log::debug!("Scan requested");
                    return true;
                }
                Ok(SamplerSignal::Shutdown) | Err(RecvTimeoutError::Disconnected) => {
                    return false;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if deadline.is_some_and(|d| Instant::now() >= d) {
                        return true;
                    }
                }
            }
        }
    }

    /// Current sample period, `None` while periodic sampling is paused
    fn period(&self) -> Option<Duration> {
        let secs = self.registers.lock().integer(keys::SENSOR_PERIOD)?;
        u64::try_from(secs)
            .ok()
            .filter(|&s| s > 0)
            .map(Duration::from_secs)
    }

    fn sample_once(&mut self) {
        let reading = match self.sensors.sample() {
            Ok(reading) => reading,
            Err(e) => {
                log::warn!("Sensor read failed, keeping previous values: {}", e);
                return;
            }
        };
        log::debug!(
            "Reading: humidity {:.1}%, temp {:.1}F, distance {:.1}in",
            reading.humidity_pct,
            reading.temp_f,
            reading.distance_in
        );

        let status = {
            let mut registers = self.registers.lock();
            match alarm::apply_reading(&mut registers, &reading) {
                Ok(status) => status,
                Err(e) => {
                    log::error!("Failed to store reading: {}", e);
                    return;
                }
            }
        };

        if status.is_active() != self.alarm_active {
            if status.is_active() {
                log::warn!("Alarm raised: {:?}", status.triggered);
            } else {
                log::info!("Alarm cleared");
            }
            self.alarm_active = status.is_active();
        }

        if status.is_active() {
            let pattern = morse::encode(&status.message);
            log::debug!(
                "Sounding {:?} ({:?})",
                status.message,
                morse::duration(&pattern)
            );
            if let Err(e) = self.beeper.sound(&pattern) {
                log::warn!("Beeper failed: {}", e);
            }
        }
    }
}

/// Running sampler thread
pub struct Sampler {
    trigger: ScanTrigger,
    handle: Option<JoinHandle<()>>,
}

impl Sampler {
    /// Spawn the sampler; the first sample is taken immediately
    pub fn start(
        sensors: Box<dyn SensorDriver>,
        beeper: Box<dyn Beeper>,
        registers: SharedRegisters,
    ) -> Result<Self> {
        let (trigger, rx) = ScanTrigger::channel();

        let handle = thread::Builder::new()
            .name("sampler".to_string())
            .spawn(move || {
                let mut sampler = SamplerThread {
                    sensors,
                    beeper,
                    registers,
                    rx,
                    alarm_active: false,
                };
                sampler.run();
            })
            .map_err(|source| Error::ThreadSpawn {
                name: "sampler",
                source,
            })?;

        Ok(Self {
            trigger,
            handle: Some(handle),
        })
    }

    /// Handle for the `SCAN` command
    pub fn scan_trigger(&self) -> ScanTrigger {
        self.trigger.clone()
    }

    /// Stop the thread and wait for it
    pub fn stop(mut self) -> Result<()> {
        self.trigger.shutdown();
        match self.handle.take() {
            Some(handle) => handle.join().map_err(|_| Error::ThreadPanic("sampler")),
            None => Ok(()),
        }
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            self.trigger.shutdown();
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AlarmConfig, DeviceConfig};
    use crate::core::driver::{Reading, Tone};
    use crate::core::types::Value;
    use crate::sump::create_registers;
    use approx::assert_relative_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Water one inch higher on every sample
    struct RisingWater {
        distance_in: f64,
    }

    impl SensorDriver for RisingWater {
        fn sample(&mut self) -> Result<Reading> {
            self.distance_in -= 1.0;
            Ok(Reading {
                humidity_pct: 50.0,
                temp_f: 60.0,
                distance_in: self.distance_in,
            })
        }
    }

    struct FailingSensors;

    impl SensorDriver for FailingSensors {
        fn sample(&mut self) -> Result<Reading> {
            Err(Error::Sensor("no echo".to_string()))
        }
    }

    #[derive(Clone, Default)]
    struct CountingBeeper(Arc<AtomicUsize>);

    impl Beeper for CountingBeeper {
        fn sound(&mut self, pattern: &[Tone]) -> Result<()> {
            assert!(!pattern.is_empty());
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn registers(distance_alarm: i64) -> SharedRegisters {
        let alarms = AlarmConfig {
            distance: distance_alarm,
            ..AlarmConfig::default()
        };
        let device = DeviceConfig {
            sensor_period_secs: 3600,
            ..DeviceConfig::default()
        };
        create_registers(&alarms, &device).into_shared()
    }

    fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline {
            if condition() {
                return true;
            }
            thread::sleep(Duration::from_millis(10));
        }
        false
    }

    #[test]
    fn test_first_sample_is_immediate() {
        let regs = registers(0);
        let sampler = Sampler::start(
            Box::new(RisingWater { distance_in: 20.0 }),
            Box::new(CountingBeeper::default()),
            Arc::clone(&regs),
        )
        .unwrap();

        assert!(wait_until(|| regs.lock().float(keys::DISTANCE) == Some(19.0)));
        sampler.stop().unwrap();
    }

    #[test]
    fn test_scan_forces_sample_and_alarm_sounds() {
        let regs = registers(18);
        let beeper = CountingBeeper::default();
        let count = Arc::clone(&beeper.0);
        let sampler = Sampler::start(
            Box::new(RisingWater { distance_in: 20.0 }),
            Box::new(beeper),
            Arc::clone(&regs),
        )
        .unwrap();

        assert!(wait_until(|| regs.lock().float(keys::DISTANCE) == Some(19.0)));
        assert_eq!(regs.lock().text(keys::BEEPER), Some("off"));

        sampler.scan_trigger().trigger();
        assert!(wait_until(|| regs.lock().text(keys::BEEPER) == Some("on")));
        assert_relative_eq!(regs.lock().float(keys::DISTANCE).unwrap(), 18.0);
        assert!(wait_until(|| count.load(Ordering::SeqCst) == 1));

        sampler.stop().unwrap();
    }

    #[test]
    fn test_sensor_failure_keeps_previous_values() {
        let regs = registers(0);
        regs.lock().set(keys::HUMIDITY, Value::Float(42.0)).unwrap();

        let sampler = Sampler::start(
            Box::new(FailingSensors),
            Box::new(CountingBeeper::default()),
            Arc::clone(&regs),
        )
        .unwrap();
        sampler.scan_trigger().trigger();
        thread::sleep(Duration::from_millis(50));

        assert_eq!(regs.lock().float(keys::HUMIDITY), Some(42.0));
        sampler.stop().unwrap();
    }

    #[test]
    fn test_short_period_samples_repeatedly() {
        let regs = registers(0);
        regs.lock().set(keys::SENSOR_PERIOD, Value::Integer(1)).unwrap();

        let sampler = Sampler::start(
            Box::new(RisingWater { distance_in: 20.0 }),
            Box::new(CountingBeeper::default()),
            Arc::clone(&regs),
        )
        .unwrap();

        assert!(wait_until(|| regs
            .lock()
            .float(keys::DISTANCE)
            .is_some_and(|d| d <= 17.0)));
        sampler.stop().unwrap();
    }

    #[test]
    fn test_huge_period_pauses_without_panicking() {
        let regs = registers(0);
        regs.lock()
            .set(keys::SENSOR_PERIOD, Value::Integer(i64::MAX))
            .unwrap();

        let sampler = Sampler::start(
            Box::new(RisingWater { distance_in: 20.0 }),
            Box::new(CountingBeeper::default()),
            Arc::clone(&regs),
        )
        .unwrap();
        assert!(wait_until(|| regs.lock().float(keys::DISTANCE) == Some(19.0)));

        // Still alive: a scan is served after the first recheck
        thread::sleep(PERIOD_RECHECK + Duration::from_millis(100));
        sampler.scan_trigger().trigger();
        assert!(wait_until(|| regs.lock().float(keys::DISTANCE) == Some(18.0)));

        sampler.stop().unwrap();
    }

    #[test]
    fn test_stop_is_prompt_with_long_period() {
        let regs = registers(0);
        let sampler = Sampler::start(
            Box::new(RisingWater { distance_in: 20.0 }),
            Box::new(CountingBeeper::default()),
            regs,
        )
        .unwrap();

        let started = Instant::now();
        sampler.stop().unwrap();
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
