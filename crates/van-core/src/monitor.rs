//! The monitor loop: periodic sampling and periodic rendering
//!
//! One flow of control alternates between two cadences. Sampling reads the
//! receiver and the battery, folds the results into a fresh
//! [`SystemSnapshot`] and reports proximity transitions to the connectivity
//! manager. Rendering hands the latest snapshot to the
//! [`DisplayReconciler`]. Neither ever runs while the other is in progress,
//! so nothing here needs a lock.

use embassy_futures::select::{Either, select};
use embassy_sync::blocking_mutex::raw::RawMutex;
use embassy_sync::signal::Signal;
use embassy_time::{Duration, Instant, Timer};
use log::{debug, error, info, warn};

use crate::battery::{self, BatteryState};
use crate::config::MonitorConfig;
use crate::connectivity::ConnectivityManager;
use crate::display::{DisplayReconciler, DisplaySink};
use crate::error::{ConfigError, SampleError};
use crate::fix::FixAggregator;
use crate::nmea::{self, Sentence};
use crate::power::{PowerEvent, PowerTracker};
use crate::proximity::{self, Proximity, ProximityDebouncer, ProximityState};
use crate::snapshot::SystemSnapshot;
use crate::telemetry::{BatteryReadout, LineRead, TelemetrySource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoopState {
    /// Waiting for the next deadline of either cadence
    #[default]
    Idle,
    Sampling,
    Rendering,
}

/// Running totals for operator diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Diagnostics {
    pub sampling_cycles: u32,
    pub render_passes: u32,
    pub draw_ops: u32,
    pub sentences_applied: u32,
    /// Well-formed but older than what was already applied
    pub sentences_out_of_order: u32,
    pub parse_failures: u32,
    pub read_timeouts: u32,
    pub out_of_range_samples: u32,
    pub readout_errors: u32,
    pub sink_errors: u32,
}

impl Diagnostics {
    fn record(&mut self, error: &SampleError) {
        let counter = match error {
            SampleError::Parse(_) => &mut self.parse_failures,
            SampleError::ReadTimeout => &mut self.read_timeouts,
            SampleError::OutOfRangeSample { .. } => &mut self.out_of_range_samples,
            SampleError::Readout(_) => &mut self.readout_errors,
        };
        *counter = counter.saturating_add(1);
    }
}

/// What one call to [`MonitorLoop::tick`] did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickReport {
    pub sampled: bool,
    pub rendered: bool,
    pub draw_ops: usize,
    /// Confirmed transition handed to the connectivity manager
    pub proximity_event: Option<Proximity>,
    pub power_event: Option<PowerEvent>,
}

impl TickReport {
    pub fn shutdown_due(&self) -> bool {
        self.power_event == Some(PowerEvent::ShutdownDue)
    }
}

/// Why [`MonitorLoop::run`] returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunExit {
    /// Engine stayed off past the shutdown delay
    ShutdownDue,
    /// The shutdown signal fired
    Signalled,
}

pub struct MonitorLoop<T, B, C> {
    config: MonitorConfig,
    telemetry: T,
    battery: B,
    connectivity: C,

    aggregator: FixAggregator,
    debouncer: ProximityDebouncer,
    power: PowerTracker,
    reconciler: DisplayReconciler,

    snapshot: SystemSnapshot,
    last_battery: Option<BatteryState>,
    state: LoopState,
    next_sample: Instant,
    next_render: Instant,
    diagnostics: Diagnostics,
}

impl<T, B, C> MonitorLoop<T, B, C>
where
    T: TelemetrySource,
    B: BatteryReadout,
    C: ConnectivityManager,
{
    /// Both cadences are due immediately, sampling first
    pub fn new(
        config: MonitorConfig,
        telemetry: T,
        battery: B,
        connectivity: C,
        now: Instant,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        info!(
            "Monitor: home ({:.4}, {:.4}) radius {}, sampling every {} ms, rendering every {} ms",
            config.home.latitude,
            config.home.longitude,
            config.home_radius,
            config.sample_interval.as_millis(),
            config.render_interval.as_millis(),
        );

        Ok(Self {
            debouncer: ProximityDebouncer::new(config.proximity_debounce_samples),
            power: PowerTracker::new(config.shutdown_delay),
            config,
            telemetry,
            battery,
            connectivity,
            aggregator: FixAggregator::new(),
            reconciler: DisplayReconciler::new(),
            snapshot: SystemSnapshot::initial(now),
            last_battery: None,
            state: LoopState::Idle,
            next_sample: now,
            next_render: now,
            diagnostics: Diagnostics::default(),
        })
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> &SystemSnapshot {
        &self.snapshot
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn telemetry(&self) -> &T {
        &self.telemetry
    }

    pub fn battery_readout_mut(&mut self) -> &mut B {
        &mut self.battery
    }

    pub fn connectivity(&self) -> &C {
        &self.connectivity
    }

    pub fn connectivity_mut(&mut self) -> &mut C {
        &mut self.connectivity
    }

    /// Earliest instant at which [`tick`](Self::tick) has work to do
    pub fn next_deadline(&self) -> Instant {
        self.next_sample.min(self.next_render)
    }

    /// Force a full redraw on the next render pass
    pub fn invalidate_display(&mut self) {
        self.reconciler.invalidate();
    }

    /// Run whichever cadences are due at `now`. Sampling goes first so a
    /// render in the same tick shows the fresh snapshot.
    pub async fn tick<S: DisplaySink>(&mut self, now: Instant, sink: &mut S) -> TickReport {
        let mut report = TickReport::default();

        if now >= self.next_sample {
            self.state = LoopState::Sampling;
            let (proximity_event, power_event) = self.sample(now).await;
            report.sampled = true;
            report.proximity_event = proximity_event;
            report.power_event = power_event;
            self.next_sample = advance(self.next_sample, self.config.sample_interval, now);
        }

        if now >= self.next_render {
            self.state = LoopState::Rendering;
            report.rendered = true;
            report.draw_ops = self.render(sink);
            self.next_render = advance(self.next_render, self.config.render_interval, now);
        }

        self.state = LoopState::Idle;
        report
    }

    /// Tick until the engine has been off too long or `shutdown` fires.
    ///
    /// A signal raised mid-tick is honoured once that tick finishes, so a
    /// draw is never abandoned half way.
    pub async fn run<S, M>(&mut self, sink: &mut S, shutdown: &Signal<M, ()>) -> RunExit
    where
        S: DisplaySink,
        M: RawMutex,
    {
        info!("Monitor loop running");
        loop {
            let report = self.tick(Instant::now(), sink).await;
            if report.shutdown_due() {
                info!("Monitor loop stopping, engine off");
                return RunExit::ShutdownDue;
            }

            match select(Timer::at(self.next_deadline()), shutdown.wait()).await {
                Either::First(()) => {}
                Either::Second(()) => {
                    info!("Monitor loop stopping, shutdown requested");
                    return RunExit::Signalled;
                }
            }
        }
    }

    async fn sample(&mut self, now: Instant) -> (Option<Proximity>, Option<PowerEvent>) {
        self.diagnostics.sampling_cycles = self.diagnostics.sampling_cycles.saturating_add(1);

        self.read_sentences(now).await;
        let power_event = self.read_battery(now).await;

        let fix = self.aggregator.current();
        let gps_stale = self.aggregator.is_stale(now, self.config.stale_after);
        let proximity = if gps_stale {
            ProximityState::UNKNOWN
        } else {
            proximity::evaluate(&fix, self.config.home, self.config.home_radius)
        };

        let proximity_event = self.debouncer.update(proximity.proximity);
        if let Some(transition) = proximity_event {
            info!("Proximity confirmed: {:?}", transition);
            self.connectivity.on_proximity_changed(transition);
        }

        self.snapshot = SystemSnapshot {
            fix,
            gps_stale,
            proximity,
            battery: self.last_battery,
            connectivity: self.connectivity.status(),
            taken_at: now,
        };

        let d = &self.diagnostics;
        info!(
            "Sample #{}: fix={} sats={} stale={} proximity={:?} battery={:?}% | parse_failures={} timeouts={} out_of_range={} readout_errors={} sink_errors={}",
            d.sampling_cycles,
            fix.fix_valid,
            fix.satellites,
            gps_stale,
            proximity.proximity,
            self.last_battery.map(|b| b.percent),
            d.parse_failures,
            d.read_timeouts,
            d.out_of_range_samples,
            d.readout_errors,
            d.sink_errors,
        );

        (proximity_event, power_event)
    }

    /// Consume receiver lines until both sentence kinds were seen, the line
    /// budget is spent, or the read window closes.
    ///
    /// The window is `gps_line_timeout` for the whole cycle, measured on the
    /// real clock, so a chatty receiver cannot hold up rendering.
    async fn read_sentences(&mut self, now: Instant) {
        let mut seen_position = false;
        let mut seen_satellites = false;
        let mut accepted = 0u16;
        let window_closes = Instant::now() + self.config.gps_line_timeout;

        for _ in 0..self.config.gps_max_lines_per_sample {
            let remaining = window_closes.saturating_duration_since(Instant::now());
            if remaining.as_ticks() == 0 {
                self.window_closed(accepted);
                return;
            }

            let line = match self.telemetry.read_line(remaining).await {
                Ok(LineRead::Line(line)) => line,
                Ok(LineRead::Timeout) => {
                    self.window_closed(accepted);
                    return;
                }
                Err(e) => {
                    error!("Telemetry read failed: {:?}", e);
                    self.record(SampleError::Readout("telemetry"));
                    return;
                }
            };

            let sentence = match nmea::parse(&line) {
                Ok(sentence) => sentence,
                Err(e) => {
                    self.record(SampleError::from(e));
                    continue;
                }
            };

            match sentence {
                Sentence::Position(_) => seen_position = true,
                Sentence::Satellites(_) => seen_satellites = true,
            }
            if self.aggregator.apply(&sentence, now) {
                accepted += 1;
                self.diagnostics.sentences_applied =
                    self.diagnostics.sentences_applied.saturating_add(1);
            } else {
                self.diagnostics.sentences_out_of_order =
                    self.diagnostics.sentences_out_of_order.saturating_add(1);
            }

            if seen_position && seen_satellites {
                return;
            }
        }
    }

    fn window_closed(&mut self, accepted: u16) {
        if accepted == 0 {
            self.record(SampleError::ReadTimeout);
        } else {
            debug!("Receiver quiet after {} sentences", accepted);
        }
    }

    /// Update the battery state; a failed read keeps the last one
    async fn read_battery(&mut self, now: Instant) -> Option<PowerEvent> {
        let reading = match self.battery.read_battery().await {
            Ok(reading) => reading,
            Err(e) => {
                error!("Battery readout failed: {:?}", e);
                self.record(SampleError::Readout("battery"));
                return None;
            }
        };

        if !battery::is_plausible(reading.voltage) {
            self.record(SampleError::OutOfRangeSample {
                millivolts: (reading.voltage * 1000.0) as i32,
            });
        }
        let state = battery::estimate(&reading);
        debug!(
            "Battery {:.3} V -> {}% ({})",
            state.voltage,
            state.percent,
            state.charge_state.label()
        );
        self.last_battery = Some(state);

        self.power.update(state.usb_connected, now)
    }

    fn render<S: DisplaySink>(&mut self, sink: &mut S) -> usize {
        self.diagnostics.render_passes = self.diagnostics.render_passes.saturating_add(1);
        match self.reconciler.render(&self.snapshot, sink) {
            Ok(drawn) => {
                self.diagnostics.draw_ops = self.diagnostics.draw_ops.saturating_add(drawn as u32);
                drawn
            }
            Err(e) => {
                error!("Display sink failed: {:?}", e);
                self.diagnostics.sink_errors = self.diagnostics.sink_errors.saturating_add(1);
                0
            }
        }
    }

    fn record(&mut self, error: SampleError) {
        warn!("{}", error);
        self.diagnostics.record(&error);
    }
}

/// Next deadline after `deadline`. A loop that fell behind skips the missed
/// slots instead of running them back to back.
fn advance(deadline: Instant, interval: Duration, now: Instant) -> Instant {
    let next = deadline + interval;
    if next > now { next } else { now + interval }
}
