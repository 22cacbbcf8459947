//! Incremental renderer: only slots whose text or colour changed are drawn

use core::fmt::Debug;

use embedded_graphics::pixelcolor::Rgb565;
use log::debug;

use super::fields::{FieldValue, compose};
use super::layout::{SLOT_COUNT, Slot};
use crate::snapshot::SystemSnapshot;

/// Accepts discrete draw commands.
///
/// Each call must either fully apply or not at all. Drawing the same
/// arguments twice must leave the screen unchanged.
pub trait DisplaySink {
    type Error: Debug;

    /// Blank the whole screen
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Replace the contents of `slot`
    fn draw(&mut self, slot: Slot, text: &str, color: Rgb565) -> Result<(), Self::Error>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawOp {
    pub slot: Slot,
    pub value: FieldValue,
}

pub type DrawPlan = heapless::Vec<DrawOp, SLOT_COUNT>;

/// Remembers what is on screen, slot by slot.
///
/// The comparison is against what was last drawn rather than against the
/// previous snapshot, so a draw that failed is retried on the next pass.
#[derive(Debug)]
pub struct DisplayReconciler {
    rendered: [Option<FieldValue>; SLOT_COUNT],
    needs_clear: bool,
}

impl Default for DisplayReconciler {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayReconciler {
    pub const fn new() -> Self {
        Self {
            rendered: [const { None }; SLOT_COUNT],
            needs_clear: true,
        }
    }

    /// Forget the screen contents; the next render clears and redraws all
    pub fn invalidate(&mut self) {
        self.rendered = [const { None }; SLOT_COUNT];
        self.needs_clear = true;
    }

    pub fn rendered(&self, slot: Slot) -> Option<&FieldValue> {
        self.rendered[slot.index()].as_ref()
    }

    /// Draw operations needed to show `snapshot`, in layout order.
    /// Empty when the screen is already up to date.
    pub fn plan(&self, snapshot: &SystemSnapshot) -> DrawPlan {
        let mut plan = DrawPlan::new();
        for (slot, value) in Slot::ALL.into_iter().zip(compose(snapshot)) {
            if self.rendered[slot.index()].as_ref() != Some(&value) {
                // One entry per slot, cannot overflow
                let _ = plan.push(DrawOp { slot, value });
            }
        }
        plan
    }

    /// Bring the sink in line with `snapshot`, returning the number of slots
    /// drawn.
    ///
    /// The plan is computed before the first sink call. A slot is recorded as
    /// rendered only once its draw succeeded; on error the remaining slots
    /// stay pending for the next pass.
    pub fn render<S: DisplaySink>(
        &mut self,
        snapshot: &SystemSnapshot,
        sink: &mut S,
    ) -> Result<usize, S::Error> {
        let plan = self.plan(snapshot);
        if plan.is_empty() {
            return Ok(0);
        }

        if self.needs_clear {
            sink.clear()?;
            self.needs_clear = false;
        }

        let mut drawn = 0;
        for op in plan {
            sink.draw(op.slot, &op.value.text, op.value.color)?;
            debug!("Drew {:?}: {}", op.slot, op.value.text);
            self.rendered[op.slot.index()] = Some(op.value);
            drawn += 1;
        }
        Ok(drawn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battery::{BatteryState, ChargeState};
    use crate::display::colors::{GREEN, YELLOW};
    use alloc::string::String;
    use alloc::vec::Vec;
    use embassy_time::Instant;

    #[derive(Debug, Clone, PartialEq)]
    enum Call {
        Clear,
        Draw(Slot, String, Rgb565),
    }

    #[derive(Default)]
    struct RecordingSink {
        calls: Vec<Call>,
        fail_after: Option<usize>,
    }

    impl RecordingSink {
        fn draws(&self) -> usize {
            self.calls.iter().filter(|c| matches!(c, Call::Draw(..))).count()
        }
    }

    impl DisplaySink for RecordingSink {
        type Error = &'static str;

        fn clear(&mut self) -> Result<(), Self::Error> {
            self.calls.push(Call::Clear);
            Ok(())
        }

        fn draw(&mut self, slot: Slot, text: &str, color: Rgb565) -> Result<(), Self::Error> {
            if self.fail_after == Some(self.draws()) {
                return Err("bus error");
            }
            self.calls.push(Call::Draw(slot, String::from(text), color));
            Ok(())
        }
    }

    fn snapshot() -> SystemSnapshot {
        SystemSnapshot::initial(Instant::from_secs(0))
    }

    fn with_battery(percent: u8) -> SystemSnapshot {
        let mut snapshot = snapshot();
        snapshot.battery = Some(BatteryState {
            percent,
            charging: false,
            usb_connected: true,
            voltage: 3.9,
            charge_state: ChargeState::NotCharging,
        });
        snapshot
    }

    #[test]
    fn test_first_render_clears_and_draws_every_slot() {
        let mut reconciler = DisplayReconciler::new();
        let mut sink = RecordingSink::default();

        let drawn = reconciler.render(&snapshot(), &mut sink).unwrap();
        assert_eq!(drawn, SLOT_COUNT);
        assert_eq!(sink.calls[0], Call::Clear);
        assert_eq!(sink.draws(), SLOT_COUNT);
        assert_eq!(
            sink.calls[1],
            Call::Draw(Slot::Title, String::from("VAN MONITOR"), crate::display::colors::WHITE)
        );
    }

    #[test]
    fn test_same_snapshot_twice_draws_nothing() {
        let mut reconciler = DisplayReconciler::new();
        let mut sink = RecordingSink::default();
        let snapshot = with_battery(80);

        reconciler.render(&snapshot, &mut sink).unwrap();
        sink.calls.clear();

        assert!(reconciler.plan(&snapshot).is_empty());
        assert_eq!(reconciler.render(&snapshot, &mut sink).unwrap(), 0);
        assert!(sink.calls.is_empty());
    }

    #[test]
    fn test_one_changed_field_draws_one_slot() {
        let mut reconciler = DisplayReconciler::new();
        let mut sink = RecordingSink::default();

        reconciler.render(&with_battery(80), &mut sink).unwrap();
        sink.calls.clear();

        assert_eq!(reconciler.render(&with_battery(79), &mut sink).unwrap(), 1);
        assert_eq!(
            sink.calls,
            [Call::Draw(Slot::BatteryPercent, String::from("79%"), GREEN)]
        );
    }

    #[test]
    fn test_band_change_redraws_with_new_colour() {
        let mut reconciler = DisplayReconciler::new();
        let mut sink = RecordingSink::default();
        reconciler.render(&with_battery(51), &mut sink).unwrap();
        sink.calls.clear();

        reconciler.render(&with_battery(50), &mut sink).unwrap();
        assert_eq!(
            sink.calls,
            [Call::Draw(Slot::BatteryPercent, String::from("50%"), YELLOW)]
        );
        assert_eq!(reconciler.rendered(Slot::BatteryPercent).unwrap().color, YELLOW);
    }

    #[test]
    fn test_failed_draw_is_retried_next_pass() {
        let mut reconciler = DisplayReconciler::new();
        let mut sink = RecordingSink {
            fail_after: Some(5),
            ..Default::default()
        };

        assert_eq!(reconciler.render(&snapshot(), &mut sink), Err("bus error"));
        assert_eq!(sink.draws(), 5);
        assert!(reconciler.rendered(Slot::Title).is_some());
        assert!(reconciler.rendered(Slot::Distance).is_none());

        sink.fail_after = None;
        sink.calls.clear();
        let drawn = reconciler.render(&snapshot(), &mut sink).unwrap();
        assert_eq!(drawn, SLOT_COUNT - 5);
        // The screen was already cleared once
        assert!(!sink.calls.contains(&Call::Clear));
    }

    #[test]
    fn test_invalidate_forces_full_redraw() {
        let mut reconciler = DisplayReconciler::new();
        let mut sink = RecordingSink::default();
        reconciler.render(&snapshot(), &mut sink).unwrap();
        sink.calls.clear();

        reconciler.invalidate();
        assert_eq!(reconciler.render(&snapshot(), &mut sink).unwrap(), SLOT_COUNT);
        assert_eq!(sink.calls[0], Call::Clear);
    }
}
