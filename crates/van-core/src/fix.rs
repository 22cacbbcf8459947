//! Merges RMC and GGA sentences into one current position fix

use embassy_time::{Duration, Instant};
use log::debug;

use crate::geo::Coordinate;
use crate::nmea::{Date, FixQuality, PositionSentence, SatelliteSentence, Sentence, TimeOfDay};

/// A sentence at most this far behind the last one of its kind is a late
/// arrival and dropped. Any larger backward step is a clock jump (receiver
/// reset, RTC replaced by satellite time, midnight) and is followed.
const REORDER_WINDOW_MS: u32 = 5_000;

/// Current position solution, merged from both sentence kinds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PositionFix {
    /// Last known position. Kept when the receiver loses the fix, so check
    /// `fix_valid` before trusting it.
    pub position: Option<Coordinate>,
    pub speed_kmh: f32,
    pub course_deg: Option<f32>,
    /// Mirrors the latest RMC status flag
    pub fix_valid: bool,
    pub time: Option<TimeOfDay>,
    pub date: Option<Date>,
    pub quality: FixQuality,
    pub satellites: u8,
    pub altitude_m: Option<f32>,
    /// Last applied sentence of either kind
    pub last_updated_at: Option<Instant>,
    /// Last applied RMC. Position, speed and validity are only as fresh as this.
    pub last_position_at: Option<Instant>,
    /// Last applied GGA
    pub last_satellites_at: Option<Instant>,
}

impl PositionFix {
    pub const fn unknown() -> Self {
        Self {
            position: None,
            speed_kmh: 0.0,
            course_deg: None,
            fix_valid: false,
            time: None,
            date: None,
            quality: FixQuality::NoFix,
            satellites: 0,
            altitude_m: None,
            last_updated_at: None,
            last_position_at: None,
            last_satellites_at: None,
        }
    }

    /// Position only when the receiver currently vouches for it
    pub fn valid_position(&self) -> Option<Coordinate> {
        if self.fix_valid { self.position } else { None }
    }
}

impl Default for PositionFix {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Keeps the current [`PositionFix`].
///
/// Each sentence kind updates only its own fields, so an RMC never touches
/// satellite count or altitude and a GGA never touches position or speed.
#[derive(Debug, Clone, Default)]
pub struct FixAggregator {
    fix: PositionFix,
    last_position_time: Option<TimeOfDay>,
    last_satellite_time: Option<TimeOfDay>,
}

impl FixAggregator {
    pub const fn new() -> Self {
        Self {
            fix: PositionFix::unknown(),
            last_position_time: None,
            last_satellite_time: None,
        }
    }

    /// Merge a parsed sentence. Returns `false` when the sentence is older
    /// than the last one of its kind and was ignored.
    pub fn apply(&mut self, sentence: &Sentence, now: Instant) -> bool {
        let applied = match sentence {
            Sentence::Position(p) => self.apply_position(p, now),
            Sentence::Satellites(s) => self.apply_satellites(s, now),
        };
        if applied {
            self.fix.last_updated_at = Some(now);
        }
        applied
    }

    fn apply_position(&mut self, sentence: &PositionSentence, now: Instant) -> bool {
        if is_late(self.last_position_time, sentence.time) {
            debug!("Dropping out-of-order RMC at {:?}", sentence.time);
            return false;
        }
        // A receiver without a fix may still be running on its own RTC, so
        // only a valid sentence sets the ordering baseline
        if sentence.valid && sentence.time.is_some() {
            self.last_position_time = sentence.time;
        }

        let fix = &mut self.fix;
        fix.last_position_at = Some(now);
        fix.fix_valid = sentence.valid;
        if sentence.valid {
            fix.position = sentence.position;
            fix.speed_kmh = sentence.speed_kmh;
            fix.course_deg = sentence.course_deg;
        }
        if sentence.time.is_some() {
            fix.time = sentence.time;
        }
        if sentence.date.is_some() {
            fix.date = sentence.date;
        }
        true
    }

    fn apply_satellites(&mut self, sentence: &SatelliteSentence, now: Instant) -> bool {
        if is_late(self.last_satellite_time, sentence.time) {
            debug!("Dropping out-of-order GGA at {:?}", sentence.time);
            return false;
        }
        if sentence.quality.has_fix() && sentence.time.is_some() {
            self.last_satellite_time = sentence.time;
        }

        let fix = &mut self.fix;
        fix.last_satellites_at = Some(now);
        fix.quality = sentence.quality;
        // Receivers blank the counts while they have no fix; keep the last
        // known values rather than dropping to zero
        if sentence.quality.has_fix() {
            if let Some(satellites) = sentence.satellites {
                fix.satellites = satellites;
            }
            if sentence.altitude_m.is_some() {
                fix.altitude_m = sentence.altitude_m;
            }
        }
        true
    }

    pub fn current(&self) -> PositionFix {
        self.fix
    }

    /// True if no RMC was applied within `max_age` of `now`. Satellite
    /// sentences alone never keep a position fresh.
    pub fn is_stale(&self, now: Instant, max_age: Duration) -> bool {
        is_older_than(self.fix.last_position_at, now, max_age)
    }

    /// True if no GGA was applied within `max_age` of `now`
    pub fn satellites_stale(&self, now: Instant, max_age: Duration) -> bool {
        is_older_than(self.fix.last_satellites_at, now, max_age)
    }
}

fn is_older_than(at: Option<Instant>, now: Instant, max_age: Duration) -> bool {
    match at {
        None => true,
        Some(at) => now.saturating_duration_since(at) > max_age,
    }
}

/// True when `next` is a little behind `previous`, wrapping at midnight
fn is_late(previous: Option<TimeOfDay>, next: Option<TimeOfDay>) -> bool {
    let (Some(previous), Some(next)) = (previous, next) else {
        return false;
    };
    // Leap seconds can put a time slightly past the end of the day
    let behind = (i64::from(previous.millis_of_day()) - i64::from(next.millis_of_day()))
        .rem_euclid(i64::from(TimeOfDay::MILLIS_PER_DAY));
    behind > 0 && behind <= i64::from(REORDER_WINDOW_MS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nmea::parse_str;

    const RMC: &str = "$GPRMC,123519,A,4807.038,N,01131.000,E,022.4,084.4,230394,003.1,W*6A";
    const GGA: &str = "$GPGGA,123519,4807.038,N,01131.000,E,1,08,0.9,545.4,M,46.9,M,,*47";

    fn at(ms: u64) -> Instant {
        Instant::from_millis(ms)
    }

    fn position_at(time: TimeOfDay, valid: bool, position: Option<Coordinate>) -> Sentence {
        Sentence::Position(PositionSentence {
            talker: crate::nmea::Talker::Gps,
            time: Some(time),
            valid,
            position,
            speed_kmh: 10.0,
            course_deg: None,
            date: None,
        })
    }

    fn satellites_at(time: TimeOfDay, quality: FixQuality, count: Option<u8>) -> Sentence {
        Sentence::Satellites(SatelliteSentence {
            talker: crate::nmea::Talker::Gps,
            time: Some(time),
            quality,
            satellites: count,
            altitude_m: Some(100.0),
        })
    }

    #[test]
    fn test_reference_sentences_merge() {
        let mut agg = FixAggregator::new();
        assert!(agg.apply(&parse_str(RMC).unwrap(), at(1_000)));
        assert!(agg.apply(&parse_str(GGA).unwrap(), at(1_100)));

        let fix = agg.current();
        let pos = fix.position.unwrap();
        assert!((pos.latitude - 48.1173).abs() < 1e-4);
        assert!((pos.longitude - 11.5167).abs() < 1e-4);
        assert!(fix.fix_valid);
        assert_eq!(fix.satellites, 8);
        assert!((fix.speed_kmh - 41.5).abs() < 0.1);
        assert_eq!(fix.altitude_m, Some(545.4));
        assert_eq!(fix.last_updated_at, Some(at(1_100)));
    }

    #[test]
    fn test_satellite_fields_survive_position_updates() {
        let mut agg = FixAggregator::new();
        agg.apply(
            &satellites_at(TimeOfDay::new(10, 0, 5), FixQuality::Gps, Some(9)),
            at(0),
        );
        // An RMC with an older timestamp than the GGA still applies to its
        // own fields and leaves the satellite data alone
        agg.apply(
            &position_at(TimeOfDay::new(10, 0, 1), true, Some(Coordinate::new(1.0, 2.0))),
            at(10),
        );

        let fix = agg.current();
        assert_eq!(fix.satellites, 9);
        assert_eq!(fix.altitude_m, Some(100.0));
        assert_eq!(fix.position, Some(Coordinate::new(1.0, 2.0)));
    }

    #[test]
    fn test_position_fields_survive_satellite_updates() {
        let mut agg = FixAggregator::new();
        agg.apply(
            &position_at(TimeOfDay::new(10, 0, 5), true, Some(Coordinate::new(1.0, 2.0))),
            at(0),
        );
        agg.apply(
            &satellites_at(TimeOfDay::new(10, 0, 1), FixQuality::Gps, Some(4)),
            at(10),
        );

        let fix = agg.current();
        assert_eq!(fix.position, Some(Coordinate::new(1.0, 2.0)));
        assert!(fix.fix_valid);
        assert_eq!(fix.speed_kmh, 10.0);
        assert_eq!(fix.satellites, 4);
    }

    #[test]
    fn test_out_of_order_sentence_of_same_kind_is_ignored() {
        let mut agg = FixAggregator::new();
        agg.apply(
            &position_at(TimeOfDay::new(10, 0, 5), true, Some(Coordinate::new(1.0, 2.0))),
            at(0),
        );
        let applied = agg.apply(
            &position_at(TimeOfDay::new(10, 0, 4), true, Some(Coordinate::new(3.0, 4.0))),
            at(10),
        );
        assert!(!applied);
        assert_eq!(agg.current().position, Some(Coordinate::new(1.0, 2.0)));
        assert_eq!(agg.current().last_updated_at, Some(at(0)));
    }

    #[test]
    fn test_midnight_rollover_counts_as_newer() {
        let mut agg = FixAggregator::new();
        agg.apply(
            &position_at(TimeOfDay::new(23, 59, 59), true, Some(Coordinate::new(1.0, 2.0))),
            at(0),
        );
        assert!(agg.apply(
            &position_at(TimeOfDay::new(0, 0, 0), true, Some(Coordinate::new(3.0, 4.0))),
            at(1_000),
        ));
        assert_eq!(agg.current().position, Some(Coordinate::new(3.0, 4.0)));
    }

    #[test]
    fn test_lost_fix_keeps_last_position() {
        let mut agg = FixAggregator::new();
        agg.apply(
            &position_at(TimeOfDay::new(10, 0, 0), true, Some(Coordinate::new(1.0, 2.0))),
            at(0),
        );
        agg.apply(&position_at(TimeOfDay::new(10, 0, 1), false, None), at(1_000));

        let fix = agg.current();
        assert!(!fix.fix_valid);
        assert_eq!(fix.position, Some(Coordinate::new(1.0, 2.0)));
        assert_eq!(fix.valid_position(), None);
    }

    #[test]
    fn test_no_fix_keeps_satellite_count() {
        let mut agg = FixAggregator::new();
        agg.apply(
            &satellites_at(TimeOfDay::new(10, 0, 0), FixQuality::Gps, Some(7)),
            at(0),
        );
        agg.apply(
            &satellites_at(TimeOfDay::new(10, 0, 1), FixQuality::NoFix, Some(0)),
            at(1_000),
        );
        let fix = agg.current();
        assert_eq!(fix.quality, FixQuality::NoFix);
        assert_eq!(fix.satellites, 7);
    }

    #[test]
    fn test_staleness() {
        let mut agg = FixAggregator::new();
        let max_age = Duration::from_secs(30);
        assert!(agg.is_stale(at(0), max_age));

        agg.apply(&parse_str(RMC).unwrap(), at(5_000));
        assert!(!agg.is_stale(at(5_000), max_age));
        assert!(!agg.is_stale(at(35_000), max_age));
        assert!(agg.is_stale(at(35_001), max_age));
        // A clock reading before the update is not stale
        assert!(!agg.is_stale(at(4_000), max_age));
    }

    #[test]
    fn test_satellite_sentences_do_not_keep_position_fresh() {
        let mut agg = FixAggregator::new();
        let max_age = Duration::from_secs(30);
        agg.apply(&parse_str(RMC).unwrap(), at(0));

        // Only GGA from here on, one every 5 s for two minutes
        for step in 1..=24u8 {
            let seconds = 19 + step * 5;
            let time = TimeOfDay::new(12, 35 + seconds / 60, seconds % 60);
            assert!(agg.apply(
                &satellites_at(time, FixQuality::Gps, Some(8)),
                at(u64::from(step) * 5_000),
            ));
        }

        let now = at(120_000);
        assert!(agg.is_stale(now, max_age));
        assert!(!agg.satellites_stale(now, max_age));
        assert_eq!(agg.current().last_position_at, Some(at(0)));
        assert_eq!(agg.current().last_satellites_at, Some(now));
        assert_eq!(agg.current().last_updated_at, Some(now));
    }

    #[test]
    fn test_backward_clock_jump_is_followed() {
        let mut agg = FixAggregator::new();
        // Receiver starts on a wrong RTC time, then switches to satellite time
        assert!(agg.apply(
            &position_at(TimeOfDay::new(23, 59, 50), true, Some(Coordinate::new(1.0, 2.0))),
            at(0),
        ));

        let mut accepted = 0;
        for second in 5..65u8 {
            let time = TimeOfDay::new(12, second / 60, second % 60);
            let sentence = position_at(time, true, Some(Coordinate::new(3.0, 4.0)));
            if agg.apply(&sentence, at(u64::from(second) * 1_000)) {
                accepted += 1;
            }
        }

        assert_eq!(accepted, 60);
        assert!(agg.current().fix_valid);
        assert_eq!(agg.current().position, Some(Coordinate::new(3.0, 4.0)));
        assert!(!agg.is_stale(at(64_000), Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_sentence_time_is_not_a_baseline() {
        let mut agg = FixAggregator::new();
        // No fix yet, receiver clock still at its power-on value
        agg.apply(&position_at(TimeOfDay::new(0, 0, 3), false, None), at(0));
        assert!(agg.apply(
            &position_at(TimeOfDay::new(0, 0, 1), true, Some(Coordinate::new(1.0, 2.0))),
            at(1_000),
        ));
        assert!(agg.current().fix_valid);
    }
}
