//! Home proximity classification and transition debouncing

use crate::fix::PositionFix;
use crate::geo::{self, Coordinate, Distance};

/// Where the vehicle is relative to home
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Proximity {
    #[default]
    Unknown,
    Near,
    Far,
}

/// Result of one evaluation. Recomputed every sampling cycle, never stored
/// as the source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProximityState {
    pub proximity: Proximity,
    /// In the unit of the configured radius, `None` when unknown
    pub distance: Option<Distance>,
}

impl ProximityState {
    pub const UNKNOWN: Self = Self {
        proximity: Proximity::Unknown,
        distance: None,
    };
}

/// Classify the current fix against home.
///
/// Without a valid fix the answer is `Unknown`; a last known position is
/// never reported as an authoritative distance. The boundary is inclusive.
pub fn evaluate(fix: &PositionFix, home: Coordinate, radius: Distance) -> ProximityState {
    let Some(position) = fix.valid_position() else {
        return ProximityState::UNKNOWN;
    };

    let distance = geo::distance(position, home, radius.unit);
    let proximity = if distance.value <= radius.value {
        Proximity::Near
    } else {
        Proximity::Far
    };

    ProximityState {
        proximity,
        distance: Some(distance),
    }
}

/// Confirms proximity changes only after several agreeing readings, so a
/// single noisy fix near the boundary does not toggle the connection.
///
/// Emits `Near` on Unknown/Far to Near and `Far` on Near to Far. The first
/// confirmed `Far` after startup is silent, there is nothing to tear down.
#[derive(Debug, Clone)]
pub struct ProximityDebouncer {
    confirmed: Proximity,
    candidate: Proximity,
    streak: u8,
    required: u8,
}

impl ProximityDebouncer {
    /// `required` consecutive readings confirm a change; zero is treated as one
    pub const fn new(required: u8) -> Self {
        Self {
            confirmed: Proximity::Unknown,
            candidate: Proximity::Unknown,
            streak: 0,
            required: if required == 0 { 1 } else { required },
        }
    }

    pub const fn confirmed(&self) -> Proximity {
        self.confirmed
    }

    /// Feed one reading, returning a transition once it is confirmed
    pub fn update(&mut self, reading: Proximity) -> Option<Proximity> {
        if reading == Proximity::Unknown || reading == self.confirmed {
            self.candidate = Proximity::Unknown;
            self.streak = 0;
            return None;
        }

        if reading == self.candidate {
            self.streak = self.streak.saturating_add(1);
        } else {
            self.candidate = reading;
            self.streak = 1;
        }

        if self.streak < self.required {
            return None;
        }

        let previous = self.confirmed;
        self.confirmed = reading;
        self.candidate = Proximity::Unknown;
        self.streak = 0;

        match (previous, reading) {
            (Proximity::Unknown, Proximity::Far) => None,
            _ => Some(reading),
        }
    }
}
