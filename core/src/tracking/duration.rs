use crate::timers::Millis;

/// Wire duration meaning "never expires on its own".
pub const PERMANENT_DURATION: i64 = 0x7FFF_FFFF;

/// How long an entry lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryDuration {
    Finite(Millis),
    Permanent,
}

impl EntryDuration {
    /// Interpret a duration as sent by the server. Negative values clamp to 0.
    pub fn from_wire(raw: i64) -> Self {
        if raw >= PERMANENT_DURATION {
            Self::Permanent
        } else {
            Self::Finite(raw.max(0) as Millis)
        }
    }

    pub fn to_wire(self) -> i64 {
        match self {
            Self::Finite(ms) => ms.min(PERMANENT_DURATION as Millis - 1) as i64,
            Self::Permanent => PERMANENT_DURATION,
        }
    }

    /// Shorten a finite duration by the delay already spent in transit.
    pub fn compensate(self, latency_ms: u32) -> Self {
        match self {
            Self::Finite(ms) => Self::Finite(ms.saturating_sub(u64::from(latency_ms))),
            Self::Permanent => Self::Permanent,
        }
    }

    pub fn is_permanent(self) -> bool {
        matches!(self, Self::Permanent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_wire() {
        assert_eq!(EntryDuration::from_wire(5_000), EntryDuration::Finite(5_000));
        assert_eq!(EntryDuration::from_wire(-20), EntryDuration::Finite(0));
        assert_eq!(EntryDuration::from_wire(PERMANENT_DURATION), EntryDuration::Permanent);
        assert_eq!(EntryDuration::from_wire(i64::MAX), EntryDuration::Permanent);
    }

    #[test]
    fn test_compensate_floors_at_zero_and_skips_permanent() {
        assert_eq!(EntryDuration::Finite(5_000).compensate(80), EntryDuration::Finite(4_920));
        assert_eq!(EntryDuration::Finite(50).compensate(80), EntryDuration::Finite(0));
        assert_eq!(EntryDuration::Permanent.compensate(80), EntryDuration::Permanent);
    }

    #[test]
    fn test_to_wire_never_collides_with_sentinel() {
        assert_eq!(EntryDuration::Finite(u64::MAX).to_wire(), PERMANENT_DURATION - 1);
        assert_eq!(EntryDuration::Permanent.to_wire(), PERMANENT_DURATION);
    }
}
