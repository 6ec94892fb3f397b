//! Robot operating period as tagged bitflags.

use bitflags::bitflags;

bitflags! {
    /// Operating mode reported by the host.
    ///
    /// `ENABLED` is the union of every mode in which actuators may move.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Period: u8 {
        const DISABLED   = 0b0000_0001;
        const AUTONOMOUS = 0b0000_0010;
        const TELEOP     = 0b0000_0100;
        const TEST       = 0b0000_1000;

        const ENABLED = Self::AUTONOMOUS.bits() | Self::TELEOP.bits() | Self::TEST.bits();
    }
}

/// `true` when `value` shares at least one bit with `flag`.
pub const fn has_flag(value: Period, flag: Period) -> bool {
    value.bits() & flag.bits() != 0
}

impl Period {
    pub const fn is_enabled(self) -> bool {
        has_flag(self, Period::ENABLED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_modes() {
        assert!(Period::AUTONOMOUS.is_enabled());
        assert!(Period::TELEOP.is_enabled());
        assert!(Period::TEST.is_enabled());
        assert!(!Period::DISABLED.is_enabled());
    }

    #[test]
    fn has_flag_is_bitwise() {
        assert!(has_flag(Period::TELEOP, Period::TELEOP));
        assert!(!has_flag(Period::TELEOP, Period::AUTONOMOUS));
        assert!(has_flag(Period::ENABLED, Period::TEST));
        assert!(!has_flag(Period::DISABLED, Period::ENABLED));
        assert!(!has_flag(Period::empty(), Period::all()));
    }
}
