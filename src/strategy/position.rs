use crate::models::PositionSide;

/// Side and entry price of the strategy's position, plus trend trigger flags
///
/// The flags keep a trend from re-entering on every cycle while it persists.
/// A flag is cleared when its side exits, or when the opposite side enters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionState {
    side: Option<PositionSide>,
    entry_price: Option<f64>,
    uptrend_fired: bool,
    downtrend_fired: bool,
}

impl PositionState {
    /// Open a position
    ///
    /// # Panics
    /// If a position is already open. The evaluator never enters from a
    /// non-flat state, so reaching this is a state machine bug.
    pub fn enter(&mut self, side: PositionSide, price: f64) {
        assert!(
            self.side.is_none(),
            "enter({:?}) while {:?} position is active",
            side,
            self.side
        );

        self.side = Some(side);
        self.entry_price = Some(price);
        match side {
            PositionSide::Long => {
                self.uptrend_fired = true;
                self.downtrend_fired = false;
            }
            PositionSide::Short => {
                self.downtrend_fired = true;
                self.uptrend_fired = false;
            }
        }
    }

    /// Close the active position and return the side that was open
    ///
    /// # Panics
    /// If no position is open.
    pub fn exit(&mut self) -> PositionSide {
        let side = self
            .side
            .take()
            .unwrap_or_else(|| panic!("exit() called without an active position"));
        self.entry_price = None;
        match side {
            PositionSide::Long => self.uptrend_fired = false,
            PositionSide::Short => self.downtrend_fired = false,
        }
        side
    }

    pub fn is_active(&self, side: PositionSide) -> bool {
        self.side == Some(side)
    }

    pub fn is_flat(&self) -> bool {
        self.side.is_none()
    }

    pub fn side(&self) -> Option<PositionSide> {
        self.side
    }

    pub fn entry_price(&self) -> Option<f64> {
        self.entry_price
    }

    pub fn uptrend_fired(&self) -> bool {
        self.uptrend_fired
    }

    pub fn downtrend_fired(&self) -> bool {
        self.downtrend_fired
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_flat() {
        let state = PositionState::default();
        assert!(state.is_flat());
        assert_eq!(state.entry_price(), None);
        assert!(!state.uptrend_fired());
        assert!(!state.downtrend_fired());
    }

    #[test]
    fn test_enter_and_exit_long() {
        let mut state = PositionState::default();
        state.enter(PositionSide::Long, 100.0);

        assert!(state.is_active(PositionSide::Long));
        assert!(!state.is_active(PositionSide::Short));
        assert_eq!(state.entry_price(), Some(100.0));
        assert!(state.uptrend_fired());

        assert_eq!(state.exit(), PositionSide::Long);
        assert!(state.is_flat());
        assert_eq!(state.entry_price(), None);
        assert!(!state.uptrend_fired());
    }

    #[test]
    fn test_short_entry_clears_uptrend_flag() {
        let mut state = PositionState::default();
        state.enter(PositionSide::Long, 100.0);
        state.exit();
        state.enter(PositionSide::Long, 101.0);
        state.exit();

        state.enter(PositionSide::Short, 99.0);
        assert!(state.downtrend_fired());
        assert!(!state.uptrend_fired());
    }

    #[test]
    fn test_exit_only_clears_own_flag() {
        let mut state = PositionState::default();
        state.enter(PositionSide::Short, 100.0);
        state.exit();
        assert!(!state.downtrend_fired());
        assert!(!state.uptrend_fired());
    }

    #[test]
    #[should_panic(expected = "while")]
    fn test_double_enter_panics() {
        let mut state = PositionState::default();
        state.enter(PositionSide::Long, 100.0);
        state.enter(PositionSide::Short, 100.0);
    }

    #[test]
    #[should_panic(expected = "without an active position")]
    fn test_exit_when_flat_panics() {
        let mut state = PositionState::default();
        state.exit();
    }
}
