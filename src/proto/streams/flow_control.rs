//! Per-stream receive-window credit math, split into window/available
//! halves, narrowed to what this client core needs: we only ever receive
//! DATA, never send it, so there is only one direction to track.

/// `spec.md` §4.2: the per-stream window we advertise in our own SETTINGS.
pub const INITIAL_WINDOW_SIZE: u32 = 1_048_575;

/// Tracks how much of a stream's advertised receive window remains, and
/// when enough has been consumed to justify crediting it back with a
/// `WINDOW_UPDATE` (`spec.md` §4.2's connection window policy, applied here
/// per-stream: "credited when ≥ 50% of initial credit has been consumed").
#[derive(Debug, Clone, Copy)]
pub struct FlowControl {
    initial: u32,
    remaining: u32,
}

impl FlowControl {
    pub fn new(initial: u32) -> FlowControl {
        FlowControl {
            initial,
            remaining: initial,
        }
    }

    /// Registers `len` bytes of DATA just received. Returns `Err(())` if
    /// the peer exceeded the window (`spec.md` §4.2 DATA rule).
    pub fn consume(&mut self, len: u32) -> Result<(), ()> {
        if len > self.remaining {
            return Err(());
        }
        self.remaining -= len;
        Ok(())
    }

    /// If the consumed-but-uncredited amount has reached half the initial
    /// window, returns the credit to send and applies it locally.
    pub fn take_credit(&mut self) -> Option<u32> {
        let consumed = self.initial - self.remaining;
        if consumed == 0 || consumed < self.initial / 2 {
            return None;
        }
        self.remaining += consumed;
        Some(consumed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_rejects_overflow() {
        let mut fc = FlowControl::new(100);
        assert!(fc.consume(100).is_ok());
        assert!(fc.consume(1).is_err());
    }

    #[test]
    fn credits_only_past_half_consumption() {
        let mut fc = FlowControl::new(100);
        fc.consume(40).unwrap();
        assert_eq!(fc.take_credit(), None);
        fc.consume(20).unwrap();
        assert_eq!(fc.take_credit(), Some(60));
        assert_eq!(fc.take_credit(), None);
    }
}
