//! Timer nodes.

use std::time::{SystemTime, UNIX_EPOCH};

use relogic_core::{NodeBehavior, NodeError, NodeKind, PropertyTree, PropertyType, Shape};

/// Converts a microsecond ticker into the time elapsed since the last tick.
///
/// Input `ticker_us` is an externally supplied timestamp. Zero means "use the
/// system clock", in which case the timer runs on every update. Outputs are
/// the effective `ticker_us` and `time_delta` in seconds, zero on the first
/// tick and whenever the ticker moves backwards.
#[derive(Debug, Clone)]
pub struct Timer {
    last_ticker: Option<i64>,
    free_running: bool,
}

impl Default for Timer {
    fn default() -> Self {
        Timer {
            last_ticker: None,
            free_running: true,
        }
    }
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Timers keep no persistent state; `state` must be empty.
    pub fn from_state(state: &[u8]) -> Result<Self, NodeError> {
        if !state.is_empty() {
            return Err(NodeError::new(format!(
                "timer state must be empty, found {} bytes",
                state.len()
            )));
        }
        Ok(Self::new())
    }
}

fn system_ticker_us() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_micros()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}

impl NodeBehavior for Timer {
    fn kind(&self) -> NodeKind {
        NodeKind::Timer
    }

    fn input_shape(&self) -> Shape {
        Shape::structure([("ticker_us", Shape::Leaf(PropertyType::Int64))])
    }

    fn output_shape(&self) -> Shape {
        Shape::structure([
            ("ticker_us", Shape::Leaf(PropertyType::Int64)),
            ("time_delta", Shape::Leaf(PropertyType::Float)),
        ])
    }

    fn recompute(&mut self, inputs: &PropertyTree, outputs: &mut PropertyTree) -> Result<(), NodeError> {
        let requested = inputs.child("ticker_us")?.get::<i64>()?;
        if requested < 0 {
            return Err(NodeError::new(format!(
                "ticker_us must not be negative, got {requested}"
            )));
        }

        let free_running = requested == 0;
        let ticker = if free_running { system_ticker_us() } else { requested };
        let delta = match self.last_ticker {
            Some(prev) if ticker >= prev => (ticker - prev) as f32 / 1_000_000.0,
            _ => 0.0,
        };

        outputs.child_mut("ticker_us")?.set(ticker)?;
        outputs.child_mut("time_delta")?.set(delta)?;
        self.last_ticker = Some(ticker);
        self.free_running = free_running;
        Ok(())
    }

    fn always_dirty(&self) -> bool {
        self.free_running
    }
}
