//! Animation nodes.
//!
//! An animation owns one keyframe [`Channel`] and samples it by normalized
//! progress. The channel is the node's persistent state, stored as JSON.

use serde::{Deserialize, Serialize};

use relogic_core::{NodeBehavior, NodeError, NodeKind, PropertyTree, PropertyType, Shape};

/// Keyframes: strictly increasing timestamps (seconds) with one float each.
///
/// Every number is finite and so is the span from first to last timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    timestamps: Vec<f32>,
    values: Vec<f32>,
}

impl Channel {
    pub fn new(timestamps: Vec<f32>, values: Vec<f32>) -> Result<Self, NodeError> {
        if timestamps.is_empty() {
            return Err(NodeError::new("animation channel has no keyframes"));
        }
        if timestamps.len() != values.len() {
            return Err(NodeError::new(format!(
                "animation channel has {} timestamps but {} values",
                timestamps.len(),
                values.len()
            )));
        }
        if let Some(bad) = timestamps.iter().chain(&values).find(|v| !v.is_finite()) {
            return Err(NodeError::new(format!("animation keyframes must be finite, got {bad}")));
        }
        if timestamps.windows(2).any(|w| w[0] >= w[1]) {
            return Err(NodeError::new("animation timestamps must be strictly increasing"));
        }
        let channel = Channel { timestamps, values };
        if !channel.duration().is_finite() {
            return Err(NodeError::new("animation duration does not fit a float"));
        }
        Ok(channel)
    }

    /// Time from the first keyframe to the last.
    pub fn duration(&self) -> f32 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last - first,
            _ => 0.0,
        }
    }

    /// Linearly interpolated value at absolute time `t`, clamped to the ends.
    pub fn sample(&self, t: f32) -> f32 {
        let next = self.timestamps.partition_point(|&ts| ts <= t);
        if next == 0 {
            return self.values[0];
        }
        if next == self.timestamps.len() {
            return self.values[next - 1];
        }
        let (t0, t1) = (self.timestamps[next - 1], self.timestamps[next]);
        let (v0, v1) = (self.values[next - 1], self.values[next]);
        // Convex blend, finite even between f32::MIN and f32::MAX.
        let f = (t - t0) / (t1 - t0);
        v0 * (1.0 - f) + v1 * f
    }
}

/// Input `progress` in `[0, 1]`; outputs `duration` and the sampled `channel`.
#[derive(Debug, Clone)]
pub struct Animation {
    channel: Channel,
}

impl Animation {
    pub fn new(channel: Channel) -> Self {
        Animation { channel }
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    pub fn from_state(state: &[u8]) -> Result<Self, NodeError> {
        let raw: Channel = serde_json::from_slice(state)
            .map_err(|e| NodeError::new(format!("invalid animation channel: {e}")))?;
        Channel::new(raw.timestamps, raw.values).map(Animation::new)
    }
}

impl NodeBehavior for Animation {
    fn kind(&self) -> NodeKind {
        NodeKind::Animation
    }

    fn input_shape(&self) -> Shape {
        Shape::structure([("progress", Shape::Leaf(PropertyType::Float))])
    }

    fn output_shape(&self) -> Shape {
        Shape::structure([
            ("duration", Shape::Leaf(PropertyType::Float)),
            ("channel", Shape::Leaf(PropertyType::Float)),
        ])
    }

    fn recompute(&mut self, inputs: &PropertyTree, outputs: &mut PropertyTree) -> Result<(), NodeError> {
        let progress = inputs.child("progress")?.get::<f32>()?;
        if !(0.0..=1.0).contains(&progress) {
            return Err(NodeError::new(format!(
                "progress must be within [0, 1], got {progress}"
            )));
        }

        let duration = self.channel.duration();
        let start = self.channel.timestamps[0];
        outputs.child_mut("duration")?.set(duration)?;
        outputs
            .child_mut("channel")?
            .set(self.channel.sample(start + progress * duration))?;
        Ok(())
    }

    fn save_state(&self) -> Result<Vec<u8>, NodeError> {
        serde_json::to_vec(&self.channel).map_err(|e| NodeError::new(format!("cannot encode animation channel: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> Animation {
        Animation::new(Channel::new(vec![0.0, 1.0, 3.0], vec![0.0, 10.0, 30.0]).unwrap())
    }

    fn run(anim: &mut Animation, progress: f32) -> Result<(f32, f32), NodeError> {
        let mut inputs = PropertyTree::new(&anim.input_shape()).unwrap();
        let mut outputs = PropertyTree::new(&anim.output_shape()).unwrap();
        inputs.child_mut("progress").unwrap().set(progress).unwrap();
        anim.recompute(&inputs, &mut outputs)?;
        Ok((
            outputs.child("duration").unwrap().get().unwrap(),
            outputs.child("channel").unwrap().get().unwrap(),
        ))
    }

    #[test]
    fn samples_by_progress() {
        let mut anim = ramp();
        assert_eq!(run(&mut anim, 0.0).unwrap(), (3.0, 0.0));
        assert_eq!(run(&mut anim, 0.5).unwrap(), (3.0, 15.0));
        assert_eq!(run(&mut anim, 1.0).unwrap(), (3.0, 30.0));
    }

    #[test]
    fn progress_out_of_range_fails() {
        let mut anim = ramp();
        let err = run(&mut anim, 1.5).unwrap_err();
        assert_eq!(err.message, "progress must be within [0, 1], got 1.5");
    }

    #[test]
    fn channel_validation() {
        assert!(Channel::new(vec![], vec![]).is_err());
        assert!(Channel::new(vec![0.0, 1.0], vec![1.0]).is_err());
        assert!(Channel::new(vec![1.0, 1.0], vec![0.0, 0.0]).is_err());
    }

    #[test]
    fn non_finite_keyframes_are_rejected() {
        let err = Channel::new(vec![0.0, 1.0], vec![0.0, f32::NAN]).unwrap_err();
        assert_eq!(err.message, "animation keyframes must be finite, got NaN");
        let err = Channel::new(vec![0.0, f32::INFINITY], vec![0.0, 1.0]).unwrap_err();
        assert_eq!(err.message, "animation keyframes must be finite, got inf");
        assert!(Channel::new(vec![f32::NEG_INFINITY, 0.0], vec![0.0, 1.0]).is_err());

        let err = Channel::new(vec![f32::MIN, f32::MAX], vec![0.0, 1.0]).unwrap_err();
        assert_eq!(err.message, "animation duration does not fit a float");
    }

    #[test]
    fn extreme_finite_keyframes_survive_state() {
        let channel = Channel::new(
            vec![-1.0e30, -0.0, f32::from_bits(1), f32::MIN_POSITIVE, 1.0e30],
            vec![f32::MAX, f32::MIN, -0.0, f32::from_bits(1), f32::EPSILON],
        )
        .unwrap();
        let anim = Animation::new(channel);
        let restored = Animation::from_state(&anim.save_state().unwrap()).unwrap();
        assert_eq!(restored.channel(), anim.channel());
        let bits = |c: &Channel| c.values.iter().map(|v| v.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(restored.channel()), bits(anim.channel()));
    }

    #[test]
    fn sampling_between_float_limits_stays_finite() {
        let channel = Channel::new(vec![0.0, 2.0], vec![f32::MIN, f32::MAX]).unwrap();
        assert_eq!(channel.sample(0.0), f32::MIN);
        assert_eq!(channel.sample(1.0), 0.0);
        assert_eq!(channel.sample(2.0), f32::MAX);
        assert!(channel.sample(0.5).is_finite());
    }

    #[test]
    fn state_roundtrip_revalidates() {
        let anim = ramp();
        let restored = Animation::from_state(&anim.save_state().unwrap()).unwrap();
        assert_eq!(restored.channel(), anim.channel());

        let bad = br#"{"timestamps":[2.0,1.0],"values":[0.0,0.0]}"#;
        assert!(Animation::from_state(bad).is_err());
    }
}
