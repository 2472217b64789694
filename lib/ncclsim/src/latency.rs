// SPDX-FileCopyrightText: Copyright (c) 2025-2026 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Synthetic latency model.
//!
//! Every collective and point-to-point call sleeps for a duration derived only
//! from its element count: a fixed base plus one additive tier for each size
//! threshold the count exceeds. Tiers only add time, so the delay is
//! monotonically non-decreasing in `count`.

use std::time::Duration;

/// Control-plane handshake cost charged by `ncclCommInitRank`.
pub const INIT_DELAY: Duration = Duration::from_millis(1);

/// Flush cost charged by `ncclGroupEnd`. Kept below [`LatencyModel::DEFAULT`]'s
/// base so a group end is always cheaper than any collective.
pub const GROUP_FLUSH_DELAY: Duration = Duration::from_micros(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyTier {
    /// Applies when `count > threshold`.
    pub threshold: usize,
    pub extra: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LatencyModel {
    pub base: Duration,
    pub tiers: &'static [LatencyTier],
}

const DEFAULT_TIERS: &[LatencyTier] = &[
    LatencyTier {
        threshold: 1024,
        extra: Duration::from_micros(100),
    },
    // 1 Mi elements
    LatencyTier {
        threshold: 1 << 20,
        extra: Duration::from_micros(500),
    },
    // 16 Mi elements
    LatencyTier {
        threshold: 1 << 24,
        extra: Duration::from_micros(2000),
    },
];

impl LatencyModel {
    pub const DEFAULT: LatencyModel = LatencyModel {
        base: Duration::from_micros(50),
        tiers: DEFAULT_TIERS,
    };

    pub fn delay_for(&self, count: usize) -> Duration {
        self.tiers
            .iter()
            .filter(|tier| count > tier.threshold)
            .fold(self.base, |acc, tier| acc + tier.extra)
    }

    /// Block the calling thread for [`Self::delay_for`]`(count)`.
    pub fn simulate(&self, count: usize) {
        std::thread::sleep(self.delay_for(count));
    }
}

impl Default for LatencyModel {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// [`LatencyModel::DEFAULT`] applied to `count`.
pub fn simulate(count: usize) {
    LatencyModel::DEFAULT.simulate(count);
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Instant;

    #[rstest]
    #[case(0, 50)]
    #[case(1024, 50)]
    #[case(1025, 150)]
    #[case(1 << 20, 150)]
    #[case((1 << 20) + 1, 650)]
    #[case(1 << 24, 650)]
    #[case((1 << 24) + 1, 2650)]
    #[case(usize::MAX, 2650)]
    fn test_tier_boundaries(#[case] count: usize, #[case] micros: u64) {
        assert_eq!(
            LatencyModel::DEFAULT.delay_for(count),
            Duration::from_micros(micros)
        );
    }

    #[test]
    fn test_delay_is_monotonic() {
        let model = LatencyModel::DEFAULT;
        let mut previous = Duration::ZERO;
        let mut count = 0usize;
        while count < (1 << 26) {
            let delay = model.delay_for(count);
            assert!(delay >= previous, "delay dropped at count {count}");
            previous = delay;
            count = count * 2 + 1;
        }
    }

    #[test]
    fn test_group_flush_is_cheaper_than_any_collective() {
        assert!(GROUP_FLUSH_DELAY < LatencyModel::DEFAULT.delay_for(0));
        assert!(GROUP_FLUSH_DELAY > Duration::ZERO);
    }

    #[test]
    fn test_simulate_scales_with_count() {
        // 2,000,000 elements model 650us against 50us for 100; compare the
        // best of several runs so scheduler noise cannot invert the order.
        let best_of = |count: usize| {
            (0..5)
                .map(|_| {
                    let start = Instant::now();
                    simulate(count);
                    start.elapsed()
                })
                .min()
                .unwrap()
        };
        let small = best_of(100);
        let large = best_of(2_000_000);
        assert!(large >= small, "large={large:?} small={small:?}");
        assert!(large >= Duration::from_micros(650));
    }
}
