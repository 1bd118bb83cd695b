//! # Sampler / Rate Limiter
//!
//! Down-samples the aggregated stick vector to the command cadence.
//!
//! The sampler is driven by the poll tick. Every poll it records the latest
//! complete aggregate; every `command_every_polls`-th poll it takes the most
//! recently recorded vector and, if its norm clears the noise floor, emits it
//! scaled by the reach factor as a [`SampledTarget`].
//!
//! A vector recorded before the last command tick is carried forward: holding
//! the stick still keeps producing the same target on each command tick for
//! as long as it clears the floor.

/// Sampler parameters, fixed at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerSettings {
    /// Noise floor. Vectors with a norm at or below this are dropped.
    pub min_norm: f32,
    /// Scale from stick fraction to millimeters per command cycle.
    pub max_reach: f32,
    /// Command cadence as a multiple of the poll cadence.
    pub command_every_polls: u32,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            min_norm: 0.2,
            max_reach: 0.2,
            command_every_polls: 20,
        }
    }
}

/// Relative displacement candidate in device units (mm).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampledTarget {
    pub dx: f32,
    pub dy: f32,
}

/// Two-cadence sampler.
#[derive(Debug, Clone)]
pub struct Sampler {
    settings: SamplerSettings,
    latest: Option<(f32, f32)>,
    polls_since_command: u32,
}

impl Sampler {
    /// Creates a sampler. A zero command multiple is treated as one.
    #[must_use]
    pub fn new(settings: SamplerSettings) -> Self {
        Self {
            settings: SamplerSettings {
                command_every_polls: settings.command_every_polls.max(1),
                ..settings
            },
            latest: None,
            polls_since_command: 0,
        }
    }

    /// Returns the active settings.
    #[must_use]
    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    /// Handles one poll tick.
    ///
    /// `aggregate` is the aggregator's complete vector, or `None` while an
    /// axis is still unknown. Returns a target only on command ticks.
    pub fn poll(&mut self, aggregate: Option<(f32, f32)>) -> Option<SampledTarget> {
        if aggregate.is_some() {
            self.latest = aggregate;
        }

        self.polls_since_command += 1;
        if self.polls_since_command < self.settings.command_every_polls {
            return None;
        }
        self.polls_since_command = 0;

        self.latest.and_then(|vector| self.candidate(vector))
    }

    /// Applies the noise floor and reach scaling to a vector.
    #[must_use]
    pub fn candidate(&self, (x, y): (f32, f32)) -> Option<SampledTarget> {
        if x.hypot(y) > self.settings.min_norm {
            Some(SampledTarget {
                dx: x * self.settings.max_reach,
                dy: y * self.settings.max_reach,
            })
        } else {
            None
        }
    }
}
