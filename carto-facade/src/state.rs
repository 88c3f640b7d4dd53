//! SLAM mode derivation and the atomic facade lifecycle state machine
//! (spec.md §4.5).

use std::sync::atomic::{AtomicU8, Ordering};

use crate::error::CartoError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlamMode {
    Mapping,
    Localizing,
    Updating,
}

/// Derives the SLAM mode from presence of an existing map and the
/// `enable_mapping` flag (spec.md §4.5). Does not touch the filesystem —
/// the "existing_map non-empty but unreadable" failure is a facade-level
/// concern (`IOInit` checks readability separately) because it needs I/O.
pub fn determine_slam_mode(existing_map_empty: bool, enable_mapping: bool) -> Result<SlamMode, CartoError> {
    match (existing_map_empty, enable_mapping) {
        (true, true) => Ok(SlamMode::Mapping),
        (false, false) => Ok(SlamMode::Localizing),
        (false, true) => Ok(SlamMode::Updating),
        // No map to localize/update against, and not mapping a new one:
        // there is no mode this configuration could mean.
        (true, false) => Err(CartoError::SlamModeInvalid),
    }
}

/// The lifecycle states a facade handle moves through, as an atomic integer
/// with acquire/release ordering (spec.md §9 Design Notes: "every entry
/// point reads the state first and rejects ... before taking any lock").
/// `Terminated` is a one-way sink reached only by `terminate()`: it has no
/// counterpart named in spec.md §3's three-value `state` list, but is needed
/// so a second `terminate()` call on the same handle observes a state other
/// than `IoInitialized` and fails instead of silently re-running teardown
/// (spec.md §8 P5/R2 — the original's null-out-the-handle behavior, restated
/// for a handle that has no null representation of its own).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum CartoFacadeState {
    Initialized = 0,
    IoInitialized = 1,
    Started = 2,
    Terminated = 3,
}

impl CartoFacadeState {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => CartoFacadeState::Initialized,
            1 => CartoFacadeState::IoInitialized,
            2 => CartoFacadeState::Started,
            3 => CartoFacadeState::Terminated,
            _ => unreachable!("invalid CartoFacadeState encoding"),
        }
    }
}

pub struct AtomicFacadeState(AtomicU8);

impl AtomicFacadeState {
    pub fn new(initial: CartoFacadeState) -> Self {
        AtomicFacadeState(AtomicU8::new(initial as u8))
    }

    pub fn load(&self) -> CartoFacadeState {
        CartoFacadeState::from_u8(self.0.load(Ordering::Acquire))
    }

    pub fn store(&self, state: CartoFacadeState) {
        self.0.store(state as u8, Ordering::Release);
    }

    /// Transitions to `to` iff the current state is `from`, returning
    /// `err` otherwise. Mirrors the table in spec.md §4.5.
    pub fn transition(
        &self,
        from: CartoFacadeState,
        to: CartoFacadeState,
        err: CartoError,
    ) -> Result<(), CartoError> {
        if self.load() != from {
            return Err(err);
        }
        self.store(to);
        Ok(())
    }

    pub fn require(&self, expected: CartoFacadeState, err: CartoError) -> Result<(), CartoError> {
        if self.load() != expected {
            return Err(err);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slam_mode_mapping() {
        assert_eq!(determine_slam_mode(true, true), Ok(SlamMode::Mapping));
    }

    #[test]
    fn slam_mode_localizing() {
        assert_eq!(determine_slam_mode(false, false), Ok(SlamMode::Localizing));
    }

    #[test]
    fn slam_mode_updating() {
        assert_eq!(determine_slam_mode(false, true), Ok(SlamMode::Updating));
    }

    #[test]
    fn slam_mode_invalid_without_a_map_or_mapping_enabled() {
        assert_eq!(
            determine_slam_mode(true, false),
            Err(CartoError::SlamModeInvalid)
        );
    }

    #[test]
    fn transition_rejects_from_wrong_state() {
        let state = AtomicFacadeState::new(CartoFacadeState::Initialized);
        let result = state.transition(
            CartoFacadeState::Started,
            CartoFacadeState::IoInitialized,
            CartoError::NotInStartedState,
        );
        assert_eq!(result, Err(CartoError::NotInStartedState));
    }
}
