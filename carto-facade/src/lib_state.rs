//! Process-wide library state: the logging floor/verbosity knobs, and the
//! at-most-one-handle-per-process invariant from spec.md §3/§6.5.

use std::sync::atomic::{AtomicBool, Ordering};

use log::LevelFilter;

use crate::error::CartoError;

static LIB_INITIALIZED: AtomicBool = AtomicBool::new(false);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LibState {
    pub min_log_level: i32,
    pub verbose: i32,
}

impl LibState {
    /// Mirrors `viam_carto_lib_init`: fails if a handle is already live in
    /// this process. Sets the process-wide log level floor; actual logger
    /// backend installation (env_logger, tracing-subscriber, ...) is the
    /// caller's responsibility, same as spec.md §1 excludes "logging
    /// backend initialization" from the facade's concerns.
    pub fn init(min_log_level: i32, verbose: i32) -> Result<Self, CartoError> {
        if LIB_INITIALIZED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CartoError::LibAlreadyInitialized);
        }
        let level = level_filter_for(min_log_level, verbose);
        log::set_max_level(level);
        Ok(LibState {
            min_log_level,
            verbose,
        })
    }

    /// Mirrors `viam_carto_lib_terminate`: fails if no handle is live.
    pub fn terminate(self) -> Result<(), CartoError> {
        if LIB_INITIALIZED
            .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CartoError::LibNotInitialized);
        }
        log::set_max_level(LevelFilter::Off);
        Ok(())
    }
}

fn level_filter_for(min_log_level: i32, verbose: i32) -> LevelFilter {
    if verbose > 0 {
        return LevelFilter::Trace;
    }
    match min_log_level {
        i32::MIN..=0 => LevelFilter::Info,
        1 => LevelFilter::Warn,
        2 => LevelFilter::Error,
        _ => LevelFilter::Off,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // LIB_INITIALIZED is process-global, so double-init and double-terminate
    // are exercised in one test to avoid racing against other tests in this
    // module running concurrently on separate threads.
    #[test]
    fn double_init_and_double_terminate_both_fail() {
        let first = LibState::init(0, 1).unwrap();
        assert_eq!(LibState::init(0, 1), Err(CartoError::LibAlreadyInitialized));
        first.terminate().unwrap();

        let second = LibState::init(0, 0).unwrap();
        second.terminate().unwrap();
        assert_eq!(second.terminate(), Err(CartoError::LibNotInitialized));
    }
}
