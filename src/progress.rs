//! Progress reporting for long-running copies

use crate::config::{self, error_num};
use crate::errors::{ErrorClass, GeoDataError, Result};

/// Progress callback: receives the completed fraction in `[0, 1]` and a
/// message. Returning `false` cancels the operation.
pub type ProgressCallback<'a> = &'a mut dyn FnMut(f64, &str) -> bool;

/// Wraps an optional [`ProgressCallback`], mapping local fractions into the
/// current sub-range.
pub struct Progress<'a> {
    callback: Option<ProgressCallback<'a>>,
    start: f64,
    end: f64,
}

impl<'a> Progress<'a> {
    pub fn new(callback: Option<ProgressCallback<'a>>) -> Self {
        Progress {
            callback,
            start: 0.0,
            end: 1.0,
        }
    }

    /// A progress that never reports and never cancels.
    pub fn none() -> Progress<'static> {
        Progress {
            callback: None,
            start: 0.0,
            end: 1.0,
        }
    }

    /// Subsequent reports of `0..=1` map to `start..=end`.
    pub fn set_range(&mut self, start: f64, end: f64) {
        self.start = start;
        self.end = end;
    }

    /// Reports `complete` (a fraction of the current range).
    ///
    /// Returns [`GeoDataError::Cancelled`] when the callback asks to stop.
    pub fn report(&mut self, complete: f64, message: &str) -> Result<()> {
        let Some(callback) = self.callback.as_mut() else {
            return Ok(());
        };
        let complete = self.start + (self.end - self.start) * complete.clamp(0.0, 1.0);
        if callback(complete, message) {
            Ok(())
        } else {
            config::report(
                ErrorClass::Failure,
                error_num::USER_INTERRUPT,
                "User terminated",
            );
            Err(GeoDataError::Cancelled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_and_cancel() {
        let mut seen = Vec::new();
        let mut callback = |complete: f64, _: &str| {
            seen.push(complete);
            complete < 0.7
        };
        let mut progress = Progress::new(Some(&mut callback));
        progress.report(0.5, "").unwrap();
        progress.set_range(0.5, 1.0);
        progress.report(0.2, "").unwrap();
        let err = progress.report(1.0, "").unwrap_err();
        assert!(matches!(err, GeoDataError::Cancelled));
        drop(progress);
        assert_eq!(seen, vec![0.5, 0.6, 1.0]);
    }

    #[test]
    fn test_none_never_cancels() {
        assert!(Progress::none().report(1.0, "done").is_ok());
    }
}
