//! Runtime configuration and diagnostics
//!
//! The library can be configured at runtime through string options. Options
//! set with the thread-local setters override the global ones for the calling
//! thread.
//!
//! ```
//! use geodata::config::*;
//!
//! // Leave the ASCII grid driver out of `register_all`
//! set_config_option("GDAL_SKIP", "AAIGrid").unwrap();
//!
//! assert_eq!(get_config_option("GDAL_SKIP", "").unwrap(), "AAIGrid");
//!
//! clear_config_option("GDAL_SKIP").unwrap();
//!
//! // Check the option has been cleared
//! assert_eq!(get_config_option("GDAL_SKIP", "XXX").unwrap(), "XXX");
//! ```
//!
//! Options read by the library:
//!
//! * `GDAL_SKIP`: space or comma separated driver short names that
//!   [`DriverRegistry::register_all`](crate::DriverRegistry::register_all) leaves out.
//! * `GDAL_VALIDATE_CREATION_OPTIONS`: set to `NO` to skip creation option validation.
//!
//! Non-fatal diagnostics (creation option warnings, lenient copy losses, ...)
//! are delivered to the handler installed with [`set_error_handler`]. Without a
//! handler they are forwarded to the [`log`] facade.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::{LazyLock, Mutex};

use crate::errors::{ErrorClass, GeoDataError, Result};

/// Error numbers passed to the error handler next to the [`ErrorClass`].
pub mod error_num {
    pub const APP_DEFINED: i32 = 1;
    pub const FILE_IO: i32 = 3;
    pub const OPEN_FAILED: i32 = 4;
    pub const ILLEGAL_ARG: i32 = 5;
    pub const NOT_SUPPORTED: i32 = 6;
    pub const USER_INTERRUPT: i32 = 9;
}

static CONFIG_OPTIONS: LazyLock<Mutex<HashMap<String, String>>> = LazyLock::new(Default::default);

thread_local! {
    static THREAD_LOCAL_OPTIONS: RefCell<HashMap<String, String>> = RefCell::new(HashMap::new());
}

fn check_key(key: &str) -> Result<()> {
    if key.is_empty() || key.contains(['\0', '=']) {
        return Err(GeoDataError::BadArgument(format!(
            "Invalid configuration key: '{key}'"
        )));
    }
    Ok(())
}

fn check_value(value: &str) -> Result<()> {
    if value.contains('\0') {
        return Err(GeoDataError::BadArgument(format!(
            "Invalid configuration value: '{value}'"
        )));
    }
    Ok(())
}

fn global_options() -> std::sync::MutexGuard<'static, HashMap<String, String>> {
    match CONFIG_OPTIONS.lock() {
        Ok(guard) => guard,
        // a panic while holding the lock leaves the map itself intact
        Err(poison_error) => poison_error.into_inner(),
    }
}

/// Set a library configuration option
pub fn set_config_option(key: &str, value: &str) -> Result<()> {
    check_key(key)?;
    check_value(value)?;
    global_options().insert(key.to_string(), value.to_string());
    Ok(())
}

/// Get the value of a library configuration option
///
/// A thread-local value takes precedence. If the option specified by `key` is
/// not set, `default` is returned.
pub fn get_config_option(key: &str, default: &str) -> Result<String> {
    check_key(key)?;
    if let Some(value) = THREAD_LOCAL_OPTIONS.with(|opts| opts.borrow().get(key).cloned()) {
        return Ok(value);
    }
    Ok(global_options()
        .get(key)
        .cloned()
        .unwrap_or_else(|| default.to_string()))
}

/// Clear the value of a library configuration option
pub fn clear_config_option(key: &str) -> Result<()> {
    check_key(key)?;
    global_options().remove(key);
    Ok(())
}

/// Set a library configuration option with **thread local** scope
pub fn set_thread_local_config_option(key: &str, value: &str) -> Result<()> {
    check_key(key)?;
    check_value(value)?;
    THREAD_LOCAL_OPTIONS.with(|opts| {
        opts.borrow_mut().insert(key.to_string(), value.to_string());
    });
    Ok(())
}

/// Get the value of a library configuration option with **thread local** scope
///
/// Global options are not consulted.
pub fn get_thread_local_config_option(key: &str, default: &str) -> Result<String> {
    check_key(key)?;
    Ok(THREAD_LOCAL_OPTIONS.with(|opts| {
        opts.borrow()
            .get(key)
            .cloned()
            .unwrap_or_else(|| default.to_string())
    }))
}

/// Clear the value of a library configuration option with **thread local** scope
pub fn clear_thread_local_config_option(key: &str) -> Result<()> {
    check_key(key)?;
    THREAD_LOCAL_OPTIONS.with(|opts| {
        opts.borrow_mut().remove(key);
    });
    Ok(())
}

/// Interpret a configuration option as a boolean (`YES`, `ON`, `TRUE`, `1`).
pub(crate) fn config_option_bool(key: &str, default: bool) -> bool {
    match get_config_option(key, "") {
        Ok(value) if !value.is_empty() => is_true(&value),
        _ => default,
    }
}

pub(crate) fn is_true(value: &str) -> bool {
    matches!(
        value.to_ascii_uppercase().as_str(),
        "YES" | "ON" | "TRUE" | "1"
    )
}

type ErrorCallbackType = dyn FnMut(ErrorClass, i32, &str) + 'static + Send;

/// Holds the current error callback function
static ERROR_CALLBACK: LazyLock<Mutex<Option<Box<ErrorCallbackType>>>> =
    LazyLock::new(Default::default);

/// Set a custom error handler.
///
/// The handler replaces the default forwarding to [`log`]. It must not call
/// back into [`set_error_handler`] or [`remove_error_handler`].
///
/// The function must be `Send` since it is potentially called from multiple threads.
pub fn set_error_handler<F>(callback: F)
where
    F: FnMut(ErrorClass, i32, &str) + 'static + Send,
{
    let mut callback_lock = match ERROR_CALLBACK.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    };
    callback_lock.replace(Box::new(callback));
}

/// Remove a custom error handler, restoring the [`log`] forwarding.
pub fn remove_error_handler() {
    let mut callback_lock = match ERROR_CALLBACK.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    };
    callback_lock.take();
}

/// Deliver a diagnostic to the installed handler, or to [`log`].
pub(crate) fn report(class: ErrorClass, error_num: i32, msg: &str) {
    let mut callback_lock = match ERROR_CALLBACK.lock() {
        Ok(guard) => guard,
        Err(poison_error) => poison_error.into_inner(),
    };
    if let Some(callback) = callback_lock.as_mut() {
        callback(class, error_num, msg);
        return;
    }
    drop(callback_lock);

    match class {
        ErrorClass::None => {}
        ErrorClass::Debug => log::debug!("{msg}"),
        ErrorClass::Warning => log::warn!("{msg}"),
        ErrorClass::Failure | ErrorClass::Fatal => log::error!("[{error_num}] {msg}"),
    }
}
