//! FFI bindings for Sleep Drift
//!
//! This module provides C-compatible functions for calling the drift engine from
//! mobile and desktop hosts. All functions use C strings (null-terminated) and
//! return allocated memory that must be freed by the caller using
//! `drift_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::{DriftConfig, BASELINE_WINDOW_DAYS, DRIFT_THRESHOLD_MIN, MIN_NIGHTS_FOR_DECISION};
use crate::error::DriftError;
use crate::pipeline::{csv_to_nudge_report, DriftProcessor};
use crate::types::RawNight;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Read a C string argument, recording an error naming `what` on failure
unsafe fn arg_to_string(ptr: *const c_char, what: &str) -> Option<String> {
    if ptr.is_null() {
        set_last_error(&format!("Invalid {what} string pointer"));
        return None;
    }
    match CStr::from_ptr(ptr).to_str() {
        Ok(s) => Some(s.to_string()),
        Err(_) => {
            set_last_error(&format!("{what} is not valid UTF-8"));
            None
        }
    }
}

/// Convert a Rust string to a C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => {
            set_last_error("Result contains an interior NUL byte");
            ptr::null_mut()
        }
    }
}

fn string_result(result: Result<String, DriftError>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

fn status_result<T>(result: Result<T, DriftError>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Assess night CSV text and return a nudge report as JSON, using default settings.
///
/// # Safety
/// - `csv` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `drift_free_string`.
/// - Returns NULL on error; call `drift_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn drift_csv_to_report(csv: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(csv) = arg_to_string(csv, "CSV") else {
        return ptr::null_mut();
    };

    string_result(csv_to_nudge_report(&csv, &DriftConfig::default()))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a DriftProcessor
pub struct DriftProcessorHandle {
    processor: DriftProcessor,
}

/// Create a processor with an empty in-memory store.
///
/// Non-positive window or minimum values, and a negative threshold, fall back
/// to the defaults (7 nights, 90 minutes, 3 nights).
///
/// # Safety
/// - Returns a pointer to a newly allocated processor.
/// - Must be freed with `drift_processor_free`.
#[no_mangle]
pub unsafe extern "C" fn drift_processor_new(
    baseline_window_days: i32,
    drift_threshold_min: i32,
    min_nights_for_decision: i32,
) -> *mut DriftProcessorHandle {
    clear_last_error();

    let config = DriftConfig {
        baseline_window_days: positive_or(baseline_window_days, BASELINE_WINDOW_DAYS),
        drift_threshold_min: if drift_threshold_min < 0 {
            DRIFT_THRESHOLD_MIN
        } else {
            i64::from(drift_threshold_min)
        },
        min_nights_for_decision: positive_or(min_nights_for_decision, MIN_NIGHTS_FOR_DECISION),
        ..Default::default()
    };

    let handle = Box::new(DriftProcessorHandle {
        processor: DriftProcessor::with_config(config),
    });
    Box::into_raw(handle)
}

fn positive_or(value: i32, default: usize) -> usize {
    if value <= 0 {
        default
    } else {
        value as usize
    }
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `drift_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn drift_processor_free(processor: *mut DriftProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

unsafe fn handle_ref<'a>(processor: *const DriftProcessorHandle) -> Option<&'a DriftProcessorHandle> {
    if processor.is_null() {
        set_last_error("Null processor pointer");
        return None;
    }
    Some(&*processor)
}

/// Import night CSV text into the processor's store.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `drift_processor_new`.
/// - `csv` must be a valid null-terminated C string.
/// - Returns the import summary as JSON, to be freed with `drift_free_string`.
/// - Returns NULL on error; the store is left untouched.
#[no_mangle]
pub unsafe extern "C" fn drift_processor_import_csv(
    processor: *mut DriftProcessorHandle,
    csv: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle_ref(processor) else {
        return ptr::null_mut();
    };
    let Some(csv) = arg_to_string(csv, "CSV") else {
        return ptr::null_mut();
    };

    string_result(
        handle
            .processor
            .import_csv(&csv)
            .and_then(|summary| Ok(serde_json::to_string(&summary)?)),
    )
}

/// Log a single night, replacing any night stored under the same date.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `drift_processor_new`.
/// - `date`, `sleep_start` and `sleep_end` must be valid null-terminated C strings.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn drift_processor_log_night(
    processor: *mut DriftProcessorHandle,
    date: *const c_char,
    sleep_start: *const c_char,
    sleep_end: *const c_char,
) -> i32 {
    clear_last_error();

    let Some(handle) = handle_ref(processor) else {
        return -1;
    };
    let Some(date) = arg_to_string(date, "date") else {
        return -1;
    };
    let Some(sleep_start) = arg_to_string(sleep_start, "sleep_start") else {
        return -1;
    };
    let Some(sleep_end) = arg_to_string(sleep_end, "sleep_end") else {
        return -1;
    };

    status_result(
        handle
            .processor
            .log_night(RawNight::new(date, sleep_start, sleep_end)),
    )
}

/// Assess the stored nights and return a nudge report as JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `drift_processor_new`.
/// - Returns a newly allocated string that must be freed with `drift_free_string`.
/// - Returns NULL on error; call `drift_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn drift_processor_assess(processor: *mut DriftProcessorHandle) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle_ref(processor) else {
        return ptr::null_mut();
    };

    string_result(
        handle
            .processor
            .nudge_report()
            .and_then(|report| Ok(serde_json::to_string_pretty(&report)?)),
    )
}

/// Export the stored nights as CSV.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `drift_processor_new`.
/// - Returns a newly allocated string that must be freed with `drift_free_string`.
#[no_mangle]
pub unsafe extern "C" fn drift_processor_export_csv(processor: *mut DriftProcessorHandle) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle_ref(processor) else {
        return ptr::null_mut();
    };

    string_to_cstr(&handle.processor.export_csv())
}

/// Remove every stored night.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `drift_processor_new`.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn drift_processor_clear(processor: *mut DriftProcessorHandle) -> i32 {
    clear_last_error();

    let Some(handle) = handle_ref(processor) else {
        return -1;
    };

    handle.processor.clear();
    0
}

/// Save the stored nights to a JSON snapshot.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `drift_processor_new`.
/// - Returns a newly allocated string that must be freed with `drift_free_string`.
/// - Returns NULL on error; call `drift_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn drift_processor_save_nights(processor: *mut DriftProcessorHandle) -> *mut c_char {
    clear_last_error();

    let Some(handle) = handle_ref(processor) else {
        return ptr::null_mut();
    };

    string_result(handle.processor.save_nights())
}

/// Replace the stored nights from a JSON snapshot.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `drift_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn drift_processor_load_nights(
    processor: *mut DriftProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }
    let handle = &mut *processor;

    let Some(json) = arg_to_string(json, "JSON") else {
        return -1;
    };

    status_result(handle.processor.load_nights(&json))
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by a drift function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a drift function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn drift_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next drift function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn drift_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn drift_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
