//! FFI bindings for Kcal Flux
//!
//! This module provides C-compatible functions for calling Kcal Flux from the
//! host app. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `kcal_free_string`.
//! Dates are passed as `YYYY-MM-DD` local dates.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::NaiveDate;

use crate::config::EngineConfig;
use crate::pipeline::{samples_to_report, BudgetProcessor};

// Thread-local storage for the last error message
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

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

unsafe fn parse_date(ptr: *const c_char) -> Result<NaiveDate, String> {
    let text = cstr_to_string(ptr).ok_or("Invalid date string pointer")?;
    NaiveDate::parse_from_str(text.trim(), "%Y-%m-%d")
        .map_err(|e| format!("Invalid date '{text}': {e}"))
}

/// NULL selects the default configuration
unsafe fn parse_config(ptr: *const c_char) -> Result<EngineConfig, String> {
    if ptr.is_null() {
        return Ok(EngineConfig::default());
    }
    let json = cstr_to_string(ptr).ok_or("Invalid config string pointer")?;
    let config = EngineConfig::from_json(&json).map_err(|e| format!("Invalid config: {e}"))?;
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute a budget report from a batch of health.sample.v1 events.
///
/// # Safety
/// - `samples_json` and `today` must be valid null-terminated C strings.
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a newly allocated string that must be freed with `kcal_free_string`.
/// - Returns NULL on error; call `kcal_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kcal_analyze(
    samples_json: *const c_char,
    config_json: *const c_char,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let samples_str = match cstr_to_string(samples_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid samples string pointer");
            return ptr::null_mut();
        }
    };

    let config = match parse_config(config_json) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&e);
            return ptr::null_mut();
        }
    };

    let date = match parse_date(today) {
        Ok(d) => d,
        Err(e) => {
            set_last_error(&e);
            return ptr::null_mut();
        }
    };

    match samples_to_report(&samples_str, &config, date) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a BudgetProcessor
pub struct KcalProcessorHandle {
    processor: BudgetProcessor,
}

/// Create a new BudgetProcessor.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or NULL for defaults.
/// - Returns a pointer to a newly allocated processor; free it with `kcal_processor_free`.
/// - Returns NULL on error; call `kcal_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kcal_processor_new(
    config_json: *const c_char,
) -> *mut KcalProcessorHandle {
    clear_last_error();

    let config = match parse_config(config_json) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&e);
            return ptr::null_mut();
        }
    };

    match BudgetProcessor::with_config(config) {
        Ok(processor) => Box::into_raw(Box::new(KcalProcessorHandle { processor })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a BudgetProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `kcal_processor_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn kcal_processor_free(processor: *mut KcalProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Add health.sample.v1 events (NDJSON or JSON array) to the processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `kcal_processor_new`.
/// - `events_json` must be a valid null-terminated C string.
/// - Returns the number of samples added, or -1 on error.
#[no_mangle]
pub unsafe extern "C" fn kcal_processor_ingest(
    processor: *mut KcalProcessorHandle,
    events_json: *const c_char,
) -> i64 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(events_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid events string pointer");
            return -1;
        }
    };

    match handle.processor.ingest_events(&json_str) {
        Ok(added) => added as i64,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Compute today's budget report from everything ingested so far.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `kcal_processor_new`.
/// - `today` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `kcal_free_string`.
/// - Returns NULL on error; call `kcal_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kcal_processor_report(
    processor: *mut KcalProcessorHandle,
    today: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    let date = match parse_date(today) {
        Ok(d) => d,
        Err(e) => {
            set_last_error(&e);
            return ptr::null_mut();
        }
    };

    match handle.processor.report(date) {
        Ok(report) => string_to_cstr(&report),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Save the processor's accumulated samples to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `kcal_processor_new`.
/// - Returns a newly allocated string that must be freed with `kcal_free_string`.
/// - Returns NULL on error; call `kcal_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn kcal_processor_save_samples(
    processor: *mut KcalProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;

    match handle.processor.save_samples() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Restore accumulated samples from JSON produced by `kcal_processor_save_samples`.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `kcal_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
#[no_mangle]
pub unsafe extern "C" fn kcal_processor_load_samples(
    processor: *mut KcalProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return -1;
        }
    };

    match handle.processor.load_samples(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Replace the processor's configuration.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `kcal_processor_new`.
/// - `config_json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error; the old configuration is kept on error.
#[no_mangle]
pub unsafe extern "C" fn kcal_processor_set_config(
    processor: *mut KcalProcessorHandle,
    config_json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let json_str = match cstr_to_string(config_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid config string pointer");
            return -1;
        }
    };

    match handle.processor.load_config(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by Kcal Flux functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Kcal Flux function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn kcal_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next Kcal Flux call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn kcal_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the Kcal Flux library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn kcal_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_events() -> CString {
        let mut lines = Vec::new();
        for day in 4..=17 {
            lines.push(
                serde_json::json!({
                    "schema_version": "health.sample.v1",
                    "timestamp": format!("2024-03-{day:02}T12:00:00Z"),
                    "kind": "dietary_energy",
                    "value": 2000,
                    "unit": "kcal"
                })
                .to_string(),
            );
        }
        for day in 4..=18 {
            lines.push(
                serde_json::json!({
                    "schema_version": "health.sample.v1",
                    "timestamp": format!("2024-03-{day:02}T07:00:00Z"),
                    "kind": "body_mass",
                    "value": 85.0 - 0.05 * (day - 4) as f64,
                    "unit": "kg",
                    "source": "health_kit"
                })
                .to_string(),
            );
        }
        CString::new(lines.join("\n")).unwrap()
    }

    unsafe fn take_string(ptr: *mut c_char) -> String {
        assert!(!ptr.is_null());
        let s = CStr::from_ptr(ptr).to_str().unwrap().to_string();
        kcal_free_string(ptr);
        s
    }

    #[test]
    fn test_ffi_analyze() {
        let events = sample_events();
        let config = CString::new(r#"{"goal": {"adjustment_kcal": -250}}"#).unwrap();
        let today = CString::new("2024-03-18").unwrap();

        unsafe {
            let result =
                take_string(kcal_analyze(events.as_ptr(), config.as_ptr(), today.as_ptr()));
            let report: serde_json::Value = serde_json::from_str(&result).unwrap();

            assert_eq!(report["budget"]["available"], true);
            assert_eq!(report["budget"]["adjustment"], -250.0);
            assert_eq!(report["maintenance"]["valid"], true);
        }
    }

    #[test]
    fn test_ffi_analyze_default_config() {
        let events = sample_events();
        let today = CString::new("2024-03-18").unwrap();

        unsafe {
            let result = take_string(kcal_analyze(events.as_ptr(), ptr::null(), today.as_ptr()));
            assert!(result.contains("report_version"));
        }
    }

    #[test]
    fn test_ffi_processor_lifecycle() {
        unsafe {
            let processor = kcal_processor_new(ptr::null());
            assert!(!processor.is_null());

            let events = sample_events();
            assert_eq!(kcal_processor_ingest(processor, events.as_ptr()), 29);

            let today = CString::new("2024-03-18").unwrap();
            let report = take_string(kcal_processor_report(processor, today.as_ptr()));
            assert!(report.contains("\"available\": true"));

            // Save samples and restore into a second processor
            let saved = kcal_processor_save_samples(processor);
            assert!(!saved.is_null());

            let processor2 = kcal_processor_new(ptr::null());
            assert_eq!(kcal_processor_load_samples(processor2, saved), 0);
            kcal_free_string(saved);

            let config = CString::new(r#"{"display": {"energy": "kj"}}"#).unwrap();
            assert_eq!(kcal_processor_set_config(processor2, config.as_ptr()), 0);
            let report2 = take_string(kcal_processor_report(processor2, today.as_ptr()));
            assert!(report2.contains("\"energy\": \"kj\""));

            kcal_processor_free(processor);
            kcal_processor_free(processor2);
        }
    }

    #[test]
    fn test_ffi_error_handling() {
        unsafe {
            let invalid_json = CString::new("not json").unwrap();
            let today = CString::new("2024-03-18").unwrap();

            let result = kcal_analyze(invalid_json.as_ptr(), ptr::null(), today.as_ptr());
            assert!(result.is_null());

            let error = kcal_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(!error_str.is_empty());

            let bad_date = CString::new("18/03/2024").unwrap();
            let events = sample_events();
            assert!(kcal_analyze(events.as_ptr(), ptr::null(), bad_date.as_ptr()).is_null());
            let error_str = CStr::from_ptr(kcal_last_error()).to_str().unwrap();
            assert!(error_str.contains("Invalid date"));

            let bad_config = CString::new(r#"{"intake_alpha": 2.0}"#).unwrap();
            assert!(kcal_processor_new(bad_config.as_ptr()).is_null());

            assert_eq!(kcal_processor_ingest(ptr::null_mut(), events.as_ptr()), -1);
        }
    }

    #[test]
    fn test_ffi_rejects_oversized_config() {
        unsafe {
            let events = sample_events();
            let today = CString::new("2024-03-18").unwrap();
            let huge_cycle = CString::new(r#"{"goal": {"cycle_length_days": 200000000}}"#).unwrap();
            let huge_window = CString::new(r#"{"weight_window_days": 4000000000}"#).unwrap();

            for config in [&huge_cycle, &huge_window] {
                let result = kcal_analyze(events.as_ptr(), config.as_ptr(), today.as_ptr());
                assert!(result.is_null());
                assert!(!kcal_last_error().is_null());

                assert!(kcal_processor_new(config.as_ptr()).is_null());
            }

            let processor = kcal_processor_new(ptr::null());
            assert_eq!(kcal_processor_set_config(processor, huge_cycle.as_ptr()), -1);
            let error_str = CStr::from_ptr(kcal_last_error()).to_str().unwrap();
            assert!(error_str.contains("cycle"));

            // The rejected config leaves the processor usable
            assert_eq!(kcal_processor_ingest(processor, events.as_ptr()), 29);
            let report = take_string(kcal_processor_report(processor, today.as_ptr()));
            assert!(report.contains("\"available\": true"));

            kcal_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = kcal_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
