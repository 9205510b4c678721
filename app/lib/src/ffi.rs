//! C FFI bindings for the ALS codec.
//!
//! This module provides a C-compatible API for using the codec from C and
//! other languages with C FFI support.
//!
//! # Memory Management
//!
//! All strings returned by this API are allocated on the heap and must be
//! freed by calling `als_string_free()`. Handles must be freed with their
//! matching `*_free` function.
//!
//! # Error Handling
//!
//! Functions return null pointers on error. Use `als_get_last_error()` to
//! retrieve the error message. The error slot is thread-local: a message set
//! by a call on one thread is only visible to later calls on that thread.
//! Panics never cross the boundary; they are reported as errors.
//!
//! # Source Kinds
//!
//! Functions that take a `kind` use `0` for CSV and `1` for JSON
//! (`ALS_KIND_CSV` and `ALS_KIND_JSON` in the header).
//!
//! # Header
//!
//! C declarations for every function here live in `include/als.h`.
//!
//! # Example (C)
//!
//! ```c
//! const char* json = "[{\"id\":1},{\"id\":2}]";
//! AlsCompressor* c = als_compressor_new();
//! AlsParser* p = als_parser_new();
//!
//! char* encoded = als_compress(c, 1, json, strlen(json));
//! char* decoded = encoded ? als_decode_to(p, 1, encoded, strlen(encoded)) : NULL;
//! if (!decoded) {
//!     char msg[256];
//!     als_get_last_error(msg, sizeof msg);
//!     fputs(msg, stderr);
//! }
//!
//! als_string_free(decoded);
//! als_string_free(encoded);
//! als_parser_free(p);
//! als_compressor_free(c);
//! ```

use std::cell::RefCell;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::ptr;

use crate::als::AlsParser;
use crate::compress::AlsCompressor;
use crate::config::CompressorConfig;
use crate::convert::SourceKind;
use crate::error::Result;

thread_local! {
    /// Last error message raised on this thread.
    static LAST_ERROR: RefCell<Option<String>> = const { RefCell::new(None) };
}

fn set_last_error(error: String) {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = Some(error));
}

fn clear_last_error() {
    LAST_ERROR.with(|slot| *slot.borrow_mut() = None);
}

/// C-side name for a boxed [`AlsCompressor`].
#[repr(C)]
pub struct AlsCompressorHandle {
    _private: [u8; 0],
}

/// C-side name for a boxed [`AlsParser`].
#[repr(C)]
pub struct AlsParserHandle {
    _private: [u8; 0],
}

/// Kind code for CSV, `ALS_KIND_CSV` in C.
pub const KIND_CSV: c_int = 0;
/// Kind code for JSON, `ALS_KIND_JSON` in C.
pub const KIND_JSON: c_int = 1;

fn kind_from_code(kind: c_int) -> Option<SourceKind> {
    match kind {
        KIND_CSV => Some(SourceKind::Csv),
        KIND_JSON => Some(SourceKind::Json),
        _ => None,
    }
}

/// Box a value into a handle, or null with the error recorded.
fn into_handle<T, H>(what: &str, make: impl FnOnce() -> Result<T>) -> *mut H {
    clear_last_error();
    match catch_unwind(AssertUnwindSafe(make)) {
        Ok(Ok(value)) => Box::into_raw(Box::new(value)) as *mut H,
        Ok(Err(e)) => {
            set_last_error(format!("Failed to create {}: {}", what, e));
            ptr::null_mut()
        }
        Err(_) => {
            set_last_error(format!("Panic creating {}", what));
            ptr::null_mut()
        }
    }
}

/// Run `op` on a handle and an input buffer, returning a C string.
///
/// # Safety
///
/// `handle` must be null or a live pointer of type `T`; `input` must be null
/// or valid for `len` bytes.
unsafe fn with_input<T>(
    handle: *const T,
    input: *const c_char,
    len: usize,
    what: &str,
    op: impl FnOnce(&T, &[u8]) -> Result<String>,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error(format!("{} pointer is null", what));
        return ptr::null_mut();
    }

    if input.is_null() {
        set_last_error("Input pointer is null".to_string());
        return ptr::null_mut();
    }

    let result = catch_unwind(AssertUnwindSafe(|| {
        let target = &*handle;
        let bytes = std::slice::from_raw_parts(input as *const u8, len);
        op(target, bytes)
    }));

    match result {
        Ok(Ok(text)) => match CString::new(text) {
            Ok(c_str) => c_str.into_raw(),
            Err(e) => {
                set_last_error(format!("Failed to create C string: {}", e));
                ptr::null_mut()
            }
        },
        Ok(Err(e)) => {
            set_last_error(e.to_string());
            ptr::null_mut()
        }
        Err(_) => {
            set_last_error(format!("Panic in {}", what));
            ptr::null_mut()
        }
    }
}

/// Create a new ALS compressor with default configuration.
///
/// Returns a pointer to the compressor, or null on failure.
/// The compressor must be freed with `als_compressor_free()`.
#[no_mangle]
pub extern "C" fn als_compressor_new() -> *mut AlsCompressorHandle {
    into_handle("compressor", || Ok(AlsCompressor::new()))
}

/// Create a new ALS compressor with custom configuration.
///
/// # Arguments
///
/// * `ctx_fallback_threshold` - Minimum structural ratio before falling back (e.g., 1.2)
/// * `min_pattern_length` - Minimum pattern length to consider (e.g., 3)
/// * `parallelism` - Number of discovery workers (0 = auto)
///
/// Returns null if the configuration is invalid.
#[no_mangle]
pub extern "C" fn als_compressor_new_with_config(
    ctx_fallback_threshold: f64,
    min_pattern_length: usize,
    parallelism: usize,
) -> *mut AlsCompressorHandle {
    into_handle("compressor", || {
        let config = CompressorConfig::default()
            .with_ctx_fallback_threshold(ctx_fallback_threshold)
            .with_min_pattern_length(min_pattern_length)
            .with_parallelism(parallelism);
        AlsCompressor::with_config(config)
    })
}

/// Free a compressor created by `als_compressor_new*`.
///
/// # Safety
///
/// `compressor` must be null or a pointer returned by `als_compressor_new*`
/// that has not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn als_compressor_free(compressor: *mut AlsCompressorHandle) {
    if !compressor.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(Box::from_raw(compressor as *mut AlsCompressor));
        }));
    }
}

/// Compress `len` bytes of the given kind (0 = CSV, 1 = JSON).
///
/// # Safety
///
/// `compressor` must be a live compressor handle and `input` must be valid
/// for `len` bytes.
#[no_mangle]
pub unsafe extern "C" fn als_compress(
    compressor: *const AlsCompressorHandle,
    kind: c_int,
    input: *const c_char,
    len: usize,
) -> *mut c_char {
    let Some(kind) = kind_from_code(kind) else {
        clear_last_error();
        set_last_error(format!("Unknown source kind {}", kind));
        return ptr::null_mut();
    };
    with_input(
        compressor as *const AlsCompressor,
        input,
        len,
        "Compressor",
        |compressor, bytes| compressor.compress(kind, bytes),
    )
}

/// Compress CSV text.
///
/// # Safety
///
/// See [`als_compress`].
#[no_mangle]
pub unsafe extern "C" fn als_compress_csv(
    compressor: *const AlsCompressorHandle,
    input: *const c_char,
    len: usize,
) -> *mut c_char {
    als_compress(compressor, KIND_CSV, input, len)
}

/// Compress JSON text.
///
/// # Safety
///
/// See [`als_compress`].
#[no_mangle]
pub unsafe extern "C" fn als_compress_json(
    compressor: *const AlsCompressorHandle,
    input: *const c_char,
    len: usize,
) -> *mut c_char {
    als_compress(compressor, KIND_JSON, input, len)
}

/// Create a new ALS parser.
///
/// The parser must be freed with `als_parser_free()`.
#[no_mangle]
pub extern "C" fn als_parser_new() -> *mut AlsParserHandle {
    into_handle("parser", || Ok(AlsParser::new()))
}

/// Free a parser created by `als_parser_new`.
///
/// # Safety
///
/// `parser` must be null or a pointer returned by `als_parser_new` that has
/// not been freed yet.
#[no_mangle]
pub unsafe extern "C" fn als_parser_free(parser: *mut AlsParserHandle) {
    if !parser.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(Box::from_raw(parser as *mut AlsParser));
        }));
    }
}

/// Decode ALS text into the given kind (0 = CSV, 1 = JSON).
///
/// Fails if the document's header names the other kind.
///
/// # Safety
///
/// `parser` must be a live parser handle and `input` must be valid for `len`
/// bytes.
#[no_mangle]
pub unsafe extern "C" fn als_decode_to(
    parser: *const AlsParserHandle,
    kind: c_int,
    input: *const c_char,
    len: usize,
) -> *mut c_char {
    let Some(kind) = kind_from_code(kind) else {
        clear_last_error();
        set_last_error(format!("Unknown source kind {}", kind));
        return ptr::null_mut();
    };
    with_input(
        parser as *const AlsParser,
        input,
        len,
        "Parser",
        |parser, bytes| parser.decode_bytes_to(kind, bytes),
    )
}

/// Decode ALS text into CSV.
///
/// # Safety
///
/// See [`als_decode_to`].
#[no_mangle]
pub unsafe extern "C" fn als_to_csv(
    parser: *const AlsParserHandle,
    input: *const c_char,
    len: usize,
) -> *mut c_char {
    als_decode_to(parser, KIND_CSV, input, len)
}

/// Decode ALS text into JSON.
///
/// # Safety
///
/// See [`als_decode_to`].
#[no_mangle]
pub unsafe extern "C" fn als_to_json(
    parser: *const AlsParserHandle,
    input: *const c_char,
    len: usize,
) -> *mut c_char {
    als_decode_to(parser, KIND_JSON, input, len)
}

/// Free a string returned by this API.
///
/// # Safety
///
/// `s` must be null or a string returned by this API that has not been
/// freed yet.
#[no_mangle]
pub unsafe extern "C" fn als_string_free(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(CString::from_raw(s));
        }));
    }
}

/// Copy the last error message of this thread into `buffer`.
///
/// The message is truncated to `buffer_len - 1` bytes and null-terminated.
/// Returns the full message length plus one, or 0 if there is no error.
///
/// # Safety
///
/// `buffer` must be null or valid for `buffer_len` bytes.
#[no_mangle]
pub unsafe extern "C" fn als_get_last_error(buffer: *mut c_char, buffer_len: usize) -> c_int {
    if buffer.is_null() || buffer_len == 0 {
        return 0;
    }

    let result = catch_unwind(AssertUnwindSafe(|| {
        LAST_ERROR.with(|slot| {
            let slot = slot.borrow();
            let error_bytes = slot.as_ref()?.as_bytes();
            let copy_len = std::cmp::min(error_bytes.len(), buffer_len - 1);

            ptr::copy_nonoverlapping(error_bytes.as_ptr(), buffer as *mut u8, copy_len);

            // Null terminate
            *buffer.add(copy_len) = 0;

            Some((error_bytes.len() + 1) as c_int)
        })
    }));

    match result {
        Ok(Some(len)) => len,
        _ => 0,
    }
}

/// Clear the last error message of this thread.
#[no_mangle]
pub extern "C" fn als_clear_error() {
    clear_last_error();
}
