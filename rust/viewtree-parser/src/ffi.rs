//! C ABI
//!
//! C-compatible functions for embedding the parser. Documents are handed out
//! as opaque pointers; strings and buffers returned here must be released
//! with the matching `*_free` function. Null arguments give neutral results.

use std::ffi::{c_char, c_int, c_uchar, CStr, CString};
use std::ptr;

use url::Url;
use viewtree_dom::{Document, NodeId};

use crate::context::PageContext;
use crate::css_parser::parse_color;
use crate::processor::HtmlProcessor;

/// Returned by `vt_document_node_kind` for unknown nodes
pub const VT_INVALID_KIND: u8 = u8::MAX;

/// Borrow a C string as UTF-8
unsafe fn c_str<'a>(s: *const c_char) -> Option<&'a str> {
    if s.is_null() {
        return None;
    }
    CStr::from_ptr(s).to_str().ok()
}

// ============================================================================
// Initialization
// ============================================================================

/// Initialize the parser library
#[no_mangle]
pub extern "C" fn vt_parser_init() {
    let _ = env_logger::try_init();
}

/// Get library version
#[no_mangle]
pub extern "C" fn vt_parser_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

// ============================================================================
// Document FFI
// ============================================================================

/// Parse HTML into a document. `base_uri` may be null.
/// Returns null if the input is not UTF-8 or the parse fails.
#[no_mangle]
pub extern "C" fn vt_document_parse(html: *const c_char, base_uri: *const c_char) -> *mut Document {
    let Some(html) = (unsafe { c_str(html) }) else {
        return ptr::null_mut();
    };

    let mut page = PageContext::new();
    if let Some(base) = unsafe { c_str(base_uri) } {
        match Url::parse(base) {
            Ok(url) => page = page.with_base_url(url),
            Err(err) => log::error!("Ignoring invalid base URI {base}: {err}"),
        }
    }

    match HtmlProcessor::new().parse_str(html, &mut page) {
        Ok(document) => Box::into_raw(Box::new(document)),
        Err(err) => {
            log::error!("{err}");
            ptr::null_mut()
        }
    }
}

/// Free a document
#[no_mangle]
pub extern "C" fn vt_document_free(document: *mut Document) {
    if !document.is_null() {
        unsafe {
            drop(Box::from_raw(document));
        }
    }
}

/// Number of physical nodes, the root included
#[no_mangle]
pub extern "C" fn vt_document_node_count(document: *const Document) -> u32 {
    if document.is_null() {
        return 0;
    }
    unsafe { (*document).physical.len() as u32 }
}

/// Number of logical elements
#[no_mangle]
pub extern "C" fn vt_document_element_count(document: *const Document) -> u32 {
    if document.is_null() {
        return 0;
    }
    unsafe { (*document).logical.len() as u32 }
}

/// Kind of a physical node (1-indexed ID), or `VT_INVALID_KIND`
#[no_mangle]
pub extern "C" fn vt_document_node_kind(document: *const Document, node: u32) -> u8 {
    if document.is_null() {
        return VT_INVALID_KIND;
    }
    unsafe {
        (*document)
            .physical
            .kind(NodeId(node))
            .map_or(VT_INVALID_KIND, |kind| kind as u8)
    }
}

/// Text of a physical node; free with `vt_string_free`
#[no_mangle]
pub extern "C" fn vt_document_node_text(document: *const Document, node: u32) -> *mut c_char {
    if document.is_null() {
        return ptr::null_mut();
    }
    unsafe {
        let physical = &(*document).physical;
        if physical.kind(NodeId(node)).is_none() {
            return ptr::null_mut();
        }
        CString::new(physical.text(NodeId(node)))
            .map_or(ptr::null_mut(), CString::into_raw)
    }
}

/// Free a string returned by this library
#[no_mangle]
pub extern "C" fn vt_string_free(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}

/// Write the physical tree snapshot to a malloc'd buffer
#[no_mangle]
pub extern "C" fn vt_document_write_binary(
    document: *const Document,
    buffer: *mut *mut c_uchar,
    length: *mut u32,
) -> c_int {
    if document.is_null() || buffer.is_null() || length.is_null() {
        return 0;
    }

    unsafe {
        let bytes = (*document).physical.write_binary();
        *length = bytes.len() as u32;

        let ptr = libc::malloc(bytes.len()) as *mut c_uchar;
        if ptr.is_null() {
            return 0;
        }

        ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, bytes.len());
        *buffer = ptr;
        1
    }
}

/// Free binary buffer allocated by vt_document_write_binary
#[no_mangle]
pub extern "C" fn vt_binary_buffer_free(buffer: *mut c_uchar) {
    if !buffer.is_null() {
        unsafe {
            libc::free(buffer as *mut libc::c_void);
        }
    }
}

// ============================================================================
// CSS FFI
// ============================================================================

/// Parse a CSS color into 0xRRGGBBAA; null or unknown input is transparent
#[no_mangle]
pub extern "C" fn vt_css_parse_color(value: *const c_char) -> u32 {
    let Some(value) = (unsafe { c_str(value) }) else {
        return 0;
    };
    let color = parse_color(value);
    u32::from_be_bytes([color.r, color.g, color.b, color.a])
}
