/*!
A small C API for searching with serialized regexes.

The surface mirrors the crate's Rust API at its narrowest: a constructor
that pairs up two serialized DFAs, a search call and a destructor. Pattern
text never appears here, since compilation happens outside this crate; a C
caller obtains the forward and reverse blobs from whatever produced them
and hands them over for validation.

The corresponding declarations live in `include/clamor_regex.h`.
*/

use std::ffi::CStr;
use std::os::raw::c_char;
use std::ptr;
use std::slice;

use crate::dense::DenseDFA;
use crate::regex::Regex;

/// Deserialize two DFA blobs and pair them up as a regex.
///
/// The blobs must have been serialized in native endianness with the
/// native (`usize`) state identifier representation, and the buffers must
/// be readable for the given lengths and suitably aligned (a heap
/// allocation is). Both blobs are fully validated and copied into owned
/// storage, so the buffers only need to outlive this call.
///
/// Returns a null pointer if either blob is rejected.
#[no_mangle]
pub extern "C" fn regex_create(
    forward: *const u8,
    forward_len: usize,
    reverse: *const u8,
    reverse_len: usize,
) -> *mut Regex {
    if forward.is_null() || reverse.is_null() {
        return ptr::null_mut();
    }
    let fwd_buf = unsafe { slice::from_raw_parts(forward, forward_len) };
    let rev_buf = unsafe { slice::from_raw_parts(reverse, reverse_len) };
    let fwd = match DenseDFA::<&[usize], usize>::from_bytes(fwd_buf) {
        Ok(dfa) => dfa.to_owned(),
        Err(_) => return ptr::null_mut(),
    };
    let rev = match DenseDFA::<&[usize], usize>::from_bytes(rev_buf) {
        Ok(dfa) => dfa.to_owned(),
        Err(_) => return ptr::null_mut(),
    };
    Box::into_raw(Box::new(Regex::from_dfas(fwd, rev)))
}

/// Returns the end offset of the earliest match in the NUL terminated
/// `text`, or `usize::MAX` (`UINTPTR_MAX` on the C side) if there is no
/// match.
///
/// `re` must be a regex returned by `regex_create` that has not been
/// freed, and `text` must be a valid NUL terminated string.
#[no_mangle]
pub extern "C" fn regex_match(re: *mut Regex, text: *const c_char) -> usize {
    let re = unsafe { &*re };
    let text = unsafe { CStr::from_ptr(text) };
    match re.find_earliest(text.to_bytes()) {
        None => usize::MAX,
        Some(end) => end,
    }
}

/// Free a regex created by `regex_create`. A null pointer is a no-op.
#[no_mangle]
pub extern "C" fn regex_free(re: *mut Regex) {
    if !re.is_null() {
        unsafe {
            drop(Box::from_raw(re));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use super::*;
    use crate::builder::{DenseDFABuilder, RawAutomaton};

    /// Native endian blobs for the forward and reverse automata of `ab`.
    fn blobs_ab() -> (Vec<u8>, Vec<u8>) {
        fn table(
            state_count: usize,
            f: impl Fn(usize, u8) -> usize,
        ) -> Vec<usize> {
            let mut transitions = vec![0; state_count * 256];
            for state in 0..state_count {
                for byte in 0..256 {
                    transitions[state * 256 + byte] = f(state, byte as u8);
                }
            }
            transitions
        }
        let fwd = table(4, |state, byte| match (state, byte) {
            (1, b'a') => 2,
            (2, b'b') => 3,
            (2, b'a') => 2,
            (1, _) | (2, _) => 1,
            _ => 0,
        });
        let rev = table(4, |state, byte| match (state, byte) {
            (1, b'b') => 2,
            (2, b'a') => 3,
            _ => 0,
        });
        let is_match = vec![false, false, false, true];
        let builder = DenseDFABuilder::new();
        let fwd = builder
            .build(&RawAutomaton {
                transitions: fwd,
                start: 1,
                is_match: is_match.clone(),
                anchored: false,
            })
            .unwrap();
        let rev = builder
            .build(&RawAutomaton {
                transitions: rev,
                start: 1,
                is_match,
                anchored: true,
            })
            .unwrap();
        (
            fwd.to_bytes_native_endian().unwrap(),
            rev.to_bytes_native_endian().unwrap(),
        )
    }

    #[test]
    fn create_search_free() {
        let (fwd, rev) = blobs_ab();
        let re = regex_create(fwd.as_ptr(), fwd.len(), rev.as_ptr(), rev.len());
        assert!(!re.is_null());

        let text = CString::new("xxabyy").unwrap();
        assert_eq!(4, regex_match(re, text.as_ptr()));
        let text = CString::new("quux").unwrap();
        assert_eq!(usize::MAX, regex_match(re, text.as_ptr()));

        regex_free(re);
    }

    #[test]
    fn create_rejects_garbage() {
        let garbage = vec![0xFF; 64];
        let re = regex_create(
            garbage.as_ptr(),
            garbage.len(),
            garbage.as_ptr(),
            garbage.len(),
        );
        assert!(re.is_null());

        let re = regex_create(ptr::null(), 0, ptr::null(), 0);
        assert!(re.is_null());

        regex_free(ptr::null_mut());
    }
}
