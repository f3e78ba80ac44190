//! Copying results into memory the host owns, and handing out memory the
//! library owns.

use std::os::raw::c_char;

/// Copy `src` into `dst` as a NUL-terminated string.
///
/// Writes `min(src.len(), dst.len() - 1)` bytes followed by a terminator and
/// returns the number of bytes copied, terminator excluded. An empty `dst`
/// is left untouched. Truncation is byte-level.
pub fn copy_str_to_buf(src: &str, dst: &mut [u8]) -> usize {
    let Some(room) = dst.len().checked_sub(1) else {
        return 0;
    };
    let n = src.len().min(room);
    dst[..n].copy_from_slice(&src.as_bytes()[..n]);
    dst[n] = 0;
    n
}

/// Copy raw bytes into `dst`, truncating to its length. No terminator.
pub fn copy_bytes_to_buf(src: &[u8], dst: &mut [u8]) -> usize {
    let n = src.len().min(dst.len());
    dst[..n].copy_from_slice(&src[..n]);
    n
}

/// View a host buffer as a mutable slice. `None` for a null pointer or zero
/// capacity.
///
/// # Safety
/// `ptr` must be valid for writes of `cap` bytes for `'a`, and not aliased.
pub unsafe fn host_buffer<'a>(ptr: *mut c_char, cap: usize) -> Option<&'a mut [u8]> {
    if ptr.is_null() || cap == 0 {
        return None;
    }
    // SAFETY: upheld by the caller.
    Some(unsafe { std::slice::from_raw_parts_mut(ptr.cast::<u8>(), cap) })
}

/// A library-allocated byte buffer handed to the host.
///
/// `data` holds `len` bytes followed by a NUL, so text results can be read
/// as C strings. `capacity` is the allocation size and must be passed back
/// untouched to `mb_buffer_free`.
#[repr(C)]
#[derive(Debug)]
pub struct MbBuffer {
    pub data: *mut u8,
    pub len: usize,
    pub capacity: usize,
}

impl MbBuffer {
    /// A buffer holding nothing; freeing it is a no-op.
    pub fn empty() -> Self {
        Self {
            data: std::ptr::null_mut(),
            len: 0,
            capacity: 0,
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut owned = Vec::with_capacity(bytes.len() + 1);
        owned.extend_from_slice(bytes);
        owned.push(0);
        let boxed = owned.into_boxed_slice();
        let capacity = boxed.len();
        Self {
            data: Box::into_raw(boxed).cast::<u8>(),
            len: bytes.len(),
            capacity,
        }
    }

    pub fn from_string(text: String) -> Self {
        Self::from_bytes(text.as_bytes())
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_null() || self.len == 0
    }

    /// The payload, terminator excluded.
    pub fn as_slice(&self) -> &[u8] {
        if self.data.is_null() {
            return &[];
        }
        // SAFETY: `data` came from `from_bytes` and holds `capacity > len` bytes.
        unsafe { std::slice::from_raw_parts(self.data, self.len) }
    }

    /// Release the allocation.
    ///
    /// # Safety
    /// The buffer must have been produced by this library and not freed yet.
    pub unsafe fn release(self) {
        if self.data.is_null() {
            return;
        }
        let slice = std::ptr::slice_from_raw_parts_mut(self.data, self.capacity);
        // SAFETY: reconstructs the boxed slice leaked in `from_bytes`.
        drop(unsafe { Box::from_raw(slice) });
    }
}
