//! # meshbridge-ffi
//!
//! The C ABI. A host creates an `MbContext` with [`mb_context_new`], drives
//! it through the `mb_*` calls, and releases it with [`mb_context_free`].
//!
//! Integer results follow one convention: `>= 0` is a value (a port, a byte
//! count, or 0 for success) and `< 0` is a negated
//! [`meshbridge_core::ErrorCode`]. Text results are written into
//! caller-provided buffers, truncated and NUL-terminated, or returned as
//! library-owned memory the host must hand back to [`mb_free_string`] or
//! [`mb_buffer_free`].

pub mod buffer;

use parking_lot::Mutex;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{debug, warn};

use meshbridge_config::{NodeConfig, PrivateKey};
use meshbridge_core::{ErrorCode, MeshError, Result, ServiceEvent};
use meshbridge_runtime::Context;
use meshbridge_stack::{HostStack, StackProvider};

pub use buffer::{MbBuffer, copy_bytes_to_buf, copy_str_to_buf, host_buffer};

/// Opaque handle owned by the host.
pub struct MbContext {
    runtime: tokio::runtime::Runtime,
    context: Context,
    events: Mutex<broadcast::Receiver<ServiceEvent>>,
}

impl MbContext {
    /// Build a context around any stack provider. Rust callers and tests use
    /// this to swap in a non-host stack; the C ABI always uses [`HostStack`].
    pub fn with_provider(provider: Arc<dyn StackProvider>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("meshbridge")
            .build()?;
        let context = Context::new(provider);
        let events = Mutex::new(context.subscribe());
        Ok(Self {
            runtime,
            context,
            events,
        })
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Move a context onto the heap and hand ownership to the host.
    pub fn into_raw(self) -> *mut MbContext {
        Box::into_raw(Box::new(self))
    }
}

fn abi(err: MeshError) -> c_int {
    debug!(error = %err, code = %err.code(), "call failed");
    err.code().to_abi()
}

fn abi_value(value: u64) -> c_int {
    c_int::try_from(value).unwrap_or(c_int::MAX)
}

/// Borrow the context behind a host handle.
///
/// # Safety
/// `ctx` must be null or a pointer from `mb_context_new` not yet freed.
unsafe fn context<'a>(ctx: *mut MbContext) -> Result<&'a MbContext> {
    // SAFETY: upheld by the caller.
    unsafe { ctx.as_ref() }.ok_or_else(|| MeshError::InvalidArgument("null context handle".into()))
}

/// Read optional host text. Null is `None`; invalid UTF-8 is an error.
///
/// # Safety
/// `ptr` must be null or point at a NUL-terminated string.
unsafe fn host_str<'a>(ptr: *const c_char) -> Result<Option<&'a str>> {
    if ptr.is_null() {
        return Ok(None);
    }
    // SAFETY: upheld by the caller.
    let raw = unsafe { CStr::from_ptr(ptr) };
    raw.to_str()
        .map(Some)
        .map_err(|_| MeshError::InvalidArgument("text is not valid UTF-8".into()))
}

/// Write `text` into a host buffer and return the bytes written.
///
/// # Safety
/// `buf` must be null or valid for writes of `cap` bytes.
unsafe fn write_text(text: &str, buf: *mut c_char, cap: usize) -> c_int {
    // SAFETY: upheld by the caller.
    match unsafe { host_buffer(buf, cap) } {
        Some(dst) => abi_value(copy_str_to_buf(text, dst) as u64),
        None => 0,
    }
}

// ── Context ────────────────────────────────────────────────────

/// Create a context backed by the host network stack. Null on failure.
#[unsafe(no_mangle)]
pub extern "C" fn mb_context_new() -> *mut MbContext {
    match MbContext::with_provider(Arc::new(HostStack::new())) {
        Ok(ctx) => ctx.into_raw(),
        Err(e) => {
            warn!(error = %e, "failed to create context runtime");
            std::ptr::null_mut()
        }
    }
}

/// Shut the context down and release it. Null is ignored.
///
/// # Safety
/// `ctx` must be null or a live handle, and must not be used afterwards.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_context_free(ctx: *mut MbContext) {
    if ctx.is_null() {
        return;
    }
    // SAFETY: the handle came from `into_raw` and ownership returns here.
    let ctx = unsafe { Box::from_raw(ctx) };
    ctx.runtime.block_on(ctx.context.shutdown());
}

// ── Lifecycle ──────────────────────────────────────────────────

/// Start the node from JSON or TOML config text.
///
/// # Safety
/// `ctx` must be a live handle; `config` null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_init(ctx: *mut MbContext, config: *const c_char) -> c_int {
    let run = || -> Result<()> {
        // SAFETY: forwarded from the caller.
        let ctx = unsafe { context(ctx) }?;
        let text = unsafe { host_str(config) }?;
        ctx.runtime.block_on(ctx.context.init(text))
    };
    run().map_or_else(abi, |()| ErrorCode::Ok.as_i32())
}

/// Tear the node down. Safe to call repeatedly.
///
/// # Safety
/// `ctx` must be null or a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_shutdown(ctx: *mut MbContext) {
    // SAFETY: forwarded from the caller.
    if let Ok(ctx) = unsafe { context(ctx) } {
        ctx.runtime.block_on(ctx.context.shutdown());
    }
}

// ── Keys and config ────────────────────────────────────────────

/// Write a new private key (128 hex characters) into `buf`.
///
/// # Safety
/// `buf` must be null or valid for writes of `cap` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_new_private_key(buf: *mut c_char, cap: usize) -> c_int {
    match PrivateKey::generate() {
        // SAFETY: forwarded from the caller.
        Ok(key) => unsafe { write_text(&key.to_hex(), buf, cap) },
        Err(e) => abi(e),
    }
}

/// A new private key as an owned buffer. Empty on failure.
#[unsafe(no_mangle)]
pub extern "C" fn mb_new_private_key_buffer() -> MbBuffer {
    match PrivateKey::generate() {
        Ok(key) => MbBuffer::from_string(key.to_hex()),
        Err(e) => {
            warn!(error = %e, "key generation failed");
            MbBuffer::empty()
        }
    }
}

/// Write a complete default config with a fresh key, as pretty JSON.
///
/// # Safety
/// `buf` must be null or valid for writes of `cap` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_generate_config(buf: *mut c_char, cap: usize) -> c_int {
    let text = NodeConfig::generate().and_then(|c| Ok(serde_json::to_string_pretty(&c)?));
    match text {
        // SAFETY: forwarded from the caller.
        Ok(text) => unsafe { write_text(&text, buf, cap) },
        Err(e) => abi(e),
    }
}

// ── Services ───────────────────────────────────────────────────

/// Start the SOCKS5 proxy. Returns its port. A proxy whose accept loop
/// failed (reported through [`mb_poll_event`]) no longer counts as started.
///
/// # Safety
/// `ctx` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_start_socks5_proxy(ctx: *mut MbContext) -> c_int {
    let run = || -> Result<u16> {
        // SAFETY: forwarded from the caller.
        let ctx = unsafe { context(ctx) }?;
        let _guard = ctx.runtime.enter();
        ctx.context.start_socks5()
    };
    run().map_or_else(abi, c_int::from)
}

/// Stop the SOCKS5 proxy.
///
/// # Safety
/// `ctx` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_stop_socks5_proxy(ctx: *mut MbContext) -> c_int {
    let run = || -> Result<()> {
        // SAFETY: forwarded from the caller.
        let ctx = unsafe { context(ctx) }?;
        ctx.runtime.block_on(ctx.context.stop_socks5())
    };
    run().map_or_else(abi, |()| ErrorCode::Ok.as_i32())
}

/// Open a single-use relay to `remote` (`host:port`). Returns the local port.
///
/// # Safety
/// `ctx` must be a live handle; `remote` null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_create_relay(ctx: *mut MbContext, remote: *const c_char) -> c_int {
    let run = || -> Result<u16> {
        // SAFETY: forwarded from the caller.
        let ctx = unsafe { context(ctx) }?;
        let remote = unsafe { host_str(remote) }?
            .ok_or_else(|| MeshError::InvalidArgument("remote address is null".into()))?;
        let _guard = ctx.runtime.enter();
        ctx.context.create_relay(remote)
    };
    run().map_or_else(abi, c_int::from)
}

// ── Identity ───────────────────────────────────────────────────

unsafe fn write_query(
    ctx: *mut MbContext,
    buf: *mut c_char,
    cap: usize,
    query: impl FnOnce(&Context) -> Result<String>,
) -> c_int {
    // SAFETY: forwarded from the caller.
    match unsafe { context(ctx) }.and_then(|c| query(&c.context)) {
        Ok(text) => unsafe { write_text(&text, buf, cap) },
        Err(e) => abi(e),
    }
}

/// Write the node's mesh IPv6 address into `buf`.
///
/// # Safety
/// `ctx` must be a live handle; `buf` null or valid for `cap` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_address(ctx: *mut MbContext, buf: *mut c_char, cap: usize) -> c_int {
    // SAFETY: forwarded from the caller.
    unsafe { write_query(ctx, buf, cap, Context::address) }
}

/// Buffer size needed for [`mb_address`], terminator included.
///
/// # Safety
/// `ctx` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_address_len(ctx: *mut MbContext) -> c_int {
    // SAFETY: forwarded from the caller.
    match unsafe { context(ctx) }.and_then(|c| c.context.address()) {
        Ok(address) => abi_value(address.len() as u64 + 1),
        Err(e) => abi(e),
    }
}

/// The node's address as a library-owned C string, or null if the context
/// is not initialized. Release with [`mb_free_string`].
///
/// # Safety
/// `ctx` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_get_address(ctx: *mut MbContext) -> *mut c_char {
    // SAFETY: forwarded from the caller.
    let address = unsafe { context(ctx) }.and_then(|c| c.context.address());
    match address.map(CString::new) {
        Ok(Ok(text)) => text.into_raw(),
        _ => std::ptr::null_mut(),
    }
}

/// Write the node's routed subnet (CIDR) into `buf`.
///
/// # Safety
/// `ctx` must be a live handle; `buf` null or valid for `cap` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_subnet(ctx: *mut MbContext, buf: *mut c_char, cap: usize) -> c_int {
    // SAFETY: forwarded from the caller.
    unsafe { write_query(ctx, buf, cap, Context::subnet) }
}

/// Write the node's hex public key into `buf`.
///
/// # Safety
/// `ctx` must be a live handle; `buf` null or valid for `cap` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_public_key(ctx: *mut MbContext, buf: *mut c_char, cap: usize) -> c_int {
    // SAFETY: forwarded from the caller.
    unsafe { write_query(ctx, buf, cap, Context::public_key) }
}

/// The core MTU.
///
/// # Safety
/// `ctx` must be a live handle.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_mtu(ctx: *mut MbContext) -> c_int {
    // SAFETY: forwarded from the caller.
    match unsafe { context(ctx) }.and_then(|c| c.context.mtu()) {
        Ok(mtu) => abi_value(mtu),
        Err(e) => abi(e),
    }
}

// ── Status channel ─────────────────────────────────────────────

/// Write the next pending status event as JSON into `buf`. Returns the
/// bytes written, or 0 if no event is pending. An event longer than the
/// buffer is truncated and consumed.
///
/// # Safety
/// `ctx` must be a live handle; `buf` null or valid for `cap` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_poll_event(ctx: *mut MbContext, buf: *mut c_char, cap: usize) -> c_int {
    // SAFETY: forwarded from the caller.
    let ctx = match unsafe { context(ctx) } {
        Ok(ctx) => ctx,
        Err(e) => return abi(e),
    };
    let mut events = ctx.events.lock();
    loop {
        match events.try_recv() {
            Ok(event) => {
                return match serde_json::to_string(&event) {
                    // SAFETY: forwarded from the caller.
                    Ok(json) => unsafe { write_text(&json, buf, cap) },
                    Err(e) => abi(e.into()),
                };
            }
            Err(TryRecvError::Lagged(skipped)) => {
                warn!(skipped, "status events dropped before they were polled");
            }
            Err(TryRecvError::Empty | TryRecvError::Closed) => return 0,
        }
    }
}

// ── Memory ─────────────────────────────────────────────────────

/// Release a string returned by [`mb_get_address`]. Null is ignored.
///
/// # Safety
/// `ptr` must be null or a string from this library, not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        // SAFETY: the pointer came from `CString::into_raw`.
        drop(unsafe { CString::from_raw(ptr) });
    }
}

/// Release a buffer returned by this library.
///
/// # Safety
/// `buf` must come from this library, unmodified, and not yet freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_buffer_free(buf: MbBuffer) {
    // SAFETY: upheld by the caller.
    unsafe { buf.release() }
}

// ── Logging ────────────────────────────────────────────────────

/// Install the global log subscriber. `filter` uses `RUST_LOG` syntax; null
/// falls back to `RUST_LOG`, then `info`. `json` selects JSON lines.
///
/// # Safety
/// `filter` must be null or a NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mb_init_logging(filter: *const c_char, json: bool) -> c_int {
    // SAFETY: forwarded from the caller.
    let run = || -> Result<()> { meshbridge_runtime::init_logging(unsafe { host_str(filter) }?, json) };
    run().map_or_else(abi, |()| ErrorCode::Ok.as_i32())
}
