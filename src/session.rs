//! Session
//!
//! Process-scoped binding environment (§3). Grounded on the teacher's
//! `InterpreterState`/`Bash` split: a long-lived mutable state object plus a
//! thin facade, except every field here is guarded for concurrent access
//! because pipeline stages (§4.4, §5) run on their own OS threads and share
//! one `Session` via `Arc`.

use std::cell::RefCell;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use indexmap::IndexMap;

use crate::dispatch::{CommandRegistry, HostInvoker};
use crate::errors::{Location, ShellError, ShellResult};
use crate::value::Value;

thread_local! {
    /// The triad a pipeline stage installs for the duration of its thread
    /// (§4.4 invariant 5: "each stage owns its triad until it joins"). `None`
    /// outside of a stage, in which case reads/writes fall back to the
    /// session-level triad.
    static STAGE_TRIAD: RefCell<Option<Triad>> = const { RefCell::new(None) };
}

/// An in-memory byte buffer standing in for a stream. Cloning shares the
/// underlying buffer (cheap `Arc` clone), matching the teacher's pattern of
/// passing `String` stdin/stdout around pipeline stages.
#[derive(Debug, Clone, Default)]
pub struct MemStream {
    buf: Arc<Mutex<Vec<u8>>>,
    pos: Arc<Mutex<usize>>,
}

impl MemStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { buf: Arc::new(Mutex::new(bytes)), pos: Arc::new(Mutex::new(0)) }
    }

    pub fn contents(&self) -> Vec<u8> {
        self.buf.lock().unwrap().clone()
    }

    pub fn contents_string(&self) -> String {
        String::from_utf8_lossy(&self.contents()).into_owned()
    }
}

impl Read for MemStream {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        let data = self.buf.lock().unwrap();
        let mut pos = self.pos.lock().unwrap();
        let remaining = &data[(*pos).min(data.len())..];
        let n = remaining.len().min(out.len());
        out[..n].copy_from_slice(&remaining[..n]);
        *pos += n;
        Ok(n)
    }
}

impl Write for MemStream {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().unwrap().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// The current triad of byte streams (§3, §4.4).
#[derive(Debug, Clone)]
pub struct Triad {
    pub stdin: MemStream,
    pub stdout: MemStream,
    pub stderr: MemStream,
}

impl Default for Triad {
    fn default() -> Self {
        Self { stdin: MemStream::new(), stdout: MemStream::new(), stderr: MemStream::new() }
    }
}

/// RAII guard clearing the default-lock reentry flag on drop (§4.3, §5,
/// §9 "Default-lock as scoped guard"), even if the default handler panics
/// or returns early via `?`.
pub struct DefaultLockGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> DefaultLockGuard<'a> {
    /// Returns `None` if the lock is already held (caller must not recurse).
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
        {
            Some(Self { flag })
        } else {
            None
        }
    }
}

impl Drop for DefaultLockGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

type BeforeHook = dyn Fn(&Session, &str) + Send + Sync;
type AfterHook = dyn Fn(&Session, &str, &ShellResult<Value>) + Send + Sync;

/// Process-scoped binding environment (§3).
pub struct Session {
    variables: Mutex<IndexMap<String, Value>>,
    streams: Mutex<Triad>,
    closed: AtomicBool,
    interrupted: AtomicBool,
    default_lock: AtomicBool,
    commands: Mutex<CommandRegistry>,
    location: Mutex<Option<Location>>,
    before_execute: Option<Arc<BeforeHook>>,
    after_execute: Option<Arc<AfterHook>>,
    host_invoker: Mutex<Option<Arc<dyn HostInvoker>>>,
}

impl Session {
    pub fn new() -> Self {
        Self {
            variables: Mutex::new(IndexMap::new()),
            streams: Mutex::new(Triad::default()),
            closed: AtomicBool::new(false),
            interrupted: AtomicBool::new(false),
            default_lock: AtomicBool::new(false),
            commands: Mutex::new(CommandRegistry::new()),
            location: Mutex::new(None),
            before_execute: None,
            after_execute: None,
            host_invoker: Mutex::new(None),
        }
    }

    pub fn set_host_invoker(&self, invoker: Arc<dyn HostInvoker>) {
        *self.host_invoker.lock().unwrap() = Some(invoker);
    }

    pub fn host_invoker(&self) -> Option<Arc<dyn HostInvoker>> {
        self.host_invoker.lock().unwrap().clone()
    }

    pub fn set_before_execute(&mut self, hook: Arc<BeforeHook>) {
        self.before_execute = Some(hook);
    }

    pub fn set_after_execute(&mut self, hook: Arc<AfterHook>) {
        self.after_execute = Some(hook);
    }

    pub fn run_before_execute(&self, source: &str) {
        if let Some(hook) = &self.before_execute {
            hook(self, source);
        }
    }

    pub fn run_after_execute(&self, source: &str, result: &ShellResult<Value>) {
        if let Some(hook) = &self.after_execute {
            hook(self, source, result);
        }
    }

    pub fn commands(&self) -> std::sync::MutexGuard<'_, CommandRegistry> {
        self.commands.lock().unwrap()
    }

    /// Check the closed flag; fails with `SessionClosed` before any token is
    /// evaluated (§3 invariant 4).
    pub fn check_open(&self) -> ShellResult<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(ShellError::SessionClosed)
        } else {
            Ok(())
        }
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Cooperative cancellation signal for the pipeline engine (§4.4
    /// invariant 7). A host embedding this crate drives this from outside
    /// (e.g. a signal handler); nothing here sets it on its own.
    pub fn request_interrupt(&self) {
        self.interrupted.store(true, Ordering::Release);
    }

    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::Acquire)
    }

    pub fn clear_interrupt(&self) {
        self.interrupted.store(false, Ordering::Release);
    }

    // -- variables ---------------------------------------------------------

    pub fn get_var(&self, name: &str) -> Option<Value> {
        self.variables.lock().unwrap().get(name).cloned()
    }

    pub fn set_var(&self, name: impl Into<String>, value: Value) {
        self.variables.lock().unwrap().insert(name.into(), value);
    }

    /// Remove a variable, returning its prior value (§4.1 assignment case
    /// "no rhs values").
    pub fn remove_var(&self, name: &str) -> Option<Value> {
        self.variables.lock().unwrap().shift_remove(name)
    }

    pub fn variable_names(&self) -> Vec<String> {
        self.variables.lock().unwrap().keys().cloned().collect()
    }

    // -- streams -------------------------------------------------------

    pub fn streams(&self) -> Triad {
        self.streams.lock().unwrap().clone()
    }

    pub fn set_streams(&self, triad: Triad) {
        *self.streams.lock().unwrap() = triad;
    }

    pub fn write_err(&self, text: &str) {
        let mut triad = self.streams.lock().unwrap();
        let _ = triad.stderr.write_all(text.as_bytes());
    }

    /// The triad in effect for the calling thread: a pipeline stage's own
    /// triad if one is installed, otherwise the session-level triad.
    fn current_triad(&self) -> Triad {
        let staged = STAGE_TRIAD.with(|t| t.borrow().clone());
        staged.unwrap_or_else(|| self.streams())
    }

    /// Write to the calling thread's current stdout. `MemStream` clones share
    /// their backing buffer, so writing through `current_triad()`'s clone is
    /// observed by whoever holds the original (the stage driver or the
    /// session itself).
    pub fn write_stdout(&self, bytes: &[u8]) {
        let mut triad = self.current_triad();
        let _ = triad.stdout.write_all(bytes);
    }

    pub fn read_stdin_to_string(&self) -> String {
        let mut triad = self.current_triad();
        let mut buf = String::new();
        let _ = triad.stdin.read_to_string(&mut buf);
        buf
    }

    /// Install `triad` as the calling thread's stage triad for the duration
    /// of `f` (§4.4 invariant 5). Used by the pipeline engine; each stage
    /// runs on its own OS thread so this never races with another stage.
    pub fn with_stage_triad<R>(triad: Triad, f: impl FnOnce() -> R) -> R {
        STAGE_TRIAD.with(|t| *t.borrow_mut() = Some(triad));
        let result = f();
        STAGE_TRIAD.with(|t| *t.borrow_mut() = None);
        result
    }

    // -- default-lock reentry guard (§4.3, §5) ------------------------------

    pub fn try_acquire_default_lock(&self) -> Option<DefaultLockGuard<'_>> {
        DefaultLockGuard::acquire(&self.default_lock)
    }

    // -- error location enrichment (§3 invariant 6, §7) ---------------------

    /// Enrich `err` with the earliest-touched location unless this session
    /// has already recorded one for the current error chain.
    pub fn enrich_error(&self, err: ShellError, loc: Location) -> ShellError {
        let mut slot = self.location.lock().unwrap();
        if slot.is_none() {
            *slot = Some(loc.clone());
            err.enrich(loc)
        } else {
            err
        }
    }

    pub fn reset_location(&self) {
        *self.location.lock().unwrap() = None;
    }

    pub fn last_location(&self) -> Option<Location> {
        self.location.lock().unwrap().clone()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("closed", &self.is_closed())
            .field("variables", &self.variable_names())
            .finish()
    }
}
