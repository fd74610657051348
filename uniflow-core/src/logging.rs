//! Logging decorator for reducers
//!
//! [`Logged`] wraps any reducer and, after each successful reduce call,
//! emits `{label, action, resulting state}` to a [`LogSink`]. The inner
//! reducer's state updates and effects pass through untouched.
//!
//! Sinks:
//! - [`TracingSink`]: `tracing::debug!` events (console, or wherever the
//!   subscriber writes)
//! - [`CaptureSink`]: bounded in-memory buffer, mainly for tests
//! - [`JsonSink`]: one JSON object per line to any writer
//!
//! # Example
//!
//! ```ignore
//! use uniflow::{from_fn, ReducerExt, Store, TracingSink};
//!
//! let reducer = from_fn(counter).logged("counter", TracingSink);
//! let mut store = Store::new(CounterState::default(), reducer);
//! ```

use std::collections::VecDeque;
use std::fmt::Debug;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use crate::config::LogConfig;
use crate::error::ReduceError;
use crate::reducer::{Reduced, Reducer};
use crate::Action;

/// Destination for reducer log records.
pub trait LogSink<S, A> {
    /// Record that `action` was reduced under `label`, producing `state`.
    fn emit(&self, label: &str, action: &A, state: &S);
}

impl<S, A, K> LogSink<S, A> for Box<K>
where
    K: LogSink<S, A> + ?Sized,
{
    fn emit(&self, label: &str, action: &A, state: &S) {
        (**self).emit(label, action, state)
    }
}

impl<S, A, K> LogSink<S, A> for Arc<K>
where
    K: LogSink<S, A> + ?Sized,
{
    fn emit(&self, label: &str, action: &A, state: &S) {
        (**self).emit(label, action, state)
    }
}

/// Configuration for filtering logged actions by name with glob patterns.
///
/// Patterns support:
/// - `*` matches any sequence of characters
/// - `?` matches any single character
/// - Literal text matches exactly
///
/// # Examples
///
/// - `Timer*` matches TimerTicked, TimerStarted, etc.
/// - `Did*` matches DidLoad, DidFail, etc.
/// - `*Tapped` matches StartTapped, StopTapped
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogFilter {
    /// If non-empty, only log actions matching these patterns
    pub include_patterns: Vec<String>,
    /// Exclude actions matching these patterns (applied after include)
    pub exclude_patterns: Vec<String>,
}

impl LogFilter {
    /// Create a filter from comma-separated pattern strings
    ///
    /// # Example
    /// ```
    /// use uniflow_core::LogFilter;
    ///
    /// let filter = LogFilter::new(Some("Timer*,StartTapped"), Some("TimerTicked"));
    /// assert!(filter.should_log("StartTapped"));
    /// assert!(filter.should_log("TimerStarted"));
    /// assert!(!filter.should_log("TimerTicked"));
    /// assert!(!filter.should_log("Increment"));
    /// ```
    pub fn new(include: Option<&str>, exclude: Option<&str>) -> Self {
        Self {
            include_patterns: include.map(split_patterns).unwrap_or_default(),
            exclude_patterns: exclude.map(split_patterns).unwrap_or_default(),
        }
    }

    /// Create a filter with specific pattern vectors
    pub fn with_patterns(include: Vec<String>, exclude: Vec<String>) -> Self {
        Self {
            include_patterns: include,
            exclude_patterns: exclude,
        }
    }

    /// Check if an action name should be logged
    pub fn should_log(&self, action_name: &str) -> bool {
        if !self.include_patterns.is_empty()
            && !self
                .include_patterns
                .iter()
                .any(|p| glob_match(p, action_name))
        {
            return false;
        }

        !self
            .exclude_patterns
            .iter()
            .any(|p| glob_match(p, action_name))
    }
}

impl From<&LogConfig> for LogFilter {
    fn from(config: &LogConfig) -> Self {
        Self::with_patterns(config.include.clone(), config.exclude.clone())
    }
}

fn split_patterns(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim())
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Simple glob pattern matching supporting `*` and `?`.
fn glob_match(pattern: &str, text: &str) -> bool {
    let pattern: Vec<char> = pattern.chars().collect();
    let text: Vec<char> = text.chars().collect();

    let (mut p, mut t) = (0, 0);
    // Position of the last `*` and the text index it was tried against
    let mut backtrack: Option<(usize, usize)> = None;

    while t < text.len() {
        if p < pattern.len() && (pattern[p] == '?' || pattern[p] == text[t]) {
            p += 1;
            t += 1;
        } else if p < pattern.len() && pattern[p] == '*' {
            backtrack = Some((p, t));
            p += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            t = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }

    pattern[p..].iter().all(|&c| c == '*')
}

/// Reducer decorator that logs every reduced action.
///
/// Faulted reduce calls are returned as-is and not logged.
#[derive(Debug)]
pub struct Logged<R, K> {
    inner: R,
    label: String,
    sink: K,
    filter: LogFilter,
}

impl<R, K> Logged<R, K> {
    /// Wrap `inner`, labelling records with `label`.
    pub fn new(inner: R, label: impl Into<String>, sink: K) -> Self {
        Self {
            inner,
            label: label.into(),
            sink,
            filter: LogFilter::default(),
        }
    }

    /// Only log actions passing `filter`.
    pub fn with_filter(mut self, filter: LogFilter) -> Self {
        self.filter = filter;
        self
    }

    /// The label attached to every record.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The wrapped reducer.
    pub fn inner(&self) -> &R {
        &self.inner
    }

    /// The sink records are sent to.
    pub fn sink(&self) -> &K {
        &self.sink
    }
}

impl<R, K> Reducer for Logged<R, K>
where
    R: Reducer,
    K: LogSink<R::State, R::Action>,
{
    type State = R::State;
    type Action = R::Action;

    fn reduce(&self, state: &mut R::State, action: R::Action) -> Reduced<R::Action> {
        if !self.filter.should_log(action.name()) {
            return self.inner.reduce(state, action);
        }

        let logged = action.clone();
        let result = self.inner.reduce(state, action)?;
        self.sink.emit(&self.label, &logged, state);
        Ok(result)
    }

    fn check(&self, state: &mut R::State, action: &R::Action) -> Result<(), ReduceError> {
        self.inner.check(state, action)
    }
}

/// Sink that logs through `tracing` at debug level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl<S: Debug, A: Action> LogSink<S, A> for TracingSink {
    fn emit(&self, label: &str, action: &A, state: &S) {
        tracing::debug!(
            label = %label,
            action = %action.name(),
            payload = ?action,
            state = ?state,
            "reduced"
        );
    }
}

/// One captured log record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogRecord<S, A> {
    /// Label of the [`Logged`] wrapper that produced the record
    pub label: String,
    /// Sequence number for ordering
    pub sequence: u64,
    /// The action that was reduced
    pub action: A,
    /// State after the reduce call
    pub state: S,
}

#[derive(Debug)]
struct CaptureBuffer<S, A> {
    records: VecDeque<LogRecord<S, A>>,
    capacity: usize,
    next_sequence: u64,
}

/// In-memory ring buffer of log records.
///
/// Clones share the same buffer, so a test can keep one handle and give
/// the other to [`Logged`]. Older entries are discarded when capacity is
/// reached.
#[derive(Debug)]
pub struct CaptureSink<S, A> {
    buffer: Arc<Mutex<CaptureBuffer<S, A>>>,
}

impl<S, A> Clone for CaptureSink<S, A> {
    fn clone(&self) -> Self {
        Self {
            buffer: self.buffer.clone(),
        }
    }
}

impl<S, A> Default for CaptureSink<S, A> {
    fn default() -> Self {
        Self::with_capacity(LogConfig::default().capacity)
    }
}

impl<S, A> CaptureSink<S, A> {
    /// Create a sink keeping at most `capacity` records.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Arc::new(Mutex::new(CaptureBuffer {
                records: VecDeque::with_capacity(capacity),
                capacity,
                next_sequence: 0,
            })),
        }
    }

    /// Create a sink sized from a [`LogConfig`].
    pub fn from_config(config: &LogConfig) -> Self {
        Self::with_capacity(config.capacity)
    }

    /// Number of records currently stored
    pub fn len(&self) -> usize {
        self.buffer.lock().records.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.buffer.lock().records.is_empty()
    }

    /// Clear all records
    pub fn clear(&self) {
        self.buffer.lock().records.clear();
    }
}

impl<S: Clone, A: Clone> CaptureSink<S, A> {
    /// Copy of all records (oldest first)
    pub fn records(&self) -> Vec<LogRecord<S, A>> {
        self.buffer.lock().records.iter().cloned().collect()
    }

    /// The most recent record
    pub fn last(&self) -> Option<LogRecord<S, A>> {
        self.buffer.lock().records.back().cloned()
    }
}

impl<S: Clone, A: Clone> LogSink<S, A> for CaptureSink<S, A> {
    fn emit(&self, label: &str, action: &A, state: &S) {
        let mut buffer = self.buffer.lock();
        if buffer.capacity == 0 {
            return;
        }

        let sequence = buffer.next_sequence;
        buffer.next_sequence += 1;

        // Maintain capacity
        if buffer.records.len() >= buffer.capacity {
            buffer.records.pop_front();
        }

        buffer.records.push_back(LogRecord {
            label: label.to_string(),
            sequence,
            action: action.clone(),
            state: state.clone(),
        });
    }
}

#[derive(Serialize)]
struct JsonRecord<'a, S, A> {
    label: &'a str,
    sequence: u64,
    name: &'static str,
    action: &'a A,
    state: &'a S,
}

struct JsonWriter<W> {
    writer: W,
    next_sequence: u64,
}

/// Sink writing one JSON object per record, newline separated.
///
/// Write failures are reported through `tracing` and otherwise ignored;
/// logging never fails a reduce call.
pub struct JsonSink<W> {
    inner: Mutex<JsonWriter<W>>,
}

impl<W> std::fmt::Debug for JsonSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JsonSink").finish_non_exhaustive()
    }
}

impl<W: Write> JsonSink<W> {
    /// Write records to `writer`.
    pub fn new(writer: W) -> Self {
        Self {
            inner: Mutex::new(JsonWriter {
                writer,
                next_sequence: 0,
            }),
        }
    }

    /// Recover the underlying writer.
    pub fn into_inner(self) -> W {
        self.inner.into_inner().writer
    }
}

impl JsonSink<BufWriter<File>> {
    /// Create (or truncate) a JSON lines file at `path`.
    pub fn create(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::new(BufWriter::new(File::create(path)?)))
    }
}

impl<S, A, W> LogSink<S, A> for JsonSink<W>
where
    S: Serialize,
    A: Action + Serialize,
    W: Write,
{
    fn emit(&self, label: &str, action: &A, state: &S) {
        let mut inner = self.inner.lock();
        let sequence = inner.next_sequence;
        inner.next_sequence += 1;

        let record = JsonRecord {
            label,
            sequence,
            name: action.name(),
            action,
            state,
        };

        let written = serde_json::to_writer(&mut inner.writer, &record)
            .map_err(io::Error::from)
            .and_then(|()| writeln!(inner.writer))
            .and_then(|()| inner.writer.flush());

        if let Err(error) = written {
            tracing::warn!(label = %label, %error, "failed to write log record");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::effect::{DispatchResult, Effect};
    use crate::reducer::{from_fn, ReducerExt};

    #[test]
    fn test_glob_match() {
        assert!(glob_match("Timer*", "TimerTicked"));
        assert!(glob_match("*Tapped", "StopTapped"));
        assert!(glob_match("*", "Anything"));
        assert!(glob_match("Tick", "Tick"));
        assert!(glob_match("T?ck", "Tick"));
        assert!(glob_match("*Error*", "DidLoadErrorNow"));
        assert!(!glob_match("Tick", "Ticks"));
        assert!(!glob_match("Timer*", "StartTimer"));
    }

    #[test]
    fn test_filter_default_logs_everything() {
        let filter = LogFilter::default();
        assert!(filter.should_log("TimerTicked"));
        assert!(filter.should_log("Increment"));
    }

    #[test]
    fn test_filter_include_exclude() {
        let filter = LogFilter::new(Some("Timer*, Start*"), Some("TimerTicked"));
        assert!(filter.should_log("StartTapped"));
        assert!(filter.should_log("TimerStarted"));
        assert!(!filter.should_log("TimerTicked"));
        assert!(!filter.should_log("StopTapped"));
    }

    #[derive(Clone, Debug, Default, PartialEq, Serialize)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug, PartialEq, Serialize)]
    enum TestAction {
        Increment,
        Tick,
        Start,
    }

    impl Action for TestAction {
        fn name(&self) -> &'static str {
            match self {
                TestAction::Increment => "Increment",
                TestAction::Tick => "Tick",
                TestAction::Start => "Start",
            }
        }
    }

    fn test_reducer(state: &mut TestState, action: TestAction) -> DispatchResult<TestAction> {
        match action {
            TestAction::Increment | TestAction::Tick => {
                state.count += 1;
                DispatchResult::changed()
            }
            TestAction::Start => DispatchResult::effect(Effect::cancel("timer")),
        }
    }

    #[test]
    fn test_logged_emits_resulting_state() {
        let sink = CaptureSink::default();
        let reducer = from_fn(test_reducer).logged("counter", sink.clone());
        let mut state = TestState::default();

        reducer.reduce(&mut state, TestAction::Increment).unwrap();
        reducer.reduce(&mut state, TestAction::Increment).unwrap();

        let records = sink.records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].label, "counter");
        assert_eq!(records[0].state, TestState { count: 1 });
        assert_eq!(records[1].state, TestState { count: 2 });
        assert_eq!(records[1].sequence, 1);
    }

    #[test]
    fn test_logged_passes_effects_through() {
        let reducer = from_fn(test_reducer).logged("counter", TracingSink);
        let mut state = TestState::default();

        let result = reducer.reduce(&mut state, TestAction::Start).unwrap();
        assert!(!result.changed);
        assert_eq!(format!("{:?}", result.effects), "[Cancel(EffectId(\"timer\"))]");
    }

    #[test]
    fn test_logged_respects_filter() {
        let sink = CaptureSink::default();
        let reducer = from_fn(test_reducer)
            .logged("counter", sink.clone())
            .with_filter(LogFilter::new(None, Some("Tick")));
        let mut state = TestState::default();

        reducer.reduce(&mut state, TestAction::Tick).unwrap();
        reducer.reduce(&mut state, TestAction::Increment).unwrap();

        assert_eq!(state.count, 2);
        assert_eq!(sink.len(), 1);
        assert_eq!(sink.last().map(|r| r.action), Some(TestAction::Increment));
    }

    #[test]
    fn test_capture_sink_capacity() {
        let sink: CaptureSink<TestState, TestAction> = CaptureSink::with_capacity(2);
        for count in 0..3 {
            sink.emit("c", &TestAction::Tick, &TestState { count });
        }

        let counts: Vec<_> = sink.records().iter().map(|r| r.state.count).collect();
        assert_eq!(counts, vec![1, 2]);

        sink.clear();
        assert!(sink.is_empty());
    }

    #[test]
    fn test_json_sink_writes_lines() {
        let sink = JsonSink::new(Vec::new());
        sink.emit("counter", &TestAction::Increment, &TestState { count: 3 });
        sink.emit("counter", &TestAction::Tick, &TestState { count: 4 });

        let output = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<serde_json::Value> = output
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["label"], "counter");
        assert_eq!(lines[0]["name"], "Increment");
        assert_eq!(lines[0]["state"]["count"], 3);
        assert_eq!(lines[1]["sequence"], 1);
    }
}
