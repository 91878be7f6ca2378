//! Session binding for trigger execution contexts
//!
//! Every trigger execution context binds itself to the session running the
//! triggering statement for as long as it is valid. A trigger body that
//! issues another DML statement fires its own triggers, so bound contexts
//! form a stack whose depth is bounded by configuration.

use std::cell::RefCell;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::{debug, warn};

use super::row_set::RowSet;
use crate::config::TriggerConfig;
use crate::error::{EngineError, EngineResult, ErrorCode};
use crate::executor::cursor::RowCursor;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Identity of one trigger execution context
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContextId(u64);

impl ContextId {
    /// Allocate a fresh, process-unique id
    pub fn next() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tec#{}", self.0)
    }
}

// ============================================================================
// SessionContext
// ============================================================================

/// What a trigger execution context needs from the session that owns it.
pub trait SessionContext {
    /// Make `context` the active trigger execution context.
    fn bind(&self, context: ContextId) -> EngineResult<()>;

    /// Release `context`. Unbinding a context that is not bound is a no-op.
    fn unbind(&self, context: ContextId);

    /// Settings for contexts created on this session.
    fn config(&self) -> &TriggerConfig;

    /// Wrap an opened cursor duplicate in the handle type trigger bodies see.
    ///
    /// On failure the cursor must be handed back so the caller can close it.
    fn wrap_cursor(&self, cursor: Box<dyn RowCursor>) -> Result<RowSet, WrapFailure> {
        Ok(RowSet::new(cursor))
    }
}

/// A refused [`SessionContext::wrap_cursor`] call, carrying the cursor it
/// was given.
pub struct WrapFailure {
    error: EngineError,
    cursor: Box<dyn RowCursor>,
}

impl WrapFailure {
    pub fn new(error: EngineError, cursor: Box<dyn RowCursor>) -> Self {
        Self { error, cursor }
    }

    pub fn error(&self) -> &EngineError {
        &self.error
    }

    pub fn into_parts(self) -> (EngineError, Box<dyn RowCursor>) {
        (self.error, self.cursor)
    }
}

impl fmt::Debug for WrapFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WrapFailure")
            .field("error", &self.error)
            .field("cursor_open", &self.cursor.is_open())
            .finish()
    }
}

// ============================================================================
// Session
// ============================================================================

/// Per-connection session state relevant to trigger execution
pub struct Session {
    config: TriggerConfig,
    /// Bound contexts, innermost last
    contexts: RefCell<Vec<ContextId>>,
}

impl Session {
    /// Session using the process-wide default configuration
    pub fn new() -> Self {
        Self::with_config(TriggerConfig::global())
    }

    pub fn with_config(config: TriggerConfig) -> Self {
        Self {
            config,
            contexts: RefCell::new(Vec::new()),
        }
    }

    /// The innermost bound context
    pub fn current_context(&self) -> Option<ContextId> {
        self.contexts.borrow().last().copied()
    }

    /// Number of bound contexts
    pub fn depth(&self) -> usize {
        self.contexts.borrow().len()
    }

    pub fn is_bound(&self, context: ContextId) -> bool {
        self.contexts.borrow().contains(&context)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionContext for Session {
    fn bind(&self, context: ContextId) -> EngineResult<()> {
        let mut contexts = self.contexts.borrow_mut();
        if contexts.contains(&context) {
            return Err(EngineError::with_message(
                ErrorCode::Misuse,
                format!("{} is already bound to this session", context),
            ));
        }
        if contexts.len() >= self.config.max_nesting_depth {
            return Err(EngineError::with_message(
                ErrorCode::Constraint,
                format!(
                    "maximum depth of nested triggers was exceeded ({})",
                    self.config.max_nesting_depth
                ),
            ));
        }
        contexts.push(context);
        debug!(target: "trigctx", %context, depth = contexts.len(), "bound trigger context");
        Ok(())
    }

    fn unbind(&self, context: ContextId) {
        let mut contexts = self.contexts.borrow_mut();
        let Some(pos) = contexts.iter().rposition(|c| *c == context) else {
            return;
        };
        if pos + 1 != contexts.len() {
            warn!(
                target: "trigctx",
                %context,
                depth = contexts.len(),
                "unbinding trigger context that is not innermost"
            );
        }
        contexts.remove(pos);
        debug!(target: "trigctx", %context, depth = contexts.len(), "unbound trigger context");
    }

    fn config(&self) -> &TriggerConfig {
        &self.config
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .field("contexts", &self.contexts.borrow())
            .finish()
    }
}
