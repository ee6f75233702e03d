//! Platform event hooks bound to a session's visible lifetime.

use crate::command::KeyEvent;
use crate::share::ShareRequest;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Handler invoked by an event source. It may mutate the event to report back.
pub type Callback<E> = Arc<dyn Fn(&mut E) + Send + Sync>;

/// Opaque registration returned by [`EventSource::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionToken(u64);

/// A platform notification source.
pub trait EventSource<E>: Send + Sync {
    fn register(&self, callback: Callback<E>) -> SubscriptionToken;

    /// Removes a registration. Unknown tokens are ignored.
    fn unregister(&self, token: SubscriptionToken);
}

/// In-process event source: callbacks are invoked synchronously on `emit`.
pub struct LocalEventSource<E> {
    next_token: AtomicU64,
    handlers: Mutex<BTreeMap<SubscriptionToken, Callback<E>>>,
}

impl<E: 'static> Default for LocalEventSource<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: 'static> LocalEventSource<E> {
    pub fn new() -> Self {
        Self {
            next_token: AtomicU64::new(1),
            handlers: Mutex::new(BTreeMap::new()),
        }
    }

    /// Delivers `event` to every registered handler and returns how many ran.
    pub fn emit(&self, event: &mut E) -> usize {
        // Handlers run without the lock so they may (un)register
        let handlers: Vec<Callback<E>> = self
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        for handler in &handlers {
            handler(event);
        }
        handlers.len()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl<E: 'static> EventSource<E> for LocalEventSource<E> {
    fn register(&self, callback: Callback<E>) -> SubscriptionToken {
        let token = SubscriptionToken(self.next_token.fetch_add(1, Ordering::SeqCst));
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(token, callback);
        token
    }

    fn unregister(&self, token: SubscriptionToken) {
        self.handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&token);
    }
}

/// Identity of a hooked event source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HookKind {
    /// Keyboard accelerators.
    Input,
    /// Platform share requests.
    Share,
}

/// The sources a session hooks into while visible.
#[derive(Clone)]
pub struct PlatformHooks {
    pub input: Arc<dyn EventSource<KeyEvent>>,
    pub share: Arc<dyn EventSource<ShareRequest>>,
}

impl PlatformHooks {
    pub fn new(
        input: Arc<dyn EventSource<KeyEvent>>,
        share: Arc<dyn EventSource<ShareRequest>>,
    ) -> Self {
        Self { input, share }
    }
}

/// Handlers to register, one per source.
#[derive(Clone)]
pub struct HookCallbacks {
    pub on_key: Callback<KeyEvent>,
    pub on_share: Callback<ShareRequest>,
}

/// Tokens for the currently registered hooks, at most one per source.
#[derive(Debug, Default)]
pub struct HookSet {
    tokens: BTreeMap<HookKind, SubscriptionToken>,
}

impl HookSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers every source not yet registered. Returns how many were added.
    pub fn attach(&mut self, hooks: &PlatformHooks, callbacks: HookCallbacks) -> usize {
        let HookCallbacks { on_key, on_share } = callbacks;
        let mut added = 0;
        if self.attach_one(HookKind::Input, || hooks.input.register(on_key)) {
            added += 1;
        }
        if self.attach_one(HookKind::Share, || hooks.share.register(on_share)) {
            added += 1;
        }
        added
    }

    /// Unregisters every stored token. Returns how many were removed.
    pub fn detach(&mut self, hooks: &PlatformHooks) -> usize {
        let mut removed = 0;
        if self.detach_one(HookKind::Input, |token| hooks.input.unregister(token)) {
            removed += 1;
        }
        if self.detach_one(HookKind::Share, |token| hooks.share.unregister(token)) {
            removed += 1;
        }
        removed
    }

    fn attach_one(&mut self, kind: HookKind, register: impl FnOnce() -> SubscriptionToken) -> bool {
        if self.tokens.contains_key(&kind) {
            log::trace!("{:?} hook already attached", kind);
            return false;
        }
        self.tokens.insert(kind, register());
        true
    }

    fn detach_one(&mut self, kind: HookKind, unregister: impl FnOnce(SubscriptionToken)) -> bool {
        match self.tokens.remove(&kind) {
            Some(token) => {
                unregister(token);
                true
            }
            None => false,
        }
    }

    pub fn is_attached(&self) -> bool {
        !self.tokens.is_empty()
    }

    pub fn token(&self, kind: HookKind) -> Option<SubscriptionToken> {
        self.tokens.get(&kind).copied()
    }

    pub fn kinds(&self) -> Vec<HookKind> {
        self.tokens.keys().copied().collect()
    }
}
