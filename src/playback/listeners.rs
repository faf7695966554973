//! Scoped event listener registration.
//! Anything attached through a `ScopedListeners` is detached when the scope is dropped,
//! so a mounted component can never leak handlers onto the shared document.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

pub type Handler = Rc<dyn Fn()>;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerOptions {
    /// The handler never calls `preventDefault`, so scrolling is not held up.
    pub passive: bool,
}

impl ListenerOptions {
    pub const PASSIVE: Self = Self { passive: true };
}

/// An event target that handlers can be attached to and detached from.
pub trait EventSink {
    type Token;

    /// Returns `None` when the target refused the listener.
    fn attach(&self, event: &'static str, options: ListenerOptions, handler: Handler)
        -> Option<Self::Token>;

    /// Detaching a token that is no longer attached must be a no-op.
    fn detach(&self, token: &Self::Token);
}

struct ScopeInner<S: EventSink> {
    sink: S,
    tokens: RefCell<Vec<S::Token>>,
}

/// Owns every listener it attached and detaches them all on drop.
pub struct ScopedListeners<S: EventSink> {
    inner: Rc<ScopeInner<S>>,
}

impl<S: EventSink> ScopedListeners<S> {
    pub fn new(sink: S) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                sink,
                tokens: RefCell::new(Vec::new()),
            }),
        }
    }

    fn len(&self) -> usize {
        self.inner.tokens.borrow().len()
    }

    /// Returns whether the target accepted the listener.
    pub fn listen(&self, event: &'static str, options: ListenerOptions, handler: Handler) -> bool {
        match self.inner.sink.attach(event, options, handler) {
            Some(token) => {
                self.inner.tokens.borrow_mut().push(token);
                true
            }
            None => false,
        }
    }
}

impl<S> ScopedListeners<S>
where
    S: EventSink + 'static,
    S::Token: 'static,
{
    /// Attaches `events` as one combined one-shot group: whichever fires first runs
    /// `handler`, then every listener in the group is detached.
    ///
    /// The tokens stay owned by this scope, so nothing is freed while a handler is
    /// still running; dropping the scope releases them.
    pub fn listen_once_any(
        &self,
        events: &[&'static str],
        options: ListenerOptions,
        handler: impl Fn() + 'static,
    ) -> GestureLatch {
        let latch = GestureLatch::default();
        let group: Rc<RefCell<Vec<usize>>> = Rc::new(RefCell::new(Vec::new()));
        let handler: Handler = Rc::new(handler);

        for &event in events {
            let fired = latch.fired.clone();
            let members = group.clone();
            let scope = Rc::downgrade(&self.inner);
            let handler = handler.clone();
            let once: Handler = Rc::new(move || {
                if fired.replace(true) {
                    return;
                }
                handler();
                if let Some(scope) = scope.upgrade() {
                    let tokens = scope.tokens.borrow();
                    for index in members.borrow().iter() {
                        if let Some(token) = tokens.get(*index) {
                            scope.sink.detach(token);
                        }
                    }
                }
            });

            let index = self.len();
            if self.listen(event, options, once) {
                group.borrow_mut().push(index);
            }
        }

        latch
    }
}

impl<S: EventSink> Drop for ScopedListeners<S> {
    fn drop(&mut self) {
        let tokens: Vec<S::Token> = self.inner.tokens.borrow_mut().drain(..).collect();
        for token in &tokens {
            self.inner.sink.detach(token);
        }
    }
}

/// Observes whether a one-shot group has fired.
#[derive(Debug, Clone, Default)]
pub struct GestureLatch {
    fired: Rc<Cell<bool>>,
}

impl GestureLatch {
    pub fn has_fired(&self) -> bool {
        self.fired.get()
    }
}
