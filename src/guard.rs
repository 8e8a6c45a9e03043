use crate::store::{Session, SessionStore};

/// Outcome of a guard check. `Admit` carries the session so the caller can
/// hand it straight to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Admit(Session),
    RedirectToLogin,
}

/// Gates entry to protected views. Stateless: every `check` re-reads the
/// session store, so nothing is cached across navigations and a session
/// cleared elsewhere (logout, 401) is noticed on the next check.
pub struct SessionGuard {
    store: SessionStore,
}

impl SessionGuard {
    pub fn new(store: SessionStore) -> Self {
        Self { store }
    }

    pub fn check(&self) -> GuardDecision {
        match self.store.current() {
            Some(session) => GuardDecision::Admit(session),
            None => GuardDecision::RedirectToLogin,
        }
    }
}
