//! Ambient resolver slot.
//!
//! Conversion code takes an explicit `&dyn Resolver`; the ambient slot only
//! serves entry points that cannot receive one, such as `Deserialize`. The
//! slot is per thread and follows stack discipline: entering a scope shadows
//! the outer resolver, leaving it restores the outer one.
//!
//! For async request handling, wrap each request's future with [`scope`].
//! The resolver is installed only while that future is being polled, so
//! concurrent tasks on a shared worker thread never observe each other's
//! resolver.

use std::cell::RefCell;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use crate::error::{Error, Result};
use crate::resolver::Resolver;

thread_local! {
    /// Resolver of the innermost active scope on this thread.
    static CURRENT: RefCell<Option<Arc<dyn Resolver>>> = const { RefCell::new(None) };
}

/// Restores the previously active resolver when dropped.
///
/// Not `Send`: a scope must be left on the thread that entered it.
#[must_use = "the resolver is uninstalled as soon as the guard is dropped"]
pub struct ResolverGuard {
    /// Ties the guard to the entering thread.
    not_send: PhantomData<*const ()>,
    /// Resolver active before this scope, if any.
    previous: Option<Arc<dyn Resolver>>,
}

impl Drop for ResolverGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with_borrow_mut(|slot| *slot = previous);
    }
}

/// Install `resolver` until the returned guard is dropped.
pub fn enter(resolver: Arc<dyn Resolver>) -> ResolverGuard {
    let previous = CURRENT.with_borrow_mut(|slot| return slot.replace(resolver));
    return ResolverGuard {
        not_send: PhantomData,
        previous,
    };
}

/// Run `f` with `resolver` installed.
pub fn with_resolver<R>(resolver: Arc<dyn Resolver>, f: impl FnOnce() -> R) -> R {
    let _guard = enter(resolver);
    return f();
}

/// Resolver of the innermost active scope.
///
/// # Errors
///
/// Returns `Error::NoResolver` when no scope is active.
pub fn current() -> Result<Arc<dyn Resolver>> {
    return CURRENT.with_borrow(|slot| return slot.clone()).ok_or(Error::NoResolver);
}

/// Run `future` with `resolver` installed during each of its polls.
pub fn scope<F: Future>(resolver: Arc<dyn Resolver>, future: F) -> Scoped<F> {
    return Scoped {
        future: Box::pin(future),
        resolver,
    };
}

/// Future returned by [`scope`].
pub struct Scoped<F> {
    /// Wrapped future.
    future: Pin<Box<F>>,
    /// Resolver installed while polling.
    resolver: Arc<dyn Resolver>,
}

impl<F: Future> Future for Scoped<F> {
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        let _guard = enter(Arc::clone(&this.resolver));
        return this.future.as_mut().poll(cx);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "tests")]
mod tests {
    use url::Url;

    use super::*;
    use crate::key::Key;
    use crate::target::Target;

    /// Resolver that is never asked to convert anything.
    struct Idle;

    impl Resolver for Idle {
        fn key_to_url(&self, _key: &Key, target: &Target) -> Result<Url> {
            return Err(Error::MissingEndpoint {
                target: target.name().to_string(),
            });
        }

        fn url_to_key(&self, url: &Url, target: &Target) -> Result<Key> {
            return Err(Error::UnresolvableUrl {
                target: target.name().to_string(),
                url: url.to_string(),
            });
        }
    }

    #[test]
    fn no_scope_means_no_resolver() {
        assert!(matches!(current(), Err(Error::NoResolver)));
    }

    #[test]
    fn nested_scopes_restore_the_outer_resolver() {
        let outer: Arc<dyn Resolver> = Arc::new(Idle);
        let inner: Arc<dyn Resolver> = Arc::new(Idle);

        let outer_guard = enter(Arc::clone(&outer));
        with_resolver(Arc::clone(&inner), || {
            assert!(Arc::ptr_eq(&current().unwrap(), &inner));
        });
        assert!(Arc::ptr_eq(&current().unwrap(), &outer));
        drop(outer_guard);

        assert!(current().is_err());
    }

    #[tokio::test]
    async fn scoped_future_sees_its_resolver_only_while_polled() {
        let resolver: Arc<dyn Resolver> = Arc::new(Idle);
        let seen = scope(Arc::clone(&resolver), async {
            tokio::task::yield_now().await;
            return current().unwrap();
        })
        .await;

        assert!(Arc::ptr_eq(&seen, &resolver));
        assert!(current().is_err());
    }
}
