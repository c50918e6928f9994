use async_trait::async_trait;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Error type returned by plugin hooks
pub type PluginError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result of a plugin's processing step
pub type PluginResult = Result<(), PluginError>;

/// A boxed, sendable future
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Immutable, ordered view of the plugins a chain walks over
pub type PluginChain<C> = Arc<[Arc<dyn Plugin<C>>]>;

/// Zero, one or many plugin ids named by a `before`/`after` declaration
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Constraint {
    #[default]
    None,
    One(String),
    Many(Vec<String>),
}

impl Constraint {
    /// Ids in declaration order
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        let slice: &[String] = match self {
            Constraint::None => &[],
            Constraint::One(id) => std::slice::from_ref(id),
            Constraint::Many(ids) => ids,
        };
        slice.iter().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.ids().next().is_none()
    }
}

impl From<&str> for Constraint {
    fn from(id: &str) -> Self {
        Constraint::One(id.to_string())
    }
}

impl From<String> for Constraint {
    fn from(id: String) -> Self {
        Constraint::One(id)
    }
}

impl From<Vec<String>> for Constraint {
    fn from(ids: Vec<String>) -> Self {
        Constraint::Many(ids)
    }
}

impl From<Vec<&str>> for Constraint {
    fn from(ids: Vec<&str>) -> Self {
        Constraint::Many(ids.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for Constraint {
    fn from(ids: [&str; N]) -> Self {
        Constraint::Many(ids.iter().map(|id| (*id).to_string()).collect())
    }
}

/// Core plugin trait
///
/// `C` is the per-invocation context shared by every step of the chain.
/// The core never inspects it; built-in plugins use [`HttpContext`].
#[async_trait]
pub trait Plugin<C: Send + 'static = HttpContext>: Send + Sync {
    /// Unique id, used for ordering constraints and logging
    fn id(&self) -> &str;

    /// Ids this plugin must run before
    fn before(&self) -> Constraint {
        Constraint::None
    }

    /// Ids this plugin must run after
    fn after(&self) -> Constraint {
        Constraint::None
    }

    /// Initialize plugin (called once on startup)
    async fn init(&self) -> PluginResult {
        Ok(())
    }

    /// Shutdown plugin (called on graceful shutdown)
    async fn shutdown(&self) -> PluginResult {
        Ok(())
    }

    /// Process one unit of work.
    ///
    /// Call `next.run(ctx).await` to hand control to the rest of the chain.
    /// Returning without running `next` terminates the chain: no later
    /// plugin runs and the fall-through continuation is skipped.
    async fn process(&self, ctx: &mut C, next: Next<'_, C>) -> PluginResult;
}

/// Fall-through continuation invoked once every plugin has continued
pub type Terminal<'a, C> =
    Box<dyn for<'c> FnOnce(&'c mut C) -> BoxFuture<'c, PluginResult> + Send + 'a>;

/// Progress of a single chain invocation
#[derive(Debug, Default)]
pub(crate) struct ChainState {
    reached: AtomicUsize,
    completed: AtomicBool,
}

impl ChainState {
    pub(crate) fn reached(&self) -> usize {
        self.reached.load(Ordering::Acquire)
    }

    pub(crate) fn completed(&self) -> bool {
        self.completed.load(Ordering::Acquire)
    }
}

/// Continuation handed to each plugin.
///
/// `run` consumes the value, so a plugin can advance the chain at most once.
pub struct Next<'a, C: Send + 'static> {
    plugins: &'a [Arc<dyn Plugin<C>>],
    index: usize,
    terminal: Terminal<'a, C>,
    state: &'a ChainState,
}

impl<'a, C: Send + 'static> Next<'a, C> {
    pub(crate) fn new(
        plugins: &'a [Arc<dyn Plugin<C>>],
        terminal: Terminal<'a, C>,
        state: &'a ChainState,
    ) -> Self {
        Self {
            plugins,
            index: 0,
            terminal,
            state,
        }
    }

    /// Position of the step this continuation will run
    pub fn index(&self) -> usize {
        self.index
    }

    /// Number of steps left before the fall-through continuation
    pub fn remaining(&self) -> usize {
        self.plugins.len() - self.index
    }

    /// Invokes the next plugin, or the fall-through continuation at the end of the chain.
    pub async fn run(self, ctx: &mut C) -> PluginResult {
        let Self {
            plugins,
            index,
            terminal,
            state,
        } = self;

        match plugins.get(index) {
            Some(plugin) => {
                state.reached.store(index, Ordering::Release);
                tracing::trace!(plugin = plugin.id(), index, "Entering plugin");
                let next = Next {
                    plugins,
                    index: index + 1,
                    terminal,
                    state,
                };
                plugin.process(ctx, next).await
            }
            None => {
                state.reached.store(index, Ordering::Release);
                state.completed.store(true, Ordering::Release);
                terminal(ctx).await
            }
        }
    }
}

/// Request/response context passed to the built-in plugins
#[derive(Debug)]
pub struct HttpContext {
    pub request: http::Request<Vec<u8>>,
    pub response: http::Response<Vec<u8>>,
    pub remote_addr: SocketAddr,
}

impl HttpContext {
    /// Context with an empty `200 OK` response waiting to be filled in
    pub fn new(request: http::Request<Vec<u8>>, remote_addr: SocketAddr) -> Self {
        Self {
            request,
            response: http::Response::new(Vec::new()),
            remote_addr,
        }
    }
}

/// A plugin built from an id and an async function.
///
/// ```ignore
/// let plugin = FnPlugin::new("timing", |ctx: &mut Vec<String>, next| {
///     Box::pin(async move {
///         ctx.push("timing".into());
///         next.run(ctx).await
///     })
/// })
/// .with_after("auth");
/// ```
pub struct FnPlugin<F> {
    id: String,
    before: Constraint,
    after: Constraint,
    func: F,
}

impl<F> FnPlugin<F> {
    pub fn new<C>(id: impl Into<String>, func: F) -> Self
    where
        C: Send + 'static,
        F: for<'c> Fn(&'c mut C, Next<'c, C>) -> BoxFuture<'c, PluginResult> + Send + Sync,
    {
        Self {
            id: id.into(),
            before: Constraint::None,
            after: Constraint::None,
            func,
        }
    }

    pub fn with_before(mut self, before: impl Into<Constraint>) -> Self {
        self.before = before.into();
        self
    }

    pub fn with_after(mut self, after: impl Into<Constraint>) -> Self {
        self.after = after.into();
        self
    }
}

#[async_trait]
impl<C, F> Plugin<C> for FnPlugin<F>
where
    C: Send + 'static,
    F: for<'c> Fn(&'c mut C, Next<'c, C>) -> BoxFuture<'c, PluginResult> + Send + Sync,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn before(&self) -> Constraint {
        self.before.clone()
    }

    fn after(&self) -> Constraint {
        self.after.clone()
    }

    async fn process(&self, ctx: &mut C, next: Next<'_, C>) -> PluginResult {
        (self.func)(ctx, next).await
    }
}
