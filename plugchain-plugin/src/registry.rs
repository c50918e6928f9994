use crate::chain::{run_chain_with_depth, ChainOutcome};
use crate::graph::{build_graph, Declared};
use crate::sort::sort;
use crate::traits::*;
use plugchain_common::{RegistryConfig, Result};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Ordering overrides applied when a plugin is registered.
///
/// A value that is present replaces the plugin's own declaration; it is never merged.
#[derive(Debug, Clone, Default)]
pub struct RegisterOptions {
    pub before: Option<Constraint>,
    pub after: Option<Constraint>,
}

impl RegisterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn before(mut self, ids: impl Into<Constraint>) -> Self {
        self.before = Some(ids.into());
        self
    }

    pub fn after(mut self, ids: impl Into<Constraint>) -> Self {
        self.after = Some(ids.into());
        self
    }
}

/// A registered plugin with the constraints in effect for it
pub struct PluginEntry<C: Send + 'static = HttpContext> {
    plugin: Arc<dyn Plugin<C>>,
    before: Constraint,
    after: Constraint,
}

impl<C: Send + 'static> Clone for PluginEntry<C> {
    fn clone(&self) -> Self {
        Self {
            plugin: Arc::clone(&self.plugin),
            before: self.before.clone(),
            after: self.after.clone(),
        }
    }
}

impl<C: Send + 'static> Declared for PluginEntry<C> {
    fn id(&self) -> &str {
        self.plugin.id()
    }

    fn before(&self) -> &Constraint {
        &self.before
    }

    fn after(&self) -> &Constraint {
        &self.after
    }
}

struct RegistryState<C: Send + 'static> {
    plugins: Vec<PluginEntry<C>>,
    /// Set once sorted; `plugins` is then in execution order.
    chain: Option<PluginChain<C>>,
    strict: bool,
    max_depth: usize,
}

impl<C: Send + 'static> RegistryState<C> {
    /// Re-sorts `plugins` in place. On failure the list is left untouched.
    fn sort(&mut self) -> Result<PluginChain<C>> {
        let graph = build_graph(&self.plugins, self.strict)?;
        let order = sort(&graph.nodes, &graph.edges)?;

        let position: HashMap<&str, usize> = self
            .plugins
            .iter()
            .enumerate()
            .map(|(i, entry)| (entry.id(), i))
            .collect();
        let sorted: Vec<PluginEntry<C>> = order
            .iter()
            .map(|id| self.plugins[position[id.as_str()]].clone())
            .collect();

        self.plugins = sorted;
        let chain: PluginChain<C> = self
            .plugins
            .iter()
            .map(|entry| Arc::clone(&entry.plugin))
            .collect();
        self.chain = Some(Arc::clone(&chain));

        info!(order = ?order, "Plugin execution order computed");
        Ok(chain)
    }

    fn chain(&mut self) -> Result<PluginChain<C>> {
        match &self.chain {
            Some(chain) => Ok(Arc::clone(chain)),
            None => self.sort(),
        }
    }
}

type SharedState<C> = Arc<RwLock<RegistryState<C>>>;

/// Registry holds the plugins of one pipeline and their execution order
pub struct PluginRegistry<C: Send + 'static = HttpContext> {
    state: SharedState<C>,
}

impl<C: Send + 'static> Default for PluginRegistry<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Send + 'static> PluginRegistry<C> {
    pub fn new() -> Self {
        Self::with_config(&RegistryConfig::default())
    }

    pub fn with_config(config: &RegistryConfig) -> Self {
        Self {
            state: Arc::new(RwLock::new(RegistryState {
                plugins: Vec::new(),
                chain: None,
                strict: config.strict_constraints,
                max_depth: config.max_chain_depth,
            })),
        }
    }

    /// Register a plugin.
    ///
    /// If the order has already been computed it is recomputed immediately,
    /// so an error here (duplicate id, cycle) leaves the registry as it was.
    pub fn register(&self, plugin: Arc<dyn Plugin<C>>, options: RegisterOptions) -> Result<()> {
        let entry = PluginEntry {
            before: options.before.unwrap_or_else(|| plugin.before()),
            after: options.after.unwrap_or_else(|| plugin.after()),
            plugin,
        };
        debug!(
            plugin = entry.id(),
            before = ?entry.before,
            after = ?entry.after,
            "Registering plugin"
        );

        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.plugins.push(entry);

        if state.chain.is_some() {
            if let Err(e) = state.sort() {
                state.plugins.pop();
                return Err(e);
            }
        }
        Ok(())
    }

    /// Register a plugin with its own declared constraints
    pub fn register_plugin(&self, plugin: Arc<dyn Plugin<C>>) -> Result<()> {
        self.register(plugin, RegisterOptions::default())
    }

    /// Plugin ids in execution order, sorting first if needed
    pub fn execution_order(&self) -> Result<Vec<String>> {
        let chain = self
            .state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .chain()?;
        Ok(chain.iter().map(|p| p.id().to_string()).collect())
    }

    /// Sorts the plugins and returns a reusable handler that runs them.
    ///
    /// The handler shares this registry's state: plugins registered later
    /// are picked up by the next invocation.
    pub fn route_handler(&self) -> Result<ChainHandler<C>> {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .sort()?;
        Ok(ChainHandler {
            state: Arc::clone(&self.state),
        })
    }

    /// Ids in the current list order (registration order until first sorted)
    pub fn ids(&self) -> Vec<String> {
        self.read_plugins(|entry| entry.id().to_string())
    }

    pub fn len(&self) -> usize {
        self.state.read().unwrap_or_else(PoisonError::into_inner).plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_sorted(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .chain
            .is_some()
    }

    /// Initialize all plugins, in the current list order
    pub async fn init_all(&self) -> std::result::Result<(), PluginError> {
        for plugin in self.read_plugins(|entry| Arc::clone(&entry.plugin)) {
            info!("Initializing plugin: {}", plugin.id());
            plugin.init().await?;
        }
        Ok(())
    }

    /// Shutdown all plugins, in reverse list order
    pub async fn shutdown_all(&self) -> std::result::Result<(), PluginError> {
        for plugin in self.read_plugins(|entry| Arc::clone(&entry.plugin)).into_iter().rev() {
            info!("Shutting down plugin: {}", plugin.id());
            plugin.shutdown().await?;
        }
        Ok(())
    }

    fn read_plugins<T>(&self, f: impl Fn(&PluginEntry<C>) -> T) -> Vec<T> {
        let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
        state.plugins.iter().map(f).collect()
    }
}

/// Reusable entry point that runs a registry's plugins for one unit of work at a time
pub struct ChainHandler<C: Send + 'static = HttpContext> {
    state: SharedState<C>,
}

impl<C: Send + 'static> Clone for ChainHandler<C> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<C: Send + 'static> std::fmt::Debug for ChainHandler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainHandler").finish_non_exhaustive()
    }
}

impl<C: Send + 'static> ChainHandler<C> {
    /// Current execution order snapshot
    pub fn chain(&self) -> Result<PluginChain<C>> {
        if let Some(chain) = &self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .chain
        {
            return Ok(Arc::clone(chain));
        }
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .chain()
    }

    /// Runs every plugin against `ctx` in order, then `terminal` if none of them stops the chain.
    ///
    /// Fails with `ChainError::ChainTooDeep` without running anything when the
    /// chain is longer than `RegistryConfig::max_chain_depth`.
    pub async fn handle<F>(&self, ctx: &mut C, terminal: F) -> std::result::Result<ChainOutcome, PluginError>
    where
        F: for<'c> FnOnce(&'c mut C) -> BoxFuture<'c, PluginResult> + Send + 'static,
    {
        let chain = self.chain()?;
        let max_depth = self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .max_depth;
        run_chain_with_depth(&chain, ctx, terminal, max_depth).await
    }
}
