//! Continuation-passing execution of an ordered plugin chain.

use crate::traits::{BoxFuture, ChainState, Next, Plugin, PluginError, PluginResult};
use plugchain_common::{ChainError, DEFAULT_MAX_CHAIN_DEPTH};
use std::sync::Arc;
use tracing::{debug, debug_span, Instrument};

/// How a chain invocation ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainOutcome {
    /// Every plugin continued and the fall-through continuation ran
    Completed,

    /// A plugin returned without running its continuation
    Terminated { plugin: String },
}

impl ChainOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, ChainOutcome::Completed)
    }

    /// Id of the plugin that stopped the chain, if any
    pub fn terminated_by(&self) -> Option<&str> {
        match self {
            ChainOutcome::Completed => None,
            ChainOutcome::Terminated { plugin } => Some(plugin),
        }
    }
}

/// Runs `plugins` in order against `ctx`, then `terminal` if nobody stops the chain.
///
/// Errors returned by a plugin (or by `terminal`) are passed through untouched;
/// plugins that already ran get to observe them as the result of `next.run`.
/// Chains longer than [`DEFAULT_MAX_CHAIN_DEPTH`] are refused, see [`run_chain_with_depth`].
pub async fn run_chain<'a, C, F>(
    plugins: &'a [Arc<dyn Plugin<C>>],
    ctx: &mut C,
    terminal: F,
) -> Result<ChainOutcome, PluginError>
where
    C: Send + 'static,
    F: for<'c> FnOnce(&'c mut C) -> BoxFuture<'c, PluginResult> + Send + 'a,
{
    run_chain_with_depth(plugins, ctx, terminal, DEFAULT_MAX_CHAIN_DEPTH).await
}

/// Like [`run_chain`], with an explicit cap on the chain length.
///
/// Every plugin nests one more future inside the previous one, so polling
/// depth grows with the chain. A chain longer than `max_depth` fails with
/// [`ChainError::ChainTooDeep`] before any plugin runs.
pub async fn run_chain_with_depth<'a, C, F>(
    plugins: &'a [Arc<dyn Plugin<C>>],
    ctx: &mut C,
    terminal: F,
    max_depth: usize,
) -> Result<ChainOutcome, PluginError>
where
    C: Send + 'static,
    F: for<'c> FnOnce(&'c mut C) -> BoxFuture<'c, PluginResult> + Send + 'a,
{
    if plugins.len() > max_depth {
        return Err(ChainError::ChainTooDeep {
            len: plugins.len(),
            max: max_depth,
        }
        .into());
    }

    let state = ChainState::default();
    let next = Next::new(plugins, Box::new(terminal), &state);

    next.run(ctx)
        .instrument(debug_span!("chain", plugins = plugins.len()))
        .await?;

    if state.completed() {
        return Ok(ChainOutcome::Completed);
    }

    let plugin = plugins[state.reached()].id().to_string();
    debug!(plugin = %plugin, index = state.reached(), "Chain terminated early");
    Ok(ChainOutcome::Terminated { plugin })
}
