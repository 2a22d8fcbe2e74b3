//! The seam through which the orchestrator announces game changes.
//!
//! The orchestrator lives below the connection hub in the crate graph, so
//! it can't name the hub. Instead the hub implements [`GameNotifier`] and
//! is handed to the orchestrator at wiring time.

use async_trait::async_trait;
use frogcafe_protocol::Game;

/// Receives every game state change the orchestrator commits.
///
/// Delivery is best-effort: an implementation logs its own failures and
/// never fails the operation that triggered it.
#[async_trait]
pub trait GameNotifier: Send + Sync + 'static {
    async fn game_updated(&self, game: &Game);
}
