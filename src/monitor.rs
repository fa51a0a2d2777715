//! PeerMonitor: on a fixed period, probe every configured peer and
//! spawn a reconciliation pass on every down-to-up transition,
//! including the first time a peer is ever seen reachable.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::node::NodeContext;
use crate::protocol::probe_peer;
use crate::reconcile::sync_with_peer;

pub async fn run_peer_monitor(ctx: Arc<NodeContext>, interval: Duration) {
	// Absent from this map reads as "was down": never-seen counts as
	// a reconnection the first time a probe succeeds.
	let mut was_down: HashMap<String, bool> = HashMap::new();
	let mut ticker = tokio::time::interval(interval);

	loop {
		ticker.tick().await;

		let peers: Vec<_> = ctx.other_peers().cloned().collect();
		for peer in peers {
			let addr = peer.address();
			let alive = probe_peer(&addr).await;
			let previously_down = *was_down.get(&peer.ip).unwrap_or(&true);

			if alive && previously_down {
				tracing::info!(peer = %addr, "reconnection detected");
				let ctx = ctx.clone();
				let peer = peer.clone();
				tokio::spawn(async move {
					if let Err(e) = sync_with_peer(ctx, peer).await {
						tracing::warn!(error = %e, "reconciliation after reconnection failed");
					}
				});
			}
			was_down.insert(peer.ip.clone(), !alive);

			if let Err(e) = ctx.state.set_online_status(&peer.ip, alive) {
				tracing::warn!(error = %e, "failed to persist online status");
			}
		}
	}
}
