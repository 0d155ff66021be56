//! Plugin lifecycle: wires the coordinator to the host and runs its
//! background tasks.

use std::sync::Arc;
use std::time::Duration;

use chase_common::Event;
use chase_config::ChaseConfig;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;

use crate::commands::CommandHandler;
use crate::coordinator::SessionCoordinator;
use crate::protocol::ProtocolBroadcaster;
use crate::registry::{ChatSink, ConnectionRegistry};

/// Feeds registry disconnect events into the coordinator.
///
/// The task stops on [`Event::Shutdown`], when the event stream closes, or
/// when this handle is dropped.
pub struct DisconnectSubscription {
    task: JoinHandle<()>,
}

impl DisconnectSubscription {
    pub fn spawn(
        mut events: broadcast::Receiver<Event>,
        coordinator: Arc<SessionCoordinator>,
    ) -> Self {
        let task = tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(Event::ParticipantDisconnected(participant)) => {
                        coordinator.on_participant_disconnected(&participant);
                    }
                    Ok(Event::Shutdown) => break,
                    Ok(_) => {}
                    Err(RecvError::Lagged(n)) => {
                        // Skipped events may include disconnects; check against the registry.
                        let resolved = coordinator.reconcile();
                        tracing::warn!(skipped = n, resolved, "Disconnect subscription lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            tracing::debug!("Disconnect subscription ended");
        });
        Self { task }
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for DisconnectSubscription {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// A running chase battle plugin.
pub struct ChasePlugin {
    coordinator: Arc<SessionCoordinator>,
    commands: Arc<CommandHandler>,
    subscription: DisconnectSubscription,
    reaper: Option<JoinHandle<()>>,
}

impl ChasePlugin {
    /// Build the coordinator and start the disconnect subscription and, if
    /// configured, the expiry reaper. Must be called inside a tokio runtime.
    pub fn start(
        config: &ChaseConfig,
        registry: Arc<dyn ConnectionRegistry>,
        sink: Arc<dyn ChatSink>,
    ) -> Self {
        let coordinator = Arc::new(SessionCoordinator::new(registry.clone(), sink.clone()));
        let commands = Arc::new(CommandHandler::new(
            config.plugin.clone(),
            coordinator.clone(),
            registry.clone(),
            ProtocolBroadcaster::new(sink),
        ));
        let subscription =
            DisconnectSubscription::spawn(registry.subscribe(), coordinator.clone());

        let reaper = config.battle.expiry_enabled().then(|| {
            let coordinator = coordinator.clone();
            let max_age = Duration::from_secs(config.battle.timeout_secs.into());
            let interval = Duration::from_secs(config.battle.reap_interval_secs.into());
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(interval).await;
                    let expired = coordinator.expire_stale(max_age);
                    tracing::debug!(expired, "Reaper tick");
                }
            })
        });

        if !config.plugin.enabled {
            tracing::warn!("Chase battles are disabled; commands will be refused");
        }
        tracing::info!(
            expiry_secs = config.battle.timeout_secs,
            "Chase battle plugin service started"
        );

        Self {
            coordinator,
            commands,
            subscription,
            reaper,
        }
    }

    pub fn coordinator(&self) -> &Arc<SessionCoordinator> {
        &self.coordinator
    }

    pub fn commands(&self) -> &Arc<CommandHandler> {
        &self.commands
    }

    pub fn reaper_running(&self) -> bool {
        self.reaper.as_ref().is_some_and(|task| !task.is_finished())
    }

    pub fn shutdown(self) {
        if let Some(reaper) = &self.reaper {
            reaper.abort();
        }
        self.subscription.task.abort();
        tracing::info!("Chase battle plugin service stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::CommandContext;
    use crate::test_support::{FakeRegistry, RecordingSink};
    use chase_common::ParticipantId;

    fn start(config: &ChaseConfig) -> (Arc<FakeRegistry>, Arc<RecordingSink>, ChasePlugin) {
        let registry = Arc::new(FakeRegistry::new(4));
        let sink = Arc::new(RecordingSink::default());
        let plugin = ChasePlugin::start(config, registry.clone(), sink.clone());
        (registry, sink, plugin)
    }

    async fn wait_for(mut condition: impl FnMut() -> bool) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while !condition() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("condition not reached in time");
    }

    #[tokio::test]
    async fn disconnect_event_ends_battle() {
        let (registry, sink, plugin) = start(&ChaseConfig::default());
        let alice = registry.connect(ParticipantId(0), "alice");
        let bob = registry.connect(ParticipantId(1), "bob");

        plugin
            .commands()
            .dispatch(&CommandContext::player(bob.clone()), "/chase 0");
        assert_eq!(plugin.coordinator().battle_count(), 1);

        registry.disconnect(bob.id);
        wait_for(|| plugin.coordinator().battle_count() == 0).await;

        assert!(sink.contains("Chase Result: alice WON! (Opponent Disconnected)"));
        assert_eq!(sink.direct_to(alice.id), vec!["CHASE_END:0"]);
        plugin.shutdown();
    }

    #[tokio::test]
    async fn lagged_subscription_still_ends_battle() {
        let (registry, sink, plugin) = start(&ChaseConfig::default());
        let alice = registry.connect(ParticipantId(0), "alice");
        let bob = registry.connect(ParticipantId(1), "bob");
        assert!(plugin.coordinator().try_start_battle(alice.clone(), bob.clone()));

        // Overflow the bus before the listener task gets to run, so bob's
        // disconnect is among the skipped events.
        registry.disconnect(bob.id);
        for _ in 0..70 {
            registry.connect(ParticipantId(2), "carol");
            registry.disconnect(ParticipantId(2));
        }
        wait_for(|| plugin.coordinator().battle_count() == 0).await;

        assert!(sink.contains("Chase Result: alice WON! (Opponent Disconnected)"));
        assert_eq!(sink.direct_to(alice.id), vec!["CHASE_END:0"]);
        plugin.shutdown();
    }

    #[tokio::test]
    async fn reaper_only_runs_when_expiry_enabled() {
        let (_, _, plugin) = start(&ChaseConfig::default());
        assert!(!plugin.reaper_running());
        plugin.shutdown();

        let mut config = ChaseConfig::default();
        config.battle.timeout_secs = 60;
        let (_, _, plugin) = start(&config);
        assert!(plugin.reaper_running());
        plugin.shutdown();
    }

    #[tokio::test]
    async fn subscription_stops_on_shutdown_event() {
        let registry = Arc::new(FakeRegistry::new(2));
        let sink = Arc::new(RecordingSink::default());
        let coordinator = Arc::new(SessionCoordinator::new(registry, sink));
        let (tx, rx) = broadcast::channel(8);

        let subscription = DisconnectSubscription::spawn(rx, coordinator);
        assert!(!subscription.is_finished());

        tx.send(Event::Shutdown).unwrap();
        wait_for(|| subscription.is_finished()).await;
    }

    #[tokio::test]
    async fn subscription_stops_when_stream_closes() {
        let registry = Arc::new(FakeRegistry::new(2));
        let sink = Arc::new(RecordingSink::default());
        let coordinator = Arc::new(SessionCoordinator::new(registry, sink));
        let (tx, rx) = broadcast::channel::<Event>(8);

        let subscription = DisconnectSubscription::spawn(rx, coordinator);
        drop(tx);
        wait_for(|| subscription.is_finished()).await;
    }
}
