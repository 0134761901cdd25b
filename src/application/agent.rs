//! The moderation agent: wiring, startup provisioning, and the sync loop.

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use futures::future::join_all;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::models::{
    Config, EnvironmentConfig, FilterConfig, Notice, RetryPolicy, SyncUpdate,
    ENVIRONMENT_EVENT_TYPE, FILTER_CONFIG_EVENT_TYPE, REDACTION_EVENT_TYPE,
};
use crate::domain::ports::{ChatClient, SyncSelector};
use crate::domain::DomainError;
use crate::services::{
    build_action_queue, ActionQueue, ConfigResolver, DispatchQueue, FilterFanout, InfoCache,
    RecencyTracker, Shutdown, TimelineReconciler,
};

/// Owns every process-scoped component (recency tracker, config cache,
/// queues) and injects them into the filters; nothing in the crate holds
/// ambient global state.
pub struct ModerationAgent {
    config: Config,
    client: Arc<dyn ChatClient>,
    resolver: Arc<ConfigResolver>,
    recency: Arc<RecencyTracker>,
    actions: Arc<dyn ActionQueue>,
    dispatch: Arc<DispatchQueue>,
    info: Arc<InfoCache>,
    reconciler: TimelineReconciler,
    fanout: FilterFanout,
}

impl ModerationAgent {
    pub fn new(config: Config, client: Arc<dyn ChatClient>) -> Result<Self> {
        let resolver = Arc::new(ConfigResolver::new());
        let recency = Arc::new(RecencyTracker::with_retention(
            config.queue.recency_retention,
        ));
        let actions = build_action_queue(&config.queue, Arc::clone(&recency));
        let dispatch = Arc::new(DispatchQueue::new(
            Arc::clone(&client),
            config.queue.log_messages,
            Duration::from_millis(config.queue.dispatch_interval_ms),
            config.queue.warn_depth,
        ));
        let info = Arc::new(InfoCache::new(Arc::clone(&client)));
        let retry = RetryPolicy::new(
            config.retry.max_retries,
            config.retry.initial_backoff_ms,
            config.retry.max_backoff_ms,
        );

        let filters = crate::services::filters::standard_filters(
            &client, &resolver, &actions, &dispatch, &info, &retry,
        );
        let fanout = FilterFanout::new(filters, Arc::clone(&resolver), Arc::clone(&dispatch))
            .context("wiring the filter fan-out")?;
        let reconciler =
            TimelineReconciler::new(Arc::clone(&client), config.reconciler.backfill_limit);

        Ok(Self {
            config,
            client,
            resolver,
            recency,
            actions,
            dispatch,
            info,
            reconciler,
            fanout,
        })
    }

    pub fn resolver(&self) -> &Arc<ConfigResolver> {
        &self.resolver
    }

    pub fn tracked_ids(&self) -> usize {
        self.recency.len()
    }

    /// Provision the agent's rooms and default configuration.
    ///
    /// Failures here are fatal: the caller should exit rather than attempt
    /// a graceful start without a log room or a default configuration.
    #[instrument(skip(self))]
    pub async fn startup(&self) -> Result<()> {
        let user_id = self.client.whoami().await.context("whoami failed")?;
        info!(user_id = %user_id, "authenticated");

        let mut environment: EnvironmentConfig =
            match self.client.get_account_data(ENVIRONMENT_EVENT_TYPE).await? {
                Some(blob) => {
                    serde_json::from_value(blob).map_err(|source| {
                        DomainError::InvalidAccountData {
                            kind: ENVIRONMENT_EVENT_TYPE.to_string(),
                            source,
                        }
                    })?
                }
                None => {
                    warn!("no environment configuration found, creating one");
                    EnvironmentConfig::default()
                }
            };

        let mut environment_changed = false;
        if environment.log_room_id.is_none() {
            let room_id = self
                .client
                .create_private_room("roomwarden logs", &self.config.admins)
                .await
                .context("creating the log room")?;
            info!(room_id = %room_id, "created log room");
            environment.log_room_id = Some(room_id);
            environment_changed = true;
        }
        if environment.control_room_id.is_none() {
            let room_id = self
                .client
                .create_private_room("roomwarden control room", &self.config.admins)
                .await
                .context("creating the control room")?;
            info!(room_id = %room_id, "created control room");
            environment.control_room_id = Some(room_id);
            environment_changed = true;
        }
        if environment_changed {
            self.client
                .set_account_data(
                    ENVIRONMENT_EVENT_TYPE,
                    &serde_json::to_value(&environment)?,
                )
                .await
                .context("persisting the environment configuration")?;
        }
        self.resolver.set_environment(environment);

        let mut filter_config: FilterConfig = match self
            .client
            .get_account_data(FILTER_CONFIG_EVENT_TYPE)
            .await?
        {
            Some(blob) => serde_json::from_value(blob).map_err(|source| {
                DomainError::InvalidAccountData {
                    kind: FILTER_CONFIG_EVENT_TYPE.to_string(),
                    source,
                }
            })?,
            None => {
                warn!("no filter configuration found, creating one");
                self.audit(Notice::colored(
                    "#FF0000",
                    "No filter configuration found, creating one",
                ));
                FilterConfig::default()
            }
        };

        let mut seed = vec![user_id];
        seed.extend(self.config.admins.iter().cloned());
        let changes = filter_config.fill_defaults(&seed);
        if !changes.is_empty() {
            self.client
                .set_account_data(
                    FILTER_CONFIG_EVENT_TYPE,
                    &serde_json::to_value(&filter_config)?,
                )
                .await
                .context("persisting the default filter configuration")?;

            let detail = changes
                .iter()
                .map(|(key, value)| format!("{key} = {value}"))
                .collect::<Vec<_>>()
                .join("\n");
            self.audit(
                Notice::colored("#FF0000", "Default filter configuration updated")
                    .with_section("Provisioned fields", &detail),
            );
        }
        self.resolver.set_default(filter_config);

        self.audit(Notice::colored(
            "#00FF00",
            "Agent startup successful! Listening for events.",
        ));
        let filter_list = self
            .fanout
            .filters()
            .iter()
            .map(|f| f.name().to_owned())
            .collect::<Vec<_>>()
            .join("\n");
        self.audit(
            Notice::colored("#00FF00", "Registered filters:")
                .with_section("Filters", &filter_list),
        );

        Ok(())
    }

    /// Start the queue drain loops.
    pub fn spawn_queues(
        &self,
        shutdown: &Shutdown,
    ) -> (tokio::task::JoinHandle<()>, tokio::task::JoinHandle<()>) {
        (
            tokio::spawn(Arc::clone(&self.actions).run(shutdown.clone())),
            tokio::spawn(Arc::clone(&self.dispatch).run(shutdown.clone())),
        )
    }

    /// Work accepted by the queues but not yet started.
    pub fn pending_work(&self) -> usize {
        self.actions.pending() + self.dispatch.depth()
    }

    /// Drive the delivery loop until shutdown, then drain the queues.
    pub async fn run(&self, shutdown: Shutdown) -> Result<()> {
        let (action_loop, dispatch_loop) = self.spawn_queues(&shutdown);

        let mut since: Option<String> = None;
        let mut primed = false;

        while !shutdown.is_requested() {
            let selector = SyncSelector {
                exclude_rooms: self.resolver.reserved_rooms(),
                exclude_types: vec![REDACTION_EVENT_TYPE.to_string()],
                timeline_limit: self.config.reconciler.timeline_limit,
            };

            let update = tokio::select! {
                update = self.client.next_update(
                    since.as_deref(),
                    &selector,
                    self.config.sync.timeout_ms,
                ) => update,
                () = shutdown.requested() => break,
            };

            match update {
                Ok(mut update) => {
                    since = Some(update.next_batch.clone());
                    self.apply_account_data(&update).await;

                    if !primed {
                        // the first response replays old state; prime the
                        // checkpoint and configuration without moderating
                        primed = true;
                        debug!("initial sync primed");
                        continue;
                    }

                    self.process_cycle(&mut update).await;
                }
                Err(err) => {
                    error!("sync failed: {err}");
                    self.audit(Notice::plain(format!("Error processing sync: {err}")));
                    tokio::select! {
                        () = tokio::time::sleep(Duration::from_secs(
                            self.config.sync.error_backoff_secs,
                        )) => {}
                        () = shutdown.requested() => break,
                    }
                }
            }
        }

        info!("shutting down, draining queues");
        let drain = async {
            let _ = action_loop.await;
            let _ = dispatch_loop.await;
        };
        if tokio::time::timeout(
            Duration::from_secs(self.config.shutdown_timeout_secs),
            drain,
        )
        .await
        .is_err()
        {
            warn!("shutdown timeout elapsed with work still pending");
        }

        Ok(())
    }

    /// Push account-data updates (default config, environment, per-room
    /// overrides) into the resolver before the cycle is moderated.
    async fn apply_account_data(&self, update: &SyncUpdate) {
        for event in &update.account_data {
            match event.kind.as_str() {
                ENVIRONMENT_EVENT_TYPE => {
                    match serde_json::from_value::<EnvironmentConfig>(event.content.clone()) {
                        Ok(environment) => {
                            self.resolver.set_environment(environment);
                            self.audit(Notice::colored(
                                "#FF0088",
                                "Environment configuration updated from sync.",
                            ));
                        }
                        Err(err) => warn!("ignoring malformed environment update: {err}"),
                    }
                }
                FILTER_CONFIG_EVENT_TYPE => {
                    match serde_json::from_value::<FilterConfig>(event.content.clone()) {
                        Ok(config) => {
                            let detail = serde_json::to_string_pretty(&config)
                                .unwrap_or_else(|_| String::new());
                            self.resolver.set_default(config);
                            self.audit(
                                Notice::colored(
                                    "#00FF88",
                                    "Default filter configuration updated from sync.",
                                )
                                .with_section("JSON data", &detail),
                            );
                        }
                        Err(err) => warn!("ignoring malformed filter configuration: {err}"),
                    }
                }
                _ => {}
            }
        }

        for (room_id, events) in &update.room_account_data {
            if self.resolver.is_reserved_room(room_id) {
                continue;
            }
            for event in events {
                if event.kind != FILTER_CONFIG_EVENT_TYPE {
                    continue;
                }
                match serde_json::from_value::<FilterConfig>(event.content.clone()) {
                    Ok(config) => {
                        let detail = serde_json::to_string_pretty(&config)
                            .unwrap_or_else(|_| String::new());
                        self.resolver.set_override(room_id, config);
                        let room_name = self.info.room_name(room_id).await;
                        self.audit(
                            Notice::colored(
                                "#00FF88",
                                format!(
                                    "Filter configuration updated for {room_name} ({room_id}) from sync."
                                ),
                            )
                            .with_section("JSON data", &detail),
                        );
                    }
                    Err(err) => {
                        warn!(room_id = %room_id, "ignoring malformed room override: {err}");
                    }
                }
            }
        }
    }

    /// Reconcile and fan out one delivery cycle.
    #[instrument(skip(self, update), fields(rooms = update.batches.len()))]
    async fn process_cycle(&self, update: &mut SyncUpdate) {
        update.strip_rooms(&self.resolver.reserved_rooms());

        for batch in update.batches.iter().filter(|b| b.truncated) {
            self.audit(Notice::colored(
                "#FF0000",
                format!(
                    "Room {} delivered a truncated timeline, backfilling. The room may be getting spammed?",
                    batch.room_id
                ),
            ));
        }

        let failures = self.reconciler.reconcile_all(&mut update.batches).await;
        for (room_id, err) in failures {
            self.audit(
                Notice::plain(format!(
                    "Backfill for {room_id} failed; processing the delivered events only"
                ))
                .with_section("Error data", &err.to_string()),
            );
        }

        let started = Instant::now();
        let actions_before = self.fanout.action_count();

        let batches = std::mem::take(&mut update.batches);
        join_all(
            batches
                .into_iter()
                .map(|batch| self.fanout.process_batch(batch)),
        )
        .await;

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            actions = self.fanout.action_count() - actions_before,
            "sync cycle processed"
        );
    }

    /// Re-apply every filter to the last `count` messages of a room.
    pub async fn check_history(&self, room_id: &str, count: u32) -> Result<()> {
        let joined = self
            .client
            .joined_rooms()
            .await
            .map_err(DomainError::Client)
            .context("enumerating joined rooms")?;
        if !joined.iter().any(|room| room == room_id) {
            anyhow::bail!("agent is not joined to {room_id}");
        }

        let room_name = self.info.room_name(room_id).await;
        self.audit(Notice::plain(format!(
            "Re-applying filters to the last {count} messages in {room_name} ({room_id})"
        )));

        let excluded = vec![REDACTION_EVENT_TYPE.to_string()];
        let mut remaining = count;
        let mut token = String::new();

        while remaining > 0 {
            let page = self
                .client
                .room_messages(room_id, &token, remaining.min(250), &excluded)
                .await
                .map_err(DomainError::Client)
                .with_context(|| format!("fetching history for {room_id}"))?;
            if page.events.is_empty() {
                break;
            }

            remaining = remaining.saturating_sub(page.events.len() as u32);

            let mut events = page.events;
            for event in &mut events {
                event.room_id.get_or_insert_with(|| room_id.to_owned());
            }
            self.fanout.process_event_list(events).await;

            match page.next_token {
                Some(next) => token = next,
                None => break,
            }
        }

        Ok(())
    }

    /// Queue a notice to the log room, when one is configured.
    fn audit(&self, notice: Notice) {
        if let Some(log_room) = self.resolver.log_room_id() {
            self.dispatch.enqueue(log_room, notice);
        }
    }
}
