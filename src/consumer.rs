//! Update consumer
//!
//! Fetches batches from the [`UpdateSource`], fans each batch out by user and
//! waits for the whole batch before fetching again. A user's events run one
//! after another in arrival order; different users run concurrently. Every
//! event gets a deadline, and an overrun resets that user's session.

use crate::channels::{Event, UpdateSource};
use crate::config::BotConfig;
use crate::error::Error;
use crate::processor::Processor;
use futures::future::join_all;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

/// Pause after a failed fetch
const RETRY_DELAY: Duration = Duration::from_secs(1);

pub struct Consumer {
    source: Arc<dyn UpdateSource>,
    processor: Arc<Processor>,
    batch_size: usize,
    event_timeout: Duration,
    idle_ttl: Duration,
    sweep_interval: Duration,
}

impl Consumer {
    pub fn new(source: Arc<dyn UpdateSource>, processor: Arc<Processor>, config: &BotConfig) -> Self {
        Self {
            source,
            processor,
            batch_size: config.telegram.batch_size,
            event_timeout: config.session.event_timeout(),
            idle_ttl: config.session.idle_ttl(),
            sweep_interval: config.session.sweep_interval(),
        }
    }

    /// Deadline for a single event
    pub fn with_event_timeout(mut self, timeout: Duration) -> Self {
        self.event_timeout = timeout;
        self
    }

    /// Consume until `shutdown` resolves. The batch in flight is dropped.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let sweeper = self.spawn_sweeper();
        tracing::info!(
            "Consuming updates (batch size {}, event timeout {:?})",
            self.batch_size,
            self.event_timeout
        );

        tokio::select! {
            _ = self.poll_loop() => {}
            _ = shutdown => tracing::info!("Shutdown requested"),
        }
        sweeper.abort();
    }

    async fn poll_loop(&self) {
        loop {
            match self.source.fetch(self.batch_size).await {
                Ok(events) if events.is_empty() => {}
                Ok(events) => self.dispatch(events).await,
                Err(e) => {
                    tracing::error!(error = %e.report(), "Failed to fetch updates");
                    tokio::time::sleep(RETRY_DELAY).await;
                }
            }
        }
    }

    /// Process one batch; returns when every event in it is done
    pub async fn dispatch(&self, events: Vec<Event>) {
        let batch = group_by_user(events);
        tracing::debug!("Dispatching batch for {} users", batch.len());

        let tasks = batch.into_iter().map(|(_, events)| {
            let processor = self.processor.clone();
            let timeout = self.event_timeout;
            tokio::spawn(async move {
                for event in events {
                    process_with_deadline(&processor, &event, timeout).await;
                }
            })
        });

        for result in join_all(tasks).await {
            if let Err(e) = result {
                tracing::error!(error = %e, "Event task panicked");
            }
        }
    }

    fn spawn_sweeper(&self) -> tokio::task::JoinHandle<()> {
        let sessions = self.processor.sessions().clone();
        let ttl_ms = i64::try_from(self.idle_ttl.as_millis()).unwrap_or(i64::MAX);
        let period = self.sweep_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // First tick is immediate
            ticker.tick().await;
            loop {
                ticker.tick().await;
                sessions.cleanup_inactive(ttl_ms).await;
            }
        })
    }
}

async fn process_with_deadline(processor: &Processor, event: &Event, timeout: Duration) {
    match tokio::time::timeout(timeout, processor.process(event)).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            tracing::error!(
                user_id = event.user_id,
                update_id = event.update_id,
                error = %e.report(),
                "Failed to process event"
            );
        }
        Err(_) => {
            tracing::error!(
                user_id = event.user_id,
                update_id = event.update_id,
                error = %Error::Timeout(timeout),
                "Event processing overran its deadline"
            );
            processor.reset_session(event.user_id).await;
        }
    }
}

/// Split a batch per user, keeping each user's arrival order
fn group_by_user(events: Vec<Event>) -> Vec<(i64, Vec<Event>)> {
    let mut index: HashMap<i64, usize> = HashMap::new();
    let mut groups: Vec<(i64, Vec<Event>)> = Vec::new();
    for event in events {
        match index.get(&event.user_id) {
            Some(&i) => groups[i].1.push(event),
            None => {
                index.insert(event.user_id, groups.len());
                groups.push((event.user_id, vec![event]));
            }
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::mock::RecordingGateway;
    use crate::error::Result;
    use crate::processor::messages;
    use crate::session::{Operation, SessionManager};
    use crate::storage::SqliteStorage;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Hands out scripted batches, then errors
    struct ScriptedSource {
        batches: Mutex<VecDeque<Vec<Event>>>,
    }

    impl ScriptedSource {
        fn new(batches: Vec<Vec<Event>>) -> Self {
            Self {
                batches: Mutex::new(batches.into()),
            }
        }
    }

    #[async_trait]
    impl UpdateSource for ScriptedSource {
        async fn fetch(&self, limit: usize) -> Result<Vec<Event>> {
            let next = self.batches.lock().unwrap().pop_front();
            match next {
                Some(batch) => {
                    assert!(batch.len() <= limit);
                    Ok(batch)
                }
                None => Err(Error::Channel("no more updates".to_string())),
            }
        }
    }

    fn say(user: i64, text: &str) -> Event {
        Event::message(user, user, format!("user{}", user), text)
    }

    fn setup(batches: Vec<Vec<Event>>) -> (Consumer, Arc<RecordingGateway>) {
        let gateway = Arc::new(RecordingGateway::new());
        let storage = Arc::new(SqliteStorage::open_in_memory().unwrap());
        let processor = Arc::new(Processor::new(
            gateway.clone(),
            storage,
            Arc::new(SessionManager::new()),
        ));
        let consumer = Consumer::new(
            Arc::new(ScriptedSource::new(batches)),
            processor,
            &BotConfig::default(),
        );
        (consumer, gateway)
    }

    #[test]
    fn test_group_by_user_keeps_order() {
        let groups = group_by_user(vec![
            say(1, "a"),
            say(2, "b"),
            say(1, "c"),
            say(3, "d"),
            say(2, "e"),
        ]);

        let shape: Vec<(i64, Vec<String>)> = groups
            .into_iter()
            .map(|(user, events)| (user, events.into_iter().map(|e| e.text).collect()))
            .collect();
        assert_eq!(
            shape,
            vec![
                (1, vec!["a".to_string(), "c".to_string()]),
                (2, vec!["b".to_string(), "e".to_string()]),
                (3, vec!["d".to_string()]),
            ]
        );
    }

    #[tokio::test]
    async fn test_dispatch_runs_user_events_in_order() {
        let (consumer, gateway) = setup(vec![]);

        consumer
            .dispatch(vec![
                say(1, "/create_folder"),
                say(2, "/start"),
                say(1, "Recipes"),
                say(1, "/show_folder"),
            ])
            .await;

        assert_eq!(
            gateway.texts(1),
            vec![
                messages::ENTER_FOLDER_NAME,
                messages::FOLDER_CREATED,
                messages::CHOOSE_FOLDER
            ]
        );
        assert_eq!(gateway.texts(2), vec![messages::HELLO]);
    }

    #[tokio::test]
    async fn test_failed_event_does_not_stop_batch() {
        let (consumer, gateway) = setup(vec![]);
        gateway.fail_deletes(true);

        let mut press = Event::callback(
            1,
            1,
            "user1",
            crate::channels::Callback {
                id: "cb".to_string(),
                data: "op:back".to_string(),
                message_id: Some(7),
            },
        );
        press.update_id = 1;
        consumer.dispatch(vec![press, say(1, "/help")]).await;

        assert_eq!(gateway.last_text(1).unwrap(), messages::HELP);
    }

    #[tokio::test(start_paused = true)]
    async fn test_overrun_resets_session() {
        let (consumer, _gateway) = setup(vec![]);
        let consumer = consumer.with_event_timeout(Duration::from_millis(50));
        let processor = consumer.processor.clone();

        consumer.dispatch(vec![say(1, "/create_folder")]).await;
        assert_eq!(
            processor.sessions().snapshot(1).await.unwrap().operation,
            Operation::CreateFolder
        );

        // Hold the user's session so the next event can't finish in time
        let held = processor.sessions().acquire(1).await;
        let release = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            drop(held);
        });
        consumer.dispatch(vec![say(1, "Recipes")]).await;
        release.await.unwrap();

        assert_eq!(
            processor.sessions().snapshot(1).await.unwrap().operation,
            Operation::Idle
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let (consumer, gateway) = setup(vec![vec![say(1, "/start")]]);

        consumer
            .run(tokio::time::sleep(Duration::from_secs(5)))
            .await;

        assert_eq!(gateway.texts(1), vec![messages::HELLO]);
    }
}
