use crate::config::SyncConfig;
use crate::connection::{Action, ConnectionManager, ConnectionState, ReconnectTimer, TransportMode};
use crate::payload::{decode_snapshot, PayloadError};
use crate::reconcile::{reconcile, HeldCollection, ItemChange};
use crate::transport::{Transport, TransportError};
use crate::{Banner, Snapshot, StatusItem, SyncLabel};
use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub snapshots_applied: u64,
    pub malformed_payloads: u64,
    pub transport_failures: u64,
    pub reconnect_attempts: u64,
    pub last_applied_at: Option<DateTime<Utc>>,
}

/// Everything the rendering layer needs to draw the board.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BoardView {
    pub items: Vec<StatusItem>,
    pub banner: Banner,
    pub sync_label: SyncLabel,
    pub live: bool,
    pub connection: ConnectionState,
    pub mode: TransportMode,
    pub stats: SyncStats,
}

pub trait BoardObserver {
    /// Called after every state change. `changes` is empty when only the
    /// connection state or the label moved.
    fn board_changed(&mut self, view: &BoardView, changes: &[ItemChange]);
}

/// Owns the held collection and drives one transport on a single task.
pub struct SyncClient<T, O> {
    config: SyncConfig,
    transport: T,
    observer: O,
    held: HeldCollection,
    connection: ConnectionManager,
    banner: Banner,
    sync_label: SyncLabel,
    live: bool,
    stats: SyncStats,
}

impl<T: Transport, O: BoardObserver> SyncClient<T, O> {
    pub fn new(config: SyncConfig, transport: T, observer: O) -> Self {
        let connection = ConnectionManager::new(
            transport.push_supported(),
            config.poll_interval,
            config.reconnect_delay,
        );
        Self {
            config,
            transport,
            observer,
            held: HeldCollection::new(),
            connection,
            banner: Banner::Hidden,
            sync_label: SyncLabel::Pending,
            live: false,
            stats: SyncStats::default(),
        }
    }

    pub fn held(&self) -> &HeldCollection {
        &self.held
    }

    pub fn banner(&self) -> Banner {
        self.banner
    }

    pub fn sync_label(&self) -> &SyncLabel {
        &self.sync_label
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.connection
    }

    pub fn stats(&self) -> &SyncStats {
        &self.stats
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    pub fn view(&self) -> BoardView {
        BoardView {
            items: self.held.to_vec(),
            banner: self.banner,
            sync_label: self.sync_label.clone(),
            live: self.live,
            connection: self.connection.state(),
            mode: self.connection.mode(),
            stats: self.stats.clone(),
        }
    }

    /// Decodes and applies one payload. Malformed payloads are dropped
    /// without touching the board.
    pub fn apply_payload(&mut self, raw: &str) -> Result<(), PayloadError> {
        match decode_snapshot(raw, self.config.max_payload_bytes) {
            Ok(snapshot) => {
                self.apply_snapshot(snapshot);
                Ok(())
            }
            Err(err) => {
                self.stats.malformed_payloads += 1;
                warn!(
                    event = "payload_malformed",
                    mode = self.connection.mode().as_str(),
                    error = %err
                );
                Err(err)
            }
        }
    }

    pub fn apply_snapshot(&mut self, snapshot: Snapshot) {
        let report = reconcile(&mut self.held, snapshot);
        self.banner = report.banner;
        self.sync_label = report.sync_label;
        self.live = report.live;
        self.stats.snapshots_applied += 1;
        self.stats.last_applied_at = Some(Utc::now());
        debug!(
            event = "snapshot_applied",
            items = self.held.len(),
            changes = report.changes.len(),
            live = self.live
        );
        self.notify(&report.changes);
    }

    /// Records a transport failure and returns the pending reconnect.
    ///
    /// The held collection is left as-is; only the label changes.
    pub fn transport_failed(&mut self, err: TransportError) -> Action {
        self.stats.transport_failures += 1;
        warn!(
            event = "transport_failure",
            mode = self.connection.mode().as_str(),
            error = %err
        );
        let timer = self.connection.transport_failed(Instant::now());
        self.sync_label = SyncLabel::Reconnecting;
        match timer {
            ReconnectTimer::Scheduled(_) => {
                info!(
                    event = "reconnect_scheduled",
                    delay_secs = self.config.reconnect_delay.as_secs()
                );
                self.notify(&[]);
            }
            ReconnectTimer::AlreadyPending(_) => {
                debug!(event = "reconnect_already_pending");
            }
        }
        Action::AwaitReconnect(timer.deadline())
    }

    /// Runs until the task is dropped. Every failure is retried.
    pub async fn run(&mut self) {
        let mut action = self.connection.connect();
        self.notify(&[]);
        loop {
            action = self.step(action).await;
        }
    }

    pub async fn step(&mut self, action: Action) -> Action {
        match action {
            Action::OpenPush => self.run_push().await,
            Action::Poll => self.poll_once().await,
            Action::SchedulePoll(delay) => {
                tokio::time::sleep(delay).await;
                self.connection.poll_due()
            }
            Action::AwaitReconnect(deadline) => {
                tokio::time::sleep_until(deadline).await;
                self.stats.reconnect_attempts += 1;
                let next = self.connection.reconnect_fired();
                info!(
                    event = "reconnect_attempt",
                    attempt = self.stats.reconnect_attempts,
                    mode = self.connection.mode().as_str()
                );
                self.notify(&[]);
                next
            }
        }
    }

    async fn run_push(&mut self) -> Action {
        if let Err(err) = self.transport.open_push().await {
            return self.transport_failed(err);
        }
        self.connection.push_opened();
        info!(event = "push_connected");
        self.notify(&[]);
        loop {
            match self.transport.next_message().await {
                Some(Ok(raw)) => {
                    if self.apply_payload(&raw).is_err() {
                        self.notify(&[]);
                    }
                }
                Some(Err(err)) => return self.transport_failed(err),
                None => {
                    return self.transport_failed(TransportError::Closed {
                        code: None,
                        reason: String::new(),
                    })
                }
            }
        }
    }

    async fn poll_once(&mut self) -> Action {
        match self.transport.fetch().await {
            Ok(body) => {
                let next = self.connection.poll_succeeded();
                if self.apply_payload(&body).is_err() {
                    self.notify(&[]);
                }
                next
            }
            Err(TransportError::Oversized { max }) => {
                let next = self.connection.poll_succeeded();
                self.stats.malformed_payloads += 1;
                warn!(event = "payload_oversized", mode = "pull", max);
                self.notify(&[]);
                next
            }
            Err(err) => self.transport_failed(err),
        }
    }

    fn notify(&mut self, changes: &[ItemChange]) {
        let view = self.view();
        self.observer.board_changed(&view, changes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_server_url;
    use std::collections::VecDeque;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingObserver {
        views: Vec<BoardView>,
        changes: Vec<Vec<ItemChange>>,
    }

    impl BoardObserver for RecordingObserver {
        fn board_changed(&mut self, view: &BoardView, changes: &[ItemChange]) {
            self.views.push(view.clone());
            self.changes.push(changes.to_vec());
        }
    }

    #[derive(Default)]
    struct ScriptedTransport {
        push: bool,
        opens: VecDeque<Result<(), TransportError>>,
        messages: VecDeque<Option<Result<String, TransportError>>>,
        fetches: VecDeque<Result<String, TransportError>>,
        open_calls: usize,
        fetch_calls: usize,
    }

    impl Transport for ScriptedTransport {
        fn push_supported(&self) -> bool {
            self.push
        }

        async fn open_push(&mut self) -> Result<(), TransportError> {
            self.open_calls += 1;
            self.opens
                .pop_front()
                .unwrap_or(Err(TransportError::Connect("refused".to_string())))
        }

        async fn next_message(&mut self) -> Option<Result<String, TransportError>> {
            self.messages.pop_front().unwrap_or(None)
        }

        async fn fetch(&mut self) -> Result<String, TransportError> {
            self.fetch_calls += 1;
            self.fetches.pop_front().unwrap_or(Err(TransportError::Timeout))
        }
    }

    fn config() -> SyncConfig {
        SyncConfig::new(parse_server_url("http://127.0.0.1:5555").unwrap())
    }

    fn client(transport: ScriptedTransport) -> SyncClient<ScriptedTransport, RecordingObserver> {
        SyncClient::new(config(), transport, RecordingObserver::default())
    }

    fn body(lines: &[(&str, &str, &str)], updated: &str, live: bool) -> String {
        let lines: Vec<StatusItem> = lines
            .iter()
            .map(|(id, label, status)| StatusItem::new(*id, *label, *status))
            .collect();
        serde_json::to_string(&Snapshot {
            lines,
            updated: updated.to_string(),
            live,
        })
        .unwrap()
    }

    fn ids(client: &SyncClient<ScriptedTransport, RecordingObserver>) -> Vec<String> {
        client.held().ids().to_vec()
    }

    #[test]
    fn malformed_payload_is_dropped_and_counted() {
        let mut client = client(ScriptedTransport::default());
        client
            .apply_payload(&body(&[("a", "Alpha", "ok")], "t1", true))
            .unwrap();

        let result = client.apply_payload(r#"{"lines": "nope"}"#);
        assert!(matches!(result, Err(PayloadError::Malformed(_))));
        assert_eq!(ids(&client), vec!["a".to_string()]);
        assert_eq!(client.sync_label(), &SyncLabel::Updated("t1".to_string()));
        assert_eq!(client.stats().malformed_payloads, 1);
        assert_eq!(client.stats().snapshots_applied, 1);
    }

    #[test]
    fn transport_failure_keeps_items_and_shows_reconnecting() {
        let mut client = client(ScriptedTransport::default());
        client
            .apply_payload(&body(&[("a", "Alpha", "ok")], "t1", true))
            .unwrap();

        let action = client.transport_failed(TransportError::Closed {
            code: Some(1006),
            reason: String::new(),
        });
        assert!(matches!(action, Action::AwaitReconnect(_)));
        assert_eq!(client.sync_label(), &SyncLabel::Reconnecting);
        assert_eq!(ids(&client), vec!["a".to_string()]);
        let last = client.observer().views.last().unwrap();
        assert_eq!(last.sync_label.to_string(), "Reconnecting…");
        assert_eq!(last.connection, ConnectionState::Reconnecting);
    }

    #[test]
    fn back_to_back_failures_share_one_timer() {
        let mut client = client(ScriptedTransport::default());
        let first = client.transport_failed(TransportError::Timeout);
        let notified = client.observer().views.len();
        let second = client.transport_failed(TransportError::Status(502));

        assert_eq!(first, second);
        assert_eq!(client.observer().views.len(), notified);
        assert_eq!(client.stats().transport_failures, 2);
        assert!(client.connection().reconnect_pending());
    }

    #[test]
    fn zero_item_snapshot_resets_board() {
        let mut client = client(ScriptedTransport::default());
        client
            .apply_payload(&body(
                &[("a", "Alpha", "ok"), ("b", "Bravo", "ok")],
                "t1",
                true,
            ))
            .unwrap();
        client.apply_payload(&body(&[], "t3", false)).unwrap();

        assert!(client.held().is_empty());
        assert_eq!(client.banner(), Banner::Disconnected);
        let view = client.view();
        assert!(view.items.is_empty());
        assert_eq!(view.banner.message(), Banner::Disconnected.message());
        assert!(!view.live);
    }

    #[tokio::test(start_paused = true)]
    async fn push_messages_are_reconciled_in_order() {
        let transport = ScriptedTransport {
            push: true,
            opens: VecDeque::from([Ok(())]),
            messages: VecDeque::from([
                Some(Ok(body(&[("a", "Bravo", "down")], "t1", true))),
                Some(Ok("garbage".to_string())),
                Some(Ok(body(
                    &[("b", "Alpha", "up"), ("a", "Bravo", "up")],
                    "t2",
                    true,
                ))),
                Some(Err(TransportError::Io("reset by peer".to_string()))),
            ]),
            ..ScriptedTransport::default()
        };
        let mut client = client(transport);

        let action = client.step(Action::OpenPush).await;

        assert!(matches!(action, Action::AwaitReconnect(_)));
        assert_eq!(ids(&client), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(client.held().get("a").unwrap().status_en, "up");
        assert_eq!(client.stats().malformed_payloads, 1);
        assert_eq!(client.sync_label(), &SyncLabel::Reconnecting);
        let labels: Vec<String> = client
            .observer()
            .views
            .iter()
            .map(|view| view.sync_label.to_string())
            .collect();
        assert_eq!(
            labels,
            vec![
                "Waiting for first update…".to_string(),
                "t1".to_string(),
                "t1".to_string(),
                "t2".to_string(),
                "Reconnecting…".to_string(),
            ]
        );
        let dropped: Vec<u64> = client
            .observer()
            .views
            .iter()
            .map(|view| view.stats.malformed_payloads)
            .collect();
        assert_eq!(dropped, vec![0, 0, 1, 1, 1]);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_waits_fixed_delay_then_reopens_push() {
        let transport = ScriptedTransport {
            push: true,
            opens: VecDeque::from([Err(TransportError::Connect("refused".to_string())), Ok(())]),
            ..ScriptedTransport::default()
        };
        let mut client = client(transport);
        let started = Instant::now();

        let action = client.step(Action::OpenPush).await;
        let Action::AwaitReconnect(deadline) = action else {
            panic!("expected reconnect, got {action:?}")
        };
        assert_eq!(deadline - started, Duration::from_secs(10));

        let action = client.step(action).await;
        assert_eq!(action, Action::OpenPush);
        assert_eq!(Instant::now() - started, Duration::from_secs(10));
        assert_eq!(client.connection().state(), ConnectionState::Connecting);
        assert!(!client.connection().reconnect_pending());
        assert_eq!(client.stats().reconnect_attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn pull_mode_polls_every_interval() {
        let transport = ScriptedTransport {
            push: false,
            fetches: VecDeque::from([
                Ok(body(&[("a", "Alpha", "ok")], "t1", true)),
                Ok(body(&[("a", "Alpha", "delayed")], "t2", true)),
            ]),
            ..ScriptedTransport::default()
        };
        let mut client = client(transport);
        let started = Instant::now();

        let action = client.connection.connect();
        assert_eq!(action, Action::Poll);
        let action = client.step(action).await;
        assert_eq!(action, Action::SchedulePoll(Duration::from_secs(10)));
        assert_eq!(client.connection().state(), ConnectionState::Connected);

        let action = client.step(action).await;
        assert_eq!(action, Action::Poll);
        assert_eq!(Instant::now() - started, Duration::from_secs(10));

        client.step(action).await;
        assert_eq!(client.held().get("a").unwrap().status_en, "delayed");
        assert_eq!(client.transport.fetch_calls, 2);
        assert_eq!(client.transport.open_calls, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn pull_failure_reconnects_instead_of_rescheduling() {
        let transport = ScriptedTransport {
            push: false,
            fetches: VecDeque::from([
                Ok(body(&[("a", "Alpha", "ok")], "t1", true)),
                Err(TransportError::Status(503)),
                Ok(body(&[("a", "Alpha", "ok")], "t2", true)),
            ]),
            ..ScriptedTransport::default()
        };
        let mut client = client(transport);

        let mut action = client.connection.connect();
        action = client.step(action).await;
        action = client.step(action).await;
        action = client.step(action).await;
        assert!(matches!(action, Action::AwaitReconnect(_)));
        assert_eq!(client.sync_label(), &SyncLabel::Reconnecting);
        assert_eq!(ids(&client), vec!["a".to_string()]);

        action = client.step(action).await;
        assert_eq!(action, Action::Poll);
        action = client.step(action).await;
        assert_eq!(action, Action::SchedulePoll(Duration::from_secs(10)));
        assert_eq!(client.sync_label(), &SyncLabel::Updated("t2".to_string()));
        assert_eq!(client.connection().mode(), TransportMode::Pull);
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_poll_body_keeps_cadence() {
        let transport = ScriptedTransport {
            push: false,
            fetches: VecDeque::from([Ok("{\"lines\": []".to_string())]),
            ..ScriptedTransport::default()
        };
        let mut client = client(transport);

        let action = client.step(Action::Poll).await;
        assert_eq!(action, Action::SchedulePoll(Duration::from_secs(10)));
        assert_eq!(client.stats().malformed_payloads, 1);
        assert_eq!(client.stats().transport_failures, 0);
        assert_eq!(client.sync_label(), &SyncLabel::Pending);
    }

    #[tokio::test(start_paused = true)]
    async fn oversized_poll_body_is_dropped_not_failed() {
        let transport = ScriptedTransport {
            push: false,
            fetches: VecDeque::from([
                Ok(body(&[("a", "Alpha", "ok")], "t1", true)),
                Err(TransportError::Oversized { max: 1024 }),
            ]),
            ..ScriptedTransport::default()
        };
        let mut client = client(transport);

        client.step(Action::Poll).await;
        let action = client.step(Action::Poll).await;

        assert_eq!(action, Action::SchedulePoll(Duration::from_secs(10)));
        assert_eq!(ids(&client), vec!["a".to_string()]);
        assert_eq!(client.stats().malformed_payloads, 1);
        assert_eq!(client.stats().transport_failures, 0);
        assert!(!client.connection().reconnect_pending());
        let last = client.observer().views.last().unwrap();
        assert_eq!(last.stats.malformed_payloads, 1);
    }
}
