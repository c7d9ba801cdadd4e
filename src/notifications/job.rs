//! Periodic scan of today's fixtures for the teams subscribers follow.

use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, instrument, warn};

use super::dispatcher::NotificationDispatcher;
use super::push::PushPayload;
use super::tracker::{FixtureState, FixtureTracker, GoalUpdate};
use crate::data_fetcher::api::date_logic::today_utc;
use crate::data_fetcher::api::{ApiPayload, FetchOptions, UpstreamClient};
use crate::data_fetcher::models::{
    FixtureEvent, FixtureSummary, LineupEntry, TeamRef, parse_items,
};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct JobSummary {
    pub fixtures_checked: usize,
    pub goal_notifications: usize,
    pub lineup_notifications: usize,
    /// Parked deliveries from the previous run that went through this time
    pub retried_deliveries: usize,
    /// Watched fixtures left for the next run once the upstream quota ran out
    pub fixtures_deferred: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "summary", rename_all = "snake_case")]
pub enum JobOutcome {
    /// Another run was still in progress; nothing was touched
    AlreadyRunning,
    /// No subscribers or no favorite teams
    Idle,
    /// Today's fixture list could not be fetched
    UpstreamUnavailable,
    Completed(JobSummary),
}

/// Clears the running flag when a run ends, including on panic
struct RunGuard<'a>(&'a AtomicBool);

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub struct NotificationJob {
    client: Arc<UpstreamClient>,
    dispatcher: Arc<NotificationDispatcher>,
    tracker: Mutex<FixtureTracker>,
    /// Fixture the next scan starts from after a quota-limited run
    resume_at: Mutex<Option<i64>>,
    running: AtomicBool,
}

fn match_url(fixture_id: i64) -> String {
    format!("/match.html?id={fixture_id}")
}

fn goal_payload(update: &GoalUpdate) -> PushPayload {
    PushPayload::new(
        "⚽ Goal!",
        format!("{} scored", update.team.display_name()),
        match_url(update.fixture_id),
    )
}

fn lineup_payload(fixture_id: i64, team: &TeamRef) -> PushPayload {
    PushPayload::new(
        "📋 Official lineup",
        format!(
            "The official lineup for {} is now available",
            team.display_name()
        ),
        match_url(fixture_id),
    )
}

/// Drops an unavailable payload, logging that the fixture is skipped this run
fn usable(payload: ApiPayload, what: &str, fixture_id: i64) -> Option<ApiPayload> {
    if payload.is_unavailable() {
        debug!("{} for fixture {} unavailable, skipping this run", what, fixture_id);
        return None;
    }
    Some(payload)
}

/// Moves the fixture a previous run stopped at to the front, keeping the
/// cyclic order so every watched fixture gets its turn.
fn rotate_to(watched: &mut [FixtureSummary], fixture_id: Option<i64>) {
    let start = fixture_id.and_then(|id| watched.iter().position(|f| f.id() == Some(id)));
    if let Some(start) = start {
        watched.rotate_left(start);
    }
}

impl NotificationJob {
    pub fn new(client: Arc<UpstreamClient>, dispatcher: Arc<NotificationDispatcher>) -> Self {
        Self {
            client,
            dispatcher,
            tracker: Mutex::new(FixtureTracker::new()),
            resume_at: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Snapshot of one fixture's tracked state
    pub async fn fixture_state(&self, fixture_id: i64) -> Option<FixtureState> {
        self.tracker.lock().await.get(fixture_id).cloned()
    }

    pub async fn tracked_fixtures(&self) -> usize {
        self.tracker.lock().await.len()
    }

    /// Runs one scan unless another is still in progress.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> JobOutcome {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            info!("Notification job already running, skipping this tick");
            return JobOutcome::AlreadyRunning;
        }
        let _guard = RunGuard(&self.running);

        let outcome = self.scan().await;
        debug!("Notification job finished: {:?}", outcome);
        outcome
    }

    async fn scan(&self) -> JobOutcome {
        let retried = self.dispatcher.retry_failed().await;

        let registry = self.dispatcher.registry();
        if registry.is_empty().await {
            debug!("No push subscribers, nothing to scan");
            return JobOutcome::Idle;
        }
        let favorites = registry.favorite_team_ids().await;
        if favorites.is_empty() {
            debug!("Subscribers follow no teams, nothing to scan");
            return JobOutcome::Idle;
        }

        let today = today_utc();
        let fixtures = match self
            .client
            .fixtures_by_date(&today, FetchOptions::fresh())
            .await
        {
            Ok(payload) if !payload.is_unavailable() => payload,
            Ok(_) => {
                warn!("Fixture list for {} unavailable, skipping this run", today);
                return JobOutcome::UpstreamUnavailable;
            }
            Err(e) => {
                warn!("Fixture list for {} not fetched: {}", today, e);
                return JobOutcome::UpstreamUnavailable;
            }
        };

        let mut watched: Vec<FixtureSummary> = parse_items::<FixtureSummary>(fixtures.response_items())
            .into_iter()
            .filter(|f| f.involves_any(|id| favorites.contains(&id)))
            .collect();
        info!(
            "{} of today's fixtures involve followed teams",
            watched.len()
        );

        let mut resume_at = self.resume_at.lock().await;
        rotate_to(&mut watched, *resume_at);
        *resume_at = None;

        let mut summary = JobSummary {
            retried_deliveries: retried.delivered,
            ..Default::default()
        };
        let mut tracker = self.tracker.lock().await;

        for (position, fixture) in watched.iter().enumerate() {
            let Some(state) = tracker.observe(fixture) else {
                continue;
            };
            let fixture_id = state.fixture_id;
            if let Err(e) = self.check_fixture(state, &mut summary).await {
                summary.fixtures_deferred = watched.len() - position;
                warn!(
                    "Stopping scan at fixture {}, {} fixtures left for the next run: {}",
                    fixture_id, summary.fixtures_deferred, e
                );
                *resume_at = Some(fixture_id);
                break;
            }
            summary.fixtures_checked += 1;
        }

        JobOutcome::Completed(summary)
    }

    /// Checks one fixture's goals and lineups. Fails only when the upstream
    /// quota refuses a request.
    async fn check_fixture(
        &self,
        state: &mut FixtureState,
        summary: &mut JobSummary,
    ) -> Result<(), AppError> {
        self.check_goals(state, summary).await?;
        if !state.lineup_notified {
            self.check_lineups(state, summary).await?;
        }
        Ok(())
    }

    async fn check_goals(
        &self,
        state: &mut FixtureState,
        summary: &mut JobSummary,
    ) -> Result<(), AppError> {
        let fixture_id = state.fixture_id;
        let payload = self
            .client
            .fixture_events(fixture_id, FetchOptions::fresh())
            .await?;
        let Some(payload) = usable(payload, "events", fixture_id) else {
            return Ok(());
        };

        let events: Vec<FixtureEvent> = parse_items(payload.response_items());
        for update in state.record_goals(&events) {
            let Some(team_id) = update.team.id else {
                continue;
            };
            self.dispatcher
                .notify_team_subscribers(team_id, &goal_payload(&update))
                .await;
            summary.goal_notifications += 1;
        }
        Ok(())
    }

    async fn check_lineups(
        &self,
        state: &mut FixtureState,
        summary: &mut JobSummary,
    ) -> Result<(), AppError> {
        let fixture_id = state.fixture_id;
        let payload = self
            .client
            .fixture_lineups(fixture_id, FetchOptions::fresh())
            .await?;
        let Some(payload) = usable(payload, "lineups", fixture_id) else {
            return Ok(());
        };

        let lineups: Vec<LineupEntry> = parse_items(payload.response_items());
        for team in state.record_lineups(&lineups) {
            let Some(team_id) = team.id else {
                continue;
            };
            self.dispatcher
                .notify_team_subscribers(team_id, &lineup_payload(fixture_id, &team))
                .await;
            summary.lineup_notifications += 1;
        }
        Ok(())
    }

    /// Runs the job every `every`, starting after `initial_delay`.
    /// Ticks missed while a run is in progress are skipped, not queued.
    pub fn spawn(self: Arc<Self>, every: Duration, initial_delay: Duration) -> JoinHandle<()> {
        info!(
            "Notification job scheduled every {:?} (first run in {:?})",
            every, initial_delay
        );
        tokio::spawn(async move {
            tokio::time::sleep(initial_delay).await;
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                self.run_once().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_fetcher::api::http_client::create_http_client_with_timeout;
    use crate::data_fetcher::cache::CachePools;
    use crate::data_fetcher::rate_governor::RateGovernor;
    use crate::notifications::dispatcher::{Subscriber, SubscriptionRegistry};
    use crate::notifications::tracker::Side;
    use crate::testing_utils::{
        RecordingPushService, api_response, fixture_json, goal_events_json, subscription,
    };
    use serde_json::Value;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path, query_param},
    };

    async fn job_for(server: &MockServer, push: Arc<RecordingPushService>) -> NotificationJob {
        job_with_quota(server, push, 100).await
    }

    async fn job_with_quota(
        server: &MockServer,
        push: Arc<RecordingPushService>,
        quota: u32,
    ) -> NotificationJob {
        let client = UpstreamClient::with_client(
            create_http_client_with_timeout(5).unwrap(),
            &server.uri(),
            "k",
            Arc::new(CachePools::new(100)),
            Arc::new(RateGovernor::new(quota, Duration::from_secs(60))),
        );
        let dispatcher =
            NotificationDispatcher::new(Arc::new(SubscriptionRegistry::new()), push);
        NotificationJob::new(Arc::new(client), Arc::new(dispatcher))
    }

    #[test]
    fn test_payload_texts() {
        let update = GoalUpdate {
            fixture_id: 7,
            side: Side::Home,
            team: TeamRef {
                id: Some(10),
                name: Some("Liverpool".to_string()),
            },
            goals: 2,
        };
        let payload = goal_payload(&update);
        assert_eq!(payload.title, "⚽ Goal!");
        assert_eq!(payload.body, "Liverpool scored");
        assert_eq!(payload.data.url, "/match.html?id=7");

        let payload = lineup_payload(7, &TeamRef::default());
        assert_eq!(payload.title, "📋 Official lineup");
        assert_eq!(payload.body, "The official lineup for The team is now available");
    }

    #[tokio::test]
    async fn test_idle_without_subscribers() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(api_response(vec![])))
            .expect(0)
            .mount(&mock_server)
            .await;

        let job = job_for(&mock_server, Arc::new(RecordingPushService::new())).await;
        assert_eq!(job.run_once().await, JobOutcome::Idle);

        job.dispatcher()
            .registry()
            .upsert(Subscriber::new(subscription("a"), Vec::new()))
            .await;
        assert_eq!(job.run_once().await, JobOutcome::Idle);
    }

    #[tokio::test]
    async fn test_unavailable_fixture_list() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let job = job_for(&mock_server, Arc::new(RecordingPushService::new())).await;
        job.dispatcher()
            .registry()
            .upsert(Subscriber::new(subscription("a"), [10]))
            .await;
        assert_eq!(job.run_once().await, JobOutcome::UpstreamUnavailable);
        assert_eq!(job.tracked_fixtures().await, 0);
    }

    #[tokio::test]
    async fn test_overlapping_run_is_skipped() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(api_response(vec![]))
                    .set_delay(Duration::from_millis(300)),
            )
            .expect(1)
            .mount(&mock_server)
            .await;

        let job = job_for(&mock_server, Arc::new(RecordingPushService::new())).await;
        job.dispatcher()
            .registry()
            .upsert(Subscriber::new(subscription("a"), [10]))
            .await;

        let (first, second) = tokio::join!(job.run_once(), job.run_once());
        assert!(matches!(first, JobOutcome::Completed(_)));
        assert_eq!(second, JobOutcome::AlreadyRunning);
        assert!(!job.is_running());
    }

    #[tokio::test]
    async fn test_events_failure_keeps_state() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .respond_with(ResponseTemplate::new(200).set_body_json(api_response(vec![
                fixture_json(1, (10, "Home FC"), (20, "Away FC")),
            ])))
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fixtures/events"))
            .and(query_param("fixture", "1"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fixtures/events"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(api_response(goal_events_json(10, 1))),
            )
            .mount(&mock_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/fixtures/lineups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(api_response(vec![])))
            .mount(&mock_server)
            .await;

        let push = Arc::new(RecordingPushService::new());
        let job = job_for(&mock_server, Arc::clone(&push)).await;
        job.dispatcher()
            .registry()
            .upsert(Subscriber::new(subscription("a"), [10]))
            .await;

        job.run_once().await;
        assert_eq!(job.fixture_state(1).await.unwrap().home_goals, 0);
        assert_eq!(push.attempts(), 0);

        // The goal is announced once the feed is reachable again
        let outcome = job.run_once().await;
        let JobOutcome::Completed(summary) = outcome else {
            panic!("unexpected outcome {outcome:?}");
        };
        assert_eq!(summary.goal_notifications, 1);
        assert_eq!(job.fixture_state(1).await.unwrap().home_goals, 1);
        assert_eq!(push.delivered_payloads()[0].body, "Home FC scored");
    }

    #[test]
    fn test_rotate_to_keeps_cyclic_order() {
        let mut watched: Vec<FixtureSummary> = parse_items(&[
            fixture_json(1, (10, "A"), (20, "B")),
            fixture_json(2, (11, "C"), (21, "D")),
            fixture_json(3, (12, "E"), (22, "F")),
        ]);
        rotate_to(&mut watched, Some(3));
        let ids: Vec<_> = watched.iter().filter_map(FixtureSummary::id).collect();
        assert_eq!(ids, vec![3, 1, 2]);

        // A fixture no longer on today's list leaves the order alone
        rotate_to(&mut watched, Some(99));
        let ids: Vec<_> = watched.iter().filter_map(FixtureSummary::id).collect();
        assert_eq!(ids, vec![3, 1, 2]);
    }

    // Only paused around `advance` so the mock server's socket I/O runs in real time
    async fn skip_ahead(duration: Duration) {
        tokio::time::pause();
        tokio::time::advance(duration).await;
        tokio::time::resume();
    }

    #[tokio::test]
    async fn test_scan_resumes_where_the_quota_ran_out() {
        let mock_server = MockServer::start().await;
        let fixtures: Vec<Value> = (1..=6)
            .map(|id| fixture_json(id, (10 + id, "Home FC"), (100 + id, "Away FC")))
            .collect();
        Mock::given(method("GET"))
            .and(path("/fixtures"))
            .respond_with(ResponseTemplate::new(200).set_body_json(api_response(fixtures)))
            .mount(&mock_server)
            .await;
        for id in 1..=6 {
            Mock::given(method("GET"))
                .and(path("/fixtures/events"))
                .and(query_param("fixture", id.to_string()))
                .respond_with(
                    ResponseTemplate::new(200)
                        .set_body_json(api_response(goal_events_json(10 + id, 1))),
                )
                .mount(&mock_server)
                .await;
        }
        Mock::given(method("GET"))
            .and(path("/fixtures/lineups"))
            .respond_with(ResponseTemplate::new(200).set_body_json(api_response(vec![])))
            .mount(&mock_server)
            .await;

        let push = Arc::new(RecordingPushService::new());
        let job = job_with_quota(&mock_server, Arc::clone(&push), 8).await;
        job.dispatcher()
            .registry()
            .upsert(Subscriber::new(subscription("a"), 11..=16))
            .await;

        // 1 unit for the list, then 2 per fixture: the 4th fixture's lineups are refused
        let JobOutcome::Completed(first) = job.run_once().await else {
            panic!("first run did not complete");
        };
        assert_eq!(first.goal_notifications, 4);
        assert_eq!(first.fixtures_checked, 3);
        assert_eq!(first.fixtures_deferred, 3);
        assert!(job.fixture_state(5).await.is_none());

        skip_ahead(Duration::from_secs(61)).await;
        let JobOutcome::Completed(second) = job.run_once().await else {
            panic!("second run did not complete");
        };
        assert_eq!(second.goal_notifications, 2);
        for id in 1..=6 {
            assert_eq!(job.fixture_state(id).await.unwrap().home_goals, 1);
        }
        assert_eq!(push.delivered_payloads().len(), 6);
    }
}
