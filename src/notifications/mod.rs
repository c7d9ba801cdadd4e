pub mod dispatcher;
pub mod job;
pub mod push;
pub mod tracker;

pub use dispatcher::{DispatchReport, NotificationDispatcher, Subscriber, SubscriptionRegistry};
pub use job::{JobOutcome, JobSummary, NotificationJob};
pub use push::{DisabledPushService, PushPayload, PushService, PushSubscription, WebPushService};
pub use tracker::{FixtureState, FixtureTracker, GoalUpdate};
