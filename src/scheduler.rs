//! Timer jobs for reminder delivery.
//!
//! The scheduler keeps exactly one armed job per stored registration. Any
//! mutation of the store is followed by [`Scheduler::resync`], which
//! atomically replaces the whole job set. Jobs deliver through the gateway
//! and then re-arm themselves for the next year.

use std::{
	collections::HashMap,
	sync::{
		atomic::{AtomicU64, Ordering},
		Arc,
	},
};

use time::OffsetDateTime;
use tokio::{sync::Mutex, task::JoinHandle};

use crate::{
	clock::Clock,
	delivery::DeliveryGateway,
	occurrence::next_occurrence,
	reminder::{ReminderEntry, UserId},
	store::ReminderStore,
};

/// Reminder scheduler. Cheap to clone; all clones share the same job set.
#[derive(Clone)]
pub struct Scheduler {
	/// Shared state, also held by every armed job.
	inner: Arc<Inner>,
}

/// State shared between the scheduler handle and its jobs.
struct Inner {
	/// Registration set the jobs are derived from.
	store: Arc<ReminderStore>,
	/// Gateway reminders are delivered through.
	gateway: Arc<dyn DeliveryGateway>,
	/// Time source for occurrence resolution.
	clock: Arc<dyn Clock>,
	/// Armed jobs, at most one per user.
	jobs: Mutex<JobSet>,
	/// Ticket counter ordering resyncs. Taken before the store snapshot, so
	/// a resync that started later always carries the higher generation.
	generations: AtomicU64,
}

/// The armed jobs together with the generation that armed them.
#[derive(Default)]
struct JobSet {
	/// Generation of the resync that currently owns the set.
	generation: u64,
	/// One handle per user with an armed job.
	jobs: HashMap<UserId, JoinHandle<()>>,
}

impl Scheduler {
	/// Create a scheduler over the given store, gateway and clock. No jobs
	/// are armed until the first [`resync`](Self::resync).
	pub fn new(
		store: Arc<ReminderStore>,
		gateway: Arc<dyn DeliveryGateway>,
		clock: Arc<dyn Clock>,
	) -> Self {
		Self {
			inner: Arc::new(Inner {
				store,
				gateway,
				clock,
				jobs: Mutex::new(JobSet::default()),
				generations: AtomicU64::new(0),
			}),
		}
	}

	/// Rebuild the job set from the current store contents: cancel every
	/// armed job and arm one job per registration at its next occurrence.
	///
	/// Safe to call concurrently; of overlapping resyncs, the one that
	/// started last wins the whole set and earlier ones apply nothing.
	/// Registrations whose date cannot be placed in the target year (Feb 29
	/// outside leap years) are skipped with a warning until a later resync
	/// can place them again.
	pub async fn resync(&self) {
		let generation = self.inner.generations.fetch_add(1, Ordering::SeqCst) + 1;
		let entries = self.inner.store.all().await;
		let now = self.inner.clock.now();

		let mut armed = Vec::with_capacity(entries.len());
		for (user, entry) in entries {
			match next_occurrence(entry.date, entry.time, now) {
				Ok(at) => armed.push((user, entry, at)),
				Err(err) => tracing::warn!("Skipping reminder for {user}: {err}"),
			}
		}

		let mut set = self.inner.jobs.lock().await;
		if generation < set.generation {
			tracing::debug!("Resync {generation} superseded before applying");
			return;
		}
		set.generation = generation;
		for (_, job) in set.jobs.drain() {
			job.abort();
		}
		for (user, entry, at) in armed {
			let job = arm(Arc::clone(&self.inner), generation, user.clone(), entry, at);
			set.jobs.insert(user, job);
		}
		tracing::debug!("Armed {} reminder job(s)", set.jobs.len());
	}

	/// Cancel all armed jobs and retire the job set. Late firings and stale
	/// resyncs apply nothing afterwards.
	pub async fn shutdown(&self) {
		let mut set = self.inner.jobs.lock().await;
		set.generation = u64::MAX;
		for (_, job) in set.jobs.drain() {
			job.abort();
		}
	}

	/// Number of currently armed jobs.
	#[cfg(test)]
	async fn armed(&self) -> usize {
		self.inner.jobs.lock().await.jobs.len()
	}
}

/// Spawn a job that sleeps until `at` and then fires `entry` for `user`.
fn arm(
	inner: Arc<Inner>,
	generation: u64,
	user: UserId,
	entry: ReminderEntry,
	at: OffsetDateTime,
) -> JoinHandle<()> {
	tokio::spawn(async move {
		let delay = at - inner.clock.now();
		if let Ok(delay) = std::time::Duration::try_from(delay) {
			tokio::time::sleep(delay).await;
		}
		fire(inner, generation, user, entry, at).await;
	})
}

/// Deliver a fired reminder and re-arm it for the next year.
async fn fire(
	inner: Arc<Inner>,
	generation: u64,
	user: UserId,
	entry: ReminderEntry,
	at: OffsetDateTime,
) {
	// Detach from the job set first, so delivery happens without the lock.
	{
		let mut set = inner.jobs.lock().await;
		if set.generation != generation {
			return;
		}
		set.jobs.remove(&user);
	}

	// The registration may have been removed since arming.
	if inner.store.get(&user).await.is_none() {
		tracing::trace!("Reminder for {user} was removed before firing");
		return;
	}

	// A changed registration still fires with the payload captured at arm
	// time; its own resync owns all future occurrences.
	let text = entry.message.replace("{user}", &inner.gateway.mention(&user));
	if let Err(err) = inner.gateway.deliver(&entry.channel, &text).await {
		tracing::error!("Failed to deliver reminder for {user}: {err}");
	}

	// Re-arm for the next year, unless a resync took over the set while the
	// message was out for delivery.
	let now = inner.clock.now().max(at);
	match next_occurrence(entry.date, entry.time, now) {
		Ok(at) => {
			let mut set = inner.jobs.lock().await;
			if set.generation == generation && !set.jobs.contains_key(&user) {
				let job = arm(Arc::clone(&inner), generation, user.clone(), entry, at);
				set.jobs.insert(user, job);
			}
		}
		Err(err) => tracing::warn!("Not re-arming reminder for {user}: {err}"),
	}
}

#[cfg(test)]
mod tests {
	use std::{sync::Mutex as StdMutex, time::Duration};

	use async_trait::async_trait;
	use reqwest::StatusCode;
	use time::macros::datetime;

	use super::*;
	use crate::{
		delivery::DeliveryError,
		reminder::{ChannelId, ReminderEntry},
		store::testing::MemoryBackend,
	};

	/// Clock driven by the tests.
	struct ManualClock(StdMutex<OffsetDateTime>);

	impl ManualClock {
		fn new(now: OffsetDateTime) -> Self {
			Self(StdMutex::new(now))
		}

		fn set(&self, now: OffsetDateTime) {
			*self.0.lock().unwrap() = now;
		}
	}

	impl Clock for ManualClock {
		fn now(&self) -> OffsetDateTime {
			*self.0.lock().unwrap()
		}
	}

	/// Gateway recording deliveries, optionally failing one channel.
	#[derive(Default)]
	struct MockGateway {
		delivered: StdMutex<Vec<(ChannelId, String)>>,
		fail_channel: Option<ChannelId>,
	}

	impl MockGateway {
		fn failing_for(channel: &str) -> Self {
			Self { fail_channel: Some(ChannelId::new(channel)), ..Self::default() }
		}

		fn delivered(&self) -> Vec<(ChannelId, String)> {
			self.delivered.lock().unwrap().clone()
		}
	}

	#[async_trait]
	impl DeliveryGateway for MockGateway {
		fn mention(&self, user: &UserId) -> String {
			format!("<@{user}>")
		}

		async fn deliver(&self, channel: &ChannelId, text: &str) -> Result<(), DeliveryError> {
			if self.fail_channel.as_ref() == Some(channel) {
				return Err(DeliveryError::Rejected(StatusCode::NOT_FOUND));
			}
			self.delivered.lock().unwrap().push((channel.clone(), text.to_owned()));
			Ok(())
		}
	}

	fn entry(date: &str, time: &str, message: &str, channel: &str) -> ReminderEntry {
		ReminderEntry {
			date: date.parse().unwrap(),
			time: time.parse().unwrap(),
			message: message.to_owned(),
			channel: ChannelId::new(channel),
		}
	}

	async fn scheduler_with(
		clock: Arc<ManualClock>,
		gateway: Arc<MockGateway>,
		entries: &[(&str, ReminderEntry)],
	) -> (Scheduler, Arc<ReminderStore>) {
		let store = Arc::new(ReminderStore::load(MemoryBackend::default()).await.unwrap());
		for (user, entry) in entries {
			store.set(UserId::new(*user), entry.clone()).await.unwrap();
		}
		let scheduler = Scheduler::new(Arc::clone(&store), gateway, clock);
		(scheduler, store)
	}

	/// Let armed jobs run up to and past their instant. The paused test
	/// clock auto-advances through every pending timer while this sleeps.
	async fn run_timers(duration: Duration) {
		tokio::time::sleep(duration).await;
		for _ in 0..20 {
			tokio::task::yield_now().await;
		}
	}

	#[tokio::test(start_paused = true)]
	async fn resync_arms_exactly_one_job_per_registration() {
		let clock = Arc::new(ManualClock::new(datetime!(2024-02-01 09:00 +9)));
		let gateway = Arc::new(MockGateway::default());
		let (scheduler, _store) = scheduler_with(
			clock,
			gateway,
			&[
				("alice", entry("02-17", "10:00", "hi", "a")),
				("bob", entry("06-01", "08:00", "hi", "b")),
			],
		)
		.await;

		scheduler.resync().await;
		assert_eq!(scheduler.armed().await, 2);

		// Rapid resyncs must not leave stale jobs armed alongside new ones.
		scheduler.resync().await;
		tokio::join!(scheduler.resync(), scheduler.resync());
		assert_eq!(scheduler.armed().await, 2);
	}

	#[tokio::test(start_paused = true)]
	async fn unplaceable_dates_are_skipped_not_fatal() {
		// 2025 is not a leap year, so the Feb 29 entry cannot be armed.
		let clock = Arc::new(ManualClock::new(datetime!(2025-01-10 09:00 +9)));
		let gateway = Arc::new(MockGateway::default());
		let (scheduler, _store) = scheduler_with(
			clock,
			gateway,
			&[
				("alice", entry("02-29", "10:00", "leap day", "a")),
				("bob", entry("03-01", "10:00", "march", "b")),
			],
		)
		.await;

		scheduler.resync().await;
		assert_eq!(scheduler.armed().await, 1);
	}

	#[tokio::test(start_paused = true)]
	async fn fires_once_and_rearms_for_next_year() {
		let clock = Arc::new(ManualClock::new(datetime!(2024-02-17 09:59 +9)));
		let gateway = Arc::new(MockGateway::default());
		let (scheduler, _store) = scheduler_with(
			Arc::clone(&clock),
			Arc::clone(&gateway),
			&[("alice", entry("02-17", "10:00", "happy birthday {user}!", "chan-1"))],
		)
		.await;

		scheduler.resync().await;
		assert_eq!(scheduler.armed().await, 1);

		clock.set(datetime!(2024-02-17 10:00:01 +9));
		run_timers(Duration::from_secs(120)).await;

		assert_eq!(
			gateway.delivered(),
			vec![(ChannelId::new("chan-1"), String::from("happy birthday <@alice>!"))]
		);
		// The same registration is armed again, for next year.
		assert_eq!(scheduler.armed().await, 1);
	}

	#[tokio::test(start_paused = true)]
	async fn delivery_failure_does_not_stop_other_jobs() {
		let clock = Arc::new(ManualClock::new(datetime!(2024-02-17 09:59 +9)));
		let gateway = Arc::new(MockGateway::failing_for("broken"));
		let (scheduler, _store) = scheduler_with(
			Arc::clone(&clock),
			Arc::clone(&gateway),
			&[
				("alice", entry("02-17", "10:00", "to nowhere", "broken")),
				("bob", entry("02-17", "10:00", "hello {user}", "chan-2")),
			],
		)
		.await;

		scheduler.resync().await;
		clock.set(datetime!(2024-02-17 10:00:01 +9));
		run_timers(Duration::from_secs(120)).await;

		assert_eq!(
			gateway.delivered(),
			vec![(ChannelId::new("chan-2"), String::from("hello <@bob>"))]
		);
		// Both jobs re-arm, the failed delivery included.
		assert_eq!(scheduler.armed().await, 2);
	}

	#[tokio::test(start_paused = true)]
	async fn removed_registration_is_skipped_at_fire_time() {
		let clock = Arc::new(ManualClock::new(datetime!(2024-02-17 09:59 +9)));
		let gateway = Arc::new(MockGateway::default());
		let (scheduler, store) = scheduler_with(
			Arc::clone(&clock),
			Arc::clone(&gateway),
			&[("alice", entry("02-17", "10:00", "hi", "chan-1"))],
		)
		.await;

		scheduler.resync().await;
		// Removed from the store after arming, without a resync.
		store.remove(&UserId::new("alice")).await.unwrap();

		clock.set(datetime!(2024-02-17 10:00:01 +9));
		run_timers(Duration::from_secs(120)).await;

		assert!(gateway.delivered().is_empty());
		assert_eq!(scheduler.armed().await, 0);
	}

	#[tokio::test(start_paused = true)]
	async fn shutdown_cancels_all_jobs() {
		let clock = Arc::new(ManualClock::new(datetime!(2024-02-17 09:59 +9)));
		let gateway = Arc::new(MockGateway::default());
		let (scheduler, _store) = scheduler_with(
			Arc::clone(&clock),
			Arc::clone(&gateway),
			&[("alice", entry("02-17", "10:00", "hi", "chan-1"))],
		)
		.await;

		scheduler.resync().await;
		scheduler.shutdown().await;
		assert_eq!(scheduler.armed().await, 0);

		clock.set(datetime!(2024-02-17 10:00:01 +9));
		run_timers(Duration::from_secs(120)).await;
		assert!(gateway.delivered().is_empty());

		// A stale resync after shutdown applies nothing.
		scheduler.resync().await;
		assert_eq!(scheduler.armed().await, 0);
	}
}
