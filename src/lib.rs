//! Crate library.

pub mod clock;
pub mod commands;
pub mod delivery;
mod events;
pub mod occurrence;
pub mod reminder;
pub mod scheduler;
pub mod settings;
pub mod store;

use std::sync::{Arc, Barrier};

use color_eyre::Result;
use events::BotContext;
use settings::Settings;

use crate::{
	clock::SystemClock,
	delivery::{DeliveryGateway, WebhookGateway},
	scheduler::Scheduler,
	store::{JsonFile, ReminderStore},
};

/// Run the bot.
pub async fn run(config: Arc<Settings>) -> Result<()> {
	let stop_barrier = Arc::new(Barrier::new(2));
	let stopper = stop_barrier.clone();
	ctrlc::set_handler(move || {
		stopper.wait();
	})?;

	tracing::debug!("Loading reminders..");
	let store = Arc::new(ReminderStore::load(JsonFile::new(&config.store.file)).await?);

	let clock = Arc::new(SystemClock::new(config.timezone));
	let gateway: Arc<dyn DeliveryGateway> =
		Arc::new(WebhookGateway::new(config.gateway.endpoint.clone()));
	let scheduler = Scheduler::new(Arc::clone(&store), Arc::clone(&gateway), clock);

	tracing::debug!("Scheduling loaded reminders..");
	scheduler.resync().await;

	tracing::info!("Listening for gateway events..");
	let context = BotContext { store, scheduler: scheduler.clone(), gateway };
	let events_handle = tokio::spawn(events::run(context));

	tokio::task::block_in_place(move || stop_barrier.wait());

	tracing::info!("Stopping the bot..");
	events_handle.abort();
	scheduler.shutdown().await;

	Ok(())
}
