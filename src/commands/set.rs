//! The set command.

use async_trait::async_trait;
use clap::Args;

use super::{BotCommand, Context};
use crate::reminder::{MonthDay, ReminderEntry, TimeOfDay};

/// Set command.
#[derive(Debug, Args)]
pub struct Set {
	/// Date the reminder fires on every year (e.g. "02-17").
	#[clap(value_parser)]
	date: MonthDay,
	/// Time of day the reminder fires at (e.g. "10:00").
	#[clap(value_parser)]
	time: TimeOfDay,
	/// Reminder message. `{user}` is replaced with a mention of you at
	/// delivery time.
	#[clap(value_parser)]
	message: String,
}

#[async_trait]
impl BotCommand for Set {
	async fn execute<'a>(&mut self, context: Context<'a>) -> color_eyre::Result<()> {
		let entry = ReminderEntry {
			date: self.date,
			time: self.time,
			message: std::mem::take(&mut self.message),
			channel: context.channel.clone(),
		};

		if let Err(err) = context.store.set(context.sender.clone(), entry).await {
			tracing::error!("Failed to save reminder for {}: {err}", context.sender);
			context
				.gateway
				.deliver(context.channel, "Could not save your reminder, please try again.")
				.await?;
			return Ok(());
		}
		context.scheduler.resync().await;

		let confirmation = format!(
			"Reminder for {} set to {} at {}.",
			context.gateway.mention(context.sender),
			self.date,
			self.time
		);
		context.gateway.deliver(context.channel, &confirmation).await?;

		tracing::trace!("Registered reminder for {}.", context.sender);
		Ok(())
	}
}
