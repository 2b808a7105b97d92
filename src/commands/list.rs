//! The list command.

use async_trait::async_trait;
use clap::Args;

use super::{BotCommand, Context};

/// List command.
#[derive(Debug, Args)]
pub struct List;

#[async_trait]
impl BotCommand for List {
	async fn execute<'a>(&mut self, context: Context<'a>) -> color_eyre::Result<()> {
		let mut entries = context.store.all().await;
		if entries.is_empty() {
			context
				.gateway
				.deliver(context.channel, "There are no registered reminders.")
				.await?;
			return Ok(());
		}

		entries.sort_by(|(a, _), (b, _)| a.cmp(b));
		let mut lines = vec![String::from("Registered reminders:")];
		for (user, entry) in entries {
			lines.push(format!(
				"- {}: {} {} - {}",
				context.gateway.mention(&user),
				entry.date,
				entry.time,
				entry.message
			));
		}
		context.gateway.deliver(context.channel, &lines.join("\n")).await?;
		Ok(())
	}
}
