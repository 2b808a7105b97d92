//! The remove command.

use async_trait::async_trait;
use clap::Args;

use super::{BotCommand, Context};

/// Remove command.
#[derive(Debug, Args)]
pub struct Remove;

#[async_trait]
impl BotCommand for Remove {
	async fn execute<'a>(&mut self, context: Context<'a>) -> color_eyre::Result<()> {
		match context.store.remove(context.sender).await {
			Ok(true) => {
				context.scheduler.resync().await;
				let confirmation =
					format!("Removed the reminder for {}.", context.gateway.mention(context.sender));
				context.gateway.deliver(context.channel, &confirmation).await?;
			}
			Ok(false) => {
				context
					.gateway
					.deliver(context.channel, "You have no reminder registered.")
					.await?;
			}
			Err(err) => {
				tracing::error!("Failed to remove reminder for {}: {err}", context.sender);
				context
					.gateway
					.deliver(context.channel, "Could not remove your reminder, please try again.")
					.await?;
			}
		}
		Ok(())
	}
}
