//! Event handling for inbound gateway messages.
//!
//! The external chat gateway pipes message events into the bot as
//! line-delimited text on stdin, one event per line: `<sender> <channel>
//! <body>`. Bodies starting with '!' are commands.

use std::sync::Arc;

use clap::Parser;
use color_eyre::Result;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::{
	commands::{parse_arguments, Command},
	delivery::DeliveryGateway,
	reminder::{ChannelId, UserId},
	scheduler::Scheduler,
	store::ReminderStore,
};

/// Shared handles the event loop needs to execute commands.
pub struct BotContext {
	/// Reminder store.
	pub store: Arc<ReminderStore>,
	/// Reminder scheduler.
	pub scheduler: Scheduler,
	/// Chat gateway for replies and deliveries.
	pub gateway: Arc<dyn DeliveryGateway>,
}

/// One inbound message event from the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
	/// Who sent the message.
	pub sender: UserId,
	/// Channel the message was sent in.
	pub channel: ChannelId,
	/// Message text.
	pub body: String,
}

impl InboundMessage {
	/// Parse a gateway event line of the form `<sender> <channel> <body>`.
	pub fn parse(line: &str) -> Option<Self> {
		let mut parts = line.splitn(3, ' ');
		let sender = parts.next().filter(|part| !part.is_empty())?;
		let channel = parts.next().filter(|part| !part.is_empty())?;
		let body = parts.next()?.trim();
		if body.is_empty() {
			return None;
		}
		Some(Self {
			sender: UserId::new(sender),
			channel: ChannelId::new(channel),
			body: body.to_owned(),
		})
	}
}

/// Run the event loop over gateway events on stdin. Returns when the gateway
/// hangs up.
pub async fn run(context: BotContext) {
	let mut lines = BufReader::new(tokio::io::stdin()).lines();
	loop {
		match lines.next_line().await {
			Ok(Some(line)) => {
				if line.trim().is_empty() {
					continue;
				}
				match InboundMessage::parse(&line) {
					Some(message) => on_message(message, &context).await,
					None => tracing::warn!("Ignoring malformed gateway event: {line}"),
				}
			}
			Ok(None) => break,
			Err(err) => {
				tracing::error!("Failed to read gateway event: {err}");
				break;
			}
		}
	}
}

/// Gateway message event handler, handling the error of the actual inner
/// handler.
pub async fn on_message(message: InboundMessage, context: &BotContext) {
	if let Err(err) = on_message_inner(message, context).await {
		tracing::error!("Error in on_message handler: {err}");
	}
}

/// Actual inner message handler.
async fn on_message_inner(message: InboundMessage, context: &BotContext) -> Result<()> {
	tracing::trace!("{}: {}", message.sender, message.body);

	// Check if there is a command we need to react on
	if let Some(body) = message.body.strip_prefix('!') {
		let mut arguments = parse_arguments(body);
		arguments.insert(0, String::from("!"));
		match Command::try_parse_from(arguments) {
			Ok(mut command) => {
				command
					.execute(
						&context.store,
						&context.scheduler,
						context.gateway.as_ref(),
						&message.sender,
						&message.channel,
					)
					.await?;
			}
			Err(error) => {
				context.gateway.deliver(&message.channel, &error.to_string()).await?;
			}
		}
	}

	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn inbound_message_parsing() {
		let message = InboundMessage::parse("alice chan-1 !set 02-17 10:00 'hi'").unwrap();
		assert_eq!(message.sender, UserId::new("alice"));
		assert_eq!(message.channel, ChannelId::new("chan-1"));
		assert_eq!(message.body, "!set 02-17 10:00 'hi'");

		assert_eq!(InboundMessage::parse(""), None);
		assert_eq!(InboundMessage::parse("alice"), None);
		assert_eq!(InboundMessage::parse("alice chan-1"), None);
		assert_eq!(InboundMessage::parse("alice chan-1  "), None);
	}
}
