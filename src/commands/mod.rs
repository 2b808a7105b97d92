//! Bot command module.

mod list;
mod remove;
mod set;

use async_trait::async_trait;
use clap::Parser;
use color_eyre::Result;

use self::{list::List, remove::Remove, set::Set};
use crate::{
	delivery::DeliveryGateway,
	reminder::{ChannelId, UserId},
	scheduler::Scheduler,
	store::ReminderStore,
};

/// The trait every command implements. This is used for executing the command.
#[async_trait]
trait BotCommand {
	/// Execute the command.
	async fn execute<'a>(&mut self, context: Context<'a>) -> Result<()>;
}

/// The command the bot should execute. All commands are prefixed with '!'.
#[derive(Debug, Parser)]
#[command(name = "Reminder-Bot", version, about)]
pub enum Command {
	/// Set your yearly reminder, replacing any previous one.
	Set(Set),
	/// List all registered reminders.
	List(List),
	/// Remove your reminder.
	Remove(Remove),
}

impl Command {
	/// View the command as a trait object.
	fn as_bot_command(&mut self) -> &mut (dyn BotCommand + Send + Sync) {
		match self {
			Command::Set(cmd) => cmd,
			Command::List(cmd) => cmd,
			Command::Remove(cmd) => cmd,
		}
	}

	/// Execute the command.
	pub async fn execute(
		&mut self,
		store: &ReminderStore,
		scheduler: &Scheduler,
		gateway: &dyn DeliveryGateway,
		sender: &UserId,
		channel: &ChannelId,
	) -> Result<()> {
		self.as_bot_command()
			.execute(Context { store, scheduler, gateway, sender, channel })
			.await
	}
}

/// Command context
struct Context<'a> {
	/// Reminder store
	pub store: &'a ReminderStore,
	/// Reminder scheduler
	pub scheduler: &'a Scheduler,
	/// Chat gateway for replies
	pub gateway: &'a dyn DeliveryGateway,
	/// Who sent the command
	pub sender: &'a UserId,
	/// Channel the command was sent in
	pub channel: &'a ChannelId,
}

/// Parse arguments in a message by splitting it on spaces. This keeps into
/// account quotes for giving arguments that include spaces.
#[allow(clippy::collapsible_else_if)] // more readable
pub fn parse_arguments(message: &str) -> Vec<String> {
	let mut arguments = Vec::new();
	let mut current_arg = String::new();
	let mut current_seperator = None;

	for arg in message.split(' ') {
		if let Some(cur_sep) = current_seperator {
			current_arg.push(' ');
			if let Some(stripped) = arg.strip_suffix(cur_sep) {
				current_arg.push_str(stripped);
				current_seperator = None;
				arguments.push(current_arg.clone());
				current_arg.clear();
			} else {
				current_arg.push_str(arg);
			}
		} else {
			if let Some(stripped) = arg.strip_prefix('\'') {
				if let Some(completely_stripped) = stripped.strip_suffix('\'') {
					arguments.push(completely_stripped.to_owned());
				} else {
					current_seperator = Some('\'');
					current_arg.push_str(stripped);
				}
			} else if let Some(stripped) = arg.strip_prefix('"') {
				if let Some(completely_stripped) = stripped.strip_suffix('"') {
					arguments.push(completely_stripped.to_owned());
				} else {
					current_seperator = Some('"');
					current_arg.push_str(stripped);
				}
			} else {
				arguments.push(arg.to_owned());
			}
		}
	}

	arguments.retain(|arg| !arg.is_empty());
	arguments
}
