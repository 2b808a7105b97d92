//! Message delivery through the external chat gateway.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use url::Url;

use crate::reminder::{ChannelId, UserId};

/// A delivery attempt failed. Deliveries are single attempts; the caller
/// logs the error and moves on.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
	/// The gateway endpoint could not be reached.
	#[error("gateway unreachable: {0}")]
	Unreachable(#[source] reqwest::Error),
	/// The gateway refused the message, e.g. for an unknown channel or an
	/// unresolvable recipient.
	#[error("gateway rejected the message with status {0}")]
	Rejected(StatusCode),
}

/// Outbound side of the chat gateway.
#[async_trait]
pub trait DeliveryGateway: Send + Sync + 'static {
	/// Render a user reference the destination platform turns into a
	/// mention.
	fn mention(&self, user: &UserId) -> String;

	/// Send `text` to `channel`. One attempt, no retries.
	async fn deliver(&self, channel: &ChannelId, text: &str) -> Result<(), DeliveryError>;
}

/// Message payload posted to the webhook endpoint.
#[derive(Debug, Serialize)]
struct OutboundMessage<'a> {
	/// Destination channel.
	channel: &'a ChannelId,
	/// Rendered message text.
	text: &'a str,
}

/// Gateway that posts messages to a webhook endpoint as JSON.
#[derive(Debug, Clone)]
pub struct WebhookGateway {
	/// Webhook endpoint of the external gateway service.
	endpoint: Url,
	/// Shared HTTP client.
	client: reqwest::Client,
}

impl WebhookGateway {
	/// Create a gateway posting to the given endpoint.
	pub fn new(endpoint: Url) -> Self {
		Self { endpoint, client: reqwest::Client::new() }
	}
}

#[async_trait]
impl DeliveryGateway for WebhookGateway {
	fn mention(&self, user: &UserId) -> String {
		format!("<@{user}>")
	}

	async fn deliver(&self, channel: &ChannelId, text: &str) -> Result<(), DeliveryError> {
		let response = self
			.client
			.post(self.endpoint.clone())
			.json(&OutboundMessage { channel, text })
			.send()
			.await
			.map_err(DeliveryError::Unreachable)?;
		if !response.status().is_success() {
			return Err(DeliveryError::Rejected(response.status()));
		}
		Ok(())
	}
}
