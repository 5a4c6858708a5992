//! Chat-channel plumbing: inbound activity model, delivery validation and the
//! outbound reply connector.

pub mod activity;
pub mod auth;
pub mod connector;

pub use activity::{Activity, ActivityError, ActivityKind, ChannelAccount, ConversationAccount};
pub use auth::{AuthError, BotAuthValidator, DeliveryValidator};
pub use connector::{BotConnectorClient, ChannelConnector, ConnectorError};
