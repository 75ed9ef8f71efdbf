//! Sendback: local reactive persistence for a feedback-exchange app.
//!
//! Stores for messages, profiles and comments keep an in-memory snapshot and
//! a backing file in step, publish every commit to subscribers, and fold in
//! text from a generative backend that softens feedback before delivery.

pub mod assets;
pub mod auth;
pub mod config;
pub mod display;
pub mod error;
pub mod feedback;
pub mod gateway;
pub mod model;
pub mod persona;
pub mod store;

pub use assets::{AssetStager, EditSession, ImageRef};
pub use auth::{AuthState, StaticAuth};
pub use config::Config;
pub use error::{Error, Result};
pub use feedback::{FeedbackService, PollBoard};
pub use gateway::TextGateway;
pub use model::{Comment, Message, MessageId, MessageStatus, Poll, Profile};
pub use persona::PersonaAssigner;
pub use store::{CombinedView, CommentStore, MessageStore, ProfileEdit, ProfileStore, Store};
