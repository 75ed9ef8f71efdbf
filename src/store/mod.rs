//! Persistent stores.
//!
//! - `persistent`: generic file-backed store with per-subscriber snapshot queues
//! - `codec`: file formats
//! - `messages`, `profiles`, `comments`: domain stores
//! - `combiner`: merged, time-ordered view over list stores

pub mod codec;
pub mod combiner;
pub mod comments;
pub mod messages;
pub mod persistent;
pub mod profiles;

pub use codec::{JsonListCodec, ProfilePrefsCodec};
pub use combiner::{CombinedView, Timestamped, merge};
pub use comments::CommentStore;
pub use messages::MessageStore;
pub use persistent::{Codec, Snapshot, Store, Subscription};
pub use profiles::{ProfileEdit, ProfileStore};
