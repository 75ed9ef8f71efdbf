//! CLI argument parsing for Sendback.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "sendback",
    about = "Send anonymous, softened feedback to friends",
    version,
    after_help = "Logs are written to: <data_dir>/logs/sendback.log"
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Act as a signed-in user with this id
    #[arg(short, long, global = true, env = "SENDBACK_USER")]
    pub user: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Send feedback to a friend
    Send {
        /// Recipient name
        recipient: String,

        /// Feedback text
        content: String,

        /// Arrival time label, e.g. "20 : 00"
        #[arg(short, long, default_value = "20 : 00")]
        at: String,
    },

    /// Show sent and received messages, newest first
    Inbox,

    /// Show sent messages
    Sent,

    /// Show received messages
    Received,

    /// Set the status of a message
    Status {
        /// Message ID
        id: String,

        /// New status
        #[arg(value_enum)]
        status: StatusArg,
    },

    /// Post a comment
    Comment {
        /// Comment text
        text: String,
    },

    /// Post a generated reaction to an opinion
    Reply {
        /// Opinion to react to
        input: String,
    },

    /// Show comments, newest first
    Comments,

    /// Open a vote on a received message
    Poll {
        /// Message ID
        id: String,
    },

    /// Manage friends
    #[command(subcommand)]
    Friends(FriendsCommand),

    /// Show or edit a profile
    #[command(subcommand)]
    Profile(ProfileCommand),
}

#[derive(Subcommand)]
pub enum FriendsCommand {
    /// List friends
    List,

    /// Add a friend
    Add {
        /// Friend name
        name: String,

        /// Phone number (dashes are ignored)
        phone: String,
    },
}

#[derive(Subcommand)]
pub enum ProfileCommand {
    /// Show a profile
    Show {
        /// Profile ID ("me" or a friend's phone number)
        #[arg(default_value = "me")]
        id: String,
    },

    /// Edit a profile
    Edit {
        /// Profile ID ("me" or a friend's phone number)
        #[arg(default_value = "me")]
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        status_message: Option<String>,

        /// Arrival time label, e.g. "21 : 30"
        #[arg(long)]
        arrival_time: Option<String>,

        /// Caption shown next to the arrival time
        #[arg(long)]
        arrival_label: Option<String>,

        /// Image file to use as the profile picture
        #[arg(long)]
        image: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StatusArg {
    Sent,
    Failed,
}
