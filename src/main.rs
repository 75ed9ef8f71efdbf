//! Sendback CLI entry point.

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use log::info;
use std::fs;
use std::path::Path;
use std::sync::Arc;

mod cli;

use cli::{Cli, Command, FriendsCommand, ProfileCommand, StatusArg};
use sendback::assets::AssetStager;
use sendback::auth::StaticAuth;
use sendback::config::Config;
use sendback::feedback::FeedbackService;
use sendback::gateway::TextGateway;
use sendback::model::{Comment, Message, MessageStatus, Profile};
use sendback::persona::PersonaAssigner;
use sendback::store::{CommentStore, MessageStore, ProfileStore};

fn setup_logging(log_dir: &Path) -> Result<()> {
    fs::create_dir_all(log_dir).context("Failed to create log directory")?;

    let log_file = log_dir.join("sendback.log");

    let target = Box::new(
        fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)
            .context("Failed to open log file")?,
    );

    env_logger::Builder::from_default_env()
        .target(env_logger::Target::Pipe(target))
        .init();

    info!("Logging initialized, writing to: {}", log_file.display());
    Ok(())
}

/// Everything a command needs, opened once.
struct App {
    messages: Arc<MessageStore>,
    comments: Arc<CommentStore>,
    profiles: ProfileStore,
    feedback: FeedbackService,
}

impl App {
    async fn open(config: &Config, user: Option<String>) -> Self {
        let personas = PersonaAssigner::new();

        let messages = Arc::new(
            MessageStore::open(
                config.sent_messages_path(),
                config.received_messages_path(),
                personas.clone(),
            )
            .await,
        );
        let comments = Arc::new(CommentStore::open(config.comments_path()).await);
        let profiles = ProfileStore::open(
            config.profile_prefs_path(),
            config.friends_path(),
            AssetStager::new(config.images_dir()),
        )
        .await;

        let auth = match user {
            Some(id) => StaticAuth::signed_in(id),
            None => StaticAuth::signed_out(),
        };
        let feedback = FeedbackService::new(
            Arc::clone(&messages),
            Arc::clone(&comments),
            TextGateway::from_settings(&config.gateway),
            personas,
            Arc::new(auth),
        );

        Self {
            messages,
            comments,
            profiles,
            feedback,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    setup_logging(&config.log_dir()).context("Failed to setup logging")?;

    info!("Starting with data dir: {}", config.data_dir.display());

    let app = App::open(&config, cli.user).await;

    match cli.command {
        Some(cmd) => run_command(&app, cmd).await,
        None => {
            show_inbox(&app);
            Ok(())
        }
    }
}

async fn run_command(app: &App, command: Command) -> Result<()> {
    match command {
        Command::Send { recipient, content, at } => {
            let message = app
                .feedback
                .send_message(&recipient, &content, &at)
                .await
                .context("Failed to send message")?;
            match message.status {
                MessageStatus::Failed => println!(
                    "{} Stored for {} but the text could not be softened",
                    "!".yellow(),
                    recipient.bold()
                ),
                _ => println!(
                    "{} Sent to {} as {}",
                    "✓".green(),
                    recipient.bold(),
                    message.anonymous_name.cyan()
                ),
            }
            print_message(&message);
        }

        Command::Inbox => show_inbox(app),

        Command::Sent => print_messages("Sent", &app.messages.sent_messages()),

        Command::Received => print_messages("Received", &app.messages.received_messages()),

        Command::Status { id, status } => {
            let status = match status {
                StatusArg::Sent => MessageStatus::Sent,
                StatusArg::Failed => MessageStatus::Failed,
            };
            app.messages
                .update_status(&id, status)
                .await
                .context("Failed to update status")?;
            println!("{} {} is now {}", "✓".green(), id.bold(), status_label(status));
        }

        Command::Comment { text } => {
            let comment = app.feedback.add_comment(&text).await.context("Failed to add comment")?;
            println!("{} Posted as {}", "✓".green(), comment.author.cyan());
        }

        Command::Reply { input } => {
            let comment = app
                .feedback
                .add_generated_reply(&input)
                .await
                .context("Failed to add reply")?;
            print_comment(&comment);
        }

        Command::Comments => {
            let comments = app.comments.comments();
            println!("{} ({})", "Comments".bold(), comments.len());
            for comment in comments.iter() {
                print_comment(comment);
            }
        }

        Command::Poll { id } => match app.messages.received_by_id(&id) {
            Some(message) => {
                let poll = app.feedback.create_poll(&message);
                println!("{}", poll.title.bold());
                println!("  {}", poll.subtitle.dimmed());
                println!("  {}", poll.content);
            }
            None => eprintln!("{} No received message with id {}", "✗".red(), id),
        },

        Command::Friends(FriendsCommand::List) => {
            let friends = app.profiles.friends();
            if friends.is_empty() {
                println!("No friends yet");
            }
            for friend in friends.iter() {
                println!("{} {}  {}", friend.id.dimmed(), friend.name.bold(), friend.status_message);
            }
        }

        Command::Friends(FriendsCommand::Add { name, phone }) => {
            let friend = app
                .profiles
                .add_friend(&name, &phone)
                .await
                .context("Failed to add friend")?;
            println!("{} Added {} ({})", "✓".green(), friend.name.bold(), friend.id);
        }

        Command::Profile(ProfileCommand::Show { id }) => print_profile(&app.profiles.profile(&id)),

        Command::Profile(ProfileCommand::Edit {
            id,
            name,
            status_message,
            arrival_time,
            arrival_label,
            image,
        }) => {
            let mut edit = app.profiles.begin_edit(&id).context("Failed to start edit")?;
            if let Some(name) = name {
                edit.set_name(name);
            }
            if let Some(status) = status_message {
                edit.set_status_message(status);
            }
            if let Some(time) = arrival_time {
                edit.set_arrival_time(time);
            }
            if let Some(label) = arrival_label {
                edit.set_arrival_time_label(label);
            }
            if let Some(path) = image {
                let mut file = tokio::fs::File::open(&path)
                    .await
                    .with_context(|| format!("Failed to open image {}", path.display()))?;
                edit.stage_image(&mut file).await.context("Failed to stage image")?;
            }
            let saved = edit.save().await.context("Failed to save profile")?;
            println!("{} Profile saved", "✓".green());
            print_profile(&saved);
        }
    }

    Ok(())
}

fn show_inbox(app: &App) {
    let view = app.messages.combined();
    print_messages("Inbox", &view.current());
}

fn status_label(status: MessageStatus) -> ColoredString {
    match status {
        MessageStatus::Queued => "queued".yellow(),
        MessageStatus::Sent => "sent".green(),
        MessageStatus::Failed => "failed".red(),
    }
}

fn print_messages(title: &str, messages: &[Message]) {
    println!("{} ({})", title.bold(), messages.len());
    for message in messages {
        print_message(message);
    }
}

fn print_message(message: &Message) {
    println!(
        "{} {} [{}] {} → {}",
        message.id.to_string().dimmed(),
        message.time.format("%Y-%m-%d %H:%M"),
        status_label(message.status),
        message.anonymous_name.cyan(),
        message.name.bold()
    );
    println!("    {}", message.transformed_content);
}

fn print_comment(comment: &Comment) {
    println!("{}: {}", comment.author.cyan(), comment.text);
}

fn print_profile(profile: &Profile) {
    println!("{} {}", profile.name.bold(), format!("({})", profile.id).dimmed());
    println!("  {}", profile.status_message);
    println!("  {}: {}", profile.arrival_time_label, profile.arrival_time_display());
    println!("  image: {}", profile.display_image());
}
