use anyhow::Result;
use clap::{Parser, Subcommand};
use dotenv::dotenv;
use std::path::PathBuf;

mod compare;
mod session;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive chat session representing a person
    Session {
        /// Directory holding summary.txt and profile.txt
        #[arg(long, default_value = "me")]
        me: PathBuf,

        /// Name of the person the chatbot represents
        #[arg(long)]
        name: String,

        /// Return replies directly, without judging them
        #[arg(long)]
        no_gate: bool,
    },
    /// Ask a single question and exit
    Ask {
        /// Directory holding summary.txt and profile.txt
        #[arg(long, default_value = "me")]
        me: PathBuf,

        /// Name of the person the chatbot represents
        #[arg(long)]
        name: String,

        /// Return the reply directly, without judging it
        #[arg(long)]
        no_gate: bool,

        /// The message to send
        message: String,
    },
    /// Pose one question to every configured provider and rank the answers
    Compare {
        /// Question to pose; generated by the primary provider when omitted
        #[arg(long)]
        prompt: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Session { me, name, no_gate } => {
            let chat = session::Chat::build(&me, &name, !no_gate)?;
            session::run(chat).await
        }
        Command::Ask {
            me,
            name,
            no_gate,
            message,
        } => {
            let chat = session::Chat::build(&me, &name, !no_gate)?;
            session::ask(chat, &message).await
        }
        Command::Compare { prompt } => compare::run(prompt).await,
    }
}
