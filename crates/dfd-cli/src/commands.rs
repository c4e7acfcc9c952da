//! Command-line parsing and the handlers behind each subcommand.

use std::io::{self, BufRead, Write};

use anyhow::{bail, Context, Result};
use dfd_core::auth::validation;
use dfd_core::models::{ContactUser, NewAccount};
use dfd_core::SessionManager;
use tracing::warn;

use crate::config::Config;

pub const USAGE: &str = "\
Usage: dfd <command> [args]

Commands:
  login [email]                 Sign in and store tokens
  logout                        Forget stored tokens
  whoami                        Show the signed-in user
  refresh                       Renew the access token now
  signup <name> <email>         Create an account
  activate <uid> <token>        Activate an account from the emailed link
  reset-password <email>        Request a password reset email
  confirm-reset <uid> <token>   Set a new password from the reset email
  contacts [list]               List contacts: accepted (default), sent, received, search
  contact add <user-id>         Send a contact request
  contact accept <user-id>      Accept a pending request
  contact remove <user-id>      Remove a contact or pending request
  help                          Show this message";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactList {
    Accepted,
    PendingSent,
    PendingReceived,
    Search,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Login { email: Option<String> },
    Logout,
    WhoAmI,
    Refresh,
    SignUp { name: String, email: String },
    Activate { uid: String, token: String },
    ResetPassword { email: String },
    ConfirmReset { uid: String, token: String },
    Contacts(ContactList),
    AddContact(i64),
    AcceptContact(i64),
    RemoveContact(i64),
    Help,
}

fn user_id(arg: Option<&String>) -> Result<i64> {
    let raw = arg.ok_or_else(|| anyhow::anyhow!("Missing user id"))?;
    raw.parse()
        .with_context(|| format!("'{}' is not a valid user id", raw))
}

fn required(arg: Option<&String>, what: &str) -> Result<String> {
    arg.cloned()
        .ok_or_else(|| anyhow::anyhow!("Missing {}", what))
}

impl Command {
    /// Parse the arguments after the program name.
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some(first) = args.first() else {
            return Ok(Command::Help);
        };
        let rest = &args[1..];

        let command = match first.as_str() {
            "login" => Command::Login {
                email: rest.first().cloned(),
            },
            "logout" => Command::Logout,
            "whoami" | "me" => Command::WhoAmI,
            "refresh" => Command::Refresh,
            "signup" => Command::SignUp {
                name: required(rest.first(), "name")?,
                email: required(rest.get(1), "email")?,
            },
            "activate" => Command::Activate {
                uid: required(rest.first(), "uid")?,
                token: required(rest.get(1), "token")?,
            },
            "reset-password" => Command::ResetPassword {
                email: required(rest.first(), "email")?,
            },
            "confirm-reset" => Command::ConfirmReset {
                uid: required(rest.first(), "uid")?,
                token: required(rest.get(1), "token")?,
            },
            "contacts" => Command::Contacts(match rest.first().map(String::as_str) {
                None | Some("accepted") => ContactList::Accepted,
                Some("sent") => ContactList::PendingSent,
                Some("received") => ContactList::PendingReceived,
                Some("search") => ContactList::Search,
                Some(other) => bail!("Unknown contact list '{}'", other),
            }),
            "contact" => match rest.first().map(String::as_str) {
                Some("add") => Command::AddContact(user_id(rest.get(1))?),
                Some("accept") => Command::AcceptContact(user_id(rest.get(1))?),
                Some("remove") => Command::RemoveContact(user_id(rest.get(1))?),
                Some(other) => bail!("Unknown contact action '{}'", other),
                None => bail!("Missing contact action (add, accept or remove)"),
            },
            "help" | "--help" | "-h" => Command::Help,
            other => bail!("Unknown command '{}'\n\n{}", other, USAGE),
        };
        Ok(command)
    }
}

fn prompt_line(label: &str) -> Result<String> {
    eprint!("{}", label);
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

fn prompt_password(label: &str) -> Result<String> {
    rpassword::prompt_password(label).context("Failed to read password")
}

fn print_users(users: &[ContactUser]) {
    if users.is_empty() {
        println!("(none)");
        return;
    }
    for user in users {
        println!("{:>6}  {:<24} {}", user.id, user.name, user.email);
    }
}

pub async fn run(command: Command, session: &SessionManager, config: &mut Config) -> Result<()> {
    match command {
        Command::Help => println!("{}", USAGE),

        Command::Login { email } => {
            let email = match email.or_else(|| config.last_email.clone()) {
                Some(email) => email,
                None => prompt_line("Email: ")?,
            };
            validation::validate_email(&email)?;
            let password = prompt_password("Password: ")?;
            validation::validate_login_password(&password)?;

            let user = session.login(&email, &password).await?;
            config.last_email = Some(email);
            if let Err(e) = config.save() {
                warn!(error = %e, "Failed to save config");
            }
            println!("Signed in as {} <{}>", user.display_name(), user.email);
        }

        Command::Logout => {
            session.logout();
            println!("Signed out");
        }

        Command::WhoAmI => match session.current_user().await {
            Some(user) => println!("{} <{}> (id {}, {})", user.display_name(), user.email, user.id, user.status),
            None => println!("Not signed in"),
        },

        Command::Refresh => {
            session.refresh().await?;
            println!("Access token renewed");
        }

        Command::SignUp { name, email } => {
            let password = prompt_password("Password: ")?;
            let password_confirmation = prompt_password("Confirm password: ")?;
            let account = NewAccount {
                name,
                email,
                password,
                password_confirmation,
            };
            session.identity().register(&account).await?;
            println!("Account created. Check {} for the activation link.", account.email);
        }

        Command::Activate { uid, token } => {
            session.identity().activate(&uid, &token).await?;
            println!("Account activated. You can now log in.");
        }

        Command::ResetPassword { email } => {
            session.identity().request_password_reset(&email).await?;
            println!("If {} has an account, a reset link is on its way.", email);
        }

        Command::ConfirmReset { uid, token } => {
            let new_password = prompt_password("New password: ")?;
            let confirmation = prompt_password("Confirm new password: ")?;
            session
                .identity()
                .confirm_password_reset(&uid, &token, &new_password, &confirmation)
                .await?;
            println!("Password updated.");
        }

        Command::Contacts(list) => {
            let users = match list {
                ContactList::Accepted => session.accepted_contacts().await?,
                ContactList::PendingSent => session.pending_sent().await?,
                ContactList::PendingReceived => session.pending_received().await?,
                ContactList::Search => session.discoverable_users().await?,
            };
            print_users(&users);
        }

        Command::AddContact(id) => {
            let contact = session.send_contact_request(id).await?;
            println!("Request {} sent to user {}", contact.id, contact.receiver);
        }

        Command::AcceptContact(id) => {
            session.accept_contact(id).await?;
            println!("Accepted request from user {}", id);
        }

        Command::RemoveContact(id) => {
            session.remove_contact(id).await?;
            println!("Removed user {}", id);
        }
    }
    Ok(())
}
