use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use nourish::config::{AppConfig, DEFAULT_DATABASE_PATH};
use nourish::types::reminders::NotificationAssets;

const DEFAULT_PORT: u16 = 8080;
const DEFAULT_PUSH_TIMEOUT: &str = "10s";

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve { port: u16, config: AppConfig },
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }

    match resolve_config(cli) {
        Ok((port, config)) => RunOutcome::Serve { port, config },
        Err(err) => {
            eprintln!("error: {err}");
            RunOutcome::Exit(2)
        }
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "nourish",
    version,
    about = "Meal plan server with push meal reminders"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, env = "NOURISH_DATABASE_PATH", default_value = DEFAULT_DATABASE_PATH)]
    database: PathBuf,
    #[arg(long, env = "NOURISH_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,
    #[arg(long, env = "NOURISH_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "NOURISH_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "NOURISH_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
    #[arg(long, env = "NOURISH_NOTIFICATION_ICON")]
    notification_icon: Option<String>,
    #[arg(long, env = "NOURISH_NOTIFICATION_BADGE")]
    notification_badge: Option<String>,
    #[arg(long, env = "NOURISH_PUSH_TIMEOUT", default_value = DEFAULT_PUSH_TIMEOUT)]
    push_timeout: String,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print a fresh VAPID key pair to configure push reminders with.
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn run_init(args: InitArgs) -> i32 {
    let credentials = match nourish::generate_vapid_credentials() {
        Ok(credentials) => credentials,
        Err(err) => {
            eprintln!("failed to generate VAPID credentials: {err}");
            return 1;
        }
    };
    let (subject, show_subject_note) = match args.subject {
        Some(subject) => (subject, false),
        None => ("mailto:you@example.com".to_string(), true),
    };

    println!("VAPID credentials generated.");
    println!();
    println!("NOURISH_VAPID_PRIVATE_KEY=\"{}\"", credentials.private_key);
    println!("NOURISH_VAPID_PUBLIC_KEY=\"{}\"", credentials.public_key);
    println!("NOURISH_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace NOURISH_VAPID_SUBJECT with a contact URI you control.");
    }
    println!();
    println!(
        "--vapid-private-key \"{}\" --vapid-public-key \"{}\" --vapid-subject \"{subject}\"",
        credentials.private_key, credentials.public_key
    );
    0
}

fn resolve_config(cli: Cli) -> Result<(u16, AppConfig), String> {
    let push_timeout = parse_push_timeout(&cli.push_timeout)?;
    let defaults = NotificationAssets::default();
    let asset = |value: Option<String>, fallback: String| -> Result<String, String> {
        match value.as_deref().map(str::trim) {
            None | Some("") => Ok(fallback),
            Some(path) if path.starts_with('/') || path.starts_with("https://") => {
                Ok(path.to_string())
            }
            Some(path) => Err(format!(
                "notification asset '{path}' must be an absolute path or https URL"
            )),
        }
    };

    let config = AppConfig {
        database_path: cli.database,
        vapid_private_key: cli.vapid_private_key,
        vapid_public_key: cli.vapid_public_key,
        vapid_subject: cli.vapid_subject,
        notification_icon: asset(cli.notification_icon, defaults.icon)?,
        notification_badge: asset(cli.notification_badge, defaults.badge)?,
        push_timeout,
    };
    Ok((cli.port, config))
}

fn parse_push_timeout(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    if value.is_empty() {
        return Err("push timeout cannot be empty".to_string());
    }

    let (amount, unit) = match value.chars().last() {
        Some(ch) if ch.is_ascii_alphabetic() => {
            (&value[..value.len() - 1], ch.to_ascii_lowercase())
        }
        _ => (value, 's'),
    };

    let amount: u64 = amount
        .parse()
        .map_err(|_| format!("invalid push timeout '{value}'; expected <number>[s|m]"))?;

    if amount == 0 {
        return Err("push timeout must be greater than 0".to_string());
    }

    match unit {
        's' => Ok(Duration::from_secs(amount)),
        'm' => Ok(Duration::from_secs(amount * 60)),
        _ => Err(format!(
            "invalid push timeout '{value}'; expected <number>[s|m]"
        )),
    }
}
