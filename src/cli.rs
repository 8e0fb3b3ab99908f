use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;

pub(crate) enum RunOutcome {
    Serve {
        addr: SocketAddr,
        config: pushgate::config::AppConfig,
    },
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();
    if let Some(Command::Init(args)) = cli.command {
        let code = run_init(args);
        return RunOutcome::Exit(code);
    }

    let push_fanout_limit = match resolve_fanout_limit(cli.push_fanout_limit) {
        Ok(limit) => limit,
        Err(err) => {
            eprintln!("error: {err}");
            return RunOutcome::Exit(2);
        }
    };

    RunOutcome::Serve {
        addr: cli.bind,
        config: pushgate::config::AppConfig {
            app_name: cli.app_name,
            vapid_private_key: cli.vapid_private_key,
            vapid_public_key: cli.vapid_public_key,
            vapid_subject: cli.vapid_subject,
            push_fanout_limit,
        },
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "pushgate",
    version,
    about = "Browser push notification service"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
    #[arg(long, default_value = "127.0.0.1:3000")]
    bind: SocketAddr,
    #[arg(long, default_value = "Pushgate")]
    app_name: String,
    #[arg(long, env = "PUSHGATE_VAPID_PRIVATE_KEY")]
    vapid_private_key: Option<String>,
    #[arg(long, env = "PUSHGATE_VAPID_PUBLIC_KEY")]
    vapid_public_key: Option<String>,
    #[arg(long, env = "PUSHGATE_VAPID_SUBJECT")]
    vapid_subject: Option<String>,
    #[arg(long, env = "PUSHGATE_PUSH_FANOUT_LIMIT")]
    push_fanout_limit: Option<usize>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a VAPID key pair and print it as environment variables.
    Init(InitArgs),
}

#[derive(Args, Debug)]
struct InitArgs {
    #[arg(long)]
    subject: Option<String>,
}

fn resolve_fanout_limit(raw: Option<usize>) -> Result<usize, String> {
    match raw {
        None => Ok(pushgate::push::DEFAULT_FANOUT_LIMIT),
        Some(0) => Err("push fanout limit must be greater than 0".to_string()),
        Some(limit) => Ok(limit),
    }
}

fn run_init(args: InitArgs) -> i32 {
    let keys = match pushgate::generate_vapid_keys() {
        Ok(keys) => keys,
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
    println!("PUSHGATE_VAPID_PRIVATE_KEY=\"{}\"", keys.private_key);
    println!("PUSHGATE_VAPID_PUBLIC_KEY=\"{}\"", keys.public_key);
    println!("PUSHGATE_VAPID_SUBJECT=\"{subject}\"");
    if show_subject_note {
        println!();
        println!("Note: replace PUSHGATE_VAPID_SUBJECT with a contact URI you control.");
    }
    0
}
