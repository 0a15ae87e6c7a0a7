mod console;

use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use console::ConsoleNotifier;
use identity_client::{build_store, AnonymousIdentityResolver, HttpIdentityApi};
use shared::{
    AnonymousIdentityState, ApiConfig, LogFormat, ResolverConfig, StoreBackend, StoreConfig,
    TopicId,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Manage per-topic anonymous identities")]
struct Args {
    /// Local cache backend; overrides IDENTITY_STORE.
    #[arg(long, global = true)]
    store: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the identity a dialog would show for a topic.
    Load {
        topic: String,
        /// Caller already displays this topic anonymously.
        #[arg(long)]
        anonymous: bool,
        /// Caller's last known pseudonym.
        #[arg(long)]
        name: Option<String>,
    },
    /// Post anonymously in a topic under the given name.
    Enable {
        topic: String,
        #[arg(long)]
        name: String,
    },
    /// Post under the real account name again.
    Disable { topic: String },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    shared::init_tracing("identity-cli", LogFormat::from_env())?;

    let args = Args::parse();

    let api_config = ApiConfig::from_env()?;
    let resolver_config = ResolverConfig::from_env()?;
    let mut store_config = StoreConfig::from_env()?;
    if let Some(backend) = &args.store {
        store_config.backend = backend.parse::<StoreBackend>()?;
    }

    tracing::debug!(
        api_url = %api_config.base_url,
        store = ?store_config.backend,
        delete_policy = ?resolver_config.delete_policy,
        "Configuration loaded"
    );

    let api = HttpIdentityApi::new(&api_config)?;
    let store = build_store(&store_config).await?;
    let resolver = AnonymousIdentityResolver::new(Arc::new(api), store, Arc::new(ConsoleNotifier))
        .with_delete_policy(resolver_config.delete_policy);

    match args.command {
        Command::Load {
            topic,
            anonymous,
            name,
        } => {
            let topic_id = TopicId::new(topic)?;
            let hint = AnonymousIdentityState::new(anonymous, name);
            let state = resolver.load(&topic_id, &hint).await;
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Enable { topic, name } => {
            let topic_id = TopicId::new(topic)?;
            let desired = AnonymousIdentityState::anonymous(name);
            save(&resolver, &topic_id, &desired).await
        }
        Command::Disable { topic } => {
            let topic_id = TopicId::new(topic)?;
            save(&resolver, &topic_id, &AnonymousIdentityState::public()).await
        }
    }
}

async fn save(
    resolver: &AnonymousIdentityResolver,
    topic_id: &TopicId,
    desired: &AnonymousIdentityState,
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    match resolver.save(topic_id, desired).await {
        Ok(state) => {
            println!("{}", serde_json::to_string_pretty(&state)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) if e.is_validation() => {
            eprintln!("❌ {}", e);
            Ok(ExitCode::from(2))
        }
        // Already reported through the notifier.
        Err(_) => Ok(ExitCode::FAILURE),
    }
}
