//! Balance Tester CLI Tool
//!
//! Command-line tool for trying balance rules offline and for driving a
//! running service through RabbitMQ.
//!
//! Usage:
//!   cargo run --bin balance-tester -- --help
//!   cargo run --bin balance-tester rules --config balance.toml
//!   cargo run --bin balance-tester offline --roster roster.json --playtimes hours.json --command balance
//!   cargo run --bin balance-tester send --roster roster.json --command slbalance --listen 10

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use amqprs::{
    channel::{
        BasicConsumeArguments, BasicPublishArguments, Channel, ExchangeDeclareArguments,
        QueueBindArguments, QueueDeclareArguments,
    },
    consumer::AsyncConsumer,
    BasicProperties, Deliver,
};
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use playtime_balance::amqp::connection::{AmqpConfig, AmqpConnection};
use playtime_balance::amqp::messages::{MessageEnvelope, MessageUtils};
use playtime_balance::balance::BalanceAggregator;
use playtime_balance::command::{BalanceCommandHandler, CommandTable, RecordingSink, SentMessage};
use playtime_balance::config::AppConfig;
use playtime_balance::playtime::{
    source_from_settings, InMemoryPlaytimeSource, PlaytimeSource, PlaytimeUnit,
};
use playtime_balance::types::{ChatCommand, Requester, RosterEntry};
use playtime_balance::utils::current_timestamp;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "balance-tester")]
#[command(about = "Tool for exercising playtime balance rules offline and against RabbitMQ")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file; defaults and environment variables otherwise
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// List configured balances and their triggers
    Rules,
    /// Compute a report locally without touching the broker
    Offline {
        /// JSON file with the roster snapshot (array of roster entries)
        #[arg(short, long)]
        roster: PathBuf,
        /// Chat trigger to evaluate
        #[arg(short = 'C', long, default_value = "balance")]
        command: String,
        /// JSON object mapping player ids to hours; the configured provider is used otherwise
        #[arg(short, long)]
        playtimes: Option<PathBuf>,
        /// Player id of the requester
        #[arg(long, default_value = "0")]
        requester: String,
    },
    /// Publish a chat command to the service's command queue
    Send {
        /// JSON file with the roster snapshot (array of roster entries)
        #[arg(short, long)]
        roster: PathBuf,
        /// Chat trigger to send
        #[arg(short = 'C', long, default_value = "balance")]
        command: String,
        /// Player id of the requester
        #[arg(long, default_value = "0")]
        requester: String,
        /// Seconds to wait for replies on the rcon exchange
        #[arg(short, long, default_value = "0")]
        listen: u64,
    },
}

fn load_config(path: Option<&Path>) -> Result<AppConfig> {
    match path {
        Some(path) => AppConfig::from_file(path),
        None => AppConfig::from_env(),
    }
}

fn load_roster(path: &Path) -> Result<Vec<RosterEntry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read roster {}", path.display()))?;
    serde_json::from_str(&content).context("Roster must be a JSON array of roster entries")
}

fn load_playtimes(path: &Path) -> Result<InMemoryPlaytimeSource> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read playtimes {}", path.display()))?;
    let hours: HashMap<String, f64> =
        serde_json::from_str(&content).context("Playtimes must be a JSON object of hours")?;
    Ok(InMemoryPlaytimeSource::with_playtimes(
        PlaytimeUnit::Hours,
        hours,
    ))
}

fn chat_command(command: &str, requester: &str, players: Vec<RosterEntry>) -> ChatCommand {
    ChatCommand {
        command: command.to_string(),
        message: String::new(),
        player: Requester {
            id: requester.to_string(),
            name: "balance-tester".to_string(),
        },
        players,
        timestamp: current_timestamp(),
    }
}

fn print_rules(config: &AppConfig) -> Result<()> {
    let table = CommandTable::from_config(&config.balances)?;

    println!("📋 {} balances configured:", table.len());
    for (rule, triggers) in table.bindings() {
        let mut filters = Vec::new();
        if let Some(squad) = &rule.leader_of_squad {
            filters.push(format!("leader of '{}'", squad));
        }
        if let Some(is_leader) = rule.is_leader {
            filters.push(format!("is_leader = {}", is_leader));
        }
        if let Some(pattern) = &rule.role_pattern {
            filters.push(format!("role ~ /{}/", pattern.as_str()));
        }
        if !rule.has_filters() {
            filters.push("all players".to_string());
        }

        println!("  {} [{}]", rule.name, triggers.join(", "));
        println!("    counts: {}", filters.join(" and "));
        println!("    show total: {}", rule.show_total);
    }

    Ok(())
}

async fn run_offline(
    config: &AppConfig,
    roster: &Path,
    command: &str,
    playtimes: Option<&Path>,
    requester: &str,
) -> Result<()> {
    let table = Arc::new(CommandTable::from_config(&config.balances)?);
    let source = match playtimes {
        Some(path) => PlaytimeSource::PerPlayer(Arc::new(load_playtimes(path)?)),
        None => source_from_settings(&config.playtime)?,
    };

    let sink = Arc::new(RecordingSink::new());
    let handler = BalanceCommandHandler::new(table, BalanceAggregator::new(source), sink.clone());

    let command = chat_command(command, requester, load_roster(roster)?);
    println!(
        "🧪 Evaluating '{}' for {} players",
        command.command,
        command.roster().len()
    );

    if handler.handle(&command).await.is_none() {
        return Err(anyhow!("'{}' is not bound to any balance", command.command));
    }

    for message in sink.sent() {
        match message {
            SentMessage::Broadcast(text) => println!("📢 broadcast:\n{}", text),
            SentMessage::Warn { player_id, text } => println!("🔒 warn {}:\n{}", player_id, text),
        }
    }

    Ok(())
}

async fn run_send(
    config: &AppConfig,
    roster: &Path,
    command: &str,
    requester: &str,
    listen: u64,
) -> Result<()> {
    let amqp_config = AmqpConfig::from_settings(&config.amqp)?;
    println!(
        "🔌 Connecting to RabbitMQ at {}:{}",
        amqp_config.host, amqp_config.port
    );
    let connection = AmqpConnection::new(amqp_config)
        .await
        .context("Failed to connect to RabbitMQ")?;

    // Bind before publishing so no reply is missed
    let reply_channel = if listen > 0 {
        Some(listen_for_replies(&connection, &config.amqp.rcon_exchange).await?)
    } else {
        None
    };

    let command = chat_command(command, requester, load_roster(roster)?);
    MessageUtils::validate_chat_command(&command).context("Invalid chat command")?;
    let payload = MessageUtils::serialize_chat_command(&command)?;

    let mut properties = BasicProperties::default();
    properties
        .with_message_id(&uuid::Uuid::new_v4().to_string())
        .with_timestamp(command.timestamp.timestamp() as u64)
        .with_content_type("application/json");

    let channel = connection.open_channel().await?;
    let args = BasicPublishArguments::new("", &config.amqp.command_queue);
    channel
        .basic_publish(properties, payload, args)
        .await
        .context("Failed to publish chat command")?;

    println!(
        "✅ Sent '{}' with {} roster entries to '{}'",
        command.command,
        command.players.len(),
        config.amqp.command_queue
    );

    if let Some(_channel) = reply_channel {
        println!("👂 Waiting {}s for replies...", listen);
        tokio::time::sleep(Duration::from_secs(listen)).await;
    }

    connection.close().await?;
    Ok(())
}

async fn listen_for_replies(connection: &AmqpConnection, exchange: &str) -> Result<Channel> {
    let channel = connection.open_channel().await?;

    channel
        .exchange_declare(ExchangeDeclareArguments::new(exchange, "topic"))
        .await
        .context("Failed to declare rcon exchange")?;

    let queue = format!("balance-tester-replies-{}", uuid::Uuid::new_v4());
    let args = QueueDeclareArguments::new(&queue)
        .exclusive(true)
        .auto_delete(true)
        .finish();
    channel
        .queue_declare(args)
        .await
        .context("Failed to declare reply queue")?;

    channel
        .queue_bind(QueueBindArguments::new(&queue, exchange, "rcon.#"))
        .await
        .context("Failed to bind reply queue")?;

    let consumer_tag = format!("balance-tester-{}", uuid::Uuid::new_v4());
    channel
        .basic_consume(
            ReplyPrinter,
            BasicConsumeArguments::new(&queue, &consumer_tag)
                .manual_ack(false)
                .finish(),
        )
        .await
        .context("Failed to consume replies")?;

    debug!("Listening for replies on {}", queue);
    Ok(channel)
}

/// Prints every reply published by the service
struct ReplyPrinter;

#[async_trait]
impl AsyncConsumer for ReplyPrinter {
    async fn consume(
        &mut self,
        _channel: &Channel,
        deliver: Deliver,
        _basic_properties: BasicProperties,
        content: Vec<u8>,
    ) {
        match MessageEnvelope::<serde_json::Value>::from_bytes(&content) {
            Ok(envelope) => println!(
                "📨 {} ({}): {}",
                deliver.routing_key(),
                envelope.correlation_id,
                envelope.payload
            ),
            Err(e) => println!("❌ Unreadable reply on {}: {}", deliver.routing_key(), e),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    info!("Loaded {} balances", config.balances.len());

    match cli.command {
        Commands::Rules => print_rules(&config)?,
        Commands::Offline {
            roster,
            command,
            playtimes,
            requester,
        } => {
            run_offline(
                &config,
                &roster,
                &command,
                playtimes.as_deref(),
                &requester,
            )
            .await?
        }
        Commands::Send {
            roster,
            command,
            requester,
            listen,
        } => run_send(&config, &roster, &command, &requester, listen).await?,
    }

    Ok(())
}
