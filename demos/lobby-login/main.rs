use std::{error::Error, sync::Arc};

use clap::Parser;
use demos::{apply_overrides, credentials, Args, CommandUid, EnvOverrides};
use faf_lobby::{
    Config, ConnectionState, LobbyClient, ServerMessage, ServerMessageType, StaticCredentials,
};
use flexi_logger::Logger;
use log::{error, info};
use tokio::signal;

#[tokio::main]
async fn main() {
    let _logger = match Logger::try_with_env_or_str("info").and_then(|l| l.start()) {
        Ok(handle) => handle,
        Err(e) => {
            eprintln!("init logger error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run().await {
        error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    // 获取配置
    let mut cfg = match &args.config {
        Some(path) => Config::from_path(path).await?,
        None => Config::default(),
    };
    let env = EnvOverrides::from_env()?;
    apply_overrides(&mut cfg, &env, &args);
    let credentials = credentials(&env, &args).ok_or("username and password required")?;

    let client = LobbyClient::new(
        cfg,
        Arc::new(StaticCredentials(credentials)),
        Arc::new(CommandUid {
            command: args.uid_command.clone(),
        }),
    );

    let listeners = client.listeners();
    let _subscriptions = vec![
        listeners.on_notice(|notice| info!("[{}] {}", notice.style, notice.text)),
        listeners.on_game_type_info(|info| info!("game type {}: {}", info.name, info.fullname)),
        listeners.on_game_info(|game| {
            info!(
                "game {} \"{}\" on {} ({}/{}) {:?}",
                game.uid, game.title, game.mapname, game.num_players, game.max_players, game.state
            )
        }),
        listeners.on_player_info(|player| info!("player {} online", player.login)),
        listeners.on_game_launch(|launch| {
            info!("launch game {} ({})", launch.uid, launch.featured_mod)
        }),
        client.add_listener(ServerMessageType::Social, |message| {
            if let ServerMessage::Social(social) = message {
                info!("social update: {:?}", social)
            }
        }),
    ];

    let session = client.connect_and_log_in().await?;
    info!(
        "logged in, player id {:?}, session {}, email {}",
        session.id, session.session, session.email
    );

    // 等待 ctrl-c 或者连接断开
    let mut state = client.state_changes();
    tokio::select! {
        _ = signal::ctrl_c() => info!("ctrl-c received, disconnecting"),
        _ = state.wait_for(|s| *s == ConnectionState::Disconnected) => {
            info!("connection closed by server")
        }
    }

    client.disconnect().await;
    Ok(())
}
