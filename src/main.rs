/*
 * main.rs
 * Copyright (C) 2026 Chris Burdess
 *
 * This file is part of Wsframe, a server-side WebSocket engine.
 *
 * Wsframe is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * Wsframe is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with Wsframe.  If not, see <http://www.gnu.org/licenses/>.
 */

//! Echo server: answers every WebSocket message with itself.
//!
//! Usage: `wsframe [config.json]`. Settings can also come from `WSFRAME_BIND`,
//! `WSFRAME_MAX_PAYLOAD` and `WSFRAME_REQUIRE_MASK`; set `WSFRAME_DEBUG=1` for
//! per-frame logging.

use std::process::ExitCode;

use tokio::net::TcpListener;
use tokio::sync::watch;

use wsframe::config::{self, Config};
use wsframe::websocket::{serve, Message};
use wsframe::{debug_log, warn_log, HandlerError};

fn echo(message: Message) -> Result<Message, HandlerError> {
    Ok(message)
}

#[tokio::main]
async fn main() -> ExitCode {
    let mut config = match std::env::args().nth(1) {
        Some(path) => match config::load_config(&path) {
            Ok(c) => c,
            Err(e) => {
                warn_log!("Failed to load config: {}", e);
                return ExitCode::FAILURE;
            }
        },
        None => Config::new(),
    };
    if let Err(e) = config.apply_env() {
        warn_log!("{}", e);
        return ExitCode::FAILURE;
    }

    let listener = match TcpListener::bind(&config.bind_address).await {
        Ok(l) => l,
        Err(e) => {
            warn_log!("Could not bind {}: {}", config.bind_address, e);
            return ExitCode::FAILURE;
        }
    };
    println!("Listening on ws://{}", config.bind_address);

    // Flipped to true on Ctrl-C; every session watches it between frames.
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer) = match accepted {
                    Ok(a) => a,
                    Err(e) => {
                        warn_log!("Accept failed: {}", e);
                        continue;
                    }
                };
                debug_log!("Connection from {}", peer);
                let config = config.clone();
                let cancel = shutdown_rx.clone();
                tokio::spawn(async move {
                    let mut handler = echo;
                    match serve(stream, &mut handler, &config, Some(cancel)).await {
                        Ok(()) => {
                            debug_log!("Connection from {} closed", peer);
                        }
                        Err(e) => {
                            warn_log!("Connection from {} failed: {}", peer, e);
                        }
                    }
                });
            }
            _ = tokio::signal::ctrl_c() => {
                println!("Shutting down");
                let _ = shutdown_tx.send(true);
                break;
            }
        }
    }
    ExitCode::SUCCESS
}
