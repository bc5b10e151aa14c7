//! Interactive terminal chat with the trainer agent.
//!
//! Reads one driver turn per line from stdin. `exit`, `quit` or `bye`
//! ends the session.

use std::sync::Arc;

use agent_core::{GenerationOptions, TurnReport};
use agent_server::config::ServerConfig;
use gym_trainer::{COACH_TEMPERATURE, FAREWELL, GREETING, JsonFileStore, assemble_trainer_agent};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

fn print_turn(report: &TurnReport) {
    for reply in &report.replies {
        println!("\nCoach AI: {reply}\n");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    agent_server::init_tracing("warn");

    let config = ServerConfig::from_env()?;
    let (gateway, model) = config.gateway()?;
    let profiles = Arc::new(JsonFileStore::new(config.data_dir.clone()));

    let options = GenerationOptions {
        temperature: COACH_TEMPERATURE,
        ..GenerationOptions::for_model(model)
    };
    let agent = assemble_trainer_agent(gateway, profiles, options)?;

    println!("\n{}", "=".repeat(60));
    println!("  Welcome to Coach AI: Your Personal Gym Trainer");
    println!("  Type 'quit' or 'exit' to end the session.");
    println!("{}", "=".repeat(60));

    let (mut session, turn) = agent.open(GREETING).await;
    match turn {
        Ok(report) => print_turn(&report),
        Err(e) => {
            eprintln!("\n{}\n", e.user_message());
            return Ok(());
        }
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        stdout.write_all(b"You: ").await?;
        stdout.flush().await?;

        // EOF ends the session like an end word
        let Some(line) = lines.next_line().await? else {
            println!("\nCoach AI: {FAREWELL}\n");
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let input = agent.interpret(&line);
        let farewell = input == agent_core::DriverInput::End;

        match agent.submit(&mut session, input).await {
            Ok(report) => {
                for tool in &report.tools {
                    println!("  [Using {}...]", tool.name);
                }
                print_turn(&report);
                if farewell {
                    println!("\nCoach AI: {FAREWELL}\n");
                }
                if report.ended {
                    break;
                }
            }
            Err(e) => {
                eprintln!("\n{}\n", e.user_message());
                break;
            }
        }
    }

    Ok(())
}
