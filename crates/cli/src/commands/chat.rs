use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Duration;

use crate::commands::CommandResult;
use tally_agent::{
    AgentRuntime, CommandInterpreter, Dispatcher, HttpInferenceClient, NoopAttachmentService,
};
use tally_core::config::{AppConfig, LoadOptions};
use tally_core::{InMemoryLedgerStore, LedgerStore, LevySchedule, MessageRole};
use tally_db::{connect, migrations, SqlLedgerRepository};

pub fn run(offline: bool, ephemeral: bool) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                format!("configuration issue: {error}"),
                2,
            );
        }
    };

    crate::init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                3,
            );
        }
    };

    let store: Arc<dyn LedgerStore> = if ephemeral {
        Arc::new(InMemoryLedgerStore::new())
    } else {
        let pool = match runtime.block_on(async {
            let pool = connect(&config.database)
                .await
                .map_err(|error| ("db_connectivity", error.to_string(), 4u8))?;
            migrations::run_pending(&pool)
                .await
                .map_err(|error| ("migration", error.to_string(), 5u8))?;
            Ok::<_, (&'static str, String, u8)>(pool)
        }) {
            Ok(pool) => pool,
            Err((error_class, message, exit_code)) => {
                return CommandResult::failure("chat", error_class, message, exit_code);
            }
        };
        Arc::new(SqlLedgerRepository::new(pool))
    };

    let interpreter = if offline {
        CommandInterpreter::offline()
    } else {
        match HttpInferenceClient::from_config(&config.inference) {
            Ok(client) => CommandInterpreter::new(
                Arc::new(client),
                config.inference.max_attempts,
                Duration::from_millis(config.inference.backoff_base_ms),
            ),
            Err(error) => {
                tracing::warn!(%error, "inference client unavailable, running offline");
                CommandInterpreter::offline()
            }
        }
    };

    let dispatcher = Dispatcher::new(Arc::clone(&store), LevySchedule::default());
    let agent = AgentRuntime::new(interpreter, dispatcher, Arc::new(NoopAttachmentService));

    println!("tally chat. Type a command in plain language, or 'exit' to leave.");
    if ephemeral {
        println!("(ephemeral session: records are discarded on exit)");
    }

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = match line {
            Ok(line) => line,
            Err(error) => {
                return CommandResult::failure("chat", "stdin", error.to_string(), 6);
            }
        };
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        if text.eq_ignore_ascii_case("exit") || text.eq_ignore_ascii_case("quit") {
            break;
        }

        let result = runtime.block_on(agent.handle_submission(text));
        println!("{} {}", role_tag(&result.reply.role), result.reply.text);
        let _ = io::stdout().flush();
    }

    CommandResult { exit_code: 0, output: "session ended".to_string() }
}

fn role_tag(role: &MessageRole) -> &'static str {
    match role {
        MessageRole::User => "[you]",
        MessageRole::System => "[tally]",
        MessageRole::Success => "[recorded]",
    }
}
