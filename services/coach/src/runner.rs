//! Drives a coaching session from line-based learner input.

use crate::console::ConsoleDialogue;
use anyhow::Result;
use englishly_core::CoachSession;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{info, warn};

/// Runs `session` until the terminal stage completes or `input` ends.
///
/// Each non-empty line is one learner turn. When the model extracts a stage's
/// tool call from that turn, the call is applied to the session before the next
/// line is read, so transitions never overlap.
pub async fn run_console_session<R>(
    session: &mut CoachSession,
    dialogue: &ConsoleDialogue,
    input: R,
) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    session.start().await?;

    let mut lines = input.lines();
    while !session.is_finished() {
        let Some(line) = lines.next_line().await? else {
            warn!(stage = ?session.active_stage(), "Learner left before the session finished.");
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(call) = dialogue.user_turn(line).await? {
            let outcome = session.handle_tool_call(call).await?;
            info!(?outcome, "Tool call handled");
        }
    }
    Ok(())
}
