//! Turn timer: one task per game, at most one pending tick

use std::time::Duration;

use tokio::time::Instant;

use crate::game::state::TickOutcome;

/// Commands sent to the timer task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum TimerCommand {
    /// Replace the pending tick with one for `generation` after `delay`
    Arm { generation: u64, delay: Duration },
    /// Drop the pending tick and exit
    Stop,
}

/// Run the timer until stopped, disconnected or told the game is over
///
/// `on_expire` runs when a pending tick fires and decides what comes next.
/// Ticks never overlap since they all run on this one task.
pub(crate) async fn run<F>(commands: flume::Receiver<TimerCommand>, mut on_expire: F)
where
    F: FnMut(u64) -> TickOutcome,
{
    let mut pending: Option<(u64, Instant)> = None;
    loop {
        let command = match pending {
            Some((generation, deadline)) => tokio::select! {
                () = tokio::time::sleep_until(deadline) => {
                    pending = match on_expire(generation) {
                        TickOutcome::Stale => None,
                        TickOutcome::Rearmed { generation, delay } => {
                            Some((generation, Instant::now() + delay))
                        }
                        TickOutcome::Over => break,
                    };
                    continue;
                }
                command = commands.recv_async() => command,
            },
            None => commands.recv_async().await,
        };

        match command {
            Ok(TimerCommand::Arm { generation, delay }) => {
                pending = Some((generation, Instant::now() + delay));
            }
            Ok(TimerCommand::Stop) => {
                tracing::debug!("Timer stopped");
                break;
            }
            Err(_) => {
                tracing::debug!("Timer command channel closed");
                break;
            }
        }
    }
}
