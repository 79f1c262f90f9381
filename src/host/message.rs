//! Commands exchanged between the session host and party tasks

use crate::error::{NegotiatorError, Result};
use crate::negotiation::{Party, SessionInfo};
use crate::types::{Action, ActionKind, PartyId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Instruction sent to a party task
#[derive(Debug)]
pub enum PartyCommand {
    /// Hand the party its session before the first round
    Init {
        info: SessionInfo,
        reply: oneshot::Sender<Result<()>>,
    },
    /// An action taken by any party, including the recipient
    Message { sender: PartyId, action: Action },
    /// The recipient's turn
    Turn {
        allowed: Vec<ActionKind>,
        reply: oneshot::Sender<Action>,
    },
    Shutdown,
}

/// Host-side handle to a party running on its own task
pub struct PartyHandle {
    id: PartyId,
    strategy: String,
    tx: mpsc::UnboundedSender<PartyCommand>,
    task: JoinHandle<String>,
}

impl PartyHandle {
    /// Move a party onto its own task; all callbacks run there in order
    pub fn spawn(mut party: Box<dyn Party>) -> Self {
        let id = party.id().clone();
        let strategy = party.description();
        let (tx, mut rx) = mpsc::unbounded_channel();

        let task_id = id.clone();
        let fallback = strategy.clone();
        let task = tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    PartyCommand::Init { info, reply } => {
                        let _ = reply.send(party.init(info));
                    }
                    PartyCommand::Message { sender, action } => {
                        party.receive_message(&sender, &action);
                    }
                    PartyCommand::Turn { allowed, reply } => {
                        // candidate search is CPU-bound, keep it off the async workers
                        let turn = tokio::task::spawn_blocking(move || {
                            let action = party.choose_action(&allowed);
                            (party, action)
                        })
                        .await;
                        let action = match turn {
                            Ok((returned, action)) => {
                                party = returned;
                                action
                            }
                            Err(e) => {
                                tracing::warn!("Turn of {} failed: {}", task_id, e);
                                return fallback;
                            }
                        };
                        if reply.send(action).is_err() {
                            tracing::debug!("Host dropped turn reply for {}", task_id);
                        }
                    }
                    PartyCommand::Shutdown => break,
                }
            }
            tracing::debug!("Party task for {} finished", task_id);
            party.description()
        });

        Self {
            id,
            strategy,
            tx,
            task,
        }
    }

    pub fn id(&self) -> &PartyId {
        &self.id
    }

    /// Strategy description taken when the party was spawned
    pub fn strategy(&self) -> &str {
        &self.strategy
    }

    pub async fn init(&self, info: SessionInfo) -> Result<()> {
        let (reply, rx) = oneshot::channel();
        self.send(PartyCommand::Init { info, reply })?;
        rx.await
            .map_err(|_| NegotiatorError::PartyDisconnected(self.id.0.clone()))?
    }

    pub fn notify(&self, sender: &PartyId, action: &Action) -> Result<()> {
        self.send(PartyCommand::Message {
            sender: sender.clone(),
            action: action.clone(),
        })
    }

    pub async fn turn(&self, allowed: &[ActionKind]) -> Result<Action> {
        let (reply, rx) = oneshot::channel();
        self.send(PartyCommand::Turn {
            allowed: allowed.to_vec(),
            reply,
        })?;
        rx.await
            .map_err(|_| NegotiatorError::PartyDisconnected(self.id.0.clone()))
    }

    /// Stop the task, returning the party's final description
    pub async fn shutdown(self) -> String {
        let _ = self.tx.send(PartyCommand::Shutdown);
        match self.task.await {
            Ok(description) => description,
            Err(e) => {
                tracing::warn!("Party task for {} failed: {}", self.id, e);
                self.strategy
            }
        }
    }

    fn send(&self, command: PartyCommand) -> Result<()> {
        self.tx
            .send(command)
            .map_err(|_| NegotiatorError::PartyDisconnected(self.id.0.clone()))
    }
}
