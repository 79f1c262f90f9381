//! In-process multi-party session host
//!
//! Parties take turns round-robin under the stacked alternating offers
//! protocol. Each party runs on its own task and only ever sees one callback
//! at a time, so no party state is shared between tasks.

use crate::domain::{Clock, DeadlineClock, Domain, RoundClock, UtilitySpace};
use crate::error::{NegotiatorError, Result};
use crate::negotiation::{Party, SessionInfo};
use crate::types::{Action, ActionKind, Outcome, PartyId, UtilityStats};
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use super::message::PartyHandle;
use super::report::{PartySummary, SessionReport, Termination, TranscriptEntry};

/// When the session runs out of time
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Deadline {
    /// Number of full rounds, each giving every party one turn
    Rounds(u64),
    /// Wall-clock duration from the first turn
    Duration(Duration),
}

enum HostClock {
    Rounds(Arc<RoundClock>),
    Wall(Arc<DeadlineClock>),
}

impl HostClock {
    fn start(deadline: Deadline) -> Self {
        match deadline {
            Deadline::Rounds(total) => HostClock::Rounds(Arc::new(RoundClock::new(total))),
            Deadline::Duration(duration) => HostClock::Wall(Arc::new(DeadlineClock::new(duration))),
        }
    }

    fn shared(&self) -> Arc<dyn Clock> {
        match self {
            HostClock::Rounds(clock) => clock.clone(),
            HostClock::Wall(clock) => clock.clone(),
        }
    }

    fn end_round(&self) {
        if let HostClock::Rounds(clock) = self {
            clock.advance();
        }
    }
}

struct Participant {
    party: Box<dyn Party>,
    space: Arc<dyn UtilitySpace>,
}

/// Collects parties and their utility spaces
pub struct SessionBuilder {
    deadline: Deadline,
    participants: Vec<Participant>,
}

impl SessionBuilder {
    pub fn new(deadline: Deadline) -> Self {
        Self {
            deadline,
            participants: Vec::new(),
        }
    }

    pub fn party(self, party: impl Party + 'static, space: Arc<dyn UtilitySpace>) -> Self {
        self.boxed_party(Box::new(party), space)
    }

    pub fn boxed_party(mut self, party: Box<dyn Party>, space: Arc<dyn UtilitySpace>) -> Self {
        self.participants.push(Participant { party, space });
        self
    }

    /// Check the line-up: at least two uniquely named parties over one domain
    pub fn build(self) -> Result<Session> {
        if self.participants.len() < 2 {
            return Err(NegotiatorError::NotEnoughParties(self.participants.len()));
        }
        match self.deadline {
            Deadline::Rounds(0) => {
                return Err(NegotiatorError::Configuration(
                    "deadline must allow at least one round".to_string(),
                ))
            }
            Deadline::Duration(duration) if duration.is_zero() => {
                return Err(NegotiatorError::Configuration(
                    "deadline duration must be positive".to_string(),
                ))
            }
            _ => {}
        }

        let domain = self.participants[0].space.domain().clone();
        let mut ids = HashSet::new();
        for participant in &self.participants {
            let id = participant.party.id();
            if !ids.insert(id.clone()) {
                return Err(NegotiatorError::Configuration(format!(
                    "duplicate party id {}",
                    id
                )));
            }
            if participant.space.domain() != &domain {
                return Err(NegotiatorError::Configuration(format!(
                    "party {} negotiates over a different domain",
                    id
                )));
            }
        }

        Ok(Session {
            domain,
            deadline: self.deadline,
            participants: self.participants,
        })
    }
}

/// A ready-to-run negotiation
pub struct Session {
    domain: Domain,
    deadline: Deadline,
    participants: Vec<Participant>,
}

impl Session {
    pub fn builder(deadline: Deadline) -> SessionBuilder {
        SessionBuilder::new(deadline)
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn party_count(&self) -> usize {
        self.participants.len()
    }

    /// Run the session to completion
    pub async fn run(self) -> Result<SessionReport> {
        let clock = HostClock::start(self.deadline);
        let shared = clock.shared();

        let mut spaces = Vec::with_capacity(self.participants.len());
        let mut handles = Vec::with_capacity(self.participants.len());
        for participant in self.participants {
            spaces.push(participant.space.clone());
            handles.push(PartyHandle::spawn(participant.party));
        }

        let mut failure = None;
        for (handle, space) in handles.iter().zip(&spaces) {
            let info = SessionInfo::new(space.clone(), shared.clone());
            if let Err(e) = handle.init(info).await {
                tracing::warn!("Party {} failed to initialise: {}", handle.id(), e);
                failure = Some(e);
                break;
            }
        }
        if let Some(e) = failure {
            shutdown(handles).await;
            return Err(e);
        }

        tracing::info!(
            "Session over {} started with {} parties",
            self.domain.name(),
            handles.len()
        );

        let mut protocol = Protocol::new(handles.len());
        let mut transcript = Vec::new();
        let mut received = vec![Vec::new(); handles.len()];
        let mut offers_made = vec![0usize; handles.len()];
        let mut rounds = 0u64;

        let ended = loop {
            if shared.is_expired() {
                break Ok(Termination::Deadline);
            }

            let index = transcript.len() % handles.len();
            let handle = &handles[index];
            let allowed = protocol.allowed();
            let action = match handle.turn(&allowed).await {
                Ok(action) => action,
                Err(e) => {
                    tracing::warn!("Party {} stopped responding: {}", handle.id(), e);
                    break Err(e);
                }
            };

            if let Err(reason) = protocol.check(&action, &allowed, &self.domain) {
                tracing::warn!("Protocol violation by {}: {}", handle.id(), reason);
                break Ok(Termination::ProtocolViolation {
                    party: handle.id().clone(),
                    reason,
                });
            }

            tracing::debug!("Turn {}: {} plays {}", transcript.len(), handle.id(), action);
            transcript.push(TranscriptEntry {
                turn: transcript.len(),
                round: rounds,
                time: shared.time(),
                party: handle.id().clone(),
                action: action.clone(),
            });

            if let Action::Offer(outcome) = &action {
                offers_made[index] += 1;
                for (other, space) in spaces.iter().enumerate() {
                    if other != index {
                        received[other].push(space.utility(outcome));
                    }
                }
            }

            let actor = handle.id().clone();
            for peer in &handles {
                if let Err(e) = peer.notify(&actor, &action) {
                    tracing::warn!("Could not deliver {} to {}: {}", action, peer.id(), e);
                }
            }

            if let Some(termination) = protocol.apply(&actor, action) {
                break Ok(termination);
            }

            if transcript.len() % handles.len() == 0 {
                rounds += 1;
                clock.end_round();
            }
        };
        let termination = match ended {
            Ok(termination) => termination,
            Err(e) => {
                shutdown(handles).await;
                return Err(e);
            }
        };

        let agreement = match termination {
            Termination::Agreement => protocol.table.clone(),
            _ => None,
        };
        match &agreement {
            Some(outcome) => tracing::info!("Agreement on {} after {} turns", outcome, transcript.len()),
            None => tracing::info!("Session ended without agreement: {}", termination),
        }

        let ids: Vec<PartyId> = handles.iter().map(|handle| handle.id().clone()).collect();
        let strategies = shutdown(handles).await;
        let parties = ids
            .into_iter()
            .zip(strategies)
            .enumerate()
            .map(|(index, (id, strategy))| PartySummary {
                id,
                strategy,
                utility: agreement
                    .as_ref()
                    .map(|outcome| spaces[index].utility(outcome))
                    .unwrap_or(0.0),
                offers_made: offers_made[index],
                offers_received: UtilityStats::from_samples(&received[index]),
            })
            .collect();

        Ok(SessionReport {
            domain: self.domain.name().to_string(),
            termination,
            agreement,
            rounds,
            turns: transcript.len(),
            parties,
            transcript,
        })
    }
}

/// Table state of the stacked alternating offers protocol
struct Protocol {
    parties: usize,
    table: Option<Outcome>,
    accepts: usize,
}

impl Protocol {
    fn new(parties: usize) -> Self {
        Self {
            parties,
            table: None,
            accepts: 0,
        }
    }

    fn allowed(&self) -> Vec<ActionKind> {
        match self.table {
            None => vec![ActionKind::Offer, ActionKind::EndNegotiation],
            Some(_) => vec![ActionKind::Accept, ActionKind::Offer, ActionKind::EndNegotiation],
        }
    }

    fn check(&self, action: &Action, allowed: &[ActionKind], domain: &Domain) -> std::result::Result<(), String> {
        if !allowed.contains(&action.kind()) {
            return Err(format!("{} is not allowed here", action.kind()));
        }
        match action {
            Action::Offer(outcome) => domain.validate(outcome).map_err(|e| e.to_string()),
            Action::Accept(outcome) => match &self.table {
                Some(table) if table == outcome => Ok(()),
                _ => Err(format!("accepted {} which is not on the table", outcome)),
            },
            Action::EndNegotiation => Ok(()),
        }
    }

    /// Update the table; `Some` once the session is over
    fn apply(&mut self, actor: &PartyId, action: Action) -> Option<Termination> {
        match action {
            Action::Offer(outcome) => {
                self.table = Some(outcome);
                self.accepts = 0;
                None
            }
            Action::Accept(_) => {
                self.accepts += 1;
                (self.accepts + 1 >= self.parties).then_some(Termination::Agreement)
            }
            Action::EndNegotiation => Some(Termination::Ended { by: actor.clone() }),
        }
    }
}

async fn shutdown(handles: Vec<PartyHandle>) -> Vec<String> {
    join_all(handles.into_iter().map(PartyHandle::shutdown)).await
}
