/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The algorithm thread, the driving force of a pbft_rs replica.
//!
//! The algorithm thread owns the replica's [`ConsensusEngine`], so every change to consensus state happens
//! on this one thread. It loops forever, in each iteration:
//! 1. Taking in the [commands](Command) sent by the [`Replica`](crate::replica::Replica) handle: client
//!    payloads and view advances.
//! 2. Submitting queued client payloads to the engine, for as long as the engine can take them. Payloads
//!    that do not fit in the window stay queued until a checkpoint frees room. Payloads the engine
//!    rejects are handed back to the user in a [`RejectPayloadEvent`](crate::events::RejectPayloadEvent).
//! 3. Polling the network for at most one message and dispatching it to the engine.
//! 4. Refreshing the status snapshot read by the `Replica` handle.

use std::collections::VecDeque;
use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::{
    authenticator::Authenticator,
    ledger::Ledger,
    networking::network::Network,
    pbft::{
        implementation::{ConsensusEngine, ProposeError},
        types::ReplicaStatus,
    },
    types::data_types::Payload,
};

/// Requests that the [`Replica`](crate::replica::Replica) handle sends to the algorithm thread.
pub(crate) enum Command {
    Submit(Payload),
    AdvanceView,
}

pub(crate) struct Algorithm<L: Ledger, A: Authenticator, N: Network> {
    engine: ConsensusEngine<L, A, N>,
    network: N,
    commands: Receiver<Command>,
    pending_payloads: VecDeque<Payload>,
    status: Arc<Mutex<ReplicaStatus>>,
    shutdown_signal: Receiver<()>,
}

impl<L: Ledger, A: Authenticator, N: Network + 'static> Algorithm<L, A, N> {
    pub(crate) fn new(
        engine: ConsensusEngine<L, A, N>,
        network: N,
        commands: Receiver<Command>,
        status: Arc<Mutex<ReplicaStatus>>,
        shutdown_signal: Receiver<()>,
    ) -> Self {
        Self {
            engine,
            network,
            commands,
            pending_payloads: VecDeque::new(),
            status,
            shutdown_signal,
        }
    }

    pub(crate) fn start(mut self) -> JoinHandle<()> {
        thread::spawn(move || self.execute())
    }

    fn execute(&mut self) {
        loop {
            match self.shutdown_signal.try_recv() {
                Ok(()) => return,
                Err(TryRecvError::Empty) => (),
                Err(TryRecvError::Disconnected) => {
                    panic!("Algorithm thread disconnected from main thread")
                }
            }

            // 1. Take in commands.
            while let Ok(command) = self.commands.try_recv() {
                match command {
                    Command::Submit(payload) => self.pending_payloads.push_back(payload),
                    Command::AdvanceView => {
                        if let Err(err) = self.engine.advance_view() {
                            log::error!("Failed to advance view: {}", err);
                        }
                    }
                }
            }

            // 2. Submit queued payloads.
            self.submit_pending_payloads();

            // 3. Process at most one message.
            match self.network.recv() {
                Some((origin, msg)) => {
                    if let Err(err) = self.engine.on_receive_msg(origin, msg) {
                        log::error!("Failed to process message: {}", err);
                    }
                }
                None => thread::sleep(Duration::from_millis(1)),
            }

            // 4. Refresh the status snapshot.
            if let Ok(mut status) = self.status.lock() {
                *status = self.engine.status();
            }
        }
    }

    fn submit_pending_payloads(&mut self) {
        while let Some(payload) = self.pending_payloads.front().cloned() {
            match self.engine.submit(payload) {
                Ok(_) => {
                    self.pending_payloads.pop_front();
                }
                Err(ProposeError::WindowFull { .. }) => return,
                Err(ProposeError::Ledger(err)) => {
                    log::error!("Failed to propose payload: {}", err);
                    return;
                }
                // The engine published a RejectPayload event carrying the payload.
                Err(ProposeError::Rejected(_)) => {
                    self.pending_payloads.pop_front();
                }
                Err(err) => {
                    log::warn!("Dropping client payload: {}", err);
                    self.pending_payloads.pop_front();
                }
            }
        }
    }
}
