//! In-process fakes for the coordinator's collaborators.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use groupsettle_coordinator::{
    Collaborators, GroupCoordinator, GroupDirectory, IdentityProvider, LedgerNetwork,
    SigningService,
};
use groupsettle_types::{
    BalanceMap, CollaboratorError, Confirmation, Group, GroupId, MemberAddress, ProposalId,
    ProposalRecord, SettlementConfig, SettlementPayment, SignatureToken,
};
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_test_writer()
        .try_init();
}

pub fn dec(value: i64) -> Decimal {
    Decimal::new(value, 0)
}

pub fn addr(s: &str) -> MemberAddress {
    MemberAddress::from(s)
}

/// Alice +50, Bob −30, Carol −20.
pub fn trip_group() -> Group {
    Group::dummy(
        "trip",
        &[("alice", dec(50)), ("bob", dec(-30)), ("carol", dec(-20))],
    )
}

/// Let spawned tasks run to their next suspension point.
pub async fn settle() {
    for _ in 0..8 {
        tokio::task::yield_now().await;
    }
}

// ---------------------------------------------------------------------
// Directory
// ---------------------------------------------------------------------

#[derive(Default)]
struct DirectoryState {
    groups: HashMap<GroupId, Group>,
    balances: HashMap<GroupId, BalanceMap>,
    proposals: HashMap<GroupId, ProposalRecord>,
    group_failure: Option<CollaboratorError>,
    balance_failure: Option<CollaboratorError>,
    balance_calls: usize,
    /// Extra latency on `get_settlement_proposal`.
    proposal_delay: Option<Duration>,
}

#[derive(Default)]
pub struct FakeDirectory {
    state: Mutex<DirectoryState>,
}

impl FakeDirectory {
    pub fn put_group(&self, group: Group) {
        self.state.lock().unwrap().groups.insert(group.id, group);
    }

    pub fn put_balances(&self, group_id: GroupId, balances: &[(&str, Decimal)]) {
        let map = balances.iter().map(|(a, b)| (addr(a), *b)).collect();
        self.state.lock().unwrap().balances.insert(group_id, map);
    }

    pub fn put_proposal(&self, record: ProposalRecord) {
        self.state
            .lock()
            .unwrap()
            .proposals
            .insert(record.group_id, record);
    }

    pub fn fail_group(&self, err: Option<CollaboratorError>) {
        self.state.lock().unwrap().group_failure = err;
    }

    pub fn fail_balances(&self, err: Option<CollaboratorError>) {
        self.state.lock().unwrap().balance_failure = err;
    }

    pub fn delay_proposal(&self, delay: Duration) {
        self.state.lock().unwrap().proposal_delay = Some(delay);
    }

    pub fn balance_calls(&self) -> usize {
        self.state.lock().unwrap().balance_calls
    }
}

#[async_trait]
impl GroupDirectory for FakeDirectory {
    async fn get_group(&self, group_id: GroupId) -> Result<Group, CollaboratorError> {
        let state = self.state.lock().unwrap();
        if let Some(err) = &state.group_failure {
            return Err(err.clone());
        }
        state
            .groups
            .get(&group_id)
            .cloned()
            .ok_or_else(|| CollaboratorError::NotFound(group_id.to_string()))
    }

    async fn get_balances(&self, group_id: GroupId) -> Result<BalanceMap, CollaboratorError> {
        let mut state = self.state.lock().unwrap();
        state.balance_calls += 1;
        if let Some(err) = &state.balance_failure {
            return Err(err.clone());
        }
        Ok(state.balances.get(&group_id).cloned().unwrap_or_default())
    }

    async fn get_settlement_proposal(
        &self,
        group_id: GroupId,
    ) -> Result<Option<ProposalRecord>, CollaboratorError> {
        let delay = self.state.lock().unwrap().proposal_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.state.lock().unwrap().proposals.get(&group_id).cloned())
    }
}

// ---------------------------------------------------------------------
// Signing, network, identity
// ---------------------------------------------------------------------

#[derive(Default)]
pub struct FakeSigner {
    failure: Mutex<Option<CollaboratorError>>,
    calls: Mutex<Vec<(ProposalId, MemberAddress, [u8; 32])>>,
}

impl FakeSigner {
    pub fn fail_with(&self, err: Option<CollaboratorError>) {
        *self.failure.lock().unwrap() = err;
    }

    pub fn calls(&self) -> Vec<(ProposalId, MemberAddress, [u8; 32])> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SigningService for FakeSigner {
    async fn request_signature(
        &self,
        proposal_id: ProposalId,
        signer: &MemberAddress,
        payload: [u8; 32],
    ) -> Result<SignatureToken, CollaboratorError> {
        self.calls
            .lock()
            .unwrap()
            .push((proposal_id, signer.clone(), payload));
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(SignatureToken(format!("sig:{signer}:{proposal_id}")))
    }
}

#[derive(Default)]
pub struct FakeNetwork {
    failure: Mutex<Option<CollaboratorError>>,
    broadcasts: Mutex<Vec<(ProposalId, Vec<SettlementPayment>)>>,
}

impl FakeNetwork {
    pub fn fail_with(&self, err: Option<CollaboratorError>) {
        *self.failure.lock().unwrap() = err;
    }

    pub fn broadcasts(&self) -> Vec<(ProposalId, Vec<SettlementPayment>)> {
        self.broadcasts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerNetwork for FakeNetwork {
    async fn request_broadcast(
        &self,
        proposal_id: ProposalId,
        payments: &[SettlementPayment],
    ) -> Result<Confirmation, CollaboratorError> {
        if let Some(err) = self.failure.lock().unwrap().clone() {
            return Err(err);
        }
        self.broadcasts
            .lock()
            .unwrap()
            .push((proposal_id, payments.to_vec()));
        Ok(Confirmation::new(format!("tx:{proposal_id}")))
    }
}

pub struct FakeIdentity {
    current: Mutex<MemberAddress>,
}

impl FakeIdentity {
    pub fn new(address: &str) -> Self {
        Self {
            current: Mutex::new(addr(address)),
        }
    }

    pub fn become_member(&self, address: &str) {
        *self.current.lock().unwrap() = addr(address);
    }
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn current_member(&self) -> Result<MemberAddress, CollaboratorError> {
        Ok(self.current.lock().unwrap().clone())
    }
}

// ---------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------

pub struct Harness {
    pub coordinator: GroupCoordinator,
    pub directory: Arc<FakeDirectory>,
    pub signer: Arc<FakeSigner>,
    pub network: Arc<FakeNetwork>,
    pub identity: Arc<FakeIdentity>,
}

pub fn harness(config: SettlementConfig) -> Harness {
    init_tracing();
    let directory = Arc::new(FakeDirectory::default());
    let signer = Arc::new(FakeSigner::default());
    let network = Arc::new(FakeNetwork::default());
    let identity = Arc::new(FakeIdentity::new("alice"));

    let coordinator = GroupCoordinator::new(
        Collaborators {
            directory: directory.clone(),
            signer: signer.clone(),
            network: network.clone(),
            identity: identity.clone(),
        },
        config,
    )
    .unwrap();

    Harness {
        coordinator,
        directory,
        signer,
        network,
        identity,
    }
}

/// A harness with `group` registered and loaded.
pub async fn loaded(group: Group, config: SettlementConfig) -> (Harness, GroupId) {
    let mut h = harness(config);
    let group_id = group.id;
    h.directory.put_group(group);
    h.coordinator.load_group(group_id).await.unwrap();
    settle().await;
    h.coordinator.sync();
    (h, group_id)
}
