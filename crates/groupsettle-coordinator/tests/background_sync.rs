//! Periodic balance refresh, remote proposal adoption, and session teardown.
//!
//! Timer-driven tests run on a paused clock, so sleeping advances virtual
//! time straight to the next refresh tick.

mod common;

use std::time::Duration;

use common::{addr, dec, harness, loaded, settle, trip_group};
use groupsettle_settlement::ProposalOrigin;
use groupsettle_types::{
    CollaboratorError, Group, GroupSettleError, Iou, ProposalId, ProposalRecord, ProposalStatus,
    SettlementConfig, SettlementPayment,
};

const TICK: Duration = Duration::from_millis(5000);

fn remote_record(group: &Group, id: ProposalId, collected: u32, signers: &[&str]) -> ProposalRecord {
    ProposalRecord {
        id,
        group_id: group.id,
        payments: vec![
            SettlementPayment::new("alice", "bob", dec(30)),
            SettlementPayment::new("alice", "carol", dec(20)),
        ],
        required_signatures: 2,
        collected_signatures: collected,
        signers: signers.iter().map(|s| addr(s)).collect(),
        status: ProposalStatus::PendingSignatures,
    }
}

#[tokio::test(start_paused = true)]
async fn refresh_loop_merges_authoritative_balances() {
    let (mut h, group_id) = loaded(trip_group(), SettlementConfig::default()).await;
    h.directory
        .put_balances(group_id, &[("alice", dec(10)), ("bob", dec(-10))]);

    assert_eq!(h.directory.balance_calls(), 0);
    tokio::time::sleep(TICK + Duration::from_millis(1)).await;
    assert_eq!(h.directory.balance_calls(), 1);
    assert!(h.coordinator.sync() >= 1);

    let c = &h.coordinator;
    assert_eq!(c.balance_of(group_id, &addr("alice")).unwrap(), Some(dec(10)));
    assert_eq!(c.balance_of(group_id, &addr("bob")).unwrap(), Some(dec(-10)));
    // Not covered by the snapshot: keeps its local value.
    assert_eq!(c.balance_of(group_id, &addr("carol")).unwrap(), Some(dec(-20)));
}

#[tokio::test(start_paused = true)]
async fn refresh_failures_do_not_stop_the_loop() {
    let (mut h, group_id) = loaded(trip_group(), SettlementConfig::default()).await;
    h.directory
        .fail_balances(Some(CollaboratorError::Transport("offline".into())));
    h.directory.put_balances(group_id, &[("alice", dec(1))]);

    tokio::time::sleep(TICK * 2 + Duration::from_millis(1)).await;
    assert_eq!(h.directory.balance_calls(), 2);
    h.coordinator.sync();
    assert_eq!(
        h.coordinator.balance_of(group_id, &addr("alice")).unwrap(),
        Some(dec(50))
    );

    h.directory.fail_balances(None);
    tokio::time::sleep(TICK).await;
    h.coordinator.sync();
    assert_eq!(
        h.coordinator.balance_of(group_id, &addr("alice")).unwrap(),
        Some(dec(1))
    );
}

#[tokio::test(start_paused = true)]
async fn refresh_overwrites_optimistic_drift() {
    let (mut h, group_id) = loaded(trip_group(), SettlementConfig::default()).await;
    h.coordinator
        .record_iou(group_id, &Iou::new("bob", "alice", dec(30)))
        .unwrap();
    assert_eq!(
        h.coordinator.balance_of(group_id, &addr("bob")).unwrap(),
        Some(dec(0))
    );

    h.directory.put_balances(
        group_id,
        &[("alice", dec(50)), ("bob", dec(-30)), ("carol", dec(-20))],
    );
    tokio::time::sleep(TICK + Duration::from_millis(1)).await;
    h.coordinator.sync();

    assert_eq!(
        h.coordinator.balance_of(group_id, &addr("bob")).unwrap(),
        Some(dec(-30))
    );
}

#[tokio::test]
async fn explicit_refresh_swallows_failures() {
    let (mut h, group_id) = loaded(trip_group(), SettlementConfig::default()).await;

    h.directory.fail_balances(Some(CollaboratorError::Timeout));
    assert!(!h.coordinator.refresh_balances(group_id).await.unwrap());

    h.directory.fail_balances(None);
    h.directory.put_balances(group_id, &[("carol", dec(-25))]);
    assert!(h.coordinator.refresh_balances(group_id).await.unwrap());
    assert_eq!(
        h.coordinator.balance_of(group_id, &addr("carol")).unwrap(),
        Some(dec(-25))
    );

    // An empty snapshot changes nothing.
    h.directory.put_balances(group_id, &[]);
    let before = h.coordinator.balance_snapshot(group_id).unwrap();
    assert!(h.coordinator.refresh_balances(group_id).await.unwrap());
    assert_eq!(h.coordinator.balance_snapshot(group_id).unwrap(), before);
}

#[tokio::test(start_paused = true)]
async fn closed_session_stops_polling() {
    let (mut h, group_id) = loaded(trip_group(), SettlementConfig::default()).await;
    assert!(h.coordinator.close_session(group_id));

    tokio::time::sleep(TICK * 4).await;
    assert_eq!(h.directory.balance_calls(), 0);
    assert_eq!(h.coordinator.sync(), 0);
}

#[tokio::test(start_paused = true)]
async fn results_from_an_ended_session_are_ignored() {
    let group = trip_group();
    let (mut h, group_id) = loaded(group, SettlementConfig::default()).await;
    h.directory.put_balances(group_id, &[("alice", dec(7))]);

    // The refresh lands on the channel but is not applied yet.
    tokio::time::sleep(TICK + Duration::from_millis(1)).await;
    assert_eq!(h.directory.balance_calls(), 1);

    h.coordinator.close_session(group_id);
    h.coordinator.load_group(group_id).await.unwrap();
    settle().await;
    h.coordinator.sync();

    assert_eq!(
        h.coordinator.balance_of(group_id, &addr("alice")).unwrap(),
        Some(dec(50))
    );
}

#[tokio::test(start_paused = true)]
async fn in_flight_proposal_fetch_is_discarded_on_close() {
    let group = trip_group();
    let group_id = group.id;
    let mut h = harness(SettlementConfig::default());
    h.directory.put_group(group.clone());
    h.directory
        .put_proposal(remote_record(&group, ProposalId::deterministic(1, 1), 0, &[]));
    h.directory.delay_proposal(Duration::from_secs(1));

    h.coordinator.load_group(group_id).await.unwrap();
    settle().await;
    assert!(h.coordinator.close_session(group_id));

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(h.coordinator.sync(), 0);
    assert!(!h.coordinator.has_session(group_id));
}

#[tokio::test]
async fn remote_proposal_adopted_on_load() {
    let group = trip_group();
    let group_id = group.id;
    let remote_id = ProposalId::deterministic(7, 1);
    let mut h = harness(SettlementConfig::default());
    h.directory.put_group(group.clone());
    h.directory
        .put_proposal(remote_record(&group, remote_id, 1, &["bob"]));

    h.coordinator.load_group(group_id).await.unwrap();
    settle().await;
    h.coordinator.sync();

    let proposal = h.coordinator.proposal(group_id).unwrap().unwrap();
    assert_eq!(proposal.id(), remote_id);
    assert_eq!(proposal.origin(), ProposalOrigin::Remote);
    assert_eq!(proposal.collected_signatures(), 1);

    // Bob's signature is already on record.
    h.identity.become_member("bob");
    let err = h.coordinator.sign(group_id, remote_id).await.unwrap_err();
    assert!(matches!(err, GroupSettleError::DuplicateSigner(_)));

    h.identity.become_member("alice");
    let status = h.coordinator.sign(group_id, remote_id).await.unwrap();
    assert_eq!(status, ProposalStatus::ReadyToBroadcast);

    // The follow-up fetch returns a stale record; local progress is kept.
    settle().await;
    h.coordinator.sync();
    let proposal = h.coordinator.proposal(group_id).unwrap().unwrap();
    assert_eq!(proposal.status(), ProposalStatus::ReadyToBroadcast);
    assert_eq!(proposal.collected_signatures(), 2);
}

#[tokio::test]
async fn remote_proposal_supersedes_local() {
    let group = trip_group();
    let (mut h, group_id) = loaded(group.clone(), SettlementConfig::default()).await;
    let local_id = h.coordinator.propose_settlement(group_id).unwrap();
    h.coordinator.sign(group_id, local_id).await.unwrap();

    let remote_id = ProposalId::deterministic(8, 1);
    h.directory
        .put_proposal(remote_record(&group, remote_id, 0, &[]));
    h.coordinator.request_proposal_refresh(group_id).unwrap();
    settle().await;
    h.coordinator.sync();

    let proposal = h.coordinator.proposal(group_id).unwrap().unwrap();
    assert_eq!(proposal.id(), remote_id);
    assert_eq!(proposal.collected_signatures(), 0);
    assert!(matches!(
        h.coordinator.sign(group_id, local_id).await.unwrap_err(),
        GroupSettleError::ProposalNotFound(_)
    ));
}

#[tokio::test]
async fn remote_status_ahead_keeps_local_signatures() {
    let group = trip_group();
    let (mut h, group_id) = loaded(group.clone(), SettlementConfig::default()).await;
    let proposal_id = h.coordinator.propose_settlement(group_id).unwrap();
    for signer in ["alice", "bob"] {
        h.identity.become_member(signer);
        h.coordinator.sign(group_id, proposal_id).await.unwrap();
    }

    // Another client broadcast it, but its record lost the count.
    let mut record = remote_record(&group, proposal_id, 0, &[]);
    record.status = ProposalStatus::Broadcast;
    h.directory.put_proposal(record);
    h.coordinator.request_proposal_refresh(group_id).unwrap();
    settle().await;
    h.coordinator.sync();

    let proposal = h.coordinator.proposal(group_id).unwrap().unwrap();
    assert_eq!(proposal.id(), proposal_id);
    assert_eq!(proposal.status(), ProposalStatus::Broadcast);
    assert_eq!(proposal.collected_signatures(), 2);
    assert!(proposal.quorum().has_signed(&addr("bob")));
    assert!(matches!(
        h.coordinator.sign(group_id, proposal_id).await.unwrap_err(),
        GroupSettleError::NotReady { operation: "sign", .. }
    ));
}

#[tokio::test]
async fn switching_groups_closes_the_previous_session() {
    let first = trip_group();
    let second = Group::dummy("dinner", &[("dan", dec(5)), ("eve", dec(-5))]);
    let (mut h, first_id) = loaded(first, SettlementConfig::default()).await;
    let second_id = second.id;
    h.directory.put_group(second);

    h.coordinator.switch_to(second_id).await.unwrap();
    assert!(!h.coordinator.has_session(first_id));
    assert!(h.coordinator.has_session(second_id));
    assert_eq!(h.coordinator.group(second_id).unwrap().name, "dinner");
}
