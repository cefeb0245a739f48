use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::time::Duration;
use uuid::Uuid;
use votebox_core::{Candidate, Election, ElectionConfig, NewCandidate, Voter};

fn add_candidate(election: &Election, ballot_number: u32) -> Candidate {
    election
        .candidates()
        .register(NewCandidate {
            ballot_number,
            name: format!("Candidate {ballot_number}"),
            vision: "Open library hours".to_string(),
            mission: "Digital notice board".to_string(),
            ..NewCandidate::default()
        })
        .unwrap()
}

fn add_voters(election: &Election, count: usize) -> Vec<Voter> {
    (0..count)
        .map(|index| {
            election
                .voters()
                .register(&format!("observer test voter {index}"), "X-4")
                .unwrap()
        })
        .collect()
}

#[test]
fn observer_receives_one_snapshot_per_commit_in_commit_order() {
    let election = Election::open_in_memory().unwrap();
    let first = add_candidate(&election, 1);
    let second = add_candidate(&election, 2);
    let voters = add_voters(&election, 3);

    let observer = election.subscribe();
    election.cast_vote(voters[0].id, first.id).unwrap();
    election.cast_vote(voters[1].id, second.id).unwrap();
    election.cast_vote(voters[2].id, first.id).unwrap();

    let received = observer.drain();
    assert_eq!(received.len(), 3);
    let totals: Vec<u64> = received.iter().map(|snapshot| snapshot.total_votes).collect();
    assert_eq!(totals, vec![1, 2, 3]);
    assert!(received.iter().all(|snapshot| snapshot.is_consistent()));

    let last = received.last().unwrap();
    assert_eq!(last.count_for(first.id), Some(2));
    assert_eq!(last.count_for(second.id), Some(1));
    assert_eq!(
        observer.recv_timeout(Duration::from_millis(20)).unwrap_err(),
        RecvTimeoutError::Timeout
    );
}

#[test]
fn rejected_votes_are_not_broadcast() {
    let election = Election::open_in_memory().unwrap();
    let candidate = add_candidate(&election, 1);
    let voters = add_voters(&election, 1);
    election.cast_vote(voters[0].id, candidate.id).unwrap();

    let observer = election.subscribe();
    assert!(election.cast_vote(voters[0].id, candidate.id).is_err());
    assert!(election.cast_vote(Uuid::new_v4(), candidate.id).is_err());
    assert!(election.cast_vote(voters[0].id, Uuid::new_v4()).is_err());

    assert_eq!(observer.try_recv().unwrap_err(), TryRecvError::Empty);
}

#[test]
fn disconnected_observer_does_not_affect_commit_or_other_observers() {
    let election = Election::open_in_memory().unwrap();
    let candidate = add_candidate(&election, 1);
    let voters = add_voters(&election, 2);

    let leaving = election.subscribe();
    let staying = election.subscribe();
    assert_eq!(election.broadcaster().observer_count(), 2);

    drop(leaving);
    let receipt = election.cast_vote(voters[0].id, candidate.id).unwrap();
    assert_eq!(receipt.sequence, 1);
    assert_eq!(election.broadcaster().observer_count(), 1);

    election.cast_vote(voters[1].id, candidate.id).unwrap();
    let totals: Vec<u64> = staying
        .drain()
        .iter()
        .map(|snapshot| snapshot.total_votes)
        .collect();
    assert_eq!(totals, vec![1, 2]);
}

#[test]
fn unsubscribe_is_idempotent_and_closes_the_handle() {
    let election = Election::open_in_memory().unwrap();
    let candidate = add_candidate(&election, 1);
    let voters = add_voters(&election, 1);

    let observer = election.subscribe();
    let by_id = election.subscribe();
    election.unsubscribe(&observer);
    election.unsubscribe(&observer);
    election.unsubscribe_id(by_id.id());
    election.unsubscribe_id(by_id.id());
    election.unsubscribe_id(9_999);
    assert_eq!(election.broadcaster().observer_count(), 0);

    election.cast_vote(voters[0].id, candidate.id).unwrap();
    assert_eq!(observer.try_recv().unwrap_err(), TryRecvError::Disconnected);
    assert_eq!(by_id.try_recv().unwrap_err(), TryRecvError::Disconnected);
}

#[test]
fn late_subscriber_gets_no_history_but_snapshot_is_current() {
    let election = Election::open_in_memory().unwrap();
    let candidate = add_candidate(&election, 3);
    let voters = add_voters(&election, 3);
    election.cast_vote(voters[0].id, candidate.id).unwrap();
    election.cast_vote(voters[1].id, candidate.id).unwrap();

    let late = election.subscribe();
    assert_eq!(late.try_recv().unwrap_err(), TryRecvError::Empty);

    let snapshot = election.snapshot().unwrap();
    assert_eq!(snapshot.sequence, 2);
    assert_eq!(snapshot.count_for(candidate.id), Some(2));
    assert_eq!(snapshot.voters_voted, 2);
    assert_eq!(snapshot.voters_registered, 3);
    assert_eq!(
        election.candidates().get(candidate.id).unwrap().vote_count,
        snapshot.count_for(candidate.id).unwrap()
    );

    election.cast_vote(voters[2].id, candidate.id).unwrap();
    assert_eq!(late.recv().unwrap().total_votes, 3);
}

#[test]
fn candidate_registration_publishes_updated_ballot() {
    let election = Election::open_in_memory().unwrap();
    let observer = election.subscribe();

    let second = add_candidate(&election, 2);
    let first = add_candidate(&election, 1);

    let pushed = observer.drain();
    assert_eq!(pushed.len(), 2);
    let numbers: Vec<u32> = pushed[1]
        .candidates
        .iter()
        .map(|tally| tally.ballot_number)
        .collect();
    assert_eq!(numbers, vec![1, 2]);
    assert_eq!(pushed[1].candidates[0].candidate_id, first.id);
    assert_eq!(pushed[1].candidates[1].candidate_id, second.id);
    assert_eq!(pushed[1].total_votes, 0);
}

#[test]
fn voter_registration_publishes_turnout_without_advancing_sequence() {
    let election = Election::open_in_memory().unwrap();
    let candidate = add_candidate(&election, 1);
    let first = add_voters(&election, 1).remove(0);
    election.cast_vote(first.id, candidate.id).unwrap();

    let observer = election.subscribe();
    election.voters().register("Sari Dewi", "XII-3").unwrap();
    election.voters().register("Bima", "Guru/Karyawan").unwrap();
    assert!(election.voters().register("sari dewi", "X-1").is_err());

    let pushed = observer.drain();
    assert_eq!(pushed.len(), 2);
    let registered: Vec<u64> = pushed
        .iter()
        .map(|snapshot| snapshot.voters_registered)
        .collect();
    assert_eq!(registered, vec![2, 3]);
    assert!(pushed.iter().all(|snapshot| snapshot.sequence == 1));
    assert_eq!(pushed[1].turnout_bps(), 3_333);
    assert_eq!(*pushed[1], election.snapshot().unwrap());
}

#[test]
fn concurrent_commits_reach_observer_in_sequence_order() {
    let config = ElectionConfig {
        observer_queue_capacity: 128,
        ..ElectionConfig::default()
    };
    let election = Election::open(&config).unwrap();
    let candidate = add_candidate(&election, 1);
    let voters = add_voters(&election, 50);
    let observer = election.subscribe();

    std::thread::scope(|scope| {
        for voter in &voters {
            let election = &election;
            let voter_id = voter.id;
            scope.spawn(move || election.cast_vote(voter_id, candidate.id).unwrap());
        }
    });

    let sequences: Vec<u64> = observer
        .drain()
        .iter()
        .map(|snapshot| snapshot.sequence)
        .collect();
    assert_eq!(sequences, (1..=50).collect::<Vec<u64>>());
}

#[test]
fn shutdown_closes_live_observers() {
    let election = Election::open_in_memory().unwrap();
    let observer = election.subscribe();
    election.shutdown();
    assert_eq!(observer.recv(), None);

    let after = election.subscribe();
    assert_eq!(after.try_recv().unwrap_err(), TryRecvError::Disconnected);

    let dropped_observer = {
        let other = Election::open_in_memory().unwrap();
        other.subscribe()
    };
    assert_eq!(dropped_observer.recv(), None);
}

#[test]
fn snapshot_serializes_for_presentation_layer() {
    let election = Election::open_in_memory().unwrap();
    let candidate = add_candidate(&election, 1);
    let voters = add_voters(&election, 1);
    election.cast_vote(voters[0].id, candidate.id).unwrap();

    let value = serde_json::to_value(election.snapshot().unwrap()).unwrap();
    assert_eq!(value["total_votes"], 1);
    assert_eq!(value["candidates"][0]["ballot_number"], 1);
    assert_eq!(value["candidates"][0]["name"], "candidate 1");
    assert_eq!(value["candidates"][0]["candidate_id"], candidate.id.to_string());
}
