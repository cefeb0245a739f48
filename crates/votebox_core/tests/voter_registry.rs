use uuid::Uuid;
use votebox_core::{
    Election, NewCandidate, RegistryError, VotedFilter, VoterListQuery, STAFF_CLASS_LABEL,
};

#[test]
fn register_normalizes_name_and_class_label() {
    let election = Election::open_in_memory().unwrap();
    let voter = election
        .voters()
        .register("  Dewi   KARTIKA ", "xii-9")
        .unwrap();

    assert_eq!(voter.name, "dewi kartika");
    assert_eq!(voter.class_label, "XII-9");
    assert!(!voter.voted);

    let loaded = election.voters().lookup(voter.id).unwrap();
    assert_eq!(loaded, voter);
}

#[test]
fn duplicate_names_report_existing_class() {
    let election = Election::open_in_memory().unwrap();
    election.voters().register("Rina", "X-2").unwrap();

    let err = election.voters().register(" RINA ", "XI-1").unwrap_err();
    match err {
        RegistryError::DuplicateName { name, class_label } => {
            assert_eq!(name, "rina");
            assert_eq!(class_label, "X-2");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_registration_input_is_rejected() {
    let election = Election::open_in_memory().unwrap();
    assert!(matches!(
        election.voters().register("   ", "X-1"),
        Err(RegistryError::InvalidInput(_))
    ));
    assert!(matches!(
        election.voters().register("Tono", "Class 7"),
        Err(RegistryError::InvalidInput(_))
    ));
}

#[test]
fn lookup_and_has_voted_report_unknown_voter() {
    let election = Election::open_in_memory().unwrap();
    let ghost = Uuid::new_v4();
    assert!(matches!(
        election.voters().lookup(ghost),
        Err(RegistryError::UnknownVoter(id)) if id == ghost
    ));
    assert!(matches!(
        election.has_voted(ghost),
        Err(RegistryError::UnknownVoter(id)) if id == ghost
    ));
}

#[test]
fn has_voted_reflects_latest_commit() {
    let election = Election::open_in_memory().unwrap();
    let candidate = election
        .candidates()
        .register(NewCandidate {
            ballot_number: 1,
            name: "Bayu".to_string(),
            vision: "Cleaner classrooms".to_string(),
            mission: "Monthly cleanup".to_string(),
            ..NewCandidate::default()
        })
        .unwrap();
    let voter = election.voters().register("Agus", STAFF_CLASS_LABEL).unwrap();

    assert!(!election.voters().has_voted(voter.id).unwrap());
    election.cast_vote(voter.id, candidate.id).unwrap();
    assert!(election.voters().has_voted(voter.id).unwrap());
    assert!(election.voters().lookup(voter.id).unwrap().voted);
}

#[test]
fn roster_filters_and_paginates() {
    let election = Election::open_in_memory().unwrap();
    let candidate = election
        .candidates()
        .register(NewCandidate {
            ballot_number: 1,
            name: "Bayu".to_string(),
            vision: "Cleaner classrooms".to_string(),
            mission: "Monthly cleanup".to_string(),
            ..NewCandidate::default()
        })
        .unwrap();

    let mut ids = Vec::new();
    for (name, class_label) in [
        ("andi putra", "X-1"),
        ("budi putra", "X-1"),
        ("citra dewi", "XI-5"),
        ("dimas_putra", "XI-5"),
        ("eka", "X-1"),
    ] {
        ids.push(election.voters().register(name, class_label).unwrap().id);
    }
    election.cast_vote(ids[0], candidate.id).unwrap();
    election.cast_vote(ids[2], candidate.id).unwrap();

    let all = election.voters().list(&VoterListQuery::default()).unwrap();
    assert_eq!(all.total, 5);
    assert_eq!(all.total_pages, 1);
    assert_eq!(all.voters[0].name, "eka");

    let putra = election
        .voters()
        .list(&VoterListQuery {
            search: Some("PUTRA".to_string()),
            ..VoterListQuery::default()
        })
        .unwrap();
    assert_eq!(putra.total, 3);

    let underscore = election
        .voters()
        .list(&VoterListQuery {
            search: Some("_".to_string()),
            ..VoterListQuery::default()
        })
        .unwrap();
    assert_eq!(underscore.total, 1);
    assert_eq!(underscore.voters[0].name, "dimas_putra");

    let voted_in_x1 = election
        .voters()
        .list(&VoterListQuery {
            class_label: Some("x-1".to_string()),
            voted: VotedFilter::Voted,
            ..VoterListQuery::default()
        })
        .unwrap();
    assert_eq!(voted_in_x1.total, 1);
    assert_eq!(voted_in_x1.voters[0].id, ids[0]);

    let not_voted = election
        .voters()
        .list(&VoterListQuery {
            voted: VotedFilter::NotVoted,
            ..VoterListQuery::default()
        })
        .unwrap();
    assert_eq!(not_voted.total, 3);

    let second_page = election
        .voters()
        .list(&VoterListQuery {
            limit: Some(2),
            offset: 2,
            ..VoterListQuery::default()
        })
        .unwrap();
    assert_eq!(second_page.page, 2);
    assert_eq!(second_page.total_pages, 3);
    assert_eq!(second_page.voters.len(), 2);
    assert_eq!(second_page.voters[0].name, "citra dewi");
}
