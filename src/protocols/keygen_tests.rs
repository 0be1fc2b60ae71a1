use alloc::{
    collections::{BTreeMap, BTreeSet},
    vec::Vec,
};

use core::{
    num::NonZeroU32,
    sync::atomic::{AtomicUsize, Ordering},
};

use rand_chacha::ChaCha8Rng;
use rand_core::{CryptoRng, CryptoRngCore, OsRng, RngCore, SeedableRng};

use super::{
    KeyGen, KeyGenMessage, KeyGenSession, KeygenError, Outgoing, ReceiveError, RemoteError, Round1Prime, Round2,
    Round2Message, Round3, Round3Message, Round4, Round4Message, Round5, Round5Message, SamplingTarget, SessionError,
    SessionOutcome,
};
use crate::{
    curve::{Point, Scalar},
    dev::{insecure_paillier_key, TestParams},
    entities::{KeyConfig, PreviousConfig},
    session::SessionInfo,
    tools::{
        executor::Executor,
        sss::{shamir_join_scalars, Polynomial},
        Rid, Secret,
    },
};

type Id = u32;
type P = TestParams;

const THRESHOLD: usize = 1;

fn ids() -> BTreeSet<Id> {
    [1, 2, 3].into()
}

fn make_round1(
    rng: &mut impl CryptoRngCore,
    previous: Option<&BTreeMap<Id, PreviousConfig<Id>>>,
) -> BTreeMap<Id, Round1Prime<P, Id>> {
    ids()
        .into_iter()
        .map(|id| {
            let info = SessionInfo::new(id, ids(), THRESHOLD)
                .unwrap()
                .with_session_id(b"keygen tests");
            let previous = previous.map(|configs| configs[&id].clone());
            let round = KeyGen::new(info, previous, insecure_paillier_key(rng))
                .unwrap()
                .make_round(rng)
                .unwrap();
            (id, round)
        })
        .collect()
}

fn finalize_round1(
    rng: &mut impl CryptoRngCore,
    rounds: BTreeMap<Id, Round1Prime<P, Id>>,
) -> (BTreeMap<Id, Round2<P, Id>>, BTreeMap<Id, Round2Message>) {
    let mut next = BTreeMap::new();
    let mut messages = BTreeMap::new();
    for (id, round) in rounds {
        let (round, message) = round.finalize(rng).unwrap();
        next.insert(id, round);
        messages.insert(id, message);
    }
    (next, messages)
}

fn finalize_round2(
    mut rounds: BTreeMap<Id, Round2<P, Id>>,
    messages: &BTreeMap<Id, Round2Message>,
) -> (BTreeMap<Id, Round3<P, Id>>, BTreeMap<Id, Round3Message>) {
    for (to, round) in rounds.iter_mut() {
        for (from, message) in messages.iter().filter(|(from, _)| *from != to) {
            round.receive_message(from, message.clone()).unwrap();
        }
    }
    let mut next = BTreeMap::new();
    let mut messages = BTreeMap::new();
    for (id, round) in rounds {
        let (round, message) = round.finalize().unwrap();
        next.insert(id, round);
        messages.insert(id, message);
    }
    (next, messages)
}

#[allow(clippy::type_complexity)]
fn finalize_round3(
    rng: &mut impl CryptoRngCore,
    mut rounds: BTreeMap<Id, Round3<P, Id>>,
    messages: &BTreeMap<Id, Round3Message>,
) -> (BTreeMap<Id, Round4<P, Id>>, BTreeMap<Id, BTreeMap<Id, Round4Message>>) {
    for (to, round) in rounds.iter_mut() {
        for (from, message) in messages.iter().filter(|(from, _)| *from != to) {
            round.receive_message(from, message.clone()).unwrap();
        }
    }
    let mut next = BTreeMap::new();
    let mut messages = BTreeMap::new();
    for (id, round) in rounds {
        let (round, direct) = round.finalize(rng).unwrap();
        next.insert(id, round);
        messages.insert(id, direct);
    }
    (next, messages)
}

fn finalize_round4(
    mut rounds: BTreeMap<Id, Round4<P, Id>>,
    messages: &BTreeMap<Id, BTreeMap<Id, Round4Message>>,
) -> (BTreeMap<Id, Round5<P, Id>>, BTreeMap<Id, Round5Message>) {
    for (to, round) in rounds.iter_mut() {
        for (from, direct) in messages.iter().filter(|(from, _)| *from != to) {
            round.receive_message(from, direct[to].clone()).unwrap();
        }
    }
    let mut next = BTreeMap::new();
    let mut messages = BTreeMap::new();
    for (id, round) in rounds {
        let (round, message) = round.finalize().unwrap();
        next.insert(id, round);
        messages.insert(id, message);
    }
    (next, messages)
}

fn finalize_round5(
    mut rounds: BTreeMap<Id, Round5<P, Id>>,
    messages: &BTreeMap<Id, Round5Message>,
) -> BTreeMap<Id, KeyConfig<P, Id>> {
    for (to, round) in rounds.iter_mut() {
        for (from, message) in messages.iter().filter(|(from, _)| *from != to) {
            round.receive_message(from, message.clone()).unwrap();
        }
    }
    rounds
        .into_iter()
        .map(|(id, round)| (id, round.finalize().unwrap()))
        .collect()
}

fn run_keygen(
    rng: &mut impl CryptoRngCore,
    previous: Option<&BTreeMap<Id, PreviousConfig<Id>>>,
) -> BTreeMap<Id, KeyConfig<P, Id>> {
    let rounds = make_round1(rng, previous);
    let (r2, r2_messages) = finalize_round1(rng, rounds);
    let (r3, r3_messages) = finalize_round2(r2, &r2_messages);
    let (r4, r4_messages) = finalize_round3(rng, r3, &r3_messages);
    let (r5, r5_messages) = finalize_round4(r4, &r4_messages);
    finalize_round5(r5, &r5_messages)
}

fn secret_of(configs: &BTreeMap<Id, KeyConfig<P, Id>>, subset: &[Id]) -> Scalar {
    let shares = subset
        .iter()
        .map(|id| {
            let config = &configs[id];
            (config.share_id(id), config.secret_share().clone())
        })
        .collect::<BTreeMap<_, _>>();
    *shamir_join_scalars(&shares).expose_secret()
}

fn check_consistent(configs: &BTreeMap<Id, KeyConfig<P, Id>>) -> Point {
    let public_key = configs[&1].public_key().unwrap();
    for config in configs.values() {
        assert_eq!(config.public_key().unwrap(), public_key);
        assert_eq!(config.rid(), configs[&1].rid());
        assert_eq!(config.chain_key(), configs[&1].chain_key());
        assert_eq!(config.public(), configs[&1].public());
        assert_eq!(
            config.secret_share().mul_by_generator(),
            config.public_shares()[config.owner()]
        );
    }
    for subset in [[1, 2], [1, 3], [2, 3]] {
        assert_eq!(secret_of(configs, &subset).mul_by_generator(), public_key);
    }
    public_key
}

#[test_log::test]
fn round2_is_seeded_with_own_values_only() {
    let mut rng = ChaCha8Rng::seed_from_u64(1);
    let rounds = make_round1(&mut rng, None);
    let (rounds, messages) = finalize_round1(&mut rng, rounds);
    assert_eq!(messages.len(), 3);

    for (id, round) in rounds.iter() {
        let own = BTreeSet::from([*id]);
        assert_eq!(round.vss_polynomials.keys().copied().collect::<BTreeSet<_>>(), own);
        assert_eq!(round.commitments.keys().copied().collect::<BTreeSet<_>>(), own);
        assert_eq!(round.rids.keys().copied().collect::<BTreeSet<_>>(), own);
        assert_eq!(round.chain_keys.keys().copied().collect::<BTreeSet<_>>(), own);
        assert_eq!(round.shares_received.keys().copied().collect::<BTreeSet<_>>(), own);
        assert_eq!(round.elgamal_publics.keys().copied().collect::<BTreeSet<_>>(), own);
        assert_eq!(round.paillier_publics.keys().copied().collect::<BTreeSet<_>>(), own);
        assert_eq!(round.pedersen_publics.keys().copied().collect::<BTreeSet<_>>(), own);
        assert_eq!(round.schnorr_commitments.keys().copied().collect::<BTreeSet<_>>(), own);

        assert_eq!(round.commitments[id], messages[id].commitment);
        assert!(!round.can_finalize());
    }
}

#[test_log::test]
fn self_share_matches_own_polynomial() {
    let mut rng = ChaCha8Rng::seed_from_u64(2);
    let rounds = make_round1(&mut rng, None);
    let (rounds, _messages) = finalize_round1(&mut rng, rounds);

    for (id, round) in rounds.iter() {
        let share_id = round.context.own_share_id().unwrap();
        let stored = round.shares_received[id].expose_secret();
        assert_eq!(stored, round.vss_secret.evaluate(share_id).expose_secret());
        assert_eq!(stored, round.vss_secret.evaluate(share_id).expose_secret());
        assert_eq!(
            round.vss_polynomials[id].evaluate(share_id),
            stored.mul_by_generator()
        );
    }
}

#[test_log::test]
fn independent_runs_differ() {
    let mut rng = ChaCha8Rng::seed_from_u64(3);
    let info = SessionInfo::new(1u32, ids(), THRESHOLD).unwrap();
    let paillier_secret = insecure_paillier_key(&mut rng);

    let run = |seed: u64| {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        KeyGen::<P, Id>::new(info.clone(), None, paillier_secret.clone())
            .unwrap()
            .make_round(&mut rng)
            .unwrap()
            .finalize(&mut rng)
            .unwrap()
    };

    let (round_a, message_a) = run(10);
    let (round_b, message_b) = run(11);
    assert_ne!(round_a.rids[&1], round_b.rids[&1]);
    assert_ne!(round_a.chain_keys[&1], round_b.chain_keys[&1]);
    assert_ne!(message_a.commitment, message_b.commitment);

    // Same RNG state, same everything.
    let (round_c, message_c) = run(10);
    assert_eq!(round_a.rids[&1], round_c.rids[&1]);
    assert_eq!(message_a.commitment, message_c.commitment);
}

#[test_log::test]
fn fresh_run_constant_term_is_random() {
    let mut rng = ChaCha8Rng::seed_from_u64(4);
    let rounds = make_round1(&mut rng, None);
    let (rounds, _messages) = finalize_round1(&mut rng, rounds);
    for (id, round) in rounds.iter() {
        assert!(!round.vss_secret.coeff0().unwrap().is_zero());
        assert!(!round.vss_polynomials[id].coeff0().is_identity());
        assert_eq!(round.vss_polynomials[id].degree(), Some(THRESHOLD));
    }
}

#[test_log::test]
fn fresh_keygen() {
    let mut rng = ChaCha8Rng::seed_from_u64(5);
    let configs = run_keygen(&mut rng, None);
    let public_key = check_consistent(&configs);
    assert!(!public_key.is_identity());

    let verifying_key = configs[&2].verifying_key().unwrap();
    assert_eq!(Some(verifying_key), public_key.to_verifying_key());

    for (id, config) in configs.iter() {
        assert_eq!(config.owner(), id);
        assert_eq!(config.threshold(), THRESHOLD);
        assert_eq!(config.public().len(), 3);
        assert_eq!(config.public()[id].paillier(), &config.paillier_public());
        assert_eq!(
            config.public()[id].paillier().modulus(),
            config.public()[id].pedersen().modulus()
        );
    }
}

#[test_log::test]
fn refresh_keeps_the_key() {
    let mut rng = ChaCha8Rng::seed_from_u64(6);
    let configs = run_keygen(&mut rng, None);
    let public_key = check_consistent(&configs);

    let previous = configs
        .iter()
        .map(|(id, config)| (*id, config.to_previous()))
        .collect::<BTreeMap<_, _>>();

    let rounds = make_round1(&mut rng, Some(&previous));
    let (rounds, _messages) = finalize_round1(&mut rng, rounds);
    for (id, round) in rounds.iter() {
        assert!(round.vss_secret.coeff0().unwrap().is_zero());
        assert!(round.vss_polynomials[id].coeff0().is_identity());
        assert_eq!(&round.chain_keys[id], configs[id].chain_key());
    }

    let refreshed = run_keygen(&mut rng, Some(&previous));
    assert_eq!(check_consistent(&refreshed), public_key);

    for (id, config) in refreshed.iter() {
        assert_eq!(config.chain_key(), configs[id].chain_key());
        assert_ne!(config.rid(), configs[id].rid());
        assert_ne!(
            config.secret_share().expose_secret(),
            configs[id].secret_share().expose_secret()
        );
    }
}

#[test]
fn invalid_previous_config() {
    let info = SessionInfo::new(1u32, ids(), THRESHOLD).unwrap();
    let secret = Scalar::random(&mut OsRng);
    let shares = ids()
        .into_iter()
        .map(|id| (id, Scalar::random(&mut OsRng).mul_by_generator()))
        .collect::<BTreeMap<_, _>>();
    let chain_key = Rid::from_bytes([7; 32]);

    // The own public share does not match the secret.
    let previous = PreviousConfig::new(secret, shares.clone(), chain_key);
    let result = KeyGen::<P, Id>::new(info.clone(), Some(previous), insecure_paillier_key(&mut OsRng));
    assert!(matches!(
        result,
        Err(KeygenError::Session(SessionError::PreviousSecretMismatch))
    ));

    // The previous shares do not cover the current parties.
    let mut partial = shares;
    partial.insert(1, secret.mul_by_generator());
    partial.remove(&3);
    let previous = PreviousConfig::new(secret, partial, chain_key);
    let result = KeyGen::<P, Id>::new(info, Some(previous), insecure_paillier_key(&mut OsRng));
    assert!(matches!(
        result,
        Err(KeygenError::Session(SessionError::PreviousSharesMismatch))
    ));
}

#[test_log::test]
fn unexpected_senders() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let rounds = make_round1(&mut rng, None);
    let (mut rounds, messages) = finalize_round1(&mut rng, rounds);
    let round = rounds.get_mut(&1).unwrap();

    assert!(matches!(
        round.receive_message(&1, messages[&1].clone()),
        Err(ReceiveError::UnknownSender(1))
    ));
    assert!(matches!(
        round.receive_message(&9, messages[&2].clone()),
        Err(ReceiveError::UnknownSender(9))
    ));
    round.receive_message(&2, messages[&2].clone()).unwrap();
    assert!(matches!(
        round.receive_message(&2, messages[&2].clone()),
        Err(ReceiveError::Duplicate(2))
    ));
    assert!(!round.can_finalize());

    // Finalizing early is a local error.
    let round = rounds.remove(&1).unwrap();
    assert!(matches!(round.finalize(), Err(KeygenError::Local(_))));
}

#[test_log::test]
fn tampered_reveal_is_attributed() {
    let mut rng = ChaCha8Rng::seed_from_u64(8);
    let rounds = make_round1(&mut rng, None);
    let (r2, r2_messages) = finalize_round1(&mut rng, rounds);
    let (mut r3, r3_messages) = finalize_round2(r2, &r2_messages);

    let mut message = r3_messages[&2].clone();
    message.reveal.rid = Rid::from_bytes([0; 32]);
    let result = r3.get_mut(&1).unwrap().receive_message(&2, message);
    assert!(matches!(
        result,
        Err(ReceiveError::Remote {
            party: 2,
            error: RemoteError::CommitmentMismatch
        })
    ));

    // A reveal replayed under another sender's name does not open that sender's commitment.
    let result = r3.get_mut(&1).unwrap().receive_message(&3, r3_messages[&2].clone());
    assert!(matches!(
        result,
        Err(ReceiveError::Remote {
            party: 3,
            error: RemoteError::CommitmentMismatch
        })
    ));

    // The rejected messages did not count.
    let round = r3.get_mut(&1).unwrap();
    round.receive_message(&2, r3_messages[&2].clone()).unwrap();
    round.receive_message(&3, r3_messages[&3].clone()).unwrap();
    assert!(round.can_finalize());
}

#[test_log::test]
fn tampered_share_is_attributed() {
    let mut rng = ChaCha8Rng::seed_from_u64(9);
    let rounds = make_round1(&mut rng, None);
    let (r2, r2_messages) = finalize_round1(&mut rng, rounds);
    let (r3, r3_messages) = finalize_round2(r2, &r2_messages);
    let (mut r4, r4_messages) = finalize_round3(&mut rng, r3, &r3_messages);

    let mut message = r4_messages[&2][&1].clone();
    message.share = message.share + &Secret::init_with(|| Scalar::ONE);
    let result = r4.get_mut(&1).unwrap().receive_message(&2, message);
    assert!(matches!(
        result,
        Err(ReceiveError::Remote {
            party: 2,
            error: RemoteError::InvalidShare
        })
    ));

    let mut message = r4_messages[&2][&1].clone();
    message.prm_proof = r4_messages[&3][&1].prm_proof.clone();
    let result = r4.get_mut(&1).unwrap().receive_message(&2, message);
    assert!(matches!(
        result,
        Err(ReceiveError::Remote {
            party: 2,
            error: RemoteError::InvalidPrmProof
        })
    ));

    // A share addressed to another party does not verify either.
    let result = r4.get_mut(&1).unwrap().receive_message(&2, r4_messages[&2][&3].clone());
    assert!(matches!(
        result,
        Err(ReceiveError::Remote {
            party: 2,
            error: RemoteError::InvalidShare
        })
    ));
}

#[test_log::test]
fn swapped_proof_is_attributed() {
    let mut rng = ChaCha8Rng::seed_from_u64(10);
    let rounds = make_round1(&mut rng, None);
    let (r2, r2_messages) = finalize_round1(&mut rng, rounds);
    let (r3, r3_messages) = finalize_round2(r2, &r2_messages);
    let (r4, r4_messages) = finalize_round3(&mut rng, r3, &r3_messages);
    let (mut r5, r5_messages) = finalize_round4(r4, &r4_messages);

    let result = r5.get_mut(&1).unwrap().receive_message(&2, r5_messages[&3].clone());
    assert!(matches!(
        result,
        Err(ReceiveError::Remote {
            party: 2,
            error: RemoteError::InvalidSchnorrProof
        })
    ));
}

fn refresh_with_modified_party(
    seed: u64,
    modify: impl FnOnce(&mut ChaCha8Rng, &mut Round1Prime<P, Id>),
) -> Result<(), ReceiveError<Id>> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let configs = run_keygen(&mut rng, None);
    let previous = configs
        .iter()
        .map(|(id, config)| (*id, config.to_previous()))
        .collect::<BTreeMap<_, _>>();

    let mut rounds = make_round1(&mut rng, Some(&previous));
    modify(&mut rng, rounds.get_mut(&2).unwrap());

    let (r2, r2_messages) = finalize_round1(&mut rng, rounds);
    let (mut r3, r3_messages) = finalize_round2(r2, &r2_messages);
    let round = r3.get_mut(&1).unwrap();
    round.receive_message(&3, r3_messages[&3].clone())?;
    round.receive_message(&2, r3_messages[&2].clone())
}

#[test_log::test]
fn refresh_reveals_are_checked() {
    let result = refresh_with_modified_party(11, |_rng, _round| {});
    assert!(result.is_ok());

    let result = refresh_with_modified_party(12, |rng, round| {
        let constant = Secret::init_with(|| Scalar::random_nonzero(rng));
        round.round1.vss_secret = Polynomial::random(rng, constant, THRESHOLD);
    });
    assert!(matches!(
        result,
        Err(ReceiveError::Remote {
            party: 2,
            error: RemoteError::InvalidConstantTerm
        })
    ));

    let result = refresh_with_modified_party(13, |rng, round| {
        let constant = Secret::init_with(|| Scalar::ZERO);
        round.round1.vss_secret = Polynomial::random(rng, constant, THRESHOLD + 1);
    });
    assert!(matches!(
        result,
        Err(ReceiveError::Remote {
            party: 2,
            error: RemoteError::InvalidPolynomialDegree {
                expected: THRESHOLD,
                actual: Some(2)
            }
        })
    ));

    let result = refresh_with_modified_party(14, |_rng, round| {
        if let Some(previous) = round.round1.previous.as_mut() {
            previous.chain_key = Rid::from_bytes([1; 32]);
        }
    });
    assert!(matches!(
        result,
        Err(ReceiveError::Remote {
            party: 2,
            error: RemoteError::ChainKeyMismatch
        })
    ));
}

fn make_sessions(
    rng: &mut impl CryptoRngCore,
    previous: Option<&BTreeMap<Id, PreviousConfig<Id>>>,
) -> BTreeMap<Id, KeyGenSession<P, Id>> {
    ids()
        .into_iter()
        .map(|id| {
            let info = SessionInfo::new(id, ids(), THRESHOLD).unwrap();
            let previous = previous.map(|configs| configs[&id].clone());
            let paillier_secret = insecure_paillier_key(rng);
            let session = KeyGenSession::new(rng, info, previous, paillier_secret).unwrap();
            (id, session)
        })
        .collect()
}

fn run_sessions(
    rng: &mut impl CryptoRngCore,
    mut sessions: BTreeMap<Id, KeyGenSession<P, Id>>,
) -> BTreeMap<Id, KeyConfig<P, Id>> {
    let mut results = BTreeMap::new();
    let mut sweeps = 0;
    while !sessions.is_empty() {
        sweeps += 1;
        assert!(sweeps <= 5, "the sessions are stuck");

        let mut queue = Vec::new();
        for (id, session) in core::mem::take(&mut sessions) {
            assert!(session.can_finalize());
            match session.finalize(rng).unwrap() {
                SessionOutcome::AnotherRound { session, outgoing } => {
                    for message in outgoing {
                        match message {
                            Outgoing::Broadcast(message) => queue.extend(
                                ids()
                                    .into_iter()
                                    .filter(|to| *to != id)
                                    .map(|to| (id, to, message.clone())),
                            ),
                            Outgoing::Direct { to, message } => queue.push((id, to, message)),
                        }
                    }
                    sessions.insert(id, session);
                }
                SessionOutcome::Result(config) => {
                    results.insert(id, config);
                }
            }
        }

        // Deliver in reverse to mix up the order.
        for (from, to, message) in queue.into_iter().rev() {
            sessions.get_mut(&to).unwrap().receive(&from, message).unwrap();
        }
    }
    results
}

#[test_log::test]
fn session_keygen_and_refresh() {
    let mut rng = ChaCha8Rng::seed_from_u64(15);
    let sessions = make_sessions(&mut rng, None);
    let configs = run_sessions(&mut rng, sessions);
    let public_key = check_consistent(&configs);

    let previous = configs
        .iter()
        .map(|(id, config)| (*id, config.to_previous()))
        .collect::<BTreeMap<_, _>>();
    let sessions = make_sessions(&mut rng, Some(&previous));
    let refreshed = run_sessions(&mut rng, sessions);
    assert_eq!(check_consistent(&refreshed), public_key);
}

#[test_log::test]
fn session_caches_early_messages() {
    let mut rng = ChaCha8Rng::seed_from_u64(16);
    let mut sessions = make_sessions(&mut rng, None);

    // Parties 2 and 3 move on, party 1 lags behind.
    let mut early = Vec::new();
    for id in [2, 3] {
        let session = sessions.remove(&id).unwrap();
        let SessionOutcome::AnotherRound { session, outgoing } = session.finalize(&mut rng).unwrap() else {
            panic!("expected another round");
        };
        assert_eq!(session.round(), 2);
        for message in outgoing {
            let Outgoing::Broadcast(message) = message else {
                panic!("expected a broadcast");
            };
            early.push((id, message));
        }
        sessions.insert(id, session);
    }

    let lagging = sessions.get_mut(&1).unwrap();
    assert_eq!(lagging.round(), 1);
    for (from, message) in early.iter() {
        lagging.receive(from, message.clone()).unwrap();
    }
    assert!(matches!(
        lagging.receive(&2, early[0].1.clone()),
        Err(ReceiveError::Duplicate(2))
    ));

    let session = sessions.remove(&1).unwrap();
    let SessionOutcome::AnotherRound { mut session, outgoing } = session.finalize(&mut rng).unwrap() else {
        panic!("expected another round");
    };
    assert_eq!(session.round(), 2);
    assert_eq!(outgoing.len(), 1);
    assert!(matches!(&outgoing[0], Outgoing::Broadcast(KeyGenMessage::Round2(_))));

    // The cached commitments have been applied.
    assert!(session.can_finalize());
    assert!(matches!(
        session.receive(&2, early[0].1.clone()),
        Err(ReceiveError::Duplicate(2))
    ));

    let SessionOutcome::AnotherRound { mut session, .. } = session.finalize(&mut rng).unwrap() else {
        panic!("expected another round");
    };
    assert_eq!(session.round(), 3);
    assert!(matches!(
        session.receive(&2, early[0].1.clone()),
        Err(ReceiveError::WrongRound {
            party: 2,
            current: 3,
            actual: 2
        })
    ));
}

#[cfg(feature = "parallel")]
#[test_log::test]
fn parallel_finalize_matches_sequential() {
    use crate::tools::executor::Sequential;

    let mut rng = ChaCha8Rng::seed_from_u64(17);
    let info = SessionInfo::new(1u32, ids(), THRESHOLD).unwrap();
    let paillier_secret = insecure_paillier_key(&mut rng);
    let pool = rayon::ThreadPoolBuilder::new().num_threads(2).build().unwrap();

    let make = || {
        let mut rng = ChaCha8Rng::seed_from_u64(18);
        let round = KeyGen::<P, Id>::new(info.clone(), None, paillier_secret.clone())
            .unwrap()
            .make_round(&mut rng)
            .unwrap();
        (rng, round)
    };

    let (mut rng_a, round_a) = make();
    let (round_a, message_a) = round_a.finalize_with(&mut rng_a, &Sequential).unwrap();
    let (mut rng_b, round_b) = make();
    let (round_b, message_b) = round_b.finalize_with(&mut rng_b, &pool).unwrap();

    assert_eq!(message_a.commitment, message_b.commitment);
    assert_eq!(round_a.rids, round_b.rids);
    assert_eq!(round_a.elgamal_publics, round_b.elgamal_publics);
    assert_eq!(round_a.pedersen_publics, round_b.pedersen_publics);
    assert_eq!(round_a.vss_polynomials, round_b.vss_polynomials);
}

/// Serves `budget` bytes from a seeded generator, then fails like an exhausted entropy source.
struct FailingRng {
    inner: ChaCha8Rng,
    budget: usize,
}

impl FailingRng {
    fn new(budget: usize) -> Self {
        Self {
            inner: ChaCha8Rng::seed_from_u64(20),
            budget,
        }
    }
}

impl RngCore for FailingRng {
    fn next_u32(&mut self) -> u32 {
        rand_core::impls::next_u32_via_fill(self)
    }

    fn next_u64(&mut self) -> u64 {
        rand_core::impls::next_u64_via_fill(self)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.try_fill_bytes(dest).unwrap()
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        if dest.len() > self.budget {
            let code = NonZeroU32::new(rand_core::Error::CUSTOM_START).unwrap();
            return Err(rand_core::Error::from(code));
        }
        self.budget -= dest.len();
        self.inner.try_fill_bytes(dest)
    }
}

impl CryptoRng for FailingRng {}

#[test_log::test]
fn polynomial_sampling_failure_is_reported() {
    let mut rng = ChaCha8Rng::seed_from_u64(21);
    let info = SessionInfo::new(1u32, ids(), THRESHOLD).unwrap();

    // Fresh mode samples the constant term and the coefficients.
    let result = KeyGen::<P, Id>::new(info.clone(), None, insecure_paillier_key(&mut rng))
        .unwrap()
        .make_round(&mut FailingRng::new(0));
    assert!(matches!(result, Err(KeygenError::Sampling(SamplingTarget::Polynomial))));

    // Refresh mode samples the coefficients only.
    let configs = run_keygen(&mut rng, None);
    let previous = Some(configs[&1].to_previous());
    let result = KeyGen::<P, Id>::new(info, previous, insecure_paillier_key(&mut rng))
        .unwrap()
        .make_round(&mut FailingRng::new(0));
    assert!(matches!(result, Err(KeygenError::Sampling(SamplingTarget::Polynomial))));
}

#[test_log::test]
fn round1_sampling_failure_sends_nothing() {
    let mut rng = ChaCha8Rng::seed_from_u64(22);
    let mut sessions = make_sessions(&mut rng, None);
    let session = sessions.remove(&1).unwrap();
    let result = session.finalize(&mut FailingRng::new(0));
    assert!(matches!(result, Err(KeygenError::Sampling(SamplingTarget::RngSeed))));
}

#[test_log::test]
fn prm_sampling_failure_is_reported() {
    let mut rng = ChaCha8Rng::seed_from_u64(23);
    let rounds = make_round1(&mut rng, None);
    let (r2, r2_messages) = finalize_round1(&mut rng, rounds);
    let (mut r3, r3_messages) = finalize_round2(r2, &r2_messages);

    let mut round = r3.remove(&1).unwrap();
    round.receive_message(&2, r3_messages[&2].clone()).unwrap();
    round.receive_message(&3, r3_messages[&3].clone()).unwrap();
    assert!(round.can_finalize());

    let result = round.finalize(&mut FailingRng::new(0));
    assert!(matches!(result, Err(KeygenError::Sampling(SamplingTarget::PrmProof))));
}

/// Runs everything in order, counting the scheduled pairs.
#[derive(Default)]
struct CountingExecutor(AtomicUsize);

impl Executor for CountingExecutor {
    fn join<A, B, RA, RB>(&self, a: A, b: B) -> (RA, RB)
    where
        A: FnOnce() -> RA + Send,
        B: FnOnce() -> RB + Send,
        RA: Send,
        RB: Send,
    {
        self.0.fetch_add(1, Ordering::Relaxed);
        (a(), b())
    }
}

fn first_commitment(outcome: SessionOutcome<P, Id>) -> Round2Message {
    match outcome {
        SessionOutcome::AnotherRound { outgoing, .. } => match outgoing.into_iter().next() {
            Some(Outgoing::Broadcast(KeyGenMessage::Round2(message))) => message,
            other => panic!("expected a broadcast commitment, got {other:?}"),
        },
        SessionOutcome::Result(_) => panic!("the session finished too early"),
    }
}

#[test_log::test]
fn session_uses_the_given_executor() {
    let executor = CountingExecutor::default();

    let mut rng = ChaCha8Rng::seed_from_u64(24);
    let mut sessions = make_sessions(&mut rng, None);
    let outcome = sessions.remove(&1).unwrap().finalize_with(&mut rng, &executor).unwrap();
    let with_executor = first_commitment(outcome);

    let mut rng = ChaCha8Rng::seed_from_u64(24);
    let mut sessions = make_sessions(&mut rng, None);
    let outcome = sessions.remove(&1).unwrap().finalize(&mut rng).unwrap();
    let sequential = first_commitment(outcome);

    assert!(executor.0.load(Ordering::Relaxed) > 0);
    assert_eq!(with_executor.commitment, sequential.commitment);
}
