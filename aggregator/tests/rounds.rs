use aggregator::clients::Uplink;
use aggregator::telemetry::init_tracing;
use aggregator::{AggregationServer, AggregatorError, ProtocolConfig, ProtocolViolation, RoundOutcome};
use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use shuffle_proofs::circuit::check_satisfied;
use shuffle_proofs::client::{ClientState, VoteContribution};
use shuffle_proofs::groth16::Groth16Backend;
use shuffle_proofs::messages::ClientSubmitMessage;
use shuffle_proofs::rank::{CandidatePair, Ranking};
use shuffle_proofs::shuffler::{shuffle, ClientBundle, Relay, ShuffledBatch, Shuffler};
use shuffle_proofs::Fr;

type Server = AggregationServer<Groth16Backend>;

/// Shuffles honestly, then replaces one value.
struct ReplacingRelay;

impl Relay<Fr> for ReplacingRelay {
    fn relay(&mut self, bundles: Vec<ClientBundle<Fr>>) -> ShuffledBatch<Fr> {
        let mut batch = shuffle(bundles, &mut OsRng);
        batch.values[0] += Fr::from(1u64);
        batch
    }
}

/// Shuffles honestly, then drops one dummy.
struct DroppingRelay;

impl Relay<Fr> for DroppingRelay {
    fn relay(&mut self, bundles: Vec<ClientBundle<Fr>>) -> ShuffledBatch<Fr> {
        let mut batch = shuffle(bundles, &mut OsRng);
        batch.dummies.pop();
        batch
    }
}

/// Rewrites a pair into an out-of-range encoding of the same field element.
struct AliasingRelay;

impl Relay<CandidatePair> for AliasingRelay {
    fn relay(&mut self, bundles: Vec<ClientBundle<CandidatePair>>) -> ShuffledBatch<CandidatePair> {
        let mut batch = shuffle(bundles, &mut OsRng);
        for p in batch.values.iter_mut() {
            if *p == CandidatePair::new(2, 0) {
                // 2 * 3 + 0 == 1 * 3 + 3
                *p = CandidatePair::new(1, 3);
            }
        }
        batch
    }
}

/// Hands client 1 the proof client 0 produced.
#[derive(Default)]
struct ProofSwappingUplink {
    first: Option<String>,
}

impl Uplink for ProofSwappingUplink {
    fn deliver(&mut self, mut message: ClientSubmitMessage) -> ClientSubmitMessage {
        if let Some(envelope) = message.proof.as_mut() {
            match message.client {
                0 => self.first = Some(envelope.proof.clone()),
                1 => {
                    if let Some(proof) = self.first.clone() {
                        envelope.proof = proof;
                    }
                }
                _ => {}
            }
        }
        message
    }
}

/// Claims a larger threshold than the round's in client 2's public inputs.
struct ThresholdClaimingUplink;

impl Uplink for ThresholdClaimingUplink {
    fn deliver(&mut self, mut message: ClientSubmitMessage) -> ClientSubmitMessage {
        if message.client == 2 {
            if let Some(envelope) = message.proof.as_mut() {
                envelope.public_inputs[0] = Fr::from(1_000_000u64);
            }
        }
        message
    }
}

/// Drops client 0's proof.
struct ProofDroppingUplink;

impl Uplink for ProofDroppingUplink {
    fn deliver(&mut self, mut message: ClientSubmitMessage) -> ClientSubmitMessage {
        if message.client == 0 {
            message.proof = None;
        }
        message
    }
}

fn ranking(order: &[usize]) -> Ranking {
    Ranking::new(order.to_vec()).unwrap()
}

#[tokio::test]
async fn threshold_sum_round() {
    init_tracing();
    let server = Server::new(ProtocolConfig::sum(3, 2997, 3)).unwrap();

    let report = server.run_sum_round(vec![999, 999, 999]).await.unwrap();

    assert_eq!(report.outcome.sum(), Some(2997));
    assert_eq!(report.sampled.len(), 3);
    assert_eq!(report.verified.len(), 3);
    assert!(report.proof_failures.is_empty());
    assert_eq!(report.costs.public_witness, 4 * 32);
    assert!(report.costs.proof > 0);
    assert_eq!(report.costs.dummies, server.dummies_per_client() * 32);
}

#[tokio::test]
async fn failing_proofs_do_not_change_the_aggregate() {
    init_tracing();
    // Every client's secret exceeds the threshold, so no proof can be produced.
    let config = ProtocolConfig::sum(3, 998, 3).with_dummies_per_client(8);
    let server = Server::new(config).unwrap();

    let report = server.run_sum_round(vec![999, 999, 999]).await.unwrap();

    assert_eq!(report.outcome.sum(), Some(2997));
    assert!(report.verified.is_empty());
    assert_eq!(report.proof_failures.len(), 3);
    assert!(report.proof_failures.iter().all(|f| f.reason.contains("unsatisfiable")));
}

#[tokio::test]
async fn only_the_sample_proves() {
    let config = ProtocolConfig::sum(4, 100, 2).with_max_sampled_proofs(1);
    let server = Server::new(config).unwrap();

    let report = server.run_sum_round(vec![10, 20, 30, 40]).await.unwrap();

    assert_eq!(report.outcome.sum(), Some(100));
    assert_eq!(report.sampled.len(), 1);
    assert_eq!(report.verified, report.sampled);
}

#[tokio::test]
async fn single_ballot_vote_round() {
    init_tracing();
    let config = ProtocolConfig::vote(1, 3).with_dummies_per_client(4);
    let server = Server::new(config).unwrap();

    let report = server.run_vote_round(vec![ranking(&[2, 0, 1])]).await.unwrap();

    let RoundOutcome::Vote { tally, winner } = &report.outcome else {
        panic!("expected a vote outcome");
    };
    assert_eq!(tally.get(2, 0), 1);
    assert_eq!(tally.get(2, 1), 1);
    assert_eq!(tally.get(0, 1), 1);
    assert_eq!(tally.get(0, 2) + tally.get(1, 2) + tally.get(1, 0), 0);
    assert_eq!(*winner, Some(2));
    assert_eq!(report.verified, vec![0]);
    assert_eq!(report.costs.public_witness, 3 * 32);
}

#[tokio::test]
async fn split_vote_has_no_sole_winner() {
    let config = ProtocolConfig::vote(2, 3).with_dummies_per_client(4);
    let server = Server::new(config).unwrap();

    let report = server
        .run_vote_round(vec![ranking(&[0, 1, 2]), ranking(&[1, 0, 2])])
        .await
        .unwrap();

    assert_eq!(report.outcome.winner(), None);
    let tally = report.outcome.tally().unwrap();
    assert_eq!(tally.get(0, 1), 1);
    assert_eq!(tally.get(1, 0), 1);
    assert_eq!(tally.get(0, 2), 2);
    assert_eq!(tally.get(1, 2), 2);
}

#[tokio::test]
async fn replaced_value_fails_the_round() {
    let config = ProtocolConfig::sum(3, 100, 2).with_dummies_per_client(4).with_max_sampled_proofs(1);
    let server = Server::new(config).unwrap();

    let err = server.run_round(vec![1u64, 2, 3], &mut ReplacingRelay).await.unwrap_err();
    assert!(matches!(
        err,
        AggregatorError::ProtocolViolation(ProtocolViolation::FingerprintMismatch)
    ));
}

#[tokio::test]
async fn dropped_dummy_fails_the_round() {
    let config = ProtocolConfig::sum(3, 100, 2).with_dummies_per_client(4).with_max_sampled_proofs(1);
    let server = Server::new(config).unwrap();

    let err = server.run_round(vec![1u64, 2, 3], &mut DroppingRelay).await.unwrap_err();
    assert!(matches!(
        err,
        AggregatorError::ProtocolViolation(ProtocolViolation::FingerprintMismatch)
    ));
}

#[tokio::test]
async fn aliased_pair_is_rejected_before_tallying() {
    let config = ProtocolConfig::vote(1, 3).with_dummies_per_client(2);
    let server = Server::new(config).unwrap();

    let err = server
        .run_round(vec![ranking(&[2, 0, 1])], &mut AliasingRelay)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AggregatorError::ProtocolViolation(ProtocolViolation::MalformedBatch(_))
    ));
}

#[tokio::test]
async fn inputs_are_validated_before_the_round() {
    let server = Server::new(ProtocolConfig::sum(3, 100, 2).with_dummies_per_client(2)).unwrap();
    assert!(matches!(
        server.run_sum_round(vec![1, 2]).await,
        Err(AggregatorError::MalformedInput(_))
    ));

    let server = Server::new(ProtocolConfig::vote(1, 3).with_dummies_per_client(2)).unwrap();
    assert!(matches!(
        server.run_vote_round(vec![ranking(&[1, 0])]).await,
        Err(AggregatorError::MalformedInput(_))
    ));

    assert!(matches!(
        Server::new(ProtocolConfig::sum(3, 100, 2).with_corrupted(3)),
        Err(AggregatorError::MalformedInput(_))
    ));
    assert!(matches!(
        Server::new(ProtocolConfig::sum(3, 100, 2).with_max_sampled_proofs(0)),
        Err(AggregatorError::MalformedInput(_))
    ));
}

#[tokio::test]
async fn keys_survive_across_servers() {
    let dir = tempfile::tempdir().unwrap();
    let config = ProtocolConfig::sum(3, 50, 2).with_dummies_per_client(2).with_key_dir(dir.path());

    let first = Server::new(config.clone()).unwrap();
    let vk = first.ensure_keys().await.unwrap().vk;
    first.run_sum_round(vec![1, 2, 3]).await.unwrap();

    let second = Server::new(config).unwrap();
    assert_eq!(*second.ensure_keys().await.unwrap().vk, *vk);
    let report = second.run_sum_round(vec![4, 5, 6]).await.unwrap();
    assert_eq!(report.outcome.sum(), Some(15));
    assert_eq!(report.verified.len(), 3);
}

#[tokio::test]
async fn report_serializes_to_json() {
    let config = ProtocolConfig::vote(1, 2).with_dummies_per_client(1);
    let report = Server::new(config)
        .unwrap()
        .run_vote_round(vec![ranking(&[1, 0])])
        .await
        .unwrap();

    let json = serde_json::to_value(&report).unwrap();
    assert_eq!(json["outcome"]["kind"], "vote");
    assert_eq!(json["outcome"]["winner"], 1);
    assert_eq!(json["backend"], "groth16-bn254");
    assert!(json["round_id"].is_string());
}

#[tokio::test]
async fn mismatched_proof_fails_the_round() {
    let config = ProtocolConfig::sum(3, 100, 2).with_dummies_per_client(4);
    let server = Server::new(config).unwrap();

    let err = server
        .run_round_with(vec![1u64, 2, 3], &mut Shuffler::from_entropy(), &mut ProofSwappingUplink::default())
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AggregatorError::ProtocolViolation(ProtocolViolation::ProofRejected { client: 1 })
    ));
}

#[tokio::test]
async fn proof_for_other_public_inputs_fails_the_round() {
    let config = ProtocolConfig::sum(3, 100, 2).with_dummies_per_client(4);
    let server = Server::new(config).unwrap();

    let err = server
        .run_round_with(vec![1u64, 2, 3], &mut Shuffler::from_entropy(), &mut ThresholdClaimingUplink)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        AggregatorError::ProtocolViolation(ProtocolViolation::PublicInputMismatch { client: 2 })
    ));
}

#[tokio::test]
async fn missing_proof_only_drops_the_client() {
    let config = ProtocolConfig::sum(3, 100, 2).with_dummies_per_client(4);
    let server = Server::new(config).unwrap();

    let report = server
        .run_round_with(vec![1u64, 2, 3], &mut Shuffler::from_entropy(), &mut ProofDroppingUplink)
        .await
        .unwrap();
    assert_eq!(report.outcome.sum(), Some(6));
    assert_eq!(report.verified, vec![1, 2]);
    assert_eq!(report.proof_failures.len(), 1);
    assert_eq!(report.proof_failures[0].client, 0);
    assert_eq!(report.proof_failures[0].reason, "no proof submitted");
}

#[test]
fn synthesis_under_tracing_completes() {
    init_tracing();
    let rng = &mut ChaCha20Rng::seed_from_u64(11);
    let contribution = VoteContribution::new(ranking(&[4, 1, 7, 0, 3, 6, 2, 5]));
    let state = ClientState::new(0, contribution, 8, rng);

    check_satisfied(state.build_assignment(Fr::from(12345u64))).unwrap();
}

#[tokio::test]
async fn single_candidate_vote_round() {
    let config = ProtocolConfig::vote(2, 1).with_dummies_per_client(2);
    let server = Server::new(config).unwrap();

    let report = server.run_vote_round(vec![ranking(&[0]), ranking(&[0])]).await.unwrap();
    assert_eq!(report.outcome.winner(), Some(0));
    assert_eq!(report.verified.len(), 2);
}
