mod helpers;

use helpers::*;
use mptcp_engine::crypto::{hmac_key, hmac_msg, hmac_sha1, hmac_sha1_trunc_64, sha1_least_32};
use mptcp_engine::options::{decode, encode};
use mptcp_engine::{Direction, EngineError, JoinScript, MpJoin, MptcpOption, TokenSpec};

const KERNEL_KEY: u64 = 0xAABB_CCDD_EEFF_0011;
const JOIN_PORT: u16 = 4001;

#[test]
fn auto_join_syn_fills_token_rand_and_addr_id() {
    let mut engine = engine();
    let (_, kernel_key) = run_capable_handshake(&mut engine, KERNEL_KEY);
    let next_id = engine.session().next_addr_id();

    engine.push_join_hint(JoinScript::auto());
    let mut syn = packet(JOIN_PORT, KERNEL_PORT, true, false, vec![join_syn(0, 0, 0)]);
    engine.process(&mut syn, None, Direction::Inbound).unwrap();

    assert_eq!(engine.session().subflow_count(), 2);
    let flow = engine
        .session()
        .find_by_socket(JOIN_PORT, KERNEL_PORT)
        .expect("join subflow registered");
    match mptcp(&syn) {
        MptcpOption::Join(MpJoin::Syn {
            address_id,
            receiver_token,
            sender_rand,
            ..
        }) => {
            assert_eq!(*receiver_token, sha1_least_32(kernel_key));
            assert_eq!(*sender_rand, flow.harness_rand);
            assert_eq!(*address_id, next_id);
        }
        other => panic!("expected MP_JOIN SYN, got {other:?}"),
    }
    assert!(engine.session().next_addr_id() > next_id);
}

#[test]
fn scripted_join_syn_overrides_are_honored() {
    let mut engine = engine();
    let _ = run_capable_handshake(&mut engine, KERNEL_KEY);

    engine.push_join_hint(JoinScript {
        address_id: Some(9),
        token: TokenSpec::Literal(0xCAFE_F00D),
        rand: Some(0x0101_0202),
    });
    let mut syn = packet(JOIN_PORT, KERNEL_PORT, true, false, vec![join_syn(0, 0, 0)]);
    engine.process(&mut syn, None, Direction::Inbound).unwrap();

    match mptcp(&syn) {
        MptcpOption::Join(MpJoin::Syn {
            address_id,
            receiver_token,
            sender_rand,
            ..
        }) => {
            assert_eq!(*receiver_token, 0xCAFE_F00D);
            assert_eq!(*sender_rand, 0x0101_0202);
            assert_eq!(*address_id, 9);
        }
        other => panic!("expected MP_JOIN SYN, got {other:?}"),
    }
}

#[test]
fn outbound_syn_ack_absorbs_kernel_fields_and_signs() {
    let mut engine = engine();
    let (harness_key, kernel_key) = run_capable_handshake(&mut engine, KERNEL_KEY);

    // Harness opens the second subflow.
    engine.push_join_hint(JoinScript::auto());
    let mut syn = packet(JOIN_PORT, KERNEL_PORT, true, false, vec![join_syn(0, 0, 0)]);
    engine.process(&mut syn, None, Direction::Inbound).unwrap();
    let harness_rand = engine
        .session()
        .find_by_socket(JOIN_PORT, KERNEL_PORT)
        .unwrap()
        .harness_rand;

    // Kernel answers; its address id and random number come from capture.
    engine.push_join_hint(JoinScript::auto());
    let live = packet(
        KERNEL_PORT,
        JOIN_PORT,
        true,
        true,
        vec![join_syn_ack(5, 0, 0x5566_7788)],
    );
    let mut syn_ack = packet(
        KERNEL_PORT,
        JOIN_PORT,
        true,
        true,
        vec![join_syn_ack(0, 0, 0)],
    );
    engine
        .process(&mut syn_ack, Some(&live), Direction::Outbound)
        .unwrap();

    let flow = engine
        .session()
        .find_by_socket(JOIN_PORT, KERNEL_PORT)
        .unwrap();
    assert_eq!(flow.kernel_addr_id, 5);
    assert_eq!(flow.kernel_rand, 0x5566_7788);

    let expected = hmac_sha1_trunc_64(
        &hmac_key(kernel_key, harness_key),
        &hmac_msg(0x5566_7788, harness_rand),
    );
    match mptcp(&syn_ack) {
        MptcpOption::Join(MpJoin::SynAck {
            address_id,
            sender_hmac,
            sender_rand,
            ..
        }) => {
            assert_eq!(*address_id, 5);
            assert_eq!(*sender_rand, 0x5566_7788);
            assert_eq!(*sender_hmac, expected);
        }
        other => panic!("expected MP_JOIN SYN/ACK, got {other:?}"),
    }
}

#[test]
fn inbound_ack_carries_the_full_hmac_tag() {
    let mut engine = engine();
    let (harness_key, kernel_key) = run_capable_handshake(&mut engine, KERNEL_KEY);

    engine.push_join_hint(JoinScript::auto());
    let mut syn = packet(JOIN_PORT, KERNEL_PORT, true, false, vec![join_syn(0, 0, 0)]);
    engine.process(&mut syn, None, Direction::Inbound).unwrap();

    engine.push_join_hint(JoinScript::auto());
    let live = packet(
        KERNEL_PORT,
        JOIN_PORT,
        true,
        true,
        vec![join_syn_ack(5, 0, 0x5566_7788)],
    );
    let mut syn_ack = packet(
        KERNEL_PORT,
        JOIN_PORT,
        true,
        true,
        vec![join_syn_ack(0, 0, 0)],
    );
    engine
        .process(&mut syn_ack, Some(&live), Direction::Outbound)
        .unwrap();

    engine.push_join_hint(JoinScript::auto());
    let mut ack = packet(JOIN_PORT, KERNEL_PORT, false, true, vec![join_ack()]);
    engine.process(&mut ack, None, Direction::Inbound).unwrap();

    let flow = engine
        .session()
        .find_by_socket(JOIN_PORT, KERNEL_PORT)
        .unwrap();
    let expected = hmac_sha1(
        &hmac_key(harness_key, kernel_key),
        &hmac_msg(flow.harness_rand, flow.kernel_rand),
    );
    match mptcp(&ack) {
        MptcpOption::Join(MpJoin::Ack { sender_hmac }) => {
            assert_eq!(*sender_hmac, expected);
        }
        other => panic!("expected MP_JOIN ACK, got {other:?}"),
    }

    // The same tag survives the wire codec byte-identically.
    let bytes = encode(mptcp(&ack));
    assert_eq!(bytes[0], 30);
    assert_eq!(bytes[1], 24);
    assert_eq!(&bytes[4..24], &expected[..]);
    assert_eq!(decode(&bytes).unwrap(), *mptcp(&ack));
}

#[test]
fn syn_ack_hmac_recomputes_from_stored_state() {
    let mut engine = engine();
    let (harness_key, kernel_key) = run_capable_handshake(&mut engine, KERNEL_KEY);

    // Kernel initiates the join: outbound SYN creates the subflow.
    engine.push_join_hint(JoinScript::auto());
    let live_syn = packet(
        KERNEL_PORT,
        JOIN_PORT,
        true,
        false,
        vec![join_syn(3, 0, 0x0DDB_A11)],
    );
    let mut syn = packet(KERNEL_PORT, JOIN_PORT, true, false, vec![join_syn(0, 0, 0)]);
    engine
        .process(&mut syn, Some(&live_syn), Direction::Outbound)
        .unwrap();

    // Harness answers with the SYN/ACK carrying the truncated HMAC.
    engine.push_join_hint(JoinScript::auto());
    let mut syn_ack = packet(JOIN_PORT, KERNEL_PORT, true, true, vec![join_syn_ack(0, 0, 0)]);
    engine
        .process(&mut syn_ack, None, Direction::Inbound)
        .unwrap();

    let flow = engine
        .session()
        .find_by_socket(JOIN_PORT, KERNEL_PORT)
        .unwrap();
    assert_eq!(flow.kernel_rand, 0x0DDB_A11);

    // Recomputing from stored keys and rands reproduces the wire value.
    let expected = hmac_sha1_trunc_64(
        &hmac_key(harness_key, kernel_key),
        &hmac_msg(flow.harness_rand, flow.kernel_rand),
    );
    match mptcp(&syn_ack) {
        MptcpOption::Join(MpJoin::SynAck { sender_hmac, .. }) => {
            assert_eq!(*sender_hmac, expected)
        }
        other => panic!("expected MP_JOIN SYN/ACK, got {other:?}"),
    }
}

#[test]
fn join_ack_without_subflow_is_rejected() {
    let mut engine = engine();
    let _ = run_capable_handshake(&mut engine, KERNEL_KEY);

    engine.push_join_hint(JoinScript::auto());
    let mut ack = packet(4999, KERNEL_PORT, false, true, vec![join_ack()]);
    let err = engine
        .process(&mut ack, None, Direction::Inbound)
        .unwrap_err();
    assert!(matches!(err, EngineError::NoSubflow { .. }));
}

#[test]
fn join_with_key_hint_in_queue_is_a_shape_error() {
    let mut engine = engine();
    let _ = run_capable_handshake(&mut engine, KERNEL_KEY);

    engine.push_key_hint("stray");
    let mut syn = packet(JOIN_PORT, KERNEL_PORT, true, false, vec![join_syn(0, 0, 0)]);
    let err = engine
        .process(&mut syn, None, Direction::Inbound)
        .unwrap_err();
    assert!(matches!(err, EngineError::HintShape { .. }));
}
