#![allow(dead_code)]

use mptcp_engine::options::{DackBlock, DsnBlock};
use mptcp_engine::{
    Direction, Dss, DssField, Engine, EngineConfig, IpPair, MpCapable, MpJoin, MptcpOption, Packet,
    TcpOption,
};

pub const SEED: u64 = 0x5EED;

pub const HARNESS_PORT: u16 = 4000;
pub const KERNEL_PORT: u16 = 8000;

pub fn engine() -> Engine {
    Engine::new(EngineConfig::with_seed(SEED))
}

pub fn packet(
    src_port: u16,
    dst_port: u16,
    syn: bool,
    ack: bool,
    options: Vec<TcpOption>,
) -> Packet {
    Packet {
        ip: Some(IpPair {
            src: "192.0.2.1".parse().unwrap(),
            dst: "192.0.2.2".parse().unwrap(),
        }),
        src_port,
        dst_port,
        syn,
        ack,
        payload_len: 0,
        payload_csum: 0,
        options,
    }
}

pub fn capable_syn(key: u64) -> TcpOption {
    TcpOption::Mptcp(MptcpOption::Capable(MpCapable::Syn {
        version: 0,
        flags: 0x01,
        key,
    }))
}

pub fn capable_ack() -> TcpOption {
    TcpOption::Mptcp(MptcpOption::Capable(MpCapable::Ack {
        version: 0,
        flags: 0x01,
        sender_key: 0,
        receiver_key: 0,
    }))
}

pub fn join_syn(address_id: u8, receiver_token: u32, sender_rand: u32) -> TcpOption {
    TcpOption::Mptcp(MptcpOption::Join(MpJoin::Syn {
        backup: false,
        address_id,
        receiver_token,
        sender_rand,
    }))
}

pub fn join_syn_ack(address_id: u8, sender_hmac: u64, sender_rand: u32) -> TcpOption {
    TcpOption::Mptcp(MptcpOption::Join(MpJoin::SynAck {
        backup: false,
        address_id,
        sender_hmac,
        sender_rand,
    }))
}

pub fn join_ack() -> TcpOption {
    TcpOption::Mptcp(MptcpOption::Join(MpJoin::Ack {
        sender_hmac: [0; 20],
    }))
}

pub fn dss_dack4(value: DssField) -> TcpOption {
    TcpOption::Mptcp(MptcpOption::Dss(Dss {
        fin: false,
        dack: Some(DackBlock {
            value,
            eight: false,
        }),
        dsn: None,
    }))
}

pub fn dss_dsn(eight: bool, value: DssField, checksum: bool) -> TcpOption {
    TcpOption::Mptcp(MptcpOption::Dss(Dss {
        fin: false,
        dack: None,
        dsn: Some(DsnBlock {
            value,
            eight,
            ssn: 0,
            dll: 0,
            checksum: checksum.then_some(0),
        }),
    }))
}

/// Unwrap the first MPTCP option of a packet.
pub fn mptcp(pkt: &Packet) -> &MptcpOption {
    pkt.mptcp_option().expect("packet carries an MPTCP option")
}

/// Drive the full MP_CAPABLE handshake on the primary port pair with the
/// kernel key observed from the capture. Returns the bound key pair.
pub fn run_capable_handshake(engine: &mut Engine, kernel_key: u64) -> (u64, u64) {
    engine.push_key_hint("client_key");
    engine.push_key_hint("server_key");
    engine.push_key_hint("client_key");
    engine.push_key_hint("server_key");

    let mut syn = packet(HARNESS_PORT, KERNEL_PORT, true, false, vec![capable_syn(0)]);
    engine
        .process(&mut syn, None, Direction::Inbound)
        .expect("inbound MP_CAPABLE SYN");

    let live = packet(
        KERNEL_PORT,
        HARNESS_PORT,
        true,
        true,
        vec![capable_syn(kernel_key)],
    );
    let mut syn_ack = packet(KERNEL_PORT, HARNESS_PORT, true, true, vec![capable_syn(0)]);
    engine
        .process(&mut syn_ack, Some(&live), Direction::Outbound)
        .expect("outbound MP_CAPABLE SYN/ACK");

    let mut ack = packet(HARNESS_PORT, KERNEL_PORT, false, true, vec![capable_ack()]);
    engine
        .process(&mut ack, None, Direction::Inbound)
        .expect("inbound MP_CAPABLE ACK");

    (
        engine.session().harness_key().unwrap(),
        engine.session().kernel_key().unwrap(),
    )
}
