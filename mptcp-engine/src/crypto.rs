//! SHA-1 and HMAC-SHA1 truncations used by the MPTCP handshakes.
//!
//! MPTCP (RFC 6824) derives the session token and the initial data
//! sequence numbers from SHA-1 of a side's 64-bit key, and authenticates
//! MP_JOIN handshakes with HMAC-SHA1 over the two sides' random numbers.
//! All inputs are laid out in network byte order before hashing.

use hmac::{Hmac, Mac};
use sha1::{Digest, Sha1};

type HmacSha1 = Hmac<Sha1>;

/// Least-significant 64 bits of SHA-1 over the 8 big-endian bytes of `key`.
///
/// This is the IDSN derivation: digest bytes 12..20 read as a big-endian
/// integer.
pub fn sha1_least_64(key: u64) -> u64 {
    let digest = Sha1::digest(key.to_be_bytes());
    let mut low = [0u8; 8];
    low.copy_from_slice(&digest[12..20]);
    u64::from_be_bytes(low)
}

/// Least-significant 32 bits of the same digest: the MP_JOIN receiver token.
pub fn sha1_least_32(key: u64) -> u32 {
    let digest = Sha1::digest(key.to_be_bytes());
    let mut low = [0u8; 4];
    low.copy_from_slice(&digest[16..20]);
    u32::from_be_bytes(low)
}

/// Concatenate two 64-bit keys into the 16-byte HMAC key, network byte
/// order, `first` in front. Which key goes in front depends on the packet
/// direction; see the MP_JOIN handler.
pub fn hmac_key(first: u64, second: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&first.to_be_bytes());
    key[8..].copy_from_slice(&second.to_be_bytes());
    key
}

/// Concatenate the two 32-bit random numbers into the 8-byte HMAC message,
/// network byte order, `first` in front.
pub fn hmac_msg(first: u32, second: u32) -> [u8; 8] {
    let mut msg = [0u8; 8];
    msg[..4].copy_from_slice(&first.to_be_bytes());
    msg[4..].copy_from_slice(&second.to_be_bytes());
    msg
}

/// Full 20-byte HMAC-SHA1 tag, written raw into the MP_JOIN ACK option.
pub fn hmac_sha1(key: &[u8; 16], msg: &[u8; 8]) -> [u8; 20] {
    let mut mac = HmacSha1::new_from_slice(key).expect("HMAC-SHA1 accepts a 16-byte key");
    mac.update(msg);
    let tag = mac.finalize().into_bytes();
    let mut out = [0u8; 20];
    out.copy_from_slice(&tag);
    out
}

/// First 64 bits of the HMAC-SHA1 tag as a big-endian integer, the form
/// carried by the MP_JOIN SYN/ACK.
pub fn hmac_sha1_trunc_64(key: &[u8; 16], msg: &[u8; 8]) -> u64 {
    let tag = hmac_sha1(key, msg);
    let mut head = [0u8; 8];
    head.copy_from_slice(&tag[..8]);
    u64::from_be_bytes(head)
}
