//! Record Parser
//!
//! Decodes the JSON a forum writes into each chain entry:
//!
//! ```text
//! {
//!    "entry_date": 1548972114,
//!    "post_data": {
//!       "edit_count": 0, "last_edit_date": 0, "last_edit_user_id": 0,
//!       "message_sha512": "7841f74a…", "node_id": 52, "post_date": 1548971254,
//!       "thread_id": 1575, "title_sha512": "cad89aea…", "user_id": 9
//!    },
//!    "post_link": "https://factomize.com/forums/index.php?threads/1575#post-10623"
//! }
//! ```
//!
//! Parsing is strict: a record that does not fit the schema fails the whole
//! run. Also hosts the Factom entry-hash function used to check the identity
//! the ledger assigns to each record.

use serde::Deserialize;
use sha2::{Digest, Sha256, Sha512};
use tracing::debug;

use crate::error::{RaffleError, RaffleResult};
use crate::types::{ChainId, Hash, LedgerRecord, PostRecord};

/// Entry version byte prefixed to every marshalled entry
pub const ENTRY_VERSION: u8 = 0;

/// Hard cap on entry size accepted by factomd
pub const MAX_ENTRY_SIZE: usize = 10_240;

/// Forum digests are SHA-512
pub const POST_DIGEST_LEN: usize = 64;

#[derive(Debug, Deserialize)]
struct ForumPost {
    #[serde(default)]
    entry_date: i64,
    post_data: PostData,
    post_link: String,
}

#[derive(Debug, Deserialize)]
struct PostData {
    #[serde(default)]
    edit_count: u32,
    message_sha512: String,
    node_id: u64,
    post_date: i64,
    thread_id: u64,
    title_sha512: String,
    user_id: u64,
}

/// Parse one ledger record into a post
pub fn parse_record(record: &LedgerRecord) -> RaffleResult<PostRecord> {
    let decode_err = |reason: String| RaffleError::Decode {
        sequence: record.sequence,
        reason,
    };

    let post: ForumPost =
        serde_json::from_slice(&record.payload).map_err(|e| decode_err(e.to_string()))?;

    let message_digest = decode_digest("message_sha512", &post.post_data.message_sha512)
        .map_err(decode_err)?;
    let title_digest =
        decode_digest("title_sha512", &post.post_data.title_sha512).map_err(decode_err)?;

    debug!(
        "parsed entry #{} user={} thread={}",
        record.sequence, post.post_data.user_id, post.post_data.thread_id
    );

    Ok(PostRecord {
        user_id: post.post_data.user_id,
        message_digest,
        title_digest,
        post_date: post.post_data.post_date,
        entry_date: post.entry_date,
        thread_id: post.post_data.thread_id,
        node_id: post.post_data.node_id,
        edit_count: post.post_data.edit_count,
        post_link: post.post_link,
        entry_hash: record.identity,
        sequence: record.sequence,
    })
}

/// Hex-decode a post digest and require the SHA-512 length
fn decode_digest(field: &str, hex_digest: &str) -> Result<Vec<u8>, String> {
    let digest = hex::decode(hex_digest).map_err(|e| format!("{field}: {e}"))?;
    if digest.len() != POST_DIGEST_LEN {
        return Err(format!(
            "{field}: expected {POST_DIGEST_LEN} bytes, got {}",
            digest.len()
        ));
    }
    Ok(digest)
}

/// Parse every record, stopping at the first one that does not decode
pub fn parse_records(records: &[LedgerRecord]) -> RaffleResult<Vec<PostRecord>> {
    records.iter().map(parse_record).collect()
}

/// Marshal an entry the way factomd hashes it
///
/// ```text
/// version(1) ‖ chain_id(32) ‖ u16be(ext_ids_size) ‖ (u16be(len) ‖ ext_id)* ‖ content
/// ```
pub fn marshal_entry(
    chain_id: &ChainId,
    ext_ids: &[Vec<u8>],
    content: &[u8],
) -> RaffleResult<Vec<u8>> {
    let ext_size: usize = ext_ids.iter().map(|x| 2 + x.len()).sum();
    let total = 1 + 32 + 2 + ext_size + content.len();
    if total > MAX_ENTRY_SIZE + 35 {
        return Err(RaffleError::Retrieval(format!(
            "entry of {total} bytes exceeds the ledger's size limit"
        )));
    }

    let mut data = Vec::with_capacity(total);
    data.push(ENTRY_VERSION);
    data.extend_from_slice(chain_id.as_bytes());
    data.extend_from_slice(&(ext_size as u16).to_be_bytes());
    for ext in ext_ids {
        data.extend_from_slice(&(ext.len() as u16).to_be_bytes());
        data.extend_from_slice(ext);
    }
    data.extend_from_slice(content);
    Ok(data)
}

/// Factom entry hash
///
/// ```text
/// entry_hash = SHA-256(SHA-512(data) ‖ data)
/// ```
pub fn entry_hash(
    chain_id: &ChainId,
    ext_ids: &[Vec<u8>],
    content: &[u8],
) -> RaffleResult<Hash> {
    let data = marshal_entry(chain_id, ext_ids, content)?;
    let inner = Sha512::digest(&data);
    let mut hasher = Sha256::new();
    hasher.update(inner);
    hasher.update(&data);
    Ok(hasher.finalize().into())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
       "entry_date":1548972114,
       "post_data":{
          "edit_count":0,
          "last_edit_date":0,
          "last_edit_user_id":0,
          "message_sha512":"7841f74a149d8fcefbfd747f5ed57042836d091ec8d2d4d3716f831e8e9b32b32f6cb445f61f6d722379138b07f532eedbb8acdbabb70a516ce6cc4b9be92b48",
          "node_id":52,
          "post_date":1548971254,
          "thread_id":1575,
          "title_sha512":"cad89aeaf32763f5aa72a8a884da5c0363bc69663a02fe355c19bc5a9fb4e4935e78f61307257c3d69bb11786ba118d305aba0b9be7f17c5e34d8b50ca733d72",
          "user_id":9
       },
       "post_link":"https://factomize.com/forums/index.php?threads/1575#post-10623"
    }"#;

    fn record(payload: &str) -> LedgerRecord {
        LedgerRecord {
            identity: [7u8; 32],
            sequence: 4,
            payload: payload.as_bytes().to_vec(),
        }
    }

    #[test]
    fn test_parse_sample_post() {
        let post = parse_record(&record(SAMPLE)).unwrap();
        assert_eq!(post.user_id, 9);
        assert_eq!(post.thread_id, 1575);
        assert_eq!(post.node_id, 52);
        assert_eq!(post.post_date, 1548971254);
        assert_eq!(post.entry_date, 1548972114);
        assert_eq!(post.message_digest.len(), 64);
        assert_eq!(post.title_digest.len(), 64);
        assert_eq!(post.entry_hash, [7u8; 32]);
        assert_eq!(post.sequence, 4);
        assert!(post.post_link.ends_with("#post-10623"));
    }

    #[test]
    fn test_missing_user_id_is_fatal() {
        let payload = SAMPLE.replace("\"user_id\":9", "\"unused\":9");
        match parse_record(&record(&payload)) {
            Err(RaffleError::Decode { sequence, reason }) => {
                assert_eq!(sequence, 4);
                assert!(reason.contains("user_id"));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_hex_digest_is_fatal() {
        let payload = SAMPLE.replace("7841f74a", "not-hex!");
        assert!(matches!(
            parse_record(&record(&payload)),
            Err(RaffleError::Decode { .. })
        ));
    }

    #[test]
    fn test_empty_digest_is_fatal() {
        let payload = SAMPLE.replace(
            "\"message_sha512\":\"7841f74a",
            "\"message_sha512\":\"\",\"unused\":\"7841f74a",
        );
        match parse_record(&record(&payload)) {
            Err(RaffleError::Decode { sequence, reason }) => {
                assert_eq!(sequence, 4);
                assert!(reason.contains("message_sha512"));
                assert!(reason.contains("got 0"));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_short_digest_is_fatal() {
        let title = "cad89aeaf32763f5aa72a8a884da5c0363bc69663a02fe355c19bc5a9fb4e4935e78f61307257c3d69bb11786ba118d305aba0b9be7f17c5e34d8b50ca733d72";
        let payload = SAMPLE.replace(title, "ab");
        match parse_record(&record(&payload)) {
            Err(RaffleError::Decode { reason, .. }) => {
                assert!(reason.contains("title_sha512"));
                assert!(reason.contains("got 1"));
            }
            other => panic!("expected decode error, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_digests_fail_run_instead_of_colliding() {
        let payload = SAMPLE.replace(
            "\"message_sha512\":\"7841f74a",
            "\"message_sha512\":\"\",\"unused\":\"7841f74a",
        );
        let records = vec![record(&payload), record(&payload)];
        assert!(matches!(
            parse_records(&records),
            Err(RaffleError::Decode { .. })
        ));
    }

    #[test]
    fn test_garbage_payload_is_fatal() {
        assert!(parse_record(&record("chain definition")).is_err());
    }

    #[test]
    fn test_parse_records_stops_at_first_failure() {
        let records = vec![record(SAMPLE), record("{}"), record(SAMPLE)];
        assert!(parse_records(&records).is_err());
    }

    #[test]
    fn test_marshal_layout() {
        let chain = ChainId([0xAB; 32]);
        let data = marshal_entry(&chain, &[b"raffle".to_vec()], b"hi").unwrap();
        assert_eq!(data[0], ENTRY_VERSION);
        assert_eq!(&data[1..33], &[0xAB; 32]);
        assert_eq!(&data[33..35], &[0, 8]);
        assert_eq!(&data[35..37], &[0, 6]);
        assert_eq!(&data[37..43], b"raffle");
        assert_eq!(&data[43..], b"hi");
    }

    #[test]
    fn test_entry_hash_depends_on_every_part() {
        let chain = ChainId([1u8; 32]);
        let base = entry_hash(&chain, &[b"a".to_vec()], b"content").unwrap();
        assert_eq!(base, entry_hash(&chain, &[b"a".to_vec()], b"content").unwrap());
        assert_ne!(base, entry_hash(&ChainId([2u8; 32]), &[b"a".to_vec()], b"content").unwrap());
        assert_ne!(base, entry_hash(&chain, &[b"b".to_vec()], b"content").unwrap());
        assert_ne!(base, entry_hash(&chain, &[b"a".to_vec()], b"Content").unwrap());
    }

    #[test]
    fn test_oversized_entry_rejected() {
        let chain = ChainId([1u8; 32]);
        let big = vec![0u8; MAX_ENTRY_SIZE + 1];
        assert!(entry_hash(&chain, &[], &big).is_err());
    }
}
