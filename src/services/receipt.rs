//! Payment receipt fingerprinting and deduplication.
//!
//! A receipt's identity is the SHA-256 digest of its full byte content. The
//! engine hashes in bounded chunks so large uploads never sit in memory twice,
//! and rewinds the stream afterwards so storage can still read it. The
//! duplicate lookup excludes the owning application's own row, which keeps
//! re-saves of an unchanged receipt from colliding with themselves.

use std::io::{Read, Seek, SeekFrom};

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::AppError;

/// Read size for streaming hash computation.
const HASH_CHUNK_SIZE: usize = 8192;

/// Compute the SHA-256 fingerprint of a stream's full content.
///
/// Rewinds to the start before hashing and again before returning, so the
/// caller can hand the same stream to the storage backend afterwards.
pub fn fingerprint<R: Read + Seek>(stream: &mut R) -> std::io::Result<String> {
    stream.seek(SeekFrom::Start(0))?;

    let mut hasher = Sha256::new();
    let mut buf = [0u8; HASH_CHUNK_SIZE];
    loop {
        let n = stream.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    stream.seek(SeekFrom::Start(0))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Fail-open wrapper around [`fingerprint`].
///
/// An unreadable stream must not block the save: the failure is logged and
/// `None` is returned, leaving the stored fingerprint unset and the receipt
/// outside dedup coverage.
pub fn try_fingerprint<R: Read + Seek>(stream: &mut R, application_id: Uuid) -> Option<String> {
    match fingerprint(stream) {
        Ok(hash) => Some(hash),
        Err(e) => {
            tracing::warn!(
                application_id = %application_id,
                error = %e,
                "Failed to fingerprint payment receipt; proceeding without dedup coverage"
            );
            None
        }
    }
}

/// Find another application already holding this fingerprint.
///
/// Returns the conflicting application's confirmation number. The owning
/// application's own row is excluded so unchanged re-saves never match.
pub async fn find_conflict(
    pool: &PgPool,
    hash: &str,
    own_id: Uuid,
) -> Result<Option<String>, AppError> {
    let conflict = sqlx::query_scalar::<_, String>(
        "SELECT confirmation_number FROM applications
         WHERE payment_proof_hash = $1 AND id <> $2
         LIMIT 1",
    )
    .bind(hash)
    .bind(own_id)
    .fetch_optional(pool)
    .await?;

    Ok(conflict)
}

/// Run change detection and the duplicate lookup for a new fingerprint.
///
/// When the fingerprint is unchanged from what the row already stores, the
/// lookup is skipped entirely; a re-save for unrelated field edits can never
/// fail as a duplicate of itself. A match on any other row aborts the save
/// with a [`AppError::DuplicateReceipt`] naming the conflicting confirmation
/// number.
pub async fn ensure_unique(
    pool: &PgPool,
    own_id: Uuid,
    stored_hash: Option<&str>,
    new_hash: &str,
) -> Result<(), AppError> {
    if stored_hash == Some(new_hash) {
        return Ok(());
    }

    if let Some(conflict) = find_conflict(pool, new_hash, own_id).await? {
        return Err(AppError::DuplicateReceipt(conflict));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    struct FailingStream;

    impl Read for FailingStream {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
        }
    }

    impl Seek for FailingStream {
        fn seek(&mut self, _pos: SeekFrom) -> std::io::Result<u64> {
            Ok(0)
        }
    }

    #[test]
    fn fingerprint_matches_direct_sha256() {
        let data = b"receipt bytes";
        let mut stream = Cursor::new(data.to_vec());
        let fp = fingerprint(&mut stream).unwrap();
        assert_eq!(fp, hex::encode(Sha256::digest(data)));
    }

    #[test]
    fn fingerprint_is_hex_sha256() {
        let mut stream = Cursor::new(b"x".to_vec());
        let fp = fingerprint(&mut stream).unwrap();
        assert_eq!(fp.len(), 64); // SHA-256 hex = 64 chars
        assert!(fp.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn fingerprint_reads_in_chunks() {
        // Content larger than one chunk hashes identically to a direct digest.
        let data: Vec<u8> = (0..3 * HASH_CHUNK_SIZE + 17).map(|i| (i % 251) as u8).collect();
        let mut stream = Cursor::new(data.clone());
        let fp = fingerprint(&mut stream).unwrap();
        assert_eq!(fp, hex::encode(Sha256::digest(&data)));
    }

    #[test]
    fn fingerprint_rewinds_stream() {
        let data = b"downstream consumers still need this".to_vec();
        let mut stream = Cursor::new(data.clone());
        fingerprint(&mut stream).unwrap();

        let mut replay = Vec::new();
        stream.read_to_end(&mut replay).unwrap();
        assert_eq!(replay, data);
    }

    #[test]
    fn fingerprint_hashes_from_start_even_if_stream_was_consumed() {
        let data = b"0123456789".to_vec();
        let mut stream = Cursor::new(data.clone());
        let mut skip = [0u8; 4];
        stream.read_exact(&mut skip).unwrap();

        let fp = fingerprint(&mut stream).unwrap();
        assert_eq!(fp, hex::encode(Sha256::digest(&data)));
    }

    #[test]
    fn fingerprint_of_empty_stream() {
        let mut stream = Cursor::new(Vec::new());
        let fp = fingerprint(&mut stream).unwrap();
        assert_eq!(fp, hex::encode(Sha256::digest(b"")));
    }

    #[test]
    fn identical_bytes_identical_fingerprint() {
        let mut a = Cursor::new(b"same receipt".to_vec());
        let mut b = Cursor::new(b"same receipt".to_vec());
        assert_eq!(fingerprint(&mut a).unwrap(), fingerprint(&mut b).unwrap());
    }

    #[test]
    fn different_bytes_different_fingerprint() {
        let mut a = Cursor::new(b"receipt one".to_vec());
        let mut b = Cursor::new(b"receipt two".to_vec());
        assert_ne!(fingerprint(&mut a).unwrap(), fingerprint(&mut b).unwrap());
    }

    #[test]
    fn try_fingerprint_fails_open() {
        let mut stream = FailingStream;
        assert_eq!(try_fingerprint(&mut stream, Uuid::nil()), None);
    }
}
