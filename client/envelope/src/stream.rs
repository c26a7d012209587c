use std::io::{Read, Write};

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{ChaCha20Poly1305, Key, Nonce};
use rand::RngCore;

use crate::error::EnvelopeError;
use crate::header::{read_encryption_header, EnvelopeHeader, FLAG_HAS_CHALLENGE, VERSION};
use crate::keys::{chunk_nonce, derive_keys, IkmSource};

const HEADER_FIXED_LEN: usize = 4 + 1 + 1 + 1 + 32 + 4;

fn random_salt() -> [u8; 32] {
    let mut salt = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut salt);
    salt
}

/// Writes one envelope stream: the header, immediately followed by zero or more
/// `chunk_length || ciphertext_with_tag` frames, one per call to [`write_chunk`](Self::write_chunk).
pub struct EnvelopeWriter<W: Write> {
    writer: W,
    cipher: ChaCha20Poly1305,
    base_nonce: [u8; 12],
    next_index: u64,
}

impl<W: Write> EnvelopeWriter<W> {
    /// Derives key material from `ikm_source`, writes the header to `writer`, and returns a
    /// writer ready for [`write_chunk`](Self::write_chunk) calls. `salt` defaults to a random
    /// 32 bytes when `None`.
    pub fn new(
        mut writer: W,
        ikm_source: &IkmSource,
        chunk_size: u32,
        salt: Option<[u8; 32]>,
    ) -> Result<Self, EnvelopeError> {
        let ikm = ikm_source.derive_ikm()?;
        let salt = salt.unwrap_or_else(random_salt);
        let keys = derive_keys(&salt, &ikm);

        let header = EnvelopeHeader {
            version: VERSION,
            ikm_kind: ikm_source.ikm_kind(),
            salt,
            chunk_size,
            challenge: ikm_source.challenge_bytes(),
        };
        let mut header_bytes = Vec::with_capacity(header.encoded_len());
        header.write_to(&mut header_bytes);
        writer.write_all(&header_bytes)?;

        Ok(Self {
            writer,
            cipher: ChaCha20Poly1305::new(Key::from_slice(&keys.dek)),
            base_nonce: keys.base_nonce,
            next_index: 0,
        })
    }

    /// Encrypts and writes one chunk frame. `plaintext` need not match the header's declared
    /// `chunk_size`; callers are expected to chunk their input themselves before calling this.
    pub fn write_chunk(&mut self, plaintext: &[u8]) -> Result<(), EnvelopeError> {
        let nonce = chunk_nonce(&self.base_nonce, self.next_index);
        let aad = self.next_index.to_be_bytes();
        let ciphertext = self
            .cipher
            .encrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: plaintext,
                    aad: &aad,
                },
            )
            .expect("chacha20poly1305 encryption over an in-memory buffer never fails");

        let len = u32::try_from(ciphertext.len()).map_err(|_| EnvelopeError::ChunkTooLarge)?;
        self.writer.write_all(&len.to_be_bytes())?;
        self.writer.write_all(&ciphertext)?;
        self.next_index += 1;
        Ok(())
    }

    pub fn chunks_written(&self) -> u64 {
        self.next_index
    }

    /// Consumes the writer, returning the underlying `W`.
    pub fn finish(self) -> W {
        self.writer
    }
}

/// Reads one envelope stream: the header is parsed eagerly in [`new`](Self::new), then
/// [`read_chunk`](Self::read_chunk) decrypts and authenticates one frame at a time.
pub struct EnvelopeReader<R: Read> {
    reader: R,
    cipher: ChaCha20Poly1305,
    base_nonce: [u8; 12],
    next_index: u64,
    header: EnvelopeHeader,
}

impl<R: Read> EnvelopeReader<R> {
    pub fn new(mut reader: R, ikm_source: &IkmSource) -> Result<Self, EnvelopeError> {
        let mut fixed = [0u8; HEADER_FIXED_LEN];
        reader.read_exact(&mut fixed)?;
        let has_challenge = fixed[5] & FLAG_HAS_CHALLENGE != 0;

        let mut header_bytes = fixed.to_vec();
        if has_challenge {
            let mut challenge = [0u8; 32];
            reader.read_exact(&mut challenge)?;
            header_bytes.extend_from_slice(&challenge);
        }
        let (header, _) = read_encryption_header(&header_bytes)?;

        let ikm = ikm_source.derive_ikm()?;
        let keys = derive_keys(&header.salt, &ikm);

        Ok(Self {
            reader,
            cipher: ChaCha20Poly1305::new(Key::from_slice(&keys.dek)),
            base_nonce: keys.base_nonce,
            next_index: 0,
            header,
        })
    }

    pub fn header(&self) -> &EnvelopeHeader {
        &self.header
    }

    /// Reads, decrypts, and authenticates the next chunk. Returns `Ok(None)` at a clean
    /// end-of-stream (no bytes left before the next chunk's length prefix). The nonce and AAD
    /// are derived from `next_index`, a running counter this reader maintains itself: a
    /// reordered or truncated stream fails authentication rather than decrypting under the
    /// wrong index.
    pub fn read_chunk(&mut self) -> Result<Option<Vec<u8>>, EnvelopeError> {
        let mut len_bytes = [0u8; 4];
        match self.reader.read_exact(&mut len_bytes) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(EnvelopeError::Io(e)),
        }
        let len = u32::from_be_bytes(len_bytes) as usize;
        let mut ciphertext = vec![0u8; len];
        self.reader.read_exact(&mut ciphertext)?;

        let nonce = chunk_nonce(&self.base_nonce, self.next_index);
        let aad = self.next_index.to_be_bytes();
        let plaintext = self
            .cipher
            .decrypt(
                Nonce::from_slice(&nonce),
                Payload {
                    msg: &ciphertext,
                    aad: &aad,
                },
            )
            .map_err(|_| EnvelopeError::TagMismatch {
                index: self.next_index,
            })?;
        self.next_index += 1;
        Ok(Some(plaintext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source() -> IkmSource {
        IkmSource::Password("a passphrase sixteen+ bytes long".into())
    }

    #[test]
    fn round_trips_several_chunks() {
        let mut buf = Vec::new();
        let mut writer = EnvelopeWriter::new(&mut buf, &source(), 4, None).unwrap();
        writer.write_chunk(b"abcd").unwrap();
        writer.write_chunk(b"efgh").unwrap();
        writer.write_chunk(b"").unwrap();

        let mut reader = EnvelopeReader::new(buf.as_slice(), &source()).unwrap();
        assert_eq!(reader.read_chunk().unwrap().unwrap(), b"abcd");
        assert_eq!(reader.read_chunk().unwrap().unwrap(), b"efgh");
        assert_eq!(reader.read_chunk().unwrap().unwrap(), b"");
        assert!(reader.read_chunk().unwrap().is_none());
    }

    #[test]
    fn chunk_zero_nonce_is_bit_identical_to_base_nonce() {
        let mut buf = Vec::new();
        let writer = EnvelopeWriter::new(&mut buf, &source(), 4, Some([3u8; 32])).unwrap();
        assert_eq!(chunk_nonce(&writer.base_nonce, 0), writer.base_nonce);
    }

    #[test]
    fn tampered_ciphertext_fails_authentication() {
        let mut buf = Vec::new();
        let mut writer = EnvelopeWriter::new(&mut buf, &source(), 4, None).unwrap();
        writer.write_chunk(b"abcd").unwrap();
        let last = buf.len() - 1;
        buf[last] ^= 0xFF;

        let mut reader = EnvelopeReader::new(buf.as_slice(), &source()).unwrap();
        assert!(matches!(
            reader.read_chunk(),
            Err(EnvelopeError::TagMismatch { index: 0 })
        ));
    }

    #[test]
    fn reordered_chunks_fail_authentication() {
        let mut buf = Vec::new();
        let mut writer = EnvelopeWriter::new(&mut buf, &source(), 4, None).unwrap();
        writer.write_chunk(b"first!").unwrap();
        writer.write_chunk(b"second").unwrap();

        // Swap the two chunk frames (each is 4-byte length + 6-byte plaintext + 16-byte tag).
        let header_len = crate::header::EnvelopeHeader {
            version: VERSION,
            ikm_kind: 0,
            salt: [0u8; 32],
            chunk_size: 0,
            challenge: None,
        }
        .encoded_len();
        let frame_len = 4 + 6 + 16;
        let mut swapped = buf[..header_len].to_vec();
        swapped.extend_from_slice(&buf[header_len + frame_len..]);
        swapped.extend_from_slice(&buf[header_len..header_len + frame_len]);

        let mut reader = EnvelopeReader::new(swapped.as_slice(), &source()).unwrap();
        assert!(matches!(
            reader.read_chunk(),
            Err(EnvelopeError::TagMismatch { index: 0 })
        ));
    }

    #[test]
    fn wrong_ikm_fails_authentication() {
        let mut buf = Vec::new();
        let mut writer = EnvelopeWriter::new(&mut buf, &source(), 4, None).unwrap();
        writer.write_chunk(b"abcd").unwrap();

        let wrong = IkmSource::Password("a completely different passphrase".into());
        let mut reader = EnvelopeReader::new(buf.as_slice(), &wrong).unwrap();
        assert!(matches!(
            reader.read_chunk(),
            Err(EnvelopeError::TagMismatch { index: 0 })
        ));
    }
}
