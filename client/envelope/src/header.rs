use crate::error::EnvelopeError;

/// Fixed ASCII magic identifying an envelope stream.
pub const MAGIC: [u8; 4] = *b"FENV";
pub const VERSION: u8 = 1;
pub const FLAG_HAS_CHALLENGE: u8 = 0b0000_0001;

/// Bytes before the optional challenge: magic(4) + version(1) + flags(1) + ikm_kind(1) +
/// salt(32) + chunk_size(4).
const FIXED_LEN: usize = 4 + 1 + 1 + 1 + 32 + 4;

/// The envelope's fixed-format header, read once per stream and used to derive keys before
/// any chunk is decrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvelopeHeader {
    pub version: u8,
    pub ikm_kind: u8,
    pub salt: [u8; 32],
    pub chunk_size: u32,
    pub challenge: Option<[u8; 32]>,
}

impl EnvelopeHeader {
    pub fn encoded_len(&self) -> usize {
        FIXED_LEN + if self.challenge.is_some() { 32 } else { 0 }
    }

    pub fn write_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&MAGIC);
        out.push(self.version);
        let flags = if self.challenge.is_some() {
            FLAG_HAS_CHALLENGE
        } else {
            0
        };
        out.push(flags);
        out.push(self.ikm_kind);
        out.extend_from_slice(&self.salt);
        out.extend_from_slice(&self.chunk_size.to_be_bytes());
        if let Some(challenge) = self.challenge {
            out.extend_from_slice(&challenge);
        }
    }
}

/// Parses the fixed-format header from the start of `bytes`, returning the header and the
/// number of bytes it occupied. Callable on just the first few hundred bytes of a stream: it
/// never reads past the challenge field.
pub fn read_encryption_header(bytes: &[u8]) -> Result<(EnvelopeHeader, usize), EnvelopeError> {
    if bytes.len() < FIXED_LEN {
        return Err(EnvelopeError::MalformedHeader("header truncated".into()));
    }
    if bytes[0..4] != MAGIC {
        return Err(EnvelopeError::MalformedHeader("bad magic".into()));
    }
    let version = bytes[4];
    if version != VERSION {
        return Err(EnvelopeError::MalformedHeader(format!(
            "unsupported version {version}"
        )));
    }
    let flags = bytes[5];
    let has_challenge = flags & FLAG_HAS_CHALLENGE != 0;
    let ikm_kind = bytes[6];
    let mut salt = [0u8; 32];
    salt.copy_from_slice(&bytes[7..39]);
    let chunk_size = u32::from_be_bytes(bytes[39..43].try_into().expect("4-byte slice"));

    let mut offset = FIXED_LEN;
    let challenge = if has_challenge {
        if bytes.len() < offset + 32 {
            return Err(EnvelopeError::MalformedHeader(
                "flags declare a challenge but the stream ends before it".into(),
            ));
        }
        let mut challenge = [0u8; 32];
        challenge.copy_from_slice(&bytes[offset..offset + 32]);
        offset += 32;
        Some(challenge)
    } else {
        None
    };

    Ok((
        EnvelopeHeader {
            version,
            ikm_kind,
            salt,
            chunk_size,
            challenge,
        },
        offset,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(challenge: Option<[u8; 32]>) -> EnvelopeHeader {
        EnvelopeHeader {
            version: VERSION,
            ikm_kind: 0,
            salt: [5u8; 32],
            chunk_size: 1 << 20,
            challenge,
        }
    }

    #[test]
    fn round_trips_without_challenge() {
        let header = sample(None);
        let mut bytes = Vec::new();
        header.write_to(&mut bytes);
        let (parsed, consumed) = read_encryption_header(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(consumed, bytes.len());
    }

    #[test]
    fn round_trips_with_challenge() {
        let header = sample(Some([9u8; 32]));
        let mut bytes = Vec::new();
        header.write_to(&mut bytes);
        bytes.extend_from_slice(b"trailing chunk frame data");
        let (parsed, consumed) = read_encryption_header(&bytes).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(consumed, header.encoded_len());
    }

    #[test]
    fn readable_from_a_short_prefix() {
        let header = sample(Some([1u8; 32]));
        let mut bytes = Vec::new();
        header.write_to(&mut bytes);
        bytes.extend_from_slice(&[0u8; 512]);
        let prefix = &bytes[..bytes.len().min(200)];
        assert!(read_encryption_header(prefix).is_ok());
    }

    #[test]
    fn flag_set_without_challenge_bytes_is_malformed() {
        let header = sample(Some([2u8; 32]));
        let mut bytes = Vec::new();
        header.write_to(&mut bytes);
        bytes.truncate(FIXED_LEN + 10); // flags say "has challenge" but only 10 of 32 bytes follow
        assert!(matches!(
            read_encryption_header(&bytes),
            Err(EnvelopeError::MalformedHeader(_))
        ));
    }

    #[test]
    fn bad_magic_is_rejected() {
        let mut bytes = vec![0u8; FIXED_LEN];
        bytes[0..4].copy_from_slice(b"NOPE");
        assert!(matches!(
            read_encryption_header(&bytes),
            Err(EnvelopeError::MalformedHeader(_))
        ));
    }
}
