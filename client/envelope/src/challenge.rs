use fisherman_common::types::Address;

/// The message a wallet signs to derive signature-based IKM. Binds every field the key
/// derivation contract names, so a signature produced for one app/domain/purpose/chain can
/// never be replayed to derive key material for another.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureChallenge {
    pub app_name: String,
    pub domain: String,
    pub version: u32,
    pub purpose: String,
    pub chain_id: u64,
    pub address: Address,
    pub challenge: Option<[u8; 32]>,
}

impl SignatureChallenge {
    /// Canonical byte message to present to the wallet for signing. Every variable-length
    /// field is length-prefixed so no field boundary is ambiguous.
    pub fn message_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_field(&mut out, self.app_name.as_bytes());
        write_field(&mut out, self.domain.as_bytes());
        out.extend_from_slice(&self.version.to_be_bytes());
        write_field(&mut out, self.purpose.as_bytes());
        out.extend_from_slice(&self.chain_id.to_be_bytes());
        out.extend_from_slice(&self.address.0);
        match self.challenge {
            Some(bytes) => {
                out.push(1);
                out.extend_from_slice(&bytes);
            }
            None => out.push(0),
        }
        out
    }
}

fn write_field(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> SignatureChallenge {
        SignatureChallenge {
            app_name: "fisherman-sdk".into(),
            domain: "example.com".into(),
            version: 1,
            purpose: "envelope-key-derivation".into(),
            chain_id: 42,
            address: Address([7u8; 20]),
            challenge: None,
        }
    }

    #[test]
    fn message_bytes_changes_with_any_bound_field() {
        let a = base();
        let mut b = base();
        b.chain_id = 43;
        assert_ne!(a.message_bytes(), b.message_bytes());

        let mut c = base();
        c.challenge = Some([9u8; 32]);
        assert_ne!(a.message_bytes(), c.message_bytes());
    }

    #[test]
    fn message_bytes_is_deterministic() {
        let a = base();
        assert_eq!(a.message_bytes(), base().message_bytes());
    }
}
