use std::io::Read;

use fisherman_common::consts::FILE_CHUNK_SIZE;
use fisherman_common::types::{merkle_fingerprint, Hash32};

use crate::error::SdkError;

/// Reads `reader` to completion in [`FILE_CHUNK_SIZE`]-sized chunks and returns the Merkle
/// fingerprint over those chunks, the same one the Indexer (C3) and Fisherman scheduler (C5)
/// expect in [`fisherman_common::types::FileMetadata::fingerprint`], alongside the total byte
/// count observed while reading.
pub fn fingerprint_reader<R: Read>(mut reader: R) -> Result<(Hash32, u64), SdkError> {
    let mut chunks = Vec::new();
    let mut total_size = 0u64;

    loop {
        let mut chunk = vec![0u8; FILE_CHUNK_SIZE];
        let mut filled = 0;
        while filled < chunk.len() {
            let n = reader.read(&mut chunk[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        if filled == 0 {
            break;
        }
        chunk.truncate(filled);
        total_size += filled as u64;
        let is_last_chunk = filled < FILE_CHUNK_SIZE;
        chunks.push(chunk);
        if is_last_chunk {
            break;
        }
    }

    Ok((merkle_fingerprint(&chunks), total_size))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprints_a_file_spanning_multiple_chunks() {
        let content = vec![0x42u8; FILE_CHUNK_SIZE + 10];
        let (fingerprint, size) = fingerprint_reader(content.as_slice()).unwrap();
        assert_eq!(size, content.len() as u64);

        let chunks = vec![
            content[..FILE_CHUNK_SIZE].to_vec(),
            content[FILE_CHUNK_SIZE..].to_vec(),
        ];
        assert_eq!(fingerprint, merkle_fingerprint(&chunks));
    }

    #[test]
    fn fingerprints_an_empty_reader_like_an_empty_chunk_list() {
        let (fingerprint, size) = fingerprint_reader(&b""[..]).unwrap();
        assert_eq!(size, 0);
        assert_eq!(fingerprint, merkle_fingerprint(&[]));
    }

    #[test]
    fn chunk_boundary_exactly_on_file_chunk_size_does_not_add_a_trailing_empty_chunk() {
        let content = vec![0x7u8; FILE_CHUNK_SIZE];
        let (fingerprint, size) = fingerprint_reader(content.as_slice()).unwrap();
        assert_eq!(size, content.len() as u64);
        assert_eq!(fingerprint, merkle_fingerprint(&[content]));
    }
}
