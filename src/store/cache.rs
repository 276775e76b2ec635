//! Compact Embedding Cache
//!
//! Binary cache written after the first textual parse so later startups
//! skip re-reading the multi-hundred-megabyte source.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use half::f16;
use tracing::info;

use super::vectors::VectorStore;
use crate::error::{Result, WordSimError};

/// Cache file format:
/// - Magic: 4 bytes "WSVC"
/// - Version: 1 byte
/// - Vocab count: 4 bytes LE
/// - Dimension: 4 bytes LE
/// - Rows: count * dim f16 values (2 bytes LE each), index order
/// - Vocab: [word_len (4 LE) + utf8 bytes]* in index order

const CACHE_MAGIC: &[u8] = b"WSVC";
const CACHE_VERSION: u8 = 1;

/// Write the store's table and vocabulary to `path`.
pub fn save(store: &VectorStore, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let io_err = |e: io::Error| WordSimError::load_io(path, e);

    let file = File::create(path).map_err(io_err)?;
    let mut writer = BufWriter::new(file);

    writer.write_all(CACHE_MAGIC).map_err(io_err)?;
    writer.write_all(&[CACHE_VERSION]).map_err(io_err)?;
    writer
        .write_all(&(store.len() as u32).to_le_bytes())
        .map_err(io_err)?;
    writer
        .write_all(&(store.dim() as u32).to_le_bytes())
        .map_err(io_err)?;

    for value in store.raw_table() {
        writer.write_all(&value.to_bits().to_le_bytes()).map_err(io_err)?;
    }

    for word in store.raw_words() {
        writer
            .write_all(&(word.len() as u32).to_le_bytes())
            .map_err(io_err)?;
        writer.write_all(word.as_bytes()).map_err(io_err)?;
    }

    writer.flush().map_err(io_err)?;
    info!(vocab = store.len(), path = %path.display(), "embedding cache written");
    Ok(())
}

/// Load a store from a cache file written by [`save`].
pub fn load(path: impl AsRef<Path>) -> Result<VectorStore> {
    let path = path.as_ref();
    let io_err = |e: io::Error| WordSimError::load_io(path, e);

    let file = File::open(path).map_err(io_err)?;
    let file_len = file.metadata().map_err(io_err)?.len();
    let mut reader = BufReader::new(file);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic).map_err(io_err)?;
    if magic != CACHE_MAGIC {
        return Err(WordSimError::malformed(path, 0, "invalid cache magic"));
    }

    let mut version = [0u8; 1];
    reader.read_exact(&mut version).map_err(io_err)?;
    if version[0] != CACHE_VERSION {
        return Err(WordSimError::malformed(
            path,
            0,
            format!("unsupported cache version {}", version[0]),
        ));
    }

    let mut count_buf = [0u8; 4];
    reader.read_exact(&mut count_buf).map_err(io_err)?;
    let count = u32::from_le_bytes(count_buf) as usize;

    let mut dim_buf = [0u8; 4];
    reader.read_exact(&mut dim_buf).map_err(io_err)?;
    let dim = u32::from_le_bytes(dim_buf) as usize;

    if count == 0 || dim == 0 {
        return Err(WordSimError::malformed(path, 0, "empty cache header"));
    }

    // Header values are untrusted: the row section must fit in the file
    // before anything is allocated
    let row_section = count
        .checked_mul(dim)
        .and_then(|floats| floats.checked_mul(2))
        .ok_or_else(|| WordSimError::malformed(path, 0, "row section size overflows"))?;
    let header_len = (CACHE_MAGIC.len() + 1 + 4 + 4) as u64;
    if row_section as u64 > file_len.saturating_sub(header_len) {
        return Err(WordSimError::malformed(
            path,
            0,
            format!(
                "header declares {count} x {dim} rows ({row_section} bytes) but file holds {file_len} bytes"
            ),
        ));
    }

    // Fixed-size rows, one contiguous O(N) read
    let mut row_bytes = vec![0u8; row_section];
    reader.read_exact(&mut row_bytes).map_err(io_err)?;
    let table: Vec<f16> = row_bytes
        .chunks_exact(2)
        .map(|pair| f16::from_bits(u16::from_le_bytes([pair[0], pair[1]])))
        .collect();

    let mut words = Vec::with_capacity(count);
    for i in 0..count {
        let mut len_buf = [0u8; 4];
        reader.read_exact(&mut len_buf).map_err(io_err)?;
        let len = u32::from_le_bytes(len_buf) as usize;
        if len as u64 > file_len {
            return Err(WordSimError::malformed(
                path,
                i + 1,
                format!("word length {len} exceeds file size"),
            ));
        }
        let mut word_buf = vec![0u8; len];
        reader.read_exact(&mut word_buf).map_err(io_err)?;
        let word = String::from_utf8(word_buf)
            .map_err(|_| WordSimError::malformed(path, i + 1, "invalid utf8 in vocab section"))?;
        words.push(word);
    }

    let store = VectorStore::from_raw_parts(table, dim, words)?;
    info!(vocab = store.len(), path = %path.display(), "embedding table loaded from cache");
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn sample_store() -> VectorStore {
        VectorStore::from_entries(
            3,
            vec![
                ("신문", vec![1.0, 0.25, -0.5]),
                ("뉴스", vec![0.9, 0.1, 0.0]),
                ("잡지", vec![0.7, 0.3, 0.1]),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_cache_roundtrip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.wsvc");

        let store = sample_store();
        save(&store, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.len(), store.len());
        assert_eq!(loaded.dim(), store.dim());
        for idx in 0..store.len() {
            let word = store.word_at(idx).unwrap();
            assert_eq!(loaded.word_at(idx).unwrap(), word);
            assert_eq!(loaded.vector_of(word).unwrap(), store.vector_of(word).unwrap());
        }
    }

    #[test]
    fn test_cache_bad_magic() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("bogus.wsvc");
        fs::write(&path, b"NOPE rest of the file").unwrap();

        assert!(matches!(
            load(&path),
            Err(WordSimError::Malformed { .. })
        ));
    }

    #[test]
    fn test_cache_truncated() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vectors.wsvc");

        save(&sample_store(), &path).unwrap();
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..bytes.len() / 2]).unwrap();

        assert!(load(&path).is_err());
    }

    #[test]
    fn test_cache_header_count_overflow() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("huge.wsvc");

        // Valid magic and version, then counts whose product overflows
        let mut bytes = Vec::new();
        bytes.extend_from_slice(CACHE_MAGIC);
        bytes.push(CACHE_VERSION);
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(load(&path), Err(WordSimError::Malformed { .. })));
    }

    #[test]
    fn test_cache_header_larger_than_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.wsvc");

        // Plausible counts, but the declared row section cannot fit
        let mut bytes = Vec::new();
        bytes.extend_from_slice(CACHE_MAGIC);
        bytes.push(CACHE_VERSION);
        bytes.extend_from_slice(&1000u32.to_le_bytes());
        bytes.extend_from_slice(&300u32.to_le_bytes());
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(load(&path), Err(WordSimError::Malformed { .. })));
    }

    #[test]
    fn test_cache_bad_word_length() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("badword.wsvc");

        // One 1x1 row, then a vocab entry claiming a gigantic word
        let mut bytes = Vec::new();
        bytes.extend_from_slice(CACHE_MAGIC);
        bytes.push(CACHE_VERSION);
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&half::f16::from_f32(1.0).to_bits().to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        fs::write(&path, &bytes).unwrap();

        assert!(matches!(load(&path), Err(WordSimError::Malformed { .. })));
    }

    #[test]
    fn test_corrupt_header_still_falls_back_to_text() {
        use std::io::Write;

        let dir = tempdir().unwrap();
        let source = dir.path().join("small.vec");
        let mut file = fs::File::create(&source).unwrap();
        writeln!(file, "1 3").unwrap();
        writeln!(file, "신문 1.0 0.0 0.0").unwrap();

        let cache_path = dir.path().join("small.wsvc");
        let mut bytes = Vec::new();
        bytes.extend_from_slice(CACHE_MAGIC);
        bytes.push(CACHE_VERSION);
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        fs::write(&cache_path, &bytes).unwrap();

        let store = VectorStore::load_or_cached(&source, &cache_path).unwrap();
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_cache_missing() {
        let dir = tempdir().unwrap();
        let err = load(dir.path().join("absent.wsvc")).unwrap_err();
        assert!(matches!(err, WordSimError::LoadIo { .. }));
    }
}
