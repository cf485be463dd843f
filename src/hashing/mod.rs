use blake3::Hasher;

/// Fingerprints a query together with a candidate id set.
///
/// The ids are sorted before hashing, so any permutation of the same set yields the same
/// fingerprint. Every field is length-prefixed, which keeps `("ab", ["c"])` and `("a", ["bc"])`
/// apart.
pub fn hash_candidate_set<S: AsRef<str>>(query: &str, candidate_ids: &[S]) -> [u8; 32] {
    let mut ids: Vec<&str> = candidate_ids.iter().map(AsRef::as_ref).collect();
    ids.sort_unstable();

    let mut hasher = Hasher::new();
    update_prefixed(&mut hasher, query.as_bytes());
    hasher.update(&(ids.len() as u64).to_le_bytes());
    for id in ids {
        update_prefixed(&mut hasher, id.as_bytes());
    }
    *hasher.finalize().as_bytes()
}

/// Lowercase hex rendering of a content hash.
#[inline]
pub fn content_hash_hex(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

#[inline]
fn update_prefixed(hasher: &mut Hasher, bytes: &[u8]) {
    hasher.update(&(bytes.len() as u64).to_le_bytes());
    hasher.update(bytes);
}
