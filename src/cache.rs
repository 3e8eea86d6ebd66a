/**
 * RecGrid
 * Copyright (C) 2026 The RecGrid contributors
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

extern crate fnv;
extern crate serde_json;

use std::fs;
use std::hash::Hasher;
use std::io;
use std::path::{Path, PathBuf};

use fnv::FnvHasher;

use matrix::MaskPolicy;
use split::Boundaries;
use types::Triple;

/// Content-addressed cache for the derived T matrix. The key covers the
/// source file bytes and every transformation parameter, so a changed
/// input or configuration is a miss by construction; nothing is ever
/// invalidated in place.
pub fn t_cache_key(
    source: &[u8],
    boundaries: Boundaries,
    policy: MaskPolicy,
    shape: (usize, usize),
) -> u64 {

    let mut hasher = FnvHasher::default();

    hasher.write(source);
    hasher.write_u8(boundaries.first());
    hasher.write_u8(boundaries.second());
    hasher.write_u64(shape.0 as u64);
    hasher.write_u64(shape.1 as u64);

    match policy {
        MaskPolicy::Binary { threshold } => {
            hasher.write_u8(0);
            hasher.write_u64(threshold.to_bits());
        }
        MaskPolicy::Proportional => hasher.write_u8(1),
    }

    hasher.finish()
}

fn cache_file(dir: &Path, key: u64) -> PathBuf {
    dir.join(format!("t_{:016x}.json", key))
}

/// Returns the cached triples for this key, or `None` on any kind of miss
/// (no file, unreadable file, stale serialization format).
pub fn load_triples(dir: &Path, key: u64) -> Option<Vec<Triple>> {

    let contents = fs::read_to_string(cache_file(dir, key)).ok()?;

    serde_json::from_str(&contents).ok()
}

pub fn store_triples(dir: &Path, key: u64, triples: &[Triple]) -> io::Result<()> {

    fs::create_dir_all(dir)?;

    let as_json = serde_json::to_string(triples)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    fs::write(cache_file(dir, key), as_json)
}

#[cfg(test)]
mod tests {

    use std::env;
    use std::fs;
    use std::path::PathBuf;

    use super::{load_triples, store_triples, t_cache_key};
    use matrix::MaskPolicy;
    use split::Boundaries;

    fn temp_cache_dir(name: &str) -> PathBuf {
        let dir = env::temp_dir().join(format!("recgrid-cache-{}-{}", ::std::process::id(), name));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn roundtrips_triples() {
        let dir = temp_cache_dir("roundtrip");
        let triples = vec![(0, 1, 0.5), (3, 2, 1.0)];
        let key = t_cache_key(b"ratings", Boundaries::default(), MaskPolicy::Proportional, (4, 4));

        assert!(load_triples(&dir, key).is_none());

        store_triples(&dir, key, &triples).unwrap();

        assert_eq!(load_triples(&dir, key).unwrap(), triples);
    }

    #[test]
    fn key_changes_with_content_and_parameters() {
        let boundaries = Boundaries::default();
        let base = t_cache_key(b"ratings", boundaries, MaskPolicy::Proportional, (4, 4));

        assert_ne!(
            base,
            t_cache_key(b"other ratings", boundaries, MaskPolicy::Proportional, (4, 4))
        );
        assert_ne!(
            base,
            t_cache_key(b"ratings", Boundaries::new(5, 8).unwrap(), MaskPolicy::Proportional, (4, 4))
        );
        assert_ne!(
            base,
            t_cache_key(b"ratings", boundaries, MaskPolicy::Binary { threshold: 3.0 }, (4, 4))
        );
        assert_ne!(
            base,
            t_cache_key(b"ratings", boundaries, MaskPolicy::Proportional, (4, 5))
        );
    }

    #[test]
    fn stale_payload_is_a_miss() {
        let dir = temp_cache_dir("stale");
        let key = t_cache_key(b"ratings", Boundaries::default(), MaskPolicy::Proportional, (4, 4));

        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("t_{:016x}.json", key)), "not json").unwrap();

        assert!(load_triples(&dir, key).is_none());
    }
}
