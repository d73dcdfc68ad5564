use rand::Rng;

use super::types::{DeckCode, RoomCode};

/// Alphabet without the characters people misread over a shoulder
/// (0/O, 1/I).
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

pub const ROOM_CODE_LEN: usize = 6;
pub const DECK_CODE_LEN: usize = 8;

pub fn generate_room_code<R: Rng>(rng: &mut R) -> RoomCode {
    generate(ROOM_CODE_LEN, rng)
}

pub fn generate_deck_code<R: Rng>(rng: &mut R) -> DeckCode {
    generate(DECK_CODE_LEN, rng)
}

fn generate<R: Rng>(len: usize, rng: &mut R) -> String {
    (0..len)
        .map(|_| CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())] as char)
        .collect()
}

/// Cheap shape check applied to client-supplied codes before any lookup.
pub fn looks_like_room_code(code: &str) -> bool {
    code.len() == ROOM_CODE_LEN && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;

    #[test]
    fn room_codes_use_the_unambiguous_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..64 {
            let code = generate_room_code(&mut rng);
            assert_eq!(code.len(), ROOM_CODE_LEN);
            assert!(looks_like_room_code(&code), "bad code {code}");
            for banned in ['0', 'O', '1', 'I'] {
                assert!(!code.contains(banned));
            }
        }
    }

    #[test]
    fn deck_codes_are_longer_than_room_codes() {
        let mut rng = StdRng::seed_from_u64(7);
        assert_eq!(generate_deck_code(&mut rng).len(), DECK_CODE_LEN);
    }

    #[test]
    fn shape_check_rejects_junk() {
        assert!(!looks_like_room_code(""));
        assert!(!looks_like_room_code("abc"));
        assert!(!looks_like_room_code("ABCDE0"));
        assert!(!looks_like_room_code("ABCDEFG"));
    }
}
