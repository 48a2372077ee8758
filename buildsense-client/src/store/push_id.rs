use std::sync::Mutex;

use buildsense_api::models::now_millis;
use rand::Rng;

/// Web-safe base64 in ASCII order, so ids sort the same as strings and bytes.
const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";

const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

struct PushState {
    last_millis: i64,
    last_random: [u8; RANDOM_CHARS],
}

/// Chronologically sortable 20 character child keys: eight characters of
/// timestamp followed by twelve random ones. Keys minted within the same
/// millisecond increment the random part, so they stay strictly ordered.
pub struct PushIdGenerator {
    state: Mutex<PushState>,
}

impl Default for PushIdGenerator {
    fn default() -> Self {
        Self {
            state: Mutex::new(PushState {
                last_millis: i64::MIN,
                last_random: [0; RANDOM_CHARS],
            }),
        }
    }
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generate(&self) -> String {
        self.generate_at(now_millis())
    }

    pub fn generate_at(&self, millis: i64) -> String {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());

        if millis == state.last_millis {
            for digit in state.last_random.iter_mut().rev() {
                if *digit == 63 {
                    *digit = 0;
                } else {
                    *digit += 1;
                    break;
                }
            }
        } else {
            state.last_millis = millis;
            let mut rng = rand::rng();
            for digit in state.last_random.iter_mut() {
                *digit = rng.random_range(0..64);
            }
        }

        let mut time = [0u8; TIME_CHARS];
        let mut remaining = millis.max(0) as u64;
        for slot in time.iter_mut().rev() {
            *slot = PUSH_CHARS[(remaining % 64) as usize];
            remaining /= 64;
        }

        time.iter()
            .copied()
            .chain(state.last_random.iter().map(|digit| PUSH_CHARS[*digit as usize]))
            .map(char::from)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_shape() {
        let id = PushIdGenerator::new().generate();

        assert_eq!(id.len(), TIME_CHARS + RANDOM_CHARS);
        assert!(id.bytes().all(|b| PUSH_CHARS.contains(&b)));
    }

    #[test]
    fn test_ids_sort_by_time() {
        let generator = PushIdGenerator::new();

        let earlier = generator.generate_at(1_700_000_000_000);
        let later = generator.generate_at(1_700_000_000_001);

        assert!(earlier < later);
    }

    #[test]
    fn test_same_millisecond_stays_ordered() {
        let generator = PushIdGenerator::new();

        let ids: Vec<String> = (0..200).map(|_| generator.generate_at(42)).collect();

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
        assert!(ids.iter().all(|id| id.starts_with("-------")));
    }
}
