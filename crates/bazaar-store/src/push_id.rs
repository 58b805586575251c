//! Creation-ordered, collision-resistant identifiers.
//!
//! A push id is 20 characters: 8 encoding the millisecond timestamp followed
//! by 12 random characters.  The alphabet is in ASCII order so ids sort
//! lexicographically by creation time.  Ids generated within the same
//! millisecond increment the random part instead of redrawing it, keeping
//! them strictly increasing within one generator.

use rand::Rng;

const PUSH_CHARS: &[u8; 64] = b"-0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ_abcdefghijklmnopqrstuvwxyz";
const TIME_CHARS: usize = 8;
const RANDOM_CHARS: usize = 12;

#[derive(Debug, Default)]
pub struct PushIdGenerator {
    last_time: i64,
    last_random: [u8; RANDOM_CHARS],
}

impl PushIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Generate an id for the current wall-clock time.
    pub fn generate(&mut self) -> String {
        self.generate_at(chrono::Utc::now().timestamp_millis())
    }

    /// Generate an id for `now_ms`.  A clock that steps backwards is treated
    /// as the last seen millisecond.
    pub fn generate_at(&mut self, now_ms: i64) -> String {
        let now = now_ms.max(self.last_time);
        let duplicate = now == self.last_time;
        self.last_time = now;

        let mut id = String::with_capacity(TIME_CHARS + RANDOM_CHARS);

        let mut time_chars = [0u8; TIME_CHARS];
        let mut t = now;
        for slot in time_chars.iter_mut().rev() {
            *slot = PUSH_CHARS[(t % 64) as usize];
            t /= 64;
        }
        id.extend(time_chars.iter().map(|&b| b as char));

        if duplicate {
            self.increment_random();
        } else {
            let mut rng = rand::thread_rng();
            for r in self.last_random.iter_mut() {
                *r = rng.gen_range(0..64);
            }
        }
        id.extend(self.last_random.iter().map(|&i| PUSH_CHARS[i as usize] as char));
        id
    }

    fn increment_random(&mut self) {
        for r in self.last_random.iter_mut().rev() {
            if *r == 63 {
                *r = 0;
            } else {
                *r += 1;
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_fixed_length_and_alphabet() {
        let mut gen = PushIdGenerator::new();
        let id = gen.generate();
        assert_eq!(id.len(), 20);
        assert!(id.bytes().all(|b| PUSH_CHARS.contains(&b)));
    }

    #[test]
    fn same_millisecond_ids_increase() {
        let mut gen = PushIdGenerator::new();
        let mut previous = gen.generate_at(1_700_000_000_000);
        for _ in 0..1_000 {
            let next = gen.generate_at(1_700_000_000_000);
            assert!(next > previous, "{next} should sort after {previous}");
            previous = next;
        }
    }

    #[test]
    fn later_time_sorts_later() {
        let mut gen = PushIdGenerator::new();
        let early = gen.generate_at(1_000);
        let late = gen.generate_at(2_000);
        assert!(late > early);
        // Backwards clock never produces a smaller id.
        let skewed = gen.generate_at(500);
        assert!(skewed > late);
    }
}
