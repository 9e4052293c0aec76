//! Button id allocation.
//!
//! Bounded policy: a requested id gets exactly one attempt; a random id
//! gets two. Failing fast is preferred over looping on a crowded id space.

use crate::button::ButtonId;
use crate::hal::clock::Entropy;

/// Random attempts before giving up.
pub const RANDOM_ATTEMPTS: usize = 2;

/// Pick an id not present in `existing`.
///
/// A non-zero `requested` id is returned as-is if free, otherwise the
/// allocation fails. A zero request draws random non-zero 16-bit
/// candidates, at most [`RANDOM_ATTEMPTS`] of them.
pub fn allocate<E, I>(requested: u16, existing: I, entropy: &E) -> Option<ButtonId>
where
    E: Entropy + ?Sized,
    I: IntoIterator<Item = ButtonId> + Clone,
{
    let is_free = |candidate: ButtonId| !existing.clone().into_iter().any(|id| id == candidate);

    if let Some(id) = ButtonId::new(requested) {
        return is_free(id).then_some(id);
    }

    (0..RANDOM_ATTEMPTS)
        .map(|_| random_id(entropy))
        .find(|&candidate| is_free(candidate))
}

/// Uniform over 1..=0xFFFF.
#[inline]
fn random_id<E: Entropy + ?Sized>(entropy: &E) -> ButtonId {
    ButtonId::from_offset((entropy.random_u32() % 0xFFFF) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::sim::ScriptedEntropy;

    fn id(n: u16) -> ButtonId {
        ButtonId::new(n).unwrap()
    }

    #[test]
    fn test_requested_id_granted_when_free() {
        let entropy = ScriptedEntropy::new(&[1]);
        let existing = [id(1), id(2)];

        assert_eq!(allocate(7, existing, &entropy), Some(id(7)));
        assert_eq!(entropy.draws(), 0);
    }

    #[test]
    fn test_requested_id_collision_fails_without_random() {
        let entropy = ScriptedEntropy::new(&[100]);
        let existing = [id(7)];

        assert_eq!(allocate(7, existing, &entropy), None);
        assert_eq!(entropy.draws(), 0);
    }

    #[test]
    fn test_random_retry_once() {
        // first draw maps to id 5 (taken), second to id 9
        let entropy = ScriptedEntropy::new(&[4, 8]);
        let existing = [id(5)];

        assert_eq!(allocate(0, existing, &entropy), Some(id(9)));
        assert_eq!(entropy.draws(), 2);
    }

    #[test]
    fn test_two_collisions_exhaust() {
        let entropy = ScriptedEntropy::new(&[4, 4, 8]);
        let existing = [id(5)];

        assert_eq!(allocate(0, existing, &entropy), None);
        assert_eq!(entropy.draws(), 2);
    }

    #[test]
    fn test_random_id_never_zero() {
        // 0xFFFF and multiples map to 1, never to 0
        let entropy = ScriptedEntropy::new(&[0, 0xFFFF, u32::MAX, 0xFFFE]);
        for _ in 0..4 {
            assert_ne!(random_id(&entropy).get(), 0);
        }
    }

    #[test]
    fn test_random_id_covers_full_range() {
        let entropy = ScriptedEntropy::new(&[0, 0xFFFE]);
        assert_eq!(random_id(&entropy), id(1));
        assert_eq!(random_id(&entropy), id(0xFFFF));
    }
}
