use loam_blocks::BlockKind;
use proptest::prelude::*;

proptest! {
    // Every id either maps to a kind whose id is the input, or is rejected.
    #[test]
    fn from_id_is_partial_inverse_of_id(id in any::<u8>()) {
        match BlockKind::from_id(id) {
            Some(kind) => prop_assert_eq!(kind.id(), id),
            None => prop_assert!(usize::from(id) >= BlockKind::ALL.len()),
        }
    }

    // Solidity never holds without visibility for the kinds in play.
    #[test]
    fn solid_implies_visible(idx in 0usize..BlockKind::ALL.len()) {
        let kind = BlockKind::ALL[idx];
        prop_assert!(!kind.is_solid() || kind.is_visible());
        prop_assert_eq!(kind.is_air(), !kind.is_visible());
    }
}
