//! The promotion roll.
//!
//! Only the authority rolls. Replicas learn promotion state from the
//! replication protocol and must never call into this module.
//!
//! A roll is one uniform byte:
//!
//! | draw    | outcome                       |
//! |---------|-------------------------------|
//! | `0`     | promote                       |
//! | `1..=3` | promote only if badass        |
//! | `4..`   | never promote                 |
//!
//! which gives `1/256` for ordinary creatures and `4/256` for badasses.
//! Forced rolls (cheat mode, bequeathal) always promote.

use rand::Rng;

use crate::classification::{Classification, ClassificationTables};

/// Highest draw that can still promote a badass.
pub const BADASS_DRAW_CEILING: u8 = 3;

/// Decides promotion from an explicit draw. Pure.
#[must_use]
pub fn decide_with_draw(
    tables: &ClassificationTables,
    class: &Classification,
    is_badass: bool,
    force: bool,
    draw: u8,
) -> bool {
    if force {
        return true;
    }
    if tables.never_rolls(class) {
        return false;
    }
    match draw {
        0 => true,
        1..=BADASS_DRAW_CEILING => is_badass,
        _ => false,
    }
}

/// Draws a byte from `rng` and decides promotion.
pub fn decide<R: Rng>(
    tables: &ClassificationTables,
    class: &Classification,
    is_badass: bool,
    force: bool,
    rng: &mut R,
) -> bool {
    if force {
        return true;
    }
    let draw: u8 = rng.r#gen();
    decide_with_draw(tables, class, is_badass, false, draw)
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn tables() -> ClassificationTables {
        ClassificationTables::from_lists(&["CharClass_Bloodwing"], &[], &[], &[])
    }

    #[test]
    fn test_never_roll_class_never_promotes() {
        let tables = tables();
        let class = Classification::from("CharClass_Bloodwing");
        for draw in 0..=u8::MAX {
            assert!(!decide_with_draw(&tables, &class, true, false, draw));
            assert!(!decide_with_draw(&tables, &class, false, false, draw));
        }
    }

    #[test]
    fn test_draw_table() {
        let tables = tables();
        let class = Classification::from("CharClass_Skag");
        for draw in 0..=u8::MAX {
            let badass = decide_with_draw(&tables, &class, true, false, draw);
            let plain = decide_with_draw(&tables, &class, false, false, draw);
            match draw {
                0 => assert!(badass && plain),
                1..=3 => assert!(badass && !plain),
                _ => assert!(!badass && !plain),
            }
        }
    }

    #[test]
    fn test_force_always_promotes() {
        let tables = tables();
        let class = Classification::from("CharClass_Skag");
        for draw in 0..=u8::MAX {
            assert!(decide_with_draw(&tables, &class, false, true, draw));
        }
        let mut rng = StdRng::seed_from_u64(1);
        assert!(decide(&tables, &class, false, true, &mut rng));
    }

    #[test]
    fn test_random_rate_is_low() {
        let tables = tables();
        let class = Classification::from("CharClass_Skag");
        let mut rng = StdRng::seed_from_u64(42);
        let promoted = (0..25_600)
            .filter(|_| decide(&tables, &class, false, false, &mut rng))
            .count();
        // Expect about 100 of 25 600.
        assert!((40..200).contains(&promoted), "promoted {promoted}");
    }
}
