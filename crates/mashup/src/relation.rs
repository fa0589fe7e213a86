//! Key relationship resolution.
//!
//! A pair of keys is judged by an ordered chain of rules; the first rule
//! that recognises the pair decides the shift. Rules never compete for the
//! "best" shift. Every shift is the transposition to apply to key B so that
//! it lands on key A (positive = pitch B up).

use mashconf::{ToleranceConfig, ToleranceWindow};
use serde::{Deserialize, Serialize};

use crate::key::{wrap_semitones, Key, KeyParse};

/// Granularity of the shift-window search, in semitones.
pub const SHIFT_STEP: f64 = 0.25;

/// Pitch comparisons tolerate float noise from micro offsets.
const PITCH_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Relationship {
    /// Same signature, different mode.
    Relative,
    /// Same root, one mode derived from the other's Major/Minor parent.
    Parent,
    /// B's scale transposed inside A's shift window reproduces A's scale.
    ShiftWindow,
    /// Same mode, found in the same ordering table.
    Enharmonic,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Verdict {
    Compatible {
        relationship: Relationship,
        shift: f64,
    },
    /// No rule matched. `shift` is the plain root distance, for display only.
    Incompatible { shift: f64 },
    /// One or both keys unknown.
    Indeterminate,
}

impl Verdict {
    pub fn is_compatible(&self) -> bool {
        matches!(self, Verdict::Compatible { .. })
    }
}

/// One link in the resolution chain.
pub trait RelationshipRule: Send + Sync {
    fn relationship(&self) -> Relationship;

    /// Return the shift if this rule recognises the pair.
    fn shift(&self, a: &Key, b: &Key, window: ToleranceWindow) -> Option<f64>;
}

pub struct RelativeKeyRule;

impl RelationshipRule for RelativeKeyRule {
    fn relationship(&self) -> Relationship {
        Relationship::Relative
    }

    fn shift(&self, a: &Key, b: &Key, _window: ToleranceWindow) -> Option<f64> {
        if a.mode() == b.mode() {
            return None;
        }
        match (a.relative_group(), b.relative_group()) {
            (Some(group_a), Some(group_b)) if group_a == group_b => {
                Some(wrap_semitones(a.signature_pitch() - b.signature_pitch()))
            }
            _ => None,
        }
    }
}

pub struct ParentKeyRule;

impl RelationshipRule for ParentKeyRule {
    fn relationship(&self) -> Relationship {
        Relationship::Parent
    }

    fn shift(&self, a: &Key, b: &Key, _window: ToleranceWindow) -> Option<f64> {
        if a.root() != b.root() || a.mode() == b.mode() {
            return None;
        }
        if a.mode().parent() == b.mode() || b.mode().parent() == a.mode() {
            Some(wrap_semitones(a.tonic() - b.tonic()))
        } else {
            None
        }
    }
}

pub struct ShiftWindowRule;

impl RelationshipRule for ShiftWindowRule {
    fn relationship(&self) -> Relationship {
        Relationship::ShiftWindow
    }

    fn shift(&self, a: &Key, b: &Key, window: ToleranceWindow) -> Option<f64> {
        let target = a.note_set();
        let notes = b.note_set();

        let span = window.down + window.up;
        if span < 0.0 {
            return None;
        }
        let steps = (span / SHIFT_STEP + PITCH_EPSILON).floor() as i64;

        (0..=steps)
            .map(|i| -window.down + i as f64 * SHIFT_STEP)
            .find(|&shift| same_pitch_set(&notes, shift, &target))
    }
}

pub struct EnharmonicIndexRule;

impl RelationshipRule for EnharmonicIndexRule {
    fn relationship(&self) -> Relationship {
        Relationship::Enharmonic
    }

    fn shift(&self, a: &Key, b: &Key, _window: ToleranceWindow) -> Option<f64> {
        // One ordering table per mode, so "same table" means "same mode"
        if a.mode() != b.mode() {
            return None;
        }
        Some(wrap_semitones(a.signature_pitch() - b.signature_pitch()))
    }
}

/// Whether `notes` transposed by `shift` equals `target` as a set of pitch classes.
fn same_pitch_set(notes: &[f64; 7], shift: f64, target: &[f64; 7]) -> bool {
    notes.iter().all(|&note| {
        let moved = (note + shift).rem_euclid(12.0);
        target.iter().any(|&t| circular_distance(moved, t) < PITCH_EPSILON)
    })
}

fn circular_distance(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(12.0);
    d.min(12.0 - d)
}

/// Decides whether two keys can be mixed and by how much B must move.
pub struct RelationshipResolver {
    default_window: ToleranceWindow,
    rules: Vec<Box<dyn RelationshipRule>>,
}

impl RelationshipResolver {
    /// Resolver with the standard rule chain: relative, parent, shift window,
    /// enharmonic index.
    pub fn new(tolerance: &ToleranceConfig) -> Self {
        Self::with_rules(
            tolerance.semitones,
            vec![
                Box::new(RelativeKeyRule),
                Box::new(ParentKeyRule),
                Box::new(ShiftWindowRule),
                Box::new(EnharmonicIndexRule),
            ],
        )
    }

    /// Resolver with a custom rule chain, evaluated in order.
    pub fn with_rules(default_window: ToleranceWindow, rules: Vec<Box<dyn RelationshipRule>>) -> Self {
        Self {
            default_window,
            rules,
        }
    }

    /// Judge two parsed keys. `window` is song A's semitone override, if any.
    pub fn resolve(&self, a: &KeyParse, b: &KeyParse, window: Option<ToleranceWindow>) -> Verdict {
        match (a.known(), b.known()) {
            (Some(a), Some(b)) => self.resolve_keys(a, b, window),
            _ => Verdict::Indeterminate,
        }
    }

    pub fn resolve_keys(&self, a: &Key, b: &Key, window: Option<ToleranceWindow>) -> Verdict {
        let window = window.unwrap_or(self.default_window);

        for rule in &self.rules {
            if let Some(shift) = rule.shift(a, b, window) {
                return Verdict::Compatible {
                    relationship: rule.relationship(),
                    shift,
                };
            }
        }

        Verdict::Incompatible {
            shift: wrap_semitones(a.tonic() - b.tonic()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::{all_key_names, parse_key, Mode};

    fn resolver() -> RelationshipResolver {
        RelationshipResolver::new(&ToleranceConfig::default())
    }

    fn key(raw: &str) -> Key {
        *parse_key(raw).known().unwrap()
    }

    fn verdict(a: &str, b: &str) -> Verdict {
        resolver().resolve(&parse_key(a), &parse_key(b), None)
    }

    #[test]
    fn relative_key_c_major_a_minor() {
        assert_eq!(
            verdict("C Major", "A Minor"),
            Verdict::Compatible {
                relationship: Relationship::Relative,
                shift: 0.0
            }
        );
        assert_eq!(
            verdict("Am", "G Mixolydian"),
            Verdict::Compatible {
                relationship: Relationship::Relative,
                shift: 0.0
            }
        );
    }

    #[test]
    fn relative_key_spelling_is_enharmonic() {
        // C#m is spelled Db Minor in the group tables
        assert!(matches!(
            verdict("E", "C#m"),
            Verdict::Compatible {
                relationship: Relationship::Relative,
                ..
            }
        ));
    }

    #[test]
    fn relative_key_carries_micro_offset() {
        assert_eq!(
            verdict("C Major+0.5", "A Minor"),
            Verdict::Compatible {
                relationship: Relationship::Relative,
                shift: 0.5
            }
        );
    }

    #[test]
    fn parent_key() {
        assert_eq!(
            verdict("C Dorian", "Cm"),
            Verdict::Compatible {
                relationship: Relationship::Parent,
                shift: 0.0
            }
        );
        assert_eq!(
            verdict("G", "G Lydian"),
            Verdict::Compatible {
                relationship: Relationship::Parent,
                shift: 0.0
            }
        );
    }

    #[test]
    fn major_and_minor_on_same_root_are_not_parents() {
        // C Major vs C Minor: no parent link, and Eb Major's signature is 3
        // semitones away from C Major's, outside the default window
        assert_eq!(verdict("C", "Cm"), Verdict::Incompatible { shift: 0.0 });
    }

    #[test]
    fn sibling_modes_are_not_parents() {
        let v = verdict("D Dorian", "D Phrygian");
        assert!(!matches!(
            v,
            Verdict::Compatible {
                relationship: Relationship::Parent,
                ..
            }
        ));
    }

    #[test]
    fn shift_window_finds_transposition() {
        // D Dorian carries the C Major signature, E Mixolydian the A Major one:
        // three semitones apart, outside the default ±2
        let wide = ToleranceWindow::new(4.0, 4.0);
        let v = resolver().resolve_keys(&key("D Dorian"), &key("E Mixolydian"), Some(wide));
        assert_eq!(
            v,
            Verdict::Compatible {
                relationship: Relationship::ShiftWindow,
                shift: 3.0
            }
        );

        let v = resolver().resolve_keys(&key("D Dorian"), &key("E Mixolydian"), None);
        assert!(!v.is_compatible());
    }

    #[test]
    fn shift_window_scans_from_negative_end_in_quarter_steps() {
        // B = Bb Minor+0.5 (signature Db+0.5); A = E Phrygian (C signature).
        // Reaching C from Db+0.5 takes -1.5 semitones.
        let v = resolver().resolve_keys(&key("E Phrygian"), &key("Bbm+0.5"), None);
        assert_eq!(
            v,
            Verdict::Compatible {
                relationship: Relationship::ShiftWindow,
                shift: -1.5
            }
        );
    }

    #[test]
    fn enharmonic_index_for_same_mode() {
        assert_eq!(
            verdict("C Major", "F# Major"),
            Verdict::Compatible {
                relationship: Relationship::Enharmonic,
                shift: 6.0
            }
        );
        assert_eq!(
            verdict("A Minor", "F Minor"),
            Verdict::Compatible {
                relationship: Relationship::Enharmonic,
                shift: 4.0
            }
        );
    }

    #[test]
    fn unknown_keys_are_indeterminate() {
        assert_eq!(verdict("?", "C Major"), Verdict::Indeterminate);
        assert_eq!(verdict("C Major", ""), Verdict::Indeterminate);
        assert_eq!(verdict("nonsense", "C Major"), Verdict::Indeterminate);
    }

    #[test]
    fn incompatible_reports_root_distance() {
        // C Major vs D Minor: different modes, signatures C and F, no parent
        assert_eq!(verdict("C", "Dm"), Verdict::Incompatible { shift: -2.0 });
    }

    #[test]
    fn reflexive_shift_is_zero() {
        let resolver = resolver();
        for name in all_key_names() {
            for offset in [0.0, 0.5, -0.5] {
                let plain = key(&name);
                let k = Key::with_offset(plain.root(), plain.mode(), offset);
                match resolver.resolve_keys(&k, &k, None) {
                    Verdict::Compatible { shift, .. } => assert_eq!(shift, 0.0, "{}", k),
                    other => panic!("{} not compatible with itself: {:?}", k, other),
                }
            }
        }
    }

    #[test]
    fn antisymmetric_shifts() {
        let resolver = resolver();
        let keys: Vec<Key> = all_key_names()
            .iter()
            .flat_map(|name| {
                let plain = key(name);
                [0.0, 0.5, -0.5]
                    .map(|offset| Key::with_offset(plain.root(), plain.mode(), offset))
            })
            .collect();

        for a in &keys {
            for b in &keys {
                let forward = resolver.resolve_keys(a, b, None);
                let backward = resolver.resolve_keys(b, a, None);
                match (forward, backward) {
                    (
                        Verdict::Compatible { relationship: r1, shift: s1 },
                        Verdict::Compatible { relationship: r2, shift: s2 },
                    ) => {
                        assert_eq!(r1, r2, "{} / {}", a, b);
                        if s1.abs() != 6.0 {
                            assert_eq!(s1, -s2, "{} / {}", a, b);
                        }
                    }
                    (Verdict::Incompatible { .. }, Verdict::Incompatible { .. }) => {}
                    other => panic!("asymmetric verdicts for {} / {}: {:?}", a, b, other),
                }
            }
        }
    }

    #[test]
    fn offsets_move_shifts_in_both_directions() {
        let resolver = resolver();
        let c_up = Key::with_offset(0, Mode::Major, 0.5);
        let a_down = Key::with_offset(9, Mode::Minor, -0.5);

        assert_eq!(
            resolver.resolve_keys(&c_up, &a_down, None),
            Verdict::Compatible {
                relationship: Relationship::Relative,
                shift: 1.0
            }
        );
        assert_eq!(
            resolver.resolve_keys(&a_down, &c_up, None),
            Verdict::Compatible {
                relationship: Relationship::Relative,
                shift: -1.0
            }
        );
    }

    #[test]
    fn custom_rule_chain_is_respected() {
        let only_parent = RelationshipResolver::with_rules(
            ToleranceWindow::new(2.0, 2.0),
            vec![Box::new(ParentKeyRule)],
        );
        let c_major = Key::new(0, Mode::Major);
        let a_minor = Key::new(9, Mode::Minor);
        assert_eq!(
            only_parent.resolve_keys(&c_major, &a_minor, None),
            Verdict::Incompatible { shift: 3.0 }
        );
    }
}
