//! Enumeration order over the (test × cable × position) space.
//!
//! A [`SequencePolicy`] is three ordered value lists; a [`SequenceCursor`] is
//! a mixed-radix counter over them, position being the fastest digit, then
//! test, then cable. The lists need not be contiguous or monotonic: the plain
//! campaign order walks cables from the highest down to 1, and the paired-slot
//! order interleaves the two halves of the cable range.
//!
//! Stepping is an explicit function from one immutable [`CursorState`]
//! snapshot to the next; overflowing the last cable parks the cursor on the
//! terminal [`CursorState::PastEnd`] marker, rolling under the first one on
//! [`CursorState::BeforeStart`]. Iteration always restarts from `reset()`,
//! never from the cursor's current digits.

use crate::chimney::ChimneyId;
use crate::coordinate::{CableId, Coordinate, MAX_CABLE, MAX_POSITION, MIN_POSITION};
use crate::error::SequenceError;

/// The ordered digit value lists of one campaign traversal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencePolicy {
    tests: Vec<String>,
    cables: Vec<u32>,
    positions: Vec<u32>,
}

impl SequencePolicy {
    /// A policy from explicit value lists.
    pub fn new(tests: Vec<String>, cables: Vec<u32>, positions: Vec<u32>) -> Self {
        SequencePolicy {
            tests,
            cables,
            positions,
        }
    }

    /// The plain campaign order: cables from `MAX_CABLE` down to 1, positions
    /// ascending.
    pub fn standard(tests: Vec<String>) -> Self {
        Self::new(
            tests,
            (1..=MAX_CABLE).rev().collect(),
            (MIN_POSITION..=MAX_POSITION).collect(),
        )
    }

    /// The paired-slot order: the two halves of the cable range interleaved
    /// (`1, 10, 2, 11, …` for 18 cables), positions ascending.
    pub fn paired_slots(tests: Vec<String>) -> Self {
        let half = MAX_CABLE / 2;
        let cables = (1..=half).flat_map(|i| [i, i + half]).collect();
        Self::new(tests, cables, (MIN_POSITION..=MAX_POSITION).collect())
    }

    /// The test kind labels, slowest within one cable.
    pub fn tests(&self) -> &[String] {
        &self.tests
    }

    /// The cable numbers, in traversal order.
    pub fn cables(&self) -> &[u32] {
        &self.cables
    }

    /// The switch positions, fastest digit.
    pub fn positions(&self) -> &[u32] {
        &self.positions
    }

    /// Total number of coordinates in one full enumeration.
    pub fn total(&self) -> usize {
        self.tests.len() * self.cables.len() * self.positions.len()
    }
}

/// Digit indices of a cursor, or one of the two terminal markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorState {
    /// Rolled under the first coordinate.
    BeforeStart,
    /// Pointing at one coordinate of the enumeration.
    At {
        /// Index into the cable list.
        cable: usize,
        /// Index into the test list.
        test: usize,
        /// Index into the position list.
        position: usize,
    },
    /// Ran past the last coordinate.
    PastEnd,
}

/// A mutable pointer into a [`SequencePolicy`] enumeration.
#[derive(Debug, Clone)]
pub struct SequenceCursor {
    policy: SequencePolicy,
    state: CursorState,
}

impl SequenceCursor {
    /// A cursor at the start of `policy`'s enumeration.
    pub fn new(policy: SequencePolicy) -> Self {
        let mut cursor = SequenceCursor {
            policy,
            state: CursorState::PastEnd,
        };
        cursor.reset();
        cursor
    }

    /// The policy being enumerated.
    pub fn policy(&self) -> &SequencePolicy {
        &self.policy
    }

    /// The current state snapshot.
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Moves back to the first coordinate. An empty policy is immediately
    /// exhausted.
    pub fn reset(&mut self) {
        self.state = if self.policy.total() == 0 {
            CursorState::PastEnd
        } else {
            CursorState::At {
                cable: 0,
                test: 0,
                position: 0,
            }
        };
    }

    /// Whether the cursor points at a coordinate (not a terminal marker).
    pub fn is_valid(&self) -> bool {
        matches!(self.state, CursorState::At { .. })
    }

    /// Whether the cursor points at the first coordinate.
    pub fn is_at_start(&self) -> bool {
        self.state
            == CursorState::At {
                cable: 0,
                test: 0,
                position: 0,
            }
    }

    /// Whether the cursor sits on the past-the-end marker.
    pub fn is_at_end(&self) -> bool {
        self.state == CursorState::PastEnd
    }

    /// The state one step forward of `state`: position carries into test,
    /// test into cable, the last cable into `PastEnd`.
    fn next_state(&self, state: CursorState) -> CursorState {
        match state {
            CursorState::BeforeStart => CursorState::At {
                cable: 0,
                test: 0,
                position: 0,
            },
            CursorState::At {
                cable,
                test,
                position,
            } => {
                if position + 1 < self.policy.positions.len() {
                    CursorState::At {
                        cable,
                        test,
                        position: position + 1,
                    }
                } else if test + 1 < self.policy.tests.len() {
                    CursorState::At {
                        cable,
                        test: test + 1,
                        position: 0,
                    }
                } else if cable + 1 < self.policy.cables.len() {
                    CursorState::At {
                        cable: cable + 1,
                        test: 0,
                        position: 0,
                    }
                } else {
                    CursorState::PastEnd
                }
            }
            CursorState::PastEnd => CursorState::PastEnd,
        }
    }

    /// The mirror of [`Self::next_state`]: rolling under the first position
    /// resumes from the last one of the previous test/cable, the first cable
    /// rolls under into `BeforeStart`.
    fn prev_state(&self, state: CursorState) -> CursorState {
        if self.policy.total() == 0 {
            return CursorState::BeforeStart;
        }
        let last_test = self.policy.tests.len() - 1;
        let last_position = self.policy.positions.len() - 1;
        match state {
            CursorState::BeforeStart => CursorState::BeforeStart,
            CursorState::At {
                cable,
                test,
                position,
            } => {
                if position > 0 {
                    CursorState::At {
                        cable,
                        test,
                        position: position - 1,
                    }
                } else if test > 0 {
                    CursorState::At {
                        cable,
                        test: test - 1,
                        position: last_position,
                    }
                } else if cable > 0 {
                    CursorState::At {
                        cable: cable - 1,
                        test: last_test,
                        position: last_position,
                    }
                } else {
                    CursorState::BeforeStart
                }
            }
            CursorState::PastEnd => CursorState::At {
                cable: self.policy.cables.len() - 1,
                test: last_test,
                position: last_position,
            },
        }
    }

    /// Advances by `n` coordinates. Returns `false` when the cursor lands on
    /// the past-the-end marker.
    pub fn go_next(&mut self, n: usize) -> bool {
        for _ in 0..n {
            self.state = self.next_state(self.state);
            if self.state == CursorState::PastEnd {
                return false;
            }
        }
        self.is_valid()
    }

    /// Steps back by `n` coordinates. Returns `false` when the cursor rolls
    /// under onto the before-the-start marker.
    pub fn go_prev(&mut self, n: usize) -> bool {
        for _ in 0..n {
            self.state = self.prev_state(self.state);
            if self.state == CursorState::BeforeStart {
                return false;
            }
        }
        self.is_valid()
    }

    fn unique_index<T: PartialEq + std::fmt::Display>(
        list: &[T],
        value: &T,
        digit: &'static str,
    ) -> Result<usize, SequenceError> {
        let mut found = None;
        for (i, candidate) in list.iter().enumerate() {
            if candidate == value {
                if found.is_some() {
                    return Err(SequenceError::AmbiguousValue {
                        digit,
                        value: value.to_string(),
                    });
                }
                found = Some(i);
            }
        }
        found.ok_or_else(|| SequenceError::NotInSequence {
            digit,
            value: value.to_string(),
        })
    }

    fn digits(&mut self) -> (usize, usize, usize) {
        if let CursorState::At {
            cable,
            test,
            position,
        } = self.state
        {
            (cable, test, position)
        } else {
            // relocating a digit of a terminal cursor restarts the others
            self.reset();
            (0, 0, 0)
        }
    }

    /// Relocates the cable digit. The value must occur exactly once in the
    /// cable list; other digits are left alone.
    pub fn set_cable(&mut self, cable: u32) -> Result<(), SequenceError> {
        let index = Self::unique_index(&self.policy.cables, &cable, "cable")?;
        let (_, test, position) = self.digits();
        self.state = CursorState::At {
            cable: index,
            test,
            position,
        };
        Ok(())
    }

    /// Relocates the test digit; same uniqueness rule as [`Self::set_cable`].
    pub fn set_test(&mut self, test: &str) -> Result<(), SequenceError> {
        let index = Self::unique_index(&self.policy.tests, &test.to_owned(), "test")?;
        let (cable, _, position) = self.digits();
        self.state = CursorState::At {
            cable,
            test: index,
            position,
        };
        Ok(())
    }

    /// Relocates the position digit; same uniqueness rule as
    /// [`Self::set_cable`].
    pub fn set_position(&mut self, position: u32) -> Result<(), SequenceError> {
        let index = Self::unique_index(&self.policy.positions, &position, "position")?;
        let (cable, test, _) = self.digits();
        self.state = CursorState::At {
            cable,
            test,
            position: index,
        };
        Ok(())
    }

    /// Relocates any subset of the digits, applying setters in cable → test →
    /// position order.
    ///
    /// Changing a higher digit resets the lower ones: setting the cable
    /// resets test and position to the start of their lists, setting the test
    /// resets the position. Explicit lower-digit arguments then override the
    /// reset, since they are applied afterwards.
    pub fn jump_to(
        &mut self,
        cable: Option<u32>,
        test: Option<&str>,
        position: Option<u32>,
    ) -> Result<(), SequenceError> {
        if let Some(cable) = cable {
            self.set_cable(cable)?;
            if let CursorState::At { cable, .. } = self.state {
                self.state = CursorState::At {
                    cable,
                    test: 0,
                    position: 0,
                };
            }
        }
        if let Some(test) = test {
            self.set_test(test)?;
            if let CursorState::At { cable, test, .. } = self.state {
                self.state = CursorState::At {
                    cable,
                    test,
                    position: 0,
                };
            }
        }
        if let Some(position) = position {
            self.set_position(position)?;
        }
        Ok(())
    }

    /// The current `(test, cable, position)` values, if the cursor is valid.
    pub fn current(&self) -> Option<(&str, u32, u32)> {
        match self.state {
            CursorState::At {
                cable,
                test,
                position,
            } => Some((
                &self.policy.tests[test],
                self.policy.cables[cable],
                self.policy.positions[position],
            )),
            _ => None,
        }
    }

    /// Derives the full coordinate the cursor currently points at, for `n`
    /// waveforms per channel on `chimney`. The channel index starts at 1 and
    /// the sample index at the first of the position's block.
    pub fn coordinate(
        &self,
        chimney: &ChimneyId,
        n: u32,
    ) -> Result<Coordinate, crate::error::CampaignError> {
        let (test, cable, position) = self.current().ok_or(SequenceError::Exhausted)?;
        let connection = CableId::for_chimney(chimney, cable)?;
        Ok(Coordinate {
            test: test.to_owned(),
            chimney: chimney.clone(),
            connection,
            position,
            channel_index: 1,
            index: Coordinate::first_index_of(position, n),
        })
    }

    /// Iterates the full enumeration exactly once, from a fresh `reset()`
    /// regardless of the cursor's current digits.
    pub fn iter(&self) -> SequenceIter {
        let mut cursor = self.clone();
        cursor.reset();
        SequenceIter {
            cursor,
            fresh: true,
        }
    }
}

/// Iterator over one full enumeration of a policy.
pub struct SequenceIter {
    cursor: SequenceCursor,
    fresh: bool,
}

impl Iterator for SequenceIter {
    type Item = (String, u32, u32);

    fn next(&mut self) -> Option<Self::Item> {
        if self.fresh {
            self.fresh = false;
        } else if !self.cursor.go_next(1) {
            return None;
        }
        self.cursor
            .current()
            .map(|(test, cable, position)| (test.to_owned(), cable, position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cursor() -> SequenceCursor {
        SequenceCursor::new(SequencePolicy::new(
            vec![String::new()],
            vec![2, 1],
            vec![1, 2],
        ))
    }

    #[test]
    fn enumerates_in_carry_order() {
        // cables=[2,1], tests=[""], positions=[1,2]: four coordinates,
        // position fastest, cable slowest
        let order: Vec<_> = small_cursor()
            .iter()
            .map(|(_, cable, position)| (cable, position))
            .collect();
        assert_eq!(order, vec![(2, 1), (2, 2), (1, 1), (1, 2)]);
    }

    #[test]
    fn go_next_hits_the_terminal_marker() {
        let mut cursor = small_cursor();
        assert!(cursor.go_next(1));
        assert!(cursor.go_next(1));
        assert!(cursor.go_next(1));
        assert!(!cursor.go_next(1));
        assert!(cursor.is_at_end());
        // a fifth call stays terminal
        assert!(!cursor.go_next(1));
    }

    #[test]
    fn go_prev_mirrors_go_next() {
        let mut cursor = SequenceCursor::new(SequencePolicy::standard(vec![
            String::new(),
            "HV".to_owned(),
        ]));
        for n in [1, 7, 30, cursor.policy().total() - 1] {
            cursor.reset();
            assert!(cursor.go_next(n));
            assert!(cursor.go_prev(n));
            assert!(cursor.is_at_start(), "go_prev({n}) did not return to start");
        }
        // one more step under the start rolls onto the before-start marker
        assert!(!cursor.go_prev(1));
        assert!(!cursor.is_valid());
    }

    #[test]
    fn prev_from_past_end_lands_on_last_coordinate() {
        let mut cursor = small_cursor();
        cursor.go_next(cursor.policy().total());
        assert!(cursor.is_at_end());
        assert!(cursor.go_prev(1));
        assert_eq!(cursor.current(), Some(("", 1, 2)));
    }

    #[test]
    fn full_enumeration_is_exhaustive_and_unique() {
        let cursor = SequenceCursor::new(SequencePolicy::standard(vec![String::new()]));
        let all: Vec<_> = cursor.iter().collect();
        assert_eq!(all.len(), cursor.policy().total());
        assert_eq!(all.len(), 18 * 8);
        let distinct: std::collections::HashSet<_> = all.iter().collect();
        assert_eq!(distinct.len(), all.len());
        // descending cable order, position fastest
        assert_eq!(all[0], (String::new(), 18, 1));
        assert_eq!(all[7], (String::new(), 18, 8));
        assert_eq!(all[8], (String::new(), 17, 1));
    }

    #[test]
    fn iteration_restarts_mid_sequence_cursors() {
        let mut cursor = small_cursor();
        cursor.go_next(2);
        let first = cursor.iter().next();
        assert_eq!(first, Some((String::new(), 2, 1)));
        // the cursor itself did not move
        assert_eq!(cursor.current(), Some(("", 1, 1)));
    }

    #[test]
    fn paired_slot_policy_interleaves_cable_halves() {
        let policy = SequencePolicy::paired_slots(vec![String::new()]);
        assert_eq!(&policy.cables()[..6], &[1, 10, 2, 11, 3, 12]);
        assert_eq!(policy.cables().len(), 18);
    }

    #[test]
    fn setters_require_unique_values() {
        let mut cursor = SequenceCursor::new(SequencePolicy::new(
            vec![String::new()],
            vec![3, 2, 3],
            vec![1, 2],
        ));
        assert!(matches!(
            cursor.set_cable(3),
            Err(SequenceError::AmbiguousValue { digit: "cable", .. })
        ));
        assert!(matches!(
            cursor.set_cable(9),
            Err(SequenceError::NotInSequence { digit: "cable", .. })
        ));
        cursor.set_cable(2).unwrap();
        assert_eq!(cursor.current(), Some(("", 2, 1)));
    }

    #[test]
    fn jump_to_resets_lower_digits() {
        let mut cursor = SequenceCursor::new(SequencePolicy::standard(vec![
            String::new(),
            "HV".to_owned(),
        ]));
        cursor.jump_to(Some(5), Some("HV"), Some(4)).unwrap();
        assert_eq!(cursor.current(), Some(("HV", 5, 4)));

        // changing only the cable resets test and position
        cursor.jump_to(Some(12), None, None).unwrap();
        assert_eq!(cursor.current(), Some(("", 12, 1)));

        // changing only the test resets the position but keeps the cable
        cursor.set_position(6).unwrap();
        cursor.jump_to(None, Some("HV"), None).unwrap();
        assert_eq!(cursor.current(), Some(("HV", 12, 1)));
    }

    #[test]
    fn cursor_derives_the_current_coordinate() {
        let chimney = ChimneyId::parse("EW08").unwrap();
        let mut cursor = SequenceCursor::new(SequencePolicy::standard(vec![String::new()]));
        cursor.jump_to(Some(5), None, Some(3)).unwrap();
        let c = cursor.coordinate(&chimney, 10).unwrap();
        assert_eq!(c.connection.to_string(), "S05");
        assert_eq!(c.position, 3);
        assert_eq!(c.channel_index, 1);
        assert_eq!(c.index, 21);
    }
}
