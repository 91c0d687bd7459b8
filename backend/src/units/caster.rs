//! Caster sequence tracking
//!
//! A caster casts heats back to back in a *sequence*. The sequence breaks on
//! a grade change, when the gap since the previous cast exceeds the grade's
//! flow-interruption threshold, or when `max_sequence` heats have been cast.
//! A break costs a turnaround before the next heat may start.

use crate::models::grade::SteelGrade;
use serde::{Deserialize, Serialize};

/// Why the running sequence cannot take the next heat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SequenceBreak {
    GradeChange,
    FlowInterruption,
    MaxSequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceDecision {
    /// No sequence is running; start one without turnaround
    Start,
    /// Append to the running sequence
    Extend,
    Break(SequenceBreak),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CasterSequence {
    length: u32,
    grade: Option<String>,
    last_cast_end: Option<f64>,
    casting: u32,
    completed: u32,
}

impl CasterSequence {
    pub fn length(&self) -> u32 {
        self.length
    }

    pub fn grade(&self) -> Option<&str> {
        self.grade.as_deref()
    }

    pub fn sequences_completed(&self) -> u32 {
        self.completed
    }

    pub fn is_open(&self) -> bool {
        self.length > 0
    }

    pub fn decide(&self, grade: &SteelGrade, now: f64) -> SequenceDecision {
        if self.length == 0 {
            return SequenceDecision::Start;
        }
        if self.grade.as_deref() != Some(grade.id.as_str()) {
            return SequenceDecision::Break(SequenceBreak::GradeChange);
        }
        if self.length >= grade.max_sequence {
            return SequenceDecision::Break(SequenceBreak::MaxSequence);
        }
        if self.casting == 0 {
            if let Some(end) = self.last_cast_end {
                if now - end > grade.flow_interruption_threshold {
                    return SequenceDecision::Break(SequenceBreak::FlowInterruption);
                }
            }
        }
        SequenceDecision::Extend
    }

    pub fn record_start(&mut self, grade_id: &str) {
        if self.length == 0 {
            self.grade = Some(grade_id.to_string());
        }
        self.length += 1;
        self.casting += 1;
    }

    pub fn record_end(&mut self, now: f64) {
        self.casting = self.casting.saturating_sub(1);
        self.last_cast_end = Some(now);
    }

    /// Close the running sequence, returning its grade and length
    pub fn close(&mut self) -> Option<(String, u32)> {
        let grade = self.grade.take()?;
        let length = self.length;
        self.length = 0;
        self.last_cast_end = None;
        self.completed += 1;
        Some((grade, length))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grade(id: &str) -> SteelGrade {
        let mut g = SteelGrade::with_defaults(id);
        g.max_sequence = 3;
        g.flow_interruption_threshold = 60.0;
        g
    }

    #[test]
    fn test_first_heat_starts_sequence() {
        let seq = CasterSequence::default();
        assert_eq!(seq.decide(&grade("standard"), 0.0), SequenceDecision::Start);
    }

    #[test]
    fn test_grade_change_breaks() {
        let mut seq = CasterSequence::default();
        seq.record_start("standard");
        seq.record_end(20.0);
        assert_eq!(
            seq.decide(&grade("special"), 30.0),
            SequenceDecision::Break(SequenceBreak::GradeChange)
        );
    }

    #[test]
    fn test_flow_interruption_is_strict() {
        let mut seq = CasterSequence::default();
        seq.record_start("standard");
        seq.record_end(20.0);
        let g = grade("standard");
        assert_eq!(seq.decide(&g, 80.0), SequenceDecision::Extend);
        assert_eq!(
            seq.decide(&g, 80.5),
            SequenceDecision::Break(SequenceBreak::FlowInterruption)
        );
    }

    #[test]
    fn test_max_sequence_breaks_and_close_resets() {
        let mut seq = CasterSequence::default();
        let g = grade("standard");
        for i in 0..3 {
            assert_ne!(
                seq.decide(&g, i as f64 * 20.0),
                SequenceDecision::Break(SequenceBreak::MaxSequence)
            );
            seq.record_start("standard");
            seq.record_end(i as f64 * 20.0 + 20.0);
        }
        assert_eq!(
            seq.decide(&g, 60.0),
            SequenceDecision::Break(SequenceBreak::MaxSequence)
        );
        assert_eq!(seq.close(), Some(("standard".to_string(), 3)));
        assert_eq!(seq.decide(&g, 200.0), SequenceDecision::Start);
        assert_eq!(seq.sequences_completed(), 1);
    }
}
